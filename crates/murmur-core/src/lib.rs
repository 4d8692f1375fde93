mod actions;
mod clock;
mod protocol;
mod types;

pub use actions::*;
pub use clock::*;
pub use protocol::*;
pub use types::*;
