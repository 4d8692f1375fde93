mod chats;
mod error;
mod friends;
mod identity;
mod models;
mod repository;
mod schema;

pub use error::DbError;
pub use models::*;
pub use repository::{MEMORY_URL, MurmurDb};
