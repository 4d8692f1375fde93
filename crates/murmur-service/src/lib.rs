mod codes;
mod config;
mod error;
mod router;
mod service;
mod validate;

pub use codes::{CodeGenerator, FixedCodes, OsRngCodes};
pub use config::ServiceConfig;
pub use error::ServiceError;
pub use service::{IssuedCode, MurmurService};

pub use murmur_core::{Action, ErrorKind, Reply, Request, Verification};
pub use murmur_db::{ChatMessage, ChatSummary, FriendEntry, Message, MurmurDb, User, UserSummary};
