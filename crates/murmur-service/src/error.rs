use murmur_core::{ErrorKind, Reply, UserId};
use murmur_db::DbError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid or expired code")]
    InvalidOrExpiredCode,

    #[error("Not a member of this chat")]
    Forbidden,

    #[error("No friend request from user {0}")]
    RequestNotFound(UserId),

    #[error("{0} already taken")]
    Taken(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[source] DbError),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::InvalidInput(_) => ErrorKind::InvalidInput,
            ServiceError::InvalidOrExpiredCode => ErrorKind::InvalidOrExpiredCode,
            ServiceError::Forbidden => ErrorKind::Forbidden,
            ServiceError::RequestNotFound(_) => ErrorKind::NotFound,
            ServiceError::Taken(_) => ErrorKind::Conflict,
            ServiceError::Config(_) => ErrorKind::ConfigError,
            ServiceError::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        ServiceError::InvalidInput(message.into())
    }
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Taken { field } => ServiceError::Taken(field),
            DbError::UnknownUsers(ids) => ServiceError::InvalidInput(format!("unknown users: {ids:?}")),
            DbError::NoDataDir => ServiceError::Config(err.to_string()),
            other => ServiceError::StoreUnavailable(other),
        }
    }
}

impl From<ServiceError> for Reply {
    fn from(err: ServiceError) -> Self {
        Reply::error(err.kind(), err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
