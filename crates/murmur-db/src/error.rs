use murmur_core::UserId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQL error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not resolve a data directory")]
    NoDataDir,

    #[error("{field} already taken")]
    Taken { field: &'static str },

    #[error("Unknown users: {0:?}")]
    UnknownUsers(Vec<UserId>),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Column named by a SQLite `UNIQUE constraint failed: users.<column>` error.
pub(crate) fn unique_violation_field(err: &sqlx::Error) -> Option<&'static str> {
    let db_err = err.as_database_error()?;
    if !db_err.is_unique_violation() {
        return None;
    }
    let message = db_err.message();
    ["phone", "nickname", "username"]
        .into_iter()
        .find(|column| message.contains(&format!("users.{column}")))
}

pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_foreign_key_violation())
}
