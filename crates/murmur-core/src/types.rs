use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type ChatId = i64;
pub type MessageId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type), sqlx(rename_all = "lowercase"))]
pub enum ChatType {
    Private,
    Group,
}

impl ChatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatType::Private => "private",
            ChatType::Group => "group",
        }
    }
}

impl fmt::Display for ChatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "private" => Ok(ChatType::Private),
            "group" => Ok(ChatType::Group),
            other => Err(format!("unknown chat type: {other}")),
        }
    }
}

/// State of one directed friendship edge. There is no terminal
/// rejected state: an edge is either absent, pending or accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type), sqlx(rename_all = "lowercase"))]
pub enum FriendshipStatus {
    Pending,
    Accepted,
}

impl FriendshipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FriendshipStatus::Pending => "pending",
            FriendshipStatus::Accepted => "accepted",
        }
    }
}

impl fmt::Display for FriendshipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub id: UserId,
    pub nickname: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendData {
    pub id: UserId,
    pub nickname: String,
    pub username: String,
    pub status: FriendshipStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatData {
    pub id: ChatId,
    #[serde(rename = "type")]
    pub chat_type: ChatType,
    pub name: Option<String>,
    pub updated_at: i64,
    pub member_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageData {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub user_id: UserId,
    /// Sender nickname; absent on the echo returned by a send.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    pub text: String,
    pub created_at: i64,
}

/// Outcome of a successful code verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    NewUser,
    ExistingUser(UserData),
}

impl Verification {
    pub fn user_exists(&self) -> bool {
        matches!(self, Verification::ExistingUser(_))
    }

    pub fn user(&self) -> Option<&UserData> {
        match self {
            Verification::ExistingUser(user) => Some(user),
            Verification::NewUser => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_type_parses_case_insensitively() {
        assert_eq!("Group".parse::<ChatType>().unwrap(), ChatType::Group);
        assert_eq!(" private ".parse::<ChatType>().unwrap(), ChatType::Private);
        assert!("channel".parse::<ChatType>().is_err());
    }

    #[test]
    fn chat_data_uses_type_on_the_wire() {
        let chat = ChatData {
            id: 7,
            chat_type: ChatType::Group,
            name: Some("crew".into()),
            updated_at: 1,
            member_count: 3,
        };
        let json = serde_json::to_value(&chat).unwrap();
        assert_eq!(json["type"], "group");
        assert_eq!(json["member_count"], 3);
    }
}
