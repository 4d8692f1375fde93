use murmur_core::{
    ChatData, ChatId, ChatType, FriendData, FriendshipStatus, MessageData, MessageId, UserData,
    UserId,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub phone: String,
    pub nickname: String,
    pub username: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: UserId,
    pub nickname: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct VerificationCode {
    pub id: i64,
    pub phone: String,
    pub code: String,
    pub expires_at: i64,
    pub verified: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Friendship {
    pub id: i64,
    pub user_id: UserId,
    pub friend_id: UserId,
    pub status: FriendshipStatus,
    pub created_at: i64,
}

/// The other party of a friendship edge, as seen from one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FriendEntry {
    pub id: UserId,
    pub nickname: String,
    pub username: String,
    pub status: FriendshipStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Chat {
    pub id: ChatId,
    #[sqlx(rename = "type")]
    pub chat_type: ChatType,
    pub name: Option<String>,
    pub created_by: UserId,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatSummary {
    pub id: ChatId,
    #[sqlx(rename = "type")]
    pub chat_type: ChatType,
    pub name: Option<String>,
    pub updated_at: i64,
    pub member_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub text: String,
    pub created_at: i64,
}

/// A message joined with its sender's nickname.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatMessage {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub nickname: String,
    pub text: String,
    pub created_at: i64,
}

impl From<User> for UserData {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            nickname: user.nickname,
            username: user.username,
        }
    }
}

impl From<UserSummary> for UserData {
    fn from(user: UserSummary) -> Self {
        Self {
            id: user.id,
            nickname: user.nickname,
            username: user.username,
        }
    }
}

impl From<FriendEntry> for FriendData {
    fn from(entry: FriendEntry) -> Self {
        Self {
            id: entry.id,
            nickname: entry.nickname,
            username: entry.username,
            status: entry.status,
        }
    }
}

impl From<ChatSummary> for ChatData {
    fn from(chat: ChatSummary) -> Self {
        Self {
            id: chat.id,
            chat_type: chat.chat_type,
            name: chat.name,
            updated_at: chat.updated_at,
            member_count: chat.member_count,
        }
    }
}

impl From<Message> for MessageData {
    fn from(msg: Message) -> Self {
        Self {
            id: msg.id,
            chat_id: msg.chat_id,
            user_id: msg.user_id,
            nickname: None,
            text: msg.text,
            created_at: msg.created_at,
        }
    }
}

impl From<ChatMessage> for MessageData {
    fn from(msg: ChatMessage) -> Self {
        Self {
            id: msg.id,
            chat_id: msg.chat_id,
            user_id: msg.user_id,
            nickname: Some(msg.nickname),
            text: msg.text,
            created_at: msg.created_at,
        }
    }
}
