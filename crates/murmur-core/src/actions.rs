use serde::{Deserialize, Serialize};

use crate::types::{ChatData, ChatId, ChatType, FriendData, MessageData, UserData, UserId};

/// Inbound operations, one per action name. Payload fields are optional here
/// so a missing field can be reported as invalid input instead of a decode
/// failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    SendCode {
        phone: Option<String>,
    },
    VerifyCode {
        phone: Option<String>,
        code: Option<String>,
    },
    Register {
        phone: Option<String>,
        nickname: Option<String>,
        username: Option<String>,
    },
    SearchUsers {
        search: Option<String>,
    },
    SendRequest {
        friend_id: Option<UserId>,
    },
    AcceptRequest {
        friend_id: Option<UserId>,
    },
    ListFriends,
    ListRequests,
    CreateChat {
        #[serde(rename = "type")]
        chat_type: Option<ChatType>,
        name: Option<String>,
        #[serde(default)]
        member_ids: Vec<UserId>,
    },
    SendMessage {
        chat_id: Option<ChatId>,
        text: Option<String>,
    },
    ListMessages {
        chat_id: Option<ChatId>,
    },
    ListChats,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::SendCode { .. } => "send_code",
            Action::VerifyCode { .. } => "verify_code",
            Action::Register { .. } => "register",
            Action::SearchUsers { .. } => "search_users",
            Action::SendRequest { .. } => "send_request",
            Action::AcceptRequest { .. } => "accept_request",
            Action::ListFriends => "list_friends",
            Action::ListRequests => "list_requests",
            Action::CreateChat { .. } => "create_chat",
            Action::SendMessage { .. } => "send_message",
            Action::ListMessages { .. } => "list_messages",
            Action::ListChats => "list_chats",
        }
    }

    /// Whether the action may run without a resolved caller.
    pub fn is_public(&self) -> bool {
        matches!(
            self,
            Action::SendCode { .. }
                | Action::VerifyCode { .. }
                | Action::Register { .. }
                | Action::SearchUsers { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    InvalidOrExpiredCode,
    Forbidden,
    NotFound,
    Conflict,
    ConfigError,
    StoreUnavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    CodeSent {
        phone: String,
        expires_at: i64,
        dev_code: String,
    },
    Verified {
        user_exists: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user: Option<UserData>,
    },
    Registered {
        user: UserData,
    },
    Users {
        users: Vec<UserData>,
    },
    RequestSent,
    RequestAccepted,
    Friends {
        friends: Vec<FriendData>,
    },
    Requests {
        requests: Vec<FriendData>,
    },
    ChatCreated {
        chat_id: ChatId,
    },
    MessageSent {
        message: MessageData,
    },
    Messages {
        messages: Vec<MessageData>,
    },
    Chats {
        chats: Vec<ChatData>,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}

impl Reply {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Reply::Error {
            kind,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_payload_fields_decode_as_none() {
        let action: Action = serde_json::from_str(r#"{"action":"send_message"}"#).unwrap();
        assert_eq!(
            action,
            Action::SendMessage {
                chat_id: None,
                text: None
            }
        );
    }

    #[test]
    fn create_chat_reads_type_and_members() {
        let action: Action = serde_json::from_str(
            r#"{"action":"create_chat","type":"group","name":"crew","member_ids":[2,3]}"#,
        )
        .unwrap();
        assert_eq!(
            action,
            Action::CreateChat {
                chat_type: Some(ChatType::Group),
                name: Some("crew".into()),
                member_ids: vec![2, 3],
            }
        );
        assert!(!action.is_public());
    }

    #[test]
    fn unit_actions_decode() {
        let action: Action = serde_json::from_str(r#"{"action":"list_chats"}"#).unwrap();
        assert_eq!(action, Action::ListChats);
        assert_eq!(action.name(), "list_chats");
    }

    #[test]
    fn new_user_verification_omits_user() {
        let reply = Reply::Verified {
            user_exists: false,
            user: None,
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["type"], "verified");
        assert_eq!(json["user_exists"], false);
        assert!(json.get("user").is_none());
    }
}
