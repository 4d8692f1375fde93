use murmur_core::{Action, ChatType, Reply, Request, UserId, Verification};

use crate::error::{Result, ServiceError};
use crate::service::MurmurService;
use crate::validate::require;

impl MurmurService {
    /// Runs one decoded request and always produces a reply; failures become
    /// [`Reply::Error`].
    pub async fn handle(&self, request: Request) -> Reply {
        let name = request.action.name();
        match self.dispatch(request.caller, request.action).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::debug!("Action {} failed: {}", name, err);
                err.into()
            }
        }
    }

    /// Decodes and runs one JSON request line.
    pub async fn handle_line(&self, line: &str) -> Reply {
        match Request::from_line(line) {
            Ok(request) => self.handle(request).await,
            Err(reply) => reply,
        }
    }

    pub async fn dispatch(&self, caller: Option<UserId>, action: Action) -> Result<Reply> {
        if !action.is_public() && caller.is_none() {
            return Err(ServiceError::invalid(format!(
                "{} requires an authenticated caller",
                action.name()
            )));
        }
        let caller = caller.unwrap_or_default();

        match action {
            Action::SendCode { phone } => {
                let issued = self.issue_code(&require(phone, "phone")?).await?;
                Ok(Reply::CodeSent {
                    phone: issued.phone,
                    expires_at: issued.expires_at,
                    dev_code: issued.code,
                })
            }

            Action::VerifyCode { phone, code } => {
                let phone = require(phone, "phone")?;
                let code = require(code, "code")?;
                let verification = self.verify_code(&phone, &code).await?;
                Ok(Reply::Verified {
                    user_exists: verification.user_exists(),
                    user: match verification {
                        Verification::ExistingUser(user) => Some(user),
                        Verification::NewUser => None,
                    },
                })
            }

            Action::Register {
                phone,
                nickname,
                username,
            } => {
                let user = self
                    .register_user(
                        &require(phone, "phone")?,
                        &require(nickname, "nickname")?,
                        &require(username, "username")?,
                    )
                    .await?;
                Ok(Reply::Registered { user: user.into() })
            }

            Action::SearchUsers { search } => {
                let users = self.search_users(search.as_deref().unwrap_or_default()).await?;
                Ok(Reply::Users {
                    users: users.into_iter().map(Into::into).collect(),
                })
            }

            Action::SendRequest { friend_id } => {
                self.send_request(caller, require(friend_id, "friend_id")?)
                    .await?;
                Ok(Reply::RequestSent)
            }

            Action::AcceptRequest { friend_id } => {
                self.accept_request(caller, require(friend_id, "friend_id")?)
                    .await?;
                Ok(Reply::RequestAccepted)
            }

            Action::ListFriends => Ok(Reply::Friends {
                friends: self
                    .list_friends(caller)
                    .await?
                    .into_iter()
                    .map(Into::into)
                    .collect(),
            }),

            Action::ListRequests => Ok(Reply::Requests {
                requests: self
                    .list_requests(caller)
                    .await?
                    .into_iter()
                    .map(Into::into)
                    .collect(),
            }),

            Action::CreateChat {
                chat_type,
                name,
                member_ids,
            } => {
                let chat_id = self
                    .create_chat(
                        caller,
                        chat_type.unwrap_or(ChatType::Private),
                        name.as_deref(),
                        &member_ids,
                    )
                    .await?;
                Ok(Reply::ChatCreated { chat_id })
            }

            Action::SendMessage { chat_id, text } => {
                let chat_id = require(chat_id, "chat_id")?;
                let text = require(text, "text")?;
                let message = self.send_message(caller, chat_id, &text).await?;
                Ok(Reply::MessageSent {
                    message: message.into(),
                })
            }

            Action::ListMessages { chat_id } => {
                let chat_id = require(chat_id, "chat_id")?;
                Ok(Reply::Messages {
                    messages: self
                        .list_messages(caller, chat_id)
                        .await?
                        .into_iter()
                        .map(Into::into)
                        .collect(),
                })
            }

            Action::ListChats => Ok(Reply::Chats {
                chats: self
                    .list_chats(caller)
                    .await?
                    .into_iter()
                    .map(Into::into)
                    .collect(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use murmur_core::ErrorKind;

    use super::*;
    use crate::service::tests::test_service;

    fn kind(reply: &Reply) -> Option<ErrorKind> {
        match reply {
            Reply::Error { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    #[tokio::test]
    async fn private_actions_need_a_caller() {
        let (service, _) = test_service(&[]).await;
        let reply = service.handle(Request::new(None, Action::ListChats)).await;
        assert_eq!(kind(&reply), Some(ErrorKind::InvalidInput));
    }

    #[tokio::test]
    async fn missing_fields_are_invalid_input() {
        let (service, _) = test_service(&[]).await;
        for line in [
            r#"{"action":"send_code"}"#,
            r#"{"action":"verify_code","phone":"+15551234"}"#,
            r#"{"caller":1,"action":"send_message","chat_id":1}"#,
            r#"{"caller":1,"action":"list_messages"}"#,
            r#"{"caller":1,"action":"send_request"}"#,
        ] {
            let reply = service.handle_line(line).await;
            assert_eq!(kind(&reply), Some(ErrorKind::InvalidInput), "{line}");
        }
    }

    #[tokio::test]
    async fn send_code_returns_dev_code() {
        let (service, _) = test_service(&["654321"]).await;
        let reply = service
            .handle_line(r#"{"action":"send_code","phone":"+15551234"}"#)
            .await;
        match reply {
            Reply::CodeSent { phone, dev_code, .. } => {
                assert_eq!(phone, "+15551234");
                assert_eq!(dev_code, "654321");
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_chat_defaults_to_private() {
        let (service, _) = test_service(&[]).await;
        let a = service.register_user("+15550001", "Ann", "ann").await.unwrap();
        let b = service.register_user("+15550002", "Bob", "bob").await.unwrap();

        let reply = service
            .dispatch(
                Some(a.id),
                Action::CreateChat {
                    chat_type: None,
                    name: None,
                    member_ids: vec![b.id],
                },
            )
            .await
            .unwrap();
        let Reply::ChatCreated { chat_id } = reply else {
            panic!("unexpected reply: {reply:?}");
        };
        let chat = service.db().get_chat(chat_id).await.unwrap().unwrap();
        assert_eq!(chat.chat_type, ChatType::Private);
    }

    #[tokio::test]
    async fn forbidden_send_maps_to_forbidden_kind() {
        let (service, _) = test_service(&[]).await;
        let a = service.register_user("+15550001", "Ann", "ann").await.unwrap();
        let line = format!(
            r#"{{"caller":{},"action":"send_message","chat_id":42,"text":"hi"}}"#,
            a.id
        );
        let reply = service.handle_line(&line).await;
        assert_eq!(kind(&reply), Some(ErrorKind::Forbidden));
    }
}
