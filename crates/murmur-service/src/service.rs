use std::sync::Arc;

use murmur_core::{ChatId, ChatType, Clock, SystemClock, UserId, Verification};
use murmur_db::{ChatMessage, ChatSummary, FriendEntry, Message, MurmurDb, User, UserSummary};

use crate::codes::{CodeGenerator, OsRngCodes};
use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};
use crate::validate;

/// A code handed out by [`MurmurService::issue_code`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCode {
    pub phone: String,
    pub code: String,
    pub expires_at: i64,
}

/// The domain core. Holds no per-request state; every durable effect goes
/// through the store, so one instance can serve concurrent requests.
pub struct MurmurService {
    db: Arc<MurmurDb>,
    codes: Arc<dyn CodeGenerator>,
    config: ServiceConfig,
}

impl MurmurService {
    pub async fn new(config: ServiceConfig) -> Result<Self> {
        Self::with_parts(config, Arc::new(OsRngCodes), Arc::new(SystemClock)).await
    }

    pub async fn with_parts(
        config: ServiceConfig,
        codes: Arc<dyn CodeGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let url = match &config.database_url {
            Some(url) => url.clone(),
            None => MurmurDb::default_url()
                .map_err(|e| ServiceError::Config(format!("no database location: {e}")))?,
        };
        let db = MurmurDb::connect(&url, clock).await?;
        Ok(Self::with_db(Arc::new(db), codes, config))
    }

    pub fn with_db(db: Arc<MurmurDb>, codes: Arc<dyn CodeGenerator>, config: ServiceConfig) -> Self {
        Self { db, codes, config }
    }

    pub fn db(&self) -> &MurmurDb {
        &self.db
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    // Identity

    /// Stores a fresh code for `phone`. An unreachable store is reported as
    /// [`ServiceError::StoreUnavailable`], not as a configuration error.
    pub async fn issue_code(&self, phone: &str) -> Result<IssuedCode> {
        let phone = validate::phone(phone)?;
        let code = self.codes.generate();

        let row = self
            .db
            .insert_code(&phone, &code, self.config.code_ttl_millis())
            .await?;

        tracing::info!("Issued verification code for {}", phone);
        tracing::debug!("Code for {}: {}", phone, code);

        Ok(IssuedCode {
            phone,
            code,
            expires_at: row.expires_at,
        })
    }

    pub async fn verify_code(&self, phone: &str, code: &str) -> Result<Verification> {
        let phone = validate::phone(phone)?;
        let code = validate::code(code)?;

        if self.db.consume_code(&phone, &code).await?.is_none() {
            tracing::warn!("Rejected verification attempt for {}", phone);
            return Err(ServiceError::InvalidOrExpiredCode);
        }

        match self.db.find_user_by_phone(&phone).await? {
            Some(user) => {
                tracing::info!("Verified {} as user {}", phone, user.id);
                Ok(Verification::ExistingUser(user.into()))
            }
            None => {
                tracing::info!("Verified {}, no account yet", phone);
                Ok(Verification::NewUser)
            }
        }
    }

    pub async fn register_user(&self, phone: &str, nickname: &str, username: &str) -> Result<User> {
        let phone = validate::phone(phone)?;
        let nickname = validate::nickname(nickname)?;
        let username = validate::username(username)?;

        Ok(self.db.create_user(&phone, &nickname, &username).await?)
    }

    pub async fn get_user(&self, user_id: UserId) -> Result<Option<User>> {
        Ok(self.db.get_user(user_id).await?)
    }

    pub async fn search_users(&self, search: &str) -> Result<Vec<UserSummary>> {
        Ok(self
            .db
            .search_users(search.trim(), self.config.search_limit)
            .await?)
    }

    // Friendship graph

    /// Sends a request from `user_id` to `friend_id`. Repeating it succeeds
    /// without writing anything.
    pub async fn send_request(&self, user_id: UserId, friend_id: UserId) -> Result<()> {
        if user_id == friend_id {
            return Err(ServiceError::invalid("cannot befriend yourself"));
        }

        if self.db.insert_friend_request(user_id, friend_id).await? {
            tracing::info!("Friend request {} -> {}", user_id, friend_id);
        } else {
            tracing::debug!("Friend request {} -> {} already exists", user_id, friend_id);
        }
        Ok(())
    }

    /// `user_id` accepts the request `friend_id` sent earlier.
    pub async fn accept_request(&self, user_id: UserId, friend_id: UserId) -> Result<()> {
        if user_id == friend_id {
            return Err(ServiceError::invalid("cannot befriend yourself"));
        }

        if !self.db.accept_friend_request(user_id, friend_id).await? {
            return Err(ServiceError::RequestNotFound(friend_id));
        }
        Ok(())
    }

    pub async fn list_friends(&self, user_id: UserId) -> Result<Vec<FriendEntry>> {
        Ok(self.db.list_friends(user_id).await?)
    }

    pub async fn list_requests(&self, user_id: UserId) -> Result<Vec<FriendEntry>> {
        Ok(self.db.list_incoming_requests(user_id).await?)
    }

    // Chats

    pub async fn create_chat(
        &self,
        creator_id: UserId,
        chat_type: ChatType,
        name: Option<&str>,
        member_ids: &[UserId],
    ) -> Result<ChatId> {
        let name = validate::chat_name(name)?;

        if chat_type == ChatType::Private {
            let others = member_ids
                .iter()
                .filter(|&&id| id != creator_id)
                .collect::<std::collections::BTreeSet<_>>();
            if others.len() != 1 {
                return Err(ServiceError::invalid(
                    "a private chat needs exactly one other member",
                ));
            }
        }

        Ok(self
            .db
            .create_chat(creator_id, chat_type, name.as_deref(), member_ids)
            .await?)
    }

    pub async fn send_message(&self, sender_id: UserId, chat_id: ChatId, text: &str) -> Result<Message> {
        let text = validate::message_text(text)?;

        match self.db.insert_message(chat_id, sender_id, text).await? {
            Some(message) => Ok(message),
            None => {
                tracing::warn!("User {} is not a member of chat {}", sender_id, chat_id);
                Err(ServiceError::Forbidden)
            }
        }
    }

    /// Recent history of a chat the caller belongs to.
    pub async fn list_messages(&self, user_id: UserId, chat_id: ChatId) -> Result<Vec<ChatMessage>> {
        if !self.db.is_member(chat_id, user_id).await? {
            return Err(ServiceError::Forbidden);
        }
        Ok(self
            .db
            .list_messages(chat_id, self.config.message_limit)
            .await?)
    }

    pub async fn list_chats(&self, user_id: UserId) -> Result<Vec<ChatSummary>> {
        Ok(self.db.list_chats(user_id).await?)
    }
}
