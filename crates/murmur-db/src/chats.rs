use std::collections::BTreeSet;

use murmur_core::{ChatId, ChatType, UserId};

use crate::error::{DbError, Result, is_foreign_key_violation};
use crate::models::{Chat, ChatMessage, ChatSummary, Message};
use crate::repository::{MurmurDb, missing_users};

// Bumps the global activity counter; breaks recency ties between chats
// touched within the same millisecond.
const NEXT_ACTIVITY: &str = "(SELECT COALESCE((SELECT MAX(activity_seq) FROM chats), 0) + 1)";

impl MurmurDb {
    /// Creates a chat with `creator_id` plus `member_ids` as members, each
    /// exactly once. The chat row and all memberships commit together, or
    /// nothing does if any member is unknown.
    pub async fn create_chat(
        &self,
        creator_id: UserId,
        chat_type: ChatType,
        name: Option<&str>,
        member_ids: &[UserId],
    ) -> Result<ChatId> {
        let members: BTreeSet<UserId> = std::iter::once(creator_id)
            .chain(member_ids.iter().copied())
            .collect();
        let now = self.now();
        let mut tx = self.pool.begin().await?;

        // Write first so the transaction holds the write lock from the start.
        let chat_id: ChatId = sqlx::query_scalar(&format!(
            "INSERT INTO chats (type, name, created_by, created_at, updated_at, activity_seq)
             VALUES (?, ?, ?, ?, ?, {NEXT_ACTIVITY}) RETURNING id"
        ))
        .bind(chat_type)
        .bind(name)
        .bind(creator_id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|err| {
            if is_foreign_key_violation(&err) {
                DbError::UnknownUsers(vec![creator_id])
            } else {
                err.into()
            }
        })?;

        let missing = missing_users(&mut tx, members.iter().copied()).await?;
        if !missing.is_empty() {
            return Err(DbError::UnknownUsers(missing));
        }

        for &member in &members {
            sqlx::query(
                "INSERT INTO chat_members (chat_id, user_id, joined_at) VALUES (?, ?, ?)
                 ON CONFLICT(chat_id, user_id) DO NOTHING",
            )
            .bind(chat_id)
            .bind(member)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            "Created {} chat {} by {} with {} members",
            chat_type,
            chat_id,
            creator_id,
            members.len()
        );
        Ok(chat_id)
    }

    pub async fn get_chat(&self, chat_id: ChatId) -> Result<Option<Chat>> {
        Ok(sqlx::query_as::<_, Chat>(
            "SELECT id, type, name, created_by, created_at, updated_at FROM chats WHERE id = ?",
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn is_member(&self, chat_id: ChatId, user_id: UserId) -> Result<bool> {
        let found: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM chat_members WHERE chat_id = ? AND user_id = ?)",
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(found != 0)
    }

    pub async fn chat_members(&self, chat_id: ChatId) -> Result<Vec<UserId>> {
        Ok(sqlx::query_scalar(
            "SELECT user_id FROM chat_members WHERE chat_id = ? ORDER BY user_id",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Appends a message if `sender_id` is a member of the chat and advances
    /// the chat's recency in the same transaction.
    ///
    /// Returns `None`, writing nothing, for a non-member. The membership test
    /// is part of the insert statement itself.
    pub async fn insert_message(
        &self,
        chat_id: ChatId,
        sender_id: UserId,
        text: &str,
    ) -> Result<Option<Message>> {
        let now = self.now();
        let mut tx = self.pool.begin().await?;

        let message = sqlx::query_as::<_, Message>(
            r#"INSERT INTO messages (chat_id, user_id, text, created_at)
               SELECT ?, ?, ?, ?
               WHERE EXISTS (SELECT 1 FROM chat_members WHERE chat_id = ? AND user_id = ?)
               RETURNING *"#,
        )
        .bind(chat_id)
        .bind(sender_id)
        .bind(text)
        .bind(now)
        .bind(chat_id)
        .bind(sender_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(message) = message else {
            return Ok(None);
        };

        sqlx::query(&format!(
            "UPDATE chats SET updated_at = MAX(updated_at, ?), activity_seq = {NEXT_ACTIVITY}
             WHERE id = ?"
        ))
        .bind(message.created_at)
        .bind(chat_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!("Message {} appended to chat {}", message.id, chat_id);
        Ok(Some(message))
    }

    /// The newest `limit` messages of a chat, oldest first, with sender nicknames.
    pub async fn list_messages(&self, chat_id: ChatId, limit: i64) -> Result<Vec<ChatMessage>> {
        Ok(sqlx::query_as::<_, ChatMessage>(
            r#"SELECT * FROM (
                   SELECT m.id, m.chat_id, m.user_id, u.nickname, m.text, m.created_at
                   FROM messages m
                   JOIN users u ON m.user_id = u.id
                   WHERE m.chat_id = ?
                   ORDER BY m.created_at DESC, m.id DESC
                   LIMIT ?
               )
               ORDER BY created_at ASC, id ASC"#,
        )
        .bind(chat_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn count_messages(&self, chat_id: ChatId) -> Result<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE chat_id = ?")
            .bind(chat_id)
            .fetch_one(&self.pool)
            .await?)
    }

    /// Chats `user_id` belongs to, most recently active first.
    pub async fn list_chats(&self, user_id: UserId) -> Result<Vec<ChatSummary>> {
        Ok(sqlx::query_as::<_, ChatSummary>(
            r#"SELECT c.id, c.type, c.name, c.updated_at,
                      (SELECT COUNT(*) FROM chat_members WHERE chat_id = c.id) AS member_count
               FROM chats c
               JOIN chat_members cm ON c.id = cm.chat_id
               WHERE cm.user_id = ?
               ORDER BY c.updated_at DESC, c.activity_seq DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }
}
