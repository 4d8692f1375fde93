use murmur_core::UserId;

use crate::error::{DbError, Result, unique_violation_field};
use crate::models::{User, UserSummary, VerificationCode};
use crate::repository::MurmurDb;

impl MurmurDb {
    /// Records a new unverified code. Earlier codes for the phone stay valid
    /// until they expire or are consumed.
    pub async fn insert_code(&self, phone: &str, code: &str, ttl_ms: i64) -> Result<VerificationCode> {
        let now = self.now();

        Ok(sqlx::query_as::<_, VerificationCode>(
            "INSERT INTO sms_codes (phone, code, expires_at, verified, created_at)
             VALUES (?, ?, ?, 0, ?) RETURNING *",
        )
        .bind(phone)
        .bind(code)
        .bind(now + ttl_ms)
        .bind(now)
        .fetch_one(&self.pool)
        .await?)
    }

    /// Marks the newest unverified, unexpired row matching `phone` and `code`
    /// as verified and returns it. Selection and update are one statement, so
    /// two concurrent attempts cannot both consume the same row.
    pub async fn consume_code(&self, phone: &str, code: &str) -> Result<Option<VerificationCode>> {
        let now = self.now();

        Ok(sqlx::query_as::<_, VerificationCode>(
            r#"UPDATE sms_codes SET verified = 1
               WHERE id = (
                   SELECT id FROM sms_codes
                   WHERE phone = ? AND code = ? AND verified = 0 AND expires_at > ?
                   ORDER BY created_at DESC, id DESC
                   LIMIT 1
               )
               RETURNING *"#,
        )
        .bind(phone)
        .bind(code)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn codes_for_phone(&self, phone: &str) -> Result<Vec<VerificationCode>> {
        Ok(sqlx::query_as::<_, VerificationCode>(
            "SELECT * FROM sms_codes WHERE phone = ? ORDER BY created_at, id",
        )
        .bind(phone)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Inserts a user. Phone, nickname and username uniqueness is enforced by
    /// the table constraints in the same statement as the insert.
    pub async fn create_user(&self, phone: &str, nickname: &str, username: &str) -> Result<User> {
        let now = self.now();

        let result = sqlx::query_as::<_, User>(
            "INSERT INTO users (phone, nickname, username, created_at) VALUES (?, ?, ?, ?) RETURNING *",
        )
        .bind(phone)
        .bind(nickname)
        .bind(username)
        .bind(now)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => {
                tracing::info!("Registered user {} ({})", user.id, user.username);
                Ok(user)
            }
            Err(err) => match unique_violation_field(&err) {
                Some(field) => Err(DbError::Taken { field }),
                None => Err(err.into()),
            },
        }
    }

    pub async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE phone = ?")
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Case-insensitive substring search over username and nickname.
    pub async fn search_users(&self, search: &str, limit: i64) -> Result<Vec<UserSummary>> {
        if search.is_empty() {
            return Ok(sqlx::query_as::<_, UserSummary>(
                "SELECT id, nickname, username FROM users ORDER BY id LIMIT ?",
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await?);
        }

        let pattern = format!("%{}%", escape_like(search));
        Ok(sqlx::query_as::<_, UserSummary>(
            r#"SELECT id, nickname, username FROM users
               WHERE username LIKE ? ESCAPE '\' OR nickname LIKE ? ESCAPE '\'
               ORDER BY id
               LIMIT ?"#,
        )
        .bind(pattern.as_str())
        .bind(pattern.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::repository::tests::test_db;

    const TTL: i64 = 5 * 60 * 1000;

    #[tokio::test]
    async fn code_is_consumed_once() {
        let (db, _) = test_db().await;
        db.insert_code("+15551234", "482913", TTL).await.unwrap();

        let first = db.consume_code("+15551234", "482913").await.unwrap();
        assert!(first.is_some_and(|c| c.verified));

        let replay = db.consume_code("+15551234", "482913").await.unwrap();
        assert!(replay.is_none());
    }

    #[tokio::test]
    async fn expired_code_does_not_match() {
        let (db, clock) = test_db().await;
        db.insert_code("+15551234", "482913", TTL).await.unwrap();
        clock.advance(Duration::from_secs(6 * 60));
        assert!(db.consume_code("+15551234", "482913").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn code_expires_exactly_at_deadline() {
        let (db, clock) = test_db().await;
        db.insert_code("+15551234", "111111", TTL).await.unwrap();
        clock.advance(Duration::from_millis(TTL as u64));
        assert!(db.consume_code("+15551234", "111111").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn older_code_stays_valid_after_reissue() {
        let (db, clock) = test_db().await;
        let older = db.insert_code("+15551234", "111111", TTL).await.unwrap();
        clock.advance(Duration::from_secs(30));
        db.insert_code("+15551234", "222222", TTL).await.unwrap();

        let consumed = db.consume_code("+15551234", "111111").await.unwrap().unwrap();
        assert_eq!(consumed.id, older.id);

        let codes = db.codes_for_phone("+15551234").await.unwrap();
        assert_eq!(codes.iter().filter(|c| c.verified).count(), 1);
    }

    #[tokio::test]
    async fn newest_matching_row_wins() {
        let (db, clock) = test_db().await;
        db.insert_code("+15551234", "333333", TTL).await.unwrap();
        clock.advance(Duration::from_secs(10));
        let newer = db.insert_code("+15551234", "333333", TTL).await.unwrap();

        let consumed = db.consume_code("+15551234", "333333").await.unwrap().unwrap();
        assert_eq!(consumed.id, newer.id);

        // The older duplicate is still outstanding.
        assert!(db.consume_code("+15551234", "333333").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn code_is_bound_to_phone() {
        let (db, _) = test_db().await;
        db.insert_code("+15551234", "482913", TTL).await.unwrap();
        assert!(db.consume_code("+15559999", "482913").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_user_fields_are_taken() {
        let (db, _) = test_db().await;
        db.create_user("+15550001", "Ann", "ann").await.unwrap();

        let err = db.create_user("+15550002", "Ann", "ann2").await.unwrap_err();
        assert!(matches!(err, DbError::Taken { field: "nickname" }));

        let err = db.create_user("+15550003", "Bea", "ann").await.unwrap_err();
        assert!(matches!(err, DbError::Taken { field: "username" }));

        let err = db.create_user("+15550001", "Cid", "cid").await.unwrap_err();
        assert!(matches!(err, DbError::Taken { field: "phone" }));
    }

    #[tokio::test]
    async fn search_matches_username_or_nickname() {
        let (db, _) = test_db().await;
        db.create_user("+15550001", "Annie", "ann").await.unwrap();
        db.create_user("+15550002", "Bob", "bobby_ann").await.unwrap();
        db.create_user("+15550003", "Cid", "cid").await.unwrap();

        let found = db.search_users("ANN", 20).await.unwrap();
        let names: Vec<_> = found.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["ann", "bobby_ann"]);

        let all = db.search_users("", 2).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn search_treats_wildcards_literally() {
        let (db, _) = test_db().await;
        db.create_user("+15550001", "Ann", "ann").await.unwrap();
        db.create_user("+15550002", "Bob", "bob_b").await.unwrap();

        let found = db.search_users("_", 20).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username, "bob_b");
        assert!(db.search_users("%", 20).await.unwrap().is_empty());
    }

    #[test]
    fn escape_like_escapes_wildcards() {
        assert_eq!(escape_like(r"a%b_c\d"), r"a\%b\_c\\d");
    }
}
