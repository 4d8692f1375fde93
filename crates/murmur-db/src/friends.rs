use murmur_core::UserId;

use crate::error::{DbError, Result, is_foreign_key_violation};
use crate::models::{FriendEntry, Friendship};
use crate::repository::{MurmurDb, missing_users};

impl MurmurDb {
    /// Inserts the pending edge `user_id -> friend_id` unless a row for that
    /// ordered pair already exists. Returns whether a row was inserted.
    pub async fn insert_friend_request(&self, user_id: UserId, friend_id: UserId) -> Result<bool> {
        let now = self.now();

        let result = sqlx::query(
            "INSERT INTO friendships (user_id, friend_id, status, created_at) VALUES (?, ?, 'pending', ?)
             ON CONFLICT(user_id, friend_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(friend_id)
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(done.rows_affected() == 1),
            Err(err) if is_foreign_key_violation(&err) => {
                let mut conn = self.pool.acquire().await?;
                Err(DbError::UnknownUsers(
                    missing_users(&mut conn, [user_id, friend_id]).await?,
                ))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Accepts the request `friend_id -> user_id` and upserts the reciprocal
    /// accepted edge `user_id -> friend_id` in one transaction.
    ///
    /// Returns `false`, writing nothing, when `friend_id` never sent a request.
    /// Accepting an already accepted request succeeds again.
    pub async fn accept_friend_request(&self, user_id: UserId, friend_id: UserId) -> Result<bool> {
        let now = self.now();
        let mut tx = self.pool.begin().await?;

        let flipped = sqlx::query(
            "UPDATE friendships SET status = 'accepted' WHERE user_id = ? AND friend_id = ?",
        )
        .bind(friend_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if flipped.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO friendships (user_id, friend_id, status, created_at) VALUES (?, ?, 'accepted', ?)
             ON CONFLICT(user_id, friend_id) DO UPDATE SET status = 'accepted'",
        )
        .bind(user_id)
        .bind(friend_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!("Friendship accepted between {} and {}", user_id, friend_id);
        Ok(true)
    }

    pub async fn get_friendship(&self, user_id: UserId, friend_id: UserId) -> Result<Option<Friendship>> {
        Ok(sqlx::query_as::<_, Friendship>(
            "SELECT * FROM friendships WHERE user_id = ? AND friend_id = ?",
        )
        .bind(user_id)
        .bind(friend_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// Accepted friends of `user_id` in either direction, each listed once.
    pub async fn list_friends(&self, user_id: UserId) -> Result<Vec<FriendEntry>> {
        Ok(sqlx::query_as::<_, FriendEntry>(
            r#"SELECT id, nickname, username, status FROM (
                   SELECT u.id, u.nickname, u.username, f.status
                   FROM friendships f
                   JOIN users u ON f.friend_id = u.id
                   WHERE f.user_id = ? AND f.status = 'accepted'
                   UNION
                   SELECT u.id, u.nickname, u.username, f.status
                   FROM friendships f
                   JOIN users u ON f.user_id = u.id
                   WHERE f.friend_id = ? AND f.status = 'accepted'
               )
               ORDER BY nickname, id"#,
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Pending requests other users have sent to `user_id`.
    pub async fn list_incoming_requests(&self, user_id: UserId) -> Result<Vec<FriendEntry>> {
        Ok(sqlx::query_as::<_, FriendEntry>(
            r#"SELECT u.id, u.nickname, u.username, f.status
               FROM friendships f
               JOIN users u ON f.user_id = u.id
               WHERE f.friend_id = ? AND f.status = 'pending'
               ORDER BY f.created_at, f.id"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use murmur_core::FriendshipStatus;

    use super::*;
    use crate::models::User;
    use crate::repository::tests::test_db;

    async fn users(db: &MurmurDb) -> (User, User, User) {
        (
            db.create_user("+15550001", "Ann", "ann").await.unwrap(),
            db.create_user("+15550002", "Bob", "bob").await.unwrap(),
            db.create_user("+15550003", "Cid", "cid").await.unwrap(),
        )
    }

    async fn edge_count(db: &MurmurDb) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM friendships")
            .fetch_one(&db.pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn duplicate_request_is_a_no_op() {
        let (db, _) = test_db().await;
        let (ann, bob, _) = users(&db).await;

        assert!(db.insert_friend_request(ann.id, bob.id).await.unwrap());
        assert!(!db.insert_friend_request(ann.id, bob.id).await.unwrap());

        assert_eq!(edge_count(&db).await, 1);
        let edge = db.get_friendship(ann.id, bob.id).await.unwrap().unwrap();
        assert_eq!(edge.status, FriendshipStatus::Pending);
    }

    #[tokio::test]
    async fn reverse_request_is_a_separate_edge() {
        let (db, _) = test_db().await;
        let (ann, bob, _) = users(&db).await;

        assert!(db.insert_friend_request(ann.id, bob.id).await.unwrap());
        assert!(db.insert_friend_request(bob.id, ann.id).await.unwrap());
        assert_eq!(edge_count(&db).await, 2);
    }

    #[tokio::test]
    async fn request_to_unknown_user_names_it() {
        let (db, _) = test_db().await;
        let (ann, _, _) = users(&db).await;

        let err = db.insert_friend_request(ann.id, 404).await.unwrap_err();
        assert!(matches!(err, DbError::UnknownUsers(ref ids) if ids == &vec![404]));
        assert_eq!(edge_count(&db).await, 0);
    }

    #[tokio::test]
    async fn accept_writes_both_edges() {
        let (db, _) = test_db().await;
        let (ann, bob, _) = users(&db).await;

        db.insert_friend_request(bob.id, ann.id).await.unwrap();
        assert!(db.accept_friend_request(ann.id, bob.id).await.unwrap());

        let forward = db.get_friendship(bob.id, ann.id).await.unwrap().unwrap();
        let reverse = db.get_friendship(ann.id, bob.id).await.unwrap().unwrap();
        assert_eq!(forward.status, FriendshipStatus::Accepted);
        assert_eq!(reverse.status, FriendshipStatus::Accepted);

        let ann_friends = db.list_friends(ann.id).await.unwrap();
        let bob_friends = db.list_friends(bob.id).await.unwrap();
        assert_eq!(ann_friends.len(), 1);
        assert_eq!(ann_friends[0].id, bob.id);
        assert_eq!(bob_friends.len(), 1);
        assert_eq!(bob_friends[0].id, ann.id);
    }

    #[tokio::test]
    async fn accept_upgrades_crossed_pending_request() {
        let (db, _) = test_db().await;
        let (ann, bob, _) = users(&db).await;

        db.insert_friend_request(ann.id, bob.id).await.unwrap();
        db.insert_friend_request(bob.id, ann.id).await.unwrap();
        assert!(db.accept_friend_request(ann.id, bob.id).await.unwrap());

        let reverse = db.get_friendship(ann.id, bob.id).await.unwrap().unwrap();
        assert_eq!(reverse.status, FriendshipStatus::Accepted);
        assert_eq!(edge_count(&db).await, 2);
    }

    #[tokio::test]
    async fn accept_without_request_writes_nothing() {
        let (db, _) = test_db().await;
        let (ann, bob, _) = users(&db).await;

        assert!(!db.accept_friend_request(ann.id, bob.id).await.unwrap());
        assert_eq!(edge_count(&db).await, 0);
        assert!(db.list_friends(ann.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn accept_twice_is_idempotent() {
        let (db, _) = test_db().await;
        let (ann, bob, _) = users(&db).await;

        db.insert_friend_request(bob.id, ann.id).await.unwrap();
        assert!(db.accept_friend_request(ann.id, bob.id).await.unwrap());
        assert!(db.accept_friend_request(ann.id, bob.id).await.unwrap());
        assert_eq!(edge_count(&db).await, 2);
        assert_eq!(db.list_friends(ann.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn pending_edges_are_not_friends() {
        let (db, _) = test_db().await;
        let (ann, bob, cid) = users(&db).await;

        db.insert_friend_request(bob.id, ann.id).await.unwrap();
        db.insert_friend_request(cid.id, ann.id).await.unwrap();
        assert!(db.list_friends(ann.id).await.unwrap().is_empty());

        let incoming = db.list_incoming_requests(ann.id).await.unwrap();
        let ids: Vec<_> = incoming.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![bob.id, cid.id]);
        assert!(incoming.iter().all(|r| r.status == FriendshipStatus::Pending));

        db.accept_friend_request(ann.id, bob.id).await.unwrap();
        let incoming = db.list_incoming_requests(ann.id).await.unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].id, cid.id);
    }

    #[tokio::test]
    async fn crossed_requests_list_each_friend_once_in_name_order() {
        let (db, _) = test_db().await;
        let (ann, bob, cid) = users(&db).await;

        db.insert_friend_request(ann.id, bob.id).await.unwrap();
        db.insert_friend_request(bob.id, ann.id).await.unwrap();
        db.insert_friend_request(cid.id, ann.id).await.unwrap();

        let (a, b) = tokio::join!(
            db.accept_friend_request(ann.id, bob.id),
            db.accept_friend_request(bob.id, ann.id),
        );
        assert!(a.unwrap());
        assert!(b.unwrap());
        assert!(db.accept_friend_request(ann.id, cid.id).await.unwrap());

        let ann_friends = db.list_friends(ann.id).await.unwrap();
        let ids: Vec<_> = ann_friends.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![bob.id, cid.id]);
        assert!(ann_friends.iter().all(|f| f.status == FriendshipStatus::Accepted));

        let bob_friends = db.list_friends(bob.id).await.unwrap();
        assert_eq!(bob_friends.len(), 1);
        assert_eq!(bob_friends[0].id, ann.id);
    }
}
