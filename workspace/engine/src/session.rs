//! Session Store Accessor: creates sessions at login and validates tokens
//! against the persisted record and its expiry instant.

use chrono::{DateTime, Duration, Utc};
use model::entities::session;
use rand::{Rng, distributions::Alphanumeric};
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set};
use tracing::{debug, info, instrument, trace};

use crate::error::Result;

/// Length of the opaque session identifier.
pub const TOKEN_LEN: usize = 48;

/// Generates a fresh random opaque token.
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Duration::hours(24))
    }
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Persists a new session for `user_id`, valid until `now + ttl`.
    #[instrument(skip(self, db))]
    pub async fn create<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: i32,
        now: DateTime<Utc>,
    ) -> Result<session::Model> {
        trace!("Entering SessionStore::create");

        let session = session::ActiveModel {
            id: Set(generate_token()),
            user_id: Set(user_id),
            expires_at: Set(now + self.ttl),
            created_at: Set(now),
        }
        .insert(db)
        .await?;

        info!(
            "Session created for user {} (expires at {})",
            user_id, session.expires_at
        );
        Ok(session)
    }

    /// Looks the token up; `None` when it is unknown or expired at `now`.
    ///
    /// Expired rows are left in place.
    #[instrument(skip(self, db, token))]
    pub async fn find_valid<C: ConnectionTrait>(
        &self,
        db: &C,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<session::Model>> {
        let Some(session) = session::Entity::find_by_id(token.to_string()).one(db).await? else {
            debug!("No session matches the presented token");
            return Ok(None);
        };

        if session.is_valid_at(now) {
            Ok(Some(session))
        } else {
            debug!(
                "Session for user {} expired at {}",
                session.user_id, session.expires_at
            );
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{insert_user, setup_db};
    use model::entities::user::UserRole;

    #[test]
    fn tokens_are_random_and_alphanumeric() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn created_session_is_valid_until_expiry() {
        let db = setup_db().await;
        let user = insert_user(&db, "sess@example.com", UserRole::Staff, None, 0).await;
        let store = SessionStore::default();
        let now = Utc::now();

        let session = store.create(&db, user.id, now).await.unwrap();
        let lifetime = session.expires_at - now;
        assert!((lifetime - Duration::hours(24)).num_milliseconds().abs() <= 1);

        let found = store.find_valid(&db, &session.id, now).await.unwrap();
        assert_eq!(found.map(|s| s.user_id), Some(user.id));

        let almost = now + Duration::hours(24) - Duration::seconds(1);
        assert!(store.find_valid(&db, &session.id, almost).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn expired_session_is_inert_but_kept() {
        let db = setup_db().await;
        let user = insert_user(&db, "old@example.com", UserRole::Staff, None, 0).await;
        let store = SessionStore::new(Duration::minutes(5));
        let now = Utc::now();

        let session = store.create(&db, user.id, now).await.unwrap();
        let later = now + Duration::minutes(5);
        assert!(store.find_valid(&db, &session.id, later).await.unwrap().is_none());

        let row = session::Entity::find_by_id(session.id.clone())
            .one(&db)
            .await
            .unwrap();
        assert!(row.is_some());
    }

    #[tokio::test]
    async fn unknown_token_yields_none() {
        let db = setup_db().await;
        let store = SessionStore::default();
        let found = store.find_valid(&db, "nope", Utc::now()).await.unwrap();
        assert!(found.is_none());
    }
}
