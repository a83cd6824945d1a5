//! Identity Resolver: turns the credentials carried by a request into an
//! authenticated principal. This is the single entry point other components
//! use to learn who a request is.

use chrono::{DateTime, Utc};
use model::entities::user;
use sea_orm::{ConnectionTrait, EntityTrait};
use tracing::{debug, instrument, warn};

use crate::error::{EngineError, Result};
use crate::session::SessionStore;

/// Raw credential-bearing header values of a request.
#[derive(Debug, Clone, Copy, Default)]
pub struct Credentials<'a> {
    /// Full `Cookie` header value.
    pub cookie_header: Option<&'a str>,
    /// Full `Authorization` header value.
    pub authorization: Option<&'a str>,
}

/// The authenticated caller. Carries nothing beyond the user id: role and
/// enterprise must be read from the store by whoever needs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i32,
}

#[derive(Debug, Clone)]
pub struct IdentityResolver {
    sessions: SessionStore,
    cookie_name: String,
}

impl IdentityResolver {
    pub fn new(sessions: SessionStore, cookie_name: impl Into<String>) -> Self {
        Self {
            sessions,
            cookie_name: cookie_name.into(),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Picks the token: the session cookie wins, the `Authorization` header
    /// is the fallback.
    pub fn extract_token<'a>(&self, credentials: &Credentials<'a>) -> Option<&'a str> {
        credentials
            .cookie_header
            .and_then(|header| cookie_value(header, &self.cookie_name))
            .or_else(|| credentials.authorization.and_then(strip_scheme))
    }

    /// Resolves the request's principal. Absent, unknown and expired tokens
    /// all give `Ok(None)`; only storage failures are errors.
    #[instrument(skip(self, db, credentials))]
    pub async fn resolve<C: ConnectionTrait>(
        &self,
        db: &C,
        credentials: &Credentials<'_>,
        now: DateTime<Utc>,
    ) -> Result<Option<Principal>> {
        let Some(token) = self.extract_token(credentials) else {
            debug!("Request carries no session token");
            return Ok(None);
        };

        let principal = self
            .sessions
            .find_valid(db, token, now)
            .await?
            .map(|session| Principal {
                user_id: session.user_id,
            });

        if let Some(principal) = principal {
            debug!("Resolved principal user {}", principal.user_id);
        }
        Ok(principal)
    }

    /// Like [`resolve`](Self::resolve) but turns a missing principal into
    /// [`EngineError::Unauthenticated`].
    pub async fn require<C: ConnectionTrait>(
        &self,
        db: &C,
        credentials: &Credentials<'_>,
        now: DateTime<Utc>,
    ) -> Result<Principal> {
        self.resolve(db, credentials, now)
            .await?
            .ok_or(EngineError::Unauthenticated)
    }
}

/// Loads the user row behind a principal. A principal whose user has since
/// been deleted is treated as unauthenticated.
pub async fn load_actor<C: ConnectionTrait>(db: &C, principal: &Principal) -> Result<user::Model> {
    match user::Entity::find_by_id(principal.user_id).one(db).await? {
        Some(actor) => Ok(actor),
        None => {
            warn!("Session refers to missing user {}", principal.user_id);
            Err(EngineError::Unauthenticated)
        }
    }
}

fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"'))
        .filter(|value| !value.is_empty())
}

/// Strips a leading auth scheme (`Bearer abc` -> `abc`) and surrounding
/// whitespace. A bare token is accepted as is.
fn strip_scheme(value: &str) -> Option<&str> {
    let value = value.trim();
    let token = match value.split_once(char::is_whitespace) {
        Some((scheme, rest)) if scheme.chars().all(|c| c.is_ascii_alphabetic()) => rest.trim(),
        // A scheme with nothing after it
        None if value.eq_ignore_ascii_case("bearer") => "",
        _ => value,
    };
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{insert_user, setup_db};
    use chrono::Duration;
    use model::entities::user::UserRole;

    fn resolver() -> IdentityResolver {
        IdentityResolver::new(SessionStore::default(), "session_token")
    }

    #[test]
    fn cookie_takes_precedence_over_header() {
        let creds = Credentials {
            cookie_header: Some("theme=dark; session_token=from-cookie"),
            authorization: Some("Bearer from-header"),
        };
        assert_eq!(resolver().extract_token(&creds), Some("from-cookie"));
    }

    #[test]
    fn header_is_used_when_cookie_missing() {
        let creds = Credentials {
            cookie_header: Some("theme=dark"),
            authorization: Some("  Bearer   abc123  "),
        };
        assert_eq!(resolver().extract_token(&creds), Some("abc123"));
    }

    #[test]
    fn bare_header_token_is_accepted() {
        let creds = Credentials {
            cookie_header: None,
            authorization: Some(" abc123 "),
        };
        assert_eq!(resolver().extract_token(&creds), Some("abc123"));
    }

    #[test]
    fn empty_values_yield_no_token() {
        let creds = Credentials {
            cookie_header: Some("session_token="),
            authorization: Some("Bearer   "),
        };
        assert_eq!(resolver().extract_token(&creds), None);
        assert_eq!(resolver().extract_token(&Credentials::default()), None);
    }

    #[tokio::test]
    async fn resolves_valid_session_to_principal() {
        let db = setup_db().await;
        let user = insert_user(&db, "who@example.com", UserRole::Staff, None, 0).await;
        let resolver = resolver();
        let now = Utc::now();
        let session = resolver.sessions().create(&db, user.id, now).await.unwrap();

        let header = format!("Bearer {}", session.id);
        let creds = Credentials {
            cookie_header: None,
            authorization: Some(&header),
        };
        let principal = resolver.resolve(&db, &creds, now).await.unwrap();
        assert_eq!(principal, Some(Principal { user_id: user.id }));
    }

    #[tokio::test]
    async fn expired_or_unknown_tokens_are_unauthenticated() {
        let db = setup_db().await;
        let user = insert_user(&db, "late@example.com", UserRole::Staff, None, 0).await;
        let resolver = resolver();
        let now = Utc::now();
        let session = resolver.sessions().create(&db, user.id, now).await.unwrap();

        let cookie = format!("session_token={}", session.id);
        let creds = Credentials {
            cookie_header: Some(&cookie),
            authorization: None,
        };
        let later = now + Duration::hours(25);
        assert_eq!(resolver.resolve(&db, &creds, later).await.unwrap(), None);

        let bogus = Credentials {
            cookie_header: Some("session_token=bogus"),
            authorization: None,
        };
        let err = resolver.require(&db, &bogus, now).await.unwrap_err();
        assert!(matches!(err, EngineError::Unauthenticated));
    }
}
