use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use chrono::Utc;
use engine::{Credentials, Principal};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::schemas::AppState;

/// The authenticated caller of a request. Rejects with 401 when the request
/// carries no valid session.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated(pub Principal);

#[axum::async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let cookies = joined_cookies(&parts.headers);
        let authorization = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        let credentials = Credentials {
            cookie_header: cookies.as_deref(),
            authorization,
        };

        match state
            .identity
            .resolve(&state.db, &credentials, Utc::now())
            .await?
        {
            Some(principal) => {
                debug!("Request authenticated as user {}", principal.user_id);
                Ok(Authenticated(principal))
            }
            None => {
                warn!("Rejecting unauthenticated request to {}", parts.uri.path());
                Err(engine::EngineError::Unauthenticated.into())
            }
        }
    }
}

/// All `Cookie` headers of a request folded into one `a=b; c=d` string.
fn joined_cookies(headers: &HeaderMap) -> Option<String> {
    let values: Vec<&str> = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();
    (!values.is_empty()).then(|| values.join("; "))
}
