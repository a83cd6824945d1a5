use crate::error::ApiError;
use crate::extractors::Authenticated;
use crate::schemas::{AccountResponse, ApiResponse, AppState, CardResponse, ErrorResponse, UserResponse};
use axum::{
    extract::State,
    http::{HeaderName, StatusCode, header},
    response::Json,
};
use chrono::{DateTime, Utc};
use engine::accounts::{self, RegisterInput};
use engine::identity::load_actor;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for self-service registration
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct RegisterRequest {
    /// Display name; also seeds the primary card's slug
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 256))]
    pub password: String,
    /// Render template of the primary card
    pub template_id: Option<String>,
}

impl From<RegisterRequest> for RegisterInput {
    fn from(request: RegisterRequest) -> Self {
        Self {
            name: request.name,
            email: request.email,
            password: request.password,
            template_id: request.template_id,
        }
    }
}

/// Request body for login
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Issued session. The token is also set as an HttpOnly cookie.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserResponse,
}

/// Register a new account with its primary card
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<AccountResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "E-mail already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AccountResponse>>), ApiError> {
    trace!("Entering register handler");
    request.validate()?;

    let (user, card) = accounts::register(&state.db, state.accounts(), request.into()).await?;
    info!("Account {} registered with card '{}'", user.id, card.slug);

    let response = ApiResponse::ok(
        AccountResponse {
            user: UserResponse::from(user),
            card: CardResponse::from(card),
        },
        "Account registered successfully",
    );
    Ok((StatusCode::CREATED, Json(response)))
}

/// Log in and receive a session
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; session cookie set", body = ApiResponse<SessionResponse>),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<(StatusCode, [(HeaderName, String); 1], Json<ApiResponse<SessionResponse>>), ApiError> {
    trace!("Entering login handler");
    let sessions = state.identity.sessions();
    let (user, session) = accounts::login(
        &state.db,
        &state.passwords,
        sessions,
        &request.email,
        &request.password,
        Utc::now(),
    )
    .await?;

    let cookie = session_cookie(
        state.identity.cookie_name(),
        &session.id,
        sessions.ttl().num_seconds(),
    );
    debug!("Session cookie issued for user {}", user.id);

    let response = ApiResponse::ok(
        SessionResponse {
            token: session.id,
            expires_at: session.expires_at,
            user: UserResponse::from(user),
        },
        "Logged in successfully",
    );
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(response)))
}

/// Current user
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Authenticated user", body = ApiResponse<UserResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user = load_actor(&state.db, &principal).await?;
    Ok(Json(ApiResponse::ok(
        UserResponse::from(user),
        "User retrieved successfully",
    )))
}

pub(crate) fn session_cookie(name: &str, token: &str, max_age_secs: i64) -> String {
    format!("{name}={token}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={max_age_secs}")
}
