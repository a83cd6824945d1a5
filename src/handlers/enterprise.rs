use crate::error::ApiError;
use crate::extractors::Authenticated;
use crate::handlers::auth::RegisterRequest;
use crate::schemas::{
    AccountResponse, ApiResponse, AppState, CardResponse, ErrorResponse, LicenseRequestResponse,
    UserResponse,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use engine::authz::require_enterprise_admin;
use engine::identity::load_actor;
use engine::{EngineError, accounts, license, quota};
use model::entities::license_request::LicenseRequestType;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for asking the platform for more capacity
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct LicenseRequestBody {
    /// `profile` for more seats, `sub` for more sub-licenses
    pub request_type: LicenseRequestType,
    #[validate(range(min = 1))]
    pub amount: i32,
}

/// Request body for distributing sub-licenses to a member
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct GrantSubLicensesRequest {
    #[validate(range(min = 1))]
    pub amount: i32,
}

/// File a license request for the caller's enterprise
#[utoipa::path(
    post,
    path = "/api/v1/enterprise/license-requests",
    tag = "enterprise",
    request_body = LicenseRequestBody,
    responses(
        (status = 201, description = "Request filed", body = ApiResponse<LicenseRequestResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Caller belongs to no enterprise", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn submit_license_request(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Json(request): Json<LicenseRequestBody>,
) -> Result<(StatusCode, Json<ApiResponse<LicenseRequestResponse>>), ApiError> {
    trace!("Entering submit_license_request function");
    request.validate()?;

    let requester = load_actor(&state.db, &principal).await?;
    let filed =
        license::submit_request(&state.db, &requester, request.request_type, request.amount).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            LicenseRequestResponse::from(filed),
            "License request submitted successfully",
        )),
    ))
}

/// List license requests of the caller's enterprise
#[utoipa::path(
    get,
    path = "/api/v1/enterprise/license-requests",
    tag = "enterprise",
    responses(
        (status = 200, description = "Requests retrieved", body = ApiResponse<Vec<LicenseRequestResponse>>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Caller belongs to no enterprise", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn list_license_requests(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> Result<Json<ApiResponse<Vec<LicenseRequestResponse>>>, ApiError> {
    let actor = load_actor(&state.db, &principal).await?;
    let Some(enterprise_id) = actor.enterprise_id else {
        warn!("User {} has no enterprise", actor.id);
        return Err(EngineError::Forbidden.into());
    };

    let requests = license::list_for_enterprise(&state.db, enterprise_id).await?;
    let data = requests
        .into_iter()
        .map(LicenseRequestResponse::from)
        .collect();
    Ok(Json(ApiResponse::ok(data, "License requests retrieved successfully")))
}

/// Add a member to the caller's enterprise
#[utoipa::path(
    post,
    path = "/api/v1/enterprise/members",
    tag = "enterprise",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Member created", body = ApiResponse<AccountResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Caller is not an enterprise administrator", body = ErrorResponse),
        (status = 409, description = "E-mail already registered", body = ErrorResponse),
        (status = 422, description = "No seats left", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn add_member(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AccountResponse>>), ApiError> {
    trace!("Entering add_member function");
    request.validate()?;

    let (admin, enterprise_id) = require_enterprise_admin(&state.db, &principal).await?;
    let (user, card) = accounts::add_enterprise_member(
        &state.db,
        state.accounts(),
        &admin,
        enterprise_id,
        request.into(),
    )
    .await?;
    info!("Member {} added to enterprise {}", user.id, enterprise_id);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            AccountResponse {
                user: UserResponse::from(user),
                card: CardResponse::from(card),
            },
            "Member added successfully",
        )),
    ))
}

/// Give a member additional card quota from the enterprise pool
#[utoipa::path(
    put,
    path = "/api/v1/enterprise/members/{user_id}/sub-licenses",
    tag = "enterprise",
    params(
        ("user_id" = i32, Path, description = "Member user ID"),
    ),
    request_body = GrantSubLicensesRequest,
    responses(
        (status = 200, description = "Sub-licenses granted", body = ApiResponse<UserResponse>),
        (status = 403, description = "Not an administrator of the member's enterprise", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 422, description = "Enterprise sub-license pool exhausted", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn grant_sub_licenses(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Json(request): Json<GrantSubLicensesRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    request.validate()?;

    let (_, enterprise_id) = require_enterprise_admin(&state.db, &principal).await?;
    let member = quota::grant_sub_licenses(&state.db, enterprise_id, user_id, request.amount).await?;

    Ok(Json(ApiResponse::ok(
        UserResponse::from(member),
        "Sub-licenses granted successfully",
    )))
}

/// Claim a user that belongs to no enterprise
#[utoipa::path(
    post,
    path = "/api/v1/enterprise/members/{user_id}/claim",
    tag = "enterprise",
    params(
        ("user_id" = i32, Path, description = "User ID to claim"),
    ),
    responses(
        (status = 200, description = "User claimed", body = ApiResponse<UserResponse>),
        (status = 403, description = "Caller is not an enterprise administrator, target is an administrator, or takeover is disabled", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "User already belongs to an enterprise", body = ErrorResponse),
        (status = 422, description = "No seats left", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn claim_member(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let (admin, enterprise_id) = require_enterprise_admin(&state.db, &principal).await?;
    let claimed = accounts::claim_user(&state.db, &state.authz, &admin, enterprise_id, user_id).await?;

    Ok(Json(ApiResponse::ok(
        UserResponse::from(claimed),
        "User claimed successfully",
    )))
}
