use crate::error::ApiError;
use crate::extractors::Authenticated;
use crate::handlers::auth::RegisterRequest;
use crate::schemas::{
    ApiResponse, AppState, CardResponse, EnterpriseResponse, ErrorResponse, LicenseRequestResponse,
    UserResponse,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use engine::accounts::{self, EnterpriseInput};
use engine::authz::require_platform_admin;
use engine::license::{self, LicenseAction};
use engine::cards;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, trace};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for creating an enterprise with its administrator
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct ProvisionEnterpriseRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(range(min = 1))]
    pub license_count: i32,
    #[validate(range(min = 0))]
    pub sub_license_count: i32,
    pub logo: Option<String>,
    #[validate(nested)]
    pub admin: RegisterRequest,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProvisionedEnterprise {
    pub enterprise: EnterpriseResponse,
    pub admin: UserResponse,
    pub card: CardResponse,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct SuspensionRequest {
    pub suspended: bool,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AssignAdminRequest {
    /// New delegated administrator; `null` clears the delegation
    pub admin_id: Option<i32>,
}

/// Create an enterprise and its administrator
#[utoipa::path(
    post,
    path = "/api/v1/admin/enterprises",
    tag = "admin",
    request_body = ProvisionEnterpriseRequest,
    responses(
        (status = 201, description = "Enterprise provisioned", body = ApiResponse<ProvisionedEnterprise>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Platform administrators only", body = ErrorResponse),
        (status = 409, description = "E-mail already registered", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn provision_enterprise(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Json(request): Json<ProvisionEnterpriseRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProvisionedEnterprise>>), ApiError> {
    trace!("Entering provision_enterprise function");
    request.validate()?;
    require_platform_admin(&state.db, &principal).await?;

    let input = EnterpriseInput {
        name: request.name,
        license_count: request.license_count,
        sub_license_count: request.sub_license_count,
        logo: request.logo,
        admin: request.admin.into(),
    };
    let (enterprise, admin, card) =
        accounts::provision_enterprise(&state.db, state.accounts(), input).await?;
    info!("Enterprise {} provisioned by user {}", enterprise.id, principal.user_id);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            ProvisionedEnterprise {
                enterprise: EnterpriseResponse::from(enterprise),
                admin: UserResponse::from(admin),
                card: CardResponse::from(card),
            },
            "Enterprise provisioned successfully",
        )),
    ))
}

/// Approve or reject a pending license request
#[utoipa::path(
    post,
    path = "/api/v1/admin/license-requests/{request_id}/{action}",
    tag = "admin",
    params(
        ("request_id" = i32, Path, description = "License request ID"),
        ("action" = String, Path, description = "`approve` or `reject`"),
    ),
    responses(
        (status = 200, description = "Request handled", body = ApiResponse<LicenseRequestResponse>),
        (status = 403, description = "Platform administrators only", body = ErrorResponse),
        (status = 404, description = "Request not found", body = ErrorResponse),
        (status = 409, description = "Unknown action or request already handled", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn handle_license_request(
    Path((request_id, action)): Path<(i32, String)>,
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> Result<Json<ApiResponse<LicenseRequestResponse>>, ApiError> {
    require_platform_admin(&state.db, &principal).await?;
    let action: LicenseAction = action.parse()?;

    let handled = license::handle_request(&state.db, request_id, action).await?;
    Ok(Json(ApiResponse::ok(
        LicenseRequestResponse::from(handled),
        "License request handled successfully",
    )))
}

/// Suspend or reinstate a user
#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{user_id}/suspension",
    tag = "admin",
    params(
        ("user_id" = i32, Path, description = "User ID"),
    ),
    request_body = SuspensionRequest,
    responses(
        (status = 200, description = "Suspension updated", body = ApiResponse<UserResponse>),
        (status = 403, description = "Platform administrators only", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn set_user_suspension(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Json(request): Json<SuspensionRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    require_platform_admin(&state.db, &principal).await?;
    let user = accounts::set_user_suspended(&state.db, user_id, request.suspended).await?;
    Ok(Json(ApiResponse::ok(
        UserResponse::from(user),
        "User suspension updated successfully",
    )))
}

/// Suspend or reinstate a card
#[utoipa::path(
    put,
    path = "/api/v1/admin/cards/{card_id}/suspension",
    tag = "admin",
    params(
        ("card_id" = i32, Path, description = "Card ID"),
    ),
    request_body = SuspensionRequest,
    responses(
        (status = 200, description = "Suspension updated", body = ApiResponse<CardResponse>),
        (status = 403, description = "Platform administrators only", body = ErrorResponse),
        (status = 404, description = "Card not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn set_card_suspension(
    Path(card_id): Path<i32>,
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Json(request): Json<SuspensionRequest>,
) -> Result<Json<ApiResponse<CardResponse>>, ApiError> {
    require_platform_admin(&state.db, &principal).await?;
    let card = cards::set_card_suspended(&state.db, card_id, request.suspended).await?;
    Ok(Json(ApiResponse::ok(
        CardResponse::from(card),
        "Card suspension updated successfully",
    )))
}

/// Set or clear a user's delegated administrator
#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{user_id}/assigned-admin",
    tag = "admin",
    params(
        ("user_id" = i32, Path, description = "User ID"),
    ),
    request_body = AssignAdminRequest,
    responses(
        (status = 200, description = "Delegation updated", body = ApiResponse<UserResponse>),
        (status = 400, description = "Target is not an administrator", body = ErrorResponse),
        (status = 403, description = "Platform administrators only", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn set_assigned_admin(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Json(request): Json<AssignAdminRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    require_platform_admin(&state.db, &principal).await?;
    let user = accounts::assign_admin(&state.db, user_id, request.admin_id).await?;
    Ok(Json(ApiResponse::ok(
        UserResponse::from(user),
        "Assigned admin updated successfully",
    )))
}

/// Delete a user together with their cards and sessions
#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/{user_id}",
    tag = "admin",
    params(
        ("user_id" = i32, Path, description = "User ID"),
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Platform administrators only", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_user(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> Result<StatusCode, ApiError> {
    require_platform_admin(&state.db, &principal).await?;
    accounts::delete_user(&state.db, user_id).await?;
    info!("User {} deleted by user {}", user_id, principal.user_id);
    Ok(StatusCode::NO_CONTENT)
}
