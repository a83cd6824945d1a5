use crate::error::ApiError;
use crate::extractors::Authenticated;
use crate::schemas::{ApiResponse, AppState, CardResponse, ErrorResponse};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use engine::cards::{self, CardChanges, CardDraft};
use engine::identity::load_actor;
use engine::quota::{self, QuotaDecision};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info, instrument, trace};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Request body for creating an additional card
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateCardRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    /// Desired slug; derived from the name when omitted
    #[validate(length(min = 1, max = 64))]
    pub slug: Option<String>,
    pub template_id: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[validate(url)]
    pub website: Option<String>,
    pub address: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub socials: Option<JsonValue>,
    #[schema(value_type = Option<Object>)]
    pub phones: Option<JsonValue>,
    #[schema(value_type = Option<Object>)]
    pub emails: Option<JsonValue>,
    #[schema(value_type = Option<Object>)]
    pub gallery: Option<JsonValue>,
    #[schema(value_type = Option<Object>)]
    pub design: Option<JsonValue>,
}

impl From<CreateCardRequest> for CardDraft {
    fn from(r: CreateCardRequest) -> Self {
        Self {
            name: r.name,
            slug: r.slug,
            template_id: r.template_id,
            title: r.title,
            company: r.company,
            bio: r.bio,
            phone: r.phone,
            email: r.email,
            website: r.website,
            address: r.address,
            socials: r.socials,
            phones: r.phones,
            emails: r.emails,
            gallery: r.gallery,
            design: r.design,
        }
    }
}

/// Request body for updating a card; omitted fields are left unchanged
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateCardRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub slug: Option<String>,
    pub template_id: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[validate(url)]
    pub website: Option<String>,
    pub address: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub socials: Option<JsonValue>,
    #[schema(value_type = Option<Object>)]
    pub phones: Option<JsonValue>,
    #[schema(value_type = Option<Object>)]
    pub emails: Option<JsonValue>,
    #[schema(value_type = Option<Object>)]
    pub gallery: Option<JsonValue>,
    #[schema(value_type = Option<Object>)]
    pub design: Option<JsonValue>,
}

impl From<UpdateCardRequest> for CardChanges {
    fn from(r: UpdateCardRequest) -> Self {
        Self {
            name: r.name,
            slug: r.slug,
            template_id: r.template_id,
            title: r.title,
            company: r.company,
            bio: r.bio,
            phone: r.phone,
            email: r.email,
            website: r.website,
            address: r.address,
            socials: r.socials,
            phones: r.phones,
            emails: r.emails,
            gallery: r.gallery,
            design: r.design,
        }
    }
}

/// Query parameters for card updates
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct WriteQuery {
    /// Act as an enterprise administrator on a card owned by someone else
    #[serde(default)]
    pub enterprise_override: bool,
}

/// Personal card quota of the caller
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QuotaResponse {
    pub can_create: bool,
    pub current: Option<u64>,
    pub allowed: u64,
    pub sub_license_count: i32,
}

/// List the caller's cards
#[utoipa::path(
    get,
    path = "/api/v1/cards",
    tag = "cards",
    responses(
        (status = 200, description = "Cards retrieved successfully", body = ApiResponse<Vec<CardResponse>>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn list_cards(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> Result<Json<ApiResponse<Vec<CardResponse>>>, ApiError> {
    trace!("Entering list_cards function");
    let owned = cards::list_user_cards(&state.db, principal.user_id).await?;
    debug!("Retrieved {} cards for user {}", owned.len(), principal.user_id);

    let data = owned.into_iter().map(CardResponse::from).collect();
    Ok(Json(ApiResponse::ok(data, "Cards retrieved successfully")))
}

/// Create an additional card within the caller's quota
#[utoipa::path(
    post,
    path = "/api/v1/cards",
    tag = "cards",
    request_body = CreateCardRequest,
    responses(
        (status = 201, description = "Card created successfully", body = ApiResponse<CardResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 409, description = "Slug already taken", body = ErrorResponse),
        (status = 422, description = "Card quota exceeded", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn create_card(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Json(request): Json<CreateCardRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CardResponse>>), ApiError> {
    trace!("Entering create_card function");
    request.validate()?;

    let card =
        cards::create_additional_card(&state.db, &state.slugs, principal.user_id, request.into())
            .await?;
    info!("Card {} created for user {}", card.id, principal.user_id);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(CardResponse::from(card), "Card created successfully")),
    ))
}

/// Check whether the caller may create another card
#[utoipa::path(
    get,
    path = "/api/v1/cards/quota",
    tag = "cards",
    responses(
        (status = 200, description = "Quota retrieved", body = ApiResponse<QuotaResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn card_quota(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> Result<Json<ApiResponse<QuotaResponse>>, ApiError> {
    let owner = load_actor(&state.db, &principal).await?;
    let allowed = quota::allowed_cards(owner.sub_license_count);

    let data = match quota::can_create_card(&state.db, &owner).await? {
        QuotaDecision::Allowed { current, allowed } => QuotaResponse {
            can_create: true,
            current: Some(current),
            allowed,
            sub_license_count: owner.sub_license_count,
        },
        QuotaDecision::Exceeded { limit } => QuotaResponse {
            can_create: false,
            current: None,
            allowed,
            sub_license_count: limit,
        },
    };
    Ok(Json(ApiResponse::ok(data, "Quota retrieved successfully")))
}

/// Get a card the caller may manage
#[utoipa::path(
    get,
    path = "/api/v1/cards/{card_id}",
    tag = "cards",
    params(
        ("card_id" = i32, Path, description = "Card ID"),
    ),
    responses(
        (status = 200, description = "Card retrieved successfully", body = ApiResponse<CardResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Not allowed to manage this card", body = ErrorResponse),
        (status = 404, description = "Card not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_card(
    Path(card_id): Path<i32>,
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> Result<Json<ApiResponse<CardResponse>>, ApiError> {
    let grant = state.authz.require_read(&state.db, &principal, card_id).await?;
    debug!("Read access to card {} via {:?}", card_id, grant.via);
    Ok(Json(ApiResponse::ok(
        CardResponse::from(grant.card),
        "Card retrieved successfully",
    )))
}

/// Update a card
#[utoipa::path(
    put,
    path = "/api/v1/cards/{card_id}",
    tag = "cards",
    params(
        ("card_id" = i32, Path, description = "Card ID"),
        WriteQuery
    ),
    request_body = UpdateCardRequest,
    responses(
        (status = 200, description = "Card updated successfully", body = ApiResponse<CardResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Not allowed to edit this card", body = ErrorResponse),
        (status = 404, description = "Card not found", body = ErrorResponse),
        (status = 409, description = "Slug already taken", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn update_card(
    Path(card_id): Path<i32>,
    Query(query): Query<WriteQuery>,
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Json(request): Json<UpdateCardRequest>,
) -> Result<Json<ApiResponse<CardResponse>>, ApiError> {
    trace!("Entering update_card function for card_id: {}", card_id);
    request.validate()?;

    let grant = state
        .authz
        .require_write(&state.db, &principal, card_id, query.enterprise_override)
        .await?;
    debug!("Write access to card {} via {:?}", card_id, grant.via);

    let updated = cards::update_card(&state.db, &state.slugs, grant.card, request.into()).await?;
    info!("Card {} updated by user {}", updated.id, principal.user_id);

    Ok(Json(ApiResponse::ok(
        CardResponse::from(updated),
        "Card updated successfully",
    )))
}
