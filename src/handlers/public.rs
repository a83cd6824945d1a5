use crate::error::ApiError;
use crate::schemas::{ApiResponse, AppState, ErrorResponse, PublicCardResponse};
use axum::{
    extract::{Path, State},
    response::Json,
};
use engine::EngineError;
use tracing::{debug, instrument, warn};

/// Read a card by its public slug
///
/// Suspended cards and cards of suspended users answer exactly like
/// missing ones.
#[utoipa::path(
    get,
    path = "/api/v1/public/cards/{slug}",
    tag = "public",
    params(
        ("slug" = String, Path, description = "Public card slug (case-insensitive)"),
    ),
    responses(
        (status = 200, description = "Card retrieved successfully", body = ApiResponse<PublicCardResponse>),
        (status = 404, description = "Card not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_public_card(
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<PublicCardResponse>>, ApiError> {
    match state.slugs.find_active(&state.db, &slug).await? {
        Some(card) => {
            debug!("Serving public card {}", card.id);
            Ok(Json(ApiResponse::ok(
                PublicCardResponse::from(card),
                "Card retrieved successfully",
            )))
        }
        None => {
            warn!("No active card for slug '{}'", slug);
            Err(EngineError::not_found("Card").into())
        }
    }
}
