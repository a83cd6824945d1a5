//! Rendering boundary for public card pages.
//!
//! Any request no API route matched lands here. The first path segment is
//! resolved as a slug: deferred segments go to the static directory, a card
//! is answered with the page of its render variant (the URL stays the same),
//! anything else is a 404.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, header::HeaderName},
    response::{IntoResponse, Response},
};
use engine::{EngineError, SlugResolution};
use std::convert::Infallible;
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{debug, instrument, trace};

use crate::error::ApiError;
use crate::schemas::AppState;

/// Response header naming the variant a card page was rendered with
pub const VARIANT_HEADER: &str = "x-card-variant";

#[instrument(skip(state, request), fields(path = %request.uri().path()))]
pub async fn render_page(State(state): State<AppState>, request: Request) -> Response {
    let segment = decoded_segment(request.uri().path());
    trace!("Resolving page segment '{}'", segment);

    let resolution = match state.slugs.resolve(&state.db, &segment).await {
        Ok(resolution) => resolution,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match resolution {
        SlugResolution::Defer => {
            debug!("Serving static content");
            let served = ServeDir::new(&state.settings.server.static_dir)
                .oneshot(request)
                .await;
            into_response(served)
        }
        SlugResolution::Card { card, variant } => {
            let template = state
                .settings
                .server
                .templates_dir
                .join(variant.template_file());
            debug!("Rendering card {} with {}", card.id, template.display());

            let mut response = into_response(ServeFile::new(template).oneshot(request).await);
            response.headers_mut().insert(
                HeaderName::from_static(VARIANT_HEADER),
                HeaderValue::from_static(variant.key()),
            );
            response
        }
        SlugResolution::NotFound => ApiError::from(EngineError::not_found("Card")).into_response(),
    }
}

fn into_response<R: IntoResponse>(served: Result<R, Infallible>) -> Response {
    match served {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

fn first_segment(path: &str) -> &str {
    path.trim_start_matches('/').split('/').next().unwrap_or_default()
}

/// First segment with percent-escapes undone; undecodable input is kept raw
/// and will not match any slug.
fn decoded_segment(path: &str) -> String {
    let raw = first_segment(path);
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}
