//! The auth protocol endpoint

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tracing::info;

use mailgate_core::{request, response, AuthRequest};

use crate::state::AppState;

/// Answer one auth query from the proxy.
///
/// Each call is stateless end-to-end: the request is parsed, decided and
/// encoded with nothing shared across calls but the read-only config and
/// the directory handle.
pub async fn authenticate(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let Some(config) = &state.config else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Configuration failed to load. See server log for details.",
        )
            .into_response();
    };

    if !config.enabled {
        return (StatusCode::FORBIDDEN, "Mail auth responder is disabled.").into_response();
    }

    let auth_request = AuthRequest::from_headers(&headers);
    if auth_request.debug_active(config) {
        info!(
            headers = %request::masked_headers(&headers),
            "auth query received"
        );
    }

    let decision = state.engine.decide(&auth_request, config).await;
    let encoded = response::encode(&decision, config, &auth_request);

    (encoded.status, encoded.headers).into_response()
}
