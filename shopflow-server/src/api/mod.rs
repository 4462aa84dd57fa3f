//! HTTP API, mounted under `/api/v1`.

pub mod extractors;
pub mod storefront;
pub mod webhooks;

use crate::state::AppState;
use axum::Router;

/// Build the versioned API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(storefront::router())
        .merge(webhooks::router())
}
