//! HTTP routes
//!
//! | Method | Path | Handler |
//! |---|---|---|
//! | GET | `/integrations/oauth/{provider}/init` | [`oauth::init`] |
//! | GET | `/integrations/oauth/{provider}/callback` | [`oauth::callback`] |
//! | POST | `/integrations/webhooks/{linear,github,slack}` | [`webhooks`] |
//! | GET | `/integrations` | [`integrations::list`] |
//! | GET, DELETE | `/integrations/{id}` | [`integrations::get`], [`integrations::disconnect`] |
//! | POST | `/integrations/{id}/refresh` | [`integrations::refresh`] |
//! | GET | `/health` | [`health::health`] |

pub mod health;
pub mod integrations;
pub mod oauth;
pub mod webhooks;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;

pub type SharedContext = Arc<AppContext>;

/// Build the router with every gateway endpoint.
pub fn build_router(ctx: SharedContext) -> Router {
    Router::new()
        .route("/integrations/oauth/{provider}/init", get(oauth::init))
        .route("/integrations/oauth/{provider}/callback", get(oauth::callback))
        .route("/integrations/webhooks/linear", post(webhooks::linear))
        .route("/integrations/webhooks/github", post(webhooks::github))
        .route("/integrations/webhooks/slack", post(webhooks::slack))
        .route("/integrations", get(integrations::list))
        .route("/integrations/{id}", get(integrations::get).delete(integrations::disconnect))
        .route("/integrations/{id}/refresh", post(integrations::refresh))
        .route("/health", get(health::health))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
