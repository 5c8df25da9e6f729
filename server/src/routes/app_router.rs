use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use http::HeaderValue;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::ServerState;

use super::{automation, campaign, notification};

pub struct AppRouter;

impl AppRouter {
    pub fn create(state: ServerState) -> Router {
        let origins = [
            "https://shareplate.app",
            "https://admin.shareplate.app",
            "http://localhost:3000",
        ]
        .into_iter()
        .map(|origin| origin.parse::<HeaderValue>().unwrap())
        .collect::<Vec<_>>();

        let cors_layer = CorsLayer::new()
            .allow_origin(origins)
            .allow_credentials(true);

        Router::new()
            .route("/", get(|| async { "Shareplate comms server" }))
            .route("/campaigns/:id/send", post(campaign::send_campaign))
            .route("/campaigns/:id/insight", get(campaign::campaign_insight))
            .route("/campaigns/suggest", post(campaign::suggest_content))
            .route(
                "/automations/:id/enroll",
                post(automation::enroll_recipient),
            )
            .route(
                "/automations/items/:id/retry",
                post(automation::retry_queue_item),
            )
            .route(
                "/notifications/deferred",
                post(notification::queue_deferred),
            )
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer)
            .with_state(state)
            .fallback(handler_404)
    }
}

pub async fn handler_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Route does not exist")
}
