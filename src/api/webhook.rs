use std::sync::Arc;

use axum::{
    Json, Router, extract::State, middleware::from_fn_with_state, response::IntoResponse,
    routing::post,
};
use reqwest::StatusCode;
use tracing::debug;

use crate::{
    api::webhook_mw::webhook_mw,
    models::{app_state::AppState, chat::TelegramUpdate},
};

pub fn webhook_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(receive_update))
        .layer(from_fn_with_state(state.clone(), webhook_mw))
        .with_state(state)
}

/// Acknowledges the update right away; the platform retries slow webhooks.
async fn receive_update(
    State(state): State<Arc<AppState>>,
    Json(update): Json<TelegramUpdate>,
) -> impl IntoResponse {
    let update_id = update.update_id;
    let Some(message) = update.into_inbound() else {
        debug!("Ignoring update {} without text message", update_id);
        return StatusCode::OK;
    };

    let router = state.get_router().clone();
    tokio::spawn(async move {
        router.handle(message).await;
    });

    StatusCode::OK
}
