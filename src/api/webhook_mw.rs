use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use reqwest::StatusCode;
use tracing::warn;

use crate::models::{app_state::AppState, error::ServerError};

static TELEGRAM_SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

pub async fn webhook_mw(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ServerError> {
    let secret = req
        .headers()
        .get(TELEGRAM_SECRET_HEADER)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| {
            ServerError::Api(StatusCode::UNAUTHORIZED, "Webhook secret not present".into())
        })?;

    if secret != state.get_webhook_secret() {
        warn!("Received webhook call with invalid secret");
        return Err(ServerError::Api(
            StatusCode::UNAUTHORIZED,
            "Invalid webhook secret".into(),
        ));
    }

    Ok(next.run(req).await)
}
