use std::sync::Arc;

use axum::Router;
use dotenvy::dotenv;
use reqwest::Client;
use sqlx::{Pool, Postgres};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    api::{health::health_routes, webhook::webhook_routes},
    config::app_config::CONFIG,
    models::app_state::AppState,
    service::gateway::TelegramGateway,
};

mod api;
mod config;
mod db;
mod models;
mod service;
mod tests;

#[tokio::main]
async fn main() {
    // Initialize .env
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let pool = match Pool::<Postgres>::connect(&CONFIG.database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return;
        }
    };

    // Run migrations
    if let Err(e) = sqlx::migrate!().run(&pool).await {
        error!("Failed to run migrations: {}", e);
        return;
    }

    let telegram = &CONFIG.telegram;
    let gateway = TelegramGateway::new(Client::new(), &telegram.api_domain, &telegram.token);

    if let Some(url) = &telegram.public_url {
        if let Err(e) = gateway.set_webhook(url, &telegram.webhook_secret).await {
            warn!("Failed to register webhook, continuing with existing one: {}", e);
        }
    }

    let state = AppState::from_pool(pool, Arc::new(gateway), &CONFIG);

    let app = Router::new()
        .nest("/health", health_routes(state.clone()))
        .nest("/webhook", webhook_routes(state.clone()));

    // Initialize webserver
    let address = format!("{}:{}", CONFIG.server.address, CONFIG.server.port);
    let listener = match tokio::net::TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", address, e);
            return;
        }
    };

    info!("Server listening on address: {}", address);
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server stopped: {}", e);
    }
}
