use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{error, info};

use crate::models::chat::{ChatId, SendMessageRequest, SendOptions, SetWebhookRequest};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Api error: {0} - {1}")]
    ApiError(StatusCode, String),
}

/// Outbound side of the messaging platform.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn send(
        &self,
        chat_id: ChatId,
        text: &str,
        options: SendOptions,
    ) -> Result<(), GatewayError>;
}

#[derive(Debug, Clone)]
pub struct TelegramGateway {
    client: Client,
    base_url: String,
}

impl TelegramGateway {
    pub fn new(client: Client, api_domain: &str, token: &str) -> Self {
        let base_url = format!("{}/bot{}", api_domain.trim_end_matches('/'), token);
        Self { client, base_url }
    }

    async fn post<T: serde::Serialize + ?Sized>(
        &self,
        method: &str,
        payload: &T,
    ) -> Result<(), GatewayError> {
        let url = format!("{}/{}", self.base_url, method);
        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or("No body".into());
            error!("Telegram {} failed: {} - {}", method, status, body);
            return Err(GatewayError::ApiError(status, body));
        }

        Ok(())
    }

    pub async fn set_webhook(&self, url: &str, secret_token: &str) -> Result<(), GatewayError> {
        let payload = SetWebhookRequest {
            url,
            secret_token,
            allowed_updates: vec!["message"],
        };

        self.post("setWebhook", &payload).await?;
        info!("Registered webhook at {}", url);
        Ok(())
    }
}

#[async_trait]
impl MessagingGateway for TelegramGateway {
    async fn send(
        &self,
        chat_id: ChatId,
        text: &str,
        options: SendOptions,
    ) -> Result<(), GatewayError> {
        let payload = SendMessageRequest {
            chat_id,
            text,
            reply_to_message_id: options.reply_to,
        };

        self.post("sendMessage", &payload).await
    }
}
