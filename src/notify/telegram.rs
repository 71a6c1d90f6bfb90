use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("telegram bot is not configured")]
    NotConfigured,

    #[error("no {0} chat id to deliver to")]
    MissingChat(&'static str),

    #[error("telegram request failed: {0}")]
    Transport(String),

    #[error("telegram rejected the request: status={status} {description}")]
    Rejected { status: u16, description: String },
}

/// Outbound chat transport.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), DeliveryError>;
}

/// Used when no bot token is configured; every send fails.
pub struct DisabledSender;

#[async_trait]
impl MessageSender for DisabledSender {
    async fn send_message(&self, _chat_id: &str, _text: &str) -> Result<(), DeliveryError> {
        Err(DeliveryError::NotConfigured)
    }
}

#[derive(Deserialize)]
struct BotApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Bot API client.
#[derive(Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

impl TelegramClient {
    pub fn new(api_base: &str, token: &str) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|err| DeliveryError::Transport(format!("http client setup failed: {err}")))?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.token)
    }

    async fn call(&self, method: &str, body: serde_json::Value) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|err| DeliveryError::Transport(err.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let description = response
                .json::<BotApiResponse>()
                .await
                .ok()
                .and_then(|body| body.description)
                .unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                description,
            });
        }

        let body: BotApiResponse = response
            .json()
            .await
            .map_err(|err| DeliveryError::Transport(err.without_url().to_string()))?;
        if !body.ok {
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                description: body.description.unwrap_or_default(),
            });
        }

        Ok(())
    }

    /// Registers the webhook endpoint. Telegram treats repeated calls with the
    /// same URL as a no-op, so this is safe to run on every start.
    #[instrument(skip(self))]
    pub async fn set_webhook(&self, url: &str) -> Result<(), DeliveryError> {
        self.call("setWebhook", json!({ "url": url })).await
    }
}

#[async_trait]
impl MessageSender for TelegramClient {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), DeliveryError> {
        debug!(chat_id, "sending telegram message");
        self.call(
            "sendMessage",
            json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "HTML",
                "disable_web_page_preview": true,
            }),
        )
        .await
    }
}
