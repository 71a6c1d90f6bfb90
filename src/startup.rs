use tracing::{info, warn};

use crate::notify::{DeliveryError, TelegramClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookSetup {
    Registered,
    Skipped,
}

/// Points the bot at our webhook. Run once by `main` before serving.
pub async fn register_webhook(
    client: Option<&TelegramClient>,
    webhook_url: Option<&str>,
) -> Result<WebhookSetup, DeliveryError> {
    let (Some(client), Some(url)) = (client, webhook_url) else {
        info!("telegram webhook not configured; skipping registration");
        return Ok(WebhookSetup::Skipped);
    };

    match client.set_webhook(url).await {
        Ok(()) => {
            info!(webhook_url = url, "telegram webhook registered");
            Ok(WebhookSetup::Registered)
        }
        Err(err) => {
            warn!(webhook_url = url, error = %err, "telegram webhook registration failed");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{WebhookSetup, register_webhook};
    use crate::notify::TelegramClient;

    #[tokio::test]
    async fn missing_url_or_client_skips() {
        let client = TelegramClient::new("https://api.telegram.org", "token").unwrap();

        assert_eq!(
            register_webhook(Some(&client), None).await.unwrap(),
            WebhookSetup::Skipped
        );
        assert_eq!(
            register_webhook(None, Some("https://example.kz/telegram/webhook"))
                .await
                .unwrap(),
            WebhookSetup::Skipped
        );
    }
}
