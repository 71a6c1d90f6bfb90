use std::sync::Arc;

use cargo_tracker::notify::{DisabledSender, MessageSender, TelegramClient};
use cargo_tracker::{api, config, error, notify, startup, state, store};
use tower_http::services::ServeDir;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let stores = store::Stores::open(&config.data_dir).await?;

    let telegram = match config.telegram.bot_token.as_deref() {
        Some(token) => match TelegramClient::new(&config.telegram.api_base, token) {
            Ok(client) => Some(client),
            Err(err) => {
                tracing::error!(error = %err, "telegram client could not be built");
                None
            }
        },
        None => {
            tracing::warn!("TELEGRAM_BOT_TOKEN not set");
            None
        }
    };

    let sender: Arc<dyn MessageSender> = match &telegram {
        Some(client) => Arc::new(client.clone()),
        None => {
            tracing::warn!("telegram disabled; notifications will be recorded as unsent");
            Arc::new(DisabledSender)
        }
    };

    if let Err(err) = startup::register_webhook(
        telegram.as_ref(),
        config.telegram.webhook_url.as_deref(),
    )
    .await
    {
        tracing::error!(error = %err, "continuing without telegram webhook");
    }

    let (app_state, notification_rx) = state::AppState::new(
        stores,
        sender,
        config.telegram.channel_id.clone(),
        config.streams,
        config.notification_queue_size,
    );
    let shared_state = Arc::new(app_state);

    tokio::spawn(notify::worker::run_notification_worker(
        shared_state.clone(),
        notification_rx,
    ));

    let app = api::rest::router(shared_state.clone())
        .fallback_service(ServeDir::new(&config.static_dir));

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| error::AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(
        http_port = config.http_port,
        data_dir = %config.data_dir.display(),
        "http server started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| error::AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
