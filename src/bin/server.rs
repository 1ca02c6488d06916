use std::error::Error;
use std::sync::Arc;

use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use mdm_backend::config::ServerConfig;
use mdm_backend::push::channel::ChannelPushRelay;
use mdm_backend::server::core_services::CoreServices;

fn init_logging() {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily("logs", "mdm-server.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    // Log to stdout: human-readable format
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    // Default to `info` level if RUST_LOG is not set.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_logging();

    let config = ServerConfig::from_env().map_err(|e| {
        error!(error = %e, "invalid configuration");
        e
    })?;
    info!(
        fast_search_chars = config.fast_search_chars,
        device_lookup_limit = config.device_lookup_limit,
        "starting MDM registry server"
    );

    let (relay, mut outbound) = ChannelPushRelay::new(256);
    let services = CoreServices::new(config, Arc::new(relay));

    // Outbound push messages are handed to the external transport here.
    // Delivery is fire-and-forget: nothing is awaited or acknowledged.
    let transport = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            info!(
                device_id = message.device_id,
                message_type = message.message_type.wire_name(),
                "push message handed to transport"
            );
        }
    });

    // Keep the fast-search index converged in the background.
    let store = services.store.clone();
    let fast_search_chars = services.config.fast_search_chars;
    let reindexer = tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(600));
        loop {
            interval.tick().await;
            mdm_backend::db::services::reindex_fast_search(&store, fast_search_chars);
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    reindexer.abort();
    drop(services);
    transport.abort();

    Ok(())
}
