use std::net::SocketAddr;
use std::sync::Arc;

use ridepool_backend::api::{self, AppState};
use ridepool_backend::config::Config;
use ridepool_backend::database::booking_repository::PgBookingStore;
use ridepool_backend::database::payment_repository::PgPaymentStore;
use ridepool_backend::database::webhook_repository::PgWebhookEventLog;
use ridepool_backend::database::{self, PoolConfig};
use ridepool_backend::gateway::signature::SignatureSecrets;
use ridepool_backend::gateway::{RazorpayClient, RazorpayConfig};
use ridepool_backend::service::PaymentService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;

    tracing::info!("Starting Ridepool Backend");
    tracing::info!("Environment: {}", config.server.environment);
    tracing::info!("Gateway: {}", config.gateway.base_url);

    let pool = database::init_pool(
        &config.database.url,
        Some(PoolConfig {
            max_connections: config.database.max_connections,
            ..PoolConfig::default()
        }),
    )
    .await?;

    let gateway = Arc::new(RazorpayClient::new(RazorpayConfig {
        key_id: config.gateway.key_id.clone(),
        key_secret: config.gateway.key_secret.clone(),
        base_url: config.gateway.base_url.clone(),
        timeout_secs: config.gateway.timeout_secs,
        max_retries: config.gateway.max_retries,
    }));

    let service = Arc::new(PaymentService::new(
        gateway,
        Arc::new(PgPaymentStore::new(pool.clone())),
        Arc::new(PgBookingStore::new(pool.clone())),
        Arc::new(PgWebhookEventLog::new(pool.clone())),
        SignatureSecrets {
            checkout_secret: config.gateway.key_secret.clone(),
            webhook_secret: config.gateway.webhook_secret.clone(),
        },
    ));

    let state = AppState {
        service,
        pool: Some(pool),
        environment: config.server.environment.clone(),
    };

    let app = api::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
