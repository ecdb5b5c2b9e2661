use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vendo_api::{app, AppState};
use vendo_payment::PaymentManager;
use vendo_store::{InMemoryOrderStore, ZaloPayClient};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vendo_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = vendo_store::Config::load().expect("Failed to load config");
    tracing::info!("Starting Vendo payments API on port {}", config.server.port);

    let zalopay = Arc::new(ZaloPayClient::new(config.gateway.clone()));
    let orders = Arc::new(InMemoryOrderStore::new());

    let manager = Arc::new(PaymentManager::new(
        zalopay.clone(),
        orders,
        config.business_rules.currency.clone(),
        config.business_rules.intent_ttl_seconds,
    ));

    tokio::spawn(vendo_api::worker::start_expiry_sweeper(
        manager.clone(),
        config.business_rules.sweep_interval_seconds,
    ));

    let app_state = AppState {
        manager,
        zalopay,
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
