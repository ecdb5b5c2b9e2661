use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod payments;
pub mod state;
pub mod webhooks;
pub mod worker;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    Router::new()
        .route("/api/payments/create", post(payments::create_payment))
        .route(
            "/api/payments/status/{intent_id}",
            get(payments::payment_status),
        )
        .route("/api/payments/methods", get(payments::payment_methods))
        .route(
            "/api/payments/callback",
            post(webhooks::handle_gateway_callback),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
