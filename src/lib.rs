pub mod admin;
pub mod ask;
pub mod config;
pub mod db;
pub mod error;
pub mod food;
pub mod form;
pub mod registry;
pub mod remote;
pub mod res;
pub mod sse;

use std::sync::Arc;

use axum::{
    Router, debug_handler,
    extract::{DefaultBodyLimit, FromRef, Request},
    http::{Method, header::CONTENT_TYPE},
    routing::get,
};
use sqlx::SqlitePool;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info_span;
use uuid::Uuid;

pub use config::Config;
pub use db::Registry;
pub use error::{AppError, AppResult};
pub use remote::Remotes;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Registry,
    pub remotes: Remotes,
}

impl AppState {
    pub fn new(config: Config, db_pool: SqlitePool) -> anyhow::Result<Self> {
        let remotes = Remotes::from_config(&config)?;
        Ok(Self {
            config: Arc::new(config),
            registry: Registry::new(db_pool),
            remotes,
        })
    }
}

pub fn app(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        info_span!(
            "request",
            request_id = %Uuid::now_v7(),
            method = %request.method(),
            uri = %request.uri(),
        )
    });

    Router::new()
        .route("/health", get(health))

        .merge(registry::router())
        .merge(admin::router())
        .merge(ask::router())
        .merge(food::router())

        .layer(DefaultBodyLimit::max(body_limit))
        .layer(trace)
        .layer(cors)
        .with_state(state)
}

#[debug_handler]
async fn health() -> &'static str {
    "ok"
}
