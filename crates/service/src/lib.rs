pub mod config;
mod error;
pub mod handlers;

use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use glossary_core::{ConnectionPool, GlossaryCatalog};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

pub use config::ServiceConfig;
pub use error::AppError;

pub type Catalog = GlossaryCatalog<ConnectionPool>;

pub struct AppState {
    pub catalog: Catalog,
    pub config: ServiceConfig,
}

impl AppState {
    /// Connections are opened lazily, so this succeeds even when the
    /// database is not reachable yet.
    pub fn from_config(config: ServiceConfig) -> Self {
        let pool = ConnectionPool::open(&config.database_path, config.pool_options());
        Self {
            catalog: GlossaryCatalog::new(pool, config.collation),
            config,
        }
    }
}

fn glossary_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/glossary", get(handlers::list_glossary))
        .route("/glossary/:term", get(handlers::get_glossary_term))
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .merge(glossary_routes())
        .nest("/api", glossary_routes())
        .route("/health", get(handlers::health))
        .route("/health/db", get(handlers::health_db))
        .with_state(state.clone())
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = cors_layer(&state.config.allowed_origin) {
        router = router.layer(cors);
    }
    router
}

fn cors_layer(origin: &str) -> Option<CorsLayer> {
    let origin = origin.trim();
    if origin.is_empty() {
        return None;
    }
    match HeaderValue::from_str(origin) {
        Ok(value) => Some(
            CorsLayer::new()
                .allow_origin(value)
                .allow_methods([Method::GET]),
        ),
        Err(_) => {
            warn!(origin, "ignoring invalid CORS origin");
            None
        }
    }
}
