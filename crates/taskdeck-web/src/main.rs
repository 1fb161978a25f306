mod error;
mod routes;

use std::sync::Arc;

use anyhow::Result;
use axum::http::HeaderValue;
use taskdeck_core::agent::AgentService;
use taskdeck_core::config::TaskdeckConfig;
use taskdeck_core::storage::SqliteStorage;
use tower_http::cors::{AllowOrigin, CorsLayer};

pub struct AppState {
    pub storage: SqliteStorage,
    pub config: TaskdeckConfig,
    pub agent: Option<AgentService>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("taskdeck_web=info")),
        )
        .init();

    let config = TaskdeckConfig::load(None).unwrap_or_else(|_| TaskdeckConfig::default_config());

    let db_path = config.storage.resolve_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let storage = SqliteStorage::open(&db_path)?;

    let agent = if config.agent.enabled {
        match AgentService::from_config(&config.agent) {
            Ok(service) => Some(service),
            Err(e) => {
                tracing::warn!("chat agent disabled: {e}");
                None
            }
        }
    } else {
        None
    };

    let state = Arc::new(AppState {
        storage,
        config: config.clone(),
        agent,
    });

    let app = routes::router()
        .with_state(state)
        .layer(cors_layer(&config.web.allow_origins));

    let addr = format!("{}:{}", config.web.host, config.web.port);
    tracing::info!("taskdeck-web listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the CORS layer: an empty allow-list means any origin.
fn cors_layer(allow_origins: &[String]) -> CorsLayer {
    if allow_origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = allow_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::permissive().allow_origin(AllowOrigin::list(origins))
}
