use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use datasets::registry::DatasetRegistry;
use datasets::DatasetConfig;
use dq_core::pagination::DEFAULT_TAKE;

mod api;
mod datasets;

// =============================================================================
// CLI
// =============================================================================

#[derive(Parser)]
#[command(
    name = "dq-hub",
    version = "0.1.0",
    about = "DYNQ Query Hub: filter, sort and page datasets over HTTP"
)]
struct Args {
    /// Server bind address
    #[arg(long, default_value = "127.0.0.1:3000")]
    bind: String,

    /// Path to config file
    #[arg(long, default_value = "dq-hub.toml")]
    config: PathBuf,
}

// =============================================================================
// Config
// =============================================================================

#[derive(Deserialize, Default, Clone)]
struct Config {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    datasets: Vec<DatasetConfig>,
}

#[derive(Deserialize, Clone)]
struct ServerConfig {
    #[serde(default = "default_take")]
    default_take: u64,
    #[serde(default = "default_take")]
    max_take: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            default_take: DEFAULT_TAKE,
            max_take: DEFAULT_TAKE,
        }
    }
}

fn default_take() -> u64 {
    DEFAULT_TAKE
}

impl Config {
    fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::warn!("Config {:?} not found; serving no datasets", path);
            return Ok(Self::default());
        }
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading config {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("parsing config {:?}", path))
    }
}

// =============================================================================
// Application State
// =============================================================================

struct AppState {
    datasets: DatasetRegistry,
    started_at: chrono::DateTime<chrono::Utc>,
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(api::health))
        .route("/api/datasets", get(api::list_datasets))
        .route("/api/datasets/:name", get(api::query_dataset))
        .route("/api/datasets/:name/query", post(api::query_dataset_structured))
        .route("/api/datasets/:name/explain", get(api::explain_dataset))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "dq_hub=info,dq_core=info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = Config::load(&args.config)?;
    let base_dir = args
        .config
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let datasets = DatasetRegistry::load(
        &config.datasets,
        &base_dir,
        config.server.default_take,
        config.server.max_take,
    );
    if datasets.is_empty() {
        tracing::warn!("No datasets loaded; only /api/health will answer usefully");
    }

    let state = Arc::new(AppState {
        datasets,
        started_at: chrono::Utc::now(),
    });
    let dataset_count = state.datasets.len();
    let app = router(state);

    let addr: SocketAddr = args
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {:?}", args.bind))?;
    tracing::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    tracing::info!("  DYNQ Query Hub v0.1.0");
    tracing::info!("  API:       http://{}/api/datasets", addr);
    tracing::info!("  Datasets:  {}", dataset_count);
    tracing::info!("  Config:    {:?}", args.config);
    tracing::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.default_take, 100);
        assert_eq!(config.server.max_take, 100);
        assert!(config.datasets.is_empty());
    }

    #[test]
    fn test_config_with_datasets() {
        let config: Config = toml::from_str(
            r#"
            [server]
            max_take = 500

            [[datasets]]
            name = "users"
            data = "demo/users.json"

            [datasets.aliases]
            email = "user.email"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.default_take, 100);
        assert_eq!(config.server.max_take, 500);
        assert_eq!(config.datasets[0].name, "users");
        assert_eq!(config.datasets[0].aliases.len(), 1);
    }

    #[test]
    fn test_missing_config_is_empty() {
        let config = Config::load(Path::new("/nonexistent/dq-hub.toml")).unwrap();
        assert!(config.datasets.is_empty());
    }
}
