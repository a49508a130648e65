use anyhow::Context;
use gameledger::{
    api, config::Config, db::init_db, AnalyticsSink, HttpAnalyticsSink, NoopAnalytics,
    ProductCatalog, Repository,
};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("configuration error")?;
    let port = config.port;

    let pool = init_db(&config.database_path)
        .await
        .with_context(|| format!("failed to initialize database {}", config.database_path))?;
    let repo = Arc::new(Repository::new(pool));

    let catalog = match config.product_catalog_path.as_deref() {
        Some(path) => ProductCatalog::from_path(path)?,
        None => {
            tracing::warn!("PRODUCT_CATALOG_PATH not set, every purchase will be rejected");
            ProductCatalog::new()
        }
    };
    tracing::info!(products = catalog.len(), "product catalog loaded");

    let analytics: Arc<dyn AnalyticsSink> = match config.analytics_url.clone() {
        Some(url) => Arc::new(HttpAnalyticsSink::new(url)),
        None => Arc::new(NoopAnalytics),
    };

    let app = api::create_router(api::AppState::new(repo, config, catalog, analytics));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
