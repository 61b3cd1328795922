use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use volunteerhub::config::{Cli, Config};
use volunteerhub::state::AppState;
use volunteerhub::storage::Storage;
use volunteerhub::webpush::Notifier;
use volunteerhub::{auth, db, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let mut config = Config::load(&cli)?;
    auth::ensure_jwt_secret(&mut config);

    // File store: public/, uploads/, temp/
    let storage = Storage::new(config.storage_root());
    storage.init()?;

    // Initialize database
    let pool = db::create_pool(config.db_path())?;
    db::run_migrations(&pool)?;
    db::ensure_admin(&pool, &config.auth)?;

    // Push notifications are optional; bad VAPID config aborts startup.
    let notifier = if config.push.enabled {
        Some(Arc::new(Notifier::from_config(&config.push)?))
    } else {
        tracing::info!("Push notifications are disabled");
        None
    };

    let state = AppState {
        db: pool,
        config: config.clone(),
        storage,
        notifier,
    };
    let app = routes::app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
