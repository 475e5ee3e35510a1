use strongbox_http::{AppState, ServerConfigBuilder, router, shutdown_signal};
use strongbox_store::BackupEngine;
use tokio::net::TcpListener;

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let env_filter = match "info".parse() {
        Ok(directive) => env_filter.add_directive(directive),
        Err(_) => env_filter,
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .try_init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = ServerConfigBuilder::from_env()?.build()?;
    let engine = BackupEngine::open(&config.engine)?;
    let state = AppState::new(engine, config.admin_token.clone());
    let app = router(state, config.max_body_size);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!(
        addr = %config.bind_addr,
        database = %config.engine.database_path.display(),
        backup_dir = %config.engine.backup_dir.display(),
        "Strongbox server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
