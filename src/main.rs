use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ct_service::api;
use ct_service::config::AppConfig;
use ct_service::log::{bootstrap_from_file, CtLogStore};
use ct_service::sct::SctIssuer;
use ct_service::verification::VerificationService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ct_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CT log service");

    let config = AppConfig::load()?;
    info!("Configuration loaded for log {}", config.log_name);

    let issuer = SctIssuer::new(config.log_key()?, &config.log_name);
    info!("Log id {}", issuer.log_id());
    let store = CtLogStore::new(issuer);

    if let Some(path) = &config.bootstrap_path {
        let appended = bootstrap_from_file(&store, path).await?;
        let snapshot = store.check_integrity().await?;
        info!(
            "Bootstrap complete: {} entries, root {:?}",
            appended, snapshot.root
        );
    }

    // No fetcher here; embedders that install one inherit the configured timeout
    let service = VerificationService::new(store).with_fetch_timeout(config.fetch_timeout());

    let app = api::router(service);

    let addr = config.bind_addr()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
