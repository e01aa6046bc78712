use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio::config::AppConfig;
use folio::infrastructure::server;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "folio=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    if config.backend.service_role_key.is_none() {
        tracing::info!("SUPABASE_SERVICE_ROLE_KEY not set; admin operations unavailable");
    }

    if let Err(e) = server::serve(config).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
