use tracing_subscriber::EnvFilter;
use weather_api::{config::Config, run_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.environment.default_log_level()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    run_server(config).await?;
    Ok(())
}
