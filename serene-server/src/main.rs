use anyhow::Context;
use serene_server::{LogFormat, ServerConfig, init_telemetry, run_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_telemetry(LogFormat::from_env())?;

    let config = ServerConfig::from_env().context("invalid configuration")?;
    run_server(config).await
}
