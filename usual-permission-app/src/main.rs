use anyhow::{Context, Result};
use tracing::info;
use usual_permission_app::config::Config;
use usual_permission_app::host;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    config.validate()?;
    host::init_tracing(&config.log_level);

    let channel = host::build_channel(&config).await?;
    info!(channel = channel.name(), "serving method calls on stdio");

    channel
        .serve(tokio::io::stdin(), tokio::io::stdout())
        .await
        .context("Method channel failed")?;

    info!("input closed, shutting down");
    Ok(())
}
