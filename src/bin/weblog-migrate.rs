//! Create the blog tables.
//!
//! Pass `--recreate` to drop existing tables first.

use anyhow::Context;
use weblog::{AppConfig, Weblog};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    weblog::telemetry::init("info");

    let recreate = std::env::args().any(|arg| arg == "--recreate");
    let config = AppConfig::load().context("failed to load configuration")?;

    let app = Weblog::new(&config)
        .await
        .context("failed to start the application")?;
    app.migrate(recreate).await.context("migration failed")?;
    tracing::info!("tables ready (recreate: {})", recreate);

    app.close().await;
    Ok(())
}
