use std::sync::Arc;

use mgp_core::config::Config;
use mgp_telegram::{TelegramConfig, TelegramPlatform};

mod terminal;

#[tokio::main]
async fn main() -> Result<(), mgp_core::Error> {
    mgp_core::logging::init("mgp")?;

    let cfg = Arc::new(Config::load()?);
    let platform = Arc::new(TelegramPlatform::new(TelegramConfig::from(cfg.as_ref())));

    terminal::run(cfg, platform)
        .await
        .map_err(|e| mgp_core::Error::External(format!("poster failed: {e}")))?;

    Ok(())
}
