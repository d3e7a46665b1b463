use std::sync::Arc;

use modsentinel_core::config::Config;

#[tokio::main]
async fn main() -> Result<(), modsentinel_core::Error> {
    modsentinel_core::logging::init("modsentinel")?;

    let cfg = Arc::new(Config::load()?);

    modsentinel_telegram::router::run_polling(cfg)
        .await
        .map_err(|e| modsentinel_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
