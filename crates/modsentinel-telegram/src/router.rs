use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tracing::info;

use modsentinel_core::{chat::port::ChatPort, config::Config, engine::ModerationEngine};

use crate::handlers;
use crate::TelegramModerator;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub engine: Arc<ModerationEngine>,
}

pub async fn run_polling(cfg: Arc<Config>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    // Basic startup info.
    if let Ok(me) = bot.get_me().await {
        info!("modsentinel started: @{}", me.username());
    }
    info!("admins configured: {}", cfg.admin_ids.len());
    info!("audit log: {}", cfg.audit_log_path.display());

    let chat: Arc<dyn ChatPort> = Arc::new(TelegramModerator::new(bot.clone()));
    let engine = Arc::new(ModerationEngine::new(cfg.clone(), chat));

    let state = Arc::new(AppState { cfg, engine });

    // Each update is dispatched on its own task, so a slow delete/ban call
    // for one event never holds up unrelated events.
    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
