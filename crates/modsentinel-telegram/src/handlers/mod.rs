//! Telegram update handlers.
//!
//! Each handler is a small adapter that maps teloxide types onto the core
//! event shapes and hands them to the moderation engine. Handlers never
//! return errors upward; a failed event is logged and the dispatch loop
//! keeps running.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use modsentinel_core::{
    chat::types::Sender,
    domain::{ChatId, MessageId, MessageRef, UserId},
};

use crate::router::AppState;

mod commands;
mod members;
mod text;

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    if let Some(users) = msg.new_chat_members() {
        members::handle_new_members(&msg, users, &state).await;
        return Ok(());
    }

    let Some(body) = msg.text() else {
        // Non-text updates (stickers, photos, ...) are not moderated.
        return Ok(());
    };

    if body.starts_with('/') {
        return commands::handle_command(bot, msg, state).await;
    }

    text::handle_text(&msg, &state).await;
    Ok(())
}

pub(crate) fn display_name(user: &teloxide::types::User) -> String {
    user.username
        .clone()
        .unwrap_or_else(|| user.first_name.clone())
}

pub(crate) fn sender_of(msg: &Message) -> Option<Sender> {
    let user = msg.from()?;
    Some(Sender {
        id: UserId(user.id.0 as i64),
        display_name: display_name(user),
    })
}

pub(crate) fn message_ref(msg: &Message) -> MessageRef {
    MessageRef {
        chat_id: ChatId(msg.chat.id.0),
        message_id: MessageId(msg.id.0),
    }
}
