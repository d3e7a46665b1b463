//! Telegram adapter (teloxide).
//!
//! This crate implements the `modsentinel-core` ChatPort over the Telegram
//! Bot API.

use async_trait::async_trait;

use teloxide::{prelude::*, types::ParseMode};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use modsentinel_core::{
    chat::port::ChatPort,
    domain::{ChatId, MessageId, MessageRef, UserId},
    errors::Error,
    Result,
};

#[derive(Clone)]
pub struct TelegramModerator {
    bot: Bot,
}

impl TelegramModerator {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_user(user_id: UserId) -> teloxide::types::UserId {
        teloxide::types::UserId(user_id.0 as u64)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl ChatPort for TelegramModerator {
    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .delete_message(Self::tg_chat(msg.chat_id), Self::tg_msg_id(msg.message_id))
        })
        .await?;
        Ok(())
    }

    async fn ban_member(&self, chat_id: ChatId, user_id: UserId) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .ban_chat_member(Self::tg_chat(chat_id), Self::tg_user(user_id))
        })
        .await?;
        Ok(())
    }

    async fn unban_member(&self, chat_id: ChatId, user_id: UserId) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .unban_chat_member(Self::tg_chat(chat_id), Self::tg_user(user_id))
        })
        .await?;
        Ok(())
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(chat_id), html.to_string())
                    .parse_mode(ParseMode::Html)
            })
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }
}
