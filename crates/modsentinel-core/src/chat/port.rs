use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef, UserId},
    Result,
};

/// Moderation actions the engine can take against the platform.
///
/// Telegram is the first implementation; the shape is small enough that other
/// group-chat platforms can fit behind the same interface. Failures surface
/// as `Err` so the caller's decision logic (e.g. the ban-failure branch) can
/// react instead of silently discarding them.
#[async_trait]
pub trait ChatPort: Send + Sync {
    async fn delete_message(&self, msg: MessageRef) -> Result<()>;

    async fn ban_member(&self, chat_id: ChatId, user_id: UserId) -> Result<()>;

    async fn unban_member(&self, chat_id: ChatId, user_id: UserId) -> Result<()>;

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;
}
