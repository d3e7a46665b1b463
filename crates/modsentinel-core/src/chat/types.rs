use crate::domain::{MessageRef, UserId};

/// Message author as the engine sees it.
#[derive(Clone, Debug)]
pub struct Sender {
    pub id: UserId,
    /// Username when set, first name otherwise.
    pub display_name: String,
}

/// Incoming group text message.
#[derive(Clone, Debug)]
pub struct TextMessage {
    pub message: MessageRef,
    pub sender: Sender,
    pub text: String,
}

/// Member that just joined the chat.
#[derive(Clone, Debug)]
pub struct NewMember {
    pub id: UserId,
    pub display_name: String,
    pub is_bot: bool,
}
