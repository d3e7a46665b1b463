use teloxide::types::Message;

use modsentinel_core::chat::types::TextMessage;

use crate::handlers::{message_ref, sender_of};
use crate::router::AppState;

pub async fn handle_text(msg: &Message, state: &AppState) {
    let Some(sender) = sender_of(msg) else {
        return;
    };
    let Some(text) = msg.text() else {
        return;
    };

    let incoming = TextMessage {
        message: message_ref(msg),
        sender,
        text: text.to_string(),
    };

    let outcome = state.engine.on_text(&incoming).await;
    tracing::debug!(?outcome, "message processed");
}
