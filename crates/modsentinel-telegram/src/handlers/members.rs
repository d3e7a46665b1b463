use teloxide::types::{Message, User};

use modsentinel_core::{
    chat::types::NewMember,
    domain::{ChatId, UserId},
};

use crate::handlers::display_name;
use crate::router::AppState;

pub async fn handle_new_members(msg: &Message, users: &[User], state: &AppState) {
    let members: Vec<NewMember> = users
        .iter()
        .map(|u| NewMember {
            id: UserId(u.id.0 as i64),
            display_name: display_name(u),
            is_bot: u.is_bot,
        })
        .collect();

    state
        .engine
        .on_new_members(ChatId(msg.chat.id.0), &members)
        .await;
}
