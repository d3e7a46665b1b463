use std::sync::Arc;

use teloxide::{prelude::*, types::Message, types::ParseMode};

use modsentinel_core::{
    chat::types::Sender,
    domain::{ChatId, UserId},
};

use crate::handlers::display_name;
use crate::router::AppState;

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

/// First whitespace-separated token of `args` as minutes, bounds-checked.
fn parse_minutes(args: &str, max: u32) -> Option<u32> {
    let minutes = args.split_whitespace().next()?.parse::<u32>().ok()?;
    (1..=max).contains(&minutes).then_some(minutes)
}

/// Resolve the command target from the replied-to message.
fn reply_target(msg: &Message) -> Option<Sender> {
    let replied = msg.reply_to_message()?;
    let user = replied.from()?;
    Some(Sender {
        id: UserId(user.id.0 as i64),
        display_name: display_name(user),
    })
}

fn help_text(threshold: u32) -> String {
    format!(
        "\u{1F916} <b>ModSentinel Commands:</b>\n\n\
         \u{1F46E} <b>Admin Only:</b>\n\
         /ban - Ban replied user\n\
         /kick - Kick replied user\n\
         /tmute &lt;minutes&gt; - Temporarily mute user\n\
         /warn - Issue warning to user\n\
         /warnings - Check user's warning count\n\n\
         \u{1F6E1} <b>Auto-moderation:</b>\n\
         \u{2022} Detects spam, links, flooding\n\
         \u{2022} {threshold} warnings = automatic ban\n\
         \u{2022} Welcomes new members"
    )
}

pub async fn handle_command(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let caller = UserId(user.id.0 as i64);
    let chat_id = ChatId(msg.chat.id.0);

    let (cmd, args) = parse_command(text);
    if !matches!(
        cmd.as_str(),
        "ban" | "kick" | "tmute" | "warn" | "warnings" | "help"
    ) {
        // Unknown commands are left alone.
        return Ok(());
    }

    // Every moderation command is admin-gated; validation failures reply to
    // the caller and mutate nothing.
    if !state.cfg.is_admin(caller) {
        let _ = bot
            .send_message(msg.chat.id, "\u{274C} Admin access required.")
            .await;
        return Ok(());
    }

    if cmd == "help" {
        let _ = bot
            .send_message(msg.chat.id, help_text(state.cfg.warn_threshold))
            .parse_mode(ParseMode::Html)
            .await;
        return Ok(());
    }

    let Some(target) = reply_target(&msg) else {
        let _ = bot
            .send_message(
                msg.chat.id,
                format!("\u{274C} Reply to a message to use /{cmd}."),
            )
            .await;
        return Ok(());
    };

    match cmd.as_str() {
        "ban" => {
            state.engine.ban(chat_id, &target).await;
        }
        "kick" => {
            state.engine.kick(chat_id, &target).await;
        }
        "tmute" => match parse_minutes(&args, state.cfg.tmute_max_minutes) {
            Some(minutes) => {
                state.engine.tmute(chat_id, &target, minutes).await;
            }
            None => {
                let _ = bot
                    .send_message(
                        msg.chat.id,
                        format!(
                            "\u{274C} Specify minutes (1-{}): /tmute 10",
                            state.cfg.tmute_max_minutes
                        ),
                    )
                    .await;
            }
        },
        "warn" => {
            state.engine.warn_member(chat_id, &target).await;
        }
        "warnings" => {
            let count = state.engine.warnings(target.id).await;
            let _ = bot
                .send_message(
                    msg.chat.id,
                    format!(
                        "\u{1F4CA} @{} has {count}/{} warnings.",
                        target.display_name, state.cfg.warn_threshold
                    ),
                )
                .await;
        }
        _ => {}
    }

    Ok(())
}
