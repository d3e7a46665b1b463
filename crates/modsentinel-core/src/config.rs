use std::{
    collections::HashSet,
    env, fs,
    path::{Path, PathBuf},
};

use crate::{domain::UserId, errors::Error, Result};

/// Typed configuration for the bot, loaded once at startup.
///
/// The admin set is immutable for the process lifetime; moderation state
/// (warnings, mutes) is in-memory only and resets on restart.
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    pub admin_ids: HashSet<UserId>,

    // Moderation behavior
    pub warn_threshold: u32,
    pub tmute_max_minutes: u32,
    pub welcome_message: String,

    // Audit
    pub audit_log_path: PathBuf,
    pub audit_log_json: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let admin_ids: HashSet<UserId> = parse_csv_i64(env_str("TELEGRAM_ADMIN_IDS"))
            .into_iter()
            .map(UserId)
            .collect();
        if admin_ids.is_empty() {
            return Err(Error::Config(
                "TELEGRAM_ADMIN_IDS environment variable is required".to_string(),
            ));
        }

        let warn_threshold = env_u32("WARN_THRESHOLD").unwrap_or(3).max(1);
        let tmute_max_minutes = env_u32("TMUTE_MAX_MINUTES").unwrap_or(1440).max(1);

        let welcome_message = env_str("WELCOME_MESSAGE")
            .and_then(non_empty)
            .unwrap_or_else(|| default_welcome(warn_threshold));

        let audit_log_path = PathBuf::from(
            env_str("AUDIT_LOG_PATH").unwrap_or("/tmp/modsentinel-audit.log".to_string()),
        );
        let audit_log_json = env_bool("AUDIT_LOG_JSON").unwrap_or(false);

        Ok(Self {
            telegram_bot_token,
            admin_ids,
            warn_threshold,
            tmute_max_minutes,
            welcome_message,
            audit_log_path,
            audit_log_json,
        })
    }

    pub fn is_admin(&self, user_id: UserId) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

fn default_welcome(threshold: u32) -> String {
    format!(
        "\u{1F389} Welcome to our group!\n\n\
         \u{1F4CB} <b>Group Rules:</b>\n\
         \u{2022} No spam or promotional content\n\
         \u{2022} No repeated emojis or flooding\n\
         \u{2022} Keep discussions respectful\n\
         \u{2022} No external links without permission\n\
         \u{2022} No ALL CAPS messages\n\n\
         \u{26A0}\u{FE0F} <b>Warning System:</b> {threshold} warnings = automatic ban\n\
         \u{1F6E1} Enjoy your stay and follow the rules!"
    )
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}
