use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::{
    domain::{ChatId, UserId},
    Result,
};

/// One enforcement action taken by the bot.
#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub action: String,
    pub chat_id: i64,
    pub user_id: i64,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AuditEvent {
    pub fn new(
        action: &str,
        chat_id: ChatId,
        user_id: UserId,
        display_name: &str,
        detail: Option<String>,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            action: action.to_string(),
            chat_id: chat_id.0,
            user_id: user_id.0,
            display_name: display_name.to_string(),
            detail,
        }
    }
}

/// Append-only moderation audit log.
///
/// JSON mode writes one serialized event per line; plain mode writes a single
/// readable line. Best-effort: callers log and continue on write failure.
#[derive(Clone, Debug)]
pub struct AuditLogger {
    path: PathBuf,
    json: bool,
}

impl AuditLogger {
    pub fn new(path: impl Into<PathBuf>, json: bool) -> Self {
        Self {
            path: path.into(),
            json,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, event: &AuditEvent) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if self.json {
            let line = serde_json::to_string(event)?;
            writeln!(file, "{line}")?;
            return Ok(());
        }

        let detail = event.detail.as_deref().unwrap_or("-");
        writeln!(
            file,
            "{} {} chat={} user={} ({}) {}",
            event.timestamp, event.action, event.chat_id, event.user_id, event.display_name, detail
        )?;
        Ok(())
    }
}
