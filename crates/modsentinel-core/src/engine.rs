use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
    audit::{AuditEvent, AuditLogger},
    chat::{
        port::ChatPort,
        types::{NewMember, Sender, TextMessage},
    },
    classifier::{SpamClassifier, SpamReason},
    config::Config,
    domain::{ChatId, UserId},
    formatting::escape_html,
    ledger::WarningLedger,
    mutes::MuteRegistry,
};

/// Escalation result shared by the spam path and `/warn`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Enforcement {
    Warned(u32),
    Banned,
    BanFailed(u32),
}

/// Decision reached for a single text message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextOutcome {
    /// Sender is muted; the message was suppressed without further processing.
    Suppressed,
    /// Sender is an admin; classification skipped.
    AdminExempt,
    /// Not spam.
    Clean,
    Spam {
        reason: SpamReason,
        enforcement: Enforcement,
    },
}

/// Orchestrates classifier, warning ledger and mute registry against each
/// incoming event.
///
/// The ledger and registry are owned here exclusively; locks are held only
/// around the in-memory read-modify-write, never across a platform call.
pub struct ModerationEngine {
    cfg: Arc<Config>,
    chat: Arc<dyn ChatPort>,
    audit: AuditLogger,
    classifier: SpamClassifier,
    ledger: Mutex<WarningLedger>,
    mutes: Mutex<MuteRegistry>,
}

impl ModerationEngine {
    pub fn new(cfg: Arc<Config>, chat: Arc<dyn ChatPort>) -> Self {
        let audit = AuditLogger::new(cfg.audit_log_path.clone(), cfg.audit_log_json);
        Self {
            cfg,
            chat,
            audit,
            classifier: SpamClassifier::new(),
            ledger: Mutex::new(WarningLedger::new()),
            mutes: Mutex::new(MuteRegistry::new()),
        }
    }

    /// Run one message through the moderation gates.
    ///
    /// Gate order is fixed: mute check first (even for admins), then the
    /// admin exemption, then classification.
    pub async fn on_text(&self, msg: &TextMessage) -> TextOutcome {
        let sender = &msg.sender;
        let chat_id = msg.message.chat_id;

        let muted = self.mutes.lock().await.is_muted(sender.id);
        if muted {
            if let Err(e) = self.chat.delete_message(msg.message).await {
                warn!(user = sender.id.0, "could not delete message from muted user: {e}");
            }
            return TextOutcome::Suppressed;
        }

        if self.cfg.is_admin(sender.id) {
            return TextOutcome::AdminExempt;
        }

        let Some(reason) = self.classifier.classify(&msg.text) else {
            return TextOutcome::Clean;
        };

        debug!(user = sender.id.0, %reason, "spam detected");

        // Best-effort delete; a failed delete must not swallow the warning.
        if let Err(e) = self.chat.delete_message(msg.message).await {
            warn!(user = sender.id.0, "could not delete spam message: {e}");
        }
        self.record(AuditEvent::new(
            "spam_deleted",
            chat_id,
            sender.id,
            &sender.display_name,
            Some(reason.to_string()),
        ));

        let count = self.ledger.lock().await.increment(sender.id);
        let threshold = self.cfg.warn_threshold;
        self.record(AuditEvent::new(
            "warning",
            chat_id,
            sender.id,
            &sender.display_name,
            Some(format!("{count}/{threshold}")),
        ));

        if count >= threshold {
            let enforcement = if self.ban_and_clear(chat_id, sender).await {
                self.announce(
                    chat_id,
                    &format!(
                        "\u{1F6AB} @{} has been banned for repeated violations.",
                        escape_html(&sender.display_name)
                    ),
                )
                .await;
                Enforcement::Banned
            } else {
                self.announce(
                    chat_id,
                    &format!(
                        "\u{26A0}\u{FE0F} Could not ban @{}. Admin rights needed.",
                        escape_html(&sender.display_name)
                    ),
                )
                .await;
                Enforcement::BanFailed(count)
            };
            return TextOutcome::Spam {
                reason,
                enforcement,
            };
        }

        self.announce(
            chat_id,
            &format!(
                "\u{1F6AB} Message removed due to {reason}. This is warning {count}/{threshold} for @{}.",
                escape_html(&sender.display_name)
            ),
        )
        .await;

        TextOutcome::Spam {
            reason,
            enforcement: Enforcement::Warned(count),
        }
    }

    /// Welcome each non-bot joiner. Stateless; one announcement per member.
    pub async fn on_new_members(&self, chat_id: ChatId, members: &[NewMember]) {
        for member in members {
            if member.is_bot {
                continue;
            }
            debug!(user = member.id.0, "welcoming new member");
            self.announce(chat_id, &self.cfg.welcome_message).await;
        }
    }

    /// `/ban`: immediate ban; the ledger entry is cleared only on success.
    pub async fn ban(&self, chat_id: ChatId, target: &Sender) -> bool {
        if self.ban_and_clear(chat_id, target).await {
            self.announce(
                chat_id,
                &format!(
                    "\u{1F6AB} @{} has been banned.",
                    escape_html(&target.display_name)
                ),
            )
            .await;
            true
        } else {
            self.announce(
                chat_id,
                "\u{274C} Could not ban user. Check bot permissions.",
            )
            .await;
            false
        }
    }

    /// `/kick`: ban then immediately unban, removing membership without a
    /// permanent ban. The ledger is untouched either way.
    pub async fn kick(&self, chat_id: ChatId, target: &Sender) -> bool {
        let res = match self.chat.ban_member(chat_id, target.id).await {
            Ok(()) => self.chat.unban_member(chat_id, target.id).await,
            Err(e) => Err(e),
        };

        match res {
            Ok(()) => {
                self.record(AuditEvent::new(
                    "kick",
                    chat_id,
                    target.id,
                    &target.display_name,
                    None,
                ));
                self.announce(
                    chat_id,
                    &format!(
                        "\u{1F44B} @{} has been kicked.",
                        escape_html(&target.display_name)
                    ),
                )
                .await;
                true
            }
            Err(e) => {
                warn!(user = target.id.0, "kick failed: {e}");
                self.announce(
                    chat_id,
                    "\u{274C} Could not kick user. Check bot permissions.",
                )
                .await;
                false
            }
        }
    }

    /// `/tmute`: temporary mute. Minutes are validated by the command layer.
    pub async fn tmute(&self, chat_id: ChatId, target: &Sender, minutes: u32) {
        self.mutes.lock().await.mute(target.id, minutes);
        self.record(AuditEvent::new(
            "mute",
            chat_id,
            target.id,
            &target.display_name,
            Some(format!("{minutes}m")),
        ));
        self.announce(
            chat_id,
            &format!(
                "\u{23F3} @{} muted for {minutes} minutes.",
                escape_html(&target.display_name)
            ),
        )
        .await;
    }

    /// `/warn`: ledger increment bypassing the classifier, with the same
    /// threshold escalation as the spam path.
    pub async fn warn_member(&self, chat_id: ChatId, target: &Sender) -> Enforcement {
        let count = self.ledger.lock().await.increment(target.id);
        let threshold = self.cfg.warn_threshold;
        self.record(AuditEvent::new(
            "warning",
            chat_id,
            target.id,
            &target.display_name,
            Some(format!("{count}/{threshold}")),
        ));

        if count >= threshold {
            if self.ban_and_clear(chat_id, target).await {
                self.announce(
                    chat_id,
                    &format!(
                        "\u{1F6AB} @{} has been banned for {threshold} warnings.",
                        escape_html(&target.display_name)
                    ),
                )
                .await;
                return Enforcement::Banned;
            }
            self.announce(
                chat_id,
                &format!(
                    "\u{26A0}\u{FE0F} @{} reached {threshold} warnings but could not be banned.",
                    escape_html(&target.display_name)
                ),
            )
            .await;
            return Enforcement::BanFailed(count);
        }

        self.announce(
            chat_id,
            &format!(
                "\u{26A0}\u{FE0F} Warning issued to @{}. Count: {count}/{threshold}",
                escape_html(&target.display_name)
            ),
        )
        .await;
        Enforcement::Warned(count)
    }

    /// `/warnings`: read-only count.
    pub async fn warnings(&self, user: UserId) -> u32 {
        self.ledger.lock().await.get(user)
    }

    /// Attempt the platform ban; on success the ledger entry is cleared.
    /// On failure the count is left untouched so the next offense retries.
    async fn ban_and_clear(&self, chat_id: ChatId, target: &Sender) -> bool {
        match self.chat.ban_member(chat_id, target.id).await {
            Ok(()) => {
                self.ledger.lock().await.clear(target.id);
                self.record(AuditEvent::new(
                    "ban",
                    chat_id,
                    target.id,
                    &target.display_name,
                    None,
                ));
                true
            }
            Err(e) => {
                warn!(user = target.id.0, "ban failed: {e}");
                self.record(AuditEvent::new(
                    "ban_failed",
                    chat_id,
                    target.id,
                    &target.display_name,
                    Some(e.to_string()),
                ));
                false
            }
        }
    }

    /// Fire-and-forget reply; failures are logged only.
    async fn announce(&self, chat_id: ChatId, html: &str) {
        if let Err(e) = self.chat.send_html(chat_id, html).await {
            warn!("announcement failed: {e}");
        }
    }

    fn record(&self, event: AuditEvent) {
        if let Err(e) = self.audit.write(&event) {
            warn!("audit write failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use super::*;
    use crate::domain::{MessageId, MessageRef};
    use crate::{Error, Result};

    #[derive(Default)]
    struct RecordingChat {
        fail_ban: AtomicBool,
        fail_delete: AtomicBool,
        ban_attempts: AtomicUsize,
        deleted: StdMutex<Vec<MessageRef>>,
        banned: StdMutex<Vec<UserId>>,
        unbanned: StdMutex<Vec<UserId>>,
        replies: StdMutex<Vec<String>>,
    }

    impl RecordingChat {
        fn replies(&self) -> Vec<String> {
            self.replies.lock().unwrap().clone()
        }

        fn deleted_count(&self) -> usize {
            self.deleted.lock().unwrap().len()
        }

        fn banned(&self) -> Vec<UserId> {
            self.banned.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl ChatPort for RecordingChat {
        async fn delete_message(&self, msg: MessageRef) -> Result<()> {
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(Error::External("message to delete not found".into()));
            }
            self.deleted.lock().unwrap().push(msg);
            Ok(())
        }

        async fn ban_member(&self, _chat_id: ChatId, user_id: UserId) -> Result<()> {
            self.ban_attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail_ban.load(Ordering::SeqCst) {
                return Err(Error::External("not enough rights".into()));
            }
            self.banned.lock().unwrap().push(user_id);
            Ok(())
        }

        async fn unban_member(&self, _chat_id: ChatId, user_id: UserId) -> Result<()> {
            self.unbanned.lock().unwrap().push(user_id);
            Ok(())
        }

        async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
            self.replies.lock().unwrap().push(html.to_string());
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(1),
            })
        }
    }

    fn tmp_audit(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}"))
    }

    fn engine(prefix: &str) -> (Arc<RecordingChat>, ModerationEngine) {
        let cfg = Arc::new(Config {
            telegram_bot_token: "test-token".to_string(),
            admin_ids: [UserId(99)].into_iter().collect(),
            warn_threshold: 3,
            tmute_max_minutes: 1440,
            welcome_message: "welcome aboard".to_string(),
            audit_log_path: tmp_audit(prefix),
            audit_log_json: true,
        });
        let chat = Arc::new(RecordingChat::default());
        let eng = ModerationEngine::new(cfg, chat.clone());
        (chat, eng)
    }

    fn spam_from(user: i64, name: &str) -> TextMessage {
        text_from(user, name, "join @cryptopump now")
    }

    fn text_from(user: i64, name: &str, text: &str) -> TextMessage {
        TextMessage {
            message: MessageRef {
                chat_id: ChatId(-1001),
                message_id: MessageId(7),
            },
            sender: Sender {
                id: UserId(user),
                display_name: name.to_string(),
            },
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn clean_message_takes_no_action() {
        let (chat, eng) = engine("ms-clean");
        let outcome = eng.on_text(&text_from(1, "alice", "good morning all")).await;

        assert_eq!(outcome, TextOutcome::Clean);
        assert_eq!(chat.deleted_count(), 0);
        assert!(chat.replies().is_empty());
        assert_eq!(eng.warnings(UserId(1)).await, 0);
    }

    #[tokio::test]
    async fn admin_messages_skip_classification() {
        let (chat, eng) = engine("ms-admin");
        let outcome = eng.on_text(&spam_from(99, "boss")).await;

        assert_eq!(outcome, TextOutcome::AdminExempt);
        assert_eq!(chat.deleted_count(), 0);
        assert!(chat.replies().is_empty());
    }

    #[tokio::test]
    async fn third_spam_message_triggers_exactly_one_ban() {
        let (chat, eng) = engine("ms-escalation");
        let msg = spam_from(1, "spammer");

        let first = eng.on_text(&msg).await;
        let second = eng.on_text(&msg).await;
        let third = eng.on_text(&msg).await;

        assert!(matches!(
            first,
            TextOutcome::Spam {
                enforcement: Enforcement::Warned(1),
                ..
            }
        ));
        assert!(matches!(
            second,
            TextOutcome::Spam {
                enforcement: Enforcement::Warned(2),
                ..
            }
        ));
        assert!(matches!(
            third,
            TextOutcome::Spam {
                enforcement: Enforcement::Banned,
                ..
            }
        ));

        assert_eq!(chat.deleted_count(), 3);
        assert_eq!(chat.banned(), vec![UserId(1)]);
        assert_eq!(chat.ban_attempts.load(Ordering::SeqCst), 1);

        let replies = chat.replies();
        assert!(replies[0].contains("warning 1/3"));
        assert!(replies[1].contains("warning 2/3"));
        assert!(replies[2].contains("banned"));

        // Ledger cleared by the successful ban.
        assert_eq!(eng.warnings(UserId(1)).await, 0);
    }

    #[tokio::test]
    async fn failed_ban_keeps_ledger_and_retries_without_warning() {
        let (chat, eng) = engine("ms-banfail");
        chat.fail_ban.store(true, Ordering::SeqCst);
        let msg = spam_from(1, "spammer");

        eng.on_text(&msg).await;
        eng.on_text(&msg).await;
        let third = eng.on_text(&msg).await;

        assert!(matches!(
            third,
            TextOutcome::Spam {
                enforcement: Enforcement::BanFailed(3),
                ..
            }
        ));
        assert_eq!(eng.warnings(UserId(1)).await, 3);
        assert_eq!(chat.ban_attempts.load(Ordering::SeqCst), 1);

        // The next offense re-attempts the ban; no "warning n/3" reply is issued.
        let fourth = eng.on_text(&msg).await;
        assert!(matches!(
            fourth,
            TextOutcome::Spam {
                enforcement: Enforcement::BanFailed(_),
                ..
            }
        ));
        assert_eq!(chat.ban_attempts.load(Ordering::SeqCst), 2);
        let last = chat.replies().last().unwrap().clone();
        assert!(last.contains("Could not ban"));
        assert!(!last.contains("warning"));

        // Once the bot has rights again, the ban lands and the ledger clears.
        chat.fail_ban.store(false, Ordering::SeqCst);
        let fifth = eng.on_text(&msg).await;
        assert!(matches!(
            fifth,
            TextOutcome::Spam {
                enforcement: Enforcement::Banned,
                ..
            }
        ));
        assert_eq!(eng.warnings(UserId(1)).await, 0);
    }

    #[tokio::test]
    async fn muted_user_is_suppressed_without_warnings() {
        let (chat, eng) = engine("ms-muted");
        let target = Sender {
            id: UserId(1),
            display_name: "noisy".to_string(),
        };
        eng.tmute(ChatId(-1001), &target, 10).await;
        let mute_replies = chat.replies().len();

        let outcome = eng.on_text(&spam_from(1, "noisy")).await;

        assert_eq!(outcome, TextOutcome::Suppressed);
        assert_eq!(chat.deleted_count(), 1);
        assert_eq!(eng.warnings(UserId(1)).await, 0);
        // No reply beyond the original mute announcement.
        assert_eq!(chat.replies().len(), mute_replies);

        // Content is irrelevant while muted; clean text is suppressed too.
        let outcome = eng.on_text(&text_from(1, "noisy", "sorry, I'll behave")).await;
        assert_eq!(outcome, TextOutcome::Suppressed);
        assert_eq!(chat.deleted_count(), 2);
    }

    #[tokio::test]
    async fn mute_gate_applies_to_admins_too() {
        // The mute check deliberately precedes the admin exemption.
        let (chat, eng) = engine("ms-muted-admin");
        let admin = Sender {
            id: UserId(99),
            display_name: "boss".to_string(),
        };
        eng.tmute(ChatId(-1001), &admin, 5).await;

        let outcome = eng.on_text(&text_from(99, "boss", "hello")).await;
        assert_eq!(outcome, TextOutcome::Suppressed);
        assert_eq!(chat.deleted_count(), 1);
    }

    #[tokio::test]
    async fn failed_delete_still_counts_the_warning() {
        let (chat, eng) = engine("ms-delfail");
        chat.fail_delete.store(true, Ordering::SeqCst);

        let outcome = eng.on_text(&spam_from(1, "spammer")).await;
        assert!(matches!(
            outcome,
            TextOutcome::Spam {
                enforcement: Enforcement::Warned(1),
                ..
            }
        ));
        assert_eq!(eng.warnings(UserId(1)).await, 1);
        assert!(chat.replies()[0].contains("warning 1/3"));
    }

    #[tokio::test]
    async fn welcome_skips_bots() {
        let (chat, eng) = engine("ms-welcome");
        let members = vec![
            NewMember {
                id: UserId(5),
                display_name: "human".to_string(),
                is_bot: false,
            },
            NewMember {
                id: UserId(6),
                display_name: "helperbot".to_string(),
                is_bot: true,
            },
        ];

        eng.on_new_members(ChatId(-1001), &members).await;

        let replies = chat.replies();
        assert_eq!(replies, vec!["welcome aboard".to_string()]);
    }

    #[tokio::test]
    async fn kick_removes_membership_but_keeps_ledger() {
        let (chat, eng) = engine("ms-kick");
        let target = Sender {
            id: UserId(1),
            display_name: "rowdy".to_string(),
        };
        eng.warn_member(ChatId(-1001), &target).await;

        assert!(eng.kick(ChatId(-1001), &target).await);
        assert_eq!(chat.banned(), vec![UserId(1)]);
        assert_eq!(chat.unbanned.lock().unwrap().clone(), vec![UserId(1)]);
        // Kick never touches the warning count.
        assert_eq!(eng.warnings(UserId(1)).await, 1);
    }

    #[tokio::test]
    async fn manual_warnings_escalate_like_spam() {
        let (chat, eng) = engine("ms-warncmd");
        let target = Sender {
            id: UserId(1),
            display_name: "rowdy".to_string(),
        };

        assert_eq!(
            eng.warn_member(ChatId(-1001), &target).await,
            Enforcement::Warned(1)
        );
        assert_eq!(
            eng.warn_member(ChatId(-1001), &target).await,
            Enforcement::Warned(2)
        );
        assert_eq!(
            eng.warn_member(ChatId(-1001), &target).await,
            Enforcement::Banned
        );

        assert_eq!(chat.banned(), vec![UserId(1)]);
        assert!(chat
            .replies()
            .last()
            .unwrap()
            .contains("banned for 3 warnings"));
        assert_eq!(eng.warnings(UserId(1)).await, 0);
    }

    #[tokio::test]
    async fn explicit_ban_clears_ledger_only_on_success() {
        let (chat, eng) = engine("ms-bancmd");
        let target = Sender {
            id: UserId(1),
            display_name: "rowdy".to_string(),
        };
        eng.warn_member(ChatId(-1001), &target).await;

        chat.fail_ban.store(true, Ordering::SeqCst);
        assert!(!eng.ban(ChatId(-1001), &target).await);
        assert_eq!(eng.warnings(UserId(1)).await, 1);

        chat.fail_ban.store(false, Ordering::SeqCst);
        assert!(eng.ban(ChatId(-1001), &target).await);
        assert_eq!(eng.warnings(UserId(1)).await, 0);
    }
}
