use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::domain::UserId;

/// Per-user temporary mute window, keyed by absolute expiry timestamp.
///
/// Expiry is lazy: an entry whose timestamp has passed is treated as absent
/// and removed on the next lookup. No background sweeper.
#[derive(Debug, Default)]
pub struct MuteRegistry {
    muted_until: HashMap<UserId, DateTime<Utc>>,
}

impl MuteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mute `user` for `minutes` from now. Re-muting replaces the expiry
    /// outright; there is no stacking. Range validation (1..=1440) is the
    /// command layer's job.
    pub fn mute(&mut self, user: UserId, minutes: u32) {
        self.mute_at(user, minutes, Utc::now());
    }

    pub fn mute_at(&mut self, user: UserId, minutes: u32, now: DateTime<Utc>) {
        self.muted_until
            .insert(user, now + Duration::minutes(i64::from(minutes)));
    }

    pub fn is_muted(&mut self, user: UserId) -> bool {
        self.is_muted_at(user, Utc::now())
    }

    /// The mute is active strictly before the expiry instant; at or after it
    /// the entry is dropped.
    pub fn is_muted_at(&mut self, user: UserId, now: DateTime<Utc>) -> bool {
        match self.muted_until.get(&user) {
            Some(&until) if now < until => true,
            Some(_) => {
                self.muted_until.remove(&user);
                false
            }
            None => false,
        }
    }
}
