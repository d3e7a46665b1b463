use regex::Regex;

/// Why a message was classified as spam.
///
/// The display strings are the labels used in warning announcements and
/// audit records.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpamReason {
    PromotionalLinks,
    RepeatedCharacters,
    ExcessiveCaps,
    SuspiciousDomains,
    Flooding,
}

impl SpamReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PromotionalLinks => "promotional links",
            Self::RepeatedCharacters => "repeated emojis",
            Self::ExcessiveCaps => "excessive caps",
            Self::SuspiciousDomains => "suspicious domains",
            Self::Flooding => "flooding",
        }
    }
}

impl std::fmt::Display for SpamReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Rule thresholds.
const CHAR_RUN_LIMIT: usize = 6;
const CAPS_MIN_LEN: usize = 10;
const FLOOD_MIN_REPEATS: usize = 11;
const FLOOD_MAX_UNIT: usize = 3;

/// Symbols permitted alongside uppercase letters by the all-caps rule.
const CAPS_SYMBOLS: &str = "!@#$%^&*()_+=-[]{}|;':\",./<>?";

/// Pattern-based spam classifier.
///
/// Rules are checked in a fixed priority order and the first match wins.
/// Stateless once constructed; safe to call concurrently, identical input
/// always yields the identical verdict.
pub struct SpamClassifier {
    promotional: Regex,
    shorteners: Regex,
}

impl SpamClassifier {
    pub fn new() -> Self {
        Self {
            // @handle mentions and Telegram invite links.
            promotional: Regex::new(r"(?i)@\w+|t\.me/|telegram\.me/").expect("valid regex"),
            // Known URL shorteners plus free.* bait domains.
            shorteners: Regex::new(r"(?i)\b(?:bit\.ly|tinyurl|t\.co|short\.link|free\.\w+)\b")
                .expect("valid regex"),
        }
    }

    pub fn classify(&self, text: &str) -> Option<SpamReason> {
        if text.is_empty() {
            return None;
        }

        if self.promotional.is_match(text) {
            return Some(SpamReason::PromotionalLinks);
        }
        if has_char_run(text, CHAR_RUN_LIMIT) {
            return Some(SpamReason::RepeatedCharacters);
        }
        if is_all_caps(text) {
            return Some(SpamReason::ExcessiveCaps);
        }
        if self.shorteners.is_match(text) {
            return Some(SpamReason::SuspiciousDomains);
        }
        if has_flooding(text, FLOOD_MIN_REPEATS) {
            return Some(SpamReason::Flooding);
        }

        None
    }
}

impl Default for SpamClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// True if any single character repeats `limit` or more times in a row.
///
/// The `regex` crate has no backreferences; runs are scanned directly.
fn has_char_run(text: &str, limit: usize) -> bool {
    let mut prev: Option<char> = None;
    let mut run = 0usize;
    for c in text.chars() {
        if Some(c) == prev {
            run += 1;
        } else {
            prev = Some(c);
            run = 1;
        }
        if run >= limit {
            return true;
        }
    }
    false
}

/// Trimmed text of at least `CAPS_MIN_LEN` chars consisting solely of
/// uppercase ASCII letters, whitespace and `CAPS_SYMBOLS`. A single
/// character outside that set (lowercase, digits, non-ASCII) disqualifies.
fn is_all_caps(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.chars().count() < CAPS_MIN_LEN {
        return false;
    }
    trimmed
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_whitespace() || CAPS_SYMBOLS.contains(c))
}

/// True if some unit of 1..=`FLOOD_MAX_UNIT` chars occurs `min_repeats` or
/// more times consecutively anywhere in the text.
fn has_flooding(text: &str, min_repeats: usize) -> bool {
    let chars: Vec<char> = text.chars().collect();
    for unit in 1..=FLOOD_MAX_UNIT {
        let needed = unit * min_repeats;
        if chars.len() < needed {
            continue;
        }
        for start in 0..=(chars.len() - needed) {
            let mut repeats = 1usize;
            let mut pos = start + unit;
            while pos + unit <= chars.len() && chars[pos..pos + unit] == chars[start..start + unit]
            {
                repeats += 1;
                if repeats >= min_repeats {
                    return true;
                }
                pos += unit;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> SpamClassifier {
        SpamClassifier::new()
    }

    #[test]
    fn empty_text_is_not_spam() {
        assert_eq!(classifier().classify(""), None);
    }

    #[test]
    fn mentions_and_invite_links_are_promotional() {
        let c = classifier();
        assert_eq!(
            c.classify("join @cryptochannel now"),
            Some(SpamReason::PromotionalLinks)
        );
        assert_eq!(
            c.classify("see t.me/freestuff"),
            Some(SpamReason::PromotionalLinks)
        );
        assert_eq!(
            c.classify("telegram.me/group"),
            Some(SpamReason::PromotionalLinks)
        );
    }

    #[test]
    fn promotional_rule_wins_over_all_caps() {
        // Matches both rule 1 and rule 3; priority order decides.
        assert_eq!(
            classifier().classify("@SPAMCHANNEL JOIN NOW!!"),
            Some(SpamReason::PromotionalLinks)
        );
    }

    #[test]
    fn char_run_triggers_at_exactly_six() {
        let c = classifier();
        assert_eq!(c.classify("aaaaaa"), Some(SpamReason::RepeatedCharacters));
        assert_eq!(c.classify("aaaaa"), None);
        assert_eq!(
            c.classify("wow \u{1F602}\u{1F602}\u{1F602}\u{1F602}\u{1F602}\u{1F602}"),
            Some(SpamReason::RepeatedCharacters)
        );
    }

    #[test]
    fn all_caps_requires_ten_chars_and_zero_lowercase() {
        let c = classifier();
        assert_eq!(c.classify("HI"), None);
        assert_eq!(c.classify("HELLO WORLD!"), Some(SpamReason::ExcessiveCaps));
        assert_eq!(c.classify("HELLO World!!"), None);
        // Digits are outside the permitted set.
        assert_eq!(c.classify("CALL 555 NOW!!"), None);
        // Surrounding whitespace does not count towards the length.
        assert_eq!(c.classify("   HELLO!!   "), None);
    }

    #[test]
    fn shortener_domains_are_suspicious() {
        let c = classifier();
        assert_eq!(
            c.classify("click bit.ly/win"),
            Some(SpamReason::SuspiciousDomains)
        );
        assert_eq!(
            c.classify("get it at free.money today"),
            Some(SpamReason::SuspiciousDomains)
        );
        assert_eq!(c.classify("shorturl is fine"), None);
    }

    #[test]
    fn flooding_triggers_at_eleven_unit_repeats() {
        let c = classifier();
        assert_eq!(c.classify(&"ab".repeat(11)), Some(SpamReason::Flooding));
        assert_eq!(c.classify(&"ab".repeat(9)), None);
        assert_eq!(c.classify(&"xyz".repeat(11)), Some(SpamReason::Flooding));
    }

    #[test]
    fn ordinary_chatter_is_clean() {
        let c = classifier();
        assert_eq!(c.classify("hey, are we still on for tonight?"), None);
        assert_eq!(c.classify("That's great news!"), None);
    }

    #[test]
    fn verdicts_are_deterministic() {
        let c = classifier();
        for _ in 0..3 {
            assert_eq!(c.classify("aaaaaa"), Some(SpamReason::RepeatedCharacters));
            assert_eq!(c.classify("hello there"), None);
        }
    }
}
