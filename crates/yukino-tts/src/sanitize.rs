//! Chat-text sanitization for speech synthesis.
//!
//! Raw message content is full of things a speech engine cannot or should
//! not pronounce: URLs, mention markup, custom emoji, pictographs, and
//! structural punctuation. [`sanitize`] strips all of it in a fixed order,
//! resolving user mentions to display names through the guild roster.
//! [`apply_readings`] substitutes dictionary readings afterwards, and
//! [`truncate_chars`] caps the result; [`clean_for_speech`] composes the
//! three the way the synthesis stage uses them.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use yukino_types::GuildId;
use yukino_voice::GuildRoster;

/// Maximum spoken-text length, in characters.
pub const MAX_SPEECH_CHARS: usize = 200;

/// Honorific appended to resolved mention names.
const MENTION_HONORIFIC: &str = "さん";

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").expect("valid regex"));
static USER_MENTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<@!?(\d+)>").expect("valid regex"));
static CHANNEL_MENTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<#\d+>").expect("valid regex"));
static CUSTOM_EMOJI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<a?:\w+:\d+>").expect("valid regex"));
// Unicode Symbol category; also removes most pictographic emoji.
static SYMBOL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{S}").expect("valid regex"));
static BRACKET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\[\]{}()<>]").expect("valid regex"));
static OPERATOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[=+*/^_|~`]").expect("valid regex"));
static MARK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[@#$%&]").expect("valid regex"));
static CURRENCY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[¥\\]").expect("valid regex"));
static PUNCT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[、。，．.!?！？;:,'"‘’“”`]"#).expect("valid regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Strips everything a speech engine cannot pronounce from raw chat text.
///
/// User mentions become the member's display name with an honorific;
/// unresolvable mentions are deleted outright rather than spoken as markup.
/// Returns an empty string when nothing speakable remains.
pub fn sanitize(raw: &str, roster: &dyn GuildRoster, guild_id: GuildId) -> String {
    let text = URL_RE.replace_all(raw, "");

    let text = USER_MENTION_RE.replace_all(&text, |caps: &Captures| {
        caps[1]
            .parse::<i64>()
            .ok()
            .and_then(|user_id| roster.display_name(guild_id, user_id))
            .map(|name| format!("{name}{MENTION_HONORIFIC}"))
            .unwrap_or_default()
    });

    let text = CHANNEL_MENTION_RE.replace_all(&text, "");
    let text = CUSTOM_EMOJI_RE.replace_all(&text, "");
    let text = SYMBOL_RE.replace_all(&text, "");
    let text = BRACKET_RE.replace_all(&text, "");
    let text = OPERATOR_RE.replace_all(&text, "");
    let text = MARK_RE.replace_all(&text, "");
    let text = CURRENCY_RE.replace_all(&text, "");
    let text = PUNCT_RE.replace_all(&text, "");

    WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
}

/// Substitutes dictionary readings into sanitized text.
///
/// Longer surfaces are applied first so a short surface never clobbers part
/// of a longer registered token.
pub fn apply_readings(text: &str, entries: &[(String, String)]) -> String {
    let mut ordered: Vec<&(String, String)> = entries.iter().collect();
    ordered.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));

    let mut out = text.to_string();
    for (surface, reading) in ordered {
        out = out.replace(surface.as_str(), reading);
    }
    out
}

/// Truncates to at most `max` characters (not bytes).
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// The full cleaning pipeline as the synthesis stage runs it: sanitize,
/// substitute readings, then cap the length.
pub fn clean_for_speech(
    raw: &str,
    roster: &dyn GuildRoster,
    guild_id: GuildId,
    readings: &[(String, String)],
) -> String {
    let clean = sanitize(raw, roster, guild_id);
    if clean.is_empty() {
        return clean;
    }
    let spoken = apply_readings(&clean, readings);
    truncate_chars(&spoken, MAX_SPEECH_CHARS).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use yukino_types::{ChannelId, UserId};
    use yukino_voice::VoiceMember;

    struct StubRoster;

    impl GuildRoster for StubRoster {
        fn guild_exists(&self, _guild_id: GuildId) -> bool {
            true
        }

        fn display_name(&self, _guild_id: GuildId, user_id: UserId) -> Option<String> {
            match user_id {
                123 => Some("Alice".to_string()),
                456 => Some("ゆきの".to_string()),
                _ => None,
            }
        }

        fn channel_name(&self, _guild_id: GuildId, _channel_id: ChannelId) -> Option<String> {
            None
        }

        fn voice_members(&self, _guild_id: GuildId) -> Vec<VoiceMember> {
            Vec::new()
        }
    }

    fn run(raw: &str) -> String {
        sanitize(raw, &StubRoster, 1)
    }

    #[test]
    fn urls_are_stripped() {
        assert_eq!(run("see https://example.com/path?q=1 here"), "see here");
        assert_eq!(run("http://x.com"), "");
    }

    #[test]
    fn resolvable_mention_becomes_display_name_with_honorific() {
        assert_eq!(run("<@123> おはよう"), "Aliceさん おはよう");
        assert_eq!(run("<@!456>です"), "ゆきのさんです");
    }

    #[test]
    fn unresolvable_mention_only_message_is_empty() {
        assert_eq!(run("<@999>"), "");
        assert_eq!(run("<@!999> <@888>"), "");
    }

    #[test]
    fn channel_mentions_and_custom_emoji_are_deleted() {
        assert_eq!(run("go to <#555> now"), "go to now");
        assert_eq!(run("nice <:smile:12345> work"), "nice work");
        assert_eq!(run("nice <a:party:12345> work"), "nice work");
    }

    #[test]
    fn symbols_and_pictographs_are_deleted() {
        assert_eq!(run("やった😀🎉"), "やった");
        assert_eq!(run("a + b = c"), "a b c");
        assert_eq!(run("100円と$5と¥300"), "100円と5と300");
    }

    #[test]
    fn punctuation_set_is_deleted() {
        assert_eq!(run("そうだね、。それで！？"), "そうだねそれで");
        assert_eq!(run("[test] {case} (one) <two>"), "test case one two");
        assert_eq!(run("\"quoted\" 'text' ‘curly’ “ones”"), "quoted text curly ones");
    }

    #[test]
    fn whitespace_runs_collapse() {
        assert_eq!(run("a\n\nb\t c"), "a b c");
        assert_eq!(run("   "), "");
    }

    #[test]
    fn short_message_passes_through() {
        assert_eq!(run("こんにちは みなさん"), "こんにちは みなさん");
    }

    #[test]
    fn message_event_end_to_end() {
        assert_eq!(
            run("Hello <@123> check http://x.com 😀!!!"),
            "Hello Aliceさん check"
        );
    }

    #[test]
    fn readings_substitute_longest_surface_first() {
        let entries = vec![
            ("ab".to_string(), "X".to_string()),
            ("abc".to_string(), "Y".to_string()),
        ];
        assert_eq!(apply_readings("abcab", &entries), "YX");

        let entries = vec![
            ("京".to_string(), "きょう".to_string()),
            ("東京".to_string(), "とうきょう".to_string()),
        ];
        assert_eq!(apply_readings("東京", &entries), "とうきょう");
    }

    #[test]
    fn truncate_is_char_based() {
        assert_eq!(truncate_chars("あいうえお", 3), "あいう");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn clean_for_speech_respects_the_cap() {
        let long = "あ".repeat(500);
        let spoken = clean_for_speech(&long, &StubRoster, 1, &[]);
        assert_eq!(spoken.chars().count(), MAX_SPEECH_CHARS);
    }

    #[test]
    fn clean_for_speech_applies_readings_before_the_cap() {
        // A reading that expands the text still lands inside the cap.
        let entries = vec![("短".to_string(), "み".repeat(300))];
        let spoken = clean_for_speech("短", &StubRoster, 1, &entries);
        assert_eq!(spoken.chars().count(), MAX_SPEECH_CHARS);
        assert!(spoken.starts_with("み"));
    }

    #[test]
    fn cleaned_output_contains_no_excluded_classes() {
        let noisy = "check <#1> <:e:2> https://a.b [x] a+b @c 😀 “q” 終わり！";
        let spoken = clean_for_speech(noisy, &StubRoster, 1, &[]);
        for forbidden in ['<', '>', '[', ']', '+', '@', '😀', '“', '”', '！'] {
            assert!(
                !spoken.contains(forbidden),
                "{forbidden:?} survived in {spoken:?}"
            );
        }
        assert!(!spoken.contains("https"));
    }
}
