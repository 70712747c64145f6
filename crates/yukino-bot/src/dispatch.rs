//! Gateway event dispatch.
//!
//! The platform adapter delivers message and voice-state events here. Each
//! handler runs the gating checks synchronously (bot author? guild? speaker
//! in voice? relay enabled?), builds the spoken text, and hands off to the
//! relay queue — no blocking work on the event path.

use once_cell::sync::Lazy;
use regex::Regex;
use yukino_types::{ChannelId, GuildId, TtsSettings, UserId};
use yukino_voice::SpeechRequest;

use crate::commands::resolve_speech_request;
use crate::config::SpeakerGate;
use crate::{with_conn, AppState};

/// Character cap for relayed chat messages (voice announcements and the
/// reply prefix are not counted against it).
pub const MESSAGE_SPEECH_CHARS: usize = 40;

/// Suffix spoken when a message was cut short.
pub const TRUNCATION_SUFFIX: &str = "（以下省略）";

/// Marker phrase; text after it is skipped explicitly by the author.
static OMISSION_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"以下(?:省略|略)").expect("valid regex"));

/// An inbound chat message, as delivered by the platform adapter.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    /// Absent for direct messages, which are never relayed.
    pub guild_id: Option<GuildId>,
    pub author_id: UserId,
    pub author_is_bot: bool,
    pub content: String,
    /// Author of the message this one replies to, when resolvable.
    pub reply_to: Option<UserId>,
}

/// A member's voice-channel move, as delivered by the platform adapter.
#[derive(Debug, Clone)]
pub struct VoiceStateEvent {
    pub guild_id: Option<GuildId>,
    pub user_id: UserId,
    pub user_is_bot: bool,
    pub before_channel: Option<ChannelId>,
    pub after_channel: Option<ChannelId>,
}

/// Relays a chat message into the guild's voice channel.
///
/// Returns true when the message was queued for synthesis; false when any
/// gate dropped it.
pub async fn handle_message(state: &AppState, event: &MessageEvent) -> bool {
    if event.author_is_bot {
        return false;
    }
    let Some(guild_id) = event.guild_id else {
        return false;
    };

    // The author must be in voice; which channel depends on policy.
    let author_channel = state
        .roster
        .voice_members(guild_id)
        .into_iter()
        .find(|member| member.user_id == event.author_id)
        .map(|member| member.channel_id);
    let Some(author_channel) = author_channel else {
        return false;
    };

    if !state.gateway.is_connected(guild_id) {
        return false;
    }
    if state.speaker_gate == SpeakerGate::SameChannel
        && state.gateway.connected_channel(guild_id) != Some(author_channel)
    {
        return false;
    }

    let Some(settings) = load_settings(state, guild_id).await else {
        return false;
    };
    if !settings.enabled {
        return false;
    }

    let reply_prefix = match event.reply_to {
        Some(user_id) => state
            .roster
            .display_name(guild_id, user_id)
            .map(|name| format!("{name}さんへのリプライ。"))
            .unwrap_or_default(),
        None => String::new(),
    };

    // An explicit marker cuts the message short at its position.
    let (body, marker_suffix) = match OMISSION_MARKER_RE.find(&event.content) {
        Some(found) => (event.content[..found.start()].trim(), TRUNCATION_SUFFIX),
        None => (event.content.as_str(), ""),
    };

    let sanitized = yukino_tts::sanitize::sanitize(body, state.roster.as_ref(), guild_id);
    if sanitized.is_empty() {
        return false;
    }

    let mut suffix = marker_suffix;
    let sanitized = if sanitized.chars().count() > MESSAGE_SPEECH_CHARS {
        suffix = TRUNCATION_SUFFIX;
        yukino_tts::sanitize::truncate_chars(&sanitized, MESSAGE_SPEECH_CHARS).to_string()
    } else {
        sanitized
    };

    let text = format!("{reply_prefix}{sanitized}{suffix}");
    let request =
        resolve_speech_request(state, guild_id, event.author_id, settings.speaker_id).await;

    enqueue(state, guild_id, text, request)
}

/// Announces a member joining or leaving the bot's voice channel.
///
/// Returns true when an announcement was queued.
pub async fn handle_voice_state(state: &AppState, event: &VoiceStateEvent) -> bool {
    if event.user_is_bot {
        return false;
    }
    let Some(guild_id) = event.guild_id else {
        return false;
    };

    let Some(bot_channel) = state.gateway.connected_channel(guild_id) else {
        return false;
    };

    let joined =
        event.before_channel != Some(bot_channel) && event.after_channel == Some(bot_channel);
    let left =
        event.before_channel == Some(bot_channel) && event.after_channel != Some(bot_channel);
    if !(joined || left) {
        return false;
    }

    let Some(settings) = load_settings(state, guild_id).await else {
        return false;
    };
    if !settings.enabled {
        return false;
    }

    let Some(name) = state.roster.display_name(guild_id, event.user_id) else {
        return false;
    };
    let text = if joined {
        format!("{name}さんが接続しました")
    } else {
        format!("{name}さんが退出しました")
    };

    tracing::info!(guild_id, user_id = event.user_id, joined, "voice state announcement");
    enqueue(
        state,
        guild_id,
        text,
        SpeechRequest::for_speaker(settings.speaker_id),
    )
}

/// Queues text on the guild pipeline, creating it lazily. Settings were
/// checked by the caller; the pipeline may be missing after a restart even
/// though the guild has TTS enabled.
fn enqueue(state: &AppState, guild_id: GuildId, text: String, request: SpeechRequest) -> bool {
    if !state.relay.is_active(guild_id) {
        state.relay.enable(guild_id);
    }

    let queued = state.relay.enqueue(guild_id, text.clone(), request);
    if queued {
        let preview: String = text.chars().take(20).collect();
        tracing::debug!(guild_id, preview = %preview, "queued for synthesis");
    }
    queued
}

async fn load_settings(state: &AppState, guild_id: GuildId) -> Option<TtsSettings> {
    match with_conn(&state.pool, move |conn| {
        yukino_store::settings::get_settings(conn, guild_id)
    })
    .await
    {
        Ok(settings) => Some(settings),
        Err(e) => {
            tracing::error!(guild_id, error = %e, "failed to read tts settings");
            None
        }
    }
}
