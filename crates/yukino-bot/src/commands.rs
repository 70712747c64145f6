//! Slash-command handlers.
//!
//! Every handler returns the user-visible reply text. Authorization and
//! precondition failures are ordinary replies, never errors; internal
//! failures are logged and reported generically without mutating state.

use yukino_types::{ChannelId, GuildId, UserId, VoiceProfile};
use yukino_voice::{SpeechRequest, DEFAULT_STYLE};

use crate::permission::{can_use_vc, is_owner_or_admin, Invoker};
use crate::{with_conn, AppState};

const NO_PERMISSION: &str = "権限がありません";
const NOT_IN_VOICE: &str = "VCに参加していません";
const INTERNAL_ERROR: &str = "内部エラーが発生しました";

/// Length cap for list-style replies.
const MAX_LIST_REPLY_CHARS: usize = 1800;

/// Who invoked a command, and from where.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub guild_id: GuildId,
    pub invoker: Invoker,
    /// The voice channel the invoker currently occupies, if any.
    pub invoker_voice_channel: Option<ChannelId>,
}

/// Optional arguments of the voice-settings commands. Omitted fields keep
/// the user's current values.
#[derive(Debug, Clone, Default)]
pub struct VoiceOptions {
    pub engine: Option<String>,
    /// VOICEVOX speaker name (requires the voicevox engine).
    pub speaker: Option<String>,
    /// VOICEVOX style name; defaults to the engine's normal style.
    pub style: Option<String>,
    /// Speech speed as a 50–200 percent value.
    pub speed: Option<i64>,
    /// Pitch as a 50–200 percent value (100 = neutral).
    pub pitch: Option<i64>,
}

/// Checks the allow-list, returning the rejection reply on failure.
async fn ensure_vc_permission(state: &AppState, ctx: &CommandContext) -> Result<(), String> {
    if is_owner_or_admin(&ctx.invoker, state.owner_id) {
        return Ok(());
    }

    let guild_id = ctx.guild_id;
    let allow = with_conn(&state.pool, move |conn| {
        yukino_store::allow::load(conn, guild_id)
    })
    .await
    .map_err(|e| {
        tracing::error!(guild_id, error = %e, "failed to load allow-list");
        INTERNAL_ERROR.to_string()
    })?;

    if can_use_vc(&ctx.invoker, state.owner_id, &allow) {
        Ok(())
    } else {
        Err(NO_PERMISSION.to_string())
    }
}

/// `/join` — connect to the invoker's voice channel and arm the watchdog.
pub async fn join(state: &AppState, ctx: &CommandContext) -> String {
    if let Err(reply) = ensure_vc_permission(state, ctx).await {
        return reply;
    }

    let Some(channel_id) = ctx.invoker_voice_channel else {
        return "先にVCへ参加してください".to_string();
    };

    let result = if state.gateway.is_connected(ctx.guild_id) {
        state.gateway.move_to(ctx.guild_id, channel_id).await
    } else {
        state.gateway.connect(ctx.guild_id, channel_id).await
    };
    if let Err(e) = result {
        tracing::error!(guild_id = ctx.guild_id, channel_id, error = %e, "voice connect failed");
        return "VCへの接続に失敗しました".to_string();
    }

    // One watchdog per guild; a repeated /join replaces the previous one.
    state.watchdogs.start(ctx.guild_id);

    let name = state
        .roster
        .channel_name(ctx.guild_id, channel_id)
        .unwrap_or_else(|| channel_id.to_string());
    tracing::info!(guild_id = ctx.guild_id, user_id = ctx.invoker.user_id, "/join");
    format!("「{name}」に参加しました")
}

/// `/leave` — tear the relay down and disconnect intentionally.
pub async fn leave(state: &AppState, ctx: &CommandContext) -> String {
    if let Err(reply) = ensure_vc_permission(state, ctx).await {
        return reply;
    }

    if !state.gateway.is_connected(ctx.guild_id) {
        return NOT_IN_VOICE.to_string();
    }

    let guild_id = ctx.guild_id;
    if let Err(e) = with_conn(&state.pool, move |conn| {
        yukino_store::settings::set_enabled(conn, guild_id, false)
    })
    .await
    {
        tracing::error!(guild_id, error = %e, "failed to persist tts disable");
        return INTERNAL_ERROR.to_string();
    }

    state.relay.disable(ctx.guild_id).await;
    // Mark intentional before the gateway drops, so the watchdog never
    // mistakes this for an accidental disconnect.
    state.watchdogs.stop(ctx.guild_id);

    if let Err(e) = state.gateway.disconnect(ctx.guild_id).await {
        tracing::warn!(guild_id, error = %e, "voice disconnect failed");
    }

    tracing::info!(guild_id, user_id = ctx.invoker.user_id, "/leave");
    "VCから退出しました".to_string()
}

/// `/skip` — stop the current item and drop the buffered ones.
pub async fn skip(state: &AppState, ctx: &CommandContext) -> String {
    if let Err(reply) = ensure_vc_permission(state, ctx).await {
        return reply;
    }

    if !state.gateway.is_connected(ctx.guild_id) {
        return NOT_IN_VOICE.to_string();
    }
    if !state.gateway.is_playing(ctx.guild_id) {
        return "再生中ではありません".to_string();
    }

    state.relay.skip(ctx.guild_id);
    tracing::info!(guild_id = ctx.guild_id, user_id = ctx.invoker.user_id, "/skip");
    "TTS再生をスキップしました".to_string()
}

/// `/tts_on` — persist the enabled flag and spawn the guild pipeline.
pub async fn tts_on(state: &AppState, ctx: &CommandContext) -> String {
    if let Err(reply) = ensure_vc_permission(state, ctx).await {
        return reply;
    }

    if !state.gateway.is_connected(ctx.guild_id) {
        return NOT_IN_VOICE.to_string();
    }

    let guild_id = ctx.guild_id;
    if let Err(e) = with_conn(&state.pool, move |conn| {
        yukino_store::settings::set_enabled(conn, guild_id, true)
    })
    .await
    {
        tracing::error!(guild_id, error = %e, "failed to persist tts enable");
        return INTERNAL_ERROR.to_string();
    }

    state.relay.enable(ctx.guild_id);
    tracing::info!(guild_id, user_id = ctx.invoker.user_id, "/tts_on");
    "TTS読み上げを有効化しました".to_string()
}

/// `/tts_off` — persist the disabled flag and tear the pipeline down.
pub async fn tts_off(state: &AppState, ctx: &CommandContext) -> String {
    if let Err(reply) = ensure_vc_permission(state, ctx).await {
        return reply;
    }

    if !state.gateway.is_connected(ctx.guild_id) {
        return NOT_IN_VOICE.to_string();
    }

    let guild_id = ctx.guild_id;
    if let Err(e) = with_conn(&state.pool, move |conn| {
        yukino_store::settings::set_enabled(conn, guild_id, false)
    })
    .await
    {
        tracing::error!(guild_id, error = %e, "failed to persist tts disable");
        return INTERNAL_ERROR.to_string();
    }

    state.relay.disable(ctx.guild_id).await;
    tracing::info!(guild_id, user_id = ctx.invoker.user_id, "/tts_off");
    "TTS読み上げを無効化しました".to_string()
}

/// `/setvoice` — update the invoker's own voice profile.
pub async fn set_voice(state: &AppState, ctx: &CommandContext, options: VoiceOptions) -> String {
    update_voice_profile(state, ctx.guild_id, ctx.invoker.user_id, options).await
}

/// `/setmembervoice` — update another member's voice profile (admin only).
pub async fn set_member_voice(
    state: &AppState,
    ctx: &CommandContext,
    member: UserId,
    options: VoiceOptions,
) -> String {
    if !is_owner_or_admin(&ctx.invoker, state.owner_id) {
        return NO_PERMISSION.to_string();
    }

    let reply = update_voice_profile(state, ctx.guild_id, member, options).await;
    if reply == "音声設定を更新しました" {
        let name = state
            .roster
            .display_name(ctx.guild_id, member)
            .unwrap_or_else(|| member.to_string());
        return format!("{name} の音声設定を更新しました");
    }
    reply
}

async fn update_voice_profile(
    state: &AppState,
    guild_id: GuildId,
    user_id: UserId,
    options: VoiceOptions,
) -> String {
    let current = match with_conn(&state.pool, move |conn| {
        yukino_store::profile::get_profile(conn, guild_id, user_id)
    })
    .await
    {
        Ok(profile) => profile.unwrap_or_default(),
        Err(e) => {
            tracing::error!(guild_id, user_id, error = %e, "failed to load voice profile");
            return INTERNAL_ERROR.to_string();
        }
    };

    let mut profile = current;

    if let Some(engine) = &options.engine {
        match engine.parse() {
            Ok(engine) => profile.engine = engine,
            Err(_) => return "engineは openjtalk / voicevox".to_string(),
        }
    }

    if let Some(name) = &options.speaker {
        if profile.engine != yukino_types::SynthesisEngine::Voicevox {
            return "voicevoxを使用する場合 engine=voicevox を指定してください".to_string();
        }
        let style = options.style.as_deref().unwrap_or(DEFAULT_STYLE);
        match state.catalog.style_id(name, style) {
            Some(id) => profile.speaker_id = id,
            None => return "指定された声が見つかりません".to_string(),
        }
    }

    if let Some(speed) = options.speed {
        match VoiceProfile::speed_from_percent(speed) {
            Some(speed) => profile.speed = speed,
            None => return "speedは50〜200".to_string(),
        }
    }

    if let Some(pitch) = options.pitch {
        match VoiceProfile::pitch_from_percent(pitch) {
            Some(pitch) => profile.pitch = pitch,
            None => return "pitchは50〜200".to_string(),
        }
    }

    if let Err(e) = with_conn(&state.pool, move |conn| {
        yukino_store::profile::set_profile(conn, guild_id, user_id, &profile)
    })
    .await
    {
        tracing::error!(guild_id, user_id, error = %e, "failed to save voice profile");
        return INTERNAL_ERROR.to_string();
    }

    "音声設定を更新しました".to_string()
}

/// `/voice_list` — list the installed VOICEVOX speakers.
pub fn voice_list(state: &AppState) -> String {
    let mut text = String::new();
    for speaker in state.catalog.speakers() {
        let styles: Vec<&str> = speaker.styles.iter().map(|s| s.name.as_str()).collect();
        text.push_str(&format!("{} : {}\n", speaker.name, styles.join(", ")));
    }

    let capped: String = text.chars().take(MAX_LIST_REPLY_CHARS).collect();
    format!("利用可能話者一覧\n{capped}")
}

/// `/tts_dict_add` — register a reading for a surface form.
pub async fn dict_add(
    state: &AppState,
    ctx: &CommandContext,
    surface: &str,
    reading: &str,
) -> String {
    if !is_owner_or_admin(&ctx.invoker, state.owner_id) {
        return NO_PERMISSION.to_string();
    }

    if surface.trim().is_empty()
        || surface.chars().count() > yukino_store::dict::MAX_SURFACE_CHARS
    {
        return "表記は1文字以上100文字以下である必要があります".to_string();
    }
    if reading.trim().is_empty()
        || reading.chars().count() > yukino_store::dict::MAX_READING_CHARS
    {
        return "読み方は1文字以上200文字以下である必要があります".to_string();
    }

    let guild_id = ctx.guild_id;
    let surface_owned = surface.to_string();
    let reading_owned = reading.to_string();
    let added = match with_conn(&state.pool, move |conn| {
        yukino_store::dict::add_entry(conn, guild_id, &surface_owned, &reading_owned)
    })
    .await
    {
        Ok(added) => added,
        Err(e) => {
            tracing::error!(guild_id, error = %e, "failed to add dictionary entry");
            return INTERNAL_ERROR.to_string();
        }
    };

    if !added {
        return "すでに登録されています".to_string();
    }

    format!("辞書に追加しました: `{surface}` → `{reading}`")
}

/// `/tts_dict_remove` — delete a registered surface form.
pub async fn dict_remove(state: &AppState, ctx: &CommandContext, surface: &str) -> String {
    if !is_owner_or_admin(&ctx.invoker, state.owner_id) {
        return NO_PERMISSION.to_string();
    }

    let guild_id = ctx.guild_id;
    let surface_owned = surface.to_string();
    let removed = match with_conn(&state.pool, move |conn| {
        yukino_store::dict::remove_entry(conn, guild_id, &surface_owned)
    })
    .await
    {
        Ok(removed) => removed,
        Err(e) => {
            tracing::error!(guild_id, error = %e, "failed to remove dictionary entry");
            return INTERNAL_ERROR.to_string();
        }
    };

    if !removed {
        return "見つかりませんでした".to_string();
    }

    format!("削除完了: `{surface}`")
}

/// `/tts_dict_list` — show the registered readings.
pub async fn dict_list(state: &AppState, ctx: &CommandContext) -> String {
    let guild_id = ctx.guild_id;
    let entries = match with_conn(&state.pool, move |conn| {
        yukino_store::dict::list_entries(conn, guild_id)
    })
    .await
    {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!(guild_id, error = %e, "failed to list dictionary entries");
            return INTERNAL_ERROR.to_string();
        }
    };

    if entries.is_empty() {
        return "辞書は空です。`/tts_dict_add` で単語を登録してください".to_string();
    }

    let mut text = "TTS辞書登録状況:\n".to_string();
    for (index, (surface, reading)) in entries.iter().enumerate() {
        text.push_str(&format!("{}. `{surface}` → `{reading}`\n", index + 1));
    }
    text.push_str(&format!("計 {} 件登録されています", entries.len()));

    text.chars().take(MAX_LIST_REPLY_CHARS).collect()
}

/// `/vc_allow_user_add` — permit a user to operate voice commands.
pub async fn allow_user_add(state: &AppState, ctx: &CommandContext, member: UserId) -> String {
    if !is_owner_or_admin(&ctx.invoker, state.owner_id) {
        return NO_PERMISSION.to_string();
    }

    let guild_id = ctx.guild_id;
    match with_conn(&state.pool, move |conn| {
        yukino_store::allow::add_user(conn, guild_id, member)
    })
    .await
    {
        Ok(true) => format!("<@{member}> を VC操作許可ユーザーに追加しました"),
        Ok(false) => "すでに許可されています".to_string(),
        Err(e) => {
            tracing::error!(guild_id, error = %e, "failed to add allowed user");
            INTERNAL_ERROR.to_string()
        }
    }
}

/// `/vc_allow_user_remove` — revoke a user's voice-command permission.
pub async fn allow_user_remove(state: &AppState, ctx: &CommandContext, member: UserId) -> String {
    if !is_owner_or_admin(&ctx.invoker, state.owner_id) {
        return NO_PERMISSION.to_string();
    }

    let guild_id = ctx.guild_id;
    match with_conn(&state.pool, move |conn| {
        yukino_store::allow::remove_user(conn, guild_id, member)
    })
    .await
    {
        Ok(true) => format!("<@{member}> を VC操作許可から削除しました"),
        Ok(false) => "許可されていません".to_string(),
        Err(e) => {
            tracing::error!(guild_id, error = %e, "failed to remove allowed user");
            INTERNAL_ERROR.to_string()
        }
    }
}

/// `/vc_allow_role_add` — permit a role to operate voice commands.
pub async fn allow_role_add(state: &AppState, ctx: &CommandContext, role: i64) -> String {
    if !is_owner_or_admin(&ctx.invoker, state.owner_id) {
        return NO_PERMISSION.to_string();
    }

    let guild_id = ctx.guild_id;
    match with_conn(&state.pool, move |conn| {
        yukino_store::allow::add_role(conn, guild_id, role)
    })
    .await
    {
        Ok(true) => format!("ロール <@&{role}> を VC操作許可に追加しました"),
        Ok(false) => "すでに許可されています".to_string(),
        Err(e) => {
            tracing::error!(guild_id, error = %e, "failed to add allowed role");
            INTERNAL_ERROR.to_string()
        }
    }
}

/// `/vc_allow_role_remove` — revoke a role's voice-command permission.
pub async fn allow_role_remove(state: &AppState, ctx: &CommandContext, role: i64) -> String {
    if !is_owner_or_admin(&ctx.invoker, state.owner_id) {
        return NO_PERMISSION.to_string();
    }

    let guild_id = ctx.guild_id;
    match with_conn(&state.pool, move |conn| {
        yukino_store::allow::remove_role(conn, guild_id, role)
    })
    .await
    {
        Ok(true) => format!("ロール <@&{role}> を VC操作許可から削除しました"),
        Ok(false) => "許可されていません".to_string(),
        Err(e) => {
            tracing::error!(guild_id, error = %e, "failed to remove allowed role");
            INTERNAL_ERROR.to_string()
        }
    }
}

/// `/vc_allow_list` — show the allow-list.
pub async fn allow_list(state: &AppState, ctx: &CommandContext) -> String {
    if !is_owner_or_admin(&ctx.invoker, state.owner_id) {
        return NO_PERMISSION.to_string();
    }

    let guild_id = ctx.guild_id;
    let allow = match with_conn(&state.pool, move |conn| {
        yukino_store::allow::load(conn, guild_id)
    })
    .await
    {
        Ok(allow) => allow,
        Err(e) => {
            tracing::error!(guild_id, error = %e, "failed to load allow-list");
            return INTERNAL_ERROR.to_string();
        }
    };

    let users = if allow.users.is_empty() {
        "なし".to_string()
    } else {
        allow
            .users
            .iter()
            .map(|id| format!("<@{id}>"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let roles = if allow.roles.is_empty() {
        "なし".to_string()
    } else {
        allow
            .roles
            .iter()
            .map(|id| format!("<@&{id}>"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!("VC操作 許可一覧\n許可ユーザー:\n{users}\n許可ロール:\n{roles}")
}

/// Resolves the speech parameters for a speaking user: their stored profile
/// when one exists, otherwise the guild default speaker.
pub(crate) async fn resolve_speech_request(
    state: &AppState,
    guild_id: GuildId,
    user_id: UserId,
    default_speaker: i64,
) -> SpeechRequest {
    let profile = with_conn(&state.pool, move |conn| {
        yukino_store::profile::get_profile(conn, guild_id, user_id)
    })
    .await
    .unwrap_or_else(|e| {
        tracing::warn!(guild_id, user_id, error = %e, "failed to load voice profile");
        None
    });

    match profile {
        Some(profile) => SpeechRequest::from_profile(&profile),
        None => SpeechRequest::for_speaker(default_speaker),
    }
}
