//! Shared types and constants for the YukinoBot platform.
//!
//! This crate provides the foundational types used across all bot crates:
//! platform id aliases, the synthesis engine selector, per-guild TTS
//! settings, per-user voice profiles, and the voice-command allow-list.
//!
//! No crate in the workspace depends on anything *except* `yukino-types` for
//! cross-cutting type definitions. This keeps the dependency graph clean and
//! prevents circular dependencies.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Guild (server) identifier assigned by the chat platform.
pub type GuildId = i64;
/// User identifier assigned by the chat platform.
pub type UserId = i64;
/// Channel identifier assigned by the chat platform.
pub type ChannelId = i64;
/// Role identifier assigned by the chat platform.
pub type RoleId = i64;

/// The guild-default speaker id used when no explicit speaker is configured.
pub const DEFAULT_SPEAKER_ID: i64 = 1;

/// Supported speech-synthesis engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisEngine {
    /// Open JTalk (local process, fast, single voice per model).
    #[default]
    OpenJtalk,
    /// VOICEVOX (HTTP engine, multi-speaker, styled voices).
    Voicevox,
}

/// Error returned when an engine name cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown synthesis engine: {0}")]
pub struct UnknownEngine(pub String);

impl SynthesisEngine {
    /// Returns the storage/display label for this engine.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenJtalk => "openjtalk",
            Self::Voicevox => "voicevox",
        }
    }
}

impl std::str::FromStr for SynthesisEngine {
    type Err = UnknownEngine;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openjtalk" => Ok(Self::OpenJtalk),
            "voicevox" => Ok(Self::Voicevox),
            other => Err(UnknownEngine(other.to_string())),
        }
    }
}

/// Durable per-guild TTS relay settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TtsSettings {
    /// Whether inbound chat messages are relayed to the voice channel.
    pub enabled: bool,
    /// Guild-default speaker id for users without a voice profile.
    pub speaker_id: i64,
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            speaker_id: DEFAULT_SPEAKER_ID,
        }
    }
}

/// Durable per-user voice configuration.
///
/// Speed and pitch are stored as engine-level values, not as the 50–200
/// percent command inputs. See [`VoiceProfile::speed_from_percent`] and
/// [`VoiceProfile::pitch_from_percent`] for the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub engine: SynthesisEngine,
    pub speaker_id: i64,
    /// Speech speed multiplier (1.0 is normal).
    pub speed: f32,
    /// Pitch shift (0.0 is neutral).
    pub pitch: f32,
}

impl Default for VoiceProfile {
    fn default() -> Self {
        Self {
            engine: SynthesisEngine::OpenJtalk,
            speaker_id: DEFAULT_SPEAKER_ID,
            speed: 1.0,
            pitch: 0.0,
        }
    }
}

/// Inclusive bounds of the user-facing percent scale for speed and pitch.
pub const PERCENT_MIN: i64 = 50;
pub const PERCENT_MAX: i64 = 200;

impl VoiceProfile {
    /// Maps a 50–200 percent input to a 0.5–2.0 speed multiplier.
    ///
    /// Returns `None` when the input is out of bounds.
    pub fn speed_from_percent(percent: i64) -> Option<f32> {
        (PERCENT_MIN..=PERCENT_MAX)
            .contains(&percent)
            .then(|| percent as f32 / 100.0)
    }

    /// Maps a 50–200 percent input to a -0.5..=1.0 pitch shift (100 = 0.0).
    ///
    /// Returns `None` when the input is out of bounds.
    pub fn pitch_from_percent(percent: i64) -> Option<f32> {
        (PERCENT_MIN..=PERCENT_MAX)
            .contains(&percent)
            .then(|| (percent - 100) as f32 / 100.0)
    }
}

/// The set of users and roles permitted to operate voice commands in a guild.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllowList {
    pub users: Vec<UserId>,
    pub roles: Vec<RoleId>,
}

impl AllowList {
    /// Returns true when the user id is explicitly allowed.
    pub fn contains_user(&self, user_id: UserId) -> bool {
        self.users.contains(&user_id)
    }

    /// Returns true when any of the member's roles is allowed.
    pub fn intersects_roles(&self, role_ids: &[RoleId]) -> bool {
        role_ids.iter().any(|id| self.roles.contains(id))
    }
}
