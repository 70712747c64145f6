//! Chat-platform voice gateway interface.
//!
//! The platform SDK adapter implements these traits; the relay worker, the
//! watchdog, and the command layer consume them. Playback is fire-and-forget
//! from the gateway's perspective: `play` starts a buffer, `is_playing`
//! reports progress, `stop` interrupts. The worker owns sequencing.

use async_trait::async_trait;
use yukino_types::{ChannelId, GuildId, UserId};

use crate::error::VoiceError;

/// Operations on a guild's voice connection.
#[async_trait]
pub trait VoiceGateway: Send + Sync {
    /// Connects to the given voice channel, replacing any prior connection.
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), VoiceError>;

    /// Disconnects from the guild's voice channel.
    async fn disconnect(&self, guild_id: GuildId) -> Result<(), VoiceError>;

    /// Moves an existing connection to another channel.
    async fn move_to(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), VoiceError>;

    /// Starts playing an audio buffer at the given volume (0.0–1.0).
    ///
    /// Returns once playback has started; completion is observed through
    /// [`VoiceGateway::is_playing`].
    async fn play(&self, guild_id: GuildId, audio: Vec<u8>, volume: f32) -> Result<(), VoiceError>;

    /// Stops the currently playing buffer, if any.
    async fn stop(&self, guild_id: GuildId) -> Result<(), VoiceError>;

    /// Returns true while the guild has a live voice connection.
    fn is_connected(&self, guild_id: GuildId) -> bool;

    /// Returns true while a buffer is playing on the guild's connection.
    fn is_playing(&self, guild_id: GuildId) -> bool;

    /// Returns the channel the bot is connected to, if any.
    fn connected_channel(&self, guild_id: GuildId) -> Option<ChannelId>;
}

/// A member currently present in one of the guild's voice channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceMember {
    pub user_id: UserId,
    pub channel_id: ChannelId,
}

/// Read access to the guild roster the platform keeps in its cache.
pub trait GuildRoster: Send + Sync {
    /// Returns false once the bot has been removed from the guild.
    fn guild_exists(&self, guild_id: GuildId) -> bool;

    /// Resolves a member's display name, if the member is still present.
    fn display_name(&self, guild_id: GuildId, user_id: UserId) -> Option<String>;

    /// Resolves a channel's display name.
    fn channel_name(&self, guild_id: GuildId, channel_id: ChannelId) -> Option<String>;

    /// Lists members currently in any of the guild's voice channels.
    fn voice_members(&self, guild_id: GuildId) -> Vec<VoiceMember>;
}
