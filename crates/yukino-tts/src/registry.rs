//! The session registry: at most one live pipeline per guild.

use std::collections::HashMap;
use std::sync::Mutex;
use yukino_types::GuildId;
use yukino_voice::SpeechRequest;

use crate::session::{GuildVoiceSession, SpeechItem};
use crate::worker::{spawn_session, RelayContext};

/// Owns every guild's relay session and the collaborators they share.
///
/// The map lock is a `std::sync::Mutex` intentionally: all acquisitions are
/// brief HashMap operations that never span `.await` points. Mutation only
/// happens from the command/event-handling context; worker tasks receive
/// their channels at spawn time and never touch the registry.
pub struct TtsRelay {
    ctx: RelayContext,
    sessions: Mutex<HashMap<GuildId, GuildVoiceSession>>,
}

impl TtsRelay {
    pub fn new(ctx: RelayContext) -> Self {
        Self {
            ctx,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the shared collaborators (used by the watchdog).
    pub fn context(&self) -> &RelayContext {
        &self.ctx
    }

    /// Spawns the guild's pipeline if none exists. Idempotent.
    pub fn enable(&self, guild_id: GuildId) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .entry(guild_id)
            .or_insert_with(|| spawn_session(self.ctx.clone(), guild_id));
    }

    /// Tears the guild's pipeline down: cancels both tasks, discards the
    /// queues, and stops any buffer still playing on the connection. No-op
    /// when no session exists.
    pub async fn disable(&self, guild_id: GuildId) {
        let session = {
            let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
            sessions.remove(&guild_id)
        };

        if let Some(session) = session {
            session.shutdown();
            if self.ctx.gateway.is_playing(guild_id) {
                if let Err(e) = self.ctx.gateway.stop(guild_id).await {
                    tracing::warn!(guild_id, error = %e, "failed to stop playback on disable");
                }
            }
            tracing::info!(guild_id, "tts session removed");
        }
    }

    /// Recreates the guild's pipeline. Used after a forced reconnect, when
    /// the old queues are bound to a dead connection.
    pub async fn restart(&self, guild_id: GuildId) {
        self.disable(guild_id).await;
        self.enable(guild_id);
    }

    /// Queues text for the guild. Silently dropped when no session exists;
    /// callers are expected to have checked settings first.
    pub fn enqueue(&self, guild_id: GuildId, text: String, request: SpeechRequest) -> bool {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        match sessions.get(&guild_id) {
            Some(session) => session.enqueue(SpeechItem { text, request }),
            None => false,
        }
    }

    /// Raises the guild's skip flag. Returns false when no session exists.
    pub fn skip(&self, guild_id: GuildId) -> bool {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        match sessions.get(&guild_id) {
            Some(session) => {
                session.request_skip();
                true
            }
            None => false,
        }
    }

    /// Returns true while the guild has a live pipeline.
    pub fn is_active(&self, guild_id: GuildId) -> bool {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&guild_id)
    }
}
