//! YukinoBot application logic.
//!
//! Glues the relay core to the chat platform: slash-command handlers,
//! message/voice-state event dispatch, permission checks, and configuration.
//! The platform SDK adapter delivers events into [`dispatch`] and implements
//! the `yukino-voice` gateway traits; everything here is SDK-agnostic.

pub mod commands;
pub mod config;
pub mod dispatch;
pub mod permission;

use std::sync::Arc;
use yukino_db::DbPool;
use yukino_tts::{RelayContext, TtsRelay, WatchdogSet};
use yukino_types::UserId;
use yukino_voice::{GuildRoster, Synthesizer, VoiceCatalog, VoiceGateway};

use config::SpeakerGate;

/// Application state shared by command handlers and event dispatch.
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// The TTS relay (per-guild pipelines).
    pub relay: Arc<TtsRelay>,
    /// Per-guild reconnect watchdogs.
    pub watchdogs: WatchdogSet,
    /// Voice operations on the chat platform.
    pub gateway: Arc<dyn VoiceGateway>,
    /// Guild roster lookups on the chat platform.
    pub roster: Arc<dyn GuildRoster>,
    /// Installed VOICEVOX speakers, fetched at startup.
    pub catalog: Arc<VoiceCatalog>,
    /// The bot operator; always permitted to run voice commands.
    pub owner_id: UserId,
    /// Which voice channel a speaker must occupy for relay.
    pub speaker_gate: SpeakerGate,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: DbPool,
        gateway: Arc<dyn VoiceGateway>,
        roster: Arc<dyn GuildRoster>,
        synthesizer: Arc<dyn Synthesizer>,
        catalog: Arc<VoiceCatalog>,
        owner_id: UserId,
        speaker_gate: SpeakerGate,
    ) -> Self {
        let relay = Arc::new(TtsRelay::new(RelayContext {
            gateway: gateway.clone(),
            roster: roster.clone(),
            synthesizer,
            pool: pool.clone(),
        }));
        let watchdogs = WatchdogSet::new(relay.clone());

        Self {
            pool,
            relay,
            watchdogs,
            gateway,
            roster,
            catalog,
            owner_id,
            speaker_gate,
        }
    }
}

/// Runs a store operation on the blocking pool with a pooled connection.
pub(crate) async fn with_conn<T, F>(pool: &DbPool, op: F) -> Result<T, String>
where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Connection) -> Result<T, yukino_store::StoreError> + Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        op(&conn).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| e.to_string())?
}
