//! The per-guild synthesis and playback stages.
//!
//! Each guild session runs two tasks. The synthesis stage drains the text
//! queue, re-sanitizes against the current roster (membership may have
//! changed since enqueue), applies dictionary readings, and hands audio to
//! the playback stage. The playback stage plays buffers sequentially on the
//! guild's voice connection, polling for completion and honoring the skip
//! flag.
//!
//! Failures inside either loop are logged and the offending item dropped;
//! only session teardown ends the loops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use yukino_db::DbPool;
use yukino_types::GuildId;
use yukino_voice::{GuildRoster, Synthesizer, VoiceGateway};

use crate::sanitize::clean_for_speech;
use crate::session::{GuildVoiceSession, PlaybackItem, SpeechItem};

/// Fixed playback attenuation; the relay never plays at full volume.
pub const PLAYBACK_VOLUME: f32 = 0.7;

/// Poll interval of the is-playing busy-wait (also the skip latency bound).
pub const PLAYING_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long the playback stage sleeps when the voice connection is down,
/// covering the window until the watchdog reconnects.
pub const DISCONNECTED_RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// Idle receive timeout of the playback stage; bounds how stale its view of
/// connection liveness can get while no audio is queued.
pub const IDLE_RECV_TIMEOUT: Duration = Duration::from_millis(500);

/// Characters of spoken text kept for log previews.
const PREVIEW_CHARS: usize = 20;

/// Shared collaborators handed to every guild pipeline at spawn time.
#[derive(Clone)]
pub struct RelayContext {
    pub gateway: Arc<dyn VoiceGateway>,
    pub roster: Arc<dyn GuildRoster>,
    pub synthesizer: Arc<dyn Synthesizer>,
    pub pool: DbPool,
}

pub(crate) fn spawn_session(ctx: RelayContext, guild_id: GuildId) -> GuildVoiceSession {
    let (text_tx, text_rx) = mpsc::unbounded_channel();
    let (play_tx, play_rx) = mpsc::unbounded_channel();
    let skip = Arc::new(AtomicBool::new(false));

    let synthesis_task = tokio::spawn(synthesis_loop(ctx.clone(), guild_id, text_rx, play_tx));
    let playback_task = tokio::spawn(playback_loop(ctx, guild_id, play_rx, skip.clone()));

    GuildVoiceSession {
        text_tx,
        skip,
        synthesis_task,
        playback_task,
    }
}

async fn synthesis_loop(
    ctx: RelayContext,
    guild_id: GuildId,
    mut text_rx: mpsc::UnboundedReceiver<SpeechItem>,
    play_tx: mpsc::UnboundedSender<PlaybackItem>,
) {
    while let Some(item) = text_rx.recv().await {
        let readings = match load_readings(&ctx.pool, guild_id).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(guild_id, error = %e, "failed to load reading dictionary");
                Vec::new()
            }
        };

        // Sanitize again here: the roster may have changed since enqueue,
        // which affects mention resolution.
        let spoken = clean_for_speech(&item.text, ctx.roster.as_ref(), guild_id, &readings);
        if spoken.is_empty() {
            continue;
        }

        let audio = match ctx.synthesizer.synthesize(&spoken, &item.request).await {
            Ok(audio) => audio,
            Err(e) => {
                tracing::error!(guild_id, error = %e, "synthesis failed, dropping item");
                continue;
            }
        };

        let preview: String = spoken.chars().take(PREVIEW_CHARS).collect();
        if play_tx.send(PlaybackItem { audio, preview }).is_err() {
            break;
        }
    }
}

async fn playback_loop(
    ctx: RelayContext,
    guild_id: GuildId,
    mut play_rx: mpsc::UnboundedReceiver<PlaybackItem>,
    skip: Arc<AtomicBool>,
) {
    loop {
        if !ctx.gateway.is_connected(guild_id) {
            tokio::time::sleep(DISCONNECTED_RETRY_INTERVAL).await;
            continue;
        }

        let item = match tokio::time::timeout(IDLE_RECV_TIMEOUT, play_rx.recv()).await {
            // Idle; loop around to re-check connection liveness.
            Err(_) => continue,
            // Senders gone; the session is being torn down.
            Ok(None) => break,
            Ok(Some(item)) => item,
        };

        if let Err(e) = ctx
            .gateway
            .play(guild_id, item.audio, PLAYBACK_VOLUME)
            .await
        {
            tracing::error!(guild_id, preview = %item.preview, error = %e, "playback failed");
            continue;
        }
        tracing::debug!(guild_id, preview = %item.preview, "playing");

        while ctx.gateway.is_playing(guild_id) {
            if skip.swap(false, Ordering::SeqCst) {
                if let Err(e) = ctx.gateway.stop(guild_id).await {
                    tracing::warn!(guild_id, error = %e, "failed to stop playback on skip");
                }
                // Discard synthesized-but-unplayed items; text still in the
                // synthesis queue is preserved and will play later.
                while play_rx.try_recv().is_ok() {}
                break;
            }
            tokio::time::sleep(PLAYING_POLL_INTERVAL).await;
        }
    }
}

/// Loads the guild's reading dictionary off the async scheduler.
async fn load_readings(pool: &DbPool, guild_id: GuildId) -> Result<Vec<(String, String)>, String> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        yukino_store::dict::list_entries(&conn, guild_id).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| e.to_string())?
}
