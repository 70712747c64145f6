//! Voice-connection watchdog.
//!
//! One background loop per guild with a voice tenancy. It distinguishes an
//! intentional `/leave` (manual-disconnect flag) from an unexpected drop:
//! on a drop it reconnects to the voice channel that still has members and
//! recreates the relay pipeline, whose old queues are bound to the dead
//! connection. The loop never gives up on transient reconnect failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use yukino_db::DbPool;
use yukino_types::{GuildId, TtsSettings};

use crate::registry::TtsRelay;

/// Fixed poll interval between health checks.
pub const WATCHDOG_INTERVAL: Duration = Duration::from_secs(3);

struct WatchdogHandle {
    manual_disconnect: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

/// At most one watchdog per guild. `start` replaces any previous loop;
/// `stop` signals a manual disconnect and lets the loop wind down on its
/// own next tick.
pub struct WatchdogSet {
    relay: Arc<TtsRelay>,
    handles: Mutex<HashMap<GuildId, WatchdogHandle>>,
}

impl WatchdogSet {
    pub fn new(relay: Arc<TtsRelay>) -> Self {
        Self {
            relay,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Starts (or replaces) the guild's watchdog.
    pub fn start(&self, guild_id: GuildId) {
        let mut handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(old) = handles.remove(&guild_id) {
            old.task.abort();
        }

        let manual_disconnect = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(watchdog_loop(
            self.relay.clone(),
            guild_id,
            manual_disconnect.clone(),
        ));

        handles.insert(
            guild_id,
            WatchdogHandle {
                manual_disconnect,
                task,
            },
        );
        tracing::info!(guild_id, "voice watchdog started");
    }

    /// Marks the guild's disconnect as intentional. The loop observes the
    /// flag on its next tick and terminates instead of reconnecting.
    pub fn stop(&self, guild_id: GuildId) {
        let mut handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = handles.remove(&guild_id) {
            handle.manual_disconnect.store(true, Ordering::SeqCst);
        }
    }

    /// Returns true while a watchdog loop is registered for the guild.
    pub fn is_running(&self, guild_id: GuildId) -> bool {
        self.handles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&guild_id)
    }
}

async fn watchdog_loop(
    relay: Arc<TtsRelay>,
    guild_id: GuildId,
    manual_disconnect: Arc<AtomicBool>,
) {
    let ctx = relay.context().clone();

    loop {
        tokio::time::sleep(WATCHDOG_INTERVAL).await;

        if !ctx.roster.guild_exists(guild_id) {
            tracing::info!(guild_id, "guild gone, stopping voice watchdog");
            return;
        }

        if manual_disconnect.swap(false, Ordering::SeqCst) {
            tracing::info!(guild_id, "manual disconnect, stopping voice watchdog");
            return;
        }

        if ctx.gateway.is_connected(guild_id) {
            continue;
        }

        // Lowest user id wins so repeated ticks pick the same target.
        let target = ctx
            .roster
            .voice_members(guild_id)
            .into_iter()
            .min_by_key(|member| member.user_id)
            .map(|member| member.channel_id);

        let Some(channel_id) = target else {
            continue;
        };

        let settings = match load_settings(&ctx.pool, guild_id).await {
            Ok(settings) => settings,
            Err(e) => {
                tracing::error!(guild_id, error = %e, "failed to read tts settings");
                continue;
            }
        };
        if !settings.enabled {
            tracing::info!(guild_id, "tts disabled, stopping voice watchdog");
            return;
        }

        match ctx.gateway.connect(guild_id, channel_id).await {
            Ok(()) => {
                tracing::info!(guild_id, channel_id, "voice reconnect succeeded");
                relay.restart(guild_id).await;
            }
            Err(e) => {
                tracing::error!(guild_id, channel_id, error = %e, "voice reconnect failed");
            }
        }
    }
}

async fn load_settings(pool: &DbPool, guild_id: GuildId) -> Result<TtsSettings, String> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        yukino_store::settings::get_settings(&conn, guild_id).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| e.to_string())?
}
