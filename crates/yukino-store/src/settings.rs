//! Per-guild TTS relay settings.
//!
//! Reads create the row with schema defaults when it is absent, so every
//! caller observes the same documented defaults (`enabled = false`,
//! `speaker_id = 1`) without a separate provisioning step.

use rusqlite::{params, Connection};
use yukino_types::{GuildId, TtsSettings};

use crate::StoreError;

/// Returns the guild's TTS settings, creating the row with defaults when
/// none exists.
pub fn get_settings(conn: &Connection, guild_id: GuildId) -> Result<TtsSettings, StoreError> {
    conn.execute(
        "INSERT OR IGNORE INTO tts_settings (guild_id) VALUES (?1)",
        params![guild_id],
    )?;

    let settings = conn.query_row(
        "SELECT enabled, speaker_id FROM tts_settings WHERE guild_id = ?1",
        params![guild_id],
        |row| {
            Ok(TtsSettings {
                enabled: row.get::<_, i64>(0)? != 0,
                speaker_id: row.get(1)?,
            })
        },
    )?;

    Ok(settings)
}

/// Sets the relay-enabled flag for the guild.
pub fn set_enabled(conn: &Connection, guild_id: GuildId, enabled: bool) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO tts_settings (guild_id, enabled)
         VALUES (?1, ?2)
         ON CONFLICT(guild_id)
         DO UPDATE SET enabled = excluded.enabled",
        params![guild_id, enabled as i64],
    )?;
    Ok(())
}

/// Sets the guild-default speaker id.
pub fn set_speaker(conn: &Connection, guild_id: GuildId, speaker_id: i64) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO tts_settings (guild_id, speaker_id)
         VALUES (?1, ?2)
         ON CONFLICT(guild_id)
         DO UPDATE SET speaker_id = excluded.speaker_id",
        params![guild_id, speaker_id],
    )?;
    Ok(())
}
