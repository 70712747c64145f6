//! Per-user voice profiles.

use rusqlite::{params, Connection, OptionalExtension};
use std::str::FromStr;
use yukino_types::{GuildId, SynthesisEngine, UserId, VoiceProfile};

use crate::StoreError;

/// Returns the user's voice profile, or `None` when no profile is stored.
///
/// Callers fall back to the guild default speaker when no profile exists;
/// that fallback is a relay decision, so it stays out of the store.
pub fn get_profile(
    conn: &Connection,
    guild_id: GuildId,
    user_id: UserId,
) -> Result<Option<VoiceProfile>, StoreError> {
    let profile = conn
        .query_row(
            "SELECT engine, speaker_id, speed, pitch
             FROM tts_voice_profiles
             WHERE guild_id = ?1 AND user_id = ?2",
            params![guild_id, user_id],
            |row| {
                let engine_str: String = row.get(0)?;
                let engine = SynthesisEngine::from_str(&engine_str).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        0,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(VoiceProfile {
                    engine,
                    speaker_id: row.get(1)?,
                    speed: row.get(2)?,
                    pitch: row.get(3)?,
                })
            },
        )
        .optional()?;

    Ok(profile)
}

/// Stores the user's voice profile, replacing any existing one.
pub fn set_profile(
    conn: &Connection,
    guild_id: GuildId,
    user_id: UserId,
    profile: &VoiceProfile,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT OR REPLACE INTO tts_voice_profiles
         (guild_id, user_id, engine, speaker_id, speed, pitch)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            guild_id,
            user_id,
            profile.engine.as_str(),
            profile.speaker_id,
            profile.speed,
            profile.pitch,
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        yukino_db::run_migrations(&conn).expect("migrations should succeed");
        conn
    }

    #[test]
    fn absent_profile_reads_as_none() {
        let conn = test_conn();
        assert_eq!(get_profile(&conn, 1, 2).expect("get should succeed"), None);
    }

    #[test]
    fn set_then_get_round_trip() {
        let conn = test_conn();

        let profile = VoiceProfile {
            engine: SynthesisEngine::Voicevox,
            speaker_id: 3,
            speed: 1.5,
            pitch: -0.25,
        };
        set_profile(&conn, 1, 2, &profile).expect("set should succeed");

        assert_eq!(get_profile(&conn, 1, 2).unwrap(), Some(profile));
    }

    #[test]
    fn set_replaces_existing_profile() {
        let conn = test_conn();

        set_profile(&conn, 1, 2, &VoiceProfile::default()).unwrap();

        let updated = VoiceProfile {
            engine: SynthesisEngine::Voicevox,
            speaker_id: 8,
            speed: 0.5,
            pitch: 1.0,
        };
        set_profile(&conn, 1, 2, &updated).unwrap();

        assert_eq!(get_profile(&conn, 1, 2).unwrap(), Some(updated));
    }

    #[test]
    fn profiles_are_keyed_by_guild_and_user() {
        let conn = test_conn();

        let profile = VoiceProfile {
            speaker_id: 5,
            ..VoiceProfile::default()
        };
        set_profile(&conn, 1, 2, &profile).unwrap();

        assert!(get_profile(&conn, 1, 3).unwrap().is_none());
        assert!(get_profile(&conn, 9, 2).unwrap().is_none());
    }
}
