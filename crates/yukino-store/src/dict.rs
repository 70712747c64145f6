//! Per-guild pronunciation dictionary.
//!
//! Maps a surface form (as it appears in chat) to a phonetic reading. The
//! synthesis stage substitutes readings into sanitized text, longest surface
//! first, before the length cap is applied.

use rusqlite::{params, Connection};
use yukino_types::GuildId;

use crate::{is_constraint_violation, StoreError};

/// Maximum surface length, in characters.
pub const MAX_SURFACE_CHARS: usize = 100;
/// Maximum reading length, in characters.
pub const MAX_READING_CHARS: usize = 200;

/// Returns true when the pair is within the registration bounds.
pub fn entry_within_bounds(surface: &str, reading: &str) -> bool {
    let surface_len = surface.trim().chars().count();
    let reading_len = reading.trim().chars().count();
    (1..=MAX_SURFACE_CHARS).contains(&surface_len)
        && (1..=MAX_READING_CHARS).contains(&reading_len)
}

/// Registers a surface → reading pair.
///
/// Returns `false` when the surface is already registered for the guild or
/// the inputs violate the length bounds; the existing entry is left
/// unchanged.
pub fn add_entry(
    conn: &Connection,
    guild_id: GuildId,
    surface: &str,
    reading: &str,
) -> Result<bool, StoreError> {
    if !entry_within_bounds(surface, reading) {
        return Ok(false);
    }

    match conn.execute(
        "INSERT INTO tts_dict (guild_id, surface, reading) VALUES (?1, ?2, ?3)",
        params![guild_id, surface, reading],
    ) {
        Ok(_) => Ok(true),
        Err(e) if is_constraint_violation(&e) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Removes a registered surface. Returns `false` when it was not registered.
pub fn remove_entry(
    conn: &Connection,
    guild_id: GuildId,
    surface: &str,
) -> Result<bool, StoreError> {
    let removed = conn.execute(
        "DELETE FROM tts_dict WHERE guild_id = ?1 AND surface = ?2",
        params![guild_id, surface],
    )?;
    Ok(removed > 0)
}

/// Lists all entries for the guild in registration order.
pub fn list_entries(
    conn: &Connection,
    guild_id: GuildId,
) -> Result<Vec<(String, String)>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT surface, reading FROM tts_dict WHERE guild_id = ?1 ORDER BY rowid ASC",
    )?;

    let rows = stmt.query_map(params![guild_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok(entries)
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
    fn add_then_duplicate_add() {
        let conn = test_conn();

        assert!(add_entry(&conn, 1, "foo", "ふー").expect("add should succeed"));
        assert!(
            !add_entry(&conn, 1, "foo", "ばー").expect("duplicate add should not error"),
            "second add of the same surface must report already-registered"
        );

        // The first reading must survive the rejected duplicate.
        let entries = list_entries(&conn, 1).expect("list should succeed");
        assert_eq!(entries, vec![("foo".to_string(), "ふー".to_string())]);
    }

    #[test]
    fn same_surface_in_another_guild_is_allowed() {
        let conn = test_conn();

        assert!(add_entry(&conn, 1, "foo", "ふー").unwrap());
        assert!(add_entry(&conn, 2, "foo", "ばー").unwrap());

        assert_eq!(list_entries(&conn, 1).unwrap().len(), 1);
        assert_eq!(list_entries(&conn, 2).unwrap().len(), 1);
    }

    #[test]
    fn remove_absent_returns_false() {
        let conn = test_conn();

        assert!(!remove_entry(&conn, 1, "ghost").expect("remove should not error"));

        add_entry(&conn, 1, "foo", "ふー").unwrap();
        assert!(remove_entry(&conn, 1, "foo").unwrap());
        assert!(!remove_entry(&conn, 1, "foo").unwrap());
    }

    #[test]
    fn length_bounds_rejected() {
        let conn = test_conn();

        assert!(!add_entry(&conn, 1, "", "ふー").unwrap());
        assert!(!add_entry(&conn, 1, "   ", "ふー").unwrap());
        assert!(!add_entry(&conn, 1, "foo", "").unwrap());

        let long_surface = "あ".repeat(MAX_SURFACE_CHARS + 1);
        assert!(!add_entry(&conn, 1, &long_surface, "ふー").unwrap());

        let long_reading = "あ".repeat(MAX_READING_CHARS + 1);
        assert!(!add_entry(&conn, 1, "foo", &long_reading).unwrap());

        // Bounds are in characters, not bytes.
        let max_surface = "あ".repeat(MAX_SURFACE_CHARS);
        assert!(add_entry(&conn, 1, &max_surface, "ふー").unwrap());
    }

    #[test]
    fn list_preserves_registration_order() {
        let conn = test_conn();

        add_entry(&conn, 1, "b", "びー").unwrap();
        add_entry(&conn, 1, "a", "えー").unwrap();
        add_entry(&conn, 1, "c", "しー").unwrap();

        let surfaces: Vec<String> = list_entries(&conn, 1)
            .unwrap()
            .into_iter()
            .map(|(surface, _)| surface)
            .collect();
        assert_eq!(surfaces, vec!["b", "a", "c"]);
    }
}
