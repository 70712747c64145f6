//! Voice-command allow-list.
//!
//! Stores the user ids and role ids permitted to operate voice commands in a
//! guild. The authorization decision itself (owner/admin bypass, role
//! intersection) lives with the command layer; this module only persists the
//! sets.

use rusqlite::{params, Connection};
use yukino_types::{AllowList, GuildId, RoleId, UserId};

use crate::{is_constraint_violation, StoreError};

const KIND_USER: &str = "user";
const KIND_ROLE: &str = "role";

fn add_target(
    conn: &Connection,
    guild_id: GuildId,
    kind: &str,
    target_id: i64,
) -> Result<bool, StoreError> {
    match conn.execute(
        "INSERT INTO vc_allows (guild_id, kind, target_id) VALUES (?1, ?2, ?3)",
        params![guild_id, kind, target_id],
    ) {
        Ok(_) => Ok(true),
        Err(e) if is_constraint_violation(&e) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn remove_target(
    conn: &Connection,
    guild_id: GuildId,
    kind: &str,
    target_id: i64,
) -> Result<bool, StoreError> {
    let removed = conn.execute(
        "DELETE FROM vc_allows WHERE guild_id = ?1 AND kind = ?2 AND target_id = ?3",
        params![guild_id, kind, target_id],
    )?;
    Ok(removed > 0)
}

/// Allows a user. Returns `false` when already allowed.
pub fn add_user(conn: &Connection, guild_id: GuildId, user_id: UserId) -> Result<bool, StoreError> {
    add_target(conn, guild_id, KIND_USER, user_id)
}

/// Revokes a user. Returns `false` when the user was not allowed.
pub fn remove_user(
    conn: &Connection,
    guild_id: GuildId,
    user_id: UserId,
) -> Result<bool, StoreError> {
    remove_target(conn, guild_id, KIND_USER, user_id)
}

/// Allows a role. Returns `false` when already allowed.
pub fn add_role(conn: &Connection, guild_id: GuildId, role_id: RoleId) -> Result<bool, StoreError> {
    add_target(conn, guild_id, KIND_ROLE, role_id)
}

/// Revokes a role. Returns `false` when the role was not allowed.
pub fn remove_role(
    conn: &Connection,
    guild_id: GuildId,
    role_id: RoleId,
) -> Result<bool, StoreError> {
    remove_target(conn, guild_id, KIND_ROLE, role_id)
}

/// Loads the full allow-list for the guild.
pub fn load(conn: &Connection, guild_id: GuildId) -> Result<AllowList, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT kind, target_id FROM vc_allows WHERE guild_id = ?1 ORDER BY rowid ASC",
    )?;

    let rows = stmt.query_map(params![guild_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut allow = AllowList::default();
    for row in rows {
        let (kind, target_id) = row?;
        match kind.as_str() {
            KIND_USER => allow.users.push(target_id),
            KIND_ROLE => allow.roles.push(target_id),
            other => tracing::warn!(guild_id, kind = other, "unknown allow-list kind, skipping"),
        }
    }
    Ok(allow)
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
    fn add_and_load_users_and_roles() {
        let conn = test_conn();

        assert!(add_user(&conn, 1, 10).unwrap());
        assert!(add_user(&conn, 1, 20).unwrap());
        assert!(add_role(&conn, 1, 100).unwrap());

        let allow = load(&conn, 1).expect("load should succeed");
        assert_eq!(allow.users, vec![10, 20]);
        assert_eq!(allow.roles, vec![100]);
    }

    #[test]
    fn duplicate_add_reports_false() {
        let conn = test_conn();

        assert!(add_user(&conn, 1, 10).unwrap());
        assert!(!add_user(&conn, 1, 10).unwrap());

        assert!(add_role(&conn, 1, 100).unwrap());
        assert!(!add_role(&conn, 1, 100).unwrap());
    }

    #[test]
    fn user_and_role_ids_do_not_collide() {
        let conn = test_conn();

        // The same numeric id can appear as both a user and a role.
        assert!(add_user(&conn, 1, 7).unwrap());
        assert!(add_role(&conn, 1, 7).unwrap());

        let allow = load(&conn, 1).unwrap();
        assert_eq!(allow.users, vec![7]);
        assert_eq!(allow.roles, vec![7]);
    }

    #[test]
    fn remove_absent_reports_false() {
        let conn = test_conn();

        assert!(!remove_user(&conn, 1, 10).unwrap());
        add_user(&conn, 1, 10).unwrap();
        assert!(remove_user(&conn, 1, 10).unwrap());
        assert!(load(&conn, 1).unwrap().users.is_empty());
    }

    #[test]
    fn empty_guild_loads_empty_list() {
        let conn = test_conn();
        assert_eq!(load(&conn, 99).unwrap(), AllowList::default());
    }
}
