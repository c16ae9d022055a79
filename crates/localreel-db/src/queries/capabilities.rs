//! Directory capability queries.
//!
//! A saved capability is two records under the same key: a marker row with a
//! timestamp and the encoded handle itself. Both are written in one
//! transaction so a failed save leaves the previous pair intact.

use chrono::{DateTime, Utc};
use localreel_common::{DirectoryCapability, Error, Result};
use rusqlite::{Connection, OptionalExtension};

use crate::models::CapabilityMarker;

/// Key under which the chosen media directory is stored.
pub const DIRECTORY_HANDLE_KEY: &str = "video-directory-handle";

/// Persist `capability` under `key`, replacing any previous record pair.
///
/// # Returns
///
/// * `Ok(CapabilityMarker)` - The marker that was written
/// * `Err(Error::StorageUnavailable)` - If the transaction failed; nothing was changed
pub fn save_capability(
    conn: &Connection,
    key: &str,
    capability: &DirectoryCapability,
) -> Result<CapabilityMarker> {
    let handle = bincode::serialize(capability)
        .map_err(|e| Error::invalid_input(format!("Failed to encode capability: {}", e)))?;
    let now = Utc::now();

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::storage(e.to_string()))?;

    tx.execute(
        "INSERT INTO capability_markers (key, stored, timestamp) VALUES (:key, 1, :timestamp)
         ON CONFLICT(key) DO UPDATE SET stored = 1, timestamp = excluded.timestamp",
        rusqlite::named_params! {
            ":key": key,
            ":timestamp": now.to_rfc3339(),
        },
    )
    .map_err(|e| Error::storage(e.to_string()))?;

    tx.execute(
        "INSERT INTO capability_handles (key, handle, updated_at) VALUES (:key, :handle, :updated_at)
         ON CONFLICT(key) DO UPDATE SET handle = excluded.handle, updated_at = excluded.updated_at",
        rusqlite::named_params! {
            ":key": key,
            ":handle": handle,
            ":updated_at": now.to_rfc3339(),
        },
    )
    .map_err(|e| Error::storage(e.to_string()))?;

    tx.commit().map_err(|e| Error::storage(e.to_string()))?;

    Ok(CapabilityMarker {
        key: key.to_string(),
        stored: true,
        timestamp: now,
    })
}

/// Get the marker for `key`, if a capability was ever saved.
pub fn get_marker(conn: &Connection, key: &str) -> Result<Option<CapabilityMarker>> {
    let row = conn
        .query_row(
            "SELECT key, stored, timestamp FROM capability_markers WHERE key = :key",
            rusqlite::named_params! { ":key": key },
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()
        .map_err(|e| Error::storage(e.to_string()))?;

    let Some((key, stored, timestamp)) = row else {
        return Ok(None);
    };

    let timestamp = DateTime::parse_from_rfc3339(&timestamp)
        .map_err(|e| Error::storage(format!("Corrupt marker timestamp: {}", e)))?
        .with_timezone(&Utc);

    Ok(Some(CapabilityMarker {
        key,
        stored: stored != 0,
        timestamp,
    }))
}

/// Get the stored capability for `key`.
///
/// # Returns
///
/// * `Ok(Some(capability))` - The decoded handle
/// * `Ok(None)` - If no handle row exists
/// * `Err(Error::InvalidInput)` - If the stored bytes do not decode
/// * `Err(Error::StorageUnavailable)` - If the query failed
pub fn get_handle(conn: &Connection, key: &str) -> Result<Option<DirectoryCapability>> {
    let bytes: Option<Vec<u8>> = conn
        .query_row(
            "SELECT handle FROM capability_handles WHERE key = :key",
            rusqlite::named_params! { ":key": key },
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| Error::storage(e.to_string()))?;

    bytes
        .map(|b| {
            bincode::deserialize(&b)
                .map_err(|e| Error::invalid_input(format!("Corrupt capability handle: {}", e)))
        })
        .transpose()
}

/// Delete both records for `key`.
///
/// Returns `true` if anything was removed.
pub fn delete_capability(conn: &Connection, key: &str) -> Result<bool> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::storage(e.to_string()))?;

    let markers = tx
        .execute(
            "DELETE FROM capability_markers WHERE key = :key",
            rusqlite::named_params! { ":key": key },
        )
        .map_err(|e| Error::storage(e.to_string()))?;
    let handles = tx
        .execute(
            "DELETE FROM capability_handles WHERE key = :key",
            rusqlite::named_params! { ":key": key },
        )
        .map_err(|e| Error::storage(e.to_string()))?;

    tx.commit().map_err(|e| Error::storage(e.to_string()))?;

    Ok(markers + handles > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{get_conn, init_memory_pool};
    use localreel_common::PermissionState;

    #[test]
    fn test_save_and_load() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        assert!(get_marker(&conn, DIRECTORY_HANDLE_KEY).unwrap().is_none());
        assert!(get_handle(&conn, DIRECTORY_HANDLE_KEY).unwrap().is_none());

        let cap = DirectoryCapability::granted("/videos");
        let marker = save_capability(&conn, DIRECTORY_HANDLE_KEY, &cap).unwrap();
        assert!(marker.stored);

        let loaded_marker = get_marker(&conn, DIRECTORY_HANDLE_KEY).unwrap().unwrap();
        assert_eq!(loaded_marker.key, DIRECTORY_HANDLE_KEY);
        assert!(loaded_marker.stored);

        let loaded = get_handle(&conn, DIRECTORY_HANDLE_KEY).unwrap().unwrap();
        assert_eq!(loaded, cap);
    }

    #[test]
    fn test_save_replaces_previous() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        let first = DirectoryCapability::granted("/first");
        let second = DirectoryCapability::granted("/second");
        save_capability(&conn, DIRECTORY_HANDLE_KEY, &first).unwrap();
        save_capability(&conn, DIRECTORY_HANDLE_KEY, &second).unwrap();

        let loaded = get_handle(&conn, DIRECTORY_HANDLE_KEY).unwrap().unwrap();
        assert_eq!(loaded.root, second.root);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM capability_handles", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_failed_save_keeps_previous_state() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        let original = DirectoryCapability::granted("/original");
        save_capability(&conn, DIRECTORY_HANDLE_KEY, &original).unwrap();

        // Make the handle write fail after the marker write succeeded.
        conn.execute_batch(
            "CREATE TRIGGER reject_handles BEFORE UPDATE ON capability_handles
             BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
        )
        .unwrap();

        let before = get_marker(&conn, DIRECTORY_HANDLE_KEY).unwrap().unwrap();
        let replacement = DirectoryCapability::granted("/replacement");
        let err = save_capability(&conn, DIRECTORY_HANDLE_KEY, &replacement).unwrap_err();
        assert!(err.is_storage_unavailable());

        let after = get_marker(&conn, DIRECTORY_HANDLE_KEY).unwrap().unwrap();
        assert_eq!(after.timestamp, before.timestamp);
        let loaded = get_handle(&conn, DIRECTORY_HANDLE_KEY).unwrap().unwrap();
        assert_eq!(loaded.root, original.root);
    }

    #[test]
    fn test_permission_state_is_persisted_verbatim() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        let cap = DirectoryCapability::granted("/videos").with_permission(PermissionState::Prompt);
        save_capability(&conn, DIRECTORY_HANDLE_KEY, &cap).unwrap();
        let loaded = get_handle(&conn, DIRECTORY_HANDLE_KEY).unwrap().unwrap();
        assert_eq!(loaded.permission, PermissionState::Prompt);
    }

    #[test]
    fn test_corrupt_handle() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        conn.execute(
            "INSERT INTO capability_handles (key, handle, updated_at) VALUES (?, ?, ?)",
            rusqlite::params![DIRECTORY_HANDLE_KEY, vec![0xffu8; 3], "2024-01-01T00:00:00+00:00"],
        )
        .unwrap();

        let err = get_handle(&conn, DIRECTORY_HANDLE_KEY).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_delete_capability() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        assert!(!delete_capability(&conn, DIRECTORY_HANDLE_KEY).unwrap());

        save_capability(&conn, DIRECTORY_HANDLE_KEY, &DirectoryCapability::granted("/v")).unwrap();
        assert!(delete_capability(&conn, DIRECTORY_HANDLE_KEY).unwrap());
        assert!(get_marker(&conn, DIRECTORY_HANDLE_KEY).unwrap().is_none());
        assert!(get_handle(&conn, DIRECTORY_HANDLE_KEY).unwrap().is_none());
    }
}
