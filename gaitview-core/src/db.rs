use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use crate::engine::{PendingWrites, PersistedState};
use crate::error::StoreError;
use crate::prefs::LayoutPrefs;

/// Selected commit hash, or `uncommitted`.
pub const KEY_SELECTED_COMMIT: &str = "gait.selectedCommit";
/// JSON snapshot of the expansion store.
pub const KEY_EXPANDED_FILES: &str = "gait.expandedFiles";
pub const KEY_PANEL_WIDTH: &str = "gait.panelWidth";
pub const KEY_SIDEBAR_WIDTH: &str = "gait.sidebarWidth";
/// Prefix of per-section collapse flags, e.g. `gait.collapsed.tags`.
pub const KEY_COLLAPSED_PREFIX: &str = "gait.collapsed.";

/// File name of the state database inside the state directory.
pub const STATE_DB_FILE: &str = "state.db";

/// Opens (or creates) the SQLite database at `path`, configures WAL mode,
/// and applies schema migrations via the `schema_version` table.
///
/// This is the single entry point for all database connections. It sets
/// `busy_timeout` via the `Connection` method (not a PRAGMA string) so the
/// setting takes effect regardless of pragma caching.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the file cannot be opened, WAL
/// configuration fails, or schema DDL fails.
pub async fn open_db(path: &str) -> Result<Connection, tokio_rusqlite::Error> {
    let conn = Connection::open(path).await?;

    conn.call(|db| {
        db.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;",
        )?;
        db.busy_timeout(Duration::from_secs(5))?;
        Ok::<_, rusqlite::Error>(())
    })
    .await?;

    // Fold any WAL left over from an unclean exit back into the main file.
    conn.call(|db| {
        db.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok::<_, rusqlite::Error>(())
    })
    .await?;

    conn.call(|db| {
        crate::schema::migrate(db)?;
        Ok::<_, rusqlite::Error>(())
    })
    .await?;

    Ok(conn)
}

/// Opens the state database inside `dir`, creating the directory first.
///
/// # Errors
///
/// Returns `StoreError::Io` if the directory cannot be created and
/// `StoreError::Database` if the database cannot be opened.
pub async fn open_state_db(dir: &Path) -> Result<Connection, StoreError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(STATE_DB_FILE);
    tracing::debug!(path = %path.display(), "opening ui state database");
    Ok(open_db(&path.to_string_lossy()).await?)
}

/// Returns the current Unix timestamp in seconds.
fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

fn upsert(db: &rusqlite::Connection, key: &str, value: &str, now: i64) -> rusqlite::Result<usize> {
    db.execute(
        "INSERT INTO ui_state (key, value, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(key)
         DO UPDATE SET value = excluded.value,
                       updated_at = excluded.updated_at",
        rusqlite::params![key, value, now],
    )
}

/// Reads one value, `None` if the key was never written.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the query fails.
pub async fn get_value(
    conn: &Connection,
    key: &str,
) -> Result<Option<String>, tokio_rusqlite::Error> {
    let key = key.to_owned();
    conn.call(move |db| {
        db.query_row("SELECT value FROM ui_state WHERE key = ?1", [&key], |r| r.get(0))
            .optional()
    })
    .await
}

/// Writes one value inside `BEGIN IMMEDIATE`.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the upsert transaction fails.
pub async fn put_value(
    conn: &Connection,
    key: &str,
    value: &str,
) -> Result<(), tokio_rusqlite::Error> {
    let key = key.to_owned();
    let value = value.to_owned();
    conn.call(move |db| {
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        upsert(&tx, &key, &value, now_secs())?;
        tx.commit()
    })
    .await
}

/// Removes one key. Removing a missing key is not an error.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the delete fails.
pub async fn delete_value(conn: &Connection, key: &str) -> Result<(), tokio_rusqlite::Error> {
    let key = key.to_owned();
    conn.call(move |db| {
        db.execute("DELETE FROM ui_state WHERE key = ?1", [&key])?;
        Ok::<_, rusqlite::Error>(())
    })
    .await
}

/// Loads the selection and expansion snapshot used to hydrate the engine.
///
/// Must run before the first frame so restored panels never flash closed.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if either read fails.
pub async fn load_ui_state(conn: &Connection) -> Result<PersistedState, tokio_rusqlite::Error> {
    Ok(PersistedState {
        selected: get_value(conn, KEY_SELECTED_COMMIT).await?,
        expansions: get_value(conn, KEY_EXPANDED_FILES).await?,
    })
}

/// Flushes the engine's pending writes in one transaction.
///
/// A cleared selection deletes its key. Returns `false` when there was
/// nothing to write.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the write transaction fails.
pub async fn save_pending(
    conn: &Connection,
    pending: PendingWrites,
) -> Result<bool, tokio_rusqlite::Error> {
    if pending.is_empty() {
        return Ok(false);
    }
    conn.call(move |db| {
        let now = now_secs();
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        if let Some(snapshot) = &pending.expansions {
            upsert(&tx, KEY_EXPANDED_FILES, snapshot, now)?;
        }
        match &pending.selection {
            Some(Some(selected)) => {
                upsert(&tx, KEY_SELECTED_COMMIT, selected, now)?;
            }
            Some(None) => {
                tx.execute("DELETE FROM ui_state WHERE key = ?1", [KEY_SELECTED_COMMIT])?;
            }
            None => {}
        }
        tx.commit()?;
        Ok::<_, rusqlite::Error>(true)
    })
    .await
}

/// Loads panel widths and collapsed sidebar sections.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the query fails. Unreadable values fall
/// back to defaults instead.
pub async fn load_layout_prefs(conn: &Connection) -> Result<LayoutPrefs, tokio_rusqlite::Error> {
    let rows: Vec<(String, String)> = conn
        .call(|db| {
            let mut stmt = db.prepare("SELECT key, value FROM ui_state WHERE key LIKE 'gait.%'")?;
            let rows = stmt
                .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok::<_, rusqlite::Error>(rows)
        })
        .await?;

    let mut prefs = LayoutPrefs::default();
    for (key, value) in rows {
        if key == KEY_PANEL_WIDTH {
            let pct = LayoutPrefs::parse_pct(&value, prefs.list_pct);
            prefs.set_list_pct(pct);
        } else if key == KEY_SIDEBAR_WIDTH {
            let pct = LayoutPrefs::parse_pct(&value, prefs.sidebar_pct);
            prefs.set_sidebar_pct(pct);
        } else if let Some(section) = key.strip_prefix(KEY_COLLAPSED_PREFIX) {
            if value == "true" {
                prefs.collapsed.insert(section.to_owned());
            }
        }
    }
    Ok(prefs)
}

/// Stores panel widths and collapse flags, replacing earlier flags.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the write transaction fails.
pub async fn save_layout_prefs(
    conn: &Connection,
    prefs: &LayoutPrefs,
) -> Result<(), tokio_rusqlite::Error> {
    let prefs = prefs.clone();
    conn.call(move |db| {
        let now = now_secs();
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        upsert(&tx, KEY_PANEL_WIDTH, &prefs.list_pct.to_string(), now)?;
        upsert(&tx, KEY_SIDEBAR_WIDTH, &prefs.sidebar_pct.to_string(), now)?;
        tx.execute(
            "DELETE FROM ui_state WHERE substr(key, 1, ?1) = ?2",
            rusqlite::params![KEY_COLLAPSED_PREFIX.len() as i64, KEY_COLLAPSED_PREFIX],
        )?;
        for section in &prefs.collapsed {
            upsert(&tx, &format!("{KEY_COLLAPSED_PREFIX}{section}"), "true", now)?;
        }
        tx.commit()?;
        Ok::<_, rusqlite::Error>(())
    })
    .await
}
