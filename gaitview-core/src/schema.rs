//! Schema of the UI state database.
//!
//! Migrations are forward-only. `MIGRATIONS[i]` takes the database from
//! version `i` to `i + 1`; the applied version is the highest row in
//! `schema_version`.

const VERSION_TABLE: &str =
    "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL) STRICT;";

/// One key-value table for every piece of durable UI state. Values are opaque
/// text; callers own their encoding. An unversioned `ui_state` left by an
/// early build has an unknown layout and is replaced.
const V1_UI_STATE: &str = "
    DROP TABLE IF EXISTS ui_state;
    CREATE TABLE ui_state (
        key         TEXT    PRIMARY KEY,
        value       TEXT    NOT NULL,
        updated_at  INTEGER NOT NULL
    ) STRICT;
";

const MIGRATIONS: &[&str] = &[V1_UI_STATE];

/// The version [`migrate`] brings a database to.
pub const LATEST_VERSION: i64 = MIGRATIONS.len() as i64;

/// Applies every migration newer than the stored version, each in its own
/// immediate transaction. Idempotent.
///
/// # Errors
///
/// Returns `rusqlite::Error` if reading the version or any DDL fails; the
/// failing step is rolled back.
pub fn migrate(db: &mut rusqlite::Connection) -> rusqlite::Result<()> {
    db.execute_batch(VERSION_TABLE)?;
    let current: i64 =
        db.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    for (index, sql) in MIGRATIONS.iter().enumerate().skip(current.max(0) as usize) {
        let next = index as i64 + 1;
        tracing::info!(from = next - 1, to = next, "migrating ui state schema");
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute_batch(sql)?;
        tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [next])?;
        tx.commit()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(db: &rusqlite::Connection) -> i64 {
        db.query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0)).unwrap()
    }

    #[test]
    fn migrate_is_idempotent() {
        let mut db = rusqlite::Connection::open_in_memory().unwrap();
        migrate(&mut db).unwrap();
        db.execute("INSERT INTO ui_state VALUES ('k', 'v', 0)", []).unwrap();
        migrate(&mut db).unwrap();

        assert_eq!(version(&db), LATEST_VERSION);
        let kept: String =
            db.query_row("SELECT value FROM ui_state WHERE key = 'k'", [], |r| r.get(0)).unwrap();
        assert_eq!(kept, "v");
    }

    #[test]
    fn unversioned_table_is_replaced() {
        let mut db = rusqlite::Connection::open_in_memory().unwrap();
        db.execute_batch("CREATE TABLE ui_state (k TEXT);").unwrap();
        migrate(&mut db).unwrap();
        db.execute("INSERT INTO ui_state (key, value, updated_at) VALUES ('a', 'b', 1)", [])
            .unwrap();
    }
}
