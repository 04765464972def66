use anyhow::{Context, Result};
use rusqlite::Connection;
use std::fs;
use std::path::Path;

/// Default on-disk location of the vault store, relative to the working
/// directory.
pub const DEFAULT_DB_PATH: &str = "data/vault.db";

/// Open (creating if needed) the vault database file and ensure the schema
/// exists.
///
/// The data directory is created on first run. Any failure here is
/// unrecoverable; callers are expected to abort the process.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
        }
    }

    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database at {}", path.display()))?;
    setup_database(&conn)?;

    Ok(conn)
}

/// Open an in-memory database with the full schema. Used by tests.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    setup_database(&conn)?;
    Ok(conn)
}

/// Idempotent schema bootstrap: three independent tables, no foreign keys
/// between them.
pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS cash (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            amount REAL NOT NULL,
            currency TEXT DEFAULT 'USD',
            note TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS gold (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            grams REAL NOT NULL,
            note TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS loans (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            borrower_name TEXT NOT NULL,
            amount REAL NOT NULL,
            currency TEXT DEFAULT 'USD',
            is_returned INTEGER DEFAULT 0,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    Ok(())
}
