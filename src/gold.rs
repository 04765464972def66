use anyhow::Result;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

/// A physical gold holding, tracked by weight in grams.
#[derive(Debug, Clone, Serialize)]
pub struct GoldEntry {
    pub id: i64,
    pub grams: f64,
    pub note: Option<String>,
    pub created_at: String,
}

/// Create-request body for a gold holding.
#[derive(Debug, Clone, Deserialize)]
pub struct NewGold {
    pub grams: Option<f64>,
    pub note: Option<String>,
}

impl NewGold {
    /// Weight must be present and strictly positive.
    pub fn validate(&self) -> Result<f64, &'static str> {
        match self.grams {
            Some(grams) if grams.is_finite() && grams > 0.0 => Ok(grams),
            _ => Err("Grams must be a positive number"),
        }
    }
}

/// Insert a gold holding and return its assigned id.
pub fn insert_gold(conn: &Connection, grams: f64, note: Option<&str>) -> Result<i64> {
    conn.execute(
        "INSERT INTO gold (grams, note) VALUES (?1, ?2)",
        params![grams, note],
    )?;
    Ok(conn.last_insert_rowid())
}

/// All gold holdings, newest first.
pub fn list_gold(conn: &Connection) -> Result<Vec<GoldEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, grams, note, created_at
         FROM gold
         ORDER BY created_at DESC, id DESC",
    )?;

    let entries = stmt
        .query_map([], |row| {
            Ok(GoldEntry {
                id: row.get(0)?,
                grams: row.get(1)?,
                note: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(entries)
}

/// Delete a gold holding. Unknown ids are a silent no-op.
pub fn delete_gold(conn: &Connection, id: i64) -> Result<()> {
    conn.execute("DELETE FROM gold WHERE id = ?1", params![id])?;
    Ok(())
}
