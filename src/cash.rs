use anyhow::Result;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

/// A single cash balance row. Immutable once created, apart from deletion.
#[derive(Debug, Clone, Serialize)]
pub struct CashEntry {
    pub id: i64,
    pub amount: f64,
    pub currency: String,
    pub note: Option<String>,
    pub created_at: String,
}

/// Create-request body for a cash entry.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCash {
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub note: Option<String>,
}

impl NewCash {
    /// Amount must be present and numeric. Zero and negative amounts are
    /// accepted; only gold weights enforce positivity.
    pub fn validate(&self) -> Result<f64, &'static str> {
        match self.amount {
            Some(amount) if amount.is_finite() => Ok(amount),
            _ => Err("Amount is required"),
        }
    }
}

/// Insert a cash entry and return its assigned id.
pub fn insert_cash(
    conn: &Connection,
    amount: f64,
    currency: Option<&str>,
    note: Option<&str>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO cash (amount, currency, note) VALUES (?1, ?2, ?3)",
        params![amount, currency.unwrap_or("USD"), note],
    )?;
    Ok(conn.last_insert_rowid())
}

/// All cash entries, newest first.
pub fn list_cash(conn: &Connection) -> Result<Vec<CashEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, amount, currency, note, created_at
         FROM cash
         ORDER BY created_at DESC, id DESC",
    )?;

    let entries = stmt
        .query_map([], |row| {
            Ok(CashEntry {
                id: row.get(0)?,
                amount: row.get(1)?,
                currency: row.get(2)?,
                note: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(entries)
}

/// Delete a cash entry. Unknown ids are a silent no-op.
pub fn delete_cash(conn: &Connection, id: i64) -> Result<()> {
    conn.execute("DELETE FROM cash WHERE id = ?1", params![id])?;
    Ok(())
}
