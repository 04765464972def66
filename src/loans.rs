use anyhow::Result;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

/// Money lent to someone. Only the `is_returned` flag is mutable; the flag
/// is stored as an INTEGER 0/1 and converted at this boundary.
#[derive(Debug, Clone, Serialize)]
pub struct LoanEntry {
    pub id: i64,
    pub borrower_name: String,
    pub amount: f64,
    pub currency: String,
    pub is_returned: bool,
    pub created_at: String,
}

/// Create-request body for a loan.
#[derive(Debug, Clone, Deserialize)]
pub struct NewLoan {
    pub borrower_name: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
}

/// PATCH body for flipping a loan's returned flag. An absent flag coerces
/// to `false`.
#[derive(Debug, Clone, Deserialize)]
pub struct ToggleLoan {
    pub id: Option<i64>,
    pub is_returned: Option<bool>,
}

impl NewLoan {
    /// Borrower name must be non-empty and the amount non-zero.
    pub fn validate(&self) -> Result<(&str, f64), &'static str> {
        let name = self.borrower_name.as_deref().filter(|n| !n.is_empty());
        let amount = self.amount.filter(|a| a.is_finite() && *a != 0.0);

        match (name, amount) {
            (Some(name), Some(amount)) => Ok((name, amount)),
            _ => Err("Borrower name and amount are required"),
        }
    }
}

/// Insert a loan and return its assigned id. New loans start outstanding.
pub fn insert_loan(
    conn: &Connection,
    borrower_name: &str,
    amount: f64,
    currency: Option<&str>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO loans (borrower_name, amount, currency) VALUES (?1, ?2, ?3)",
        params![borrower_name, amount, currency.unwrap_or("USD")],
    )?;
    Ok(conn.last_insert_rowid())
}

/// All loans, outstanding first, then newest first.
pub fn list_loans(conn: &Connection) -> Result<Vec<LoanEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, borrower_name, amount, currency, is_returned, created_at
         FROM loans
         ORDER BY is_returned ASC, created_at DESC, id DESC",
    )?;

    let entries = stmt
        .query_map([], |row| {
            Ok(LoanEntry {
                id: row.get(0)?,
                borrower_name: row.get(1)?,
                amount: row.get(2)?,
                currency: row.get(3)?,
                is_returned: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(entries)
}

/// Set a loan's returned flag. Unknown ids are a silent no-op.
pub fn set_loan_returned(conn: &Connection, id: i64, returned: bool) -> Result<()> {
    conn.execute(
        "UPDATE loans SET is_returned = ?1 WHERE id = ?2",
        params![returned, id],
    )?;
    Ok(())
}

/// Delete a loan. Unknown ids are a silent no-op.
pub fn delete_loan(conn: &Connection, id: i64) -> Result<()> {
    conn.execute("DELETE FROM loans WHERE id = ?1", params![id])?;
    Ok(())
}
