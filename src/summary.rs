use serde::Serialize;

use crate::cash::CashEntry;
use crate::gold::GoldEntry;
use crate::loans::LoanEntry;

/// Per-category totals plus the grand total. Recomputed from scratch on
/// every refresh; nothing here is persisted.
#[derive(Debug, Clone, Serialize)]
pub struct VaultSummary {
    pub total_cash: f64,
    pub total_grams: f64,
    pub total_gold_value: f64,
    pub total_loans_outstanding: f64,
    pub grand_total: f64,
}

/// Pure aggregation over already-fetched record sets.
///
/// Returned loans are excluded from the outstanding total. A missing
/// price values the gold holdings at zero.
pub fn summarize(
    cash: &[CashEntry],
    gold: &[GoldEntry],
    loans: &[LoanEntry],
    price_per_gram: Option<f64>,
) -> VaultSummary {
    let total_cash: f64 = cash.iter().map(|entry| entry.amount).sum();
    let total_grams: f64 = gold.iter().map(|entry| entry.grams).sum();
    let total_gold_value = total_grams * price_per_gram.unwrap_or(0.0);
    let total_loans_outstanding: f64 = loans
        .iter()
        .filter(|loan| !loan.is_returned)
        .map(|loan| loan.amount)
        .sum();

    VaultSummary {
        total_cash,
        total_grams,
        total_gold_value,
        total_loans_outstanding,
        grand_total: total_cash + total_gold_value + total_loans_outstanding,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cash_entry(id: i64, amount: f64) -> CashEntry {
        CashEntry {
            id,
            amount,
            currency: "USD".to_string(),
            note: None,
            created_at: "2024-01-01 00:00:00".to_string(),
        }
    }

    fn gold_entry(id: i64, grams: f64) -> GoldEntry {
        GoldEntry {
            id,
            grams,
            note: None,
            created_at: "2024-01-01 00:00:00".to_string(),
        }
    }

    fn loan_entry(id: i64, amount: f64, is_returned: bool) -> LoanEntry {
        LoanEntry {
            id,
            borrower_name: "Alice".to_string(),
            amount,
            currency: "USD".to_string(),
            is_returned,
            created_at: "2024-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn test_grand_total_combines_all_categories() {
        let cash = vec![cash_entry(1, 100.0)];
        let gold = vec![gold_entry(1, 2.0)];
        let loans = vec![loan_entry(1, 50.0, false)];

        let summary = summarize(&cash, &gold, &loans, Some(60.0));

        assert_eq!(summary.total_cash, 100.0);
        assert_eq!(summary.total_grams, 2.0);
        assert_eq!(summary.total_gold_value, 120.0);
        assert_eq!(summary.total_loans_outstanding, 50.0);
        assert_eq!(summary.grand_total, 270.0);
    }

    #[test]
    fn test_returned_loans_are_excluded() {
        let loans = vec![loan_entry(1, 50.0, false), loan_entry(2, 500.0, true)];

        let summary = summarize(&[], &[], &loans, None);

        assert_eq!(summary.total_loans_outstanding, 50.0);
        assert_eq!(summary.grand_total, 50.0);
    }

    #[test]
    fn test_missing_price_values_gold_at_zero() {
        let gold = vec![gold_entry(1, 10.0)];

        let summary = summarize(&[], &gold, &[], None);

        assert_eq!(summary.total_grams, 10.0);
        assert_eq!(summary.total_gold_value, 0.0);
        assert_eq!(summary.grand_total, 0.0);
    }

    #[test]
    fn test_negative_cash_lowers_the_total() {
        let cash = vec![cash_entry(1, 100.0), cash_entry(2, -40.0)];

        let summary = summarize(&cash, &[], &[], None);

        assert_eq!(summary.total_cash, 60.0);
        assert_eq!(summary.grand_total, 60.0);
    }

    #[test]
    fn test_empty_vault_is_all_zeroes() {
        let summary = summarize(&[], &[], &[], Some(64.3));

        assert_eq!(summary.total_cash, 0.0);
        assert_eq!(summary.total_grams, 0.0);
        assert_eq!(summary.total_gold_value, 0.0);
        assert_eq!(summary.total_loans_outstanding, 0.0);
        assert_eq!(summary.grand_total, 0.0);
    }
}
