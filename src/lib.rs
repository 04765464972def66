// Personal Vault - Core Library
// Exposes the storage layer, record services, price cache, aggregation,
// and HTTP surface for the server binary and the integration tests.

pub mod api;
pub mod cash;
pub mod db;
pub mod gold;
pub mod gold_price;
pub mod loans;
pub mod summary;

// Re-export commonly used types
pub use api::{router, AppState};
pub use cash::{CashEntry, NewCash};
pub use db::{open_database, open_in_memory, setup_database, DEFAULT_DB_PATH};
pub use gold::{GoldEntry, NewGold};
pub use gold_price::{GoldPriceClient, PriceQuote, GRAMS_PER_TROY_OUNCE, PRICE_TTL};
pub use loans::{LoanEntry, NewLoan, ToggleLoan};
pub use summary::{summarize, VaultSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
