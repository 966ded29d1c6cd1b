//! Service layer for the tallybook ledger
//!
//! The service layer provides business logic on top of the storage layer:
//! category validity resolution, balance aggregation, and the ledger
//! service's query/mutation operations.

pub mod balance;
pub mod ledger;
pub mod validity;

pub use balance::{BalanceAggregator, BudgetMonthSummary};
pub use ledger::{LedgerService, SaveTransactionInput};
