//! Core data models for the tallybook ledger
//!
//! This module contains the data structures that represent the budgeting
//! domain: budgets, categories, transactions, money, and typed IDs.

pub mod budget;
pub mod category;
pub mod dates;
pub mod ids;
pub mod money;
pub mod transaction;

pub use budget::Budget;
pub use category::{Category, Installment};
pub use ids::{BudgetId, CategoryId, TransactionId};
pub use money::Money;
pub use transaction::{Transaction, TransactionKind};
