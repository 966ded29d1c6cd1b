//! tallybook - budget/category/transaction ledger engine
//!
//! This library provides the core ledger of a local personal finance
//! tracker: budgets subdivided into income/expense categories (optionally
//! time-bounded installments), transactions recorded against them, and the
//! running balances that tie the three together.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Path management for the data directory
//! - `error`: Custom error types
//! - `models`: Core data models (budgets, categories, transactions, money)
//! - `storage`: JSON file storage layer with atomic batch commits
//! - `services`: Business logic layer (validity, balances, ledger service)
//!
//! # Example
//!
//! ```rust,ignore
//! use tallybook::config::TallybookPaths;
//! use tallybook::services::LedgerService;
//! use tallybook::storage::Storage;
//!
//! let storage = Storage::new(TallybookPaths::new()?)?;
//! storage.load_all()?;
//! let ledger = LedgerService::new(&storage);
//! ledger.reconcile_all()?;
//! let budgets = ledger.fetch_budgets()?;
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;

pub use error::{LedgerError, LedgerResult};
