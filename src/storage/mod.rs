//! Storage layer for the tallybook ledger
//!
//! Provides JSON file storage with atomic writes and in-memory maps guarded
//! by `RwLock`. The `Storage` coordinator adds an all-or-nothing batch commit
//! (`run_atomic`) so a transaction save and its budget/category aggregate
//! updates land together or not at all.

pub mod budgets;
pub mod categories;
pub mod file_io;
pub mod transactions;

pub use budgets::BudgetRepository;
pub use categories::CategoryRepository;
pub use file_io::{read_json, write_json_atomic};
pub use transactions::TransactionRepository;

use std::sync::Mutex;

use crate::config::paths::TallybookPaths;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Budget, BudgetId, Category, CategoryId, Transaction, TransactionId};

/// A single staged write inside an atomic batch
#[derive(Debug, Clone)]
pub enum WriteOp {
    PutBudget(Budget),
    PutCategory(Category),
    PutTransaction(Transaction),
}

/// Inverse of an applied `WriteOp`, kept for rollback
enum Undo {
    Budget(BudgetId, Option<Budget>),
    Category(CategoryId, Option<Category>),
    Transaction(TransactionId, Option<Transaction>),
}

/// Main storage coordinator that provides access to all repositories
pub struct Storage {
    paths: TallybookPaths,
    pub budgets: BudgetRepository,
    pub categories: CategoryRepository,
    pub transactions: TransactionRepository,
    /// Serializes mutating ledger operations; see `LedgerService`
    mutation_gate: Mutex<()>,
}

impl Storage {
    /// Create a new Storage instance
    pub fn new(paths: TallybookPaths) -> Result<Self, LedgerError> {
        paths.ensure_directories()?;

        Ok(Self {
            budgets: BudgetRepository::new(paths.budgets_file()),
            categories: CategoryRepository::new(paths.categories_file()),
            transactions: TransactionRepository::new(paths.transactions_file()),
            mutation_gate: Mutex::new(()),
            paths,
        })
    }

    /// Get the paths configuration
    pub fn paths(&self) -> &TallybookPaths {
        &self.paths
    }

    /// The gate every mutating ledger operation must hold while it computes
    /// and commits a read-modify-write balance update
    pub fn mutation_gate(&self) -> &Mutex<()> {
        &self.mutation_gate
    }

    /// Load all data from disk
    pub fn load_all(&self) -> Result<(), LedgerError> {
        self.budgets.load()?;
        self.categories.load()?;
        self.transactions.load()?;
        Ok(())
    }

    /// Save all data to disk
    pub fn save_all(&self) -> Result<(), LedgerError> {
        self.budgets.save()?;
        self.categories.save()?;
        self.transactions.save()?;
        Ok(())
    }

    /// Apply a batch of writes all-or-nothing
    ///
    /// The staged records replace their in-memory predecessors first; every
    /// touched file is then persisted. If any durable write fails, the
    /// in-memory maps are rolled back to their prior state, so readers never
    /// observe a partially-applied batch.
    pub fn run_atomic(&self, ops: Vec<WriteOp>) -> LedgerResult<()> {
        let mut undo_log: Vec<Undo> = Vec::with_capacity(ops.len());
        let mut touched_budgets = false;
        let mut touched_categories = false;
        let mut touched_transactions = false;

        for op in ops {
            let staged = match op {
                WriteOp::PutBudget(budget) => {
                    let previous = self.budgets.get(budget.id)?;
                    let id = budget.id;
                    self.budgets.upsert(budget).map(|_| {
                        touched_budgets = true;
                        Undo::Budget(id, previous)
                    })
                }
                WriteOp::PutCategory(category) => {
                    let previous = self.categories.get(category.id)?;
                    let id = category.id;
                    self.categories.upsert(category).map(|_| {
                        touched_categories = true;
                        Undo::Category(id, previous)
                    })
                }
                WriteOp::PutTransaction(txn) => {
                    let previous = self.transactions.get(txn.id)?;
                    let id = txn.id;
                    self.transactions.upsert(txn).map(|_| {
                        touched_transactions = true;
                        Undo::Transaction(id, previous)
                    })
                }
            };

            match staged {
                Ok(undo) => undo_log.push(undo),
                Err(err) => {
                    self.rollback(undo_log);
                    return Err(err);
                }
            }
        }

        let persisted = self.persist_touched(touched_budgets, touched_categories, touched_transactions);
        if let Err(err) = persisted {
            self.rollback(undo_log);
            return Err(err);
        }

        Ok(())
    }

    fn persist_touched(
        &self,
        budgets: bool,
        categories: bool,
        transactions: bool,
    ) -> LedgerResult<()> {
        if budgets {
            self.budgets.save()?;
        }
        if categories {
            self.categories.save()?;
        }
        if transactions {
            self.transactions.save()?;
        }
        Ok(())
    }

    /// Restore the in-memory maps after a failed batch; best-effort
    fn rollback(&self, undo_log: Vec<Undo>) {
        for undo in undo_log.into_iter().rev() {
            let restored = match undo {
                Undo::Budget(_, Some(prev)) => self.budgets.upsert(prev),
                Undo::Budget(id, None) => self.budgets.delete(id).map(|_| ()),
                Undo::Category(_, Some(prev)) => self.categories.upsert(prev),
                Undo::Category(id, None) => self.categories.delete(id).map(|_| ()),
                Undo::Transaction(_, Some(prev)) => self.transactions.upsert(prev),
                Undo::Transaction(id, None) => self.transactions.delete(id).map(|_| ()),
            };
            if let Err(err) = restored {
                tracing::error!(%err, "rollback of a failed atomic batch did not fully restore memory state");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Money;
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = TallybookPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths).unwrap();
        storage.load_all().unwrap();
        (temp_dir, storage)
    }

    #[test]
    fn test_storage_creation() {
        let (temp_dir, _storage) = create_test_storage();
        assert!(temp_dir.path().join("data").exists());
    }

    #[test]
    fn test_run_atomic_commits_all() {
        let (_temp_dir, storage) = create_test_storage();

        let budget = Budget::new("Household", Money::from_cents(500_000));
        let category = Category::new("Groceries", budget.id, Money::from_cents(50_000), false);
        let txn = Transaction::new(
            budget.id,
            category.id,
            chrono::NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            Money::from_cents(5_000),
            "",
            crate::models::TransactionKind::Expense,
        );

        storage
            .run_atomic(vec![
                WriteOp::PutBudget(budget.clone()),
                WriteOp::PutCategory(category.clone()),
                WriteOp::PutTransaction(txn.clone()),
            ])
            .unwrap();

        assert!(storage.budgets.get(budget.id).unwrap().is_some());
        assert!(storage.categories.get(category.id).unwrap().is_some());
        assert!(storage.transactions.get(txn.id).unwrap().is_some());

        // And the batch is durable
        assert!(storage.paths().budgets_file().exists());
        assert!(storage.paths().transactions_file().exists());
    }

    #[test]
    fn test_run_atomic_survives_reload() {
        let (temp_dir, storage) = create_test_storage();

        let budget = Budget::new("Household", Money::from_cents(500_000));
        let budget_id = budget.id;
        storage.run_atomic(vec![WriteOp::PutBudget(budget)]).unwrap();

        let paths = TallybookPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage2 = Storage::new(paths).unwrap();
        storage2.load_all().unwrap();
        assert!(storage2.budgets.get(budget_id).unwrap().is_some());
    }
}
