//! Ledger service
//!
//! The public-facing orchestrator of the ledger: budget queries, selectable
//! category resolution, and transaction persistence with full validation and
//! overflow detection. All mutating operations are serialized through the
//! storage mutation gate so read-modify-write balance updates never
//! interleave; the balance update and its transaction write commit as one
//! atomic batch.

use chrono::NaiveDate;

use crate::error::{LedgerError, LedgerResult};
use crate::models::category::CategoryValidationError;
use crate::models::{
    Budget, BudgetId, Category, CategoryId, Installment, Money, Transaction, TransactionId,
    TransactionKind,
};
use crate::services::balance::BalanceAggregator;
use crate::services::validity;
use crate::storage::{Storage, WriteOp};

/// Input for creating or editing a transaction
#[derive(Debug, Clone)]
pub struct SaveTransactionInput {
    /// Positive magnitude of the transaction
    pub amount: Money,
    pub description: String,
    pub date: NaiveDate,
    pub budget_id: BudgetId,
    pub category_id: CategoryId,
    /// Must match the category's income flag; a mismatch means the caller's
    /// picker state went stale
    pub is_income: bool,
    /// Present for the edit-in-place case
    pub existing: Option<TransactionId>,
}

/// Service exposing the ledger's query and mutation operations
pub struct LedgerService<'a> {
    storage: &'a Storage,
}

impl<'a> LedgerService<'a> {
    /// Create a new ledger service
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    // ----- Queries ---------------------------------------------------------

    /// Active budgets, most recently created first. No side effects.
    pub fn fetch_budgets(&self) -> LedgerResult<Vec<Budget>> {
        let budgets = self.storage.budgets.get_all()?;
        Ok(budgets.into_iter().filter(|b| b.is_active).collect())
    }

    /// Categories of `budget_id` a transaction of the given kind and date may
    /// select, ordered by name (case-insensitive)
    ///
    /// When `excluded_transaction` is supplied (editing), the category
    /// currently attached to that transaction is always included even if it
    /// would otherwise fail the date check, so an in-progress edit does not
    /// lose its own category from the picker. Installment categories that
    /// already have a payment in the month of `transaction_date` are
    /// filtered out, again skipping the excluded transaction.
    pub fn fetch_selectable_categories(
        &self,
        is_income: bool,
        transaction_date: NaiveDate,
        budget_id: BudgetId,
        excluded_transaction: Option<TransactionId>,
    ) -> LedgerResult<Vec<Category>> {
        let budget = self
            .storage
            .budgets
            .get(budget_id)?
            .ok_or_else(|| LedgerError::budget_not_found(budget_id.to_string()))?;

        if !budget.is_active {
            return Ok(Vec::new());
        }

        let excluded_txn = match excluded_transaction {
            Some(id) => Some(
                self.storage
                    .transactions
                    .get(id)?
                    .ok_or_else(|| LedgerError::transaction_not_found(id.to_string()))?,
            ),
            None => None,
        };

        let categories = self.storage.categories.get_by_budget(budget_id)?;
        let mut selectable = Vec::new();

        for category in categories {
            if category.is_income != is_income {
                continue;
            }

            // The edited transaction's own category stays selectable
            if let Some(txn) = &excluded_txn {
                if txn.category_id == category.id {
                    selectable.push(category);
                    continue;
                }
            }

            if !validity::is_valid(&category, transaction_date) {
                continue;
            }

            if category.is_installment() {
                let transactions = self.storage.transactions.get_by_category(category.id)?;
                if category.has_payment_in_month(
                    &transactions,
                    transaction_date,
                    excluded_transaction,
                ) {
                    continue;
                }
            }

            selectable.push(category);
        }

        Ok(selectable)
    }

    /// Look up a transaction by ID, active or not (history is preserved)
    pub fn fetch_transaction(&self, id: TransactionId) -> LedgerResult<Transaction> {
        self.storage
            .transactions
            .get(id)?
            .ok_or_else(|| LedgerError::transaction_not_found(id.to_string()))
    }

    /// Active transactions of a budget within `[start, end]`, newest first
    pub fn fetch_transactions(
        &self,
        budget_id: BudgetId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> LedgerResult<Vec<Transaction>> {
        let transactions = self
            .storage
            .transactions
            .get_by_budget_in_range(budget_id, start, end)?;
        Ok(transactions.into_iter().filter(|t| t.is_active).collect())
    }

    // ----- Mutations -------------------------------------------------------

    /// Create a new budget
    pub fn create_budget(&self, name: impl Into<String>, total_amount: Money) -> LedgerResult<Budget> {
        let _gate = self.lock_mutations()?;

        let budget = Budget::new(name, total_amount);
        budget
            .validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        self.storage.run_atomic(vec![WriteOp::PutBudget(budget.clone())])?;
        Ok(budget)
    }

    /// Create a plain (non-installment) category under a budget
    pub fn create_category(
        &self,
        budget_id: BudgetId,
        name: impl Into<String>,
        allocated_amount: Money,
        is_income: bool,
    ) -> LedgerResult<Category> {
        let _gate = self.lock_mutations()?;

        self.require_active_budget(budget_id)?;

        let category = Category::new(name, budget_id, allocated_amount, is_income);
        category
            .validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        self.storage
            .run_atomic(vec![WriteOp::PutCategory(category.clone())])?;
        Ok(category)
    }

    /// Create an installment category: a time-bounded expense obligation
    ///
    /// The window end date is derived from `start_date` plus `months`
    /// calendar months and is immutable afterwards.
    pub fn create_installment_category(
        &self,
        budget_id: BudgetId,
        name: impl Into<String>,
        monthly_payment: Money,
        total_amount: Money,
        months: u32,
        start_date: NaiveDate,
    ) -> LedgerResult<Category> {
        let _gate = self.lock_mutations()?;

        self.require_active_budget(budget_id)?;

        let installment = Installment::new(monthly_payment, total_amount, months, start_date)
            .map_err(|e| match e {
                CategoryValidationError::ZeroInstallmentMonths => {
                    LedgerError::DataIntegrity(e.to_string())
                }
                other => LedgerError::Validation(other.to_string()),
            })?;

        let category = Category::with_installment(name, budget_id, installment);
        category
            .validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        self.storage
            .run_atomic(vec![WriteOp::PutCategory(category.clone())])?;
        Ok(category)
    }

    /// Create or edit a transaction
    ///
    /// Validation short-circuits on the first failure, and the balance
    /// effect is planned with checked arithmetic before anything is written:
    /// an overflowing result aborts with `LedgerError::Overflow` and leaves
    /// every record unchanged. On success the transaction and the updated
    /// category/budget aggregates commit as one atomic batch.
    pub fn save_transaction(&self, input: SaveTransactionInput) -> LedgerResult<Transaction> {
        let _gate = self.lock_mutations()?;

        // 1. Amount must be a positive value inside the representable range
        if !input.amount.is_positive() {
            return Err(LedgerError::Validation(
                "Transaction amount must be positive".into(),
            ));
        }
        if !input.amount.is_in_range() {
            return Err(LedgerError::Validation(
                "Transaction amount exceeds the representable range".into(),
            ));
        }

        let budget = self.require_active_budget(input.budget_id)?;
        let category = self
            .storage
            .categories
            .get(input.category_id)?
            .ok_or_else(|| LedgerError::category_not_found(input.category_id.to_string()))?;

        // 2. Cross-reference integrity
        if category.budget_id != input.budget_id {
            return Err(LedgerError::Validation(format!(
                "Category '{}' does not belong to budget '{}'",
                category.name, budget.name
            )));
        }
        if category.is_income != input.is_income {
            return Err(LedgerError::Validation(format!(
                "Category '{}' is not an {} category",
                category.name,
                if input.is_income { "income" } else { "expense" }
            )));
        }

        // 3. The category must be applicable on the transaction date
        if !validity::is_valid(&category, input.date) {
            return Err(LedgerError::Validation(format!(
                "Category '{}' is not applicable on {}",
                category.name, input.date
            )));
        }

        let existing = match input.existing {
            Some(id) => {
                let txn = self.fetch_transaction(id)?;
                if !txn.is_active {
                    return Err(LedgerError::Validation(
                        "Cannot edit an inactive transaction".into(),
                    ));
                }
                Some(txn)
            }
            None => None,
        };

        // 4./5. Plan the delta balance effect with checked arithmetic
        let aggregator = BalanceAggregator::new(self.storage);

        let mut target_category = category;
        let mut reversed_category: Option<Category> = None;

        match &existing {
            Some(old) if old.category_id == target_category.id => {
                // Same category: swap the old contribution for the new one
                let used = target_category
                    .used_amount
                    .checked_sub(old.amount)?
                    .checked_add(input.amount)?;
                target_category.set_used(used);
            }
            Some(old) => {
                // Category changed: reverse there, apply here
                let mut old_category = self
                    .storage
                    .categories
                    .get(old.category_id)?
                    .ok_or_else(|| LedgerError::category_not_found(old.category_id.to_string()))?;
                old_category.set_used(old_category.used_amount.checked_sub(old.amount)?);
                reversed_category = Some(old_category);

                let used = target_category.used_amount.checked_add(input.amount)?;
                target_category.set_used(used);
            }
            None => {
                let used = target_category.used_amount.checked_add(input.amount)?;
                target_category.set_used(used);
            }
        }

        let mut overrides: Vec<&Category> = vec![&target_category];
        if let Some(reversed) = &reversed_category {
            overrides.push(reversed);
        }

        let mut target_budget = budget;
        let remaining = aggregator.remaining_with_overrides(&target_budget, &overrides)?;
        target_budget.set_remaining(remaining);

        // If the edit moved the transaction across budgets, the old budget's
        // pool must give the contribution back too.
        let mut source_budget: Option<Budget> = None;
        if let Some(old) = &existing {
            if old.budget_id != input.budget_id {
                let mut old_budget = self
                    .storage
                    .budgets
                    .get(old.budget_id)?
                    .ok_or_else(|| LedgerError::budget_not_found(old.budget_id.to_string()))?;
                let remaining = aggregator.remaining_with_overrides(&old_budget, &overrides)?;
                old_budget.set_remaining(remaining);
                source_budget = Some(old_budget);
            }
        }

        // 6. Build the record and commit everything atomically
        let kind = TransactionKind::from_is_income(input.is_income);
        let transaction = match existing {
            Some(mut txn) => {
                txn.apply_edit(
                    input.budget_id,
                    input.category_id,
                    input.date,
                    input.amount,
                    input.description,
                    kind,
                );
                txn
            }
            None => Transaction::new(
                input.budget_id,
                input.category_id,
                input.date,
                input.amount,
                input.description,
                kind,
            ),
        };

        let mut ops = vec![
            WriteOp::PutTransaction(transaction.clone()),
            WriteOp::PutCategory(target_category),
        ];
        if let Some(reversed) = reversed_category {
            ops.push(WriteOp::PutCategory(reversed));
        }
        ops.push(WriteOp::PutBudget(target_budget));
        if let Some(old_budget) = source_budget {
            ops.push(WriteOp::PutBudget(old_budget));
        }

        self.storage.run_atomic(ops)?;
        Ok(transaction)
    }

    /// Soft-delete a transaction, giving its contribution back to the
    /// category and budget aggregates
    ///
    /// The record stays retrievable by ID. Deactivating twice is a no-op.
    pub fn deactivate_transaction(&self, id: TransactionId) -> LedgerResult<Transaction> {
        let _gate = self.lock_mutations()?;

        let mut transaction = self.fetch_transaction(id)?;
        if !transaction.is_active {
            return Ok(transaction);
        }

        let mut category = self
            .storage
            .categories
            .get(transaction.category_id)?
            .ok_or_else(|| {
                LedgerError::category_not_found(transaction.category_id.to_string())
            })?;
        let mut budget = self
            .storage
            .budgets
            .get(transaction.budget_id)?
            .ok_or_else(|| LedgerError::budget_not_found(transaction.budget_id.to_string()))?;

        category.set_used(category.used_amount.checked_sub(transaction.amount)?);

        let aggregator = BalanceAggregator::new(self.storage);
        let remaining = aggregator.remaining_with_overrides(&budget, &[&category])?;
        budget.set_remaining(remaining);

        transaction.soft_delete();

        self.storage.run_atomic(vec![
            WriteOp::PutTransaction(transaction.clone()),
            WriteOp::PutCategory(category),
            WriteOp::PutBudget(budget),
        ])?;
        Ok(transaction)
    }

    /// Deactivate a category, cascading to its transactions
    ///
    /// The budget's remaining pool is recomputed without the category's
    /// spending; historical records stay queryable by ID.
    pub fn deactivate_category(&self, id: CategoryId) -> LedgerResult<Category> {
        let _gate = self.lock_mutations()?;

        let mut category = self
            .storage
            .categories
            .get(id)?
            .ok_or_else(|| LedgerError::category_not_found(id.to_string()))?;
        if !category.is_active {
            return Ok(category);
        }

        let mut budget = self
            .storage
            .budgets
            .get(category.budget_id)?
            .ok_or_else(|| LedgerError::budget_not_found(category.budget_id.to_string()))?;

        category.deactivate();

        let mut ops = Vec::new();
        for mut txn in self.storage.transactions.get_by_category(id)? {
            if txn.is_active {
                txn.soft_delete();
                ops.push(WriteOp::PutTransaction(txn));
            }
        }

        let aggregator = BalanceAggregator::new(self.storage);
        let remaining = aggregator.remaining_with_overrides(&budget, &[&category])?;
        budget.set_remaining(remaining);

        ops.push(WriteOp::PutCategory(category.clone()));
        ops.push(WriteOp::PutBudget(budget));

        self.storage.run_atomic(ops)?;
        Ok(category)
    }

    /// Deactivate a budget, cascading to its categories and transactions
    pub fn deactivate_budget(&self, id: BudgetId) -> LedgerResult<Budget> {
        let _gate = self.lock_mutations()?;

        let mut budget = self
            .storage
            .budgets
            .get(id)?
            .ok_or_else(|| LedgerError::budget_not_found(id.to_string()))?;
        if !budget.is_active {
            return Ok(budget);
        }

        budget.deactivate();

        let mut ops = Vec::new();
        for mut category in self.storage.categories.get_by_budget(id)? {
            if category.is_active {
                category.deactivate();
                ops.push(WriteOp::PutCategory(category));
            }
        }
        for mut txn in self.storage.transactions.get_by_budget(id)? {
            if txn.is_active {
                txn.soft_delete();
                ops.push(WriteOp::PutTransaction(txn));
            }
        }
        ops.push(WriteOp::PutBudget(budget.clone()));

        self.storage.run_atomic(ops)?;
        Ok(budget)
    }

    /// Recompute every budget's cached aggregates from its transactions and
    /// repair any drift (startup consistency check)
    ///
    /// Returns the number of repaired records.
    pub fn reconcile_all(&self) -> LedgerResult<usize> {
        let _gate = self.lock_mutations()?;

        let aggregator = BalanceAggregator::new(self.storage);
        let mut repaired = 0;

        for budget in self.storage.budgets.get_all()? {
            let ops = aggregator.plan_reconcile(budget.id)?;
            if !ops.is_empty() {
                repaired += ops.len();
                self.storage.run_atomic(ops)?;
            }
        }

        if repaired > 0 {
            tracing::info!(repaired, "reconciliation repaired cached aggregates");
        }
        Ok(repaired)
    }

    // ----- Internals -------------------------------------------------------

    fn lock_mutations(&self) -> LedgerResult<std::sync::MutexGuard<'a, ()>> {
        self.storage
            .mutation_gate()
            .lock()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire mutation gate: {}", e)))
    }

    fn require_active_budget(&self, id: BudgetId) -> LedgerResult<Budget> {
        let budget = self
            .storage
            .budgets
            .get(id)?
            .ok_or_else(|| LedgerError::budget_not_found(id.to_string()))?;
        if !budget.is_active {
            return Err(LedgerError::Validation(format!(
                "Budget '{}' is not active",
                budget.name
            )));
        }
        Ok(budget)
    }
}
