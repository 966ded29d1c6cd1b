//! Balance aggregation
//!
//! Computes allocated/used/remaining amounts for budgets and categories.
//! Mutations are applied as O(1) deltas planned ahead of the commit; the
//! full-rescan paths exist for reconciliation and startup consistency
//! checks. Every intermediate sum is overflow-checked, so a bad balance
//! surfaces as an error before anything is persisted.

use chrono::NaiveDate;

use crate::error::{LedgerError, LedgerResult};
use crate::models::dates::{month_start, same_month};
use crate::models::money::MoneyOverflow;
use crate::models::{Budget, BudgetId, Category, CategoryId, Money};
use crate::storage::{Storage, WriteOp};

/// Income, expenses, and remaining for one calendar month of a budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetMonthSummary {
    pub budget_id: BudgetId,
    /// First day of the summarized month
    pub month: NaiveDate,
    pub income: Money,
    pub expenses: Money,
    /// `total_amount + income − expenses` for the month
    pub remaining: Money,
}

/// Balance computation over a storage snapshot
pub struct BalanceAggregator<'a> {
    storage: &'a Storage,
}

impl<'a> BalanceAggregator<'a> {
    /// Create a new balance aggregator
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Full-rescan sum of a category's active transactions
    pub fn category_used_amount(&self, category_id: CategoryId) -> LedgerResult<Money> {
        let transactions = self.storage.transactions.get_by_category(category_id)?;
        let used = Money::checked_sum(
            transactions
                .iter()
                .filter(|t| t.is_active)
                .map(|t| t.amount),
        )?;
        Ok(used)
    }

    /// Remaining amount for a budget, computed from its stored categories
    pub fn budget_remaining_amount(&self, budget: &Budget) -> LedgerResult<Money> {
        let categories = self.storage.categories.get_by_budget(budget.id)?;
        Ok(remaining_from_categories(budget, &categories)?)
    }

    /// Remaining amount for a budget with some category records replaced by
    /// not-yet-committed versions
    ///
    /// This is the planning path of a save: the overridden categories carry
    /// the delta-updated used amounts, and the result is computed before any
    /// write happens.
    pub fn remaining_with_overrides(
        &self,
        budget: &Budget,
        overrides: &[&Category],
    ) -> LedgerResult<Money> {
        let mut categories = self.storage.categories.get_by_budget(budget.id)?;
        for category in categories.iter_mut() {
            if let Some(replacement) = overrides.iter().find(|o| o.id == category.id) {
                *category = (*replacement).clone();
            }
        }
        Ok(remaining_from_categories(budget, &categories)?)
    }

    /// Recompute a budget subtree's cached aggregates from scratch and return
    /// the write ops needed to repair any drift
    ///
    /// An empty result means the cached values already match the rescan.
    /// Deactivated subtrees are frozen history and are never touched.
    pub fn plan_reconcile(&self, budget_id: BudgetId) -> LedgerResult<Vec<WriteOp>> {
        let budget = self
            .storage
            .budgets
            .get(budget_id)?
            .ok_or_else(|| LedgerError::budget_not_found(budget_id.to_string()))?;

        if !budget.is_active {
            return Ok(Vec::new());
        }

        let mut ops = Vec::new();
        let mut categories = self.storage.categories.get_by_budget(budget_id)?;

        for category in categories.iter_mut() {
            if !category.is_active {
                continue;
            }
            let rescanned = self.category_used_amount(category.id)?;
            if rescanned != category.used_amount {
                tracing::warn!(
                    category = %category.id,
                    cached = %category.used_amount,
                    rescanned = %rescanned,
                    "category used amount drifted from its transactions"
                );
                category.set_used(rescanned);
                ops.push(WriteOp::PutCategory(category.clone()));
            }
        }

        let remaining = remaining_from_categories(&budget, &categories)?;
        if remaining != budget.remaining_amount {
            tracing::warn!(
                budget = %budget.id,
                cached = %budget.remaining_amount,
                rescanned = %remaining,
                "budget remaining amount drifted from its categories"
            );
            let mut repaired = budget;
            repaired.set_remaining(remaining);
            ops.push(WriteOp::PutBudget(repaired));
        }

        Ok(ops)
    }

    /// Income/expense/remaining summary for the month containing `date`
    ///
    /// Transactions are bucketed by their month period, and remaining is the
    /// monthly view (`total + income − expenses`), independent of the
    /// lifetime `remaining_amount` invariant.
    pub fn month_summary(&self, budget: &Budget, date: NaiveDate) -> LedgerResult<BudgetMonthSummary> {
        let transactions = self.storage.transactions.get_by_budget(budget.id)?;
        let month = month_start(date);

        let in_month: Vec<_> = transactions
            .iter()
            .filter(|t| t.is_active && same_month(t.period_start, month))
            .collect();

        let income = Money::checked_sum(
            in_month
                .iter()
                .filter(|t| t.is_income())
                .map(|t| t.amount),
        )?;
        let expenses = Money::checked_sum(
            in_month
                .iter()
                .filter(|t| !t.is_income())
                .map(|t| t.amount),
        )?;
        let remaining = budget
            .total_amount
            .checked_add(income)?
            .checked_sub(expenses)?;

        Ok(BudgetMonthSummary {
            budget_id: budget.id,
            month,
            income,
            expenses,
            remaining,
        })
    }
}

/// `total_amount − Σ used_amount` over active expense categories
///
/// Income categories track their own used/allocated for reporting but do not
/// consume the budget's remaining pool.
pub fn remaining_from_categories(
    budget: &Budget,
    categories: &[Category],
) -> Result<Money, MoneyOverflow> {
    let spent = Money::checked_sum(
        categories
            .iter()
            .filter(|c| c.is_active && !c.is_income)
            .map(|c| c.used_amount),
    )?;
    budget.total_amount.checked_sub(spent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::TallybookPaths;
    use crate::models::money::MAX_MINOR_UNITS;
    use crate::models::{Transaction, TransactionKind};
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = TallybookPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths).unwrap();
        storage.load_all().unwrap();
        (temp_dir, storage)
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn seed_budget(storage: &Storage, total_cents: i64) -> Budget {
        let budget = Budget::new("Test budget", Money::from_cents(total_cents));
        storage.budgets.upsert(budget.clone()).unwrap();
        budget
    }

    fn seed_category(storage: &Storage, budget: &Budget, name: &str, is_income: bool) -> Category {
        let category = Category::new(name, budget.id, Money::from_cents(100_000), is_income);
        storage.categories.upsert(category.clone()).unwrap();
        category
    }

    fn seed_txn(
        storage: &Storage,
        budget: &Budget,
        category: &Category,
        date: NaiveDate,
        cents: i64,
    ) -> Transaction {
        let kind = TransactionKind::from_is_income(category.is_income);
        let txn = Transaction::new(budget.id, category.id, date, Money::from_cents(cents), "", kind);
        storage.transactions.upsert(txn.clone()).unwrap();
        txn
    }

    #[test]
    fn test_category_used_amount_skips_inactive() {
        let (_temp_dir, storage) = create_test_storage();
        let budget = seed_budget(&storage, 500_000);
        let category = seed_category(&storage, &budget, "Groceries", false);

        seed_txn(&storage, &budget, &category, d(2025, 1, 10), 5_000);
        let mut deleted = seed_txn(&storage, &budget, &category, d(2025, 1, 11), 7_000);
        deleted.soft_delete();
        storage.transactions.upsert(deleted).unwrap();

        let aggregator = BalanceAggregator::new(&storage);
        let used = aggregator.category_used_amount(category.id).unwrap();
        assert_eq!(used.cents(), 5_000);
    }

    #[test]
    fn test_remaining_ignores_income_categories() {
        let (_temp_dir, storage) = create_test_storage();
        let budget = seed_budget(&storage, 500_000);

        let mut expense = seed_category(&storage, &budget, "Groceries", false);
        expense.set_used(Money::from_cents(40_000));
        storage.categories.upsert(expense).unwrap();

        let mut income = seed_category(&storage, &budget, "Salary", true);
        income.set_used(Money::from_cents(300_000));
        storage.categories.upsert(income).unwrap();

        let aggregator = BalanceAggregator::new(&storage);
        let remaining = aggregator.budget_remaining_amount(&budget).unwrap();
        assert_eq!(remaining.cents(), 460_000);
    }

    #[test]
    fn test_remaining_ignores_inactive_categories() {
        let (_temp_dir, storage) = create_test_storage();
        let budget = seed_budget(&storage, 500_000);

        let mut retired = seed_category(&storage, &budget, "Old plan", false);
        retired.set_used(Money::from_cents(90_000));
        retired.deactivate();
        storage.categories.upsert(retired).unwrap();

        let aggregator = BalanceAggregator::new(&storage);
        let remaining = aggregator.budget_remaining_amount(&budget).unwrap();
        assert_eq!(remaining.cents(), 500_000);
    }

    #[test]
    fn test_remaining_with_overrides_prefers_planned_records() {
        let (_temp_dir, storage) = create_test_storage();
        let budget = seed_budget(&storage, 500_000);
        let category = seed_category(&storage, &budget, "Groceries", false);

        let mut planned = category.clone();
        planned.set_used(Money::from_cents(120_000));

        let aggregator = BalanceAggregator::new(&storage);
        let remaining = aggregator
            .remaining_with_overrides(&budget, &[&planned])
            .unwrap();
        assert_eq!(remaining.cents(), 380_000);

        // The stored record was not touched
        let stored = storage.categories.get(category.id).unwrap().unwrap();
        assert!(stored.used_amount.is_zero());
    }

    #[test]
    fn test_aggregation_overflow_is_an_error() {
        let (_temp_dir, storage) = create_test_storage();
        let budget = seed_budget(&storage, 1_000);

        let mut cat1 = seed_category(&storage, &budget, "A", false);
        cat1.set_used(Money::from_cents(MAX_MINOR_UNITS));
        storage.categories.upsert(cat1).unwrap();

        let mut cat2 = seed_category(&storage, &budget, "B", false);
        cat2.set_used(Money::from_cents(MAX_MINOR_UNITS));
        storage.categories.upsert(cat2).unwrap();

        let aggregator = BalanceAggregator::new(&storage);
        let result = aggregator.budget_remaining_amount(&budget);
        assert!(matches!(result, Err(LedgerError::Overflow(_))));
    }

    #[test]
    fn test_plan_reconcile_repairs_drift() {
        let (_temp_dir, storage) = create_test_storage();
        let budget = seed_budget(&storage, 500_000);
        let category = seed_category(&storage, &budget, "Groceries", false);
        seed_txn(&storage, &budget, &category, d(2025, 1, 10), 5_000);

        // Cached aggregates are stale: category says zero used, budget says
        // full remaining.
        let aggregator = BalanceAggregator::new(&storage);
        let ops = aggregator.plan_reconcile(budget.id).unwrap();
        assert_eq!(ops.len(), 2);

        storage.run_atomic(ops).unwrap();

        let repaired_cat = storage.categories.get(category.id).unwrap().unwrap();
        assert_eq!(repaired_cat.used_amount.cents(), 5_000);
        let repaired_budget = storage.budgets.get(budget.id).unwrap().unwrap();
        assert_eq!(repaired_budget.remaining_amount.cents(), 495_000);

        // A second pass finds nothing to repair
        assert!(aggregator.plan_reconcile(budget.id).unwrap().is_empty());
    }

    #[test]
    fn test_month_summary_buckets_by_period() {
        let (_temp_dir, storage) = create_test_storage();
        let budget = seed_budget(&storage, 500_000);
        let groceries = seed_category(&storage, &budget, "Groceries", false);
        let salary = seed_category(&storage, &budget, "Salary", true);

        seed_txn(&storage, &budget, &groceries, d(2025, 1, 10), 40_000);
        seed_txn(&storage, &budget, &salary, d(2025, 1, 25), 300_000);
        seed_txn(&storage, &budget, &groceries, d(2025, 2, 2), 9_999);

        let aggregator = BalanceAggregator::new(&storage);
        let summary = aggregator.month_summary(&budget, d(2025, 1, 31)).unwrap();

        assert_eq!(summary.month, d(2025, 1, 1));
        assert_eq!(summary.income.cents(), 300_000);
        assert_eq!(summary.expenses.cents(), 40_000);
        assert_eq!(summary.remaining.cents(), 760_000);
    }
}
