//! Transaction model
//!
//! A transaction records a single payment or receipt against a category.
//! The amount is always stored as a positive magnitude; the sign is implied
//! by the owning category's income flag, denormalized here as `kind` so
//! historical records keep their meaning even if the category changes later.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::dates::month_start;
use super::ids::{BudgetId, CategoryId, TransactionId};
use super::money::Money;

/// Whether a transaction adds to or draws from the budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    /// Derive the kind from the owning category's income flag
    pub fn from_is_income(is_income: bool) -> Self {
        if is_income {
            Self::Income
        } else {
            Self::Expense
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Income => write!(f, "Income"),
            Self::Expense => write!(f, "Expense"),
        }
    }
}

/// A financial transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier
    pub id: TransactionId,

    /// The budget this transaction belongs to
    pub budget_id: BudgetId,

    /// The category this transaction belongs to
    pub category_id: CategoryId,

    /// Amount as a positive magnitude
    pub amount: Money,

    /// Free-form description
    #[serde(default)]
    pub description: String,

    /// Transaction date
    pub date: NaiveDate,

    /// First day of the month this transaction is bucketed into
    pub period_start: NaiveDate,

    /// Income or expense, cached from the category at save time
    pub kind: TransactionKind,

    /// Soft-delete marker
    #[serde(default = "default_active")]
    pub is_active: bool,

    /// When the transaction was created
    pub created_at: DateTime<Utc>,

    /// When the transaction was last modified
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl Transaction {
    /// Create a new transaction
    pub fn new(
        budget_id: BudgetId,
        category_id: CategoryId,
        date: NaiveDate,
        amount: Money,
        description: impl Into<String>,
        kind: TransactionKind,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::new(),
            budget_id,
            category_id,
            amount,
            description: description.into(),
            date,
            period_start: month_start(date),
            kind,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this transaction adds funds
    pub fn is_income(&self) -> bool {
        self.kind == TransactionKind::Income
    }

    /// Soft-delete: the record stays queryable for history but no longer
    /// contributes to balances
    pub fn soft_delete(&mut self) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }

    /// Reverse a soft delete
    pub fn restore(&mut self) {
        self.is_active = true;
        self.updated_at = Utc::now();
    }

    /// Replace the editable fields, re-bucketing the month period
    pub fn apply_edit(
        &mut self,
        budget_id: BudgetId,
        category_id: CategoryId,
        date: NaiveDate,
        amount: Money,
        description: impl Into<String>,
        kind: TransactionKind,
    ) {
        self.budget_id = budget_id;
        self.category_id = category_id;
        self.date = date;
        self.period_start = month_start(date);
        self.amount = amount;
        self.description = description.into();
        self.kind = kind;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_new_transaction() {
        let txn = Transaction::new(
            BudgetId::new(),
            CategoryId::new(),
            d(2025, 1, 15),
            Money::from_cents(5_000),
            "Weekly shop",
            TransactionKind::Expense,
        );

        assert_eq!(txn.amount.cents(), 5_000);
        assert_eq!(txn.period_start, d(2025, 1, 1));
        assert!(txn.is_active);
        assert!(!txn.is_income());
    }

    #[test]
    fn test_soft_delete_and_restore() {
        let mut txn = Transaction::new(
            BudgetId::new(),
            CategoryId::new(),
            d(2025, 1, 15),
            Money::from_cents(5_000),
            "",
            TransactionKind::Expense,
        );

        txn.soft_delete();
        assert!(!txn.is_active);

        txn.restore();
        assert!(txn.is_active);
    }

    #[test]
    fn test_apply_edit_rebuckets_period() {
        let mut txn = Transaction::new(
            BudgetId::new(),
            CategoryId::new(),
            d(2025, 1, 15),
            Money::from_cents(5_000),
            "Original",
            TransactionKind::Expense,
        );
        let new_category = CategoryId::new();

        txn.apply_edit(
            txn.budget_id,
            new_category,
            d(2025, 2, 3),
            Money::from_cents(7_500),
            "Edited",
            TransactionKind::Expense,
        );

        assert_eq!(txn.category_id, new_category);
        assert_eq!(txn.period_start, d(2025, 2, 1));
        assert_eq!(txn.amount.cents(), 7_500);
        assert_eq!(txn.description, "Edited");
    }

    #[test]
    fn test_kind_from_is_income() {
        assert_eq!(TransactionKind::from_is_income(true), TransactionKind::Income);
        assert_eq!(TransactionKind::from_is_income(false), TransactionKind::Expense);
    }

    #[test]
    fn test_serialization() {
        let txn = Transaction::new(
            BudgetId::new(),
            CategoryId::new(),
            d(2025, 1, 15),
            Money::from_cents(5_000),
            "Weekly shop",
            TransactionKind::Expense,
        );
        let json = serde_json::to_string(&txn).unwrap();
        let deserialized: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(txn.id, deserialized.id);
        assert_eq!(txn.kind, deserialized.kind);
    }
}
