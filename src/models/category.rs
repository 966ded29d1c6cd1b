//! Category model
//!
//! A category is a named bucket under a budget, either income or expense.
//! A category may optionally be an installment: a time-bounded obligation
//! valid only within a window derived from a start date and a month count.
//! Installment fields are set once at creation and immutable thereafter.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::dates::{add_months, same_month};
use super::ids::{BudgetId, CategoryId};
use super::money::Money;

/// Installment configuration for a time-bounded category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installment {
    /// Number of monthly payments
    pub months: u32,

    /// First day the category accepts payments
    pub start_date: NaiveDate,

    /// Exclusive end of the window: `start_date` plus `months` calendar months
    pub end_date: NaiveDate,

    /// Expected payment per month
    pub monthly_payment: Money,

    /// Total amount owed across the whole installment
    pub total_amount: Money,
}

impl Installment {
    /// Build an installment window; the end date is derived, never supplied
    pub fn new(
        monthly_payment: Money,
        total_amount: Money,
        months: u32,
        start_date: NaiveDate,
    ) -> Result<Self, CategoryValidationError> {
        if months == 0 {
            return Err(CategoryValidationError::ZeroInstallmentMonths);
        }

        if !monthly_payment.is_positive() || !total_amount.is_positive() {
            return Err(CategoryValidationError::NonPositiveInstallmentAmount);
        }

        Ok(Self {
            months,
            start_date,
            end_date: add_months(start_date, months),
            monthly_payment,
            total_amount,
        })
    }

    /// Whether `date` falls inside the half-open window `[start, end)`
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date < self.end_date
    }

    /// Whether the stored fields still describe a usable window
    ///
    /// Data loaded from disk may have been hand-edited; a zero month count or
    /// an inverted window is a data-integrity fault, not a crash.
    pub fn is_well_formed(&self) -> bool {
        self.months > 0 && self.start_date < self.end_date
    }

    /// Months left in the window as of `today` (0 once expired)
    pub fn remaining_months(&self, today: NaiveDate) -> u32 {
        let mut remaining = 0;
        let mut cursor = today.max(self.start_date);
        while cursor < self.end_date && remaining < self.months {
            remaining += 1;
            cursor = add_months(cursor, 1);
        }
        remaining
    }
}

/// A budget category, either income or expense
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier
    pub id: CategoryId,

    /// The budget this category belongs to
    pub budget_id: BudgetId,

    /// Category name
    pub name: String,

    /// Amount allocated to this category
    pub allocated_amount: Money,

    /// Cached sum of the amounts of this category's active transactions
    pub used_amount: Money,

    /// Income categories do not consume the budget's remaining pool
    pub is_income: bool,

    /// Installment window, if this category is a time-bounded obligation
    #[serde(default)]
    pub installment: Option<Installment>,

    /// Soft-delete marker
    #[serde(default = "default_active")]
    pub is_active: bool,

    /// When the category was created
    pub created_at: DateTime<Utc>,

    /// When the category was last modified
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl Category {
    /// Create a new plain category
    pub fn new(
        name: impl Into<String>,
        budget_id: BudgetId,
        allocated_amount: Money,
        is_income: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: CategoryId::new(),
            budget_id,
            name: name.into(),
            allocated_amount,
            used_amount: Money::zero(),
            is_income,
            installment: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create an installment category
    pub fn with_installment(
        name: impl Into<String>,
        budget_id: BudgetId,
        installment: Installment,
    ) -> Self {
        // An installment's allocation is its total obligation
        let mut category = Self::new(name, budget_id, installment.total_amount, false);
        category.installment = Some(installment);
        category
    }

    /// Whether this category is an installment
    pub fn is_installment(&self) -> bool {
        self.installment.is_some()
    }

    /// Replace the cached used amount
    pub fn set_used(&mut self, used: Money) {
        self.used_amount = used;
        self.updated_at = Utc::now();
    }

    /// Soft-delete the category
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }

    /// Allocated minus used; can go negative when overspent
    pub fn remaining_amount(&self) -> Money {
        Money::from_cents(self.allocated_amount.cents() - self.used_amount.cents())
    }

    /// Whether spending has exceeded the allocation
    pub fn is_over_budget(&self) -> bool {
        self.used_amount > self.allocated_amount
    }

    /// Fraction of the allocation consumed, for presentation meters
    pub fn usage_ratio(&self) -> f64 {
        if !self.allocated_amount.is_positive() {
            return 0.0;
        }
        self.used_amount.cents() as f64 / self.allocated_amount.cents() as f64
    }

    /// Whether any of `transactions` is an active payment in the same
    /// calendar month as `date`, skipping `excluded` (the edit-in-place case)
    ///
    /// Installment categories accept at most one payment per month; the
    /// selectable-category query uses this to filter out already-paid months.
    pub fn has_payment_in_month(
        &self,
        transactions: &[super::transaction::Transaction],
        date: NaiveDate,
        excluded: Option<super::ids::TransactionId>,
    ) -> bool {
        if self.installment.is_none() {
            return false;
        }

        transactions.iter().any(|txn| {
            if excluded == Some(txn.id) {
                return false;
            }
            txn.is_active && txn.category_id == self.id && same_month(txn.date, date)
        })
    }

    /// Validate the category
    pub fn validate(&self) -> Result<(), CategoryValidationError> {
        if self.name.trim().is_empty() {
            return Err(CategoryValidationError::EmptyName);
        }

        if self.name.len() > 50 {
            return Err(CategoryValidationError::NameTooLong(self.name.len()));
        }

        if self.allocated_amount.is_negative() {
            return Err(CategoryValidationError::NegativeAllocation);
        }

        if !self.allocated_amount.is_in_range() {
            return Err(CategoryValidationError::AllocationOutOfRange);
        }

        if let Some(installment) = &self.installment {
            if installment.months == 0 {
                return Err(CategoryValidationError::ZeroInstallmentMonths);
            }
            if self.is_income {
                return Err(CategoryValidationError::IncomeInstallment);
            }
        }

        Ok(())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Validation errors for categories
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryValidationError {
    EmptyName,
    NameTooLong(usize),
    NegativeAllocation,
    AllocationOutOfRange,
    ZeroInstallmentMonths,
    NonPositiveInstallmentAmount,
    IncomeInstallment,
}

impl fmt::Display for CategoryValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Category name cannot be empty"),
            Self::NameTooLong(len) => {
                write!(f, "Category name too long ({} chars, max 50)", len)
            }
            Self::NegativeAllocation => write!(f, "Allocated amount cannot be negative"),
            Self::AllocationOutOfRange => {
                write!(f, "Allocated amount exceeds the representable range")
            }
            Self::ZeroInstallmentMonths => {
                write!(f, "Installment month count must be at least 1")
            }
            Self::NonPositiveInstallmentAmount => {
                write!(f, "Installment amounts must be positive")
            }
            Self::IncomeInstallment => {
                write!(f, "An income category cannot be an installment")
            }
        }
    }
}

impl std::error::Error for CategoryValidationError {}
