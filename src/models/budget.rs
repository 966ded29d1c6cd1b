//! Budget model
//!
//! A budget is a named pool with a total allocation, subdivided into
//! categories. `remaining_amount` is a cached derivation maintained by the
//! balance aggregator; it is never edited directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::BudgetId;
use super::money::Money;

/// A budget: a named pool of funds tracked over its active lifetime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    /// Unique identifier
    pub id: BudgetId,

    /// Budget name
    pub name: String,

    /// Total amount allocated to this budget
    pub total_amount: Money,

    /// Cached remaining amount: total minus the used amounts of active
    /// expense categories
    pub remaining_amount: Money,

    /// Soft-delete marker; inactive budgets are excluded from queries but
    /// retained for history
    #[serde(default = "default_active")]
    pub is_active: bool,

    /// When the budget was created
    pub created_at: DateTime<Utc>,

    /// When the budget was last modified
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl Budget {
    /// Create a new budget; remaining starts equal to the total
    pub fn new(name: impl Into<String>, total_amount: Money) -> Self {
        let now = Utc::now();
        Self {
            id: BudgetId::new(),
            name: name.into(),
            total_amount,
            remaining_amount: total_amount,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the cached remaining amount
    pub fn set_remaining(&mut self, remaining: Money) {
        self.remaining_amount = remaining;
        self.updated_at = Utc::now();
    }

    /// Soft-delete the budget
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }

    /// Validate the budget
    pub fn validate(&self) -> Result<(), BudgetValidationError> {
        if self.name.trim().is_empty() {
            return Err(BudgetValidationError::EmptyName);
        }

        if self.name.len() > 50 {
            return Err(BudgetValidationError::NameTooLong(self.name.len()));
        }

        if self.total_amount.is_negative() {
            return Err(BudgetValidationError::NegativeTotal);
        }

        if !self.total_amount.is_in_range() {
            return Err(BudgetValidationError::TotalOutOfRange);
        }

        Ok(())
    }
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Validation errors for budgets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BudgetValidationError {
    EmptyName,
    NameTooLong(usize),
    NegativeTotal,
    TotalOutOfRange,
}

impl fmt::Display for BudgetValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Budget name cannot be empty"),
            Self::NameTooLong(len) => {
                write!(f, "Budget name too long ({} chars, max 50)", len)
            }
            Self::NegativeTotal => write!(f, "Budget total cannot be negative"),
            Self::TotalOutOfRange => write!(f, "Budget total exceeds the representable range"),
        }
    }
}

impl std::error::Error for BudgetValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_budget() {
        let budget = Budget::new("Household", Money::from_cents(500_000));
        assert_eq!(budget.name, "Household");
        assert_eq!(budget.total_amount.cents(), 500_000);
        assert_eq!(budget.remaining_amount, budget.total_amount);
        assert!(budget.is_active);
    }

    #[test]
    fn test_deactivate() {
        let mut budget = Budget::new("Household", Money::from_cents(500_000));
        budget.deactivate();
        assert!(!budget.is_active);
    }

    #[test]
    fn test_validation() {
        let mut budget = Budget::new("Valid", Money::from_cents(1000));
        assert!(budget.validate().is_ok());

        budget.name = String::new();
        assert_eq!(budget.validate(), Err(BudgetValidationError::EmptyName));

        budget.name = "a".repeat(51);
        assert!(matches!(
            budget.validate(),
            Err(BudgetValidationError::NameTooLong(_))
        ));

        budget.name = "Valid".to_string();
        budget.total_amount = Money::from_cents(-1);
        assert_eq!(budget.validate(), Err(BudgetValidationError::NegativeTotal));
    }

    #[test]
    fn test_serialization() {
        let budget = Budget::new("Household", Money::from_cents(500_000));
        let json = serde_json::to_string(&budget).unwrap();
        let deserialized: Budget = serde_json::from_str(&json).unwrap();
        assert_eq!(budget.id, deserialized.id);
        assert_eq!(budget.remaining_amount, deserialized.remaining_amount);
    }
}
