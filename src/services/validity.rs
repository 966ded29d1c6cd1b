//! Category validity resolution
//!
//! Decides whether a category is applicable on a given date. Plain categories
//! are valid for any date while their budget lives; installment categories
//! only inside their `[start, end)` window. Used both when listing selectable
//! categories for a transaction date and when validating a transaction's
//! category at save time.

use chrono::NaiveDate;

use crate::models::Category;

/// Whether `category` can take a transaction dated `on_date`
///
/// Budget activity is not checked here; the ledger service only resolves
/// categories of active budgets.
pub fn is_valid(category: &Category, on_date: NaiveDate) -> bool {
    if !category.is_active {
        return false;
    }

    match &category.installment {
        None => true,
        Some(installment) => {
            if !installment.is_well_formed() {
                // Malformed stored data; report the category unusable
                // instead of failing the calling operation.
                tracing::warn!(
                    category = %category.id,
                    months = installment.months,
                    "installment window is malformed, treating category as never valid"
                );
                return false;
            }
            installment.contains(on_date)
        }
    }
}
