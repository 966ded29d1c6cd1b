//! Category repository for JSON storage
//!
//! Manages loading and saving categories to categories.json, with an index
//! from budget to its categories.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::LedgerError;
use crate::models::{BudgetId, Category, CategoryId};

use super::file_io::{read_json, write_json_atomic};

/// Serializable category data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct CategoryData {
    categories: Vec<Category>,
}

/// Repository for category persistence with a budget index
pub struct CategoryRepository {
    path: PathBuf,
    data: RwLock<HashMap<CategoryId, Category>>,
    /// Index: budget_id -> category_ids
    by_budget: RwLock<HashMap<BudgetId, Vec<CategoryId>>>,
}

impl CategoryRepository {
    /// Create a new category repository
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
            by_budget: RwLock::new(HashMap::new()),
        }
    }

    /// Load categories from disk and build the budget index
    pub fn load(&self) -> Result<(), LedgerError> {
        let file_data: CategoryData = read_json(&self.path)?;

        let mut data = self
            .data
            .write()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire write lock: {}", e)))?;
        let mut by_budget = self
            .by_budget
            .write()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        data.clear();
        by_budget.clear();

        for category in file_data.categories {
            by_budget
                .entry(category.budget_id)
                .or_default()
                .push(category.id);
            data.insert(category.id, category);
        }

        Ok(())
    }

    /// Save categories to disk
    pub fn save(&self) -> Result<(), LedgerError> {
        let data = self
            .data
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let mut categories: Vec<_> = data.values().cloned().collect();
        categories.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

        let file_data = CategoryData { categories };
        write_json_atomic(&self.path, &file_data)
    }

    /// Get a category by ID
    pub fn get(&self, id: CategoryId) -> Result<Option<Category>, LedgerError> {
        let data = self
            .data
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.get(&id).cloned())
    }

    /// Get all categories belonging to a budget
    pub fn get_by_budget(&self, budget_id: BudgetId) -> Result<Vec<Category>, LedgerError> {
        let data = self
            .data
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))?;
        let by_budget = self
            .by_budget
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let ids = by_budget
            .get(&budget_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[]);
        let mut categories: Vec<_> = ids.iter().filter_map(|id| data.get(id).cloned()).collect();
        categories.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(categories)
    }

    /// Insert or update a category
    pub fn upsert(&self, category: Category) -> Result<(), LedgerError> {
        let mut data = self
            .data
            .write()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire write lock: {}", e)))?;
        let mut by_budget = self
            .by_budget
            .write()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        // Remove from the old index entry if the budget changed
        if let Some(old) = data.get(&category.id) {
            if old.budget_id != category.budget_id {
                if let Some(ids) = by_budget.get_mut(&old.budget_id) {
                    ids.retain(|&id| id != category.id);
                }
            }
        }

        let entry = by_budget.entry(category.budget_id).or_default();
        if !entry.contains(&category.id) {
            entry.push(category.id);
        }

        data.insert(category.id, category);
        Ok(())
    }

    /// Remove a category from the in-memory map (rollback support)
    pub fn delete(&self, id: CategoryId) -> Result<bool, LedgerError> {
        let mut data = self
            .data
            .write()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire write lock: {}", e)))?;
        let mut by_budget = self
            .by_budget
            .write()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        if let Some(category) = data.remove(&id) {
            if let Some(ids) = by_budget.get_mut(&category.budget_id) {
                ids.retain(|&cid| cid != id);
            }
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Count categories
    pub fn count(&self) -> Result<usize, LedgerError> {
        let data = self
            .data
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Money;
    use tempfile::TempDir;

    fn create_test_repo() -> (TempDir, CategoryRepository) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("categories.json");
        let repo = CategoryRepository::new(path);
        (temp_dir, repo)
    }

    #[test]
    fn test_upsert_and_get_by_budget() {
        let (_temp_dir, repo) = create_test_repo();
        repo.load().unwrap();

        let budget1 = BudgetId::new();
        let budget2 = BudgetId::new();

        repo.upsert(Category::new("Groceries", budget1, Money::from_cents(100), false))
            .unwrap();
        repo.upsert(Category::new("Rent", budget1, Money::from_cents(200), false))
            .unwrap();
        repo.upsert(Category::new("Salary", budget2, Money::from_cents(300), true))
            .unwrap();

        assert_eq!(repo.get_by_budget(budget1).unwrap().len(), 2);
        assert_eq!(repo.get_by_budget(budget2).unwrap().len(), 1);
    }

    #[test]
    fn test_get_by_budget_sorted_case_insensitive() {
        let (_temp_dir, repo) = create_test_repo();
        repo.load().unwrap();

        let budget_id = BudgetId::new();
        repo.upsert(Category::new("zebra", budget_id, Money::from_cents(100), false))
            .unwrap();
        repo.upsert(Category::new("Apple", budget_id, Money::from_cents(100), false))
            .unwrap();
        repo.upsert(Category::new("mango", budget_id, Money::from_cents(100), false))
            .unwrap();

        let names: Vec<_> = repo
            .get_by_budget(budget_id)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Apple", "mango", "zebra"]);
    }

    #[test]
    fn test_upsert_reindexes_on_budget_change() {
        let (_temp_dir, repo) = create_test_repo();
        repo.load().unwrap();

        let budget1 = BudgetId::new();
        let budget2 = BudgetId::new();
        let mut category = Category::new("Groceries", budget1, Money::from_cents(100), false);
        repo.upsert(category.clone()).unwrap();

        category.budget_id = budget2;
        repo.upsert(category).unwrap();

        assert!(repo.get_by_budget(budget1).unwrap().is_empty());
        assert_eq!(repo.get_by_budget(budget2).unwrap().len(), 1);
    }

    #[test]
    fn test_save_and_reload() {
        let (temp_dir, repo) = create_test_repo();
        repo.load().unwrap();

        let budget_id = BudgetId::new();
        let category = Category::new("Groceries", budget_id, Money::from_cents(100), false);
        let id = category.id;
        repo.upsert(category).unwrap();
        repo.save().unwrap();

        let repo2 = CategoryRepository::new(temp_dir.path().join("categories.json"));
        repo2.load().unwrap();
        assert_eq!(repo2.get(id).unwrap().unwrap().name, "Groceries");
        assert_eq!(repo2.get_by_budget(budget_id).unwrap().len(), 1);
    }

    #[test]
    fn test_delete() {
        let (_temp_dir, repo) = create_test_repo();
        repo.load().unwrap();

        let budget_id = BudgetId::new();
        let category = Category::new("Groceries", budget_id, Money::from_cents(100), false);
        let id = category.id;
        repo.upsert(category).unwrap();

        assert!(repo.delete(id).unwrap());
        assert!(repo.get_by_budget(budget_id).unwrap().is_empty());
    }
}
