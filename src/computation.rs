//! Derived totals over one period's report: plain integer reduction of
//! entries and budgets against the category set.

use crate::model::{Amount, BudgetReport, Category, CategoryBudget, CategoryType};
use std::collections::HashMap;

/// Precomputed lookups over a report and the category set. Build once per
/// read; every accessor is then a single pass or a map lookup.
pub struct Computation<'a> {
    report: &'a BudgetReport,
    categories: &'a [Category],
    budgets_by_category: HashMap<&'a str, &'a CategoryBudget>,
    categories_by_id: HashMap<&'a str, &'a Category>,
}

impl<'a> Computation<'a> {
    pub fn new(report: &'a BudgetReport, categories: &'a [Category]) -> Self {
        let budgets_by_category = report
            .category_budgets
            .iter()
            .map(|budget| (budget.category.as_str(), budget))
            .collect();
        let categories_by_id = categories
            .iter()
            .map(|category| (category.id.as_str(), category))
            .collect();
        Self {
            report,
            categories,
            budgets_by_category,
            categories_by_id,
        }
    }

    /// Sum of budgets across expense categories.
    pub fn expected_spending(&self) -> Amount {
        self.budget_sum(CategoryType::Expense)
    }

    /// Sum of budgets across income categories.
    pub fn expected_earning(&self) -> Amount {
        self.budget_sum(CategoryType::Income)
    }

    /// What the month should net if the budget holds.
    pub fn goal(&self) -> Amount {
        Amount::from_minor(self.expected_earning().minor() - self.expected_spending().minor())
    }

    /// Sum of entries posted to expense categories.
    pub fn total_spent(&self) -> Amount {
        self.entry_sum(CategoryType::Expense)
    }

    /// Sum of entries posted to income categories.
    pub fn total_earned(&self) -> Amount {
        self.entry_sum(CategoryType::Income)
    }

    /// What the month actually nets so far.
    pub fn reality(&self) -> Amount {
        Amount::from_minor(self.total_earned().minor() - self.total_spent().minor())
    }

    /// Spending as a percentage of the expense budget; zero when nothing is
    /// budgeted. The only place integer amounts meet floating point.
    pub fn budget_usage(&self) -> f64 {
        let budgeted = self.expected_spending().minor();
        if budgeted == 0 {
            return 0.0;
        }
        (self.total_spent().minor() as f64 / budgeted as f64) * 100.0
    }

    pub fn remaining_to_spend(&self) -> Amount {
        Amount::from_minor(self.expected_spending().minor() - self.total_spent().minor())
    }

    /// The budgeted amount for one category; zero when none is set.
    pub fn category_budget(&self, category_id: &str) -> Amount {
        self.budgets_by_category
            .get(category_id)
            .map(|budget| budget.amount)
            .unwrap_or_default()
    }

    /// Sum of entries posted to one category.
    pub fn category_spending(&self, category_id: &str) -> Amount {
        let minor = self
            .report
            .entries
            .iter()
            .filter(|entry| entry.category == category_id)
            .map(|entry| entry.amount.minor())
            .sum();
        Amount::from_minor(minor)
    }

    /// Sum of budgets across one group's categories.
    pub fn group_budget(&self, group_id: &str) -> Amount {
        let minor = self
            .categories
            .iter()
            .filter(|category| category.group_id == group_id)
            .map(|category| self.category_budget(&category.id).minor())
            .sum();
        Amount::from_minor(minor)
    }

    /// Sum of entries posted to one group's categories.
    pub fn group_spending(&self, group_id: &str) -> Amount {
        let minor = self
            .report
            .entries
            .iter()
            .filter(|entry| {
                self.categories_by_id
                    .get(entry.category.as_str())
                    .is_some_and(|category| category.group_id == group_id)
            })
            .map(|entry| entry.amount.minor())
            .sum();
        Amount::from_minor(minor)
    }

    fn budget_sum(&self, category_type: CategoryType) -> Amount {
        let minor = self
            .categories
            .iter()
            .filter(|category| category.category_type == category_type)
            .map(|category| self.category_budget(&category.id).minor())
            .sum();
        Amount::from_minor(minor)
    }

    fn entry_sum(&self, category_type: CategoryType) -> Amount {
        let minor = self
            .report
            .entries
            .iter()
            .filter(|entry| {
                self.categories_by_id
                    .get(entry.category.as_str())
                    .is_some_and(|category| category.category_type == category_type)
            })
            .map(|entry| entry.amount.minor())
            .sum();
        Amount::from_minor(minor)
    }
}
