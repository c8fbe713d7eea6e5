use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::rules::condition::{validate_conditions, Condition};
use crate::sorting::types::SortDirection;

/// A named condition set that either orders the files it matches, labels them
/// with a category, or both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SortingRule {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: SortDirection,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl SortingRule {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            owner: None,
            conditions: Vec::new(),
            sort_by: None,
            sort_order: SortDirection::Asc,
            priority: 0,
            is_active: true,
            category: None,
            created_at: Some(Utc::now()),
        }
    }

    pub fn with_conditions(mut self, conditions: Vec<Condition>) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn sorted_by(mut self, field: impl Into<String>, order: SortDirection) -> Self {
        self.sort_by = Some(field.into());
        self.sort_order = order;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::Validation(
                "sorting rule id cannot be empty".to_owned(),
            ));
        }
        if self
            .sort_by
            .as_deref()
            .is_some_and(|field| field.trim().is_empty())
        {
            return Err(Error::Validation(format!(
                "sorting rule '{}' has an empty sort_by field",
                self.id
            )));
        }
        validate_conditions(&self.conditions, &format!("sorting rule '{}'", self.id))
    }
}
