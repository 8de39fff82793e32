use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopledger_core::{CategoryId, DomainError, DomainResult, Entity, patch};

use crate::item::Item;

/// Grouping of items (e.g. "Boys' Uniform", "Books").
///
/// Names are unique; a category can only be deleted while it owns no items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> CategoryId {
        self.id
    }
}

fn validated_name(raw: &str) -> DomainResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::validation("Name is required"));
    }
    Ok(name.to_string())
}

/// Request to create a category.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewCategory {
    pub fn into_category(self, now: DateTime<Utc>) -> DomainResult<Category> {
        Ok(Category {
            id: CategoryId::new(),
            name: validated_name(&self.name)?,
            description: self.description,
            created_at: now,
        })
    }
}

/// Partial update of a category.
///
/// `description`: absent leaves it unchanged, explicit `null` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "patch::explicit")]
    pub description: Option<Option<String>>,
}

impl CategoryUpdate {
    pub fn apply_to(self, category: &mut Category) -> DomainResult<()> {
        if let Some(name) = self.name {
            category.name = validated_name(&name)?;
        }
        patch::apply(&mut category.description, self.description);
        Ok(())
    }
}

/// Category listing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    #[serde(flatten)]
    pub category: Category,
    pub item_count: u64,
}

/// Category with its items ordered by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: Category,
    pub items: Vec<Item>,
}

/// Guard for category deletion.
pub fn ensure_deletable(item_count: u64) -> DomainResult<()> {
    if item_count > 0 {
        return Err(DomainError::conflict(format!(
            "Cannot delete: {item_count} item(s) still belong to this category"
        )));
    }
    Ok(())
}
