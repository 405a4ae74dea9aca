//! Category Model

use serde::{Deserialize, Serialize};

/// Menu category
///
/// `prefix` is unique and prepended to the ids of the category's menu items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub prefix: String,
    /// Unique among active categories
    pub display_order: i32,
    pub is_active: bool,
}

/// Create category payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryCreate {
    pub name: String,
    pub prefix: String,
    pub display_order: i32,
    pub is_active: Option<bool>,
}
