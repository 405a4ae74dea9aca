//! Add-on Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Menu item customization (加料)
///
/// `conflicting_addons` is symmetric across the whole catalog: if A lists B,
/// B lists A.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Addon {
    pub id: i64,
    pub menu_item_id: String,
    pub name: String,
    pub price: Decimal,
    pub is_required: bool,
    /// Free-form grouping label ("size", "topping", ...)
    #[serde(rename = "type")]
    pub addon_type: String,
    #[serde(default)]
    pub conflicting_addons: BTreeSet<i64>,
}

/// Create add-on payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddonCreate {
    pub menu_item_id: String,
    pub name: String,
    pub price: Decimal,
    pub is_required: Option<bool>,
    #[serde(rename = "type")]
    pub addon_type: Option<String>,
    #[serde(default)]
    pub conflicting_addons: BTreeSet<i64>,
}
