//! Menu Item Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Menu item entity
///
/// `id` is the owning category's prefix followed by a zero-padded
/// sequence number, e.g. `M001`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    pub category_id: i64,
    pub is_available: bool,
    pub image_path: Option<String>,
}

/// Create menu item payload (the id is allocated on insert)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItemCreate {
    pub name: String,
    pub price: Decimal,
    pub category_id: i64,
    pub is_available: Option<bool>,
    pub image_path: Option<String>,
}
