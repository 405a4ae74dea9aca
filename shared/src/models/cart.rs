//! Cart Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-table cart (购物车), at most one per table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: i64,
    pub table_id: i64,
    /// Session that created the cart; must still own the table
    pub session_token: String,
    pub created_at: i64,
}

/// Cart line
///
/// `unit_price` is the menu price plus the selected add-ons' prices, frozen
/// when the line was added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: i64,
    pub cart_id: i64,
    pub menu_item_id: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    /// Chosen add-ons, sorted ascending
    #[serde(default)]
    pub addon_ids: Vec<i64>,
    pub instructions: Option<String>,
}

impl CartItem {
    /// Line subtotal
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    /// Same menu item, same add-ons, same instructions
    pub fn same_signature(
        &self,
        menu_item_id: &str,
        addon_ids: &[i64],
        instructions: Option<&str>,
    ) -> bool {
        self.menu_item_id == menu_item_id
            && self.addon_ids == addon_ids
            && self.instructions.as_deref() == instructions
    }
}

/// Add-to-cart payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItemInput {
    pub menu_item_id: String,
    pub quantity: i32,
    #[serde(default)]
    pub addon_ids: Vec<i64>,
    pub instructions: Option<String>,
}
