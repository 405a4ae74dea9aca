//! Persistence layer
//!
//! Binds the `shared` models to their redb tables and names the id counters.

pub mod storage;

pub use storage::{Entity, Storage, StorageError, StorageResult, Write, WriteBatch};

use shared::models::{
    Addon, Cart, CartItem, Category, DiningTable, MenuItem, Order, OrderItem, Payment,
};

/// Every entity table, created on open
pub(crate) const ALL_TABLES: &[&str] = &[
    DiningTable::TABLE,
    Cart::TABLE,
    CartItem::TABLE,
    Order::TABLE,
    OrderItem::TABLE,
    Payment::TABLE,
    Category::TABLE,
    MenuItem::TABLE,
    Addon::TABLE,
];

/// Counter names in the sequence table
pub mod counters {
    pub const TABLE: &str = "dining_table";
    pub const CART: &str = "cart";
    pub const CART_ITEM: &str = "cart_item";
    pub const ORDER: &str = "order";
    pub const ORDER_ITEM: &str = "order_item";
    pub const PAYMENT: &str = "payment";
    pub const CATEGORY: &str = "category";
    pub const ADDON: &str = "addon";

    /// High-water mark of menu item numbers under one prefix
    pub fn menu_item(prefix: &str) -> String {
        format!("menu_item:{}", prefix)
    }
}

impl Entity for DiningTable {
    const TABLE: &'static str = "dining_tables";
    fn key(&self) -> String {
        self.id.to_string()
    }
}

/// Keyed by table: one active cart per table
impl Entity for Cart {
    const TABLE: &'static str = "carts";
    fn key(&self) -> String {
        self.table_id.to_string()
    }
}

impl Entity for CartItem {
    const TABLE: &'static str = "cart_items";
    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Entity for Order {
    const TABLE: &'static str = "orders";
    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Entity for OrderItem {
    const TABLE: &'static str = "order_items";
    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Entity for Payment {
    const TABLE: &'static str = "payments";
    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Entity for Category {
    const TABLE: &'static str = "categories";
    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Entity for MenuItem {
    const TABLE: &'static str = "menu_items";
    fn key(&self) -> String {
        self.id.clone()
    }
}

impl Entity for Addon {
    const TABLE: &'static str = "addons";
    fn key(&self) -> String {
        self.id.to_string()
    }
}
