use shared::models::{Addon, Category, CategoryCreate, MenuItem, MenuItemCreate};

use super::addons::apply_delete_addon;
use super::ids::allocate_txn;
use crate::core::{DiningError, DiningResult, EntityKind};
use crate::db::{Storage, WriteBatch, counters};

/// Prefixes are uppercase ASCII letters only, so `M` never matches `MA001`
fn validate_prefix(prefix: &str) -> DiningResult<()> {
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(DiningError::validation(format!(
            "category prefix must be uppercase letters, got {:?}",
            prefix
        )));
    }
    Ok(())
}

/// 菜单目录 (分类 / 菜品)
#[derive(Clone)]
pub struct Catalog {
    storage: Storage,
}

impl Catalog {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    // ========== Categories ==========

    pub fn create_category(&self, data: CategoryCreate) -> DiningResult<Category> {
        let name = data.name.trim();
        if name.is_empty() {
            return Err(DiningError::validation("category name must not be empty"));
        }
        let prefix = data.prefix.trim();
        validate_prefix(prefix)?;
        let is_active = data.is_active.unwrap_or(true);

        let txn = self.storage.begin_write()?;
        let existing = self.storage.query_txn::<Category>(&txn, |_| true)?;
        if existing.iter().any(|c| c.prefix == prefix) {
            return Err(DiningError::PrefixTaken(prefix.to_string()));
        }
        if is_active
            && existing
                .iter()
                .any(|c| c.is_active && c.display_order == data.display_order)
        {
            return Err(DiningError::validation(format!(
                "display order {} already used by an active category",
                data.display_order
            )));
        }

        let category = Category {
            id: self.storage.next_id(&txn, counters::CATEGORY)?,
            name: name.to_string(),
            prefix: prefix.to_string(),
            display_order: data.display_order,
            is_active,
        };
        let mut batch = WriteBatch::new();
        batch.put(&category)?;
        self.storage.apply(&txn, &batch)?;
        txn.commit()?;

        tracing::info!(category_id = category.id, prefix = %category.prefix, "Category created");
        Ok(category)
    }

    /// Activate or deactivate; activation re-checks `display_order`
    pub fn set_category_active(&self, category_id: i64, active: bool) -> DiningResult<Category> {
        let txn = self.storage.begin_write()?;
        let mut category = self
            .storage
            .get_txn::<Category>(&txn, category_id)?
            .ok_or_else(|| DiningError::not_found(EntityKind::Category, category_id))?;
        if active && !category.is_active {
            let clash = self.storage.query_txn::<Category>(&txn, |c| {
                c.id != category_id && c.is_active && c.display_order == category.display_order
            })?;
            if !clash.is_empty() {
                return Err(DiningError::validation(format!(
                    "display order {} already used by an active category",
                    category.display_order
                )));
            }
        }
        category.is_active = active;
        let mut batch = WriteBatch::new();
        batch.put(&category)?;
        self.storage.apply(&txn, &batch)?;
        txn.commit()?;
        Ok(category)
    }

    pub fn get_category(&self, category_id: i64) -> DiningResult<Category> {
        self.storage
            .get::<Category>(category_id)?
            .ok_or_else(|| DiningError::not_found(EntityKind::Category, category_id))
    }

    /// Active categories by display order
    pub fn list_categories(&self) -> DiningResult<Vec<Category>> {
        let mut categories = self.storage.query::<Category>(|c| c.is_active)?;
        categories.sort_by_key(|c| (c.display_order, c.id));
        Ok(categories)
    }

    // ========== Menu items ==========

    /// Insert a menu item under the next id of its category's prefix
    pub fn create_menu_item(&self, data: MenuItemCreate) -> DiningResult<MenuItem> {
        let name = data.name.trim();
        if name.is_empty() {
            return Err(DiningError::validation("menu item name must not be empty"));
        }
        if data.price.is_sign_negative() {
            return Err(DiningError::validation("menu item price must not be negative"));
        }

        let txn = self.storage.begin_write()?;
        let (category, id) = allocate_txn(&self.storage, &txn, data.category_id)?;
        let item = MenuItem {
            id,
            name: name.to_string(),
            price: data.price,
            category_id: category.id,
            is_available: data.is_available.unwrap_or(true),
            image_path: data.image_path,
        };
        let mut batch = WriteBatch::new();
        batch.put(&item)?;
        self.storage.apply(&txn, &batch)?;
        txn.commit()?;

        tracing::info!(menu_item_id = %item.id, category_id = category.id, "Menu item created");
        Ok(item)
    }

    pub fn get_menu_item(&self, menu_item_id: &str) -> DiningResult<MenuItem> {
        self.storage
            .get::<MenuItem>(menu_item_id)?
            .ok_or_else(|| DiningError::not_found(EntityKind::MenuItem, menu_item_id))
    }

    pub fn menu_items_in_category(&self, category_id: i64) -> DiningResult<Vec<MenuItem>> {
        let mut items = self
            .storage
            .query::<MenuItem>(|m| m.category_id == category_id)?;
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    pub fn set_availability(&self, menu_item_id: &str, available: bool) -> DiningResult<MenuItem> {
        let txn = self.storage.begin_write()?;
        let mut item = self
            .storage
            .get_txn::<MenuItem>(&txn, menu_item_id)?
            .ok_or_else(|| DiningError::not_found(EntityKind::MenuItem, menu_item_id))?;
        item.is_available = available;
        let mut batch = WriteBatch::new();
        batch.put(&item)?;
        self.storage.apply(&txn, &batch)?;
        txn.commit()?;
        Ok(item)
    }

    /// Delete a menu item and its add-ons; returns the removed add-on count
    ///
    /// Add-ons go through the same path as `DeleteAddon`, so add-ons of other
    /// items drop their edges to them.
    pub fn delete_menu_item(&self, menu_item_id: &str) -> DiningResult<usize> {
        let txn = self.storage.begin_write()?;
        if self
            .storage
            .get_txn::<MenuItem>(&txn, menu_item_id)?
            .is_none()
        {
            return Err(DiningError::not_found(EntityKind::MenuItem, menu_item_id));
        }

        let addons = self
            .storage
            .query_txn::<Addon>(&txn, |a| a.menu_item_id == menu_item_id)?;
        for addon in &addons {
            apply_delete_addon(&self.storage, &txn, addon.id)?;
        }
        let mut batch = WriteBatch::new();
        batch.delete::<MenuItem>(menu_item_id);
        self.storage.apply(&txn, &batch)?;
        txn.commit()?;

        tracing::info!(menu_item_id, addons_removed = addons.len(), "Menu item deleted");
        Ok(addons.len())
    }
}
