use std::sync::Arc;

use redb::WriteTransaction;
use serde::Serialize;
use shared::models::{Addon, Cart, CartItem, CartItemInput, DiningTable};

use super::pricing::{addon_display, price_line};
use super::{load_cart_items, stage_cart_removal};
use crate::core::{DiningError, DiningResult, EntityKind};
use crate::db::{Storage, WriteBatch, counters};
use crate::money::Totals;
use crate::tables::require_owner;
use crate::utils::Clock;

/// One cart line as shown to the customer
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub item: CartItem,
    pub menu_item_name: String,
    /// Chosen add-on names, rebuilt from `item.addon_ids`
    pub addons: Option<String>,
    /// Rounded line subtotal
    pub subtotal: rust_decimal::Decimal,
}

/// Cart contents with presentation-rounded totals
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub cart: Option<Cart>,
    pub lines: Vec<CartLineView>,
    pub totals: Totals,
}

/// 购物车引擎
#[derive(Clone)]
pub struct CartEngine {
    storage: Storage,
    clock: Arc<dyn Clock>,
}

impl CartEngine {
    pub fn new(storage: Storage, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Load the caller's cart, creating it when absent
    ///
    /// A cart left behind by another session is discarded first.
    fn cart_for_write(
        &self,
        txn: &WriteTransaction,
        table_id: i64,
        session_token: &str,
        batch: &mut WriteBatch,
    ) -> DiningResult<(Cart, bool)> {
        if let Some(cart) = self.storage.get_txn::<Cart>(txn, table_id)? {
            if cart.session_token == session_token {
                return Ok((cart, false));
            }
            let dropped = stage_cart_removal(&self.storage, txn, &cart, batch)?;
            tracing::warn!(table_id, cart_id = cart.id, items = dropped, "Discarding stale cart");
        }
        let cart = Cart {
            id: self.storage.next_id(txn, counters::CART)?,
            table_id,
            session_token: session_token.to_string(),
            created_at: self.clock.now_millis(),
        };
        Ok((cart, true))
    }

    /// Existing cart owned by the caller
    fn owned_cart(
        &self,
        txn: &WriteTransaction,
        table_id: i64,
        session_token: &str,
    ) -> DiningResult<Cart> {
        self.storage
            .get_txn::<Cart>(txn, table_id)?
            .filter(|c| c.session_token == session_token)
            .ok_or_else(|| DiningError::not_found(EntityKind::Cart, table_id))
    }

    /// Add a line, merging into an existing line with the same menu item,
    /// add-ons and instructions
    pub fn add_item(
        &self,
        table_id: i64,
        session_token: &str,
        input: CartItemInput,
    ) -> DiningResult<CartItem> {
        let txn = self.storage.begin_write()?;
        require_owner(&self.storage, &txn, table_id, session_token)?;
        let line = price_line(&self.storage, &txn, &input)?;

        let mut batch = WriteBatch::new();
        let (cart, created) = self.cart_for_write(&txn, table_id, session_token, &mut batch)?;
        if created {
            batch.put(&cart)?;
        }

        let existing = if created {
            None
        } else {
            load_cart_items(&self.storage, &txn, cart.id)?
                .into_iter()
                .find(|i| {
                    i.same_signature(
                        &line.menu_item.id,
                        &line.addon_ids,
                        line.instructions.as_deref(),
                    )
                })
        };

        let item = match existing {
            Some(mut item) => {
                item.quantity = item.quantity.checked_add(input.quantity).ok_or_else(|| {
                    DiningError::validation(format!("quantity of cart line {} too large", item.id))
                })?;
                item
            }
            None => CartItem {
                id: self.storage.next_id(&txn, counters::CART_ITEM)?,
                cart_id: cart.id,
                menu_item_id: line.menu_item.id.clone(),
                quantity: input.quantity,
                unit_price: line.unit_price,
                addon_ids: line.addon_ids.clone(),
                instructions: line.instructions.clone(),
            },
        };
        batch.put(&item)?;
        self.storage.apply(&txn, &batch)?;
        txn.commit()?;

        tracing::debug!(
            table_id,
            cart_id = cart.id,
            item_id = item.id,
            menu_item_id = %item.menu_item_id,
            quantity = item.quantity,
            "Cart line added"
        );
        Ok(item)
    }

    /// Set a line's quantity; `quantity <= 0` deletes the line
    ///
    /// Returns the updated line, or `None` when it was removed.
    pub fn update_item(
        &self,
        table_id: i64,
        session_token: &str,
        item_id: i64,
        quantity: i32,
    ) -> DiningResult<Option<CartItem>> {
        let txn = self.storage.begin_write()?;
        require_owner(&self.storage, &txn, table_id, session_token)?;
        let cart = self.owned_cart(&txn, table_id, session_token)?;
        let mut item = self
            .storage
            .get_txn::<CartItem>(&txn, item_id)?
            .filter(|i| i.cart_id == cart.id)
            .ok_or_else(|| DiningError::not_found(EntityKind::CartItem, item_id))?;

        let mut batch = WriteBatch::new();
        let result = if quantity <= 0 {
            batch.delete::<CartItem>(item_id);
            None
        } else {
            item.quantity = quantity;
            batch.put(&item)?;
            Some(item)
        };
        self.storage.apply(&txn, &batch)?;
        txn.commit()?;

        tracing::debug!(table_id, item_id, quantity, "Cart line updated");
        Ok(result)
    }

    pub fn remove_item(&self, table_id: i64, session_token: &str, item_id: i64) -> DiningResult<()> {
        self.update_item(table_id, session_token, item_id, 0)
            .map(|_| ())
    }

    /// Delete the caller's cart and its items, returns the removed item count
    pub fn clear(&self, table_id: i64, session_token: &str) -> DiningResult<usize> {
        let txn = self.storage.begin_write()?;
        require_owner(&self.storage, &txn, table_id, session_token)?;
        let Some(cart) = self.storage.get_txn::<Cart>(&txn, table_id)? else {
            return Ok(0);
        };

        let mut batch = WriteBatch::new();
        let removed = stage_cart_removal(&self.storage, &txn, &cart, &mut batch)?;
        self.storage.apply(&txn, &batch)?;
        txn.commit()?;

        tracing::info!(table_id, cart_id = cart.id, removed, "Cart cleared");
        Ok(removed)
    }

    // ========== Reads ==========

    pub fn cart(&self, table_id: i64) -> DiningResult<Option<Cart>> {
        Ok(self.storage.get::<Cart>(table_id)?)
    }

    /// Lines of `cart_id` in insertion order
    pub fn items(&self, cart_id: i64) -> DiningResult<Vec<CartItem>> {
        let mut items = self.storage.query::<CartItem>(|i| i.cart_id == cart_id)?;
        items.sort_by_key(|i| i.id);
        Ok(items)
    }

    /// Exact (unrounded) totals of a cart
    pub fn totals(&self, cart_id: i64) -> DiningResult<Totals> {
        let exists = !self.storage.query::<Cart>(|c| c.id == cart_id)?.is_empty();
        if !exists {
            return Err(DiningError::not_found(EntityKind::Cart, cart_id));
        }
        Ok(Totals::from_lines(
            self.items(cart_id)?.iter().map(CartItem::subtotal),
        ))
    }

    /// The caller's cart ready for display
    ///
    /// Read-only: does not touch the table's `occupied_at`.
    pub fn view(&self, table_id: i64, session_token: &str) -> DiningResult<CartView> {
        let table = self
            .storage
            .get::<DiningTable>(table_id)?
            .ok_or_else(|| DiningError::not_found(EntityKind::Table, table_id))?;
        if !table.is_owned_by(session_token) {
            return Err(if table.is_occupied {
                DiningError::TableUnavailable(table_id)
            } else {
                DiningError::NotOwner(table_id)
            });
        }

        let cart = self
            .cart(table_id)?
            .filter(|c| c.session_token == session_token);
        let Some(cart) = cart else {
            return Ok(CartView {
                cart: None,
                lines: Vec::new(),
                totals: Totals::from_subtotal(rust_decimal::Decimal::ZERO),
            });
        };

        let items = self.items(cart.id)?;
        let totals = Totals::from_lines(items.iter().map(CartItem::subtotal)).rounded();
        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let menu_item_name = self
                .storage
                .get::<shared::models::MenuItem>(&item.menu_item_id)?
                .map(|m| m.name)
                .unwrap_or_else(|| item.menu_item_id.clone());
            let mut addons = Vec::with_capacity(item.addon_ids.len());
            for id in &item.addon_ids {
                if let Some(addon) = self.storage.get::<Addon>(id)? {
                    addons.push(addon);
                }
            }
            lines.push(CartLineView {
                subtotal: crate::money::round_money(item.subtotal()),
                menu_item_name,
                addons: addon_display(&addons),
                item,
            });
        }

        Ok(CartView {
            cart: Some(cart),
            lines,
            totals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::TableLockManager;
    use crate::utils::ManualClock;
    use rust_decimal::Decimal;
    use shared::models::{Category, MenuItem};
    use std::collections::BTreeSet;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    struct Fixture {
        storage: Storage,
        tables: TableLockManager,
        carts: CartEngine,
        table_id: i64,
    }

    fn fixture() -> Fixture {
        let storage = Storage::open_in_memory().unwrap();
        let clock = Arc::new(ManualClock::new(1_000_000));

        let mut batch = WriteBatch::new();
        batch
            .put(&Category {
                id: 1,
                name: "Mains".into(),
                prefix: "M".into(),
                display_order: 1,
                is_active: true,
            })
            .unwrap();
        for (id, price, available) in [("M001", "10.00", true), ("M002", "4.50", false)] {
            batch
                .put(&MenuItem {
                    id: id.into(),
                    name: format!("Dish {}", id),
                    price: d(price),
                    category_id: 1,
                    is_available: available,
                    image_path: None,
                })
                .unwrap();
        }
        for (id, name, price, conflicts) in [
            (1, "Small", "0.00", vec![2]),
            (2, "Large", "2.00", vec![1]),
            (3, "Cheese", "1.25", vec![]),
        ] {
            batch
                .put(&Addon {
                    id,
                    menu_item_id: "M001".into(),
                    name: name.into(),
                    price: d(price),
                    is_required: false,
                    addon_type: "size".into(),
                    conflicting_addons: conflicts.into_iter().collect::<BTreeSet<_>>(),
                })
                .unwrap();
        }
        storage.commit(&batch).unwrap();

        let tables = TableLockManager::new(storage.clone(), clock.clone());
        let carts = CartEngine::new(storage.clone(), clock);
        let table_id = tables.provision(5).unwrap().id;
        Fixture {
            storage,
            tables,
            carts,
            table_id,
        }
    }

    fn input(menu_item_id: &str, quantity: i32, addon_ids: &[i64]) -> CartItemInput {
        CartItemInput {
            menu_item_id: menu_item_id.into(),
            quantity,
            addon_ids: addon_ids.to_vec(),
            instructions: None,
        }
    }

    #[test]
    fn test_add_item_and_totals() {
        let f = fixture();
        f.tables.acquire(f.table_id, "s1", 2).unwrap();
        let item = f.carts.add_item(f.table_id, "s1", input("M001", 2, &[])).unwrap();
        assert_eq!(item.unit_price, d("10.00"));

        let totals = f.carts.totals(item.cart_id).unwrap().rounded();
        assert_eq!(totals.subtotal, d("20.00"));
        assert_eq!(totals.tax, d("1.20"));
        assert_eq!(totals.total, d("21.20"));
    }

    #[test]
    fn test_same_signature_merges() {
        let f = fixture();
        f.tables.acquire(f.table_id, "s1", 2).unwrap();
        let a = f.carts.add_item(f.table_id, "s1", input("M001", 1, &[3])).unwrap();
        let b = f.carts.add_item(f.table_id, "s1", input("M001", 2, &[3])).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(b.quantity, 3);
        assert_eq!(b.unit_price, d("11.25"));

        // different add-ons → new line
        let c = f.carts.add_item(f.table_id, "s1", input("M001", 1, &[2])).unwrap();
        assert_ne!(c.id, a.id);
        assert_eq!(f.carts.items(a.cart_id).unwrap().len(), 2);
    }

    #[test]
    fn test_merge_overflow_rejected() {
        let f = fixture();
        f.tables.acquire(f.table_id, "s1", 2).unwrap();
        let item = f
            .carts
            .add_item(f.table_id, "s1", input("M001", i32::MAX, &[]))
            .unwrap();

        assert!(matches!(
            f.carts.add_item(f.table_id, "s1", input("M001", 1, &[])),
            Err(DiningError::Validation(_))
        ));
        let items = f.carts.items(item.cart_id).unwrap();
        assert_eq!(items, vec![item]);
    }

    #[test]
    fn test_conflicting_addons_rejected() {
        let f = fixture();
        f.tables.acquire(f.table_id, "s1", 2).unwrap();
        let err = f
            .carts
            .add_item(f.table_id, "s1", input("M001", 1, &[1, 2]))
            .unwrap_err();
        assert!(matches!(err, DiningError::ConflictViolation { .. }));
        assert!(f.carts.cart(f.table_id).unwrap().is_none());
    }

    #[test]
    fn test_add_requires_ownership() {
        let f = fixture();
        assert!(matches!(
            f.carts.add_item(f.table_id, "s1", input("M001", 1, &[])),
            Err(DiningError::NotOwner(_))
        ));
        f.tables.acquire(f.table_id, "s1", 2).unwrap();
        assert!(matches!(
            f.carts.add_item(f.table_id, "s2", input("M001", 1, &[])),
            Err(DiningError::TableUnavailable(_))
        ));
    }

    #[test]
    fn test_rejects_bad_lines() {
        let f = fixture();
        f.tables.acquire(f.table_id, "s1", 2).unwrap();
        assert!(matches!(
            f.carts.add_item(f.table_id, "s1", input("M001", 0, &[])),
            Err(DiningError::Validation(_))
        ));
        assert!(matches!(
            f.carts.add_item(f.table_id, "s1", input("M999", 1, &[])),
            Err(DiningError::NotFound(EntityKind::MenuItem, _))
        ));
        assert!(matches!(
            f.carts.add_item(f.table_id, "s1", input("M002", 1, &[])),
            Err(DiningError::MenuItemUnavailable(_))
        ));
        assert!(matches!(
            f.carts.add_item(f.table_id, "s1", input("M001", 1, &[42])),
            Err(DiningError::NotFound(EntityKind::Addon, _))
        ));
    }

    #[test]
    fn test_required_addon_enforced() {
        let f = fixture();
        let mut addon = f.storage.get::<Addon>(1).unwrap().unwrap();
        addon.is_required = true;
        let mut batch = WriteBatch::new();
        batch.put(&addon).unwrap();
        f.storage.commit(&batch).unwrap();

        f.tables.acquire(f.table_id, "s1", 2).unwrap();
        assert!(matches!(
            f.carts.add_item(f.table_id, "s1", input("M001", 1, &[3])),
            Err(DiningError::RequiredAddonMissing(1))
        ));
        f.carts
            .add_item(f.table_id, "s1", input("M001", 1, &[1, 3]))
            .unwrap();
    }

    #[test]
    fn test_update_to_zero_removes_line() {
        let f = fixture();
        f.tables.acquire(f.table_id, "s1", 2).unwrap();
        let item = f.carts.add_item(f.table_id, "s1", input("M001", 2, &[])).unwrap();

        let updated = f.carts.update_item(f.table_id, "s1", item.id, 5).unwrap();
        assert_eq!(updated.map(|i| i.quantity), Some(5));

        assert!(f.carts.update_item(f.table_id, "s1", item.id, -1).unwrap().is_none());
        assert!(f.carts.items(item.cart_id).unwrap().is_empty());
        assert!(matches!(
            f.carts.remove_item(f.table_id, "s1", item.id),
            Err(DiningError::NotFound(EntityKind::CartItem, _))
        ));
    }

    #[test]
    fn test_view_rebuilds_addon_text() {
        let f = fixture();
        f.tables.acquire(f.table_id, "s1", 2).unwrap();
        f.carts
            .add_item(f.table_id, "s1", input("M001", 1, &[3, 2]))
            .unwrap();

        let view = f.carts.view(f.table_id, "s1").unwrap();
        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.lines[0].addons.as_deref(), Some("Large, Cheese"));
        assert_eq!(view.lines[0].menu_item_name, "Dish M001");
        assert_eq!(view.totals.subtotal, d("13.25"));
        assert_eq!(view.totals.tax, d("0.80"));
        assert_eq!(view.totals.total, d("14.05"));

        assert!(matches!(
            f.carts.view(f.table_id, "s2"),
            Err(DiningError::TableUnavailable(_))
        ));
    }

    #[test]
    fn test_clear_and_release_remove_cart() {
        let f = fixture();
        f.tables.acquire(f.table_id, "s1", 2).unwrap();
        let item = f.carts.add_item(f.table_id, "s1", input("M001", 1, &[])).unwrap();
        f.carts.add_item(f.table_id, "s1", input("M001", 1, &[3])).unwrap();
        assert_eq!(f.carts.clear(f.table_id, "s1").unwrap(), 2);
        assert!(f.carts.cart(f.table_id).unwrap().is_none());
        assert!(f.carts.items(item.cart_id).unwrap().is_empty());

        let item = f.carts.add_item(f.table_id, "s1", input("M001", 1, &[])).unwrap();
        f.tables.release(f.table_id, "s1").unwrap();
        assert!(f.carts.cart(f.table_id).unwrap().is_none());
        assert!(f.carts.items(item.cart_id).unwrap().is_empty());
    }
}
