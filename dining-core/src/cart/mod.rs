//! 购物车
//!
//! One cart per occupied table, created on the first add and removed on
//! checkout, clear, release or timeout. Items are separate rows pointing at
//! their cart, so every removal stages the items and the cart explicitly.

mod engine;
pub(crate) mod pricing;

pub use engine::{CartEngine, CartLineView, CartView};

use redb::WriteTransaction;
use shared::models::{Cart, CartItem};

use crate::core::DiningResult;
use crate::db::{Storage, WriteBatch};

/// Items of `cart_id`, in insertion order
pub(crate) fn load_cart_items(
    storage: &Storage,
    txn: &WriteTransaction,
    cart_id: i64,
) -> DiningResult<Vec<CartItem>> {
    let mut items = storage.query_txn::<CartItem>(txn, |i| i.cart_id == cart_id)?;
    items.sort_by_key(|i| i.id);
    Ok(items)
}

/// Stage deletion of `cart` and all of its items, returns the item count
pub(crate) fn stage_cart_removal(
    storage: &Storage,
    txn: &WriteTransaction,
    cart: &Cart,
    batch: &mut WriteBatch,
) -> DiningResult<usize> {
    let items = load_cart_items(storage, txn, cart.id)?;
    for item in &items {
        batch.delete::<CartItem>(item.id);
    }
    batch.delete::<Cart>(cart.table_id);
    Ok(items.len())
}

/// Stage deletion of the table's cart, if it has one
pub(crate) fn stage_table_cart_removal(
    storage: &Storage,
    txn: &WriteTransaction,
    table_id: i64,
    batch: &mut WriteBatch,
) -> DiningResult<Option<usize>> {
    match storage.get_txn::<Cart>(txn, table_id)? {
        Some(cart) => Ok(Some(stage_cart_removal(storage, txn, &cart, batch)?)),
        None => Ok(None),
    }
}
