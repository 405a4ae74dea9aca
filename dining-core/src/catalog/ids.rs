//! Category-prefixed menu item ids (`M001`, `M002`, ...)
//!
//! The next number is `max(highest existing suffix, high-water mark) + 1`.
//! The high-water mark lives in the sequence table under
//! `menu_item:{prefix}` and is bumped in the same transaction as the insert,
//! so ids are never reused after deletion and two concurrent creations can
//! never receive the same id.

use redb::WriteTransaction;
use shared::models::{Category, MenuItem};

use crate::core::{DiningError, DiningResult, EntityKind};
use crate::db::{Storage, counters};

const PAD_WIDTH: usize = 3;

/// Numeric suffix of `id` under `prefix`, if `id` is `prefix` + digits
fn numeric_suffix(id: &str, prefix: &str) -> Option<u64> {
    let rest = id.strip_prefix(prefix)?;
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    rest.parse().ok()
}

fn format_id(prefix: &str, n: u64) -> String {
    format!("{}{:0width$}", prefix, n, width = PAD_WIDTH)
}

fn next_number(existing: &[MenuItem], prefix: &str, high_water: u64) -> u64 {
    existing
        .iter()
        .filter_map(|m| numeric_suffix(&m.id, prefix))
        .max()
        .unwrap_or(0)
        .max(high_water)
        + 1
}

/// Allocate the next id for `category_id` inside `txn`
///
/// The caller inserts the menu item through the same transaction.
pub(crate) fn allocate_txn(
    storage: &Storage,
    txn: &WriteTransaction,
    category_id: i64,
) -> DiningResult<(Category, String)> {
    let category = storage
        .get_txn::<Category>(txn, category_id)?
        .ok_or_else(|| DiningError::not_found(EntityKind::Category, category_id))?;
    let prefix = category.prefix.as_str();

    let existing = storage.query_txn::<MenuItem>(txn, |m| m.id.starts_with(prefix))?;
    let counter = counters::menu_item(prefix);
    let n = next_number(&existing, prefix, storage.peek_counter_txn(txn, &counter)?);
    storage.set_counter(txn, &counter, n)?;

    let id = format_id(prefix, n);
    Ok((category, id))
}

/// 菜品编号分配器
#[derive(Clone)]
pub struct IdentifierAllocator {
    storage: Storage,
}

impl IdentifierAllocator {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Reserve the next id for `category_id`
    ///
    /// The reservation commits immediately; the number is consumed even if
    /// no menu item is ever stored under it.
    pub fn next_id(&self, category_id: i64) -> DiningResult<String> {
        let txn = self.storage.begin_write()?;
        let (_, id) = allocate_txn(&self.storage, &txn, category_id)?;
        txn.commit()?;
        tracing::debug!(category_id, id = %id, "Menu item id reserved");
        Ok(id)
    }

    /// The id the next allocation would return, without consuming it
    pub fn peek(&self, category_id: i64) -> DiningResult<String> {
        let category = self
            .storage
            .get::<Category>(category_id)?
            .ok_or_else(|| DiningError::not_found(EntityKind::Category, category_id))?;
        let prefix = category.prefix.as_str();
        let existing = self
            .storage
            .query::<MenuItem>(|m| m.id.starts_with(prefix))?;
        let high_water = self.storage.peek_counter(&counters::menu_item(prefix))?;
        Ok(format_id(prefix, next_number(&existing, prefix, high_water)))
    }
}
