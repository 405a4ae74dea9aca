//! Add-on conflict graph
//!
//! `Addon::conflicting_addons` is kept symmetric: every edge is written on
//! both ends inside the same write transaction. The `apply_*` helpers write
//! straight into the caller's transaction (uncommitted), so several of them
//! can be chained and later steps read what earlier steps wrote.

use std::collections::BTreeSet;

use redb::WriteTransaction;
use shared::models::{Addon, AddonCreate, MenuItem};

use crate::core::{DiningError, DiningResult, EntityKind};
use crate::db::{Storage, WriteBatch, counters};

fn load_addon(storage: &Storage, txn: &WriteTransaction, addon_id: i64) -> DiningResult<Addon> {
    storage
        .get_txn::<Addon>(txn, addon_id)?
        .ok_or_else(|| DiningError::not_found(EntityKind::Addon, addon_id))
}

/// Replace `addon_id`'s conflict set, updating both ends of every edge
///
/// 1. ids dropped from the set lose `addon_id` from their own set
/// 2. ids in the new set gain `addon_id` if absent
/// 3. the add-on itself stores the new set
pub(crate) fn apply_set_conflicts(
    storage: &Storage,
    txn: &WriteTransaction,
    addon_id: i64,
    conflict_ids: BTreeSet<i64>,
) -> DiningResult<Addon> {
    let mut addon = load_addon(storage, txn, addon_id)?;
    if conflict_ids.contains(&addon_id) {
        return Err(DiningError::validation(format!(
            "add-on {} cannot conflict with itself",
            addon_id
        )));
    }

    let mut batch = WriteBatch::new();

    for other_id in addon.conflicting_addons.difference(&conflict_ids) {
        // dangling ids are tolerated on removal
        if let Some(mut other) = storage.get_txn::<Addon>(txn, other_id)? {
            if other.conflicting_addons.remove(&addon_id) {
                batch.put(&other)?;
            }
        }
    }

    for other_id in &conflict_ids {
        let mut other = load_addon(storage, txn, *other_id)?;
        if other.conflicting_addons.insert(addon_id) {
            batch.put(&other)?;
        }
    }

    addon.conflicting_addons = conflict_ids;
    batch.put(&addon)?;
    storage.apply(txn, &batch)?;
    Ok(addon)
}

/// `SetConflicts(addon, ∅)` then remove the record
pub(crate) fn apply_delete_addon(
    storage: &Storage,
    txn: &WriteTransaction,
    addon_id: i64,
) -> DiningResult<Addon> {
    let addon = apply_set_conflicts(storage, txn, addon_id, BTreeSet::new())?;
    let mut batch = WriteBatch::new();
    batch.delete::<Addon>(addon_id);
    storage.apply(txn, &batch)?;
    Ok(addon)
}

/// 加料互斥关系
#[derive(Clone)]
pub struct AddonConflictGraph {
    storage: Storage,
}

impl AddonConflictGraph {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Create an add-on; initial conflicts are written on both ends
    pub fn create_addon(&self, data: AddonCreate) -> DiningResult<Addon> {
        let name = data.name.trim();
        if name.is_empty() {
            return Err(DiningError::validation("add-on name must not be empty"));
        }
        if data.price.is_sign_negative() {
            return Err(DiningError::validation("add-on price must not be negative"));
        }

        let txn = self.storage.begin_write()?;
        if self
            .storage
            .get_txn::<MenuItem>(&txn, &data.menu_item_id)?
            .is_none()
        {
            return Err(DiningError::not_found(EntityKind::MenuItem, &data.menu_item_id));
        }

        let addon = Addon {
            id: self.storage.next_id(&txn, counters::ADDON)?,
            menu_item_id: data.menu_item_id,
            name: name.to_string(),
            price: data.price,
            is_required: data.is_required.unwrap_or(false),
            addon_type: data.addon_type.unwrap_or_else(|| "default".to_string()),
            conflicting_addons: BTreeSet::new(),
        };
        let mut batch = WriteBatch::new();
        batch.put(&addon)?;
        self.storage.apply(&txn, &batch)?;
        let addon = apply_set_conflicts(&self.storage, &txn, addon.id, data.conflicting_addons)?;
        txn.commit()?;

        tracing::info!(addon_id = addon.id, menu_item_id = %addon.menu_item_id, "Add-on created");
        Ok(addon)
    }

    /// Replace an add-on's conflict set (all-or-nothing)
    pub fn set_conflicts(
        &self,
        addon_id: i64,
        conflict_ids: impl IntoIterator<Item = i64>,
    ) -> DiningResult<Addon> {
        let conflict_ids: BTreeSet<i64> = conflict_ids.into_iter().collect();
        let txn = self.storage.begin_write()?;
        let addon = apply_set_conflicts(&self.storage, &txn, addon_id, conflict_ids)?;
        txn.commit()?;

        tracing::info!(
            addon_id,
            conflicts = ?addon.conflicting_addons,
            "Add-on conflicts updated"
        );
        Ok(addon)
    }

    pub fn delete_addon(&self, addon_id: i64) -> DiningResult<()> {
        let txn = self.storage.begin_write()?;
        let addon = apply_delete_addon(&self.storage, &txn, addon_id)?;
        txn.commit()?;

        tracing::info!(addon_id, menu_item_id = %addon.menu_item_id, "Add-on deleted");
        Ok(())
    }

    /// Whether `a` and `b` may not be selected together
    pub fn conflicts_with(&self, a: i64, b: i64) -> DiningResult<bool> {
        let addon_a = self.get_addon(a)?;
        let addon_b = self.get_addon(b)?;
        Ok(addon_a.conflicting_addons.contains(&b) || addon_b.conflicting_addons.contains(&a))
    }

    pub fn get_addon(&self, addon_id: i64) -> DiningResult<Addon> {
        self.storage
            .get::<Addon>(addon_id)?
            .ok_or_else(|| DiningError::not_found(EntityKind::Addon, addon_id))
    }

    pub fn addons_for_menu_item(&self, menu_item_id: &str) -> DiningResult<Vec<Addon>> {
        let mut addons = self
            .storage
            .query::<Addon>(|a| a.menu_item_id == menu_item_id)?;
        addons.sort_by_key(|a| a.id);
        Ok(addons)
    }

    /// Edges present on one end only (empty when the graph is consistent)
    pub fn asymmetric_pairs(&self) -> DiningResult<Vec<(i64, i64)>> {
        let addons = self.storage.query::<Addon>(|_| true)?;
        let mut pairs = Vec::new();
        for addon in &addons {
            for other_id in &addon.conflicting_addons {
                let mirrored = addons
                    .iter()
                    .find(|o| o.id == *other_id)
                    .is_some_and(|o| o.conflicting_addons.contains(&addon.id));
                if !mirrored {
                    pairs.push((addon.id, *other_id));
                }
            }
        }
        Ok(pairs)
    }
}
