//! Line validation and unit pricing
//!
//! Shared by the customer cart and the staff order path: both freeze
//! `menu price + Σ add-on price` into the line when it is added.

use redb::WriteTransaction;
use rust_decimal::Decimal;
use shared::models::{Addon, CartItemInput, MenuItem};

use crate::core::{DiningError, DiningResult, EntityKind};
use crate::db::Storage;

/// A validated, priced line ready to be stored
#[derive(Debug, Clone)]
pub(crate) struct PricedLine {
    pub menu_item: MenuItem,
    pub addons: Vec<Addon>,
    /// Sorted, deduplicated
    pub addon_ids: Vec<i64>,
    pub instructions: Option<String>,
    pub unit_price: Decimal,
}

/// Blank instructions are the same as none
pub(crate) fn normalize_instructions(instructions: Option<&str>) -> Option<String> {
    instructions
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Add-on names joined for display, e.g. `"Large, Extra cheese"`
pub fn addon_display(addons: &[Addon]) -> Option<String> {
    if addons.is_empty() {
        return None;
    }
    Some(
        addons
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    )
}

/// First conflicting pair among `addons`, checked in both directions
pub(crate) fn find_conflict(addons: &[Addon]) -> Option<(i64, i64)> {
    for (i, a) in addons.iter().enumerate() {
        for b in &addons[i + 1..] {
            if a.conflicting_addons.contains(&b.id) || b.conflicting_addons.contains(&a.id) {
                return Some((a.id, b.id));
            }
        }
    }
    None
}

/// Validate `input` against the catalog through `txn` and price it
///
/// Rejects: non-positive quantity, unknown or unavailable menu item, unknown
/// add-ons, add-ons of another menu item, conflicting add-ons, missing
/// required add-ons.
pub(crate) fn price_line(
    storage: &Storage,
    txn: &WriteTransaction,
    input: &CartItemInput,
) -> DiningResult<PricedLine> {
    if input.quantity < 1 {
        return Err(DiningError::validation(format!(
            "quantity must be at least 1, got {}",
            input.quantity
        )));
    }

    let menu_item = storage
        .get_txn::<MenuItem>(txn, &input.menu_item_id)?
        .ok_or_else(|| DiningError::not_found(EntityKind::MenuItem, &input.menu_item_id))?;
    if !menu_item.is_available {
        return Err(DiningError::MenuItemUnavailable(menu_item.id));
    }

    let mut addon_ids = input.addon_ids.clone();
    addon_ids.sort_unstable();
    addon_ids.dedup();

    let mut addons = Vec::with_capacity(addon_ids.len());
    for id in &addon_ids {
        let addon = storage
            .get_txn::<Addon>(txn, id)?
            .ok_or_else(|| DiningError::not_found(EntityKind::Addon, id))?;
        if addon.menu_item_id != menu_item.id {
            return Err(DiningError::validation(format!(
                "add-on {} does not belong to menu item {}",
                addon.id, menu_item.id
            )));
        }
        addons.push(addon);
    }

    if let Some((addon, conflicts_with)) = find_conflict(&addons) {
        return Err(DiningError::ConflictViolation {
            addon,
            conflicts_with,
        });
    }

    let required = storage.query_txn::<Addon>(txn, |a| {
        a.menu_item_id == menu_item.id && a.is_required
    })?;
    if let Some(missing) = required.iter().find(|a| !addon_ids.contains(&a.id)) {
        return Err(DiningError::RequiredAddonMissing(missing.id));
    }

    let unit_price = menu_item.price + addons.iter().map(|a| a.price).sum::<Decimal>();

    Ok(PricedLine {
        menu_item,
        addons,
        addon_ids,
        instructions: normalize_instructions(input.instructions.as_deref()),
        unit_price,
    })
}
