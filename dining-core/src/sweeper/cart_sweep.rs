use shared::models::Cart;

use super::{Sweep, SweepReport};
use crate::cart::stage_cart_removal;
use crate::core::DiningResult;
use crate::db::{Storage, WriteBatch};

/// 购物车超时清扫
///
/// Deletes carts whose `created_at` is older than the timeout, regardless of
/// the table's occupancy.
#[derive(Clone)]
pub struct CartSweep {
    storage: Storage,
    timeout_millis: i64,
}

impl CartSweep {
    pub fn new(storage: Storage, timeout_millis: i64) -> Self {
        Self {
            storage,
            timeout_millis,
        }
    }
}

impl Sweep for CartSweep {
    fn name(&self) -> &'static str {
        "cart_sweep"
    }

    fn sweep(&self, now_millis: i64) -> DiningResult<SweepReport> {
        let cutoff = now_millis - self.timeout_millis;
        let txn = self.storage.begin_write()?;
        let expired = self
            .storage
            .query_txn::<Cart>(&txn, |c| c.created_at < cutoff)?;
        if expired.is_empty() {
            return Ok(SweepReport::default());
        }

        let mut batch = WriteBatch::new();
        let mut report = SweepReport::default();
        for cart in &expired {
            report.items_deleted += stage_cart_removal(&self.storage, &txn, cart, &mut batch)?;
            report.carts_deleted += 1;
            tracing::debug!(cart_id = cart.id, table_id = cart.table_id, "Expired cart");
        }
        self.storage.apply(&txn, &batch)?;
        txn.commit()?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::CartItem;
    use shared::util::minutes_to_millis;

    const T: i64 = 10_000_000;

    fn seed(storage: &Storage) {
        let mut batch = WriteBatch::new();
        batch
            .put(&Cart {
                id: 1,
                table_id: 5,
                session_token: "s1".into(),
                created_at: T,
            })
            .unwrap();
        for id in 1..=2 {
            batch
                .put(&CartItem {
                    id,
                    cart_id: 1,
                    menu_item_id: "M001".into(),
                    quantity: 1,
                    unit_price: rust_decimal::Decimal::TEN,
                    addon_ids: Vec::new(),
                    instructions: None,
                })
                .unwrap();
        }
        storage.commit(&batch).unwrap();
    }

    #[test]
    fn test_cart_expires_after_timeout() {
        let storage = Storage::open_in_memory().unwrap();
        seed(&storage);
        let sweep = CartSweep::new(storage.clone(), minutes_to_millis(30));

        let report = sweep.sweep(T + minutes_to_millis(29)).unwrap();
        assert!(report.is_empty());
        assert!(storage.get::<Cart>(5).unwrap().is_some());

        let report = sweep.sweep(T + minutes_to_millis(31)).unwrap();
        assert_eq!(report.carts_deleted, 1);
        assert_eq!(report.items_deleted, 2);
        assert!(storage.get::<Cart>(5).unwrap().is_none());
        assert!(storage.query::<CartItem>(|_| true).unwrap().is_empty());

        // second run is a no-op
        assert!(sweep.sweep(T + minutes_to_millis(31)).unwrap().is_empty());
    }
}
