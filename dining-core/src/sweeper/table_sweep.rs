use std::collections::HashSet;

use shared::models::{DiningTable, Order, OrderStatus};

use super::{Sweep, SweepReport};
use crate::cart::stage_table_cart_removal;
use crate::core::DiningResult;
use crate::db::{Storage, WriteBatch};

/// 桌台占用超时回收
///
/// A table with an order in `PendingPayment` is never released, however old
/// its `occupied_at` is.
#[derive(Clone)]
pub struct TableSweep {
    storage: Storage,
    timeout_millis: i64,
}

impl TableSweep {
    pub fn new(storage: Storage, timeout_millis: i64) -> Self {
        Self {
            storage,
            timeout_millis,
        }
    }
}

impl Sweep for TableSweep {
    fn name(&self) -> &'static str {
        "table_sweep"
    }

    fn sweep(&self, now_millis: i64) -> DiningResult<SweepReport> {
        let cutoff = now_millis - self.timeout_millis;
        let txn = self.storage.begin_write()?;
        let abandoned = self.storage.query_txn::<DiningTable>(&txn, |t| {
            t.is_occupied && t.occupied_at.is_some_and(|at| at < cutoff)
        })?;
        if abandoned.is_empty() {
            return Ok(SweepReport::default());
        }

        let owing: HashSet<i64> = self
            .storage
            .query_txn::<Order>(&txn, |o| o.status == OrderStatus::PendingPayment)?
            .into_iter()
            .filter_map(|o| o.table_id)
            .collect();

        let mut batch = WriteBatch::new();
        let mut report = SweepReport::default();
        for mut table in abandoned {
            if owing.contains(&table.id) {
                tracing::debug!(table_id = table.id, "Abandoned table kept, payment outstanding");
                continue;
            }
            if let Some(items) = stage_table_cart_removal(&self.storage, &txn, table.id, &mut batch)? {
                report.carts_deleted += 1;
                report.items_deleted += items;
            }
            table.vacate();
            batch.put(&table)?;
            report.tables_released += 1;
            tracing::debug!(table_id = table.id, number = table.number, "Abandoned table released");
        }
        if batch.is_empty() {
            return Ok(report);
        }
        self.storage.apply(&txn, &batch)?;
        txn.commit()?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::TableLockManager;
    use crate::utils::{Clock, ManualClock};
    use rust_decimal::Decimal;
    use shared::models::Cart;
    use shared::util::minutes_to_millis;
    use std::sync::Arc;

    #[test]
    fn test_releases_only_expired_tables() {
        let storage = Storage::open_in_memory().unwrap();
        let clock = Arc::new(ManualClock::new(1_000_000));
        let tables = TableLockManager::new(storage.clone(), clock.clone());
        let old = tables.provision(1).unwrap();
        let fresh = tables.provision(2).unwrap();

        tables.acquire(old.id, "s1", 2).unwrap();
        let mut batch = WriteBatch::new();
        batch
            .put(&Cart {
                id: 1,
                table_id: old.id,
                session_token: "s1".into(),
                created_at: 1_000_000,
            })
            .unwrap();
        storage.commit(&batch).unwrap();

        clock.advance_minutes(20);
        tables.acquire(fresh.id, "s2", 2).unwrap();
        clock.advance_minutes(15);

        let sweep = TableSweep::new(storage.clone(), minutes_to_millis(30));
        let report = sweep.sweep(clock.now_millis()).unwrap();
        assert_eq!(report.tables_released, 1);
        assert_eq!(report.carts_deleted, 1);

        let released = tables.get_table(old.id).unwrap();
        assert!(!released.is_occupied);
        assert_eq!(released.pax, 0);
        assert!(released.is_consistent());
        assert!(storage.get::<Cart>(old.id).unwrap().is_none());
        assert!(tables.get_table(fresh.id).unwrap().is_owned_by("s2"));

        assert!(sweep.sweep(clock.now_millis()).unwrap().is_empty());
    }

    #[test]
    fn test_pending_payment_table_is_kept() {
        let storage = Storage::open_in_memory().unwrap();
        let clock = Arc::new(ManualClock::new(1_000_000));
        let tables = TableLockManager::new(storage.clone(), clock.clone());
        let t = tables.provision(4).unwrap();
        tables.acquire(t.id, "s1", 2).unwrap();

        let mut batch = WriteBatch::new();
        batch
            .put(&Order {
                id: 1,
                table_id: Some(t.id),
                user_id: None,
                status: OrderStatus::PendingPayment,
                total_amount: Decimal::TEN,
                order_date: 1_000_000,
            })
            .unwrap();
        storage.commit(&batch).unwrap();

        clock.advance_minutes(600);
        let sweep = TableSweep::new(storage, minutes_to_millis(30));
        assert!(sweep.sweep(clock.now_millis()).unwrap().is_empty());
        assert!(tables.get_table(t.id).unwrap().is_owned_by("s1"));
    }
}
