//! Table ownership keyed by session token
//!
//! A table row is the unit of mutual exclusion: every check-then-write runs
//! inside one redb write transaction, so two sessions can never both see the
//! table as free and both take it.

use std::sync::Arc;

use redb::WriteTransaction;
use shared::models::DiningTable;

use crate::cart::stage_table_cart_removal;
use crate::core::{DiningError, DiningResult, EntityKind};
use crate::db::{Storage, WriteBatch, counters};
use crate::utils::Clock;

/// Load a table through `txn`
pub(crate) fn load_table(
    storage: &Storage,
    txn: &WriteTransaction,
    table_id: i64,
) -> DiningResult<DiningTable> {
    storage
        .get_txn::<DiningTable>(txn, table_id)?
        .ok_or_else(|| DiningError::not_found(EntityKind::Table, table_id))
}

/// Require that `session_token` currently holds the table
///
/// Occupied by someone else → `TableUnavailable`; free → `NotOwner`.
pub(crate) fn require_owner(
    storage: &Storage,
    txn: &WriteTransaction,
    table_id: i64,
    session_token: &str,
) -> DiningResult<DiningTable> {
    let table = load_table(storage, txn, table_id)?;
    if table.is_owned_by(session_token) {
        return Ok(table);
    }
    if table.is_occupied {
        Err(DiningError::TableUnavailable(table_id))
    } else {
        Err(DiningError::NotOwner(table_id))
    }
}

/// 桌台锁管理器
#[derive(Clone)]
pub struct TableLockManager {
    storage: Storage,
    clock: Arc<dyn Clock>,
}

impl TableLockManager {
    pub fn new(storage: Storage, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Create a free table with a unique `number`
    pub fn provision(&self, number: i32) -> DiningResult<DiningTable> {
        let txn = self.storage.begin_write()?;
        let taken = self
            .storage
            .query_txn::<DiningTable>(&txn, |t| t.number == number)?;
        if !taken.is_empty() {
            return Err(DiningError::TableNumberTaken(number));
        }

        let id = self.storage.next_id(&txn, counters::TABLE)?;
        let table = DiningTable::new(id, number);
        let mut batch = WriteBatch::new();
        batch.put(&table)?;
        self.storage.apply(&txn, &batch)?;
        txn.commit()?;

        tracing::info!(table_id = id, number, "Table provisioned");
        Ok(table)
    }

    pub fn get_table(&self, table_id: i64) -> DiningResult<DiningTable> {
        self.storage
            .get::<DiningTable>(table_id)?
            .ok_or_else(|| DiningError::not_found(EntityKind::Table, table_id))
    }

    /// All tables ordered by number
    pub fn list_tables(&self) -> DiningResult<Vec<DiningTable>> {
        let mut tables = self.storage.query::<DiningTable>(|_| true)?;
        tables.sort_by_key(|t| t.number);
        Ok(tables)
    }

    /// Take (or re-take) the table for `session_token`
    ///
    /// Re-acquiring a table the session already holds updates `pax` and
    /// refreshes `occupied_at`. Any cart left on a free table belongs to no
    /// live session and is removed in the same transaction.
    pub fn acquire(
        &self,
        table_id: i64,
        session_token: &str,
        pax: i32,
    ) -> DiningResult<DiningTable> {
        if pax < 1 {
            return Err(DiningError::validation(format!(
                "pax must be at least 1, got {}",
                pax
            )));
        }

        let txn = self.storage.begin_write()?;
        let mut table = load_table(&self.storage, &txn, table_id)?;
        if !table.is_accessible_by(session_token) {
            tracing::warn!(table_id, "Table acquire rejected, held by another session");
            return Err(DiningError::TableUnavailable(table_id));
        }

        let mut batch = WriteBatch::new();
        if !table.is_occupied {
            stage_table_cart_removal(&self.storage, &txn, table_id, &mut batch)?;
        }
        let reacquire = table.is_occupied;
        table.occupy(session_token, pax, self.clock.now_millis());
        batch.put(&table)?;
        self.storage.apply(&txn, &batch)?;
        txn.commit()?;

        if reacquire {
            tracing::debug!(table_id, pax, "Table re-acquired by owner");
        } else {
            tracing::info!(table_id, pax, "Table acquired");
        }
        Ok(table)
    }

    /// Give the table back; only the owner may do so
    ///
    /// The owner's cart and its items are deleted with the release.
    pub fn release(&self, table_id: i64, session_token: &str) -> DiningResult<()> {
        let txn = self.storage.begin_write()?;
        let mut table = load_table(&self.storage, &txn, table_id)?;
        if !table.is_owned_by(session_token) {
            tracing::warn!(table_id, "Table release rejected, caller is not the owner");
            return Err(DiningError::NotOwner(table_id));
        }

        let mut batch = WriteBatch::new();
        let removed = stage_table_cart_removal(&self.storage, &txn, table_id, &mut batch)?;
        table.vacate();
        batch.put(&table)?;
        self.storage.apply(&txn, &batch)?;
        txn.commit()?;

        tracing::info!(table_id, cart_items_removed = removed.unwrap_or(0), "Table released");
        Ok(())
    }

    /// Free, or held by `session_token`
    ///
    /// Informational only; operations that act on the answer re-check inside
    /// their own transaction. Never touches `occupied_at`.
    pub fn check_access(&self, table_id: i64, session_token: &str) -> DiningResult<bool> {
        Ok(self.get_table(table_id)?.is_accessible_by(session_token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ManualClock;

    fn manager() -> (TableLockManager, Arc<ManualClock>) {
        let storage = Storage::open_in_memory().unwrap();
        let clock = Arc::new(ManualClock::new(1_000_000));
        (TableLockManager::new(storage, clock.clone()), clock)
    }

    #[test]
    fn test_provision_rejects_duplicate_number() {
        let (tables, _) = manager();
        let t = tables.provision(5).unwrap();
        assert!(!t.is_occupied);
        assert!(matches!(
            tables.provision(5),
            Err(DiningError::TableNumberTaken(5))
        ));
        tables.provision(6).unwrap();
        let numbers: Vec<i32> = tables.list_tables().unwrap().iter().map(|t| t.number).collect();
        assert_eq!(numbers, vec![5, 6]);
    }

    #[test]
    fn test_acquire_then_other_session_is_rejected() {
        let (tables, _) = manager();
        let t = tables.provision(5).unwrap();

        let held = tables.acquire(t.id, "s1", 2).unwrap();
        assert!(held.is_occupied);
        assert_eq!(held.pax, 2);
        assert!(held.is_consistent());

        assert!(matches!(
            tables.acquire(t.id, "s2", 3),
            Err(DiningError::TableUnavailable(_))
        ));
        assert!(!tables.check_access(t.id, "s2").unwrap());
        assert!(tables.check_access(t.id, "s1").unwrap());
    }

    #[test]
    fn test_reacquire_updates_pax_and_refreshes_timestamp() {
        let (tables, clock) = manager();
        let t = tables.provision(1).unwrap();
        tables.acquire(t.id, "s1", 2).unwrap();

        clock.advance_minutes(10);
        let again = tables.acquire(t.id, "s1", 4).unwrap();
        assert_eq!(again.pax, 4);
        assert_eq!(again.occupied_at, Some(clock.now_millis()));
    }

    #[test]
    fn test_check_access_does_not_refresh_timestamp() {
        let (tables, clock) = manager();
        let t = tables.provision(1).unwrap();
        let held = tables.acquire(t.id, "s1", 2).unwrap();

        clock.advance_minutes(20);
        assert!(tables.check_access(t.id, "s1").unwrap());
        assert_eq!(tables.get_table(t.id).unwrap().occupied_at, held.occupied_at);
    }

    #[test]
    fn test_release_by_non_owner_leaves_state_unchanged() {
        let (tables, _) = manager();
        let t = tables.provision(1).unwrap();
        let held = tables.acquire(t.id, "s1", 2).unwrap();

        assert!(matches!(
            tables.release(t.id, "s2"),
            Err(DiningError::NotOwner(_))
        ));
        assert_eq!(tables.get_table(t.id).unwrap(), held);

        tables.release(t.id, "s1").unwrap();
        let free = tables.get_table(t.id).unwrap();
        assert!(!free.is_occupied);
        assert!(free.is_consistent());

        // releasing a free table is also a non-owner release
        assert!(matches!(
            tables.release(t.id, "s1"),
            Err(DiningError::NotOwner(_))
        ));
    }

    #[test]
    fn test_acquire_validates_input() {
        let (tables, _) = manager();
        let t = tables.provision(1).unwrap();
        assert!(matches!(
            tables.acquire(t.id, "s1", 0),
            Err(DiningError::Validation(_))
        ));
        assert!(matches!(
            tables.acquire(999, "s1", 2),
            Err(DiningError::NotFound(EntityKind::Table, _))
        ));
    }

    #[test]
    fn test_concurrent_acquire_has_single_winner() {
        let (tables, _) = manager();
        let t = tables.provision(1).unwrap();

        let winners = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let tables = tables.clone();
                    scope.spawn(move || tables.acquire(t.id, &format!("s{}", i), 2).is_ok())
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|ok| *ok)
                .count()
        });

        assert_eq!(winners, 1);
        assert!(tables.get_table(t.id).unwrap().is_consistent());
    }
}
