//! redb-based store for the dining entities
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `dining_tables` | table id | `DiningTable` | Table lock rows |
//! | `carts` | table id | `Cart` | One active cart per table |
//! | `cart_items` | item id | `CartItem` | Cart lines |
//! | `orders` | order id | `Order` | Orders |
//! | `order_items` | item id | `OrderItem` | Order lines |
//! | `payments` | payment id | `Payment` | Payments |
//! | `categories` | category id | `Category` | Menu categories |
//! | `menu_items` | prefixed id | `MenuItem` | Menu items |
//! | `addons` | addon id | `Addon` | Add-ons with conflict sets |
//! | `sequence_counter` | counter name | `u64` | Id allocation |
//!
//! # Transactions
//!
//! redb admits a single write transaction at a time. Every read-modify-write
//! in this crate reads through the write transaction it commits with, so a
//! concurrent request or sweeper tick can never interleave between the read
//! and the write. Writes are staged in a [`WriteBatch`] and applied to the
//! transaction in one step; nothing is visible until `commit()` returns.

use redb::{
    Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Counter table: key = counter name, value = last allocated value
const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// A persisted entity type
///
/// Each entity type lives in its own redb table, keyed by [`Entity::key`],
/// with the JSON encoding of the entity as value.
pub trait Entity: Serialize + DeserializeOwned {
    /// redb table name
    const TABLE: &'static str;

    /// Primary key within [`Entity::TABLE`]
    fn key(&self) -> String;
}

fn definition(name: &'static str) -> TableDefinition<'static, &'static str, &'static [u8]> {
    TableDefinition::new(name)
}

/// A single staged write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    Put {
        table: &'static str,
        key: String,
        value: Vec<u8>,
    },
    Delete {
        table: &'static str,
        key: String,
    },
}

impl Write {
    pub fn table(&self) -> &'static str {
        match self {
            Write::Put { table, .. } | Write::Delete { table, .. } => table,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Write::Put { key, .. } | Write::Delete { key, .. } => key,
        }
    }
}

/// Ordered set of writes committed all-or-nothing
///
/// Cascades (cart → items, order → items + payment) are spelled out as
/// explicit entries here rather than left to the store.
#[derive(Debug, Default, Clone)]
pub struct WriteBatch {
    writes: Vec<Write>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an insert-or-replace of `entity`
    pub fn put<E: Entity>(&mut self, entity: &E) -> StorageResult<()> {
        let value = serde_json::to_vec(entity)?;
        self.writes.push(Write::Put {
            table: E::TABLE,
            key: entity.key(),
            value,
        });
        Ok(())
    }

    /// Stage removal of the `E` stored under `key`
    pub fn delete<E: Entity>(&mut self, key: impl fmt::Display) {
        self.writes.push(Write::Delete {
            table: E::TABLE,
            key: key.to_string(),
        });
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    /// Number of staged deletes against `E`'s table
    pub fn deletes_of<E: Entity>(&self) -> usize {
        self.writes
            .iter()
            .filter(|w| matches!(w, Write::Delete { table, .. } if *table == E::TABLE))
            .count()
    }
}

/// Store backed by redb
#[derive(Clone)]
pub struct Storage {
    db: Arc<Database>,
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}

impl Storage {
    /// Open or create the database at the given path
    ///
    /// redb commits with `Durability::Immediate` by default: once `commit()`
    /// returns the write set is on disk, and a crash mid-commit leaves the
    /// previous consistent state.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::initialize(db)
    }

    /// Open an in-memory database (tests and throwaway runs)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::initialize(db)
    }

    fn initialize(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            for name in super::ALL_TABLES {
                let _ = write_txn.open_table(definition(*name))?;
            }
            let _ = write_txn.open_table(SEQUENCE_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction (blocks while another writer is active)
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Reads (snapshot) ==========

    /// Read one entity by key
    pub fn get<E: Entity>(&self, key: impl fmt::Display) -> StorageResult<Option<E>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(definition(E::TABLE))?;
        let key = key.to_string();
        let found = match table.get(key.as_str())? {
            Some(guard) => Some(serde_json::from_slice(guard.value())?),
            None => None,
        };
        Ok(found)
    }

    /// Read every entity matching `predicate`
    pub fn query<E: Entity>(&self, predicate: impl Fn(&E) -> bool) -> StorageResult<Vec<E>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(definition(E::TABLE))?;
        let mut out = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let entity: E = serde_json::from_slice(value.value())?;
            if predicate(&entity) {
                out.push(entity);
            }
        }
        Ok(out)
    }

    // ========== Reads (within a write transaction) ==========

    /// Read one entity by key through `txn`
    pub fn get_txn<E: Entity>(
        &self,
        txn: &WriteTransaction,
        key: impl fmt::Display,
    ) -> StorageResult<Option<E>> {
        let table = txn.open_table(definition(E::TABLE))?;
        let key = key.to_string();
        let found = match table.get(key.as_str())? {
            Some(guard) => Some(serde_json::from_slice(guard.value())?),
            None => None,
        };
        Ok(found)
    }

    /// Read every entity matching `predicate` through `txn`
    pub fn query_txn<E: Entity>(
        &self,
        txn: &WriteTransaction,
        predicate: impl Fn(&E) -> bool,
    ) -> StorageResult<Vec<E>> {
        let table = txn.open_table(definition(E::TABLE))?;
        let mut out = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let entity: E = serde_json::from_slice(value.value())?;
            if predicate(&entity) {
                out.push(entity);
            }
        }
        Ok(out)
    }

    // ========== Writes ==========

    /// Apply a batch to `txn` (not committed yet)
    pub fn apply(&self, txn: &WriteTransaction, batch: &WriteBatch) -> StorageResult<()> {
        for write in batch.writes() {
            let mut table = txn.open_table(definition(write.table()))?;
            match write {
                Write::Put { key, value, .. } => {
                    table.insert(key.as_str(), value.as_slice())?;
                }
                Write::Delete { key, .. } => {
                    table.remove(key.as_str())?;
                }
            }
        }
        Ok(())
    }

    /// Apply and commit a stand-alone batch
    pub fn commit(&self, batch: &WriteBatch) -> StorageResult<()> {
        let txn = self.begin_write()?;
        self.apply(&txn, batch)?;
        txn.commit()?;
        Ok(())
    }

    // ========== Sequence Operations ==========

    /// Increment and return the named counter (starts at 1)
    pub fn next_id(&self, txn: &WriteTransaction, counter: &str) -> StorageResult<i64> {
        let next = self.peek_counter_txn(txn, counter)? + 1;
        self.set_counter(txn, counter, next)?;
        Ok(next as i64)
    }

    /// Current value of the named counter (0 if never used)
    pub fn peek_counter_txn(&self, txn: &WriteTransaction, counter: &str) -> StorageResult<u64> {
        let table = txn.open_table(SEQUENCE_TABLE)?;
        let current = table
            .get(counter)?
            .map(|guard| guard.value())
            .unwrap_or(0);
        Ok(current)
    }

    /// Current value of the named counter, read-only
    pub fn peek_counter(&self, counter: &str) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SEQUENCE_TABLE)?;
        Ok(table
            .get(counter)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    /// Overwrite the named counter (within transaction)
    pub fn set_counter(&self, txn: &WriteTransaction, counter: &str, value: u64) -> StorageResult<()> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        table.insert(counter, value)?;
        Ok(())
    }
}
