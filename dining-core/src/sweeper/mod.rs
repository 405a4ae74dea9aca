//! 超时清扫
//!
//! Two independent sweeps share one scheduler:
//!
//! - [`CartSweep`] - carts older than the cart timeout, with their items
//! - [`TableSweep`] - tables held longer than the table timeout, unless an
//!   order of the table is still awaiting payment
//!
//! Each sweep run is a single write transaction and is a no-op when nothing
//! has expired, so repeated runs are idempotent.

mod cart_sweep;
mod scheduler;
mod table_sweep;

pub use cart_sweep::CartSweep;
pub use scheduler::Sweeper;
pub use table_sweep::TableSweep;

use crate::core::DiningResult;

/// What one sweep run removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub carts_deleted: usize,
    pub items_deleted: usize,
    pub tables_released: usize,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One kind of time-based reclamation
pub trait Sweep: Send + Sync {
    fn name(&self) -> &'static str;

    /// Reclaim everything expired as of `now_millis`
    fn sweep(&self, now_millis: i64) -> DiningResult<SweepReport>;
}
