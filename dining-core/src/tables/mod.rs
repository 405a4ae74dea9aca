//! 桌台占用管理
//!
//! - [`TableLockManager`] - acquire / release / access checks
//! - 超时回收见 [`crate::sweeper::TableSweep`]

mod manager;

pub use manager::TableLockManager;
pub(crate) use manager::{load_table, require_owner};
