//! Data models
//!
//! Persisted by `dining-core` as JSON values keyed by their string key.
//! Money is `rust_decimal::Decimal` throughout; timestamps are Unix millis.

pub mod addon;
pub mod cart;
pub mod category;
pub mod dining_table;
pub mod menu_item;
pub mod order;

// Re-exports
pub use addon::*;
pub use cart::*;
pub use category::*;
pub use dining_table::*;
pub use menu_item::*;
pub use order::*;
