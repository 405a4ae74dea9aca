//! Shared types for the dining workspace
//!
//! Entity models persisted by `dining-core`, the numeric error code
//! taxonomy exposed to outer layers, and small time utilities.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use error::{ErrorCategory, ErrorCode};
pub use serde::{Deserialize, Serialize};
