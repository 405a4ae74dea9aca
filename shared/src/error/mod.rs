//! Error code taxonomy
//!
//! Numeric codes shared between `dining-core` and whatever outer layer
//! (HTTP, desktop shell) renders them.
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 6xxx: Menu / add-on errors
//! - 7xxx: Table errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{ErrorCategory, ErrorCode};
//!
//! let code = ErrorCode::TableUnavailable;
//! assert_eq!(code.code(), 7002);
//! assert_eq!(code.category(), ErrorCategory::Table);
//! ```

mod category;
mod codes;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
