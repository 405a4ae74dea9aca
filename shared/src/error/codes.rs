//! Unified error codes
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 6xxx: Menu / add-on errors
//! - 7xxx: Table errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Represented as u16 values for compact serialization and
/// cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order is not in a state that allows the operation
    OrderInvalidStatus = 4002,
    /// Cart (or order) has no items
    OrderEmpty = 4007,
    /// Cart not found for the table
    CartNotFound = 4101,
    /// Cart line not found
    CartItemNotFound = 4102,

    // ==================== 5xxx: Payment ====================
    /// Batch payment marking rejected (some order not awaiting payment)
    PaymentInvalidBatch = 5001,
    /// Card details rejected
    PaymentInvalidCard = 5003,

    // ==================== 6xxx: Menu ====================
    /// Menu item not found
    MenuItemNotFound = 6001,
    /// Menu item is not available
    MenuItemUnavailable = 6003,
    /// Category not found
    CategoryNotFound = 6101,
    /// Category prefix already in use
    CategoryPrefixExists = 6103,
    /// Add-on not found
    AddonNotFound = 6301,
    /// Two mutually exclusive add-ons selected together
    AddonConflict = 6302,
    /// A required add-on was not selected
    AddonRequired = 6303,

    // ==================== 7xxx: Table ====================
    /// Table not found
    TableNotFound = 7001,
    /// Table is occupied by another session
    TableUnavailable = 7002,
    /// Caller does not hold the table
    TableNotOwner = 7003,
    /// Table number already provisioned
    TableNumberExists = 7004,

    // ==================== 9xxx: System ====================
    /// Internal error
    InternalError = 9001,
    /// Persistence layer failure (transient)
    StoreError = 9002,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderInvalidStatus => "Order status does not allow this operation",
            ErrorCode::OrderEmpty => "Order has no items",
            ErrorCode::CartNotFound => "Cart not found",
            ErrorCode::CartItemNotFound => "Cart item not found",

            // Payment
            ErrorCode::PaymentInvalidBatch => "Not every order in the batch is awaiting payment",
            ErrorCode::PaymentInvalidCard => "Card details are invalid",

            // Menu
            ErrorCode::MenuItemNotFound => "Menu item not found",
            ErrorCode::MenuItemUnavailable => "Menu item is not available",
            ErrorCode::CategoryNotFound => "Category not found",
            ErrorCode::CategoryPrefixExists => "Category prefix already exists",
            ErrorCode::AddonNotFound => "Add-on not found",
            ErrorCode::AddonConflict => "Selected add-ons cannot be combined",
            ErrorCode::AddonRequired => "A required add-on is missing",

            // Table
            ErrorCode::TableNotFound => "Table not found",
            ErrorCode::TableUnavailable => "Table is occupied by another session",
            ErrorCode::TableNotOwner => "Table is not held by this session",
            ErrorCode::TableNumberExists => "Table number already exists",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::StoreError => "Storage temporarily unavailable",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderInvalidStatus),
            4007 => Ok(ErrorCode::OrderEmpty),
            4101 => Ok(ErrorCode::CartNotFound),
            4102 => Ok(ErrorCode::CartItemNotFound),

            // Payment
            5001 => Ok(ErrorCode::PaymentInvalidBatch),
            5003 => Ok(ErrorCode::PaymentInvalidCard),

            // Menu
            6001 => Ok(ErrorCode::MenuItemNotFound),
            6003 => Ok(ErrorCode::MenuItemUnavailable),
            6101 => Ok(ErrorCode::CategoryNotFound),
            6103 => Ok(ErrorCode::CategoryPrefixExists),
            6301 => Ok(ErrorCode::AddonNotFound),
            6302 => Ok(ErrorCode::AddonConflict),
            6303 => Ok(ErrorCode::AddonRequired),

            // Table
            7001 => Ok(ErrorCode::TableNotFound),
            7002 => Ok(ErrorCode::TableUnavailable),
            7003 => Ok(ErrorCode::TableNotOwner),
            7004 => Ok(ErrorCode::TableNumberExists),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::StoreError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::NotFound.code(), 3);
        assert_eq!(ErrorCode::OrderNotFound.code(), 4001);
        assert_eq!(ErrorCode::PaymentInvalidBatch.code(), 5001);
        assert_eq!(ErrorCode::AddonConflict.code(), 6302);
        assert_eq!(ErrorCode::TableUnavailable.code(), 7002);
        assert_eq!(ErrorCode::TableNotOwner.code(), 7003);
        assert_eq!(ErrorCode::StoreError.code(), 9002);
    }

    #[test]
    fn test_try_from_valid() {
        assert_eq!(ErrorCode::try_from(7002), Ok(ErrorCode::TableUnavailable));
        assert_eq!(ErrorCode::try_from(6302), Ok(ErrorCode::AddonConflict));
        assert_eq!(ErrorCode::try_from(0), Ok(ErrorCode::Success));
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(999), Err(InvalidErrorCode(999)));
        assert_eq!(ErrorCode::try_from(1234), Err(InvalidErrorCode(1234)));
    }

    #[test]
    fn test_every_code_survives_u16_conversion() {
        let codes = [
            ErrorCode::Success,
            ErrorCode::ValidationFailed,
            ErrorCode::NotFound,
            ErrorCode::AlreadyExists,
            ErrorCode::OrderNotFound,
            ErrorCode::OrderInvalidStatus,
            ErrorCode::OrderEmpty,
            ErrorCode::CartNotFound,
            ErrorCode::CartItemNotFound,
            ErrorCode::PaymentInvalidBatch,
            ErrorCode::PaymentInvalidCard,
            ErrorCode::MenuItemNotFound,
            ErrorCode::MenuItemUnavailable,
            ErrorCode::CategoryNotFound,
            ErrorCode::CategoryPrefixExists,
            ErrorCode::AddonNotFound,
            ErrorCode::AddonConflict,
            ErrorCode::AddonRequired,
            ErrorCode::TableNotFound,
            ErrorCode::TableUnavailable,
            ErrorCode::TableNotOwner,
            ErrorCode::TableNumberExists,
            ErrorCode::InternalError,
            ErrorCode::StoreError,
        ];

        for code in codes {
            assert_eq!(ErrorCode::try_from(u16::from(code)), Ok(code));
        }
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&ErrorCode::TableUnavailable).unwrap();
        assert_eq!(json, "7002");

        let parsed: ErrorCode = serde_json::from_str("6302").unwrap();
        assert_eq!(parsed, ErrorCode::AddonConflict);

        assert!(serde_json::from_str::<ErrorCode>("1234").is_err());
    }

    #[test]
    fn test_display_and_message() {
        assert_eq!(format!("{}", ErrorCode::OrderNotFound), "4001");
        assert_eq!(ErrorCode::TableNotFound.message(), "Table not found");
        assert_eq!(
            format!("{}", InvalidErrorCode(999)),
            "invalid error code: 999"
        );
    }
}
