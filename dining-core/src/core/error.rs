use crate::db::StorageError;
use shared::error::ErrorCode;
use shared::models::OrderStatus;
use std::fmt;
use thiserror::Error;

/// Entity kinds referenced by [`DiningError::NotFound`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Table,
    Cart,
    CartItem,
    MenuItem,
    Addon,
    Order,
    OrderItem,
    Category,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Table => "Table",
            EntityKind::Cart => "Cart",
            EntityKind::CartItem => "Cart item",
            EntityKind::MenuItem => "Menu item",
            EntityKind::Addon => "Add-on",
            EntityKind::Order => "Order",
            EntityKind::OrderItem => "Order item",
            EntityKind::Category => "Category",
        };
        write!(f, "{}", name)
    }
}

/// Dining core errors
///
/// | 变体 | 处理方式 |
/// |------|----------|
/// | `TableUnavailable` | 可重试 (等待释放或超时回收) |
/// | `NotOwner` | 直接返回，不重试 |
/// | `NotFound` | 直接返回 |
/// | `ConflictViolation` | 直接返回，不重试 |
/// | `InvalidBatch` | 整批拒绝 |
/// | `Store` | 请求路径返回瞬时错误；清扫任务记录日志后继续 |
#[derive(Debug, Error)]
pub enum DiningError {
    #[error("Table {0} is occupied by another session")]
    TableUnavailable(i64),

    #[error("Session does not hold table {0}")]
    NotOwner(i64),

    #[error("{0} not found: {1}")]
    NotFound(EntityKind, String),

    #[error("Add-on {addon} cannot be combined with add-on {conflicts_with}")]
    ConflictViolation { addon: i64, conflicts_with: i64 },

    #[error("Invalid batch, orders not awaiting payment: {0:?}")]
    InvalidBatch(Vec<i64>),

    #[error("Order {order_id} is {status:?}, cannot {action}")]
    InvalidStatus {
        order_id: i64,
        status: OrderStatus,
        action: &'static str,
    },

    #[error("Nothing to check out for table {0}")]
    EmptyCart(i64),

    #[error("Required add-on {0} was not selected")]
    RequiredAddonMissing(i64),

    #[error("Menu item {0} is not available")]
    MenuItemUnavailable(String),

    #[error("Category prefix already in use: {0}")]
    PrefixTaken(String),

    #[error("Table number already provisioned: {0}")]
    TableNumberTaken(i32),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Store error: {0}")]
    Store(#[from] StorageError),
}

pub type DiningResult<T> = Result<T, DiningError>;

impl From<redb::CommitError> for DiningError {
    fn from(e: redb::CommitError) -> Self {
        DiningError::Store(e.into())
    }
}

impl From<redb::StorageError> for DiningError {
    fn from(e: redb::StorageError) -> Self {
        DiningError::Store(e.into())
    }
}

impl DiningError {
    pub(crate) fn not_found(kind: EntityKind, key: impl fmt::Display) -> Self {
        DiningError::NotFound(kind, key.to_string())
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        DiningError::Validation(msg.into())
    }

    /// Stable numeric code for outer layers
    pub fn code(&self) -> ErrorCode {
        match self {
            DiningError::TableUnavailable(_) => ErrorCode::TableUnavailable,
            DiningError::NotOwner(_) => ErrorCode::TableNotOwner,
            DiningError::NotFound(kind, _) => match kind {
                EntityKind::Table => ErrorCode::TableNotFound,
                EntityKind::Cart => ErrorCode::CartNotFound,
                EntityKind::CartItem => ErrorCode::CartItemNotFound,
                EntityKind::MenuItem => ErrorCode::MenuItemNotFound,
                EntityKind::Addon => ErrorCode::AddonNotFound,
                EntityKind::Order => ErrorCode::OrderNotFound,
                EntityKind::OrderItem => ErrorCode::NotFound,
                EntityKind::Category => ErrorCode::CategoryNotFound,
            },
            DiningError::ConflictViolation { .. } => ErrorCode::AddonConflict,
            DiningError::InvalidBatch(_) => ErrorCode::PaymentInvalidBatch,
            DiningError::InvalidStatus { .. } => ErrorCode::OrderInvalidStatus,
            DiningError::EmptyCart(_) => ErrorCode::OrderEmpty,
            DiningError::RequiredAddonMissing(_) => ErrorCode::AddonRequired,
            DiningError::MenuItemUnavailable(_) => ErrorCode::MenuItemUnavailable,
            DiningError::PrefixTaken(_) => ErrorCode::CategoryPrefixExists,
            DiningError::TableNumberTaken(_) => ErrorCode::TableNumberExists,
            DiningError::Validation(_) => ErrorCode::ValidationFailed,
            DiningError::Store(_) => ErrorCode::StoreError,
        }
    }

    /// Contention and transient store failures may succeed later
    pub fn is_retryable(&self) -> bool {
        matches!(self, DiningError::TableUnavailable(_) | DiningError::Store(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_follow_taxonomy() {
        assert_eq!(DiningError::TableUnavailable(1).code(), ErrorCode::TableUnavailable);
        assert_eq!(DiningError::NotOwner(1).code(), ErrorCode::TableNotOwner);
        assert_eq!(
            DiningError::not_found(EntityKind::MenuItem, "M001").code(),
            ErrorCode::MenuItemNotFound
        );
        assert_eq!(
            DiningError::ConflictViolation {
                addon: 1,
                conflicts_with: 2
            }
            .code(),
            ErrorCode::AddonConflict
        );
        assert_eq!(
            DiningError::InvalidBatch(vec![3]).code(),
            ErrorCode::PaymentInvalidBatch
        );
    }

    #[test]
    fn test_only_contention_and_store_retry() {
        assert!(DiningError::TableUnavailable(1).is_retryable());
        assert!(!DiningError::NotOwner(1).is_retryable());
        assert!(!DiningError::InvalidBatch(vec![]).is_retryable());
        assert!(!DiningError::validation("bad").is_retryable());
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            DiningError::not_found(EntityKind::CartItem, 9).to_string(),
            "Cart item not found: 9"
        );
        assert_eq!(
            DiningError::TableUnavailable(5).to_string(),
            "Table 5 is occupied by another session"
        );
    }
}
