//! Order Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order status
///
/// ```text
/// Pending ──► PendingPayment ──► Completed
///    │                │
///    └──► Completed   └──► Cancelled
///    └──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Being built, items may still change
    Pending,
    /// Submitted, awaiting settlement at the counter
    PendingPayment,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether `self -> next` is a legal transition
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::PendingPayment)
                | (Self::Pending, Self::Completed)
                | (Self::Pending, Self::Cancelled)
                | (Self::PendingPayment, Self::Completed)
                | (Self::PendingPayment, Self::Cancelled)
        )
    }
}

/// Payment method chosen at checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Settled later at the counter
    PayAtCounter,
    /// Paid electronically at checkout
    Card,
}

/// Card details supplied with a card checkout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardDetails {
    pub holder_name: String,
    pub number: String,
}

/// Order (订单)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    /// None for non-dine-in flows
    pub table_id: Option<i64>,
    /// None for guest orders
    pub user_id: Option<i64>,
    pub status: OrderStatus,
    /// Sum of item subtotals × (1 + tax rate), unrounded
    pub total_amount: Decimal,
    pub order_date: i64,
}

/// Order line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub menu_item_id: String,
    pub quantity: i32,
    /// Frozen unit price (add-on cost included)
    pub unit_price: Decimal,
    /// unit_price × quantity
    pub subtotal: Decimal,
    #[serde(default)]
    pub addon_ids: Vec<i64>,
    pub instructions: Option<String>,
}

/// Payment record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub card_holder: Option<String>,
    pub card_last4: Option<String>,
    pub created_at: i64,
    /// None until settled (pay-at-counter payments wait for MarkPaid)
    pub paid_at: Option<i64>,
    /// Set when the order is cancelled before settlement
    #[serde(default)]
    pub voided_at: Option<i64>,
}

impl Payment {
    pub fn is_settled(&self) -> bool {
        self.paid_at.is_some()
    }

    pub fn is_void(&self) -> bool {
        self.voided_at.is_some()
    }

    /// Neither settled nor voided
    pub fn is_open(&self) -> bool {
        !self.is_settled() && !self.is_void()
    }
}
