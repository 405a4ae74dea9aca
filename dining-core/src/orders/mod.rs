//! 订单模块
//!
//! Checkout from cart, staff edits, counter settlement and order queries.
//! Status changes follow `shared::models::OrderStatus::can_transition_to`.

mod lifecycle;

pub use lifecycle::{Checkout, OrderLifecycle};
