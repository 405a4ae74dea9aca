//! OrderLifecycle - cart checkout, staff edits and payment settlement
//!
//! # Checkout Flow
//!
//! ```text
//! finalize_from_cart(table, session, checkout)
//!     ├─ 1. Validate card details (card checkout only)
//!     ├─ 2. Begin write transaction
//!     ├─ 3. Require table ownership, load non-empty cart
//!     ├─ 4. Compute exact totals
//!     ├─ 5. Stage Order + OrderItems (frozen unit prices) + Payment
//!     ├─ 6. Stage cart and cart item deletes
//!     └─ 7. Apply and commit (all or nothing)
//! ```
//!
//! Status rules follow [`OrderStatus::can_transition_to`].

use std::collections::BTreeSet;
use std::sync::Arc;

use redb::WriteTransaction;
use shared::models::{
    Cart, CardDetails, CartItemInput, Order, OrderItem, OrderStatus, Payment, PaymentMethod,
};

use crate::cart::pricing::{PricedLine, price_line};
use crate::cart::{load_cart_items, stage_cart_removal};
use crate::core::{DiningError, DiningResult, EntityKind};
use crate::db::{Storage, WriteBatch, counters};
use crate::money::{Totals, line_subtotal, round_money};
use crate::tables::{load_table, require_owner};
use crate::utils::Clock;

const MIN_CARD_DIGITS: usize = 12;
const MAX_CARD_DIGITS: usize = 19;

/// Checkout request
#[derive(Debug, Clone)]
pub struct Checkout {
    pub method: PaymentMethod,
    /// Required for [`PaymentMethod::Card`]
    pub card: Option<CardDetails>,
    /// None for guest orders
    pub user_id: Option<i64>,
}

impl Checkout {
    pub fn pay_at_counter() -> Self {
        Self {
            method: PaymentMethod::PayAtCounter,
            card: None,
            user_id: None,
        }
    }

    pub fn card(holder_name: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            method: PaymentMethod::Card,
            card: Some(CardDetails {
                holder_name: holder_name.into(),
                number: number.into(),
            }),
            user_id: None,
        }
    }
}

/// What gets persisted from a card: holder and last four digits only
#[derive(Debug, Clone, PartialEq, Eq)]
struct CardRecord {
    holder: String,
    last4: String,
}

fn card_record(method: PaymentMethod, card: Option<&CardDetails>) -> DiningResult<Option<CardRecord>> {
    if method != PaymentMethod::Card {
        return Ok(None);
    }
    let card = card.ok_or_else(|| DiningError::validation("card details required"))?;

    let holder = card.holder_name.trim();
    if holder.is_empty() {
        return Err(DiningError::validation("card holder name must not be empty"));
    }
    let digits: String = card
        .number
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    if !digits.chars().all(|c| c.is_ascii_digit())
        || !(MIN_CARD_DIGITS..=MAX_CARD_DIGITS).contains(&digits.len())
    {
        return Err(DiningError::validation("invalid card number"));
    }

    Ok(Some(CardRecord {
        holder: holder.to_string(),
        last4: digits[digits.len() - 4..].to_string(),
    }))
}

/// Status a checkout moves a `Pending` order to
fn settled_status(method: PaymentMethod) -> OrderStatus {
    match method {
        PaymentMethod::PayAtCounter => OrderStatus::PendingPayment,
        PaymentMethod::Card => OrderStatus::Completed,
    }
}

fn check_transition(order: &Order, next: OrderStatus, action: &'static str) -> DiningResult<()> {
    if order.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(DiningError::InvalidStatus {
            order_id: order.id,
            status: order.status,
            action,
        })
    }
}

/// 订单生命周期
#[derive(Clone)]
pub struct OrderLifecycle {
    storage: Storage,
    clock: Arc<dyn Clock>,
}

impl OrderLifecycle {
    pub fn new(storage: Storage, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    fn load_order(&self, txn: &WriteTransaction, order_id: i64) -> DiningResult<Order> {
        self.storage
            .get_txn::<Order>(txn, order_id)?
            .ok_or_else(|| DiningError::not_found(EntityKind::Order, order_id))
    }

    fn load_order_items(&self, txn: &WriteTransaction, order_id: i64) -> DiningResult<Vec<OrderItem>> {
        let mut items = self
            .storage
            .query_txn::<OrderItem>(txn, |i| i.order_id == order_id)?;
        items.sort_by_key(|i| i.id);
        Ok(items)
    }

    /// Stage the single payment that accompanies a checkout or submit
    fn stage_payment(
        &self,
        txn: &WriteTransaction,
        order: &Order,
        method: PaymentMethod,
        card: Option<CardRecord>,
        batch: &mut WriteBatch,
    ) -> DiningResult<Payment> {
        let now = self.clock.now_millis();
        let paid_at = match method {
            PaymentMethod::Card => Some(now),
            PaymentMethod::PayAtCounter => None,
        };
        let (card_holder, card_last4) = match card {
            Some(record) => (Some(record.holder), Some(record.last4)),
            None => (None, None),
        };
        let payment = Payment {
            id: self.storage.next_id(txn, counters::PAYMENT)?,
            order_id: order.id,
            method,
            amount: round_money(order.total_amount),
            card_holder,
            card_last4,
            created_at: now,
            paid_at,
            voided_at: None,
        };
        batch.put(&payment)?;
        Ok(payment)
    }

    // ========== Customer checkout ==========

    /// Turn the caller's cart into an order with exactly one payment
    pub fn finalize_from_cart(
        &self,
        table_id: i64,
        session_token: &str,
        checkout: Checkout,
    ) -> DiningResult<Order> {
        let card = card_record(checkout.method, checkout.card.as_ref())?;

        let txn = self.storage.begin_write()?;
        require_owner(&self.storage, &txn, table_id, session_token)?;
        let cart = self
            .storage
            .get_txn::<Cart>(&txn, table_id)?
            .filter(|c| c.session_token == session_token)
            .ok_or(DiningError::EmptyCart(table_id))?;
        let cart_items = load_cart_items(&self.storage, &txn, cart.id)?;
        if cart_items.is_empty() {
            return Err(DiningError::EmptyCart(table_id));
        }

        let totals = Totals::from_lines(cart_items.iter().map(|i| i.subtotal()));
        let status = settled_status(checkout.method);
        let order = Order {
            id: self.storage.next_id(&txn, counters::ORDER)?,
            table_id: Some(table_id),
            user_id: checkout.user_id,
            status,
            total_amount: totals.total,
            order_date: self.clock.now_millis(),
        };

        let mut batch = WriteBatch::new();
        batch.put(&order)?;
        for cart_item in &cart_items {
            let item = OrderItem {
                id: self.storage.next_id(&txn, counters::ORDER_ITEM)?,
                order_id: order.id,
                menu_item_id: cart_item.menu_item_id.clone(),
                quantity: cart_item.quantity,
                unit_price: cart_item.unit_price,
                subtotal: cart_item.subtotal(),
                addon_ids: cart_item.addon_ids.clone(),
                instructions: cart_item.instructions.clone(),
            };
            batch.put(&item)?;
        }
        let payment = self.stage_payment(&txn, &order, checkout.method, card, &mut batch)?;
        stage_cart_removal(&self.storage, &txn, &cart, &mut batch)?;
        self.storage.apply(&txn, &batch)?;
        txn.commit()?;

        tracing::info!(
            order_id = order.id,
            table_id,
            status = ?order.status,
            items = cart_items.len(),
            total = %round_money(order.total_amount),
            payment_id = payment.id,
            "Order finalized from cart"
        );
        Ok(order)
    }

    // ========== Counter settlement ==========

    /// Complete every order in the batch, or none of them
    ///
    /// Rejected with `InvalidBatch` if the batch is empty or any id is
    /// unknown or not `PendingPayment`; the error lists the offending ids.
    pub fn mark_paid(&self, order_ids: &[i64]) -> DiningResult<Vec<Order>> {
        if order_ids.is_empty() {
            return Err(DiningError::InvalidBatch(Vec::new()));
        }
        let ids: BTreeSet<i64> = order_ids.iter().copied().collect();

        let txn = self.storage.begin_write()?;
        let mut orders = Vec::with_capacity(ids.len());
        let mut rejected = Vec::new();
        for id in &ids {
            match self.storage.get_txn::<Order>(&txn, id)? {
                Some(order) if order.status == OrderStatus::PendingPayment => orders.push(order),
                _ => rejected.push(*id),
            }
        }
        if !rejected.is_empty() {
            tracing::warn!(?rejected, "Mark paid rejected, batch not eligible");
            return Err(DiningError::InvalidBatch(rejected));
        }

        let now = self.clock.now_millis();
        let mut batch = WriteBatch::new();
        for order in &mut orders {
            order.status = OrderStatus::Completed;
            batch.put(&*order)?;
            let order_id = order.id;
            let unpaid = self
                .storage
                .query_txn::<Payment>(&txn, |p| p.order_id == order_id && p.is_open())?;
            for mut payment in unpaid {
                payment.paid_at = Some(now);
                batch.put(&payment)?;
            }
        }
        self.storage.apply(&txn, &batch)?;
        txn.commit()?;

        tracing::info!(count = orders.len(), "Orders marked paid");
        Ok(orders)
    }

    // ========== Staff path ==========

    /// Append lines to the table's `Pending` order, opening one if needed
    ///
    /// Lines with the same menu item, add-ons and instructions as an existing
    /// line are merged into it.
    pub fn staff_add_items(
        &self,
        table_id: i64,
        lines: Vec<CartItemInput>,
    ) -> DiningResult<Order> {
        if lines.is_empty() {
            return Err(DiningError::validation("no items to add"));
        }

        let txn = self.storage.begin_write()?;
        load_table(&self.storage, &txn, table_id)?;
        let priced: Vec<(PricedLine, i32)> = lines
            .iter()
            .map(|input| -> DiningResult<(PricedLine, i32)> {
                Ok((price_line(&self.storage, &txn, input)?, input.quantity))
            })
            .collect::<DiningResult<_>>()?;

        let open = self
            .storage
            .query_txn::<Order>(&txn, |o| {
                o.table_id == Some(table_id) && o.status == OrderStatus::Pending
            })?
            .into_iter()
            .max_by_key(|o| o.id);
        let (mut order, mut items) = match open {
            Some(order) => {
                let items = self.load_order_items(&txn, order.id)?;
                (order, items)
            }
            None => {
                let order = Order {
                    id: self.storage.next_id(&txn, counters::ORDER)?,
                    table_id: Some(table_id),
                    user_id: None,
                    status: OrderStatus::Pending,
                    total_amount: rust_decimal::Decimal::ZERO,
                    order_date: self.clock.now_millis(),
                };
                tracing::info!(order_id = order.id, table_id, "Pending order opened by staff");
                (order, Vec::new())
            }
        };

        let mut touched = BTreeSet::new();
        for (line, quantity) in priced {
            let existing = items.iter_mut().find(|i| {
                i.menu_item_id == line.menu_item.id
                    && i.addon_ids == line.addon_ids
                    && i.instructions == line.instructions
            });
            match existing {
                Some(item) => {
                    item.quantity = item.quantity.checked_add(quantity).ok_or_else(|| {
                        DiningError::validation(format!("quantity of order line {} too large", item.id))
                    })?;
                    item.subtotal = line_subtotal(item.unit_price, item.quantity);
                    touched.insert(item.id);
                }
                None => {
                    let item = OrderItem {
                        id: self.storage.next_id(&txn, counters::ORDER_ITEM)?,
                        order_id: order.id,
                        menu_item_id: line.menu_item.id,
                        quantity,
                        unit_price: line.unit_price,
                        subtotal: line_subtotal(line.unit_price, quantity),
                        addon_ids: line.addon_ids,
                        instructions: line.instructions,
                    };
                    touched.insert(item.id);
                    items.push(item);
                }
            }
        }

        order.total_amount = Totals::from_lines(items.iter().map(|i| i.subtotal)).total;
        let mut batch = WriteBatch::new();
        batch.put(&order)?;
        for item in items.iter().filter(|i| touched.contains(&i.id)) {
            batch.put(item)?;
        }
        self.storage.apply(&txn, &batch)?;
        txn.commit()?;

        tracing::info!(order_id = order.id, table_id, lines = touched.len(), "Staff added items");
        Ok(order)
    }

    /// Change a line of a `Pending` order; `quantity <= 0` removes it
    pub fn staff_update_item(
        &self,
        order_id: i64,
        item_id: i64,
        quantity: i32,
    ) -> DiningResult<Order> {
        let txn = self.storage.begin_write()?;
        let mut order = self.load_order(&txn, order_id)?;
        if order.status != OrderStatus::Pending {
            return Err(DiningError::InvalidStatus {
                order_id,
                status: order.status,
                action: "edit items",
            });
        }

        let mut items = self.load_order_items(&txn, order_id)?;
        let pos = items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or_else(|| DiningError::not_found(EntityKind::OrderItem, item_id))?;

        let mut batch = WriteBatch::new();
        if quantity <= 0 {
            items.remove(pos);
            batch.delete::<OrderItem>(item_id);
        } else {
            let item = &mut items[pos];
            item.quantity = quantity;
            item.subtotal = line_subtotal(item.unit_price, quantity);
            batch.put(&*item)?;
        }
        order.total_amount = Totals::from_lines(items.iter().map(|i| i.subtotal)).total;
        batch.put(&order)?;
        self.storage.apply(&txn, &batch)?;
        txn.commit()?;

        tracing::debug!(order_id, item_id, quantity, "Staff updated order item");
        Ok(order)
    }

    /// Submit a `Pending` order exactly like a checkout
    pub fn submit(
        &self,
        order_id: i64,
        method: PaymentMethod,
        card: Option<CardDetails>,
    ) -> DiningResult<Order> {
        let card = card_record(method, card.as_ref())?;

        let txn = self.storage.begin_write()?;
        let mut order = self.load_order(&txn, order_id)?;
        let next = settled_status(method);
        if order.status != OrderStatus::Pending {
            return Err(DiningError::InvalidStatus {
                order_id,
                status: order.status,
                action: "submit",
            });
        }
        let items = self.load_order_items(&txn, order_id)?;
        if items.is_empty() {
            return Err(DiningError::validation(format!("order {} has no items", order_id)));
        }

        order.total_amount = Totals::from_lines(items.iter().map(|i| i.subtotal)).total;
        order.status = next;
        let mut batch = WriteBatch::new();
        batch.put(&order)?;
        let payment = self.stage_payment(&txn, &order, method, card, &mut batch)?;
        self.storage.apply(&txn, &batch)?;
        txn.commit()?;

        tracing::info!(order_id, status = ?order.status, payment_id = payment.id, "Order submitted");
        Ok(order)
    }

    /// Administrative cancellation of a non-terminal order
    ///
    /// Unsettled payments of the order are voided in the same transaction.
    pub fn cancel(&self, order_id: i64) -> DiningResult<Order> {
        let txn = self.storage.begin_write()?;
        let mut order = self.load_order(&txn, order_id)?;
        check_transition(&order, OrderStatus::Cancelled, "cancel")?;
        order.status = OrderStatus::Cancelled;
        let mut batch = WriteBatch::new();
        batch.put(&order)?;

        let now = self.clock.now_millis();
        let open = self
            .storage
            .query_txn::<Payment>(&txn, |p| p.order_id == order_id && p.is_open())?;
        for mut payment in open.iter().cloned() {
            payment.voided_at = Some(now);
            batch.put(&payment)?;
        }
        self.storage.apply(&txn, &batch)?;
        txn.commit()?;

        tracing::info!(order_id, voided_payments = open.len(), "Order cancelled");
        Ok(order)
    }

    /// Payments still awaiting settlement, oldest first
    pub fn open_payments(&self) -> DiningResult<Vec<Payment>> {
        let mut payments = self.storage.query::<Payment>(Payment::is_open)?;
        payments.sort_by_key(|p| p.id);
        Ok(payments)
    }

    // ========== Queries ==========

    pub fn get_order(&self, order_id: i64) -> DiningResult<Order> {
        self.storage
            .get::<Order>(order_id)?
            .ok_or_else(|| DiningError::not_found(EntityKind::Order, order_id))
    }

    pub fn order_items(&self, order_id: i64) -> DiningResult<Vec<OrderItem>> {
        let mut items = self.storage.query::<OrderItem>(|i| i.order_id == order_id)?;
        items.sort_by_key(|i| i.id);
        Ok(items)
    }

    pub fn payments(&self, order_id: i64) -> DiningResult<Vec<Payment>> {
        let mut payments = self.storage.query::<Payment>(|p| p.order_id == order_id)?;
        payments.sort_by_key(|p| p.id);
        Ok(payments)
    }

    /// Orders of a table, newest first
    pub fn orders_for_table(&self, table_id: i64) -> DiningResult<Vec<Order>> {
        let mut orders = self
            .storage
            .query::<Order>(|o| o.table_id == Some(table_id))?;
        orders.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(orders)
    }

    /// Orders in `status`, oldest first
    pub fn orders_by_status(&self, status: OrderStatus) -> DiningResult<Vec<Order>> {
        let mut orders = self.storage.query::<Order>(|o| o.status == status)?;
        orders.sort_by_key(|o| o.id);
        Ok(orders)
    }
}
