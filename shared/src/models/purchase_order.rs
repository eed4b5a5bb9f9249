//! Purchase order models and receipt evaluation

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::StockKey;

/// Purchase order workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseOrderStatus {
    Draft,
    Submitted,
    Approved,
    Ordered,
    Received,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Draft => "DRAFT",
            PurchaseOrderStatus::Submitted => "SUBMITTED",
            PurchaseOrderStatus::Approved => "APPROVED",
            PurchaseOrderStatus::Ordered => "ORDERED",
            PurchaseOrderStatus::Received => "RECEIVED",
            PurchaseOrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(PurchaseOrderStatus::Draft),
            "SUBMITTED" => Some(PurchaseOrderStatus::Submitted),
            "APPROVED" => Some(PurchaseOrderStatus::Approved),
            "ORDERED" => Some(PurchaseOrderStatus::Ordered),
            "RECEIVED" => Some(PurchaseOrderStatus::Received),
            "CANCELLED" => Some(PurchaseOrderStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PurchaseOrderStatus::Received | PurchaseOrderStatus::Cancelled)
    }

    /// Status-only transitions. RECEIVED is reached through receiving, never directly.
    pub fn can_transition_to(&self, next: PurchaseOrderStatus) -> bool {
        use PurchaseOrderStatus::*;
        if next == Cancelled {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Draft, Submitted) | (Submitted, Approved) | (Submitted, Draft) | (Approved, Ordered)
        )
    }

    /// Whether goods may be received against an order in this status
    pub fn accepts_receipt(&self) -> bool {
        matches!(self, PurchaseOrderStatus::Approved | PurchaseOrderStatus::Ordered)
    }
}

impl std::fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A purchase order line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrderItem {
    pub id: Uuid,
    pub purchase_order_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity_ordered: i32,
    pub quantity_received: i32,
    pub unit_cost: Decimal,
    pub subtotal: Decimal,
    pub notes: Option<String>,
}

impl PurchaseOrderItem {
    pub fn is_fully_received(&self) -> bool {
        self.quantity_received >= self.quantity_ordered
    }
}

/// An order placed with a supplier for delivery to one warehouse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub tenant_id: String,
    pub po_number: String,
    pub status: PurchaseOrderStatus,
    pub supplier_id: Uuid,
    pub warehouse_id: Uuid,
    pub order_date: DateTime<Utc>,
    pub expected_date: Option<DateTime<Utc>>,
    pub received_date: Option<DateTime<Utc>>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub currency_code: String,
    pub notes: Option<String>,
    pub items: Vec<PurchaseOrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Subtotal for one line
pub fn line_subtotal(quantity: i32, unit_cost: Decimal) -> Decimal {
    unit_cost * Decimal::from(quantity)
}

/// Returns (subtotal, total) over the given line subtotals
pub fn order_totals<'a>(
    line_subtotals: impl IntoIterator<Item = &'a Decimal>,
    tax: Decimal,
    shipping: Decimal,
) -> (Decimal, Decimal) {
    let subtotal: Decimal = line_subtotals.into_iter().sum();
    (subtotal, subtotal + tax + shipping)
}

/// Receipt rejected before any stock moved
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReceiptError {
    #[error("purchase order in status {0} cannot be received")]
    NotReceivable(PurchaseOrderStatus),

    #[error("line item {0} does not belong to this purchase order")]
    UnknownItem(Uuid),

    #[error("received quantity for line item {item_id} must be positive, got {quantity}")]
    InvalidQuantity { item_id: Uuid, quantity: i32 },

    #[error("no line items to receive")]
    Empty,

    #[error("received quantity for line item {0} exceeds the supported range")]
    Overflow(Uuid),
}

/// Stock credit produced by a receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockCredit {
    pub key: StockKey,
    pub quantity: i32,
}

/// Result of applying a receipt to an order
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptOutcome {
    pub credits: Vec<StockCredit>,
    pub fully_received: bool,
}

impl PurchaseOrder {
    pub fn is_fully_received(&self) -> bool {
        self.items.iter().all(PurchaseOrderItem::is_fully_received)
    }

    /// Apply received quantities to the line items
    ///
    /// Quantities are cumulative across calls. Items absent from `received`
    /// keep their current received quantity. On success the status becomes
    /// RECEIVED when every line is satisfied, otherwise ORDERED. On error
    /// the order is left untouched.
    pub fn apply_receipt(
        &mut self,
        received: &HashMap<Uuid, i32>,
        now: DateTime<Utc>,
    ) -> Result<ReceiptOutcome, ReceiptError> {
        if !self.status.accepts_receipt() {
            return Err(ReceiptError::NotReceivable(self.status));
        }
        if received.is_empty() {
            return Err(ReceiptError::Empty);
        }
        let mut totals = HashMap::with_capacity(received.len());
        for (item_id, quantity) in received {
            let Some(item) = self.items.iter().find(|item| item.id == *item_id) else {
                return Err(ReceiptError::UnknownItem(*item_id));
            };
            if *quantity <= 0 {
                return Err(ReceiptError::InvalidQuantity {
                    item_id: *item_id,
                    quantity: *quantity,
                });
            }
            let total = item
                .quantity_received
                .checked_add(*quantity)
                .ok_or(ReceiptError::Overflow(*item_id))?;
            totals.insert(*item_id, total);
        }

        let mut credits = Vec::with_capacity(received.len());
        for item in self.items.iter_mut() {
            if let (Some(quantity), Some(total)) = (received.get(&item.id), totals.get(&item.id)) {
                item.quantity_received = *total;
                credits.push(StockCredit {
                    key: StockKey::new(self.warehouse_id, item.product_id, item.variant_id),
                    quantity: *quantity,
                });
            }
        }

        let fully_received = self.is_fully_received();
        self.status = if fully_received {
            PurchaseOrderStatus::Received
        } else {
            PurchaseOrderStatus::Ordered
        };
        if fully_received {
            self.received_date = Some(now);
        }
        self.updated_at = now;

        Ok(ReceiptOutcome {
            credits,
            fully_received,
        })
    }
}
