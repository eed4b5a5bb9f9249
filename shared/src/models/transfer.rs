//! Inter-warehouse transfer models

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{StockKey, TransitionError};

/// Transfer workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    Pending,
    InTransit,
    Completed,
    Cancelled,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "PENDING",
            TransferStatus::InTransit => "IN_TRANSIT",
            TransferStatus::Completed => "COMPLETED",
            TransferStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(TransferStatus::Pending),
            "IN_TRANSIT" => Some(TransferStatus::InTransit),
            "COMPLETED" => Some(TransferStatus::Completed),
            "CANCELLED" => Some(TransferStatus::Cancelled),
            _ => None,
        }
    }

    /// Status-only transitions. COMPLETED is reached through completion, which moves stock.
    pub fn can_transition_to(&self, next: TransferStatus) -> bool {
        use TransferStatus::*;
        matches!(
            (self, next),
            (Pending, InTransit) | (Pending, Cancelled) | (InTransit, Cancelled)
        )
    }

    pub fn can_complete(&self) -> bool {
        matches!(self, TransferStatus::Pending | TransferStatus::InTransit)
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transfer line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferItem {
    pub id: Uuid,
    pub transfer_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity_requested: i32,
    pub quantity_shipped: i32,
    pub quantity_received: i32,
    pub notes: Option<String>,
}

/// Stock moving between two warehouses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: Uuid,
    pub tenant_id: String,
    pub transfer_number: String,
    pub status: TransferStatus,
    pub from_warehouse_id: Uuid,
    pub to_warehouse_id: Uuid,
    pub requested_by: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub items: Vec<TransferItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Completion rejected before any stock moved
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    #[error("transfer in status {0} cannot be completed")]
    NotCompletable(TransferStatus),

    #[error("line item {0} does not belong to this transfer")]
    UnknownItem(Uuid),

    #[error("received quantity for line item {item_id} cannot be negative, got {quantity}")]
    InvalidQuantity { item_id: Uuid, quantity: i32 },
}

/// One debit/credit pair produced by completing a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferMove {
    pub source: StockKey,
    pub destination: StockKey,
    pub quantity: i32,
}

impl Transfer {
    /// Apply a status-only transition, stamping shipped_at when leaving for transit
    pub fn transition_to(
        &mut self,
        next: TransferStatus,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError::new("transfer", self.status.as_str(), next.as_str()));
        }
        if next == TransferStatus::InTransit {
            self.shipped_at = Some(now);
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Resolve final quantities and mark the transfer completed
    ///
    /// Each item moves its override from `received` if present, else its
    /// requested quantity. Zero-quantity items are recorded but produce no move.
    /// On error the transfer is left untouched.
    pub fn complete(
        &mut self,
        received: &HashMap<Uuid, i32>,
        now: DateTime<Utc>,
    ) -> Result<Vec<TransferMove>, CompletionError> {
        if !self.status.can_complete() {
            return Err(CompletionError::NotCompletable(self.status));
        }
        for (item_id, quantity) in received {
            if !self.items.iter().any(|item| item.id == *item_id) {
                return Err(CompletionError::UnknownItem(*item_id));
            }
            if *quantity < 0 {
                return Err(CompletionError::InvalidQuantity {
                    item_id: *item_id,
                    quantity: *quantity,
                });
            }
        }

        let mut moves = Vec::with_capacity(self.items.len());
        for item in self.items.iter_mut() {
            let quantity = received
                .get(&item.id)
                .copied()
                .unwrap_or(item.quantity_requested);
            item.quantity_shipped = quantity;
            item.quantity_received = quantity;

            if quantity > 0 {
                let source = StockKey::new(self.from_warehouse_id, item.product_id, item.variant_id);
                moves.push(TransferMove {
                    source,
                    destination: source.at_warehouse(self.to_warehouse_id),
                    quantity,
                });
            }
        }

        if self.shipped_at.is_none() {
            self.shipped_at = Some(now);
        }
        self.status = TransferStatus::Completed;
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(moves)
    }
}
