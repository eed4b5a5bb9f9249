//! Stock level models and counter arithmetic
//!
//! A [`StockRecord`] holds three counters for one (warehouse, product, variant)
//! triple. Every mutation keeps `on_hand == available + reserved` with all three
//! non-negative; a rejected mutation leaves the record untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Identity of a stock record within a tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockKey {
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
}

impl StockKey {
    pub fn new(warehouse_id: Uuid, product_id: Uuid, variant_id: Option<Uuid>) -> Self {
        Self {
            warehouse_id,
            product_id,
            variant_id,
        }
    }

    /// Same product/variant at another warehouse
    pub fn at_warehouse(&self, warehouse_id: Uuid) -> Self {
        Self {
            warehouse_id,
            ..*self
        }
    }
}

impl std::fmt::Display for StockKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.variant_id {
            Some(variant) => write!(f, "{}/{}/{}", self.warehouse_id, self.product_id, variant),
            None => write!(f, "{}/{}", self.warehouse_id, self.product_id),
        }
    }
}

/// Errors raised by counter arithmetic
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    #[error("quantity must be positive, got {0}")]
    InvalidQuantity(i32),

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i32, available: i32 },

    #[error("insufficient reserved stock: requested {requested}, reserved {reserved}")]
    InsufficientReserved { requested: i32, reserved: i32 },

    #[error("quantity overflow")]
    Overflow,
}

/// Stock level for a product at a warehouse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    pub id: Uuid,
    pub tenant_id: String,
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity_on_hand: i32,
    pub quantity_reserved: i32,
    pub quantity_available: i32,
    pub reorder_point: i32,
    pub reorder_quantity: i32,
    pub last_restocked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockRecord {
    /// Zero-valued record for a triple that has never been touched
    pub fn empty(tenant_id: &str, key: &StockKey, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.to_string(),
            warehouse_id: key.warehouse_id,
            product_id: key.product_id,
            variant_id: key.variant_id,
            quantity_on_hand: 0,
            quantity_reserved: 0,
            quantity_available: 0,
            reorder_point: 0,
            reorder_quantity: 0,
            last_restocked_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> StockKey {
        StockKey::new(self.warehouse_id, self.product_id, self.variant_id)
    }

    /// Whether the counters satisfy the on-hand/available/reserved invariant
    pub fn is_consistent(&self) -> bool {
        self.quantity_on_hand >= 0
            && self.quantity_reserved >= 0
            && self.quantity_available >= 0
            && self.quantity_on_hand == self.quantity_available + self.quantity_reserved
    }

    /// Whether available stock has fallen to the reorder point
    pub fn needs_reorder(&self) -> bool {
        self.reorder_point > 0 && self.quantity_available <= self.reorder_point
    }

    /// Credit stock: on_hand and available both grow by `qty`
    pub fn add(&mut self, qty: i32, now: DateTime<Utc>) -> Result<(), StockError> {
        ensure_positive(qty)?;
        let on_hand = self.quantity_on_hand.checked_add(qty).ok_or(StockError::Overflow)?;
        let available = self
            .quantity_available
            .checked_add(qty)
            .ok_or(StockError::Overflow)?;

        self.quantity_on_hand = on_hand;
        self.quantity_available = available;
        self.last_restocked_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Debit stock that is not held by a reservation
    ///
    /// Reserved units are never removed, so the check is against `available`.
    /// `available >= qty` implies `on_hand >= qty`.
    pub fn remove(&mut self, qty: i32, now: DateTime<Utc>) -> Result<(), StockError> {
        ensure_positive(qty)?;
        if self.quantity_available < qty {
            return Err(StockError::InsufficientStock {
                requested: qty,
                available: self.quantity_available,
            });
        }

        self.quantity_on_hand -= qty;
        self.quantity_available -= qty;
        self.updated_at = now;
        Ok(())
    }

    /// Hold `qty` units: moves them from available to reserved
    pub fn reserve(&mut self, qty: i32, now: DateTime<Utc>) -> Result<(), StockError> {
        ensure_positive(qty)?;
        if self.quantity_available < qty {
            return Err(StockError::InsufficientStock {
                requested: qty,
                available: self.quantity_available,
            });
        }

        self.quantity_available -= qty;
        self.quantity_reserved += qty;
        self.updated_at = now;
        Ok(())
    }

    /// Undo a hold: moves `qty` units from reserved back to available
    pub fn release(&mut self, qty: i32, now: DateTime<Utc>) -> Result<(), StockError> {
        ensure_positive(qty)?;
        if self.quantity_reserved < qty {
            return Err(StockError::InsufficientReserved {
                requested: qty,
                reserved: self.quantity_reserved,
            });
        }

        self.quantity_reserved -= qty;
        self.quantity_available += qty;
        self.updated_at = now;
        Ok(())
    }
}

fn ensure_positive(qty: i32) -> Result<(), StockError> {
    if qty <= 0 {
        return Err(StockError::InvalidQuantity(qty));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> StockRecord {
        StockRecord::empty("tenant-a", &StockKey::new(Uuid::new_v4(), Uuid::new_v4(), None), Utc::now())
    }

    #[test]
    fn add_then_remove_exact_leaves_zero() {
        let mut stock = record();
        stock.add(7, Utc::now()).unwrap();
        stock.remove(7, Utc::now()).unwrap();

        assert_eq!(stock.quantity_on_hand, 0);
        assert_eq!(stock.quantity_available, 0);
        assert!(stock.is_consistent());
    }

    #[test]
    fn remove_cannot_touch_reserved_units() {
        let mut stock = record();
        stock.add(10, Utc::now()).unwrap();
        stock.reserve(8, Utc::now()).unwrap();

        let err = stock.remove(3, Utc::now()).unwrap_err();
        assert_eq!(
            err,
            StockError::InsufficientStock {
                requested: 3,
                available: 2
            }
        );
        assert_eq!(stock.quantity_on_hand, 10);
        assert!(stock.is_consistent());
    }

    #[test]
    fn non_positive_quantities_are_rejected() {
        let mut stock = record();
        assert_eq!(stock.add(0, Utc::now()), Err(StockError::InvalidQuantity(0)));
        assert_eq!(stock.reserve(-1, Utc::now()), Err(StockError::InvalidQuantity(-1)));
        assert_eq!(stock.quantity_on_hand, 0);
    }

    #[test]
    fn reorder_requires_a_configured_point() {
        let mut stock = record();
        assert!(!stock.needs_reorder());

        stock.reorder_point = 5;
        stock.add(5, Utc::now()).unwrap();
        assert!(stock.needs_reorder());

        stock.add(1, Utc::now()).unwrap();
        assert!(!stock.needs_reorder());
    }
}
