//! Reservation lifecycle: reserve, release and expiry sweeps

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use shared::{Reservation, StockKey};
use uuid::Uuid;

use super::stock::{release_reservation, reservation_expiry, reserve_stock};
use crate::cache::TwoTierCache;
use crate::error::{AppError, AppResult};
use crate::store::InventoryStore;

/// Most expired reservations one sweep call releases
const SWEEP_BATCH: i64 = 1000;

/// Input for reserving stock against an order
#[derive(Debug, Clone, Deserialize)]
pub struct ReserveStockInput {
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub order_id: Uuid,
    pub quantity: i32,
    /// Lifetime override; the configured default applies when absent
    pub ttl_secs: Option<i64>,
}

impl ReserveStockInput {
    pub fn key(&self) -> StockKey {
        StockKey::new(self.warehouse_id, self.product_id, self.variant_id)
    }
}

#[derive(Clone)]
pub struct ReservationService {
    store: Arc<dyn InventoryStore>,
    cache: Arc<TwoTierCache>,
    default_ttl_secs: i64,
}

impl ReservationService {
    pub fn new(store: Arc<dyn InventoryStore>, cache: Arc<TwoTierCache>, default_ttl_secs: i64) -> Self {
        Self {
            store,
            cache,
            default_ttl_secs,
        }
    }

    /// Hold stock for an order. Duplicate reservations per order are not detected.
    pub async fn reserve(&self, tenant_id: &str, input: ReserveStockInput) -> AppResult<Reservation> {
        if let Some(ttl) = input.ttl_secs {
            if ttl <= 0 {
                return Err(AppError::validation("ttl_secs", "Reservation lifetime must be positive"));
            }
        }

        let key = input.key();
        let now = Utc::now();
        let expires_at = reservation_expiry(now, input.ttl_secs.unwrap_or(self.default_ttl_secs))?;

        let mut tx = self.store.begin().await?;
        let reservation = reserve_stock(
            tx.as_mut(),
            tenant_id,
            &key,
            input.quantity,
            input.order_id,
            expires_at,
            now,
        )
        .await?;
        tx.commit().await?;

        self.cache.invalidate_stock(tenant_id, &key).await;
        Ok(reservation)
    }

    pub async fn release(&self, tenant_id: &str, reservation_id: Uuid) -> AppResult<Reservation> {
        let mut tx = self.store.begin().await?;
        let reservation = release_reservation(tx.as_mut(), tenant_id, reservation_id, Utc::now()).await?;
        tx.commit().await?;

        self.cache.invalidate_stock(tenant_id, &reservation.key()).await;
        Ok(reservation)
    }

    /// Release every ACTIVE reservation past its expiry
    ///
    /// Each reservation is released in its own transaction. Failures are
    /// logged and skipped; the return value counts successful releases.
    pub async fn release_expired(&self, tenant_id: &str) -> AppResult<u64> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let expired = tx.expired_reservations(tenant_id, now, SWEEP_BATCH).await?;
        drop(tx);

        if expired.is_empty() {
            return Ok(0);
        }

        let mut released = 0u64;
        for reservation_id in expired {
            match self.release_one_expired(tenant_id, reservation_id).await {
                Ok(true) => released += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(
                        tenant_id = %tenant_id,
                        reservation_id = %reservation_id,
                        error = %e,
                        "Failed to release expired reservation"
                    );
                }
            }
        }

        tracing::info!(tenant_id = %tenant_id, released = released, "Expired reservations released");
        Ok(released)
    }

    /// Returns false when the reservation was released or extended since the scan
    async fn release_one_expired(&self, tenant_id: &str, reservation_id: Uuid) -> AppResult<bool> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let current = tx.lock_reservation(tenant_id, reservation_id).await?;
        let still_expired = current.map_or(false, |r| r.is_active() && r.is_expired(now));
        if !still_expired {
            return Ok(false);
        }

        let reservation = release_reservation(tx.as_mut(), tenant_id, reservation_id, now).await?;
        tx.commit().await?;

        self.cache.invalidate_stock(tenant_id, &reservation.key()).await;
        Ok(true)
    }

    pub async fn get(&self, tenant_id: &str, reservation_id: Uuid) -> AppResult<Reservation> {
        let mut tx = self.store.begin().await?;
        let reservation = tx.get_reservation(tenant_id, reservation_id).await?;
        reservation.ok_or_else(|| AppError::not_found("Reservation", reservation_id))
    }

    pub async fn list_for_order(&self, tenant_id: &str, order_id: Uuid) -> AppResult<Vec<Reservation>> {
        let mut tx = self.store.begin().await?;
        let reservations = tx.reservations_for_order(tenant_id, order_id).await?;
        Ok(reservations)
    }
}
