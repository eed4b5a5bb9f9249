//! Stock mutation engine and stock level service
//!
//! The engine functions run inside a caller-supplied transaction and lock
//! the stock row before changing it, so concurrent mutations of one record
//! serialize. Workflows compose them; [`StockService`] wraps the single-step
//! operations with their own transaction and cache handling.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    validate_adjustment, validate_non_negative, validate_quantity, PaginatedResponse, Pagination,
    Reservation, ReservationStatus, StockKey, StockRecord,
};
use uuid::Uuid;

use crate::cache::{keys, TwoTierCache};
use crate::error::{AppError, AppResult};
use crate::store::{InventoryStore, InventoryTx, StockFilter, StockScan};

// ============================================================================
// Engine
// ============================================================================

fn check_quantity(qty: i32) -> AppResult<()> {
    validate_quantity(qty).map_err(|message| AppError::validation("quantity", message))
}

/// Credit `qty` units, creating the record if this triple was never touched
pub async fn add_stock(
    tx: &mut dyn InventoryTx,
    tenant_id: &str,
    key: &StockKey,
    qty: i32,
    now: DateTime<Utc>,
) -> AppResult<StockRecord> {
    check_quantity(qty)?;
    let mut stock = tx.lock_or_create_stock(tenant_id, key).await?;
    stock.add(qty, now)?;
    tx.save_stock(&stock).await?;

    tracing::debug!(
        tenant_id = %tenant_id,
        stock_key = %key,
        quantity = qty,
        on_hand = stock.quantity_on_hand,
        "Stock added"
    );
    Ok(stock)
}

/// Debit `qty` unreserved units. The record must exist.
pub async fn remove_stock(
    tx: &mut dyn InventoryTx,
    tenant_id: &str,
    key: &StockKey,
    qty: i32,
    now: DateTime<Utc>,
) -> AppResult<StockRecord> {
    check_quantity(qty)?;
    let mut stock = tx
        .lock_stock(tenant_id, key)
        .await?
        .ok_or_else(|| AppError::not_found("Stock level", key))?;
    stock.remove(qty, now)?;
    tx.save_stock(&stock).await?;

    tracing::debug!(
        tenant_id = %tenant_id,
        stock_key = %key,
        quantity = qty,
        on_hand = stock.quantity_on_hand,
        "Stock removed"
    );
    Ok(stock)
}

/// Hold `qty` units for an order and record the reservation
pub async fn reserve_stock(
    tx: &mut dyn InventoryTx,
    tenant_id: &str,
    key: &StockKey,
    qty: i32,
    order_id: Uuid,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> AppResult<Reservation> {
    check_quantity(qty)?;
    let mut stock = tx.lock_stock(tenant_id, key).await?.ok_or_else(|| {
        AppError::InsufficientStock(format!("requested {} but {} has no stock", qty, key))
    })?;
    stock.reserve(qty, now)?;
    tx.save_stock(&stock).await?;

    let reservation = Reservation {
        id: Uuid::new_v4(),
        tenant_id: tenant_id.to_string(),
        warehouse_id: key.warehouse_id,
        product_id: key.product_id,
        variant_id: key.variant_id,
        order_id,
        quantity: qty,
        status: ReservationStatus::Active,
        reserved_at: now,
        expires_at,
        released_at: None,
    };
    tx.insert_reservation(&reservation).await?;

    tracing::debug!(
        tenant_id = %tenant_id,
        stock_key = %key,
        reservation_id = %reservation.id,
        order_id = %order_id,
        quantity = qty,
        "Stock reserved"
    );
    Ok(reservation)
}

/// Return a reservation's units to available and mark it released
pub async fn release_reservation(
    tx: &mut dyn InventoryTx,
    tenant_id: &str,
    reservation_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<Reservation> {
    let mut reservation = tx
        .lock_reservation(tenant_id, reservation_id)
        .await?
        .filter(Reservation::is_active)
        .ok_or_else(|| AppError::not_found("Reservation", reservation_id))?;

    let key = reservation.key();
    let mut stock = tx.lock_stock(tenant_id, &key).await?.ok_or_else(|| {
        AppError::Internal(format!(
            "stock level {} missing for reservation {}",
            key, reservation_id
        ))
    })?;
    stock.release(reservation.quantity, now)?;
    tx.save_stock(&stock).await?;

    reservation.mark_released(now);
    tx.save_reservation(&reservation).await?;

    tracing::debug!(
        tenant_id = %tenant_id,
        reservation_id = %reservation_id,
        quantity = reservation.quantity,
        "Reservation released"
    );
    Ok(reservation)
}

/// Take row locks on every key in a fixed order
///
/// Multi-record workflows call this first so two transactions touching the
/// same records always lock them in the same sequence.
pub async fn lock_in_order(
    tx: &mut dyn InventoryTx,
    tenant_id: &str,
    keys: impl IntoIterator<Item = StockKey>,
) -> AppResult<()> {
    let mut keys: Vec<StockKey> = keys.into_iter().collect();
    keys.sort_by_key(|k| (k.warehouse_id, k.product_id, k.variant_id));
    keys.dedup();
    for key in &keys {
        tx.lock_stock(tenant_id, key).await?;
    }
    Ok(())
}

// ============================================================================
// Service
// ============================================================================

/// Reorder settings update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReorderSettings {
    pub reorder_point: Option<i32>,
    pub reorder_quantity: Option<i32>,
}

/// Signed manual correction
#[derive(Debug, Clone, Deserialize)]
pub struct StockAdjustment {
    pub key: StockKey,
    pub delta: i32,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdjustmentResult {
    pub previous_on_hand: i32,
    pub stock: StockRecord,
}

/// Stock level reads and single-record mutations
#[derive(Clone)]
pub struct StockService {
    store: Arc<dyn InventoryStore>,
    cache: Arc<TwoTierCache>,
}

impl StockService {
    pub fn new(store: Arc<dyn InventoryStore>, cache: Arc<TwoTierCache>) -> Self {
        Self { store, cache }
    }

    /// Current level for a triple, creating a zero record on first read
    pub async fn get_stock_level(&self, tenant_id: &str, key: &StockKey) -> AppResult<StockRecord> {
        let cache_key = keys::stock(tenant_id, key);
        if let Some(stock) = self.cache.get_json::<StockRecord>(&cache_key).await {
            return Ok(stock);
        }

        let mut tx = self.store.begin().await?;
        let existing = tx.get_stock(tenant_id, key).await?;
        let stock = match existing {
            Some(stock) => stock,
            None => {
                let stock = tx.lock_or_create_stock(tenant_id, key).await?;
                tx.commit().await?;
                tracing::debug!(tenant_id = %tenant_id, stock_key = %key, "Stock level created on read");
                stock
            }
        };

        self.cache.set_json(&cache_key, &stock, keys::STOCK_TTL).await;
        Ok(stock)
    }

    pub async fn get_stock_by_id(&self, tenant_id: &str, id: Uuid) -> AppResult<StockRecord> {
        let mut tx = self.store.begin().await?;
        let stock = tx.get_stock_by_id(tenant_id, id).await?;
        stock.ok_or_else(|| AppError::not_found("Stock level", id))
    }

    pub async fn list_stock_levels(
        &self,
        tenant_id: &str,
        warehouse_id: Option<Uuid>,
        page: Pagination,
    ) -> AppResult<PaginatedResponse<StockRecord>> {
        let cache_key = keys::stock_list(tenant_id, warehouse_id, page.page, page.per_page);
        if let Some(listing) = self.cache.get_json(&cache_key).await {
            return Ok(listing);
        }

        let filter = StockFilter { warehouse_id };
        let mut tx = self.store.begin().await?;
        let (records, total) = tx.list_stock(tenant_id, &filter, page).await?;
        drop(tx);

        let listing = PaginatedResponse::new(records, page, total);
        self.cache
            .set_json(&cache_key, &listing, keys::STOCK_LIST_TTL)
            .await;
        Ok(listing)
    }

    /// Records at or below their reorder point, lowest available first
    pub async fn low_stock_items(
        &self,
        tenant_id: &str,
        warehouse_id: Option<Uuid>,
    ) -> AppResult<Vec<StockRecord>> {
        let cache_key = keys::low_stock(tenant_id, warehouse_id);
        if let Some(items) = self.cache.get_json(&cache_key).await {
            return Ok(items);
        }

        let mut tx = self.store.begin().await?;
        let items = tx
            .scan_stock(tenant_id, &StockScan::ReorderDue { warehouse_id })
            .await?;
        drop(tx);

        self.cache.set_json(&cache_key, &items, keys::LOW_STOCK_TTL).await;
        Ok(items)
    }

    pub async fn add_stock(&self, tenant_id: &str, key: &StockKey, qty: i32) -> AppResult<StockRecord> {
        let mut tx = self.store.begin().await?;
        let stock = add_stock(tx.as_mut(), tenant_id, key, qty, Utc::now()).await?;
        tx.commit().await?;

        self.cache.invalidate_stock(tenant_id, key).await;
        Ok(stock)
    }

    pub async fn remove_stock(&self, tenant_id: &str, key: &StockKey, qty: i32) -> AppResult<StockRecord> {
        let mut tx = self.store.begin().await?;
        let stock = remove_stock(tx.as_mut(), tenant_id, key, qty, Utc::now()).await?;
        tx.commit().await?;

        self.cache.invalidate_stock(tenant_id, key).await;
        Ok(stock)
    }

    /// Apply a signed correction. Negative deltas follow the removal rules.
    pub async fn adjust_stock(&self, tenant_id: &str, input: StockAdjustment) -> AppResult<AdjustmentResult> {
        validate_adjustment(input.delta).map_err(|message| AppError::validation("delta", message))?;

        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let previous_on_hand = tx
            .lock_stock(tenant_id, &input.key)
            .await?
            .map_or(0, |s| s.quantity_on_hand);

        let stock = if input.delta > 0 {
            add_stock(tx.as_mut(), tenant_id, &input.key, input.delta, now).await?
        } else {
            remove_stock(tx.as_mut(), tenant_id, &input.key, -input.delta, now).await?
        };
        tx.commit().await?;

        tracing::info!(
            tenant_id = %tenant_id,
            stock_key = %input.key,
            delta = input.delta,
            reason = input.reason.as_deref().unwrap_or(""),
            "Stock adjusted"
        );

        self.cache.invalidate_stock(tenant_id, &input.key).await;
        Ok(AdjustmentResult {
            previous_on_hand,
            stock,
        })
    }

    pub async fn update_reorder_settings(
        &self,
        tenant_id: &str,
        key: &StockKey,
        settings: ReorderSettings,
    ) -> AppResult<StockRecord> {
        if let Some(point) = settings.reorder_point {
            validate_non_negative(point).map_err(|m| AppError::validation("reorder_point", m))?;
        }
        if let Some(quantity) = settings.reorder_quantity {
            validate_non_negative(quantity).map_err(|m| AppError::validation("reorder_quantity", m))?;
        }

        let mut tx = self.store.begin().await?;
        let mut stock = tx.lock_or_create_stock(tenant_id, key).await?;
        if let Some(point) = settings.reorder_point {
            stock.reorder_point = point;
        }
        if let Some(quantity) = settings.reorder_quantity {
            stock.reorder_quantity = quantity;
        }
        stock.updated_at = Utc::now();
        tx.save_stock(&stock).await?;
        tx.commit().await?;

        self.cache.invalidate_stock(tenant_id, key).await;
        Ok(stock)
    }
}

/// Expiry for a reservation made at `now`
pub fn reservation_expiry(now: DateTime<Utc>, ttl_secs: i64) -> AppResult<DateTime<Utc>> {
    Duration::try_seconds(ttl_secs.max(1))
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| AppError::validation("ttl_secs", "Reservation lifetime is out of range"))
}
