//! In-process store
//!
//! A transaction takes exclusive ownership of the state for its whole
//! lifetime and works on a copy, so transactions are serializable and a
//! dropped transaction leaves no trace. Do not open a second transaction
//! from a task that already holds one.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{
    AlertStatus, AlertSummary, AlertThreshold, AlertType, InventoryAlert, Pagination,
    PurchaseOrder, PurchaseOrderStatus, Reservation, StockKey, StockRecord, Supplier,
    SupplierStatus, Transfer, TransferStatus, Warehouse, WarehouseStatus,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{AlertFilter, InventoryStore, InventoryTx, StockFilter, StockScan, ThresholdFilter};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    stock: HashMap<Uuid, StockRecord>,
    stock_index: HashMap<(String, StockKey), Uuid>,
    reservations: HashMap<Uuid, Reservation>,
    warehouses: HashMap<Uuid, Warehouse>,
    suppliers: HashMap<Uuid, Supplier>,
    sequences: HashMap<(String, String), i64>,
    purchase_orders: HashMap<Uuid, PurchaseOrder>,
    transfers: HashMap<Uuid, Transfer>,
    thresholds: HashMap<Uuid, AlertThreshold>,
    alerts: HashMap<Uuid, InventoryAlert>,
}

/// Store backed by process memory
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn InventoryTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn known_tenants(&self) -> AppResult<Vec<String>> {
        let state = self.state.lock().await;
        let mut tenants: Vec<String> = state
            .stock
            .values()
            .map(|s| s.tenant_id.clone())
            .chain(state.reservations.values().map(|r| r.tenant_id.clone()))
            .collect();
        tenants.sort();
        tenants.dedup();
        Ok(tenants)
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

fn paginate<T>(items: Vec<T>, page: Pagination) -> (Vec<T>, u64) {
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect();
    (items, total)
}

fn owned<T: Clone>(
    map: &HashMap<Uuid, T>,
    id: Uuid,
    tenant_id: &str,
    tenant_of: impl Fn(&T) -> &str,
) -> Option<T> {
    map.get(&id).filter(|v| tenant_of(v) == tenant_id).cloned()
}

fn conflict(resource: &str, message: String) -> AppError {
    AppError::Conflict {
        resource: resource.to_string(),
        message,
    }
}

#[async_trait]
impl InventoryTx for MemoryTx {
    async fn get_stock(&mut self, tenant_id: &str, key: &StockKey) -> AppResult<Option<StockRecord>> {
        Ok(self
            .working
            .stock_index
            .get(&(tenant_id.to_string(), *key))
            .and_then(|id| self.working.stock.get(id))
            .cloned())
    }

    async fn get_stock_by_id(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<StockRecord>> {
        Ok(owned(&self.working.stock, id, tenant_id, |s| s.tenant_id.as_str()))
    }

    async fn lock_stock(&mut self, tenant_id: &str, key: &StockKey) -> AppResult<Option<StockRecord>> {
        self.get_stock(tenant_id, key).await
    }

    async fn lock_or_create_stock(&mut self, tenant_id: &str, key: &StockKey) -> AppResult<StockRecord> {
        if let Some(stock) = self.get_stock(tenant_id, key).await? {
            return Ok(stock);
        }
        let stock = StockRecord::empty(tenant_id, key, Utc::now());
        self.working
            .stock_index
            .insert((tenant_id.to_string(), *key), stock.id);
        self.working.stock.insert(stock.id, stock.clone());
        Ok(stock)
    }

    async fn save_stock(&mut self, stock: &StockRecord) -> AppResult<()> {
        if !stock.is_consistent() {
            return Err(AppError::Internal(format!(
                "refusing to persist inconsistent stock record {}",
                stock.id
            )));
        }
        match self.working.stock.get_mut(&stock.id) {
            Some(existing) => {
                *existing = stock.clone();
                Ok(())
            }
            None => Err(AppError::not_found("Stock level", stock.id)),
        }
    }

    async fn list_stock(
        &mut self,
        tenant_id: &str,
        filter: &StockFilter,
        page: Pagination,
    ) -> AppResult<(Vec<StockRecord>, u64)> {
        let mut items: Vec<StockRecord> = self
            .working
            .stock
            .values()
            .filter(|s| s.tenant_id == tenant_id)
            .filter(|s| filter.warehouse_id.map_or(true, |id| id == s.warehouse_id))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
        Ok(paginate(items, page))
    }

    async fn scan_stock(&mut self, tenant_id: &str, scan: &StockScan) -> AppResult<Vec<StockRecord>> {
        let mut items: Vec<StockRecord> = self
            .working
            .stock
            .values()
            .filter(|s| s.tenant_id == tenant_id && scan.matches(s))
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            a.quantity_available
                .cmp(&b.quantity_available)
                .then(a.id.cmp(&b.id))
        });
        Ok(items)
    }

    async fn insert_reservation(&mut self, reservation: &Reservation) -> AppResult<()> {
        self.working
            .reservations
            .insert(reservation.id, reservation.clone());
        Ok(())
    }

    async fn get_reservation(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<Reservation>> {
        Ok(owned(&self.working.reservations, id, tenant_id, |r| r.tenant_id.as_str()))
    }

    async fn lock_reservation(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<Reservation>> {
        self.get_reservation(tenant_id, id).await
    }

    async fn save_reservation(&mut self, reservation: &Reservation) -> AppResult<()> {
        self.working
            .reservations
            .insert(reservation.id, reservation.clone());
        Ok(())
    }

    async fn expired_reservations(
        &mut self,
        tenant_id: &str,
        now: DateTime<Utc>,
        limit: i64,
    ) -> AppResult<Vec<Uuid>> {
        let mut expired: Vec<&Reservation> = self
            .working
            .reservations
            .values()
            .filter(|r| r.tenant_id == tenant_id && r.is_expired(now))
            .collect();
        expired.sort_by_key(|r| r.expires_at);
        Ok(expired
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(0))
            .map(|r| r.id)
            .collect())
    }

    async fn reservations_for_order(&mut self, tenant_id: &str, order_id: Uuid) -> AppResult<Vec<Reservation>> {
        let mut items: Vec<Reservation> = self
            .working
            .reservations
            .values()
            .filter(|r| r.tenant_id == tenant_id && r.order_id == order_id)
            .cloned()
            .collect();
        items.sort_by_key(|r| r.reserved_at);
        Ok(items)
    }

    async fn insert_warehouse(&mut self, warehouse: &Warehouse) -> AppResult<()> {
        let duplicate = self.working.warehouses.values().any(|w| {
            w.tenant_id == warehouse.tenant_id && w.code == warehouse.code && !w.is_deleted()
        });
        if duplicate {
            return Err(conflict(
                "code",
                format!("Warehouse code {} already exists", warehouse.code),
            ));
        }
        self.working
            .warehouses
            .insert(warehouse.id, warehouse.clone());
        Ok(())
    }

    async fn get_warehouse(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<Warehouse>> {
        Ok(owned(&self.working.warehouses, id, tenant_id, |w| w.tenant_id.as_str())
            .filter(|w| !w.is_deleted()))
    }

    async fn list_warehouses(
        &mut self,
        tenant_id: &str,
        status: Option<WarehouseStatus>,
        page: Pagination,
    ) -> AppResult<(Vec<Warehouse>, u64)> {
        let mut items: Vec<Warehouse> = self
            .working
            .warehouses
            .values()
            .filter(|w| w.tenant_id == tenant_id && !w.is_deleted())
            .filter(|w| status.map_or(true, |s| s == w.status))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.name.cmp(&b.name)));
        Ok(paginate(items, page))
    }

    async fn save_warehouse(&mut self, warehouse: &Warehouse) -> AppResult<()> {
        self.working
            .warehouses
            .insert(warehouse.id, warehouse.clone());
        Ok(())
    }

    async fn insert_supplier(&mut self, supplier: &Supplier) -> AppResult<()> {
        let duplicate = self.working.suppliers.values().any(|s| {
            s.tenant_id == supplier.tenant_id && s.code == supplier.code && s.deleted_at.is_none()
        });
        if duplicate {
            return Err(conflict(
                "code",
                format!("Supplier code {} already exists", supplier.code),
            ));
        }
        self.working.suppliers.insert(supplier.id, supplier.clone());
        Ok(())
    }

    async fn get_supplier(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<Supplier>> {
        Ok(owned(&self.working.suppliers, id, tenant_id, |s| s.tenant_id.as_str())
            .filter(|s| s.deleted_at.is_none()))
    }

    async fn lock_supplier(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<Supplier>> {
        self.get_supplier(tenant_id, id).await
    }

    async fn list_suppliers(
        &mut self,
        tenant_id: &str,
        status: Option<SupplierStatus>,
        page: Pagination,
    ) -> AppResult<(Vec<Supplier>, u64)> {
        let mut items: Vec<Supplier> = self
            .working
            .suppliers
            .values()
            .filter(|s| s.tenant_id == tenant_id && s.deleted_at.is_none())
            .filter(|s| status.map_or(true, |st| st == s.status))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(paginate(items, page))
    }

    async fn save_supplier(&mut self, supplier: &Supplier) -> AppResult<()> {
        self.working.suppliers.insert(supplier.id, supplier.clone());
        Ok(())
    }

    async fn next_sequence(&mut self, tenant_id: &str, name: &str) -> AppResult<i64> {
        let value = self
            .working
            .sequences
            .entry((tenant_id.to_string(), name.to_string()))
            .or_insert(0);
        *value += 1;
        Ok(*value)
    }

    async fn insert_purchase_order(&mut self, order: &PurchaseOrder) -> AppResult<()> {
        self.working
            .purchase_orders
            .insert(order.id, order.clone());
        Ok(())
    }

    async fn get_purchase_order(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<PurchaseOrder>> {
        Ok(owned(&self.working.purchase_orders, id, tenant_id, |o| o.tenant_id.as_str())
            .filter(|o| o.deleted_at.is_none()))
    }

    async fn lock_purchase_order(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<PurchaseOrder>> {
        self.get_purchase_order(tenant_id, id).await
    }

    async fn list_purchase_orders(
        &mut self,
        tenant_id: &str,
        status: Option<PurchaseOrderStatus>,
        page: Pagination,
    ) -> AppResult<(Vec<PurchaseOrder>, u64)> {
        let mut items: Vec<PurchaseOrder> = self
            .working
            .purchase_orders
            .values()
            .filter(|o| o.tenant_id == tenant_id && o.deleted_at.is_none())
            .filter(|o| status.map_or(true, |s| s == o.status))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.po_number.cmp(&a.po_number)));
        Ok(paginate(items, page))
    }

    async fn save_purchase_order(&mut self, order: &PurchaseOrder) -> AppResult<()> {
        self.working
            .purchase_orders
            .insert(order.id, order.clone());
        Ok(())
    }

    async fn insert_transfer(&mut self, transfer: &Transfer) -> AppResult<()> {
        self.working.transfers.insert(transfer.id, transfer.clone());
        Ok(())
    }

    async fn get_transfer(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<Transfer>> {
        Ok(owned(&self.working.transfers, id, tenant_id, |t| t.tenant_id.as_str())
            .filter(|t| t.deleted_at.is_none()))
    }

    async fn lock_transfer(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<Transfer>> {
        self.get_transfer(tenant_id, id).await
    }

    async fn list_transfers(
        &mut self,
        tenant_id: &str,
        status: Option<TransferStatus>,
        page: Pagination,
    ) -> AppResult<(Vec<Transfer>, u64)> {
        let mut items: Vec<Transfer> = self
            .working
            .transfers
            .values()
            .filter(|t| t.tenant_id == tenant_id && t.deleted_at.is_none())
            .filter(|t| status.map_or(true, |s| s == t.status))
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.transfer_number.cmp(&a.transfer_number))
        });
        Ok(paginate(items, page))
    }

    async fn save_transfer(&mut self, transfer: &Transfer) -> AppResult<()> {
        self.working.transfers.insert(transfer.id, transfer.clone());
        Ok(())
    }

    async fn insert_threshold(&mut self, threshold: &AlertThreshold) -> AppResult<()> {
        self.working
            .thresholds
            .insert(threshold.id, threshold.clone());
        Ok(())
    }

    async fn get_threshold(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<AlertThreshold>> {
        Ok(owned(&self.working.thresholds, id, tenant_id, |t| t.tenant_id.as_str()))
    }

    async fn list_thresholds(
        &mut self,
        tenant_id: &str,
        filter: &ThresholdFilter,
    ) -> AppResult<Vec<AlertThreshold>> {
        let mut items: Vec<AlertThreshold> = self
            .working
            .thresholds
            .values()
            .filter(|t| t.tenant_id == tenant_id && filter.matches(t))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn save_threshold(&mut self, threshold: &AlertThreshold) -> AppResult<()> {
        self.working
            .thresholds
            .insert(threshold.id, threshold.clone());
        Ok(())
    }

    async fn delete_threshold(&mut self, tenant_id: &str, id: Uuid) -> AppResult<bool> {
        if owned(&self.working.thresholds, id, tenant_id, |t| t.tenant_id.as_str()).is_none() {
            return Ok(false);
        }
        Ok(self.working.thresholds.remove(&id).is_some())
    }

    async fn insert_alert(&mut self, alert: &InventoryAlert) -> AppResult<bool> {
        if alert.status == AlertStatus::Active
            && self
                .active_alert_exists(
                    &alert.tenant_id,
                    alert.product_id,
                    alert.warehouse_id,
                    alert.alert_type,
                )
                .await?
        {
            return Ok(false);
        }
        self.working.alerts.insert(alert.id, alert.clone());
        Ok(true)
    }

    async fn active_alert_exists(
        &mut self,
        tenant_id: &str,
        product_id: Uuid,
        warehouse_id: Option<Uuid>,
        alert_type: AlertType,
    ) -> AppResult<bool> {
        Ok(self.working.alerts.values().any(|a| {
            a.tenant_id == tenant_id
                && a.product_id == product_id
                && a.warehouse_id == warehouse_id
                && a.alert_type == alert_type
                && a.status == AlertStatus::Active
        }))
    }

    async fn get_alert(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<InventoryAlert>> {
        Ok(owned(&self.working.alerts, id, tenant_id, |a| a.tenant_id.as_str()))
    }

    async fn list_alerts(
        &mut self,
        tenant_id: &str,
        filter: &AlertFilter,
        page: Pagination,
    ) -> AppResult<(Vec<InventoryAlert>, u64)> {
        let mut items: Vec<InventoryAlert> = self
            .working
            .alerts
            .values()
            .filter(|a| a.tenant_id == tenant_id && filter.matches(a))
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(b.created_at.cmp(&a.created_at))
                .then(a.id.cmp(&b.id))
        });
        Ok(paginate(items, page))
    }

    async fn save_alert(&mut self, alert: &InventoryAlert) -> AppResult<()> {
        self.working.alerts.insert(alert.id, alert.clone());
        Ok(())
    }

    async fn resolve_active_alerts(
        &mut self,
        tenant_id: &str,
        product_id: Uuid,
        warehouse_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let mut resolved = 0;
        for alert in self.working.alerts.values_mut() {
            if alert.tenant_id == tenant_id
                && alert.product_id == product_id
                && alert.status == AlertStatus::Active
                && warehouse_id.map_or(true, |id| Some(id) == alert.warehouse_id)
            {
                alert.status = AlertStatus::Resolved;
                alert.resolved_at = Some(now);
                alert.updated_at = now;
                resolved += 1;
            }
        }
        Ok(resolved)
    }

    async fn alert_summary(&mut self, tenant_id: &str) -> AppResult<AlertSummary> {
        let mut summary = AlertSummary::default();
        for alert in self.working.alerts.values().filter(|a| a.tenant_id == tenant_id) {
            match alert.status {
                AlertStatus::Active => {
                    summary.total_active += 1;
                    *summary
                        .by_type
                        .entry(alert.alert_type.as_str().to_string())
                        .or_insert(0) += 1;
                    *summary
                        .by_priority
                        .entry(alert.priority.as_str().to_string())
                        .or_insert(0) += 1;
                }
                AlertStatus::Resolved => summary.total_resolved += 1,
                _ => {}
            }
        }
        Ok(summary)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
