//! Store wrapper that fails selected operations
//!
//! Delegates everything to an inner store except stock scans scoped to one
//! warehouse, which fail with a storage error.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inventory_service::error::{AppError, AppResult};
use inventory_service::store::{
    AlertFilter, InventoryStore, InventoryTx, StockFilter, StockScan, ThresholdFilter,
};
use shared::{
    AlertSummary, AlertThreshold, AlertType, InventoryAlert, Pagination, PurchaseOrder,
    PurchaseOrderStatus, Reservation, StockKey, StockRecord, Supplier, SupplierStatus, Transfer,
    TransferStatus, Warehouse, WarehouseStatus,
};
use uuid::Uuid;

pub struct ChaosStore {
    inner: Arc<dyn InventoryStore>,
    failing_warehouse: Uuid,
}

impl ChaosStore {
    pub fn failing_scans_at(inner: Arc<dyn InventoryStore>, failing_warehouse: Uuid) -> Self {
        Self {
            inner,
            failing_warehouse,
        }
    }
}

#[async_trait]
impl InventoryStore for ChaosStore {
    async fn begin(&self) -> AppResult<Box<dyn InventoryTx>> {
        Ok(Box::new(ChaosTx {
            inner: self.inner.begin().await?,
            failing_warehouse: self.failing_warehouse,
        }))
    }

    async fn ping(&self) -> AppResult<()> {
        self.inner.ping().await
    }

    async fn known_tenants(&self) -> AppResult<Vec<String>> {
        self.inner.known_tenants().await
    }
}

struct ChaosTx {
    inner: Box<dyn InventoryTx>,
    failing_warehouse: Uuid,
}

#[async_trait]
impl InventoryTx for ChaosTx {
    async fn get_stock(&mut self, tenant_id: &str, key: &StockKey) -> AppResult<Option<StockRecord>> {
        self.inner.get_stock(tenant_id, key).await
    }

    async fn get_stock_by_id(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<StockRecord>> {
        self.inner.get_stock_by_id(tenant_id, id).await
    }

    async fn lock_stock(&mut self, tenant_id: &str, key: &StockKey) -> AppResult<Option<StockRecord>> {
        self.inner.lock_stock(tenant_id, key).await
    }

    async fn lock_or_create_stock(&mut self, tenant_id: &str, key: &StockKey) -> AppResult<StockRecord> {
        self.inner.lock_or_create_stock(tenant_id, key).await
    }

    async fn save_stock(&mut self, stock: &StockRecord) -> AppResult<()> {
        self.inner.save_stock(stock).await
    }

    async fn list_stock(
        &mut self,
        tenant_id: &str,
        filter: &StockFilter,
        page: Pagination,
    ) -> AppResult<(Vec<StockRecord>, u64)> {
        self.inner.list_stock(tenant_id, filter, page).await
    }

    async fn scan_stock(&mut self, tenant_id: &str, scan: &StockScan) -> AppResult<Vec<StockRecord>> {
        if let StockScan::AtOrBelow {
            warehouse_id: Some(warehouse_id),
            ..
        } = scan
        {
            if *warehouse_id == self.failing_warehouse {
                return Err(AppError::Internal("stock scan unavailable".into()));
            }
        }
        self.inner.scan_stock(tenant_id, scan).await
    }

    async fn insert_reservation(&mut self, reservation: &Reservation) -> AppResult<()> {
        self.inner.insert_reservation(reservation).await
    }

    async fn get_reservation(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<Reservation>> {
        self.inner.get_reservation(tenant_id, id).await
    }

    async fn lock_reservation(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<Reservation>> {
        self.inner.lock_reservation(tenant_id, id).await
    }

    async fn save_reservation(&mut self, reservation: &Reservation) -> AppResult<()> {
        self.inner.save_reservation(reservation).await
    }

    async fn expired_reservations(
        &mut self,
        tenant_id: &str,
        now: DateTime<Utc>,
        limit: i64,
    ) -> AppResult<Vec<Uuid>> {
        self.inner.expired_reservations(tenant_id, now, limit).await
    }

    async fn reservations_for_order(&mut self, tenant_id: &str, order_id: Uuid) -> AppResult<Vec<Reservation>> {
        self.inner.reservations_for_order(tenant_id, order_id).await
    }

    async fn insert_warehouse(&mut self, warehouse: &Warehouse) -> AppResult<()> {
        self.inner.insert_warehouse(warehouse).await
    }

    async fn get_warehouse(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<Warehouse>> {
        self.inner.get_warehouse(tenant_id, id).await
    }

    async fn list_warehouses(
        &mut self,
        tenant_id: &str,
        status: Option<WarehouseStatus>,
        page: Pagination,
    ) -> AppResult<(Vec<Warehouse>, u64)> {
        self.inner.list_warehouses(tenant_id, status, page).await
    }

    async fn save_warehouse(&mut self, warehouse: &Warehouse) -> AppResult<()> {
        self.inner.save_warehouse(warehouse).await
    }

    async fn insert_supplier(&mut self, supplier: &Supplier) -> AppResult<()> {
        self.inner.insert_supplier(supplier).await
    }

    async fn get_supplier(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<Supplier>> {
        self.inner.get_supplier(tenant_id, id).await
    }

    async fn lock_supplier(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<Supplier>> {
        self.inner.lock_supplier(tenant_id, id).await
    }

    async fn list_suppliers(
        &mut self,
        tenant_id: &str,
        status: Option<SupplierStatus>,
        page: Pagination,
    ) -> AppResult<(Vec<Supplier>, u64)> {
        self.inner.list_suppliers(tenant_id, status, page).await
    }

    async fn save_supplier(&mut self, supplier: &Supplier) -> AppResult<()> {
        self.inner.save_supplier(supplier).await
    }

    async fn next_sequence(&mut self, tenant_id: &str, name: &str) -> AppResult<i64> {
        self.inner.next_sequence(tenant_id, name).await
    }

    async fn insert_purchase_order(&mut self, order: &PurchaseOrder) -> AppResult<()> {
        self.inner.insert_purchase_order(order).await
    }

    async fn get_purchase_order(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<PurchaseOrder>> {
        self.inner.get_purchase_order(tenant_id, id).await
    }

    async fn lock_purchase_order(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<PurchaseOrder>> {
        self.inner.lock_purchase_order(tenant_id, id).await
    }

    async fn list_purchase_orders(
        &mut self,
        tenant_id: &str,
        status: Option<PurchaseOrderStatus>,
        page: Pagination,
    ) -> AppResult<(Vec<PurchaseOrder>, u64)> {
        self.inner.list_purchase_orders(tenant_id, status, page).await
    }

    async fn save_purchase_order(&mut self, order: &PurchaseOrder) -> AppResult<()> {
        self.inner.save_purchase_order(order).await
    }

    async fn insert_transfer(&mut self, transfer: &Transfer) -> AppResult<()> {
        self.inner.insert_transfer(transfer).await
    }

    async fn get_transfer(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<Transfer>> {
        self.inner.get_transfer(tenant_id, id).await
    }

    async fn lock_transfer(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<Transfer>> {
        self.inner.lock_transfer(tenant_id, id).await
    }

    async fn list_transfers(
        &mut self,
        tenant_id: &str,
        status: Option<TransferStatus>,
        page: Pagination,
    ) -> AppResult<(Vec<Transfer>, u64)> {
        self.inner.list_transfers(tenant_id, status, page).await
    }

    async fn save_transfer(&mut self, transfer: &Transfer) -> AppResult<()> {
        self.inner.save_transfer(transfer).await
    }

    async fn insert_threshold(&mut self, threshold: &AlertThreshold) -> AppResult<()> {
        self.inner.insert_threshold(threshold).await
    }

    async fn get_threshold(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<AlertThreshold>> {
        self.inner.get_threshold(tenant_id, id).await
    }

    async fn list_thresholds(&mut self, tenant_id: &str, filter: &ThresholdFilter) -> AppResult<Vec<AlertThreshold>> {
        self.inner.list_thresholds(tenant_id, filter).await
    }

    async fn save_threshold(&mut self, threshold: &AlertThreshold) -> AppResult<()> {
        self.inner.save_threshold(threshold).await
    }

    async fn delete_threshold(&mut self, tenant_id: &str, id: Uuid) -> AppResult<bool> {
        self.inner.delete_threshold(tenant_id, id).await
    }

    async fn insert_alert(&mut self, alert: &InventoryAlert) -> AppResult<bool> {
        self.inner.insert_alert(alert).await
    }

    async fn active_alert_exists(
        &mut self,
        tenant_id: &str,
        product_id: Uuid,
        warehouse_id: Option<Uuid>,
        alert_type: AlertType,
    ) -> AppResult<bool> {
        self.inner
            .active_alert_exists(tenant_id, product_id, warehouse_id, alert_type)
            .await
    }

    async fn get_alert(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<InventoryAlert>> {
        self.inner.get_alert(tenant_id, id).await
    }

    async fn list_alerts(
        &mut self,
        tenant_id: &str,
        filter: &AlertFilter,
        page: Pagination,
    ) -> AppResult<(Vec<InventoryAlert>, u64)> {
        self.inner.list_alerts(tenant_id, filter, page).await
    }

    async fn save_alert(&mut self, alert: &InventoryAlert) -> AppResult<()> {
        self.inner.save_alert(alert).await
    }

    async fn resolve_active_alerts(
        &mut self,
        tenant_id: &str,
        product_id: Uuid,
        warehouse_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        self.inner
            .resolve_active_alerts(tenant_id, product_id, warehouse_id, now)
            .await
    }

    async fn alert_summary(&mut self, tenant_id: &str) -> AppResult<AlertSummary> {
        self.inner.alert_summary(tenant_id).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.inner.commit().await
    }
}
