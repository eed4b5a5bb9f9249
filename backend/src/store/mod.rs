//! Transactional storage for inventory state
//!
//! Every workflow runs inside one [`InventoryTx`] obtained from an
//! [`InventoryStore`]. Committing makes all writes visible at once; dropping
//! the transaction without committing discards them. Stock rows read through
//! `lock_*` stay locked against concurrent writers until the transaction ends.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{
    AlertPriority, AlertStatus, AlertSummary, AlertThreshold, AlertType, InventoryAlert,
    Pagination, PurchaseOrder, PurchaseOrderStatus, Reservation, StockKey, StockRecord, Supplier,
    SupplierStatus, Transfer, TransferStatus, Warehouse, WarehouseStatus,
};
use uuid::Uuid;

use crate::error::AppResult;

/// Filter for paginated stock listings
#[derive(Debug, Clone, Default)]
pub struct StockFilter {
    pub warehouse_id: Option<Uuid>,
}

/// Unpaginated stock scans used by alerting and low-stock reports
#[derive(Debug, Clone, PartialEq)]
pub enum StockScan {
    /// Records whose available quantity is at or below `max_available`,
    /// narrowed by whichever scopes are set
    AtOrBelow {
        max_available: i32,
        warehouse_id: Option<Uuid>,
        product_id: Option<Uuid>,
        variant_id: Option<Uuid>,
    },
    /// Records with a reorder point configured and available at or below it
    ReorderDue { warehouse_id: Option<Uuid> },
}

impl StockScan {
    pub fn matches(&self, stock: &StockRecord) -> bool {
        match self {
            StockScan::AtOrBelow {
                max_available,
                warehouse_id,
                product_id,
                variant_id,
            } => {
                stock.quantity_available <= *max_available
                    && warehouse_id.map_or(true, |id| id == stock.warehouse_id)
                    && product_id.map_or(true, |id| id == stock.product_id)
                    && variant_id.map_or(true, |id| Some(id) == stock.variant_id)
            }
            StockScan::ReorderDue { warehouse_id } => {
                stock.needs_reorder() && warehouse_id.map_or(true, |id| id == stock.warehouse_id)
            }
        }
    }
}

/// Filter for alert listings
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub status: Option<AlertStatus>,
    pub alert_type: Option<AlertType>,
    pub priority: Option<AlertPriority>,
    pub warehouse_id: Option<Uuid>,
}

impl AlertFilter {
    pub fn matches(&self, alert: &InventoryAlert) -> bool {
        self.status.map_or(true, |s| s == alert.status)
            && self.alert_type.map_or(true, |t| t == alert.alert_type)
            && self.priority.map_or(true, |p| p == alert.priority)
            && self.warehouse_id.map_or(true, |id| Some(id) == alert.warehouse_id)
    }
}

/// Filter for threshold listings. Scope filters also match unscoped thresholds.
#[derive(Debug, Clone, Default)]
pub struct ThresholdFilter {
    pub warehouse_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub alert_type: Option<AlertType>,
    pub enabled_only: bool,
}

impl ThresholdFilter {
    /// Enabled thresholds of one type, any scope
    pub fn enabled_of_type(alert_type: AlertType) -> Self {
        Self {
            alert_type: Some(alert_type),
            enabled_only: true,
            ..Default::default()
        }
    }

    pub fn matches(&self, threshold: &AlertThreshold) -> bool {
        let scope_ok = |filter: Option<Uuid>, value: Option<Uuid>| match (filter, value) {
            (Some(f), Some(v)) => f == v,
            _ => true,
        };
        scope_ok(self.warehouse_id, threshold.warehouse_id)
            && scope_ok(self.product_id, threshold.product_id)
            && self.alert_type.map_or(true, |t| t == threshold.alert_type)
            && (!self.enabled_only || threshold.is_enabled)
    }
}

/// A backing store able to open transactions
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn InventoryTx>>;

    /// Connectivity check for health reporting
    async fn ping(&self) -> AppResult<()>;

    /// Tenants that own stock or reservations, for background sweeps
    async fn known_tenants(&self) -> AppResult<Vec<String>>;
}

/// One unit of work. Nothing is visible to other transactions until `commit`.
#[async_trait]
pub trait InventoryTx: Send {
    // Stock levels
    async fn get_stock(&mut self, tenant_id: &str, key: &StockKey)
        -> AppResult<Option<StockRecord>>;
    async fn get_stock_by_id(&mut self, tenant_id: &str, id: Uuid)
        -> AppResult<Option<StockRecord>>;
    /// Read the record and hold its row lock until the transaction ends
    async fn lock_stock(&mut self, tenant_id: &str, key: &StockKey)
        -> AppResult<Option<StockRecord>>;
    /// Lock the record, creating a zero-valued one first if absent
    async fn lock_or_create_stock(&mut self, tenant_id: &str, key: &StockKey)
        -> AppResult<StockRecord>;
    async fn save_stock(&mut self, stock: &StockRecord) -> AppResult<()>;
    async fn list_stock(
        &mut self,
        tenant_id: &str,
        filter: &StockFilter,
        page: Pagination,
    ) -> AppResult<(Vec<StockRecord>, u64)>;
    async fn scan_stock(&mut self, tenant_id: &str, scan: &StockScan)
        -> AppResult<Vec<StockRecord>>;

    // Reservations
    async fn insert_reservation(&mut self, reservation: &Reservation) -> AppResult<()>;
    async fn get_reservation(&mut self, tenant_id: &str, id: Uuid)
        -> AppResult<Option<Reservation>>;
    async fn lock_reservation(&mut self, tenant_id: &str, id: Uuid)
        -> AppResult<Option<Reservation>>;
    async fn save_reservation(&mut self, reservation: &Reservation) -> AppResult<()>;
    async fn expired_reservations(
        &mut self,
        tenant_id: &str,
        now: DateTime<Utc>,
        limit: i64,
    ) -> AppResult<Vec<Uuid>>;
    async fn reservations_for_order(&mut self, tenant_id: &str, order_id: Uuid)
        -> AppResult<Vec<Reservation>>;

    // Warehouses
    async fn insert_warehouse(&mut self, warehouse: &Warehouse) -> AppResult<()>;
    async fn get_warehouse(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<Warehouse>>;
    async fn list_warehouses(
        &mut self,
        tenant_id: &str,
        status: Option<WarehouseStatus>,
        page: Pagination,
    ) -> AppResult<(Vec<Warehouse>, u64)>;
    async fn save_warehouse(&mut self, warehouse: &Warehouse) -> AppResult<()>;

    // Suppliers
    async fn insert_supplier(&mut self, supplier: &Supplier) -> AppResult<()>;
    async fn get_supplier(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<Supplier>>;
    async fn lock_supplier(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<Supplier>>;
    async fn list_suppliers(
        &mut self,
        tenant_id: &str,
        status: Option<SupplierStatus>,
        page: Pagination,
    ) -> AppResult<(Vec<Supplier>, u64)>;
    async fn save_supplier(&mut self, supplier: &Supplier) -> AppResult<()>;

    /// Next value of a per-tenant counter, starting at 1
    async fn next_sequence(&mut self, tenant_id: &str, name: &str) -> AppResult<i64>;

    // Purchase orders (header + items)
    async fn insert_purchase_order(&mut self, order: &PurchaseOrder) -> AppResult<()>;
    async fn get_purchase_order(&mut self, tenant_id: &str, id: Uuid)
        -> AppResult<Option<PurchaseOrder>>;
    async fn lock_purchase_order(&mut self, tenant_id: &str, id: Uuid)
        -> AppResult<Option<PurchaseOrder>>;
    async fn list_purchase_orders(
        &mut self,
        tenant_id: &str,
        status: Option<PurchaseOrderStatus>,
        page: Pagination,
    ) -> AppResult<(Vec<PurchaseOrder>, u64)>;
    /// Persist header fields and item received quantities
    async fn save_purchase_order(&mut self, order: &PurchaseOrder) -> AppResult<()>;

    // Transfers (header + items)
    async fn insert_transfer(&mut self, transfer: &Transfer) -> AppResult<()>;
    async fn get_transfer(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<Transfer>>;
    async fn lock_transfer(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<Transfer>>;
    async fn list_transfers(
        &mut self,
        tenant_id: &str,
        status: Option<TransferStatus>,
        page: Pagination,
    ) -> AppResult<(Vec<Transfer>, u64)>;
    /// Persist header fields and item shipped/received quantities
    async fn save_transfer(&mut self, transfer: &Transfer) -> AppResult<()>;

    // Alert thresholds
    async fn insert_threshold(&mut self, threshold: &AlertThreshold) -> AppResult<()>;
    async fn get_threshold(&mut self, tenant_id: &str, id: Uuid)
        -> AppResult<Option<AlertThreshold>>;
    async fn list_thresholds(&mut self, tenant_id: &str, filter: &ThresholdFilter)
        -> AppResult<Vec<AlertThreshold>>;
    async fn save_threshold(&mut self, threshold: &AlertThreshold) -> AppResult<()>;
    async fn delete_threshold(&mut self, tenant_id: &str, id: Uuid) -> AppResult<bool>;

    // Alerts
    /// Insert unless an ACTIVE alert with the same (product, warehouse, type)
    /// exists. Returns whether the row was written.
    async fn insert_alert(&mut self, alert: &InventoryAlert) -> AppResult<bool>;
    async fn active_alert_exists(
        &mut self,
        tenant_id: &str,
        product_id: Uuid,
        warehouse_id: Option<Uuid>,
        alert_type: AlertType,
    ) -> AppResult<bool>;
    async fn get_alert(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<InventoryAlert>>;
    async fn list_alerts(
        &mut self,
        tenant_id: &str,
        filter: &AlertFilter,
        page: Pagination,
    ) -> AppResult<(Vec<InventoryAlert>, u64)>;
    async fn save_alert(&mut self, alert: &InventoryAlert) -> AppResult<()>;
    /// Resolve every ACTIVE alert for the product, optionally at one warehouse
    async fn resolve_active_alerts(
        &mut self,
        tenant_id: &str,
        product_id: Uuid,
        warehouse_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> AppResult<u64>;
    async fn alert_summary(&mut self, tenant_id: &str) -> AppResult<AlertSummary>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}
