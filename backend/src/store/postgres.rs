//! PostgreSQL store
//!
//! Stock rows are read with `SELECT ... FOR UPDATE` inside the ambient
//! transaction, so concurrent mutations of one record serialize on its row
//! lock. Missing records are created with `INSERT ... ON CONFLICT DO NOTHING`
//! and then locked, which is safe when two transactions race to create one.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{
    AlertPriority, AlertStatus, AlertSummary, AlertThreshold, AlertType, InventoryAlert,
    Pagination, PurchaseOrder, PurchaseOrderItem, PurchaseOrderStatus, Reservation,
    ReservationStatus, StockKey, StockRecord, Supplier, SupplierStatus, Transfer, TransferItem,
    TransferStatus, Warehouse, WarehouseStatus,
};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{AlertFilter, InventoryStore, InventoryTx, StockFilter, StockScan, ThresholdFilter};
use crate::error::{AppError, AppResult};

const STOCK_COLUMNS: &str = "id, tenant_id, warehouse_id, product_id, variant_id, \
    quantity_on_hand, quantity_reserved, quantity_available, reorder_point, reorder_quantity, \
    last_restocked_at, created_at, updated_at";

const RESERVATION_COLUMNS: &str = "id, tenant_id, warehouse_id, product_id, variant_id, \
    order_id, quantity, status, reserved_at, expires_at, released_at";

const WAREHOUSE_COLUMNS: &str = "id, tenant_id, code, name, status, address1, city, state, \
    postal_code, country, phone, email, manager_name, is_default, priority, created_at, \
    updated_at, deleted_at";

const SUPPLIER_COLUMNS: &str = "id, tenant_id, code, name, status, contact_name, email, phone, \
    payment_terms, lead_time_days, total_orders, total_spent, created_at, updated_at, deleted_at";

const PURCHASE_ORDER_COLUMNS: &str = "id, tenant_id, po_number, status, supplier_id, \
    warehouse_id, order_date, expected_date, received_date, subtotal, tax, shipping, total, \
    currency_code, notes, created_at, updated_at, deleted_at";

const PURCHASE_ORDER_ITEM_COLUMNS: &str = "id, purchase_order_id, product_id, variant_id, \
    quantity_ordered, quantity_received, unit_cost, subtotal, notes";

const TRANSFER_COLUMNS: &str = "id, tenant_id, transfer_number, status, from_warehouse_id, \
    to_warehouse_id, requested_by, requested_at, shipped_at, completed_at, notes, created_at, \
    updated_at, deleted_at";

const TRANSFER_ITEM_COLUMNS: &str = "id, transfer_id, product_id, variant_id, \
    quantity_requested, quantity_shipped, quantity_received, notes";

const THRESHOLD_COLUMNS: &str = "id, tenant_id, warehouse_id, product_id, variant_id, \
    alert_type, threshold_quantity, priority, is_enabled, created_at, updated_at";

const ALERT_COLUMNS: &str = "id, tenant_id, warehouse_id, product_id, variant_id, alert_type, \
    status, priority, title, message, current_qty, threshold_qty, product_name, product_sku, \
    warehouse_name, acknowledged_by, acknowledged_at, resolved_at, created_at, updated_at";

/// Store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl InventoryStore for PgStore {
    async fn begin(&self) -> AppResult<Box<dyn InventoryTx>> {
        let tx = self.db.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    async fn known_tenants(&self) -> AppResult<Vec<String>> {
        let tenants = sqlx::query_scalar::<_, String>(
            r#"
            SELECT tenant_id FROM stock_levels
            UNION
            SELECT tenant_id FROM inventory_reservations WHERE status = 'ACTIVE'
            ORDER BY 1
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(tenants)
    }
}

/// Transaction over one pooled connection
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

// ============================================================================
// Row mapping
// ============================================================================

fn parse_enum<T>(value: &str, parse: fn(&str) -> Option<T>, what: &str) -> AppResult<T> {
    parse(value).ok_or_else(|| AppError::Internal(format!("unknown {} '{}' in database", what, value)))
}

fn map_unique(err: sqlx::Error, resource: &str, message: String) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => AppError::Conflict {
            resource: resource.to_string(),
            message,
        },
        _ => AppError::DatabaseError(err),
    }
}

#[derive(Debug, FromRow)]
struct StockRow {
    id: Uuid,
    tenant_id: String,
    warehouse_id: Uuid,
    product_id: Uuid,
    variant_id: Option<Uuid>,
    quantity_on_hand: i32,
    quantity_reserved: i32,
    quantity_available: i32,
    reorder_point: i32,
    reorder_quantity: i32,
    last_restocked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<StockRow> for StockRecord {
    fn from(row: StockRow) -> Self {
        StockRecord {
            id: row.id,
            tenant_id: row.tenant_id,
            warehouse_id: row.warehouse_id,
            product_id: row.product_id,
            variant_id: row.variant_id,
            quantity_on_hand: row.quantity_on_hand,
            quantity_reserved: row.quantity_reserved,
            quantity_available: row.quantity_available,
            reorder_point: row.reorder_point,
            reorder_quantity: row.reorder_quantity,
            last_restocked_at: row.last_restocked_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ReservationRow {
    id: Uuid,
    tenant_id: String,
    warehouse_id: Uuid,
    product_id: Uuid,
    variant_id: Option<Uuid>,
    order_id: Uuid,
    quantity: i32,
    status: String,
    reserved_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    released_at: Option<DateTime<Utc>>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = AppError;

    fn try_from(row: ReservationRow) -> AppResult<Self> {
        Ok(Reservation {
            id: row.id,
            tenant_id: row.tenant_id,
            warehouse_id: row.warehouse_id,
            product_id: row.product_id,
            variant_id: row.variant_id,
            order_id: row.order_id,
            quantity: row.quantity,
            status: parse_enum(&row.status, ReservationStatus::from_str, "reservation status")?,
            reserved_at: row.reserved_at,
            expires_at: row.expires_at,
            released_at: row.released_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct WarehouseRow {
    id: Uuid,
    tenant_id: String,
    code: String,
    name: String,
    status: String,
    address1: String,
    city: String,
    state: String,
    postal_code: String,
    country: String,
    phone: Option<String>,
    email: Option<String>,
    manager_name: Option<String>,
    is_default: bool,
    priority: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<WarehouseRow> for Warehouse {
    type Error = AppError;

    fn try_from(row: WarehouseRow) -> AppResult<Self> {
        Ok(Warehouse {
            id: row.id,
            tenant_id: row.tenant_id,
            code: row.code,
            name: row.name,
            status: parse_enum(&row.status, WarehouseStatus::from_str, "warehouse status")?,
            address1: row.address1,
            city: row.city,
            state: row.state,
            postal_code: row.postal_code,
            country: row.country,
            phone: row.phone,
            email: row.email,
            manager_name: row.manager_name,
            is_default: row.is_default,
            priority: row.priority,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct SupplierRow {
    id: Uuid,
    tenant_id: String,
    code: String,
    name: String,
    status: String,
    contact_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    payment_terms: Option<String>,
    lead_time_days: Option<i32>,
    total_orders: i32,
    total_spent: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<SupplierRow> for Supplier {
    type Error = AppError;

    fn try_from(row: SupplierRow) -> AppResult<Self> {
        Ok(Supplier {
            id: row.id,
            tenant_id: row.tenant_id,
            code: row.code,
            name: row.name,
            status: parse_enum(&row.status, SupplierStatus::from_str, "supplier status")?,
            contact_name: row.contact_name,
            email: row.email,
            phone: row.phone,
            payment_terms: row.payment_terms,
            lead_time_days: row.lead_time_days,
            total_orders: row.total_orders,
            total_spent: row.total_spent,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct PurchaseOrderRow {
    id: Uuid,
    tenant_id: String,
    po_number: String,
    status: String,
    supplier_id: Uuid,
    warehouse_id: Uuid,
    order_date: DateTime<Utc>,
    expected_date: Option<DateTime<Utc>>,
    received_date: Option<DateTime<Utc>>,
    subtotal: Decimal,
    tax: Decimal,
    shipping: Decimal,
    total: Decimal,
    currency_code: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl PurchaseOrderRow {
    fn into_order(self, items: Vec<PurchaseOrderItem>) -> AppResult<PurchaseOrder> {
        Ok(PurchaseOrder {
            id: self.id,
            tenant_id: self.tenant_id,
            po_number: self.po_number,
            status: parse_enum(&self.status, PurchaseOrderStatus::from_str, "purchase order status")?,
            supplier_id: self.supplier_id,
            warehouse_id: self.warehouse_id,
            order_date: self.order_date,
            expected_date: self.expected_date,
            received_date: self.received_date,
            subtotal: self.subtotal,
            tax: self.tax,
            shipping: self.shipping,
            total: self.total,
            currency_code: self.currency_code,
            notes: self.notes,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct PurchaseOrderItemRow {
    id: Uuid,
    purchase_order_id: Uuid,
    product_id: Uuid,
    variant_id: Option<Uuid>,
    quantity_ordered: i32,
    quantity_received: i32,
    unit_cost: Decimal,
    subtotal: Decimal,
    notes: Option<String>,
}

impl From<PurchaseOrderItemRow> for PurchaseOrderItem {
    fn from(row: PurchaseOrderItemRow) -> Self {
        PurchaseOrderItem {
            id: row.id,
            purchase_order_id: row.purchase_order_id,
            product_id: row.product_id,
            variant_id: row.variant_id,
            quantity_ordered: row.quantity_ordered,
            quantity_received: row.quantity_received,
            unit_cost: row.unit_cost,
            subtotal: row.subtotal,
            notes: row.notes,
        }
    }
}

#[derive(Debug, FromRow)]
struct TransferRow {
    id: Uuid,
    tenant_id: String,
    transfer_number: String,
    status: String,
    from_warehouse_id: Uuid,
    to_warehouse_id: Uuid,
    requested_by: Option<String>,
    requested_at: DateTime<Utc>,
    shipped_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TransferRow {
    fn into_transfer(self, items: Vec<TransferItem>) -> AppResult<Transfer> {
        Ok(Transfer {
            id: self.id,
            tenant_id: self.tenant_id,
            transfer_number: self.transfer_number,
            status: parse_enum(&self.status, TransferStatus::from_str, "transfer status")?,
            from_warehouse_id: self.from_warehouse_id,
            to_warehouse_id: self.to_warehouse_id,
            requested_by: self.requested_by,
            requested_at: self.requested_at,
            shipped_at: self.shipped_at,
            completed_at: self.completed_at,
            notes: self.notes,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TransferItemRow {
    id: Uuid,
    transfer_id: Uuid,
    product_id: Uuid,
    variant_id: Option<Uuid>,
    quantity_requested: i32,
    quantity_shipped: i32,
    quantity_received: i32,
    notes: Option<String>,
}

impl From<TransferItemRow> for TransferItem {
    fn from(row: TransferItemRow) -> Self {
        TransferItem {
            id: row.id,
            transfer_id: row.transfer_id,
            product_id: row.product_id,
            variant_id: row.variant_id,
            quantity_requested: row.quantity_requested,
            quantity_shipped: row.quantity_shipped,
            quantity_received: row.quantity_received,
            notes: row.notes,
        }
    }
}

#[derive(Debug, FromRow)]
struct ThresholdRow {
    id: Uuid,
    tenant_id: String,
    warehouse_id: Option<Uuid>,
    product_id: Option<Uuid>,
    variant_id: Option<Uuid>,
    alert_type: String,
    threshold_quantity: i32,
    priority: String,
    is_enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ThresholdRow> for AlertThreshold {
    type Error = AppError;

    fn try_from(row: ThresholdRow) -> AppResult<Self> {
        Ok(AlertThreshold {
            id: row.id,
            tenant_id: row.tenant_id,
            warehouse_id: row.warehouse_id,
            product_id: row.product_id,
            variant_id: row.variant_id,
            alert_type: parse_enum(&row.alert_type, AlertType::from_str, "alert type")?,
            threshold_quantity: row.threshold_quantity,
            priority: parse_enum(&row.priority, AlertPriority::from_str, "alert priority")?,
            is_enabled: row.is_enabled,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct AlertRow {
    id: Uuid,
    tenant_id: String,
    warehouse_id: Option<Uuid>,
    product_id: Uuid,
    variant_id: Option<Uuid>,
    alert_type: String,
    status: String,
    priority: String,
    title: String,
    message: String,
    current_qty: i32,
    threshold_qty: i32,
    product_name: Option<String>,
    product_sku: Option<String>,
    warehouse_name: Option<String>,
    acknowledged_by: Option<String>,
    acknowledged_at: Option<DateTime<Utc>>,
    resolved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AlertRow> for InventoryAlert {
    type Error = AppError;

    fn try_from(row: AlertRow) -> AppResult<Self> {
        Ok(InventoryAlert {
            id: row.id,
            tenant_id: row.tenant_id,
            warehouse_id: row.warehouse_id,
            product_id: row.product_id,
            variant_id: row.variant_id,
            alert_type: parse_enum(&row.alert_type, AlertType::from_str, "alert type")?,
            status: parse_enum(&row.status, AlertStatus::from_str, "alert status")?,
            priority: parse_enum(&row.priority, AlertPriority::from_str, "alert priority")?,
            title: row.title,
            message: row.message,
            current_qty: row.current_qty,
            threshold_qty: row.threshold_qty,
            product_name: row.product_name,
            product_sku: row.product_sku,
            warehouse_name: row.warehouse_name,
            acknowledged_by: row.acknowledged_by,
            acknowledged_at: row.acknowledged_at,
            resolved_at: row.resolved_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn page_bounds(page: Pagination) -> (i64, i64) {
    (
        i64::try_from(page.limit()).unwrap_or(i64::MAX),
        i64::try_from(page.offset()).unwrap_or(i64::MAX),
    )
}

fn total(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

// ============================================================================
// Header + item loading
// ============================================================================

impl PgTx {
    async fn purchase_order_items(&mut self, order_ids: &[Uuid]) -> AppResult<HashMap<Uuid, Vec<PurchaseOrderItem>>> {
        let sql = format!(
            "SELECT {} FROM purchase_order_items WHERE purchase_order_id = ANY($1) \
             ORDER BY purchase_order_id, line_number",
            PURCHASE_ORDER_ITEM_COLUMNS
        );
        let rows = sqlx::query_as::<_, PurchaseOrderItemRow>(&sql)
            .bind(order_ids)
            .fetch_all(&mut *self.tx)
            .await?;

        let mut grouped: HashMap<Uuid, Vec<PurchaseOrderItem>> = HashMap::new();
        for row in rows {
            grouped
                .entry(row.purchase_order_id)
                .or_default()
                .push(row.into());
        }
        Ok(grouped)
    }

    async fn assemble_purchase_orders(&mut self, rows: Vec<PurchaseOrderRow>) -> AppResult<Vec<PurchaseOrder>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut items = self.purchase_order_items(&ids).await?;
        rows.into_iter()
            .map(|row| {
                let order_items = items.remove(&row.id).unwrap_or_default();
                row.into_order(order_items)
            })
            .collect()
    }

    async fn transfer_items(&mut self, transfer_ids: &[Uuid]) -> AppResult<HashMap<Uuid, Vec<TransferItem>>> {
        let sql = format!(
            "SELECT {} FROM inventory_transfer_items WHERE transfer_id = ANY($1) \
             ORDER BY transfer_id, line_number",
            TRANSFER_ITEM_COLUMNS
        );
        let rows = sqlx::query_as::<_, TransferItemRow>(&sql)
            .bind(transfer_ids)
            .fetch_all(&mut *self.tx)
            .await?;

        let mut grouped: HashMap<Uuid, Vec<TransferItem>> = HashMap::new();
        for row in rows {
            grouped.entry(row.transfer_id).or_default().push(row.into());
        }
        Ok(grouped)
    }

    async fn assemble_transfers(&mut self, rows: Vec<TransferRow>) -> AppResult<Vec<Transfer>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut items = self.transfer_items(&ids).await?;
        rows.into_iter()
            .map(|row| {
                let transfer_items = items.remove(&row.id).unwrap_or_default();
                row.into_transfer(transfer_items)
            })
            .collect()
    }

    async fn select_stock(&mut self, tenant_id: &str, key: &StockKey, lock: bool) -> AppResult<Option<StockRecord>> {
        let sql = format!(
            "SELECT {} FROM stock_levels \
             WHERE tenant_id = $1 AND warehouse_id = $2 AND product_id = $3 \
             AND variant_id IS NOT DISTINCT FROM $4{}",
            STOCK_COLUMNS,
            if lock { " FOR UPDATE" } else { "" }
        );
        let row = sqlx::query_as::<_, StockRow>(&sql)
            .bind(tenant_id)
            .bind(key.warehouse_id)
            .bind(key.product_id)
            .bind(key.variant_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row.map(StockRecord::from))
    }

    async fn select_reservation(&mut self, tenant_id: &str, id: Uuid, lock: bool) -> AppResult<Option<Reservation>> {
        let sql = format!(
            "SELECT {} FROM inventory_reservations WHERE tenant_id = $1 AND id = $2{}",
            RESERVATION_COLUMNS,
            if lock { " FOR UPDATE" } else { "" }
        );
        sqlx::query_as::<_, ReservationRow>(&sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(Reservation::try_from)
            .transpose()
    }

    async fn select_supplier(&mut self, tenant_id: &str, id: Uuid, lock: bool) -> AppResult<Option<Supplier>> {
        let sql = format!(
            "SELECT {} FROM suppliers WHERE tenant_id = $1 AND id = $2 AND deleted_at IS NULL{}",
            SUPPLIER_COLUMNS,
            if lock { " FOR UPDATE" } else { "" }
        );
        sqlx::query_as::<_, SupplierRow>(&sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(Supplier::try_from)
            .transpose()
    }

    async fn select_purchase_order(&mut self, tenant_id: &str, id: Uuid, lock: bool) -> AppResult<Option<PurchaseOrder>> {
        let sql = format!(
            "SELECT {} FROM purchase_orders WHERE tenant_id = $1 AND id = $2 AND deleted_at IS NULL{}",
            PURCHASE_ORDER_COLUMNS,
            if lock { " FOR UPDATE" } else { "" }
        );
        let row = sqlx::query_as::<_, PurchaseOrderRow>(&sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        match row {
            Some(row) => Ok(self.assemble_purchase_orders(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn select_transfer(&mut self, tenant_id: &str, id: Uuid, lock: bool) -> AppResult<Option<Transfer>> {
        let sql = format!(
            "SELECT {} FROM inventory_transfers WHERE tenant_id = $1 AND id = $2 AND deleted_at IS NULL{}",
            TRANSFER_COLUMNS,
            if lock { " FOR UPDATE" } else { "" }
        );
        let row = sqlx::query_as::<_, TransferRow>(&sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        match row {
            Some(row) => Ok(self.assemble_transfers(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl InventoryTx for PgTx {
    // ========================================================================
    // Stock levels
    // ========================================================================

    async fn get_stock(&mut self, tenant_id: &str, key: &StockKey) -> AppResult<Option<StockRecord>> {
        self.select_stock(tenant_id, key, false).await
    }

    async fn get_stock_by_id(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<StockRecord>> {
        let sql = format!(
            "SELECT {} FROM stock_levels WHERE tenant_id = $1 AND id = $2",
            STOCK_COLUMNS
        );
        let row = sqlx::query_as::<_, StockRow>(&sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row.map(StockRecord::from))
    }

    async fn lock_stock(&mut self, tenant_id: &str, key: &StockKey) -> AppResult<Option<StockRecord>> {
        self.select_stock(tenant_id, key, true).await
    }

    async fn lock_or_create_stock(&mut self, tenant_id: &str, key: &StockKey) -> AppResult<StockRecord> {
        sqlx::query(
            r#"
            INSERT INTO stock_levels (id, tenant_id, warehouse_id, product_id, variant_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(key.warehouse_id)
        .bind(key.product_id)
        .bind(key.variant_id)
        .execute(&mut *self.tx)
        .await?;

        self.select_stock(tenant_id, key, true)
            .await?
            .ok_or_else(|| AppError::Internal(format!("stock level {} vanished after insert", key)))
    }

    async fn save_stock(&mut self, stock: &StockRecord) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE stock_levels
            SET quantity_on_hand = $3, quantity_reserved = $4, quantity_available = $5,
                reorder_point = $6, reorder_quantity = $7, last_restocked_at = $8,
                updated_at = $9
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(stock.id)
        .bind(&stock.tenant_id)
        .bind(stock.quantity_on_hand)
        .bind(stock.quantity_reserved)
        .bind(stock.quantity_available)
        .bind(stock.reorder_point)
        .bind(stock.reorder_quantity)
        .bind(stock.last_restocked_at)
        .bind(stock.updated_at)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Stock level", stock.id));
        }
        Ok(())
    }

    async fn list_stock(
        &mut self,
        tenant_id: &str,
        filter: &StockFilter,
        page: Pagination,
    ) -> AppResult<(Vec<StockRecord>, u64)> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM stock_levels WHERE tenant_id = $1 AND ($2::uuid IS NULL OR warehouse_id = $2)",
        )
        .bind(tenant_id)
        .bind(filter.warehouse_id)
        .fetch_one(&mut *self.tx)
        .await?;

        let (limit, offset) = page_bounds(page);
        let sql = format!(
            "SELECT {} FROM stock_levels \
             WHERE tenant_id = $1 AND ($2::uuid IS NULL OR warehouse_id = $2) \
             ORDER BY updated_at DESC, id LIMIT $3 OFFSET $4",
            STOCK_COLUMNS
        );
        let rows = sqlx::query_as::<_, StockRow>(&sql)
            .bind(tenant_id)
            .bind(filter.warehouse_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *self.tx)
            .await?;

        Ok((rows.into_iter().map(StockRecord::from).collect(), total(count)))
    }

    async fn scan_stock(&mut self, tenant_id: &str, scan: &StockScan) -> AppResult<Vec<StockRecord>> {
        let rows = match scan {
            StockScan::AtOrBelow {
                max_available,
                warehouse_id,
                product_id,
                variant_id,
            } => {
                let sql = format!(
                    "SELECT {} FROM stock_levels \
                     WHERE tenant_id = $1 AND quantity_available <= $2 \
                     AND ($3::uuid IS NULL OR warehouse_id = $3) \
                     AND ($4::uuid IS NULL OR product_id = $4) \
                     AND ($5::uuid IS NULL OR variant_id = $5) \
                     ORDER BY quantity_available, id",
                    STOCK_COLUMNS
                );
                sqlx::query_as::<_, StockRow>(&sql)
                    .bind(tenant_id)
                    .bind(*max_available)
                    .bind(*warehouse_id)
                    .bind(*product_id)
                    .bind(*variant_id)
                    .fetch_all(&mut *self.tx)
                    .await?
            }
            StockScan::ReorderDue { warehouse_id } => {
                let sql = format!(
                    "SELECT {} FROM stock_levels \
                     WHERE tenant_id = $1 AND reorder_point > 0 \
                     AND quantity_available <= reorder_point \
                     AND ($2::uuid IS NULL OR warehouse_id = $2) \
                     ORDER BY quantity_available, id",
                    STOCK_COLUMNS
                );
                sqlx::query_as::<_, StockRow>(&sql)
                    .bind(tenant_id)
                    .bind(*warehouse_id)
                    .fetch_all(&mut *self.tx)
                    .await?
            }
        };

        Ok(rows.into_iter().map(StockRecord::from).collect())
    }

    // ========================================================================
    // Reservations
    // ========================================================================

    async fn insert_reservation(&mut self, reservation: &Reservation) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_reservations (
                id, tenant_id, warehouse_id, product_id, variant_id, order_id,
                quantity, status, reserved_at, expires_at, released_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(reservation.id)
        .bind(&reservation.tenant_id)
        .bind(reservation.warehouse_id)
        .bind(reservation.product_id)
        .bind(reservation.variant_id)
        .bind(reservation.order_id)
        .bind(reservation.quantity)
        .bind(reservation.status.as_str())
        .bind(reservation.reserved_at)
        .bind(reservation.expires_at)
        .bind(reservation.released_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn get_reservation(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<Reservation>> {
        self.select_reservation(tenant_id, id, false).await
    }

    async fn lock_reservation(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<Reservation>> {
        self.select_reservation(tenant_id, id, true).await
    }

    async fn save_reservation(&mut self, reservation: &Reservation) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE inventory_reservations
            SET status = $3, released_at = $4, expires_at = $5
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(reservation.id)
        .bind(&reservation.tenant_id)
        .bind(reservation.status.as_str())
        .bind(reservation.released_at)
        .bind(reservation.expires_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn expired_reservations(
        &mut self,
        tenant_id: &str,
        now: DateTime<Utc>,
        limit: i64,
    ) -> AppResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM inventory_reservations
            WHERE tenant_id = $1 AND status = 'ACTIVE' AND expires_at < $2
            ORDER BY expires_at
            LIMIT $3
            "#,
        )
        .bind(tenant_id)
        .bind(now)
        .bind(limit)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(ids)
    }

    async fn reservations_for_order(&mut self, tenant_id: &str, order_id: Uuid) -> AppResult<Vec<Reservation>> {
        let sql = format!(
            "SELECT {} FROM inventory_reservations WHERE tenant_id = $1 AND order_id = $2 ORDER BY reserved_at",
            RESERVATION_COLUMNS
        );
        sqlx::query_as::<_, ReservationRow>(&sql)
            .bind(tenant_id)
            .bind(order_id)
            .fetch_all(&mut *self.tx)
            .await?
            .into_iter()
            .map(Reservation::try_from)
            .collect()
    }

    // ========================================================================
    // Warehouses
    // ========================================================================

    async fn insert_warehouse(&mut self, warehouse: &Warehouse) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO warehouses (
                id, tenant_id, code, name, status, address1, city, state, postal_code,
                country, phone, email, manager_name, is_default, priority, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(warehouse.id)
        .bind(&warehouse.tenant_id)
        .bind(&warehouse.code)
        .bind(&warehouse.name)
        .bind(warehouse.status.as_str())
        .bind(&warehouse.address1)
        .bind(&warehouse.city)
        .bind(&warehouse.state)
        .bind(&warehouse.postal_code)
        .bind(&warehouse.country)
        .bind(&warehouse.phone)
        .bind(&warehouse.email)
        .bind(&warehouse.manager_name)
        .bind(warehouse.is_default)
        .bind(warehouse.priority)
        .bind(warehouse.created_at)
        .bind(warehouse.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_unique(e, "code", format!("Warehouse code {} already exists", warehouse.code)))?;

        Ok(())
    }

    async fn get_warehouse(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<Warehouse>> {
        let sql = format!(
            "SELECT {} FROM warehouses WHERE tenant_id = $1 AND id = $2 AND deleted_at IS NULL",
            WAREHOUSE_COLUMNS
        );
        sqlx::query_as::<_, WarehouseRow>(&sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(Warehouse::try_from)
            .transpose()
    }

    async fn list_warehouses(
        &mut self,
        tenant_id: &str,
        status: Option<WarehouseStatus>,
        page: Pagination,
    ) -> AppResult<(Vec<Warehouse>, u64)> {
        let status = status.map(|s| s.as_str());
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM warehouses WHERE tenant_id = $1 AND deleted_at IS NULL AND ($2::text IS NULL OR status = $2)",
        )
        .bind(tenant_id)
        .bind(status)
        .fetch_one(&mut *self.tx)
        .await?;

        let (limit, offset) = page_bounds(page);
        let sql = format!(
            "SELECT {} FROM warehouses \
             WHERE tenant_id = $1 AND deleted_at IS NULL AND ($2::text IS NULL OR status = $2) \
             ORDER BY priority DESC, name LIMIT $3 OFFSET $4",
            WAREHOUSE_COLUMNS
        );
        let warehouses = sqlx::query_as::<_, WarehouseRow>(&sql)
            .bind(tenant_id)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *self.tx)
            .await?
            .into_iter()
            .map(Warehouse::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok((warehouses, total(count)))
    }

    async fn save_warehouse(&mut self, warehouse: &Warehouse) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE warehouses
            SET name = $3, status = $4, address1 = $5, city = $6, state = $7,
                postal_code = $8, country = $9, phone = $10, email = $11,
                manager_name = $12, is_default = $13, priority = $14,
                updated_at = $15, deleted_at = $16
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(warehouse.id)
        .bind(&warehouse.tenant_id)
        .bind(&warehouse.name)
        .bind(warehouse.status.as_str())
        .bind(&warehouse.address1)
        .bind(&warehouse.city)
        .bind(&warehouse.state)
        .bind(&warehouse.postal_code)
        .bind(&warehouse.country)
        .bind(&warehouse.phone)
        .bind(&warehouse.email)
        .bind(&warehouse.manager_name)
        .bind(warehouse.is_default)
        .bind(warehouse.priority)
        .bind(warehouse.updated_at)
        .bind(warehouse.deleted_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    // ========================================================================
    // Suppliers
    // ========================================================================

    async fn insert_supplier(&mut self, supplier: &Supplier) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO suppliers (
                id, tenant_id, code, name, status, contact_name, email, phone,
                payment_terms, lead_time_days, total_orders, total_spent, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(supplier.id)
        .bind(&supplier.tenant_id)
        .bind(&supplier.code)
        .bind(&supplier.name)
        .bind(supplier.status.as_str())
        .bind(&supplier.contact_name)
        .bind(&supplier.email)
        .bind(&supplier.phone)
        .bind(&supplier.payment_terms)
        .bind(supplier.lead_time_days)
        .bind(supplier.total_orders)
        .bind(supplier.total_spent)
        .bind(supplier.created_at)
        .bind(supplier.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_unique(e, "code", format!("Supplier code {} already exists", supplier.code)))?;

        Ok(())
    }

    async fn get_supplier(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<Supplier>> {
        self.select_supplier(tenant_id, id, false).await
    }

    async fn lock_supplier(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<Supplier>> {
        self.select_supplier(tenant_id, id, true).await
    }

    async fn list_suppliers(
        &mut self,
        tenant_id: &str,
        status: Option<SupplierStatus>,
        page: Pagination,
    ) -> AppResult<(Vec<Supplier>, u64)> {
        let status = status.map(|s| s.as_str());
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM suppliers WHERE tenant_id = $1 AND deleted_at IS NULL AND ($2::text IS NULL OR status = $2)",
        )
        .bind(tenant_id)
        .bind(status)
        .fetch_one(&mut *self.tx)
        .await?;

        let (limit, offset) = page_bounds(page);
        let sql = format!(
            "SELECT {} FROM suppliers \
             WHERE tenant_id = $1 AND deleted_at IS NULL AND ($2::text IS NULL OR status = $2) \
             ORDER BY name LIMIT $3 OFFSET $4",
            SUPPLIER_COLUMNS
        );
        let suppliers = sqlx::query_as::<_, SupplierRow>(&sql)
            .bind(tenant_id)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *self.tx)
            .await?
            .into_iter()
            .map(Supplier::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok((suppliers, total(count)))
    }

    async fn save_supplier(&mut self, supplier: &Supplier) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE suppliers
            SET name = $3, status = $4, contact_name = $5, email = $6, phone = $7,
                payment_terms = $8, lead_time_days = $9, total_orders = $10,
                total_spent = $11, updated_at = $12, deleted_at = $13
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(supplier.id)
        .bind(&supplier.tenant_id)
        .bind(&supplier.name)
        .bind(supplier.status.as_str())
        .bind(&supplier.contact_name)
        .bind(&supplier.email)
        .bind(&supplier.phone)
        .bind(&supplier.payment_terms)
        .bind(supplier.lead_time_days)
        .bind(supplier.total_orders)
        .bind(supplier.total_spent)
        .bind(supplier.updated_at)
        .bind(supplier.deleted_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn next_sequence(&mut self, tenant_id: &str, name: &str) -> AppResult<i64> {
        let value = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO tenant_sequences (tenant_id, name, value)
            VALUES ($1, $2, 1)
            ON CONFLICT (tenant_id, name) DO UPDATE SET value = tenant_sequences.value + 1
            RETURNING value
            "#,
        )
        .bind(tenant_id)
        .bind(name)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(value)
    }

    // ========================================================================
    // Purchase orders
    // ========================================================================

    async fn insert_purchase_order(&mut self, order: &PurchaseOrder) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO purchase_orders (
                id, tenant_id, po_number, status, supplier_id, warehouse_id, order_date,
                expected_date, received_date, subtotal, tax, shipping, total, currency_code,
                notes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(order.id)
        .bind(&order.tenant_id)
        .bind(&order.po_number)
        .bind(order.status.as_str())
        .bind(order.supplier_id)
        .bind(order.warehouse_id)
        .bind(order.order_date)
        .bind(order.expected_date)
        .bind(order.received_date)
        .bind(order.subtotal)
        .bind(order.tax)
        .bind(order.shipping)
        .bind(order.total)
        .bind(&order.currency_code)
        .bind(&order.notes)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_unique(e, "po_number", format!("PO number {} already exists", order.po_number)))?;

        for (index, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO purchase_order_items (
                    id, tenant_id, purchase_order_id, line_number, product_id, variant_id,
                    quantity_ordered, quantity_received, unit_cost, subtotal, notes
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(item.id)
            .bind(&order.tenant_id)
            .bind(order.id)
            .bind(index as i32 + 1)
            .bind(item.product_id)
            .bind(item.variant_id)
            .bind(item.quantity_ordered)
            .bind(item.quantity_received)
            .bind(item.unit_cost)
            .bind(item.subtotal)
            .bind(&item.notes)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn get_purchase_order(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<PurchaseOrder>> {
        self.select_purchase_order(tenant_id, id, false).await
    }

    async fn lock_purchase_order(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<PurchaseOrder>> {
        self.select_purchase_order(tenant_id, id, true).await
    }

    async fn list_purchase_orders(
        &mut self,
        tenant_id: &str,
        status: Option<PurchaseOrderStatus>,
        page: Pagination,
    ) -> AppResult<(Vec<PurchaseOrder>, u64)> {
        let status = status.map(|s| s.as_str());
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM purchase_orders WHERE tenant_id = $1 AND deleted_at IS NULL AND ($2::text IS NULL OR status = $2)",
        )
        .bind(tenant_id)
        .bind(status)
        .fetch_one(&mut *self.tx)
        .await?;

        let (limit, offset) = page_bounds(page);
        let sql = format!(
            "SELECT {} FROM purchase_orders \
             WHERE tenant_id = $1 AND deleted_at IS NULL AND ($2::text IS NULL OR status = $2) \
             ORDER BY created_at DESC, po_number DESC LIMIT $3 OFFSET $4",
            PURCHASE_ORDER_COLUMNS
        );
        let rows = sqlx::query_as::<_, PurchaseOrderRow>(&sql)
            .bind(tenant_id)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *self.tx)
            .await?;

        let orders = self.assemble_purchase_orders(rows).await?;
        Ok((orders, total(count)))
    }

    async fn save_purchase_order(&mut self, order: &PurchaseOrder) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE purchase_orders
            SET status = $3, expected_date = $4, received_date = $5, subtotal = $6,
                tax = $7, shipping = $8, total = $9, notes = $10, updated_at = $11,
                deleted_at = $12
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(order.id)
        .bind(&order.tenant_id)
        .bind(order.status.as_str())
        .bind(order.expected_date)
        .bind(order.received_date)
        .bind(order.subtotal)
        .bind(order.tax)
        .bind(order.shipping)
        .bind(order.total)
        .bind(&order.notes)
        .bind(order.updated_at)
        .bind(order.deleted_at)
        .execute(&mut *self.tx)
        .await?;

        for item in &order.items {
            sqlx::query(
                r#"
                UPDATE purchase_order_items
                SET quantity_received = $2, updated_at = $3
                WHERE id = $1
                "#,
            )
            .bind(item.id)
            .bind(item.quantity_received)
            .bind(order.updated_at)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    // ========================================================================
    // Transfers
    // ========================================================================

    async fn insert_transfer(&mut self, transfer: &Transfer) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_transfers (
                id, tenant_id, transfer_number, status, from_warehouse_id, to_warehouse_id,
                requested_by, requested_at, shipped_at, completed_at, notes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(transfer.id)
        .bind(&transfer.tenant_id)
        .bind(&transfer.transfer_number)
        .bind(transfer.status.as_str())
        .bind(transfer.from_warehouse_id)
        .bind(transfer.to_warehouse_id)
        .bind(&transfer.requested_by)
        .bind(transfer.requested_at)
        .bind(transfer.shipped_at)
        .bind(transfer.completed_at)
        .bind(&transfer.notes)
        .bind(transfer.created_at)
        .bind(transfer.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            map_unique(
                e,
                "transfer_number",
                format!("Transfer number {} already exists", transfer.transfer_number),
            )
        })?;

        for (index, item) in transfer.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO inventory_transfer_items (
                    id, tenant_id, transfer_id, line_number, product_id, variant_id,
                    quantity_requested, quantity_shipped, quantity_received, notes
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(item.id)
            .bind(&transfer.tenant_id)
            .bind(transfer.id)
            .bind(index as i32 + 1)
            .bind(item.product_id)
            .bind(item.variant_id)
            .bind(item.quantity_requested)
            .bind(item.quantity_shipped)
            .bind(item.quantity_received)
            .bind(&item.notes)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn get_transfer(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<Transfer>> {
        self.select_transfer(tenant_id, id, false).await
    }

    async fn lock_transfer(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<Transfer>> {
        self.select_transfer(tenant_id, id, true).await
    }

    async fn list_transfers(
        &mut self,
        tenant_id: &str,
        status: Option<TransferStatus>,
        page: Pagination,
    ) -> AppResult<(Vec<Transfer>, u64)> {
        let status = status.map(|s| s.as_str());
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM inventory_transfers WHERE tenant_id = $1 AND deleted_at IS NULL AND ($2::text IS NULL OR status = $2)",
        )
        .bind(tenant_id)
        .bind(status)
        .fetch_one(&mut *self.tx)
        .await?;

        let (limit, offset) = page_bounds(page);
        let sql = format!(
            "SELECT {} FROM inventory_transfers \
             WHERE tenant_id = $1 AND deleted_at IS NULL AND ($2::text IS NULL OR status = $2) \
             ORDER BY created_at DESC, transfer_number DESC LIMIT $3 OFFSET $4",
            TRANSFER_COLUMNS
        );
        let rows = sqlx::query_as::<_, TransferRow>(&sql)
            .bind(tenant_id)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *self.tx)
            .await?;

        let transfers = self.assemble_transfers(rows).await?;
        Ok((transfers, total(count)))
    }

    async fn save_transfer(&mut self, transfer: &Transfer) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE inventory_transfers
            SET status = $3, shipped_at = $4, completed_at = $5, notes = $6,
                updated_at = $7, deleted_at = $8
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(transfer.id)
        .bind(&transfer.tenant_id)
        .bind(transfer.status.as_str())
        .bind(transfer.shipped_at)
        .bind(transfer.completed_at)
        .bind(&transfer.notes)
        .bind(transfer.updated_at)
        .bind(transfer.deleted_at)
        .execute(&mut *self.tx)
        .await?;

        for item in &transfer.items {
            sqlx::query(
                r#"
                UPDATE inventory_transfer_items
                SET quantity_shipped = $2, quantity_received = $3, updated_at = $4
                WHERE id = $1
                "#,
            )
            .bind(item.id)
            .bind(item.quantity_shipped)
            .bind(item.quantity_received)
            .bind(transfer.updated_at)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    // ========================================================================
    // Alert thresholds
    // ========================================================================

    async fn insert_threshold(&mut self, threshold: &AlertThreshold) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO alert_thresholds (
                id, tenant_id, warehouse_id, product_id, variant_id, alert_type,
                threshold_quantity, priority, is_enabled, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(threshold.id)
        .bind(&threshold.tenant_id)
        .bind(threshold.warehouse_id)
        .bind(threshold.product_id)
        .bind(threshold.variant_id)
        .bind(threshold.alert_type.as_str())
        .bind(threshold.threshold_quantity)
        .bind(threshold.priority.as_str())
        .bind(threshold.is_enabled)
        .bind(threshold.created_at)
        .bind(threshold.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn get_threshold(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<AlertThreshold>> {
        let sql = format!(
            "SELECT {} FROM alert_thresholds WHERE tenant_id = $1 AND id = $2",
            THRESHOLD_COLUMNS
        );
        sqlx::query_as::<_, ThresholdRow>(&sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(AlertThreshold::try_from)
            .transpose()
    }

    async fn list_thresholds(
        &mut self,
        tenant_id: &str,
        filter: &ThresholdFilter,
    ) -> AppResult<Vec<AlertThreshold>> {
        let sql = format!(
            "SELECT {} FROM alert_thresholds \
             WHERE tenant_id = $1 \
             AND ($2::uuid IS NULL OR warehouse_id = $2 OR warehouse_id IS NULL) \
             AND ($3::uuid IS NULL OR product_id = $3 OR product_id IS NULL) \
             AND ($4::text IS NULL OR alert_type = $4) \
             AND (NOT $5 OR is_enabled) \
             ORDER BY created_at DESC, id",
            THRESHOLD_COLUMNS
        );
        sqlx::query_as::<_, ThresholdRow>(&sql)
            .bind(tenant_id)
            .bind(filter.warehouse_id)
            .bind(filter.product_id)
            .bind(filter.alert_type.map(|t| t.as_str()))
            .bind(filter.enabled_only)
            .fetch_all(&mut *self.tx)
            .await?
            .into_iter()
            .map(AlertThreshold::try_from)
            .collect()
    }

    async fn save_threshold(&mut self, threshold: &AlertThreshold) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE alert_thresholds
            SET threshold_quantity = $3, priority = $4, is_enabled = $5, updated_at = $6
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(threshold.id)
        .bind(&threshold.tenant_id)
        .bind(threshold.threshold_quantity)
        .bind(threshold.priority.as_str())
        .bind(threshold.is_enabled)
        .bind(threshold.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn delete_threshold(&mut self, tenant_id: &str, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM alert_thresholds WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ========================================================================
    // Alerts
    // ========================================================================

    async fn insert_alert(&mut self, alert: &InventoryAlert) -> AppResult<bool> {
        // One ACTIVE alert per (tenant, product, warehouse, type) is enforced
        // by a partial unique index; a losing insert is a no-op.
        let result = sqlx::query(
            r#"
            INSERT INTO inventory_alerts (
                id, tenant_id, warehouse_id, product_id, variant_id, alert_type, status,
                priority, title, message, current_qty, threshold_qty, product_name,
                product_sku, warehouse_name, acknowledged_by, acknowledged_at, resolved_at,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(alert.id)
        .bind(&alert.tenant_id)
        .bind(alert.warehouse_id)
        .bind(alert.product_id)
        .bind(alert.variant_id)
        .bind(alert.alert_type.as_str())
        .bind(alert.status.as_str())
        .bind(alert.priority.as_str())
        .bind(&alert.title)
        .bind(&alert.message)
        .bind(alert.current_qty)
        .bind(alert.threshold_qty)
        .bind(&alert.product_name)
        .bind(&alert.product_sku)
        .bind(&alert.warehouse_name)
        .bind(&alert.acknowledged_by)
        .bind(alert.acknowledged_at)
        .bind(alert.resolved_at)
        .bind(alert.created_at)
        .bind(alert.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn active_alert_exists(
        &mut self,
        tenant_id: &str,
        product_id: Uuid,
        warehouse_id: Option<Uuid>,
        alert_type: AlertType,
    ) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM inventory_alerts
                WHERE tenant_id = $1 AND product_id = $2
                  AND warehouse_id IS NOT DISTINCT FROM $3
                  AND alert_type = $4 AND status = 'ACTIVE'
            )
            "#,
        )
        .bind(tenant_id)
        .bind(product_id)
        .bind(warehouse_id)
        .bind(alert_type.as_str())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(exists)
    }

    async fn get_alert(&mut self, tenant_id: &str, id: Uuid) -> AppResult<Option<InventoryAlert>> {
        let sql = format!(
            "SELECT {} FROM inventory_alerts WHERE tenant_id = $1 AND id = $2",
            ALERT_COLUMNS
        );
        sqlx::query_as::<_, AlertRow>(&sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(InventoryAlert::try_from)
            .transpose()
    }

    async fn list_alerts(
        &mut self,
        tenant_id: &str,
        filter: &AlertFilter,
        page: Pagination,
    ) -> AppResult<(Vec<InventoryAlert>, u64)> {
        const WHERE: &str = "WHERE tenant_id = $1 \
             AND ($2::text IS NULL OR status = $2) \
             AND ($3::text IS NULL OR alert_type = $3) \
             AND ($4::text IS NULL OR priority = $4) \
             AND ($5::uuid IS NULL OR warehouse_id = $5)";

        let status = filter.status.map(|s| s.as_str());
        let alert_type = filter.alert_type.map(|t| t.as_str());
        let priority = filter.priority.map(|p| p.as_str());

        let count_sql = format!("SELECT COUNT(*) FROM inventory_alerts {}", WHERE);
        let count = sqlx::query_scalar::<_, i64>(&count_sql)
            .bind(tenant_id)
            .bind(status)
            .bind(alert_type)
            .bind(priority)
            .bind(filter.warehouse_id)
            .fetch_one(&mut *self.tx)
            .await?;

        let (limit, offset) = page_bounds(page);
        let sql = format!(
            "SELECT {} FROM inventory_alerts {} \
             ORDER BY CASE priority WHEN 'CRITICAL' THEN 4 WHEN 'HIGH' THEN 3 \
             WHEN 'MEDIUM' THEN 2 ELSE 1 END DESC, created_at DESC, id \
             LIMIT $6 OFFSET $7",
            ALERT_COLUMNS, WHERE
        );
        let alerts = sqlx::query_as::<_, AlertRow>(&sql)
            .bind(tenant_id)
            .bind(status)
            .bind(alert_type)
            .bind(priority)
            .bind(filter.warehouse_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *self.tx)
            .await?
            .into_iter()
            .map(InventoryAlert::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok((alerts, total(count)))
    }

    async fn save_alert(&mut self, alert: &InventoryAlert) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE inventory_alerts
            SET status = $3, priority = $4, current_qty = $5, acknowledged_by = $6,
                acknowledged_at = $7, resolved_at = $8, product_name = $9,
                product_sku = $10, warehouse_name = $11, updated_at = $12
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(alert.id)
        .bind(&alert.tenant_id)
        .bind(alert.status.as_str())
        .bind(alert.priority.as_str())
        .bind(alert.current_qty)
        .bind(&alert.acknowledged_by)
        .bind(alert.acknowledged_at)
        .bind(alert.resolved_at)
        .bind(&alert.product_name)
        .bind(&alert.product_sku)
        .bind(&alert.warehouse_name)
        .bind(alert.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn resolve_active_alerts(
        &mut self,
        tenant_id: &str,
        product_id: Uuid,
        warehouse_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE inventory_alerts
            SET status = 'RESOLVED', resolved_at = $4, updated_at = $4
            WHERE tenant_id = $1 AND product_id = $2 AND status = 'ACTIVE'
              AND ($3::uuid IS NULL OR warehouse_id = $3)
            "#,
        )
        .bind(tenant_id)
        .bind(product_id)
        .bind(warehouse_id)
        .bind(now)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn alert_summary(&mut self, tenant_id: &str) -> AppResult<AlertSummary> {
        let rows = sqlx::query_as::<_, (String, String, String, i64)>(
            r#"
            SELECT status, alert_type, priority, COUNT(*)
            FROM inventory_alerts
            WHERE tenant_id = $1 AND status IN ('ACTIVE', 'RESOLVED')
            GROUP BY status, alert_type, priority
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut summary = AlertSummary::default();
        for (status, alert_type, priority, count) in rows {
            if status == AlertStatus::Resolved.as_str() {
                summary.total_resolved += count;
                continue;
            }
            summary.total_active += count;
            *summary.by_type.entry(alert_type).or_insert(0) += count;
            *summary.by_priority.entry(priority).or_insert(0) += count;
        }
        Ok(summary)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
