//! Cache key layout and lifetimes
//!
//! Keys are tenant-scoped so invalidation can drop every list entry of one
//! tenant by prefix without touching other tenants.

use std::time::Duration;

use shared::StockKey;
use uuid::Uuid;

pub const STOCK_TTL: Duration = Duration::from_secs(5 * 60);
pub const STOCK_LIST_TTL: Duration = Duration::from_secs(2 * 60);
pub const WAREHOUSE_TTL: Duration = Duration::from_secs(30 * 60);
pub const LOW_STOCK_TTL: Duration = Duration::from_secs(60);

fn scope(id: Option<Uuid>) -> String {
    id.map_or_else(|| "all".to_string(), |id| id.to_string())
}

/// `stock:{tenant}:{warehouse}:{product}:{variant|nil}`
pub fn stock(tenant_id: &str, key: &StockKey) -> String {
    format!(
        "stock:{}:{}:{}:{}",
        tenant_id,
        key.warehouse_id,
        key.product_id,
        key.variant_id
            .map_or_else(|| "nil".to_string(), |id| id.to_string())
    )
}

/// `stock:list:{tenant}:{warehouse|all}:{page}:{per_page}`
pub fn stock_list(tenant_id: &str, warehouse_id: Option<Uuid>, page: u32, per_page: u32) -> String {
    format!(
        "{}{}:{}:{}",
        stock_list_prefix(tenant_id),
        scope(warehouse_id),
        page,
        per_page
    )
}

pub fn stock_list_prefix(tenant_id: &str) -> String {
    format!("stock:list:{}:", tenant_id)
}

/// `stock:low:{tenant}:{warehouse|all}`
pub fn low_stock(tenant_id: &str, warehouse_id: Option<Uuid>) -> String {
    format!("{}{}", low_stock_prefix(tenant_id), scope(warehouse_id))
}

pub fn low_stock_prefix(tenant_id: &str) -> String {
    format!("stock:low:{}:", tenant_id)
}

/// `warehouse:{tenant}:{id}`
pub fn warehouse(tenant_id: &str, id: Uuid) -> String {
    format!("{}{}", warehouse_prefix(tenant_id), id)
}

pub fn warehouse_prefix(tenant_id: &str) -> String {
    format!("warehouse:{}:", tenant_id)
}
