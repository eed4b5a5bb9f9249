//! Shared fixtures for service tests
#![allow(dead_code)]

pub mod chaos;

use std::sync::Arc;

use inventory_service::cache::TwoTierCache;
use inventory_service::config::CacheConfig;
use inventory_service::events::EventDispatcher;
use inventory_service::services::warehouse::CreateWarehouseInput;
use inventory_service::services::supplier::CreateSupplierInput;
use inventory_service::services::{NoProductLookup, ProductLookup, Services};
use inventory_service::store::{InventoryStore, MemoryStore};
use shared::{StockKey, Supplier, Warehouse};
use uuid::Uuid;

pub const TENANT: &str = "tenant-a";
pub const OTHER_TENANT: &str = "tenant-b";

pub struct Harness {
    pub store: Arc<dyn InventoryStore>,
    pub cache: Arc<TwoTierCache>,
    pub services: Services,
}

pub fn harness() -> Harness {
    harness_with(EventDispatcher::disabled(), Arc::new(NoProductLookup))
}

pub fn harness_with(events: EventDispatcher, products: Arc<dyn ProductLookup>) -> Harness {
    harness_on(Arc::new(MemoryStore::new()), events, products)
}

pub fn harness_on(
    store: Arc<dyn InventoryStore>,
    events: EventDispatcher,
    products: Arc<dyn ProductLookup>,
) -> Harness {
    let cache = Arc::new(TwoTierCache::local_only(&CacheConfig::default()));
    let services = Services::new(store.clone(), cache.clone(), events, products, 900);
    Harness {
        store,
        cache,
        services,
    }
}

pub async fn warehouse(h: &Harness, code: &str) -> Warehouse {
    h.services
        .warehouses
        .create(
            TENANT,
            CreateWarehouseInput {
                code: code.to_string(),
                name: format!("Warehouse {}", code),
                address1: "1 Dock Road".into(),
                city: "Bangkok".into(),
                state: String::new(),
                postal_code: "10100".into(),
                country: "TH".into(),
                phone: None,
                email: None,
                manager_name: None,
                is_default: false,
                priority: 0,
            },
        )
        .await
        .unwrap()
}

pub async fn supplier(h: &Harness, code: &str) -> Supplier {
    h.services
        .suppliers
        .create(
            TENANT,
            CreateSupplierInput {
                code: code.to_string(),
                name: format!("Supplier {}", code),
                contact_name: None,
                email: Some("orders@supplier.example".into()),
                phone: None,
                payment_terms: Some("NET30".into()),
                lead_time_days: Some(7),
            },
        )
        .await
        .unwrap()
}

pub fn key_at(warehouse_id: Uuid) -> StockKey {
    StockKey::new(warehouse_id, Uuid::new_v4(), None)
}

/// Put `qty` units on hand for the key
pub async fn stock_up(h: &Harness, key: &StockKey, qty: i32) {
    h.services.stock.add_stock(TENANT, key, qty).await.unwrap();
}
