//! Business logic services for the inventory core

pub mod alert;
pub mod product;
pub mod purchase_order;
pub mod reservation;
pub mod stock;
pub mod supplier;
pub mod transfer;
pub mod warehouse;

pub use alert::AlertService;
pub use product::{NoProductLookup, ProductLabel, ProductLookup};
pub use purchase_order::PurchaseOrderService;
pub use reservation::ReservationService;
pub use stock::StockService;
pub use supplier::SupplierService;
pub use transfer::TransferService;
pub use warehouse::WarehouseService;

use std::sync::Arc;

use crate::cache::TwoTierCache;
use crate::events::EventDispatcher;
use crate::store::InventoryStore;

/// Every service wired to one store, cache and dispatcher
#[derive(Clone)]
pub struct Services {
    pub stock: StockService,
    pub reservations: ReservationService,
    pub warehouses: WarehouseService,
    pub suppliers: SupplierService,
    pub purchase_orders: PurchaseOrderService,
    pub transfers: TransferService,
    pub alerts: AlertService,
}

impl Services {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        cache: Arc<TwoTierCache>,
        events: EventDispatcher,
        products: Arc<dyn ProductLookup>,
        reservation_ttl_secs: i64,
    ) -> Self {
        Self {
            stock: StockService::new(store.clone(), cache.clone()),
            reservations: ReservationService::new(store.clone(), cache.clone(), reservation_ttl_secs),
            warehouses: WarehouseService::new(store.clone(), cache.clone()),
            suppliers: SupplierService::new(store.clone()),
            purchase_orders: PurchaseOrderService::new(store.clone(), cache.clone(), events.clone()),
            transfers: TransferService::new(store.clone(), cache, events.clone()),
            alerts: AlertService::new(store, events, products),
        }
    }
}
