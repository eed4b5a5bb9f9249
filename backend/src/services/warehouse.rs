//! Warehouse management service

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use shared::{validate_code, PaginatedResponse, Pagination, Warehouse, WarehouseStatus};
use uuid::Uuid;
use validator::Validate;

use crate::cache::{keys, TwoTierCache};
use crate::error::{AppError, AppResult};
use crate::store::InventoryStore;

/// Input for creating a warehouse
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateWarehouseInput {
    pub code: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub address1: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub manager_name: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub priority: i32,
}

/// Fields to change on a warehouse. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateWarehouseInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub status: Option<WarehouseStatus>,
    pub address1: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub manager_name: Option<String>,
    pub is_default: Option<bool>,
    pub priority: Option<i32>,
}

impl UpdateWarehouseInput {
    fn apply(self, warehouse: &mut Warehouse) {
        if let Some(name) = self.name {
            warehouse.name = name;
        }
        if let Some(status) = self.status {
            warehouse.status = status;
        }
        if let Some(address1) = self.address1 {
            warehouse.address1 = address1;
        }
        if let Some(city) = self.city {
            warehouse.city = city;
        }
        if let Some(state) = self.state {
            warehouse.state = state;
        }
        if let Some(postal_code) = self.postal_code {
            warehouse.postal_code = postal_code;
        }
        if let Some(country) = self.country {
            warehouse.country = country;
        }
        if self.phone.is_some() {
            warehouse.phone = self.phone;
        }
        if self.email.is_some() {
            warehouse.email = self.email;
        }
        if self.manager_name.is_some() {
            warehouse.manager_name = self.manager_name;
        }
        if let Some(is_default) = self.is_default {
            warehouse.is_default = is_default;
        }
        if let Some(priority) = self.priority {
            warehouse.priority = priority;
        }
    }
}

#[derive(Clone)]
pub struct WarehouseService {
    store: Arc<dyn InventoryStore>,
    cache: Arc<TwoTierCache>,
}

impl WarehouseService {
    pub fn new(store: Arc<dyn InventoryStore>, cache: Arc<TwoTierCache>) -> Self {
        Self { store, cache }
    }

    pub async fn create(&self, tenant_id: &str, input: CreateWarehouseInput) -> AppResult<Warehouse> {
        input.validate()?;
        validate_code(&input.code).map_err(|m| AppError::validation("code", m))?;

        let now = Utc::now();
        let warehouse = Warehouse {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.to_string(),
            code: input.code,
            name: input.name.trim().to_string(),
            status: WarehouseStatus::Active,
            address1: input.address1,
            city: input.city,
            state: input.state,
            postal_code: input.postal_code,
            country: input.country,
            phone: input.phone,
            email: input.email,
            manager_name: input.manager_name,
            is_default: input.is_default,
            priority: input.priority,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let mut tx = self.store.begin().await?;
        tx.insert_warehouse(&warehouse).await?;
        tx.commit().await?;

        tracing::info!(tenant_id = %tenant_id, warehouse_id = %warehouse.id, code = %warehouse.code, "Warehouse created");
        Ok(warehouse)
    }

    pub async fn get(&self, tenant_id: &str, id: Uuid) -> AppResult<Warehouse> {
        let cache_key = keys::warehouse(tenant_id, id);
        if let Some(warehouse) = self.cache.get_json(&cache_key).await {
            return Ok(warehouse);
        }

        let mut tx = self.store.begin().await?;
        let warehouse = tx.get_warehouse(tenant_id, id).await?;
        drop(tx);
        let warehouse = warehouse.ok_or_else(|| AppError::not_found("Warehouse", id))?;

        self.cache
            .set_json(&cache_key, &warehouse, keys::WAREHOUSE_TTL)
            .await;
        Ok(warehouse)
    }

    pub async fn list(
        &self,
        tenant_id: &str,
        status: Option<WarehouseStatus>,
        page: Pagination,
    ) -> AppResult<PaginatedResponse<Warehouse>> {
        let mut tx = self.store.begin().await?;
        let (warehouses, total) = tx.list_warehouses(tenant_id, status, page).await?;
        Ok(PaginatedResponse::new(warehouses, page, total))
    }

    pub async fn update(&self, tenant_id: &str, id: Uuid, input: UpdateWarehouseInput) -> AppResult<Warehouse> {
        input.validate()?;

        let mut tx = self.store.begin().await?;
        let mut warehouse = tx
            .get_warehouse(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Warehouse", id))?;
        input.apply(&mut warehouse);
        warehouse.updated_at = Utc::now();
        tx.save_warehouse(&warehouse).await?;
        tx.commit().await?;

        self.cache.invalidate_warehouse(tenant_id, id).await;
        Ok(warehouse)
    }

    /// Soft delete; stock records at the warehouse are kept
    pub async fn delete(&self, tenant_id: &str, id: Uuid) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        let mut warehouse = tx
            .get_warehouse(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Warehouse", id))?;
        let now = Utc::now();
        warehouse.deleted_at = Some(now);
        warehouse.updated_at = now;
        tx.save_warehouse(&warehouse).await?;
        tx.commit().await?;

        self.cache.invalidate_warehouse(tenant_id, id).await;
        tracing::info!(tenant_id = %tenant_id, warehouse_id = %id, "Warehouse deleted");
        Ok(())
    }
}
