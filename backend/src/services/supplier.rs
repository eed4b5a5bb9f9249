//! Supplier management service

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{validate_code, PaginatedResponse, Pagination, Supplier, SupplierStatus};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::store::InventoryStore;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSupplierInput {
    pub code: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub contact_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub payment_terms: Option<String>,
    #[validate(range(min = 0, max = 365))]
    pub lead_time_days: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateSupplierInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub status: Option<SupplierStatus>,
    pub contact_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub payment_terms: Option<String>,
    #[validate(range(min = 0, max = 365))]
    pub lead_time_days: Option<i32>,
}

#[derive(Clone)]
pub struct SupplierService {
    store: Arc<dyn InventoryStore>,
}

impl SupplierService {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, tenant_id: &str, input: CreateSupplierInput) -> AppResult<Supplier> {
        input.validate()?;
        validate_code(&input.code).map_err(|m| AppError::validation("code", m))?;

        let now = Utc::now();
        let supplier = Supplier {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.to_string(),
            code: input.code,
            name: input.name.trim().to_string(),
            status: SupplierStatus::Active,
            contact_name: input.contact_name,
            email: input.email,
            phone: input.phone,
            payment_terms: input.payment_terms,
            lead_time_days: input.lead_time_days,
            total_orders: 0,
            total_spent: Decimal::ZERO,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let mut tx = self.store.begin().await?;
        tx.insert_supplier(&supplier).await?;
        tx.commit().await?;

        tracing::info!(tenant_id = %tenant_id, supplier_id = %supplier.id, "Supplier created");
        Ok(supplier)
    }

    pub async fn get(&self, tenant_id: &str, id: Uuid) -> AppResult<Supplier> {
        let mut tx = self.store.begin().await?;
        let supplier = tx.get_supplier(tenant_id, id).await?;
        supplier.ok_or_else(|| AppError::not_found("Supplier", id))
    }

    pub async fn list(
        &self,
        tenant_id: &str,
        status: Option<SupplierStatus>,
        page: Pagination,
    ) -> AppResult<PaginatedResponse<Supplier>> {
        let mut tx = self.store.begin().await?;
        let (suppliers, total) = tx.list_suppliers(tenant_id, status, page).await?;
        Ok(PaginatedResponse::new(suppliers, page, total))
    }

    pub async fn update(&self, tenant_id: &str, id: Uuid, input: UpdateSupplierInput) -> AppResult<Supplier> {
        input.validate()?;

        let mut tx = self.store.begin().await?;
        let mut supplier = tx
            .lock_supplier(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Supplier", id))?;

        if let Some(name) = input.name {
            supplier.name = name;
        }
        if let Some(status) = input.status {
            supplier.status = status;
        }
        if input.contact_name.is_some() {
            supplier.contact_name = input.contact_name;
        }
        if input.email.is_some() {
            supplier.email = input.email;
        }
        if input.phone.is_some() {
            supplier.phone = input.phone;
        }
        if input.payment_terms.is_some() {
            supplier.payment_terms = input.payment_terms;
        }
        if input.lead_time_days.is_some() {
            supplier.lead_time_days = input.lead_time_days;
        }
        supplier.updated_at = Utc::now();

        tx.save_supplier(&supplier).await?;
        tx.commit().await?;
        Ok(supplier)
    }

    pub async fn delete(&self, tenant_id: &str, id: Uuid) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        let mut supplier = tx
            .lock_supplier(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Supplier", id))?;
        let now = Utc::now();
        supplier.deleted_at = Some(now);
        supplier.updated_at = now;
        tx.save_supplier(&supplier).await?;
        tx.commit().await?;

        tracing::info!(tenant_id = %tenant_id, supplier_id = %id, "Supplier deleted");
        Ok(())
    }
}
