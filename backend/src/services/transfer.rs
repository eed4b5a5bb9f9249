//! Inter-warehouse transfers
//!
//! Completing a transfer debits the source and credits the destination for
//! every line inside one transaction. A short line aborts the whole transfer.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::{
    generate_document_number, validate_quantity, DocumentKind, PaginatedResponse, Pagination,
    Transfer, TransferItem, TransferStatus,
};
use uuid::Uuid;
use validator::Validate;

use super::stock::{add_stock, lock_in_order, remove_stock};
use crate::cache::TwoTierCache;
use crate::error::{AppError, AppResult};
use crate::events::{event_type, EventDispatcher, InventoryEvent};
use crate::store::InventoryStore;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTransferInput {
    pub from_warehouse_id: Uuid,
    pub to_warehouse_id: Uuid,
    #[validate(length(max = 200))]
    pub requested_by: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub items: Vec<TransferItemInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferItemInput {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity_requested: i32,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct TransferService {
    store: Arc<dyn InventoryStore>,
    cache: Arc<TwoTierCache>,
    events: EventDispatcher,
}

impl TransferService {
    pub fn new(store: Arc<dyn InventoryStore>, cache: Arc<TwoTierCache>, events: EventDispatcher) -> Self {
        Self { store, cache, events }
    }

    pub async fn create(&self, tenant_id: &str, input: CreateTransferInput) -> AppResult<Transfer> {
        input.validate()?;
        if input.from_warehouse_id == input.to_warehouse_id {
            return Err(AppError::validation(
                "to_warehouse_id",
                "Source and destination warehouses must differ",
            ));
        }
        for item in &input.items {
            validate_quantity(item.quantity_requested)
                .map_err(|m| AppError::validation("quantity_requested", m))?;
        }

        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        for warehouse_id in [input.from_warehouse_id, input.to_warehouse_id] {
            if tx.get_warehouse(tenant_id, warehouse_id).await?.is_none() {
                return Err(AppError::not_found("Warehouse", warehouse_id));
            }
        }

        let kind = DocumentKind::Transfer;
        let sequence = tx.next_sequence(tenant_id, kind.sequence_name()).await?;
        let transfer_id = Uuid::new_v4();

        let transfer = Transfer {
            id: transfer_id,
            tenant_id: tenant_id.to_string(),
            transfer_number: generate_document_number(kind, now, sequence),
            status: TransferStatus::Pending,
            from_warehouse_id: input.from_warehouse_id,
            to_warehouse_id: input.to_warehouse_id,
            requested_by: input.requested_by,
            requested_at: now,
            shipped_at: None,
            completed_at: None,
            notes: input.notes,
            items: input
                .items
                .into_iter()
                .map(|item| TransferItem {
                    id: Uuid::new_v4(),
                    transfer_id,
                    product_id: item.product_id,
                    variant_id: item.variant_id,
                    quantity_requested: item.quantity_requested,
                    quantity_shipped: 0,
                    quantity_received: 0,
                    notes: item.notes,
                })
                .collect(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        tx.insert_transfer(&transfer).await?;
        tx.commit().await?;

        tracing::info!(
            tenant_id = %tenant_id,
            transfer_id = %transfer.id,
            transfer_number = %transfer.transfer_number,
            items = transfer.items.len(),
            "Transfer created"
        );
        Ok(transfer)
    }

    pub async fn get(&self, tenant_id: &str, id: Uuid) -> AppResult<Transfer> {
        let mut tx = self.store.begin().await?;
        let transfer = tx.get_transfer(tenant_id, id).await?;
        transfer.ok_or_else(|| AppError::not_found("Transfer", id))
    }

    pub async fn list(
        &self,
        tenant_id: &str,
        status: Option<TransferStatus>,
        page: Pagination,
    ) -> AppResult<PaginatedResponse<Transfer>> {
        let mut tx = self.store.begin().await?;
        let (transfers, total) = tx.list_transfers(tenant_id, status, page).await?;
        Ok(PaginatedResponse::new(transfers, page, total))
    }

    /// Ship or cancel. Completion goes through [`TransferService::complete`].
    pub async fn update_status(&self, tenant_id: &str, id: Uuid, next: TransferStatus) -> AppResult<Transfer> {
        let mut tx = self.store.begin().await?;
        let mut transfer = tx
            .lock_transfer(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Transfer", id))?;
        let previous = transfer.status;
        transfer.transition_to(next, Utc::now())?;

        tx.save_transfer(&transfer).await?;
        tx.commit().await?;

        tracing::info!(
            tenant_id = %tenant_id,
            transfer_id = %id,
            from = %previous,
            to = %next,
            "Transfer status changed"
        );
        Ok(transfer)
    }

    /// Move stock for every line and mark the transfer COMPLETED
    ///
    /// `received` optionally overrides per-line quantities by item id; lines
    /// without an override move their requested quantity.
    pub async fn complete(
        &self,
        tenant_id: &str,
        id: Uuid,
        received: Option<&HashMap<Uuid, i32>>,
    ) -> AppResult<Transfer> {
        let overrides = received.cloned().unwrap_or_default();
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let mut transfer = tx
            .lock_transfer(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Transfer", id))?;
        let moves = transfer.complete(&overrides, now)?;

        lock_in_order(
            tx.as_mut(),
            tenant_id,
            moves.iter().flat_map(|m| [m.source, m.destination]),
        )
        .await?;
        for mv in &moves {
            remove_stock(tx.as_mut(), tenant_id, &mv.source, mv.quantity, now).await?;
            add_stock(tx.as_mut(), tenant_id, &mv.destination, mv.quantity, now).await?;
        }

        tx.save_transfer(&transfer).await?;
        tx.commit().await?;

        for mv in &moves {
            self.cache.invalidate_stock(tenant_id, &mv.source).await;
            self.cache.invalidate_stock(tenant_id, &mv.destination).await;
        }

        tracing::info!(
            tenant_id = %tenant_id,
            transfer_id = %id,
            moves = moves.len(),
            "Transfer completed"
        );

        let items: Vec<_> = moves
            .iter()
            .map(|m| {
                json!({
                    "product_id": m.source.product_id,
                    "variant_id": m.source.variant_id,
                    "quantity": m.quantity,
                })
            })
            .collect();
        self.events.publish(InventoryEvent::new(
            tenant_id,
            event_type::TRANSFER_COMPLETED,
            json!({
                "transfer_id": transfer.id,
                "transfer_number": transfer.transfer_number,
                "from_warehouse_id": transfer.from_warehouse_id,
                "to_warehouse_id": transfer.to_warehouse_id,
                "items": items,
            }),
        ));

        Ok(transfer)
    }
}
