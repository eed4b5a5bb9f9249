//! Purchase order service: creation, status workflow and receiving
//!
//! Receiving runs in one transaction: every line credit, the order update
//! and the supplier aggregates commit together or not at all.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::{
    generate_document_number, line_subtotal, order_totals, validate_currency_code,
    validate_quantity, DocumentKind, PaginatedResponse, Pagination, PurchaseOrder,
    PurchaseOrderItem, PurchaseOrderStatus, TransitionError,
};
use uuid::Uuid;
use validator::Validate;

use super::stock::{add_stock, lock_in_order};
use crate::cache::TwoTierCache;
use crate::error::{AppError, AppResult};
use crate::events::{event_type, EventDispatcher, InventoryEvent};
use crate::store::InventoryStore;

fn default_currency() -> String {
    "USD".to_string()
}

/// Input for creating a purchase order
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePurchaseOrderInput {
    pub supplier_id: Uuid,
    pub warehouse_id: Uuid,
    pub expected_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tax: Decimal,
    #[serde(default)]
    pub shipping: Decimal,
    #[serde(default = "default_currency")]
    pub currency_code: String,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub items: Vec<PurchaseOrderItemInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrderItemInput {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity_ordered: i32,
    pub unit_cost: Decimal,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct PurchaseOrderService {
    store: Arc<dyn InventoryStore>,
    cache: Arc<TwoTierCache>,
    events: EventDispatcher,
}

impl PurchaseOrderService {
    pub fn new(store: Arc<dyn InventoryStore>, cache: Arc<TwoTierCache>, events: EventDispatcher) -> Self {
        Self { store, cache, events }
    }

    pub async fn create(&self, tenant_id: &str, input: CreatePurchaseOrderInput) -> AppResult<PurchaseOrder> {
        input.validate()?;
        validate_currency_code(&input.currency_code)
            .map_err(|m| AppError::validation("currency_code", m))?;
        if input.tax.is_sign_negative() {
            return Err(AppError::validation("tax", "Tax cannot be negative"));
        }
        if input.shipping.is_sign_negative() {
            return Err(AppError::validation("shipping", "Shipping cannot be negative"));
        }
        for item in &input.items {
            validate_quantity(item.quantity_ordered)
                .map_err(|m| AppError::validation("quantity_ordered", m))?;
            if item.unit_cost.is_sign_negative() {
                return Err(AppError::validation("unit_cost", "Unit cost cannot be negative"));
            }
        }

        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        if tx.get_warehouse(tenant_id, input.warehouse_id).await?.is_none() {
            return Err(AppError::not_found("Warehouse", input.warehouse_id));
        }
        if tx.get_supplier(tenant_id, input.supplier_id).await?.is_none() {
            return Err(AppError::not_found("Supplier", input.supplier_id));
        }

        let kind = DocumentKind::PurchaseOrder;
        let sequence = tx.next_sequence(tenant_id, kind.sequence_name()).await?;
        let order_id = Uuid::new_v4();

        let items: Vec<PurchaseOrderItem> = input
            .items
            .into_iter()
            .map(|item| PurchaseOrderItem {
                id: Uuid::new_v4(),
                purchase_order_id: order_id,
                product_id: item.product_id,
                variant_id: item.variant_id,
                quantity_ordered: item.quantity_ordered,
                quantity_received: 0,
                unit_cost: item.unit_cost,
                subtotal: line_subtotal(item.quantity_ordered, item.unit_cost),
                notes: item.notes,
            })
            .collect();
        let (subtotal, total) = order_totals(items.iter().map(|i| &i.subtotal), input.tax, input.shipping);

        let order = PurchaseOrder {
            id: order_id,
            tenant_id: tenant_id.to_string(),
            po_number: generate_document_number(kind, now, sequence),
            status: PurchaseOrderStatus::Draft,
            supplier_id: input.supplier_id,
            warehouse_id: input.warehouse_id,
            order_date: now,
            expected_date: input.expected_date,
            received_date: None,
            subtotal,
            tax: input.tax,
            shipping: input.shipping,
            total,
            currency_code: input.currency_code,
            notes: input.notes,
            items,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        tx.insert_purchase_order(&order).await?;
        tx.commit().await?;

        tracing::info!(
            tenant_id = %tenant_id,
            purchase_order_id = %order.id,
            po_number = %order.po_number,
            total = %order.total,
            "Purchase order created"
        );
        Ok(order)
    }

    pub async fn get(&self, tenant_id: &str, id: Uuid) -> AppResult<PurchaseOrder> {
        let mut tx = self.store.begin().await?;
        let order = tx.get_purchase_order(tenant_id, id).await?;
        order.ok_or_else(|| AppError::not_found("Purchase order", id))
    }

    pub async fn list(
        &self,
        tenant_id: &str,
        status: Option<PurchaseOrderStatus>,
        page: Pagination,
    ) -> AppResult<PaginatedResponse<PurchaseOrder>> {
        let mut tx = self.store.begin().await?;
        let (orders, total) = tx.list_purchase_orders(tenant_id, status, page).await?;
        Ok(PaginatedResponse::new(orders, page, total))
    }

    /// Move the order along its workflow without touching stock
    pub async fn update_status(
        &self,
        tenant_id: &str,
        id: Uuid,
        next: PurchaseOrderStatus,
    ) -> AppResult<PurchaseOrder> {
        let mut tx = self.store.begin().await?;
        let mut order = tx
            .lock_purchase_order(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Purchase order", id))?;

        if !order.status.can_transition_to(next) {
            return Err(TransitionError::new("purchase order", order.status.as_str(), next.as_str()).into());
        }
        let previous = order.status;
        order.status = next;
        order.updated_at = Utc::now();

        tx.save_purchase_order(&order).await?;
        tx.commit().await?;

        tracing::info!(
            tenant_id = %tenant_id,
            purchase_order_id = %id,
            from = %previous,
            to = %next,
            "Purchase order status changed"
        );
        Ok(order)
    }

    /// Receive goods against the order's line items
    ///
    /// `received` maps line item id to the quantity arriving now. Quantities
    /// accumulate across calls; the order becomes RECEIVED once every line is
    /// satisfied and stays ORDERED otherwise.
    pub async fn receive(
        &self,
        tenant_id: &str,
        id: Uuid,
        received: &HashMap<Uuid, i32>,
    ) -> AppResult<PurchaseOrder> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let mut order = tx
            .lock_purchase_order(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Purchase order", id))?;
        let outcome = order.apply_receipt(received, now)?;

        lock_in_order(tx.as_mut(), tenant_id, outcome.credits.iter().map(|c| c.key)).await?;
        for credit in &outcome.credits {
            add_stock(tx.as_mut(), tenant_id, &credit.key, credit.quantity, now).await?;
        }
        tx.save_purchase_order(&order).await?;

        if outcome.fully_received {
            match tx.lock_supplier(tenant_id, order.supplier_id).await? {
                Some(mut supplier) => {
                    supplier.record_received_order(order.total, now);
                    tx.save_supplier(&supplier).await?;
                }
                None => tracing::warn!(
                    tenant_id = %tenant_id,
                    supplier_id = %order.supplier_id,
                    "Supplier missing, aggregates not updated"
                ),
            }
        }

        tx.commit().await?;

        for credit in &outcome.credits {
            self.cache.invalidate_stock(tenant_id, &credit.key).await;
        }

        tracing::info!(
            tenant_id = %tenant_id,
            purchase_order_id = %id,
            lines = outcome.credits.len(),
            fully_received = outcome.fully_received,
            "Purchase order received"
        );

        let items: Vec<_> = outcome
            .credits
            .iter()
            .map(|c| {
                json!({
                    "product_id": c.key.product_id,
                    "variant_id": c.key.variant_id,
                    "quantity": c.quantity,
                })
            })
            .collect();
        self.events.publish(InventoryEvent::new(
            tenant_id,
            event_type::STOCK_RECEIVED,
            json!({
                "purchase_order_id": order.id,
                "po_number": order.po_number,
                "warehouse_id": order.warehouse_id,
                "fully_received": outcome.fully_received,
                "items": items,
            }),
        ));

        Ok(order)
    }
}
