//! Low-stock alert evaluation, alert lifecycle and threshold management

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use shared::{
    validate_non_negative, AlertPriority, AlertStatus, AlertSummary, AlertThreshold, AlertType,
    InventoryAlert, PaginatedResponse, Pagination, StockRecord,
};
use uuid::Uuid;

use super::product::ProductLookup;
use crate::error::{AppError, AppResult};
use crate::events::{event_type, EventDispatcher, InventoryEvent};
use crate::store::{AlertFilter, InventoryStore, StockScan, ThresholdFilter};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateThresholdInput {
    pub warehouse_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub variant_id: Option<Uuid>,
    pub alert_type: AlertType,
    pub threshold_quantity: i32,
    pub priority: Option<AlertPriority>,
    pub is_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateThresholdInput {
    pub threshold_quantity: Option<i32>,
    pub priority: Option<AlertPriority>,
    pub is_enabled: Option<bool>,
}

#[derive(Clone)]
pub struct AlertService {
    store: Arc<dyn InventoryStore>,
    events: EventDispatcher,
    products: Arc<dyn ProductLookup>,
}

impl AlertService {
    pub fn new(store: Arc<dyn InventoryStore>, events: EventDispatcher, products: Arc<dyn ProductLookup>) -> Self {
        Self {
            store,
            events,
            products,
        }
    }

    // ------------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------------

    /// Scan stock against enabled LOW_STOCK thresholds, then tenant-wide for
    /// OUT_OF_STOCK, and return the alerts created by this run
    ///
    /// Each alert is written in its own transaction; a failure is logged and
    /// the scan moves on.
    pub async fn evaluate_low_stock(&self, tenant_id: &str) -> AppResult<Vec<InventoryAlert>> {
        let mut tx = self.store.begin().await?;
        let thresholds = tx
            .list_thresholds(tenant_id, &ThresholdFilter::enabled_of_type(AlertType::LowStock))
            .await?;
        drop(tx);

        let mut warehouse_names: HashMap<Uuid, Option<String>> = HashMap::new();
        let mut created = Vec::new();

        for threshold in &thresholds {
            let scan = StockScan::AtOrBelow {
                max_available: threshold.threshold_quantity,
                warehouse_id: threshold.warehouse_id,
                product_id: threshold.product_id,
                variant_id: threshold.variant_id,
            };
            let mut tx = self.store.begin().await?;
            let matches = match tx.scan_stock(tenant_id, &scan).await {
                Ok(matches) => matches,
                Err(e) => {
                    tracing::warn!(
                        tenant_id = %tenant_id,
                        threshold_id = %threshold.id,
                        error = %e,
                        "Skipping threshold after failed stock scan"
                    );
                    continue;
                }
            };
            drop(tx);

            for stock in &matches {
                let candidate = AlertCandidate::LowStock(threshold);
                self.record_candidate(tenant_id, stock, candidate, &mut warehouse_names, &mut created)
                    .await;
            }
        }

        let scan = StockScan::AtOrBelow {
            max_available: 0,
            warehouse_id: None,
            product_id: None,
            variant_id: None,
        };
        let mut tx = self.store.begin().await?;
        let empty = tx.scan_stock(tenant_id, &scan).await?;
        drop(tx);

        for stock in &empty {
            self.record_candidate(
                tenant_id,
                stock,
                AlertCandidate::OutOfStock,
                &mut warehouse_names,
                &mut created,
            )
            .await;
        }

        for alert in &created {
            self.publish(alert);
        }

        tracing::info!(
            tenant_id = %tenant_id,
            thresholds = thresholds.len(),
            created = created.len(),
            "Alert evaluation finished"
        );
        Ok(created)
    }

    async fn record_candidate(
        &self,
        tenant_id: &str,
        stock: &StockRecord,
        candidate: AlertCandidate<'_>,
        warehouse_names: &mut HashMap<Uuid, Option<String>>,
        created: &mut Vec<InventoryAlert>,
    ) {
        match self
            .create_if_new(tenant_id, stock, candidate, warehouse_names)
            .await
        {
            Ok(Some(alert)) => created.push(alert),
            Ok(None) => {}
            Err(e) => tracing::warn!(
                tenant_id = %tenant_id,
                warehouse_id = %stock.warehouse_id,
                product_id = %stock.product_id,
                error = %e,
                "Failed to record inventory alert"
            ),
        }
    }

    async fn create_if_new(
        &self,
        tenant_id: &str,
        stock: &StockRecord,
        candidate: AlertCandidate<'_>,
        warehouse_names: &mut HashMap<Uuid, Option<String>>,
    ) -> AppResult<Option<InventoryAlert>> {
        let alert_type = candidate.alert_type();
        let mut tx = self.store.begin().await?;

        let exists = tx
            .active_alert_exists(tenant_id, stock.product_id, Some(stock.warehouse_id), alert_type)
            .await?;
        if exists {
            return Ok(None);
        }

        let warehouse_name = match warehouse_names.get(&stock.warehouse_id).cloned() {
            Some(name) => name,
            None => {
                let name = tx
                    .get_warehouse(tenant_id, stock.warehouse_id)
                    .await?
                    .map(|w| w.name);
                warehouse_names.insert(stock.warehouse_id, name.clone());
                name
            }
        };

        let now = Utc::now();
        let mut alert = match candidate {
            AlertCandidate::LowStock(threshold) => {
                InventoryAlert::low_stock(stock, threshold, warehouse_name, now)
            }
            AlertCandidate::OutOfStock => InventoryAlert::out_of_stock(stock, warehouse_name, now),
        };
        if let Some(label) = self
            .products
            .product_label(tenant_id, stock.product_id, stock.variant_id)
            .await
        {
            alert.product_name = Some(label.name);
            alert.product_sku = label.sku;
        }

        let inserted = tx.insert_alert(&alert).await?;
        if !inserted {
            return Ok(None);
        }
        tx.commit().await?;

        tracing::debug!(
            tenant_id = %tenant_id,
            alert_id = %alert.id,
            alert_type = alert.alert_type.as_str(),
            priority = alert.priority.as_str(),
            "Inventory alert created"
        );
        Ok(Some(alert))
    }

    fn publish(&self, alert: &InventoryAlert) {
        let event = match alert.alert_type {
            AlertType::OutOfStock => event_type::OUT_OF_STOCK,
            _ => event_type::LOW_STOCK,
        };
        self.events.publish(InventoryEvent::new(
            &alert.tenant_id,
            event,
            json!({
                "alert_id": alert.id,
                "warehouse_id": alert.warehouse_id,
                "product_id": alert.product_id,
                "variant_id": alert.variant_id,
                "priority": alert.priority,
                "current_qty": alert.current_qty,
                "threshold_qty": alert.threshold_qty,
            }),
        ));
    }

    // ------------------------------------------------------------------------
    // Alerts
    // ------------------------------------------------------------------------

    /// Resolve every ACTIVE alert for a product, optionally at one warehouse.
    /// Not triggered by stock changes; callers invoke it after restocking.
    pub async fn resolve_for_product(
        &self,
        tenant_id: &str,
        product_id: Uuid,
        warehouse_id: Option<Uuid>,
    ) -> AppResult<u64> {
        let mut tx = self.store.begin().await?;
        let resolved = tx
            .resolve_active_alerts(tenant_id, product_id, warehouse_id, Utc::now())
            .await?;
        tx.commit().await?;

        tracing::info!(
            tenant_id = %tenant_id,
            product_id = %product_id,
            resolved = resolved,
            "Alerts resolved"
        );
        Ok(resolved)
    }

    pub async fn list(
        &self,
        tenant_id: &str,
        filter: &AlertFilter,
        page: Pagination,
    ) -> AppResult<PaginatedResponse<InventoryAlert>> {
        let mut tx = self.store.begin().await?;
        let (alerts, total) = tx.list_alerts(tenant_id, filter, page).await?;
        Ok(PaginatedResponse::new(alerts, page, total))
    }

    pub async fn get(&self, tenant_id: &str, id: Uuid) -> AppResult<InventoryAlert> {
        let mut tx = self.store.begin().await?;
        let alert = tx.get_alert(tenant_id, id).await?;
        alert.ok_or_else(|| AppError::not_found("Alert", id))
    }

    pub async fn update_status(
        &self,
        tenant_id: &str,
        id: Uuid,
        status: AlertStatus,
        acknowledged_by: Option<String>,
    ) -> AppResult<InventoryAlert> {
        let mut tx = self.store.begin().await?;
        let mut alert = tx
            .get_alert(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Alert", id))?;
        alert.set_status(status, acknowledged_by, Utc::now())?;
        tx.save_alert(&alert).await?;
        tx.commit().await?;
        Ok(alert)
    }

    /// Apply one status to many alerts. Missing alerts and disallowed
    /// transitions are skipped; returns how many changed.
    pub async fn bulk_update_status(
        &self,
        tenant_id: &str,
        ids: &[Uuid],
        status: AlertStatus,
        acknowledged_by: Option<String>,
    ) -> AppResult<u64> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let mut updated = 0u64;

        for id in ids {
            let Some(mut alert) = tx.get_alert(tenant_id, *id).await? else {
                continue;
            };
            if let Err(e) = alert.set_status(status, acknowledged_by.clone(), now) {
                tracing::debug!(alert_id = %id, error = %e, "Skipping alert");
                continue;
            }
            tx.save_alert(&alert).await?;
            updated += 1;
        }
        tx.commit().await?;

        tracing::info!(tenant_id = %tenant_id, status = status.as_str(), updated = updated, "Alerts updated");
        Ok(updated)
    }

    pub async fn summary(&self, tenant_id: &str) -> AppResult<AlertSummary> {
        let mut tx = self.store.begin().await?;
        let summary = tx.alert_summary(tenant_id).await?;
        Ok(summary)
    }

    // ------------------------------------------------------------------------
    // Thresholds
    // ------------------------------------------------------------------------

    pub async fn create_threshold(&self, tenant_id: &str, input: CreateThresholdInput) -> AppResult<AlertThreshold> {
        validate_non_negative(input.threshold_quantity)
            .map_err(|m| AppError::validation("threshold_quantity", m))?;

        let now = Utc::now();
        let threshold = AlertThreshold {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.to_string(),
            warehouse_id: input.warehouse_id,
            product_id: input.product_id,
            variant_id: input.variant_id,
            alert_type: input.alert_type,
            threshold_quantity: input.threshold_quantity,
            priority: input.priority.unwrap_or_default(),
            is_enabled: input.is_enabled.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.store.begin().await?;
        tx.insert_threshold(&threshold).await?;
        tx.commit().await?;
        Ok(threshold)
    }

    pub async fn get_threshold(&self, tenant_id: &str, id: Uuid) -> AppResult<AlertThreshold> {
        let mut tx = self.store.begin().await?;
        let threshold = tx.get_threshold(tenant_id, id).await?;
        threshold.ok_or_else(|| AppError::not_found("Alert threshold", id))
    }

    pub async fn list_thresholds(&self, tenant_id: &str, filter: &ThresholdFilter) -> AppResult<Vec<AlertThreshold>> {
        let mut tx = self.store.begin().await?;
        let thresholds = tx.list_thresholds(tenant_id, filter).await?;
        Ok(thresholds)
    }

    pub async fn update_threshold(
        &self,
        tenant_id: &str,
        id: Uuid,
        input: UpdateThresholdInput,
    ) -> AppResult<AlertThreshold> {
        if let Some(quantity) = input.threshold_quantity {
            validate_non_negative(quantity).map_err(|m| AppError::validation("threshold_quantity", m))?;
        }

        let mut tx = self.store.begin().await?;
        let mut threshold = tx
            .get_threshold(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Alert threshold", id))?;

        if let Some(quantity) = input.threshold_quantity {
            threshold.threshold_quantity = quantity;
        }
        if let Some(priority) = input.priority {
            threshold.priority = priority;
        }
        if let Some(enabled) = input.is_enabled {
            threshold.is_enabled = enabled;
        }
        threshold.updated_at = Utc::now();

        tx.save_threshold(&threshold).await?;
        tx.commit().await?;
        Ok(threshold)
    }

    pub async fn delete_threshold(&self, tenant_id: &str, id: Uuid) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        let deleted = tx.delete_threshold(tenant_id, id).await?;
        if !deleted {
            return Err(AppError::not_found("Alert threshold", id));
        }
        tx.commit().await?;
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum AlertCandidate<'a> {
    LowStock(&'a AlertThreshold),
    OutOfStock,
}

impl AlertCandidate<'_> {
    fn alert_type(&self) -> AlertType {
        match self {
            AlertCandidate::LowStock(_) => AlertType::LowStock,
            AlertCandidate::OutOfStock => AlertType::OutOfStock,
        }
    }
}
