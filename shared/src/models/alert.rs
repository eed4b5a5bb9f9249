//! Inventory alert and threshold models

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{StockRecord, TransitionError};

/// Kind of condition an alert reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    LowStock,
    OutOfStock,
    Overstock,
    ExpiringSoon,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::LowStock => "LOW_STOCK",
            AlertType::OutOfStock => "OUT_OF_STOCK",
            AlertType::Overstock => "OVERSTOCK",
            AlertType::ExpiringSoon => "EXPIRING_SOON",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "LOW_STOCK" => Some(AlertType::LowStock),
            "OUT_OF_STOCK" => Some(AlertType::OutOfStock),
            "OVERSTOCK" => Some(AlertType::Overstock),
            "EXPIRING_SOON" => Some(AlertType::ExpiringSoon),
            _ => None,
        }
    }
}

/// Alert lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
    Dismissed,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "ACTIVE",
            AlertStatus::Acknowledged => "ACKNOWLEDGED",
            AlertStatus::Resolved => "RESOLVED",
            AlertStatus::Dismissed => "DISMISSED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(AlertStatus::Active),
            "ACKNOWLEDGED" => Some(AlertStatus::Acknowledged),
            "RESOLVED" => Some(AlertStatus::Resolved),
            "DISMISSED" => Some(AlertStatus::Dismissed),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: AlertStatus) -> bool {
        use AlertStatus::*;
        matches!(
            (self, next),
            (Active, Acknowledged)
                | (Active, Resolved)
                | (Active, Dismissed)
                | (Acknowledged, Resolved)
                | (Acknowledged, Dismissed)
        )
    }
}

/// Alert urgency, ordered from least to most urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertPriority::Low => "LOW",
            AlertPriority::Medium => "MEDIUM",
            AlertPriority::High => "HIGH",
            AlertPriority::Critical => "CRITICAL",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "LOW" => Some(AlertPriority::Low),
            "MEDIUM" => Some(AlertPriority::Medium),
            "HIGH" => Some(AlertPriority::High),
            "CRITICAL" => Some(AlertPriority::Critical),
            _ => None,
        }
    }
}

impl Default for AlertPriority {
    fn default() -> Self {
        AlertPriority::Medium
    }
}

/// Priority for a low-stock hit: CRITICAL at zero, HIGH at or below half the
/// threshold, otherwise whatever the threshold is configured with.
pub fn low_stock_priority(available: i32, threshold: i32, configured: AlertPriority) -> AlertPriority {
    if available == 0 {
        AlertPriority::Critical
    } else if available <= threshold / 2 {
        AlertPriority::High
    } else {
        configured
    }
}

/// Tenant-configured trigger for alert evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertThreshold {
    pub id: Uuid,
    pub tenant_id: String,
    pub warehouse_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub variant_id: Option<Uuid>,
    pub alert_type: AlertType,
    pub threshold_quantity: i32,
    pub priority: AlertPriority,
    pub is_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Generated alert with denormalized display fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryAlert {
    pub id: Uuid,
    pub tenant_id: String,
    pub warehouse_id: Option<Uuid>,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub alert_type: AlertType,
    pub status: AlertStatus,
    pub priority: AlertPriority,
    pub title: String,
    pub message: String,
    pub current_qty: i32,
    pub threshold_qty: i32,
    pub product_name: Option<String>,
    pub product_sku: Option<String>,
    pub warehouse_name: Option<String>,
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryAlert {
    pub fn low_stock(
        stock: &StockRecord,
        threshold: &AlertThreshold,
        warehouse_name: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let priority = low_stock_priority(
            stock.quantity_available,
            threshold.threshold_quantity,
            threshold.priority,
        );
        Self::for_stock(
            stock,
            AlertType::LowStock,
            priority,
            "Low Stock Alert".to_string(),
            format!(
                "Stock level is {}, below threshold of {}",
                stock.quantity_available, threshold.threshold_quantity
            ),
            threshold.threshold_quantity,
            warehouse_name,
            now,
        )
    }

    pub fn out_of_stock(stock: &StockRecord, warehouse_name: Option<String>, now: DateTime<Utc>) -> Self {
        Self::for_stock(
            stock,
            AlertType::OutOfStock,
            AlertPriority::Critical,
            "Out of Stock".to_string(),
            "Product is out of stock".to_string(),
            0,
            warehouse_name,
            now,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn for_stock(
        stock: &StockRecord,
        alert_type: AlertType,
        priority: AlertPriority,
        title: String,
        message: String,
        threshold_qty: i32,
        warehouse_name: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: stock.tenant_id.clone(),
            warehouse_id: Some(stock.warehouse_id),
            product_id: stock.product_id,
            variant_id: stock.variant_id,
            alert_type,
            status: AlertStatus::Active,
            priority,
            title,
            message,
            current_qty: stock.quantity_available.max(0),
            threshold_qty,
            product_name: None,
            product_sku: None,
            warehouse_name,
            acknowledged_by: None,
            acknowledged_at: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `next`, stamping acknowledgement or resolution
    pub fn set_status(
        &mut self,
        next: AlertStatus,
        acknowledged_by: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError::new("alert", self.status.as_str(), next.as_str()));
        }
        match next {
            AlertStatus::Acknowledged => {
                self.acknowledged_by = acknowledged_by;
                self.acknowledged_at = Some(now);
            }
            AlertStatus::Resolved => self.resolved_at = Some(now),
            _ => {}
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}

/// Alert counts for a tenant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub total_active: i64,
    pub total_resolved: i64,
    /// Active alerts keyed by type
    pub by_type: BTreeMap<String, i64>,
    /// Active alerts keyed by priority
    pub by_priority: BTreeMap<String, i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StockKey;

    #[test]
    fn priority_escalates_with_depletion() {
        assert_eq!(low_stock_priority(0, 10, AlertPriority::Low), AlertPriority::Critical);
        assert_eq!(low_stock_priority(5, 10, AlertPriority::Low), AlertPriority::High);
        assert_eq!(low_stock_priority(6, 10, AlertPriority::Low), AlertPriority::Low);
    }

    #[test]
    fn acknowledging_records_who_and_when() {
        let stock = StockRecord::empty("t1", &StockKey::new(Uuid::new_v4(), Uuid::new_v4(), None), Utc::now());
        let mut alert = InventoryAlert::out_of_stock(&stock, None, Utc::now());

        alert
            .set_status(AlertStatus::Acknowledged, Some("ops".into()), Utc::now())
            .unwrap();
        assert_eq!(alert.acknowledged_by.as_deref(), Some("ops"));
        assert!(alert.acknowledged_at.is_some());

        alert.set_status(AlertStatus::Resolved, None, Utc::now()).unwrap();
        assert!(alert.resolved_at.is_some());
        assert!(alert.set_status(AlertStatus::Active, None, Utc::now()).is_err());
    }
}
