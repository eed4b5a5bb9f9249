//! Warehouse and supplier models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Warehouse operating status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarehouseStatus {
    Active,
    Inactive,
    Closed,
}

impl WarehouseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarehouseStatus::Active => "ACTIVE",
            WarehouseStatus::Inactive => "INACTIVE",
            WarehouseStatus::Closed => "CLOSED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(WarehouseStatus::Active),
            "INACTIVE" => Some(WarehouseStatus::Inactive),
            "CLOSED" => Some(WarehouseStatus::Closed),
            _ => None,
        }
    }
}

/// A storage location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: Uuid,
    pub tenant_id: String,
    pub code: String,
    pub name: String,
    pub status: WarehouseStatus,
    pub address1: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub manager_name: Option<String>,
    pub is_default: bool,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Warehouse {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Supplier relationship status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupplierStatus {
    Active,
    Inactive,
    Blacklisted,
}

impl SupplierStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupplierStatus::Active => "ACTIVE",
            SupplierStatus::Inactive => "INACTIVE",
            SupplierStatus::Blacklisted => "BLACKLISTED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(SupplierStatus::Active),
            "INACTIVE" => Some(SupplierStatus::Inactive),
            "BLACKLISTED" => Some(SupplierStatus::Blacklisted),
            _ => None,
        }
    }
}

/// A product supplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: Uuid,
    pub tenant_id: String,
    pub code: String,
    pub name: String,
    pub status: SupplierStatus,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub payment_terms: Option<String>,
    pub lead_time_days: Option<i32>,
    /// Purchase orders fully received from this supplier
    pub total_orders: i32,
    /// Lifetime spend over fully received orders
    pub total_spent: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Supplier {
    /// Fold a fully received order into the aggregates
    pub fn record_received_order(&mut self, order_total: Decimal, now: DateTime<Utc>) {
        self.total_orders += 1;
        self.total_spent += order_total;
        self.updated_at = now;
    }
}
