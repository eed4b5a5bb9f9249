//! Outbound inventory events
//!
//! Workflows publish after commit and never wait on delivery. The
//! [`EventDispatcher`] queues events and a worker task hands them to an
//! [`EventSink`] with retry.

mod dispatcher;
mod webhook;

pub use dispatcher::EventDispatcher;
pub use webhook::{sign_payload, HttpEventSink, SIGNATURE_HEADER};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event type names
pub mod event_type {
    pub const LOW_STOCK: &str = "inventory.low_stock";
    pub const OUT_OF_STOCK: &str = "inventory.out_of_stock";
    pub const STOCK_RECEIVED: &str = "inventory.stock_received";
    pub const TRANSFER_COMPLETED: &str = "inventory.transfer_completed";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryEvent {
    pub tenant_id: String,
    pub event_type: String,
    pub payload: Value,
    pub occurred_at: DateTime<Utc>,
}

impl InventoryEvent {
    pub fn new(tenant_id: &str, event_type: &str, payload: Value) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            event_type: event_type.to_string(),
            payload,
            occurred_at: Utc::now(),
        }
    }
}

/// Delivery target for events. Errors are retried by the dispatcher.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn deliver(&self, event: &InventoryEvent) -> Result<(), String>;
}

/// Sink that only logs, used when no endpoint is configured
pub struct LogEventSink;

#[async_trait]
impl EventSink for LogEventSink {
    async fn deliver(&self, event: &InventoryEvent) -> Result<(), String> {
        tracing::info!(
            tenant_id = %event.tenant_id,
            event_type = %event.event_type,
            payload = %event.payload,
            "Inventory event"
        );
        Ok(())
    }
}
