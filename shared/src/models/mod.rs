//! Domain models for the inventory service

mod alert;
mod purchase_order;
mod reservation;
mod stock;
mod transfer;
mod warehouse;

pub use alert::*;
pub use purchase_order::*;
pub use reservation::*;
pub use stock::*;
pub use transfer::*;
pub use warehouse::*;

use chrono::{DateTime, Datelike, Utc};
use thiserror::Error;

/// A status change the entity's workflow does not allow
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot move {entity} from {from} to {to}")]
pub struct TransitionError {
    pub entity: &'static str,
    pub from: String,
    pub to: String,
}

impl TransitionError {
    pub fn new(entity: &'static str, from: &str, to: &str) -> Self {
        Self {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

/// Kinds of tenant-scoped document numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    PurchaseOrder,
    Transfer,
}

impl DocumentKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            DocumentKind::PurchaseOrder => "PO",
            DocumentKind::Transfer => "TR",
        }
    }

    /// Sequence name the per-tenant counter is stored under
    pub fn sequence_name(&self) -> &'static str {
        match self {
            DocumentKind::PurchaseOrder => "purchase_order",
            DocumentKind::Transfer => "transfer",
        }
    }
}

/// Generate a document number, e.g. `PO-202610-000042`
pub fn generate_document_number(kind: DocumentKind, at: DateTime<Utc>, sequence: i64) -> String {
    format!("{}-{}{:02}-{:06}", kind.prefix(), at.year(), at.month(), sequence)
}
