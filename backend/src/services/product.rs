//! Product catalog lookups
//!
//! The catalog lives in another service. Alerts only need a display name and
//! SKU, so the seam is a single optional lookup.

use async_trait::async_trait;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductLabel {
    pub name: String,
    pub sku: Option<String>,
}

#[async_trait]
pub trait ProductLookup: Send + Sync {
    async fn product_label(
        &self,
        tenant_id: &str,
        product_id: Uuid,
        variant_id: Option<Uuid>,
    ) -> Option<ProductLabel>;
}

/// Lookup used when no catalog is wired in; alerts carry ids only
pub struct NoProductLookup;

#[async_trait]
impl ProductLookup for NoProductLookup {
    async fn product_label(&self, _tenant_id: &str, _product_id: Uuid, _variant_id: Option<Uuid>) -> Option<ProductLabel> {
        None
    }
}
