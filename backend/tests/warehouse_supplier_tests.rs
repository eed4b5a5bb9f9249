//! Warehouse and supplier management tests

mod common;

use common::*;
use inventory_service::services::supplier::{CreateSupplierInput, UpdateSupplierInput};
use inventory_service::services::warehouse::{CreateWarehouseInput, UpdateWarehouseInput};
use inventory_service::AppError;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{validate_code, Pagination, WarehouseStatus};

fn warehouse_input(code: &str) -> CreateWarehouseInput {
    CreateWarehouseInput {
        code: code.to_string(),
        name: "North Depot".into(),
        address1: String::new(),
        city: String::new(),
        state: String::new(),
        postal_code: String::new(),
        country: String::new(),
        phone: None,
        email: None,
        manager_name: None,
        is_default: false,
        priority: 0,
    }
}

// ============================================================================
// Warehouse Tests
// ============================================================================

#[cfg(test)]
mod warehouse_tests {
    use super::*;

    /// Codes are unique per tenant among live warehouses
    #[tokio::test]
    async fn test_duplicate_code_conflicts() {
        let h = harness();
        h.services
            .warehouses
            .create(TENANT, warehouse_input("WH-N"))
            .await
            .unwrap();

        let err = h
            .services
            .warehouses
            .create(TENANT, warehouse_input("WH-N"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));

        // Another tenant may reuse it
        h.services
            .warehouses
            .create(OTHER_TENANT, warehouse_input("WH-N"))
            .await
            .unwrap();
    }

    /// Malformed codes and empty names are rejected
    #[tokio::test]
    async fn test_create_validation() {
        let h = harness();
        let err = h
            .services
            .warehouses
            .create(TENANT, warehouse_input("wh lower"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let mut nameless = warehouse_input("WH-X");
        nameless.name = String::new();
        let err = h.services.warehouses.create(TENANT, nameless).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    /// Updates change only the given fields and refresh the cached copy
    #[tokio::test]
    async fn test_update_refreshes_cache() {
        let h = harness();
        let wh = warehouse(&h, "WH-1").await;
        let cached = h.services.warehouses.get(TENANT, wh.id).await.unwrap();
        assert_eq!(cached.status, WarehouseStatus::Active);

        h.services
            .warehouses
            .update(
                TENANT,
                wh.id,
                UpdateWarehouseInput {
                    status: Some(WarehouseStatus::Inactive),
                    manager_name: Some("K. Somchai".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let fetched = h.services.warehouses.get(TENANT, wh.id).await.unwrap();
        assert_eq!(fetched.status, WarehouseStatus::Inactive);
        assert_eq!(fetched.manager_name.as_deref(), Some("K. Somchai"));
        assert_eq!(fetched.name, wh.name);
    }

    /// Deleted warehouses disappear from reads and listings
    #[tokio::test]
    async fn test_soft_delete() {
        let h = harness();
        let wh = warehouse(&h, "WH-1").await;
        warehouse(&h, "WH-2").await;
        h.services.warehouses.get(TENANT, wh.id).await.unwrap();

        h.services.warehouses.delete(TENANT, wh.id).await.unwrap();

        let err = h.services.warehouses.get(TENANT, wh.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let listing = h
            .services
            .warehouses
            .list(TENANT, None, Pagination::default())
            .await
            .unwrap();
        assert_eq!(listing.pagination.total_items, 1);
    }
}

// ============================================================================
// Supplier Tests
// ============================================================================

#[cfg(test)]
mod supplier_tests {
    use super::*;

    /// New suppliers start with empty aggregates
    #[tokio::test]
    async fn test_create_supplier() {
        let h = harness();
        let created = supplier(&h, "SUP-9").await;
        assert_eq!(created.total_orders, 0);
        assert_eq!(created.total_spent, Decimal::ZERO);
    }

    /// Lead times outside 0..=365 and bad emails are rejected
    #[tokio::test]
    async fn test_supplier_validation() {
        let h = harness();
        let err = h
            .services
            .suppliers
            .create(
                TENANT,
                CreateSupplierInput {
                    code: "SUP-1".into(),
                    name: "Acme".into(),
                    contact_name: None,
                    email: Some("not-an-email".into()),
                    phone: None,
                    payment_terms: None,
                    lead_time_days: Some(400),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    /// Updates and soft deletes
    #[tokio::test]
    async fn test_update_and_delete_supplier() {
        let h = harness();
        let created = supplier(&h, "SUP-1").await;

        let updated = h
            .services
            .suppliers
            .update(
                TENANT,
                created.id,
                UpdateSupplierInput {
                    lead_time_days: Some(14),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.lead_time_days, Some(14));
        assert_eq!(updated.payment_terms, created.payment_terms);

        h.services.suppliers.delete(TENANT, created.id).await.unwrap();
        let err = h.services.suppliers.get(TENANT, created.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Well-formed codes always pass validation
        #[test]
        fn prop_valid_codes_accepted(code in "[A-Z0-9][A-Z0-9_-]{1,19}") {
            prop_assert!(validate_code(&code).is_ok());
        }

        /// Codes containing lowercase letters never pass
        #[test]
        fn prop_lowercase_codes_rejected(prefix in "[A-Z]{1,5}", lower in "[a-z]{1,5}") {
            let code = format!("{}{}", prefix, lower);
            prop_assert!(validate_code(&code).is_err());
        }
    }
}
