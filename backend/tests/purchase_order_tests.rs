//! Purchase order tests
//!
//! Tests for purchase orders including:
//! - Creation with numbering and totals
//! - Status workflow
//! - Partial and full receiving
//! - Rollback of rejected receipts

mod common;

use std::collections::HashMap;
use std::str::FromStr;

use common::*;
use inventory_service::services::purchase_order::{CreatePurchaseOrderInput, PurchaseOrderItemInput};
use inventory_service::AppError;
use rust_decimal::Decimal;
use shared::{Pagination, PurchaseOrder, PurchaseOrderStatus, StockKey};
use uuid::Uuid;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn item(quantity: i32, unit_cost: &str) -> PurchaseOrderItemInput {
    PurchaseOrderItemInput {
        product_id: Uuid::new_v4(),
        variant_id: None,
        quantity_ordered: quantity,
        unit_cost: dec(unit_cost),
        notes: None,
    }
}

fn order_input(supplier_id: Uuid, warehouse_id: Uuid, items: Vec<PurchaseOrderItemInput>) -> CreatePurchaseOrderInput {
    CreatePurchaseOrderInput {
        supplier_id,
        warehouse_id,
        expected_date: None,
        tax: dec("7.00"),
        shipping: dec("3.50"),
        currency_code: "USD".into(),
        notes: None,
        items,
    }
}

/// Create an order and walk it to ORDERED
async fn ordered_po(h: &Harness, items: Vec<PurchaseOrderItemInput>) -> PurchaseOrder {
    let warehouse = warehouse(h, "WH-MAIN").await;
    let supplier = supplier(h, "SUP-1").await;
    let po = h
        .services
        .purchase_orders
        .create(TENANT, order_input(supplier.id, warehouse.id, items))
        .await
        .unwrap();

    for next in [
        PurchaseOrderStatus::Submitted,
        PurchaseOrderStatus::Approved,
        PurchaseOrderStatus::Ordered,
    ] {
        h.services
            .purchase_orders
            .update_status(TENANT, po.id, next)
            .await
            .unwrap();
    }
    h.services.purchase_orders.get(TENANT, po.id).await.unwrap()
}

fn line_key(po: &PurchaseOrder, index: usize) -> StockKey {
    let line = &po.items[index];
    StockKey::new(po.warehouse_id, line.product_id, line.variant_id)
}

// ============================================================================
// Creation Tests
// ============================================================================

#[cfg(test)]
mod creation_tests {
    use super::*;

    /// Totals are computed from the lines plus tax and shipping
    #[tokio::test]
    async fn test_create_computes_totals() {
        let h = harness();
        let warehouse = warehouse(&h, "WH-1").await;
        let supplier = supplier(&h, "SUP-1").await;

        let po = h
            .services
            .purchase_orders
            .create(
                TENANT,
                order_input(supplier.id, warehouse.id, vec![item(10, "2.50"), item(4, "10.00")]),
            )
            .await
            .unwrap();

        assert_eq!(po.status, PurchaseOrderStatus::Draft);
        assert_eq!(po.items[0].subtotal, dec("25.00"));
        assert_eq!(po.items[1].subtotal, dec("40.00"));
        assert_eq!(po.subtotal, dec("65.00"));
        assert_eq!(po.total, dec("75.50"));
        assert!(po.items.iter().all(|i| i.quantity_received == 0));
    }

    /// PO numbers are sequential per tenant
    #[tokio::test]
    async fn test_po_numbers_are_sequential() {
        let h = harness();
        let warehouse = warehouse(&h, "WH-1").await;
        let supplier = supplier(&h, "SUP-1").await;

        let first = h
            .services
            .purchase_orders
            .create(TENANT, order_input(supplier.id, warehouse.id, vec![item(1, "1.00")]))
            .await
            .unwrap();
        let second = h
            .services
            .purchase_orders
            .create(TENANT, order_input(supplier.id, warehouse.id, vec![item(1, "1.00")]))
            .await
            .unwrap();

        assert!(first.po_number.starts_with("PO-"));
        assert!(first.po_number.ends_with("-000001"));
        assert!(second.po_number.ends_with("-000002"));
    }

    /// Orders need at least one line, positive quantities and known references
    #[tokio::test]
    async fn test_create_validation() {
        let h = harness();
        let warehouse = warehouse(&h, "WH-1").await;
        let supplier = supplier(&h, "SUP-1").await;

        let err = h
            .services
            .purchase_orders
            .create(TENANT, order_input(supplier.id, warehouse.id, vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let err = h
            .services
            .purchase_orders
            .create(TENANT, order_input(supplier.id, warehouse.id, vec![item(0, "1.00")]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let mut bad_currency = order_input(supplier.id, warehouse.id, vec![item(1, "1.00")]);
        bad_currency.currency_code = "usd".into();
        let err = h
            .services
            .purchase_orders
            .create(TENANT, bad_currency)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let err = h
            .services
            .purchase_orders
            .create(TENANT, order_input(Uuid::new_v4(), warehouse.id, vec![item(1, "1.00")]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    /// Disallowed status jumps are rejected
    #[tokio::test]
    async fn test_status_workflow() {
        let h = harness();
        let warehouse = warehouse(&h, "WH-1").await;
        let supplier = supplier(&h, "SUP-1").await;
        let po = h
            .services
            .purchase_orders
            .create(TENANT, order_input(supplier.id, warehouse.id, vec![item(1, "1.00")]))
            .await
            .unwrap();

        let err = h
            .services
            .purchase_orders
            .update_status(TENANT, po.id, PurchaseOrderStatus::Ordered)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition(_)));

        let err = h
            .services
            .purchase_orders
            .update_status(TENANT, po.id, PurchaseOrderStatus::Received)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition(_)));

        let cancelled = h
            .services
            .purchase_orders
            .update_status(TENANT, po.id, PurchaseOrderStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.status, PurchaseOrderStatus::Cancelled);

        let listing = h
            .services
            .purchase_orders
            .list(TENANT, Some(PurchaseOrderStatus::Cancelled), Pagination::default())
            .await
            .unwrap();
        assert_eq!(listing.pagination.total_items, 1);
    }
}

// ============================================================================
// Receiving Tests
// ============================================================================

#[cfg(test)]
mod receiving_tests {
    use super::*;

    /// Receiving one of two lines stays ORDERED; the second call completes the order
    #[tokio::test]
    async fn test_partial_then_full_receipt() {
        let h = harness();
        let po = ordered_po(&h, vec![item(10, "1.00"), item(5, "2.00")]).await;
        let (first_line, second_line) = (po.items[0].id, po.items[1].id);

        let after_first = h
            .services
            .purchase_orders
            .receive(TENANT, po.id, &HashMap::from([(first_line, 10)]))
            .await
            .unwrap();
        assert_eq!(after_first.status, PurchaseOrderStatus::Ordered);
        assert!(after_first.received_date.is_none());

        let first_stock = h
            .services
            .stock
            .get_stock_level(TENANT, &line_key(&po, 0))
            .await
            .unwrap();
        let second_stock = h
            .services
            .stock
            .get_stock_level(TENANT, &line_key(&po, 1))
            .await
            .unwrap();
        assert_eq!(first_stock.quantity_on_hand, 10);
        assert_eq!(second_stock.quantity_on_hand, 0);

        let after_second = h
            .services
            .purchase_orders
            .receive(TENANT, po.id, &HashMap::from([(second_line, 5)]))
            .await
            .unwrap();
        assert_eq!(after_second.status, PurchaseOrderStatus::Received);
        assert!(after_second.received_date.is_some());

        let second_stock = h
            .services
            .stock
            .get_stock_level(TENANT, &line_key(&po, 1))
            .await
            .unwrap();
        assert_eq!(second_stock.quantity_on_hand, 5);
    }

    /// Receipts accumulate per line
    #[tokio::test]
    async fn test_receipts_accumulate() {
        let h = harness();
        let po = ordered_po(&h, vec![item(10, "1.00")]).await;
        let line = po.items[0].id;

        for qty in [4, 6] {
            h.services
                .purchase_orders
                .receive(TENANT, po.id, &HashMap::from([(line, qty)]))
                .await
                .unwrap();
        }

        let po = h.services.purchase_orders.get(TENANT, po.id).await.unwrap();
        assert_eq!(po.items[0].quantity_received, 10);
        assert_eq!(po.status, PurchaseOrderStatus::Received);
    }

    /// Full receipt folds the order into the supplier's aggregates
    #[tokio::test]
    async fn test_full_receipt_updates_supplier() {
        let h = harness();
        let po = ordered_po(&h, vec![item(2, "5.00")]).await;

        h.services
            .purchase_orders
            .receive(TENANT, po.id, &HashMap::from([(po.items[0].id, 2)]))
            .await
            .unwrap();

        let supplier = h.services.suppliers.get(TENANT, po.supplier_id).await.unwrap();
        assert_eq!(supplier.total_orders, 1);
        assert_eq!(supplier.total_spent, po.total);
    }

    /// A receipt naming an unknown line changes nothing
    #[tokio::test]
    async fn test_unknown_line_rolls_back() {
        let h = harness();
        let po = ordered_po(&h, vec![item(3, "1.00")]).await;

        let err = h
            .services
            .purchase_orders
            .receive(
                TENANT,
                po.id,
                &HashMap::from([(po.items[0].id, 3), (Uuid::new_v4(), 1)]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let stock = h
            .services
            .stock
            .get_stock_level(TENANT, &line_key(&po, 0))
            .await
            .unwrap();
        assert_eq!(stock.quantity_on_hand, 0);
        let reloaded = h.services.purchase_orders.get(TENANT, po.id).await.unwrap();
        assert_eq!(reloaded.items[0].quantity_received, 0);
        assert_eq!(reloaded.status, PurchaseOrderStatus::Ordered);
    }

    /// Draft orders cannot be received
    #[tokio::test]
    async fn test_draft_not_receivable() {
        let h = harness();
        let warehouse = warehouse(&h, "WH-1").await;
        let supplier = supplier(&h, "SUP-1").await;
        let po = h
            .services
            .purchase_orders
            .create(TENANT, order_input(supplier.id, warehouse.id, vec![item(1, "1.00")]))
            .await
            .unwrap();

        let err = h
            .services
            .purchase_orders
            .receive(TENANT, po.id, &HashMap::from([(po.items[0].id, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition(_)));
    }

    /// Missing orders are NotFound
    #[tokio::test]
    async fn test_receive_missing_order() {
        let h = harness();
        let err = h
            .services
            .purchase_orders
            .receive(TENANT, Uuid::new_v4(), &HashMap::from([(Uuid::new_v4(), 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
