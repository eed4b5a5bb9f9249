//! Transfer tests
//!
//! Tests for inter-warehouse transfers including:
//! - Creation rules and numbering
//! - Status-only transitions
//! - Atomic completion with and without overrides

mod common;

use std::collections::HashMap;

use common::*;
use inventory_service::services::transfer::{CreateTransferInput, TransferItemInput};
use inventory_service::AppError;
use shared::{StockKey, Transfer, TransferStatus};
use uuid::Uuid;

fn transfer_input(from: Uuid, to: Uuid, lines: &[(Uuid, i32)]) -> CreateTransferInput {
    CreateTransferInput {
        from_warehouse_id: from,
        to_warehouse_id: to,
        requested_by: Some("ops@example.com".into()),
        notes: None,
        items: lines
            .iter()
            .map(|(product_id, qty)| TransferItemInput {
                product_id: *product_id,
                variant_id: None,
                quantity_requested: *qty,
                notes: None,
            })
            .collect(),
    }
}

struct Setup {
    h: Harness,
    from: Uuid,
    to: Uuid,
}

async fn setup() -> Setup {
    let h = harness();
    let from = warehouse(&h, "WH-SRC").await.id;
    let to = warehouse(&h, "WH-DST").await.id;
    Setup { h, from, to }
}

async fn create(s: &Setup, lines: &[(Uuid, i32)]) -> Transfer {
    s.h.services
        .transfers
        .create(TENANT, transfer_input(s.from, s.to, lines))
        .await
        .unwrap()
}

async fn on_hand(h: &Harness, key: &StockKey) -> i32 {
    h.services
        .stock
        .get_stock_level(TENANT, key)
        .await
        .unwrap()
        .quantity_on_hand
}

// ============================================================================
// Creation and Status Tests
// ============================================================================

#[cfg(test)]
mod status_tests {
    use super::*;

    /// Transfers start PENDING with a TR number
    #[tokio::test]
    async fn test_create_transfer() {
        let s = setup().await;
        let transfer = create(&s, &[(Uuid::new_v4(), 3)]).await;

        assert_eq!(transfer.status, TransferStatus::Pending);
        assert!(transfer.transfer_number.starts_with("TR-"));
        assert!(transfer.transfer_number.ends_with("-000001"));
        assert_eq!(transfer.items[0].quantity_shipped, 0);
    }

    /// Source and destination must differ and exist
    #[tokio::test]
    async fn test_create_validation() {
        let s = setup().await;

        let err = s
            .h
            .services
            .transfers
            .create(TENANT, transfer_input(s.from, s.from, &[(Uuid::new_v4(), 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let err = s
            .h
            .services
            .transfers
            .create(TENANT, transfer_input(s.from, Uuid::new_v4(), &[(Uuid::new_v4(), 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = s
            .h
            .services
            .transfers
            .create(TENANT, transfer_input(s.from, s.to, &[(Uuid::new_v4(), 0)]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let err = s
            .h
            .services
            .transfers
            .create(TENANT, transfer_input(s.from, s.to, &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    /// Shipping stamps shipped_at without moving stock
    #[tokio::test]
    async fn test_ship_then_cancel() {
        let s = setup().await;
        let product = Uuid::new_v4();
        let source = StockKey::new(s.from, product, None);
        stock_up(&s.h, &source, 5).await;
        let transfer = create(&s, &[(product, 5)]).await;

        let shipped = s
            .h
            .services
            .transfers
            .update_status(TENANT, transfer.id, TransferStatus::InTransit)
            .await
            .unwrap();
        assert_eq!(shipped.status, TransferStatus::InTransit);
        assert!(shipped.shipped_at.is_some());
        assert_eq!(on_hand(&s.h, &source).await, 5);

        let err = s
            .h
            .services
            .transfers
            .update_status(TENANT, transfer.id, TransferStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition(_)));

        let cancelled = s
            .h
            .services
            .transfers
            .update_status(TENANT, transfer.id, TransferStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.status, TransferStatus::Cancelled);

        let err = s
            .h
            .services
            .transfers
            .complete(TENANT, transfer.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition(_)));
    }
}

// ============================================================================
// Completion Tests
// ============================================================================

#[cfg(test)]
mod completion_tests {
    use super::*;

    /// Completion debits the source and credits the destination for each line
    #[tokio::test]
    async fn test_complete_moves_stock() {
        let s = setup().await;
        let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());
        stock_up(&s.h, &StockKey::new(s.from, p1, None), 10).await;
        stock_up(&s.h, &StockKey::new(s.from, p2, None), 4).await;
        let transfer = create(&s, &[(p1, 6), (p2, 4)]).await;

        let done = s
            .h
            .services
            .transfers
            .complete(TENANT, transfer.id, None)
            .await
            .unwrap();
        assert_eq!(done.status, TransferStatus::Completed);
        assert!(done.completed_at.is_some());
        assert!(done.shipped_at.is_some());
        assert!(done
            .items
            .iter()
            .all(|i| i.quantity_shipped == i.quantity_requested && i.quantity_received == i.quantity_requested));

        assert_eq!(on_hand(&s.h, &StockKey::new(s.from, p1, None)).await, 4);
        assert_eq!(on_hand(&s.h, &StockKey::new(s.to, p1, None)).await, 6);
        assert_eq!(on_hand(&s.h, &StockKey::new(s.from, p2, None)).await, 0);
        assert_eq!(on_hand(&s.h, &StockKey::new(s.to, p2, None)).await, 4);
    }

    /// A short second line rolls back the first line's movement
    #[tokio::test]
    async fn test_short_line_aborts_whole_transfer() {
        let s = setup().await;
        let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());
        stock_up(&s.h, &StockKey::new(s.from, p1, None), 10).await;
        stock_up(&s.h, &StockKey::new(s.from, p2, None), 1).await;
        let transfer = create(&s, &[(p1, 5), (p2, 3)]).await;

        let err = s
            .h
            .services
            .transfers
            .complete(TENANT, transfer.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock(_)));

        assert_eq!(on_hand(&s.h, &StockKey::new(s.from, p1, None)).await, 10);
        assert_eq!(on_hand(&s.h, &StockKey::new(s.to, p1, None)).await, 0);
        assert_eq!(on_hand(&s.h, &StockKey::new(s.from, p2, None)).await, 1);

        let reloaded = s.h.services.transfers.get(TENANT, transfer.id).await.unwrap();
        assert_eq!(reloaded.status, TransferStatus::Pending);
        assert!(reloaded.items.iter().all(|i| i.quantity_shipped == 0));
    }

    /// Overrides replace requested quantities; zero moves nothing for that line
    #[tokio::test]
    async fn test_complete_with_overrides() {
        let s = setup().await;
        let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());
        stock_up(&s.h, &StockKey::new(s.from, p1, None), 10).await;
        let transfer = create(&s, &[(p1, 8), (p2, 2)]).await;

        let overrides = HashMap::from([(transfer.items[0].id, 7), (transfer.items[1].id, 0)]);
        let done = s
            .h
            .services
            .transfers
            .complete(TENANT, transfer.id, Some(&overrides))
            .await
            .unwrap();

        assert_eq!(done.items[0].quantity_received, 7);
        assert_eq!(done.items[1].quantity_received, 0);
        assert_eq!(on_hand(&s.h, &StockKey::new(s.from, p1, None)).await, 3);
        assert_eq!(on_hand(&s.h, &StockKey::new(s.to, p1, None)).await, 7);
    }

    /// Negative overrides are rejected before anything moves
    #[tokio::test]
    async fn test_negative_override_rejected() {
        let s = setup().await;
        let p1 = Uuid::new_v4();
        stock_up(&s.h, &StockKey::new(s.from, p1, None), 10).await;
        let transfer = create(&s, &[(p1, 2)]).await;

        let overrides = HashMap::from([(transfer.items[0].id, -1)]);
        let err = s
            .h
            .services
            .transfers
            .complete(TENANT, transfer.id, Some(&overrides))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert_eq!(on_hand(&s.h, &StockKey::new(s.from, p1, None)).await, 10);
    }

    /// Reserved units at the source cannot be transferred
    #[tokio::test]
    async fn test_reserved_units_not_transferable() {
        use inventory_service::services::reservation::ReserveStockInput;

        let s = setup().await;
        let p1 = Uuid::new_v4();
        let source = StockKey::new(s.from, p1, None);
        stock_up(&s.h, &source, 5).await;
        s.h.services
            .reservations
            .reserve(
                TENANT,
                ReserveStockInput {
                    warehouse_id: s.from,
                    product_id: p1,
                    variant_id: None,
                    order_id: Uuid::new_v4(),
                    quantity: 4,
                    ttl_secs: None,
                },
            )
            .await
            .unwrap();
        let transfer = create(&s, &[(p1, 2)]).await;

        let err = s
            .h
            .services
            .transfers
            .complete(TENANT, transfer.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock(_)));
    }
}
