//! Periodic background sweeps
//!
//! Both jobs walk every tenant the store knows about. A failing tenant is
//! logged and skipped; the next tick tries again.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::JobsConfig;
use crate::error::AppResult;
use crate::services::{AlertService, ReservationService};
use crate::store::InventoryStore;

/// Start the reservation sweep and alert scan. Returns no handles when disabled.
pub fn spawn(
    store: Arc<dyn InventoryStore>,
    reservations: ReservationService,
    alerts: AlertService,
    config: &JobsConfig,
) -> Vec<JoinHandle<()>> {
    if !config.enabled {
        tracing::info!("Background jobs disabled");
        return Vec::new();
    }

    let sweep_every = Duration::from_secs(config.reservation_sweep_secs.max(1));
    let scan_every = Duration::from_secs(config.alert_scan_secs.max(1));
    tracing::info!(
        reservation_sweep_secs = sweep_every.as_secs(),
        alert_scan_secs = scan_every.as_secs(),
        "Starting background jobs"
    );

    let sweep_store = store.clone();
    let sweep = tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(e) = sweep_expired_reservations(sweep_store.as_ref(), &reservations).await {
                tracing::warn!(error = %e, "Reservation sweep failed");
            }
        }
    });

    let scan = tokio::spawn(async move {
        let mut interval = tokio::time::interval(scan_every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(e) = scan_alerts(store.as_ref(), &alerts).await {
                tracing::warn!(error = %e, "Alert scan failed");
            }
        }
    });

    vec![sweep, scan]
}

/// Release expired reservations for every tenant; returns the total released
pub async fn sweep_expired_reservations(
    store: &dyn InventoryStore,
    reservations: &ReservationService,
) -> AppResult<u64> {
    let mut total = 0;
    for tenant_id in store.known_tenants().await? {
        match reservations.release_expired(&tenant_id).await {
            Ok(released) => total += released,
            Err(e) => tracing::warn!(tenant_id = %tenant_id, error = %e, "Reservation sweep skipped tenant"),
        }
    }
    Ok(total)
}

/// Evaluate alerts for every tenant; returns how many alerts were created
pub async fn scan_alerts(store: &dyn InventoryStore, alerts: &AlertService) -> AppResult<usize> {
    let mut total = 0;
    for tenant_id in store.known_tenants().await? {
        match alerts.evaluate_low_stock(&tenant_id).await {
            Ok(created) => total += created.len(),
            Err(e) => tracing::warn!(tenant_id = %tenant_id, error = %e, "Alert scan skipped tenant"),
        }
    }
    Ok(total)
}
