//! Queue + worker handing events to a sink

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};

use super::{EventSink, HttpEventSink, InventoryEvent, LogEventSink};
use crate::config::EventsConfig;
use crate::error::AppResult;

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Fire-and-forget publisher
///
/// `publish` never blocks: when the queue is full or the worker is gone the
/// event is dropped with a warning.
#[derive(Clone)]
pub struct EventDispatcher {
    sender: Option<mpsc::Sender<InventoryEvent>>,
}

impl EventDispatcher {
    /// Build the configured sink and start the worker. Must run inside a tokio runtime.
    pub fn from_config(config: &EventsConfig) -> AppResult<Self> {
        let sink: Arc<dyn EventSink> = match &config.endpoint {
            Some(endpoint) => {
                tracing::info!(endpoint = %endpoint, "Publishing events to webhook");
                Arc::new(HttpEventSink::new(
                    endpoint.clone(),
                    config.signing_secret.clone(),
                )?)
            }
            None => {
                tracing::info!("No event endpoint configured, events are logged only");
                Arc::new(LogEventSink)
            }
        };
        Ok(Self::spawn(sink, config))
    }

    /// Start a worker delivering to `sink`
    pub fn spawn(sink: Arc<dyn EventSink>, config: &EventsConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        tokio::spawn(run_worker(
            receiver,
            sink,
            config.max_attempts.max(1),
            config.initial_backoff(),
        ));
        Self {
            sender: Some(sender),
        }
    }

    /// A dispatcher that discards everything
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn publish(&self, event: InventoryEvent) {
        let Some(sender) = &self.sender else {
            return;
        };

        match sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!(
                    tenant_id = %event.tenant_id,
                    event_type = %event.event_type,
                    "Event queue full, dropping event"
                );
            }
            Err(TrySendError::Closed(event)) => {
                tracing::warn!(
                    tenant_id = %event.tenant_id,
                    event_type = %event.event_type,
                    "Event worker stopped, dropping event"
                );
            }
        }
    }
}

async fn run_worker(
    mut receiver: mpsc::Receiver<InventoryEvent>,
    sink: Arc<dyn EventSink>,
    max_attempts: u32,
    initial_backoff: Duration,
) {
    while let Some(event) = receiver.recv().await {
        deliver_with_retry(sink.as_ref(), &event, max_attempts, initial_backoff).await;
    }
    tracing::debug!("Event worker shutting down");
}

async fn deliver_with_retry(
    sink: &dyn EventSink,
    event: &InventoryEvent,
    max_attempts: u32,
    initial_backoff: Duration,
) -> bool {
    let mut backoff = initial_backoff;

    for attempt in 1..=max_attempts {
        match sink.deliver(event).await {
            Ok(()) => {
                tracing::debug!(
                    tenant_id = %event.tenant_id,
                    event_type = %event.event_type,
                    attempt = attempt,
                    "Event delivered"
                );
                return true;
            }
            Err(e) if attempt < max_attempts => {
                tracing::warn!(
                    tenant_id = %event.tenant_id,
                    event_type = %event.event_type,
                    attempt = attempt,
                    error = %e,
                    "Event delivery failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
            Err(e) => {
                tracing::error!(
                    tenant_id = %event.tenant_id,
                    event_type = %event.event_type,
                    attempts = max_attempts,
                    error = %e,
                    "Event delivery abandoned"
                );
            }
        }
    }
    false
}
