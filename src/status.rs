//! Local status indicator.
//!
//! Holds the latest sample and delivery outcome for whoever wants to show
//! them (the status server, the shutdown summary), and fans every change
//! out to WebSocket subscribers.

use crate::aggregator::TelemetrySample;
use crate::delivery::DeliveryStatus;
use serde::Serialize;
use tokio::sync::{broadcast, watch};

/// Capacity of the update channel; slow subscribers lose the oldest updates.
const UPDATE_CAPACITY: usize = 100;

/// What the local indicator shows.
#[derive(Debug, Clone, Serialize)]
pub struct AgentStatus {
    /// Outcome of the most recently finished POST.
    pub delivery: DeliveryStatus,

    /// Sample built by the most recent cycle.
    pub last_sample: Option<TelemetrySample>,

    /// Completed aggregation cycles.
    pub cycles: u64,
}

impl Default for AgentStatus {
    fn default() -> Self {
        Self {
            delivery: DeliveryStatus::Idle,
            last_sample: None,
            cycles: 0,
        }
    }
}

/// Shared status cell plus an update feed.
#[derive(Debug)]
pub struct StatusBoard {
    status: watch::Sender<AgentStatus>,
    updates: broadcast::Sender<String>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBoard {
    pub fn new() -> Self {
        let (status, _) = watch::channel(AgentStatus::default());
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        Self { status, updates }
    }

    /// Copy of the current status.
    pub fn current(&self) -> AgentStatus {
        self.status.borrow().clone()
    }

    /// Receiver that resolves whenever the status changes.
    pub fn watch(&self) -> watch::Receiver<AgentStatus> {
        self.status.subscribe()
    }

    /// Feed of serialized update messages.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.updates.subscribe()
    }

    /// Records a freshly built sample and bumps the cycle count.
    pub fn publish_sample(&self, sample: &TelemetrySample) {
        self.status.send_modify(|status| {
            status.last_sample = Some(sample.clone());
            status.cycles += 1;
        });
        self.broadcast("sample", sample);
    }

    /// Records the outcome of a delivery attempt.
    pub fn publish_delivery(&self, delivery: DeliveryStatus) {
        self.status.send_modify(|status| status.delivery = delivery);
        self.broadcast("delivery", &delivery);
    }

    /// Current status as a WebSocket greeting.
    pub fn initial_message(&self) -> Option<String> {
        update_message("initial_state", &self.current())
    }

    fn broadcast(&self, update_type: &str, data: &impl Serialize) {
        if let Some(message) = update_message(update_type, data) {
            // No subscribers is fine.
            let _ = self.updates.send(message);
        }
    }
}

fn update_message(update_type: &str, data: &impl Serialize) -> Option<String> {
    let message = serde_json::json!({
        "type": update_type,
        "data": data,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    serde_json::to_string(&message).ok()
}
