//! Agent runtime: the aggregation cycle loop.
//!
//! One task owns the [`Aggregator`] and serialises everything that touches
//! it. Capture sources push events over a channel; a fixed-period timer
//! triggers each emission. Per cycle the task:
//! 1. Builds the sample and resets the windowed counters
//! 2. Publishes the sample to the status board
//! 3. Hands the sample to the collector without waiting for the POST
//!
//! A slow or failing collector therefore never delays the next cycle.

use crate::aggregator::{Aggregator, AggregatorSnapshot};
use crate::config::AgentConfig;
use crate::delivery::Collector;
use crate::monitor::{EventSender, InputEvent};
use crate::status::{AgentStatus, StatusBoard};
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Starts telemetry agents.
pub struct TelemetryAgent;

impl TelemetryAgent {
    /// Spawns the cycle loop on the current tokio runtime.
    ///
    /// The first sample is emitted one full interval after this call.
    pub fn start(config: &AgentConfig, collector: Collector, board: Arc<StatusBoard>) -> AgentHandle {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let interval = config.interval();

        tracing::info!(
            interval_ms = config.interval_ms,
            endpoint = %collector.endpoint(),
            "Telemetry agent started"
        );

        let task = tokio::spawn(run_cycles(
            Aggregator::new(Instant::now()),
            event_rx,
            shutdown_rx,
            interval,
            collector,
            Arc::clone(&board),
        ));

        AgentHandle {
            sender: EventSender::new(event_tx),
            shutdown: shutdown_tx,
            task,
            board,
        }
    }
}

/// Control handle for a running agent.
pub struct AgentHandle {
    sender: EventSender,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<Aggregator>,
    board: Arc<StatusBoard>,
}

impl AgentHandle {
    /// Sender for capture sources.
    pub fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    pub fn status(&self) -> AgentStatus {
        self.board.current()
    }

    /// Stops the timer and closes the event channel.
    ///
    /// Sources see their sends fail and detach. POSTs already in flight
    /// are left to finish on their own. Returns the final counters.
    pub async fn stop(self) -> AggregatorSnapshot {
        let _ = self.shutdown.send(());
        drop(self.sender);

        match self.task.await {
            Ok(aggregator) => {
                tracing::info!("Telemetry agent stopped");
                aggregator.snapshot()
            }
            Err(e) => {
                tracing::error!(error = %e, "Agent task ended abnormally");
                AggregatorSnapshot::default()
            }
        }
    }
}

async fn run_cycles(
    mut aggregator: Aggregator,
    mut events: mpsc::UnboundedReceiver<InputEvent>,
    mut shutdown: oneshot::Receiver<()>,
    interval: Duration,
    collector: Collector,
    board: Arc<StatusBoard>,
) -> Aggregator {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => break,
            _ = ticker.tick() => run_cycle(&mut aggregator, &collector, &board),
            Some(event) = events.recv() => aggregator.handle(&event),
        }
    }

    events.close();
    aggregator
}

fn run_cycle(aggregator: &mut Aggregator, collector: &Collector, board: &Arc<StatusBoard>) {
    let sample = aggregator.emit(Instant::now(), Utc::now());

    tracing::debug!(
        mean_iki_ms = sample.typing.mean_iki_ms,
        variance_iki = sample.typing.variance_iki,
        burstiness = sample.typing.burstiness,
        total_keys = sample.typing.total_keys,
        backspace_rate = sample.typing.backspace_rate,
        distance_px = sample.mouse.distance_px,
        click_rate = sample.mouse.click_rate_per_sec,
        idle_ms = sample.idle_time_ms,
        "Aggregation cycle"
    );

    board.publish_sample(&sample);

    let board = Arc::clone(board);
    collector.dispatch(sample, move |status| board.publish_delivery(status));
}
