//! flowmon - Input Telemetry Agent
//!
//! Captures keyboard and pointer activity, aggregates it every cycle and
//! ships one sample per cycle to the configured collector.
//!
//! Usage:
//!   flowmon            capture from the platform input source
//!   flowmon -          replay NDJSON input events from stdin
//!   flowmon <file>     replay NDJSON input events from a recorded file

use flowmon::aggregator::AggregatorSnapshot;
use flowmon::monitor::{spawn_replay, EventSender, ReplayHandle};
use flowmon::status::AgentStatus;
use flowmon::{AgentConfig, Collector, StatusBoard, TelemetryAgent};
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// How long exit waits for background tasks before abandoning them.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Where input events come from.
enum SourceArg {
    Platform,
    Stdin,
    File(PathBuf),
}

impl SourceArg {
    fn from_args() -> Self {
        match std::env::args_os().nth(1) {
            None => Self::Platform,
            Some(arg) if arg == "-" => Self::Stdin,
            Some(arg) => Self::File(PathBuf::from(arg)),
        }
    }
}

/// A running capture source.
enum ActiveSource {
    Replay(ReplayHandle),
    #[cfg(windows)]
    Hooks(flowmon::monitor::HookThread),
    #[cfg(feature = "rdev")]
    Rdev,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("flowmon=info")),
        )
        .init();

    let config = AgentConfig::load()?;
    let source = SourceArg::from_args();

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run_application(config, source));

    // A replay source may still be blocked reading stdin; don't wait on it.
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

async fn run_application(
    config: AgentConfig,
    source: SourceArg,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║              flowmon - Input Telemetry Agent               ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();

    let board = Arc::new(StatusBoard::new());

    // Status server
    let server = if config.status_server {
        println!("🔧 Starting status server...");
        let (addr, handle) = flowmon::server::start_server(config.status_port, Arc::clone(&board)).await?;
        println!("   ✓ Listening on http://{}", addr);
        Some(handle)
    } else {
        None
    };

    // Agent
    println!("🔧 Starting telemetry agent...");
    let collector = Collector::new(&config)?;
    let agent = TelemetryAgent::start(&config, collector, Arc::clone(&board));
    println!(
        "   ✓ Sending a sample every {} ms to {}",
        config.interval_ms, config.endpoint
    );

    // Capture source
    println!("🔧 Attaching input source...");
    let active = attach_source(source, agent.sender())?;

    // Ctrl+C
    let (shutdown_tx, mut shutdown_rx) = mpsc::unbounded_channel::<()>();
    ctrlc::set_handler(move || {
        println!("\n🛑 Shutdown signal received...");
        let _ = shutdown_tx.send(());
    })?;

    println!();
    println!("════════════════════════════════════════════════════════════════");
    println!("🎯 flowmon is running. Press Ctrl+C to quit.");
    if config.status_server {
        println!("   • GET /api/status - Latest sample and delivery status");
        println!("   • WS  /ws         - Live cycle updates");
    }
    println!("════════════════════════════════════════════════════════════════");
    println!();

    let active = match active {
        ActiveSource::Replay(replay) => {
            tokio::select! {
                _ = shutdown_rx.recv() => {}
                summary = replay.finished() => {
                    match summary {
                        Some(summary) => tracing::info!(
                            forwarded = summary.forwarded,
                            skipped = summary.skipped,
                            "Replay finished, emitting final window"
                        ),
                        None => tracing::error!("Replay thread ended without a summary"),
                    }
                    // Let one more cycle fire so the tail of the replay is sent.
                    tokio::select! {
                        _ = shutdown_rx.recv() => {}
                        _ = tokio::time::sleep(config.interval()) => {}
                    }
                }
            }
            None
        }
        #[cfg(any(windows, feature = "rdev"))]
        other => {
            let _ = shutdown_rx.recv().await;
            Some(other)
        }
    };

    println!("\n⏳ Shutting down...");
    let snapshot = agent.stop().await;
    let status = board.current();
    detach_source(active).await;

    if let Some(handle) = server {
        handle.abort();
    }

    print_summary(&snapshot, &status);
    println!("\n👋 flowmon has exited. Goodbye!");
    Ok(())
}

fn attach_source(
    source: SourceArg,
    sender: EventSender,
) -> Result<ActiveSource, Box<dyn std::error::Error>> {
    match source {
        SourceArg::File(path) => {
            let file = std::fs::File::open(&path)?;
            println!("   ✓ Replaying {}", path.display());
            Ok(ActiveSource::Replay(spawn_replay(BufReader::new(file), sender)))
        }
        SourceArg::Stdin => {
            println!("   ✓ Replaying NDJSON from stdin");
            Ok(ActiveSource::Replay(spawn_replay(
                BufReader::new(std::io::stdin()),
                sender,
            )))
        }
        SourceArg::Platform => attach_platform_source(sender),
    }
}

#[cfg(windows)]
fn attach_platform_source(sender: EventSender) -> Result<ActiveSource, Box<dyn std::error::Error>> {
    let hooks = flowmon::monitor::spawn_hook_thread(sender)?;
    println!("   ✓ Keyboard and mouse hooks installed");
    Ok(ActiveSource::Hooks(hooks))
}

#[cfg(all(not(windows), feature = "rdev"))]
fn attach_platform_source(sender: EventSender) -> Result<ActiveSource, Box<dyn std::error::Error>> {
    // The listener thread cannot be joined; it ignores events after stop.
    let _listener = flowmon::monitor::spawn_rdev_listener(sender);
    println!("   ✓ Global input listener started");
    Ok(ActiveSource::Rdev)
}

#[cfg(all(not(windows), not(feature = "rdev")))]
fn attach_platform_source(sender: EventSender) -> Result<ActiveSource, Box<dyn std::error::Error>> {
    tracing::warn!("No platform input source in this build, reading NDJSON from stdin");
    println!("   ⚠ No platform input source, replaying NDJSON from stdin");
    Ok(ActiveSource::Replay(spawn_replay(
        BufReader::new(std::io::stdin()),
        sender,
    )))
}

async fn detach_source(active: Option<ActiveSource>) {
    match active {
        #[cfg(windows)]
        Some(ActiveSource::Hooks(hooks)) => {
            // Joins the hook thread.
            if tokio::task::spawn_blocking(move || hooks.stop()).await.is_err() {
                tracing::error!("Hook thread shutdown panicked");
            }
        }
        // Replay threads and the rdev listener see the closed channel and
        // detach on their next event.
        _ => {}
    }
}

fn print_summary(snapshot: &AggregatorSnapshot, status: &AgentStatus) {
    println!();
    println!("════════════════════════════════════════════════════════════════");
    println!("📊 Session Summary");
    println!("════════════════════════════════════════════════════════════════");
    println!("   Cycles:        {}", status.cycles);
    println!("   Keystrokes:    {}", snapshot.total_keys);
    println!("   Backspaces:    {}", snapshot.backspaces);
    println!("   Last delivery: {}", status.delivery);

    if let Some(sample) = &status.last_sample {
        println!();
        println!("Last sample:");
        println!("   Mean IKI:      {} ms", sample.typing.mean_iki_ms);
        println!("   Burstiness:    {}", sample.typing.burstiness);
        println!("   Distance:      {} px", sample.mouse.distance_px);
        println!("   Click rate:    {} /s", sample.mouse.click_rate_per_sec);
        println!("   Idle:          {} ms", sample.idle_time_ms);
    }
    println!("════════════════════════════════════════════════════════════════");
}
