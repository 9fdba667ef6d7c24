//! # Wititude Simulation
//!
//! Runs a full session headless: simulated platform, recording sink, and a
//! scripted tracker that recognizes a bottle, follows it around for a few
//! seconds, then loses it.
//!
//! ```text
//! wititude_sim [config.toml]
//! RUST_LOG=debug wititude_sim
//! ```

use std::process::ExitCode;
use std::time::Duration;

use crossbeam_channel::{select, tick};
use tracing_subscriber::EnvFilter;
use wititude::sim::{simulated_platform, CallLog, ScriptedTracker};
use wititude::{ProjectionUpdate, Session, SessionConfig, SessionResult};
use wititude_render::RecordingSink;
use wititude_tracking::{status_channel, StatusNotification, StatusReceiver};

/// Tracked updates in the bottle script.
const TRACKED_UPDATES: u16 = 90;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "simulation failed");
            ExitCode::FAILURE
        }
    }
}

fn run() -> SessionResult<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };

    println!("═══════════════════════════════════════════════════════════════════");
    println!("                    WITITUDE SIMULATION");
    println!("═══════════════════════════════════════════════════════════════════");
    println!("  Collection: {}", config.target_collection);
    println!("  Frame rate: {} fps", config.target_fps);
    println!();

    let calls = CallLog::new();
    let (status, ui) = status_channel(config.status_capacity);
    let frame_interval = config.driver_config().interval();
    let mut session = Session::create(config, simulated_platform(&calls), status)?;

    let sink = RecordingSink::new(4);
    let frames = sink.log();
    session.on_surface_ready(Box::new(sink))?;
    session.on_fov_changed(ProjectionUpdate::from_fov(63.0_f32.to_radians(), 9.0 / 16.0, 0.05, 100.0));
    session.on_resume()?;

    let tracker = ScriptedTracker::bottle(TRACKED_UPDATES, frame_interval).spawn(session.tracking_sender())?;

    let stats_tick = tick(Duration::from_secs(1));
    let ui_tick = tick(Duration::from_millis(50));
    while !tracker.is_finished() {
        select! {
            recv(stats_tick) -> _ => {
                let stats = session.stats();
                tracing::info!(
                    tracked = stats.tracked_targets,
                    frames = stats.render.total_frames,
                    draws = stats.render.draws_submitted,
                    overruns = stats.driver.overruns,
                    events = stats.events_processed,
                    "session stats"
                );
            }
            recv(ui_tick) -> _ => show_status(&ui),
        }
    }
    match tracker.join() {
        Ok(replayed) => tracing::info!(replayed, "tracker script finished"),
        Err(_) => tracing::error!("scripted tracker panicked"),
    }

    // Let the pump and one more frame catch up with the final lost event.
    std::thread::sleep(frame_interval * 2);
    show_status(&ui);

    session.on_pause();
    let stats = session.stats();
    session.on_destroy();

    println!();
    println!("═══════════════════════════════════════════════════════════════════");
    println!("  Frames presented:    {}", frames.presented());
    println!("  Draws submitted:     {}", stats.render.draws_submitted);
    println!("  Failed ticks:        {}", stats.driver.failed_ticks);
    println!("  Overruns:            {}", stats.driver.overruns);
    println!("  Worst frame:         {} us", stats.render.worst_frame_time_us);
    println!("  Tracked updates:     {}", stats.tracking.tracked_applied);
    println!("  Targets at shutdown: {}", stats.tracked_targets);
    println!("  Platform calls:      {}", calls.calls().join(", "));
    println!("═══════════════════════════════════════════════════════════════════");
    Ok(())
}

fn show_status(ui: &StatusReceiver) {
    for notification in ui.drain() {
        match notification {
            StatusNotification::LoadingStarted { label } => tracing::info!("[ui] {label}"),
            StatusNotification::ReadyToScan { label, hint_image } => {
                tracing::info!("[ui] {label} {hint_image}");
            }
            StatusNotification::TargetRecognized { id } => tracing::info!("[ui] recognized {id}, hint hidden"),
            StatusNotification::TargetLost { id } => tracing::info!("[ui] lost {id}"),
            other => tracing::warn!(?other, "[ui] notification"),
        }
    }
}
