//! vitalvis demo - Main Entry Point
//!
//! Drives the engine against the simulated source: a short realtime
//! streaming session, then a file-mode load with a zoom/mesh sequence.
//! Useful as smoke coverage and as a wiring reference for hosts.

use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vitalvis::config::{EngineConfig, GroupConfig};
use vitalvis::fetch::{SimSeries, SimSource, WavePattern};
use vitalvis::session::{RenderSink, RenderUpdate, Session, ViewMode};
use vitalvis::types::{DataWindow, SeriesId};
use vitalvis::window::ZoomDirection;

/// Sink that logs repaint requests instead of painting.
struct LogSink;

impl RenderSink for LogSink {
    fn repaint(&mut self, update: RenderUpdate) {
        tracing::info!("repaint {} over {}", update.scope, update.window);
    }
}

fn demo_config() -> EngineConfig {
    let mut config = EngineConfig::load_or_default(None);
    if config.groups.is_empty() {
        config.groups = vec![GroupConfig {
            name: "vitals".to_string(),
            members: vec![SeriesId::from("hr"), SeriesId::from("abp")],
        }];
    }
    config
}

fn demo_source(base_time: i64) -> (SimSource, crossbeam_channel::Receiver<vitalvis::fetch::SourceEvent>) {
    let (source, events) = SimSource::new(base_time);
    let source = source
        .with_series(
            SimSeries::new(
                "hr",
                WavePattern::Sine {
                    period_ms: 60_000.0,
                    amplitude: 8.0,
                    offset: 72.0,
                },
            )
            .with_interval(1_000)
            .with_label("HR"),
        )
        .with_series(
            SimSeries::new(
                "abp",
                WavePattern::Pulse {
                    period_ms: 800.0,
                    amplitude: 40.0,
                    baseline: 80.0,
                },
            )
            .with_interval(10)
            .with_envelope()
            .with_label("ABP"),
        );
    (source, events)
}

fn run_realtime(config: &EngineConfig) -> anyhow::Result<()> {
    tracing::info!("--- Realtime streaming demo ---");

    let (source, events) = demo_source(chrono::Utc::now().timestamp_millis());
    let emitter = source.start_streaming(Duration::from_millis(200), true);

    let mut session = Session::new(
        config.clone(),
        ViewMode::Realtime {
            trailing_ms: config.window.trailing_ms,
        },
        Box::new(source),
        events,
        Box::new(LogSink),
    )?;

    // A handful of drain ticks, then stop the emitter and let the loop
    // run itself dry.
    for _ in 0..10 {
        std::thread::sleep(Duration::from_millis(config.stream.drain_interval_ms));
        session.pump()?;
        session.stream_tick()?;
    }
    emitter.stop();
    session.run_streaming(Duration::from_millis(config.stream.drain_interval_ms))?;

    let hr_rows = session.store().series_rows(&SeriesId::from("hr")).len();
    let abp_rows = session.store().series_rows(&SeriesId::from("abp")).len();
    tracing::info!(
        "Streaming done: hr={} rows, abp={} rows, window={}",
        hr_rows,
        abp_rows,
        session.window()
    );
    Ok(())
}

fn run_file_mode(config: &EngineConfig) -> anyhow::Result<()> {
    tracing::info!("--- File mode zoom/mesh demo ---");

    let (source, events) = demo_source(1_700_000_000_000);
    let extents = DataWindow::new(1_700_000_000_000, 1_700_000_600_000);

    let mut session = Session::new(
        config.clone(),
        ViewMode::File { extents },
        Box::new(source),
        events,
        Box::new(LogSink),
    )?;

    session.initial_load()?;
    wait_for_fetch(&mut session)?;
    tracing::info!(
        "Initial load: {} merged rows",
        session.store().merged_rows("vitals").map_or(0, |r| r.len())
    );

    // Zoom into the middle 10 seconds; the re-fetch meshes a
    // higher-resolution span into the coarse cache.
    session.zoom_to_span(10_000)?;
    wait_for_fetch(&mut session)?;
    tracing::info!(
        "After zoom: {} merged rows, window={}",
        session.store().merged_rows("vitals").map_or(0, |r| r.len()),
        session.window()
    );

    session.zoom_by_factor(ZoomDirection::Out, 0.5)?;
    wait_for_fetch(&mut session)?;
    session.pan_by(-5_000)?;
    wait_for_fetch(&mut session)?;
    tracing::info!("Final window: {}", session.window());

    Ok(())
}

/// Block until the next fetch completion has been applied.
fn wait_for_fetch(session: &mut Session) -> anyhow::Result<()> {
    for _ in 0..200 {
        if session.pump()? > 0 {
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    anyhow::bail!("fetch completion never arrived");
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,vitalvis=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting vitalvis demo");

    let config = demo_config();
    config.validate()?;

    run_realtime(&config)?;
    run_file_mode(&config)?;

    tracing::info!("Done");
    Ok(())
}
