//! Integration tests for the full fetch → normalize → mesh → merge flow
//!
//! These drive a [`Session`] against the simulated source the way a host
//! viewer would: initial load, zoom re-fetches, overlapping in-flight
//! requests, and realtime streaming with the drain tick.

mod common;

use common::{test_config, CollectingSink};
use std::time::Duration;
use vitalvis::fetch::{DataSource, FetchRequest, SimSeries, SimSource, WavePattern};
use vitalvis::session::{Session, ViewMode};
use vitalvis::types::{DataWindow, SeriesId, SeriesScope};
use vitalvis::window::ZoomDirection;

const BASE: i64 = 1_700_000_000_000;

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
            .with_interval(1_000),
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
            .with_envelope(),
        )
        .with_series(
            SimSeries::new(
                "resp",
                WavePattern::Sine {
                    period_ms: 4_000.0,
                    amplitude: 1.0,
                    offset: 0.0,
                },
            )
            .with_interval(100),
        )
        .with_target_points(200);
    (source, events)
}

fn file_session(sink: CollectingSink) -> Session {
    let (source, events) = demo_source(BASE);
    Session::new(
        test_config(100_000),
        ViewMode::File {
            extents: DataWindow::new(BASE, BASE + 600_000),
        },
        Box::new(source),
        events,
        Box::new(sink),
    )
    .unwrap()
}

/// Pump until `events` completions have been applied, failing after a
/// generous timeout.
fn pump_until(session: &mut Session, events: usize) {
    let mut seen = 0;
    for _ in 0..1_000 {
        seen += session.pump().unwrap();
        if seen >= events {
            return;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    panic!("expected {} source events, saw {}", events, seen);
}

#[test]
fn test_initial_load_merges_all_groups() {
    let sink = CollectingSink::new();
    let mut session = file_session(sink.clone());

    session.initial_load().unwrap();
    pump_until(&mut session, 1);

    let merged = session.store().merged_rows("vitals").unwrap();
    assert!(!merged.is_empty());
    assert!(merged.iter().all(|r| r.width() == 7));
    assert!(merged.windows(2).all(|p| p[0].time < p[1].time));

    assert!(session.store().merged_rows("respiratory").is_some());

    let scopes: Vec<_> = sink.updates().into_iter().map(|u| u.scope).collect();
    assert!(scopes.contains(&SeriesScope::Group("vitals".to_string())));
    assert!(scopes.contains(&SeriesScope::Group("respiratory".to_string())));
}

#[test]
fn test_zoom_refetch_meshes_higher_resolution_span() {
    let mut session = file_session(CollectingSink::new());

    session.initial_load().unwrap();
    pump_until(&mut session, 1);

    let abp = SeriesId::from("abp");
    let coarse: Vec<i64> = session
        .store()
        .series_rows(&abp)
        .iter()
        .map(|r| r.time)
        .collect();
    // 600s at ~200 points: nowhere near the native 10ms interval
    let coarse_step = coarse[1] - coarse[0];
    assert!(coarse_step >= 1_000);

    // 2s at 200 target points reaches the native 10ms interval
    session.zoom_to_span(2_000).unwrap();
    pump_until(&mut session, 1);
    let zoomed = session.window();

    let rows = session.store().series_rows(&abp);

    // Inside the zoomed window: native-resolution rows
    let inside: Vec<i64> = rows
        .iter()
        .map(|r| r.time)
        .filter(|t| zoomed.contains(*t))
        .collect();
    assert!(inside.len() > 150, "zoomed span still coarse: {} rows", inside.len());
    assert!(inside.windows(2).all(|p| p[1] - p[0] == 10));

    // Outside: the coarse long-range context is retained
    let outside_before: Vec<i64> = coarse
        .iter()
        .copied()
        .filter(|t| !zoomed.contains(*t))
        .collect();
    let outside_after: Vec<i64> = rows
        .iter()
        .map(|r| r.time)
        .filter(|t| !zoomed.contains(*t))
        .collect();
    assert_eq!(outside_after, outside_before);

    // The whole series stays sorted with no duplicate timestamps
    assert!(rows.windows(2).all(|p| p[0].time < p[1].time));
}

#[test]
fn test_overlapping_fetches_apply_in_arrival_order() {
    let (mut source, events) = demo_source(BASE);
    let all_series = vec![
        SeriesId::from("hr"),
        SeriesId::from("abp"),
        SeriesId::from("resp"),
    ];

    // The wide fetch is slow, the narrow one fast: the narrow response
    // arrives first, the stale wide one later. Both must mesh cleanly.
    source.set_latency(Duration::from_millis(60));
    source
        .request(FetchRequest {
            series: all_series.clone(),
            window: DataWindow::new(BASE, BASE + 600_000),
        })
        .unwrap();
    source.set_latency(Duration::ZERO);
    source
        .request(FetchRequest {
            series: all_series,
            window: DataWindow::new(BASE + 100_000, BASE + 110_000),
        })
        .unwrap();

    let mut session = Session::new(
        test_config(100_000),
        ViewMode::File {
            extents: DataWindow::new(BASE, BASE + 600_000),
        },
        Box::new(source),
        events,
        Box::new(CollectingSink::new()),
    )
    .unwrap();

    pump_until(&mut session, 2);

    // The late wide response overwrote the narrow one's fine detail; the
    // store is coherent either way: sorted, unique, full span covered.
    let rows = session.store().series_rows(&SeriesId::from("abp"));
    assert!(!rows.is_empty());
    assert!(rows.windows(2).all(|p| p[0].time < p[1].time));
    assert!(rows.first().unwrap().time >= BASE);
    assert!(rows.last().unwrap().time <= BASE + 600_000);

    let merged = session.store().merged_rows("vitals").unwrap();
    assert!(merged.iter().all(|r| r.width() == 7));
}

#[test]
fn test_wheel_zoom_debounce_fires_single_refetch() {
    let mut session = file_session(CollectingSink::new());

    session.initial_load().unwrap();
    pump_until(&mut session, 1);

    // A burst of wheel ticks moves the window immediately...
    session.wheel_zoom(ZoomDirection::In, 0.3);
    session.wheel_zoom(ZoomDirection::In, 0.3);
    session.wheel_zoom(ZoomDirection::In, 0.3);
    let target = session.window();
    assert!(target.span() < 600_000);

    // ...and exactly one re-fetch comes out after the quiet period.
    std::thread::sleep(Duration::from_millis(60));
    session.poll().unwrap();
    pump_until(&mut session, 1);

    // The fetched data covers the final window at a finer step
    let abp = session.store().series_rows(&SeriesId::from("abp"));
    let inside = abp.iter().filter(|r| target.contains(r.time)).count();
    assert!(inside > 0);
}

#[test]
fn test_realtime_streaming_respects_cap_and_follows() {
    let (source, events) = demo_source(0);
    let emitter = source.start_streaming(Duration::from_millis(20), true);

    let sink = CollectingSink::new();
    let mut session = Session::new(
        test_config(10),
        ViewMode::Realtime { trailing_ms: 5_000 },
        Box::new(source),
        events,
        Box::new(sink.clone()),
    )
    .unwrap();

    for _ in 0..8 {
        std::thread::sleep(Duration::from_millis(40));
        session.pump().unwrap();
        session.stream_tick().unwrap();
    }
    emitter.stop();
    session.run_streaming(Duration::from_millis(40)).unwrap();

    // Cap of 10 rows per series holds in the store
    for id in ["hr", "abp", "resp"] {
        let rows = session.store().series_rows(&SeriesId::from(id));
        assert!(rows.len() <= 10, "series '{}' holds {} rows", id, rows.len());
        assert!(rows.windows(2).all(|p| p[0].time <= p[1].time));
    }

    // abp streams at 10ms native: it must have hit the cap and evicted
    let abp = session.store().series_rows(&SeriesId::from("abp"));
    assert_eq!(abp.len(), 10);
    assert!(abp.first().unwrap().time > 0);

    // The window trails the latest sample
    let latest = session.store().latest_time().unwrap();
    assert_eq!(session.window(), DataWindow::new(latest - 5_000, latest));

    // Drain ticks scheduled group repaints
    let scopes: Vec<_> = sink.updates().into_iter().map(|u| u.scope).collect();
    assert!(scopes.contains(&SeriesScope::Group("vitals".to_string())));
}

#[test]
fn test_pan_refetches_shifted_window() {
    let mut session = file_session(CollectingSink::new());

    session.initial_load().unwrap();
    pump_until(&mut session, 1);

    session.zoom_to_span(2_000).unwrap();
    pump_until(&mut session, 1);
    let before = session.window();

    session.pan_by(20_000).unwrap();
    pump_until(&mut session, 1);

    let after = session.window();
    assert_eq!(after, before.shifted(20_000));

    // Fine data now exists in the panned-to span
    let abp = session.store().series_rows(&SeriesId::from("abp"));
    let inside = abp
        .iter()
        .filter(|r| after.contains(r.time))
        .collect::<Vec<_>>();
    assert!(inside.len() > 150);
}
