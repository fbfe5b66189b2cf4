//! Simulated data source
//!
//! A self-contained [`DataSource`] that synthesizes vital-sign-like series,
//! used by the demo binary and the integration tests. No hardware, no
//! network.
//!
//! Two behaviors matter for exercising the engine:
//!
//! - **Span-derived resolution**: a wide window yields coarse rows, a
//!   narrow one yields rows down to the series' native sample interval.
//!   Zooming in and re-fetching therefore produces a genuinely
//!   higher-resolution subrange to mesh into the cached superset.
//! - **Configurable completion latency**: requests complete on a worker
//!   thread after an adjustable delay, so tests can create overlapping
//!   in-flight fetches and out-of-order arrivals.
//!
//! Values are pure functions of absolute sample time, so overlapping
//! fetches agree wherever they overlap.

use crate::error::Result;
use crate::fetch::payload::{FetchPayload, SeriesPayload};
use crate::fetch::source::{DataSource, FetchOutcome, FetchRequest, SourceEvent, StreamFrame};
use crate::types::{DataWindow, SeriesId, TimeMs};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default number of rows a fetch aims to return per series.
pub const DEFAULT_TARGET_POINTS: usize = 1_000;

/// Waveform shape for one simulated series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WavePattern {
    /// Constant value
    Constant(f64),
    /// Sinusoid
    Sine {
        period_ms: f64,
        amplitude: f64,
        offset: f64,
    },
    /// Square wave
    Square { period_ms: f64, amplitude: f64 },
    /// Linear ramp that resets each period
    Sawtooth { period_ms: f64, amplitude: f64 },
    /// Short spike once per period over a flat baseline (pulse-like)
    Pulse {
        period_ms: f64,
        amplitude: f64,
        baseline: f64,
    },
    /// Baseline with deterministic noise
    Jitter { center: f64, amplitude: f64 },
}

impl WavePattern {
    /// Sample the pattern at an absolute time.
    pub fn value_at(&self, t: TimeMs) -> f64 {
        match *self {
            WavePattern::Constant(v) => v,
            WavePattern::Sine {
                period_ms,
                amplitude,
                offset,
            } => {
                let phase = (t as f64 % period_ms) / period_ms;
                offset + amplitude * (2.0 * std::f64::consts::PI * phase).sin()
            }
            WavePattern::Square {
                period_ms,
                amplitude,
            } => {
                let phase = (t as f64 % period_ms) / period_ms;
                if phase < 0.5 {
                    amplitude
                } else {
                    -amplitude
                }
            }
            WavePattern::Sawtooth {
                period_ms,
                amplitude,
            } => {
                let phase = (t as f64 % period_ms) / period_ms;
                amplitude * phase
            }
            WavePattern::Pulse {
                period_ms,
                amplitude,
                baseline,
            } => {
                let phase = (t as f64 % period_ms) / period_ms;
                if phase < 0.1 {
                    baseline + amplitude * (1.0 - phase / 0.1)
                } else {
                    baseline
                }
            }
            WavePattern::Jitter { center, amplitude } => {
                center + (rand_at(t) - 0.5) * 2.0 * amplitude
            }
        }
    }
}

/// Deterministic pseudo-random value in [0, 1) derived from a timestamp.
fn rand_at(t: TimeMs) -> f64 {
    let mut s = (t as u64).wrapping_add(0x9E37_79B9_7F4A_7C15);
    s ^= s << 13;
    s ^= s >> 7;
    s ^= s << 17;
    (s >> 11) as f64 / (1u64 << 53) as f64
}

/// Configuration for one simulated series.
#[derive(Debug, Clone)]
pub struct SimSeries {
    /// Series id
    pub id: SeriesId,
    /// Shape of the generated signal
    pub pattern: WavePattern,
    /// Native sample interval; fetches never go finer than this
    pub sample_interval_ms: i64,
    /// Emit (min, max, raw) envelope rows instead of single raw values
    pub envelope: bool,
    /// Display label
    pub label: String,
}

impl SimSeries {
    /// Create a series with a 10ms native interval and raw rows.
    pub fn new(id: impl Into<SeriesId>, pattern: WavePattern) -> Self {
        let id = id.into();
        let label = id.to_string();
        Self {
            id,
            pattern,
            sample_interval_ms: 10,
            envelope: false,
            label,
        }
    }

    /// Set the native sample interval.
    pub fn with_interval(mut self, interval_ms: i64) -> Self {
        self.sample_interval_ms = interval_ms.max(1);
        self
    }

    /// Emit envelope rows (min, max, raw per sample bucket).
    pub fn with_envelope(mut self) -> Self {
        self.envelope = true;
        self
    }

    /// Set the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Simulated asynchronous data source.
pub struct SimSource {
    series: Vec<SimSeries>,
    base_time: TimeMs,
    latency: Duration,
    target_points: usize,
    tx: Sender<SourceEvent>,
}

impl SimSource {
    /// Create a source and the event channel its completions arrive on.
    ///
    /// `base_time` anchors the relative offsets in every payload.
    pub fn new(base_time: TimeMs) -> (Self, Receiver<SourceEvent>) {
        let (tx, rx) = unbounded();
        (
            Self {
                series: Vec::new(),
                base_time,
                latency: Duration::ZERO,
                target_points: DEFAULT_TARGET_POINTS,
                tx,
            },
            rx,
        )
    }

    /// Add a simulated series.
    pub fn with_series(mut self, series: SimSeries) -> Self {
        self.series.push(series);
        self
    }

    /// Set how many rows a fetch aims to return per series.
    pub fn with_target_points(mut self, n: usize) -> Self {
        self.target_points = n.max(1);
        self
    }

    /// Set the completion delay applied to subsequent requests.
    pub fn set_latency(&mut self, latency: Duration) {
        self.latency = latency;
    }

    /// The base time payload offsets are measured against.
    pub fn base_time(&self) -> TimeMs {
        self.base_time
    }

    /// Ids of all configured series.
    pub fn series_ids(&self) -> Vec<SeriesId> {
        self.series.iter().map(|s| s.id.clone()).collect()
    }

    /// Build the payload for a request synchronously (used by `request`
    /// from its worker thread, and directly by tests).
    pub fn build_payload(&self, request: &FetchRequest) -> FetchPayload {
        let mut series = HashMap::new();
        for sim in &self.series {
            if !request.series.contains(&sim.id) {
                continue;
            }
            series.insert(
                sim.id.to_string(),
                SeriesPayload {
                    data: sample_rows(sim, request.window, self.target_points, self.base_time),
                    labels: vec![sim.label.clone()],
                },
            );
        }
        FetchPayload {
            series,
            events: None,
        }
    }

    /// Start a streaming emitter: every `interval` of simulated time, a
    /// [`StreamFrame`] covering that interval is sent, beginning at
    /// `base_time`. Wall-clock pacing matches `interval` unless `paced` is
    /// false (tests run unpaced).
    pub fn start_streaming(&self, interval: Duration, paced: bool) -> StreamHandle {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let tx = self.tx.clone();
        let series = self.series.clone();
        let base = self.base_time;
        let step_ms = interval.as_millis().max(1) as i64;

        let handle = std::thread::spawn(move || {
            let mut cursor = base;
            while flag.load(Ordering::Relaxed) {
                let window = DataWindow::new(cursor, cursor + step_ms - 1);
                let mut payload_series = HashMap::new();
                for sim in &series {
                    payload_series.insert(
                        sim.id.to_string(),
                        SeriesPayload {
                            data: native_rows(sim, window, base),
                            labels: vec![sim.label.clone()],
                        },
                    );
                }
                let frame = StreamFrame {
                    base_time: base,
                    payload: FetchPayload {
                        series: payload_series,
                        events: None,
                    },
                };
                if tx.send(SourceEvent::Stream(frame)).is_err() {
                    break;
                }
                cursor += step_ms;
                if paced {
                    std::thread::sleep(interval);
                }
            }
        });

        StreamHandle {
            running,
            handle: Some(handle),
        }
    }
}

impl DataSource for SimSource {
    fn request(&mut self, request: FetchRequest) -> Result<()> {
        let payload = self.build_payload(&request);
        let outcome = FetchOutcome {
            request,
            base_time: self.base_time,
            payload,
        };
        let tx = self.tx.clone();
        let latency = self.latency;

        std::thread::spawn(move || {
            if !latency.is_zero() {
                std::thread::sleep(latency);
            }
            let _ = tx.send(SourceEvent::Fetched(outcome));
        });

        Ok(())
    }
}

/// Handle to a running streaming emitter.
pub struct StreamHandle {
    running: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl StreamHandle {
    /// Stop the emitter and wait for its thread.
    pub fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

/// Rows for one series over `window` at a span-derived step.
fn sample_rows(
    sim: &SimSeries,
    window: DataWindow,
    target_points: usize,
    base: TimeMs,
) -> Vec<Vec<f64>> {
    let native = sim.sample_interval_ms;
    let ideal = window.span() / target_points as i64;
    // Coarsen to a multiple of the native interval, never finer than native
    let step = (ideal.max(native) / native) * native;

    let mut rows = Vec::new();
    let mut t = align_up(window.start(), step);
    while t <= window.end() {
        rows.push(row_at(sim, t, step, base));
        t += step;
    }
    rows
}

/// Rows at native resolution, used by the streaming emitter.
fn native_rows(sim: &SimSeries, window: DataWindow, base: TimeMs) -> Vec<Vec<f64>> {
    let mut rows = Vec::new();
    let mut t = align_up(window.start(), sim.sample_interval_ms);
    while t <= window.end() {
        rows.push(row_at(sim, t, sim.sample_interval_ms, base));
        t += sim.sample_interval_ms;
    }
    rows
}

/// One row at absolute time `t` for a bucket of `step` ms.
fn row_at(sim: &SimSeries, t: TimeMs, step: i64, base: TimeMs) -> Vec<f64> {
    let offset = (t - base) as f64;
    let raw = sim.pattern.value_at(t);

    if !sim.envelope {
        return vec![offset, raw];
    }

    // Envelope over the native samples inside [t, t + step)
    let mut min = raw;
    let mut max = raw;
    let mut u = t;
    while u < t + step {
        let v = sim.pattern.value_at(u);
        min = min.min(v);
        max = max.max(v);
        u += sim.sample_interval_ms;
    }
    vec![offset, min, max, raw]
}

/// Smallest multiple of `step` at or above `t`. Grid alignment keeps
/// overlapping fetches sample-compatible.
fn align_up(t: TimeMs, step: i64) -> TimeMs {
    let rem = t.rem_euclid(step);
    if rem == 0 {
        t
    } else {
        t - rem + step
    }
}
