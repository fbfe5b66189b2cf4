//! Session context — the engine's single owner of state
//!
//! A [`Session`] wires the pieces together for one open data context: the
//! series store, the streaming buffer, the window engine, a data source,
//! and a render sink. There is no module-level registry anywhere in the
//! crate; everything a session knows lives in the session value.
//!
//! # Execution model
//!
//! All mutation happens on the caller's thread. Fetch completions and
//! streaming frames arrive on a channel and are applied only inside
//! [`Session::pump`], in arrival order — a late response for a window the
//! user has since left still meshes correctly, because a mesh only
//! replaces the span it covers. Nothing here suspends mid-mutation, so
//! merge/mesh/buffer operations are atomic with respect to the caller's
//! loop.
//!
//! # Failure handling
//!
//! A response that omits a requested series, or carries a malformed one,
//! degrades only that series: it is logged and skipped, and every other
//! series in the batch proceeds. Skips are counted in [`ApplyStats`] so
//! callers can surface them.

use crate::config::EngineConfig;
use crate::error::{Result, ResultExt, VitalVisError};
use crate::fetch::payload::{validate_series, FetchPayload};
use crate::fetch::source::{DataSource, FetchOutcome, FetchRequest, SourceEvent, StreamFrame};
use crate::store::{normalize, SeriesStore};
use crate::stream::StreamBuffer;
use crate::types::{DataWindow, SeriesId, SeriesScope, TimeMs};
use crate::window::{FetchPolicy, WindowEngine, ZoomDebouncer, ZoomDirection};
use crossbeam_channel::{Receiver, TryRecvError};
use std::collections::HashSet;
use std::time::Duration;

/// How the outermost (fully zoomed-out) window is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// A fixed, fully-known data range (an opened recording)
    File {
        /// Full extents of the file's data
        extents: DataWindow,
    },
    /// A trailing window anchored to the latest streamed data
    Realtime {
        /// Width of the trailing window
        trailing_ms: i64,
    },
}

/// What the render collaborator is asked to repaint.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderUpdate {
    /// The series or group whose data changed
    pub scope: SeriesScope,
    /// The window it should be painted against
    pub window: DataWindow,
}

/// Consumer of repaint requests. The engine computes data and windows;
/// pixels are someone else's problem.
#[cfg_attr(test, mockall::automock)]
pub trait RenderSink {
    /// Schedule a repaint for one scope.
    fn repaint(&mut self, update: RenderUpdate);
}

/// Outcome counters for applying one fetch response.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ApplyStats {
    /// Series successfully normalized and meshed
    pub meshed: usize,
    /// Series present in the response but rejected (malformed)
    pub skipped: usize,
    /// Requested series absent from the response
    pub missing: usize,
}

/// One open data context: store, buffer, window, source, and sink.
pub struct Session {
    config: EngineConfig,
    mode: ViewMode,
    store: SeriesStore,
    buffer: StreamBuffer,
    window: WindowEngine,
    debouncer: ZoomDebouncer,
    source: Box<dyn DataSource>,
    events: Receiver<SourceEvent>,
    sink: Box<dyn RenderSink>,
}

impl Session {
    /// Create a session. The initial window is the file extents in file
    /// mode, or an empty trailing window until streamed data arrives.
    pub fn new(
        config: EngineConfig,
        mode: ViewMode,
        source: Box<dyn DataSource>,
        events: Receiver<SourceEvent>,
        sink: Box<dyn RenderSink>,
    ) -> Result<Self> {
        config.validate()?;

        let initial = match mode {
            ViewMode::File { extents } => extents,
            ViewMode::Realtime { trailing_ms } => DataWindow::new(0, trailing_ms),
        };
        let debounce = Duration::from_millis(config.window.zoom_debounce_ms);
        let buffer = StreamBuffer::new(config.stream.max_rows_per_series);

        Ok(Self {
            store: SeriesStore::new(config.groups.clone()),
            buffer,
            window: WindowEngine::new(initial),
            debouncer: ZoomDebouncer::new(debounce),
            config,
            mode,
            source,
            events,
            sink,
        })
    }

    /// The currently visible window.
    pub fn window(&self) -> DataWindow {
        self.window.current()
    }

    /// The session's view mode.
    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    /// The series store (cached rows and merged groups).
    pub fn store(&self) -> &SeriesStore {
        &self.store
    }

    /// The outermost window for the current mode: full extents in file
    /// mode, the trailing span behind the latest data in realtime mode.
    pub fn outermost_window(&self) -> Option<DataWindow> {
        match self.mode {
            ViewMode::File { extents } => Some(extents),
            ViewMode::Realtime { trailing_ms } => {
                let latest = self.store.latest_time()?;
                Some(DataWindow::new(latest - trailing_ms, latest))
            }
        }
    }

    /// Issue the first fetch for the outermost window. The window change
    /// itself is suppressed so only one fetch goes out.
    pub fn initial_load(&mut self) -> Result<()> {
        let Some(window) = self.outermost_window() else {
            tracing::info!("No data extents yet; skipping initial load");
            return Ok(());
        };
        self.window.set_window(window, FetchPolicy::Suppress);
        self.request_window(window)
    }

    /// Fetch `window` for every configured series.
    pub fn request_window(&mut self, window: DataWindow) -> Result<()> {
        let request = FetchRequest {
            series: self.config.all_series(),
            window,
        };
        tracing::debug!("Requesting {} series over {}", request.series.len(), window);
        self.source
            .request(request)
            .with_context(|| format!("Fetch request for {} failed", window))
    }

    /// Re-center on the midpoint with a new span, re-fetching on change.
    pub fn zoom_to_span(&mut self, span_ms: i64) -> Result<()> {
        if let Some(window) = self.window.zoom_to_span(span_ms, FetchPolicy::Trigger) {
            self.request_window(window)?;
        }
        Ok(())
    }

    /// Shift the window, re-fetching on change.
    pub fn pan_by(&mut self, delta_ms: i64) -> Result<()> {
        if let Some(window) = self.window.pan_by(delta_ms, FetchPolicy::Trigger) {
            self.request_window(window)?;
        }
        Ok(())
    }

    /// Grow or shrink the span by a fraction, re-fetching on change.
    pub fn zoom_by_factor(&mut self, direction: ZoomDirection, pct: f64) -> Result<()> {
        if let Some(window) = self.window.zoom_by_factor(direction, pct, FetchPolicy::Trigger) {
            self.request_window(window)?;
        }
        Ok(())
    }

    /// Wheel-driven zoom: the window moves immediately, but the re-fetch is
    /// coalesced behind the configured quiet period. Call [`Session::poll`]
    /// regularly to release it.
    pub fn wheel_zoom(&mut self, direction: ZoomDirection, pct: f64) {
        if let Some(window) = self.window.zoom_by_factor(direction, pct, FetchPolicy::Trigger) {
            self.debouncer.nudge(window);
        }
    }

    /// Release a debounced re-fetch if its quiet period has elapsed.
    pub fn poll(&mut self) -> Result<()> {
        if let Some(window) = self.debouncer.poll() {
            self.request_window(window)?;
        }
        Ok(())
    }

    /// Drain and apply every pending source event, in arrival order.
    /// Returns the number of events processed.
    pub fn pump(&mut self) -> Result<usize> {
        let mut processed = 0;
        loop {
            match self.events.try_recv() {
                Ok(SourceEvent::Fetched(outcome)) => {
                    self.apply_fetch(outcome)?;
                }
                Ok(SourceEvent::Stream(frame)) => {
                    self.ingest_frame(frame)?;
                }
                Err(TryRecvError::Empty) => return Ok(processed),
                Err(TryRecvError::Disconnected) => {
                    return Err(VitalVisError::Channel(
                        "source event channel disconnected".to_string(),
                    ));
                }
            }
            processed += 1;
        }
    }

    /// Apply one completed fetch: validate per series, normalize, mesh into
    /// the cached supersets, re-merge affected groups, schedule repaints.
    pub fn apply_fetch(&mut self, outcome: FetchOutcome) -> Result<ApplyStats> {
        let requested: HashSet<SeriesId> = outcome.request.series.into_iter().collect();
        let mut stats = ApplyStats::default();
        let mut meshed = Vec::new();

        let mut responded = HashSet::new();
        for (id, rows) in validated_rows(outcome.payload, outcome.base_time, &mut stats) {
            responded.insert(id.clone());
            match self.store.mesh_series(&id, &rows) {
                Ok(()) => meshed.push(id),
                Err(e) => {
                    tracing::error!("Skipping mesh for series '{}': {}", id, e);
                    stats.skipped += 1;
                }
            }
        }

        for id in requested {
            if !responded.contains(&id) {
                tracing::warn!("Requested series '{}' missing from response", id);
                stats.missing += 1;
            }
        }

        stats.meshed = meshed.len();
        self.finish_update(&meshed)?;
        Ok(stats)
    }

    /// Buffer one streaming frame. Data reaches the store on the next
    /// [`Session::stream_tick`].
    pub fn ingest_frame(&mut self, frame: StreamFrame) -> Result<()> {
        let mut stats = ApplyStats::default();
        for (id, rows) in validated_rows(frame.payload, frame.base_time, &mut stats) {
            self.buffer.append(&id, rows);
        }
        if stats.skipped > 0 {
            tracing::warn!("Dropped {} malformed series from stream frame", stats.skipped);
        }
        Ok(())
    }

    /// One drain tick: move everything buffered since the last tick into
    /// the store, re-merge, follow the latest data in realtime mode, and
    /// repaint. Returns whether anything was drained.
    pub fn stream_tick(&mut self) -> Result<bool> {
        let drained = self.buffer.drain_all();
        if drained.is_empty() {
            return Ok(false);
        }

        let changed: Vec<SeriesId> = drained.into_keys().collect();
        for id in &changed {
            // The buffer's retained rows are the authoritative rolling window
            self.store.replace_series(id, self.buffer.rows(id).to_vec());
        }

        if let (ViewMode::Realtime { trailing_ms }, Some(latest)) =
            (self.mode, self.store.latest_time())
        {
            // Stream data is already here; no fetch on the follow
            self.window.set_window(
                DataWindow::new(latest - trailing_ms, latest),
                FetchPolicy::Suppress,
            );
        }

        self.finish_update(&changed)?;
        Ok(true)
    }

    /// Run the streaming loop at a fixed cadence until a full tick passes
    /// with nothing arriving and nothing to drain.
    pub fn run_streaming(&mut self, interval: Duration) -> Result<()> {
        loop {
            std::thread::sleep(interval);
            let pumped = self.pump()?;
            let drained = self.stream_tick()?;
            if pumped == 0 && !drained {
                tracing::info!("Stream idle; leaving streaming loop");
                return Ok(());
            }
        }
    }

    /// Leave streaming mode: drop buffered data.
    pub fn reset_stream(&mut self) {
        self.buffer.reset();
    }

    /// Re-merge groups containing `changed` and schedule repaints for every
    /// affected scope.
    fn finish_update(&mut self, changed: &[SeriesId]) -> Result<()> {
        if changed.is_empty() {
            return Ok(());
        }

        let affected = self.store.remerge_containing(changed)?;
        let window = self.window.current();

        for group in affected {
            self.sink.repaint(RenderUpdate {
                scope: SeriesScope::Group(group),
                window,
            });
        }
        for id in changed {
            if self.store.groups_containing(id).is_empty() {
                self.sink.repaint(RenderUpdate {
                    scope: SeriesScope::Single(id.clone()),
                    window,
                });
            }
        }
        Ok(())
    }
}

/// Validate a payload series-by-series and normalize the survivors.
/// Malformed series are logged and counted, never propagated.
fn validated_rows(
    payload: FetchPayload,
    base_time: TimeMs,
    stats: &mut ApplyStats,
) -> Vec<(SeriesId, Vec<crate::types::Row>)> {
    let mut out = Vec::with_capacity(payload.series.len());
    for (id, series) in payload.series {
        let id = SeriesId(id);
        match validate_series(id.clone(), series) {
            Ok(validated) => {
                let rows = normalize(validated.rows, base_time);
                out.push((id, rows));
            }
            Err(e) => {
                tracing::error!("Rejecting series '{}': {}", id, e);
                stats.skipped += 1;
            }
        }
    }
    // HashMap iteration order is arbitrary; keep application deterministic
    out.sort_by(|a, b| a.0.cmp(&b.0));
    out
}
