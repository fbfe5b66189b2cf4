//! Visible window tracking and zoom/pan mechanics
//!
//! [`WindowEngine`] owns the currently visible time range and computes the
//! new range for every navigation gesture. A successful change normally
//! means the new span should be re-fetched at matching resolution, so each
//! mutating operation hands back the window to fetch — unless the caller
//! suppresses it because it is about to issue its own fetch (initial load).
//!
//! Mousewheel zoom fires many times per second; re-fetching per tick would
//! hammer the data source. [`ZoomDebouncer`] coalesces those gestures and
//! releases only the final window after a quiet period.

use crate::config::MIN_ZOOM_SPAN_MS;
use crate::types::DataWindow;
use std::time::{Duration, Instant};

/// Whether a factor zoom moves in or out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    /// Shrink the span (more detail)
    In,
    /// Grow the span (more context)
    Out,
}

/// Whether a successful window change should request a re-fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPolicy {
    /// Hand the changed window back so the caller fetches it
    Trigger,
    /// Swallow the fetch; the caller handles data itself
    Suppress,
}

/// Tracks the visible window and derives new windows for pan/zoom.
#[derive(Debug, Clone)]
pub struct WindowEngine {
    current: DataWindow,
}

impl WindowEngine {
    /// Create an engine showing `initial`.
    pub fn new(initial: DataWindow) -> Self {
        Self { current: initial }
    }

    /// The currently visible window.
    pub fn current(&self) -> DataWindow {
        self.current
    }

    /// Re-center the window on its midpoint with a new span.
    ///
    /// No-ops (returns `None`) when the recomputed window equals the
    /// current one, so repeated identical gestures don't re-fetch.
    pub fn zoom_to_span(&mut self, span_ms: i64, policy: FetchPolicy) -> Option<DataWindow> {
        self.apply(self.current.recentered(span_ms), policy)
    }

    /// Shift both bounds by `delta_ms` (negative pans back in time).
    pub fn pan_by(&mut self, delta_ms: i64, policy: FetchPolicy) -> Option<DataWindow> {
        self.apply(self.current.shifted(delta_ms), policy)
    }

    /// Grow or shrink the span by a fraction `pct` of itself, keeping the
    /// midpoint. Rejects zooms that would collapse the span below the
    /// minimum.
    pub fn zoom_by_factor(
        &mut self,
        direction: ZoomDirection,
        pct: f64,
        policy: FetchPolicy,
    ) -> Option<DataWindow> {
        let span = self.current.span();
        let delta = (span as f64 * pct).round() as i64;
        let new_span = match direction {
            ZoomDirection::In => span - delta,
            ZoomDirection::Out => span + delta,
        };

        if new_span < MIN_ZOOM_SPAN_MS {
            tracing::warn!(
                "Rejecting zoom: span {}ms would fall below {}ms",
                new_span,
                MIN_ZOOM_SPAN_MS
            );
            return None;
        }

        self.apply(self.current.recentered(new_span), policy)
    }

    /// Jump to an explicit window (outermost restore, realtime follow).
    pub fn set_window(&mut self, window: DataWindow, policy: FetchPolicy) -> Option<DataWindow> {
        self.apply(window, policy)
    }

    fn apply(&mut self, window: DataWindow, policy: FetchPolicy) -> Option<DataWindow> {
        if window == self.current {
            return None;
        }
        self.current = window;
        match policy {
            FetchPolicy::Trigger => Some(window),
            FetchPolicy::Suppress => None,
        }
    }
}

/// Coalesces rapid zoom gestures behind a quiet period.
///
/// Every gesture calls [`ZoomDebouncer::nudge`] with the window it landed
/// on; [`ZoomDebouncer::poll`] releases the latest window once no gesture
/// has arrived for the configured quiet duration.
#[derive(Debug)]
pub struct ZoomDebouncer {
    quiet: Duration,
    pending: Option<DataWindow>,
    last_nudge: Option<Instant>,
}

impl ZoomDebouncer {
    /// Create a debouncer with the given quiet period.
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
            last_nudge: None,
        }
    }

    /// Record a gesture that moved the view to `window`.
    pub fn nudge(&mut self, window: DataWindow) {
        self.nudge_at(window, Instant::now());
    }

    /// Release the coalesced window if the quiet period has elapsed.
    pub fn poll(&mut self) -> Option<DataWindow> {
        self.poll_at(Instant::now())
    }

    /// Whether a gesture is waiting for its quiet period.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn nudge_at(&mut self, window: DataWindow, now: Instant) {
        self.pending = Some(window);
        self.last_nudge = Some(now);
    }

    fn poll_at(&mut self, now: Instant) -> Option<DataWindow> {
        let last = self.last_nudge?;
        if now.duration_since(last) < self.quiet {
            return None;
        }
        self.last_nudge = None;
        self.pending.take()
    }
}
