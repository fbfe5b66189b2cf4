//! The data-source seam
//!
//! The engine never talks to a transport directly. It issues
//! [`FetchRequest`]s against a [`DataSource`] and receives completions as
//! [`SourceEvent`]s on a channel, in whatever order they finish. Rapid
//! navigation can leave several fetches in flight at once; the session
//! meshes completions in arrival order, and a stale response simply
//! replaces the span it covers.

use crate::error::Result;
use crate::fetch::payload::FetchPayload;
use crate::types::{DataWindow, SeriesId, TimeMs};

/// A request for a window of data across some series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Series to fetch
    pub series: Vec<SeriesId>,
    /// Time range to cover
    pub window: DataWindow,
}

/// A completed window fetch.
#[derive(Debug)]
pub struct FetchOutcome {
    /// The request this answers
    pub request: FetchRequest,
    /// Base time the payload's relative offsets are measured against
    pub base_time: TimeMs,
    /// The raw payload, not yet validated
    pub payload: FetchPayload,
}

/// One streaming increment in realtime mode.
#[derive(Debug)]
pub struct StreamFrame {
    /// Base time the payload's relative offsets are measured against
    pub base_time: TimeMs,
    /// The raw payload, not yet validated
    pub payload: FetchPayload,
}

/// Everything a source can deliver.
#[derive(Debug)]
pub enum SourceEvent {
    /// A window fetch completed
    Fetched(FetchOutcome),
    /// A realtime increment arrived
    Stream(StreamFrame),
}

/// Asynchronous provider of series data.
///
/// `request` must not block; completions arrive later on the event channel
/// the source was created with. Implementations live in the host
/// application — this crate ships only [`crate::fetch::sim::SimSource`].
pub trait DataSource: Send {
    /// Begin fetching `request`. Completion is delivered asynchronously.
    fn request(&mut self, request: FetchRequest) -> Result<()>;
}
