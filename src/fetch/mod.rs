//! Fetch boundary: payload shapes, validation, and the data-source seam
//!
//! Everything the engine knows about the outside world enters through this
//! module. [`payload`] defines the wire shape and validates it once;
//! [`source`] defines the asynchronous request/completion seam; [`sim`]
//! provides the simulated source used by the demo binary and tests.

pub mod payload;
pub mod sim;
pub mod source;

pub use payload::{FetchPayload, SeriesPayload, ValidatedSeries};
pub use sim::{SimSeries, SimSource, StreamHandle, WavePattern};
pub use source::{DataSource, FetchOutcome, FetchRequest, SourceEvent, StreamFrame};
