//! # vitalvis: time-series engine for vital-sign waveform viewers
//!
//! The data core of a medical waveform/numerics viewer: it combines
//! independently-sampled series into synchronized group datasets, splices
//! freshly-fetched high-resolution subranges into cached supersets, keeps
//! rolling bounded buffers for streaming data, and tracks the visible time
//! window as the user zooms and pans. Rendering, transport, and UI are
//! collaborator seams — this crate never touches pixels or sockets.
//!
//! ## Architecture
//!
//! - **Store**: per-session series cache with the merge (k-way join into
//!   group rows) and mesh (subrange splice) algorithms
//! - **Stream**: bounded per-series buffers decoupling arrival rate from
//!   render cadence
//! - **Window**: zoom/pan window math and debounced re-fetch triggering
//! - **Fetch**: the wire payload shape, boundary validation, the
//!   [`fetch::DataSource`] seam, and a simulated source
//! - **Session**: the context object that owns all of the above and applies
//!   completions in arrival order
//!
//! ## Example
//!
//! ```ignore
//! use vitalvis::{
//!     config::EngineConfig,
//!     fetch::{SimSeries, SimSource, WavePattern},
//!     session::{RenderSink, RenderUpdate, Session, ViewMode},
//!     types::DataWindow,
//! };
//!
//! struct LogSink;
//! impl RenderSink for LogSink {
//!     fn repaint(&mut self, update: RenderUpdate) {
//!         tracing::info!("repaint {} over {}", update.scope, update.window);
//!     }
//! }
//!
//! let config = EngineConfig::load_or_default(None);
//! let (source, events) = SimSource::new(0);
//! let source = source.with_series(SimSeries::new(
//!     "hr",
//!     WavePattern::Sine { period_ms: 60_000.0, amplitude: 10.0, offset: 70.0 },
//! ));
//!
//! let mut session = Session::new(
//!     config,
//!     ViewMode::File { extents: DataWindow::new(0, 600_000) },
//!     Box::new(source),
//!     events,
//!     Box::new(LogSink),
//! )?;
//! session.initial_load()?;
//! # Ok::<(), vitalvis::VitalVisError>(())
//! ```

pub mod config;
pub mod error;
pub mod fetch;
pub mod session;
pub mod store;
pub mod stream;
pub mod types;
pub mod window;

// Re-export commonly used types
pub use config::EngineConfig;
pub use error::{Result, VitalVisError};
pub use session::{RenderSink, RenderUpdate, Session, ViewMode};
pub use types::{DataWindow, GroupRow, Row, SeriesId, SeriesScope, TimeMs};
pub use window::{FetchPolicy, WindowEngine, ZoomDirection};
