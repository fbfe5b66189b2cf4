//! Time column normalization
//!
//! Fetch payloads carry relative time offsets in their first column; every
//! other part of the engine works on absolute [`TimeMs`] values. Conversion
//! happens here, exactly once per payload: [`normalize`] consumes the
//! validated [`RawRows`], so already-normalized data can never be passed
//! back in for a second offset application.

use crate::types::{RawRows, Row, TimeMs};

/// Convert relative time offsets into absolute times.
///
/// Each raw row `[offset, v...]` becomes a [`Row`] with
/// `time = base_time + offset` rounded to the nearest millisecond. An empty
/// input produces an empty output.
pub fn normalize(raw: RawRows, base_time: TimeMs) -> Vec<Row> {
    raw.into_rows()
        .into_iter()
        .map(|mut columns| {
            let offset = columns.remove(0);
            Row::new(base_time + offset.round() as TimeMs, columns)
        })
        .collect()
}
