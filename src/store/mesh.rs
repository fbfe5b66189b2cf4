//! Splicing fetched subranges into cached supersets
//!
//! Zooming in re-fetches the visible span at higher resolution. The
//! response covers only that span, while the cached series still holds the
//! coarse long-range context around it. [`mesh`] combines the two: superset
//! rows strictly outside the subset's time bounds are kept, rows inside are
//! replaced wholesale by the subset, with no duplication and no gap.
//!
//! The end bound is inclusive: a superset row whose time equals the
//! subset's last row time is replaced, not retained.
//!
//! Cut points are located with binary search, so a mesh costs
//! O(log n + output).

use crate::error::{Result, VitalVisError};
use crate::types::{Row, SeriesId};

/// Replace the span `[subset.first.time, subset.last.time]` of `superset`
/// with `subset`, returning the combined series. Neither input is mutated.
///
/// An empty subset returns the superset unchanged; an empty superset
/// returns the subset (bootstrap). Both inputs must be time-ascending and
/// share one row width — a width mismatch is a caller contract violation.
pub fn mesh(id: &SeriesId, superset: &[Row], subset: &[Row]) -> Result<Vec<Row>> {
    let (Some(first), Some(last)) = (subset.first(), subset.last()) else {
        return Ok(superset.to_vec());
    };
    if superset.is_empty() {
        return Ok(subset.to_vec());
    }

    let superset_width = superset[0].width();
    let subset_width = first.width();
    if superset_width != subset_width {
        return Err(VitalVisError::WidthMismatch {
            series: id.clone(),
            superset: superset_width,
            subset: subset_width,
        });
    }

    // First superset row at or past the subset's start, then the first row
    // past its end. Everything between comes from the subset.
    let cut_start = superset.partition_point(|row| row.time < first.time);
    let cut_end =
        cut_start + superset[cut_start..].partition_point(|row| row.time <= last.time);

    let mut out = Vec::with_capacity(cut_start + subset.len() + (superset.len() - cut_end));
    out.extend_from_slice(&superset[..cut_start]);
    out.extend_from_slice(subset);
    out.extend_from_slice(&superset[cut_end..]);
    Ok(out)
}
