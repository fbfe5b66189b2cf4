//! Bounded buffering for streaming mode
//!
//! Streaming payloads arrive much faster than anyone wants to re-render, so
//! arrivals and rendering are decoupled: every payload is appended here
//! immediately, and a fixed-cadence tick drains whatever accumulated since
//! the last drain. Each series retains at most a configured number of rows;
//! once over the cap, the oldest rows fall off the front.
//!
//! The buffer tracks two things per series: the retained rows (the rolling
//! window handed to re-merge) and how many of those rows have not been
//! drained yet. Eviction never reorders rows, and evicted rows that were
//! never drained simply leave the pending count.

use crate::types::{Row, SeriesId};
use std::collections::HashMap;

/// Rolling bounded buffer for one streaming session.
#[derive(Debug)]
pub struct StreamBuffer {
    max_rows: usize,
    series: HashMap<SeriesId, SeriesBuffer>,
}

#[derive(Debug, Default)]
struct SeriesBuffer {
    /// Retained rows, ascending by arrival (and therefore time).
    rows: Vec<Row>,
    /// Length of the not-yet-drained suffix of `rows`.
    pending: usize,
}

impl StreamBuffer {
    /// Create a buffer retaining at most `max_rows` rows per series.
    pub fn new(max_rows: usize) -> Self {
        Self {
            max_rows,
            series: HashMap::new(),
        }
    }

    /// The configured per-series cap.
    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    /// Append incoming rows for `id`, creating the entry on first contact,
    /// then trim the front back down to the cap.
    pub fn append(&mut self, id: &SeriesId, rows: Vec<Row>) {
        if rows.is_empty() {
            return;
        }

        let buf = self.series.entry(id.clone()).or_default();
        buf.pending += rows.len();
        buf.rows.extend(rows);

        if buf.rows.len() > self.max_rows {
            let excess = buf.rows.len() - self.max_rows;
            buf.rows.drain(..excess);
            // Rows evicted before ever being drained no longer count as pending.
            buf.pending = buf.pending.min(buf.rows.len());
            tracing::trace!("Evicted {} rows from series '{}'", excess, id);
        }
    }

    /// Return and clear the not-yet-drained increment for every series.
    ///
    /// Series with nothing pending are omitted; an empty map means the tick
    /// has nothing to do.
    pub fn drain_all(&mut self) -> HashMap<SeriesId, Vec<Row>> {
        let mut drained = HashMap::new();
        for (id, buf) in &mut self.series {
            if buf.pending == 0 {
                continue;
            }
            let start = buf.rows.len() - buf.pending;
            drained.insert(id.clone(), buf.rows[start..].to_vec());
            buf.pending = 0;
        }
        drained
    }

    /// The retained rows for `id` (at most the configured cap).
    pub fn rows(&self, id: &SeriesId) -> &[Row] {
        self.series.get(id).map(|b| b.rows.as_slice()).unwrap_or(&[])
    }

    /// Ids of all series that have received any payload.
    pub fn series_ids(&self) -> Vec<SeriesId> {
        self.series.keys().cloned().collect()
    }

    /// Number of retained rows for `id`.
    pub fn len(&self, id: &SeriesId) -> usize {
        self.series.get(id).map(|b| b.rows.len()).unwrap_or(0)
    }

    /// Whether nothing is buffered at all.
    pub fn is_empty(&self) -> bool {
        self.series.values().all(|b| b.rows.is_empty())
    }

    /// Drop everything (leaving streaming mode).
    pub fn reset(&mut self) {
        self.series.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(points: &[(i64, f64)]) -> Vec<Row> {
        points.iter().map(|&(t, v)| Row::new(t, vec![v])).collect()
    }

    #[test]
    fn test_append_example_scenario() {
        // M=2: append [[0,1]] then [[5,2],[10,3]] -> [[5,2],[10,3]]
        let mut buffer = StreamBuffer::new(2);
        let id = SeriesId::from("hr");

        buffer.append(&id, rows(&[(0, 1.0)]));
        buffer.append(&id, rows(&[(5, 2.0), (10, 3.0)]));

        assert_eq!(buffer.rows(&id), rows(&[(5, 2.0), (10, 3.0)]).as_slice());
    }

    #[test]
    fn test_bound_holds_after_any_append_sequence() {
        let mut buffer = StreamBuffer::new(10);
        let id = SeriesId::from("hr");

        for batch in 0..50 {
            let base = batch * 3;
            buffer.append(
                &id,
                rows(&[
                    (base, base as f64),
                    (base + 1, base as f64),
                    (base + 2, base as f64),
                ]),
            );
            assert!(buffer.len(&id) <= 10);
        }
    }

    #[test]
    fn test_fifo_eviction_keeps_most_recent() {
        let mut buffer = StreamBuffer::new(3);
        let id = SeriesId::from("hr");

        for t in 0..6 {
            buffer.append(&id, rows(&[(t, t as f64)]));
        }

        let times: Vec<_> = buffer.rows(&id).iter().map(|r| r.time).collect();
        assert_eq!(times, vec![3, 4, 5]);
    }

    #[test]
    fn test_drain_returns_increment_once() {
        let mut buffer = StreamBuffer::new(100);
        let id = SeriesId::from("hr");

        buffer.append(&id, rows(&[(0, 1.0), (1, 2.0)]));
        let first = buffer.drain_all();
        assert_eq!(first[&id].len(), 2);

        // Nothing new arrived; second drain is empty
        assert!(buffer.drain_all().is_empty());

        buffer.append(&id, rows(&[(2, 3.0)]));
        let second = buffer.drain_all();
        assert_eq!(second[&id], rows(&[(2, 3.0)]));

        // Retained data is unaffected by draining
        assert_eq!(buffer.len(&id), 3);
    }

    #[test]
    fn test_drain_covers_multiple_series() {
        let mut buffer = StreamBuffer::new(100);
        buffer.append(&SeriesId::from("hr"), rows(&[(0, 1.0)]));
        buffer.append(&SeriesId::from("abp"), rows(&[(0, 2.0), (1, 3.0)]));

        let drained = buffer.drain_all();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[&SeriesId::from("hr")].len(), 1);
        assert_eq!(drained[&SeriesId::from("abp")].len(), 2);
    }

    #[test]
    fn test_eviction_shrinks_pending() {
        let mut buffer = StreamBuffer::new(2);
        let id = SeriesId::from("hr");

        // 4 arrive undrained, 2 are evicted immediately; only 2 can be pending
        buffer.append(&id, rows(&[(0, 1.0), (1, 2.0), (2, 3.0), (3, 4.0)]));
        let drained = buffer.drain_all();
        assert_eq!(drained[&id], rows(&[(2, 3.0), (3, 4.0)]));
    }

    #[test]
    fn test_append_empty_is_noop() {
        let mut buffer = StreamBuffer::new(2);
        let id = SeriesId::from("hr");
        buffer.append(&id, Vec::new());

        assert!(buffer.is_empty());
        assert!(buffer.drain_all().is_empty());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut buffer = StreamBuffer::new(2);
        let id = SeriesId::from("hr");
        buffer.append(&id, rows(&[(0, 1.0)]));

        buffer.reset();
        assert!(buffer.is_empty());
        assert_eq!(buffer.len(&id), 0);
    }

    // Property-based tests using proptest
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_bound_and_fifo_properties(
            cap in 1usize..20,
            batch_sizes in prop::collection::vec(0usize..10, 0..20)
        ) {
            let mut buffer = StreamBuffer::new(cap);
            let id = SeriesId::from("s");
            let mut arrived: Vec<i64> = Vec::new();

            for (batch_idx, &size) in batch_sizes.iter().enumerate() {
                let rows: Vec<Row> = (0..size)
                    .map(|i| Row::new((batch_idx * 100 + i) as i64, vec![0.0]))
                    .collect();
                arrived.extend(rows.iter().map(|r| r.time));
                buffer.append(&id, rows);

                // Bound invariant
                prop_assert!(buffer.len(&id) <= cap);

                // FIFO: retained rows are exactly the most recent arrivals
                let keep = arrived.len().min(cap);
                let expected = &arrived[arrived.len() - keep..];
                let times: Vec<i64> = buffer.rows(&id).iter().map(|r| r.time).collect();
                prop_assert_eq!(times.as_slice(), expected);
            }
        }
    }
}
