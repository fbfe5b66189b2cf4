//! Per-session series store
//!
//! One [`SeriesStore`] holds everything a session knows: the cached rows of
//! every series, the group definitions, and the merged row set derived for
//! each group. Merged data is never authoritative — it is recomputed from
//! the member series whenever one of them changes.
//!
//! There is deliberately no module-level or process-wide state here; every
//! operation goes through a store instance owned by its session.
//!
//! # Submodules
//!
//! - [`normalize`] - relative fetch offsets → absolute times
//! - [`merge`] - k-way merge of member series into group rows
//! - [`mesh`] - splice re-fetched subranges into cached supersets

pub mod merge;
pub mod mesh;
pub mod normalize;

pub use merge::merge_group;
pub use mesh::mesh;
pub use normalize::normalize;

use crate::config::GroupConfig;
use crate::error::{Result, VitalVisError};
use crate::types::{DataWindow, GroupRow, Row, SeriesId, TimeMs};
use std::collections::HashMap;

/// Cached series data, group definitions, and derived merged rows for one
/// session.
#[derive(Debug, Default)]
pub struct SeriesStore {
    groups: Vec<GroupConfig>,
    series: HashMap<SeriesId, Vec<Row>>,
    merged: HashMap<String, Vec<GroupRow>>,
}

impl SeriesStore {
    /// Create a store with the session's group definitions.
    pub fn new(groups: Vec<GroupConfig>) -> Self {
        Self {
            groups,
            series: HashMap::new(),
            merged: HashMap::new(),
        }
    }

    /// Rows currently cached for a series. Empty slice if never fetched.
    pub fn series_rows(&self, id: &SeriesId) -> &[Row] {
        self.series.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Merged rows for a group, if it has been merged at least once.
    pub fn merged_rows(&self, group: &str) -> Option<&[GroupRow]> {
        self.merged.get(group).map(Vec::as_slice)
    }

    /// The session's group definitions.
    pub fn groups(&self) -> &[GroupConfig] {
        &self.groups
    }

    /// Names of groups that contain `id` as a member.
    pub fn groups_containing(&self, id: &SeriesId) -> Vec<String> {
        self.groups
            .iter()
            .filter(|g| g.members.contains(id))
            .map(|g| g.name.clone())
            .collect()
    }

    /// Splice `rows` into the cached data for `id`, replacing the time span
    /// the new rows cover. Creates the series on first contact.
    pub fn mesh_series(&mut self, id: &SeriesId, rows: &[Row]) -> Result<()> {
        let cached = self.series.entry(id.clone()).or_default();
        *cached = mesh(id, cached, rows)?;
        Ok(())
    }

    /// Replace the cached rows for `id` outright (streaming mode hands the
    /// buffer's retained rows over wholesale).
    pub fn replace_series(&mut self, id: &SeriesId, rows: Vec<Row>) {
        self.series.insert(id.clone(), rows);
    }

    /// Recompute the merged rows of one group from its current members.
    ///
    /// A member series with no cached rows participates as empty — it still
    /// widens every merged row with its null cells.
    pub fn remerge(&mut self, group: &str) -> Result<&[GroupRow]> {
        let def = self
            .groups
            .iter()
            .find(|g| g.name == group)
            .ok_or_else(|| VitalVisError::UnknownGroup(group.to_string()))?;

        let members: Vec<(SeriesId, &[Row])> = def
            .members
            .iter()
            .map(|id| {
                (
                    id.clone(),
                    self.series.get(id).map(Vec::as_slice).unwrap_or(&[]),
                )
            })
            .collect();

        let rows = merge_group(group, &members)?;
        tracing::debug!(
            "Remerged group '{}': {} members, {} rows",
            group,
            members.len(),
            rows.len()
        );
        let slot = self.merged.entry(group.to_string()).or_default();
        *slot = rows;
        Ok(slot.as_slice())
    }

    /// Recompute every group containing any of `changed`, returning the
    /// affected group names.
    pub fn remerge_containing(&mut self, changed: &[SeriesId]) -> Result<Vec<String>> {
        let affected: Vec<String> = self
            .groups
            .iter()
            .filter(|g| g.members.iter().any(|m| changed.contains(m)))
            .map(|g| g.name.clone())
            .collect();

        for name in &affected {
            self.remerge(name)?;
        }
        Ok(affected)
    }

    /// Full extents of all cached series, for the file-mode outermost
    /// window. `None` until any series has rows.
    pub fn extents(&self) -> Option<DataWindow> {
        let mut min: Option<TimeMs> = None;
        let mut max: Option<TimeMs> = None;
        for rows in self.series.values() {
            if let (Some(first), Some(last)) = (rows.first(), rows.last()) {
                min = Some(min.map_or(first.time, |m| m.min(first.time)));
                max = Some(max.map_or(last.time, |m| m.max(last.time)));
            }
        }
        Some(DataWindow::new(min?, max?))
    }

    /// Latest timestamp across all cached series, for the realtime trailing
    /// window anchor.
    pub fn latest_time(&self) -> Option<TimeMs> {
        self.series
            .values()
            .filter_map(|rows| rows.last())
            .map(|row| row.time)
            .max()
    }

    /// Drop all cached and derived data, keeping group definitions.
    pub fn clear(&mut self) {
        self.series.clear();
        self.merged.clear();
    }
}
