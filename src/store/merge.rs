//! K-way merge of member series into group rows
//!
//! Members of a group are sampled independently, so their timestamps rarely
//! line up. [`merge_group`] folds them into one wide row set that preserves
//! every timestamp present in any member: one read cursor per member, always
//! advancing whichever members sit at the current minimum time. Members that
//! sample the same instant land in the same output row instead of producing
//! duplicates.
//!
//! The merge is a single pass — each step advances at least one cursor, so
//! the cost is linear in the total row count across members, not
//! rows × members.
//!
//! Output rows have fixed width `3 * member_count + 1` (see
//! [`GroupRow`]); a member without a sample at a given time keeps explicit
//! `None` cells there. A member with no rows at all still occupies its three
//! columns in every output row.

use crate::error::{Result, VitalVisError};
use crate::types::{GroupRow, Row, SeriesId, MEMBER_SLOT_WIDTH};

/// Merge the member series of `group` into one time-aligned row set.
///
/// `members` pairs each series id with its rows, in column order. Rows must
/// be time-ascending (a boundary invariant of the store). Member rows must
/// carry either three value columns (min, max, raw) or one (raw); anything
/// else is a precondition violation and fails fast rather than silently
/// producing a corrupt merged dataset.
pub fn merge_group(group: &str, members: &[(SeriesId, &[Row])]) -> Result<Vec<GroupRow>> {
    let total: usize = members.iter().map(|(_, rows)| rows.len()).sum();
    let mut merged = Vec::with_capacity(total);
    let mut cursors = vec![0usize; members.len()];

    loop {
        // Minimum current time across members that still have rows. Scanning
        // in member order makes the lowest index the nominal tie winner.
        let mut min_time = None;
        for (i, (_, rows)) in members.iter().enumerate() {
            if let Some(row) = rows.get(cursors[i]) {
                if min_time.is_none_or(|t| row.time < t) {
                    min_time = Some(row.time);
                }
            }
        }
        let Some(time) = min_time else {
            break;
        };

        let mut out = GroupRow::empty(time, members.len());
        for (i, (id, rows)) in members.iter().enumerate() {
            if let Some(row) = rows.get(cursors[i]) {
                if row.time == time {
                    fill_member_cells(&mut out, i, row, group, id)?;
                    cursors[i] += 1;
                }
            }
        }
        merged.push(out);
    }

    Ok(merged)
}

/// Copy one member row into its three cells of `out`.
///
/// Three value columns map min/max/raw directly; a single value column is
/// its own envelope, so it fills all three.
fn fill_member_cells(
    out: &mut GroupRow,
    index: usize,
    row: &Row,
    group: &str,
    id: &SeriesId,
) -> Result<()> {
    let start = index * MEMBER_SLOT_WIDTH;
    match row.values.as_slice() {
        [min, max, raw] => {
            out.cells[start] = Some(*min);
            out.cells[start + 1] = Some(*max);
            out.cells[start + 2] = Some(*raw);
        }
        [raw] => {
            out.cells[start] = Some(*raw);
            out.cells[start + 1] = Some(*raw);
            out.cells[start + 2] = Some(*raw);
        }
        other => {
            return Err(VitalVisError::MalformedMember {
                group: group.to_string(),
                series: id.clone(),
                message: format!("expected 1 or 3 value columns, found {}", other.len()),
            });
        }
    }
    Ok(())
}
