//! Fetch payload shape and boundary validation
//!
//! Responses from the fetch collaborator arrive JSON-shaped:
//!
//! ```json
//! {
//!   "series": {
//!     "abp": { "data": [[0.0, 78.2], [4.0, 79.1]], "labels": ["ABP"] },
//!     "hr":  { "data": [[0.0, 61.0]], "labels": ["HR"] }
//!   },
//!   "events": { }
//! }
//! ```
//!
//! where each row's first column is a relative time offset against the
//! request's base time. Schema validation happens here, once: row widths
//! uniform per series and at least 2, time offsets finite and
//! non-decreasing. Everything past this boundary works on typed rows and
//! assumes they are well-formed.

use crate::error::{Result, VitalVisError};
use crate::types::{RawRows, SeriesId};
use serde::Deserialize;
use std::collections::HashMap;

/// One series' slice of a fetch payload.
#[derive(Debug, Deserialize)]
pub struct SeriesPayload {
    /// Rows of `[offset, v...]` columns
    pub data: Vec<Vec<f64>>,
    /// Display labels for the value columns
    #[serde(default)]
    pub labels: Vec<String>,
}

/// A complete fetch response as it comes off the wire.
#[derive(Debug, Deserialize)]
pub struct FetchPayload {
    /// Per-series data, keyed by series id
    pub series: HashMap<String, SeriesPayload>,
    /// Detection/annotation events riding along with the data. The engine
    /// does not interpret these; they are passed through to the host.
    #[serde(default)]
    pub events: Option<serde_json::Value>,
}

/// One series that passed validation, offsets still relative.
#[derive(Debug)]
pub struct ValidatedSeries {
    pub id: SeriesId,
    pub labels: Vec<String>,
    pub rows: RawRows,
}

impl FetchPayload {
    /// Parse a payload from its JSON wire form.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| VitalVisError::Payload(format!("Invalid payload JSON: {}", e)))
    }

    /// Validate every series in the payload, consuming it.
    ///
    /// Series are returned in sorted id order so downstream processing is
    /// deterministic. A violation in any series fails the whole payload —
    /// partially trusting a malformed response is how silent data
    /// corruption starts.
    pub fn validate(self) -> Result<Vec<ValidatedSeries>> {
        let mut out = Vec::with_capacity(self.series.len());
        for (id, series) in self.series {
            out.push(validate_series(SeriesId(id), series)?);
        }
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }
}

/// Validate a single series' payload.
///
/// Used directly by the session so one malformed series can be rejected
/// without discarding the rest of the response.
pub fn validate_series(id: SeriesId, series: SeriesPayload) -> Result<ValidatedSeries> {
    let mut width = None;
    let mut prev_offset = f64::NEG_INFINITY;

    for (i, row) in series.data.iter().enumerate() {
        if row.len() < 2 {
            return Err(VitalVisError::Payload(format!(
                "Series '{}' row {} has {} columns, need at least 2",
                id,
                i,
                row.len()
            )));
        }

        match width {
            None => width = Some(row.len()),
            Some(w) if w != row.len() => {
                return Err(VitalVisError::Payload(format!(
                    "Series '{}' row {} has {} columns, previous rows have {}",
                    id,
                    i,
                    row.len(),
                    w
                )));
            }
            Some(_) => {}
        }

        let offset = row[0];
        if !offset.is_finite() {
            return Err(VitalVisError::Payload(format!(
                "Series '{}' row {} has a non-finite time offset",
                id, i
            )));
        }
        if offset < prev_offset {
            return Err(VitalVisError::Payload(format!(
                "Series '{}' row {} goes backwards in time ({} after {})",
                id, i, offset, prev_offset
            )));
        }
        prev_offset = offset;
    }

    Ok(ValidatedSeries {
        id,
        labels: series.labels,
        rows: RawRows::from_validated(series.data),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_validate_wire_payload() {
        let json = r#"{
            "series": {
                "abp": { "data": [[0.0, 78.2], [4.0, 79.1]], "labels": ["ABP"] },
                "hr":  { "data": [[0.0, 61.0]] }
            }
        }"#;

        let payload = FetchPayload::from_json(json).unwrap();
        let validated = payload.validate().unwrap();

        assert_eq!(validated.len(), 2);
        assert_eq!(validated[0].id, SeriesId::from("abp"));
        assert_eq!(validated[0].labels, vec!["ABP".to_string()]);
        assert_eq!(validated[0].rows.len(), 2);
        assert_eq!(validated[1].id, SeriesId::from("hr"));
        assert!(validated[1].labels.is_empty());
    }

    #[test]
    fn test_events_are_optional_and_passed_through() {
        let json = r#"{ "series": {}, "events": { "alarms": [1, 2] } }"#;
        let payload = FetchPayload::from_json(json).unwrap();
        assert!(payload.events.is_some());
    }

    #[test]
    fn test_reject_narrow_row() {
        let json = r#"{ "series": { "hr": { "data": [[0.0]] } } }"#;
        let err = FetchPayload::from_json(json).unwrap().validate().unwrap_err();
        assert!(err.to_string().contains("at least 2"));
    }

    #[test]
    fn test_reject_ragged_rows() {
        let json = r#"{ "series": { "hr": { "data": [[0.0, 1.0], [1.0, 2.0, 3.0]] } } }"#;
        let err = FetchPayload::from_json(json).unwrap().validate().unwrap_err();
        assert!(matches!(err, VitalVisError::Payload(_)));
    }

    #[test]
    fn test_reject_backwards_time() {
        let json = r#"{ "series": { "hr": { "data": [[5.0, 1.0], [3.0, 2.0]] } } }"#;
        let err = FetchPayload::from_json(json).unwrap().validate().unwrap_err();
        assert!(err.to_string().contains("backwards"));
    }

    #[test]
    fn test_reject_non_finite_offset() {
        let payload = FetchPayload {
            series: HashMap::from([(
                "hr".to_string(),
                SeriesPayload {
                    data: vec![vec![f64::NAN, 1.0]],
                    labels: Vec::new(),
                },
            )]),
            events: None,
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_empty_series_is_valid() {
        let json = r#"{ "series": { "hr": { "data": [] } } }"#;
        let validated = FetchPayload::from_json(json).unwrap().validate().unwrap();
        assert!(validated[0].rows.is_empty());
    }
}
