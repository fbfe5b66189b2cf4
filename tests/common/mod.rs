//! Shared helpers for integration tests

use std::sync::{Arc, Mutex};
use vitalvis::config::{EngineConfig, GroupConfig, StreamConfig, WindowConfig};
use vitalvis::session::{RenderSink, RenderUpdate};
use vitalvis::types::SeriesId;

/// A render sink that records every repaint request.
#[derive(Clone, Default)]
pub struct CollectingSink {
    updates: Arc<Mutex<Vec<RenderUpdate>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<RenderUpdate> {
        self.updates.lock().unwrap().clone()
    }

    #[allow(dead_code)]
    pub fn clear(&self) {
        self.updates.lock().unwrap().clear();
    }
}

impl RenderSink for CollectingSink {
    fn repaint(&mut self, update: RenderUpdate) {
        self.updates.lock().unwrap().push(update);
    }
}

/// Two-group config used across the integration tests.
pub fn test_config(max_rows: usize) -> EngineConfig {
    EngineConfig {
        groups: vec![
            GroupConfig {
                name: "vitals".to_string(),
                members: vec![SeriesId::from("hr"), SeriesId::from("abp")],
            },
            GroupConfig {
                name: "respiratory".to_string(),
                members: vec![SeriesId::from("resp")],
            },
        ],
        stream: StreamConfig {
            max_rows_per_series: max_rows,
            drain_interval_ms: 10,
        },
        window: WindowConfig {
            trailing_ms: 5_000,
            zoom_debounce_ms: 30,
        },
    }
}
