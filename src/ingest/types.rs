// src/ingest/types.rs
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// One pollable ranking feed. Defined at startup, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub id: String,           // e.g. "ranking1"
    pub display_name: String, // tab label
    pub endpoint: String,     // published CSV URL
}

impl Source {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            endpoint: endpoint.into(),
        }
    }
}

/// One parsed CSV data line. Lives only until aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct RowRecord {
    pub team_name: String,
    pub score: f64,
}

/// Retrieves the raw CSV body for a source.
#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch_csv(&self, source: &Source) -> Result<String, FetchError>;
    fn name(&self) -> &'static str;
}
