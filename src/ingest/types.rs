// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};

/// One discovered unit, normalized from whatever the upstream returned.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CandidateItem {
    pub id: String,            // primary dedup key, never empty
    pub title: Option<String>, // display title, defaults applied downstream
    pub media_url: String,     // direct locator or the id-derived fallback
    pub origin_at: DateTime<Utc>,
}

/// Upstream pagination block. Absent or `count == 0` means exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
pub struct PageInfo {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub total_count: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: u64,
    pub limit: u32,
}

/// A single page as seen by the pagination loop.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Items that survived normalization (records without an id are dropped).
    pub items: Vec<CandidateItem>,
    /// Raw number of records the upstream returned, before normalization.
    pub returned: usize,
    pub pagination: Option<PageInfo>,
}

/// One discovery strategy's query against the upstream (one search term,
/// one channel, one local list).
#[async_trait::async_trait]
pub trait SourceQuery: Send + Sync {
    async fn fetch_page(&self, req: PageRequest) -> Result<Page>;
    fn name(&self) -> &str;
}
