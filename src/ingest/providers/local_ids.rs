// src/ingest/providers/local_ids.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;

use crate::ingest::providers::giphy::fallback_media_url;
use crate::ingest::types::{CandidateItem, Page, PageInfo, PageRequest, SourceQuery};

/// Serves a hand-maintained id list (one id per line) through the same
/// paging protocol as a remote query.
pub struct LocalIdsSource {
    label: String,
    ids: Vec<String>,
    media_base: String,
}

impl LocalIdsSource {
    pub fn from_ids(label: impl Into<String>, ids: Vec<String>, media_base: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ids,
            media_base: media_base.into(),
        }
    }

    pub fn from_path(path: &Path, media_base: impl Into<String>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading local ids from {}", path.display()))?;
        Ok(Self::from_ids(
            format!("local:{}", path.display()),
            parse_ids(&raw),
            media_base,
        ))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Split on lines, trim, drop blanks and `#` comments.
pub fn parse_ids(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl SourceQuery for LocalIdsSource {
    async fn fetch_page(&self, req: PageRequest) -> Result<Page> {
        let now = Utc::now();
        let start = usize::try_from(req.offset)
            .unwrap_or(usize::MAX)
            .min(self.ids.len());
        let end = start.saturating_add(req.limit as usize).min(self.ids.len());

        let items: Vec<CandidateItem> = self.ids[start..end]
            .iter()
            .map(|id| CandidateItem {
                id: id.clone(),
                title: None,
                media_url: fallback_media_url(&self.media_base, id),
                origin_at: now,
            })
            .collect();

        Ok(Page {
            returned: items.len(),
            pagination: Some(PageInfo {
                count: items.len() as u64,
                offset: req.offset,
                total_count: Some(self.ids.len() as u64),
            }),
            items,
        })
    }

    fn name(&self) -> &str {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ids_skips_blanks_and_comments() {
        let raw = "  a1 \r\n\n# note\nb2\n   \n";
        assert_eq!(parse_ids(raw), vec!["a1".to_string(), "b2".to_string()]);
    }

    #[tokio::test]
    async fn pages_past_the_end_are_empty() {
        let src = LocalIdsSource::from_ids("local", vec!["a".into(), "b".into(), "c".into()], "https://m.test");
        let p = src.fetch_page(PageRequest { offset: 2, limit: 2 }).await.unwrap();
        assert_eq!(p.items.len(), 1);
        assert_eq!(p.items[0].media_url, "https://m.test/c/giphy.gif");

        let p = src.fetch_page(PageRequest { offset: 9, limit: 2 }).await.unwrap();
        assert_eq!(p.returned, 0);
    }
}
