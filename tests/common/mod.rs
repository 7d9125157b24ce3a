// tests/common/mod.rs
#![allow(dead_code)]
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use gif_feed_publisher::{CandidateItem, Page, PageInfo, PageRequest, SourceQuery};
use std::sync::Mutex;

pub fn ts(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub fn cand(id: &str) -> CandidateItem {
    CandidateItem {
        id: id.to_string(),
        title: Some(format!("title {id}")),
        media_url: format!("https://media.test/{id}/giphy.gif"),
        origin_at: ts(2024, 1, 1, 0),
    }
}

pub fn ids(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{prefix}{i}")).collect()
}

/// Serves a fixed id list page by page, records every request, and can be
/// told to fail at a given request index.
pub struct ScriptedQuery {
    pub label: String,
    pub ids: Vec<String>,
    pub report_total: bool,
    pub fail_at: Option<usize>,
    pub requests: Mutex<Vec<PageRequest>>,
}

impl ScriptedQuery {
    pub fn new(label: &str, ids: Vec<String>) -> Self {
        Self {
            label: label.to_string(),
            ids,
            report_total: true,
            fail_at: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_at(mut self, request_index: usize) -> Self {
        self.fail_at = Some(request_index);
        self
    }

    pub fn without_total(mut self) -> Self {
        self.report_total = false;
        self
    }

    pub fn offsets(&self) -> Vec<u64> {
        self.requests.lock().unwrap().iter().map(|r| r.offset).collect()
    }
}

#[async_trait]
impl SourceQuery for ScriptedQuery {
    async fn fetch_page(&self, req: PageRequest) -> Result<Page> {
        let idx = {
            let mut log = self.requests.lock().unwrap();
            log.push(req);
            log.len() - 1
        };
        if self.fail_at == Some(idx) {
            bail!("upstream returned 503");
        }
        let start = (req.offset as usize).min(self.ids.len());
        let end = (start + req.limit as usize).min(self.ids.len());
        let items: Vec<CandidateItem> = self.ids[start..end].iter().map(|i| cand(i)).collect();
        Ok(Page {
            returned: items.len(),
            pagination: Some(PageInfo {
                count: items.len() as u64,
                offset: req.offset,
                total_count: self.report_total.then_some(self.ids.len() as u64),
            }),
            items,
        })
    }

    fn name(&self) -> &str {
        &self.label
    }
}
