//! Bounded pagination protocol.
//!
//! Every strategy pages through its upstream query sequentially, with a fixed
//! spacing between requests, until one of the enumerated [`StopReason`]s fires.
//! The stop decision lives in [`PagePlan::next_stop`] so it can be tested without
//! any I/O.

use std::collections::HashSet;
use std::time::Duration;

use metrics::counter;

use crate::ingest::types::{CandidateItem, PageInfo, PageRequest, SourceQuery};

/// Why a strategy stopped paging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Collected as many unique items as requested.
    Satisfied,
    /// Page returned fewer records than the page size.
    ShortPage,
    /// Page returned no records at all.
    EmptyPage,
    /// Pagination block missing, `count == 0`, or `total_count` reached.
    Exhausted,
    /// Hard page-count ceiling hit.
    PageCeiling,
    /// The page request failed or the body was malformed.
    Failed,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::Satisfied => "satisfied",
            StopReason::ShortPage => "short_page",
            StopReason::EmptyPage => "empty_page",
            StopReason::Exhausted => "exhausted",
            StopReason::PageCeiling => "page_ceiling",
            StopReason::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePlan {
    pub page_size: u32,
    pub max_pages: u32,
}

impl Default for PagePlan {
    fn default() -> Self {
        Self {
            page_size: 50,
            max_pages: 10,
        }
    }
}

/// What the loop knows right after a page came back.
#[derive(Debug, Clone, Copy)]
pub struct PageStep {
    pub offset: u64,
    pub returned: usize,
    pub pagination: Option<PageInfo>,
    /// Unique items collected so far, this page included.
    pub collected: usize,
    pub want: usize,
    /// Pages issued so far, this page included.
    pub pages: u32,
}

impl PagePlan {
    /// Returns `Some(reason)` if paging must stop after this step.
    ///
    /// Checked in order: satisfied, empty page, exhausted, short page, ceiling.
    pub fn next_stop(&self, step: &PageStep) -> Option<StopReason> {
        if step.collected >= step.want {
            return Some(StopReason::Satisfied);
        }
        if step.returned == 0 {
            return Some(StopReason::EmptyPage);
        }
        match step.pagination {
            None => return Some(StopReason::Exhausted),
            Some(p) if p.count == 0 => return Some(StopReason::Exhausted),
            Some(p) => {
                if let Some(total) = p.total_count {
                    if step.offset.saturating_add(step.returned as u64) >= total {
                        return Some(StopReason::Exhausted);
                    }
                }
            }
        }
        if step.returned < self.page_size as usize {
            return Some(StopReason::ShortPage);
        }
        if step.pages >= self.max_pages {
            return Some(StopReason::PageCeiling);
        }
        None
    }
}

#[derive(Debug, Clone)]
pub struct StrategyOutcome {
    pub items: Vec<CandidateItem>,
    pub pages: u32,
    pub stop: StopReason,
}

/// Page through one query until a stop condition fires.
///
/// Requests are strictly sequential with `spacing` between them. A failed page
/// ends the strategy; whatever was collected before it is kept.
pub async fn paginate(
    query: &dyn SourceQuery,
    want: usize,
    plan: &PagePlan,
    spacing: Duration,
) -> StrategyOutcome {
    let mut items: Vec<CandidateItem> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    if want == 0 {
        return StrategyOutcome {
            items,
            pages: 0,
            stop: StopReason::Satisfied,
        };
    }
    if plan.max_pages == 0 || plan.page_size == 0 {
        return StrategyOutcome {
            items,
            pages: 0,
            stop: StopReason::PageCeiling,
        };
    }

    let mut offset: u64 = 0;
    let mut pages: u32 = 0;

    let stop = loop {
        if pages > 0 && !spacing.is_zero() {
            tokio::time::sleep(spacing).await;
        }
        pages += 1;
        counter!("feed_pages_fetched_total").increment(1);

        let req = PageRequest {
            offset,
            limit: plan.page_size,
        };
        let page = match query.fetch_page(req).await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(
                    error = ?e,
                    strategy = query.name(),
                    offset,
                    "page fetch failed; ending strategy"
                );
                counter!("feed_source_errors_total").increment(1);
                break StopReason::Failed;
            }
        };

        let returned = page.returned;
        let pagination = page.pagination;
        for it in page.items {
            if seen.insert(it.id.clone()) {
                items.push(it);
            }
        }

        tracing::debug!(
            strategy = query.name(),
            offset,
            returned,
            collected = items.len(),
            "page fetched"
        );

        let step = PageStep {
            offset,
            returned,
            pagination,
            collected: items.len(),
            want,
            pages,
        };
        if let Some(reason) = plan.next_stop(&step) {
            break reason;
        }
        offset = offset.saturating_add(plan.page_size as u64);
    };

    items.truncate(want);
    StrategyOutcome { items, pages, stop }
}
