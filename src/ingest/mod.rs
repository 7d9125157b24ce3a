// src/ingest/mod.rs
pub mod pagination;
pub mod providers;
pub mod types;

use crate::ingest::pagination::{paginate, PagePlan, StopReason};
use crate::ingest::types::{CandidateItem, SourceQuery};
use metrics::{counter, describe_counter, describe_gauge};
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use std::time::Duration;

/// One-time metrics registration (so series show up in the exported text).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "feed_pages_fetched_total",
            "Upstream page requests issued."
        );
        describe_counter!(
            "feed_source_errors_total",
            "Page requests that failed or returned malformed bodies."
        );
        describe_counter!(
            "feed_candidates_discovered_total",
            "Unique candidates after merging all strategies."
        );
        describe_counter!(
            "feed_candidates_dropped_total",
            "Upstream records discarded because they carried no id."
        );
        describe_counter!(
            "feed_items_accepted_total",
            "Candidates published into the ledger."
        );
        describe_counter!(
            "feed_history_trimmed_total",
            "Oldest history entries discarded by the history cap."
        );
        describe_gauge!("feed_published_today", "Items published on the current UTC day.");
        describe_gauge!("feed_history_len", "Entries retained in the ledger history.");
        describe_gauge!("feed_window_len", "Items rendered into the feed document.");
        describe_gauge!("feed_last_run_ts", "Unix ts when the publisher last ran.");
    });
}

/// Normalize an upstream title: decode entities, strip tags, collapse whitespace.
/// Returns `None` when nothing printable is left.
pub fn normalize_title(s: &str) -> Option<String> {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Collapse whitespace (Unicode \s covers NBSP)
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    let out = out.trim();

    // 4) Length cap: 300 chars
    let out: String = out.chars().take(300).collect();

    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// How results from several strategies are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Merge every strategy, first-seen order by strategy priority.
    #[default]
    UnionAll,
    /// Take the first strategy (in priority order) that yields anything.
    FirstNonEmpty,
}

impl MergePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "union" | "union-all" | "union_all" => Some(MergePolicy::UnionAll),
            "fallback" | "first-non-empty" | "first_non_empty" => {
                Some(MergePolicy::FirstNonEmpty)
            }
            _ => None,
        }
    }
}

/// One configured discovery strategy: a query plus its own page budget.
pub struct Strategy {
    pub label: String,
    pub query: Box<dyn SourceQuery>,
    pub plan: PagePlan,
}

impl Strategy {
    pub fn new(label: impl Into<String>, query: Box<dyn SourceQuery>, plan: PagePlan) -> Self {
        Self {
            label: label.into(),
            query,
            plan,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyReport {
    pub label: String,
    pub pages: u32,
    pub yielded: usize,
    /// Items that were new to the merged set.
    pub contributed: usize,
    pub stop: StopReason,
}

#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub items: Vec<CandidateItem>,
    pub reports: Vec<StrategyReport>,
}

/// Merge per-strategy results in priority order, dropping repeated ids.
/// The first occurrence of an id wins, whatever metadata later copies carry.
/// Returns the merged list and how many items each input contributed.
pub fn merge_first_seen(
    per_strategy: Vec<Vec<CandidateItem>>,
    max_candidates: usize,
) -> (Vec<CandidateItem>, Vec<usize>) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::new();
    let mut contributed = Vec::with_capacity(per_strategy.len());

    for items in per_strategy {
        let mut n = 0usize;
        for it in items {
            if merged.len() >= max_candidates {
                break;
            }
            if seen.insert(it.id.clone()) {
                merged.push(it);
                n += 1;
            }
        }
        contributed.push(n);
    }
    (merged, contributed)
}

/// Source Adapter entry point: run strategies in priority order and merge.
///
/// Failures never escape: a failing page ends that strategy only, and an
/// empty result from every strategy is simply an empty discovery.
pub async fn discover(
    strategies: &[Strategy],
    max_candidates: usize,
    policy: MergePolicy,
    spacing: Duration,
) -> Discovery {
    ensure_metrics_described();

    let mut per_strategy = Vec::with_capacity(strategies.len());
    let mut reports = Vec::with_capacity(strategies.len());

    for s in strategies {
        let outcome = paginate(s.query.as_ref(), max_candidates, &s.plan, spacing).await;
        tracing::info!(
            strategy = %s.label,
            pages = outcome.pages,
            yielded = outcome.items.len(),
            stop = outcome.stop.as_str(),
            "strategy finished"
        );
        let non_empty = !outcome.items.is_empty();
        reports.push(StrategyReport {
            label: s.label.clone(),
            pages: outcome.pages,
            yielded: outcome.items.len(),
            contributed: 0,
            stop: outcome.stop,
        });
        per_strategy.push(outcome.items);

        if policy == MergePolicy::FirstNonEmpty && non_empty {
            break;
        }
    }

    let (items, contributed) = merge_first_seen(per_strategy, max_candidates);
    for (r, n) in reports.iter_mut().zip(contributed) {
        r.contributed = n;
    }

    counter!("feed_candidates_discovered_total").increment(items.len() as u64);
    Discovery { items, reports }
}
