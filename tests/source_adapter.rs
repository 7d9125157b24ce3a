// tests/source_adapter.rs
mod common;

use std::time::Duration;

use common::{ids, ScriptedQuery};
use gif_feed_publisher::ingest::pagination::{paginate, PagePlan, StopReason};
use gif_feed_publisher::{discover, MergePolicy, Strategy};

fn plan(page_size: u32, max_pages: u32) -> PagePlan {
    PagePlan { page_size, max_pages }
}

#[tokio::test]
async fn total_count_ends_paging_at_the_last_page() {
    let q = ScriptedQuery::new("kw", ids("a", 120));
    let out = paginate(&q, 500, &plan(50, 10), Duration::ZERO).await;
    assert_eq!(q.offsets(), vec![0, 50, 100]);
    assert_eq!(out.items.len(), 120);
    assert_eq!(out.stop, StopReason::Exhausted);
}

#[tokio::test]
async fn short_page_ends_paging_without_total() {
    let q = ScriptedQuery::new("kw", ids("a", 70)).without_total();
    let out = paginate(&q, 500, &plan(50, 10), Duration::ZERO).await;
    assert_eq!(q.offsets(), vec![0, 50]);
    assert_eq!(out.stop, StopReason::ShortPage);
}

#[tokio::test]
async fn empty_upstream_stops_after_one_request() {
    let q = ScriptedQuery::new("kw", Vec::new());
    let out = paginate(&q, 500, &plan(50, 10), Duration::ZERO).await;
    assert_eq!(q.offsets(), vec![0]);
    assert!(out.items.is_empty());
    assert_eq!(out.stop, StopReason::EmptyPage);
}

#[tokio::test]
async fn page_ceiling_bounds_requests() {
    let q = ScriptedQuery::new("kw", ids("a", 1000));
    let out = paginate(&q, 500, &plan(50, 3), Duration::ZERO).await;
    assert_eq!(q.offsets(), vec![0, 50, 100]);
    assert_eq!(out.items.len(), 150);
    assert_eq!(out.stop, StopReason::PageCeiling);
}

#[tokio::test]
async fn enough_candidates_stops_early() {
    let q = ScriptedQuery::new("kw", ids("a", 1000));
    let out = paginate(&q, 60, &plan(50, 10), Duration::ZERO).await;
    assert_eq!(q.offsets(), vec![0, 50]);
    assert_eq!(out.items.len(), 60);
    assert_eq!(out.stop, StopReason::Satisfied);
}

#[tokio::test]
async fn failed_page_keeps_earlier_pages() {
    let q = ScriptedQuery::new("kw", ids("a", 1000)).failing_at(1);
    let out = paginate(&q, 500, &plan(50, 10), Duration::ZERO).await;
    assert_eq!(out.items.len(), 50);
    assert_eq!(out.stop, StopReason::Failed);
}

fn strategy(label: &str, ids: Vec<String>) -> Strategy {
    Strategy::new(label, Box::new(ScriptedQuery::new(label, ids)), plan(50, 10))
}

fn v(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn union_merges_in_priority_order_first_seen_wins() {
    let strategies = vec![
        strategy("channel", v(&["A", "B", "S"])),
        strategy("search", v(&["S", "C"])),
    ];
    let d = discover(&strategies, 500, MergePolicy::UnionAll, Duration::ZERO).await;
    let got: Vec<&str> = d.items.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(got, vec!["A", "B", "S", "C"]);
    assert_eq!(d.reports.len(), 2);
    assert_eq!(d.reports[1].yielded, 2);
    assert_eq!(d.reports[1].contributed, 1);
}

#[tokio::test]
async fn fallback_stops_at_first_non_empty_strategy() {
    let strategies = vec![
        strategy("empty", Vec::new()),
        strategy("channel", v(&["A"])),
        strategy("search", v(&["B"])),
    ];
    let d = discover(&strategies, 500, MergePolicy::FirstNonEmpty, Duration::ZERO).await;
    let got: Vec<&str> = d.items.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(got, vec!["A"]);
    assert_eq!(d.reports.len(), 2);
}

#[tokio::test]
async fn failing_strategies_yield_an_empty_discovery() {
    let strategies = vec![Strategy::new(
        "broken",
        Box::new(ScriptedQuery::new("broken", ids("a", 10)).failing_at(0)),
        plan(50, 10),
    )];
    let d = discover(&strategies, 500, MergePolicy::UnionAll, Duration::ZERO).await;
    assert!(d.items.is_empty());
    assert_eq!(d.reports[0].stop, StopReason::Failed);
}

#[tokio::test]
async fn candidate_cap_applies_across_strategies() {
    let strategies = vec![
        strategy("one", ids("a", 30)),
        strategy("two", ids("b", 30)),
    ];
    let d = discover(&strategies, 40, MergePolicy::UnionAll, Duration::ZERO).await;
    assert_eq!(d.items.len(), 40);
    assert_eq!(d.items[39].id, "b9");
}
