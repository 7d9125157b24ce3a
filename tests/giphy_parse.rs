// tests/giphy_parse.rs
use chrono::{TimeZone, Utc};
use gif_feed_publisher::ingest::providers::giphy::{parse_page, DEFAULT_MEDIA_BASE};

#[test]
fn fixture_page_normalizes_records() {
    let body = std::fs::read_to_string("tests/fixtures/giphy_search_page.json").expect("fixture");
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

    let page = parse_page(&body, DEFAULT_MEDIA_BASE, now).unwrap();

    // blank id dropped, but still counted as returned for paging
    assert_eq!(page.returned, 3);
    assert_eq!(page.items.len(), 2);

    let first = &page.items[0];
    assert_eq!(first.id, "xT9IgG50Fb7Mi0prBC");
    assert_eq!(first.title.as_deref(), Some("Drop XRP GIF"));
    assert!(first.media_url.starts_with("https://media1.giphy.com/media/xT9IgG50Fb7Mi0prBC/"));
    assert_eq!(
        first.origin_at,
        Utc.with_ymd_and_hms(2021, 4, 16, 18, 20, 4).unwrap()
    );

    let second = &page.items[1];
    assert_eq!(second.title, None);
    assert_eq!(
        second.media_url,
        "https://media.giphy.com/media/l0HlBO7eyXzSZkJri/giphy.gif"
    );
    // zero sentinel means "unknown", so discovery time is used
    assert_eq!(second.origin_at, now);

    let p = page.pagination.unwrap();
    assert_eq!((p.count, p.offset, p.total_count), (3, 0, Some(3)));
}

#[test]
fn malformed_body_is_an_error() {
    let now = Utc::now();
    assert!(parse_page("<html>rate limited</html>", DEFAULT_MEDIA_BASE, now).is_err());
}

#[test]
fn missing_pagination_block_is_tolerated() {
    let now = Utc::now();
    let page = parse_page(r#"{"data":[{"id":"a"}]}"#, DEFAULT_MEDIA_BASE, now).unwrap();
    assert_eq!(page.items.len(), 1);
    assert!(page.pagination.is_none());
}

#[test]
fn bad_records_are_dropped_without_losing_the_page() {
    let now = Utc::now();
    let body = r#"{
        "data": [
            null,
            {"id": "a"},
            {"id": 12345},
            {"id": "b", "title": 7},
            "junk",
            {"id": ["nested"]}
        ],
        "pagination": {"total_count": 100, "count": 6, "offset": 0}
    }"#;

    let page = parse_page(body, DEFAULT_MEDIA_BASE, now).unwrap();

    let ids: Vec<&str> = page.items.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "12345"]);
    // raw record count still drives the short-page check
    assert_eq!(page.returned, 6);
    assert_eq!(page.pagination.map(|p| p.count), Some(6));
}

#[test]
fn malformed_pagination_block_reads_as_absent() {
    let now = Utc::now();
    let body = r#"{"data":[{"id":"a"}],"pagination":{"count":"many"}}"#;
    let page = parse_page(body, DEFAULT_MEDIA_BASE, now).unwrap();
    assert_eq!(page.items.len(), 1);
    assert!(page.pagination.is_none());
}
