//! Feed window: the newest slice of ledger history, most recent first, with
//! every renderable field derived from the id and configuration alone.
//! Never touches the network, so the document is fully determined by the
//! committed ledger.

use chrono::{DateTime, Utc};

use crate::ingest::providers::giphy::{fallback_media_url, DEFAULT_MEDIA_BASE};
use crate::ledger::PublicationLedger;

/// One renderable feed item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub link: String,
    pub media_url: String,
    pub published_at: DateTime<Utc>,
}

/// Pure id → link/locator/title derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkBuilder {
    pub base_address: String,
    pub media_base: String,
    pub item_title: String,
}

impl Default for LinkBuilder {
    fn default() -> Self {
        Self {
            base_address: "https://example.com".to_string(),
            media_base: DEFAULT_MEDIA_BASE.to_string(),
            item_title: "GIF".to_string(),
        }
    }
}

impl LinkBuilder {
    /// `{base}/gifs?g={id}` with the id percent-encoded.
    pub fn link_for(&self, id: &str) -> String {
        format!(
            "{}/gifs?g={}",
            self.base_address.trim_end_matches('/'),
            urlencoding::encode(id)
        )
    }

    pub fn media_for(&self, id: &str) -> String {
        fallback_media_url(&self.media_base, id)
    }

    pub fn description_for(&self, id: &str) -> String {
        format!("{} • ID {}", self.item_title, id)
    }
}

/// Last `window_size` history entries, most recent first.
pub fn build_window(
    ledger: &PublicationLedger,
    window_size: usize,
    links: &LinkBuilder,
) -> Vec<FeedItem> {
    ledger
        .recent(window_size)
        .map(|e| FeedItem {
            id: e.id.clone(),
            title: links.item_title.clone(),
            description: links.description_for(&e.id),
            link: links.link_for(&e.id),
            media_url: links.media_for(&e.id),
            published_at: e.published_at,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::HistoryEntry;
    use chrono::{NaiveDate, TimeZone};

    fn ledger_with(ids: &[&str]) -> PublicationLedger {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        PublicationLedger::from_parts(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            0,
            ids.iter()
                .enumerate()
                .map(|(i, id)| HistoryEntry::new(*id, t0 + chrono::Duration::minutes(i as i64)))
                .collect(),
        )
    }

    #[test]
    fn window_is_newest_first_and_bounded() {
        let l = ledger_with(&["A", "B", "C", "D"]);
        let w = build_window(&l, 3, &LinkBuilder::default());
        let ids: Vec<&str> = w.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["D", "C", "B"]);
        assert!(w[0].published_at > w[1].published_at);
    }

    #[test]
    fn window_larger_than_history_takes_everything() {
        let l = ledger_with(&["A", "B"]);
        assert_eq!(build_window(&l, 2000, &LinkBuilder::default()).len(), 2);
        assert!(build_window(&l, 0, &LinkBuilder::default()).is_empty());
    }

    #[test]
    fn links_are_derived_from_id() {
        let links = LinkBuilder {
            base_address: "https://site.test/".into(),
            media_base: "https://media.test/media".into(),
            item_title: "Drop GIF".into(),
        };
        assert_eq!(links.link_for("a b&c"), "https://site.test/gifs?g=a%20b%26c");
        assert_eq!(links.media_for("xyz"), "https://media.test/media/xyz/giphy.gif");
        assert_eq!(links.description_for("xyz"), "Drop GIF • ID xyz");
    }
}
