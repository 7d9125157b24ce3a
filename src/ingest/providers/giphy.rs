// src/ingest/providers/giphy.rs
//! GIPHY search query and the upstream-record normalization step.
//!
//! Upstream records are loosely shaped: every field may be missing. The
//! rules applied by [`normalize_record`]:
//! - no (or blank) `id` → record discarded;
//! - blank/markup-only `title` → `None`;
//! - missing `images.original.url` → `{media_base}/{id}/giphy.gif`;
//! - missing, sentinel (`0000-00-00 00:00:00`) or unparsable
//!   `import_datetime` → the supplied `now`.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

use crate::ingest::normalize_title;
use crate::ingest::types::{CandidateItem, Page, PageInfo, PageRequest, SourceQuery};

pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://api.giphy.com/v1/gifs/search";
pub const DEFAULT_MEDIA_BASE: &str = "https://media.giphy.com/media";

const IMPORT_SENTINEL: &str = "0000-00-00 00:00:00";

/// Envelope only; each record is decoded on its own so one bad entry
/// cannot sink the page.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<serde_json::Value>,
    #[serde(default)]
    pagination: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawGif {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub images: Option<RawImages>,
    #[serde(default)]
    pub import_datetime: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawImages {
    #[serde(default)]
    pub original: Option<RawRendition>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawRendition {
    #[serde(default)]
    pub url: Option<String>,
}

/// Ids normally arrive as strings; numbers are accepted and stringified,
/// anything else counts as missing.
fn lenient_id<'de, D>(d: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(d)? {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Deterministic media locator for an id.
pub fn fallback_media_url(media_base: &str, id: &str) -> String {
    format!(
        "{}/{}/giphy.gif",
        media_base.trim_end_matches('/'),
        urlencoding::encode(id)
    )
}

fn parse_import_datetime(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    let Some(s) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return now;
    };
    if s == IMPORT_SENTINEL {
        return now;
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .ok()
        .filter(|dt| dt.timestamp() > 0)
        .unwrap_or(now)
}

/// Turn one upstream record into a candidate, or `None` if it has no id.
pub fn normalize_record(raw: RawGif, media_base: &str, now: DateTime<Utc>) -> Option<CandidateItem> {
    let id = raw.id.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())?;

    let media_url = raw
        .images
        .and_then(|i| i.original)
        .and_then(|o| o.url)
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| fallback_media_url(media_base, &id));

    Some(CandidateItem {
        title: raw.title.as_deref().and_then(normalize_title),
        origin_at: parse_import_datetime(raw.import_datetime.as_deref(), now),
        media_url,
        id,
    })
}

/// Parse a search response body into a [`Page`]. A body that is not a JSON
/// object is an error; individual records that do not decode, or carry no
/// id, are dropped and counted.
pub fn parse_page(body: &str, media_base: &str, now: DateTime<Utc>) -> Result<Page> {
    let resp: SearchResponse = serde_json::from_str(body).context("parsing giphy search body")?;
    let returned = resp.data.len();
    let items: Vec<CandidateItem> = resp
        .data
        .into_iter()
        .filter_map(|v| serde_json::from_value::<RawGif>(v).ok())
        .filter_map(|raw| normalize_record(raw, media_base, now))
        .collect();
    let pagination = resp
        .pagination
        .and_then(|v| serde_json::from_value::<PageInfo>(v).ok());

    let dropped = returned - items.len();
    if dropped > 0 {
        counter!("feed_candidates_dropped_total").increment(dropped as u64);
    }

    Ok(Page {
        items,
        returned,
        pagination,
    })
}

/// One search strategy against the GIPHY search endpoint.
///
/// A channel strategy sets `username` (with an empty or channel-scoped `q`);
/// a keyword strategy sets only `q`.
pub struct GiphySearch {
    label: String,
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    query: String,
    username: Option<String>,
    rating: Option<String>,
    media_base: String,
}

impl GiphySearch {
    pub fn new(label: impl Into<String>, api_key: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            client: reqwest::Client::new(),
            endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            api_key: api_key.into(),
            query: query.into(),
            username: None,
            rating: None,
            media_base: DEFAULT_MEDIA_BASE.to_string(),
        }
    }

    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username.filter(|u| !u.trim().is_empty());
        self
    }

    pub fn with_rating(mut self, rating: Option<String>) -> Self {
        self.rating = rating.filter(|r| !r.trim().is_empty());
        self
    }

    pub fn with_media_base(mut self, media_base: impl Into<String>) -> Self {
        self.media_base = media_base.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Per-request timeout; the client is rebuilt with it.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = reqwest::Client::builder()
            .user_agent(concat!("gif-feed-publisher/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(timeout.min(Duration::from_secs(4)))
            .timeout(timeout)
            .build()
            .context("building http client")?;
        Ok(self)
    }

    fn query_params(&self, req: PageRequest) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("api_key", self.api_key.clone()),
            ("q", self.query.clone()),
            ("limit", req.limit.to_string()),
            ("offset", req.offset.to_string()),
            ("sort", "recent".to_string()),
        ];
        if let Some(u) = &self.username {
            params.push(("username", u.clone()));
        }
        if let Some(r) = &self.rating {
            params.push(("rating", r.clone()));
        }
        params
    }
}

#[async_trait]
impl SourceQuery for GiphySearch {
    async fn fetch_page(&self, req: PageRequest) -> Result<Page> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&self.query_params(req))
            .send()
            .await
            // request URL carries the api key
            .map_err(|e| e.without_url())
            .context("giphy search request")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("giphy search returned HTTP {status}");
        }
        let body = resp
            .text()
            .await
            .map_err(|e| e.without_url())
            .context("giphy search body")?;
        parse_page(&body, &self.media_base, Utc::now())
    }

    fn name(&self) -> &str {
        &self.label
    }
}
