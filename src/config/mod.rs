//! # Configuration
//! Environment-style settings for one publisher run, parsed into an explicit
//! [`FeedConfig`] value. Nothing reads the environment after startup.
//!
//! - `FeedConfig::from_env()` reads process env (call `dotenvy::dotenv()` first).
//! - `FeedConfig::from_lookup(f)` takes any key lookup, which tests use.
//! - Blank values count as absent; malformed numbers are errors, not defaults.

pub mod strategies;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{RunError, RunResult};
use crate::ingest::pagination::PagePlan;
use crate::ingest::providers::giphy::{GiphySearch, DEFAULT_MEDIA_BASE};
use crate::ingest::providers::local_ids::LocalIdsSource;
use crate::ingest::{MergePolicy, Strategy};
use crate::window::LinkBuilder;

pub use strategies::{load_strategies_default, load_strategies_from, StrategySpec};

pub const DEFAULT_DAILY_LIMIT: u32 = 100;
pub const DEFAULT_MAX_CANDIDATES: usize = 500;
pub const DEFAULT_WINDOW_SIZE: usize = 2000;
pub const DEFAULT_HISTORY_CAP: usize = 100_000;
pub const DEFAULT_SITE_URL: &str = "https://example.com";
pub const DEFAULT_STATE_PATH: &str = "docs/state.json";
pub const DEFAULT_FEED_PATH: &str = "docs/rss.xml";
pub const DEFAULT_LOCAL_IDS_PATH: &str = "data/ids.txt";

/// Upstream search credentials and env-declared strategies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GiphySettings {
    pub api_key: Option<String>,
    pub username: Option<String>,
    pub queries: Vec<String>,
    pub rating: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub daily_limit: u32,
    pub max_candidates: usize,
    pub window_size: usize,
    pub history_cap: usize,

    pub site_url: String,
    pub feed_title: String,
    pub feed_description: String,
    pub feed_self_link: Option<String>,
    pub item_title: String,
    pub media_base: String,

    pub state_path: PathBuf,
    pub feed_path: PathBuf,

    pub giphy: GiphySettings,
    pub strategies_path: Option<PathBuf>,
    pub merge_policy: MergePolicy,
    pub page_size: u32,
    pub max_pages: u32,
    pub page_delay: Duration,
    pub http_timeout: Duration,
    pub local_ids_path: PathBuf,

    pub metrics_path: Option<PathBuf>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            daily_limit: DEFAULT_DAILY_LIMIT,
            max_candidates: DEFAULT_MAX_CANDIDATES,
            window_size: DEFAULT_WINDOW_SIZE,
            history_cap: DEFAULT_HISTORY_CAP,
            site_url: DEFAULT_SITE_URL.to_string(),
            feed_title: "GIF Feed".to_string(),
            feed_description: "GIFs published daily".to_string(),
            feed_self_link: None,
            item_title: "GIF".to_string(),
            media_base: DEFAULT_MEDIA_BASE.to_string(),
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            feed_path: PathBuf::from(DEFAULT_FEED_PATH),
            giphy: GiphySettings::default(),
            strategies_path: None,
            merge_policy: MergePolicy::UnionAll,
            page_size: PagePlan::default().page_size,
            max_pages: PagePlan::default().max_pages,
            page_delay: Duration::from_millis(250),
            http_timeout: Duration::from_secs(10),
            local_ids_path: PathBuf::from(DEFAULT_LOCAL_IDS_PATH),
            metrics_path: None,
        }
    }
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_num<T, F>(lookup: &F, key: &str, default: T) -> RunResult<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match non_blank(lookup(key)) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| RunError::config(format!("{key} must be a non-negative integer, got {raw:?}"))),
    }
}

fn validate_http_url(key: &str, raw: &str) -> RunResult<String> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| RunError::config(format!("{key} is not a valid URL ({e}): {raw:?}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(RunError::config(format!("{key} must be http(s): {raw:?}")));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

impl FeedConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> RunResult<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Read settings through an arbitrary lookup.
    pub fn from_lookup<F>(lookup: F) -> RunResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let get = |k: &str| non_blank(lookup(k));

        let daily_limit = parse_num(&lookup, "DAILY_LIMIT", d.daily_limit)?.max(1);
        let history_cap = parse_num(&lookup, "HISTORY_CAP", d.history_cap)?;
        if history_cap == 0 {
            return Err(RunError::config("HISTORY_CAP must be at least 1"));
        }
        let page_size = parse_num(&lookup, "PAGE_SIZE", d.page_size)?;
        if page_size == 0 {
            return Err(RunError::config("PAGE_SIZE must be at least 1"));
        }
        let max_pages = parse_num(&lookup, "MAX_PAGES", d.max_pages)?;
        if max_pages == 0 {
            return Err(RunError::config("MAX_PAGES must be at least 1"));
        }

        let site_url = match get("SITE_URL") {
            Some(raw) => validate_http_url("SITE_URL", &raw)?,
            None => d.site_url,
        };
        let feed_self_link = match get("FEED_SELF_LINK") {
            Some(raw) => Some(validate_http_url("FEED_SELF_LINK", &raw)?),
            None => None,
        };
        let media_base = match get("MEDIA_BASE") {
            Some(raw) => validate_http_url("MEDIA_BASE", &raw)?,
            None => d.media_base,
        };

        let merge_policy = match get("MERGE_POLICY") {
            Some(raw) => MergePolicy::parse(&raw).ok_or_else(|| {
                RunError::config(format!("MERGE_POLICY must be `union` or `fallback`, got {raw:?}"))
            })?,
            None => d.merge_policy,
        };

        let giphy = GiphySettings {
            api_key: get("GIPHY_API_KEY"),
            username: get("GIPHY_USERNAME"),
            queries: get("GIPHY_QUERIES")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|q| !q.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            rating: get("GIPHY_RATING"),
        };

        Ok(Self {
            daily_limit,
            max_candidates: parse_num(&lookup, "MAX_CANDIDATES_PER_RUN", d.max_candidates)?,
            window_size: parse_num(&lookup, "FEED_WINDOW_SIZE", d.window_size)?,
            history_cap,
            site_url,
            feed_title: get("FEED_TITLE").unwrap_or(d.feed_title),
            feed_description: get("FEED_DESC").unwrap_or(d.feed_description),
            feed_self_link,
            item_title: get("ITEM_TITLE").unwrap_or(d.item_title),
            media_base,
            state_path: get("STATE_PATH").map(PathBuf::from).unwrap_or(d.state_path),
            feed_path: get("FEED_PATH").map(PathBuf::from).unwrap_or(d.feed_path),
            giphy,
            strategies_path: get("STRATEGIES_PATH").map(PathBuf::from),
            merge_policy,
            page_size,
            max_pages,
            page_delay: Duration::from_millis(parse_num(&lookup, "PAGE_DELAY_MS", 250u64)?),
            http_timeout: Duration::from_secs(parse_num(&lookup, "HTTP_TIMEOUT_SECS", 10u64)?.max(1)),
            local_ids_path: get("LOCAL_IDS_PATH")
                .map(PathBuf::from)
                .unwrap_or(d.local_ids_path),
            metrics_path: get("METRICS_PATH").map(PathBuf::from),
        })
    }

    pub fn link_builder(&self) -> LinkBuilder {
        LinkBuilder {
            base_address: self.site_url.clone(),
            media_base: self.media_base.clone(),
            item_title: self.item_title.clone(),
        }
    }

    pub fn default_plan(&self) -> PagePlan {
        PagePlan {
            page_size: self.page_size,
            max_pages: self.max_pages,
        }
    }

    /// Strategy specs in priority order: the strategies file if it lists any,
    /// else a channel strategy for `GIPHY_USERNAME` followed by one keyword
    /// strategy per `GIPHY_QUERIES` entry (the username itself when none).
    pub fn strategy_specs(&self) -> RunResult<Vec<StrategySpec>> {
        let from_file = load_strategies_default(self.strategies_path.as_deref())
            .map_err(|e| RunError::config(format!("{e:#}")))?;
        if !from_file.is_empty() {
            return Ok(from_file);
        }

        let mut specs = Vec::new();
        if let Some(user) = &self.giphy.username {
            specs.push(StrategySpec::channel(user));
        }
        if self.giphy.queries.is_empty() {
            if let Some(user) = &self.giphy.username {
                specs.push(StrategySpec::keyword(user));
            }
        } else {
            specs.extend(self.giphy.queries.iter().map(|q| StrategySpec::keyword(q)));
        }
        Ok(specs)
    }

    /// Build runnable strategies. Upstream strategies without an API key are a
    /// configuration error; the local id list joins last when its file exists.
    pub fn build_strategies(&self) -> RunResult<Vec<Strategy>> {
        let specs = self.strategy_specs()?;
        let mut out = Vec::with_capacity(specs.len() + 1);

        if !specs.is_empty() {
            let api_key = self.giphy.api_key.clone().ok_or_else(|| {
                RunError::config("GIPHY_API_KEY is required when search strategies are configured")
            })?;
            for spec in specs {
                if spec.page_size == Some(0) || spec.max_pages == Some(0) {
                    return Err(RunError::config(format!(
                        "strategy {:?}: page_size and max_pages must be at least 1",
                        spec.name
                    )));
                }
                let plan = PagePlan {
                    page_size: spec.page_size.unwrap_or(self.page_size),
                    max_pages: spec.max_pages.unwrap_or(self.max_pages),
                };
                let query = GiphySearch::new(spec.name.clone(), api_key.clone(), spec.query.clone())
                    .with_username(spec.username.clone())
                    .with_rating(spec.rating.clone().or_else(|| self.giphy.rating.clone()))
                    .with_media_base(self.media_base.clone())
                    .with_timeout(self.http_timeout)
                    .map_err(|e| RunError::config(format!("{e:#}")))?;
                out.push(Strategy::new(spec.name, Box::new(query), plan));
            }
        }

        if let Some(local) = self.local_strategy() {
            out.push(local);
        }
        Ok(out)
    }

    fn local_strategy(&self) -> Option<Strategy> {
        let path: &Path = &self.local_ids_path;
        if !path.exists() {
            return None;
        }
        match LocalIdsSource::from_path(path, self.media_base.clone()) {
            Ok(src) => {
                tracing::info!(path = %path.display(), ids = src.len(), "local id list found");
                let label = format!("local:{}", path.display());
                Some(Strategy::new(label, Box::new(src), self.default_plan()))
            }
            Err(e) => {
                tracing::warn!(error = ?e, "local id list unreadable; skipping");
                None
            }
        }
    }
}
