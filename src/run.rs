//! One publisher invocation, start to finish.
//!
//! Order matters: the ledger is saved first and is the commit point; the feed
//! document is written only after it. A feed write that fails (or a crash in
//! between) leaves a stale feed that the next run rebuilds from the committed
//! ledger. The feed never shows items the ledger does not hold.

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use tracing::info;

use crate::config::FeedConfig;
use crate::engine::{intake, IntakeLimits};
use crate::error::{RunError, RunResult};
use crate::feed::{ChannelMeta, FeedSerializer, RssSerializer};
use crate::ingest::{discover, Strategy, StrategyReport};
use crate::ledger::{write_atomic, LoadStatus, PublicationLedger};
use crate::lock::{lock_path_for, LockError, RunLock};
use crate::window::build_window;

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub discovered: usize,
    pub fresh: usize,
    pub accepted: usize,
    pub published_today: u32,
    pub daily_limit: u32,
    pub history_len: usize,
    pub window_len: usize,
    pub trimmed: usize,
    pub rolled_over: bool,
    pub ledger_status: LoadStatus,
    pub strategies: Vec<StrategyReport>,
}

pub struct Publisher {
    config: FeedConfig,
    strategies: Vec<Strategy>,
    serializer: Box<dyn FeedSerializer>,
}

impl Publisher {
    pub fn new(config: FeedConfig, strategies: Vec<Strategy>) -> Self {
        Self {
            config,
            strategies,
            serializer: Box::new(RssSerializer),
        }
    }

    /// Build strategies from `config` (credentials are checked here).
    pub fn from_config(config: FeedConfig) -> RunResult<Self> {
        let strategies = config.build_strategies()?;
        Ok(Self::new(config, strategies))
    }

    pub fn with_serializer(mut self, serializer: Box<dyn FeedSerializer>) -> Self {
        self.serializer = serializer;
        self
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub async fn run(&self, now: DateTime<Utc>) -> RunResult<RunReport> {
        let cfg = &self.config;

        let lock_path = lock_path_for(&cfg.state_path);
        let _lock = RunLock::acquire(&lock_path).map_err(|e| match e {
            LockError::Held(p) => RunError::Busy(p),
            LockError::Io(e) => RunError::persistence(&lock_path, e),
        })?;

        let (mut ledger, ledger_status) = PublicationLedger::load(&cfg.state_path, now.date_naive())
            .map_err(|e| RunError::persistence(&cfg.state_path, e))?;

        let discovery = discover(
            &self.strategies,
            cfg.max_candidates,
            cfg.merge_policy,
            cfg.page_delay,
        )
        .await;
        let discovered = discovery.items.len();

        let limits = IntakeLimits {
            daily_limit: cfg.daily_limit,
            history_cap: cfg.history_cap,
        };
        let outcome = intake(discovery.items, &mut ledger, limits, now);

        let window = build_window(&ledger, cfg.window_size, &cfg.link_builder());
        let channel = ChannelMeta {
            title: cfg.feed_title.clone(),
            link: cfg.site_url.clone(),
            description: cfg.feed_description.clone(),
            self_link: cfg.feed_self_link.clone(),
            last_build: now,
        };
        let doc = self
            .serializer
            .serialize(&channel, &window)
            .map_err(|e| RunError::Render(format!("{e:#}")))?;

        ledger
            .save(&cfg.state_path)
            .map_err(|e| RunError::persistence(&cfg.state_path, e))?;
        write_atomic(&cfg.feed_path, doc.as_bytes())
            .map_err(|e| RunError::persistence(&cfg.feed_path, e))?;

        counter!("feed_items_accepted_total").increment(outcome.accepted.len() as u64);
        counter!("feed_history_trimmed_total").increment(outcome.trimmed as u64);
        gauge!("feed_published_today").set(ledger.published_today as f64);
        gauge!("feed_history_len").set(ledger.len() as f64);
        gauge!("feed_window_len").set(window.len() as f64);

        info!(
            discovered,
            fresh = outcome.fresh,
            accepted = outcome.accepted.len(),
            history = ledger.len(),
            window = window.len(),
            content_type = self.serializer.content_type(),
            "today used {}/{}",
            ledger.published_today,
            cfg.daily_limit
        );

        Ok(RunReport {
            discovered,
            fresh: outcome.fresh,
            accepted: outcome.accepted.len(),
            published_today: ledger.published_today,
            daily_limit: cfg.daily_limit,
            history_len: ledger.len(),
            window_len: window.len(),
            trimmed: outcome.trimmed,
            rolled_over: outcome.rolled_over,
            ledger_status,
            strategies: discovery.reports,
        })
    }
}
