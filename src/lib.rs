// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod ingest;
pub mod ledger;
pub mod lock;
pub mod metrics;
pub mod run;
pub mod window;

// ---- Re-exports for stable public API ----
pub use crate::config::FeedConfig;
pub use crate::engine::{intake, IntakeLimits, IntakeOutcome};
pub use crate::error::{RunError, RunResult};
pub use crate::feed::{ChannelMeta, FeedSerializer, RssSerializer};
pub use crate::ingest::types::{CandidateItem, Page, PageInfo, PageRequest, SourceQuery};
pub use crate::ingest::{discover, MergePolicy, Strategy};
pub use crate::ledger::{HistoryEntry, LoadStatus, PublicationLedger};
pub use crate::run::{Publisher, RunReport};
pub use crate::window::{build_window, FeedItem, LinkBuilder};
