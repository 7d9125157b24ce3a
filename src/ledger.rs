//! # Publication Ledger
//! The single piece of durable state: which UTC day the quota counter belongs
//! to, how many items went out that day, and the ordered history of every
//! published id (oldest first).
//!
//! - Read once at run start. A missing file or one that fails to parse yields a
//!   fresh ledger; a corrupt file is moved aside to `<name>.corrupt` first.
//! - Written once at run end via write-to-temp + rename, so a reader never
//!   sees a mix of old and new content.
//! - Ids in `history` are unique. [`PublicationLedger::append`] enforces it.

use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One published id with the moment it entered the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub published_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(id: impl Into<String>, published_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            published_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicationLedger {
    pub day: NaiveDate,
    pub published_today: u32,
    history: Vec<HistoryEntry>,
}

/// How the ledger came into memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Missing,
    Loaded,
    Corrupt,
}

// --- on-disk shape (tolerant) ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerFile {
    #[serde(default)]
    day: Option<NaiveDate>,
    #[serde(default)]
    published_today: Option<u32>,
    #[serde(default)]
    history: Vec<StoredEntry>,
    /// Older files kept a bare id list under `seen`.
    #[serde(default)]
    seen: Vec<StoredEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Stamped(HistoryEntry),
    Bare(String),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LedgerFileOut<'a> {
    day: NaiveDate,
    published_today: u32,
    history: &'a [HistoryEntry],
}

impl PublicationLedger {
    pub fn fresh(today: NaiveDate) -> Self {
        Self {
            day: today,
            published_today: 0,
            history: Vec::new(),
        }
    }

    /// Build a ledger from parts. Repeated ids collapse to their first occurrence.
    pub fn from_parts(day: NaiveDate, published_today: u32, history: Vec<HistoryEntry>) -> Self {
        let mut seen = HashSet::with_capacity(history.len());
        let history = history
            .into_iter()
            .filter(|e| !e.id.is_empty() && seen.insert(e.id.clone()))
            .collect();
        Self {
            day,
            published_today,
            history,
        }
    }

    /// Parse ledger JSON. Missing fields default (`day` = `today`,
    /// `publishedToday` = 0, empty history); unknown fields are ignored.
    pub fn from_json(s: &str, today: NaiveDate) -> serde_json::Result<Self> {
        let file: LedgerFile = serde_json::from_str(s)?;
        let day = file.day.unwrap_or(today);
        let published_today = if file.day.is_some() {
            file.published_today.unwrap_or(0)
        } else {
            0
        };

        let stored = if file.history.is_empty() {
            file.seen
        } else {
            file.history
        };
        // Bare ids carry no timestamp; pin them to the start of the ledger day.
        let pinned = day.and_hms_opt(0, 0, 0).map(|n| n.and_utc()).unwrap_or_default();
        let history = stored
            .into_iter()
            .map(|e| match e {
                StoredEntry::Stamped(h) => h,
                StoredEntry::Bare(id) => HistoryEntry::new(id, pinned),
            })
            .collect();

        Ok(Self::from_parts(day, published_today, history))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&LedgerFileOut {
            day: self.day,
            published_today: self.published_today,
            history: &self.history,
        })
    }

    /// Load from `path`. Missing or corrupt → fresh ledger for `today`.
    /// Any other read failure (permissions, I/O) is returned as an error so the
    /// caller never overwrites a ledger it could not read.
    pub fn load(path: &Path, today: NaiveDate) -> io::Result<(Self, LoadStatus)> {
        let raw = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no ledger yet; starting fresh");
                return Ok((Self::fresh(today), LoadStatus::Missing));
            }
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                // not UTF-8
                quarantine(path);
                return Ok((Self::fresh(today), LoadStatus::Corrupt));
            }
            Err(e) => return Err(e),
        };

        match Self::from_json(&raw, today) {
            Ok(ledger) => Ok((ledger, LoadStatus::Loaded)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ledger unreadable; starting fresh");
                quarantine(path);
                Ok((Self::fresh(today), LoadStatus::Corrupt))
            }
        }
    }

    /// Persist atomically (temp file + rename).
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let json = self
            .to_json()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        write_atomic(path, json.as_bytes())
    }

    /// Advance to `today` if the stored day is different. Returns true on rollover.
    pub fn roll_to(&mut self, today: NaiveDate) -> bool {
        if self.day == today {
            return false;
        }
        self.day = today;
        self.published_today = 0;
        true
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Linear scan. Callers testing many ids should use [`Self::id_set`].
    pub fn contains(&self, id: &str) -> bool {
        self.history.iter().any(|e| e.id == id)
    }

    /// Membership index derived from history.
    pub fn id_set(&self) -> HashSet<&str> {
        self.history.iter().map(|e| e.id.as_str()).collect()
    }

    /// Append entries in order, skipping ids already present.
    /// Returns how many were appended.
    pub fn append<I>(&mut self, entries: I) -> usize
    where
        I: IntoIterator<Item = HistoryEntry>,
    {
        let mut known: HashSet<String> = self.history.iter().map(|e| e.id.clone()).collect();
        let before = self.history.len();
        for e in entries {
            if !e.id.is_empty() && known.insert(e.id.clone()) {
                self.history.push(e);
            }
        }
        self.history.len() - before
    }

    /// Drop the oldest entries until at most `cap` remain. Returns how many went.
    pub fn trim_to(&mut self, cap: usize) -> usize {
        if self.history.len() <= cap {
            return 0;
        }
        let excess = self.history.len() - cap;
        self.history.drain(0..excess);
        excess
    }

    /// The last `n` entries, most recent first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter().rev().take(n)
    }
}

fn quarantine(path: &Path) {
    let aside = sibling_with_suffix(path, ".corrupt");
    match fs::rename(path, &aside) {
        Ok(()) => tracing::warn!(moved_to = %aside.display(), "corrupt ledger moved aside"),
        Err(e) => tracing::warn!(error = %e, "could not move corrupt ledger aside"),
    }
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// Write `bytes` to a temp sibling, fsync, then rename over `path`.
/// Parent directories are created on demand.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = sibling_with_suffix(path, ".tmp");
    let mut f = fs::File::create(&tmp)?;
    f.write_all(bytes)?;
    f.sync_all()?;
    drop(f);
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}
