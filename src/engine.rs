//! # Intake Engine
//! Pure, testable logic that moves discovered candidates into the ledger.
//! No I/O: persisting the ledger is the caller's job, done once after intake.
//!
//! Policy: roll the quota day if stale, keep candidates whose id is not in
//! history, take at most `daily_limit - published_today` of them in discovery
//! order, append, then apply the history cap. Zero accepted is a normal outcome;
//! old items are never re-published to fill a quota.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::ingest::types::CandidateItem;
use crate::ledger::{HistoryEntry, PublicationLedger};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakeLimits {
    pub daily_limit: u32,
    pub history_cap: usize,
}

impl Default for IntakeLimits {
    fn default() -> Self {
        Self {
            daily_limit: 100,
            history_cap: 100_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IntakeOutcome {
    /// Candidates published this run, in discovery order.
    pub accepted: Vec<CandidateItem>,
    /// Candidates not yet in history (before the quota cut).
    pub fresh: usize,
    /// Quota left before this run's acceptances.
    pub slots: u32,
    pub trimmed: usize,
    pub rolled_over: bool,
}

/// Run one intake pass against `ledger` at time `now`.
pub fn intake(
    candidates: Vec<CandidateItem>,
    ledger: &mut PublicationLedger,
    limits: IntakeLimits,
    now: DateTime<Utc>,
) -> IntakeOutcome {
    // 1) Day rollover (UTC calendar day)
    let rolled_over = ledger.roll_to(now.date_naive());

    // A lowered limit must not leave the counter above it.
    ledger.published_today = ledger.published_today.min(limits.daily_limit);

    // 2) Fresh = not in history; repeated ids inside the batch count once
    let fresh: Vec<CandidateItem> = {
        let known = ledger.id_set();
        let mut batch: HashSet<String> = HashSet::new();
        candidates
            .into_iter()
            .filter(|c| !c.id.is_empty() && !known.contains(c.id.as_str()))
            .filter(|c| batch.insert(c.id.clone()))
            .collect()
    };
    let fresh_count = fresh.len();

    // 3) Slots left today
    let slots = limits.daily_limit.saturating_sub(ledger.published_today);

    // 4) Quota cut, discovery order preserved
    let accepted: Vec<CandidateItem> = fresh.into_iter().take(slots as usize).collect();

    // 5) Append + count + cap
    let appended = ledger.append(
        accepted
            .iter()
            .map(|c| HistoryEntry::new(c.id.clone(), now)),
    );
    debug_assert_eq!(appended, accepted.len());
    ledger.published_today = ledger.published_today.saturating_add(appended as u32);
    let trimmed = ledger.trim_to(limits.history_cap);

    tracing::debug!(
        fresh = fresh_count,
        slots,
        accepted = accepted.len(),
        trimmed,
        rolled_over,
        "intake applied"
    );

    IntakeOutcome {
        accepted,
        fresh: fresh_count,
        slots,
        trimmed,
        rolled_over,
    }
}
