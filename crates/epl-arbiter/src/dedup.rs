//! Near-duplicate candidate filter.
//!
//! Keeps a rolling pool of recently admitted candidates per symbol. A new
//! candidate is a duplicate of a pool entry with the same direction, created
//! within the comparison window, when either:
//! - |Δconfidence| <= `confidence_threshold`, or
//! - Jaccard(indicator sets) > `jaccard_threshold`.
//!
//! The check and the insert happen under one lock so two concurrent
//! identical candidates cannot both be admitted.

use crate::config::DedupConfig;
use chrono::{DateTime, Utc};
use epl_core::{CandidateId, Direction, SignalCandidate};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap, VecDeque};
use tracing::debug;

/// Which rule flagged the duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateRule {
    Confidence,
    Indicators,
}

impl DuplicateRule {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Confidence => "confidence",
            Self::Indicators => "indicators",
        }
    }
}

/// Details of a duplicate hit.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateMatch {
    /// Pool entry the candidate duplicates.
    pub existing_id: CandidateId,
    pub rule: DuplicateRule,
    pub confidence_diff: Decimal,
    pub similarity: Decimal,
}

#[derive(Debug, Clone)]
struct PoolEntry {
    id: CandidateId,
    direction: Direction,
    confidence: Decimal,
    indicators: BTreeSet<String>,
    created_at: DateTime<Utc>,
}

impl PoolEntry {
    fn from_candidate(candidate: &SignalCandidate) -> Self {
        Self {
            id: candidate.id.clone(),
            direction: candidate.direction,
            confidence: candidate.confidence,
            indicators: candidate.indicators.clone(),
            created_at: candidate.created_at,
        }
    }
}

#[derive(Debug)]
struct SymbolBucket {
    entries: VecDeque<PoolEntry>,
    newest: DateTime<Utc>,
}

/// Rolling candidate pool.
#[derive(Debug)]
pub struct CandidatePool {
    config: DedupConfig,
    buckets: Mutex<HashMap<String, SymbolBucket>>,
}

impl CandidatePool {
    pub fn new(config: DedupConfig) -> Self {
        Self {
            config,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Return `true` if `candidate` duplicates a pooled entry.
    ///
    /// Admits (pools) the candidate when it is not a duplicate.
    pub fn is_duplicate(&self, candidate: &SignalCandidate) -> bool {
        self.check_and_admit(candidate).is_some()
    }

    /// Check for a duplicate, admitting the candidate if none is found.
    pub fn check_and_admit(&self, candidate: &SignalCandidate) -> Option<DuplicateMatch> {
        let window = self.config.window();
        let mut buckets = self.buckets.lock();

        if let Some(bucket) = buckets.get(&candidate.symbol) {
            let hit = bucket
                .entries
                .iter()
                .filter(|e| e.direction == candidate.direction)
                .filter(|e| (candidate.created_at - e.created_at).abs() <= window)
                .find_map(|e| self.compare(candidate, e));

            if let Some(hit) = hit {
                debug!(
                    symbol = %candidate.symbol,
                    candidate_id = %candidate.id,
                    existing_id = %hit.existing_id,
                    rule = hit.rule.as_str(),
                    confidence_diff = %hit.confidence_diff,
                    similarity = %hit.similarity,
                    "Duplicate candidate"
                );
                return Some(hit);
            }
        }

        let bucket = buckets
            .entry(candidate.symbol.clone())
            .or_insert_with(|| SymbolBucket {
                entries: VecDeque::new(),
                newest: candidate.created_at,
            });
        bucket.entries.push_back(PoolEntry::from_candidate(candidate));
        if candidate.created_at > bucket.newest {
            bucket.newest = candidate.created_at;
        }

        // Trim relative to the newest candidate seen for this symbol
        if let Some(cutoff) = bucket.newest.checked_sub_signed(self.config.retention()) {
            bucket.entries.retain(|e| e.created_at >= cutoff);
        }

        None
    }

    fn compare(&self, candidate: &SignalCandidate, entry: &PoolEntry) -> Option<DuplicateMatch> {
        let confidence_diff = (candidate.confidence - entry.confidence).abs();
        let similarity = jaccard_similarity(&candidate.indicators, &entry.indicators);

        let rule = if confidence_diff <= self.config.confidence_threshold {
            DuplicateRule::Confidence
        } else if similarity > self.config.jaccard_threshold {
            DuplicateRule::Indicators
        } else {
            return None;
        };

        Some(DuplicateMatch {
            existing_id: entry.id.clone(),
            rule,
            confidence_diff,
            similarity,
        })
    }

    /// Drop entries older than the retention period as of `now`.
    ///
    /// Returns the number of entries removed.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let Some(cutoff) = now.checked_sub_signed(self.config.retention()) else {
            return 0;
        };
        let mut removed = 0;
        let mut buckets = self.buckets.lock();
        buckets.retain(|_, bucket| {
            let before = bucket.entries.len();
            bucket.entries.retain(|e| e.created_at >= cutoff);
            removed += before - bucket.entries.len();
            !bucket.entries.is_empty()
        });
        removed
    }

    /// Total pooled candidates.
    pub fn len(&self) -> usize {
        self.buckets.lock().values().map(|b| b.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pooled candidates for one symbol.
    pub fn len_for(&self, symbol: &str) -> usize {
        self.buckets
            .lock()
            .get(symbol)
            .map(|b| b.entries.len())
            .unwrap_or(0)
    }
}

/// Jaccard similarity of two name sets.
///
/// Defined as 0 when either set is empty.
pub fn jaccard_similarity(a: &BTreeSet<String>, b: &BTreeSet<String>) -> Decimal {
    if a.is_empty() || b.is_empty() {
        return Decimal::ZERO;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    Decimal::from(intersection as u64) / Decimal::from(union as u64)
}
