// ═══════════════════════════════════════════════════════════════
// CRAWL STATS - how far we got, and how it went
// ═══════════════════════════════════════════════════════════════
//
// Plain counters. The walk is one sequential loop that owns these, so there
// is nothing to synchronize. At the end they get folded into a CrawlSummary
// and logged as one JSON line.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Why the walk ended without an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StopReason {
    /// The last page had no "next" anchor.
    EndOfSequence,
    /// A "next" anchor pointed back at a page we already visited.
    CycleDetected { identifier: String },
    /// `max_pages` reached.
    PageLimit { limit: usize },
    /// A page could not be fetched and the policy says stop, not abort.
    FetchFailed { identifier: String, error: String },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::EndOfSequence => write!(f, "end of sequence"),
            StopReason::CycleDetected { identifier } => {
                write!(f, "cycle detected at {identifier}")
            }
            StopReason::PageLimit { limit } => write!(f, "page limit of {limit} reached"),
            StopReason::FetchFailed { identifier, error } => {
                write!(f, "fetch of {identifier} failed: {error}")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    pub pages_visited: u64,
    pub records_collected: u64,
    pub images_stored: u64,
    pub images_skipped: u64,
    pub image_bytes_written: u64,
    pub extraction_gaps: u64,
}

/// One line at the end of the run that says everything.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_secs: f64,
    /// Set when the walk finished on its own terms.
    pub stop: Option<StopReason>,
    /// Set when the run died instead.
    pub error: Option<String>,
    pub output: Option<String>,
    #[serde(flatten)]
    pub stats: CrawlStats,
}

impl CrawlSummary {
    pub fn new(
        run_id: Uuid,
        started_at: DateTime<Utc>,
        stop: Option<StopReason>,
        error: Option<String>,
        output: Option<String>,
        stats: CrawlStats,
    ) -> Self {
        let finished_at = Utc::now();
        let elapsed_secs = (finished_at - started_at).num_milliseconds().max(0) as f64 / 1000.0;
        Self {
            run_id,
            started_at,
            finished_at,
            elapsed_secs,
            stop,
            error,
            output,
            stats,
        }
    }
}
