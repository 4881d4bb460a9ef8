// =============================================================================
// error.rs - EVERYTHING THAT CAN GO WRONG, SORTED INTO BOXES
// =============================================================================
//
// Each stage of the crawl has its own error type so the walker can decide
// what to do about it (abort, stop, skip) instead of logging and carrying on
// with half a page.
// =============================================================================

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::collection::Collection;
use crate::stats::CrawlStats;

/// Retrieving a page's markup failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("page identifier {id:?} does not resolve against the base URL: {source}")]
    Address {
        id: String,
        #[source]
        source: url::ParseError,
    },

    #[error("request for {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Downloading or writing a card image failed.
#[derive(Debug, Error)]
pub enum ImageWriteError {
    #[error("image request for {url} failed: {source}")]
    Retrieve {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("image {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("image stream for {path} broke mid-download: {reason}")]
    Stream { path: PathBuf, reason: String },

    #[error("could not write image {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Writing the final (or checkpoint) document failed.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("could not serialize the card collection: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("could not write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The field table handed to the extractor is unusable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractorError {
    #[error("no designator configured for field `{0}`")]
    MissingField(&'static str),

    #[error("field `{0}` is mapped more than once")]
    DuplicateField(&'static str),

    #[error("designator {0:?} is used for more than one field")]
    DuplicateDesignator(String),

    #[error("field `{0}` has an empty designator")]
    EmptyDesignator(&'static str),

    #[error("field `{0}` is not read by the {1} variant")]
    UnexpectedField(&'static str, String),
}

/// Why a field came back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapReason {
    /// No `th` contains the designator.
    MissingLabel,
    /// The label exists but has no sibling value cell.
    MissingValueCell,
    /// The value cell has no icon where one was expected.
    MissingIcon,
    /// No `.graphic img` with a usable `src` on the page.
    MissingImage,
}

impl fmt::Display for GapReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GapReason::MissingLabel => write!(f, "label not found"),
            GapReason::MissingValueCell => write!(f, "value cell not found"),
            GapReason::MissingIcon => write!(f, "icon not found"),
            GapReason::MissingImage => write!(f, "card image not found"),
        }
    }
}

/// A lookup that found nothing. The record still gets built; this just says
/// which field was degraded and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionGap {
    pub field: &'static str,
    pub reason: GapReason,
}

impl fmt::Display for ExtractionGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Something the walker could not (or was told not to) recover from.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Image(#[from] ImageWriteError),

    #[error("strict extraction: page {page} has {} gap(s), first: {}", .gaps.len(), first_gap(.gaps))]
    Extraction { page: String, gaps: Vec<ExtractionGap> },
}

fn first_gap(gaps: &[ExtractionGap]) -> String {
    gaps.first().map(ToString::to_string).unwrap_or_default()
}

/// The walk died partway. Carries what was collected so the caller can
/// checkpoint it.
#[derive(Debug, Error)]
#[error("crawl aborted after {} record(s)", .partial.len())]
pub struct WalkAborted {
    #[source]
    pub error: CrawlError,
    pub partial: Collection,
    pub stats: CrawlStats,
}

/// Configuration that can't be turned into a working crawler.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} is not a valid URL ({value:?}): {source}")]
    InvalidUrl {
        key: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("{key} must be one of {expected}, got {value:?}")]
    InvalidChoice {
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("{0} is required when the extended variant is selected")]
    MissingStoragePrefix(&'static str),
}
