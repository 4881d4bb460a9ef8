// =============================================================================
// walker.rs - THE PAGINATION WALKER
// =============================================================================
//
// Two states. `Scanning` means we have a page to visit. `Done` means we
// don't. Every lap of the loop does exactly this, in this order:
//
//   1. fetch the current page
//   2. extract its record (pure, no I/O)
//   3. download its image, and wait for it
//   4. append the record
//   5. look for the "next" anchor
//
// No parallelism, on purpose: one request in flight at a time keeps the
// cardlist server happy.
//
// The walk has no built-in page bound, but it does remember where it has been.
// A "next" link back at a visited page ends the walk instead of looping
// forever. Everything collected up to that point is kept.
// =============================================================================

use std::collections::HashSet;

use tracing::{info, warn};
use url::Url;

use crate::collection::Collection;
use crate::error::{CrawlError, WalkAborted};
use crate::extractor::{Extractor, PageExtraction};
use crate::fetcher::PageSource;
use crate::images::ImageStore;
use crate::models::PageId;
use crate::stats::{CrawlStats, StopReason};

/// What to do when a page can't be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageFailurePolicy {
    /// Fail the walk. The caller gets the partial collection back.
    #[default]
    Abort,
    /// End the walk normally with what we have. (There is no "skip": the next
    /// identifier lives on the page we couldn't get.)
    Stop,
}

/// What to do when a card image can't be downloaded or written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFailurePolicy {
    #[default]
    Abort,
    /// Keep the record, note the missing image, carry on.
    Skip,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkPolicy {
    pub on_page_error: PageFailurePolicy,
    pub on_image_error: ImageFailurePolicy,
    /// `None` keeps the walk unbounded.
    pub max_pages: Option<usize>,
    /// Treat any extraction gap as fatal.
    pub strict_extraction: bool,
}

/// A finished walk.
#[derive(Debug)]
pub struct WalkOutcome {
    pub records: Collection,
    pub stop: StopReason,
    pub stats: CrawlStats,
}

#[derive(Debug)]
enum WalkState {
    Scanning(PageId),
    Done(StopReason),
}

/// Pages seen so far, keyed by resolved and percent-decoded URL so that
/// `.?cardno=A/1` and `?cardno=A%2F1` count as the same card.
#[derive(Debug, Default)]
struct VisitedPages {
    seen: HashSet<String>,
}

impl VisitedPages {
    /// `true` if the key is new (and now remembered).
    fn check_and_insert(&mut self, key: String) -> bool {
        self.seen.insert(key)
    }
}

/// Mutable state of one walk. Owned by `walk`, lent to each step.
#[derive(Debug, Default)]
struct Progress {
    collection: Collection,
    stats: CrawlStats,
    visited: VisitedPages,
}

pub struct PaginationWalker<'a, P: ?Sized, I: ?Sized> {
    pages: &'a P,
    images: &'a I,
    extractor: &'a Extractor,
    base_url: Url,
    policy: WalkPolicy,
}

impl<'a, P, I> PaginationWalker<'a, P, I>
where
    P: PageSource + ?Sized,
    I: ImageStore + ?Sized,
{
    pub fn new(
        pages: &'a P,
        images: &'a I,
        extractor: &'a Extractor,
        base_url: Url,
        policy: WalkPolicy,
    ) -> Self {
        Self { pages, images, extractor, base_url, policy }
    }

    /// Walk from `start` until the sequence ends, loops, hits the page limit,
    /// or fails.
    pub async fn walk(&self, start: PageId) -> Result<WalkOutcome, WalkAborted> {
        let mut progress = Progress::default();
        progress.visited.check_and_insert(self.visit_key(&start));

        info!(
            start = %start,
            variant = %self.extractor.variant(),
            max_pages = ?self.policy.max_pages,
            "Walk starting - flipping through the binder one card at a time"
        );

        let mut state = WalkState::Scanning(start);
        loop {
            let current = match state {
                WalkState::Scanning(id) => id,
                WalkState::Done(stop) => {
                    info!(
                        records = progress.collection.len(),
                        reason = %stop,
                        "Walk finished"
                    );
                    return Ok(WalkOutcome {
                        records: progress.collection,
                        stop,
                        stats: progress.stats,
                    });
                }
            };

            state = match self.step(&current, &mut progress).await {
                Ok(next) => next,
                Err(error) => {
                    return Err(WalkAborted {
                        error,
                        partial: progress.collection,
                        stats: progress.stats,
                    });
                }
            };
        }
    }

    async fn step(&self, current: &PageId, progress: &mut Progress) -> Result<WalkState, CrawlError> {
        if let Some(limit) = self.policy.max_pages {
            if progress.stats.pages_visited >= limit as u64 {
                return Ok(WalkState::Done(StopReason::PageLimit { limit }));
            }
        }

        let card_no = current.card_number(&self.base_url);
        info!(card = %card_no, "[EXTRACTING] Card No.: {}", card_no);

        let markup = match self.pages.fetch(current).await {
            Ok(markup) => markup,
            Err(e) => match self.policy.on_page_error {
                PageFailurePolicy::Abort => return Err(e.into()),
                PageFailurePolicy::Stop => {
                    warn!(card = %card_no, error = %e, "Page unavailable - stopping the walk here");
                    return Ok(WalkState::Done(StopReason::FetchFailed {
                        identifier: current.to_string(),
                        error: e.to_string(),
                    }));
                }
            },
        };
        progress.stats.pages_visited += 1;

        let PageExtraction { record, image, next, gaps } = self.extractor.extract(&markup);

        for gap in &gaps {
            warn!(card = %card_no, field = gap.field, reason = %gap.reason, "Extraction gap");
        }
        progress.stats.extraction_gaps += gaps.len() as u64;
        if self.policy.strict_extraction && !gaps.is_empty() {
            return Err(CrawlError::Extraction { page: current.to_string(), gaps });
        }

        if let Some(asset) = &image {
            match self.images.store(asset).await {
                Ok(stored) => {
                    progress.stats.images_stored += 1;
                    progress.stats.image_bytes_written += stored.bytes;
                }
                Err(e) => match self.policy.on_image_error {
                    ImageFailurePolicy::Abort => return Err(e.into()),
                    ImageFailurePolicy::Skip => {
                        warn!(card = %card_no, error = %e, "Card image skipped");
                        progress.stats.images_skipped += 1;
                    }
                },
            }
        }

        progress.collection.push(record);
        progress.stats.records_collected += 1;
        info!(card = %card_no, "[DONE EXTRACTING] Card No.: {}", card_no);

        let Some(next) = next else {
            return Ok(WalkState::Done(StopReason::EndOfSequence));
        };

        if !progress.visited.check_and_insert(self.visit_key(&next)) {
            warn!(
                card = %card_no,
                next = %next,
                "\"next\" points back at a card we already have - stopping before we go in circles"
            );
            return Ok(WalkState::Done(StopReason::CycleDetected { identifier: next.to_string() }));
        }

        info!(next = %next, "[FINISHED] GOING TO CARD Card No.: {}", next.card_number(&self.base_url));
        Ok(WalkState::Scanning(next))
    }

    fn visit_key(&self, id: &PageId) -> String {
        match id.resolve(&self.base_url) {
            Ok(url) => match urlencoding::decode(url.as_str()) {
                Ok(decoded) => decoded.into_owned(),
                Err(_) => url.to_string(),
            },
            Err(_) => id.to_string(),
        }
    }
}
