//! Non-navigating submission channel with optimistic display.
//!
//! A `Fetcher` remembers the intent of the submission currently in flight.
//! While it is pending, `resolve` returns that intent instead of the confirmed
//! value; once the submission settles the intent is dropped and the confirmed
//! value (re-read from the store) shows again.

use std::sync::atomic::{AtomicU64, Ordering};

/// Submission ids are unique across every fetcher in the process, so a
/// completion from a screen that has since been replaced can never match a
/// newer fetcher's pending submission.
static NEXT_SUBMISSION: AtomicU64 = AtomicU64::new(1);

/// Identifies one submission made through a fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubmissionId(u64);

impl SubmissionId {
    fn next() -> Self {
        SubmissionId(NEXT_SUBMISSION.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetcherState<T> {
    Idle,
    Pending { submission: SubmissionId, intent: T },
}

/// Outcome of settling a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// The settled submission was the pending one; the fetcher is idle again.
    Current,
    /// A newer submission replaced this one and is still pending.
    Superseded,
}

#[derive(Debug, Clone)]
pub struct Fetcher<T> {
    state: FetcherState<T>,
}

impl<T> Default for Fetcher<T> {
    fn default() -> Self {
        Self {
            state: FetcherState::Idle,
        }
    }
}

impl<T> Fetcher<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, FetcherState::Pending { .. })
    }

    pub fn pending(&self) -> Option<&T> {
        match &self.state {
            FetcherState::Pending { intent, .. } => Some(intent),
            FetcherState::Idle => None,
        }
    }

    /// Record a new in-flight submission. Any earlier pending submission is
    /// superseded; its eventual settlement no longer affects the display.
    pub fn submit(&mut self, intent: T) -> SubmissionId {
        let submission = SubmissionId::next();
        self.state = FetcherState::Pending { submission, intent };
        submission
    }

    /// Mark a submission as finished, successfully or not.
    pub fn settle(&mut self, submission: SubmissionId) -> Settlement {
        match &self.state {
            FetcherState::Pending { submission: current, .. } if *current == submission => {
                self.state = FetcherState::Idle;
                Settlement::Current
            }
            _ => Settlement::Superseded,
        }
    }

    /// The value to display: pending intent if any, else `confirmed`.
    pub fn resolve<'a>(&'a self, confirmed: &'a T) -> &'a T {
        self.pending().unwrap_or(confirmed)
    }

    /// Forget any pending submission, e.g. when the view switches records.
    pub fn reset(&mut self) {
        self.state = FetcherState::Idle;
    }
}
