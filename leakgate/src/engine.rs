//! Run orchestration: config load, collection, the worker pool, and the
//! single aggregation point.
//!
//! Workers observe cancellation and the run deadline at target boundaries
//! only; a target that has started scanning finishes. Results produced
//! before the stop are kept, so a cancelled run still reports everything
//! it confirmed.

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crate::collector::{self, PathFilter, Skip, TargetSpec};
use crate::corpus::RuleCorpus;
use crate::error::EngineError;
use crate::report::{self, RunStatus, RunTallies, ScanResult};
use crate::request::{ScanInput, ScanRequest};
use crate::scanner::{scan_target, Candidate};
use crate::suppress::SuppressionSet;

/// Shared cancellation flag. Cloning is cheap; every clone observes the
/// same flag. Cancellation is one-way and idempotent.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// A fresh, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a stop at the next target boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether a stop has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

enum Outcome {
    Scanned {
        kept: Vec<Candidate>,
        suppressed: usize,
        known: usize,
    },
    Skipped(Skip),
    Cancelled,
}

/// Executes one scan request to completion (or cancellation).
///
/// Configuration problems abort before any scanning. An input that
/// enumerates zero entries is fatal: a gate that silently scanned nothing
/// would pass everything.
pub fn run(request: &ScanRequest, cancel: &CancelToken) -> Result<ScanResult, EngineError> {
    let corpus = RuleCorpus::load(&request.rules, request.include_builtin)?;
    let suppressions = SuppressionSet::load(&request.suppressions, request.marker.clone())?;
    let filter = PathFilter::new(&request.include, &request.exclude, request.max_file_size)?;

    let deadline = request.timeout.map(|t| Instant::now() + t);

    let collected = collector::collect(&request.input, &filter, cancel);
    // Tree mode: a walk whose every file was filtered out or unreadable
    // left nothing to gate, and passing it would mean passing blind. Diff
    // mode: a deletion-only change set enumerates files but adds nothing,
    // which is a legitimate empty change, so only a diff that references
    // no files at all is fatal.
    let no_usable_targets = match &request.input {
        ScanInput::Tree(_) => collected.specs.is_empty() && collected.skipped.is_empty(),
        ScanInput::Diff(_) => collected.enumerated == 0,
    };
    if no_usable_targets && !cancel.is_cancelled() {
        return Err(EngineError::NoTargets {
            root: request.input.describe(),
        });
    }

    let workers = request.workers.unwrap_or_else(|| {
        thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
    });
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .map_err(|e| EngineError::Internal(format!("worker pool construction failed: {e}")))?;

    let outcomes: Vec<Outcome> = pool.install(|| {
        collected
            .specs
            .into_par_iter()
            .map(|spec| process(spec, &corpus, &suppressions, cancel, deadline))
            .collect()
    });

    let mut candidates = Vec::new();
    let mut skipped = collected.skipped;
    let mut tallies = RunTallies::default();
    for outcome in outcomes {
        match outcome {
            Outcome::Scanned {
                kept,
                suppressed,
                known,
            } => {
                tallies.scanned += 1;
                tallies.suppressed += suppressed;
                tallies.known_suppressed += known;
                candidates.extend(kept);
            }
            Outcome::Skipped(skip) => skipped.push(skip),
            Outcome::Cancelled => {}
        }
    }

    let status = if cancel.is_cancelled() {
        RunStatus::Cancelled
    } else {
        RunStatus::Completed
    };
    report::aggregate(candidates, skipped, tallies, request.min_confidence, status)
}

fn process(
    spec: TargetSpec,
    corpus: &RuleCorpus,
    suppressions: &SuppressionSet,
    cancel: &CancelToken,
    deadline: Option<Instant>,
) -> Outcome {
    if deadline.is_some_and(|d| Instant::now() >= d) {
        cancel.cancel();
    }
    if cancel.is_cancelled() {
        return Outcome::Cancelled;
    }

    let target = match collector::materialize(spec) {
        Ok(target) => target,
        Err(skip) => return Outcome::Skipped(skip),
    };

    let candidates = scan_target(&target, corpus);
    let result = suppressions.apply(candidates, &target);
    Outcome::Scanned {
        kept: result.kept,
        suppressed: result.inline + result.allowlisted,
        known: result.known,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_clones_share_the_flag() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn cancellation_is_idempotent() {
        let token = CancelToken::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }
}
