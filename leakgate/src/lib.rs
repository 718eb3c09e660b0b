//! Secret and sensitive-data scanning engine.
//!
//! Runs a corpus of regex and entropy detectors over a source tree or the
//! added lines of a unified diff, applies inline markers, allowlists and
//! baseline fingerprints, and produces a deterministic pass/fail result
//! suitable for pre-commit gating.
//!
//! ```no_run
//! use leakgate::{run, CancelToken, ScanRequest, Verdict};
//!
//! # fn main() -> Result<(), leakgate::EngineError> {
//! let request = ScanRequest::tree("src");
//! let result = run(&request, &CancelToken::new())?;
//! if result.verdict == Verdict::Fail {
//!     for finding in &result.findings {
//!         eprintln!("{}:{} {}", finding.file, finding.line, finding.detector);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod collector;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod report;
pub mod request;
pub mod scanner;
pub mod sources;
pub mod suppress;
pub mod utils;

pub use collector::PathFilter;
pub use corpus::{builtin_detectors, Alphabet, Confidence, Detector, DetectorKind, RuleCorpus};
pub use engine::{run, CancelToken};
pub use error::{ConfigError, EngineError, SkipReason};
pub use report::{ConfidenceCounts, Finding, RunStatus, ScanResult, SkippedTarget, Verdict};
pub use request::{RuleSource, ScanInput, ScanRequest, SuppressionSource};
pub use scanner::{mask_fragment, shannon_entropy};
pub use suppress::SuppressionSet;
