//! Error taxonomy for the scanning engine.
//!
//! Anything that originates from a single target stays at that target and
//! surfaces only as a [`SkipReason`] entry in the result. Corpus and
//! suppression loading problems are fatal and abort before any scanning.
//! Cancellation is not an error at all; it is a run status.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal configuration problems: malformed rules, suppression entries,
/// unreadable sources, bad glob patterns.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A rule failed validation. The whole corpus load aborts; a partial
    /// corpus would silently produce misleading "all clear" results.
    #[error("invalid rule `{name}`: {reason}")]
    Rule {
        /// Name of the offending rule.
        name: String,
        /// Why the rule was rejected.
        reason: String,
    },

    /// A suppression entry failed validation.
    #[error("invalid suppression entry: {reason}")]
    Suppression {
        /// Why the entry was rejected.
        reason: String,
    },

    /// A rule or suppression source file could not be read.
    #[error("cannot read `{path}`: {source}")]
    Source {
        /// Path of the unreadable source.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A rule or suppression source did not parse as TOML.
    #[error("malformed source `{path}`: {reason}")]
    Parse {
        /// Display path of the source ("<inline>" for in-memory sources).
        path: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// An include/exclude or scope glob did not compile.
    #[error("invalid glob pattern `{pattern}`: {reason}")]
    Glob {
        /// The offending pattern.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Fatal engine-level failures.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration failed to load; nothing was scanned.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The input set produced zero usable targets.
    #[error("no scannable targets under `{root}`")]
    NoTargets {
        /// The declared root or diff reference.
        root: String,
    },

    /// Engine invariant violation. Indicates a bug, not bad input.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Why a single target was skipped instead of scanned.
///
/// Skips are terminal for their target only and never block a pass verdict.
/// No retries: re-reading the same unreadable file is not expected to succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Content sniffed as binary (NUL byte in the leading window).
    Binary,
    /// Content was not valid UTF-8 text.
    DecodeError,
    /// The file exceeded the configured size ceiling.
    TooLarge,
    /// The target could not be read.
    IoError(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Binary => write!(f, "binary"),
            SkipReason::DecodeError => write!(f, "decode error"),
            SkipReason::TooLarge => write!(f, "too large"),
            SkipReason::IoError(msg) => write!(f, "io error: {msg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_reason_display_is_stable() {
        assert_eq!(SkipReason::Binary.to_string(), "binary");
        assert_eq!(SkipReason::DecodeError.to_string(), "decode error");
        assert_eq!(SkipReason::TooLarge.to_string(), "too large");
        assert_eq!(
            SkipReason::IoError("denied".to_owned()).to_string(),
            "io error: denied"
        );
    }

    #[test]
    fn config_error_names_the_offending_rule() {
        let err = ConfigError::Rule {
            name: "aws-access-key-id".to_owned(),
            reason: "unclosed group".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("aws-access-key-id"));
        assert!(msg.contains("unclosed group"));
    }
}
