//! The rule corpus: compiled detectors shared read-only across workers.
//!
//! A corpus load is all-or-nothing. Silently running with fewer rules than
//! configured would produce misleading "all clear" results, so the first
//! malformed rule aborts the whole load with the rule's name and reason.

mod builtin;

pub use builtin::builtin_detectors;

use regex::Regex;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fs;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::request::RuleSource;
use crate::sources::{parse_rule_document, RuleKind, RuleRecord};

/// Strength of a detector or finding, ordered weakest to strongest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Weak statistical signal.
    Low,
    /// Plausible secret; worth a look.
    Medium,
    /// Strong signature match.
    High,
    /// Known-format live credential.
    Critical,
}

impl FromStr for Confidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Confidence::Low),
            "medium" => Ok(Confidence::Medium),
            "high" => Ok(Confidence::High),
            "critical" => Ok(Confidence::Critical),
            other => Err(format!(
                "unknown confidence `{other}` (expected low, medium, high or critical)"
            )),
        }
    }
}

/// Character class scanned by an entropy detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alphabet {
    /// `0-9 a-f A-F`.
    Hex,
    /// `A-Z a-z 0-9 + / =` (standard base64 with padding).
    Base64,
}

impl Alphabet {
    /// Whether `c` belongs to the alphabet.
    #[must_use]
    pub fn contains(self, c: char) -> bool {
        match self {
            Alphabet::Hex => c.is_ascii_hexdigit(),
            Alphabet::Base64 => {
                c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '='
            }
        }
    }

    /// Maximum possible Shannon entropy (bits per character) for the
    /// alphabet; the upper bound for a valid threshold.
    #[must_use]
    pub fn max_entropy(self) -> f64 {
        match self {
            Alphabet::Hex => 4.0,
            Alphabet::Base64 => 6.0,
        }
    }
}

/// Parameters of an entropy detector.
#[derive(Debug, Clone)]
pub struct EntropyParams {
    /// Character class scanned for maximal runs.
    pub alphabet: Alphabet,
    /// Minimum qualifying run length, in characters.
    pub min_length: usize,
    /// Minimum qualifying Shannon entropy.
    pub threshold: f64,
}

/// Detector kinds form a closed set; the engine never dispatches through
/// trait objects for them.
#[derive(Debug, Clone)]
pub enum DetectorKind {
    /// Compiled regular-expression signature.
    Regex(Regex),
    /// High-entropy run detector.
    Entropy(EntropyParams),
}

/// A named, compiled rule.
#[derive(Debug, Clone)]
pub struct Detector {
    /// Unique name across the corpus.
    pub name: String,
    /// Compiled detector kind.
    pub kind: DetectorKind,
    /// Declared confidence. Entropy detectors compute per-run confidence
    /// instead and only fall back to this for documentation purposes.
    pub confidence: Confidence,
    /// Human-readable description.
    pub description: String,
}

/// Immutable, concurrently readable set of detectors.
#[derive(Debug, Clone)]
pub struct RuleCorpus {
    detectors: Vec<Detector>,
}

impl RuleCorpus {
    /// Loads and validates the corpus from `source`, optionally merging
    /// the built-in detectors in front of user rules.
    pub fn load(source: &RuleSource, include_builtin: bool) -> Result<Self, ConfigError> {
        let mut detectors: Vec<Detector> = Vec::new();
        if include_builtin {
            detectors.extend(builtin_detectors().iter().cloned());
        }

        match source {
            RuleSource::BuiltinOnly => {}
            RuleSource::Toml(text) => {
                let doc = parse_rule_document(text, "<inline>")?;
                for record in &doc.rules {
                    detectors.push(compile_record(record)?);
                }
            }
            RuleSource::Path(path) => {
                let text = fs::read_to_string(path).map_err(|source| ConfigError::Source {
                    path: path.clone(),
                    source,
                })?;
                let doc = parse_rule_document(&text, &path.to_string_lossy())?;
                for record in &doc.rules {
                    detectors.push(compile_record(record)?);
                }
            }
        }

        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for detector in &detectors {
            if !seen.insert(detector.name.as_str()) {
                return Err(ConfigError::Rule {
                    name: detector.name.clone(),
                    reason: "duplicate rule name".to_owned(),
                });
            }
        }

        Ok(Self { detectors })
    }

    /// The compiled detectors, in load order.
    #[must_use]
    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }

    /// Number of detectors in the corpus.
    #[must_use]
    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    /// Whether the corpus holds no detectors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }
}

fn compile_record(record: &RuleRecord) -> Result<Detector, ConfigError> {
    if record.name.trim().is_empty() {
        return Err(ConfigError::Rule {
            name: "<unnamed>".to_owned(),
            reason: "rule name must not be empty".to_owned(),
        });
    }

    let kind = match record.kind {
        RuleKind::Regex => {
            let pattern = record.pattern.as_deref().ok_or_else(|| ConfigError::Rule {
                name: record.name.clone(),
                reason: "regex rule is missing `pattern`".to_owned(),
            })?;
            let compiled = Regex::new(pattern).map_err(|e| ConfigError::Rule {
                name: record.name.clone(),
                reason: format!("pattern does not compile: {e}"),
            })?;
            DetectorKind::Regex(compiled)
        }
        RuleKind::Entropy => {
            let alphabet = record.alphabet.ok_or_else(|| ConfigError::Rule {
                name: record.name.clone(),
                reason: "entropy rule is missing `alphabet`".to_owned(),
            })?;
            let min_length = record.min_length.ok_or_else(|| ConfigError::Rule {
                name: record.name.clone(),
                reason: "entropy rule is missing `min_length`".to_owned(),
            })?;
            if min_length == 0 {
                return Err(ConfigError::Rule {
                    name: record.name.clone(),
                    reason: "`min_length` must be at least 1".to_owned(),
                });
            }
            let threshold = record.threshold.ok_or_else(|| ConfigError::Rule {
                name: record.name.clone(),
                reason: "entropy rule is missing `threshold`".to_owned(),
            })?;
            if threshold <= 0.0 || threshold > alphabet.max_entropy() {
                return Err(ConfigError::Rule {
                    name: record.name.clone(),
                    reason: format!(
                        "`threshold` must be in (0, {}] for this alphabet, got {threshold}",
                        alphabet.max_entropy()
                    ),
                });
            }
            DetectorKind::Entropy(EntropyParams {
                alphabet,
                min_length,
                threshold,
            })
        }
    };

    Ok(Detector {
        name: record.name.clone(),
        kind,
        confidence: record.confidence,
        description: record.description.clone(),
    })
}
