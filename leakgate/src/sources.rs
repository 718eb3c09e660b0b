//! Serde models for the rule and suppression source formats.
//!
//! Both sources are ordered TOML documents. A rule document is a list of
//! `[[rules]]` records; a suppression document carries `[[allow]]` records
//! (literal or regex allowlist entries) and `[[baseline]]` records
//! (previously reviewed fingerprints with a justification).

use serde::Deserialize;

use crate::corpus::{Alphabet, Confidence};
use crate::error::ConfigError;

/// Top-level rule document.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RuleDocument {
    /// Ordered rule records.
    #[serde(default)]
    pub rules: Vec<RuleRecord>,
}

/// Which kind of detector a rule record declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// A compiled regular-expression signature.
    Regex,
    /// A statistical high-entropy run detector.
    Entropy,
}

/// One rule record.
///
/// Regex rules must carry `pattern`; entropy rules must carry `alphabet`,
/// `min_length` and `threshold`. Cross-field validation happens during
/// corpus load, not here, so a load failure can name the offending rule.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleRecord {
    /// Unique rule name (e.g., "aws-access-key-id").
    pub name: String,
    /// Detector kind.
    pub kind: RuleKind,
    /// Regular expression, for regex rules.
    #[serde(default)]
    pub pattern: Option<String>,
    /// Character class scanned for runs, for entropy rules.
    #[serde(default)]
    pub alphabet: Option<Alphabet>,
    /// Minimum run length, for entropy rules.
    #[serde(default)]
    pub min_length: Option<usize>,
    /// Shannon entropy threshold, for entropy rules.
    #[serde(default)]
    pub threshold: Option<f64>,
    /// Declared confidence for regex rules. Entropy rules compute
    /// confidence from how far a run clears the threshold and ignore this.
    #[serde(default = "default_rule_confidence")]
    pub confidence: Confidence,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

fn default_rule_confidence() -> Confidence {
    Confidence::Medium
}

/// Top-level suppression document.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SuppressionDocument {
    /// Ordered allowlist records.
    #[serde(default)]
    pub allow: Vec<AllowRecord>,
    /// Ordered baseline records.
    #[serde(default)]
    pub baseline: Vec<BaselineRecord>,
}

/// Kind of an allowlist record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllowKind {
    /// Exact string match against the matched fragment.
    Literal,
    /// Regex match against the matched fragment.
    Regex,
}

/// One allowlist record.
#[derive(Debug, Clone, Deserialize)]
pub struct AllowRecord {
    /// Literal or regex.
    pub kind: AllowKind,
    /// The literal string or regex pattern.
    pub value: String,
    /// Optional path glob restricting where the record applies.
    #[serde(default)]
    pub scope: Option<String>,
}

/// One baseline record: a previously reviewed, accepted fingerprint.
#[derive(Debug, Clone, Deserialize)]
pub struct BaselineRecord {
    /// Stable fingerprint of (detector, path, normalized match).
    pub fingerprint: String,
    /// Free-text justification recorded at review time.
    pub reason: String,
    /// Optional path glob restricting where the record applies.
    #[serde(default)]
    pub scope: Option<String>,
}

/// Parses a rule document, mapping parser diagnostics to [`ConfigError`].
pub fn parse_rule_document(text: &str, origin: &str) -> Result<RuleDocument, ConfigError> {
    toml::from_str(text).map_err(|e| ConfigError::Parse {
        path: origin.to_owned(),
        reason: e.to_string(),
    })
}

/// Parses a suppression document, mapping diagnostics to [`ConfigError`].
pub fn parse_suppression_document(
    text: &str,
    origin: &str,
) -> Result<SuppressionDocument, ConfigError> {
    toml::from_str(text).map_err(|e| ConfigError::Parse {
        path: origin.to_owned(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_regex_and_entropy_rules() {
        let doc = parse_rule_document(
            r#"
[[rules]]
name = "internal-token"
kind = "regex"
pattern = "INTERNAL_[A-Z0-9]{16}"
confidence = "high"
description = "Internal service token"

[[rules]]
name = "hex-blob"
kind = "entropy"
alphabet = "hex"
min_length = 24
threshold = 3.2
"#,
            "<inline>",
        )
        .unwrap_or_default();

        assert_eq!(doc.rules.len(), 2);
        assert_eq!(doc.rules[0].kind, RuleKind::Regex);
        assert_eq!(doc.rules[0].confidence, Confidence::High);
        assert_eq!(doc.rules[1].kind, RuleKind::Entropy);
        assert_eq!(doc.rules[1].alphabet, Some(Alphabet::Hex));
        // Declared confidence defaults to medium when omitted.
        assert_eq!(doc.rules[1].confidence, Confidence::Medium);
    }

    #[test]
    fn parses_suppression_document() {
        let doc = parse_suppression_document(
            r#"
[[allow]]
kind = "literal"
value = "EXAMPLE_KEY_DO_NOT_USE"

[[allow]]
kind = "regex"
value = "dummy_[a-z]+"
scope = "tests/**"

[[baseline]]
fingerprint = "deadbeef"
reason = "sample credential in docs"
"#,
            "<inline>",
        )
        .unwrap_or_default();

        assert_eq!(doc.allow.len(), 2);
        assert_eq!(doc.allow[0].kind, AllowKind::Literal);
        assert_eq!(doc.allow[1].scope.as_deref(), Some("tests/**"));
        assert_eq!(doc.baseline.len(), 1);
        assert_eq!(doc.baseline[0].reason, "sample credential in docs");
    }

    #[test]
    fn malformed_document_is_a_config_error() {
        let err = parse_rule_document("[[rules]]\nname = ", "<inline>");
        assert!(matches!(err, Err(ConfigError::Parse { .. })));
    }
}
