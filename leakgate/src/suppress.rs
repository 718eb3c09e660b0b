//! Suppression engine: inline markers, allowlists, baseline fingerprints.
//!
//! Per-candidate evaluation order is fixed: (1) an inline marker on the
//! matched line suppresses unconditionally; (2) a literal/regex allowlist
//! hit on the matched fragment suppresses; (3) a baseline fingerprint hit
//! suppresses but is counted separately as "known", so reports can
//! distinguish "no secrets" from "secrets present but pre-approved".
//! Application never mutates a candidate and is idempotent.

use globset::{Glob, GlobMatcher};
use regex::Regex;
use std::fs;
use std::path::Path;

use crate::collector::ScanTarget;
use crate::error::ConfigError;
use crate::request::SuppressionSource;
use crate::scanner::Candidate;
use crate::sources::{parse_suppression_document, AllowKind, SuppressionDocument};

#[derive(Debug)]
enum AllowMatcher {
    Literal(String),
    Pattern(Regex),
}

#[derive(Debug)]
struct AllowRule {
    matcher: AllowMatcher,
    scope: Option<GlobMatcher>,
}

#[derive(Debug)]
struct BaselineRule {
    fingerprint: String,
    scope: Option<GlobMatcher>,
}

/// Loaded suppression state, read-only for the duration of a run.
#[derive(Debug)]
pub struct SuppressionSet {
    marker: String,
    allows: Vec<AllowRule>,
    baseline: Vec<BaselineRule>,
}

/// What an inline marker on a line asks for.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum InlineDirective {
    /// Bare marker: suppress every candidate on the line.
    All,
    /// `marker[rule-a,rule-b]`: suppress only the named detectors.
    Rules(Vec<String>),
}

/// Parses an inline suppression marker out of a source line.
pub(crate) fn inline_directive(line: &str, marker: &str) -> Option<InlineDirective> {
    let idx = line.find(marker)?;
    let rest = &line[idx + marker.len()..];
    if let Some(list) = rest.strip_prefix('[') {
        let names = list.split(']').next().unwrap_or("");
        let rules: Vec<String> = names
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
        if rules.is_empty() {
            Some(InlineDirective::All)
        } else {
            Some(InlineDirective::Rules(rules))
        }
    } else {
        Some(InlineDirective::All)
    }
}

/// The surviving candidates for one target plus suppression tallies.
#[derive(Debug, Default)]
pub struct TargetSuppression {
    /// Candidates that passed every check.
    pub kept: Vec<Candidate>,
    /// Suppressed by an inline marker.
    pub inline: usize,
    /// Suppressed by a literal/regex allowlist entry.
    pub allowlisted: usize,
    /// Suppressed by a baseline fingerprint ("known, suppressed").
    pub known: usize,
}

impl SuppressionSet {
    /// Loads and validates the suppression set; inline markers work even
    /// with an empty source.
    pub fn load(source: &SuppressionSource, marker: String) -> Result<Self, ConfigError> {
        let document = match source {
            SuppressionSource::None => SuppressionDocument::default(),
            SuppressionSource::Toml(text) => parse_suppression_document(text, "<inline>")?,
            SuppressionSource::Path(path) => {
                let text = fs::read_to_string(path).map_err(|source| ConfigError::Source {
                    path: path.clone(),
                    source,
                })?;
                parse_suppression_document(&text, &path.to_string_lossy())?
            }
        };
        Self::from_document(&document, marker)
    }

    fn from_document(document: &SuppressionDocument, marker: String) -> Result<Self, ConfigError> {
        let mut allows = Vec::with_capacity(document.allow.len());
        for record in &document.allow {
            let matcher = match record.kind {
                AllowKind::Literal => AllowMatcher::Literal(record.value.trim().to_owned()),
                AllowKind::Regex => {
                    let compiled =
                        Regex::new(&record.value).map_err(|e| ConfigError::Suppression {
                            reason: format!("allow pattern `{}` does not compile: {e}", record.value),
                        })?;
                    AllowMatcher::Pattern(compiled)
                }
            };
            allows.push(AllowRule {
                matcher,
                scope: compile_scope(record.scope.as_deref())?,
            });
        }

        let mut baseline = Vec::with_capacity(document.baseline.len());
        for record in &document.baseline {
            if record.fingerprint.trim().is_empty() {
                return Err(ConfigError::Suppression {
                    reason: "baseline entry has an empty fingerprint".to_owned(),
                });
            }
            baseline.push(BaselineRule {
                fingerprint: record.fingerprint.trim().to_owned(),
                scope: compile_scope(record.scope.as_deref())?,
            });
        }

        Ok(Self {
            marker,
            allows,
            baseline,
        })
    }

    /// Filters one target's candidates. Pure: the same input always
    /// produces the same partition, and reapplying changes nothing.
    pub(crate) fn apply(
        &self,
        candidates: Vec<Candidate>,
        target: &ScanTarget,
    ) -> TargetSuppression {
        let lines = target.lines();
        let mut result = TargetSuppression::default();

        for candidate in candidates {
            let line_text = candidate
                .line
                .checked_sub(target.start_line)
                .and_then(|local| lines.get(local).copied())
                .unwrap_or("");

            if self.inline_hit(line_text, &candidate) {
                result.inline += 1;
                continue;
            }
            if self.allow_hit(&candidate) {
                result.allowlisted += 1;
                continue;
            }
            if self.baseline_hit(&candidate) {
                result.known += 1;
                continue;
            }
            result.kept.push(candidate);
        }

        result
    }

    fn inline_hit(&self, line_text: &str, candidate: &Candidate) -> bool {
        match inline_directive(line_text, &self.marker) {
            Some(InlineDirective::All) => true,
            Some(InlineDirective::Rules(rules)) => rules.iter().any(|r| *r == candidate.detector),
            None => false,
        }
    }

    fn allow_hit(&self, candidate: &Candidate) -> bool {
        let raw = candidate.raw_fragment.trim();
        self.allows.iter().any(|rule| {
            scope_admits(rule.scope.as_ref(), &candidate.file)
                && match &rule.matcher {
                    AllowMatcher::Literal(value) => value == raw,
                    AllowMatcher::Pattern(re) => re.is_match(raw),
                }
        })
    }

    fn baseline_hit(&self, candidate: &Candidate) -> bool {
        self.baseline.iter().any(|rule| {
            rule.fingerprint == candidate.fingerprint
                && scope_admits(rule.scope.as_ref(), &candidate.file)
        })
    }
}

fn compile_scope(scope: Option<&str>) -> Result<Option<GlobMatcher>, ConfigError> {
    match scope {
        None => Ok(None),
        Some(pattern) => Glob::new(pattern)
            .map(|g| Some(g.compile_matcher()))
            .map_err(|e| ConfigError::Glob {
                pattern: pattern.to_owned(),
                reason: e.to_string(),
            }),
    }
}

fn scope_admits(scope: Option<&GlobMatcher>, file: &str) -> bool {
    scope.is_none_or(|matcher| matcher.is_match(Path::new(file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{ScanTarget, TargetOrigin};
    use crate::corpus::Confidence;
    use crate::scanner::fingerprint;
    use std::path::PathBuf;

    const MARKER: &str = "pragma: no leakgate";

    fn candidate(detector: &str, file: &str, line: usize, raw: &str) -> Candidate {
        Candidate {
            detector: detector.to_owned(),
            file: file.to_owned(),
            line,
            column: 1,
            fragment: crate::scanner::mask_fragment(raw),
            confidence: Confidence::High,
            entropy: None,
            fingerprint: fingerprint(detector, file, raw),
            raw_fragment: raw.to_owned(),
        }
    }

    fn target(content: &str) -> ScanTarget {
        ScanTarget {
            path: PathBuf::from("src/app.py"),
            start_line: 1,
            content: content.to_owned(),
            origin: TargetOrigin::File,
        }
    }

    fn empty_set() -> SuppressionSet {
        match SuppressionSet::load(&SuppressionSource::None, MARKER.to_owned()) {
            Ok(s) => s,
            Err(e) => panic!("empty set must load: {e}"),
        }
    }

    fn toml_set(text: &str) -> SuppressionSet {
        match SuppressionSet::load(&SuppressionSource::Toml(text.to_owned()), MARKER.to_owned()) {
            Ok(s) => s,
            Err(e) => panic!("suppression source must load: {e}"),
        }
    }

    #[test]
    fn inline_marker_suppresses_unconditionally() {
        let set = empty_set();
        let target = target("key = \"AKIAABCDEFGHIJKL1234\"  # pragma: no leakgate\n");
        let result = set.apply(
            vec![candidate("aws-key", "src/app.py", 1, "AKIAABCDEFGHIJKL1234")],
            &target,
        );
        assert!(result.kept.is_empty());
        assert_eq!(result.inline, 1);
        assert_eq!(result.known, 0);
    }

    #[test]
    fn rule_scoped_marker_only_hits_named_detectors() {
        let set = empty_set();
        let target = target("key = \"AKIAABCDEFGHIJKL1234\"  # pragma: no leakgate[other-rule]\n");
        let result = set.apply(
            vec![candidate("aws-key", "src/app.py", 1, "AKIAABCDEFGHIJKL1234")],
            &target,
        );
        assert_eq!(result.kept.len(), 1);
        assert_eq!(result.inline, 0);
    }

    #[test]
    fn literal_allowlist_matches_raw_fragment_not_mask() {
        let set = toml_set(
            r#"
[[allow]]
kind = "literal"
value = "AKIAABCDEFGHIJKL1234"
"#,
        );
        let target = target("key = \"AKIAABCDEFGHIJKL1234\"\n");
        let result = set.apply(
            vec![candidate("aws-key", "src/app.py", 1, "AKIAABCDEFGHIJKL1234")],
            &target,
        );
        assert!(result.kept.is_empty());
        assert_eq!(result.allowlisted, 1);
    }

    #[test]
    fn regex_allowlist_matches_fragment() {
        let set = toml_set(
            r#"
[[allow]]
kind = "regex"
value = "^dummy_"
"#,
        );
        let target = target("t = \"dummy_abcdefgh12345678\"\n");
        let result = set.apply(
            vec![candidate("generic", "src/app.py", 1, "dummy_abcdefgh12345678")],
            &target,
        );
        assert_eq!(result.allowlisted, 1);
    }

    #[test]
    fn scoped_allow_only_applies_inside_its_glob() {
        let set = toml_set(
            r#"
[[allow]]
kind = "literal"
value = "AKIAABCDEFGHIJKL1234"
scope = "tests/**"
"#,
        );
        let target = target("key = \"AKIAABCDEFGHIJKL1234\"\n");
        let result = set.apply(
            vec![candidate("aws-key", "src/app.py", 1, "AKIAABCDEFGHIJKL1234")],
            &target,
        );
        assert_eq!(result.kept.len(), 1, "scope tests/** must not cover src/");
    }

    #[test]
    fn baseline_hit_is_counted_as_known() {
        let fp = fingerprint("aws-key", "src/app.py", "AKIAABCDEFGHIJKL1234");
        let set = toml_set(&format!(
            r#"
[[baseline]]
fingerprint = "{fp}"
reason = "legacy credential, rotation tracked in SEC-482"
"#
        ));
        let target = target("key = \"AKIAABCDEFGHIJKL1234\"\n");
        let result = set.apply(
            vec![candidate("aws-key", "src/app.py", 1, "AKIAABCDEFGHIJKL1234")],
            &target,
        );
        assert!(result.kept.is_empty());
        assert_eq!(result.known, 1);
        assert_eq!(result.allowlisted, 0);
    }

    #[test]
    fn inline_marker_wins_over_allowlist_in_tallies() {
        let set = toml_set(
            r#"
[[allow]]
kind = "literal"
value = "AKIAABCDEFGHIJKL1234"
"#,
        );
        let target = target("key = \"AKIAABCDEFGHIJKL1234\"  # pragma: no leakgate\n");
        let result = set.apply(
            vec![candidate("aws-key", "src/app.py", 1, "AKIAABCDEFGHIJKL1234")],
            &target,
        );
        assert_eq!(result.inline, 1);
        assert_eq!(result.allowlisted, 0);
    }

    #[test]
    fn application_is_idempotent() {
        let set = toml_set(
            r#"
[[allow]]
kind = "regex"
value = "^dummy_"
"#,
        );
        let target = target("a = \"dummy_x1\"\nb = \"AKIAABCDEFGHIJKL1234\"\n");
        let candidates = vec![
            candidate("generic", "src/app.py", 1, "dummy_x1"),
            candidate("aws-key", "src/app.py", 2, "AKIAABCDEFGHIJKL1234"),
        ];
        let first = set.apply(candidates, &target);
        let survivors: Vec<Candidate> = first.kept.clone();
        let second = set.apply(survivors, &target);
        assert_eq!(second.kept.len(), first.kept.len());
        assert_eq!(second.allowlisted, 0);
        assert_eq!(
            second.kept.first().map(|c| c.detector.as_str()),
            Some("aws-key")
        );
    }

    #[test]
    fn invalid_allow_regex_is_fatal() {
        let err = SuppressionSet::load(
            &SuppressionSource::Toml(
                "[[allow]]\nkind = \"regex\"\nvalue = \"unclosed[\"\n".to_owned(),
            ),
            MARKER.to_owned(),
        );
        assert!(matches!(err, Err(ConfigError::Suppression { .. })));
    }

    #[test]
    fn inline_directive_parsing() {
        assert_eq!(
            inline_directive("x  # pragma: no leakgate", MARKER),
            Some(InlineDirective::All)
        );
        assert_eq!(
            inline_directive("x  # pragma: no leakgate[a, b]", MARKER),
            Some(InlineDirective::Rules(vec!["a".to_owned(), "b".to_owned()]))
        );
        assert_eq!(inline_directive("plain line", MARKER), None);
    }
}
