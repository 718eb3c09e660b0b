//! The fully resolved invocation contract consumed by the engine.
//!
//! Configuration discovery (config files, environment, CLI flags) is owned
//! by the caller; the engine only ever sees a [`ScanRequest`] in which every
//! field has a concrete value. Absence of a field at the caller's layer
//! means "use the default", never undefined behavior.

use std::path::PathBuf;
use std::time::Duration;

use crate::corpus::Confidence;

/// What the run scans: a source tree or a staged change set.
#[derive(Debug, Clone)]
pub enum ScanInput {
    /// Walk a directory tree rooted here.
    Tree(PathBuf),
    /// Scan the added lines of a unified diff.
    Diff(String),
}

impl ScanInput {
    /// Short description of the input for error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            ScanInput::Tree(root) => crate::utils::normalize_display_path(root),
            ScanInput::Diff(_) => "<diff>".to_owned(),
        }
    }
}

/// Where the rule corpus comes from.
#[derive(Debug, Clone, Default)]
pub enum RuleSource {
    /// Built-in detectors only.
    #[default]
    BuiltinOnly,
    /// An in-memory TOML document.
    Toml(String),
    /// A TOML file on disk.
    Path(PathBuf),
}

/// Where allowlist and baseline entries come from.
#[derive(Debug, Clone, Default)]
pub enum SuppressionSource {
    /// No allowlist, no baseline; inline markers still apply.
    #[default]
    None,
    /// An in-memory TOML document.
    Toml(String),
    /// A TOML file on disk.
    Path(PathBuf),
}

/// A fully resolved scan request.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    /// Tree root or diff content to scan.
    pub input: ScanInput,
    /// Include globs; empty means every walked file is eligible.
    pub include: Vec<String>,
    /// Exclude globs, applied after includes.
    pub exclude: Vec<String>,
    /// Rule corpus source.
    pub rules: RuleSource,
    /// Whether built-in detectors are merged into a user-supplied corpus.
    pub include_builtin: bool,
    /// Allowlist/baseline source.
    pub suppressions: SuppressionSource,
    /// Minimum confidence at which a surviving finding fails the run.
    pub min_confidence: Confidence,
    /// Worker count; `None` uses available parallelism.
    pub workers: Option<usize>,
    /// Overall run deadline; `None` means no timeout.
    pub timeout: Option<Duration>,
    /// Files larger than this many bytes are skipped before dispatch.
    pub max_file_size: u64,
    /// Inline suppression marker looked for on offending lines.
    pub marker: String,
}

fn default_max_file_size() -> u64 {
    5 * 1024 * 1024
}

fn default_marker() -> String {
    "pragma: no leakgate".to_owned()
}

impl Default for ScanRequest {
    fn default() -> Self {
        Self {
            input: ScanInput::Tree(PathBuf::from(".")),
            include: Vec::new(),
            exclude: Vec::new(),
            rules: RuleSource::default(),
            include_builtin: true,
            suppressions: SuppressionSource::default(),
            min_confidence: Confidence::High,
            workers: None,
            timeout: None,
            max_file_size: default_max_file_size(),
            marker: default_marker(),
        }
    }
}

impl ScanRequest {
    /// Request scanning a directory tree.
    #[must_use]
    pub fn tree(root: impl Into<PathBuf>) -> Self {
        Self {
            input: ScanInput::Tree(root.into()),
            ..Self::default()
        }
    }

    /// Request scanning the added lines of a unified diff.
    #[must_use]
    pub fn diff(diff_text: impl Into<String>) -> Self {
        Self {
            input: ScanInput::Diff(diff_text.into()),
            ..Self::default()
        }
    }

    /// Sets the rule corpus source.
    #[must_use]
    pub fn with_rules(mut self, rules: RuleSource) -> Self {
        self.rules = rules;
        self
    }

    /// Enables or disables the built-in detectors.
    #[must_use]
    pub fn with_builtin(mut self, include_builtin: bool) -> Self {
        self.include_builtin = include_builtin;
        self
    }

    /// Sets the allowlist/baseline source.
    #[must_use]
    pub fn with_suppressions(mut self, suppressions: SuppressionSource) -> Self {
        self.suppressions = suppressions;
        self
    }

    /// Sets the verdict threshold.
    #[must_use]
    pub fn with_min_confidence(mut self, min_confidence: Confidence) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// Sets include globs.
    #[must_use]
    pub fn with_include(mut self, include: Vec<String>) -> Self {
        self.include = include;
        self
    }

    /// Sets exclude globs.
    #[must_use]
    pub fn with_exclude(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }

    /// Sets the worker count.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Sets the run timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the per-file size ceiling in bytes.
    #[must_use]
    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }
}
