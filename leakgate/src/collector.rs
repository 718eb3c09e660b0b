//! Input collection: enumerates scan targets from a tree or a diff.
//!
//! Exclusions (globs, size ceiling) are applied here, before targets reach
//! the workers, to bound wasted work. File content is materialized inside
//! the worker that owns the target, so enumeration never buffers content.

mod diff;

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::CancelToken;
use crate::error::{ConfigError, SkipReason};
use crate::request::ScanInput;

/// How a target entered the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetOrigin {
    /// A whole file from a tree walk.
    File,
    /// A contiguous run of added lines from a diff.
    DiffHunk,
}

/// One unit of scan work: a path plus the content to scan.
/// Immutable once created; owned exclusively by the worker processing it.
#[derive(Debug, Clone)]
pub struct ScanTarget {
    /// File the content belongs to.
    pub path: PathBuf,
    /// 1-based line number of the first content line within the file.
    pub start_line: usize,
    /// The text to scan.
    pub content: String,
    /// File or diff-hunk provenance.
    pub origin: TargetOrigin,
}

impl ScanTarget {
    /// The target's content split into lines, for line-addressed checks.
    #[must_use]
    pub fn lines(&self) -> Vec<&str> {
        self.content.lines().collect()
    }

    /// Text of an absolute 1-based file line, if this target covers it.
    #[must_use]
    pub fn line_text(&self, line: usize) -> Option<&str> {
        line.checked_sub(self.start_line)
            .and_then(|local| self.content.lines().nth(local))
    }
}

/// A not-yet-materialized target. Whole files stay as paths until a worker
/// picks them up; diff hunks already carry their content.
#[derive(Debug, Clone)]
pub(crate) enum TargetSpec {
    WholeFile {
        /// Path the worker reads from.
        path: PathBuf,
        /// Root-relative path used for reporting and scope matching.
        display: PathBuf,
    },
    Hunk {
        path: PathBuf,
        start_line: usize,
        content: String,
    },
}

impl TargetSpec {
    pub(crate) fn path(&self) -> &Path {
        match self {
            TargetSpec::WholeFile { display, .. } => display,
            TargetSpec::Hunk { path, .. } => path,
        }
    }
}

/// A target that was enumerated but will not be scanned.
#[derive(Debug, Clone)]
pub(crate) struct Skip {
    pub(crate) path: PathBuf,
    pub(crate) reason: SkipReason,
}

/// Everything collection produced.
#[derive(Debug, Default)]
pub(crate) struct Collected {
    pub(crate) specs: Vec<TargetSpec>,
    pub(crate) skipped: Vec<Skip>,
    /// Entries the walk or diff parse saw at all, before any filtering.
    /// Zero means the input itself was empty or unreadable, which is fatal.
    pub(crate) enumerated: usize,
}

/// Compiled include/exclude globs plus the size ceiling.
#[derive(Debug)]
pub struct PathFilter {
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
    max_file_size: u64,
}

impl PathFilter {
    /// Compiles the filter; any malformed glob is a fatal config error.
    pub fn new(
        include: &[String],
        exclude: &[String],
        max_file_size: u64,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            include: build_glob_set(include)?,
            exclude: build_glob_set(exclude)?,
            max_file_size,
        })
    }

    /// Whether a (root-relative) path is eligible for scanning.
    #[must_use]
    pub fn admits(&self, path: &Path) -> bool {
        if let Some(include) = &self.include {
            if !include.is_match(path) {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(path) {
                return false;
            }
        }
        true
    }

    pub(crate) fn max_file_size(&self) -> u64 {
        self.max_file_size
    }
}

fn build_glob_set(patterns: &[String]) -> Result<Option<GlobSet>, ConfigError> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| ConfigError::Glob {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map(Some).map_err(|e| ConfigError::Glob {
        pattern: patterns.join(", "),
        reason: e.to_string(),
    })
}

/// Enumerates targets for the given input. Collection observes the cancel
/// token between emitted targets; a cancelled collection returns whatever
/// was gathered so far.
pub(crate) fn collect(
    input: &ScanInput,
    filter: &PathFilter,
    cancel: &CancelToken,
) -> Collected {
    match input {
        ScanInput::Tree(root) => collect_tree(root, filter, cancel),
        ScanInput::Diff(text) => collect_diff(text, filter, cancel),
    }
}

fn collect_tree(root: &Path, filter: &PathFilter, cancel: &CancelToken) -> Collected {
    let mut collected = Collected::default();

    // Hidden files are prime secret territory (.env, .npmrc, .github/);
    // they must be walked. Gitignored files stay excluded: they cannot be
    // committed, and a gate scans what would land in the repository.
    let walk = WalkBuilder::new(root).hidden(false).build();
    for entry in walk {
        if cancel.is_cancelled() {
            break;
        }
        match entry {
            Ok(entry) => {
                if !entry.file_type().is_some_and(|t| t.is_file()) {
                    continue;
                }
                collected.enumerated += 1;
                let path = entry.path();
                let relative = path.strip_prefix(root).unwrap_or(path);
                if !filter.admits(relative) {
                    continue;
                }
                match entry.metadata() {
                    Ok(metadata) if metadata.len() > filter.max_file_size() => {
                        collected.skipped.push(Skip {
                            path: relative.to_path_buf(),
                            reason: SkipReason::TooLarge,
                        });
                    }
                    Ok(_) => collected.specs.push(TargetSpec::WholeFile {
                        path: path.to_path_buf(),
                        display: relative.to_path_buf(),
                    }),
                    Err(e) => collected.skipped.push(Skip {
                        path: relative.to_path_buf(),
                        reason: SkipReason::IoError(e.to_string()),
                    }),
                }
            }
            Err(e) => {
                collected.skipped.push(Skip {
                    path: root.to_path_buf(),
                    reason: SkipReason::IoError(e.to_string()),
                });
            }
        }
    }

    collected
}

fn collect_diff(text: &str, filter: &PathFilter, cancel: &CancelToken) -> Collected {
    let mut collected = Collected::default();
    let parsed = diff::added_hunks(text);
    collected.enumerated = parsed.files_seen;

    for hunk in parsed.hunks {
        if cancel.is_cancelled() {
            break;
        }
        if !filter.admits(&hunk.path) {
            continue;
        }
        collected.specs.push(TargetSpec::Hunk {
            path: hunk.path,
            start_line: hunk.start_line,
            content: hunk.content,
        });
    }

    collected
}

/// Materializes a spec into a scannable target. Whole files are read here,
/// in the owning worker: NUL sniff decides binary, then strict UTF-8
/// decoding; either failure skips the target without touching the run.
/// Targets and skips surface the root-relative display path.
pub(crate) fn materialize(spec: TargetSpec) -> Result<ScanTarget, Skip> {
    match spec {
        TargetSpec::WholeFile { path, display } => {
            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    return Err(Skip {
                        path: display,
                        reason: SkipReason::IoError(e.to_string()),
                    })
                }
            };
            if is_binary(&bytes) {
                return Err(Skip {
                    path: display,
                    reason: SkipReason::Binary,
                });
            }
            match String::from_utf8(bytes) {
                Ok(content) => Ok(ScanTarget {
                    path: display,
                    start_line: 1,
                    content,
                    origin: TargetOrigin::File,
                }),
                Err(_) => Err(Skip {
                    path: display,
                    reason: SkipReason::DecodeError,
                }),
            }
        }
        TargetSpec::Hunk {
            path,
            start_line,
            content,
        } => Ok(ScanTarget {
            path,
            start_line,
            content,
            origin: TargetOrigin::DiffHunk,
        }),
    }
}

const BINARY_SNIFF_WINDOW: usize = 8192;

fn is_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(BINARY_SNIFF_WINDOW).any(|&b| b == 0)
}
