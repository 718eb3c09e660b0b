//! Small shared helpers: line/column mapping and path display.

/// A utility struct to convert byte offsets to line and column numbers.
///
/// Detectors work with byte offsets into the target content, but findings
/// are reported with 1-based line and column numbers which are more
/// human-readable and stable across reruns.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Stores the byte index of the start of each line.
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Creates a new `LineIndex` by scanning the content for newlines.
    /// Uses byte iteration since '\n' is always a single byte in UTF-8.
    #[must_use]
    pub fn new(content: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, byte) in content.as_bytes().iter().enumerate() {
            if *byte == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// Converts a byte offset to a 1-based line number.
    #[must_use]
    pub fn line_of(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line + 1,
            Err(line) => line,
        }
    }

    /// Converts a byte offset within `content` to a 1-based (line, column)
    /// pair. The column counts characters, not bytes, so multi-byte text
    /// before the match does not shift reported positions.
    #[must_use]
    pub fn position_of(&self, content: &str, offset: usize) -> (usize, usize) {
        let line = self.line_of(offset);
        let line_start = self.line_starts[line - 1];
        let column = content[line_start..offset].chars().count() + 1;
        (line, column)
    }
}

/// Normalizes a path for reporting.
///
/// - Converts backslashes to forward slashes (for cross-platform consistency)
/// - Strips a leading "./" or ".\" prefix (for cleaner output)
///
/// Reports must be byte-identical across runs and diffable across
/// platforms, so every path leaves the engine through this function.
#[must_use]
pub fn normalize_display_path(path: &std::path::Path) -> String {
    let s = path.to_string_lossy();
    let normalized = s.replace('\\', "/");
    normalized
        .strip_prefix("./")
        .unwrap_or(&normalized)
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn line_index_maps_offsets() {
        let content = "first\nsecond\nthird";
        let index = LineIndex::new(content);
        assert_eq!(index.line_of(0), 1);
        assert_eq!(index.line_of(5), 1);
        assert_eq!(index.line_of(6), 2);
        assert_eq!(index.line_of(13), 3);
    }

    #[test]
    fn position_counts_characters_not_bytes() {
        let content = "héllo = secret";
        let index = LineIndex::new(content);
        let offset = content.find("secret").unwrap_or(0);
        let (line, column) = index.position_of(content, offset);
        assert_eq!(line, 1);
        assert_eq!(column, 9);
    }

    #[test]
    fn display_path_is_normalized() {
        assert_eq!(
            normalize_display_path(Path::new("./src/config.py")),
            "src/config.py"
        );
        assert_eq!(
            normalize_display_path(Path::new(".\\src\\config.py")),
            "src/config.py"
        );
    }
}
