//! Shannon entropy over maximal alphabet runs.

use rustc_hash::FxHashMap;

use crate::corpus::EntropyParams;

/// Calculates Shannon entropy of a string over its observed character
/// distribution. Returns 0.0 for the empty string.
///
/// Typical values for base64-class text:
/// - English words: ~3.5-4.5
/// - Random alphanumeric: ~5.5-6.0
/// - API keys/secrets: ~4.5-6.0
#[must_use]
pub fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut char_counts: FxHashMap<char, usize> = FxHashMap::default();
    let mut len = 0usize;
    for c in s.chars() {
        *char_counts.entry(c).or_insert(0) += 1;
        len += 1;
    }
    let len = len as f64;

    char_counts
        .values()
        .map(|&count| {
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// A maximal alphabet run that cleared the detector's length and entropy
/// bars. `start` is the byte offset of the run within the scanned content.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Run<'a> {
    pub(crate) start: usize,
    pub(crate) text: &'a str,
    pub(crate) entropy: f64,
}

/// Finds every maximal run of the configured alphabet and keeps those at
/// or above the minimum length and entropy threshold. Maximal runs cannot
/// overlap, so no sub-run is ever double-counted.
pub(crate) fn qualifying_runs<'a>(content: &'a str, params: &EntropyParams) -> Vec<Run<'a>> {
    let mut runs = Vec::new();
    let mut run_start: Option<usize> = None;
    let mut run_chars = 0usize;

    let close_run = |start: Option<usize>, end: usize, chars: usize, runs: &mut Vec<Run<'a>>| {
        if let Some(start) = start {
            if chars >= params.min_length {
                let text = &content[start..end];
                let entropy = shannon_entropy(text);
                if entropy >= params.threshold {
                    runs.push(Run {
                        start,
                        text,
                        entropy,
                    });
                }
            }
        }
    };

    for (offset, c) in content.char_indices() {
        if params.alphabet.contains(c) {
            if run_start.is_none() {
                run_start = Some(offset);
                run_chars = 0;
            }
            run_chars += 1;
        } else {
            close_run(run_start.take(), offset, run_chars, &mut runs);
        }
    }
    close_run(run_start.take(), content.len(), run_chars, &mut runs);

    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Alphabet;

    fn hex_params(min_length: usize, threshold: f64) -> EntropyParams {
        EntropyParams {
            alphabet: Alphabet::Hex,
            min_length,
            threshold,
        }
    }

    #[test]
    fn entropy_of_degenerate_strings() {
        assert_eq!(shannon_entropy(""), 0.0);
        assert_eq!(shannon_entropy("a"), 0.0);
        assert_eq!(shannon_entropy("aaaa"), 0.0);
    }

    #[test]
    fn entropy_of_two_symbols() {
        let entropy = shannon_entropy("abab");
        assert!((entropy - 1.0).abs() < 1e-9, "entropy: {entropy}");
    }

    #[test]
    fn random_looking_text_scores_high() {
        let entropy = shannon_entropy("aB3xK9pQ2mL7nR4wE6yT");
        assert!(entropy > 4.0, "entropy: {entropy}");
    }

    #[test]
    fn identifier_like_text_scores_low() {
        let entropy = shannon_entropy("user_password_value");
        assert!(entropy < 4.0, "entropy: {entropy}");
    }

    #[test]
    fn one_candidate_per_maximal_run() {
        let content = "x 0123456789abcdef0123456789abcdef y 0123456789abcdef0123456789abcdef";
        let runs = qualifying_runs(content, &hex_params(20, 3.0));
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].text.len(), 32);
        assert_eq!(runs[1].text.len(), 32);
        assert_ne!(runs[0].start, runs[1].start);
    }

    #[test]
    fn runs_below_minimum_length_are_ignored() {
        let content = "deadbeef cafebabe";
        let runs = qualifying_runs(content, &hex_params(20, 3.0));
        assert!(runs.is_empty());
    }

    #[test]
    fn uniform_runs_fall_below_threshold() {
        let content = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
        let runs = qualifying_runs(content, &hex_params(20, 3.0));
        assert!(runs.is_empty());
    }

    #[test]
    fn run_at_end_of_content_is_closed() {
        let content = "token = 0123456789abcdef01234567";
        let runs = qualifying_runs(content, &hex_params(20, 3.0));
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].start, 8);
    }
}
