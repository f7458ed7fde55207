//! Line reconstruction from positioned words.
//!
//! Report renderers hand us words with page coordinates, not lines. Words are
//! clustered into lines by baseline, lines are ordered top to bottom, and
//! words inside a line left to right.

use serde::{Deserialize, Serialize};

/// Default baseline tolerance, in page coordinate units.
pub const DEFAULT_BASELINE_TOLERANCE: f64 = 1.0;

/// A word with its page-relative position.
///
/// Field names match the word dumps produced by the page renderer, so a
/// sidecar file deserializes straight into `Vec<Word>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    /// Horizontal start.
    pub x0: f64,
    /// Horizontal end.
    pub x1: f64,
    /// Vertical baseline (grows downward).
    pub top: f64,
}

impl Word {
    pub fn new(text: impl Into<String>, x0: f64, x1: f64, top: f64) -> Self {
        Self {
            text: text.into(),
            x0,
            x1,
            top,
        }
    }
}

/// Words sharing one approximate baseline, sorted by horizontal start.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructedLine {
    /// Baseline of the first (topmost) word that opened the line.
    pub baseline: f64,
    pub words: Vec<Word>,
}

impl ReconstructedLine {
    fn open(word: &Word) -> Self {
        Self {
            baseline: word.top,
            words: vec![word.clone()],
        }
    }

    /// Word texts joined by single spaces.
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Reconstructed lines of one page.
///
/// Iterating borrows the lines, so the sequence can be walked any number of
/// times.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLines {
    lines: Vec<ReconstructedLine>,
}

impl PageLines {
    pub fn iter(&self) -> std::slice::Iter<'_, ReconstructedLine> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Line texts joined with newlines.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(ReconstructedLine::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<'a> IntoIterator for &'a PageLines {
    type Item = &'a ReconstructedLine;
    type IntoIter = std::slice::Iter<'a, ReconstructedLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

/// Groups positioned words into lines.
#[derive(Debug, Clone, Copy)]
pub struct LineReconstructor {
    tolerance: f64,
}

impl Default for LineReconstructor {
    fn default() -> Self {
        Self::new(DEFAULT_BASELINE_TOLERANCE)
    }
}

impl LineReconstructor {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Cluster `words` into lines.
    ///
    /// A word joins the open line while its baseline is less than one
    /// tolerance unit below the baseline that opened it. Anchoring on the
    /// opening word keeps a slow drift of per-glyph jitter from chaining two
    /// printed rows together.
    pub fn reconstruct(&self, words: &[Word]) -> PageLines {
        let mut sorted: Vec<&Word> = words.iter().filter(|w| !w.text.trim().is_empty()).collect();
        sorted.sort_by(|a, b| a.top.total_cmp(&b.top).then(a.x0.total_cmp(&b.x0)));

        let mut lines: Vec<ReconstructedLine> = Vec::new();
        let mut current: Option<ReconstructedLine> = None;

        for word in sorted {
            let joins = current
                .as_ref()
                .map_or(false, |line| word.top - line.baseline < self.tolerance);
            if joins {
                if let Some(line) = current.as_mut() {
                    line.words.push(word.clone());
                }
                continue;
            }
            if let Some(done) = current.replace(ReconstructedLine::open(word)) {
                lines.push(done);
            }
        }
        lines.extend(current);

        for line in &mut lines {
            line.words.sort_by(|a, b| a.x0.total_cmp(&b.x0));
        }

        PageLines { lines }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, x0: f64, top: f64) -> Word {
        Word::new(text, x0, x0 + 8.0, top)
    }

    #[test]
    fn test_jittered_baselines_share_a_line() {
        let words = vec![word("B", 20.0, 10.6), word("C", 0.0, 20.0), word("A", 0.0, 10.2)];
        let lines = LineReconstructor::default().reconstruct(&words);

        let texts: Vec<String> = lines.iter().map(|l| l.text()).collect();
        assert_eq!(texts, vec!["A B", "C"]);
    }

    #[test]
    fn test_one_full_unit_apart_splits() {
        let words = vec![word("top", 0.0, 10.0), word("next", 0.0, 11.0)];
        let lines = LineReconstructor::default().reconstruct(&words);
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_anchor_does_not_chain() {
        // Each step is under one unit, but the third word is 1.2 below the first.
        let words = vec![
            word("a", 0.0, 10.0),
            word("b", 10.0, 10.6),
            word("c", 20.0, 11.2),
        ];
        let lines = LineReconstructor::default().reconstruct(&words);
        assert_eq!(lines.text(), "a b\nc");
    }

    #[test]
    fn test_words_sorted_left_to_right() {
        let words = vec![
            word("0.63", 95.0, 50.0),
            word("Ra(1)", 10.0, 50.3),
            word("0.21", 60.0, 49.9),
        ];
        let lines = LineReconstructor::default().reconstruct(&words);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines.text(), "Ra(1) 0.21 0.63");
    }

    #[test]
    fn test_empty_input() {
        let lines = LineReconstructor::default().reconstruct(&[]);
        assert!(lines.is_empty());
        assert_eq!(lines.iter().count(), 0);
    }

    #[test]
    fn test_restartable() {
        let words = vec![word("x", 0.0, 1.0), word("y", 0.0, 5.0)];
        let lines = LineReconstructor::default().reconstruct(&words);
        let first: Vec<String> = lines.iter().map(|l| l.text()).collect();
        let second: Vec<String> = (&lines).into_iter().map(|l| l.text()).collect();
        assert_eq!(first, second);
    }
}
