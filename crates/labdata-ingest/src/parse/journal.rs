//! Coordinate-filtered strategy for Surfcom ASSY printouts with positioned words.
//!
//! Journals are printed from the highest number down, each block ending with
//! `Ra(5)`. Only numbers to the right of the label belong to it: the first
//! is the measured value, the second (when printed) the spec.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::{FormatCues, ReportParser, Side};
use crate::layout::LineReconstructor;
use crate::source::ReportContent;
use labdata_core::ExtractionSettings;
use labdata_store::{MeasurementRecord, ReportFamily};

static LABEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Ramax|Ra\([0-9]+\)").unwrap());

/// Label closing a journal block.
pub const LAST_IN_GROUP: &str = "Ra(5)";

/// Tracks which journal the scan is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JournalCounter {
    current: u32,
}

impl JournalCounter {
    /// Exhaust camshafts have six journals, intake five.
    pub fn for_side(side: Side) -> Self {
        let current = match side {
            Side::Exhaust => 6,
            _ => 5,
        };
        Self { current }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    /// Count down once a block's closing label has been seen.
    pub fn observe(&mut self, label: &str) {
        if label == LAST_IN_GROUP {
            self.current = self.current.saturating_sub(1);
        }
    }
}

/// Parse a value token, ignoring unit and marker decoration.
pub fn clean_value(text: &str) -> Option<f64> {
    let cleaned = text
        .replace("µm", "")
        .replace("μm", "")
        .replace(['$', '~'], "")
        .replace(',', ".");
    cleaned
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn journal_prefix(side: Side) -> &'static str {
    match side {
        Side::Exhaust => "Exhaust",
        _ => "Intake",
    }
}

pub struct JournalParser {
    reconstructor: LineReconstructor,
    default_spec: f64,
}

impl JournalParser {
    pub fn new(settings: &ExtractionSettings) -> Self {
        Self {
            reconstructor: LineReconstructor::new(settings.baseline_tolerance),
            default_spec: settings.journal_spec,
        }
    }
}

impl ReportParser for JournalParser {
    fn family(&self) -> ReportFamily {
        ReportFamily::JournalSequence
    }

    fn accepts(&self, cues: &FormatCues, content: &ReportContent) -> bool {
        content.has_words() && cues.dirs_upper.contains("ASSY") && cues.side.is_known()
    }

    fn parse(&self, cues: &FormatCues, content: &ReportContent) -> Vec<MeasurementRecord> {
        let prefix = journal_prefix(cues.side);
        let mut counter = JournalCounter::for_side(cues.side);
        let mut records = Vec::new();

        for page in content.pages() {
            for line in &self.reconstructor.reconstruct(&page.words) {
                let text = line.text();
                let Some(label) = LABEL_RE.find(&text).map(|m| m.as_str()) else {
                    continue;
                };
                let Some(label_x1) = line
                    .words
                    .iter()
                    .find(|w| w.text.contains(label))
                    .map(|w| w.x1)
                else {
                    continue;
                };

                let numbers: Vec<f64> = line
                    .words
                    .iter()
                    .filter(|w| w.x0 > label_x1)
                    .filter_map(|w| clean_value(&w.text))
                    .collect();

                match numbers.first() {
                    Some(&value) => {
                        let spec = numbers.get(1).copied().unwrap_or(self.default_spec);
                        records.push(
                            MeasurementRecord::new(
                                format!("{} Journal {}", prefix, counter.current()),
                                label,
                                value,
                            )
                            .with_spec(Some(spec)),
                        );
                    }
                    None => debug!("{}: no value right of {}", cues.file_name, label),
                }
                counter.observe(label);
            }
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Word;
    use crate::source::Page;

    const EX_PATH: &str = "/lab/2.4L CH/Surfcom/ASSY/HEAD EX 20251101321 JD.pdf";
    const IN_PATH: &str = "/lab/2.4L CH/Surfcom/ASSY/HEAD IN 20251101321 JD.pdf";

    /// Label word spanning x 10..50 followed by the given tokens.
    fn row(label: &str, tokens: &[(&str, f64)], top: f64) -> Vec<Word> {
        let mut words = vec![Word::new(label, 10.0, 50.0, top)];
        for (text, x0) in tokens {
            words.push(Word::new(*text, *x0, x0 + 10.0, top));
        }
        words
    }

    fn content(rows: Vec<Vec<Word>>) -> ReportContent {
        let words = rows.into_iter().flatten().collect();
        ReportContent::Pages(vec![Page::from_words(600.0, 800.0, words)])
    }

    fn parse(path: &str, rows: Vec<Vec<Word>>) -> Vec<MeasurementRecord> {
        JournalParser::new(&ExtractionSettings::default())
            .parse(&FormatCues::new(path), &content(rows))
    }

    #[test]
    fn test_value_and_spec_right_of_label() {
        let numbers = [("0.21", 60.0), ("µm", 70.0), ("0.80", 80.0), ("1.5", 95.0)];
        let mut line = row("Ra(1)", &numbers, 100.0);
        // A number overlapping the label column is not a value.
        line.push(Word::new("9.9", 45.0, 55.0, 100.0));

        let records = parse(EX_PATH, vec![line]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].label, "Ra(1)");
        assert_eq!(records[0].value, 0.21);
        assert_eq!(records[0].spec, Some(0.80));
        assert_eq!(records[0].group_id, "Exhaust Journal 6");
    }

    #[test]
    fn test_default_spec() {
        let records = parse(IN_PATH, vec![row("Ramax", &[("0.45", 60.0)], 100.0)]);
        assert_eq!(records[0].spec, Some(0.63));
        assert_eq!(records[0].group_id, "Intake Journal 5");
    }

    #[test]
    fn test_counter_steps_after_block_end() {
        let rows = vec![
            row("Ramax", &[("0.40", 60.0)], 100.0),
            row("Ra(5)", &[("0.30", 60.0)], 112.0),
            row("Ramax", &[("0.41", 60.0)], 124.0),
            // Closing label without a value still ends the block.
            row("Ra(5)", &[("--", 60.0)], 136.0),
            row("Ramax", &[("0.42", 60.0)], 148.0),
        ];
        let groups: Vec<String> = parse(EX_PATH, rows).into_iter().map(|r| r.group_id).collect();
        assert_eq!(
            groups,
            vec!["Exhaust Journal 6", "Exhaust Journal 6", "Exhaust Journal 5", "Exhaust Journal 4"]
        );
    }

    #[test]
    fn test_counter_continues_across_pages() {
        let page = |label: &str, value: &str| {
            Page::from_words(600.0, 800.0, row(label, &[(value, 60.0)], 100.0))
        };
        let content = ReportContent::Pages(vec![page("Ra(5)", "0.3"), page("Ra(1)", "0.2")]);
        let records = JournalParser::new(&ExtractionSettings::default())
            .parse(&FormatCues::new(IN_PATH), &content);
        assert_eq!(records[1].group_id, "Intake Journal 4");
    }

    #[test]
    fn test_counter_saturates() {
        let mut counter = JournalCounter::for_side(Side::Intake);
        for _ in 0..8 {
            counter.observe(LAST_IN_GROUP);
        }
        assert_eq!(counter.current(), 0);
        counter.observe("Ra(4)");
        assert_eq!(counter.current(), 0);
    }

    #[test]
    fn test_clean_value() {
        assert_eq!(clean_value("0.21µm"), Some(0.21));
        assert_eq!(clean_value("~0,5"), Some(0.5));
        assert_eq!(clean_value("$1.2"), Some(1.2));
        assert_eq!(clean_value("µm"), None);
        assert_eq!(clean_value("NaN"), None);
    }

    #[test]
    fn test_requires_assy_and_side() {
        let parser = JournalParser::new(&ExtractionSettings::default());
        let words = content(vec![row("Ra(1)", &[("0.2", 60.0)], 100.0)]);
        assert!(parser.accepts(&FormatCues::new(EX_PATH), &words));
        assert!(!parser.accepts(&FormatCues::new("/lab/ASSY/CAMSHAFT JD.pdf"), &words));
        assert!(!parser.accepts(&FormatCues::new("/lab/OP20/HEAD EX JD.pdf"), &words));
    }
}
