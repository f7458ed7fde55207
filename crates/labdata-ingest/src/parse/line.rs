//! Prefix-line strategy for Surfcom printouts filed under a `LINE n` folder.
//!
//! A measurement line starts with its label and carries the value somewhere
//! after it: `Ra(1) 0.214 µm`. Every record gets the same fixed spec.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::{FormatCues, ReportParser};
use crate::layout::LineReconstructor;
use crate::source::ReportContent;
use labdata_core::ExtractionSettings;
use labdata_store::{MeasurementRecord, ReportFamily};

/// Labels printed at the start of a LINE report row.
pub const LINE_LABELS: [&str; 11] = [
    "Pt", "Ra", "Ramax", "Ramin", "Rasd", "Ra(1)", "Ra(2)", "Ra(3)", "Rz(1)", "Rz(2)", "Rz(3)",
];

/// Filename markers of the four LINE report types, with their group label.
const TARGETS: [(&[&str], &str); 4] = [
    (&["CHAIN CASE EX", "CH CASE EX"], "Chain Case Exhaust"),
    (&["CHAIN CASE IN", "CH CASE IN"], "Chain Case Intake"),
    (&["HEAD EX"], "Head Exhaust"),
    (&["HEAD IN"], "Head Intake"),
];

const FALLBACK_GROUP: &str = "Line Measurement";

static VALUE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+\.[0-9]+$").unwrap());

/// Group label for a LINE report, from its filename.
pub fn group_label(file_name_upper: &str) -> &'static str {
    TARGETS
        .iter()
        .find(|(markers, _)| markers.iter().any(|m| file_name_upper.contains(m)))
        .map(|(_, label)| *label)
        .unwrap_or(FALLBACK_GROUP)
}

fn is_target(file_name_upper: &str) -> bool {
    group_label(file_name_upper) != FALLBACK_GROUP
}

pub struct LineParser {
    reconstructor: LineReconstructor,
    spec: f64,
}

impl LineParser {
    pub fn new(settings: &ExtractionSettings) -> Self {
        Self {
            reconstructor: LineReconstructor::new(settings.baseline_tolerance),
            spec: settings.line_spec,
        }
    }
}

impl ReportParser for LineParser {
    fn family(&self) -> ReportFamily {
        ReportFamily::LineMeasurement
    }

    fn accepts(&self, cues: &FormatCues, content: &ReportContent) -> bool {
        cues.in_line_folder && is_target(&cues.file_name_upper) && content.has_words()
    }

    fn parse(&self, cues: &FormatCues, content: &ReportContent) -> Vec<MeasurementRecord> {
        let Some(page) = content.pages().first() else {
            return Vec::new();
        };
        let group = group_label(&cues.file_name_upper);
        let mut records = Vec::new();

        for line in &self.reconstructor.reconstruct(&page.words) {
            let text = line.text();
            for label in LINE_LABELS {
                if !text.starts_with(&format!("{} ", label)) {
                    continue;
                }
                let value = line
                    .words
                    .iter()
                    // The renderer sometimes splits digit groups with a space.
                    .map(|w| w.text.replace(' ', ""))
                    .find(|t| VALUE_RE.is_match(t))
                    .and_then(|t| t.parse::<f64>().ok());
                match value {
                    Some(value) => records.push(
                        MeasurementRecord::new(group, label, value).with_spec(Some(self.spec)),
                    ),
                    None => debug!("{}: no value for {} in '{}'", cues.file_name, label, text),
                }
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

    const PATH: &str = "/lab/A25 CH/Surfcom/LINE 1/CHAIN CASE EX 20251101321 JD.pdf";

    fn page(rows: &[&[(&str, f64)]]) -> ReportContent {
        let mut words = Vec::new();
        for (i, row) in rows.iter().enumerate() {
            let top = 100.0 + i as f64 * 12.0;
            for (text, x0) in row.iter() {
                words.push(Word::new(*text, *x0, x0 + 20.0, top));
            }
        }
        ReportContent::Pages(vec![Page::from_words(600.0, 800.0, words)])
    }

    #[test]
    fn test_group_label() {
        assert_eq!(group_label("CHAIN CASE EX JD.PDF"), "Chain Case Exhaust");
        assert_eq!(group_label("CH CASE IN JD.PDF"), "Chain Case Intake");
        assert_eq!(group_label("HEAD IN JD.PDF"), "Head Intake");
        assert_eq!(group_label("CAMSHAFT JD.PDF"), "Line Measurement");
    }

    #[test]
    fn test_prefix_lines() {
        let content = page(&[
            &[("Date", 10.0), ("2025/12/30", 40.0)],
            &[("Ra(1)", 10.0), ("0.214", 60.0), ("µm", 90.0)],
            &[("Ramax", 10.0), ("0.3", 60.0), ("1.05", 90.0)],
            &[("Measured", 10.0), ("Ra", 60.0), ("0.5", 90.0)],
            &[("Rz(1)", 10.0), ("n/a", 60.0)],
        ]);
        let parser = LineParser::new(&ExtractionSettings::default());
        let records = parser.parse(&FormatCues::new(PATH), &content);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].label, "Ra(1)");
        assert_eq!(records[0].value, 0.214);
        assert_eq!(records[0].group_id, "Chain Case Exhaust");
        assert_eq!(records[0].spec, Some(0.63));
        assert_eq!(records[1].label, "Ramax");
        assert_eq!(records[1].value, 0.3);
    }

    #[test]
    fn test_split_digits_are_joined() {
        let content = page(&[&[("Pt", 10.0), ("1 2.5", 60.0)]]);
        let parser = LineParser::new(&ExtractionSettings::default());
        let records = parser.parse(&FormatCues::new(PATH), &content);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value, 12.5);
    }

    #[test]
    fn test_accepts_only_targets_in_line_folders() {
        let parser = LineParser::new(&ExtractionSettings::default());
        let content = page(&[&[("Ra", 10.0), ("0.2", 60.0)]]);
        assert!(parser.accepts(&FormatCues::new(PATH), &content));
        assert!(!parser.accepts(&FormatCues::new("/lab/LINE 1/CAMSHAFT JD.pdf"), &content));
        assert!(!parser.accepts(&FormatCues::new("/lab/ASSY/HEAD EX JD.pdf"), &content));
    }
}
