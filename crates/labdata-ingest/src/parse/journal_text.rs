//! Sequential-state strategy for Surfcom ASSY printouts available only as text.
//!
//! The renderer's text puts every cell on its own line: a boxed journal
//! number, a `Spec` heading with its limit, then label and value lines.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::{FormatCues, ReportParser};
use crate::layout::LineReconstructor;
use crate::source::ReportContent;
use labdata_core::ExtractionSettings;
use labdata_store::{MeasurementRecord, ReportFamily};

static GROUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{1,3}$").unwrap());
static LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:Ramax|Ra\([0-9]\))$").unwrap());
static DECIMAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+\.[0-9]+").unwrap());

fn decimal(line: &str) -> Option<f64> {
    DECIMAL_RE.find(line)?.as_str().parse().ok()
}

/// Scan state carried from line to line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanState {
    pub journal: Option<String>,
    pub spec: Option<f64>,
    /// Label still waiting for its value line.
    pub pending: Option<String>,
}

impl ScanState {
    fn drop_pending(&mut self, file_name: &str) {
        if let Some(label) = self.pending.take() {
            debug!("{}: label {} has no value, dropped", file_name, label);
        }
    }
}

pub struct JournalTextParser {
    reconstructor: LineReconstructor,
    spec_lookahead: usize,
}

impl JournalTextParser {
    pub fn new(settings: &ExtractionSettings) -> Self {
        Self {
            reconstructor: LineReconstructor::new(settings.baseline_tolerance),
            spec_lookahead: settings.spec_lookahead.max(1),
        }
    }

    /// Run the scan over already split, trimmed, non-empty lines.
    pub fn scan(&self, cues: &FormatCues, lines: &[&str]) -> Vec<MeasurementRecord> {
        let mut state = ScanState::default();
        let mut records = Vec::new();

        for (i, line) in lines.iter().enumerate() {
            if GROUP_RE.is_match(line) {
                state.drop_pending(&cues.file_name);
                state.journal = Some(line.to_string());
                continue;
            }

            if line.to_lowercase().starts_with("spec") {
                state.drop_pending(&cues.file_name);
                let end = (i + self.spec_lookahead).min(lines.len());
                state.spec = lines[i..end].iter().find_map(|l| decimal(l));
                continue;
            }

            if LABEL_RE.is_match(line) {
                state.drop_pending(&cues.file_name);
                state.pending = Some(line.to_string());
                continue;
            }

            let Some(label) = state.pending.take() else {
                continue;
            };
            match (decimal(line), &state.journal) {
                (Some(value), Some(journal)) => {
                    let group = format!("{} Journal {}", cues.side.short(), journal);
                    records.push(
                        MeasurementRecord::new(group.trim(), label, value).with_spec(state.spec),
                    );
                }
                (Some(_), None) => {
                    debug!("{}: {} before any journal number, dropped", cues.file_name, label)
                }
                (None, _) => debug!("{}: no value for {} in '{}'", cues.file_name, label, line),
            }
        }
        records
    }
}

impl ReportParser for JournalTextParser {
    fn family(&self) -> ReportFamily {
        ReportFamily::JournalText
    }

    fn accepts(&self, cues: &FormatCues, content: &ReportContent) -> bool {
        content.is_text_only() && (cues.dirs_upper.contains("ASSY") || cues.side.is_known())
    }

    fn parse(&self, cues: &FormatCues, content: &ReportContent) -> Vec<MeasurementRecord> {
        let Some(page) = content.pages().first() else {
            return Vec::new();
        };
        let text = page.text(&self.reconstructor);
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        self.scan(cues, &lines)
    }
}
