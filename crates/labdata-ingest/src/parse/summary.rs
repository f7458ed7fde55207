//! Roughness summary printouts: `<param> <value>um` pairs in the top-left
//! block of the first page.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::{FormatCues, ReportParser};
use crate::layout::LineReconstructor;
use crate::source::ReportContent;
use labdata_core::ExtractionSettings;
use labdata_store::{MeasurementRecord, ReportFamily};

// Longer parameter names first so `Ramax` is not read as `Ra`.
static PARAM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(Ra1max|Ra8max|Ramax|Rz1max|Rz8max|Rzmax|Ra1|Ra8|Rz1|Rz8|Ra|Rz|Rt|Pa|Pt)\s+([0-9.]+)[uµμ]m",
    )
    .unwrap()
});

/// Every `(param, value)` pair in `text`, in reading order.
pub fn summary_pairs(text: &str) -> Vec<(String, f64)> {
    PARAM_RE
        .captures_iter(text)
        .filter_map(|c| match c[2].parse::<f64>() {
            Ok(value) => Some((c[1].to_string(), value)),
            Err(_) => {
                debug!("Unparseable {} value '{}'", &c[1], &c[2]);
                None
            }
        })
        .collect()
}

pub struct SummaryParser {
    reconstructor: LineReconstructor,
    crop: (f64, f64),
}

impl SummaryParser {
    pub fn new(settings: &ExtractionSettings) -> Self {
        Self {
            reconstructor: LineReconstructor::new(settings.baseline_tolerance),
            crop: settings.summary_crop,
        }
    }
}

impl ReportParser for SummaryParser {
    fn family(&self) -> ReportFamily {
        ReportFamily::RoughnessSummary
    }

    /// Any other Surfcom printout. Assembly and line-folder reports belong
    /// to the journal and line families even when those reject them.
    fn accepts(&self, cues: &FormatCues, content: &ReportContent) -> bool {
        cues.path_upper.contains("SURFCOM")
            && !cues.dirs_upper.contains("ASSY")
            && !cues.in_line_folder
            && !content.pages().is_empty()
    }

    fn parse(&self, _cues: &FormatCues, content: &ReportContent) -> Vec<MeasurementRecord> {
        let Some(page) = content.pages().first() else {
            return Vec::new();
        };
        let text = if page.words.is_empty() {
            page.text.clone().unwrap_or_default()
        } else {
            let (fx, fy) = self.crop;
            self.reconstructor
                .reconstruct(&page.crop_top_left(fx, fy))
                .text()
        };

        summary_pairs(&text)
            .into_iter()
            .map(|(param, value)| MeasurementRecord::new("", param, value))
            .collect()
    }
}
