//! CMM delimited exports: one record per normalized row.

use tracing::debug;

use super::{FormatCues, ReportParser};
use crate::delimited::normalize_rows;
use crate::source::ReportContent;
use labdata_store::{MeasurementRecord, ReportFamily};

#[derive(Debug, Clone, Copy, Default)]
pub struct CmmParser;

impl ReportParser for CmmParser {
    fn family(&self) -> ReportFamily {
        ReportFamily::CmmDelimited
    }

    fn accepts(&self, _cues: &FormatCues, content: &ReportContent) -> bool {
        matches!(content, ReportContent::Delimited(_))
    }

    fn parse(&self, cues: &FormatCues, content: &ReportContent) -> Vec<MeasurementRecord> {
        let ReportContent::Delimited(text) = content else {
            return Vec::new();
        };
        let rows = normalize_rows(text);
        let total = rows.len();
        let records: Vec<MeasurementRecord> =
            rows.into_iter().filter_map(|row| row.into_record()).collect();
        if records.len() < total {
            debug!(
                "{}: dropped {} rows without an actual value",
                cues.file_name,
                total - records.len()
            );
        }
        records
    }
}
