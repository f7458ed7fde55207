//! CMM `.asc` row normalization.
//!
//! Each export line is `pos;item;element;nominal;upper;lower;actual;deviation;flag`.
//! Short rows are fine: missing trailing slots are simply absent.

use serde::{Deserialize, Serialize};
use tracing::trace;

use labdata_store::MeasurementRecord;

/// Field separator of CMM exports.
pub const DELIMITER: char = ';';

/// First field of the column-numbering header row the CMM prints.
const HEADER_SENTINEL: &str = "1";

/// Typed positional fields of one CMM row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelimitedRow {
    pub pos_no: Option<String>,
    pub item: Option<String>,
    pub element: Option<String>,
    pub nominal: Option<f64>,
    pub upper_offset: Option<f64>,
    /// Always present: a missing lower tolerance means zero, not unknown.
    pub lower_offset: f64,
    pub actual: Option<f64>,
    pub deviation: Option<f64>,
    pub flag: Option<String>,
}

impl DelimitedRow {
    /// `nominal + upper_offset`, when both are known.
    pub fn upper_limit(&self) -> Option<f64> {
        Some(self.nominal? + self.upper_offset?)
    }

    /// `nominal + lower_offset`; the offset defaults to zero.
    pub fn lower_limit(&self) -> Option<f64> {
        Some(self.nominal? + self.lower_offset)
    }

    /// Text form of the row. Normalizing it again yields the same fields.
    pub fn to_line(&self) -> String {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        let num = |v: Option<f64>| v.map(|n| n.to_string()).unwrap_or_default();
        [
            text(&self.pos_no),
            text(&self.item),
            text(&self.element),
            num(self.nominal),
            num(self.upper_offset),
            self.lower_offset.to_string(),
            num(self.actual),
            num(self.deviation),
            text(&self.flag),
        ]
        .join(";")
    }

    /// Convert to a measurement; rows without an actual value carry nothing
    /// to store.
    pub fn into_record(self) -> Option<MeasurementRecord> {
        let value = self.actual?;
        let upper_limit = self.upper_limit();
        let lower_limit = self.lower_limit();
        let mut record = MeasurementRecord::new(
            self.pos_no.unwrap_or_default(),
            self.item.unwrap_or_default(),
            value,
        );
        record.element = self.element;
        record.nominal = self.nominal;
        record.upper_offset = self.upper_offset;
        record.lower_offset = Some(self.lower_offset);
        record.upper_limit = upper_limit;
        record.lower_limit = lower_limit;
        record.deviation = self.deviation;
        record.flag = self.flag;
        Some(record)
    }
}

/// Parse a numeric field, ignoring units and other decoration.
///
/// Every character that is not a digit, sign, decimal point or exponent
/// marker is dropped before parsing.
pub fn parse_number(field: &str) -> Option<f64> {
    let cleaned: String = field
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Normalize one export line. Returns `None` for blank rows and the
/// column-numbering header.
pub fn normalize_row(line: &str) -> Option<DelimitedRow> {
    let parts: Vec<&str> = line.split(DELIMITER).map(str::trim).collect();

    if parts.iter().all(|p| p.is_empty()) {
        return None;
    }
    let field = |i: usize| parts.get(i).copied().filter(|s| !s.is_empty());
    if parts[0] == HEADER_SENTINEL && field(1).is_none() {
        trace!("Skipping header row: {}", line);
        return None;
    }

    let text = |i: usize| field(i).map(str::to_string);
    let num = |i: usize| field(i).and_then(parse_number);

    Some(DelimitedRow {
        pos_no: text(0),
        item: text(1),
        element: text(2),
        nominal: num(3),
        upper_offset: num(4),
        lower_offset: num(5).unwrap_or(0.0),
        actual: num(6),
        deviation: num(7),
        flag: text(8),
    })
}

/// Normalize every data row of an export.
pub fn normalize_rows(text: &str) -> Vec<DelimitedRow> {
    text.lines().filter_map(normalize_row).collect()
}
