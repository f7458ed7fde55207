//! Data types for measurement records, per-file context, and stored rows.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Sentinel for a categorical attribute no rule could derive.
pub const UNKNOWN: &str = "Unknown";
/// Sentinel for a positional attribute that does not apply to a file.
pub const NOT_APPLICABLE: &str = "N/A";

/// Storage format for `file_date`.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Report layout family a file was parsed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFamily {
    /// Surfcom printout from a LINE folder; labels start their line.
    LineMeasurement,
    /// Surfcom ASSY printout with positioned words and numbered journals.
    JournalSequence,
    /// Surfcom ASSY printout available only as plain text.
    JournalText,
    /// Surfcom roughness summary with `<param> <value>um` pairs.
    RoughnessSummary,
    /// CMM semicolon-delimited export (`.asc`).
    CmmDelimited,
    /// No known layout matched; the file is recorded with zero measurements.
    Unrecognized,
}

impl ReportFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LineMeasurement => "line_measurement",
            Self::JournalSequence => "journal_sequence",
            Self::JournalText => "journal_text",
            Self::RoughnessSummary => "roughness_summary",
            Self::CmmDelimited => "cmm_delimited",
            Self::Unrecognized => "unrecognized",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "line_measurement" => Self::LineMeasurement,
            "journal_sequence" => Self::JournalSequence,
            "journal_text" => Self::JournalText,
            "roughness_summary" => Self::RoughnessSummary,
            "cmm_delimited" => Self::CmmDelimited,
            _ => Self::Unrecognized,
        }
    }
}

impl std::fmt::Display for ReportFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// One extracted numeric result.
///
/// Tolerance fields stay `None` when the report does not print them. The CMM
/// lower offset is the one exception: the delimited normalizer defaults it to
/// zero, so `lower_limit` is present whenever `nominal` is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    /// Journal / position identifier with its side qualifier, or empty.
    pub group_id: String,
    /// Measurement name as printed (`Ra(1)`, `Ramax`, a CMM item...).
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nominal: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper_offset: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower_offset: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper_limit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower_limit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deviation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
}

impl MeasurementRecord {
    pub fn new(group_id: impl Into<String>, label: impl Into<String>, value: f64) -> Self {
        Self {
            group_id: group_id.into(),
            label: label.into(),
            element: None,
            value,
            spec: None,
            nominal: None,
            upper_offset: None,
            lower_offset: None,
            upper_limit: None,
            lower_limit: None,
            deviation: None,
            flag: None,
        }
    }

    pub fn with_spec(mut self, spec: Option<f64>) -> Self {
        self.spec = spec;
        self
    }
}

/// Metadata shared by every record extracted from one source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileContext {
    /// Dedup identity; never rewritten once the context is built.
    pub file_path: String,
    pub file_name: String,
    pub part_type: String,
    pub model: String,
    pub sub_area: String,
    /// Line number digits from a `LINE n` / `Ln` token, or empty.
    pub line_no: String,
    pub process: String,
    pub item_no: String,
    /// `1`/`2`/`3`, or empty when unknown.
    pub shift: String,
    pub piece: String,
    pub cavity: String,
    pub operator_initials: String,
    pub report_date: NaiveDateTime,
}

impl FileContext {
    /// A context with every attribute at its default sentinel.
    pub fn new(file_path: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            file_name: file_name.into(),
            part_type: UNKNOWN.to_string(),
            model: UNKNOWN.to_string(),
            sub_area: UNKNOWN.to_string(),
            line_no: String::new(),
            process: NOT_APPLICABLE.to_string(),
            item_no: UNKNOWN.to_string(),
            shift: String::new(),
            piece: NOT_APPLICABLE.to_string(),
            cavity: NOT_APPLICABLE.to_string(),
            operator_initials: UNKNOWN.to_string(),
            report_date: NaiveDateTime::default(),
        }
    }
}

/// A measurement as read back from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementRow {
    pub id: i64,
    pub family: ReportFamily,
    pub context: FileContext,
    pub record: MeasurementRecord,
    pub imported_at: i64,
}

/// Record count for one report family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyCount {
    pub family: ReportFamily,
    pub files: i64,
    pub records: i64,
}

/// Store-level statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_measurements: i64,
    pub total_files: i64,
    pub empty_files: i64,
    pub by_family: Vec<FamilyCount>,
    pub db_path: String,
    pub db_size_mb: f64,
}
