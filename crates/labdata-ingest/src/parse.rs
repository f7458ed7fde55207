//! Label-value association engine.
//!
//! Each report family is a `ReportParser` strategy. The `ParserRegistry`
//! picks the first strategy whose `accepts` check matches the file's path
//! cues and content shape; adding a family means adding one more strategy.

pub mod cmm;
pub mod journal;
pub mod journal_text;
pub mod line;
pub mod summary;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::metadata::{line_folder, PathView};
use crate::source::ReportContent;
use labdata_core::ExtractionSettings;
use labdata_store::{MeasurementRecord, ReportFamily};

static EX_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^A-Z])EX(?:[^A-Z]|$)").unwrap());
static IN_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^A-Z])IN(?:[^A-Z]|$)").unwrap());

/// Camshaft side a report was measured on, from an `EX`/`IN` filename token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Exhaust,
    Intake,
    Unknown,
}

impl Side {
    pub fn from_file_name(file_name: &str) -> Self {
        let upper = file_name.to_uppercase();
        if EX_TOKEN_RE.is_match(&upper) {
            Self::Exhaust
        } else if IN_TOKEN_RE.is_match(&upper) {
            Self::Intake
        } else {
            Self::Unknown
        }
    }

    /// Assembly printouts may run the side into other letters
    /// (`HEADEXKB.pdf`), so under `ASSY` a plain substring of the stem is
    /// accepted when no whole token is found.
    pub fn from_assy_file_name(file_name: &str) -> Self {
        match Self::from_file_name(file_name) {
            Self::Unknown => {
                let stem = file_name
                    .rsplit_once('.')
                    .map_or(file_name, |(stem, _)| stem)
                    .to_uppercase();
                if stem.contains("EX") {
                    Self::Exhaust
                } else if stem.contains("IN") {
                    Self::Intake
                } else {
                    Self::Unknown
                }
            }
            side => side,
        }
    }

    pub fn short(&self) -> &'static str {
        match self {
            Self::Exhaust => "EX",
            Self::Intake => "IN",
            Self::Unknown => "",
        }
    }

    pub fn long(&self) -> &'static str {
        match self {
            Self::Exhaust => "Exhaust",
            Self::Intake => "Intake",
            Self::Unknown => "",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Path-derived hints used for format detection and group naming.
#[derive(Debug, Clone)]
pub struct FormatCues {
    pub file_name: String,
    pub file_name_upper: String,
    /// Directory part of the path, uppercased and `/`-joined.
    pub dirs_upper: String,
    pub path_upper: String,
    /// Whether a `LINE n` / `Ln` folder encloses the file.
    pub in_line_folder: bool,
    pub side: Side,
}

impl FormatCues {
    pub fn new(file_path: &str) -> Self {
        let view = PathView::new(file_path);
        let dirs_upper = view.dirs.join("/").to_uppercase();
        let side = if dirs_upper.contains("ASSY") {
            Side::from_assy_file_name(view.file_name)
        } else {
            Side::from_file_name(view.file_name)
        };
        Self {
            file_name: view.file_name.to_string(),
            file_name_upper: view.file_name.to_uppercase(),
            dirs_upper,
            path_upper: view.upper.clone(),
            in_line_folder: line_folder(&view).is_some(),
            side,
        }
    }
}

/// One report family's association strategy.
pub trait ReportParser: Send + Sync {
    /// Family recorded for files this parser handles.
    fn family(&self) -> ReportFamily;

    /// Whether this parser handles a file with these cues and content.
    fn accepts(&self, cues: &FormatCues, content: &ReportContent) -> bool;

    /// Extract every measurement. Malformed lines are skipped, never fatal.
    fn parse(&self, cues: &FormatCues, content: &ReportContent) -> Vec<MeasurementRecord>;
}

/// Ordered set of parsers; the first one that accepts a file wins.
pub struct ParserRegistry {
    parsers: Vec<Box<dyn ReportParser>>,
}

impl ParserRegistry {
    /// All built-in families, most specific first.
    pub fn new(settings: &ExtractionSettings) -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(cmm::CmmParser));
        registry.register(Box::new(line::LineParser::new(settings)));
        registry.register(Box::new(journal::JournalParser::new(settings)));
        registry.register(Box::new(journal_text::JournalTextParser::new(settings)));
        registry.register(Box::new(summary::SummaryParser::new(settings)));
        registry
    }

    pub fn empty() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// Append a parser; it is consulted after every parser already registered.
    pub fn register(&mut self, parser: Box<dyn ReportParser>) {
        self.parsers.push(parser);
    }

    pub fn families(&self) -> Vec<ReportFamily> {
        self.parsers.iter().map(|p| p.family()).collect()
    }

    pub fn detect(&self, cues: &FormatCues, content: &ReportContent) -> Option<&dyn ReportParser> {
        self.parsers
            .iter()
            .find(|p| p.accepts(cues, content))
            .map(|p| p.as_ref())
    }
}
