//! LabData Ingest — line reconstruction, row normalization, date and path
//! metadata resolution, per-family measurement parsing, and the import loop.

pub mod date;
pub mod delimited;
pub mod ingest;
pub mod layout;
pub mod metadata;
pub mod parse;
pub mod source;

pub use date::{resolve_report_date, DateSource, ResolvedDate};
pub use delimited::{normalize_row, normalize_rows, DelimitedRow};
pub use ingest::{file_identity, Extraction, FileOutcome, ImportSummary, Importer};
pub use layout::{LineReconstructor, PageLines, ReconstructedLine, Word};
pub use metadata::MetadataExtractor;
pub use parse::{FormatCues, ParserRegistry, ReportParser, Side};
pub use source::{DocumentLoader, FileType, Page, ReportContent, SidecarLoader};
