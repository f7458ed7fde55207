//! Persistence port used by the importer.

use std::collections::HashSet;

use crate::types::{FileContext, MeasurementRecord, ReportFamily};
use labdata_core::Result;

/// Where finished files go.
///
/// Implementations must make `write_file` atomic per file: either every record
/// and the file's processed marker land, or none do. A crash mid-file must not
/// leave a path that later reads back as already known.
pub trait MeasurementSink {
    /// Paths of every file already imported, with or without records.
    fn known_file_paths(&self) -> Result<HashSet<String>>;

    /// Persist one file's records and mark the file processed.
    /// Returns the number of records written.
    fn write_file(
        &self,
        context: &FileContext,
        family: ReportFamily,
        records: &[MeasurementRecord],
    ) -> Result<usize>;
}
