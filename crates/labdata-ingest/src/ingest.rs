//! Record assembly and the import loop: file → content → records → sink.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::date::resolve_report_date;
use crate::layout::LineReconstructor;
use crate::metadata::MetadataExtractor;
use crate::parse::{FormatCues, ParserRegistry};
use crate::source::{DocumentLoader, SidecarLoader};
use labdata_core::{ExtractionSettings, Result};
use labdata_store::{FileContext, MeasurementRecord, MeasurementSink, ReportFamily};

const DEFAULT_PROGRESS_EVERY: usize = 50;

/// Everything extracted from one file, ready for the sink.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub context: FileContext,
    pub family: ReportFamily,
    pub records: Vec<MeasurementRecord>,
}

/// What happened to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// Already in the sink's known set.
    Skipped,
    Imported { family: ReportFamily, records: usize },
    /// No layout matched; recorded with zero measurements.
    Unrecognized,
}

/// Totals for one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub files_seen: usize,
    pub skipped: usize,
    pub imported: usize,
    pub unrecognized: usize,
    pub failed: usize,
    pub records_written: usize,
}

/// Imports report files into a `MeasurementSink`, one file at a time.
pub struct Importer<'a, S: MeasurementSink + ?Sized> {
    sink: &'a S,
    loader: Box<dyn DocumentLoader>,
    registry: ParserRegistry,
    metadata: MetadataExtractor,
    reconstructor: LineReconstructor,
    known: HashSet<String>,
    progress_every: usize,
    files_processed: usize,
}

impl<'a, S: MeasurementSink + ?Sized> Importer<'a, S> {
    /// Reads the sink's known file set once; it is kept current as files
    /// are written.
    pub fn new(sink: &'a S, settings: &ExtractionSettings) -> Result<Self> {
        let known = sink.known_file_paths()?;
        info!("{} files already imported", known.len());

        Ok(Self {
            sink,
            loader: Box::new(SidecarLoader),
            registry: ParserRegistry::new(settings),
            metadata: MetadataExtractor::new(settings),
            reconstructor: LineReconstructor::new(settings.baseline_tolerance),
            known,
            progress_every: DEFAULT_PROGRESS_EVERY,
            files_processed: 0,
        })
    }

    pub fn with_loader(mut self, loader: impl DocumentLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    pub fn with_registry(mut self, registry: ParserRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn progress_every(mut self, every: usize) -> Self {
        self.progress_every = every.max(1);
        self
    }

    /// Files written by this importer so far.
    pub fn files_processed(&self) -> usize {
        self.files_processed
    }

    pub fn is_known(&self, path: &Path) -> bool {
        self.known.contains(&file_identity(path))
    }

    /// Extract records and context from one file without writing anything.
    pub fn extract_file(&self, path: &Path) -> Result<Extraction> {
        self.extract(path, &file_identity(path))
    }

    fn extract(&self, path: &Path, identity: &str) -> Result<Extraction> {
        let content = self.loader.load(path)?;

        let mut context = self.metadata.extract(identity);
        let header = content.header_text(&self.reconstructor);
        let resolved = resolve_report_date(header.as_deref(), path);
        context.report_date = resolved.timestamp;
        debug!("{}: date {} from {:?}", identity, resolved.timestamp, resolved.source);

        let cues = FormatCues::new(identity);
        let Some(parser) = self.registry.detect(&cues, &content) else {
            warn!("Unrecognized report layout, recording with no measurements: {}", identity);
            return Ok(Extraction {
                context,
                family: ReportFamily::Unrecognized,
                records: Vec::new(),
            });
        };

        let records = parser.parse(&cues, &content);
        if records.is_empty() {
            warn!("{} layout yielded no measurements: {}", parser.family(), identity);
        } else {
            debug!("{}: {} records as {}", identity, records.len(), parser.family());
        }
        Ok(Extraction {
            context,
            family: parser.family(),
            records,
        })
    }

    /// Import one file unless it is already known.
    ///
    /// A file only becomes known once the sink accepted it, so a load or
    /// write failure leaves it to be retried on the next run.
    pub fn import_file(&mut self, path: &Path) -> Result<FileOutcome> {
        let identity = file_identity(path);
        if self.known.contains(&identity) {
            debug!("Already imported, skipping: {}", identity);
            return Ok(FileOutcome::Skipped);
        }

        let extraction = self.extract(path, &identity)?;
        let written = self.sink.write_file(
            &extraction.context,
            extraction.family,
            &extraction.records,
        )?;
        self.known.insert(identity);

        self.files_processed += 1;
        if self.files_processed % self.progress_every == 0 {
            info!("Processed {} new files...", self.files_processed);
        }

        Ok(match extraction.family {
            ReportFamily::Unrecognized => FileOutcome::Unrecognized,
            family => FileOutcome::Imported {
                family,
                records: written,
            },
        })
    }

    /// Import every path in order. A failing file is logged and counted; it
    /// never stops the run.
    pub fn import_all<I, P>(&mut self, paths: I) -> ImportSummary
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut summary = ImportSummary::default();

        for path in paths {
            let path = path.as_ref();
            summary.files_seen += 1;
            match self.import_file(path) {
                Ok(FileOutcome::Skipped) => summary.skipped += 1,
                Ok(FileOutcome::Imported { records, .. }) => {
                    summary.imported += 1;
                    summary.records_written += records;
                }
                Ok(FileOutcome::Unrecognized) => summary.unrecognized += 1,
                Err(e) => {
                    summary.failed += 1;
                    error!("Failed to import {}: {}", path.display(), e);
                }
            }
        }

        info!(
            "Import finished: {} seen, {} imported ({} records), {} unrecognized",
            summary.files_seen,
            summary.imported,
            summary.records_written,
            summary.unrecognized
        );
        info!("{} skipped, {} failed", summary.skipped, summary.failed);
        summary
    }
}

/// Dedup identity of a file: its absolute, lexically normalized path.
///
/// Relative paths are resolved against the working directory, `.` is
/// dropped and `..` removes the preceding component. Symlinks are not
/// followed, so two spellings of one path share an identity but a link and
/// its target do not.
pub fn file_identity(path: &Path) -> String {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    normalize(&absolute).to_string_lossy().into_owned()
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::PathBuf;

    use crate::source::{Page, ReportContent};
    use labdata_core::Error;

    #[derive(Default)]
    struct MemorySink {
        preloaded: HashSet<String>,
        files: RefCell<Vec<(FileContext, ReportFamily, usize)>>,
        fail_writes: bool,
    }

    impl MeasurementSink for MemorySink {
        fn known_file_paths(&self) -> Result<HashSet<String>> {
            Ok(self.preloaded.clone())
        }

        fn write_file(
            &self,
            context: &FileContext,
            family: ReportFamily,
            records: &[MeasurementRecord],
        ) -> Result<usize> {
            if self.fail_writes {
                return Err(Error::Storage("disk full".to_string()));
            }
            self.files
                .borrow_mut()
                .push((context.clone(), family, records.len()));
            Ok(records.len())
        }
    }

    #[derive(Default)]
    struct MapLoader(HashMap<PathBuf, ReportContent>);

    impl MapLoader {
        fn with(mut self, path: &str, content: ReportContent) -> Self {
            self.0.insert(PathBuf::from(path), content);
            self
        }
    }

    impl DocumentLoader for MapLoader {
        fn load(&self, path: &Path) -> Result<ReportContent> {
            self.0
                .get(path)
                .cloned()
                .ok_or_else(|| Error::Ingest(format!("No content for {}", path.display())))
        }
    }

    const CMM: &str = "/lab/Rear Cover/967/LINE 2/#80 1ST/1F Cavity-A12B 20251101321.asc";
    const NOTES: &str = "/lab/misc/notes 20251101321.pdf";

    fn cmm_content() -> ReportContent {
        ReportContent::Delimited(
            "1;Bore;Dia;10.000;0.020;;9.995;-0.005;OK\n2;Bore;Dia;12.0;0.02;;12.01\n".to_string(),
        )
    }

    fn loader() -> MapLoader {
        MapLoader::default()
            .with(CMM, cmm_content())
            .with(NOTES, ReportContent::Pages(vec![Page::from_text("meeting notes")]))
    }

    fn importer(sink: &MemorySink) -> Importer<'_, MemorySink> {
        Importer::new(sink, &ExtractionSettings::default())
            .unwrap()
            .with_loader(loader())
    }

    #[test]
    fn test_import_then_skip() {
        let sink = MemorySink::default();
        let mut importer = importer(&sink);

        let first = importer.import_file(Path::new(CMM)).unwrap();
        assert_eq!(
            first,
            FileOutcome::Imported {
                family: ReportFamily::CmmDelimited,
                records: 2
            }
        );
        assert_eq!(importer.import_file(Path::new(CMM)).unwrap(), FileOutcome::Skipped);
        assert_eq!(sink.files.borrow().len(), 1);
        assert_eq!(importer.files_processed(), 1);
    }

    #[test]
    fn test_preloaded_known_files_are_skipped() {
        let sink = MemorySink {
            preloaded: HashSet::from([CMM.to_string()]),
            ..Default::default()
        };
        let mut importer = importer(&sink);
        assert!(importer.is_known(Path::new(CMM)));
        assert_eq!(importer.import_file(Path::new(CMM)).unwrap(), FileOutcome::Skipped);
        assert!(sink.files.borrow().is_empty());
    }

    #[test]
    fn test_context_is_attached() {
        let sink = MemorySink::default();
        let mut importer = importer(&sink);
        importer.import_file(Path::new(CMM)).unwrap();

        let files = sink.files.borrow();
        let (context, _, _) = &files[0];
        assert_eq!(context.file_path, CMM);
        assert_eq!(context.model, "967K");
        assert_eq!(context.sub_area, "LINE 2");
        assert_eq!(context.cavity, "A12");
        assert_eq!(context.report_date.to_string(), "2025-01-10 13:21:00");
    }

    #[test]
    fn test_extract_file_writes_nothing() {
        let sink = MemorySink::default();
        let importer = importer(&sink);

        let extraction = importer.extract_file(Path::new(CMM)).unwrap();
        assert_eq!(extraction.family, ReportFamily::CmmDelimited);
        assert_eq!(extraction.records.len(), 2);
        assert_eq!(extraction.context.model, "967K");
        assert!(sink.files.borrow().is_empty());
        assert!(!importer.is_known(Path::new(CMM)));
    }

    #[test]
    fn test_unrecognized_file_is_marked_processed() {
        let sink = MemorySink::default();
        let mut importer = importer(&sink);

        assert_eq!(importer.import_file(Path::new(NOTES)).unwrap(), FileOutcome::Unrecognized);
        assert_eq!(sink.files.borrow()[0].1, ReportFamily::Unrecognized);
        assert_eq!(sink.files.borrow()[0].2, 0);
        assert!(importer.is_known(Path::new(NOTES)));
    }

    #[test]
    fn test_failures_are_isolated() {
        let sink = MemorySink::default();
        let mut importer = importer(&sink);

        let summary = importer.import_all(["/lab/missing.pdf", CMM, NOTES, CMM]);
        assert_eq!(
            summary,
            ImportSummary {
                files_seen: 4,
                skipped: 1,
                imported: 1,
                unrecognized: 1,
                failed: 1,
                records_written: 2,
            }
        );
        // A load failure is retried next time.
        assert!(!importer.is_known(Path::new("/lab/missing.pdf")));
    }

    #[test]
    fn test_write_failure_leaves_file_unknown() {
        let sink = MemorySink {
            fail_writes: true,
            ..Default::default()
        };
        let mut importer = importer(&sink);
        assert!(matches!(importer.import_file(Path::new(CMM)), Err(Error::Storage(_))));
        assert!(!importer.is_known(Path::new(CMM)));
        assert_eq!(importer.files_processed(), 0);
    }

    #[test]
    fn test_custom_registry() {
        let sink = MemorySink::default();
        let mut importer = importer(&sink).with_registry(ParserRegistry::empty());
        assert_eq!(importer.import_file(Path::new(CMM)).unwrap(), FileOutcome::Unrecognized);
    }

    #[test]
    fn test_relative_identity_is_absolute() {
        let identity = file_identity(Path::new("reports/a.asc"));
        assert!(Path::new(&identity).is_absolute());
        assert!(identity.ends_with("a.asc"));
        assert_eq!(file_identity(Path::new(CMM)), CMM);
    }

    #[test]
    fn test_identity_ignores_path_spelling() {
        assert_eq!(
            file_identity(Path::new("./lab/a.asc")),
            file_identity(Path::new("lab/a.asc"))
        );
        assert_eq!(
            file_identity(Path::new("/data/lab/../lab/./a.asc")),
            "/data/lab/a.asc"
        );
        assert_eq!(file_identity(Path::new("/../a.asc")), "/a.asc");
    }
}
