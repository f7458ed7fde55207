//! End-to-end import tests: report files on disk → loader → detection →
//! association → importer → SQLite store.

use std::path::{Path, PathBuf};

use labdata_core::ExtractionSettings;
use labdata_ingest::{Importer, ImportSummary, SidecarLoader};
use labdata_store::{ReportFamily, SqliteStore};
use serde_json::json;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    store: SqliteStore,
    cmm: PathBuf,
    journal: PathBuf,
    unknown: PathBuf,
}

fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn word(text: &str, x0: f64, top: f64) -> serde_json::Value {
    json!({ "text": text, "x0": x0, "x1": x0 + 20.0, "top": top })
}

fn write_sidecar(pdf: &Path, words: Vec<serde_json::Value>) {
    let pages = json!([{ "width": 600.0, "height": 800.0, "words": words }]);
    write(&SidecarLoader::sidecar_path(pdf), &pages.to_string());
}

fn journal_words() -> Vec<serde_json::Value> {
    vec![
        word("Date", 10.0, 50.0),
        word("2025/12/30", 40.0, 50.0),
        word("Ramax", 10.0, 100.0),
        word("0.40", 60.0, 100.0),
        word("0.80", 90.0, 100.0),
        word("Ra(5)", 10.0, 120.0),
        word("0.30", 60.0, 120.0),
        word("Ra(1)", 10.0, 140.0),
        word("0.21", 60.0, 140.0),
    ]
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let lab = dir.path().join("lab");

    let cmm = lab.join("Rear Cover/967/LINE 2/#80 1ST/1F Cavity-A12B 20251101321.asc");
    write(
        &cmm,
        concat!(
            "1;;;;;;;;\n",
            "1;Bore;Dia;10.000;0.020;;9.995;-0.005;OK\n",
            "2;Bore;Dia;12.0;0.02;-0.01;12.01;0.01;\n",
            "3;Note\n",
        ),
    );

    let journal = lab.join("Cam Housing/2.4L CH/Surfcom/ASSY/HEAD EX 20251101321 JD.pdf");
    write(&journal, "%PDF-1.4");
    write_sidecar(&journal, journal_words());

    let unknown = lab.join("misc/readme 1.pdf");
    write(&unknown, "%PDF-1.4");
    write_sidecar(&unknown, vec![word("hello", 10.0, 10.0)]);

    let store = SqliteStore::open(dir.path().join("db")).unwrap();
    Fixture {
        _dir: dir,
        store,
        cmm,
        journal,
        unknown,
    }
}

fn identity(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[test]
fn test_second_run_imports_nothing() {
    let fx = fixture();
    let settings = ExtractionSettings::default();
    let paths = [&fx.cmm, &fx.journal, &fx.unknown];

    let first = Importer::new(&fx.store, &settings).unwrap().import_all(paths);
    assert_eq!(
        first,
        ImportSummary {
            files_seen: 3,
            skipped: 0,
            imported: 2,
            unrecognized: 1,
            failed: 0,
            records_written: 5,
        }
    );
    assert_eq!(fx.store.count_measurements().unwrap(), 5);

    // A fresh importer reads the known set back from the store.
    let second = Importer::new(&fx.store, &settings).unwrap().import_all(paths);
    assert_eq!(second.skipped, 3);
    assert_eq!(second.records_written, 0);
    assert_eq!(fx.store.count_measurements().unwrap(), 5);
    assert_eq!(fx.store.count_files().unwrap(), 3);
}

#[test]
fn test_journal_report_end_to_end() {
    let fx = fixture();
    let mut importer = Importer::new(&fx.store, &ExtractionSettings::default()).unwrap();
    importer.import_file(&fx.journal).unwrap();

    let rows = fx.store.measurements_for_file(&identity(&fx.journal)).unwrap();
    let got: Vec<(&str, &str, f64, Option<f64>)> = rows
        .iter()
        .map(|r| {
            (
                r.record.group_id.as_str(),
                r.record.label.as_str(),
                r.record.value,
                r.record.spec,
            )
        })
        .collect();
    assert_eq!(
        got,
        vec![
            ("Exhaust Journal 6", "Ramax", 0.40, Some(0.80)),
            ("Exhaust Journal 6", "Ra(5)", 0.30, Some(0.63)),
            ("Exhaust Journal 5", "Ra(1)", 0.21, Some(0.63)),
        ]
    );

    let context = &rows[0].context;
    assert_eq!(rows[0].family, ReportFamily::JournalSequence);
    assert_eq!(context.model, "2.4L CH");
    assert_eq!(context.sub_area, "ASSY");
    assert_eq!(context.operator_initials, "JD");
    // Header date wins over the filename digits.
    assert_eq!(context.report_date.to_string(), "2025-12-30 00:00:00");
}

#[test]
fn test_cmm_export_end_to_end() {
    let fx = fixture();
    let mut importer = Importer::new(&fx.store, &ExtractionSettings::default()).unwrap();
    importer.import_file(&fx.cmm).unwrap();

    let rows = fx.store.measurements_for_file(&identity(&fx.cmm)).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].family, ReportFamily::CmmDelimited);
    assert_eq!(rows[0].record.lower_offset, Some(0.0));
    assert_eq!(rows[0].record.lower_limit, Some(10.0));
    assert_eq!(rows[1].record.flag, None);
    assert_eq!(rows[1].context.model, "967K");
    assert_eq!(rows[1].context.shift, "1");
    assert_eq!(rows[1].context.report_date.to_string(), "2025-01-10 13:21:00");
}

#[test]
fn test_unrecognized_file_counts_as_processed() {
    let fx = fixture();
    let mut importer = Importer::new(&fx.store, &ExtractionSettings::default()).unwrap();
    importer.import_file(&fx.unknown).unwrap();

    assert!(fx.store.measurements_for_file(&identity(&fx.unknown)).unwrap().is_empty());
    assert!(fx
        .store
        .get_known_file_paths()
        .unwrap()
        .contains(&identity(&fx.unknown)));

    let stats = fx.store.get_stats().unwrap();
    assert_eq!(stats.empty_files, 1);
    assert_eq!(stats.by_family[0].family, ReportFamily::Unrecognized);
}

#[test]
fn test_missing_sidecar_is_retried_later() {
    let fx = fixture();
    let pending = fx.journal.with_file_name("HEAD EX 20251101322 KB.pdf");
    write(&pending, "%PDF-1.4");

    let settings = ExtractionSettings::default();
    let summary = Importer::new(&fx.store, &settings).unwrap().import_all([&pending]);
    assert_eq!(summary.failed, 1);
    assert_eq!(fx.store.count_files().unwrap(), 0);

    write_sidecar(&pending, journal_words());
    let summary = Importer::new(&fx.store, &settings).unwrap().import_all([&pending]);
    assert_eq!(summary.imported, 1);
    assert_eq!(summary.records_written, 3);
}

#[test]
fn test_respelled_path_is_not_imported_twice() {
    let fx = fixture();
    let settings = ExtractionSettings::default();
    Importer::new(&fx.store, &settings).unwrap().import_all([&fx.cmm]);

    let folder = fx.cmm.parent().unwrap();
    let respelled = folder
        .join("..")
        .join(folder.file_name().unwrap())
        .join(".")
        .join(fx.cmm.file_name().unwrap());
    let summary = Importer::new(&fx.store, &settings).unwrap().import_all([&respelled]);

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.records_written, 0);
    assert_eq!(fx.store.count_measurements().unwrap(), 2);
}

#[test]
fn test_assy_name_without_separators_reads_journals() {
    let fx = fixture();
    let pdf = fx.journal.with_file_name("HEADEXKB.pdf");
    write(&pdf, "%PDF-1.4");
    write_sidecar(&pdf, journal_words());

    let mut importer = Importer::new(&fx.store, &ExtractionSettings::default()).unwrap();
    importer.import_file(&pdf).unwrap();

    let rows = fx.store.measurements_for_file(&identity(&pdf)).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].family, ReportFamily::JournalSequence);
    assert_eq!(rows[0].record.group_id, "Exhaust Journal 6");
}
