//! LabData — import lab measurement reports into a SQLite store.

use std::path::{Path, PathBuf};

use tracing::info;
use tracing_subscriber::EnvFilter;

use labdata_core::LabDataConfig;
use labdata_ingest::{ImportSummary, Importer};
use labdata_store::{SqliteStore, StoreStats};

mod walk;

fn resolve_data_dir(arg: Option<&String>) -> PathBuf {
    arg.map(PathBuf::from).unwrap_or_else(|| {
        std::env::var("LABDATA_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"))
    })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("import") => {
            let Some(root) = args.get(2) else {
                eprintln!("Usage: labdata import <report-root> [data-dir]");
                std::process::exit(1);
            };
            run_import(Path::new(root), &resolve_data_dir(args.get(3)))
        }
        Some("stats") => run_stats(&resolve_data_dir(args.get(2))),
        None | Some("--help") | Some("-h") | Some("help") => {
            println!("LabData: lab measurement report importer");
            println!();
            println!("Usage: labdata <command>");
            println!();
            println!("Commands:");
            println!("  import <root> [data-dir]   Import every report under <root>");
            println!("  stats [data-dir]           Show store statistics");
            println!("  help                       Show this help message");
            println!();
            println!("The data directory defaults to $LABDATA_DATA_DIR, then ./data.");
            Ok(())
        }
        Some(other) => {
            eprintln!("Unknown command: {}. Use 'labdata help' for usage.", other);
            std::process::exit(1);
        }
    }
}

fn open_store(data_dir: &Path) -> anyhow::Result<(LabDataConfig, SqliteStore)> {
    info!("Data directory: {}", data_dir.display());
    let config = LabDataConfig::from_env(data_dir)?;
    let store = SqliteStore::open(&config.data_paths.db)
        .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?;
    Ok((config, store))
}

fn run_import(root: &Path, data_dir: &Path) -> anyhow::Result<()> {
    let (config, store) = open_store(data_dir)?;

    let reports = walk::find_reports(root)?;
    info!("Found {} report files under {}", reports.len(), root.display());

    let summary = Importer::new(&store, &config.settings)?
        .progress_every(config.progress_every)
        .import_all(&reports);
    print_summary(&summary);
    Ok(())
}

fn run_stats(data_dir: &Path) -> anyhow::Result<()> {
    let (_, store) = open_store(data_dir)?;
    print_stats(&store.get_stats()?);
    Ok(())
}

fn print_summary(summary: &ImportSummary) {
    println!("=== LabData Import ===");
    println!();
    println!("Files seen:         {}", summary.files_seen);
    println!("Imported:           {}", summary.imported);
    println!("Records written:    {}", summary.records_written);
    println!("Unrecognized:       {}", summary.unrecognized);
    println!("Already imported:   {}", summary.skipped);
    println!("Failed:             {}", summary.failed);
}

fn print_stats(stats: &StoreStats) {
    println!("=== LabData Store ===");
    println!();
    println!("Database:           {} ({:.2} MB)", stats.db_path, stats.db_size_mb);
    println!("Files:              {}", stats.total_files);
    println!("Files w/o records:  {}", stats.empty_files);
    println!("Measurements:       {}", stats.total_measurements);

    if !stats.by_family.is_empty() {
        println!();
        println!("By report family:");
        for f in &stats.by_family {
            println!("  - {:<20} {} files, {} records", f.family, f.files, f.records);
        }
    }
}
