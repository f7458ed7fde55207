//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Paths to all LabData data files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Measurement database directory (`data/db/`).
    pub db: PathBuf,
    /// Optional extraction settings override (`data/labdata.json`).
    pub settings_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            db: root.join("db"),
            settings_file: root.join("labdata.json"),
            root,
        };
        std::fs::create_dir_all(&paths.db)?;
        Ok(paths)
    }
}

/// Tunables for the report extraction engine.
///
/// Every field has a default matching the lab's current report layouts, so a
/// `labdata.json` only needs to name the values it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    /// Words whose baselines differ by less than this merge into one line.
    pub baseline_tolerance: f64,
    /// Spec applied to every prefix-line (LINE folder) measurement.
    pub line_spec: f64,
    /// Spec used by journal reports when a line carries no spec column.
    pub journal_spec: f64,
    /// Lines searched for a spec number, counting the `Spec` line itself.
    pub spec_lookahead: usize,
    /// Cavity tokens are truncated to this many characters.
    pub cavity_length: usize,
    /// Width and height fractions of page 1 read by roughness summaries.
    pub summary_crop: (f64, f64),
    /// Rear cover model tokens, matched anywhere in the path.
    pub rear_cover_models: Vec<String>,
    /// Cam housing model tokens, most specific first.
    pub cam_housing_models: Vec<String>,
    /// Short directory tokens mapped to a canonical model, e.g. `967` -> `967K`.
    pub model_aliases: Vec<(String, String)>,
    /// Directory names treated as sub-areas in addition to `LINE n` folders.
    pub sub_areas: Vec<String>,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            baseline_tolerance: 1.0,
            line_spec: 0.63,
            journal_spec: 0.63,
            spec_lookahead: 4,
            cavity_length: 3,
            summary_crop: (0.75, 0.5),
            rear_cover_models: strings(&["031C", "967K", "T324"]),
            cam_housing_models: strings(&[
                "A25 CH Gas",
                "A25 CH Hybrid",
                "V6T LH CH Hybrid",
                "V6T LH CH",
                "V6T RH CH Gas",
                "2.4L CH",
                "A25 CH",
                "M20 CH",
                "2GR KAI CH",
                "V6T CH",
            ]),
            model_aliases: vec![
                ("967".to_string(), "967K".to_string()),
                ("031".to_string(), "031C".to_string()),
            ],
            sub_areas: strings(&["ASSY"]),
        }
    }
}

impl ExtractionSettings {
    /// Read settings from a JSON file. Keys the file omits keep their
    /// defaults.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| crate::Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load settings from a JSON file, falling back to defaults when the file
    /// is absent or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            warn!("Ignoring settings file: {}", e);
            Self::default()
        })
    }
}

/// Top-level LabData configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabDataConfig {
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// Extraction engine tunables.
    pub settings: ExtractionSettings,
    /// Log a progress line every N imported files.
    pub progress_every: usize,
}

impl LabDataConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let progress_every = std::env::var("LABDATA_PROGRESS_EVERY")
            .ok()
            .and_then(|p| p.parse().ok())
            .filter(|n: &usize| *n > 0)
            .unwrap_or(50);

        let data_paths = DataPaths::new(data_dir)?;
        let settings = ExtractionSettings::load_or_default(&data_paths.settings_file);

        Ok(Self {
            data_paths,
            settings,
            progress_every,
        })
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
