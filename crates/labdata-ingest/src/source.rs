//! Report content loading.
//!
//! Decoding page-description documents is the renderer's job. This module
//! only receives its output (positioned words or plain text per page) and
//! reads delimited CMM exports directly.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::layout::{LineReconstructor, Word};
use labdata_core::{Error, Result};

/// Supported report file types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// CMM semicolon-delimited export.
    Asc,
    /// Rendered instrument printout; words come from a sidecar dump.
    Pdf,
    /// Plain text already extracted from a printout.
    PlainText,
    Unknown,
}

impl FileType {
    /// Detect file type from extension.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "asc" => Self::Asc,
            "pdf" => Self::Pdf,
            "txt" => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// Whether a directory scan should pick this file up.
    pub fn is_report(&self) -> bool {
        matches!(self, Self::Asc | Self::Pdf)
    }
}

/// One rendered page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub words: Vec<Word>,
    /// Renderer's own text layout, when it supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Page {
    pub fn from_words(width: f64, height: f64, words: Vec<Word>) -> Self {
        Self {
            width,
            height,
            words,
            text: None,
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Words lying entirely inside the top-left `fx` × `fy` fraction of the
    /// page. A page without known dimensions is returned uncropped.
    pub fn crop_top_left(&self, fx: f64, fy: f64) -> Vec<Word> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return self.words.clone();
        }
        let max_x = self.width * fx;
        let max_y = self.height * fy;
        self.words
            .iter()
            .filter(|w| w.x0 >= 0.0 && w.x1 <= max_x && w.top >= 0.0 && w.top <= max_y)
            .cloned()
            .collect()
    }

    /// Page text: reconstructed from words when present, otherwise the
    /// renderer's text.
    pub fn text(&self, reconstructor: &LineReconstructor) -> String {
        if !self.words.is_empty() {
            return reconstructor.reconstruct(&self.words).text();
        }
        self.text.clone().unwrap_or_default()
    }
}

/// Everything the association engine gets to see of one file.
#[derive(Debug, Clone)]
pub enum ReportContent {
    Pages(Vec<Page>),
    Delimited(String),
}

impl ReportContent {
    pub fn pages(&self) -> &[Page] {
        match self {
            Self::Pages(pages) => pages,
            Self::Delimited(_) => &[],
        }
    }

    /// Whether any page carries positioned words.
    pub fn has_words(&self) -> bool {
        self.pages().iter().any(|p| !p.words.is_empty())
    }

    /// Whether pages carry only renderer text, no positioned words.
    pub fn is_text_only(&self) -> bool {
        !self.has_words()
            && self
                .pages()
                .iter()
                .any(|p| p.text.as_deref().is_some_and(|t| !t.trim().is_empty()))
    }

    /// Text of the first page, used for the report header date.
    pub fn header_text(&self, reconstructor: &LineReconstructor) -> Option<String> {
        self.pages()
            .first()
            .map(|p| p.text(reconstructor))
            .filter(|t| !t.trim().is_empty())
    }
}

/// Turns a file path into report content.
pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<ReportContent>;
}

/// Loads `.asc` files directly and printouts from the renderer's
/// `<file>.words.json` sidecar.
#[derive(Debug, Clone, Copy, Default)]
pub struct SidecarLoader;

impl SidecarLoader {
    /// Where the renderer leaves the word dump for `path`.
    pub fn sidecar_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(".words.json");
        PathBuf::from(name)
    }
}

impl DocumentLoader for SidecarLoader {
    fn load(&self, path: &Path) -> Result<ReportContent> {
        match FileType::from_path(path) {
            FileType::Asc => {
                // Exports carry stray bytes from the instrument PC's code page.
                let bytes = std::fs::read(path)?;
                Ok(ReportContent::Delimited(
                    String::from_utf8_lossy(&bytes).into_owned(),
                ))
            }
            FileType::Pdf => {
                let sidecar = Self::sidecar_path(path);
                if !sidecar.exists() {
                    return Err(Error::Ingest(format!(
                        "No rendered page words for {}",
                        path.display()
                    )));
                }
                let pages: Vec<Page> = serde_json::from_str(&std::fs::read_to_string(&sidecar)?)?;
                debug!("Loaded {} pages from {}", pages.len(), sidecar.display());
                Ok(ReportContent::Pages(pages))
            }
            FileType::PlainText => {
                let text = std::fs::read_to_string(path)?;
                Ok(ReportContent::Pages(vec![Page::from_text(text)]))
            }
            FileType::Unknown => Err(Error::UnsupportedLayout(format!(
                "Unknown file type: {}",
                path.display()
            ))),
        }
    }
}
