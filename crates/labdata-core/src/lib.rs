//! LabData Core — error taxonomy, extraction settings, data directory layout.

pub mod config;
pub mod error;

pub use config::{DataPaths, ExtractionSettings, LabDataConfig};
pub use error::{Error, Result};
