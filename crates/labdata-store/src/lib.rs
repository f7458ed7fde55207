//! LabData Store — measurement record types, the persistence port, and its SQLite adapter.

pub mod schema;
pub mod sink;
pub mod sqlite;
pub mod types;

pub use sink::MeasurementSink;
pub use sqlite::SqliteStore;
pub use types::*;
