//! Database schema SQL.

/// One flat row per extracted measurement. Every report family converges on
/// this shape.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS measurements (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_path TEXT NOT NULL,
    file_name TEXT,
    report_family TEXT NOT NULL,
    part_type TEXT,
    part_model TEXT,
    sub_area TEXT,
    line_no TEXT,
    process_no TEXT,
    item_no TEXT,
    shift TEXT,
    piece TEXT,
    cavity TEXT,
    operator_initials TEXT,
    file_date TEXT,
    group_id TEXT,
    label TEXT NOT NULL,
    element TEXT,
    value REAL NOT NULL,
    spec REAL,
    nominal REAL,
    upper_offset REAL,
    lower_offset REAL,
    upper_limit REAL,
    lower_limit REAL,
    deviation REAL,
    flag TEXT,
    imported_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_measurements_file ON measurements(file_path);
CREATE INDEX IF NOT EXISTS idx_measurements_model_date ON measurements(part_model, file_date);
CREATE INDEX IF NOT EXISTS idx_measurements_label ON measurements(label);
"#;

/// Every file the importer has finished, including files that produced no
/// records, so they are not re-read on the next scan.
pub const IMPORTED_FILES_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS imported_files (
    file_path TEXT PRIMARY KEY,
    report_family TEXT NOT NULL,
    record_count INTEGER NOT NULL,
    imported_at INTEGER NOT NULL
);
"#;
