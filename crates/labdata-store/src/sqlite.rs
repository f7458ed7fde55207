//! SQLite-backed measurement store.
//!
//! Holds one flat `measurements` row per extracted record plus an
//! `imported_files` marker per finished file. Both are written in a single
//! transaction per file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::schema::{IMPORTED_FILES_SQL, SCHEMA_SQL};
use crate::sink::MeasurementSink;
use crate::types::*;
use labdata_core::{Error, Result};

const INSERT_MEASUREMENT_SQL: &str = "INSERT INTO measurements (\
     file_path, file_name, report_family, part_type, part_model, sub_area, line_no, \
     process_no, item_no, shift, piece, cavity, operator_initials, file_date, \
     group_id, label, element, value, spec, nominal, upper_offset, lower_offset, \
     upper_limit, lower_limit, deviation, flag, imported_at) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, \
     ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27)";

/// SQLite store for extracted measurements.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open or create the SQLite store.
    ///
    /// `db_dir` is the directory (e.g., `data/db/`). The file will be `db_dir/labdata.db`.
    pub fn open(db_dir: impl AsRef<Path>) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join("labdata.db");

        let conn = Self::create_connection(&db_path)?;
        Self::init_schema(&conn)?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
        };

        info!(
            "SqliteStore initialized: {} files, {} measurements, path={}",
            store.count_files()?,
            store.count_measurements()?,
            store.db_path.display()
        );

        Ok(store)
    }

    fn create_connection(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path).map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA cache_size = -16384;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(conn)
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        let full_schema = format!("{}\n{}", SCHEMA_SQL, IMPORTED_FILES_SQL);
        conn.execute_batch(&full_schema)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------

    /// Insert one file's records and its processed marker in one transaction.
    pub fn insert_file(
        &self,
        context: &FileContext,
        family: ReportFamily,
        records: &[MeasurementRecord],
    ) -> Result<usize> {
        let now = now_millis();
        let file_date = context.report_date.format(DATE_FORMAT).to_string();

        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| Error::Database(e.to_string()))?;
        {
            let mut stmt = tx
                .prepare_cached(INSERT_MEASUREMENT_SQL)
                .map_err(|e| Error::Database(e.to_string()))?;
            for record in records {
                stmt.execute(params![
                    context.file_path,
                    context.file_name,
                    family.as_str(),
                    context.part_type,
                    context.model,
                    context.sub_area,
                    context.line_no,
                    context.process,
                    context.item_no,
                    context.shift,
                    context.piece,
                    context.cavity,
                    context.operator_initials,
                    file_date,
                    record.group_id,
                    record.label,
                    record.element,
                    record.value,
                    record.spec,
                    record.nominal,
                    record.upper_offset,
                    record.lower_offset,
                    record.upper_limit,
                    record.lower_limit,
                    record.deviation,
                    record.flag,
                    now,
                ])
                .map_err(|e| Error::Database(e.to_string()))?;
            }
        }
        tx.execute(
            "INSERT OR REPLACE INTO imported_files \
             (file_path, report_family, record_count, imported_at) VALUES (?1, ?2, ?3, ?4)",
            params![context.file_path, family.as_str(), records.len() as i64, now],
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        tx.commit().map_err(|e| Error::Database(e.to_string()))?;

        debug!(
            "Stored {} {} records for {}",
            records.len(),
            family,
            context.file_path
        );
        Ok(records.len())
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    /// Distinct paths of every file already imported.
    pub fn get_known_file_paths(&self) -> Result<HashSet<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT file_path FROM imported_files \
                 UNION SELECT DISTINCT file_path FROM measurements",
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| Error::Database(e.to_string()))?;
        rows.collect::<std::result::Result<HashSet<_>, _>>()
            .map_err(|e| Error::Database(e.to_string()))
    }

    /// All measurements extracted from one file, in extraction order.
    pub fn measurements_for_file(&self, file_path: &str) -> Result<Vec<MeasurementRow>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT * FROM measurements WHERE file_path = ?1 ORDER BY id ASC")
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![file_path], |row| Ok(Self::row_to_measurement(row)))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Count stored measurements.
    pub fn count_measurements(&self) -> Result<i64> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM measurements", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count)
    }

    /// Count imported files, including those with no records.
    pub fn count_files(&self) -> Result<i64> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM imported_files", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count)
    }

    // ---------------------------------------------------------------
    // Stats
    // ---------------------------------------------------------------

    /// Get store statistics.
    pub fn get_stats(&self) -> Result<StoreStats> {
        let total_measurements = self.count_measurements()?;
        let total_files = self.count_files()?;

        let conn = self.conn.lock();
        let empty_files: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM imported_files WHERE record_count = 0",
                [],
                |row| row.get(0),
            )
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut stmt = conn
            .prepare_cached(
                "SELECT report_family, COUNT(*), COALESCE(SUM(record_count), 0) \
                 FROM imported_files GROUP BY report_family ORDER BY report_family",
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        let by_family: Vec<FamilyCount> = stmt
            .query_map([], |row| {
                Ok(FamilyCount {
                    family: ReportFamily::parse(&row.get::<_, String>(0)?),
                    files: row.get(1)?,
                    records: row.get(2)?,
                })
            })
            .map_err(|e| Error::Database(e.to_string()))?
            .filter_map(|r| r.ok())
            .collect();
        drop(stmt);
        drop(conn);

        let db_size = std::fs::metadata(&self.db_path)
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(StoreStats {
            total_measurements,
            total_files,
            empty_files,
            by_family,
            db_path: self.db_path.to_string_lossy().to_string(),
            db_size_mb: db_size as f64 / (1024.0 * 1024.0),
        })
    }

    // ---------------------------------------------------------------
    // Row Mapping Helpers
    // ---------------------------------------------------------------

    fn row_to_measurement(row: &rusqlite::Row<'_>) -> MeasurementRow {
        let text = |col: &str| -> String {
            row.get::<_, Option<String>>(col)
                .ok()
                .flatten()
                .unwrap_or_default()
        };
        let number = |col: &str| -> Option<f64> { row.get(col).ok().flatten() };

        let report_date = row
            .get::<_, Option<String>>("file_date")
            .ok()
            .flatten()
            .and_then(|s| NaiveDateTime::parse_from_str(&s, DATE_FORMAT).ok())
            .unwrap_or_default();

        MeasurementRow {
            id: row.get("id").unwrap_or(0),
            family: ReportFamily::parse(&text("report_family")),
            context: FileContext {
                file_path: text("file_path"),
                file_name: text("file_name"),
                part_type: text("part_type"),
                model: text("part_model"),
                sub_area: text("sub_area"),
                line_no: text("line_no"),
                process: text("process_no"),
                item_no: text("item_no"),
                shift: text("shift"),
                piece: text("piece"),
                cavity: text("cavity"),
                operator_initials: text("operator_initials"),
                report_date,
            },
            record: MeasurementRecord {
                group_id: text("group_id"),
                label: text("label"),
                element: row.get("element").ok().flatten(),
                value: row.get("value").unwrap_or(0.0),
                spec: number("spec"),
                nominal: number("nominal"),
                upper_offset: number("upper_offset"),
                lower_offset: number("lower_offset"),
                upper_limit: number("upper_limit"),
                lower_limit: number("lower_limit"),
                deviation: number("deviation"),
                flag: row.get("flag").ok().flatten(),
            },
            imported_at: row.get("imported_at").unwrap_or(0),
        }
    }
}

impl MeasurementSink for SqliteStore {
    fn known_file_paths(&self) -> Result<HashSet<String>> {
        self.get_known_file_paths()
    }

    fn write_file(
        &self,
        context: &FileContext,
        family: ReportFamily,
        records: &[MeasurementRecord],
    ) -> Result<usize> {
        self.insert_file(context, family, records)
    }
}

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
