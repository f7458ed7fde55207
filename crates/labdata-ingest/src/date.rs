//! Report date resolution.
//!
//! Strategies run in order and each one validates its own calendar result:
//! the printed header date, then a timestamp encoded in the filename digits,
//! then the file's modification time. Resolution never fails.

use std::path::Path;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

/// `Date 2025/12/30`, `Date 2025-12-30` or `Date 20251230`.
static LABELED_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bDate\s+([0-9]{4})[/-]?([0-9]{2})[/-]?([0-9]{2})").unwrap());

/// Unlabeled `2025/12/30` printed somewhere in the header block.
static BARE_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([0-9]{4})/([0-9]{2})/([0-9]{2})\b").unwrap());

static DIGIT_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]{10,12}").unwrap());

/// Which strategy produced a report date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    Header,
    FileName,
    FileModified,
    /// Nothing else worked, not even file metadata.
    Now,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDate {
    pub timestamp: NaiveDateTime,
    pub source: DateSource,
}

/// Date printed in the report header, at midnight.
///
/// The labeled form wins over a bare date. Only the first occurrence of each
/// form is considered.
pub fn header_date(text: &str) -> Option<NaiveDateTime> {
    [&*LABELED_DATE_RE, &*BARE_DATE_RE]
        .into_iter()
        .find_map(|re| {
            let caps = re.captures(text)?;
            let year = caps[1].parse().ok()?;
            let month = caps[2].parse().ok()?;
            let day = caps[3].parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)
        })
}

/// Timestamp encoded as a 10–12 digit run in a filename.
pub fn filename_timestamp(file_name: &str) -> Option<NaiveDateTime> {
    DIGIT_RUN_RE
        .find(file_name)
        .and_then(|m| decode_digit_run(m.as_str()))
}

/// Decode `YYYY <mid> mm`, where the middle segment's length decides the
/// month/day/hour widths:
///
/// | mid | month | day | hour |
/// |-----|-------|-----|------|
/// | 4   | 1     | 2   | 1    |
/// | 5   | 1     | 2   | 2    |
/// | 6   | 2     | 2   | 2    |
///
/// `20251101321` decodes to 2025-01-10 13:21.
pub fn decode_digit_run(digits: &str) -> Option<NaiveDateTime> {
    if !(10..=12).contains(&digits.len()) || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let num = |s: &str| s.parse::<u32>().ok();

    let year: i32 = digits[..4].parse().ok()?;
    let minute = num(&digits[digits.len() - 2..])?;
    let mid = &digits[4..digits.len() - 2];

    let (month, day, hour) = match mid.len() {
        4 | 5 => (num(&mid[..1])?, num(&mid[1..3])?, num(&mid[3..])?),
        6 => (num(&mid[..2])?, num(&mid[2..4])?, num(&mid[4..])?),
        _ => return None,
    };

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)
}

/// Local last-modified time of a file.
pub fn modified_timestamp(path: &Path) -> Option<NaiveDateTime> {
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(DateTime::<Local>::from(modified).naive_local())
}

/// Resolve a report's date from its header text, filename and file metadata.
pub fn resolve_report_date(header_text: Option<&str>, path: &Path) -> ResolvedDate {
    if let Some(timestamp) = header_text.and_then(header_date) {
        return ResolvedDate {
            timestamp,
            source: DateSource::Header,
        };
    }

    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if let Some(timestamp) = filename_timestamp(file_name) {
        return ResolvedDate {
            timestamp,
            source: DateSource::FileName,
        };
    }

    if let Some(timestamp) = modified_timestamp(path) {
        debug!("Using modification time for {}", path.display());
        return ResolvedDate {
            timestamp,
            source: DateSource::FileModified,
        };
    }

    warn!("No usable date for {}, using current time", path.display());
    ResolvedDate {
        timestamp: Local::now().naive_local(),
        source: DateSource::Now,
    }
}
