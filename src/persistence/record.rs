//! Line format of persisted entries
//!
//! One entry per line, seven tab-separated fields:
//!
//! ```text
//! Timestamp \t Level \t Kind \t Category \t EventId \t Message \t Exception
//! ```
//!
//! Field text is escaped so that an entry can never span or split lines.

use crate::core::{LogEntry, LogKind, LogLevel, Result, StoreError};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const FIELD_COUNT: usize = 7;

/// Escape backslash, tab, CR and LF so field text stays on one line
fn escape_field(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
}

fn unescape_field(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Render one entry as a record line, including the trailing newline.
pub fn format_record(entry: &LogEntry) -> String {
    let mut line = String::with_capacity(96);
    line.push_str(&entry.timestamp().to_rfc3339_opts(SecondsFormat::Millis, true));
    line.push('\t');
    line.push_str(entry.level().to_str());
    line.push('\t');
    line.push_str(entry.kind().to_str());
    line.push('\t');
    escape_field(entry.category(), &mut line);
    line.push('\t');
    line.push_str(&entry.event_id().to_string());
    line.push('\t');
    if let Some(message) = entry.message() {
        escape_field(message, &mut line);
    }
    line.push('\t');
    if let Some(exception) = entry.exception() {
        escape_field(exception, &mut line);
    }
    line.push('\n');
    line
}

/// Parse one record line (without its newline). `line_no` is only used in errors.
pub fn parse_record(line: &str, line_no: usize) -> Result<LogEntry> {
    let fields: Vec<&str> = line.trim_end_matches(&['\r', '\n'][..]).split('\t').collect();
    if fields.len() != FIELD_COUNT {
        return Err(StoreError::record_parse(
            line_no,
            format!("expected {} fields, found {}", FIELD_COUNT, fields.len()),
        ));
    }

    let timestamp = DateTime::parse_from_rfc3339(fields[0])
        .map_err(|e| StoreError::record_parse(line_no, format!("bad timestamp: {}", e)))?
        .with_timezone(&Utc);
    let level: LogLevel = fields[1]
        .parse()
        .map_err(|e: String| StoreError::record_parse(line_no, e))?;
    let kind: LogKind = fields[2]
        .parse()
        .map_err(|e: String| StoreError::record_parse(line_no, e))?;
    let event_id: i32 = fields[4]
        .parse()
        .map_err(|e| StoreError::record_parse(line_no, format!("bad event id: {}", e)))?;

    let mut entry = LogEntry::new(level, kind, unescape_field(fields[3]))
        .with_event_id(event_id)
        .with_timestamp(timestamp);
    if !fields[5].is_empty() {
        entry = entry.with_message(unescape_field(fields[5]));
    }
    if !fields[6].is_empty() {
        entry = entry.with_exception(unescape_field(fields[6]));
    }
    Ok(entry)
}

/// Read every record of a persisted file, oldest first.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<LogEntry>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        StoreError::io_operation(
            "reading records",
            format!("Failed to open '{}'", path.display()),
            e,
        )
    })?;

    let mut entries = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        entries.push(parse_record(&line, idx + 1)?);
    }
    Ok(entries)
}
