use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

use crate::error::{LogSinkError, Result};
use crate::record::LogRecord;

/// Pad placed in front of continuation lines (message, exception).
const MESSAGE_PADDING: &str = "    ";

/// Text layout produced by the file sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextFormat {
    /// Header and message on one line; an exception goes on a second line.
    #[default]
    Default,
    /// Header line, then the message and the exception on their own lines.
    MultiLines,
}

/// Formatting switches taken from the file sink configuration.
#[derive(Debug, Clone, Copy)]
pub struct FormatOptions<'a> {
    pub layout: TextFormat,
    pub timestamp_format: Option<&'a str>,
    pub include_category: bool,
}

/// Render `ts` with a strftime pattern.
///
/// Invalid patterns are reported as configuration errors instead of
/// panicking inside `Display`.
pub fn format_timestamp(ts: &DateTime<Local>, pattern: &str) -> Result<String> {
    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(LogSinkError::config(format!(
            "invalid timestamp format `{}`",
            pattern
        )));
    }
    Ok(ts.format_with_items(items.into_iter()).to_string())
}

/// A blank pattern falls back to the default `Display` form; the timestamp
/// is never omitted.
fn render_timestamp(ts: &DateTime<Local>, pattern: Option<&str>) -> Result<String> {
    match pattern {
        Some(p) if !p.trim().is_empty() => format_timestamp(ts, p),
        _ => Ok(ts.to_string()),
    }
}

fn write_header(out: &mut String, record: &LogRecord, opts: &FormatOptions<'_>) -> Result<()> {
    out.push_str(&render_timestamp(&record.created_at, opts.timestamp_format)?);
    out.push_str("> [");
    out.push_str(record.level.as_str());
    if opts.include_category {
        out.push_str(" - ");
        out.push_str(&record.category);
    }
    out.push(']');
    Ok(())
}

fn push_continuation(out: &mut String, text: impl std::fmt::Display) {
    out.push('\n');
    out.push_str(MESSAGE_PADDING);
    // Writing into a String cannot fail.
    let _ = write!(out, " {}", text);
}

/// Turn a record into the text appended to the log file (without the
/// trailing newline).
pub fn format_record(record: &LogRecord, opts: &FormatOptions<'_>) -> Result<String> {
    let mut out = String::with_capacity(64 + record.message.len());
    write_header(&mut out, record, opts)?;

    match opts.layout {
        TextFormat::Default => {
            out.push(' ');
            out.push_str(&record.message);
        }
        TextFormat::MultiLines => {
            if !record.message.is_empty() {
                push_continuation(&mut out, &record.message);
            }
        }
    }

    if let Some(exception) = &record.exception {
        push_continuation(&mut out, exception);
    }

    Ok(out)
}

/// Expand the timestamp token of a file name pattern.
///
/// The text between the first and the last `%` is a strftime pattern and
/// is replaced by `now` rendered with it; the delimiting `%` signs are
/// removed. `app-%%Y%m%d%.log` becomes `app-20240131.log`.
pub fn expand_file_name(pattern: &str, now: &DateTime<Local>) -> Result<String> {
    let (Some(start), Some(end)) = (pattern.find('%'), pattern.rfind('%')) else {
        return Ok(pattern.to_string());
    };

    if start == end {
        return Ok(pattern.replace('%', ""));
    }

    let token = &pattern[start + 1..end];
    let rendered = if token.is_empty() {
        String::new()
    } else {
        format_timestamp(now, token)?
    };

    Ok(format!(
        "{}{}{}",
        &pattern[..start],
        rendered.replace('%', ""),
        &pattern[end + 1..]
    ))
}
