//! Environment variable names used by this crate for convenient
//! configuration of sinks from services.
//!
//! These are purely helpers; the sink types remain decoupled from
//! environment access.

use crate::document::DocumentSinkConfig;
use crate::error::{LogSinkError, Result};
use crate::file::FileSinkConfig;
use crate::format::TextFormat;
use crate::relational::RelationalSinkConfig;

/// Directory of the text log file.
pub const LOG_SINK_FILE_PATH_ENV: &str = "LOG_SINK_FILE_PATH";

/// File name pattern, e.g. `app-%%Y%m%d%.log`.
pub const LOG_SINK_FILE_NAME_ENV: &str = "LOG_SINK_FILE_NAME";

/// strftime pattern for line timestamps.
pub const LOG_SINK_TIMESTAMP_FORMAT_ENV: &str = "LOG_SINK_TIMESTAMP_FORMAT";

/// `true` to include the category in text lines.
pub const LOG_SINK_INCLUDE_CATEGORY_ENV: &str = "LOG_SINK_INCLUDE_CATEGORY";

/// `Default` or `MultiLines`.
pub const LOG_SINK_TEXT_FORMAT_ENV: &str = "LOG_SINK_TEXT_FORMAT";

/// `true` to root relative file paths under the local data directory.
pub const LOG_SINK_USE_LOCAL_PATH_ENV: &str = "LOG_SINK_USE_LOCAL_PATH";

/// Namespace under the local data directory.
pub const LOG_SINK_APP_NAME_ENV: &str = "LOG_SINK_APP_NAME";

/// Connection reference of the relational sink.
pub const LOG_SINK_DB_SOURCE_ENV: &str = "LOG_SINK_DB_SOURCE";

/// `true` to create the log table before the first insert.
pub const LOG_SINK_ENSURE_TABLE_ENV: &str = "LOG_SINK_ENSURE_TABLE_CREATED";

/// Logical source of the document sink.
pub const LOG_SINK_DOCUMENT_SOURCE_ENV: &str = "LOG_SINK_DOCUMENT_SOURCE";

/// Collection of the document sink.
pub const LOG_SINK_DOCUMENT_COLLECTION_ENV: &str = "LOG_SINK_DOCUMENT_COLLECTION";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a boolean flag; unset means `false`.
pub fn env_flag(key: &str) -> Result<bool> {
    match env_opt(key) {
        None => Ok(false),
        Some(v) => parse_flag(&v)
            .ok_or_else(|| LogSinkError::config(format!("{} must be a boolean, got `{}`", key, v))),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_text_format(value: &str) -> Result<TextFormat> {
    match value.trim().to_ascii_lowercase().as_str() {
        "default" => Ok(TextFormat::Default),
        "multilines" | "multi_lines" | "multi-lines" => Ok(TextFormat::MultiLines),
        _ => Err(LogSinkError::config(format!("unknown text format `{}`", value))),
    }
}

impl FileSinkConfig {
    /// Build a file sink configuration from `LOG_SINK_*` variables.
    pub fn from_env() -> Result<Self> {
        Ok(FileSinkConfig {
            file_path: env_or(LOG_SINK_FILE_PATH_ENV, ""),
            use_local_path: env_flag(LOG_SINK_USE_LOCAL_PATH_ENV)?,
            file_name_format: env_or(LOG_SINK_FILE_NAME_ENV, ""),
            timestamp_format: env_opt(LOG_SINK_TIMESTAMP_FORMAT_ENV),
            include_category: env_flag(LOG_SINK_INCLUDE_CATEGORY_ENV)?,
            format: env_opt(LOG_SINK_TEXT_FORMAT_ENV)
                .map(|v| parse_text_format(&v))
                .transpose()?
                .unwrap_or_default(),
            app_name: env_opt(LOG_SINK_APP_NAME_ENV),
        })
    }
}

impl RelationalSinkConfig {
    pub fn from_env() -> Result<Self> {
        Ok(RelationalSinkConfig {
            source: env_opt(LOG_SINK_DB_SOURCE_ENV),
            ensure_table_created: env_flag(LOG_SINK_ENSURE_TABLE_ENV)?,
        })
    }
}

impl DocumentSinkConfig {
    pub fn from_env() -> Self {
        DocumentSinkConfig {
            source: env_opt(LOG_SINK_DOCUMENT_SOURCE_ENV),
            collection: env_opt(LOG_SINK_DOCUMENT_COLLECTION_ENV),
        }
    }
}
