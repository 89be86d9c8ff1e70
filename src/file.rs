use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{LogSinkError, Result};
use crate::format::{expand_file_name, format_record, FormatOptions, TextFormat};
use crate::record::LogRecord;
use crate::sink::LogSink;

/// Configuration for [`FileSink`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSinkConfig {
    /// Directory holding the log file, relative or absolute. Empty means
    /// the current working directory.
    pub file_path: String,
    /// Root a relative `file_path` under the per-user local data
    /// directory. Ignored for absolute paths.
    pub use_local_path: bool,
    /// File name, optionally embedding a `%<strftime>%` token.
    pub file_name_format: String,
    /// strftime pattern for the line timestamp. Blank or unset renders
    /// the timestamp's default form.
    pub timestamp_format: Option<String>,
    pub include_category: bool,
    pub format: TextFormat,
    /// Namespace used under the local data directory. Defaults to the
    /// executable's file stem.
    pub app_name: Option<String>,
}

impl FileSinkConfig {
    fn format_options(&self) -> FormatOptions<'_> {
        FormatOptions {
            layout: self.format,
            timestamp_format: self.timestamp_format.as_deref(),
            include_category: self.include_category,
        }
    }
}

/// Appends formatted records to a text file.
///
/// The file handle is opened and closed on every write; nothing is kept
/// open between calls. Appends from several processes to the same file may
/// interleave.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSink;

impl FileSink {
    pub fn new() -> Self {
        FileSink
    }

    /// Directory the log file lives in, before it is created.
    pub fn resolve_directory(config: &FileSinkConfig) -> Result<PathBuf> {
        let path = PathBuf::from(&config.file_path);
        if config.file_path.is_empty() || path.is_absolute() || !config.use_local_path {
            return Ok(path);
        }

        let root = dirs::data_local_dir().ok_or_else(|| {
            LogSinkError::config("no local data directory is available for use_local_path")
        })?;
        Ok(root.join(app_namespace(config)?).join(path))
    }

    /// Full path of the file the next record goes to.
    pub fn resolve_path(config: &FileSinkConfig, now: &DateTime<Local>) -> Result<PathBuf> {
        let file_name = expand_file_name(&config.file_name_format, now)?;
        if file_name.trim().is_empty() {
            return Err(LogSinkError::config("target log file name is empty"));
        }

        Ok(Self::resolve_directory(config)?.join(file_name))
    }
}

fn app_namespace(config: &FileSinkConfig) -> Result<String> {
    if let Some(name) = config.app_name.as_deref().filter(|n| !n.trim().is_empty()) {
        return Ok(name.to_string());
    }

    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .ok_or_else(|| LogSinkError::config("cannot determine application name for use_local_path"))
}

fn ensure_directory(dir: &Path) -> Result<()> {
    if dir.as_os_str().is_empty() || dir.is_dir() {
        return Ok(());
    }

    std::fs::create_dir_all(dir).map_err(|e| LogSinkError::io(dir, e))?;
    debug!(path = %dir.display(), "created log directory");
    Ok(())
}

impl LogSink for FileSink {
    type Config = FileSinkConfig;
    const ALIAS: &'static str = "TextFile";

    fn write(&self, record: &LogRecord, config: &FileSinkConfig) -> Result<()> {
        let path = Self::resolve_path(config, &record.created_at)?;
        let text = format_record(record, &config.format_options())?;

        if let Some(dir) = path.parent() {
            ensure_directory(dir)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| LogSinkError::io(&path, e))?;
        writeln!(file, "{}", text).map_err(|e| LogSinkError::io(&path, e))
    }
}
