use chrono::{Local, NaiveTime};
use std::fs;
use std::path::Path;

use log_sink_providers::config::ConfigChannel;
use log_sink_providers::file::{FileSink, FileSinkConfig};
use log_sink_providers::format::TextFormat;
use log_sink_providers::{Fault, LogLevel, LogSinkError, LoggerProvider};

const CATEGORY: &str = "FileSinkTests";
const TIMESTAMP_FORMAT: &str = "%H:%M:%S";

fn config(dir: &Path, file_name: &str) -> FileSinkConfig {
    FileSinkConfig {
        file_path: dir.to_string_lossy().into_owned(),
        file_name_format: file_name.to_string(),
        timestamp_format: Some(TIMESTAMP_FORMAT.to_string()),
        ..Default::default()
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

/// `HH:MM:SS` followed by exactly `rest`.
fn has_time_prefix(line: &str, rest: &str) -> bool {
    line.len() > 8
        && NaiveTime::parse_from_str(&line[..8], TIMESTAMP_FORMAT).is_ok()
        && &line[8..] == rest
}

fn log_three(provider: &LoggerProvider<FileSink>) {
    let logger = provider.get_logger(CATEGORY).unwrap();
    logger.log(LogLevel::Information, "Log information").unwrap();
    logger.log(LogLevel::Error, "Log error").unwrap();
    logger.log(LogLevel::Warning, "Log warning").unwrap();
}

#[test]
fn default_format_without_category() {
    let dir = tempfile::tempdir().unwrap();
    let provider = LoggerProvider::with_config(FileSink::new(), config(dir.path(), "test1.txt"));

    log_three(&provider);

    let lines = read_lines(&dir.path().join("test1.txt"));
    assert_eq!(lines.len(), 3);
    assert!(has_time_prefix(&lines[0], "> [INFORMATION] Log information"), "{}", lines[0]);
    assert!(has_time_prefix(&lines[1], "> [ERROR] Log error"), "{}", lines[1]);
    assert!(has_time_prefix(&lines[2], "> [WARNING] Log warning"), "{}", lines[2]);
}

#[test]
fn default_format_with_category() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path(), "test2.txt");
    cfg.include_category = true;
    let provider = LoggerProvider::with_config(FileSink::new(), cfg);

    log_three(&provider);

    let lines = read_lines(&dir.path().join("test2.txt"));
    assert_eq!(lines.len(), 3);
    assert!(has_time_prefix(
        &lines[0],
        &format!("> [INFORMATION - {}] Log information", CATEGORY)
    ));
    assert!(lines[1].contains(&format!("[ERROR - {}]", CATEGORY)));
    assert!(lines[2].contains(&format!("[WARNING - {}]", CATEGORY)));
}

#[test]
fn multi_lines_format_with_category() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path(), "test4.txt");
    cfg.include_category = true;
    cfg.format = TextFormat::MultiLines;
    let provider = LoggerProvider::with_config(FileSink::new(), cfg);

    provider
        .get_logger(CATEGORY)
        .unwrap()
        .log(LogLevel::Error, "Log error")
        .unwrap();

    let lines = read_lines(&dir.path().join("test4.txt"));
    assert_eq!(lines.len(), 2);
    assert!(has_time_prefix(&lines[0], &format!("> [ERROR - {}]", CATEGORY)));
    assert!(lines[1].starts_with("    "));
    assert!(lines[1].contains("Log error"));
}

#[test]
fn multi_lines_format_puts_headers_on_even_lines() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path(), "test3.txt");
    cfg.format = TextFormat::MultiLines;
    let provider = LoggerProvider::with_config(FileSink::new(), cfg);

    log_three(&provider);

    let lines = read_lines(&dir.path().join("test3.txt"));
    assert_eq!(lines.len(), 6);
    let headers: Vec<&String> = lines.iter().step_by(2).collect();
    assert!(has_time_prefix(headers[0], "> [INFORMATION]"));
    assert!(has_time_prefix(headers[1], "> [ERROR]"));
    assert!(has_time_prefix(headers[2], "> [WARNING]"));
}

#[test]
fn empty_timestamp_format_renders_default_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path(), "test5.txt");
    cfg.include_category = true;
    cfg.timestamp_format = Some(String::new());
    let provider = LoggerProvider::with_config(FileSink::new(), cfg);

    log_three(&provider);

    let lines = read_lines(&dir.path().join("test5.txt"));
    assert_eq!(lines.len(), 3);
    for line in &lines {
        assert!(NaiveTime::parse_from_str(&line[..8], TIMESTAMP_FORMAT).is_err());
        let (timestamp, _) = line.split_once("> [").unwrap();
        assert!(!timestamp.trim().is_empty());
    }
    assert!(lines[0].contains(&format!("[INFORMATION - {}]", CATEGORY)));
}

#[test]
fn exception_adds_indented_line_in_default_format() {
    let dir = tempfile::tempdir().unwrap();
    let provider = LoggerProvider::with_config(FileSink::new(), config(dir.path(), "faults.txt"));
    let fault = Fault::new("disk full").with_source("storage");

    provider
        .get_logger(CATEGORY)
        .unwrap()
        .log_fault(LogLevel::Critical, "Write failed", &fault)
        .unwrap();

    let lines = read_lines(&dir.path().join("faults.txt"));
    assert_eq!(lines.len(), 2);
    assert!(has_time_prefix(&lines[0], "> [CRITICAL] Write failed"));
    assert_eq!(lines[1], "     storage: disk full");
}

#[test]
fn file_name_token_is_expanded_and_directory_created() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("nested").join("logs");
    let provider = LoggerProvider::with_config(FileSink::new(), config(&nested, "app-%%Y%m%d%.log"));

    provider
        .get_logger(CATEGORY)
        .unwrap()
        .log(LogLevel::Information, "hello")
        .unwrap();

    let expected = nested.join(format!("app-{}.log", Local::now().format("%Y%m%d")));
    assert!(expected.is_file(), "missing {}", expected.display());
}

#[test]
fn configuration_change_applies_to_next_write() {
    let dir = tempfile::tempdir().unwrap();
    let channel = ConfigChannel::new(config(dir.path(), "before.txt"));
    let provider = LoggerProvider::new(FileSink::new(), &channel);
    let logger = provider.get_logger(CATEGORY).unwrap();

    logger.log(LogLevel::Information, "first").unwrap();

    let mut updated = config(dir.path(), "after.txt");
    updated.include_category = true;
    channel.publish(updated);
    logger.log(LogLevel::Information, "second").unwrap();

    assert_eq!(read_lines(&dir.path().join("before.txt")).len(), 1);
    let after = read_lines(&dir.path().join("after.txt"));
    assert_eq!(after.len(), 1);
    assert!(after[0].contains(&format!("[INFORMATION - {}] second", CATEGORY)));
}

#[test]
fn blank_file_name_fails_the_write() {
    let dir = tempfile::tempdir().unwrap();
    let provider = LoggerProvider::with_config(FileSink::new(), config(dir.path(), ""));

    let err = provider
        .get_logger(CATEGORY)
        .unwrap()
        .log(LogLevel::Information, "lost")
        .unwrap_err();
    assert!(matches!(err, LogSinkError::Configuration(_)));
}

#[test]
fn empty_message_without_fault_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let provider = LoggerProvider::with_config(FileSink::new(), config(dir.path(), "empty.txt"));

    provider
        .get_logger(CATEGORY)
        .unwrap()
        .log(LogLevel::Information, "")
        .unwrap();

    assert!(!dir.path().join("empty.txt").exists());
}
