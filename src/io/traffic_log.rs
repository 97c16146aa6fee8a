//! Daily CSV traffic log
//!
//! One file per day under the configured logs directory, named from a
//! `{date}` pattern. Each resolved crossing appends a row
//! `date,time,entry_count,exit_count` with 1/0 flags; the header is written
//! when a file is first created. Rotation is keyed on the event's own date so
//! a crossing logged just after midnight opens the new day's file. Dispatching
//! the completed file (email or otherwise) is someone else's job; the previous
//! day's path is exposed for that.

use crate::domain::{EventKind, SinkError, TrafficEvent};
use async_trait::async_trait;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Receives resolved crossings. Must be durable before returning; the
/// resolver does not retry a failed record.
#[async_trait]
pub trait EventSink: Send {
    async fn record(&mut self, event: &TrafficEvent) -> Result<(), SinkError>;
}

struct OpenLog {
    writer: BufWriter<File>,
    path: PathBuf,
    date_key: String,
}

pub struct CsvTrafficLog {
    logs_dir: PathBuf,
    file_name_format: String,
    current: Option<OpenLog>,
    last_completed: Option<PathBuf>,
}

impl CsvTrafficLog {
    pub fn new(logs_dir: impl AsRef<Path>, file_name_format: impl Into<String>) -> Self {
        let logs_dir = logs_dir.as_ref().to_path_buf();
        let file_name_format = file_name_format.into();
        info!(
            logs_dir = %logs_dir.display(),
            file_name_format = %file_name_format,
            "traffic_log_initialized"
        );
        Self { logs_dir, file_name_format, current: None, last_completed: None }
    }

    /// Path of the most recently rotated-out (completed) daily log, if any
    pub fn last_completed_log(&self) -> Option<&Path> {
        self.last_completed.as_deref()
    }

    fn path_for(&self, date_key: &str) -> PathBuf {
        self.logs_dir.join(self.file_name_format.replace("{date}", date_key))
    }

    /// Get the writer for the event's day, rotating if the date key changed
    fn writer_for(&mut self, date_key: &str) -> std::io::Result<&mut OpenLog> {
        let needs_open = match &self.current {
            Some(open) => open.date_key != date_key,
            None => true,
        };

        if needs_open {
            if let Some(mut previous) = self.current.take() {
                previous.writer.flush()?;
                info!(
                    completed = %previous.path.display(),
                    new_date = %date_key,
                    "daily_log_rotated"
                );
                self.last_completed = Some(previous.path);
            }

            fs::create_dir_all(&self.logs_dir)?;
            let path = self.path_for(date_key);
            let is_new = !path.exists();
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            let mut writer = BufWriter::new(file);
            if is_new {
                writeln!(writer, "date,time,entry_count,exit_count")?;
            }
            info!(path = %path.display(), new_file = is_new, "daily_log_opened");

            self.current = Some(OpenLog { writer, path, date_key: date_key.to_string() });
        }

        Ok(self.current.as_mut().unwrap())
    }

    fn append(&mut self, event: &TrafficEvent) -> std::io::Result<()> {
        let date_key = event.date_key();
        let (entry_flag, exit_flag) = match event.kind {
            EventKind::Entry => (1, 0),
            EventKind::Exit => (0, 1),
        };
        let time = event.time.format("%H:%M:%S");

        let open = self.writer_for(&date_key)?;
        writeln!(open.writer, "{},{},{},{}", date_key, time, entry_flag, exit_flag)?;
        // Durable before the resolver proceeds
        open.writer.flush()?;
        debug!(kind = %event.kind, date = %date_key, "traffic_row_written");
        Ok(())
    }
}

#[async_trait]
impl EventSink for CsvTrafficLog {
    async fn record(&mut self, event: &TrafficEvent) -> Result<(), SinkError> {
        self.append(event)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use tempfile::tempdir;

    fn event_on(kind: EventKind, y: i32, m: u32, d: u32) -> TrafficEvent {
        TrafficEvent {
            kind,
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            time: NaiveTime::from_hms_opt(10, 30, 15).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_header_written_once() {
        let dir = tempdir().unwrap();
        let mut log = CsvTrafficLog::new(dir.path(), "{date}_foot_traffic.csv");

        log.record(&event_on(EventKind::Entry, 2025, 4, 30)).await.unwrap();
        log.record(&event_on(EventKind::Exit, 2025, 4, 30)).await.unwrap();

        let content =
            fs::read_to_string(dir.path().join("2025-04-30_foot_traffic.csv")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "date,time,entry_count,exit_count");
        assert_eq!(lines[1], "2025-04-30,10:30:15,1,0");
        assert_eq!(lines[2], "2025-04-30,10:30:15,0,1");
    }

    #[tokio::test]
    async fn test_rotation_on_date_change() {
        let dir = tempdir().unwrap();
        let mut log = CsvTrafficLog::new(dir.path(), "{date}_foot_traffic.csv");

        log.record(&event_on(EventKind::Entry, 2025, 4, 30)).await.unwrap();
        assert!(log.last_completed_log().is_none());

        log.record(&event_on(EventKind::Entry, 2025, 5, 1)).await.unwrap();

        let completed = log.last_completed_log().expect("rotation should expose previous log");
        assert!(completed.ends_with("2025-04-30_foot_traffic.csv"));
        assert!(dir.path().join("2025-05-01_foot_traffic.csv").exists());
    }

    #[tokio::test]
    async fn test_append_to_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("2025-04-30_foot_traffic.csv");
        fs::write(&path, "date,time,entry_count,exit_count\n2025-04-30,08:00:00,1,0\n").unwrap();

        let mut log = CsvTrafficLog::new(dir.path(), "{date}_foot_traffic.csv");
        log.record(&event_on(EventKind::Exit, 2025, 4, 30)).await.unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        // Header not duplicated on append
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "2025-04-30,10:30:15,0,1");
    }

    #[tokio::test]
    async fn test_creates_logs_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested").join("logs");
        let mut log = CsvTrafficLog::new(&nested, "{date}.csv");

        log.record(&event_on(EventKind::Entry, 2025, 4, 30)).await.unwrap();
        assert!(nested.join("2025-04-30.csv").exists());
    }
}
