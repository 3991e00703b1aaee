//! Run report accumulation.
//!
//! Every noteworthy event of a run becomes one timestamped line. The report
//! travels with the run result instead of living in a global, so callers can
//! inspect it, append it to the log file, or hand it to a notifier.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::Local;
use tracing::info;

use crate::error::Result;

/// Timestamp used to prefix report lines, `YYYYMMDD-HHMM`.
pub fn timestamp() -> String {
    Local::now().format("%Y%m%d-%H%M").to_string()
}

/// Today's date as written into hub log rows, `MM/DD/YYYY`.
pub fn today() -> String {
    Local::now().format("%m/%d/%Y").to_string()
}

/// Accumulated, timestamped notes for one run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    lines: Vec<String>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a note, echoing it to the tracing log.
    pub fn note(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.lines.push(format!("{}  {}", timestamp(), message));
    }

    /// Record a warning note.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.lines.push(format!("{}  WARNING: {}", timestamp(), message));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The whole report as one newline-terminated block.
    pub fn body(&self) -> String {
        let mut body = self.lines.join("\n");
        if !body.is_empty() {
            body.push('\n');
        }
        body
    }

    /// Append the report to a log file, creating it if needed.
    pub fn append_to_file(&self, path: &Path) -> Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(self.body().as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notes_are_timestamped_in_order() {
        let mut report = RunReport::new();
        report.note("first");
        report.warn("second");
        let lines = report.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("  first"));
        assert!(lines[1].contains("WARNING: second"));
        // YYYYMMDD-HHMM prefix
        assert_eq!(lines[0].chars().position(|c| c == '-'), Some(8));
    }

    #[test]
    fn test_body_is_newline_terminated() {
        let mut report = RunReport::new();
        assert_eq!(report.body(), "");
        report.note("only line");
        assert!(report.body().ends_with("only line\n"));
    }

    #[test]
    fn test_append_to_file_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exchange.log");

        let mut first = RunReport::new();
        first.note("run one");
        first.append_to_file(&path).unwrap();

        let mut second = RunReport::new();
        second.note("run two");
        second.append_to_file(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("run one"));
        assert!(content.contains("run two"));
    }

    #[test]
    fn test_today_format() {
        let d = today();
        assert_eq!(d.len(), 10);
        assert_eq!(&d[2..3], "/");
        assert_eq!(&d[5..6], "/");
    }
}
