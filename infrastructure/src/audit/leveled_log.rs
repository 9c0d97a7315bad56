//! Leveled audit-trail writer.
//!
//! Fans every audit event out to up to three append-only files in the log
//! directory, one per verbosity floor:
//!
//! - `plenum.log.1`: everything, raw pulsations included
//! - `plenum.log.2`: routine events and up
//! - `plenum.log.3`: milestones only (session and roll-call results)
//!
//! plus a bounded in-memory tail for the `tail` console command. Emission
//! is log-and-continue: an unwritable file costs a `warn!`, never the
//! state transition that produced the line.

use plenum_application::ports::audit::{AuditLevel, AuditSink};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

const FILE_THRESHOLDS: [u8; 3] = [1, 2, 3];

struct LeveledFile {
    threshold: u8,
    path: PathBuf,
    writer: BufWriter<File>,
}

struct Inner {
    files: Vec<LeveledFile>,
    tail: VecDeque<String>,
}

/// File-backed [`AuditSink`] with one file per level floor and a tail ring.
///
/// Thread-safe via one `Mutex` around all writers, so concurrent emitters
/// cannot interleave half-written lines. Flushes per line; the trail is
/// the crash record of the sitting.
pub struct LeveledFileAudit {
    inner: Mutex<Inner>,
    tail_capacity: usize,
}

impl LeveledFileAudit {
    /// Open (appending) the three level files under `log_dir`.
    ///
    /// Creates the directory if needed. Returns `None` when the directory
    /// cannot be created or no file opens; a partially available set still
    /// works with whatever opened.
    pub fn new(log_dir: impl AsRef<Path>, tail_capacity: usize) -> Option<Self> {
        let log_dir = log_dir.as_ref();
        if let Err(e) = std::fs::create_dir_all(log_dir) {
            warn!("Could not create audit log directory {}: {}", log_dir.display(), e);
            return None;
        }

        let mut files = Vec::new();
        for threshold in FILE_THRESHOLDS {
            let path = log_dir.join(format!("plenum.log.{}", threshold));
            match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => files.push(LeveledFile {
                    threshold,
                    path,
                    writer: BufWriter::new(file),
                }),
                Err(e) => warn!("Could not open audit file {}: {}", path.display(), e),
            }
        }
        if files.is_empty() {
            return None;
        }

        Some(Self {
            inner: Mutex::new(Inner {
                files,
                tail: VecDeque::with_capacity(tail_capacity),
            }),
            tail_capacity,
        })
    }

    fn format_line(tag: &str, level: AuditLevel, message: &str) -> String {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        format!("{} | L{} | {} | {}", timestamp, level.as_number(), tag, message)
    }
}

impl AuditSink for LeveledFileAudit {
    fn emit(&self, tag: &str, level: AuditLevel, message: &str) {
        let line = Self::format_line(tag, level, message);

        let Ok(mut inner) = self.inner.lock() else {
            return;
        };

        for file in &mut inner.files {
            if level.as_number() < file.threshold {
                continue;
            }
            if let Err(e) = writeln!(file.writer, "{}", line).and_then(|_| file.writer.flush()) {
                warn!("Audit write to {} failed: {}", file.path.display(), e);
            }
        }

        if self.tail_capacity > 0 {
            if inner.tail.len() == self.tail_capacity {
                inner.tail.pop_front();
            }
            inner.tail.push_back(line);
        }
    }

    fn tail(&self) -> Vec<String> {
        match self.inner.lock() {
            Ok(inner) => inner.tail.iter().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl Drop for LeveledFileAudit {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.lock() {
            for file in &mut inner.files {
                let _ = file.writer.flush();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_lines(dir: &Path, suffix: u8) -> Vec<String> {
        let content =
            std::fs::read_to_string(dir.join(format!("plenum.log.{}", suffix))).unwrap();
        content.lines().map(String::from).collect()
    }

    #[test]
    fn test_fan_out_per_level() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LeveledFileAudit::new(dir.path(), 16).unwrap();

        sink.emit("INPUT", AuditLevel::Detail, "raw pulsation");
        sink.emit("BALLOT", AuditLevel::Routine, "a ballot");
        sink.emit("SESSION", AuditLevel::Milestone, "session opened");
        drop(sink);

        assert_eq!(read_lines(dir.path(), 1).len(), 3);
        assert_eq!(read_lines(dir.path(), 2).len(), 2);
        let milestones = read_lines(dir.path(), 3);
        assert_eq!(milestones.len(), 1);
        assert!(milestones[0].ends_with("| L3 | SESSION | session opened"));
    }

    #[test]
    fn test_line_format() {
        let line = LeveledFileAudit::format_line("VOTE", AuditLevel::Routine, "msg");
        // "2026-08-23 14:02:11.042 | L2 | VOTE | msg"
        let parts: Vec<&str> = line.splitn(4, " | ").collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0].len(), 23);
        assert_eq!(parts[1], "L2");
        assert_eq!(parts[2], "VOTE");
        assert_eq!(parts[3], "msg");
    }

    #[test]
    fn test_tail_ring_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LeveledFileAudit::new(dir.path(), 3).unwrap();

        for i in 0..5 {
            sink.emit("VOTE", AuditLevel::Routine, &format!("event {}", i));
        }
        let tail = sink.tail();
        assert_eq!(tail.len(), 3);
        assert!(tail[0].ends_with("event 2"));
        assert!(tail[2].ends_with("event 4"));
    }

    #[test]
    fn test_appends_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        {
            let sink = LeveledFileAudit::new(dir.path(), 4).unwrap();
            sink.emit("SESSION", AuditLevel::Milestone, "first sitting");
        }
        {
            let sink = LeveledFileAudit::new(dir.path(), 4).unwrap();
            sink.emit("SESSION", AuditLevel::Milestone, "second sitting");
        }
        assert_eq!(read_lines(dir.path(), 3).len(), 2);
    }

    #[test]
    fn test_concurrent_emitters_do_not_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let sink = std::sync::Arc::new(LeveledFileAudit::new(dir.path(), 64).unwrap());

        let mut handles = Vec::new();
        for t in 0..4 {
            let sink = sink.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..16 {
                    sink.emit("VOTE", AuditLevel::Routine, &format!("t{} e{}", t, i));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        drop(std::sync::Arc::try_unwrap(sink).ok());

        let lines = read_lines(dir.path(), 1);
        assert_eq!(lines.len(), 64);
        for line in &lines {
            assert_eq!(line.matches(" | ").count(), 3);
        }
    }
}
