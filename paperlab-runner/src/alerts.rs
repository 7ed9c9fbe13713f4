//! Alert channel: structured records for an external sink.
//!
//! Alerts are best effort: a failing sink must never take down the
//! trading loop. The JSON-lines file sink swallows write errors after
//! logging them.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    Info,
    Warn,
    Error,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlertLevel::Info => "INFO",
            AlertLevel::Warn => "WARN",
            AlertLevel::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// One alert, serialized as a flat record for log files or webhooks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub timestamp: NaiveDateTime,
    pub level: AlertLevel,
    pub event: String,
    pub message: String,
    pub data: Value,
}

impl AlertRecord {
    pub fn new(level: AlertLevel, event: &str, message: &str, data: Value) -> Self {
        Self {
            timestamp: chrono::Local::now().naive_local(),
            level,
            event: event.to_string(),
            message: message.to_string(),
            data,
        }
    }
}

pub trait AlertSink {
    fn send(&mut self, record: AlertRecord);
}

/// Appends one JSON object per line to a file.
#[derive(Debug)]
pub struct JsonlAlertSink {
    file: File,
}

impl JsonlAlertSink {
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }
}

impl AlertSink for JsonlAlertSink {
    fn send(&mut self, record: AlertRecord) {
        match serde_json::to_string(&record) {
            Ok(line) => {
                if let Err(err) = writeln!(self.file, "{line}") {
                    error!(%err, "alert write failed");
                }
            }
            Err(err) => error!(%err, "alert serialization failed"),
        }
    }
}

/// Collects alerts in memory; used in tests and by embedding hosts.
#[derive(Debug, Clone, Default)]
pub struct MemoryAlertSink {
    records: Vec<AlertRecord>,
}

impl MemoryAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[AlertRecord] {
        &self.records
    }
}

impl AlertSink for MemoryAlertSink {
    fn send(&mut self, record: AlertRecord) {
        self.records.push(record);
    }
}
