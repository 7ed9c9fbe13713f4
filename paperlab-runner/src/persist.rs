//! Output flush: equity curve and trade log as CSV, performance as JSON.

use crate::session::PerformanceSummary;
use anyhow::Context;
use paperlab_core::domain::{EquityPoint, Trade};
use std::path::{Path, PathBuf};

pub fn write_equity_csv(path: &Path, points: &[EquityPoint]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("open {} for equity curve", path.display()))?;
    for point in points {
        writer.serialize(point)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_trades_csv(path: &Path, trades: &[Trade]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("open {} for trade log", path.display()))?;
    for trade in trades {
        writer.serialize(trade)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_performance_json(path: &Path, summary: &PerformanceSummary) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json)
        .with_context(|| format!("write performance summary to {}", path.display()))?;
    Ok(())
}

/// Flushes every session artifact into one directory.
#[derive(Debug, Clone)]
pub struct OutputDir {
    dir: PathBuf,
}

impl OutputDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn flush(
        &self,
        equity: &[EquityPoint],
        trades: &[Trade],
        summary: &PerformanceSummary,
    ) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create output dir {}", self.dir.display()))?;
        write_equity_csv(&self.dir.join("equity_curve.csv"), equity)?;
        write_trades_csv(&self.dir.join("trades.csv"), trades)?;
        write_performance_json(&self.dir.join("performance.json"), summary)?;
        Ok(())
    }
}
