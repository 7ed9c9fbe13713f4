//! Data-quality gate.
//!
//! A failing gate blocks cycle advancement entirely; it is surfaced as an
//! alert, never swallowed. Warnings advance but are reported.

use paperlab_core::domain::Bar;
use serde::{Deserialize, Serialize};

/// Quality metrics for one bar series, as reported by the feed (or computed
/// from the series itself when the feed has no expected-grid knowledge).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub total: usize,
    pub missing: usize,
    pub duplicates: usize,
    /// Largest single-bar close-to-close relative move.
    pub max_jump_ratio: f64,
    /// Fraction of the expected grid actually present.
    pub coverage_ratio: f64,
}

impl QualityReport {
    /// Compute series-intrinsic metrics from the bars alone.
    ///
    /// `missing` stays 0 and `coverage_ratio` 1.0; only a feed that knows
    /// the expected bar grid can fill those in.
    pub fn from_bars(bars: &[Bar]) -> Self {
        let mut duplicates = 0;
        let mut max_jump_ratio: f64 = 0.0;
        for window in bars.windows(2) {
            if window[1].timestamp <= window[0].timestamp {
                duplicates += 1;
            }
            if window[0].close > 0.0 {
                let jump = (window[1].close / window[0].close - 1.0).abs();
                max_jump_ratio = max_jump_ratio.max(jump);
            }
        }
        Self {
            total: bars.len(),
            missing: 0,
            duplicates,
            max_jump_ratio,
            coverage_ratio: 1.0,
        }
    }
}

/// Thresholds for the gate. `None` disables the corresponding check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub enabled: bool,
    pub min_rows: Option<usize>,
    pub max_missing_bars: Option<usize>,
    pub max_missing_ratio: Option<f64>,
    pub warn_missing_ratio: Option<f64>,
    pub max_duplicates: Option<usize>,
    pub max_jump_ratio: Option<f64>,
    pub min_coverage_ratio: Option<f64>,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_rows: None,
            max_missing_bars: None,
            max_missing_ratio: None,
            warn_missing_ratio: None,
            max_duplicates: None,
            max_jump_ratio: None,
            min_coverage_ratio: None,
        }
    }
}

/// Gate verdict: `ok == false` means "do not advance this cycle".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityVerdict {
    pub ok: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

pub fn evaluate(report: &QualityReport, config: &QualityConfig) -> QualityVerdict {
    if !config.enabled {
        return QualityVerdict {
            ok: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        };
    }

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if let Some(min_rows) = config.min_rows {
        if report.total < min_rows {
            errors.push(format!(
                "DATA_TOO_SHORT total={} < min_rows={min_rows}",
                report.total
            ));
        }
    }
    if let Some(max_missing) = config.max_missing_bars {
        if report.missing > max_missing {
            errors.push(format!(
                "MISSING_BARS_EXCEEDED missing={} > max_missing_bars={max_missing}",
                report.missing
            ));
        }
    }
    if report.total > 0 {
        let ratio = report.missing as f64 / report.total as f64;
        if let Some(max_ratio) = config.max_missing_ratio {
            if ratio > max_ratio {
                errors.push(format!(
                    "MISSING_RATIO_EXCEEDED ratio={ratio:.4} > max_missing_ratio={max_ratio:.4}"
                ));
            }
        }
        if let Some(warn_ratio) = config.warn_missing_ratio {
            if ratio > warn_ratio {
                warnings.push(format!(
                    "MISSING_RATIO_WARN ratio={ratio:.4} > warn_missing_ratio={warn_ratio:.4}"
                ));
            }
        }
    }
    if let Some(max_duplicates) = config.max_duplicates {
        if report.duplicates > max_duplicates {
            errors.push(format!(
                "DUPLICATES_EXCEEDED duplicates={} > max_duplicates={max_duplicates}",
                report.duplicates
            ));
        }
    }
    if let Some(max_jump) = config.max_jump_ratio {
        if report.max_jump_ratio > max_jump {
            errors.push(format!(
                "JUMP_RATIO_EXCEEDED ratio={:.4} > max_jump_ratio={max_jump:.4}",
                report.max_jump_ratio
            ));
        }
    }
    if let Some(min_coverage) = config.min_coverage_ratio {
        if report.coverage_ratio < min_coverage {
            errors.push(format!(
                "COVERAGE_TOO_LOW ratio={:.4} < min_coverage_ratio={min_coverage:.4}",
                report.coverage_ratio
            ));
        }
    }

    QualityVerdict {
        ok: errors.is_empty(),
        errors,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn report(total: usize, missing: usize) -> QualityReport {
        QualityReport {
            total,
            missing,
            duplicates: 0,
            max_jump_ratio: 0.0,
            coverage_ratio: 1.0,
        }
    }

    #[test]
    fn disabled_gate_passes_everything() {
        let config = QualityConfig {
            enabled: false,
            min_rows: Some(1000),
            ..QualityConfig::default()
        };
        assert!(evaluate(&report(1, 0), &config).ok);
    }

    #[test]
    fn short_series_blocks() {
        let config = QualityConfig {
            min_rows: Some(100),
            ..QualityConfig::default()
        };
        let verdict = evaluate(&report(50, 0), &config);
        assert!(!verdict.ok);
        assert!(verdict.errors[0].starts_with("DATA_TOO_SHORT"));
    }

    #[test]
    fn missing_ratio_warns_then_blocks() {
        let config = QualityConfig {
            warn_missing_ratio: Some(0.01),
            max_missing_ratio: Some(0.10),
            ..QualityConfig::default()
        };
        let warned = evaluate(&report(100, 5), &config);
        assert!(warned.ok);
        assert_eq!(warned.warnings.len(), 1);

        let blocked = evaluate(&report(100, 20), &config);
        assert!(!blocked.ok);
    }

    #[test]
    fn jump_and_coverage_thresholds() {
        let config = QualityConfig {
            max_jump_ratio: Some(0.1),
            min_coverage_ratio: Some(0.9),
            ..QualityConfig::default()
        };
        let bad = QualityReport {
            total: 100,
            missing: 0,
            duplicates: 0,
            max_jump_ratio: 0.25,
            coverage_ratio: 0.5,
        };
        let verdict = evaluate(&bad, &config);
        assert_eq!(verdict.errors.len(), 2);
    }

    #[test]
    fn from_bars_computes_jump_and_duplicates() {
        let base = NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let mk = |minute: i64, close: f64| Bar {
            timestamp: base + chrono::Duration::minutes(minute),
            open: close,
            high: close,
            low: close,
            close,
        };
        let bars = vec![mk(0, 100.0), mk(1, 110.0), mk(1, 110.0), mk(2, 110.0)];
        let report = QualityReport::from_bars(&bars);
        assert_eq!(report.total, 4);
        assert_eq!(report.duplicates, 1);
        assert!((report.max_jump_ratio - 0.1).abs() < 1e-12);
    }
}
