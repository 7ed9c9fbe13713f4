//! Runner configuration: one TOML document mapped onto the per-component
//! config structs the core consumes.

use crate::quality::QualityConfig;
use anyhow::{bail, Context};
use chrono::{NaiveDate, NaiveTime};
use paperlab_core::calendar::{Schedule, Session};
use paperlab_core::engine::RunParams;
use paperlab_core::execution::{CostModelConfig, CostProfile, SimulatorConfig};
use paperlab_core::gateway::ReconnectPolicy;
use paperlab_core::risk::RiskConfig;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::Duration;

/// Parse a `"HH:MM"` clock string.
pub fn parse_hhmm(text: &str) -> Option<NaiveTime> {
    let (h, m) = text.split_once(':')?;
    let hour: u32 = h.parse().ok()?;
    let minute: u32 = m.parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn required_hhmm(text: &str, what: &str) -> anyhow::Result<NaiveTime> {
    parse_hhmm(text).with_context(|| format!("invalid {what} time {text:?}, expected HH:MM"))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RunnerConfig {
    pub symbol: String,
    pub backtest: BacktestSection,
    pub strategy: StrategySection,
    pub risk: RiskConfig,
    pub contract: ContractSection,
    pub cost_model: CostModelSection,
    pub market_hours: ScheduleSection,
    pub data_quality: QualityConfig,
    pub reconnect: ReconnectSection,
    pub safety: SafetySection,
    pub monitor: MonitorSection,
    pub live: LiveSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BacktestSection {
    pub initial_capital: f64,
    pub max_trades_per_day: u32,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            max_trades_per_day: u32::MAX,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StrategySection {
    pub trade_start: Option<String>,
    pub trade_end: Option<String>,
    pub min_atr: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContractSection {
    pub multiplier: f64,
    pub slippage: f64,
    pub commission_per_contract: f64,
    pub commission_min: f64,
    pub fill_ratio_min: f64,
    pub fill_ratio_max: f64,
    pub reject_probability: f64,
}

impl Default for ContractSection {
    fn default() -> Self {
        Self {
            multiplier: 1.0,
            slippage: 0.0,
            commission_per_contract: 0.0,
            commission_min: 0.0,
            fill_ratio_min: 1.0,
            fill_ratio_max: 1.0,
            reject_probability: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CostModelSection {
    pub profiles: Vec<ProfileSection>,
}

/// One time-of-day profile; omitted fields fall back to the contract terms.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileSection {
    pub name: String,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub slippage: Option<f64>,
    #[serde(default)]
    pub commission_multiplier: Option<f64>,
    #[serde(default)]
    pub fill_ratio_min: Option<f64>,
    #[serde(default)]
    pub fill_ratio_max: Option<f64>,
    #[serde(default)]
    pub reject_probability: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SessionSection {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpecialSessionSection {
    pub date: NaiveDate,
    pub start: String,
    pub end: String,
}

/// A closure with times excludes a sub-window; without, the whole day.
#[derive(Debug, Clone, Deserialize)]
pub struct ClosureSection {
    pub date: NaiveDate,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleSection {
    pub sessions: Vec<SessionSection>,
    pub weekdays: Vec<u8>,
    pub holidays: Vec<NaiveDate>,
    pub extra_workdays: Vec<NaiveDate>,
    pub special_sessions: Vec<SpecialSessionSection>,
    pub special_closures: Vec<ClosureSection>,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            sessions: Vec::new(),
            weekdays: vec![1, 2, 3, 4, 5],
            holidays: Vec::new(),
            extra_workdays: Vec::new(),
            special_sessions: Vec::new(),
            special_closures: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconnectSection {
    pub max_retries: u32,
    pub base_delay_secs: f64,
    pub max_delay_secs: f64,
}

impl Default for ReconnectSection {
    fn default() -> Self {
        Self {
            max_retries: 10,
            base_delay_secs: 1.0,
            max_delay_secs: 30.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SafetySection {
    pub kill_switch_file: Option<PathBuf>,
    pub max_daily_loss: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorSection {
    pub alert_file: PathBuf,
    pub drawdown_alert_threshold: Option<f64>,
    pub no_new_data_error_threshold: u32,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            alert_file: PathBuf::from("logs/alerts.log"),
            drawdown_alert_threshold: None,
            no_new_data_error_threshold: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LiveSection {
    pub interval_secs: u64,
    /// 0 means run until stopped.
    pub max_cycles: u64,
    pub output_dir: PathBuf,
    pub reconcile_tolerance: f64,
}

impl Default for LiveSection {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            max_cycles: 0,
            output_dir: PathBuf::from("output"),
            reconcile_tolerance: 1e-6,
        }
    }
}

impl RunnerConfig {
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("invalid runner config")
    }

    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_toml_str(&text)
    }

    pub fn run_params(&self) -> anyhow::Result<RunParams> {
        let trade_start = match &self.strategy.trade_start {
            Some(text) => Some(required_hhmm(text, "trade_start")?),
            None => None,
        };
        let trade_end = match &self.strategy.trade_end {
            Some(text) => Some(required_hhmm(text, "trade_end")?),
            None => None,
        };
        Ok(RunParams {
            symbol: self.symbol.clone(),
            initial_capital: self.backtest.initial_capital,
            max_trades_per_day: self.backtest.max_trades_per_day,
            trade_start,
            trade_end,
            min_atr: self.strategy.min_atr,
            safety_max_daily_loss: self.safety.max_daily_loss,
        })
    }

    pub fn simulator_config(&self) -> SimulatorConfig {
        SimulatorConfig {
            contract_multiplier: self.contract.multiplier,
            commission_per_contract: self.contract.commission_per_contract,
            commission_min: self.contract.commission_min,
        }
    }

    pub fn cost_model(&self) -> anyhow::Result<CostModelConfig> {
        let contract = &self.contract;
        let mut profiles = Vec::with_capacity(self.cost_model.profiles.len());
        for section in &self.cost_model.profiles {
            let start = required_hhmm(&section.start, "profile start")?;
            let end = required_hhmm(&section.end, "profile end")?;
            profiles.push(CostProfile {
                name: section.name.clone(),
                window: Some((start, end)),
                slippage: section.slippage.unwrap_or(contract.slippage),
                commission_multiplier: section.commission_multiplier.unwrap_or(1.0),
                fill_ratio_min: section.fill_ratio_min.unwrap_or(contract.fill_ratio_min),
                fill_ratio_max: section.fill_ratio_max.unwrap_or(contract.fill_ratio_max),
                reject_probability: section
                    .reject_probability
                    .unwrap_or(contract.reject_probability),
            });
        }
        Ok(CostModelConfig {
            profiles,
            default: CostProfile {
                name: "default".into(),
                window: None,
                slippage: contract.slippage,
                commission_multiplier: 1.0,
                fill_ratio_min: contract.fill_ratio_min,
                fill_ratio_max: contract.fill_ratio_max,
                reject_probability: contract.reject_probability,
            },
        })
    }

    pub fn schedule(&self) -> anyhow::Result<Schedule> {
        let section = &self.market_hours;
        if section.weekdays.iter().any(|&d| d == 0 || d > 7) {
            bail!("weekdays must use ISO numbering 1..=7");
        }

        let mut sessions = Vec::with_capacity(section.sessions.len());
        for s in &section.sessions {
            sessions.push(Session::new(
                required_hhmm(&s.start, "session start")?,
                required_hhmm(&s.end, "session end")?,
            ));
        }
        sessions.sort_by_key(|s| s.start);

        let mut special_sessions: BTreeMap<NaiveDate, Vec<Session>> = BTreeMap::new();
        for s in &section.special_sessions {
            special_sessions.entry(s.date).or_default().push(Session::new(
                required_hhmm(&s.start, "special session start")?,
                required_hhmm(&s.end, "special session end")?,
            ));
        }
        for sessions in special_sessions.values_mut() {
            sessions.sort_by_key(|s| s.start);
        }

        let mut full_closures = BTreeSet::new();
        let mut partial_closures: BTreeMap<NaiveDate, Vec<Session>> = BTreeMap::new();
        for closure in &section.special_closures {
            match (&closure.start, &closure.end) {
                (Some(start), Some(end)) => {
                    partial_closures
                        .entry(closure.date)
                        .or_default()
                        .push(Session::new(
                            required_hhmm(start, "closure start")?,
                            required_hhmm(end, "closure end")?,
                        ));
                }
                (None, None) => {
                    full_closures.insert(closure.date);
                }
                _ => bail!(
                    "closure for {} must give both start and end, or neither",
                    closure.date
                ),
            }
        }
        for windows in partial_closures.values_mut() {
            windows.sort_by_key(|w| w.start);
        }

        Ok(Schedule {
            sessions,
            weekdays: section.weekdays.iter().copied().collect(),
            holidays: section.holidays.iter().copied().collect(),
            extra_workdays: section.extra_workdays.iter().copied().collect(),
            special_sessions,
            full_closures,
            partial_closures,
        })
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            max_retries: self.reconnect.max_retries,
            base_delay: Duration::from_secs_f64(self.reconnect.base_delay_secs),
            max_delay: Duration::from_secs_f64(self.reconnect.max_delay_secs),
        }
    }
}
