//! The live/paper cycle loop.
//!
//! One logical cycle per wake-up: fetch → no-new-data tracking → quality
//! gate → incremental advance → flush → reconcile. Cycles are serialized;
//! a fatal cycle is alerted and the loop continues on the next wake-up.

use crate::alerts::{AlertLevel, AlertRecord, AlertSink};
use crate::persist::OutputDir;
use crate::quality::{self, QualityConfig, QualityReport};
use crate::session::PaperSession;
use chrono::NaiveDateTime;
use paperlab_core::calendar::{self, Schedule};
use paperlab_core::domain::Bar;
use paperlab_core::engine::EventLog;
use paperlab_core::gateway::{AccountSnapshot, BrokerAdapter, TradeGateway};
use paperlab_core::reconcile::Reconciler;
use paperlab_core::strategy::Strategy;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::info;

/// Produces the full merged bar series for the session's symbol.
///
/// The series is append-only across calls: previously returned bars never
/// change or disappear. Quality of the series is the feed's responsibility
/// up to the gate thresholds.
pub trait BarFeed {
    fn fetch(&mut self) -> anyhow::Result<Vec<Bar>>;
}

/// Loop pacing and alert thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveSettings {
    pub interval: Duration,
    /// 0 means run until stopped.
    pub max_cycles: u64,
    /// No-new-data streak length at which the alert escalates to ERROR.
    pub no_new_data_error_threshold: u32,
    pub drawdown_alert_threshold: Option<f64>,
    pub market_lookahead_days: u32,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            max_cycles: 0,
            no_new_data_error_threshold: 3,
            drawdown_alert_threshold: None,
            market_lookahead_days: 14,
        }
    }
}

/// What one cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    FetchFailed,
    NoNewData { streak: u32 },
    QualityBlocked,
    Advanced { bars_processed: usize },
}

/// Timer-driven live/paper runner around a [`PaperSession`].
pub struct LiveLoop<S, F, A: BrokerAdapter> {
    session: PaperSession<S>,
    feed: F,
    schedule: Schedule,
    quality: QualityConfig,
    settings: LiveSettings,
    gateway: Option<TradeGateway<A>>,
    reconciler: Reconciler,
    local_account: AccountSnapshot,
    output: Option<OutputDir>,
    events: EventLog,
    cycle: u64,
    last_bar_time: Option<NaiveDateTime>,
    no_new_data_streak: u32,
    drawdown_alert_active: bool,
}

impl<S: Strategy, F: BarFeed, A: BrokerAdapter> LiveLoop<S, F, A> {
    pub fn new(
        session: PaperSession<S>,
        feed: F,
        schedule: Schedule,
        quality: QualityConfig,
        settings: LiveSettings,
    ) -> Self {
        Self {
            session,
            feed,
            schedule,
            quality,
            settings,
            gateway: None,
            reconciler: Reconciler::default(),
            local_account: AccountSnapshot::new(),
            output: None,
            events: EventLog::new(),
            cycle: 0,
            last_bar_time: None,
            no_new_data_streak: 0,
            drawdown_alert_active: false,
        }
    }

    /// Attach a trade gateway; every cycle then reconciles against it.
    pub fn with_gateway(mut self, gateway: TradeGateway<A>, reconciler: Reconciler) -> Self {
        self.gateway = Some(gateway);
        self.reconciler = reconciler;
        self
    }

    pub fn with_output(mut self, output: OutputDir) -> Self {
        self.output = Some(output);
        self
    }

    pub fn session(&self) -> &PaperSession<S> {
        &self.session
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn gateway(&self) -> Option<&TradeGateway<A>> {
        self.gateway.as_ref()
    }

    pub fn gateway_mut(&mut self) -> Option<&mut TradeGateway<A>> {
        self.gateway.as_mut()
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Run one serialized cycle.
    pub fn run_cycle(&mut self, alerts: &mut dyn AlertSink) -> CycleOutcome {
        self.cycle += 1;
        let cycle = self.cycle;

        let bars = match self.feed.fetch() {
            Ok(bars) => bars,
            Err(err) => {
                alerts.send(AlertRecord::new(
                    AlertLevel::Error,
                    "cycle_fetch_failed",
                    &format!("cycle={cycle}"),
                    json!({ "error": err.to_string() }),
                ));
                return CycleOutcome::FetchFailed;
            }
        };

        let newest = bars.last().map(|b| b.timestamp);
        if bars.is_empty() || newest == self.last_bar_time {
            self.no_new_data_streak += 1;
            let streak = self.no_new_data_streak;
            let level = if streak >= self.settings.no_new_data_error_threshold {
                AlertLevel::Error
            } else {
                AlertLevel::Warn
            };
            alerts.send(AlertRecord::new(
                level,
                "cycle_no_new_data",
                &format!("cycle={cycle}"),
                json!({ "streak": streak }),
            ));
            return CycleOutcome::NoNewData { streak };
        }
        self.last_bar_time = newest;
        self.no_new_data_streak = 0;

        let report = QualityReport::from_bars(&bars);
        let verdict = quality::evaluate(&report, &self.quality);
        for warning in &verdict.warnings {
            alerts.send(AlertRecord::new(
                AlertLevel::Warn,
                "cycle_data_quality_warn",
                &format!("cycle={cycle}"),
                json!({ "warning": warning }),
            ));
        }
        if !verdict.ok {
            alerts.send(AlertRecord::new(
                AlertLevel::Error,
                "cycle_data_quality_block",
                &format!("cycle={cycle}"),
                json!({ "errors": verdict.errors }),
            ));
            return CycleOutcome::QualityBlocked;
        }

        let processed = self.session.process_new_bars(&bars, &mut self.events);
        info!(cycle, processed, capital = self.session.capital(), "cycle advanced");

        let performance = self.session.performance();
        if let Some(output) = &self.output {
            if let Err(err) = output.flush(
                self.session.equity_curve(),
                self.session.trades(),
                &performance,
            ) {
                alerts.send(AlertRecord::new(
                    AlertLevel::Error,
                    "cycle_flush_failed",
                    &format!("cycle={cycle}"),
                    json!({ "error": err.to_string() }),
                ));
            }
        }

        // Drawdown alert is latched: one alert when crossed, re-armed only
        // after dropping back under the threshold.
        if let Some(threshold) = self.settings.drawdown_alert_threshold {
            if performance.max_drawdown >= threshold {
                if !self.drawdown_alert_active {
                    self.drawdown_alert_active = true;
                    alerts.send(AlertRecord::new(
                        AlertLevel::Warn,
                        "cycle_drawdown_threshold_reached",
                        &format!("cycle={cycle}"),
                        json!({
                            "max_drawdown": performance.max_drawdown,
                            "threshold": threshold,
                        }),
                    ));
                }
            } else {
                self.drawdown_alert_active = false;
            }
        }

        self.reconcile(cycle, alerts);
        CycleOutcome::Advanced {
            bars_processed: processed,
        }
    }

    fn reconcile(&mut self, cycle: u64, alerts: &mut dyn AlertSink) {
        let Some(gateway) = self.gateway.as_mut() else {
            return;
        };
        let mut local_positions = BTreeMap::new();
        if let Some(position) = self.session.position() {
            local_positions.insert(
                position.symbol.clone(),
                position.direction.sign() * position.filled_size,
            );
        }
        match self
            .reconciler
            .run_cycle(&local_positions, &self.local_account, gateway)
        {
            Ok(report) if !report.is_clean() => {
                alerts.send(AlertRecord::new(
                    AlertLevel::Warn,
                    "reconcile_mismatch",
                    &format!("cycle={cycle}"),
                    serde_json::to_value(&report).unwrap_or_default(),
                ));
            }
            Ok(_) => {}
            Err(err) => {
                alerts.send(AlertRecord::new(
                    AlertLevel::Error,
                    "reconcile_failed",
                    &format!("cycle={cycle}"),
                    json!({ "error": err.to_string() }),
                ));
            }
        }
    }

    /// Run cycles until `max_cycles` (when non-zero). Outside market hours
    /// the loop sleeps toward the next open instant. `clock` and `sleep`
    /// are injected so hosts and tests control time.
    pub fn run(
        &mut self,
        alerts: &mut dyn AlertSink,
        clock: &mut dyn FnMut() -> NaiveDateTime,
        sleep: &mut dyn FnMut(Duration),
    ) {
        loop {
            loop {
                let now = clock();
                if calendar::is_open(now, &self.schedule) {
                    break;
                }
                let Some(next) =
                    calendar::next_open(now, &self.schedule, self.settings.market_lookahead_days)
                else {
                    alerts.send(AlertRecord::new(
                        AlertLevel::Error,
                        "no_market_open_in_lookahead",
                        &format!("lookahead_days={}", self.settings.market_lookahead_days),
                        json!({}),
                    ));
                    return;
                };
                let wait = (next - now)
                    .to_std()
                    .unwrap_or(Duration::from_secs(30))
                    .clamp(Duration::from_secs(5), Duration::from_secs(300));
                info!(next_open = %next, ?wait, "market closed, waiting");
                sleep(wait);
            }

            self.run_cycle(alerts);
            if self.settings.max_cycles > 0 && self.cycle >= self.settings.max_cycles {
                alerts.send(AlertRecord::new(
                    AlertLevel::Info,
                    "live_finished",
                    &format!("cycle={}", self.cycle),
                    json!({}),
                ));
                return;
            }
            sleep(self.settings.interval);
        }
    }
}
