//! paperlab runner — live/paper orchestration over the core.
//!
//! - Timer-driven cycle loop with serialized cycles
//! - Data-quality gate blocking cycle advancement
//! - File kill switch, alert channel, output flush
//! - TOML configuration surface

pub mod alerts;
pub mod config;
pub mod kill_switch;
pub mod live;
pub mod persist;
pub mod quality;
pub mod session;

pub use alerts::{AlertLevel, AlertRecord, AlertSink, JsonlAlertSink, MemoryAlertSink};
pub use config::RunnerConfig;
pub use kill_switch::FileKillSwitch;
pub use live::{BarFeed, CycleOutcome, LiveLoop, LiveSettings};
pub use persist::OutputDir;
pub use quality::{evaluate, QualityConfig, QualityReport, QualityVerdict};
pub use session::{PaperSession, PerformanceSummary};
