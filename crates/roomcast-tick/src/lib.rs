//! Fixed-period tick source for the Roomcast broadcast loop.
//!
//! The relay pushes a full player-list snapshot to every room once per
//! tick. [`TickScheduler`] decides when that happens: it fires at a fixed
//! rate (60 Hz by default, the usual animation-frame cadence of browser
//! clients), never bursts to make up for lost time, and reports how much
//! of each period the broadcast itself used.
//!
//! # Usage
//!
//! The scheduler lives inside the relay actor's `select!` loop, next to the
//! command channel, so a tick never runs in the middle of a command:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = commands.recv() => relay.handle(cmd),
//!         _ = ticks.wait_for_tick() => {
//!             relay.broadcast_player_lists();
//!             ticks.record_tick_end();
//!         }
//!     }
//! }
//! ```
//!
//! `wait_for_tick` only mutates the scheduler after its sleep completes,
//! so dropping it when another branch wins loses nothing.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

/// Tick rate used when none (or zero) is configured.
pub const DEFAULT_TICK_RATE_HZ: u32 = 60;

/// Highest accepted tick rate. Anything above is clamped.
pub const MAX_TICK_RATE_HZ: u32 = 128;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Scheduler settings.
#[derive(Debug, Clone, PartialEq)]
pub struct TickConfig {
    /// Ticks per second. `0` means "use the default".
    pub tick_rate_hz: u32,
    /// Fraction of the period (0.0 to 1.0) at which a slow tick is logged.
    pub budget_warn_threshold: f64,
    /// Fraction of the period at which a slow tick is logged as critical.
    pub budget_critical_threshold: f64,
    /// Track average and maximum tick cost.
    pub metrics_enabled: bool,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
            budget_warn_threshold: 0.80,
            budget_critical_threshold: 1.0,
            metrics_enabled: true,
        }
    }
}

impl TickConfig {
    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Self::default()
        }
    }

    /// Brings every field into range.
    ///
    /// - a rate of 0 becomes [`DEFAULT_TICK_RATE_HZ`]
    /// - rates above [`MAX_TICK_RATE_HZ`] are clamped
    /// - thresholds are clamped to `0.0..=1.0`, warn never above critical
    pub fn validated(mut self) -> Self {
        if self.tick_rate_hz == 0 {
            debug!(default = DEFAULT_TICK_RATE_HZ, "tick rate 0, using default");
            self.tick_rate_hz = DEFAULT_TICK_RATE_HZ;
        } else if self.tick_rate_hz > MAX_TICK_RATE_HZ {
            warn!(
                rate = self.tick_rate_hz,
                max = MAX_TICK_RATE_HZ,
                "tick rate above maximum, clamping"
            );
            self.tick_rate_hz = MAX_TICK_RATE_HZ;
        }
        self.budget_critical_threshold = self.budget_critical_threshold.clamp(0.0, 1.0);
        self.budget_warn_threshold = self
            .budget_warn_threshold
            .clamp(0.0, self.budget_critical_threshold);
        self
    }

    /// Length of one tick. Assumes a validated (non-zero) rate.
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate_hz.max(1)))
    }
}

// ---------------------------------------------------------------------------
// Per-tick report and metrics
// ---------------------------------------------------------------------------

/// Whether the scheduler has started ticking.
///
/// There is no way back to `Idle`: once the relay starts ticking it ticks
/// for as long as it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPhase {
    Idle,
    Ticking,
}

/// Returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickInfo {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Woke up more than a tenth of a period late.
    pub overrun: bool,
    /// Whole periods that passed without a tick because of the overrun.
    pub ticks_skipped: u64,
}

/// Counters kept across the scheduler's lifetime.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickMetrics {
    pub total_ticks: u64,
    pub total_overruns: u64,
    pub total_skipped: u64,
    /// Moving average of tick cost (weight 0.1 on the newest sample).
    pub avg_tick_time: Duration,
    pub max_tick_time: Duration,
    /// Cost of the last tick as a fraction of the period.
    pub budget_utilization: f64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fires at a fixed period. Late ticks are skipped, never replayed.
pub struct TickScheduler {
    config: TickConfig,
    period: Duration,
    phase: TickPhase,
    ticks: u64,
    deadline: Instant,
    started_at: Option<Instant>,
    metrics: TickMetrics,
}

impl TickScheduler {
    /// Creates a scheduler whose first tick is one period from now.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let period = config.period();
        debug!(
            rate_hz = config.tick_rate_hz,
            period_ms = period.as_secs_f64() * 1000.0,
            "tick scheduler created"
        );
        Self {
            config,
            period,
            phase: TickPhase::Idle,
            ticks: 0,
            deadline: Instant::now() + period,
            started_at: None,
            metrics: TickMetrics::default(),
        }
    }

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self::new(TickConfig::with_rate(tick_rate_hz))
    }

    /// Sleeps until the next tick is due.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        self.phase = TickPhase::Ticking;
        time::sleep_until(self.deadline).await;

        let now = Instant::now();
        let late_by = now.saturating_duration_since(self.deadline);
        let overrun = late_by > self.period / 10;
        let ticks_skipped = if overrun {
            (late_by.as_nanos() / self.period.as_nanos()) as u64
        } else {
            0
        };

        self.ticks += 1;
        self.started_at = Some(now);
        // Always from now: a stalled actor resumes at the normal cadence
        // instead of firing a backlog.
        self.deadline = now + self.period;

        if overrun {
            self.metrics.total_overruns += 1;
            self.metrics.total_skipped += ticks_skipped;
            warn!(
                tick = self.ticks,
                skipped = ticks_skipped,
                late_ms = late_by.as_secs_f64() * 1000.0,
                "broadcast tick late"
            );
        }
        self.metrics.total_ticks += 1;
        trace!(tick = self.ticks, "tick");

        TickInfo {
            tick: self.ticks,
            overrun,
            ticks_skipped,
        }
    }

    /// Marks the work for the current tick as finished.
    ///
    /// Measures the time since `wait_for_tick` returned against the period.
    /// Does nothing if no tick is in progress.
    pub fn record_tick_end(&mut self) {
        let Some(started) = self.started_at.take() else {
            return;
        };
        let cost = started.elapsed();
        let utilization = cost.as_secs_f64() / self.period.as_secs_f64();
        self.metrics.budget_utilization = utilization;

        if utilization >= self.config.budget_critical_threshold {
            warn!(
                tick = self.ticks,
                cost_ms = cost.as_secs_f64() * 1000.0,
                utilization_pct = utilization * 100.0,
                "broadcast tick over budget"
            );
        } else if utilization >= self.config.budget_warn_threshold {
            warn!(
                tick = self.ticks,
                cost_ms = cost.as_secs_f64() * 1000.0,
                utilization_pct = utilization * 100.0,
                "broadcast tick near budget"
            );
        }

        if self.config.metrics_enabled {
            self.metrics.max_tick_time = self.metrics.max_tick_time.max(cost);
            let avg = self.metrics.avg_tick_time.as_secs_f64();
            self.metrics.avg_tick_time =
                Duration::from_secs_f64(avg * 0.9 + cost.as_secs_f64() * 0.1);
        }
    }

    pub fn phase(&self) -> TickPhase {
        self.phase
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.config.tick_rate_hz
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }
}
