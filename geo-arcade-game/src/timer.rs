//! Round timer: a shrinking per-round time budget ticked in fixed quanta.
use crate::config::TimerCfg;
use crate::constants::TIMER_EXPIRY_EPSILON_SECS;
use crate::numbers::{round_f64_to_u64, u64_to_f64};
use crate::scheduler::{Scheduler, TimerEvent, TimerId};

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimerTick {
    /// Still counting down.
    Running { remaining_secs: f64 },
    /// Hit zero on this tick. Reported once per run.
    Expired,
    /// Not running (cancelled, expired earlier, or never started).
    Idle,
}

/// Remaining time is kept in whole milliseconds. Each tick removes one
/// `tick_ms` quantum, so the clock drains in step with the tick cadence.
#[derive(Debug, Clone, Default)]
pub struct RoundTimer {
    remaining_ms: u64,
    duration_ms: u64,
    quantum_ms: u64,
    handle: Option<TimerId>,
}

impl RoundTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a run sized for `score`, cancelling any run in progress.
    /// Returns the duration in seconds.
    pub fn start(
        &mut self,
        cfg: &TimerCfg,
        score: u32,
        scheduler: &mut Scheduler,
        epoch: u64,
    ) -> f64 {
        self.cancel(scheduler);
        let duration = cfg.duration_for(score);
        self.duration_ms = round_f64_to_u64(duration * 1_000.0);
        self.remaining_ms = self.duration_ms;
        self.quantum_ms = cfg.tick_ms;
        self.handle = Some(scheduler.schedule_every(cfg.tick_ms, TimerEvent::RoundTick, epoch));
        log::trace!("round timer started: {duration:.1}s at score {score}");
        duration
    }

    /// Halt ticking. No expiry follows.
    pub fn cancel(&mut self, scheduler: &mut Scheduler) {
        if let Some(handle) = self.handle.take() {
            scheduler.cancel(handle);
        }
    }

    /// Forget the handle without touching the scheduler; used after the
    /// scheduler itself was cleared.
    pub fn disarm(&mut self) {
        self.handle = None;
    }

    /// Take one quantum off the clock.
    pub fn tick(&mut self, scheduler: &mut Scheduler) -> TimerTick {
        if self.handle.is_none() {
            return TimerTick::Idle;
        }
        self.remaining_ms = self.remaining_ms.saturating_sub(self.quantum_ms);
        if self.remaining_secs() <= TIMER_EXPIRY_EPSILON_SECS {
            self.remaining_ms = 0;
            self.cancel(scheduler);
            return TimerTick::Expired;
        }
        TimerTick::Running {
            remaining_secs: self.remaining_secs(),
        }
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    #[must_use]
    pub fn remaining_secs(&self) -> f64 {
        u64_to_f64(self.remaining_ms) / 1_000.0
    }

    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        u64_to_f64(self.duration_ms) / 1_000.0
    }
}
