//! The `3, 2, 1, GO!` sequence that precedes the first round.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::COUNTDOWN_START;
use crate::scheduler::{Scheduler, TimerEvent, TimerId};

/// Value shown on the countdown screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountdownValue {
    Number(u8),
    Go,
}

impl fmt::Display for CountdownValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Go => f.write_str("GO!"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStep {
    Tick(CountdownValue),
    /// `GO!` finished its dwell.
    Finished,
    Idle,
}

#[derive(Debug, Clone, Default)]
pub struct Countdown {
    value: Option<CountdownValue>,
    handle: Option<TimerId>,
}

impl Countdown {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Show the first value and arm the step timer. Any earlier run is cancelled.
    pub fn begin(&mut self, step_ms: u64, scheduler: &mut Scheduler, epoch: u64) -> CountdownValue {
        self.cancel(scheduler);
        let first = CountdownValue::Number(COUNTDOWN_START);
        self.value = Some(first);
        self.handle = Some(scheduler.schedule_every(step_ms, TimerEvent::CountdownStep, epoch));
        first
    }

    pub fn step(&mut self, scheduler: &mut Scheduler) -> CountdownStep {
        if self.handle.is_none() {
            return CountdownStep::Idle;
        }
        let next = match self.value {
            Some(CountdownValue::Number(n)) if n > 1 => CountdownValue::Number(n - 1),
            Some(CountdownValue::Number(_)) => CountdownValue::Go,
            Some(CountdownValue::Go) | None => {
                self.cancel(scheduler);
                return CountdownStep::Finished;
            }
        };
        self.value = Some(next);
        CountdownStep::Tick(next)
    }

    pub fn cancel(&mut self, scheduler: &mut Scheduler) {
        if let Some(handle) = self.handle.take() {
            scheduler.cancel(handle);
        }
    }

    pub fn disarm(&mut self) {
        self.handle = None;
    }

    #[must_use]
    pub const fn value(&self) -> Option<CountdownValue> {
        self.value
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}
