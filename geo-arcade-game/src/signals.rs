//! Presentation signals emitted by a session for render/audio collaborators.
use serde::{Deserialize, Serialize};

use crate::countdown::CountdownValue;
use crate::session::{GameOverCause, RoundOutcome, Screen};

/// Audio cue kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cue {
    /// Numbered countdown beep.
    Countdown,
    /// High `GO!` beep.
    Go,
    /// Round clock starts.
    Start,
    Correct,
    /// Streak bonus.
    Coin,
    Wrong,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Signal {
    ScreenChanged {
        screen: Screen,
    },
    CountdownTick {
        value: CountdownValue,
    },
    Cue {
        cue: Cue,
    },
    PairChanged {
        current: String,
        next: String,
    },
    RoundResolved {
        outcome: RoundOutcome,
    },
    BonusAwarded {
        amount: u32,
    },
    ScoreChanged {
        score: u32,
        streak: u32,
    },
    TimerUpdated {
        remaining_secs: f64,
        duration_secs: f64,
    },
    GameOver {
        final_score: u32,
        is_new_best: bool,
        cause: GameOverCause,
    },
}

impl Signal {
    /// Per-round feedback that a new session discards if still undelivered.
    #[must_use]
    pub const fn is_round_feedback(&self) -> bool {
        matches!(
            self,
            Self::RoundResolved { .. } | Self::BonusAwarded { .. } | Self::Cue { .. }
        )
    }
}

/// Ordered outbox drained by the host.
#[derive(Debug, Clone, Default)]
pub struct SignalQueue {
    pending: Vec<Signal>,
}

impl SignalQueue {
    pub fn push(&mut self, signal: Signal) {
        log::trace!("signal {signal:?}");
        self.pending.push(signal);
    }

    pub fn cue(&mut self, cue: Cue) {
        self.push(Signal::Cue { cue });
    }

    /// Drop undelivered round feedback (bonus popups, outcome flashes, cues).
    pub fn clear_round_feedback(&mut self) {
        self.pending.retain(|signal| !signal.is_round_feedback());
    }

    pub fn drain(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.pending)
    }

    #[must_use]
    pub fn pending(&self) -> &[Signal] {
        &self.pending
    }
}
