//! Tunable session configuration.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    BASE_POINTS, BASE_TIME_SECS, CORRECT_DWELL_MS, COUNTDOWN_STEP_MS, MAJOR_STREAK_BONUS,
    MAJOR_STREAK_INTERVAL, MIN_TIME_SECS, MINOR_STREAK_BONUS, MINOR_STREAK_INTERVAL,
    TIME_PENALTY_PER_POINT_SECS, TIMER_TICK_MS, WRONG_DWELL_MS,
};
use crate::numbers::u32_to_f64;

/// Errors raised when configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be at least {min:.2} (got {value:.2})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("minimum round time {min:.2}s exceeds base round time {base:.2}s")]
    MinTimeExceedsBase { min: f64, base: f64 },
    #[error("{field} must be positive")]
    ZeroInterval { field: &'static str },
}

/// Round timer tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerCfg {
    #[serde(default = "TimerCfg::default_base_time_secs")]
    pub base_time_secs: f64,
    #[serde(default = "TimerCfg::default_min_time_secs")]
    pub min_time_secs: f64,
    #[serde(default = "TimerCfg::default_penalty_per_point_secs")]
    pub penalty_per_point_secs: f64,
    /// Tick cadence. Each tick also takes this much time off the clock.
    #[serde(default = "TimerCfg::default_tick_ms")]
    pub tick_ms: u64,
}

impl TimerCfg {
    const fn default_base_time_secs() -> f64 {
        BASE_TIME_SECS
    }

    const fn default_min_time_secs() -> f64 {
        MIN_TIME_SECS
    }

    const fn default_penalty_per_point_secs() -> f64 {
        TIME_PENALTY_PER_POINT_SECS
    }

    const fn default_tick_ms() -> u64 {
        TIMER_TICK_MS
    }

    /// Round duration in seconds for a given score: `max(min, base - score * penalty)`.
    #[must_use]
    pub fn duration_for(&self, score: u32) -> f64 {
        (self.base_time_secs - u32_to_f64(score) * self.penalty_per_point_secs)
            .max(self.min_time_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_time_secs < 1.0 {
            return Err(ConfigError::MinViolation {
                field: "min_time_secs",
                min: 1.0,
                value: self.min_time_secs,
            });
        }
        if self.min_time_secs > self.base_time_secs {
            return Err(ConfigError::MinTimeExceedsBase {
                min: self.min_time_secs,
                base: self.base_time_secs,
            });
        }
        if self.penalty_per_point_secs < 0.0 {
            return Err(ConfigError::MinViolation {
                field: "penalty_per_point_secs",
                min: 0.0,
                value: self.penalty_per_point_secs,
            });
        }
        if self.tick_ms == 0 {
            return Err(ConfigError::ZeroInterval { field: "tick_ms" });
        }
        Ok(())
    }
}

impl Default for TimerCfg {
    fn default() -> Self {
        Self {
            base_time_secs: Self::default_base_time_secs(),
            min_time_secs: Self::default_min_time_secs(),
            penalty_per_point_secs: Self::default_penalty_per_point_secs(),
            tick_ms: Self::default_tick_ms(),
        }
    }
}

/// Streak bonus tiers. The major tier wins when both intervals divide the streak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusCfg {
    #[serde(default = "BonusCfg::default_base_points")]
    pub base_points: u32,
    #[serde(default = "BonusCfg::default_major_interval")]
    pub major_interval: u32,
    #[serde(default = "BonusCfg::default_major_bonus")]
    pub major_bonus: u32,
    #[serde(default = "BonusCfg::default_minor_interval")]
    pub minor_interval: u32,
    #[serde(default = "BonusCfg::default_minor_bonus")]
    pub minor_bonus: u32,
}

impl BonusCfg {
    const fn default_base_points() -> u32 {
        BASE_POINTS
    }

    const fn default_major_interval() -> u32 {
        MAJOR_STREAK_INTERVAL
    }

    const fn default_major_bonus() -> u32 {
        MAJOR_STREAK_BONUS
    }

    const fn default_minor_interval() -> u32 {
        MINOR_STREAK_INTERVAL
    }

    const fn default_minor_bonus() -> u32 {
        MINOR_STREAK_BONUS
    }

    /// Bonus points earned for reaching `streak`.
    #[must_use]
    pub const fn bonus_for(&self, streak: u32) -> u32 {
        if streak == 0 {
            0
        } else if streak % self.major_interval == 0 {
            self.major_bonus
        } else if streak % self.minor_interval == 0 {
            self.minor_bonus
        } else {
            0
        }
    }

    /// Total points for a correct guess that brings the streak to `streak`.
    #[must_use]
    pub const fn points_for(&self, streak: u32) -> u32 {
        self.base_points + self.bonus_for(streak)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.major_interval == 0 {
            return Err(ConfigError::ZeroInterval {
                field: "major_interval",
            });
        }
        if self.minor_interval == 0 {
            return Err(ConfigError::ZeroInterval {
                field: "minor_interval",
            });
        }
        Ok(())
    }
}

impl Default for BonusCfg {
    fn default() -> Self {
        Self {
            base_points: Self::default_base_points(),
            major_interval: Self::default_major_interval(),
            major_bonus: Self::default_major_bonus(),
            minor_interval: Self::default_minor_interval(),
            minor_bonus: Self::default_minor_bonus(),
        }
    }
}

/// Full session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default)]
    pub timer: TimerCfg,
    #[serde(default)]
    pub bonus: BonusCfg,
    #[serde(default = "GameConfig::default_countdown_step_ms")]
    pub countdown_step_ms: u64,
    #[serde(default = "GameConfig::default_correct_dwell_ms")]
    pub correct_dwell_ms: u64,
    #[serde(default = "GameConfig::default_wrong_dwell_ms")]
    pub wrong_dwell_ms: u64,
}

impl GameConfig {
    const fn default_countdown_step_ms() -> u64 {
        COUNTDOWN_STEP_MS
    }

    const fn default_correct_dwell_ms() -> u64 {
        CORRECT_DWELL_MS
    }

    const fn default_wrong_dwell_ms() -> u64 {
        WRONG_DWELL_MS
    }

    /// Parse a configuration from JSON; omitted fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Dwell before a guess resolves.
    #[must_use]
    pub const fn dwell_ms(&self, correct: bool) -> u64 {
        if correct {
            self.correct_dwell_ms
        } else {
            self.wrong_dwell_ms
        }
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timer.validate()?;
        self.bonus.validate()?;
        if self.countdown_step_ms == 0 {
            return Err(ConfigError::ZeroInterval {
                field: "countdown_step_ms",
            });
        }
        Ok(())
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            timer: TimerCfg::default(),
            bonus: BonusCfg::default(),
            countdown_step_ms: Self::default_countdown_step_ms(),
            correct_dwell_ms: Self::default_correct_dwell_ms(),
            wrong_dwell_ms: Self::default_wrong_dwell_ms(),
        }
    }
}
