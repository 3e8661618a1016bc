//! Centralized balance and tuning constants for Geo Arcade game logic.
//!
//! These values define the timing and scoring math of a session. They seed
//! [`GameConfig::default`](crate::config::GameConfig) so a host can override
//! them from JSON, while keeping the canonical numbers reviewed in code.

// Round timer ----------------------------------------------------------------
pub const BASE_TIME_SECS: f64 = 10.0;
pub const MIN_TIME_SECS: f64 = 3.0;
pub const TIME_PENALTY_PER_POINT_SECS: f64 = 0.2;
pub const TIMER_TICK_MS: u64 = 100;
/// Remaining time at or below this counts as expired.
pub const TIMER_EXPIRY_EPSILON_SECS: f64 = 0.05;

// Countdown ------------------------------------------------------------------
pub const COUNTDOWN_STEP_MS: u64 = 800;
pub const COUNTDOWN_START: u8 = 3;

// Guess resolution dwell -----------------------------------------------------
pub const CORRECT_DWELL_MS: u64 = 1_000;
pub const WRONG_DWELL_MS: u64 = 400;

// Scoring --------------------------------------------------------------------
pub const BASE_POINTS: u32 = 1;
pub const MAJOR_STREAK_INTERVAL: u32 = 10;
pub const MAJOR_STREAK_BONUS: u32 = 5;
pub const MINOR_STREAK_INTERVAL: u32 = 5;
pub const MINOR_STREAK_BONUS: u32 = 1;

// Data -----------------------------------------------------------------------
pub const MIN_POOL_SIZE: usize = 2;
pub const HIGH_SCORES_STORAGE_KEY: &str = "geoArcadeHighScores";
pub const DEFAULT_DATASET_URL: &str =
    "https://restcountries.com/v3.1/all?fields=name,population,flags,region,area";
pub const DEFAULT_SEED: u64 = 0x0060_EA2C_ADE0;
