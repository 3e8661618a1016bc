//! Geo Arcade Game Engine
//!
//! Platform-agnostic core of the Geo Arcade "higher or lower" country trivia
//! game. This crate owns the dataset, the session state machine, the timers,
//! scoring, and the persisted high-score table, without any UI or platform
//! dependencies. Hosts drive time through [`GameSession::advance`] (or the
//! `async` feature's realtime driver) and render from drained [`Signal`]s.

pub mod config;
pub mod constants;
pub mod countdown;
pub mod data;
#[cfg(feature = "async")]
pub mod driver;
pub mod ledger;
pub mod numbers;
pub mod scheduler;
pub mod selector;
pub mod session;
pub mod signals;
pub mod timer;

// Re-export commonly used types
pub use config::{BonusCfg, ConfigError, GameConfig, TimerCfg};
pub use countdown::{Countdown, CountdownStep, CountdownValue};
pub use data::{
    BUNDLED_COUNTRIES_JSON, DataError, Dataset, Entity, Metric, MetricValues, RawCountry, Region,
    clean_records, filter_by_region,
};
#[cfg(feature = "async")]
pub use driver::run_realtime;
pub use ledger::{MemoryStorage, RecordOutcome, ScoreKey, ScoreLedger, ScoreStorage};
pub use scheduler::{Fired, Scheduler, TimerEvent, TimerId};
pub use selector::Selector;
pub use session::{
    ComparisonPair, GameOverCause, GameOverSummary, GameSession, GuessDirection, RoundOutcome,
    Screen,
};
pub use signals::{Cue, Signal, SignalQueue};
pub use timer::{RoundTimer, TimerTick};

/// Trait for abstracting data loading operations
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load raw country records from the platform-specific source
    ///
    /// # Errors
    ///
    /// Returns an error if the records cannot be fetched or parsed.
    fn load_countries(&self) -> Result<Vec<RawCountry>, Self::Error>;
}

/// Main game engine for building sessions from a data source
pub struct GameEngine<L>
where
    L: DataLoader,
{
    data_loader: L,
    config: GameConfig,
}

impl<L> GameEngine<L>
where
    L: DataLoader,
{
    /// Create a new game engine with the provided data loader and default tuning
    pub fn new(data_loader: L) -> Self {
        Self::with_config(data_loader, GameConfig::default())
    }

    pub const fn with_config(data_loader: L, config: GameConfig) -> Self {
        Self {
            data_loader,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Load and clean the dataset
    ///
    /// # Errors
    ///
    /// Returns an error if the loader fails.
    pub fn load_dataset(&self) -> Result<Dataset, L::Error> {
        let records = self.data_loader.load_countries()?;
        Ok(Dataset::from_records(&records))
    }

    /// Construct a session on the landing screen. A failing loader leaves the
    /// session with an empty dataset; [`GameSession::load_dataset`] can supply
    /// one later.
    pub fn create_session<S: ScoreStorage>(&self, storage: S, seed: u64) -> GameSession<S> {
        let dataset = self.load_dataset().unwrap_or_else(|err| {
            log::warn!("country data unavailable, starting empty: {err}");
            Dataset::empty()
        });
        GameSession::new(self.config.clone(), dataset, storage, seed)
    }
}
