//! Best scores per (region, metric), persisted through a [`ScoreStorage`].
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::data::{Metric, Region};

/// Composite high-score key, persisted as `"{region}:{metric}"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScoreKey {
    pub region: Region,
    pub metric: Metric,
}

impl ScoreKey {
    #[must_use]
    pub const fn new(region: Region, metric: Metric) -> Self {
        Self { region, metric }
    }
}

impl fmt::Display for ScoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.region, self.metric)
    }
}

impl FromStr for ScoreKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (region, metric) = s.split_once(':').ok_or(())?;
        Ok(Self {
            region: region.parse()?,
            metric: metric.parse()?,
        })
    }
}

/// Trait for abstracting high-score persistence.
/// Platform-specific implementations should provide this
pub trait ScoreStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the persisted payload, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn read(&self) -> Result<Option<String>, Self::Error>;

    /// Overwrite the persisted payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be written.
    fn write(&self, payload: &str) -> Result<(), Self::Error>;

    /// Remove the persisted payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be removed.
    fn clear(&self) -> Result<(), Self::Error>;
}

/// In-process storage. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slot: Rc<RefCell<Option<String>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_payload(payload: &str) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Some(payload.to_string()))),
        }
    }

    #[must_use]
    pub fn payload(&self) -> Option<String> {
        self.slot.borrow().clone()
    }
}

impl ScoreStorage for MemoryStorage {
    type Error = Infallible;

    fn read(&self) -> Result<Option<String>, Self::Error> {
        Ok(self.payload())
    }

    fn write(&self, payload: &str) -> Result<(), Self::Error> {
        *self.slot.borrow_mut() = Some(payload.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), Self::Error> {
        *self.slot.borrow_mut() = None;
        Ok(())
    }
}

/// Outcome of recording a finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordOutcome {
    /// Best for the key before this attempt (0 when absent).
    pub previous_best: u32,
    /// Whether the attempt strictly beat the previous best and was stored.
    pub stored: bool,
}

impl RecordOutcome {
    /// Game-over "new best" badge: ties count, zero never does.
    #[must_use]
    pub const fn is_new_best(&self, score: u32) -> bool {
        score > 0 && score >= self.previous_best
    }
}

/// Decode a persisted payload, dropping malformed keys and values.
/// An unparseable payload yields an empty map.
#[must_use]
pub fn parse_payload(payload: &str) -> BTreeMap<ScoreKey, u32> {
    let object: Map<String, Value> = match serde_json::from_str(payload) {
        Ok(object) => object,
        Err(err) => {
            log::warn!("ignoring corrupt high-score payload: {err}");
            return BTreeMap::new();
        }
    };
    object
        .into_iter()
        .filter_map(|(key, value)| {
            let parsed_key = key.parse::<ScoreKey>().ok();
            let parsed_value = value.as_u64().and_then(|v| u32::try_from(v).ok());
            match (parsed_key, parsed_value) {
                (Some(key), Some(value)) => Some((key, value)),
                _ => {
                    log::warn!("dropping malformed high-score entry '{key}': {value}");
                    None
                }
            }
        })
        .collect()
}

/// Process-wide best-score table.
#[derive(Debug)]
pub struct ScoreLedger<S: ScoreStorage> {
    best: BTreeMap<ScoreKey, u32>,
    storage: S,
}

impl<S: ScoreStorage> ScoreLedger<S> {
    /// Read the persisted table once. Read failures and corrupt data start empty.
    pub fn load(storage: S) -> Self {
        let best = match storage.read() {
            Ok(Some(payload)) => parse_payload(&payload),
            Ok(None) => BTreeMap::new(),
            Err(err) => {
                log::warn!("high-score storage unreadable, starting empty: {err}");
                BTreeMap::new()
            }
        };
        Self { best, storage }
    }

    #[must_use]
    pub fn best_for(&self, region: Region, metric: Metric) -> u32 {
        self.best
            .get(&ScoreKey::new(region, metric))
            .copied()
            .unwrap_or(0)
    }

    /// Store `score` if it strictly beats the current best for the key.
    pub fn record_attempt(&mut self, region: Region, metric: Metric, score: u32) -> RecordOutcome {
        let key = ScoreKey::new(region, metric);
        let previous_best = self.best.get(&key).copied().unwrap_or(0);
        let stored = score > previous_best;
        if stored {
            self.best.insert(key, score);
            log::debug!("new best for {key}: {score} (was {previous_best})");
            self.persist();
        }
        RecordOutcome {
            previous_best,
            stored,
        }
    }

    /// Erase every entry and the persisted payload.
    pub fn reset_all(&mut self) {
        self.best.clear();
        if let Err(err) = self.storage.clear() {
            log::warn!("failed to clear persisted high scores: {err}");
        }
    }

    /// Every stored best, ordered by key.
    pub fn entries(&self) -> impl Iterator<Item = (ScoreKey, u32)> + '_ {
        self.best.iter().map(|(key, score)| (*key, *score))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.best.is_empty()
    }

    /// The table in its persisted JSON form.
    #[must_use]
    pub fn to_payload(&self) -> String {
        let object: Map<String, Value> = self
            .best
            .iter()
            .map(|(key, score)| (key.to_string(), Value::from(*score)))
            .collect();
        Value::Object(object).to_string()
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    fn persist(&self) {
        if let Err(err) = self.storage.write(&self.to_payload()) {
            log::warn!("failed to persist high scores: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untouched_key_is_zero() {
        let ledger = ScoreLedger::load(MemoryStorage::new());
        assert_eq!(ledger.best_for(Region::Asia, Metric::Area), 0);
        assert!(ledger.is_empty());
    }

    #[test]
    fn best_never_decreases() {
        let storage = MemoryStorage::new();
        let mut ledger = ScoreLedger::load(storage.clone());
        let attempts = [3, 1, 7, 7, 2, 9, 0, 4];
        let mut running_max = 0;
        for score in attempts {
            let outcome = ledger.record_attempt(Region::World, Metric::Population, score);
            assert_eq!(outcome.previous_best, running_max);
            assert_eq!(outcome.stored, score > running_max);
            running_max = running_max.max(score);
            assert_eq!(ledger.best_for(Region::World, Metric::Population), running_max);
        }
        assert_eq!(
            storage.payload().as_deref(),
            Some(r#"{"World:population":9}"#)
        );
    }

    #[test]
    fn keys_are_independent() {
        let mut ledger = ScoreLedger::load(MemoryStorage::new());
        ledger.record_attempt(Region::Europe, Metric::Density, 12);
        assert_eq!(ledger.best_for(Region::Europe, Metric::Density), 12);
        assert_eq!(ledger.best_for(Region::Europe, Metric::Area), 0);
        assert_eq!(ledger.best_for(Region::World, Metric::Density), 0);
    }

    #[test]
    fn new_best_badge_counts_ties_but_not_zero() {
        let tie = RecordOutcome {
            previous_best: 5,
            stored: false,
        };
        assert!(tie.is_new_best(5));
        assert!(!tie.is_new_best(4));
        let fresh = RecordOutcome {
            previous_best: 0,
            stored: false,
        };
        assert!(!fresh.is_new_best(0));
    }

    #[test]
    fn reload_restores_and_drops_malformed_entries() {
        let storage = MemoryStorage::with_payload(
            r#"{"World:population":4,"Mars:area":9,"Asia:volume":2,"Africa:area":"x","Europe:capital":11}"#,
        );
        let ledger = ScoreLedger::load(storage);
        let entries: Vec<(String, u32)> = ledger
            .entries()
            .map(|(key, score)| (key.to_string(), score))
            .collect();
        assert_eq!(
            entries,
            vec![
                ("World:population".to_string(), 4),
                ("Europe:capital".to_string(), 11),
            ]
        );
    }

    #[test]
    fn corrupt_payload_starts_empty_and_is_overwritten() {
        let storage = MemoryStorage::with_payload("{{{ not json");
        let mut ledger = ScoreLedger::load(storage.clone());
        assert!(ledger.is_empty());
        ledger.record_attempt(Region::Oceania, Metric::Area, 2);
        assert_eq!(storage.payload().as_deref(), Some(r#"{"Oceania:area":2}"#));
    }

    #[test]
    fn reset_clears_memory_and_storage() {
        let storage = MemoryStorage::new();
        let mut ledger = ScoreLedger::load(storage.clone());
        ledger.record_attempt(Region::World, Metric::Area, 8);
        ledger.reset_all();
        assert!(ledger.is_empty());
        assert!(storage.payload().is_none());
        assert_eq!(ledger.best_for(Region::World, Metric::Area), 0);
    }

    #[test]
    fn key_roundtrips_through_display() {
        let key = ScoreKey::new(Region::Americas, Metric::Capital);
        assert_eq!(key.to_string(), "Americas:capital");
        assert_eq!("Americas:capital".parse::<ScoreKey>(), Ok(key));
        assert!("Americas".parse::<ScoreKey>().is_err());
    }

    #[test]
    fn persisted_keys_must_match_exactly() {
        assert!("world:population".parse::<ScoreKey>().is_err());
        assert!("World:Population".parse::<ScoreKey>().is_err());

        let storage =
            MemoryStorage::with_payload(r#"{"world:population":7,"World:Population":8,"World:area":3}"#);
        let ledger = ScoreLedger::load(storage);
        assert_eq!(ledger.best_for(Region::World, Metric::Population), 0);
        assert_eq!(ledger.best_for(Region::World, Metric::Area), 3);
        assert_eq!(ledger.entries().count(), 1);
    }
}
