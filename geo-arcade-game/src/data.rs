//! Playable entities, raw source records, and the region-filtered pool.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::constants::MIN_POOL_SIZE;
use crate::numbers::{density, round_f64_to_u64, u64_to_f64};

/// Countries bundled with the crate, in the public countries API wire shape.
pub const BUNDLED_COUNTRIES_JSON: &str = include_str!("../assets/countries.json");

/// Errors raised while turning raw source data into a dataset.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to parse country records: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The statistic compared in a session (the game mode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Population,
    Area,
    Density,
    /// Capital-city population; the card shows the capital's name.
    Capital,
}

impl Metric {
    pub const ALL: [Self; 4] = [Self::Population, Self::Area, Self::Density, Self::Capital];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Population => "population",
            Self::Area => "area",
            Self::Density => "density",
            Self::Capital => "capital",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Population => "POPULATION",
            Self::Area => "AREA",
            Self::Density => "DENSITY",
            Self::Capital => "CAPITAL",
        }
    }

    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Area => " KM²",
            Self::Density => "/KM²",
            Self::Population | Self::Capital => "",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "population" => Ok(Self::Population),
            "area" => Ok(Self::Area),
            "density" => Ok(Self::Density),
            "capital" => Ok(Self::Capital),
            _ => Err(()),
        }
    }
}

/// Pool filter. `World` keeps every entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum Region {
    #[default]
    World,
    Africa,
    Americas,
    Asia,
    Europe,
    Oceania,
}

impl Region {
    pub const ALL: [Self; 6] = [
        Self::World,
        Self::Africa,
        Self::Americas,
        Self::Asia,
        Self::Europe,
        Self::Oceania,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::World => "World",
            Self::Africa => "Africa",
            Self::Americas => "Americas",
            Self::Asia => "Asia",
            Self::Europe => "Europe",
            Self::Oceania => "Oceania",
        }
    }

    /// Whether an entity classified as `region` belongs to this pool.
    #[must_use]
    pub fn admits(self, region: &str) -> bool {
        matches!(self, Self::World) || self.as_str() == region
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact names only, matching [`Metric`]'s parser.
impl FromStr for Region {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|region| region.as_str() == s)
            .ok_or(())
    }
}

/// Metric values of one entity. Density is derived once at load time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricValues {
    pub population: u64,
    pub area: f64,
    pub density: u64,
    pub capital_population: u64,
}

impl MetricValues {
    #[must_use]
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Population => u64_to_f64(self.population),
            Metric::Area => self.area,
            Metric::Density => u64_to_f64(self.density),
            Metric::Capital => u64_to_f64(self.capital_population),
        }
    }
}

/// A playable country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub metrics: MetricValues,
    pub region: String,
    pub image_ref: String,
    #[serde(default)]
    pub capital: Option<String>,
}

impl Entity {
    /// Build an entity directly; the capital population defaults to the
    /// country population and density is derived from `area`.
    #[must_use]
    pub fn new(name: &str, region: &str, population: u64, area: f64) -> Self {
        Self {
            name: name.to_string(),
            metrics: MetricValues {
                population,
                area,
                density: density(population, area).unwrap_or(0),
                capital_population: population,
            },
            region: region.to_string(),
            image_ref: String::new(),
            capital: None,
        }
    }

    #[must_use]
    pub fn with_capital(mut self, capital: &str, capital_population: u64) -> Self {
        self.capital = Some(capital.to_string());
        self.metrics.capital_population = capital_population;
        self
    }

    #[must_use]
    pub fn with_image(mut self, image_ref: &str) -> Self {
        self.image_ref = image_ref.to_string();
        self
    }

    #[must_use]
    pub fn value(&self, metric: Metric) -> f64 {
        self.metrics.value(metric)
    }

    /// Card title: the capital's name in capital mode, otherwise the country name.
    #[must_use]
    pub fn title(&self, metric: Metric) -> &str {
        match (metric, self.capital.as_deref()) {
            (Metric::Capital, Some(capital)) => capital,
            _ => &self.name,
        }
    }

    /// Convert a raw record, returning `None` when a required field is
    /// missing, zero, or not a finite number.
    #[must_use]
    pub fn from_raw(raw: &RawCountry) -> Option<Self> {
        let name = raw.name.common.trim();
        let image = raw.flags.png.as_deref().map(str::trim).unwrap_or_default();
        if name.is_empty() || image.is_empty() {
            return None;
        }
        let population = raw
            .population
            .filter(|p| p.is_finite() && *p > 0.0)
            .map(round_f64_to_u64)?;
        let area = raw.area.filter(|a| a.is_finite() && *a > 0.0)?;
        let density = density(population, area)?;
        let capital_population = raw
            .capital_population
            .filter(|p| p.is_finite() && *p > 0.0)
            .map_or(population, round_f64_to_u64);
        Some(Self {
            name: name.to_string(),
            metrics: MetricValues {
                population,
                area,
                density,
                capital_population,
            },
            region: raw.region.clone(),
            image_ref: image.to_string(),
            capital: raw.capital.first().cloned(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawName {
    #[serde(default)]
    pub common: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFlags {
    #[serde(default)]
    pub png: Option<String>,
}

/// One country record as served by the countries API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCountry {
    #[serde(default)]
    pub name: RawName,
    #[serde(default)]
    pub population: Option<f64>,
    #[serde(default)]
    pub area: Option<f64>,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub flags: RawFlags,
    #[serde(default)]
    pub capital: Vec<String>,
    #[serde(default, rename = "capitalPopulation")]
    pub capital_population: Option<f64>,
}

/// Drop incomplete records and duplicate names, deriving density on the way.
#[must_use]
pub fn clean_records(records: &[RawCountry]) -> Vec<Entity> {
    let mut seen = HashSet::new();
    let mut cleaned = Vec::with_capacity(records.len());
    let mut rejected = 0_usize;
    for raw in records {
        match Entity::from_raw(raw) {
            Some(entity) if seen.insert(entity.name.clone()) => cleaned.push(entity),
            Some(entity) => {
                log::warn!("dropping duplicate country record '{}'", entity.name);
                rejected += 1;
            }
            None => rejected += 1,
        }
    }
    if rejected > 0 {
        log::debug!(
            "kept {} of {} country records ({rejected} rejected)",
            cleaned.len(),
            records.len()
        );
    }
    cleaned
}

/// Entities eligible in `region`; `World` returns everything.
#[must_use]
pub fn filter_by_region(all: &[Entity], region: Region) -> Vec<Entity> {
    all.iter()
        .filter(|entity| region.admits(&entity.region))
        .cloned()
        .collect()
}

/// The full cleaned dataset plus the active region-filtered pool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    all: Vec<Entity>,
    pool: Vec<Entity>,
    region: Region,
}

impl Dataset {
    /// Empty dataset; sessions cannot start until data arrives.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a JSON array of raw country records.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into country records.
    pub fn from_json(json: &str) -> Result<Self, DataError> {
        let records: Vec<RawCountry> = serde_json::from_str(json)?;
        Ok(Self::from_records(&records))
    }

    #[must_use]
    pub fn from_records(records: &[RawCountry]) -> Self {
        Self::from_entities(clean_records(records))
    }

    /// Build from already-clean entities. Later duplicates of a name are dropped.
    #[must_use]
    pub fn from_entities(entities: Vec<Entity>) -> Self {
        let mut seen = HashSet::new();
        let all: Vec<Entity> = entities
            .into_iter()
            .filter(|entity| seen.insert(entity.name.clone()))
            .collect();
        Self {
            pool: all.clone(),
            all,
            region: Region::World,
        }
    }

    /// Dataset built from the bundled asset, or empty if the asset is unreadable.
    #[must_use]
    pub fn bundled() -> Self {
        Self::from_json(BUNDLED_COUNTRIES_JSON).unwrap_or_else(|err| {
            log::warn!("bundled dataset unavailable: {err}");
            Self::empty()
        })
    }

    #[must_use]
    pub fn all(&self) -> &[Entity] {
        &self.all
    }

    #[must_use]
    pub fn pool(&self) -> &[Entity] {
        &self.pool
    }

    #[must_use]
    pub const fn region(&self) -> Region {
        self.region
    }

    /// Re-filter the active pool from the full dataset.
    pub fn set_region(&mut self, region: Region) {
        self.region = region;
        self.pool = filter_by_region(&self.all, region);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Whether the active pool can form a comparison pair.
    #[must_use]
    pub fn is_playable(&self) -> bool {
        self.pool.len() >= MIN_POOL_SIZE
    }
}
