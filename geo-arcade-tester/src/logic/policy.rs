use std::fmt;
use std::str::FromStr;

use geo_arcade_game::{ComparisonPair, GuessDirection, Metric};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::Serialize;

/// Number of times the quitter abandons a dwell before playing it out.
pub const QUITTER_RESTARTS: u32 = 2;

/// What a scripted player does on its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    Guess(GuessDirection),
    /// Leave the round alone and let the clock run.
    Wait,
}

/// Decision returned by a [`PlayerPolicy`]
#[derive(Debug, Clone)]
pub struct PolicyDecision {
    pub action: PlayerAction,
    pub rationale: Option<String>,
}

impl PolicyDecision {
    #[must_use]
    pub fn new(action: PlayerAction, rationale: Option<String>) -> Self {
        Self { action, rationale }
    }
}

/// Policy interface for automated play strategies.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Choose an action for the live pair.
    fn decide(&mut self, pair: &ComparisonPair, metric: Metric) -> PolicyDecision;

    /// Called right after an accepted guess; `true` quits during the dwell.
    fn quit_during_dwell(&mut self) -> bool {
        false
    }
}

/// Built-in gameplay strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameplayStrategy {
    Oracle,
    Contrarian,
    AlwaysHigher,
    CoinFlip,
    Idle,
    Quitter,
}

impl GameplayStrategy {
    pub const ALL: [Self; 6] = [
        Self::Oracle,
        Self::Contrarian,
        Self::AlwaysHigher,
        Self::CoinFlip,
        Self::Idle,
        Self::Quitter,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            GameplayStrategy::Oracle => "oracle",
            GameplayStrategy::Contrarian => "contrarian",
            GameplayStrategy::AlwaysHigher => "always-higher",
            GameplayStrategy::CoinFlip => "coin-flip",
            GameplayStrategy::Idle => "idle",
            GameplayStrategy::Quitter => "quitter",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            GameplayStrategy::Oracle => "Reads the hidden value and always guesses right",
            GameplayStrategy::Contrarian => "Reads the hidden value and always guesses wrong",
            GameplayStrategy::AlwaysHigher => "Guesses higher every round",
            GameplayStrategy::CoinFlip => "Guesses at random from the run seed",
            GameplayStrategy::Idle => "Never guesses; the round clock runs out",
            GameplayStrategy::Quitter => "Quits mid-dwell and restarts, then plays it straight",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy> {
        match self {
            GameplayStrategy::Oracle => Box::new(OraclePolicy),
            GameplayStrategy::Contrarian => Box::new(ContrarianPolicy),
            GameplayStrategy::AlwaysHigher => Box::new(AlwaysHigherPolicy),
            GameplayStrategy::CoinFlip => Box::new(CoinFlipPolicy::new(seed)),
            GameplayStrategy::Idle => Box::new(IdlePolicy),
            GameplayStrategy::Quitter => Box::new(QuitterPolicy::new(QUITTER_RESTARTS)),
        }
    }
}

impl fmt::Display for GameplayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for GameplayStrategy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.label() == normalized)
            .ok_or(())
    }
}

struct OraclePolicy;
struct ContrarianPolicy;
struct AlwaysHigherPolicy;
struct IdlePolicy;

struct CoinFlipPolicy {
    rng: ChaCha20Rng,
}

impl CoinFlipPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

struct QuitterPolicy {
    quits_left: u32,
}

impl QuitterPolicy {
    const fn new(quits: u32) -> Self {
        Self { quits_left: quits }
    }
}

/// The direction that is judged correct for `pair`.
#[must_use]
pub fn winning_direction(pair: &ComparisonPair, metric: Metric) -> GuessDirection {
    if pair.next.value(metric) >= pair.current.value(metric) {
        GuessDirection::Higher
    } else {
        GuessDirection::Lower
    }
}

fn gap_rationale(pair: &ComparisonPair, metric: Metric) -> String {
    format!(
        "{} {} vs {} {}",
        pair.current.name,
        pair.current.value(metric),
        pair.next.name,
        pair.next.value(metric)
    )
}

impl PlayerPolicy for OraclePolicy {
    fn name(&self) -> &'static str {
        "Oracle"
    }

    fn decide(&mut self, pair: &ComparisonPair, metric: Metric) -> PolicyDecision {
        PolicyDecision::new(
            PlayerAction::Guess(winning_direction(pair, metric)),
            Some(gap_rationale(pair, metric)),
        )
    }
}

impl PlayerPolicy for ContrarianPolicy {
    fn name(&self) -> &'static str {
        "Contrarian"
    }

    fn decide(&mut self, pair: &ComparisonPair, metric: Metric) -> PolicyDecision {
        let direction = match winning_direction(pair, metric) {
            GuessDirection::Higher => GuessDirection::Lower,
            GuessDirection::Lower => GuessDirection::Higher,
        };
        PolicyDecision::new(
            PlayerAction::Guess(direction),
            Some(gap_rationale(pair, metric)),
        )
    }
}

impl PlayerPolicy for AlwaysHigherPolicy {
    fn name(&self) -> &'static str {
        "Always Higher"
    }

    fn decide(&mut self, _pair: &ComparisonPair, _metric: Metric) -> PolicyDecision {
        PolicyDecision::new(PlayerAction::Guess(GuessDirection::Higher), None)
    }
}

impl PlayerPolicy for CoinFlipPolicy {
    fn name(&self) -> &'static str {
        "Coin Flip"
    }

    fn decide(&mut self, _pair: &ComparisonPair, _metric: Metric) -> PolicyDecision {
        let direction = if self.rng.gen_bool(0.5) {
            GuessDirection::Higher
        } else {
            GuessDirection::Lower
        };
        PolicyDecision::new(PlayerAction::Guess(direction), Some("coin".to_string()))
    }
}

impl PlayerPolicy for IdlePolicy {
    fn name(&self) -> &'static str {
        "Idle"
    }

    fn decide(&mut self, _pair: &ComparisonPair, _metric: Metric) -> PolicyDecision {
        PolicyDecision::new(PlayerAction::Wait, None)
    }
}

impl PlayerPolicy for QuitterPolicy {
    fn name(&self) -> &'static str {
        "Quitter"
    }

    fn decide(&mut self, pair: &ComparisonPair, metric: Metric) -> PolicyDecision {
        PolicyDecision::new(
            PlayerAction::Guess(winning_direction(pair, metric)),
            Some(format!("{} quits left", self.quits_left)),
        )
    }

    fn quit_during_dwell(&mut self) -> bool {
        if self.quits_left == 0 {
            return false;
        }
        self.quits_left -= 1;
        true
    }
}
