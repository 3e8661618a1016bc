use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use geo_arcade_game::{Dataset, GameConfig, GameOverCause, Metric, Region};

use crate::logic::policy::{GameplayStrategy, QUITTER_RESTARTS};
use crate::logic::simulation::{
    SimulationConfig, SimulationSummary, new_session, run_realtime, run_virtual,
};
use crate::storage::ScoreStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    pub best_score: u32,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

/// A named check applied to every run of a strategy.
pub type Expectation = fn(&SimulationSummary) -> Result<(), String>;

/// Checks every strategy must satisfy, followed by its own.
#[must_use]
pub fn expectations_for(strategy: GameplayStrategy) -> Vec<Expectation> {
    let mut checks: Vec<Expectation> = vec![
        expect_started,
        expect_game_over,
        expect_score_matches_streak,
        expect_ledger_holds_score,
        expect_no_stale_resolution,
    ];
    match strategy {
        GameplayStrategy::Oracle => checks.push(expect_every_guess_correct),
        GameplayStrategy::Contrarian => checks.push(expect_wrong_guess_ending),
        GameplayStrategy::Idle => checks.push(expect_first_clock_runs_out),
        GameplayStrategy::Quitter => checks.push(expect_quitter_restarts),
        GameplayStrategy::AlwaysHigher | GameplayStrategy::CoinFlip => {}
    }
    checks
}

fn expect_started(summary: &SimulationSummary) -> Result<(), String> {
    if summary.started {
        Ok(())
    } else {
        Err("session never started (pool too small)".to_string())
    }
}

fn expect_game_over(summary: &SimulationSummary) -> Result<(), String> {
    if summary.halted {
        return Err(format!("run halted at {}ms without game over", summary.elapsed_ms));
    }
    summary
        .cause
        .map(|_| ())
        .ok_or_else(|| "run ended without reaching game over".to_string())
}

fn expect_score_matches_streak(summary: &SimulationSummary) -> Result<(), String> {
    if summary.final_score == summary.expected_score {
        Ok(())
    } else {
        Err(format!(
            "score {} does not match streak {} (expected {})",
            summary.final_score, summary.streak, summary.expected_score
        ))
    }
}

fn expect_ledger_holds_score(summary: &SimulationSummary) -> Result<(), String> {
    if summary.best_after >= summary.final_score {
        Ok(())
    } else {
        Err(format!(
            "ledger best {} below final score {}",
            summary.best_after, summary.final_score
        ))
    }
}

fn expect_no_stale_resolution(summary: &SimulationSummary) -> Result<(), String> {
    if summary.stale_resolutions == 0 {
        Ok(())
    } else {
        Err(format!(
            "{} stale resolutions leaked into a restarted session",
            summary.stale_resolutions
        ))
    }
}

fn expect_every_guess_correct(summary: &SimulationSummary) -> Result<(), String> {
    if summary.streak != summary.rounds {
        return Err(format!(
            "oracle streak {} after {} guesses",
            summary.streak, summary.rounds
        ));
    }
    if summary.cause == Some(GameOverCause::WrongGuess) {
        return Err("oracle lost on a wrong guess".to_string());
    }
    Ok(())
}

fn expect_wrong_guess_ending(summary: &SimulationSummary) -> Result<(), String> {
    // Ties are judged correct for either direction, so only they can score.
    if summary.streak != summary.ties {
        return Err(format!(
            "contrarian streak {} with {} ties",
            summary.streak, summary.ties
        ));
    }
    if summary.cause != Some(GameOverCause::WrongGuess) && summary.rounds > summary.ties {
        return Err(format!("contrarian ended by {:?}", summary.cause));
    }
    Ok(())
}

fn expect_first_clock_runs_out(summary: &SimulationSummary) -> Result<(), String> {
    if summary.cause != Some(GameOverCause::TimeUp) || summary.final_score != 0 {
        return Err(format!(
            "idle run ended by {:?} with score {}",
            summary.cause, summary.final_score
        ));
    }
    // Countdown plus a full ten-second round.
    if summary.elapsed_ms < 13_200 {
        return Err(format!("idle run ended early at {}ms", summary.elapsed_ms));
    }
    Ok(())
}

fn expect_quitter_restarts(summary: &SimulationSummary) -> Result<(), String> {
    if summary.restarts == QUITTER_RESTARTS {
        Ok(())
    } else {
        Err(format!(
            "quitter restarted {} times, expected {QUITTER_RESTARTS}",
            summary.restarts
        ))
    }
}

fn evaluate_expectations(
    strategy: GameplayStrategy,
    summary: &SimulationSummary,
) -> Option<String> {
    for expectation in expectations_for(strategy) {
        if let Err(err) = expectation(summary) {
            return Some(err);
        }
    }
    None
}

fn summarize_decision_path(summary: &SimulationSummary) -> String {
    if summary.decisions.is_empty() {
        return "no guesses recorded".to_string();
    }

    summary
        .decisions
        .iter()
        .rev()
        .take(3)
        .map(|entry| {
            format!(
                "{}ms {} -> {} guessed {} ({}) [{}]",
                entry.at_ms,
                entry.current,
                entry.next,
                entry.guess,
                if entry.correct { "correct" } else { "wrong" },
                entry.rationale.as_deref().unwrap_or("-")
            )
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Runs strategies over seeds against one dataset and score store.
pub struct LogicTester {
    config: GameConfig,
    dataset: Dataset,
    store: ScoreStore,
    region: Region,
    metric: Metric,
    max_rounds: u32,
    verbose: bool,
}

impl LogicTester {
    pub fn new(config: GameConfig, dataset: Dataset, store: ScoreStore, verbose: bool) -> Self {
        Self {
            config,
            dataset,
            store,
            region: Region::World,
            metric: Metric::Population,
            max_rounds: 40,
            verbose,
        }
    }

    #[must_use]
    pub fn with_scope(mut self, region: Region, metric: Metric) -> Self {
        self.region = region;
        self.metric = metric;
        self
    }

    #[must_use]
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    fn scenario_name(&self, strategy: GameplayStrategy, seed: u64) -> String {
        format!("{strategy} [{}/{}] seed {seed}", self.region, self.metric)
    }

    fn simulation_config(&self, strategy: GameplayStrategy, seed: u64) -> SimulationConfig {
        SimulationConfig::new(strategy, seed)
            .with_scope(self.region, self.metric)
            .with_max_rounds(self.max_rounds)
    }

    pub fn run_strategy(
        &self,
        strategy: GameplayStrategy,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::new();

        for &seed in seeds {
            if self.verbose {
                println!(
                    "🧪 Testing strategy: {} ({}/{} seed: {})",
                    strategy.label().bright_white(),
                    self.region,
                    self.metric,
                    seed
                );
            }
            let mut outcomes = Vec::with_capacity(iterations);
            for i in 0..iterations {
                let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));
                let start_time = Instant::now();
                let mut session = new_session(
                    &self.config,
                    &self.dataset,
                    self.store.clone(),
                    iteration_seed,
                );
                let summary = run_virtual(
                    &self.simulation_config(strategy, iteration_seed),
                    &mut session,
                );
                outcomes.push((summary, start_time.elapsed()));
            }
            results.push(self.collect(strategy, seed, outcomes));
        }

        results
    }

    /// One wall-clock paced run per seed.
    pub async fn run_strategy_realtime(
        &self,
        strategy: GameplayStrategy,
        seeds: &[u64],
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::new();
        for &seed in seeds {
            if self.verbose {
                println!(
                    "⏱️  Realtime run: {} seed {}",
                    strategy.label().bright_white(),
                    seed
                );
            }
            let start_time = Instant::now();
            let mut session = new_session(&self.config, &self.dataset, self.store.clone(), seed);
            let summary = run_realtime(&self.simulation_config(strategy, seed), &mut session).await;
            results.push(self.collect(strategy, seed, vec![(summary, start_time.elapsed())]));
        }
        results
    }

    fn collect(
        &self,
        strategy: GameplayStrategy,
        seed: u64,
        outcomes: Vec<(SimulationSummary, Duration)>,
    ) -> ScenarioResult {
        let iterations = outcomes.len();
        let mut successes = 0;
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();
        let mut best_score = 0;

        for (i, (summary, duration)) in outcomes.into_iter().enumerate() {
            best_score = best_score.max(summary.final_score);
            if let Some(err) = evaluate_expectations(strategy, &summary) {
                let context = summarize_decision_path(&summary);
                failures.push(format!(
                    "Iteration {} (strategy {}, seed {}, rounds {}, score {}, ending {:?}): {} | {}",
                    i + 1,
                    summary.strategy.label(),
                    summary.seed,
                    summary.rounds,
                    summary.final_score,
                    summary.cause,
                    err,
                    context
                ));
                if self.verbose {
                    println!(
                        "  ❌ Iteration {}/{} failed: {}",
                        i + 1,
                        iterations,
                        err.red()
                    );
                    println!("     ↳ {context}");
                }
            } else {
                successes += 1;
                performance_data.push(duration);
                if self.verbose {
                    println!(
                        "  ✅ Iteration {}/{} passed ({duration:?}) score:{} streak:{} ending:{:?}",
                        i + 1,
                        iterations,
                        summary.final_score,
                        summary.streak,
                        summary.cause
                    );
                }
            }
        }

        let average_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: self.scenario_name(strategy, seed),
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            best_score,
            average_duration,
            performance_data,
        }
    }
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_micros().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let micros = u128::deserialize(deserializer)?;
        Ok(Duration::from_micros(u64::try_from(micros).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let micros: Vec<u128> = durations.iter().map(Duration::as_micros).collect();
        micros.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let micros_vec = Vec::<u128>::deserialize(deserializer)?;
        Ok(micros_vec
            .into_iter()
            .map(|m| Duration::from_micros(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tester() -> LogicTester {
        LogicTester::new(
            GameConfig::default(),
            Dataset::bundled(),
            ScoreStore::from_path(None),
            false,
        )
        .with_max_rounds(15)
    }

    #[test]
    fn every_strategy_meets_its_expectations() {
        let tester = tester();
        for strategy in GameplayStrategy::ALL {
            let results = tester.run_strategy(strategy, &[1, 99], 3);
            assert_eq!(results.len(), 2);
            for result in results {
                assert!(result.passed, "{}: {:?}", result.scenario_name, result.failures);
                assert_eq!(result.successful_iterations, 3);
            }
        }
    }

    #[test]
    fn empty_dataset_fails_start_expectation() {
        let tester = LogicTester::new(
            GameConfig::default(),
            Dataset::empty(),
            ScoreStore::from_path(None),
            false,
        );
        let results = tester.run_strategy(GameplayStrategy::Oracle, &[7], 1);
        assert!(!results[0].passed);
        assert!(results[0].failures[0].contains("never started"));
    }

    #[test]
    fn scenario_names_carry_scope_and_seed() {
        let tester = tester().with_scope(Region::Asia, Metric::Area);
        let results = tester.run_strategy(GameplayStrategy::AlwaysHigher, &[4], 1);
        assert_eq!(results[0].scenario_name, "always-higher [Asia/area] seed 4");
    }

    #[test]
    fn results_serialize_durations_as_micros() {
        let result = ScenarioResult {
            scenario_name: "idle".to_string(),
            passed: true,
            iterations_run: 1,
            successful_iterations: 1,
            failures: Vec::new(),
            best_score: 0,
            average_duration: Duration::from_micros(1_500),
            performance_data: vec![Duration::from_micros(1_500)],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["average_duration"], 1_500);
        let back: ScenarioResult = serde_json::from_value(json).unwrap();
        assert_eq!(back.performance_data, result.performance_data);
    }
}
