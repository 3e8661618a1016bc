use std::ops::ControlFlow;
use std::time::Duration;

use geo_arcade_game::{
    GameConfig, GameOverCause, GameSession, Metric, Region, ScoreStorage, Screen, Signal,
};
use serde::Serialize;

use crate::logic::policy::{GameplayStrategy, PlayerAction, PlayerPolicy, winning_direction};

/// Frame length for the wall-clock driver.
pub const REALTIME_FRAME: Duration = Duration::from_millis(50);

/// Fallback step when no timer is pending.
const IDLE_STEP_MS: u64 = 100;

/// Configuration for a simulation session.
#[derive(Debug, Clone, Copy)]
pub struct SimulationConfig {
    pub seed: u64,
    pub region: Region,
    pub metric: Metric,
    pub strategy: GameplayStrategy,
    /// Guesses after which the player stops and lets the clock run out.
    pub max_rounds: u32,
}

impl SimulationConfig {
    #[must_use]
    pub fn new(strategy: GameplayStrategy, seed: u64) -> Self {
        Self {
            seed,
            region: Region::World,
            metric: Metric::Population,
            strategy,
            max_rounds: 40,
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

    /// Virtual time after which a run is halted as stuck.
    #[must_use]
    pub fn time_limit_ms(&self) -> u64 {
        u64::from(self.max_rounds + 5) * 20_000
    }
}

/// Snapshot of one guess.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionRecord {
    pub at_ms: u64,
    pub current: String,
    pub next: String,
    pub guess: String,
    pub correct: bool,
    pub rationale: Option<String>,
}

/// Everything a run produced, for expectations and reports.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationSummary {
    pub strategy: GameplayStrategy,
    pub seed: u64,
    pub region: Region,
    pub metric: Metric,
    /// Whether the first start succeeded (pool of at least two).
    pub started: bool,
    pub halted: bool,
    pub final_score: u32,
    pub streak: u32,
    /// Score implied by the streak under the session's bonus rules.
    pub expected_score: u32,
    pub cause: Option<GameOverCause>,
    pub is_new_best: bool,
    pub best_after: u32,
    pub rounds: u32,
    pub ties: u32,
    pub restarts: u32,
    pub stale_resolutions: u32,
    pub signals: usize,
    pub bonuses: u32,
    pub elapsed_ms: u64,
    pub decisions: Vec<DecisionRecord>,
}

/// Plays one attempt frame by frame on behalf of a [`PlayerPolicy`].
pub struct Autopilot {
    config: SimulationConfig,
    policy: Box<dyn PlayerPolicy>,
    started: bool,
    halted: bool,
    rounds: u32,
    ties: u32,
    restarts: u32,
    stale_resolutions: u32,
    stale_check_at: Option<u64>,
    signals: usize,
    bonuses: u32,
    decisions: Vec<DecisionRecord>,
}

impl Autopilot {
    #[must_use]
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            policy: config.strategy.create_policy(config.seed),
            config,
            started: false,
            halted: false,
            rounds: 0,
            ties: 0,
            restarts: 0,
            stale_resolutions: 0,
            stale_check_at: None,
            signals: 0,
            bonuses: 0,
            decisions: Vec::new(),
        }
    }

    /// React to the session's current state. Breaks once the attempt is over.
    pub fn on_frame<S: ScoreStorage>(&mut self, session: &mut GameSession<S>) -> ControlFlow<()> {
        self.absorb_signals(session);
        if session.now_ms() > self.config.time_limit_ms() {
            log::warn!(
                "{} seed {} halted at {}ms",
                self.config.strategy,
                self.config.seed,
                session.now_ms()
            );
            self.halted = true;
            return ControlFlow::Break(());
        }

        match session.screen() {
            Screen::GameOver => return ControlFlow::Break(()),
            Screen::Landing => {
                if !session.start_new_game() {
                    log::warn!("pool of {} cannot start a game", session.pool_len());
                    return ControlFlow::Break(());
                }
                if self.started {
                    // Restarted after a quit: the old dwell must not land here.
                    self.stale_check_at =
                        Some(session.now_ms() + session.config().correct_dwell_ms);
                }
                self.started = true;
            }
            Screen::Countdown => self.check_stale_resolution(session),
            Screen::Playing => self.play_turn(session),
        }
        self.absorb_signals(session);
        ControlFlow::Continue(())
    }

    fn check_stale_resolution<S: ScoreStorage>(&mut self, session: &GameSession<S>) {
        let Some(deadline) = self.stale_check_at else {
            return;
        };
        if session.now_ms() < deadline {
            return;
        }
        self.stale_check_at = None;
        if session.score() != 0 || session.streak() != 0 {
            log::error!(
                "stale resolution applied after restart: score {} streak {}",
                session.score(),
                session.streak()
            );
            self.stale_resolutions += 1;
        }
    }

    fn play_turn<S: ScoreStorage>(&mut self, session: &mut GameSession<S>) {
        if session.is_processing() || self.rounds >= self.config.max_rounds {
            return;
        }
        let Some(pair) = session.pair().cloned() else {
            return;
        };
        let metric = session.metric();
        let decision = self.policy.decide(&pair, metric);
        let PlayerAction::Guess(direction) = decision.action else {
            return;
        };
        if !session.guess(direction) {
            return;
        }

        self.rounds += 1;
        if pair.current.value(metric) == pair.next.value(metric) {
            self.ties += 1;
        }
        let correct = direction == winning_direction(&pair, metric)
            || pair.current.value(metric) == pair.next.value(metric);
        log::debug!(
            "[{}] {} -> {} guessed {direction:?} ({})",
            self.policy.name(),
            pair.current.name,
            pair.next.name,
            if correct { "correct" } else { "wrong" }
        );
        self.decisions.push(DecisionRecord {
            at_ms: session.now_ms(),
            current: pair.current.name,
            next: pair.next.name,
            guess: format!("{direction:?}").to_lowercase(),
            correct,
            rationale: decision.rationale,
        });

        if self.policy.quit_during_dwell() {
            session.quit();
            self.restarts += 1;
        }
    }

    fn absorb_signals<S: ScoreStorage>(&mut self, session: &mut GameSession<S>) {
        for signal in session.drain_signals() {
            if matches!(signal, Signal::BonusAwarded { .. }) {
                self.bonuses += 1;
            }
            self.signals += 1;
        }
    }

    /// Final report once the attempt is over.
    #[must_use]
    pub fn finish<S: ScoreStorage>(self, session: &GameSession<S>) -> SimulationSummary {
        let over = session.last_game_over();
        let streak = over.map_or(session.streak(), |summary| summary.streak);
        let bonus = &session.config().bonus;
        SimulationSummary {
            strategy: self.config.strategy,
            seed: self.config.seed,
            region: session.region(),
            metric: session.metric(),
            started: self.started,
            halted: self.halted,
            final_score: over.map_or(session.score(), |summary| summary.final_score),
            streak,
            expected_score: (1..=streak).map(|s| bonus.points_for(s)).sum(),
            cause: over.map(|summary| summary.cause),
            is_new_best: over.is_some_and(|summary| summary.is_new_best),
            best_after: session.best_for_active(),
            rounds: self.rounds,
            ties: self.ties,
            restarts: self.restarts,
            stale_resolutions: self.stale_resolutions,
            signals: self.signals,
            bonuses: self.bonuses,
            elapsed_ms: session.now_ms(),
            decisions: self.decisions,
        }
    }
}

fn prepare<S: ScoreStorage>(
    config: &SimulationConfig,
    session: &mut GameSession<S>,
) -> Autopilot {
    session.set_region(config.region);
    session.set_metric(config.metric);
    Autopilot::new(*config)
}

/// Run one attempt on the virtual clock, jumping straight to each timer.
pub fn run_virtual<S: ScoreStorage>(
    config: &SimulationConfig,
    session: &mut GameSession<S>,
) -> SimulationSummary {
    let mut autopilot = prepare(config, session);
    while autopilot.on_frame(session).is_continue() {
        let step = session.next_event_in_ms().unwrap_or(IDLE_STEP_MS).max(1);
        session.advance(step);
    }
    autopilot.finish(session)
}

/// Run one attempt paced by the wall clock.
pub async fn run_realtime<S: ScoreStorage>(
    config: &SimulationConfig,
    session: &mut GameSession<S>,
) -> SimulationSummary {
    let mut autopilot = prepare(config, session);
    geo_arcade_game::run_realtime(session, REALTIME_FRAME, |s| autopilot.on_frame(s)).await;
    autopilot.finish(session)
}

/// Fresh session over `dataset` for one run.
pub fn new_session<S: ScoreStorage>(
    config: &GameConfig,
    dataset: &geo_arcade_game::Dataset,
    storage: S,
    seed: u64,
) -> GameSession<S> {
    GameSession::new(config.clone(), dataset.clone(), storage, seed)
}
