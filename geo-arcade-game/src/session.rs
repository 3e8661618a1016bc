//! Session state machine: screens, comparison pairs, guesses, and game over.
//!
//! ```text
//! landing ──start──▶ countdown ──GO! dwell──▶ playing ──wrong / time up──▶ gameover
//!    ▲                                          │  ▲                           │
//!    │                                          └──┘ correct                   │
//!    └──────────────────────── quit (any screen) ◀──────── retry (start) ─────┘
//! ```
//!
//! All timing runs on the session's [`Scheduler`]; the host calls
//! [`GameSession::advance`] to move time. Every scheduled event carries the
//! epoch it was created under, and the epoch moves on whenever the session
//! tears its timers down, so a stale dwell or tick can never touch a newer
//! attempt.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::GameConfig;
use crate::countdown::{Countdown, CountdownStep, CountdownValue};
use crate::data::{Dataset, Entity, Metric, Region};
use crate::ledger::{ScoreKey, ScoreLedger, ScoreStorage};
use crate::scheduler::{Fired, Scheduler, TimerEvent, TimerId};
use crate::selector::Selector;
use crate::signals::{Cue, Signal, SignalQueue};
use crate::timer::{RoundTimer, TimerTick};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Screen {
    #[default]
    Landing,
    Countdown,
    Playing,
    GameOver,
}

impl Screen {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Landing => "landing",
            Self::Countdown => "countdown",
            Self::Playing => "playing",
            Self::GameOver => "gameover",
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuessDirection {
    Higher,
    Lower,
}

impl GuessDirection {
    /// Whether the guess holds for `current` → `next`. Ties satisfy both directions.
    #[must_use]
    pub fn judge(self, current: f64, next: f64) -> bool {
        match self {
            Self::Higher => next >= current,
            Self::Lower => next <= current,
        }
    }
}

impl FromStr for GuessDirection {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "higher" => Ok(Self::Higher),
            "lower" => Ok(Self::Lower),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundOutcome {
    Correct,
    Wrong,
}

/// Why an attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverCause {
    WrongGuess,
    TimeUp,
    /// No fresh comparison target could be drawn.
    PoolExhausted,
}

/// The live `(current, next)` pair. Names always differ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonPair {
    pub current: Entity,
    pub next: Entity,
}

/// Snapshot taken when an attempt ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOverSummary {
    pub final_score: u32,
    pub streak: u32,
    pub previous_best: u32,
    pub is_new_best: bool,
    pub cause: GameOverCause,
}

pub struct GameSession<S: ScoreStorage> {
    config: GameConfig,
    dataset: Dataset,
    selector: Selector,
    ledger: ScoreLedger<S>,
    scheduler: Scheduler,
    timer: RoundTimer,
    countdown: Countdown,
    resolution: Option<TimerId>,
    epoch: u64,
    screen: Screen,
    metric: Metric,
    pair: Option<ComparisonPair>,
    score: u32,
    streak: u32,
    processing: bool,
    revealed: bool,
    last_outcome: Option<RoundOutcome>,
    last_game_over: Option<GameOverSummary>,
    signals: SignalQueue,
}

impl<S: ScoreStorage> fmt::Debug for GameSession<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameSession")
            .field("screen", &self.screen)
            .field("region", &self.dataset.region())
            .field("metric", &self.metric)
            .field("score", &self.score)
            .field("streak", &self.streak)
            .field("epoch", &self.epoch)
            .field("now_ms", &self.scheduler.now_ms())
            .finish_non_exhaustive()
    }
}

impl<S: ScoreStorage> GameSession<S> {
    /// Build a session on the landing screen. The ledger is read from
    /// `storage` exactly once, here.
    pub fn new(config: GameConfig, dataset: Dataset, storage: S, seed: u64) -> Self {
        Self {
            config,
            dataset,
            selector: Selector::new(seed),
            ledger: ScoreLedger::load(storage),
            scheduler: Scheduler::new(),
            timer: RoundTimer::new(),
            countdown: Countdown::new(),
            resolution: None,
            epoch: 0,
            screen: Screen::Landing,
            metric: Metric::default(),
            pair: None,
            score: 0,
            streak: 0,
            processing: false,
            revealed: false,
            last_outcome: None,
            last_game_over: None,
            signals: SignalQueue::default(),
        }
    }

    /// Replace the dataset (late arrival of the fetch). The active region is kept.
    pub fn load_dataset(&mut self, mut dataset: Dataset) {
        dataset.set_region(self.dataset.region());
        log::debug!(
            "dataset loaded: {} entities, {} in {}",
            dataset.all().len(),
            dataset.pool().len(),
            dataset.region()
        );
        self.dataset = dataset;
    }

    // --- player actions -------------------------------------------------

    /// Start (or retry) an attempt. Returns `false`, leaving the session
    /// untouched, when the pool cannot form a pair.
    pub fn start_new_game(&mut self) -> bool {
        let Some((current, next)) = self
            .selector
            .draw_pair(self.dataset.pool())
            .map(|(current, next)| (current.clone(), next.clone()))
        else {
            log::debug!(
                "start ignored: pool of {} in {} cannot form a pair",
                self.dataset.pool().len(),
                self.dataset.region()
            );
            return false;
        };

        self.cancel_all();
        self.score = 0;
        self.streak = 0;
        self.processing = false;
        self.revealed = false;
        self.last_outcome = None;
        self.last_game_over = None;
        self.signals.clear_round_feedback();

        self.signals.push(Signal::PairChanged {
            current: current.name.clone(),
            next: next.name.clone(),
        });
        self.pair = Some(ComparisonPair { current, next });
        self.set_screen(Screen::Countdown);
        self.emit_score();

        let first = self
            .countdown
            .begin(self.config.countdown_step_ms, &mut self.scheduler, self.epoch);
        self.emit_countdown(first);
        log::debug!(
            "attempt started (epoch {}, {} / {})",
            self.epoch,
            self.dataset.region(),
            self.metric
        );
        true
    }

    /// Submit a guess. Returns whether it was accepted.
    pub fn guess(&mut self, direction: GuessDirection) -> bool {
        if self.screen != Screen::Playing || self.processing {
            return false;
        }
        let Some(pair) = self.pair.as_ref() else {
            return false;
        };
        let correct = direction.judge(pair.current.value(self.metric), pair.next.value(self.metric));

        self.processing = true;
        self.timer.cancel(&mut self.scheduler);
        self.revealed = true;
        let outcome = if correct {
            RoundOutcome::Correct
        } else {
            RoundOutcome::Wrong
        };
        self.last_outcome = Some(outcome);
        self.signals.push(Signal::RoundResolved { outcome });
        if !correct {
            self.signals.cue(Cue::Wrong);
        }

        let dwell = self.config.dwell_ms(correct);
        self.resolution = Some(self.scheduler.schedule_once(
            dwell,
            TimerEvent::ResolveGuess { correct },
            self.epoch,
        ));
        log::trace!("guess {direction:?} judged {outcome:?}, resolving in {dwell}ms");
        true
    }

    /// Abandon the attempt from any screen.
    pub fn quit(&mut self) {
        self.cancel_all();
        self.processing = false;
        self.revealed = false;
        self.last_outcome = None;
        self.set_screen(Screen::Landing);
    }

    /// Switch the pool filter, re-filtering from the full dataset.
    pub fn set_region(&mut self, region: Region) {
        if self.is_active() {
            log::warn!("region changed to {region} during an active attempt");
        }
        self.dataset.set_region(region);
    }

    /// Switch the compared statistic.
    pub fn set_metric(&mut self, metric: Metric) {
        if self.is_active() {
            log::warn!("metric changed to {metric} during an active attempt");
        }
        self.metric = metric;
    }

    pub fn reset_high_scores(&mut self) {
        self.ledger.reset_all();
    }

    // --- time -----------------------------------------------------------

    /// Move the virtual clock forward, firing every timer that falls due.
    pub fn advance(&mut self, elapsed_ms: u64) {
        let target = self.scheduler.now_ms().saturating_add(elapsed_ms);
        while let Some(fired) = self.scheduler.pop_due(target) {
            self.dispatch(fired);
        }
        self.scheduler.advance_to(target);
    }

    /// Milliseconds until the next timer fires, if any.
    #[must_use]
    pub fn next_event_in_ms(&self) -> Option<u64> {
        self.scheduler
            .next_due_ms()
            .map(|due| due.saturating_sub(self.scheduler.now_ms()))
    }

    fn dispatch(&mut self, fired: Fired) {
        if fired.epoch != self.epoch {
            log::trace!(
                "dropping stale {:?} from epoch {} (current {})",
                fired.event,
                fired.epoch,
                self.epoch
            );
            return;
        }
        match fired.event {
            TimerEvent::CountdownStep => self.on_countdown_step(),
            TimerEvent::RoundTick => self.on_round_tick(),
            TimerEvent::ResolveGuess { correct } => {
                if self.resolution == Some(fired.id) {
                    self.resolution = None;
                }
                self.on_resolution(correct);
            }
        }
    }

    fn on_countdown_step(&mut self) {
        match self.countdown.step(&mut self.scheduler) {
            CountdownStep::Tick(value) => self.emit_countdown(value),
            CountdownStep::Finished if self.screen == Screen::Countdown => {
                self.set_screen(Screen::Playing);
                self.signals.cue(Cue::Start);
                self.start_round_timer();
            }
            CountdownStep::Finished | CountdownStep::Idle => {}
        }
    }

    fn on_round_tick(&mut self) {
        if self.screen != Screen::Playing {
            return;
        }
        match self.timer.tick(&mut self.scheduler) {
            TimerTick::Running { remaining_secs } => {
                self.signals.push(Signal::TimerUpdated {
                    remaining_secs,
                    duration_secs: self.timer.duration_secs(),
                });
            }
            TimerTick::Expired => {
                self.signals.push(Signal::TimerUpdated {
                    remaining_secs: 0.0,
                    duration_secs: self.timer.duration_secs(),
                });
                self.game_over(GameOverCause::TimeUp);
            }
            TimerTick::Idle => {}
        }
    }

    fn on_resolution(&mut self, correct: bool) {
        if self.screen != Screen::Playing {
            return;
        }
        if !correct {
            self.game_over(GameOverCause::WrongGuess);
            return;
        }

        self.streak += 1;
        let bonus = self.config.bonus.bonus_for(self.streak);
        self.score += self.config.bonus.points_for(self.streak);
        if bonus > 0 {
            self.signals.push(Signal::BonusAwarded { amount: bonus });
            self.signals.cue(Cue::Coin);
        } else {
            self.signals.cue(Cue::Correct);
        }
        self.emit_score();

        let fresh = match self.pair.as_ref() {
            Some(pair) => self
                .selector
                .pick(self.dataset.pool(), Some(&pair.next.name))
                .cloned(),
            None => None,
        };
        let Some(next) = fresh else {
            log::warn!(
                "no fresh target in a pool of {} ({})",
                self.dataset.pool().len(),
                self.dataset.region()
            );
            self.game_over(GameOverCause::PoolExhausted);
            return;
        };
        let Some(promoted) = self.pair.take().map(|pair| pair.next) else {
            self.game_over(GameOverCause::PoolExhausted);
            return;
        };

        self.signals.push(Signal::PairChanged {
            current: promoted.name.clone(),
            next: next.name.clone(),
        });
        self.pair = Some(ComparisonPair {
            current: promoted,
            next,
        });
        self.processing = false;
        self.revealed = false;
        self.last_outcome = None;
        self.start_round_timer();
    }

    // --- transitions ----------------------------------------------------

    fn game_over(&mut self, cause: GameOverCause) {
        self.cancel_all();
        let region = self.dataset.region();
        let outcome = self.ledger.record_attempt(region, self.metric, self.score);
        let summary = GameOverSummary {
            final_score: self.score,
            streak: self.streak,
            previous_best: outcome.previous_best,
            is_new_best: outcome.is_new_best(self.score),
            cause,
        };
        self.last_game_over = Some(summary);
        self.set_screen(Screen::GameOver);
        self.signals.cue(Cue::Wrong);
        self.signals.push(Signal::GameOver {
            final_score: summary.final_score,
            is_new_best: summary.is_new_best,
            cause,
        });
        log::debug!(
            "game over ({cause:?}) with {} points in {region} / {}",
            self.score,
            self.metric
        );
    }

    fn start_round_timer(&mut self) {
        let duration = self
            .timer
            .start(&self.config.timer, self.score, &mut self.scheduler, self.epoch);
        self.signals.push(Signal::TimerUpdated {
            remaining_secs: duration,
            duration_secs: duration,
        });
    }

    /// Tear down every timer and invalidate anything scheduled so far.
    fn cancel_all(&mut self) {
        let dropped = self.scheduler.cancel_all();
        self.timer.disarm();
        self.countdown.disarm();
        self.resolution = None;
        self.epoch += 1;
        if dropped > 0 {
            log::trace!("cancelled {dropped} pending timers, epoch now {}", self.epoch);
        }
    }

    fn set_screen(&mut self, screen: Screen) {
        self.screen = screen;
        self.signals.push(Signal::ScreenChanged { screen });
    }

    fn emit_score(&mut self) {
        self.signals.push(Signal::ScoreChanged {
            score: self.score,
            streak: self.streak,
        });
    }

    fn emit_countdown(&mut self, value: CountdownValue) {
        self.signals.push(Signal::CountdownTick { value });
        self.signals.cue(match value {
            CountdownValue::Number(_) => Cue::Countdown,
            CountdownValue::Go => Cue::Go,
        });
    }

    // --- views ----------------------------------------------------------

    #[must_use]
    pub const fn screen(&self) -> Screen {
        self.screen
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.screen, Screen::Countdown | Screen::Playing)
    }

    #[must_use]
    pub const fn pair(&self) -> Option<&ComparisonPair> {
        self.pair.as_ref()
    }

    #[must_use]
    pub const fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub const fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub const fn metric(&self) -> Metric {
        self.metric
    }

    #[must_use]
    pub const fn region(&self) -> Region {
        self.dataset.region()
    }

    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    #[must_use]
    pub const fn now_ms(&self) -> u64 {
        self.scheduler.now_ms()
    }

    #[must_use]
    pub fn time_left(&self) -> f64 {
        self.timer.remaining_secs()
    }

    #[must_use]
    pub fn round_duration(&self) -> f64 {
        self.timer.duration_secs()
    }

    #[must_use]
    pub const fn is_timer_running(&self) -> bool {
        self.timer.is_running()
    }

    #[must_use]
    pub const fn countdown_value(&self) -> Option<CountdownValue> {
        self.countdown.value()
    }

    #[must_use]
    pub const fn is_processing(&self) -> bool {
        self.processing
    }

    /// Whether `next`'s value is currently shown.
    #[must_use]
    pub const fn is_revealed(&self) -> bool {
        self.revealed
    }

    #[must_use]
    pub const fn last_outcome(&self) -> Option<RoundOutcome> {
        self.last_outcome
    }

    #[must_use]
    pub const fn last_game_over(&self) -> Option<GameOverSummary> {
        self.last_game_over
    }

    #[must_use]
    pub fn best_for_active(&self) -> u32 {
        self.ledger.best_for(self.dataset.region(), self.metric)
    }

    #[must_use]
    pub fn high_scores(&self) -> Vec<(ScoreKey, u32)> {
        self.ledger.entries().collect()
    }

    #[must_use]
    pub const fn ledger(&self) -> &ScoreLedger<S> {
        &self.ledger
    }

    #[must_use]
    pub const fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    #[must_use]
    pub fn pool_len(&self) -> usize {
        self.dataset.pool().len()
    }

    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Take every signal emitted since the last drain.
    pub fn drain_signals(&mut self) -> Vec<Signal> {
        self.signals.drain()
    }

    #[must_use]
    pub fn pending_signals(&self) -> &[Signal] {
        self.signals.pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryStorage;

    const COUNTDOWN_TOTAL_MS: u64 = 3_200;

    fn trio() -> Dataset {
        Dataset::from_entities(vec![
            Entity::new("A", "Europe", 10, 1.0),
            Entity::new("B", "Europe", 20, 1.0),
            Entity::new("C", "Asia", 5, 1.0),
        ])
    }

    fn session_with(dataset: Dataset) -> GameSession<MemoryStorage> {
        GameSession::new(GameConfig::default(), dataset, MemoryStorage::new(), 42)
    }

    fn playing(dataset: Dataset) -> GameSession<MemoryStorage> {
        let mut session = session_with(dataset);
        assert!(session.start_new_game());
        session.advance(COUNTDOWN_TOTAL_MS);
        assert_eq!(session.screen(), Screen::Playing);
        session
    }

    fn correct_direction(session: &GameSession<MemoryStorage>) -> GuessDirection {
        let pair = session.pair().unwrap();
        if pair.next.value(session.metric()) >= pair.current.value(session.metric()) {
            GuessDirection::Higher
        } else {
            GuessDirection::Lower
        }
    }

    fn wrong_direction(session: &GameSession<MemoryStorage>) -> Option<GuessDirection> {
        let pair = session.pair().unwrap();
        let metric = session.metric();
        [GuessDirection::Higher, GuessDirection::Lower]
            .into_iter()
            .find(|dir| !dir.judge(pair.current.value(metric), pair.next.value(metric)))
    }

    #[test]
    fn ties_are_correct_both_ways() {
        assert!(GuessDirection::Higher.judge(5.0, 5.0));
        assert!(GuessDirection::Lower.judge(5.0, 5.0));
        assert!(GuessDirection::Higher.judge(5.0, 6.0));
        assert!(!GuessDirection::Lower.judge(5.0, 6.0));
    }

    #[test]
    fn start_needs_two_entities() {
        let mut empty = session_with(Dataset::empty());
        assert!(!empty.start_new_game());
        assert_eq!(empty.screen(), Screen::Landing);
        assert!(empty.drain_signals().is_empty());

        let mut single = session_with(Dataset::from_entities(vec![Entity::new(
            "Solo", "Asia", 1, 1.0,
        )]));
        assert!(!single.start_new_game());
        assert_eq!(single.screen(), Screen::Landing);
    }

    #[test]
    fn late_dataset_enables_start() {
        let mut session = session_with(Dataset::empty());
        assert!(!session.start_new_game());
        session.load_dataset(trio());
        assert!(session.start_new_game());
        assert_eq!(session.screen(), Screen::Countdown);
    }

    #[test]
    fn countdown_emits_three_two_one_go_then_plays() {
        let mut session = session_with(trio());
        session.start_new_game();
        assert_eq!(session.countdown_value(), Some(CountdownValue::Number(3)));
        session.advance(COUNTDOWN_TOTAL_MS - 1);
        assert_eq!(session.screen(), Screen::Countdown);
        assert_eq!(session.countdown_value(), Some(CountdownValue::Go));
        session.advance(1);
        assert_eq!(session.screen(), Screen::Playing);
        assert!(session.is_timer_running());
        assert!((session.round_duration() - 10.0).abs() < 1e-9);

        let ticks: Vec<String> = session
            .drain_signals()
            .into_iter()
            .filter_map(|signal| match signal {
                Signal::CountdownTick { value } => Some(value.to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(ticks, vec!["3", "2", "1", "GO!"]);
    }

    #[test]
    fn quit_during_countdown_never_starts_playing() {
        let mut session = session_with(trio());
        session.start_new_game();
        session.advance(1_000);
        session.quit();
        session.advance(10_000);
        assert_eq!(session.screen(), Screen::Landing);
        assert!(!session.is_timer_running());
    }

    #[test]
    fn pair_is_distinct_and_from_pool() {
        let mut session = session_with(trio());
        for _ in 0..50 {
            assert!(session.start_new_game());
            let pair = session.pair().unwrap();
            assert_ne!(pair.current.name, pair.next.name);
            session.quit();
        }
    }

    #[test]
    fn correct_guess_scores_after_dwell() {
        let mut session = playing(trio());
        let before = session.pair().unwrap().clone();
        let direction = correct_direction(&session);
        assert!(session.guess(direction));
        assert!(session.is_processing());
        assert!(session.is_revealed());
        assert_eq!(session.last_outcome(), Some(RoundOutcome::Correct));
        assert!(!session.is_timer_running());

        assert!(!session.guess(direction), "second guess must be ignored");
        session.advance(999);
        assert_eq!(session.score(), 0);
        session.advance(1);
        assert_eq!(session.score(), 1);
        assert_eq!(session.streak(), 1);
        assert!(!session.is_processing());
        assert!(!session.is_revealed());
        assert!(session.is_timer_running());
        assert!((session.round_duration() - 9.8).abs() < 1e-9);

        let after = session.pair().unwrap();
        assert_eq!(after.current.name, before.next.name);
        assert_ne!(after.next.name, after.current.name);
    }

    #[test]
    fn wrong_guess_ends_after_short_dwell() {
        let mut session = playing(trio());
        let direction = wrong_direction(&session).expect("trio has no ties");
        assert!(session.guess(direction));
        assert_eq!(session.last_outcome(), Some(RoundOutcome::Wrong));
        session.advance(399);
        assert_eq!(session.screen(), Screen::Playing);
        session.advance(1);
        assert_eq!(session.screen(), Screen::GameOver);
        let summary = session.last_game_over().unwrap();
        assert_eq!(summary.cause, GameOverCause::WrongGuess);
        assert_eq!(summary.final_score, 0);
        assert!(!summary.is_new_best);
    }

    #[test]
    fn wrong_guess_cues_at_reveal_and_again_at_game_over() {
        let mut session = playing(trio());
        session.drain_signals();
        let direction = wrong_direction(&session).expect("trio has no ties");
        assert!(session.guess(direction));
        let at_reveal = session.drain_signals();
        assert!(at_reveal.contains(&Signal::Cue { cue: Cue::Wrong }));

        session.advance(400);
        let at_game_over = session.drain_signals();
        assert!(at_game_over.contains(&Signal::Cue { cue: Cue::Wrong }));
    }

    #[test]
    fn correct_guess_has_no_cue_until_resolution() {
        let mut session = playing(trio());
        session.drain_signals();
        assert!(session.guess(correct_direction(&session)));
        assert!(
            !session
                .drain_signals()
                .iter()
                .any(|signal| matches!(signal, Signal::Cue { .. }))
        );
    }

    #[test]
    fn quit_clears_reveal_state() {
        let mut session = playing(trio());
        let direction = wrong_direction(&session).expect("trio has no ties");
        assert!(session.guess(direction));
        assert!(session.is_revealed());
        session.quit();
        assert_eq!(session.screen(), Screen::Landing);
        assert!(!session.is_revealed());
        assert_eq!(session.last_outcome(), None);
        assert!(!session.is_processing());
    }

    #[test]
    fn timer_expiry_ends_game_and_records_score() {
        let mut session = playing(trio());
        session.guess(correct_direction(&session));
        session.advance(1_000);
        assert_eq!(session.score(), 1);

        // 9.8s budget at score 1.
        session.advance(9_799);
        assert_eq!(session.screen(), Screen::Playing);
        session.advance(1);
        assert_eq!(session.screen(), Screen::GameOver);
        let summary = session.last_game_over().unwrap();
        assert_eq!(summary.cause, GameOverCause::TimeUp);
        assert!(summary.is_new_best);
        assert_eq!(session.best_for_active(), 1);
        assert!(session.time_left().abs() < f64::EPSILON);
    }

    #[test]
    fn game_over_is_sticky_until_player_acts() {
        let mut session = playing(trio());
        session.advance(10_000);
        assert_eq!(session.screen(), Screen::GameOver);
        session.advance(60_000);
        assert_eq!(session.screen(), Screen::GameOver);
        assert!(session.next_event_in_ms().is_none());
        assert!(!session.guess(GuessDirection::Higher));
        assert!(session.start_new_game());
        assert_eq!(session.screen(), Screen::Countdown);
    }

    #[test]
    fn quit_during_dwell_discards_resolution() {
        let mut session = playing(trio());
        session.guess(correct_direction(&session));
        session.quit();
        assert!(session.start_new_game());
        session.advance(1_000);
        assert_eq!(session.score(), 0);
        assert_eq!(session.streak(), 0);
        assert_eq!(session.screen(), Screen::Countdown);
    }

    #[test]
    fn stale_events_are_ignored_by_epoch() {
        let mut session = playing(trio());
        let stale_epoch = session.epoch() - 1;
        session.scheduler.schedule_once(
            0,
            TimerEvent::ResolveGuess { correct: true },
            stale_epoch,
        );
        session.advance(0);
        assert_eq!(session.score(), 0);
        assert_eq!(session.screen(), Screen::Playing);
    }

    #[test]
    fn region_change_refilters_and_can_exhaust_pool() {
        let mut session = playing(trio());
        session.guess(correct_direction(&session));
        // Empty the pool mid-dwell: nothing in the trio lives in the Americas.
        session.set_region(Region::Americas);
        session.advance(1_000);
        assert_eq!(session.screen(), Screen::GameOver);
        assert_eq!(
            session.last_game_over().unwrap().cause,
            GameOverCause::PoolExhausted
        );
        assert_eq!(session.score(), 1);
        assert_eq!(session.pool_len(), 0);
        assert!(!session.start_new_game());

        session.set_region(Region::Europe);
        assert_eq!(session.pool_len(), 2);
        assert!(session.start_new_game());
    }

    #[test]
    fn bonus_signal_and_coin_cue_on_fifth_streak() {
        let entities = (0..6)
            .map(|i| Entity::new(&format!("Same{i}"), "Europe", 100, 1.0))
            .collect();
        let mut session = playing(Dataset::from_entities(entities));
        for _ in 0..5 {
            assert!(session.guess(GuessDirection::Higher));
            session.advance(1_000);
        }
        assert_eq!(session.streak(), 5);
        assert_eq!(session.score(), 6);
        let signals = session.drain_signals();
        assert!(signals.contains(&Signal::BonusAwarded { amount: 1 }));
        assert!(signals.contains(&Signal::Cue { cue: Cue::Coin }));
    }

    #[test]
    fn metric_selects_compared_value() {
        let mut session = session_with(Dataset::from_entities(vec![
            Entity::new("Big", "Asia", 1_000, 1_000.0),
            Entity::new("Dense", "Asia", 500, 1.0),
        ]));
        session.set_metric(Metric::Density);
        session.start_new_game();
        session.advance(COUNTDOWN_TOTAL_MS);
        let pair = session.pair().unwrap().clone();
        let direction = if pair.current.name == "Big" {
            GuessDirection::Higher
        } else {
            GuessDirection::Lower
        };
        session.guess(direction);
        assert_eq!(session.last_outcome(), Some(RoundOutcome::Correct));
    }

    #[test]
    fn reset_high_scores_clears_ledger() {
        let mut session = playing(trio());
        session.guess(correct_direction(&session));
        session.advance(1_000);
        session.advance(10_000);
        assert_eq!(session.high_scores().len(), 1);
        session.reset_high_scores();
        assert!(session.high_scores().is_empty());
        assert_eq!(session.best_for_active(), 0);
    }
}
