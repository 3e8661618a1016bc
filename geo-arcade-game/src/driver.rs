//! Wall-clock driver for hosts that want real time instead of manual
//! [`GameSession::advance`] calls.
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

use crate::ledger::ScoreStorage;
use crate::session::GameSession;

/// Advance `session` in step with the wall clock, once per `frame`, until
/// `on_frame` breaks.
///
/// The session is moved to the total elapsed time on every frame, so slow
/// frames never make the virtual clock drift behind real time.
pub async fn run_realtime<S, F>(session: &mut GameSession<S>, frame: Duration, mut on_frame: F)
where
    S: ScoreStorage,
    F: FnMut(&mut GameSession<S>) -> ControlFlow<()>,
{
    let started = Instant::now();
    let origin_ms = session.now_ms();
    let mut interval = tokio::time::interval(frame.max(Duration::from_millis(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let target = origin_ms.saturating_add(elapsed);
        let now = session.now_ms();
        if target > now {
            session.advance(target - now);
        }
        if on_frame(session).is_break() {
            break;
        }
    }
}
