//! Single-threaded virtual clock owning every pending timer of a session.
//!
//! Callbacks are plain [`TimerEvent`] values. The host moves time forward and
//! the session dispatches whatever fell due, in due-time order with ties
//! broken by scheduling order. Every entry carries the epoch it was scheduled
//! under so the session can reject stale events.

/// Handle of a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// What a timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Next step of the `3, 2, 1, GO!` sequence.
    CountdownStep,
    /// One quantum off the round clock.
    RoundTick,
    /// End of the post-guess dwell.
    ResolveGuess { correct: bool },
}

/// A timer that came due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired {
    pub id: TimerId,
    pub event: TimerEvent,
    pub epoch: u64,
    pub at_ms: u64,
}

#[derive(Debug, Clone)]
struct Pending {
    id: TimerId,
    due_ms: u64,
    period_ms: Option<u64>,
    event: TimerEvent,
    epoch: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    now_ms: u64,
    next_id: u64,
    pending: Vec<Pending>,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Fire `event` once, `delay_ms` from now.
    pub fn schedule_once(&mut self, delay_ms: u64, event: TimerEvent, epoch: u64) -> TimerId {
        self.push(delay_ms, None, event, epoch)
    }

    /// Fire `event` every `period_ms`, first at `now + period_ms`.
    pub fn schedule_every(&mut self, period_ms: u64, event: TimerEvent, epoch: u64) -> TimerId {
        let period = period_ms.max(1);
        self.push(period, Some(period), event, epoch)
    }

    fn push(
        &mut self,
        delay_ms: u64,
        period_ms: Option<u64>,
        event: TimerEvent,
        epoch: u64,
    ) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.push(Pending {
            id,
            due_ms: self.now_ms.saturating_add(delay_ms),
            period_ms,
            event,
            epoch,
        });
        id
    }

    /// Cancel one timer. Returns whether it was still pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|entry| entry.id != id);
        self.pending.len() != before
    }

    /// Cancel every pending timer, returning how many were dropped.
    pub fn cancel_all(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    #[must_use]
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.pending.iter().any(|entry| entry.id == id)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Due time of the earliest pending timer.
    #[must_use]
    pub fn next_due_ms(&self) -> Option<u64> {
        self.pending.iter().map(|entry| entry.due_ms).min()
    }

    /// Pop the earliest timer due at or before `until_ms`, moving the clock
    /// to its due time. Repeating timers are re-armed under the same handle.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<Fired> {
        let index = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.due_ms <= until_ms)
            .min_by_key(|(_, entry)| (entry.due_ms, entry.id))
            .map(|(index, _)| index)?;

        let entry = &mut self.pending[index];
        let fired = Fired {
            id: entry.id,
            event: entry.event,
            epoch: entry.epoch,
            at_ms: entry.due_ms,
        };
        let period = entry.period_ms;
        if let Some(period) = period {
            entry.due_ms = entry.due_ms.saturating_add(period);
        } else {
            self.pending.swap_remove(index);
        }
        self.now_ms = self.now_ms.max(fired.at_ms);
        Some(fired)
    }

    /// Move the clock forward without firing anything.
    pub fn advance_to(&mut self, until_ms: u64) {
        self.now_ms = self.now_ms.max(until_ms);
    }
}
