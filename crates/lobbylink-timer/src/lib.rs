//! Deadline scheduling for Lobbylink.
//!
//! ```text
//!   schedule(key, after) ──▶ ┌──────────────────────┐
//!   cancel(key)         ──▶ │   TimeoutScheduler    │ ──▶ fire_due() -> keys
//!                           │  (one slot per key)   │
//!   Clock::now() ─────────▶ └──────────────────────┘
//! ```
//!
//! The scheduler holds at most one armed deadline per key: scheduling a key
//! that is already armed silently replaces the old deadline, so a retry can
//! never race its predecessor's timeout. Firing is pull-based — the owner
//! calls [`TimeoutScheduler::fire_due`] when it wants expiries delivered —
//! which keeps timeout handling on the same thread as the state it mutates.

mod clock;

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use tracing::debug;

pub use clock::{Clock, ManualClock, SystemClock};

/// Identifies one armed instance of a timer.
///
/// Tokens are unique across the scheduler's lifetime; a replaced or
/// cancelled deadline's token never fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

#[derive(Debug)]
struct Slot {
    token: TimerToken,
    deadline: Instant,
}

/// A set of single-slot-per-key deadlines read against an injected [`Clock`].
///
/// `K` is the caller's timer name — typically a small enum like
/// `SessionTimer::Join`. The scheduler never spawns tasks or threads; it
/// only answers "which deadlines have passed as of now?".
#[derive(Debug)]
pub struct TimeoutScheduler<K, C = SystemClock> {
    slots: HashMap<K, Slot>,
    next_token: u64,
    clock: C,
}

impl<K: Copy + Eq + Hash + std::fmt::Debug> TimeoutScheduler<K, SystemClock> {
    /// Creates a scheduler on the real monotonic clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<K: Copy + Eq + Hash + std::fmt::Debug> Default
    for TimeoutScheduler<K, SystemClock>
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, C> TimeoutScheduler<K, C>
where
    K: Copy + Eq + Hash + std::fmt::Debug,
    C: Clock,
{
    /// Creates a scheduler reading time from `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self {
            slots: HashMap::new(),
            next_token: 0,
            clock,
        }
    }

    /// Arms `key` to fire `after` from now.
    ///
    /// If `key` is already armed, its previous deadline is discarded —
    /// the old token will never fire.
    pub fn schedule(&mut self, key: K, after: Duration) -> TimerToken {
        let token = TimerToken(self.next_token);
        self.next_token += 1;
        let deadline = self.clock.now() + after;

        if let Some(old) = self.slots.insert(key, Slot { token, deadline }) {
            debug!(?key, old_token = old.token.0, "timer rescheduled");
        } else {
            debug!(?key, token = token.0, ?after, "timer armed");
        }
        token
    }

    /// Disarms `key`. Returns whether a deadline was actually pending.
    pub fn cancel(&mut self, key: K) -> bool {
        let was_armed = self.slots.remove(&key).is_some();
        if was_armed {
            debug!(?key, "timer cancelled");
        }
        was_armed
    }

    /// Whether `key` currently has a pending deadline.
    pub fn is_armed(&self, key: K) -> bool {
        self.slots.contains_key(&key)
    }

    /// The pending deadline for `key`, if armed.
    pub fn deadline(&self, key: K) -> Option<Instant> {
        self.slots.get(&key).map(|slot| slot.deadline)
    }

    /// The earliest pending deadline across all keys.
    ///
    /// Drivers use this to know how long they may sleep before the next
    /// [`fire_due`](Self::fire_due) call could produce anything.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.slots.values().map(|slot| slot.deadline).min()
    }

    /// Removes and returns every key whose deadline has passed, earliest
    /// first. Keys that fire are disarmed; re-arming requires a fresh
    /// [`schedule`](Self::schedule).
    pub fn fire_due(&mut self) -> Vec<K> {
        let now = self.clock.now();
        let mut due: Vec<(K, Instant)> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.deadline <= now)
            .map(|(key, slot)| (*key, slot.deadline))
            .collect();
        due.sort_by_key(|(_, deadline)| *deadline);

        let keys: Vec<K> = due.into_iter().map(|(key, _)| key).collect();
        for key in &keys {
            self.slots.remove(key);
            debug!(?key, "timer fired");
        }
        keys
    }

    /// Disarms everything.
    pub fn clear(&mut self) {
        if !self.slots.is_empty() {
            debug!(count = self.slots.len(), "all timers cleared");
            self.slots.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum TestTimer {
        Join,
        Search,
    }

    fn scheduler() -> (TimeoutScheduler<TestTimer, ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        (TimeoutScheduler::with_clock(clock.clone()), clock)
    }

    #[test]
    fn test_schedule_fires_only_after_deadline() {
        let (mut timers, clock) = scheduler();
        timers.schedule(TestTimer::Join, Duration::from_secs(5));

        clock.advance(Duration::from_secs(4));
        assert!(timers.fire_due().is_empty());
        assert!(timers.is_armed(TestTimer::Join));

        clock.advance(Duration::from_secs(1));
        assert_eq!(timers.fire_due(), vec![TestTimer::Join]);
        assert!(!timers.is_armed(TestTimer::Join));
    }

    #[test]
    fn test_fire_due_disarms_fired_keys() {
        let (mut timers, clock) = scheduler();
        timers.schedule(TestTimer::Join, Duration::from_secs(1));

        clock.advance(Duration::from_secs(2));
        assert_eq!(timers.fire_due(), vec![TestTimer::Join]);
        // A second poll must not re-deliver.
        assert!(timers.fire_due().is_empty());
    }

    #[test]
    fn test_cancel_prevents_firing() {
        let (mut timers, clock) = scheduler();
        timers.schedule(TestTimer::Join, Duration::from_secs(1));

        assert!(timers.cancel(TestTimer::Join));
        clock.advance(Duration::from_secs(10));
        assert!(timers.fire_due().is_empty());
    }

    #[test]
    fn test_cancel_unarmed_key_returns_false() {
        let (mut timers, _clock) = scheduler();
        assert!(!timers.cancel(TestTimer::Search));
    }

    #[test]
    fn test_reschedule_replaces_previous_deadline() {
        let (mut timers, clock) = scheduler();
        let first = timers.schedule(TestTimer::Join, Duration::from_secs(1));

        // Second attempt before the first deadline passes.
        let second = timers.schedule(TestTimer::Join, Duration::from_secs(5));
        assert_ne!(first, second);

        // The first deadline passing must not fire: the slot now belongs
        // to the second attempt.
        clock.advance(Duration::from_secs(2));
        assert!(timers.fire_due().is_empty());

        clock.advance(Duration::from_secs(3));
        assert_eq!(timers.fire_due(), vec![TestTimer::Join]);
    }

    #[test]
    fn test_fire_due_returns_earliest_first() {
        let (mut timers, clock) = scheduler();
        timers.schedule(TestTimer::Search, Duration::from_secs(7));
        timers.schedule(TestTimer::Join, Duration::from_secs(5));

        clock.advance(Duration::from_secs(10));
        assert_eq!(timers.fire_due(), vec![TestTimer::Join, TestTimer::Search]);
    }

    #[test]
    fn test_next_deadline_is_minimum_across_keys() {
        let (mut timers, clock) = scheduler();
        assert!(timers.next_deadline().is_none());

        timers.schedule(TestTimer::Search, Duration::from_secs(7));
        timers.schedule(TestTimer::Join, Duration::from_secs(5));

        let expected = clock.now() + Duration::from_secs(5);
        assert_eq!(timers.next_deadline(), Some(expected));
    }

    #[test]
    fn test_deadline_reports_armed_slot() {
        let (mut timers, clock) = scheduler();
        timers.schedule(TestTimer::Join, Duration::from_secs(5));

        assert_eq!(
            timers.deadline(TestTimer::Join),
            Some(clock.now() + Duration::from_secs(5))
        );
        assert_eq!(timers.deadline(TestTimer::Search), None);
    }

    #[test]
    fn test_clear_disarms_everything() {
        let (mut timers, clock) = scheduler();
        timers.schedule(TestTimer::Join, Duration::from_secs(1));
        timers.schedule(TestTimer::Search, Duration::from_secs(1));

        timers.clear();
        clock.advance(Duration::from_secs(5));
        assert!(timers.fire_due().is_empty());
        assert!(timers.next_deadline().is_none());
    }
}
