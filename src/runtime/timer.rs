//! Frame-driven timers.
//!
//! Time only advances when the host calls [`TimerQueue::advance`] from its
//! frame loop; nothing here spawns threads or blocks.

use std::cell::Cell;
use std::rc::Rc;

/// Shared flag tied to an owner's lifetime. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Rc<Cell<bool>>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug)]
struct TimerEntry<T> {
    id: TimerId,
    due: f64,
    token: Option<CancellationToken>,
    payload: T,
}

/// One-shot timers carrying a payload, fired in due order.
#[derive(Debug)]
pub struct TimerQueue<T> {
    now: f64,
    next_id: u64,
    entries: Vec<TimerEntry<T>>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: 0.0,
            next_id: 0,
            entries: Vec::new(),
        }
    }

    /// Seconds accumulated through [`advance`](Self::advance).
    #[must_use]
    pub fn now(&self) -> f64 {
        self.now
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Schedules `payload` to fire `delay` seconds from now. A cancelled
    /// `token` drops the timer silently.
    pub fn schedule(&mut self, delay: f32, payload: T, token: Option<CancellationToken>) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.push(TimerEntry {
            id,
            due: self.now + f64::from(delay.max(0.0)),
            token,
            payload,
        });
        id
    }

    /// Removes a pending timer. Returns false if it already fired.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    /// Advances the clock and returns the payloads that came due, earliest
    /// first (ties in scheduling order).
    pub fn advance(&mut self, dt: f32) -> Vec<T> {
        self.now += f64::from(dt.max(0.0));
        let now = self.now;

        let (mut due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| e.due <= now);
        self.entries = pending;

        due.retain(|e| !e.token.as_ref().is_some_and(CancellationToken::is_cancelled));
        due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.id.cmp(&b.id)));
        due.into_iter().map(|e| e.payload).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_due_order() {
        let mut timers = TimerQueue::new();
        timers.schedule(0.3, "late", None);
        timers.schedule(0.1, "early", None);
        assert!(timers.advance(0.05).is_empty());
        assert_eq!(timers.advance(0.3), vec!["early", "late"]);
        assert!(timers.is_empty());
    }

    #[test]
    fn cancelled_token_suppresses_timer() {
        let mut timers = TimerQueue::new();
        let token = CancellationToken::new();
        timers.schedule(0.1, 1, Some(token.clone()));
        timers.schedule(0.1, 2, None);
        token.cancel();
        assert_eq!(timers.advance(1.0), vec![2]);
    }

    #[test]
    fn cancel_by_id() {
        let mut timers = TimerQueue::new();
        let id = timers.schedule(0.1, (), None);
        assert!(timers.cancel(id));
        assert!(!timers.cancel(id));
        assert!(timers.advance(1.0).is_empty());
    }
}
