//! Settle-time debouncing for text inputs polled every frame

use std::time::{Duration, Instant};

pub const SEARCH_DELAY: Duration = Duration::from_millis(300);

/// Holds the latest input and releases it once it has been stable for `delay`.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T: Clone + PartialEq> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    /// Record a new input value observed at `now`. Restarts the timer.
    pub fn push_at(&mut self, value: T, now: Instant) {
        if let Some((pending, _)) = &self.pending {
            if *pending == value {
                return;
            }
        }
        self.pending = Some((value, now));
    }

    pub fn push(&mut self, value: T) {
        self.push_at(value, Instant::now());
    }

    /// The settled value, once, when `delay` has elapsed since the last push.
    pub fn poll_at(&mut self, now: Instant) -> Option<T> {
        let ready = matches!(&self.pending, Some((_, since)) if now.duration_since(*since) >= self.delay);
        if ready {
            self.pending.take().map(|(value, _)| value)
        } else {
            None
        }
    }

    pub fn poll(&mut self) -> Option<T> {
        self.poll_at(Instant::now())
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Time left before the pending value settles, for repaint scheduling.
    pub fn remaining_at(&self, now: Instant) -> Option<Duration> {
        self.pending
            .as_ref()
            .map(|(_, since)| self.delay.saturating_sub(now.duration_since(*since)))
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}
