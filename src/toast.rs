//! Transient notifications shown in the bottom-right corner

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Warning,
    Info,
}

impl ToastKind {
    pub fn duration(&self) -> Duration {
        match self {
            ToastKind::Success => Duration::from_millis(3000),
            ToastKind::Error => Duration::from_millis(4000),
            ToastKind::Warning => Duration::from_millis(3500),
            ToastKind::Info => Duration::from_millis(3000),
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            ToastKind::Success => "✔",
            ToastKind::Error => "✖",
            ToastKind::Warning => "⚠",
            ToastKind::Info => "ℹ",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub message: String,
    pub created: Instant,
    pub duration: Duration,
}

impl Toast {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.created) >= self.duration
    }
}

#[derive(Debug, Default)]
pub struct ToastQueue {
    toasts: Vec<Toast>,
    next_id: u64,
}

impl ToastQueue {
    pub fn push_at(&mut self, kind: ToastKind, message: impl Into<String>, now: Instant) -> u64 {
        self.next_id += 1;
        self.toasts.push(Toast {
            id: self.next_id,
            kind,
            message: message.into(),
            created: now,
            duration: kind.duration(),
        });
        self.next_id
    }

    pub fn push(&mut self, kind: ToastKind, message: impl Into<String>) -> u64 {
        self.push_at(kind, message, Instant::now())
    }

    pub fn success(&mut self, message: impl Into<String>) -> u64 {
        self.push(ToastKind::Success, message)
    }

    pub fn error(&mut self, message: impl Into<String>) -> u64 {
        self.push(ToastKind::Error, message)
    }

    pub fn warning(&mut self, message: impl Into<String>) -> u64 {
        self.push(ToastKind::Warning, message)
    }

    pub fn info(&mut self, message: impl Into<String>) -> u64 {
        self.push(ToastKind::Info, message)
    }

    pub fn dismiss(&mut self, id: u64) {
        self.toasts.retain(|t| t.id != id);
    }

    /// Drop expired toasts; returns how long until the next one expires.
    pub fn prune_at(&mut self, now: Instant) -> Option<Duration> {
        self.toasts.retain(|t| !t.is_expired(now));
        self.toasts
            .iter()
            .map(|t| t.duration.saturating_sub(now.duration_since(t.created)))
            .min()
    }

    pub fn prune(&mut self) -> Option<Duration> {
        self.prune_at(Instant::now())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_durations() {
        assert_eq!(ToastKind::Success.duration(), Duration::from_secs(3));
        assert_eq!(ToastKind::Error.duration(), Duration::from_secs(4));
        assert_eq!(ToastKind::Warning.duration(), Duration::from_millis(3500));
        assert_eq!(ToastKind::Info.duration(), Duration::from_secs(3));
    }

    #[test]
    fn test_auto_dismiss() {
        let start = Instant::now();
        let mut queue = ToastQueue::default();
        queue.push_at(ToastKind::Success, "Watch recorded", start);
        queue.push_at(ToastKind::Error, "Failed to add favorite", start);

        let next = queue.prune_at(start + Duration::from_millis(3000));
        assert_eq!(queue.len(), 1);
        assert_eq!(next, Some(Duration::from_millis(1000)));

        assert_eq!(queue.prune_at(start + Duration::from_secs(4)), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_manual_dismiss() {
        let mut queue = ToastQueue::default();
        let first = queue.info("one");
        let second = queue.warning("two");
        assert_ne!(first, second);

        queue.dismiss(first);
        let ids: Vec<u64> = queue.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![second]);
    }
}
