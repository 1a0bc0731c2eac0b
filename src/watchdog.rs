//! Periodic session validation while a user is logged in

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::session::{LogoutOutcome, SessionStore};
use crate::token::TokenStatus;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

pub const SESSION_EXPIRED_NOTICE: &str = "Your session has expired. Redirecting to login...";
pub const VALIDATION_FAILED_NOTICE: &str = "Session validation failed. Logging out...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogEvent {
    /// Token missing or past its expiry
    Expired,
    /// Token present but structurally invalid
    ValidationFailed,
}

impl WatchdogEvent {
    pub fn notice(&self) -> &'static str {
        match self {
            WatchdogEvent::Expired => SESSION_EXPIRED_NOTICE,
            WatchdogEvent::ValidationFailed => VALIDATION_FAILED_NOTICE,
        }
    }
}

/// One tick: inspect the stored token, force a logout when it is no longer usable.
/// The logout outcome is handed back so a failed clear can escalate to a reset.
pub fn check(session: &SessionStore) -> Option<(WatchdogEvent, LogoutOutcome)> {
    let event = match session.status() {
        TokenStatus::Valid { .. } => return None,
        TokenStatus::Missing => {
            tracing::warn!("Token not found - logging out");
            WatchdogEvent::Expired
        }
        TokenStatus::Expired { exp } => {
            tracing::warn!("Token has expired (exp {})", exp);
            WatchdogEvent::Expired
        }
        TokenStatus::Malformed => {
            tracing::error!("Stored token failed validation");
            WatchdogEvent::ValidationFailed
        }
    };
    let outcome = session.logout();
    if outcome == LogoutOutcome::ReloadRequired {
        tracing::error!("Forced logout could not clear the stored session");
    }
    Some((event, outcome))
}

pub struct SessionWatchdog;

impl SessionWatchdog {
    /// Spawn the watchdog thread. `on_event` fires at most once, after which the
    /// thread exits; the handle stops it earlier.
    pub fn start<F>(session: Arc<SessionStore>, interval: Duration, on_event: F) -> WatchdogHandle
    where
        F: Fn(WatchdogEvent, LogoutOutcome) + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        tracing::debug!("Session watchdog started ({:?} interval)", interval);

        let thread = thread::spawn(move || loop {
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {
                    if let Some((event, outcome)) = check(&session) {
                        on_event(event, outcome);
                        break;
                    }
                }
                // Stop requested or handle dropped
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });

        WatchdogHandle {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        }
    }
}

/// Owning handle; dropping it cancels the watchdog.
pub struct WatchdogHandle {
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl WatchdogHandle {
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
            tracing::debug!("Session watchdog stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for WatchdogHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStorage;
    use crate::token::encode_token;
    use chrono::Utc;
    use serde_json::json;

    fn session_with(claims: serde_json::Value) -> Arc<SessionStore> {
        let session = Arc::new(SessionStore::in_memory());
        session.establish(&encode_token(&claims), "ann").unwrap();
        session
    }

    #[test]
    fn test_valid_session_passes() {
        let session = session_with(json!({ "exp": Utc::now().timestamp() + 3600 }));
        assert_eq!(check(&session), None);
        assert!(session.is_logged_in());
    }

    #[test]
    fn test_token_expired_ten_seconds_ago() {
        let session = session_with(json!({ "exp": Utc::now().timestamp() - 10 }));
        let result = check(&session);
        assert_eq!(result, Some((WatchdogEvent::Expired, LogoutOutcome::Cleared)));
        assert_eq!(result.map(|(e, _)| e.notice()), Some(SESSION_EXPIRED_NOTICE));
        assert!(!session.is_logged_in());
    }

    #[test]
    fn test_missing_and_malformed_tokens() {
        let session = Arc::new(SessionStore::in_memory());
        assert_eq!(check(&session), Some((WatchdogEvent::Expired, LogoutOutcome::Cleared)));

        session.establish("not-a-token", "ann").unwrap();
        assert_eq!(
            check(&session),
            Some((WatchdogEvent::ValidationFailed, LogoutOutcome::Cleared))
        );
        assert!(session.user_id().is_none());
    }

    #[test]
    fn test_tick_is_idempotent() {
        let session = session_with(json!({ "exp": 1 }));
        let expired = Some((WatchdogEvent::Expired, LogoutOutcome::Cleared));
        assert_eq!(check(&session), expired);
        assert_eq!(check(&session), expired);
    }

    #[test]
    fn test_thread_forces_logout() {
        let session = session_with(json!({ "exp": Utc::now().timestamp() - 10 }));
        let (tx, rx) = mpsc::channel();
        let mut handle = SessionWatchdog::start(session.clone(), Duration::from_millis(20), move |e, o| {
            let _ = tx.send((e, o));
        });

        let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(event, (WatchdogEvent::Expired, LogoutOutcome::Cleared));
        assert!(!session.is_logged_in());
        handle.stop();
        assert!(!handle.is_running());
    }

    #[test]
    fn test_stop_cancels_before_tick() {
        let session = session_with(json!({ "exp": Utc::now().timestamp() - 10 }));
        let (tx, rx) = mpsc::channel();
        let handle = SessionWatchdog::start(session.clone(), Duration::from_secs(60), move |e, o| {
            let _ = tx.send((e, o));
        });

        drop(handle);
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        assert!(session.token().is_some());
    }

    /// Reads work, clears fail: the expired token cannot be removed.
    struct StuckStorage(std::collections::HashMap<String, String>);

    impl SessionStorage for StuckStorage {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key).cloned()
        }

        fn set(&mut self, key: &str, value: &str) -> std::io::Result<()> {
            self.0.insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn remove(&mut self, _key: &str) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"))
        }
    }

    #[test]
    fn test_failed_clear_is_reported_to_caller() {
        let session = Arc::new(SessionStore::new(StuckStorage(Default::default())));
        session
            .establish(&encode_token(&json!({ "exp": Utc::now().timestamp() - 10 })), "ann")
            .unwrap();

        assert_eq!(
            check(&session),
            Some((WatchdogEvent::Expired, LogoutOutcome::ReloadRequired))
        );

        let (tx, rx) = mpsc::channel();
        let _handle = SessionWatchdog::start(session, Duration::from_millis(20), move |e, o| {
            let _ = tx.send((e, o));
        });
        let (_, outcome) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(outcome, LogoutOutcome::ReloadRequired);
    }
}
