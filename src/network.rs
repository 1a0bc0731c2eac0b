//! Online/offline tracking via a periodic TCP connect to the API host

use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Shared online flag. Cloning shares the same state.
#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    online: Arc<AtomicBool>,
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::fixed(true)
    }
}

impl NetworkMonitor {
    /// A monitor that only changes through [`set_online`](Self::set_online).
    pub fn fixed(online: bool) -> Self {
        Self {
            online: Arc::new(AtomicBool::new(online)),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Returns true when the state actually flipped.
    pub fn set_online(&self, online: bool) -> bool {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous != online {
            if online {
                tracing::info!("Back online");
            } else {
                tracing::warn!("You are offline");
            }
        }
        previous != online
    }

    /// Check `target` every `interval` on a background thread.
    pub fn start_polling(&self, target: Url, interval: Duration) -> PollHandle {
        let monitor = self.clone();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let thread = thread::spawn(move || loop {
            monitor.set_online(is_reachable(&target, CONNECT_TIMEOUT));
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });

        PollHandle {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        }
    }
}

/// True when a TCP connection to the URL's host and port succeeds.
pub fn is_reachable(target: &Url, timeout: Duration) -> bool {
    let addrs = match target.socket_addrs(|| None) {
        Ok(addrs) => addrs,
        Err(e) => {
            tracing::debug!("Cannot resolve {}: {}", target, e);
            return false;
        }
    };
    addrs
        .iter()
        .any(|addr| TcpStream::connect_timeout(addr, timeout).is_ok())
}

pub struct PollHandle {
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::time::Instant;

    #[test]
    fn test_set_online_reports_transitions() {
        let monitor = NetworkMonitor::fixed(true);
        assert!(!monitor.set_online(true));
        assert!(monitor.set_online(false));
        assert!(!monitor.is_online());

        let shared = monitor.clone();
        assert!(shared.set_online(true));
        assert!(monitor.is_online());
    }

    #[test]
    fn test_reachable_open_and_closed_port() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = Url::parse(&format!("http://127.0.0.1:{}/api", port)).unwrap();
        assert!(is_reachable(&url, Duration::from_secs(1)));

        drop(listener);
        assert!(!is_reachable(&url, Duration::from_secs(1)));
    }

    #[test]
    fn test_background_polling_updates_flag() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = Url::parse(&format!("http://127.0.0.1:{}", port)).unwrap();

        let monitor = NetworkMonitor::fixed(false);
        let mut handle = monitor.start_polling(url, Duration::from_millis(20));

        let deadline = Instant::now() + Duration::from_secs(5);
        while !monitor.is_online() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(monitor.is_online());
        handle.stop();
    }
}
