//! Fixed-window request rate limiting keyed by client.

use std::collections::HashMap;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::RateLimitConfig;

/// Storage for per-client request windows.
///
/// The in-process store is not shared across processes; a shared cache can
/// implement this trait to lift that limit.
pub trait RateLimitStore: Send + Sync {
    /// Count one request from `key`. Returns whether it is allowed.
    fn hit(&self, key: &str, limit: u32, window: Duration, now: Instant) -> bool;

    /// Drop windows that expired at or before `now`. Returns how many were removed.
    fn sweep(&self, now: Instant) -> usize;

    /// Number of tracked windows.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

/// Process-local window store.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    windows: Mutex<HashMap<String, Window>>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimitStore for InMemoryRateLimitStore {
    fn hit(&self, key: &str, limit: u32, window: Duration, now: Instant) -> bool {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        match windows.get_mut(key) {
            Some(current) if now < current.reset_at => {
                if current.count >= limit {
                    false
                } else {
                    current.count += 1;
                    true
                }
            }
            _ => {
                windows.insert(
                    key.to_string(),
                    Window {
                        count: 1,
                        reset_at: now + window,
                    },
                );
                limit > 0
            }
        }
    }

    fn sweep(&self, now: Instant) -> usize {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let before = windows.len();
        windows.retain(|_, window| window.reset_at > now);
        before - windows.len()
    }

    fn len(&self) -> usize {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Gate applied to write operations.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, limit: u32, window: Duration) -> Self {
        Self { store, limit, window }
    }

    /// Limiter over a fresh in-process store.
    pub fn in_memory(config: &RateLimitConfig) -> Self {
        Self::new(
            Arc::new(InMemoryRateLimitStore::new()),
            config.max_requests,
            config.window,
        )
    }

    pub fn allow(&self, client_key: &str) -> bool {
        self.allow_at(client_key, Instant::now())
    }

    /// `allow` against an explicit clock reading.
    pub fn allow_at(&self, client_key: &str, now: Instant) -> bool {
        let allowed = self.store.hit(client_key, self.limit, self.window, now);
        if !allowed {
            tracing::warn!(client = client_key, "rate limit exceeded");
        }
        allowed
    }

    pub fn store(&self) -> Arc<dyn RateLimitStore> {
        Arc::clone(&self.store)
    }
}

/// Background thread purging expired windows.
///
/// Stops and joins when dropped.
pub struct SweepTask {
    stop: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl SweepTask {
    pub fn spawn(store: Arc<dyn RateLimitStore>, interval: Duration) -> std::io::Result<Self> {
        let (stop, stopped) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("rate-limit-sweep".to_string())
            .spawn(move || loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let purged = store.sweep(Instant::now());
                        if purged > 0 {
                            tracing::debug!(purged, "purged expired rate-limit windows");
                        }
                    }
                    // Stop signal or sender dropped
                    _ => break,
                }
            })?;

        Ok(Self {
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    /// Stop the sweeper and wait for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("rate-limit sweep thread panicked");
            }
        }
    }
}

impl Drop for SweepTask {
    fn drop(&mut self) {
        self.shutdown();
    }
}
