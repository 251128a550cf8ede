// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Sliding window rate limiter for outbound verification calls.
//!
//! Each key keeps the timestamps of admissions inside the trailing window.
//! A caller over the limit waits until the oldest admission leaves the
//! window, then tries again, a bounded number of times.
//!
//! Read-prune-write runs under a per-key lock; the outer map lock is only
//! held to look a key up. No lock is held while a caller sleeps.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Result of an admission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Caller may proceed
    Admitted {
        /// Total time spent waiting for a slot
        waited: Duration,
    },
    /// Window stayed full; the caller must give up
    Exceeded {
        /// Number of waits performed before giving up
        waits: u32,
    },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted { .. })
    }
}

type Window = Arc<Mutex<VecDeque<Instant>>>;

/// Thread-safe sliding window limiter keyed by bucket name.
pub struct SlidingWindowLimiter {
    /// Window length
    window: Duration,
    /// Per-key admission timestamps, oldest first
    windows: RwLock<HashMap<String, Window>>,
}

impl SlidingWindowLimiter {
    /// Create a new limiter with the given window length.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            windows: RwLock::new(HashMap::new()),
        }
    }

    /// Admit one call under `key`, waiting for a free slot at most `max_wait_attempts` times.
    pub async fn admit(&self, key: &str, rate_limit: u32, max_wait_attempts: u32) -> Admission {
        if rate_limit == 0 {
            warn!(key, "Rate limit is zero, refusing admission");
            return Admission::Exceeded { waits: 0 };
        }

        let started = Instant::now();
        let mut waits = 0;

        loop {
            let delay = match self.try_admit(key, rate_limit).await {
                Ok(()) => {
                    return Admission::Admitted {
                        waited: started.elapsed(),
                    }
                }
                Err(delay) => delay,
            };

            if waits >= max_wait_attempts {
                warn!(key, rate_limit, waits, "Rate limit still exceeded, giving up");
                return Admission::Exceeded { waits };
            }

            waits += 1;
            debug!(key, rate_limit, attempt = waits, delay_ms = delay.as_millis() as u64, "Window full, waiting");
            tokio::time::sleep(delay).await;
        }
    }

    /// Number of admissions currently inside the window for `key`.
    pub async fn in_window(&self, key: &str) -> usize {
        let Some(slot) = self.windows.read().await.get(key).cloned() else {
            return 0;
        };
        let mut window = slot.lock().await;
        prune(&mut window, Instant::now(), self.window);
        window.len()
    }

    /// Drop keys with no admissions left in their window (should be called periodically).
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let mut windows = self.windows.write().await;
        let before = windows.len();

        let mut idle = Vec::new();
        for (key, slot) in windows.iter() {
            // A handle held elsewhere may be about to record an admission.
            if Arc::strong_count(slot) > 1 {
                continue;
            }
            if let Ok(mut window) = slot.try_lock() {
                prune(&mut window, now, self.window);
                if window.is_empty() {
                    idle.push(key.clone());
                }
            }
        }
        for key in idle {
            windows.remove(&key);
        }

        debug!(removed = before - windows.len(), remaining = windows.len(), "Limiter cleanup");
    }

    /// Record an admission if the window has room, else return how long until it will.
    async fn try_admit(&self, key: &str, rate_limit: u32) -> Result<(), Duration> {
        let slot = self.slot(key).await;
        let mut window = slot.lock().await;
        let now = Instant::now();
        prune(&mut window, now, self.window);

        if window.len() < rate_limit as usize {
            window.push_back(now);
            return Ok(());
        }

        let oldest = window.front().copied().unwrap_or(now);
        Err((oldest + self.window).saturating_duration_since(now))
    }

    async fn slot(&self, key: &str) -> Window {
        if let Some(slot) = self.windows.read().await.get(key) {
            return slot.clone();
        }
        let mut windows = self.windows.write().await;
        windows.entry(key.to_string()).or_default().clone()
    }
}

/// Remove admissions at least `window` old.
fn prune(window: &mut VecDeque<Instant>, now: Instant, length: Duration) {
    while window
        .front()
        .is_some_and(|t| now.duration_since(*t) >= length)
    {
        window.pop_front();
    }
}
