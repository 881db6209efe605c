//! Background resolution for generators that block
//!
//! Each distinct token gets a slot holding its last rendered value. A lookup
//! returns that value immediately and, when no refresh is running and the
//! minimum interval has passed, starts a worker thread to recompute it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Slot {
    value: Option<String>,
    in_flight: bool,
    started: Option<Instant>,
}

type Slots = Arc<Mutex<HashMap<String, Slot>>>;

fn lock(slots: &Mutex<HashMap<String, Slot>>) -> MutexGuard<'_, HashMap<String, Slot>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears a slot's `in_flight` flag when its worker ends, panics included
struct InFlight {
    slots: Slots,
    key: String,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if thread::panicking() {
            tracing::warn!(key = %self.key, "refresh worker panicked, keeping previous value");
        }
        if let Some(slot) = lock(&self.slots).get_mut(&self.key) {
            slot.in_flight = false;
        }
    }
}

/// Last-value cache with one refresh worker per token
///
/// Dropping the resolver cancels it: workers still running finish their job
/// but their results are discarded.
#[derive(Debug)]
pub struct BackgroundResolver {
    slots: Slots,
    min_interval: Duration,
    cancelled: Arc<AtomicBool>,
}

impl BackgroundResolver {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            min_interval,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Last value for `key` (empty before the first completion), scheduling
    /// `job` if a refresh is due
    pub fn lookup<F>(&self, key: &str, job: F) -> String
    where
        F: FnOnce() -> String + Send + 'static,
    {
        let mut slots = lock(&self.slots);
        let slot = slots.entry(key.to_string()).or_default();

        let due = !slot.in_flight
            && slot
                .started
                .map_or(true, |started| started.elapsed() >= self.min_interval);
        if due {
            slot.in_flight = true;
            slot.started = Some(Instant::now());
            if let Err(err) = self.spawn(key, job) {
                tracing::warn!(key, error = %err, "failed to start refresh worker");
                slot.in_flight = false;
            }
        }

        slot.value.clone().unwrap_or_default()
    }

    fn spawn<F>(&self, key: &str, job: F) -> std::io::Result<()>
    where
        F: FnOnce() -> String + Send + 'static,
    {
        let slots = Arc::clone(&self.slots);
        let cancelled = Arc::clone(&self.cancelled);
        let key = key.to_string();

        tracing::debug!(key = %key, "refresh started");
        thread::Builder::new()
            .name("statusline-refresh".to_string())
            .spawn(move || {
                let guard = InFlight { slots, key };
                let value = job();
                if cancelled.load(Ordering::Acquire) {
                    return;
                }
                tracing::debug!(key = %guard.key, "refresh finished");
                if let Some(slot) = lock(&guard.slots).get_mut(&guard.key) {
                    slot.value = Some(value);
                };
            })
            .map(|_| ())
    }

    /// Last completed value for `key`, without scheduling anything
    pub fn cached(&self, key: &str) -> Option<String> {
        lock(&self.slots).get(key).and_then(|slot| slot.value.clone())
    }

    /// Whether a refresh of `key` is running
    pub fn is_refreshing(&self, key: &str) -> bool {
        lock(&self.slots).get(key).is_some_and(|slot| slot.in_flight)
    }
}

impl Drop for BackgroundResolver {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;

    fn wait_for(resolver: &BackgroundResolver, key: &str) -> Option<String> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if !resolver.is_refreshing(key) {
                if let Some(value) = resolver.cached(key) {
                    return Some(value);
                }
            }
            thread::sleep(Duration::from_millis(5));
        }
        None
    }

    #[test]
    fn test_first_lookup_is_empty_then_cached() {
        let resolver = BackgroundResolver::new(Duration::ZERO);
        assert_eq!(resolver.lookup("k", || "value".to_string()), "");
        assert_eq!(wait_for(&resolver, "k").as_deref(), Some("value"));
        assert_eq!(resolver.lookup("k", || "next".to_string()), "value");
    }

    #[test]
    fn test_serves_previous_value_while_in_flight() {
        let resolver = BackgroundResolver::new(Duration::ZERO);
        resolver.lookup("k", || "old".to_string());
        wait_for(&resolver, "k");

        let (release, gate) = mpsc::channel::<()>();
        resolver.lookup("k", move || {
            let _ = gate.recv();
            "new".to_string()
        });
        assert!(resolver.is_refreshing("k"));
        // still the old value, and no second worker is started
        assert_eq!(resolver.lookup("k", || "other".to_string()), "old");

        release.send(()).unwrap();
        assert_eq!(wait_for(&resolver, "k").as_deref(), Some("new"));
    }

    #[test]
    fn test_min_interval_limits_refreshes() {
        let resolver = BackgroundResolver::new(Duration::from_secs(3600));
        let runs = Arc::new(AtomicUsize::new(0));
        for _ in 0..5 {
            let runs = Arc::clone(&runs);
            resolver.lookup("k", move || {
                runs.fetch_add(1, Ordering::SeqCst);
                "v".to_string()
            });
            wait_for(&resolver, "k");
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_keys_are_independent() {
        let resolver = BackgroundResolver::new(Duration::ZERO);
        resolver.lookup("a", || "1".to_string());
        resolver.lookup("b", || "2".to_string());
        assert_eq!(wait_for(&resolver, "a").as_deref(), Some("1"));
        assert_eq!(wait_for(&resolver, "b").as_deref(), Some("2"));
    }

    #[test]
    fn test_panicking_job_does_not_block_refreshes() {
        let resolver = BackgroundResolver::new(Duration::ZERO);
        resolver.lookup("k", || "old".to_string());
        assert_eq!(wait_for(&resolver, "k").as_deref(), Some("old"));

        resolver.lookup("k", || panic!("job failed"));
        let deadline = Instant::now() + Duration::from_secs(5);
        while resolver.is_refreshing("k") && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!resolver.is_refreshing("k"));
        assert_eq!(resolver.cached("k").as_deref(), Some("old"));

        resolver.lookup("k", || "new".to_string());
        let deadline = Instant::now() + Duration::from_secs(5);
        while resolver.cached("k").as_deref() != Some("new") && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(resolver.cached("k").as_deref(), Some("new"));
    }
}
