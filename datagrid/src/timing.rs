//! Debounce and frame throttling.
//!
//! Both types are clock-driven state machines: callers pass `now` in, which
//! keeps them deterministic under tokio's paused test clock.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio::time::Instant;

/// Coalesces a stream of observations into at most one per frame.
///
/// The first observation after a quiet period is emitted at once; later ones
/// inside the same frame are held and the newest is released by
/// [`FrameThrottle::poll`] once the frame has elapsed.
#[derive(Debug, Clone)]
pub struct FrameThrottle<T> {
    frame: Duration,
    last_emit: Option<Instant>,
    pending: Option<T>,
}

impl<T: PartialEq> FrameThrottle<T> {
    pub fn new(frame: Duration) -> Self {
        Self {
            frame,
            last_emit: None,
            pending: None,
        }
    }

    /// Record an observation. Returns it if it may be applied now.
    pub fn observe(&mut self, value: T, now: Instant) -> Option<T> {
        if self.frame_open(now) {
            self.pending = None;
            self.last_emit = Some(now);
            Some(value)
        } else {
            self.pending = Some(value);
            None
        }
    }

    /// Release the held observation if its frame has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        if self.pending.is_some() && self.frame_open(now) {
            self.last_emit = Some(now);
            self.pending.take()
        } else {
            None
        }
    }

    /// When the held observation becomes releasable.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (&self.pending, self.last_emit) {
            (Some(_), Some(last)) => Some(last + self.frame),
            _ => None,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn frame_open(&self, now: Instant) -> bool {
        self.last_emit
            .is_none_or(|last| now.duration_since(last) >= self.frame)
    }
}

/// Per-key trailing-edge debouncer.
///
/// Each push restarts the key's timer; [`Debouncer::due`] drains entries whose
/// delay has passed, yielding only the newest value per key.
#[derive(Debug, Clone)]
pub struct Debouncer<K, V> {
    pending: HashMap<K, (V, Instant)>,
}

impl<K: Eq + Hash + Clone, V> Debouncer<K, V> {
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
        }
    }

    pub fn push(&mut self, key: K, value: V, delay: Duration, now: Instant) {
        self.pending.insert(key, (value, now + delay));
    }

    /// Drain every entry whose deadline has passed.
    pub fn due(&mut self, now: Instant) -> Vec<(K, V)> {
        let ready: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, (_, deadline))| *deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();

        ready
            .into_iter()
            .filter_map(|key| self.pending.remove(&key).map(|(value, _)| (key, value)))
            .collect()
    }

    /// Drop a pending value without applying it.
    pub fn cancel(&mut self, key: &K) -> Option<V> {
        self.pending.remove(key).map(|(value, _)| value)
    }

    pub fn pending(&self, key: &K) -> Option<&V> {
        self.pending.get(key).map(|(value, _)| value)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|(_, deadline)| *deadline).min()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<K: Eq + Hash + Clone, V> Default for Debouncer<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
