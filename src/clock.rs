//! Time and id generation as injected dependencies, so detection and
//! resolution runs are reproducible under test.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use ulid::Ulid;

use crate::model::Ms;

pub trait Clock: Send + Sync {
    fn now_ms(&self) -> Ms;
}

/// Wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> Ms {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as Ms)
            .unwrap_or(0)
    }
}

/// Manually advanced clock for tests.
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now: Ms) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn advance(&self, delta: Ms) {
        self.now.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Ms {
        self.now.load(Ordering::SeqCst)
    }
}

pub trait IdSource: Send + Sync {
    fn next_id(&self) -> Ulid;
}

/// Random ULIDs.
pub struct UlidIds;

impl IdSource for UlidIds {
    fn next_id(&self) -> Ulid {
        Ulid::new()
    }
}

/// Sequential ids for tests.
pub struct SeqIds {
    counter: AtomicU64,
}

impl SeqIds {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(1),
        }
    }
}

impl Default for SeqIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdSource for SeqIds {
    fn next_id(&self) -> Ulid {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ulid::from_parts(0, n as u128)
    }
}
