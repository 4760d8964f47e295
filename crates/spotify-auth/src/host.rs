//! Host capabilities injected into the flow
//!
//! Everything the flow needs from its surroundings (wall clock, entropy,
//! persistent storage, page location) comes through these traits, so the
//! same logic runs in a page host, the headless binary, and unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngExt;

use crate::navigator::{MemoryNavigator, Navigator};
use crate::store::{NullStore, PersistentStore};

/// Source of the current time as unix milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn new(now_millis: u64) -> Self {
        Self(AtomicU64::new(now_millis))
    }

    pub fn set(&self, now_millis: u64) {
        self.0.store(now_millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: u64) {
        self.0.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Source of cryptographically strong random bytes.
///
/// Implementations must fail loudly (panic) rather than hand back
/// predictable bytes.
pub trait RandomSource: Send + Sync {
    fn fill_bytes(&self, buf: &mut [u8]);
}

/// Thread-local CSPRNG seeded from the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill_bytes(&self, buf: &mut [u8]) {
        let mut rng = rand::rng();
        for chunk in buf.chunks_mut(64) {
            let mut block = [0u8; 64];
            rng.fill(&mut block);
            chunk.copy_from_slice(&block[..chunk.len()]);
        }
    }
}

/// The capability bundle handed to every flow component.
#[derive(Clone)]
pub struct Host {
    pub store: Arc<dyn PersistentStore>,
    pub clock: Arc<dyn Clock>,
    pub random: Arc<dyn RandomSource>,
    pub navigator: Arc<dyn Navigator>,
}

impl Host {
    /// Host with the given store and location, wall clock, and OS entropy.
    pub fn new(store: Arc<dyn PersistentStore>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            random: Arc::new(OsRandom),
            navigator,
        }
    }

    /// Host with no page and no storage, for evaluation outside a document.
    ///
    /// Every flow entry point degrades to a no-op or `false` here.
    pub fn detached() -> Self {
        Self::new(Arc::new(NullStore), Arc::new(MemoryNavigator::detached()))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }
}
