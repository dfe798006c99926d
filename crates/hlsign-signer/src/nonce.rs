//! Nonces per signing identity.
//!
//! Each signer address owns one [`NonceCounter`]. A nonce is
//! `max(last + 1, now + skew)`, where `skew` is the server-minus-local clock
//! offset from the last [`NonceRegistry::sync_with_server`]. A nonce is
//! consumed when issued, whether or not the request is ever sent.
//!
//! [`NonceRegistry::global`] is the process-wide registry every
//! `SigningEngine::new` draws from, so two engines signing for the same
//! address never hand out the same nonce.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use alloy::primitives::Address;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use thiserror::Error;

/// Server/local clock offsets above this are refused.
pub const MAX_CLOCK_SKEW_MS: u64 = 5_000;

/// Server/local clock offsets above this are logged.
pub const WARN_CLOCK_SKEW_MS: u64 = 2_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NonceError {
    #[error("server clock is {skew_ms}ms from local clock (limit 5000ms)")]
    ClockSkew { skew_ms: i64 },
}

/// Milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        chrono::Utc::now().timestamp_millis().max(0) as u64
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// Monotonic nonce counter for one identity.
#[derive(Debug)]
pub struct NonceCounter {
    last: AtomicU64,
    skew_ms: AtomicI64,
}

impl NonceCounter {
    /// The first nonce issued is strictly above `now_ms`.
    pub fn starting_at(now_ms: u64) -> Self {
        Self {
            last: AtomicU64::new(now_ms),
            skew_ms: AtomicI64::new(0),
        }
    }

    /// Issue the next nonce for local time `now_ms`.
    pub fn issue(&self, now_ms: u64) -> u64 {
        let floor = apply_skew(now_ms, self.skew_ms.load(Ordering::Acquire));
        let step = |last: u64| last.saturating_add(1).max(floor);
        match self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| Some(step(last)))
        {
            Ok(prev) | Err(prev) => step(prev),
        }
    }

    /// Record the server clock and move the counter up to it.
    ///
    /// Returns the new skew. On error nothing changes.
    pub fn align(&self, local_ms: u64, server_ms: u64) -> Result<i64, NonceError> {
        let skew = i128::from(server_ms) - i128::from(local_ms);
        let skew_ms = i64::try_from(skew).unwrap_or(if skew < 0 { i64::MIN } else { i64::MAX });
        if skew_ms.unsigned_abs() > MAX_CLOCK_SKEW_MS {
            return Err(NonceError::ClockSkew { skew_ms });
        }

        self.skew_ms.store(skew_ms, Ordering::Release);
        self.last.fetch_max(server_ms, Ordering::AcqRel);
        Ok(skew_ms)
    }

    pub fn last_issued(&self) -> u64 {
        self.last.load(Ordering::Acquire)
    }

    /// Server minus local, in milliseconds.
    pub fn skew_ms(&self) -> i64 {
        self.skew_ms.load(Ordering::Acquire)
    }
}

fn apply_skew(local_ms: u64, skew_ms: i64) -> u64 {
    if skew_ms >= 0 {
        local_ms.saturating_add(skew_ms.unsigned_abs())
    } else {
        local_ms.saturating_sub(skew_ms.unsigned_abs())
    }
}

static GLOBAL_NONCES: Lazy<Arc<NonceRegistry>> =
    Lazy::new(|| Arc::new(NonceRegistry::new(SystemClock)));

/// One [`NonceCounter`] per signer address.
pub struct NonceRegistry<C: Clock + Clone = SystemClock> {
    counters: DashMap<Address, Arc<NonceCounter>>,
    clock: C,
}

impl NonceRegistry<SystemClock> {
    /// The registry shared by the whole process.
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL_NONCES)
    }
}

impl<C: Clock + Clone> NonceRegistry<C> {
    /// A private registry, e.g. with a fixed clock in tests.
    pub fn new(clock: C) -> Self {
        Self {
            counters: DashMap::new(),
            clock,
        }
    }

    /// Counter for `address`, created on first use.
    pub fn counter(&self, address: Address) -> Arc<NonceCounter> {
        self.counters
            .entry(address)
            .or_insert_with(|| {
                tracing::debug!(%address, "creating nonce counter");
                Arc::new(NonceCounter::starting_at(self.clock.now_ms()))
            })
            .clone()
    }

    pub fn next(&self, address: Address) -> u64 {
        self.counter(address).issue(self.clock.now_ms())
    }

    /// Align the counter of `address` with the exchange clock.
    ///
    /// # Errors
    /// `NonceError::ClockSkew` if the clocks are more than
    /// [`MAX_CLOCK_SKEW_MS`] apart.
    pub fn sync_with_server(&self, address: Address, server_ms: u64) -> Result<(), NonceError> {
        let skew_ms = self
            .counter(address)
            .align(self.clock.now_ms(), server_ms)?;
        if skew_ms.unsigned_abs() > WARN_CLOCK_SKEW_MS {
            tracing::warn!(%address, skew_ms, "local clock far from server clock");
        } else {
            tracing::debug!(%address, skew_ms, "nonce counter aligned with server");
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}
