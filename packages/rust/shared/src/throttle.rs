//! Inter-request delay.
//!
//! The fetch loop and the directory enumerator call [`Throttle::wait`] before
//! each request after the first. Production code injects [`FixedInterval`];
//! tests inject a counting implementation so no real time passes.

use std::time::Duration;

use async_trait::async_trait;

/// A gate that paces sequential requests.
#[async_trait]
pub trait Throttle: Send + Sync {
    /// Block until the next request may be issued.
    async fn wait(&self);
}

/// Sleeps a fixed interval on every call, regardless of what came before.
#[derive(Debug, Clone, Copy)]
pub struct FixedInterval {
    interval: Duration,
}

impl FixedInterval {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }
}

#[async_trait]
impl Throttle for FixedInterval {
    async fn wait(&self) {
        if !self.interval.is_zero() {
            tokio::time::sleep(self.interval).await;
        }
    }
}

/// Never waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl Throttle for NoDelay {
    async fn wait(&self) {}
}
