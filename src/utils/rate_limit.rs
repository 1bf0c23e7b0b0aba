//! Outbound request rate limiting.
//!
//! The limiter follows the generic cell rate algorithm: each permit is
//! scheduled at a theoretical arrival time (TAT) that advances by one
//! replenish interval per request. The quota itself is described with
//! [`governor::Quota`]; scheduling runs on the tokio clock so that waiting is
//! an ordinary timer sleep and tests can drive it with a paused clock.
//!
//! The scheduling state is guarded by a mutex that is only held while a
//! permit is reserved, never across the sleep.

use governor::Quota;
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

use crate::client::ClientError;

/// Burst used when none is configured
pub const DEFAULT_BURST: NonZeroU32 = nonzero!(1u32);

/// Steady-rate gate shared by every request of one client
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    tolerance: Duration,
    tat: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter enforcing `quota`
    pub fn new(quota: Quota) -> Self {
        let interval = quota.replenish_interval();
        let tolerance = interval * (quota.burst_size().get() - 1);

        Self {
            interval,
            tolerance,
            tat: Mutex::new(None),
        }
    }

    /// Create a limiter allowing `requests_per_second` with an optional burst
    pub fn per_second(requests_per_second: f64, burst: u32) -> Result<Self, ClientError> {
        if !requests_per_second.is_finite() || requests_per_second <= 0.0 {
            return Err(ClientError::Config(format!(
                "requests per second must be positive, got {}",
                requests_per_second
            )));
        }

        let nanos = (1_000_000_000f64 / requests_per_second).round();
        let quota = (nanos >= 1.0)
            .then(|| Quota::with_period(Duration::from_nanos(nanos as u64)))
            .flatten()
            .ok_or_else(|| {
                ClientError::Config(format!(
                    "request rate {} is too high to schedule",
                    requests_per_second
                ))
            })?;

        let burst = NonZeroU32::new(burst)
            .ok_or_else(|| ClientError::Config("burst must be at least 1".to_string()))?;

        Ok(Self::new(quota.allow_burst(burst)))
    }

    /// Time between permits at the steady rate
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until one more request may be sent.
    ///
    /// Never fails. Dropping the returned future before it completes gives
    /// the reserved slot back, provided no later caller reserved after it.
    pub async fn acquire(&self) {
        let reservation = self.reserve(Instant::now());
        if let Some(ready_at) = reservation.ready_at {
            sleep_until(ready_at).await;
        }
        reservation.commit();
    }

    fn reserve(&self, now: Instant) -> Reservation<'_> {
        let mut tat = self.tat.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = *tat;

        let arrival = previous.map_or(now, |t| t.max(now));
        let allowed_at = arrival.checked_sub(self.tolerance).unwrap_or(now);
        let reserved = arrival + self.interval;
        *tat = Some(reserved);

        Reservation {
            limiter: self,
            previous,
            reserved,
            ready_at: (allowed_at > now).then_some(allowed_at),
            committed: false,
        }
    }
}

/// A permit slot taken from the limiter but not yet used
struct Reservation<'a> {
    limiter: &'a RateLimiter,
    previous: Option<Instant>,
    reserved: Instant,
    ready_at: Option<Instant>,
    committed: bool,
}

impl Reservation<'_> {
    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }

        let mut tat = self
            .limiter
            .tat
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *tat == Some(self.reserved) {
            *tat = self.previous;
        }
    }
}
