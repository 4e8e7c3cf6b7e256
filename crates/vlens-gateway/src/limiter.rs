//! Admission control for inference calls.
//!
//! Two lanes share one gateway:
//! - `Serialized`: a single permit plus a governor limiter, so admissions are
//!   at least `min_spacing` apart and never overlap.
//! - `Parallel`: a pool of `parallel_slots` permits.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{GatewayError, GatewayResult};
use crate::request::Lane;

/// Spacing limiter type alias.
pub type SpacingLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Held for the duration of one attempt.
#[derive(Debug)]
pub struct AdmissionPermit {
    lane: Lane,
    _permit: OwnedSemaphorePermit,
}

impl AdmissionPermit {
    pub fn lane(&self) -> Lane {
        self.lane
    }
}

/// Lane semaphores and the serialized-lane spacing limiter.
pub struct AdmissionControl {
    serialized: Arc<Semaphore>,
    parallel: Arc<Semaphore>,
    spacing: Option<SpacingLimiter>,
    parallel_slots: usize,
}

impl AdmissionControl {
    pub fn new(min_spacing: Duration, parallel_slots: usize) -> Self {
        let parallel_slots = parallel_slots.max(1);
        // A zero period has no quota; spacing is then disabled.
        let spacing = Quota::with_period(min_spacing)
            .map(|quota| RateLimiter::direct(quota.allow_burst(NonZeroU32::MIN)));

        Self {
            serialized: Arc::new(Semaphore::new(1)),
            parallel: Arc::new(Semaphore::new(parallel_slots)),
            spacing,
            parallel_slots,
        }
    }

    /// Wait for admission on `lane`.
    pub async fn admit(&self, lane: Lane) -> GatewayResult<AdmissionPermit> {
        let semaphore = match lane {
            Lane::Serialized => &self.serialized,
            Lane::Parallel => &self.parallel,
        };

        let permit = Arc::clone(semaphore)
            .acquire_owned()
            .await
            .map_err(|_| GatewayError::Unavailable(format!("{} lane closed", lane.as_str())))?;

        if lane == Lane::Serialized {
            if let Some(limiter) = &self.spacing {
                limiter.until_ready().await;
            }
        }

        Ok(AdmissionPermit {
            lane,
            _permit: permit,
        })
    }

    /// Configured parallel slots.
    pub fn parallel_slots(&self) -> usize {
        self.parallel_slots
    }

    /// Permits currently free on `lane`.
    pub fn available(&self, lane: Lane) -> usize {
        match lane {
            Lane::Serialized => self.serialized.available_permits(),
            Lane::Parallel => self.parallel.available_permits(),
        }
    }

    /// Stop admitting; waiting and future callers get `Unavailable`.
    pub fn close(&self) {
        self.serialized.close();
        self.parallel.close();
    }
}

impl std::fmt::Debug for AdmissionControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionControl")
            .field("parallel_slots", &self.parallel_slots)
            .field("spacing", &self.spacing.is_some())
            .finish()
    }
}
