//! Polling until a domain association settles.
//!
//! Verification is asynchronous on the service side. The waiter polls the
//! finder with jittered exponential backoff until the status is terminal,
//! the object vanishes for good, or the timeout fires.

use std::time::Duration;

use rand::Rng;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use crate::clients::AmplifyClient;
use crate::config::BackoffConfig;
use crate::error::WaitError;
use crate::finder::{Finder, LookupOutcome};
use crate::id::ResourceKey;
use crate::model::{DomainAssociation, VerificationStatus};

/// Smallest interval between polls.
const MIN_DELAY: Duration = Duration::from_millis(1);

/// Exponential backoff with downward jitter.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max: Duration,
    multiplier: f64,
    jitter: f64,
}

impl Backoff {
    pub fn new(config: &BackoffConfig) -> Self {
        let max = Duration::from_millis(config.max_delay_ms).max(MIN_DELAY);
        Self {
            next: Duration::from_millis(config.initial_delay_ms).clamp(MIN_DELAY, max),
            max,
            multiplier: config.multiplier.max(1.0),
            jitter: if config.jitter.is_finite() {
                config.jitter.clamp(0.0, 1.0)
            } else {
                0.0
            },
        }
    }

    /// Returns the next interval to sleep and advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.next;
        // Products too large for a Duration saturate at the cap.
        self.next = Duration::try_from_secs_f64(base.as_secs_f64() * self.multiplier)
            .map_or(self.max, |next| next.min(self.max));

        if self.jitter == 0.0 {
            return base;
        }
        let cut = rand::thread_rng().gen_range(0.0..=self.jitter);
        base.mul_f64(1.0 - cut).max(MIN_DELAY)
    }
}

/// Waits for domain associations to become visible or verified.
pub struct VerificationWaiter<C: ?Sized> {
    finder: Finder<C>,
    backoff: BackoffConfig,
    not_found_grace: Duration,
}

impl<C: AmplifyClient + ?Sized> VerificationWaiter<C> {
    pub fn new(finder: Finder<C>, backoff: BackoffConfig, not_found_grace: Duration) -> Self {
        Self {
            finder,
            backoff,
            not_found_grace,
        }
    }

    /// Waits until verification reaches `SUCCESS` or `FAILED`.
    ///
    /// `NotFound` is tolerated for the grace period counted from now.
    pub async fn wait_for_verification(
        &self,
        key: &ResourceKey,
        timeout: Duration,
    ) -> Result<VerificationStatus, WaitError> {
        self.wait_for_verification_since(key, timeout, Instant::now())
            .await
    }

    /// Like [`wait_for_verification`](Self::wait_for_verification) with the
    /// grace period counted from `created_at`.
    pub async fn wait_for_verification_since(
        &self,
        key: &ResourceKey,
        timeout: Duration,
        created_at: Instant,
    ) -> Result<VerificationStatus, WaitError> {
        let association = self.wait_for_terminal(key, timeout, created_at).await?;
        Ok(association.status.verification())
    }

    /// Waits for a terminal verification status and returns the association
    /// as observed at that point.
    pub async fn wait_for_terminal(
        &self,
        key: &ResourceKey,
        timeout: Duration,
        created_at: Instant,
    ) -> Result<DomainAssociation, WaitError> {
        let association = self
            .poll(key, timeout, created_at, |association| {
                association
                    .status
                    .verification()
                    .is_terminal()
                    .then(|| association.clone())
            })
            .await?;
        info!(%key, status = association.status.as_str(), "Verification finished");
        Ok(association)
    }

    /// Waits until the association is observed once, in any state.
    pub async fn wait_until_visible(
        &self,
        key: &ResourceKey,
        timeout: Duration,
        created_at: Instant,
    ) -> Result<DomainAssociation, WaitError> {
        self.poll(key, timeout, created_at, |association| {
            Some(association.clone())
        })
        .await
    }

    async fn poll<T>(
        &self,
        key: &ResourceKey,
        timeout: Duration,
        created_at: Instant,
        mut done: impl FnMut(&DomainAssociation) -> Option<T>,
    ) -> Result<T, WaitError> {
        let started = Instant::now();
        let grace_until = created_at + self.not_found_grace;
        let mut backoff = Backoff::new(&self.backoff);
        let mut attempts: u32 = 0;
        let mut seen = false;

        let polling = async {
            loop {
                attempts += 1;
                match self.finder.find_by_key(key).await {
                    LookupOutcome::Found(association) => {
                        seen = true;
                        if let Some(value) = done(&association) {
                            return Ok(value);
                        }
                        debug!(%key, attempt = attempts, status = association.status.as_str(), "Still pending");
                    }
                    LookupOutcome::NotFound if Instant::now() < grace_until => {
                        debug!(%key, attempt = attempts, "Not visible yet");
                    }
                    LookupOutcome::NotFound if seen => {
                        return Err(WaitError::Disappeared(key.to_string()));
                    }
                    LookupOutcome::NotFound => {
                        return Err(WaitError::NotVisible(key.to_string()));
                    }
                    LookupOutcome::Error(e) => return Err(WaitError::Transport(e)),
                }
                sleep(backoff.next_delay()).await;
            }
        };

        let outcome = tokio::time::timeout(timeout, polling).await;
        match outcome {
            Ok(result) => result,
            Err(_) => Err(WaitError::Timeout {
                elapsed_ms: started.elapsed().as_millis() as u64,
                attempts,
            }),
        }
    }
}
