//! Idle storage shared by a pool and the guards it hands out.
//!
//! All mutation goes through one `parking_lot` mutex that also owns the
//! closed flag, so nothing is pushed into or popped from storage after
//! shutdown has drained it. The semaphore only counts availability; it
//! never carries resources itself.
//!
//! Permit invariant: `available == idle.len() + headroom`, where `headroom`
//! is `max_size - live` under [`AcquirePolicy::Grow`] and zero otherwise.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{Semaphore, TryAcquireError};
use tokio_util::sync::CancellationToken;

use crate::config::AcquirePolicy;
use crate::error::{Error, Result};
use crate::pool::PoolStats;

/// Outcome of returning a resource to the pool.
///
/// Both variants are successes: a refused resource is handed back so the
/// caller can dispose of it.
#[must_use = "a refused resource is handed back and must be disposed of by the caller"]
#[derive(Debug, PartialEq, Eq)]
pub enum Release<R> {
    /// The resource is idle in the pool again.
    Admitted,
    /// The pool did not take the resource back.
    Refused {
        /// The resource, returned to the caller.
        resource: R,
        /// Why it was not admitted.
        reason: RefuseReason,
    },
}

impl<R> Release<R> {
    /// Whether the resource went back into idle storage.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }

    /// The refused resource, if any.
    pub fn into_refused(self) -> Option<R> {
        match self {
            Self::Admitted => None,
            Self::Refused { resource, .. } => Some(resource),
        }
    }
}

/// Why a released resource was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefuseReason {
    /// The pool has been shut down.
    Closed,
    /// Idle storage (or, under `Grow`, the live count) is already at capacity.
    AtCapacity,
}

/// How long a caller is prepared to wait for availability.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Wait<'a> {
    Indefinitely,
    Timeout(Duration),
    Until(&'a CancellationToken),
    Never,
}

/// What a successful claim gave the caller.
pub(crate) enum Claim<R> {
    /// An idle resource, now exclusively owned by the caller.
    Idle(R),
    /// A reserved slot the caller must fill through the factory.
    Vacant,
}

/// Where a resource being put back came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// Checked out from this pool and still counted as live.
    Pooled,
    /// Outside pool accounting (detached, or never from this pool).
    Foreign,
}

#[derive(Debug, Default)]
struct Counters {
    acquisitions: u64,
    releases: u64,
    created: u64,
    disposed: u64,
    refused: u64,
}

struct State<R> {
    idle: VecDeque<R>,
    closed: bool,
    /// Resources in pool accounting: idle plus checked out.
    live: usize,
    in_use: usize,
    counters: Counters,
}

pub(crate) struct Slots<R> {
    state: Mutex<State<R>>,
    available: Semaphore,
    max_size: usize,
    policy: AcquirePolicy,
}

impl<R> Slots<R> {
    pub(crate) fn new(initial: Vec<R>, max_size: usize, policy: AcquirePolicy) -> Self {
        let live = initial.len();
        let headroom = match policy {
            AcquirePolicy::Wait => 0,
            AcquirePolicy::Grow => max_size - live,
        };
        let mut idle = VecDeque::with_capacity(max_size);
        idle.extend(initial);
        Self {
            state: Mutex::new(State {
                idle,
                closed: false,
                live,
                in_use: 0,
                counters: Counters {
                    created: live as u64,
                    ..Counters::default()
                },
            }),
            available: Semaphore::new(live + headroom),
            max_size,
            policy,
        }
    }

    pub(crate) fn max_size(&self) -> usize {
        self.max_size
    }

    /// Wait for availability, then claim an idle resource or a vacant slot.
    ///
    /// Cancellation safe: nothing is reserved until the final synchronous
    /// section runs.
    pub(crate) async fn claim(&self, wait: Wait<'_>) -> Result<Claim<R>> {
        loop {
            if self.state.lock().closed {
                return Err(Error::Closed);
            }
            self.wait_permit(wait).await?.forget();

            let mut state = self.state.lock();
            if state.closed {
                return Err(Error::Closed);
            }
            if let Some(resource) = state.idle.pop_front() {
                state.in_use += 1;
                state.counters.acquisitions += 1;
                tracing::trace!(idle = state.idle.len(), in_use = state.in_use, "Claimed idle resource");
                return Ok(Claim::Idle(resource));
            }
            if self.policy == AcquirePolicy::Grow && state.live < self.max_size {
                state.live += 1;
                state.in_use += 1;
                tracing::trace!(live = state.live, "Reserved slot for a new resource");
                return Ok(Claim::Vacant);
            }
            // Unbacked permit; go back to waiting.
        }
    }

    async fn wait_permit(&self, wait: Wait<'_>) -> Result<tokio::sync::SemaphorePermit<'_>> {
        let permit = match wait {
            Wait::Indefinitely => self.available.acquire().await,
            Wait::Timeout(timeout) => tokio::time::timeout(timeout, self.available.acquire())
                .await
                .map_err(|_| Error::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                })?,
            Wait::Until(token) => {
                tokio::select! {
                    biased;
                    () = token.cancelled() => return Err(Error::Cancelled),
                    permit = self.available.acquire() => permit,
                }
            }
            Wait::Never => {
                return match self.available.try_acquire() {
                    Ok(permit) => Ok(permit),
                    Err(TryAcquireError::Closed) => Err(Error::Closed),
                    Err(TryAcquireError::NoPermits) => Err(Error::Exhausted {
                        in_use: self.state.lock().in_use,
                        max_size: self.max_size,
                    }),
                };
            }
        };
        permit.map_err(|_| Error::Closed)
    }

    /// Record that a vacant slot was filled by the factory.
    pub(crate) fn fill_vacant(&self) {
        let mut state = self.state.lock();
        state.counters.created += 1;
        state.counters.acquisitions += 1;
    }

    /// Give back a vacant slot the factory failed to fill.
    pub(crate) fn abandon_vacant(&self) {
        let mut state = self.state.lock();
        state.live -= 1;
        state.in_use -= 1;
        if !state.closed {
            self.free_headroom();
        }
    }

    /// Return a resource to idle storage. Never blocks.
    pub(crate) fn put(&self, resource: R, origin: Origin) -> Release<R> {
        let mut state = self.state.lock();
        if origin == Origin::Pooled {
            state.in_use -= 1;
        }

        if state.closed {
            state.counters.refused += 1;
            return Release::Refused {
                resource,
                reason: RefuseReason::Closed,
            };
        }

        let full = match (origin, self.policy) {
            (Origin::Foreign, AcquirePolicy::Grow) => state.live >= self.max_size,
            _ => state.idle.len() >= self.max_size,
        };
        if full {
            state.counters.refused += 1;
            if origin == Origin::Pooled {
                state.live -= 1;
                self.free_headroom();
            }
            return Release::Refused {
                resource,
                reason: RefuseReason::AtCapacity,
            };
        }

        state.idle.push_back(resource);
        state.counters.releases += 1;
        match origin {
            Origin::Pooled => self.available.add_permits(1),
            Origin::Foreign => {
                state.live += 1;
                // Under `Grow` the new idle resource replaces a unit of headroom.
                if self.policy == AcquirePolicy::Wait {
                    self.available.add_permits(1);
                }
            }
        }
        tracing::trace!(idle = state.idle.len(), in_use = state.in_use, "Resource returned");
        Release::Admitted
    }

    /// Take a checked-out resource out of pool accounting for good.
    pub(crate) fn detach(&self) {
        let mut state = self.state.lock();
        state.in_use -= 1;
        state.live = state.live.saturating_sub(1);
        if !state.closed {
            self.free_headroom();
        }
    }

    /// Close storage and hand back every idle resource for disposal.
    ///
    /// Returns `None` if already closed, so each resource is drained once.
    pub(crate) fn close(&self) -> Option<Vec<R>> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }
        state.closed = true;
        self.available.close();
        let drained: Vec<R> = state.idle.drain(..).collect();
        state.live = state.live.saturating_sub(drained.len());
        Some(drained)
    }

    /// Count a drained resource whose disposal has completed.
    pub(crate) fn record_disposed(&self) {
        self.state.lock().counters.disposed += 1;
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().idle.len()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub(crate) fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            idle: state.idle.len(),
            in_use: state.in_use,
            max_size: self.max_size,
            total_acquisitions: state.counters.acquisitions,
            total_releases: state.counters.releases,
            created: state.counters.created,
            disposed: state.counters.disposed,
            refused: state.counters.refused,
        }
    }

    fn free_headroom(&self) {
        if self.policy == AcquirePolicy::Grow {
            self.available.add_permits(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permits_track_idle_under_wait() {
        let slots = Slots::new(vec![1, 2], 4, AcquirePolicy::Wait);
        assert_eq!(slots.available.available_permits(), 2);
        assert!(slots.put(3, Origin::Foreign).is_admitted());
        assert_eq!(slots.available.available_permits(), 3);
        assert_eq!(slots.len(), 3);
    }

    #[test]
    fn permits_include_headroom_under_grow() {
        let slots = Slots::new(vec![1], 4, AcquirePolicy::Grow);
        assert_eq!(slots.available.available_permits(), 4);
        // A foreign resource fills headroom, so availability is unchanged.
        assert!(slots.put(2, Origin::Foreign).is_admitted());
        assert_eq!(slots.available.available_permits(), 4);
    }

    #[test]
    fn foreign_release_refused_when_idle_full() {
        let slots = Slots::new(vec![1, 2], 2, AcquirePolicy::Wait);
        let outcome = slots.put(3, Origin::Foreign);
        assert_eq!(
            outcome,
            Release::Refused {
                resource: 3,
                reason: RefuseReason::AtCapacity
            }
        );
        assert_eq!(slots.stats().refused, 1);
    }

    #[tokio::test]
    async fn guard_return_refused_when_foreign_releases_filled_idle() {
        let slots = Slots::new(vec![1], 1, AcquirePolicy::Wait);
        let Ok(Claim::Idle(resource)) = slots.claim(Wait::Never).await else {
            panic!("expected an idle resource");
        };
        assert!(slots.put(9, Origin::Foreign).is_admitted());

        let outcome = slots.put(resource, Origin::Pooled);
        assert_eq!(
            outcome,
            Release::Refused {
                resource: 1,
                reason: RefuseReason::AtCapacity
            }
        );
        let stats = slots.stats();
        assert_eq!(stats.idle, 1);
        assert_eq!(stats.in_use, 0);
        assert_eq!(slots.available.available_permits(), 1);
    }

    #[tokio::test]
    async fn grow_refuses_foreign_release_when_live_at_capacity() {
        let slots: Slots<u8> = Slots::new(Vec::new(), 2, AcquirePolicy::Grow);
        assert!(matches!(slots.claim(Wait::Never).await, Ok(Claim::Vacant)));
        assert!(matches!(slots.claim(Wait::Never).await, Ok(Claim::Vacant)));

        // Idle storage is empty, but two live resources already fill capacity.
        let outcome = slots.put(7, Origin::Foreign);
        assert_eq!(
            outcome,
            Release::Refused {
                resource: 7,
                reason: RefuseReason::AtCapacity
            }
        );
        assert_eq!(slots.len(), 0);
        assert_eq!(slots.available.available_permits(), 0);
    }

    #[test]
    fn close_drains_once() {
        let slots = Slots::new(vec![1, 2, 3], 3, AcquirePolicy::Wait);
        assert_eq!(slots.close(), Some(vec![1, 2, 3]));
        assert_eq!(slots.close(), None);
        assert_eq!(slots.len(), 0);
        assert!(slots.is_closed());
        assert_eq!(
            slots.put(4, Origin::Foreign).into_refused(),
            Some(4),
            "closed storage refuses everything"
        );
    }

    #[tokio::test]
    async fn claim_never_waits_when_empty() {
        let slots: Slots<u8> = Slots::new(Vec::new(), 2, AcquirePolicy::Wait);
        let err = slots.claim(Wait::Never).await.err().unwrap();
        assert!(matches!(err, Error::Exhausted { in_use: 0, max_size: 2 }));
    }

    #[tokio::test]
    async fn claim_vacant_then_abandon_restores_headroom() {
        let slots: Slots<u8> = Slots::new(Vec::new(), 1, AcquirePolicy::Grow);
        assert!(matches!(slots.claim(Wait::Never).await, Ok(Claim::Vacant)));
        assert_eq!(slots.available.available_permits(), 0);
        slots.abandon_vacant();
        assert_eq!(slots.available.available_permits(), 1);
        assert_eq!(slots.stats().in_use, 0);
    }
}
