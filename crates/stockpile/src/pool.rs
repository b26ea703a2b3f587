//! Bounded pool of idle resources over a [`Factory`].
//!
//! `Pool<F>` fills itself through `F::create` at construction, hands out
//! [`Pooled`] guards, takes resources back when guards drop, and disposes
//! of its idle resources through `F::dispose` on shutdown.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::PoolConfig;
use crate::error::{Error, Result};
use crate::factory::Factory;
use crate::guard::Pooled;
use crate::slots::{Claim, Origin, Release, Slots, Wait};

/// Pool statistics.
///
/// A snapshot; concurrent callers may change the pool right after it is
/// taken.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Current number of idle resources.
    pub idle: usize,
    /// Current number of resources checked out through guards.
    pub in_use: usize,
    /// Pool capacity.
    pub max_size: usize,
    /// Total successful acquisitions.
    pub total_acquisitions: u64,
    /// Total resources admitted back into idle storage.
    pub total_releases: u64,
    /// Total resources created by the factory.
    pub created: u64,
    /// Total idle resources whose `dispose` completed at shutdown.
    pub disposed: u64,
    /// Total releases the pool refused (closed or at capacity).
    pub refused: u64,
}

type Retirement = Shared<BoxFuture<'static, ()>>;

struct PoolInner<F: Factory> {
    factory: Arc<F>,
    config: PoolConfig,
    slots: Arc<Slots<F::Resource>>,
    /// Started by the first `shutdown` call and shared by every later one.
    retirement: Mutex<Option<Retirement>>,
}

/// Generic bounded resource pool.
///
/// Cloning is cheap and every clone refers to the same pool.
pub struct Pool<F: Factory> {
    inner: Arc<PoolInner<F>>,
}

impl<F: Factory> Clone for Pool<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: Factory> std::fmt::Debug for Pool<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("config", &self.inner.config)
            .field("closed", &self.inner.slots.is_closed())
            .field("stats", &self.stats())
            .finish()
    }
}

impl<F: Factory> Pool<F> {
    /// Build a pool, creating `config.initial_size` resources up front.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if `config` is invalid, and
    /// [`Error::ConstructionFailed`] if any factory call fails. In the latter
    /// case every resource created so far is disposed before returning.
    pub async fn new(factory: F, config: PoolConfig) -> Result<Self> {
        config.validate()?;

        let requested = config.initial_size;
        let mut initial = Vec::with_capacity(requested);
        for _ in 0..requested {
            match factory.create().await {
                Ok(resource) => initial.push(resource),
                Err(error) => {
                    let created = initial.len();
                    tracing::warn!(
                        created,
                        requested,
                        error = %error,
                        "Initial fill failed, disposing created resources"
                    );
                    for resource in initial {
                        factory.dispose(resource).await;
                    }
                    return Err(Error::ConstructionFailed {
                        created,
                        requested,
                        source: Box::new(error),
                    });
                }
            }
        }

        tracing::debug!(
            initial_size = requested,
            max_size = config.max_size,
            policy = ?config.policy,
            "Pool filled"
        );

        let slots = Arc::new(Slots::new(initial, config.max_size, config.policy));
        Ok(Self {
            inner: Arc::new(PoolInner {
                factory: Arc::new(factory),
                config,
                slots,
                retirement: Mutex::new(None),
            }),
        })
    }

    /// Acquire a resource, waiting until one is released or the pool closes.
    ///
    /// Honours the configured `acquire_timeout`, if any.
    ///
    /// # Errors
    /// [`Error::Closed`] once the pool is shut down, [`Error::Timeout`] when
    /// the configured deadline passes, [`Error::Create`] when a lazily
    /// created resource fails.
    pub async fn acquire(&self) -> Result<Pooled<F::Resource>> {
        match self.inner.config.acquire_timeout {
            Some(timeout) => self.checkout(Wait::Timeout(timeout)).await,
            None => self.checkout(Wait::Indefinitely).await,
        }
    }

    /// Acquire a resource, giving up with [`Error::Timeout`] after `timeout`.
    pub async fn acquire_timeout(&self, timeout: Duration) -> Result<Pooled<F::Resource>> {
        self.checkout(Wait::Timeout(timeout)).await
    }

    /// Acquire a resource, giving up with [`Error::Cancelled`] once `token`
    /// is cancelled.
    pub async fn acquire_cancellable(
        &self,
        token: &CancellationToken,
    ) -> Result<Pooled<F::Resource>> {
        self.checkout(Wait::Until(token)).await
    }

    /// Acquire a resource without waiting for another caller to release one.
    ///
    /// # Errors
    /// [`Error::Exhausted`] if nothing is available right now.
    pub async fn try_acquire(&self) -> Result<Pooled<F::Resource>> {
        self.checkout(Wait::Never).await
    }

    async fn checkout(&self, wait: Wait<'_>) -> Result<Pooled<F::Resource>> {
        let slots = &self.inner.slots;
        match slots.claim(wait).await? {
            Claim::Idle(resource) => Ok(Pooled::new(resource, Arc::clone(slots))),
            Claim::Vacant => {
                let vacancy = Vacancy {
                    slots,
                    filled: false,
                };
                let resource = self
                    .inner
                    .factory
                    .create()
                    .await
                    .map_err(|e| Error::Create {
                        source: Box::new(e),
                    })?;
                vacancy.fill();
                Ok(Pooled::new(resource, Arc::clone(slots)))
            }
        }
    }

    /// Hand a resource back to the pool without a guard.
    ///
    /// Meant for resources taken out with [`Pooled::detach`] or created
    /// outside the pool. Never blocks.
    ///
    /// The pool is full when idle storage holds `max_size` resources. Under
    /// [`AcquirePolicy::Grow`](crate::AcquirePolicy::Grow) it is also full
    /// once `max_size` resources are live (idle plus checked out), even if
    /// idle storage has room, so the bound on live resources holds.
    ///
    /// # Errors
    /// [`Error::InvalidResource`] for `None`, whatever the pool state. A
    /// closed or full pool is not an error: the resource comes back in
    /// [`Release::Refused`] and disposing of it is up to the caller.
    pub fn release(&self, resource: Option<F::Resource>) -> Result<Release<F::Resource>> {
        let resource = resource.ok_or(Error::InvalidResource)?;
        Ok(self.inner.slots.put(resource, Origin::Foreign))
    }

    /// Number of idle resources. A momentary snapshot.
    pub fn size(&self) -> usize {
        self.inner.slots.len()
    }

    /// Maximum number of idle resources the pool retains.
    pub fn capacity(&self) -> usize {
        self.inner.slots.max_size()
    }

    /// Whether [`Pool::shutdown`] has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.slots.is_closed()
    }

    /// The configuration this pool was built with.
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.inner.slots.stats()
    }

    /// Close the pool and dispose of every idle resource.
    ///
    /// Blocked acquires fail with [`Error::Closed`]. Resources still held
    /// through guards are not touched; they are refused when returned.
    /// Idempotent: concurrent and repeated calls all return once disposal
    /// has finished.
    ///
    /// Disposal is shared between callers rather than owned by one. If a
    /// call is dropped before it completes (a timeout, `select!`, aborted
    /// task), the next call resumes where it stopped, including a
    /// `dispose` that was in progress. Without a next call, the remaining
    /// resources are dropped along with the pool.
    pub async fn shutdown(&self) {
        let retirement = self
            .inner
            .retirement
            .lock()
            .get_or_insert_with(|| {
                retire(Arc::clone(&self.inner.factory), Arc::clone(&self.inner.slots))
                    .boxed()
                    .shared()
            })
            .clone();
        retirement.await;
    }
}

/// Close storage, then dispose of the drained resources one by one.
async fn retire<F: Factory>(factory: Arc<F>, slots: Arc<Slots<F::Resource>>) {
    let Some(drained) = slots.close() else {
        return;
    };
    let count = drained.len();
    for resource in drained {
        factory.dispose(resource).await;
        slots.record_disposed();
    }
    tracing::debug!(disposed = count, "Pool shut down");
}

/// A reserved slot that is handed back unless the factory fills it.
///
/// Covers both a failed `create` and an acquire dropped mid-creation.
struct Vacancy<'a, R> {
    slots: &'a Slots<R>,
    filled: bool,
}

impl<R> Vacancy<'_, R> {
    fn fill(mut self) {
        self.filled = true;
        self.slots.fill_vacant();
    }
}

impl<R> Drop for Vacancy<'_, R> {
    fn drop(&mut self) {
        if !self.filled {
            self.slots.abandon_vacant();
        }
    }
}
