//! The factory contract consumed by the pool.
//!
//! A [`Factory`] produces resources on demand and disposes of the ones the
//! pool retires. The pool treats every call as independent and never
//! inspects the resources it gets back.

use std::future::Future;

/// Creates and disposes pooled resources.
///
/// `create` is called during the initial fill and, under
/// [`AcquirePolicy::Grow`](crate::AcquirePolicy::Grow), when an acquire finds
/// idle storage empty. `dispose` is called exactly once for every idle
/// resource at shutdown and for every resource rolled back when the initial
/// fill fails.
pub trait Factory: Send + Sync + 'static {
    /// The resource handed out by the pool.
    type Resource: Send + 'static;

    /// Error returned when creation fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Create a new resource.
    fn create(&self) -> impl Future<Output = Result<Self::Resource, Self::Error>> + Send;

    /// Release the underlying handle of a resource the pool is retiring.
    fn dispose(&self, resource: Self::Resource) -> impl Future<Output = ()> + Send {
        drop(resource);
        std::future::ready(())
    }
}

/// [`Factory`] backed by a plain closure. Built with [`from_fn`].
pub struct FnFactory<F> {
    create: F,
}

impl<F> std::fmt::Debug for FnFactory<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnFactory").finish_non_exhaustive()
    }
}

/// Wrap a zero-argument closure as a [`Factory`].
///
/// Disposal drops the resource.
///
/// ```
/// use stockpile::{Pool, PoolConfig, factory};
///
/// # #[tokio::main]
/// # async fn main() -> stockpile::Result<()> {
/// let pool = Pool::new(
///     factory::from_fn(|| Ok::<_, std::io::Error>(String::from("conn"))),
///     PoolConfig::new(2, 4),
/// )
/// .await?;
/// assert_eq!(pool.size(), 2);
/// # Ok(())
/// # }
/// ```
pub fn from_fn<F, T, E>(create: F) -> FnFactory<F>
where
    F: Fn() -> Result<T, E> + Send + Sync + 'static,
    T: Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    FnFactory { create }
}

impl<F, T, E> Factory for FnFactory<F>
where
    F: Fn() -> Result<T, E> + Send + Sync + 'static,
    T: Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    type Resource = T;
    type Error = E;

    fn create(&self) -> impl Future<Output = Result<T, E>> + Send {
        std::future::ready((self.create)())
    }
}
