//! # Stockpile
//!
//! A bounded pool of expensive-to-create resources (network clients,
//! connections) shared between many tokio tasks.
//!
//! A [`Pool`] is filled through a [`Factory`], hands out [`Pooled`] guards
//! that return their resource when dropped, and disposes of its idle
//! resources on [`Pool::shutdown`]. When nothing is idle, [`Pool::acquire`]
//! waits for a release (or, under [`AcquirePolicy::Grow`], creates up to
//! the pool's capacity first).
//!
//! ```
//! use stockpile::{Pool, PoolConfig, factory};
//!
//! # #[tokio::main]
//! # async fn main() -> stockpile::Result<()> {
//! let pool = Pool::new(
//!     factory::from_fn(|| Ok::<_, std::io::Error>(Vec::<u8>::with_capacity(4096))),
//!     PoolConfig::new(2, 8),
//! )
//! .await?;
//!
//! {
//!     let mut buf = pool.acquire().await?;
//!     buf.extend_from_slice(b"hello");
//!     assert_eq!(pool.size(), 1);
//! } // returned here
//!
//! assert_eq!(pool.size(), 2);
//! pool.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod factory;
pub mod guard;
pub mod pool;
mod slots;

pub use config::{AcquirePolicy, PoolConfig};
pub use error::{BoxError, Error, Result};
pub use factory::{Factory, FnFactory};
pub use guard::Pooled;
pub use pool::{Pool, PoolStats};
pub use slots::{RefuseReason, Release};
