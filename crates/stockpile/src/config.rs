//! Pool configuration types

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// What `acquire` does when idle storage is empty.
///
/// Chosen once per pool; a pool never switches policy after construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AcquirePolicy {
    /// Wait for a resource to be released. The factory only runs during
    /// the initial fill.
    #[default]
    Wait,
    /// Create a resource through the factory while fewer than `max_size`
    /// are live, then wait like [`AcquirePolicy::Wait`].
    Grow,
}

/// Configuration for a resource pool
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoolConfig {
    /// Number of resources created eagerly when the pool is built
    pub initial_size: usize,
    /// Maximum number of idle resources the pool retains
    pub max_size: usize,
    /// Default deadline for [`Pool::acquire`](crate::Pool::acquire);
    /// `None` waits until a resource is released or the pool closes
    pub acquire_timeout: Option<Duration>,
    /// Behaviour when no idle resource is available
    pub policy: AcquirePolicy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_size: 0,
            max_size: 10,
            acquire_timeout: None,
            policy: AcquirePolicy::Wait,
        }
    }
}

impl PoolConfig {
    /// Config with the given initial fill and capacity, other fields default.
    pub fn new(initial_size: usize, max_size: usize) -> Self {
        Self {
            initial_size,
            max_size,
            ..Self::default()
        }
    }

    /// Set the default acquire deadline.
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    /// Set the acquire policy.
    pub fn with_policy(mut self, policy: AcquirePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Validate pool configuration, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(Error::configuration("max_size must be greater than 0"));
        }
        if self.initial_size > self.max_size {
            return Err(Error::configuration(format!(
                "initial_size ({}) must not exceed max_size ({})",
                self.initial_size, self.max_size
            )));
        }
        if self.acquire_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::configuration(
                "acquire_timeout must be greater than zero",
            ));
        }
        Ok(())
    }
}
