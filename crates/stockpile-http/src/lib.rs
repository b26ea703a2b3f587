//! # Stockpile HTTP
//!
//! An HTTP client that throttles concurrent `reqwest::Client` handles
//! through a [`stockpile::Pool`].
//!
//! Every call checks out one client and issues exactly one request. A failed
//! request hands the client straight back; a successful one keeps it inside
//! the returned [`PooledResponse`] until the body has been read or the
//! response is dropped, so no more than `max_size` connections are ever busy.

pub mod client;
pub mod error;

pub use client::{ClientFactory, PooledClient, PooledResponse};
pub use error::{Error, Result};
