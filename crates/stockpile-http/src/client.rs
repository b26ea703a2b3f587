//! Pooled HTTP client

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Body, IntoUrl, Request, Response};
use stockpile::{Factory, Pool, PoolConfig, Pooled};

use crate::error::Result;

/// Creates `reqwest::Client` handles for the pool.
///
/// Each client keeps at most one idle connection per host, with keep-alive
/// on, so the pool's capacity bounds the connections opened to an endpoint.
#[derive(Debug, Clone, Default)]
pub struct ClientFactory {
    timeout: Option<Duration>,
}

impl ClientFactory {
    /// Factory with reqwest's default (no) request timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a total timeout to every request made by created clients.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Factory for ClientFactory {
    type Resource = reqwest::Client;
    type Error = reqwest::Error;

    async fn create(&self) -> reqwest::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder().pool_max_idle_per_host(1);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }
}

/// HTTP client that borrows a pooled `reqwest::Client` for each call.
#[derive(Debug, Clone)]
pub struct PooledClient {
    pool: Pool<ClientFactory>,
}

impl PooledClient {
    /// Wrap an existing pool of clients.
    pub fn new(pool: Pool<ClientFactory>) -> Self {
        Self { pool }
    }

    /// Build a pool of default clients and wrap it.
    pub async fn connect(config: PoolConfig) -> stockpile::Result<Self> {
        Ok(Self::new(Pool::new(ClientFactory::new(), config).await?))
    }

    /// The underlying pool.
    pub fn pool(&self) -> &Pool<ClientFactory> {
        &self.pool
    }

    /// Issue a `GET` request.
    pub async fn get(&self, url: impl IntoUrl) -> Result<PooledResponse> {
        let client = self.pool.acquire().await?;
        tracing::trace!("Issuing pooled GET");
        let response = client.get(url).send().await?;
        Ok(PooledResponse::new(response, client))
    }

    /// Issue a `POST` request with the given content type and body.
    pub async fn post(
        &self,
        url: impl IntoUrl,
        content_type: &str,
        body: impl Into<Body>,
    ) -> Result<PooledResponse> {
        let client = self.pool.acquire().await?;
        tracing::trace!(content_type, "Issuing pooled POST");
        let response = client
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;
        Ok(PooledResponse::new(response, client))
    }

    /// Execute a prepared request.
    pub async fn execute(&self, request: Request) -> Result<PooledResponse> {
        let client = self.pool.acquire().await?;
        tracing::trace!(method = %request.method(), url = %request.url(), "Issuing pooled request");
        let response = client.execute(request).await?;
        Ok(PooledResponse::new(response, client))
    }

    /// Shut the underlying pool down. In-flight calls finish normally.
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }
}

/// A response whose body may still be streaming over the pooled client.
///
/// The client stays checked out until the body has been read through one of
/// the consuming methods, or until the response is dropped. Headers and
/// status are available through `Deref`.
#[derive(Debug)]
pub struct PooledResponse {
    response: Response,
    client: Pooled<reqwest::Client>,
}

impl PooledResponse {
    fn new(response: Response, client: Pooled<reqwest::Client>) -> Self {
        Self { response, client }
    }

    /// Read the full body as text, then return the client.
    pub async fn text(self) -> reqwest::Result<String> {
        self.response.text().await
    }

    /// Read the full body, then return the client.
    pub async fn bytes(self) -> reqwest::Result<Bytes> {
        self.response.bytes().await
    }

    /// Read the next chunk of the body. `None` once it is exhausted.
    pub async fn chunk(&mut self) -> reqwest::Result<Option<Bytes>> {
        self.response.chunk().await
    }

    /// Turn a 4xx/5xx status into an error. The client is returned if so.
    pub fn error_for_status(self) -> reqwest::Result<Self> {
        let Self { response, client } = self;
        Ok(Self {
            response: response.error_for_status()?,
            client,
        })
    }

    /// Split into the raw response and the guard holding its client.
    ///
    /// Keep the guard alive until the body is no longer needed.
    pub fn into_parts(self) -> (Response, Pooled<reqwest::Client>) {
        (self.response, self.client)
    }
}

impl std::ops::Deref for PooledResponse {
    type Target = Response;

    fn deref(&self) -> &Response {
        &self.response
    }
}
