//! Fetching remote resources as embeddable base64 payloads.
//!
//! - [`Transport`] - raw `GET` (the network collaborator)
//! - [`ResourceFetcher`] - transport + timeout + error handler fallbacks
//! - [`Fetch`] - the seam the inliners fetch through
//! - [`mime`] / [`data_url`] - turning payloads into `data:` URLs

pub mod data_url;
pub mod http;
pub mod mime;

pub use data_url::{data_url, decode_data_url, is_data_url, DataUrl};
pub use http::HttpTransport;
pub use mime::{mime_type, parse_extension};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error_handler::{ErrorHandler, ErrorHandlerChain, FailureDescriptor};
use crate::{Result, SnapshotError};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Response arrived with a status other than 200.
    Status(u16),
    Network(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Status(code) => write!(f, "{code}"),
            TransportError::Network(message) => f.write_str(message),
        }
    }
}

pub trait Transport: Send + Sync {
    fn get<'a>(&'a self, url: &'a str)
        -> BoxFuture<'a, std::result::Result<Vec<u8>, TransportError>>;
}

/// Fetches a URL and resolves to its body as a base64 payload.
pub trait Fetch: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String>>;
}

/// Adapts a closure into a [`Fetch`].
pub struct FetchFn<F>(pub F);

impl<F> Fetch for FetchFn<F>
where
    F: Fn(&str) -> BoxFuture<'static, Result<String>> + Send + Sync,
{
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String>> {
        (self.0)(url)
    }
}

#[derive(Clone)]
pub struct ResourceFetcher {
    transport: Arc<dyn Transport>,
    timeout: Duration,
    handlers: Arc<ErrorHandlerChain>,
}

impl fmt::Debug for ResourceFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceFetcher")
            .field("timeout", &self.timeout)
            .field("handlers", &self.handlers)
            .finish()
    }
}

impl ResourceFetcher {
    pub fn new(transport: Arc<dyn Transport>, handlers: Arc<ErrorHandlerChain>) -> Self {
        Self {
            transport,
            timeout: DEFAULT_FETCH_TIMEOUT,
            handlers,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetches `url`, consulting the error handler chain (then `extra`) when
    /// the transport fails. Timeouts bypass the handlers.
    pub async fn fetch_with(&self, url: &str, extra: &[ErrorHandler]) -> Result<String> {
        let outcome = match tokio::time::timeout(self.timeout, self.transport.get(url)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                return Err(SnapshotError::FetchTimeout {
                    url: url.to_string(),
                    timeout: self.timeout,
                })
            }
        };

        match outcome {
            Ok(body) => {
                debug!(url, bytes = body.len(), "fetched resource");
                Ok(STANDARD.encode(body))
            }
            Err(err) => {
                let failure = FailureDescriptor::network(url);
                match self.handlers.recover_with(&failure, extra).await {
                    Some(payload) => Ok(payload),
                    None => Err(SnapshotError::fetch_failed(url, err)),
                }
            }
        }
    }
}

impl Fetch for ResourceFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String>> {
        self.fetch_with(url, &[]).boxed()
    }
}

/// Resolves `url` against `base`. Unparsable inputs leave `url` untouched.
pub fn resolve_url(url: &str, base: &str) -> String {
    Url::parse(base)
        .and_then(|base| base.join(url))
        .map(|resolved| resolved.to_string())
        .unwrap_or_else(|_| url.to_string())
}
