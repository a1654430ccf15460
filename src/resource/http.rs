//! `reqwest`-backed [`Transport`].

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::StatusCode;

use super::{Transport, TransportError};
use crate::Result;

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds a client without its own timeout; the fetcher enforces one.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("domsnap/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, std::result::Result<Vec<u8>, TransportError>> {
        async move {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| TransportError::Network(e.to_string()))?;

            let status = response.status();
            if status != StatusCode::OK {
                return Err(TransportError::Status(status.as_u16()));
            }

            let body = response
                .bytes()
                .await
                .map_err(|e| TransportError::Network(e.to_string()))?;
            Ok(body.to_vec())
        }
        .boxed()
    }
}
