//! Ordered fallbacks consulted when a fetch or an image decode fails.

use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::modifier::ModifierError;

/// What failed, handed to every error handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FailureDescriptor {
    Network { url: String },
    #[serde(rename = "svg2img")]
    Svg2Img { uri: String },
}

impl FailureDescriptor {
    pub fn network(url: impl Into<String>) -> Self {
        FailureDescriptor::Network { url: url.into() }
    }

    pub fn svg2img(uri: impl Into<String>) -> Self {
        FailureDescriptor::Svg2Img { uri: uri.into() }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FailureDescriptor::Network { .. } => "network",
            FailureDescriptor::Svg2Img { .. } => "svg2img",
        }
    }
}

pub type HandlerFuture = BoxFuture<'static, Result<Option<String>, ModifierError>>;

/// Returns a substitute payload (base64 body) or declines with `Ok(None)`.
/// An `Err` counts as declining.
pub type ErrorHandler = Arc<dyn Fn(FailureDescriptor) -> HandlerFuture + Send + Sync>;

/// Append-only list of error handlers shared by every capture of a
/// [`Snapshotter`](crate::Snapshotter).
#[derive(Default)]
pub struct ErrorHandlerChain {
    handlers: RwLock<Vec<ErrorHandler>>,
}

impl fmt::Debug for ErrorHandlerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHandlerChain")
            .field("handlers", &self.len())
            .finish()
    }
}

impl ErrorHandlerChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handler: ErrorHandler) {
        self.handlers.write().push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    /// Tries every handler in registration order; the first non-empty payload wins.
    pub async fn recover(&self, failure: &FailureDescriptor) -> Option<String> {
        self.recover_with(failure, &[]).await
    }

    /// Like [`recover`](Self::recover), then falls through to `extra`
    /// (group-scoped handlers of the running capture).
    pub async fn recover_with(
        &self,
        failure: &FailureDescriptor,
        extra: &[ErrorHandler],
    ) -> Option<String> {
        let handlers: Vec<ErrorHandler> = self
            .handlers
            .read()
            .iter()
            .chain(extra.iter())
            .cloned()
            .collect();

        for (index, handler) in handlers.iter().enumerate() {
            match handler(failure.clone()).await {
                Ok(Some(payload)) if !payload.is_empty() => {
                    debug!(kind = failure.kind(), handler = index, "error handler supplied a fallback");
                    return Some(payload);
                }
                Ok(_) => {}
                Err(err) => {
                    debug!(kind = failure.kind(), handler = index, error = %err, "error handler failed");
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn handler(result: Result<Option<&'static str>, &'static str>) -> ErrorHandler {
        Arc::new(move |_failure| {
            let result = result
                .map(|p| p.map(str::to_string))
                .map_err(ModifierError::new);
            async move { result }.boxed()
        })
    }

    #[tokio::test]
    async fn first_payload_in_registration_order_wins() {
        let chain = ErrorHandlerChain::new();
        chain.register(handler(Ok(None)));
        chain.register(handler(Err("boom")));
        chain.register(handler(Ok(Some("first"))));
        chain.register(handler(Ok(Some("second"))));

        let payload = chain.recover(&FailureDescriptor::network("http://x/a.png")).await;
        assert_eq!(payload.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn empty_payload_counts_as_declining() {
        let chain = ErrorHandlerChain::new();
        chain.register(handler(Ok(Some(""))));
        assert!(chain
            .recover(&FailureDescriptor::svg2img("data:image/svg+xml,"))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn extra_handlers_run_after_registered_ones() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let chain = ErrorHandlerChain::new();
        chain.register(Arc::new(move |_f| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(None) }.boxed()
        }));

        let extra = vec![handler(Ok(Some("scoped")))];
        let payload = chain
            .recover_with(&FailureDescriptor::network("http://x/f.woff"), &extra)
            .await;
        assert_eq!(payload.as_deref(), Some("scoped"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn descriptor_serializes_with_type_tag() {
        let json = serde_json::to_value(FailureDescriptor::svg2img("data:x")).unwrap();
        assert_eq!(json["type"], "svg2img");
        assert_eq!(json["uri"], "data:x");
        let json = serde_json::to_value(FailureDescriptor::network("http://x")).unwrap();
        assert_eq!(json["type"], "network");
    }
}
