//! Rewrites `url(...)` references inside CSS text to embedded `data:` URLs.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::resource::{data_url, is_data_url, mime_type, resolve_url, Fetch};
use crate::{Result, SnapshotError};

static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"url\(['"]?([^'"]+?)['"]?\)"#).expect("valid url regex")
});

/// True when `css_text` holds at least one `url(...)` reference.
pub fn should_process(css_text: &str) -> bool {
    URL_REGEX.is_match(css_text)
}

/// Distinct non-`data:` URLs referenced by `css_text`, in order of first
/// appearance.
pub fn read_urls(css_text: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for caps in URL_REGEX.captures_iter(css_text) {
        let url = &caps[1];
        if is_data_url(url) || urls.iter().any(|seen| seen == url) {
            continue;
        }
        urls.push(url.to_string());
    }
    urls
}

/// Replaces every `url(...)` in `css_text` with the fetched resource as a
/// `data:` URL. Relative references are resolved against `base` when given.
/// URLs are processed one after another, each rewrite applied to the text the
/// previous one produced. The first fetch failure aborts the whole blob.
pub async fn inline_all(css_text: &str, base: Option<&str>, fetch: &dyn Fetch) -> Result<String> {
    if !should_process(css_text) {
        return Ok(css_text.to_string());
    }

    let mut text = css_text.to_string();
    for url in read_urls(css_text) {
        text = inline(&text, &url, base, fetch).await?;
    }
    Ok(text)
}

async fn inline(css_text: &str, url: &str, base: Option<&str>, fetch: &dyn Fetch) -> Result<String> {
    let resolved = match base {
        Some(base) => resolve_url(url, base),
        None => url.to_string(),
    };
    let payload = fetch.fetch(&resolved).await?;
    let embedded = data_url(&payload, mime_type(url));
    debug!(url, resolved = %resolved, "inlined css url");
    let pattern = format!(r#"url\(['"]?{}['"]?\)"#, regex::escape(url));
    let Ok(re) = Regex::new(&pattern) else {
        return Err(SnapshotError::Serialize(format!("cannot build url pattern for {url}")));
    };
    let replacement = format!("url({embedded})");
    Ok(re
        .replace_all(css_text, regex::NoExpand(&replacement))
        .into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::FetchFn;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_fetch(
        calls: Arc<AtomicUsize>,
    ) -> FetchFn<impl Fn(&str) -> futures::future::BoxFuture<'static, Result<String>> + Send + Sync>
    {
        FetchFn(move |url: &str| {
            calls.fetch_add(1, Ordering::SeqCst);
            let url = url.to_string();
            async move {
                match url.as_str() {
                    "http://x/a.png" => Ok("P".to_string()),
                    "http://x/fonts/b.woff" => Ok("Rk9OVA==".to_string()),
                    _ => Err(SnapshotError::fetch_failed(url, 404)),
                }
            }
            .boxed()
        })
    }

    #[test]
    fn reads_distinct_remote_urls() {
        let css = r#"a{background:url("http://x/a.png")} b{background:url(http://x/a.png)} c{src:url(data:font/woff;base64,AA)} d{src:url('b.woff')}"#;
        assert_eq!(read_urls(css), vec!["http://x/a.png", "b.woff"]);
        assert!(!should_process("color: red"));
    }

    #[tokio::test]
    async fn inlines_quoted_url_with_mime_from_extension() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = counting_fetch(calls.clone());
        let css = "background: url('http://x/a.png') no-repeat";

        let out = inline_all(css, None, &fetch).await.unwrap();
        assert_eq!(out, "background: url(data:image/png;base64,P) no-repeat");
        assert!(!out.contains("http://x/a.png"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn css_without_urls_is_returned_untouched() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = counting_fetch(calls.clone());
        assert_eq!(inline_all("color: red", None, &fetch).await.unwrap(), "color: red");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn relative_urls_resolve_against_base() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = counting_fetch(calls);
        let css = "@font-face{font-family:B;src:url(b.woff) format('woff')}";
        let out = inline_all(css, Some("http://x/fonts/site.css"), &fetch)
            .await
            .unwrap();
        assert_eq!(
            out,
            "@font-face{font-family:B;src:url(data:application/font-woff;base64,Rk9OVA==) format('woff')}"
        );
    }

    #[tokio::test]
    async fn repeated_reference_is_fetched_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = counting_fetch(calls.clone());
        let css = "a{background:url(http://x/a.png)} b{background:url(\"http://x/a.png\")}";
        let out = inline_all(css, None, &fetch).await.unwrap();
        assert_eq!(out.matches("data:image/png;base64,P").count(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_fetch_aborts_the_blob() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = counting_fetch(calls);
        let err = inline_all("background: url(http://x/missing.png)", None, &fetch)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing.png"));
    }
}
