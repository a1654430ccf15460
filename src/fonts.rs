//! Collects the document's web fonts as one block of self-contained
//! `@font-face` rules.

use futures::future::join_all;
use tracing::{debug, warn};

use crate::dom::{CssRule, Document};
use crate::inliner;
use crate::resource::Fetch;
use crate::Result;

/// A `@font-face` rule whose `src` points at a remote resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebFont {
    pub css_text: String,
    pub src: String,
    /// URL of the owning style sheet, used to resolve relative references.
    pub base: Option<String>,
}

impl WebFont {
    pub async fn resolve(&self, fetch: &dyn Fetch) -> Result<String> {
        inliner::inline_all(&self.css_text, self.base.as_deref(), fetch).await
    }
}

/// Font-face rules of every readable style sheet that still reference
/// remote resources. Sheets that refuse access are skipped.
pub fn read_all(document: &dyn Document) -> Vec<WebFont> {
    let mut fonts = Vec::new();
    for sheet in document.style_sheets() {
        let rules = match sheet.rules {
            Ok(rules) => rules,
            Err(err) => {
                warn!(
                    href = sheet.href.as_deref().unwrap_or("<inline>"),
                    error = %err,
                    "Error while reading CSS rules"
                );
                continue;
            }
        };
        for rule in rules {
            if let CssRule::FontFace { css_text, src } = rule {
                if inliner::read_urls(&src).is_empty() {
                    continue;
                }
                fonts.push(WebFont {
                    css_text,
                    src,
                    base: sheet.href.clone(),
                });
            }
        }
    }
    fonts
}

/// Inlines every web font and joins the rules with newlines.
///
/// With `strict` unset a font that cannot be fetched is logged and left out;
/// otherwise its error is returned.
pub async fn resolve_all(document: &dyn Document, fetch: &dyn Fetch, strict: bool) -> Result<String> {
    let fonts = read_all(document);
    debug!(count = fonts.len(), "resolving web fonts");

    let resolved = join_all(fonts.iter().map(|font| font.resolve(fetch))).await;

    let mut css = Vec::with_capacity(resolved.len());
    for (font, outcome) in fonts.iter().zip(resolved) {
        match outcome {
            Ok(text) => css.push(text),
            Err(err) if strict => return Err(err),
            Err(err) => warn!(src = %font.src, error = %err, "skipping web font"),
        }
    }
    Ok(css.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::FetchFn;
    use crate::snapshot::PageSnapshot;
    use crate::SnapshotError;
    use futures::FutureExt;

    fn fetch() -> FetchFn<impl Fn(&str) -> futures::future::BoxFuture<'static, Result<String>> + Send + Sync> {
        FetchFn(|url: &str| {
            let url = url.to_string();
            async move {
                if url == "http://x/fonts/a.woff2" {
                    Ok("QQ==".to_string())
                } else {
                    Err(SnapshotError::fetch_failed(url, 404))
                }
            }
            .boxed()
        })
    }

    fn page() -> PageSnapshot {
        PageSnapshot::from_json(
            r#"{
                "nodes": [{"id": "html", "tag": "html"}],
                "styleSheets": [
                    {"href": "http://cdn.other/site.css", "accessError": "SecurityError: cssRules"},
                    {"href": "http://x/fonts/site.css", "rules": [
                        {"type": "font-face", "cssText": "@font-face { font-family: A; src: url(\"a.woff2\"); }", "src": "url(\"a.woff2\")"},
                        {"type": "font-face", "cssText": "@font-face { font-family: L; src: local(Arial); }", "src": "local(Arial)"},
                        {"type": "other", "cssText": "body { color: red; }"}
                    ]},
                    {"href": null, "rules": [
                        {"type": "font-face", "cssText": "@font-face { font-family: M; src: url(http://x/missing.woff); }", "src": "url(http://x/missing.woff)"}
                    ]}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn reads_remote_font_faces_from_accessible_sheets() {
        let fonts = read_all(&page());
        let families: Vec<&str> = fonts.iter().map(|f| f.css_text.as_str()).collect();
        assert_eq!(fonts.len(), 2, "{families:?}");
        assert_eq!(fonts[0].base.as_deref(), Some("http://x/fonts/site.css"));
        assert!(fonts[1].base.is_none());
    }

    #[tokio::test]
    async fn unreachable_font_is_skipped_unless_strict() {
        let css = resolve_all(&page(), &fetch(), false).await.unwrap();
        assert_eq!(
            css,
            "@font-face { font-family: A; src: url(data:application/font-woff;base64,QQ==); }"
        );

        let err = resolve_all(&page(), &fetch(), true).await.unwrap_err();
        assert!(err.to_string().contains("missing.woff"));
    }
}
