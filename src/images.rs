//! Embeds the images and background images of a clone tree.

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use tracing::warn;

use crate::clone_tree::{CloneElement, CloneNode};
use crate::dom::Namespace;
use crate::inliner;
use crate::resource::{data_url, is_data_url, mime_type, Fetch};
use crate::Result;

/// Inline style properties whose `url(...)` references are embedded.
const BACKGROUND_PROPERTIES: [&str; 2] = ["background", "background-image"];

/// Walks `node`, embedding `<img src>` and background URLs as `data:` URLs.
///
/// Elements are isolated from each other: unless `strict` is set, a
/// resource that cannot be fetched is logged and the element keeps its
/// original reference.
pub fn inline_all<'a>(
    node: &'a mut CloneNode,
    fetch: &'a dyn Fetch,
    strict: bool,
) -> BoxFuture<'a, Result<()>> {
    async move {
        let CloneNode::Element(element) = node else {
            return Ok(());
        };

        isolate(inline_background(element, fetch).await, strict, &element.name)?;

        if is_image(element) {
            isolate(inline_image(element, fetch).await, strict, &element.name)?;
            return Ok(());
        }

        let results = join_all(
            element
                .children
                .iter_mut()
                .map(|child| inline_all(child, fetch, strict)),
        )
        .await;
        results.into_iter().collect()
    }
    .boxed()
}

fn is_image(element: &CloneElement) -> bool {
    element.namespace == Namespace::Html && element.name.eq_ignore_ascii_case("img")
}

fn isolate(outcome: Result<()>, strict: bool, element: &str) -> Result<()> {
    match outcome {
        Err(err) if !strict => {
            warn!(element, error = %err, "failed to inline resource");
            Ok(())
        }
        other => other,
    }
}

async fn inline_background(element: &mut CloneElement, fetch: &dyn Fetch) -> Result<()> {
    for property in BACKGROUND_PROPERTIES {
        let Some(value) = element.style.get_property_value(property) else {
            continue;
        };
        if value.is_empty() || !inliner::should_process(value) {
            continue;
        }
        let value = value.to_string();
        let important = element.style.get_property_priority(property);
        let inlined = inliner::inline_all(&value, None, fetch).await?;
        element.style.set_property(property, inlined, important);
    }
    Ok(())
}

async fn inline_image(element: &mut CloneElement, fetch: &dyn Fetch) -> Result<()> {
    let Some(src) = element.attribute("src").map(str::to_string) else {
        return Ok(());
    };
    if src.is_empty() || is_data_url(&src) {
        return Ok(());
    }
    let payload = fetch.fetch(&src).await?;
    element.set_attribute("src", data_url(&payload, mime_type(&src)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::FetchFn;
    use crate::SnapshotError;

    fn fetch() -> FetchFn<impl Fn(&str) -> BoxFuture<'static, Result<String>> + Send + Sync> {
        FetchFn(|url: &str| {
            let url = url.to_string();
            async move {
                match url.as_str() {
                    "http://x/a.png" => Ok("UE5H".to_string()),
                    "http://x/bg.jpg" => Ok("SlBH".to_string()),
                    _ => Err(SnapshotError::fetch_failed(url, 404)),
                }
            }
            .boxed()
        })
    }

    fn tree() -> CloneNode {
        CloneElement::html("div")
            .with_style("background: url(\"http://x/bg.jpg\") no-repeat !important; color: red")
            .with_child(
                CloneElement::html("p")
                    .with_child(CloneElement::html("img").with_attribute("src", "http://x/a.png"))
                    .with_child(CloneNode::text("caption")),
            )
            .with_child(CloneElement::html("img").with_attribute("src", "http://x/gone.png"))
            .into()
    }

    #[tokio::test]
    async fn embeds_images_and_backgrounds() {
        let mut root = tree();
        inline_all(&mut root, &fetch(), false).await.unwrap();

        let div = root.as_element().unwrap();
        assert_eq!(
            div.style.get_property_value("background"),
            Some("url(data:image/jpeg;base64,SlBH) no-repeat")
        );
        assert!(div.style.get_property_priority("background"));

        let img = div.children[0].as_element().unwrap().children[0]
            .as_element()
            .unwrap();
        assert_eq!(img.attribute("src"), Some("data:image/png;base64,UE5H"));
    }

    #[tokio::test]
    async fn failed_image_is_isolated_unless_strict() {
        let mut root = tree();
        inline_all(&mut root, &fetch(), false).await.unwrap();
        let broken = root.as_element().unwrap().children[1].as_element().unwrap();
        assert_eq!(broken.attribute("src"), Some("http://x/gone.png"));

        let mut root = tree();
        let err = inline_all(&mut root, &fetch(), true).await.unwrap_err();
        assert!(err.to_string().contains("gone.png"));
    }
}
