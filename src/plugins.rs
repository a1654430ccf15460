//! Ready-made clone modifiers.

use crate::clone_tree::{CloneElement, CloneNode};
use crate::dom::{NodeKind, NodeRef, SourceNode};
use crate::layout;
use crate::modifier::{Modifier, ModifierFilter, ModifierOutcome};

pub const CLEANER_PRIORITY: i32 = 100;
pub const IFRAME_PLACEHOLDER_PRIORITY: i32 = 1;

/// Elements that never contribute to a static picture.
const NON_VISUAL_TAGS: [&str; 9] = [
    "script", "style", "link", "noscript", "audio", "base", "meta", "noframes", "object",
];

/// A modifier registration: callback, filter and priority.
pub type Plugin = (Modifier, ModifierFilter, i32);

/// Drops comments, hidden and non-visual elements. Images without a usable
/// `src` become black blocks and `fb:*` widgets empty boxes of the same size.
pub fn cleaner() -> Plugin {
    (
        Modifier::on_clone(|node: NodeRef| async move { Ok(clean(node.as_ref())) }),
        ModifierFilter::Any,
        CLEANER_PRIORITY,
    )
}

fn clean(node: &dyn SourceNode) -> ModifierOutcome {
    match node.kind() {
        NodeKind::Comment => return ModifierOutcome::Exclude,
        NodeKind::Text => return ModifierOutcome::Keep,
        NodeKind::Element => {}
    }

    let style = node.computed_style(None);
    if style.get("display") == Some("none") {
        return ModifierOutcome::Exclude;
    }

    let tag = node.local_name().to_ascii_lowercase();
    if NON_VISUAL_TAGS.contains(&tag.as_str()) {
        return ModifierOutcome::Exclude;
    }

    if tag == "img" && node.attribute("src").unwrap_or_default().len() < 5 {
        return ModifierOutcome::Replace(
            sized_box(node)
                .with_style_property("background", "#000")
                .with_style_property("display", "inline-block")
                .into(),
        );
    }

    if tag.starts_with("fb:") {
        let display = style.get("display").unwrap_or("inline").to_string();
        return ModifierOutcome::Replace(
            sized_box(node)
                .with_style_property("display", &display)
                .into(),
        );
    }

    ModifierOutcome::Keep
}

/// Replaces `iframe` elements with a labelled grey box of the same size.
pub fn iframe_placeholder() -> Plugin {
    (
        Modifier::on_clone(|node: NodeRef| async move {
            if !node.is_tag("iframe") {
                return Ok(ModifierOutcome::Keep);
            }
            let placeholder = sized_box(node.as_ref())
                .with_style_property("background", "#e0e0e0")
                .with_style_property("border", "1px dashed red")
                .with_child(CloneNode::text("this is an iframe"));
            Ok(ModifierOutcome::Replace(placeholder.into()))
        }),
        ModifierFilter::selector("iframe"),
        IFRAME_PLACEHOLDER_PRIORITY,
    )
}

fn sized_box(node: &dyn SourceNode) -> CloneElement {
    CloneElement::html("div")
        .with_style_property("width", &format!("{}px", layout::node_width(node, false)))
        .with_style_property("height", &format!("{}px", layout::node_height(node, false)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloner::Cloner;
    use crate::modifier::ModifierRegistry;
    use crate::snapshot::PageSnapshot;

    fn page() -> PageSnapshot {
        PageSnapshot::from_json(
            r#"{"nodes": [
                {"id": "root", "tag": "div", "children": ["c", "s", "hidden", "img", "frame", "p"]},
                {"id": "c", "kind": "comment", "text": "x"},
                {"id": "s", "tag": "script"},
                {"id": "hidden", "tag": "div", "computedStyle": {"properties": {"display": "none"}}},
                {"id": "img", "tag": "img", "attributes": {"src": "a"}, "scrollWidth": 16, "scrollHeight": 9},
                {"id": "frame", "tag": "iframe", "scrollWidth": 300, "scrollHeight": 150,
                 "computedStyle": {"properties": {"border-left-width": "2px", "border-right-width": "2px"}}},
                {"id": "p", "tag": "p", "children": ["t"]},
                {"id": "t", "kind": "text", "text": "kept"}
            ]}"#,
        )
        .unwrap()
    }

    fn registry() -> ModifierRegistry {
        let registry = ModifierRegistry::new();
        for (modifier, filter, priority) in [cleaner(), iframe_placeholder()] {
            registry.register(modifier, filter, priority, None);
        }
        registry
    }

    #[tokio::test]
    async fn cleaner_and_iframe_placeholder_rewrite_the_tree() {
        let page = page();
        let registry = registry();
        let clone = Cloner::new(&registry)
            .clone_subtree(page.root().unwrap())
            .await
            .unwrap();
        let children = &clone.as_element().unwrap().children;
        assert_eq!(children.len(), 3);

        let black = children[0].as_element().unwrap();
        assert!(black.is_substituted());
        assert_eq!(black.style.get_property_value("width"), Some("16px"));
        assert_eq!(black.style.get_property_value("background"), Some("#000"));

        let frame = children[1].as_element().unwrap();
        assert_eq!(frame.style.get_property_value("width"), Some("304px"));
        assert_eq!(frame.style.get_property_value("border"), Some("1px dashed red"));
        assert_eq!(frame.text_content(), "this is an iframe");

        assert_eq!(children[2].text_content(), "kept");
    }

    #[test]
    fn cleaner_keeps_text_and_ordinary_elements() {
        let page = page();
        assert_eq!(clean(page.node("t").unwrap().as_ref()), ModifierOutcome::Keep);
        assert_eq!(clean(page.node("p").unwrap().as_ref()), ModifierOutcome::Keep);
        assert_eq!(clean(page.node("s").unwrap().as_ref()), ModifierOutcome::Exclude);
    }
}
