//! Recursive, order-preserving clone of a live subtree.
//!
//! Every visited node goes through the same steps:
//!
//! 1. the caller's node filter may drop it (with its whole subtree)
//! 2. matching `clone` modifiers may replace or exclude it
//! 3. its children are cloned one at a time, in document order
//! 4. unless a modifier produced it, the clone receives the source's computed
//!    style, `::before`/`::after` content, live form values and the SVG
//!    namespace declaration

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use std::cmp::Reverse;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::clone_tree::{CloneElement, CloneNode};
use crate::dom::{
    ComputedStyle, Namespace, NodeKind, NodeRef, PseudoElement, SourceNode, SVG_NAMESPACE,
};
use crate::modifier::{Modifier, ModifierOutcome, ModifierRegistry, Stage};

/// Attributes carried over to a default clone; everything else is dropped.
pub const ATTRIBUTE_ALLOW_LIST: [&str; 5] = ["src", "href", "id", "width", "height"];

/// Decides whether a node (and its subtree) takes part in the capture.
pub type NodeFilter = Arc<dyn Fn(&dyn SourceNode) -> bool + Send + Sync>;

static UID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Class name unique to this process: `u`, four random characters, then a
/// running index.
pub fn uid() -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    let index = UID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("u{}{}", &random[..4], index)
}

pub struct Cloner<'a> {
    registry: &'a ModifierRegistry,
    filter: Option<NodeFilter>,
    group: Option<&'a str>,
}

impl fmt::Debug for Cloner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cloner")
            .field("filter", &self.filter.is_some())
            .field("group", &self.group)
            .finish()
    }
}

impl<'a> Cloner<'a> {
    pub fn new(registry: &'a ModifierRegistry) -> Self {
        Self {
            registry,
            filter: None,
            group: None,
        }
    }

    pub fn with_filter(mut self, filter: Option<NodeFilter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_group(mut self, group: Option<&'a str>) -> Self {
        self.group = group;
        self
    }

    /// Clones `node` and its subtree. `None` when the node was filtered out,
    /// excluded by a modifier or is a comment.
    pub fn clone_subtree(&self, node: NodeRef) -> BoxFuture<'_, Option<CloneNode>> {
        async move {
            if let Some(filter) = &self.filter {
                if !filter(node.as_ref()) {
                    return None;
                }
            }

            let mut clone = self.clone_or_substitute(&node).await?;

            if let CloneNode::Element(element) = &mut clone {
                for child in node.children() {
                    if let Some(child_clone) = self.clone_subtree(child).await {
                        element.append_child(child_clone);
                    }
                }
            }

            if !clone.is_substituted() {
                if let CloneNode::Element(element) = &mut clone {
                    self.process_clone(node.as_ref(), element);
                }
            }
            Some(clone)
        }
        .boxed()
    }

    /// Runs every matching clone modifier concurrently. The highest-priority
    /// replacement or exclusion wins; with no such offer the node is cloned
    /// the default way. A failing modifier counts as offering nothing.
    async fn clone_or_substitute(&self, node: &NodeRef) -> Option<CloneNode> {
        let registrations = self.registry.resolve(Stage::Clone, node.as_ref(), self.group);
        if registrations.is_empty() {
            return default_clone(node.as_ref());
        }

        let pending = registrations.iter().filter_map(|reg| match &reg.modifier {
            Modifier::Clone(callback) => {
                let priority = reg.priority;
                Some(callback(node.clone()).map(move |outcome| (priority, outcome)))
            }
            _ => None,
        });

        let mut candidates: Vec<(i32, ModifierOutcome)> = join_all(pending)
            .await
            .into_iter()
            .filter_map(|(priority, outcome)| match outcome {
                Ok(ModifierOutcome::Keep) => None,
                Ok(offer) => Some((priority, offer)),
                Err(err) => {
                    debug!(node = node.local_name(), error = %err, "clone modifier failed");
                    None
                }
            })
            .collect();
        candidates.sort_by_key(|(priority, _)| Reverse(*priority));

        match candidates.into_iter().next() {
            Some((_, ModifierOutcome::Replace(mut replacement))) => {
                replacement.mark_substituted();
                Some(replacement)
            }
            Some((_, ModifierOutcome::Exclude)) => {
                debug!(node = node.local_name(), "node excluded by modifier");
                None
            }
            Some((_, ModifierOutcome::Keep)) | None => default_clone(node.as_ref()),
        }
    }

    fn process_clone(&self, source: &dyn SourceNode, clone: &mut CloneElement) {
        copy_style(source, clone);
        self.apply_style_modifiers(source, clone);
        for pseudo in PseudoElement::ALL {
            clone_pseudo_element(source, clone, pseudo);
        }
        copy_user_input(source, clone);
        if clone.namespace == Namespace::Svg {
            clone.set_attribute("xmlns", SVG_NAMESPACE);
        }
    }

    fn apply_style_modifiers(&self, source: &dyn SourceNode, clone: &mut CloneElement) {
        for reg in self.registry.resolve(Stage::Style, source, self.group) {
            if let Modifier::Style(callback) = &reg.modifier {
                if let Err(err) = callback(source, &mut clone.style) {
                    debug!(node = source.local_name(), error = %err, "style modifier failed");
                }
            }
        }
    }
}

/// Shallow copy keeping only allow-listed attributes. Comments clone to
/// nothing.
pub fn default_clone(node: &dyn SourceNode) -> Option<CloneNode> {
    match node.kind() {
        NodeKind::Comment => None,
        NodeKind::Text => Some(CloneNode::text(node.text().unwrap_or_default())),
        NodeKind::Element => {
            let mut element = CloneElement::new(node.local_name(), node.namespace());
            for (name, value) in node.attributes() {
                if ATTRIBUTE_ALLOW_LIST
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(&name))
                {
                    element.set_attribute(&name, value);
                }
            }
            Some(element.into())
        }
    }
}

fn copy_style(source: &dyn SourceNode, clone: &mut CloneElement) {
    let style = source.computed_style(None);
    match style.css_text() {
        Some(css_text) => clone.style.set_css_text(css_text),
        None => {
            for decl in style.iter() {
                clone
                    .style
                    .set_property(&decl.name, decl.value.clone(), decl.important);
            }
        }
    }

    if source.is_tag("body") {
        clone
            .style
            .set_property("height", format!("{}px", source.scroll_height()), false);
    }
}

fn clone_pseudo_element(source: &dyn SourceNode, clone: &mut CloneElement, pseudo: PseudoElement) {
    let style = source.computed_style(Some(pseudo));
    let content = style.get("content").unwrap_or_default();
    if content.is_empty() || content == "none" {
        return;
    }

    let class_name = uid();
    clone.add_class(&class_name);
    let rule = format!(
        ".{}:{}{{{}}}",
        class_name,
        pseudo.as_str(),
        format_pseudo_style(&style)
    );
    clone.append_child(CloneElement::html("style").with_child(CloneNode::text(rule)));
}

fn format_pseudo_style(style: &ComputedStyle) -> String {
    let content = style.get("content").unwrap_or_default();
    match style.css_text() {
        Some(css_text) => format!("{css_text} content: {content};"),
        None => {
            let properties: Vec<String> = style
                .iter()
                .map(|decl| {
                    let important = if decl.important { " !important" } else { "" };
                    format!("{}: {}{}", decl.name, decl.value, important)
                })
                .collect();
            format!("{};", properties.join("; "))
        }
    }
}

fn copy_user_input(source: &dyn SourceNode, clone: &mut CloneElement) {
    if source.is_tag("textarea") {
        clone.set_text_content(source.live_value().unwrap_or_default());
    } else if source.is_tag("input") {
        if let Some(value) = source.live_value() {
            clone.set_attribute("value", value);
        }
    }
}
