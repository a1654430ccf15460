//! A page captured to JSON, served through the [`Document`] / [`SourceNode`]
//! traits.
//!
//! The browser-side capture script records, for every node, what the engine
//! would otherwise ask the live page for: computed styles (including
//! `::before` / `::after`), scroll sizes and runtime form values. Style sheets
//! are recorded with their font-face rules, or with the access error the
//! browser raised.
//!
//! # Example
//!
//! ```
//! use domsnap::{Document, PageSnapshot, SourceNode};
//!
//! let page = PageSnapshot::from_json(r#"{
//!     "nodes": [
//!         {"id": "n0", "tag": "div", "attributes": {"id": "app"}, "children": ["n1"]},
//!         {"id": "n1", "kind": "text", "text": "Hello"}
//!     ]
//! }"#).unwrap();
//! let app = page.query_selector("#app").unwrap();
//! assert_eq!(app.children().len(), 1);
//! ```

mod raw;
mod selector;

pub use raw::{RawNode, RawPage, RawRule, RawStyle, RawStyleSheet};
pub use selector::SelectorList;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::dom::{
    ComputedStyle, Document, Namespace, NodeKind, NodeRef, PseudoElement, SheetAccessError,
    SourceNode, StyleSheet,
};
use crate::{Result, SnapshotError};

struct PageInner {
    raw: RawPage,
    index: HashMap<String, usize>,
    parents: Vec<Option<usize>>,
    root: Option<usize>,
}

#[derive(Clone)]
pub struct PageSnapshot {
    inner: Arc<PageInner>,
}

impl fmt::Debug for PageSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageSnapshot")
            .field("url", &self.inner.raw.url)
            .field("nodes", &self.inner.raw.nodes.len())
            .finish()
    }
}

impl PageSnapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawPage = serde_json::from_str(json)?;
        Self::new(raw)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Indexes the node list, rejecting dangling or shared child references.
    pub fn new(raw: RawPage) -> Result<Self> {
        let mut index = HashMap::with_capacity(raw.nodes.len());
        for (i, node) in raw.nodes.iter().enumerate() {
            if index.insert(node.id.clone(), i).is_some() {
                return Err(SnapshotError::Config(format!(
                    "Duplicate node id '{}' in snapshot",
                    node.id
                )));
            }
        }

        let mut parents = vec![None; raw.nodes.len()];
        for (i, node) in raw.nodes.iter().enumerate() {
            for child in &node.children {
                let Some(&child_index) = index.get(child) else {
                    return Err(SnapshotError::Config(format!(
                        "Node '{}' references unknown child '{}'",
                        node.id, child
                    )));
                };
                if child_index == i || parents[child_index].is_some() {
                    return Err(SnapshotError::Config(format!(
                        "Node '{}' has more than one parent",
                        child
                    )));
                }
                parents[child_index] = Some(i);
            }
        }

        if let Some(index) = find_cycle(&parents) {
            return Err(SnapshotError::Config(format!(
                "Node '{}' is part of a child reference cycle",
                raw.nodes[index].id
            )));
        }

        let root = match raw.root.as_deref() {
            Some(id) => Some(*index.get(id).ok_or_else(|| {
                SnapshotError::Config(format!("Root node '{id}' is not in the snapshot"))
            })?),
            None => (!raw.nodes.is_empty()).then_some(0),
        };

        Ok(Self {
            inner: Arc::new(PageInner {
                raw,
                index,
                parents,
                root,
            }),
        })
    }

    pub fn url(&self) -> Option<&str> {
        self.inner.raw.url.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.inner.raw.title.as_deref()
    }

    pub fn root(&self) -> Option<NodeRef> {
        self.inner.root.map(|index| self.handle(index))
    }

    pub fn node(&self, id: &str) -> Option<NodeRef> {
        self.inner.index.get(id).map(|&index| self.handle(index))
    }

    fn handle(&self, index: usize) -> NodeRef {
        Arc::new(SnapshotNode {
            page: self.inner.clone(),
            index,
        })
    }
}

impl Document for PageSnapshot {
    fn style_sheets(&self) -> Vec<StyleSheet> {
        self.inner
            .raw
            .style_sheets
            .iter()
            .map(|sheet| StyleSheet {
                href: sheet.href.clone(),
                rules: match &sheet.access_error {
                    Some(message) => Err(SheetAccessError(message.clone())),
                    None => Ok(sheet.rules.iter().map(Into::into).collect()),
                },
            })
            .collect()
    }

    fn document_element(&self) -> Option<NodeRef> {
        self.root()
    }

    fn query_selector(&self, selector: &str) -> Option<NodeRef> {
        let Some(list) = SelectorList::parse(selector) else {
            debug!(selector, "unsupported selector");
            return None;
        };
        let root = self.inner.root?;
        let mut stack = vec![root];
        while let Some(index) = stack.pop() {
            let node = SnapshotNode {
                page: self.inner.clone(),
                index,
            };
            if node.is_element() && list.matches(&node) {
                return Some(Arc::new(node));
            }
            let raw = node.raw();
            stack.extend(
                raw.children
                    .iter()
                    .rev()
                    .filter_map(|id| self.inner.index.get(id).copied()),
            );
        }
        None
    }
}

/// A node whose parent chain loops back on itself, if any. Each node has at
/// most one parent, so every chain either reaches a parentless node or cycles.
fn find_cycle(parents: &[Option<usize>]) -> Option<usize> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Unvisited,
        OnPath,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; parents.len()];
    for start in 0..parents.len() {
        let mut path = Vec::new();
        let mut current = Some(start);
        while let Some(index) = current {
            match marks[index] {
                Mark::Done => break,
                Mark::OnPath => return Some(index),
                Mark::Unvisited => {
                    marks[index] = Mark::OnPath;
                    path.push(index);
                    current = parents[index];
                }
            }
        }
        for index in path {
            marks[index] = Mark::Done;
        }
    }
    None
}

/// Handle to one node of a [`PageSnapshot`].
#[derive(Clone)]
pub struct SnapshotNode {
    page: Arc<PageInner>,
    index: usize,
}

impl SnapshotNode {
    fn raw(&self) -> &RawNode {
        &self.page.raw.nodes[self.index]
    }

    pub fn id(&self) -> &str {
        &self.raw().id
    }
}

impl fmt::Debug for SnapshotNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw = self.raw();
        f.debug_struct("SnapshotNode")
            .field("id", &raw.id)
            .field("kind", &raw.kind)
            .field("tag", &raw.tag)
            .finish()
    }
}

impl selector::Element for SnapshotNode {
    fn local_name(&self) -> &str {
        &self.raw().tag
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.raw()
            .attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn parent_element(&self) -> Option<Self> {
        let parent = self.page.parents[self.index]?;
        Some(SnapshotNode {
            page: self.page.clone(),
            index: parent,
        })
    }
}

impl SourceNode for SnapshotNode {
    fn kind(&self) -> NodeKind {
        self.raw().kind
    }

    fn local_name(&self) -> &str {
        match self.raw().kind {
            NodeKind::Element => &self.raw().tag,
            NodeKind::Text | NodeKind::Comment => "",
        }
    }

    fn namespace(&self) -> Namespace {
        self.raw().namespace
    }

    fn attributes(&self) -> Vec<(String, String)> {
        self.raw()
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn text(&self) -> Option<String> {
        self.raw().text.clone()
    }

    fn children(&self) -> Vec<NodeRef> {
        self.raw()
            .children
            .iter()
            .filter_map(|id| self.page.index.get(id))
            .map(|&index| -> NodeRef {
                Arc::new(SnapshotNode {
                    page: self.page.clone(),
                    index,
                })
            })
            .collect()
    }

    fn computed_style(&self, pseudo: Option<PseudoElement>) -> ComputedStyle {
        let raw = self.raw();
        let style = match pseudo {
            None => raw.computed_style.as_ref(),
            Some(pseudo) => raw.pseudo_styles.get(pseudo.as_str()),
        };
        style.map(RawStyle::to_computed).unwrap_or_default()
    }

    fn scroll_width(&self) -> u32 {
        self.raw().scroll_width
    }

    fn scroll_height(&self) -> u32 {
        self.raw().scroll_height
    }

    /// The recorded runtime value, else what the markup says.
    fn live_value(&self) -> Option<String> {
        let raw = self.raw();
        if raw.value.is_some() {
            return raw.value.clone();
        }
        if self.is_tag("input") {
            return selector::Element::attribute(self, "value").map(str::to_string);
        }
        if self.is_tag("textarea") {
            return Some(
                self.children()
                    .iter()
                    .filter_map(|child| child.text())
                    .collect(),
            );
        }
        None
    }

    fn matches_selector(&self, selector: &str) -> bool {
        self.is_element()
            && SelectorList::parse(selector).is_some_and(|list| list.matches(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"{
        "url": "https://example.com/",
        "root": "html",
        "nodes": [
            {"id": "html", "tag": "html", "children": ["body"]},
            {"id": "body", "tag": "body", "children": ["form", "c1"], "scrollHeight": 900},
            {"id": "form", "tag": "form", "attributes": {"id": "signup"}, "children": ["name", "bio"]},
            {"id": "name", "tag": "input", "attributes": {"type": "text", "value": "old"}},
            {"id": "bio", "tag": "textarea", "children": ["bio-text"]},
            {"id": "bio-text", "kind": "text", "text": "draft"},
            {"id": "c1", "kind": "comment", "text": "note"}
        ],
        "styleSheets": [
            {"href": "https://cdn.example.com/a.css", "accessError": "SecurityError"},
            {"href": "https://example.com/site.css", "rules": [{"type": "other", "cssText": "p{}"}]}
        ]
    }"#;

    #[test]
    fn query_selector_walks_document_order() {
        let page = PageSnapshot::from_json(PAGE).unwrap();
        let input = page.query_selector("#signup > input[type=text]").unwrap();
        assert_eq!(input.local_name(), "input");
        assert!(page.query_selector("video").is_none());
        assert!(page.query_selector("::nonsense(").is_none());
    }

    #[test]
    fn live_value_falls_back_to_markup() {
        let page = PageSnapshot::from_json(PAGE).unwrap();
        assert_eq!(page.node("name").unwrap().live_value().as_deref(), Some("old"));
        assert_eq!(page.node("bio").unwrap().live_value().as_deref(), Some("draft"));
        assert!(page.node("body").unwrap().live_value().is_none());
    }

    #[test]
    fn comments_have_no_local_name() {
        let page = PageSnapshot::from_json(PAGE).unwrap();
        let comment = page.node("c1").unwrap();
        assert_eq!(comment.kind(), NodeKind::Comment);
        assert_eq!(comment.local_name(), "");
        assert!(!comment.matches_selector("*"));
    }

    #[test]
    fn inaccessible_sheets_surface_as_errors() {
        let page = PageSnapshot::from_json(PAGE).unwrap();
        let sheets = page.style_sheets();
        assert!(sheets[0].rules.is_err());
        assert_eq!(sheets[1].rules.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn dangling_child_is_rejected() {
        let err = PageSnapshot::from_json(
            r#"{"nodes": [{"id": "a", "tag": "div", "children": ["missing"]}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown child"));
    }

    #[test]
    fn shared_child_is_rejected() {
        let err = PageSnapshot::from_json(
            r#"{"nodes": [
                {"id": "a", "tag": "div", "children": ["c"]},
                {"id": "b", "tag": "div", "children": ["c"]},
                {"id": "c", "tag": "span"}
            ]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than one parent"));
    }

    #[test]
    fn child_cycle_is_rejected() {
        let err = PageSnapshot::from_json(
            r#"{"nodes": [
                {"id": "a", "tag": "div", "children": ["b"]},
                {"id": "b", "tag": "div", "children": ["a"]}
            ]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SnapshotError::Config(_)));
        assert!(err.to_string().contains("cycle"), "got: {err}");
    }

    #[test]
    fn longer_cycle_below_root_is_rejected() {
        let err = PageSnapshot::from_json(
            r#"{"root": "r", "nodes": [
                {"id": "r", "tag": "div", "children": ["a"]},
                {"id": "a", "tag": "div", "children": ["b"]},
                {"id": "b", "tag": "div", "children": ["c"]},
                {"id": "c", "tag": "div"},
                {"id": "x", "tag": "div", "children": ["y"]},
                {"id": "y", "tag": "div", "children": ["z"]},
                {"id": "z", "tag": "div", "children": ["x"]}
            ]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("cycle"), "got: {err}");
    }

    #[test]
    fn acyclic_forest_is_accepted() {
        let page = PageSnapshot::from_json(
            r#"{"nodes": [
                {"id": "a", "tag": "div", "children": ["b"]},
                {"id": "b", "tag": "div"},
                {"id": "loose", "tag": "span"}
            ]}"#,
        )
        .unwrap();
        assert!(page.query_selector("video").is_none());
    }

    #[test]
    fn attributes_and_properties_keep_document_order() {
        let page = PageSnapshot::from_json(
            r#"{"nodes": [{
                "id": "a",
                "tag": "div",
                "attributes": {"z-last": "1", "class": "card", "aria-label": "x"},
                "computedStyle": {"properties": {"width": "10px", "color": "red", "align-items": "center"}}
            }]}"#,
        )
        .unwrap();
        let node = page.node("a").unwrap();
        let names: Vec<String> = node.attributes().into_iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["z-last", "class", "aria-label"]);

        let style = node.computed_style(None);
        let props: Vec<&str> = style.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(props, ["width", "color", "align-items"]);
    }
}
