//! Read-only view of the live document the snapshot is taken from.
//!
//! The capture engine never lays out or styles anything itself. Everything it
//! knows about the page comes through these traits: node structure, computed
//! styles, scroll sizes, live form values and the document's style sheets.
//!
//! - [`SourceNode`] / [`NodeRef`] - a node of the live tree
//! - [`Document`] - style sheets and root lookup
//! - [`style`] - computed and inline style declarations

pub mod style;

pub use style::{parse_declarations, ComputedStyle, InlineStyle, StyleDeclaration};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Element,
    Text,
    Comment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    #[default]
    Html,
    Svg,
    Other,
}

/// Pseudo-elements whose generated content is reproduced on the clone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PseudoElement {
    Before,
    After,
}

impl PseudoElement {
    pub const ALL: [PseudoElement; 2] = [PseudoElement::Before, PseudoElement::After];

    pub fn as_str(self) -> &'static str {
        match self {
            PseudoElement::Before => "before",
            PseudoElement::After => "after",
        }
    }
}

impl fmt::Display for PseudoElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node of the live document. Implementations only read; the capture never
/// mutates the source tree.
pub trait SourceNode: Send + Sync + fmt::Debug {
    fn kind(&self) -> NodeKind;

    /// Lowercase local name for elements, empty for other node kinds.
    fn local_name(&self) -> &str;

    fn namespace(&self) -> Namespace;

    /// Attributes in document order.
    fn attributes(&self) -> Vec<(String, String)>;

    /// Character data of text and comment nodes.
    fn text(&self) -> Option<String>;

    fn children(&self) -> Vec<NodeRef>;

    fn computed_style(&self, pseudo: Option<PseudoElement>) -> ComputedStyle;

    fn scroll_width(&self) -> u32;

    fn scroll_height(&self) -> u32;

    /// Current runtime value of a form control, which may differ from its
    /// `value` attribute once the user has typed into it.
    fn live_value(&self) -> Option<String>;

    fn matches_selector(&self, selector: &str) -> bool;

    fn is_element(&self) -> bool {
        self.kind() == NodeKind::Element
    }

    /// Case-insensitive tag test on elements.
    fn is_tag(&self, name: &str) -> bool {
        self.is_element() && self.local_name().eq_ignore_ascii_case(name)
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes()
            .into_iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }
}

pub type NodeRef = Arc<dyn SourceNode>;

/// Raised by a style sheet whose rules cannot be read (cross-origin sheets).
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct SheetAccessError(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CssRule {
    FontFace { css_text: String, src: String },
    Other { css_text: String },
}

#[derive(Debug, Clone)]
pub struct StyleSheet {
    pub href: Option<String>,
    pub rules: Result<Vec<CssRule>, SheetAccessError>,
}

pub trait Document: Send + Sync {
    fn style_sheets(&self) -> Vec<StyleSheet>;

    fn document_element(&self) -> Option<NodeRef>;

    fn query_selector(&self, selector: &str) -> Option<NodeRef>;
}
