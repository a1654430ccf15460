//! JSON schema of a captured page, as written by the browser-side capture
//! script.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::dom::{ComputedStyle, CssRule, Namespace, NodeKind, StyleDeclaration};

/// A captured page: a flat node list plus the page's style sheets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPage {
    /// The URL of the captured page
    pub url: Option<String>,
    pub title: Option<String>,
    /// ID of the document element; defaults to the first node
    pub root: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<RawNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub style_sheets: Vec<RawStyleSheet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNode {
    pub id: String,
    #[serde(default = "default_kind")]
    pub kind: NodeKind,
    /// Tag name for elements (e.g., "div", "svg", "input")
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub namespace: Namespace,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, String>,
    /// Character data for text and comment nodes
    pub text: Option<String>,
    /// IDs of child nodes, in document order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub computed_style: Option<RawStyle>,
    /// Computed styles of `before` / `after` pseudo-elements
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub pseudo_styles: IndexMap<String, RawStyle>,
    #[serde(default)]
    pub scroll_width: u32,
    #[serde(default)]
    pub scroll_height: u32,
    /// Runtime value of form controls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

fn default_kind() -> NodeKind {
    NodeKind::Element
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub css_text: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, String>,
    /// Property names declared with `!important`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub important: Vec<String>,
}

impl RawStyle {
    pub fn to_computed(&self) -> ComputedStyle {
        if let Some(text) = self.css_text.as_deref().filter(|t| !t.trim().is_empty()) {
            return ComputedStyle::from_css_text(text);
        }
        ComputedStyle::from_declarations(
            self.properties
                .iter()
                .map(|(name, value)| {
                    let important = self.important.iter().any(|i| i.eq_ignore_ascii_case(name));
                    StyleDeclaration::new(name.clone(), value.clone(), important)
                })
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStyleSheet {
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RawRule>,
    /// Set when the browser refused access to the rules (cross-origin sheet)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RawRule {
    #[serde(rename_all = "camelCase")]
    FontFace { css_text: String, src: String },
    #[serde(rename_all = "camelCase")]
    Other { css_text: String },
}

impl From<&RawRule> for CssRule {
    fn from(rule: &RawRule) -> Self {
        match rule {
            RawRule::FontFace { css_text, src } => CssRule::FontFace {
                css_text: css_text.clone(),
                src: src.clone(),
            },
            RawRule::Other { css_text } => CssRule::Other {
                css_text: css_text.clone(),
            },
        }
    }
}
