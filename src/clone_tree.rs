//! The detached clone tree built during a capture and its XML serialization.

use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::dom::{InlineStyle, Namespace};
use crate::{Result, SnapshotError};

/// HTML elements serialized as `<tag />`.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloneNode {
    Element(CloneElement),
    Text(String),
}

impl CloneNode {
    pub fn text(content: impl Into<String>) -> Self {
        CloneNode::Text(content.into())
    }

    pub fn as_element(&self) -> Option<&CloneElement> {
        match self {
            CloneNode::Element(el) => Some(el),
            CloneNode::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut CloneElement> {
        match self {
            CloneNode::Element(el) => Some(el),
            CloneNode::Text(_) => None,
        }
    }

    /// True when a clone-stage modifier produced this node.
    pub fn is_substituted(&self) -> bool {
        self.as_element().is_some_and(|el| el.substituted)
    }

    pub(crate) fn mark_substituted(&mut self) {
        if let CloneNode::Element(el) = self {
            el.substituted = true;
        }
    }

    /// Concatenated text of this node and its descendants.
    pub fn text_content(&self) -> String {
        match self {
            CloneNode::Text(text) => text.clone(),
            CloneNode::Element(el) => el.text_content(),
        }
    }

    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        write_node(&mut writer, self)?;
        String::from_utf8(writer.into_inner()).map_err(|e| SnapshotError::Serialize(e.to_string()))
    }
}

impl From<CloneElement> for CloneNode {
    fn from(el: CloneElement) -> Self {
        CloneNode::Element(el)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneElement {
    pub name: String,
    pub namespace: Namespace,
    pub style: InlineStyle,
    pub children: Vec<CloneNode>,
    attributes: Vec<(String, String)>,
    substituted: bool,
}

impl CloneElement {
    pub fn new(name: impl Into<String>, namespace: Namespace) -> Self {
        Self {
            name: name.into(),
            namespace,
            style: InlineStyle::new(),
            children: Vec::new(),
            attributes: Vec::new(),
            substituted: false,
        }
    }

    pub fn html(name: impl Into<String>) -> Self {
        Self::new(name, Namespace::Html)
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_style(mut self, css_text: &str) -> Self {
        self.style.set_css_text(css_text);
        self
    }

    pub fn with_style_property(mut self, name: &str, value: &str) -> Self {
        self.style.set_property(name, value, false);
        self
    }

    pub fn with_child(mut self, child: impl Into<CloneNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn is_substituted(&self) -> bool {
        self.substituted
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Sets an attribute. `style` is routed to the inline style so the two
    /// never disagree at serialization time.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if name.eq_ignore_ascii_case("style") {
            self.style.set_css_text(&value);
            return;
        }
        match self
            .attributes
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some(existing) => existing.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let index = self
            .attributes
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))?;
        Some(self.attributes.remove(index).1)
    }

    pub fn retain_attributes(&mut self, keep: impl FnMut(&(String, String)) -> bool) {
        self.attributes.retain(keep);
    }

    pub fn add_class(&mut self, class_name: &str) {
        let joined = match self.attribute("class") {
            Some(existing) if !existing.trim().is_empty() => {
                format!("{} {}", existing.trim(), class_name)
            }
            _ => class_name.to_string(),
        };
        self.set_attribute("class", joined);
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attribute("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn append_child(&mut self, child: impl Into<CloneNode>) {
        self.children.push(child.into());
    }

    pub fn set_text_content(&mut self, text: impl Into<String>) {
        self.children = vec![CloneNode::Text(text.into())];
    }

    pub fn text_content(&self) -> String {
        self.children.iter().map(CloneNode::text_content).collect()
    }

    fn serializes_as_empty(&self) -> bool {
        if !self.children.is_empty() {
            return false;
        }
        match self.namespace {
            Namespace::Html => VOID_ELEMENTS.contains(&self.name.to_ascii_lowercase().as_str()),
            Namespace::Svg | Namespace::Other => true,
        }
    }
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &CloneNode) -> Result<()> {
    match node {
        CloneNode::Text(text) => writer
            .write_event(Event::Text(BytesText::from_escaped(partial_escape(text))))
            .map_err(|e| SnapshotError::Serialize(e.to_string())),
        CloneNode::Element(el) => {
            let mut start = BytesStart::new(el.name.as_str());
            for (name, value) in &el.attributes {
                start.push_attribute((name.as_str(), value.as_str()));
            }
            let style = el.style.css_text();
            if !style.is_empty() {
                start.push_attribute(("style", style.as_str()));
            }

            if el.serializes_as_empty() {
                return writer
                    .write_event(Event::Empty(start))
                    .map_err(|e| SnapshotError::Serialize(e.to_string()));
            }

            writer
                .write_event(Event::Start(start))
                .map_err(|e| SnapshotError::Serialize(e.to_string()))?;
            for child in &el.children {
                write_node(writer, child)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(el.name.as_str())))
                .map_err(|e| SnapshotError::Serialize(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_nested_elements_with_style_and_text() {
        let node: CloneNode = CloneElement::html("div")
            .with_attribute("id", "main")
            .with_style("color: red")
            .with_child(CloneNode::text("a < b & c"))
            .with_child(CloneElement::html("img").with_attribute("src", "data:image/png;base64,AA"))
            .into();

        assert_eq!(
            node.to_xml().unwrap(),
            "<div id=\"main\" style=\"color: red;\">a &lt; b &amp; c<img src=\"data:image/png;base64,AA\"/></div>"
        );
    }

    #[test]
    fn childless_html_elements_keep_end_tag() {
        let node: CloneNode = CloneElement::html("span").into();
        assert_eq!(node.to_xml().unwrap(), "<span></span>");
    }

    #[test]
    fn style_attribute_routes_to_inline_style() {
        let mut el = CloneElement::html("div");
        el.set_attribute("STYLE", "width: 10px");
        assert!(el.attribute("style").is_none());
        assert_eq!(el.style.get_property_value("width"), Some("10px"));
    }

    #[test]
    fn add_class_appends_to_existing_list() {
        let mut el = CloneElement::html("p");
        el.add_class("u1");
        el.add_class("u2");
        assert_eq!(el.classes(), vec!["u1", "u2"]);
    }

    #[test]
    fn attribute_values_are_escaped() {
        let node: CloneNode = CloneElement::html("a")
            .with_attribute("href", "/q?a=1&b=\"2\"")
            .with_child(CloneNode::text("x"))
            .into();
        let xml = node.to_xml().unwrap();
        assert!(xml.contains("href=\"/q?a=1&amp;b=&quot;2&quot;\""), "{xml}");
    }
}
