//! Effective size of a node: scroll size plus borders, optionally margins.

use crate::dom::{ComputedStyle, SourceNode};

/// Width of `node`'s content including left/right borders, and margins when
/// `with_margin` is set.
pub fn node_width(node: &dyn SourceNode, with_margin: bool) -> u32 {
    let style = node.computed_style(None);
    let mut width = node.scroll_width();
    width += edge(&style, "border", "left", Some("width"));
    width += edge(&style, "border", "right", Some("width"));
    if with_margin {
        width += edge(&style, "margin", "left", None);
        width += edge(&style, "margin", "right", None);
    }
    width
}

pub fn node_height(node: &dyn SourceNode, with_margin: bool) -> u32 {
    let style = node.computed_style(None);
    let mut height = node.scroll_height();
    height += edge(&style, "border", "top", Some("width"));
    height += edge(&style, "border", "bottom", Some("width"));
    if with_margin {
        height += edge(&style, "margin", "top", None);
        height += edge(&style, "margin", "bottom", None);
    }
    height
}

/// Reads `<box>-<side>`, falling back to `<box>-<side>-<longhand>`.
fn edge(style: &ComputedStyle, box_name: &str, side: &str, longhand: Option<&str>) -> u32 {
    let shorthand = style.get(&format!("{box_name}-{side}")).and_then(leading_integer);
    shorthand
        .or_else(|| {
            let longhand = longhand?;
            style
                .get(&format!("{box_name}-{side}-{longhand}"))
                .and_then(leading_integer)
        })
        .unwrap_or(0)
}

/// The run of ASCII digits a value starts with (`"1px solid"` -> 1,
/// `"2.5px"` -> 2). Values not starting with a digit count as absent.
pub fn leading_integer(value: &str) -> Option<u32> {
    let value = value.trim_start();
    let end = value
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(value.len(), |(i, _)| i);
    value[..end].parse().ok()
}
