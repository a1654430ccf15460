//! Style declarations: the computed style read from the live page and the
//! inline style written onto clone elements.

use cssparser::{Delimiter, ParseError, Parser, ParserInput, Token};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleDeclaration {
    pub name: String,
    pub value: String,
    pub important: bool,
}

impl StyleDeclaration {
    pub fn new(name: impl Into<String>, value: impl Into<String>, important: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            important,
        }
    }

    fn to_css(&self) -> String {
        if self.important {
            format!("{}: {} !important;", self.name, self.value)
        } else {
            format!("{}: {};", self.name, self.value)
        }
    }
}

/// Computed style of a node or pseudo-element.
///
/// Some platforms hand out the whole style as one `cssText` blob, others only
/// expose property enumeration. Both shapes are kept: `css_text` is `None`
/// when the platform offers no blob.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComputedStyle {
    css_text: Option<String>,
    declarations: Vec<StyleDeclaration>,
}

impl ComputedStyle {
    pub fn from_declarations(declarations: Vec<StyleDeclaration>) -> Self {
        Self {
            css_text: None,
            declarations,
        }
    }

    pub fn from_css_text(css_text: impl Into<String>) -> Self {
        let css_text = css_text.into();
        let declarations = parse_declarations(&css_text);
        Self {
            css_text: Some(css_text),
            declarations,
        }
    }

    pub fn css_text(&self) -> Option<&str> {
        self.css_text.as_deref().filter(|text| !text.trim().is_empty())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.declarations
            .iter()
            .rev()
            .find(|d| d.name.eq_ignore_ascii_case(name))
            .map(|d| d.value.as_str())
    }

    pub fn priority(&self, name: &str) -> bool {
        self.declarations
            .iter()
            .rev()
            .find(|d| d.name.eq_ignore_ascii_case(name))
            .is_some_and(|d| d.important)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StyleDeclaration> {
        self.declarations.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty() && self.css_text().is_none()
    }
}

/// The `style` attribute of a clone element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineStyle {
    declarations: Vec<StyleDeclaration>,
}

impl InlineStyle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every declaration with the ones parsed from `css_text`.
    pub fn set_css_text(&mut self, css_text: &str) {
        self.declarations = parse_declarations(css_text);
    }

    pub fn css_text(&self) -> String {
        self.declarations
            .iter()
            .map(StyleDeclaration::to_css)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Sets a property in place, keeping its position when it already exists.
    pub fn set_property(&mut self, name: &str, value: impl Into<String>, important: bool) {
        let value = value.into();
        let name = normalize_name(name);
        match self.declarations.iter_mut().find(|d| d.name == name) {
            Some(existing) => {
                existing.value = value;
                existing.important = important;
            }
            None => self
                .declarations
                .push(StyleDeclaration::new(name, value, important)),
        }
    }

    pub fn get_property_value(&self, name: &str) -> Option<&str> {
        let name = normalize_name(name);
        self.declarations
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.value.as_str())
    }

    pub fn get_property_priority(&self, name: &str) -> bool {
        let name = normalize_name(name);
        self.declarations
            .iter()
            .find(|d| d.name == name)
            .is_some_and(|d| d.important)
    }

    pub fn remove_property(&mut self, name: &str) -> Option<StyleDeclaration> {
        let name = normalize_name(name);
        let index = self.declarations.iter().position(|d| d.name == name)?;
        Some(self.declarations.remove(index))
    }

    pub fn retain(&mut self, keep: impl FnMut(&StyleDeclaration) -> bool) {
        self.declarations.retain(keep);
    }

    pub fn iter(&self) -> impl Iterator<Item = &StyleDeclaration> {
        self.declarations.iter()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

fn normalize_name(name: &str) -> String {
    let name = name.trim();
    if name.starts_with("--") {
        name.to_string()
    } else {
        name.to_ascii_lowercase()
    }
}

/// Splits a declaration block (`a: b; c: d !important`) into declarations.
///
/// Semicolons inside strings, `url()` or any function or bracket block do
/// not end a declaration. Malformed declarations are dropped. Later
/// duplicates win, keeping the first position.
pub fn parse_declarations(css_text: &str) -> Vec<StyleDeclaration> {
    let mut input = ParserInput::new(css_text);
    let mut parser = Parser::new(&mut input);
    let mut out: Vec<StyleDeclaration> = Vec::new();
    while !parser.is_exhausted() {
        let Ok(declaration) = parser.parse_until_after(Delimiter::Semicolon, parse_declaration)
        else {
            continue;
        };
        match out.iter_mut().find(|d| d.name == declaration.name) {
            Some(existing) => {
                existing.value = declaration.value;
                existing.important = declaration.important;
            }
            None => out.push(declaration),
        }
    }
    out
}

fn parse_declaration<'i, 't>(
    parser: &mut Parser<'i, 't>,
) -> Result<StyleDeclaration, ParseError<'i, ()>> {
    let name = normalize_name(parser.expect_ident()?);
    parser.expect_colon()?;

    let value_start = parser.position();
    let mut value_end = None;
    loop {
        let before = parser.position();
        match parser.next() {
            Err(_) => break,
            Ok(Token::Delim('!')) => {
                if parser
                    .try_parse(|p| p.expect_ident_matching("important"))
                    .is_ok()
                    && parser.is_exhausted()
                {
                    value_end = Some(before);
                    break;
                }
            }
            // Nested blocks are skipped whole by the next call to `next`.
            Ok(_) => {}
        }
    }

    let important = value_end.is_some();
    let value = match value_end {
        Some(end) => parser.slice(value_start..end),
        None => parser.slice_from(value_start),
    };
    let value = value.trim().trim_end_matches(';').trim_end();
    if value.is_empty() {
        return Err(parser.new_custom_error(()));
    }
    Ok(StyleDeclaration::new(name, value, important))
}
