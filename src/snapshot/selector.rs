//! A small selector matcher for page snapshots.
//!
//! Supports type (`div`, `*`), id (`#main`), class (`.card`) and attribute
//! (`[href]`, `[type=text]`) selectors combined into compounds, the
//! descendant (` `) and child (`>`) combinators, and comma-separated lists.
//! Anything else fails to parse and matches nothing.

#[derive(Debug, Clone, PartialEq, Eq)]
enum Simple {
    Type(String),
    Id(String),
    Class(String),
    Attribute { name: String, value: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Compound(Vec<Simple>);

/// Compounds right to left, each paired with the combinator linking it to the
/// next compound on its left.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    subject: Compound,
    ancestors: Vec<(Combinator, Compound)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList(Vec<Complex>);

/// What the matcher needs from a node.
pub trait Element: Sized {
    fn local_name(&self) -> &str;
    fn attribute(&self, name: &str) -> Option<&str>;
    fn parent_element(&self) -> Option<Self>;
}

impl SelectorList {
    pub fn parse(input: &str) -> Option<Self> {
        let list: Option<Vec<Complex>> = input.split(',').map(parse_complex).collect();
        list.filter(|l| !l.is_empty()).map(SelectorList)
    }

    pub fn matches<E: Element>(&self, element: &E) -> bool {
        self.0.iter().any(|complex| matches_complex(complex, element))
    }
}

fn parse_complex(input: &str) -> Option<Complex> {
    let mut compounds: Vec<Compound> = Vec::new();
    let mut combinators: Vec<Combinator> = Vec::new();
    let mut pending: Option<Combinator> = None;
    let mut chars = input.trim().chars().peekable();

    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            if pending.is_none() && !compounds.is_empty() {
                pending = Some(Combinator::Descendant);
            }
            continue;
        }
        if ch == '>' {
            chars.next();
            if compounds.is_empty() {
                return None;
            }
            pending = Some(Combinator::Child);
            continue;
        }
        let compound = parse_compound(&mut chars)?;
        if !compounds.is_empty() {
            combinators.push(pending.take()?);
        }
        pending = None;
        compounds.push(compound);
    }

    if pending == Some(Combinator::Child) {
        return None;
    }
    let subject = compounds.pop()?;
    let mut ancestors = Vec::new();
    while let Some(compound) = compounds.pop() {
        ancestors.push((combinators.pop()?, compound));
    }
    Some(Complex { subject, ancestors })
}

fn parse_compound(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<Compound> {
    let mut simples = Vec::new();
    while let Some(&ch) = chars.peek() {
        match ch {
            '#' => {
                chars.next();
                simples.push(Simple::Id(read_ident(chars)?));
            }
            '.' => {
                chars.next();
                simples.push(Simple::Class(read_ident(chars)?));
            }
            '[' => {
                chars.next();
                simples.push(read_attribute(chars)?);
            }
            '*' => {
                chars.next();
            }
            c if is_ident_char(c) => {
                if !simples.is_empty() {
                    return None;
                }
                simples.push(Simple::Type(read_ident(chars)?.to_ascii_lowercase()));
            }
            c if c.is_whitespace() || c == '>' => break,
            _ => return None,
        }
    }
    Some(Compound(simples))
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || c == ':'
}

fn read_ident(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<String> {
    let mut ident = String::new();
    while let Some(&c) = chars.peek() {
        if !is_ident_char(c) {
            break;
        }
        ident.push(c);
        chars.next();
    }
    (!ident.is_empty()).then_some(ident)
}

fn read_attribute(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<Simple> {
    let mut body = String::new();
    for c in chars.by_ref() {
        if c == ']' {
            let (name, value) = match body.split_once('=') {
                Some((name, value)) => {
                    let value = value.trim().trim_matches(|q| q == '"' || q == '\'');
                    (name.trim().to_ascii_lowercase(), Some(value.to_string()))
                }
                None => (body.trim().to_ascii_lowercase(), None),
            };
            if name.is_empty() {
                return None;
            }
            return Some(Simple::Attribute { name, value });
        }
        body.push(c);
    }
    None
}

fn matches_compound<E: Element>(compound: &Compound, element: &E) -> bool {
    compound.0.iter().all(|simple| match simple {
        Simple::Type(name) => element.local_name().eq_ignore_ascii_case(name),
        Simple::Id(id) => element.attribute("id") == Some(id.as_str()),
        Simple::Class(class) => element
            .attribute("class")
            .is_some_and(|list| list.split_whitespace().any(|c| c == class)),
        Simple::Attribute { name, value } => match (element.attribute(name), value) {
            (Some(_), None) => true,
            (Some(actual), Some(expected)) => actual == expected,
            (None, _) => false,
        },
    })
}

fn matches_complex<E: Element>(complex: &Complex, element: &E) -> bool {
    matches_compound(&complex.subject, element) && matches_ancestors(&complex.ancestors, element)
}

fn matches_ancestors<E: Element>(rest: &[(Combinator, Compound)], element: &E) -> bool {
    let Some(((combinator, compound), remaining)) = rest.split_first() else {
        return true;
    };
    match combinator {
        Combinator::Child => element
            .parent_element()
            .is_some_and(|parent| {
                matches_compound(compound, &parent) && matches_ancestors(remaining, &parent)
            }),
        Combinator::Descendant => {
            let mut current = element.parent_element();
            while let Some(ancestor) = current {
                if matches_compound(compound, &ancestor) && matches_ancestors(remaining, &ancestor)
                {
                    return true;
                }
                current = ancestor.parent_element();
            }
            false
        }
    }
}
