//! Named groups of override callbacks consulted during a capture.
//!
//! A modifier is registered for one [`Stage`]:
//!
//! - `clone` - may keep, replace or exclude a node before it is cloned
//! - `style` - may rewrite the inline style copied onto a cloned element
//! - `error` - a group-scoped error handler (see [`crate::error_handler`])
//! - `xml` - may rewrite the serialized XHTML before it is wrapped in SVG
//!
//! Registrations are append-only. Lookups return matches in registration
//! order; priorities are only compared by the cloner when several clone
//! modifiers offer a result for the same node.

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::clone_tree::CloneNode;
use crate::dom::{InlineStyle, NodeRef, SourceNode};
use crate::error_handler::{ErrorHandler, FailureDescriptor};
use crate::{Result, SnapshotError};

pub const DEFAULT_GROUP: &str = "__default-group__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Clone,
    Style,
    Error,
    Xml,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Clone => "clone",
            Stage::Style => "style",
            Stage::Error => "error",
            Stage::Xml => "xml",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = SnapshotError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "clone" => Ok(Stage::Clone),
            "style" => Ok(Stage::Style),
            "error" => Ok(Stage::Error),
            "xml" => Ok(Stage::Xml),
            other => Err(SnapshotError::InvalidStage(other.to_string())),
        }
    }
}

/// Failure reported by a modifier or error handler. Never aborts a capture.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ModifierError(String);

impl ModifierError {
    pub fn new(message: impl Into<String>) -> Self {
        ModifierError(message.into())
    }
}

/// Result of a clone-stage modifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModifierOutcome {
    /// No opinion; the node is cloned the default way unless another
    /// modifier offers a replacement.
    Keep,
    /// Use this node instead. Its presentation is the modifier's business:
    /// computed style, pseudo-elements and form values are not copied onto it.
    Replace(CloneNode),
    /// Drop the node and its whole subtree.
    Exclude,
}

pub type CloneFuture = BoxFuture<'static, std::result::Result<ModifierOutcome, ModifierError>>;
pub type CloneModifier = Arc<dyn Fn(NodeRef) -> CloneFuture + Send + Sync>;
pub type StyleModifier = Arc<
    dyn Fn(&dyn SourceNode, &mut InlineStyle) -> std::result::Result<(), ModifierError>
        + Send
        + Sync,
>;
pub type XmlModifier =
    Arc<dyn Fn(&str) -> std::result::Result<Option<String>, ModifierError> + Send + Sync>;

#[derive(Clone)]
pub enum Modifier {
    Clone(CloneModifier),
    Style(StyleModifier),
    Error(ErrorHandler),
    Xml(XmlModifier),
}

impl Modifier {
    pub fn on_clone<F, Fut>(callback: F) -> Self
    where
        F: Fn(NodeRef) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<ModifierOutcome, ModifierError>> + Send + 'static,
    {
        Modifier::Clone(Arc::new(move |node| callback(node).boxed()))
    }

    pub fn on_style<F>(callback: F) -> Self
    where
        F: Fn(&dyn SourceNode, &mut InlineStyle) -> std::result::Result<(), ModifierError>
            + Send
            + Sync
            + 'static,
    {
        Modifier::Style(Arc::new(callback))
    }

    pub fn on_error<F, Fut>(callback: F) -> Self
    where
        F: Fn(FailureDescriptor) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Option<String>, ModifierError>> + Send + 'static,
    {
        Modifier::Error(Arc::new(move |failure| callback(failure).boxed()))
    }

    pub fn on_xml<F>(callback: F) -> Self
    where
        F: Fn(&str) -> std::result::Result<Option<String>, ModifierError> + Send + Sync + 'static,
    {
        Modifier::Xml(Arc::new(callback))
    }

    pub fn stage(&self) -> Stage {
        match self {
            Modifier::Clone(_) => Stage::Clone,
            Modifier::Style(_) => Stage::Style,
            Modifier::Error(_) => Stage::Error,
            Modifier::Xml(_) => Stage::Xml,
        }
    }
}

impl fmt::Debug for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Modifier({})", self.stage())
    }
}

/// Decides which nodes a modifier applies to.
#[derive(Clone, Default)]
pub enum ModifierFilter {
    #[default]
    Any,
    Predicate(Arc<dyn Fn(&dyn SourceNode) -> bool + Send + Sync>),
    Selector(String),
}

impl ModifierFilter {
    pub fn predicate<F>(check: F) -> Self
    where
        F: Fn(&dyn SourceNode) -> bool + Send + Sync + 'static,
    {
        ModifierFilter::Predicate(Arc::new(check))
    }

    pub fn selector(selector: impl Into<String>) -> Self {
        ModifierFilter::Selector(selector.into())
    }

    pub fn matches(&self, node: &dyn SourceNode) -> bool {
        match self {
            ModifierFilter::Any => true,
            ModifierFilter::Predicate(check) => check(node),
            ModifierFilter::Selector(selector) => node.matches_selector(selector),
        }
    }
}

impl fmt::Debug for ModifierFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModifierFilter::Any => f.write_str("Any"),
            ModifierFilter::Predicate(_) => f.write_str("Predicate(..)"),
            ModifierFilter::Selector(s) => f.debug_tuple("Selector").field(s).finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub modifier: Modifier,
    pub filter: ModifierFilter,
    pub priority: i32,
}

#[derive(Default)]
pub struct ModifierRegistry {
    groups: RwLock<HashMap<String, Vec<Arc<Registration>>>>,
}

impl fmt::Debug for ModifierRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups = self.groups.read();
        let mut map = f.debug_map();
        for (name, regs) in groups.iter() {
            map.entry(name, &regs.len());
        }
        map.finish()
    }
}

impl ModifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a registration to `group` (the default group when `None`).
    /// Registering the same callback twice yields two entries.
    pub fn register(
        &self,
        modifier: Modifier,
        filter: ModifierFilter,
        priority: i32,
        group: Option<&str>,
    ) {
        let group = group.unwrap_or(DEFAULT_GROUP).to_string();
        self.groups
            .write()
            .entry(group)
            .or_default()
            .push(Arc::new(Registration {
                modifier,
                filter,
                priority,
            }));
    }

    /// Registers by stage name, failing on unknown names or on a callback of
    /// another stage.
    pub fn register_named(
        &self,
        stage: &str,
        modifier: Modifier,
        filter: ModifierFilter,
        priority: i32,
        group: Option<&str>,
    ) -> Result<()> {
        let stage: Stage = stage.parse()?;
        if modifier.stage() != stage {
            return Err(SnapshotError::StageMismatch {
                expected: stage.to_string(),
                actual: modifier.stage().to_string(),
            });
        }
        self.register(modifier, filter, priority, group);
        Ok(())
    }

    /// Registrations of `group` for `stage` whose filter matches `node`, in
    /// registration order.
    pub fn resolve(
        &self,
        stage: Stage,
        node: &dyn SourceNode,
        group: Option<&str>,
    ) -> Vec<Arc<Registration>> {
        self.stage_entries(stage, group)
            .into_iter()
            .filter(|reg| reg.filter.matches(node))
            .collect()
    }

    /// Error-stage callbacks of `group`. Filters are node predicates and do
    /// not apply to failures, so every registration is returned.
    pub fn error_handlers(&self, group: Option<&str>) -> Vec<ErrorHandler> {
        self.stage_entries(Stage::Error, group)
            .into_iter()
            .filter_map(|reg| match &reg.modifier {
                Modifier::Error(handler) => Some(handler.clone()),
                _ => None,
            })
            .collect()
    }

    fn stage_entries(&self, stage: Stage, group: Option<&str>) -> Vec<Arc<Registration>> {
        let group = group.unwrap_or(DEFAULT_GROUP);
        self.groups
            .read()
            .get(group)
            .map(|regs| {
                regs.iter()
                    .filter(|reg| reg.modifier.stage() == stage)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}
