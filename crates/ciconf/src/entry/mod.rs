//! Entry tree infrastructure
//!
//! Every fragment of a configuration document is validated and normalized by one [Entry]. Entries
//! are built by a [Factory] from a raw [Value], validate themselves on construction and, once
//! [composed](Entry::compose), expose a normalized [value](Entry::value).
//!
//! Validation never fails loudly: messages are collected on the [Node] and bubble up through
//! [Entry::errors]. Only broken tree wiring ([ComposeError]) is reported as a rust error.
mod attributable;
mod factory;
pub mod predicates;
mod validator;

pub(crate) use attributable::attributes;
pub use factory::{construct, Constructor, EntryDecl, Factory, FactoryError};
pub use validator::{Report, Validator};

use crate::entries::{DefaultEntry, Workflow};
use crate::value::Value;
use indexmap::IndexMap;
use std::fmt;

/// Contextual flags handed down from a parent to the entries it creates
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Metadata {
    /// need types accepted by a `needs:` collection
    pub allowed_needs: Option<&'static [&'static str]>,
    /// hash keys a variable may use for its complex form
    pub allowed_value_data: Option<&'static [&'static str]>,
    /// legacy variables accept `{value:, description:}` hashes
    pub use_value_data: bool,
    /// `when:` values a rule may use
    pub allowed_when: Option<&'static [&'static str]>,
    /// `parallel:` forms that are accepted
    pub allowed_strategies: Option<&'static [&'static str]>,
}

impl Metadata {
    pub const EMPTY: Metadata = Metadata {
        allowed_needs: None,
        allowed_value_data: None,
        use_value_data: false,
        allowed_when: None,
        allowed_strategies: None,
    };
}

/// State shared by all entries
#[derive(Debug, Clone)]
pub struct Node {
    config: Value,
    key: Option<String>,
    ancestors: Vec<String>,
    /// humanized type name, used in messages when the node has no key
    name: &'static str,
    description: &'static str,
    metadata: Metadata,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Node {
    pub fn new(config: Value) -> Self {
        Self {
            config,
            key: None,
            ancestors: Vec::new(),
            name: "entry",
            description: "",
            metadata: Metadata::EMPTY,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_ancestors(mut self, ancestors: Vec<String>) -> Self {
        self.ancestors = ancestors;
        self
    }

    pub fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set the humanized type name (done by each entry type on construction)
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn config(&self) -> &Value {
        &self.config
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn ancestors(&self) -> &[String] {
        &self.ancestors
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// A node without config is unspecified and always valid
    pub fn is_specified(&self) -> bool {
        !self.config.is_null()
    }

    /// Attribute of a hash config, `None` for any other config
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.config.get(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// The name used for this node in messages: its key, or its type name without one
    pub fn key_name(&self) -> &str {
        match self.key.as_deref() {
            Some(key) if !key.trim().is_empty() => key,
            _ => self.name,
        }
    }

    /// `:` separated path to this node, e.g. `jobs:rspec:cache`
    pub fn location(&self) -> String {
        let mut location = self.ancestors.clone();
        location.push(self.key_name().to_string());
        location.join(":")
    }

    /// Ancestors for the children of this node
    pub fn path(&self) -> Vec<String> {
        let mut path = self.ancestors.clone();
        if let Some(key) = &self.key {
            path.push(key.clone());
        }
        path
    }

    /// Record a validation failure for `attribute` (empty for the node itself)
    pub fn error(&mut self, attribute: &str, message: impl fmt::Display) {
        let error = match attribute {
            "" => format!("{} {message}", self.location()),
            attribute => format!(
                "{} {} {message}",
                self.location(),
                attribute.replace('_', " ")
            ),
        }
        .to_lowercase();

        tracing::trace!(%error, "validation error");
        self.errors.push(error);
    }

    pub fn warn(&mut self, message: impl fmt::Display) {
        let warning = format!("{} {message}", self.location());
        tracing::trace!(%warning, "validation warning");
        self.warnings.push(warning);
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Non-owning view on the ancestors a node may inherit from during [Entry::compose]
#[derive(Debug, Clone, Copy, Default, derive_new::new)]
pub struct Deps<'a> {
    /// top-level entries of the document
    pub root: Option<&'a Entries>,
    /// the composed `default:` entry
    pub default: Option<&'a DefaultEntry>,
    /// the composed `workflow:` entry
    pub workflow: Option<&'a Workflow>,
}

impl<'a> Deps<'a> {
    pub fn has_workflow_rules(&self) -> bool {
        self.workflow.is_some_and(Workflow::has_rules)
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ComposeError {
    #[error("{key} is defined in top-level and `default:` entry")]
    Inherit { key: String },
    #[error(transparent)]
    Factory(#[from] FactoryError),
}

/// A node of the configuration tree
pub trait Entry: fmt::Debug + Send + Sync {
    fn node(&self) -> &Node;

    fn node_mut(&mut self) -> &mut Node;

    /// Create and compose children. Runs at most once per entry.
    fn compose(&mut self, _deps: Option<&Deps<'_>>) -> Result<(), ComposeError> {
        Ok(())
    }

    /// Normalized representation
    fn value(&self) -> Value {
        self.node().config().clone()
    }

    /// Value reported when the entry is unspecified
    fn default_value(&self) -> Value {
        Value::Null
    }

    /// Value including extra data (variables)
    fn value_with_data(&self) -> Value {
        self.value()
    }

    /// Value including data used to prefill forms (variables)
    fn value_with_prefill_data(&self) -> Value {
        self.value_with_data()
    }

    fn descendants(&self) -> Vec<&dyn Entry> {
        Vec::new()
    }

    /// Whether the entry contributes to the pipeline
    fn is_relevant(&self) -> bool {
        true
    }

    fn is_specified(&self) -> bool {
        self.node().is_specified()
    }

    fn key(&self) -> Option<&str> {
        self.node().key()
    }

    fn description(&self) -> &'static str {
        self.node().description()
    }

    fn location(&self) -> String {
        self.node().location()
    }

    fn is_leaf(&self) -> bool {
        self.descendants().is_empty()
    }

    /// Own errors followed by the errors of all descendants
    fn errors(&self) -> Vec<String> {
        let mut errors = self.node().errors().to_vec();
        for descendant in self.descendants() {
            errors.extend(descendant.errors());
        }
        errors
    }

    fn warnings(&self) -> Vec<String> {
        let mut warnings = self.node().warnings().to_vec();
        for descendant in self.descendants() {
            warnings.extend(descendant.warnings());
        }
        warnings
    }

    fn is_valid(&self) -> bool {
        self.errors().is_empty()
    }
}

/// Entries built from a [Node] by a [Factory]
pub trait FromNode: Entry + Sized + 'static {
    fn from_node(node: Node) -> Self;
}

/// Implements the node accessors of [Entry] for a struct with a `node` field
macro_rules! node {
    () => {
        fn node(&self) -> &$crate::entry::Node {
            &self.node
        }

        fn node_mut(&mut self) -> &mut $crate::entry::Node {
            &mut self.node
        }
    };
}
pub(crate) use node;

/// Children of a configurable entry, keyed by their declared name
#[derive(Debug, Default)]
pub struct Entries(IndexMap<&'static str, Box<dyn Entry>>);

impl Entries {
    /// Create one child per declaration. Declarations missing from the config become unspecified.
    pub fn build(parent: &Node, nodes: &'static [EntryDecl]) -> Result<Self, FactoryError> {
        let mut entries = IndexMap::with_capacity(nodes.len());
        for decl in nodes {
            let value = parent.attribute(decl.key).cloned().unwrap_or_default();
            let entry = decl.factory().value(value).parent(parent).create()?;
            entries.insert(decl.key, entry);
        }

        Ok(Self(entries))
    }

    pub fn compose(&mut self, deps: Option<&Deps<'_>>) -> Result<(), ComposeError> {
        for entry in self.0.values_mut() {
            entry.compose(deps)?;
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&dyn Entry> {
        self.0.get(key).map(|entry| entry.as_ref())
    }

    pub fn is_specified(&self, key: &str) -> bool {
        self.get(key).is_some_and(|entry| entry.is_specified())
    }

    /// Value of a child, its default when unspecified, null when undeclared
    pub fn value(&self, key: &str) -> Value {
        self.get(key).map(|entry| entry.value()).unwrap_or_default()
    }

    /// Value of a child only when it is specified
    pub fn specified_value(&self, key: &str) -> Value {
        self.get(key)
            .filter(|entry| entry.is_specified())
            .map(|entry| entry.value())
            .unwrap_or_default()
    }

    pub fn insert(&mut self, key: &'static str, entry: Box<dyn Entry>) {
        self.0.insert(key, entry);
    }

    pub fn remove(&mut self, key: &str) -> Option<Box<dyn Entry>> {
        self.0.shift_remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }

    pub fn descendants(&self) -> Vec<&dyn Entry> {
        self.0.values().map(|entry| entry.as_ref()).collect()
    }
}

/// Placeholder for a declared entry that is absent from the config
#[derive(Debug)]
pub struct Unspecified {
    entry: Box<dyn Entry>,
    default: Option<Value>,
}

impl Unspecified {
    pub fn new(entry: Box<dyn Entry>, default: Option<Value>) -> Self {
        Self { entry, default }
    }
}

impl Entry for Unspecified {
    fn node(&self) -> &Node {
        self.entry.node()
    }

    fn node_mut(&mut self) -> &mut Node {
        self.entry.node_mut()
    }

    fn value(&self) -> Value {
        self.default_value()
    }

    fn default_value(&self) -> Value {
        match &self.default {
            Some(default) => default.clone(),
            None => self.entry.default_value(),
        }
    }

    fn is_relevant(&self) -> bool {
        self.entry.is_relevant()
    }

    fn errors(&self) -> Vec<String> {
        Vec::new()
    }

    fn warnings(&self) -> Vec<String> {
        Vec::new()
    }

    fn is_specified(&self) -> bool {
        false
    }
}

/// Snapshot of an entry taken over from an ancestor (`default:` or top-level keywords)
///
/// Errors are reported where the entry is defined, the snapshot itself is always valid.
#[derive(Debug)]
pub struct Inherited {
    node: Node,
    value: Value,
    value_with_data: Value,
}

impl Inherited {
    pub fn from_entry(entry: &dyn Entry) -> Self {
        Self {
            node: Node::new(entry.node().config().clone())
                .with_key(entry.key().unwrap_or_default())
                .with_description(entry.description()),
            value: entry.value(),
            value_with_data: entry.value_with_data(),
        }
    }

    pub fn boxed(entry: &dyn Entry) -> Box<dyn Entry> {
        Box::new(Self::from_entry(entry))
    }
}

impl Entry for Inherited {
    node!();

    fn value(&self) -> Value {
        self.value.clone()
    }

    fn value_with_data(&self) -> Value {
        self.value_with_data.clone()
    }

    fn errors(&self) -> Vec<String> {
        Vec::new()
    }

    fn is_specified(&self) -> bool {
        true
    }
}
