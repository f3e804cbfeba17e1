//! Creation of entries
use super::{Entry, FromNode, Metadata, Node, Unspecified};
use crate::value::Value;

pub type Constructor = fn(Node) -> Box<dyn Entry>;

/// [Constructor] for any entry type that can be built from a [Node]
pub fn construct<E: FromNode>(node: Node) -> Box<dyn Entry> {
    Box::new(E::from_node(node))
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum FactoryError {
    #[error("factory of `{0}` has no value to build an entry from")]
    InvalidFactory(String),
}

/// Declaration of a child entry of a configurable entry
///
/// Declarations live in static tables. A fresh [Factory] is handed out for every child that gets
/// built, so concurrent compositions never share builder state.
#[derive(Debug, Clone, Copy)]
pub struct EntryDecl {
    pub key: &'static str,
    pub constructor: Constructor,
    pub description: &'static str,
    /// value may be taken over from the `default:` entry
    pub inherit: bool,
    pub metadata: Metadata,
    /// value reported while unspecified, overriding the entry's own default
    pub default: Option<fn() -> Value>,
}

impl EntryDecl {
    pub const fn new(key: &'static str, constructor: Constructor, description: &'static str) -> Self {
        Self {
            key,
            constructor,
            description,
            inherit: false,
            metadata: Metadata::EMPTY,
            default: None,
        }
    }

    pub const fn inherit(mut self) -> Self {
        self.inherit = true;
        self
    }

    pub const fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub const fn default(mut self, default: fn() -> Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn factory(&self) -> Factory {
        let factory = Factory::new(self.constructor)
            .with(self.key, Vec::new(), self.description)
            .metadata(self.metadata);

        match self.default {
            Some(default) => factory.default(default()),
            None => factory,
        }
    }
}

/// Builder for a single entry
#[derive(Debug, Clone)]
pub struct Factory {
    constructor: Constructor,
    value: Option<Value>,
    key: Option<String>,
    ancestors: Vec<String>,
    description: &'static str,
    metadata: Metadata,
    default: Option<Value>,
}

impl Factory {
    pub fn new(constructor: Constructor) -> Self {
        Self {
            constructor,
            value: None,
            key: None,
            ancestors: Vec::new(),
            description: "",
            metadata: Metadata::EMPTY,
            default: None,
        }
    }

    pub fn value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with(
        mut self,
        key: impl Into<String>,
        ancestors: Vec<String>,
        description: &'static str,
    ) -> Self {
        self.key = Some(key.into());
        self.ancestors = ancestors;
        self.description = description;
        self
    }

    /// Place the entry below `parent`
    pub fn parent(mut self, parent: &Node) -> Self {
        self.ancestors = parent.path();
        self
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Value of the entry when the config does not specify it
    pub fn default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Build the entry. A null value yields an [Unspecified] entry.
    pub fn create(self) -> Result<Box<dyn Entry>, FactoryError> {
        let Some(value) = self.value else {
            return Err(FactoryError::InvalidFactory(
                self.key.unwrap_or_else(|| self.description.to_string()),
            ));
        };

        let mut node = Node::new(value)
            .with_ancestors(self.ancestors)
            .with_description(self.description)
            .with_metadata(self.metadata);
        if let Some(key) = self.key {
            node = node.with_key(key);
        }

        if node.is_specified() {
            Ok((self.constructor)(node))
        } else {
            let entry = (self.constructor)(node);
            Ok(Box::new(Unspecified::new(entry, self.default)))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entries::Stage;
    use pretty_assertions::assert_eq;

    #[test]
    fn create_without_value_fails() {
        let result = Factory::new(construct::<Stage>)
            .with("stage", vec![], "stage")
            .create();
        assert_eq!(
            result.unwrap_err(),
            FactoryError::InvalidFactory("stage".into())
        );
    }

    #[test]
    fn null_value_is_unspecified() {
        let entry = Factory::new(construct::<Stage>)
            .value(Value::Null)
            .create()
            .unwrap();
        assert!(!entry.is_specified());
        assert!(entry.is_valid());
        assert_eq!(entry.value(), Value::from("test"));
    }

    #[test]
    fn declared_default_wins() {
        const DECL: EntryDecl =
            EntryDecl::new("stage", construct::<Stage>, "stage").default(|| Value::from("build"));

        let entry = DECL.factory().value(Value::Null).create().unwrap();
        assert_eq!(entry.value(), Value::from("build"));
    }

    #[test]
    fn factories_from_declarations_are_independent() {
        const DECL: EntryDecl = EntryDecl::new("stage", construct::<Stage>, "stage");

        let first = DECL.factory().value("build".into()).create().unwrap();
        let second = DECL.factory().value(Value::from(1)).create().unwrap();

        assert!(first.is_valid());
        assert!(!second.is_valid());
        assert_eq!(first.value(), Value::from("build"));
    }
}
