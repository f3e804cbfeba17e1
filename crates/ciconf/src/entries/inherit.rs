//! `inherit:` controls what a job takes over from `default:` and top-level `variables:`
use crate::entry::{
    construct, node, predicates, ComposeError, Deps, Entries, Entry, EntryDecl, FromNode, Node,
    Validator,
};
use crate::value::Value;

/// Keys of `default:` a job can inherit
pub const INHERITABLE_KEYS: &[&str] = &[
    "before_script",
    "after_script",
    "hooks",
    "image",
    "services",
    "cache",
    "interruptible",
    "timeout",
    "retry",
    "tags",
    "artifacts",
    "id_tokens",
];

#[derive(Debug)]
pub struct Inherit {
    node: Node,
    entries: Entries,
}

const INHERIT_ENTRIES: &[EntryDecl] = &[
    EntryDecl::new("default", construct::<InheritDefault>, "Keywords of `default:` a job opts out of"),
    EntryDecl::new("variables", construct::<InheritVariables>, "Top-level variables a job inherits"),
];

impl Inherit {
    /// Whether `key` of `default:` is inherited by a job with this `inherit:` value
    ///
    /// `default: false` disables inheritance, a list of keywords opts out of just those keywords.
    pub fn inherits_default(value: &Value, key: &str) -> bool {
        match value.get("default") {
            Some(Value::Boolean(inherit)) => *inherit,
            Some(Value::Array(excluded)) => !excluded.iter().any(|excluded| excluded.as_str() == Some(key)),
            _ => true,
        }
    }

    /// `true`, `false` or the list of top-level variables a job inherits
    pub fn variables(value: &Value) -> Value {
        value.get("variables").cloned().unwrap_or(true.into())
    }
}

impl FromNode for Inherit {
    fn from_node(node: Node) -> Self {
        let validator = crate::validator!(|| {
            Validator::new()
                .config(predicates::is_hash, "should be a hash")
                .allowed_keys(&["default", "variables"])
        });
        Self {
            node: validator.validated(node.named("inherit")),
            entries: Entries::default(),
        }
    }
}

impl Entry for Inherit {
    node!();

    fn compose(&mut self, deps: Option<&Deps<'_>>) -> Result<(), ComposeError> {
        if !self.is_specified() || self.node.has_errors() {
            return Ok(());
        }
        self.entries = Entries::build(&self.node, INHERIT_ENTRIES)?;
        self.entries.compose(deps)
    }

    fn descendants(&self) -> Vec<&dyn Entry> {
        self.entries.descendants()
    }
}

#[derive(Debug)]
pub struct InheritDefault {
    node: Node,
}

impl FromNode for InheritDefault {
    fn from_node(node: Node) -> Self {
        let validator = crate::validator!(|| {
            Validator::new()
                .config(predicates::is_boolean_or_array_of_strings, "should be a boolean value or an array of strings")
                .check(|node, report| {
                    let Some(keys) = node.config().as_strings() else {
                        return;
                    };
                    let unknown: Vec<_> = keys
                        .iter()
                        .filter(|key| !INHERITABLE_KEYS.contains(&key.as_str()))
                        .map(String::as_str)
                        .collect();
                    if !unknown.is_empty() {
                        report.add("config", format!("contains unknown values: {}", unknown.join(", ")));
                    }
                })
        });
        Self {
            node: validator.validated(node.named("default")),
        }
    }
}

impl Entry for InheritDefault {
    node!();
}

#[derive(Debug)]
pub struct InheritVariables {
    node: Node,
}

impl FromNode for InheritVariables {
    fn from_node(node: Node) -> Self {
        let validator = crate::validator!(|| {
            Validator::new().config(
                predicates::is_boolean_or_array_of_strings,
                "should be a boolean value or an array of strings",
            )
        });
        Self {
            node: validator.validated(node.named("variables")),
        }
    }
}

impl Entry for InheritVariables {
    node!();
}
