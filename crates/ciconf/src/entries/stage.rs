//! Stages of a pipeline
use crate::entry::{node, predicates, Entry, FromNode, Node, Validator};
use crate::limits::MAX_NESTING_DEPTH;
use crate::util;
use crate::value::Value;

pub const DEFAULT_STAGE: &str = "test";
pub const DEFAULT_STAGES: &[&str] = &["build", "test", "deploy"];
pub const PRE_STAGE: &str = ".pre";
pub const POST_STAGE: &str = ".post";

/// Stage of a single job
#[derive(Debug)]
pub struct Stage {
    node: Node,
}

impl Stage {
    fn validator() -> &'static Validator {
        crate::validator!(|| Validator::new().config(predicates::is_string, "should be a string"))
    }
}

impl FromNode for Stage {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("stage")),
        }
    }
}

impl Entry for Stage {
    node!();

    fn default_value(&self) -> Value {
        DEFAULT_STAGE.into()
    }
}

/// Ordered stages of the pipeline
#[derive(Debug)]
pub struct Stages {
    node: Node,
}

impl Stages {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new().config(
                predicates::is_string_or_nested_array_of_strings,
                "should be an array of strings or a nested array of strings up to 10 levels deep",
            )
        })
    }
}

impl FromNode for Stages {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("stages")),
        }
    }
}

impl Entry for Stages {
    node!();

    fn value(&self) -> Value {
        match self.node.config() {
            Value::String(stage) => vec![stage.clone()].into(),
            config => util::flatten_strings(config, MAX_NESTING_DEPTH)
                .map(Value::from)
                .unwrap_or_default(),
        }
    }

    fn default_value(&self) -> Value {
        DEFAULT_STAGES.iter().copied().map(Value::from).collect::<Vec<_>>().into()
    }
}
