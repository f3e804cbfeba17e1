//! Shell commands (`script`, `before_script`, `after_script`)
use crate::entry::{node, predicates, Entry, FromNode, Node, Validator};
use crate::limits::MAX_NESTING_DEPTH;
use crate::util;
use crate::value::Value;

/// Commands of a job: a single string or an array of strings and nested arrays of strings
#[derive(Debug)]
pub struct Commands {
    node: Node,
}

impl Commands {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new().config(
                predicates::is_string_or_nested_array_of_strings,
                "should be a string or a nested array of strings up to 10 levels deep",
            )
        })
    }
}

impl FromNode for Commands {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("commands")),
        }
    }
}

impl Entry for Commands {
    node!();

    fn value(&self) -> Value {
        match self.node.config() {
            Value::String(line) => vec![line.clone()].into(),
            config => util::flatten_strings(config, MAX_NESTING_DEPTH)
                .map(Value::from)
                .unwrap_or_default(),
        }
    }
}

/// Top-level script: only the array form is accepted
#[derive(Debug)]
pub struct Script {
    node: Node,
}

impl Script {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new().config(
                predicates::is_nested_array_of_strings,
                "should be an array containing strings and arrays of strings",
            )
        })
    }
}

impl FromNode for Script {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("script")),
        }
    }
}

impl Entry for Script {
    node!();

    fn value(&self) -> Value {
        util::flatten_strings(self.node.config(), MAX_NESTING_DEPTH)
            .map(Value::from)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config;
    use pretty_assertions::assert_eq;

    fn commands(config: Value) -> Commands {
        Commands::from_node(Node::new(config).with_key("script"))
    }

    #[test]
    fn single_line() {
        let entry = commands(config!("rspec"));
        assert!(entry.is_valid());
        assert_eq!(entry.value(), config!("[rspec]"));
    }

    #[test]
    fn nested_lines_are_flattened() {
        let entry = commands(config!("[ls, [pwd, [env]], make]"));
        assert!(entry.is_valid());
        assert_eq!(entry.value(), config!("[ls, pwd, env, make]"));
    }

    #[test]
    fn too_deeply_nested() {
        let entry = commands(config!("[[[[[[[[[[[ls]]]]]]]]]]]"));
        assert_eq!(
            entry.errors(),
            vec!["script config should be a string or a nested array of strings up to 10 levels deep"]
        );
    }

    #[test]
    fn script_needs_an_array() {
        let entry = Script::from_node(Node::new(config!("ls")).with_key("before_script"));
        assert_eq!(
            entry.errors(),
            vec!["before_script config should be an array containing strings and arrays of strings"]
        );
    }
}
