//! `only:` and `except:`
use crate::entry::{node, predicates, Entry, FromNode, Node, Validator};
use crate::value::Value;

/// `only:` of a job that uses neither `rules:` nor workflow rules
pub fn default_only() -> Value {
    [("refs", Value::from(vec!["branches", "tags"]))].into_iter().collect()
}

/// Refs, variables, changes and kubernetes conditions a job is limited to
#[derive(Debug)]
pub struct Policy {
    node: Node,
}

impl Policy {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new()
                .check(|node, report| match node.config() {
                    Value::Array(_) if !predicates::is_array_of_strings(node.config()) => {
                        report.add("config", "should be an array of strings or regexps")
                    }
                    Value::Array(_) | Value::Object(_) => {}
                    _ => report.add("", "should be an array of strings or a hash"),
                })
                .allowed_keys(&["refs", "kubernetes", "variables", "changes"])
                .attribute("refs", predicates::is_array_of_strings, "should be an array of strings or regexps")
                .inclusion("kubernetes", &["active"], "should be active")
                .attribute("kubernetes", predicates::is_string, "should be active")
                .attribute("variables", predicates::is_array_of_strings, "should be an array of strings")
                .attribute("changes", predicates::is_array_of_strings, "should be an array of strings")
        })
    }
}

impl FromNode for Policy {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("policy")),
        }
    }
}

impl Entry for Policy {
    node!();

    /// Hash form, a bare list of refs becomes `{refs: [...]}`
    fn value(&self) -> Value {
        match self.node.config() {
            refs @ Value::Array(_) => [("refs", refs.clone())].into_iter().collect(),
            config => config.clone(),
        }
    }
}
