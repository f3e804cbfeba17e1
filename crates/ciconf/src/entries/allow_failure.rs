use crate::entry::{node, predicates, Entry, FromNode, Node, Validator};
use crate::value::Value;

/// `allow_failure:` of a job, `true`/`false` or `{exit_codes: ...}`
#[derive(Debug)]
pub struct AllowFailure {
    node: Node,
}

impl AllowFailure {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new()
                .config(predicates::is_hash_or_boolean, "should be a hash or a boolean value")
                .allowed_keys(&["exit_codes"])
                .check(|node, report| {
                    let valid = node
                        .attribute("exit_codes")
                        .is_some_and(predicates::is_array_of_integers_or_integer);
                    if node.config().is_object() && !valid {
                        report.add("exit_codes", "should be an array of integers or an integer");
                    }
                })
        })
    }

    /// Exit codes that are allowed to fail, `None` for the boolean form
    pub fn exit_codes(&self) -> Option<Vec<Value>> {
        match self.node.attribute("exit_codes")? {
            Value::Array(codes) => Some(codes.clone()),
            code => Some(vec![code.clone()]),
        }
    }
}

impl FromNode for AllowFailure {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("allow_failure")),
        }
    }
}

impl Entry for AllowFailure {
    node!();

    fn value(&self) -> Value {
        match self.exit_codes() {
            Some(codes) => [("exit_codes", Value::from(codes))].into_iter().collect(),
            None => self.node.config().clone(),
        }
    }
}
