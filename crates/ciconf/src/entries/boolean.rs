use crate::entry::{node, predicates, Entry, FromNode, Node, Validator};

/// A plain boolean flag (`interruptible`, `untracked`, ...)
#[derive(Debug)]
pub struct Boolean {
    node: Node,
}

impl FromNode for Boolean {
    fn from_node(node: Node) -> Self {
        let validator = crate::validator!(|| {
            Validator::new().config(predicates::is_boolean, "should be a boolean value")
        });
        Self {
            node: validator.validated(node.named("boolean")),
        }
    }
}

impl Entry for Boolean {
    node!();
}
