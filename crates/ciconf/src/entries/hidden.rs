use crate::entry::{node, Entry, FromNode, Node};

/// A job whose name starts with a dot. It is kept out of the pipeline and only serves as a
/// template for other jobs.
#[derive(Debug)]
pub struct Hidden {
    node: Node,
}

impl Hidden {
    pub fn is_hidden(name: &str) -> bool {
        name.starts_with('.')
    }
}

impl FromNode for Hidden {
    fn from_node(node: Node) -> Self {
        Self {
            node: node.named("hidden"),
        }
    }
}

impl Entry for Hidden {
    node!();

    fn is_relevant(&self) -> bool {
        false
    }
}
