use crate::entry::{node, predicates, Entry, FromNode, Node, Validator};
use crate::limits::TAGS_LIMIT;

/// Runner tags
#[derive(Debug)]
pub struct Tags {
    node: Node,
}

impl Tags {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new()
                .config(predicates::is_array_of_strings, "should be an array of strings")
                .check(|node, report| {
                    if node.config().as_array().is_some_and(|tags| tags.len() > TAGS_LIMIT) {
                        report.add(
                            "config",
                            format!("must be less than the limit of {TAGS_LIMIT} tags"),
                        );
                    }
                })
        })
    }
}

impl FromNode for Tags {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("tags")),
        }
    }
}

impl Entry for Tags {
    node!();
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn tags() {
        let entry = Tags::from_node(Node::new(config!("[docker, ruby]")).with_key("tags"));
        assert!(entry.is_valid());

        let entry = Tags::from_node(Node::new(config!("[docker, 1]")).with_key("tags"));
        assert_eq!(entry.errors(), vec!["tags config should be an array of strings"]);
    }

    #[test]
    fn limit() {
        let tags: Vec<_> = (0..=TAGS_LIMIT).map(|i| format!("tag-{i}")).collect();
        let entry = Tags::from_node(Node::new(Value::from(tags)).with_key("tags"));
        assert_eq!(
            entry.errors(),
            vec!["tags config must be less than the limit of 50 tags"]
        );
    }
}
