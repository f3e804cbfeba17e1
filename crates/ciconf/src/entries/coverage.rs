use crate::entry::{node, Entry, FromNode, Node, Validator};
use crate::value::Value;
use regex::Regex;

/// Regular expression used to extract code coverage from the job log, written as `/.../`
#[derive(Debug)]
pub struct Coverage {
    node: Node,
}

fn pattern(config: &Value) -> Option<&str> {
    config
        .as_str()?
        .strip_prefix('/')?
        .strip_suffix('/')
        .filter(|pattern| !pattern.is_empty())
}

impl Coverage {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new().check(|node, report| {
                let Some(pattern) = pattern(node.config()) else {
                    report.add("config", "must be a regular expression");
                    return;
                };
                if Regex::new(pattern).is_err() {
                    report.add("config", "must be a regular expression");
                }
            })
        })
    }
}

impl FromNode for Coverage {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("coverage")),
        }
    }
}

impl Entry for Coverage {
    node!();

    /// The pattern without its slashes
    fn value(&self) -> Value {
        pattern(self.node.config()).map(Value::from).unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn coverage(config: &str) -> Coverage {
        Coverage::from_node(Node::new(config.into()).with_key("coverage"))
    }

    #[test]
    fn slashes_are_stripped() {
        let entry = coverage(r"/Code coverage: \d+\.\d+/");
        assert!(entry.is_valid());
        assert_eq!(entry.value(), Value::from(r"Code coverage: \d+\.\d+"));
    }

    #[test]
    fn invalid() {
        for config in ["Code coverage", "/(/", "//"] {
            assert_eq!(
                coverage(config).errors(),
                vec!["coverage config must be a regular expression"],
                "{config}"
            );
        }
    }
}
