use crate::entry::{node, Entry, FromNode, Node, Validator};
use crate::limits::TIMEOUT_LIMIT;
use crate::util::parse_duration;
use crate::value::Value;

/// Job timeout, a human readable duration of at most one month
#[derive(Debug)]
pub struct Timeout {
    node: Node,
}

impl Timeout {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new().check(|node, report| {
                match node.config().as_str().and_then(parse_duration) {
                    None => report.add("config", "should be a duration"),
                    Some(seconds) if seconds > TIMEOUT_LIMIT => {
                        report.add("config", "should not exceed the limit")
                    }
                    Some(_) => {}
                }
            })
        })
    }

    /// Timeout in seconds
    pub fn seconds(&self) -> Option<u64> {
        self.node.config().as_str().and_then(parse_duration)
    }
}

impl FromNode for Timeout {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("timeout")),
        }
    }
}

impl Entry for Timeout {
    node!();

    fn value(&self) -> Value {
        self.node.config().clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn timeout(config: &str) -> Timeout {
        Timeout::from_node(Node::new(config.into()).with_key("timeout"))
    }

    #[test]
    fn valid() {
        let entry = timeout("1h 30m");
        assert!(entry.is_valid());
        assert_eq!(entry.seconds(), Some(5400));
    }

    #[test]
    fn invalid() {
        assert_eq!(timeout("soon").errors(), vec!["timeout config should be a duration"]);
        assert_eq!(
            timeout("2 months").errors(),
            vec!["timeout config should not exceed the limit"]
        );
    }
}
