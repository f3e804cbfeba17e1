//! `trigger:` of a bridge job
use crate::entry::{node, predicates, Entry, FromNode, Node, Validator};
use crate::value::{Map, Value};

const STRATEGIES: &[&str] = &["depend", "mirror"];

/// Downstream pipeline started by a bridge: a project path or a hash describing a multi-project
/// or child pipeline
#[derive(Debug)]
pub struct Trigger {
    node: Node,
}

impl Trigger {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new()
                .check(|node, report| match node.config() {
                    Value::String(project) if project.trim().is_empty() => {
                        report.add("config", "can't be blank")
                    }
                    Value::String(_) => {}
                    Value::Object(_) => {
                        if !node.has_attribute("project") && !node.has_attribute("include") {
                            report.add("config", "must specify either project or include");
                        }
                    }
                    _ => report.add("", "has to be either a string or a hash"),
                })
                .allowed_keys(&["project", "branch", "strategy", "forward", "include"])
                .mutually_exclusive_keys(&["project", "include"])
                .attribute("project", predicates::is_string, "should be a string")
                .attribute("branch", predicates::is_string, "should be a string")
                .inclusion("strategy", STRATEGIES, "should be depend or mirror")
                .attribute(
                    "include",
                    predicates::is_array_of_strings_or_string,
                    "should be a string or an array",
                )
                .check(|node, report| {
                    let Some(forward) = node.attribute("forward") else {
                        return;
                    };
                    let valid = forward.as_object().is_some_and(|forward| {
                        forward.iter().all(|(key, value)| {
                            matches!(key.as_str(), "yaml_variables" | "pipeline_variables")
                                && value.is_boolean()
                        })
                    });
                    if !valid {
                        report.add(
                            "forward",
                            "should be a hash of yaml_variables and pipeline_variables flags",
                        );
                    }
                })
        })
    }

    /// Project path of a multi-project pipeline
    pub fn project(&self) -> Option<&str> {
        match self.node.config() {
            Value::String(project) => Some(project),
            config => config.get("project").and_then(Value::as_str),
        }
    }
}

impl FromNode for Trigger {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("trigger")),
        }
    }
}

impl Entry for Trigger {
    node!();

    /// Hash form with `forward:` defaults filled in
    fn value(&self) -> Value {
        let mut value = match self.node.config() {
            Value::String(project) => Map::from([("project".to_string(), Value::from(project.as_str()))]),
            config => config.as_object().cloned().unwrap_or_default(),
        };

        let mut forward = Map::from([
            ("yaml_variables".to_string(), Value::from(true)),
            ("pipeline_variables".to_string(), Value::from(false)),
        ]);
        if let Some(Value::Object(given)) = value.get("forward") {
            forward.extend(given.clone());
        }
        value.insert("forward".into(), forward.into());
        value.into()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config;
    use pretty_assertions::assert_eq;

    fn trigger(config: Value) -> Trigger {
        Trigger::from_node(Node::new(config).with_key("trigger"))
    }

    #[test]
    fn project() {
        let entry = trigger(config!("my/project"));
        assert!(entry.is_valid());
        assert_eq!(entry.project(), Some("my/project"));
        assert_eq!(
            entry.value(),
            config!("{project: my/project, forward: {yaml_variables: true, pipeline_variables: false}}")
        );
    }

    #[test]
    fn child_pipeline() {
        let entry = trigger(config!("{include: child.yml, strategy: depend, forward: {pipeline_variables: true}}"));
        assert!(entry.is_valid());
        assert_eq!(
            entry.value().get("forward"),
            Some(&config!("{yaml_variables: true, pipeline_variables: true}"))
        );
    }

    #[test]
    fn invalid() {
        assert_eq!(trigger(config!("''")).errors(), vec!["trigger config can't be blank"]);
        assert_eq!(
            trigger(config!("{branch: main, strategy: wait}")).errors(),
            vec![
                "trigger config must specify either project or include",
                "trigger strategy should be depend or mirror",
            ]
        );
        assert_eq!(
            trigger(config!("[a]")).errors(),
            vec!["trigger has to be either a string or a hash"]
        );
    }
}
