//! `rules:` of jobs, bridges and `workflow:`
use crate::entry::{node, predicates, ComposeError, Deps, Entry, FromNode, Metadata, Node, Validator};
use crate::limits::{MAX_NESTING_DEPTH, RULE_EXISTS_LIMIT, START_IN_LIMIT};
use crate::util::{self, parse_duration};
use crate::value::Value;

/// `when:` values of job rules
pub const JOB_RULE_WHEN: &[&str] = &[
    "on_success",
    "on_failure",
    "always",
    "never",
    "manual",
    "delayed",
];

/// `when:` values of workflow rules
pub const WORKFLOW_RULE_WHEN: &[&str] = &["always", "never"];

const RULE_KEYS: &[&str] = &[
    "if",
    "changes",
    "exists",
    "when",
    "start_in",
    "allow_failure",
    "variables",
    "needs",
    "interruptible",
];

/// A single rule
#[derive(Debug)]
pub struct Rule {
    node: Node,
}

impl Rule {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new()
                .config(predicates::is_hash, "should be a hash")
                .allowed_keys(RULE_KEYS)
                .attribute("if", predicates::is_string, "should be a string")
                .attribute("changes", is_changes, "should be an array of strings or a hash with paths")
                .attribute("exists", predicates::is_array_of_strings_or_string, "should be an array of strings or a string")
                .check(|node, report| {
                    let too_many = node
                        .attribute("exists")
                        .and_then(Value::as_array)
                        .is_some_and(|exists| exists.len() > RULE_EXISTS_LIMIT);
                    if too_many {
                        report.add("exists", format!("has too many entries (maximum {RULE_EXISTS_LIMIT})"));
                    }
                })
                .check(|node, report| {
                    let Some(when) = node.attribute("when") else {
                        return;
                    };
                    let allowed = node.metadata().allowed_when.unwrap_or(JOB_RULE_WHEN);
                    match when.as_str() {
                        Some(when) if allowed.contains(&when) => {}
                        Some(when) => report.add("when", format!("unknown value: {when}")),
                        None => report.add("when", "should be a string"),
                    }
                })
                .check(|node, report| {
                    let delayed = node.attribute("when").and_then(Value::as_str) == Some("delayed");
                    match (delayed, node.attribute("start_in")) {
                        (true, None) => report.add("start_in", "can't be blank"),
                        (true, Some(start_in)) => match start_in.as_str().and_then(parse_duration) {
                            None => report.add("start_in", "should be a duration"),
                            Some(seconds) if seconds > START_IN_LIMIT => {
                                report.add("start_in", "should not exceed the limit")
                            }
                            Some(_) => {}
                        },
                        (false, Some(_)) => report.add("config", "disallowed keys: start_in"),
                        (false, None) => {}
                    }
                })
                .attribute("allow_failure", predicates::is_boolean, "should be a boolean value")
                .attribute("interruptible", predicates::is_boolean, "should be a boolean value")
                .attribute("variables", is_variables, "should be a hash of key value pairs")
                .attribute("needs", |needs| needs.is_array(), "should be an array")
        })
    }
}

fn is_changes(value: &Value) -> bool {
    match value {
        Value::Object(changes) => {
            changes.keys().all(|key| key == "paths" || key == "compare_to")
                && changes.get("paths").is_some_and(predicates::is_array_of_strings)
                && changes.get("compare_to").map_or(true, Value::is_string)
        }
        value => predicates::is_array_of_strings(value),
    }
}

fn is_variables(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|variables| variables.values().all(|value| value.to_scalar_string().is_some()))
}

impl FromNode for Rule {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("rule")),
        }
    }
}

impl Entry for Rule {
    node!();

    /// The rule with `changes:` normalized to `{paths: [...]}`
    fn value(&self) -> Value {
        let Some(rule) = self.node.config().as_object() else {
            return self.node.config().clone();
        };
        let mut rule = rule.clone();
        if let Some(changes) = rule.get_mut("changes") {
            if changes.is_array() {
                *changes = [("paths", changes.clone())].into_iter().collect();
            }
        }
        if let Some(exists) = rule.get_mut("exists") {
            if exists.is_string() {
                *exists = Value::Array(vec![exists.clone()]);
            }
        }
        rule.into()
    }
}

/// Ordered list of rules. Nested arrays of rules are flattened.
#[derive(Debug)]
pub struct Rules {
    node: Node,
    rules: Vec<Rule>,
}

impl Rules {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new().config(
                |config| util::flatten_values(config, MAX_NESTING_DEPTH).is_some(),
                "should be an array containing hashes and arrays of hashes",
            )
        })
    }

    /// Rules restricted to the `when:` values of workflow rules
    pub const WORKFLOW: Metadata = Metadata {
        allowed_when: Some(WORKFLOW_RULE_WHEN),
        ..Metadata::EMPTY
    };

    /// Rules of jobs and bridges
    pub const JOB: Metadata = Metadata {
        allowed_when: Some(JOB_RULE_WHEN),
        ..Metadata::EMPTY
    };
}

impl FromNode for Rules {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("rules")),
            rules: Vec::new(),
        }
    }
}

impl Entry for Rules {
    node!();

    fn compose(&mut self, _deps: Option<&Deps<'_>>) -> Result<(), ComposeError> {
        if self.node.has_errors() {
            return Ok(());
        }
        let Some(configs) = util::flatten_values(self.node.config(), MAX_NESTING_DEPTH) else {
            return Ok(());
        };

        let metadata = *self.node.metadata();
        self.rules = configs
            .into_iter()
            .map(|config| {
                let node = Node::new(config)
                    .with_ancestors(self.node.path())
                    .with_metadata(metadata);
                Rule::from_node(node)
            })
            .collect();
        Ok(())
    }

    fn value(&self) -> Value {
        self.rules.iter().map(Entry::value).collect::<Vec<_>>().into()
    }

    fn descendants(&self) -> Vec<&dyn Entry> {
        self.rules.iter().map(|rule| rule as &dyn Entry).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config;
    use pretty_assertions::assert_eq;

    fn rules(config: Value, metadata: Metadata) -> Rules {
        let node = Node::new(config).with_key("rules").with_metadata(metadata);
        let mut rules = Rules::from_node(node);
        rules.compose(None).unwrap();
        rules
    }

    #[test]
    fn nested_rules_are_flattened() {
        let entry = rules(
            config!(
                r#"
                - if: $CI_COMMIT_TAG
                  when: never
                - - changes: [Dockerfile]
                  - [{exists: Gemfile}]
                "#
            ),
            Rules::JOB,
        );
        assert!(entry.is_valid(), "{:?}", entry.errors());
        assert_eq!(
            entry.value(),
            config!(
                r#"
                - {if: $CI_COMMIT_TAG, when: never}
                - {changes: {paths: [Dockerfile]}}
                - {exists: [Gemfile]}
                "#
            )
        );
    }

    #[test]
    fn depth_limit() {
        let mut config = config!("[{when: always}]");
        for _ in 0..9 {
            config = Value::Array(vec![config]);
        }
        assert!(rules(config.clone(), Rules::JOB).is_valid());

        let config = Value::Array(vec![config]);
        assert_eq!(
            rules(config, Rules::JOB).errors(),
            vec!["rules config should be an array containing hashes and arrays of hashes"]
        );
    }

    #[test]
    fn not_an_array() {
        assert_eq!(
            rules(config!("if: $CI"), Rules::JOB).errors(),
            vec!["rules config should be an array containing hashes and arrays of hashes"]
        );
    }

    #[test]
    fn workflow_when() {
        let entry = rules(config!("[{if: $CI, when: manual}]"), Rules::WORKFLOW);
        assert_eq!(entry.errors(), vec!["rules:rule when unknown value: manual"]);
    }

    #[test]
    fn delayed_rules() {
        let entry = rules(
            config!("[{when: delayed, start_in: 2 weeks}, {when: delayed}, {start_in: 1 day}]"),
            Rules::JOB,
        );
        assert_eq!(
            entry.errors(),
            vec![
                "rules:rule start in should not exceed the limit",
                "rules:rule start in can't be blank",
                "rules:rule config disallowed keys: start_in",
            ]
        );
    }
}
