use crate::entry::{node, predicates, Entry, FromNode, Node, Report, Validator};
use crate::limits::RETRY_MAX;
use crate::value::{Map, Value};

/// Failure reasons a retry can be limited to
pub const RETRY_WHEN: &[&str] = &[
    "always",
    "unknown_failure",
    "script_failure",
    "api_failure",
    "stuck_or_timeout_failure",
    "runner_system_failure",
    "runner_unsupported",
    "stale_schedule",
    "job_execution_timeout",
    "archived_failure",
    "unmet_prerequisites",
    "scheduler_failure",
    "data_integrity_failure",
    "missing_dependency_failure",
];

/// Automatic retries of a failed job: a count, or `{max:, when:, exit_codes:}`
#[derive(Debug)]
pub struct Retry {
    node: Node,
}

fn check_max(attribute: &str, max: &Value, report: &mut Report) {
    match max.as_i64() {
        None => report.add(attribute, "must be an integer"),
        Some(max) if max < 0 => report.add(attribute, "must be greater than or equal to 0"),
        Some(max) if max > RETRY_MAX => {
            report.add(attribute, format!("must be less than or equal to {RETRY_MAX}"))
        }
        Some(_) => {}
    }
}

fn check_when(when: &Value, report: &mut Report) {
    let reasons = match when {
        Value::String(reason) => vec![reason.clone()],
        when => match when.as_strings() {
            Some(reasons) => reasons,
            None => {
                report.add("when", "should be an array of strings or a string");
                return;
            }
        },
    };

    let unknown: Vec<_> = reasons
        .iter()
        .filter(|reason| !RETRY_WHEN.contains(&reason.as_str()))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        report.add("when", format!("contains unknown values: {}", unknown.join(", ")));
    }
}

impl Retry {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new()
                .check(|node, report| match node.config() {
                    Value::Integer(_) => check_max("config", node.config(), report),
                    Value::Object(_) => {
                        if let Some(max) = node.attribute("max") {
                            check_max("max", max, report);
                        }
                        if let Some(when) = node.attribute("when") {
                            check_when(when, report);
                        }
                    }
                    _ => report.add("config", "has to be either an integer or a hash"),
                })
                .allowed_keys(&["max", "when", "exit_codes"])
                .attribute(
                    "exit_codes",
                    predicates::is_array_of_integers_or_integer,
                    "should be an array of integers or an integer",
                )
        })
    }
}

impl FromNode for Retry {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("retry")),
        }
    }
}

impl Entry for Retry {
    node!();

    /// `{max:, when: [...], exit_codes: [...]}`, scalars wrapped in arrays
    fn value(&self) -> Value {
        let config = self.node.config();
        if config.is_integer() {
            return [("max", config.clone())].into_iter().collect();
        }

        let mut value = Map::new();
        value.insert("max".into(), config.get("max").cloned().unwrap_or_default());
        for key in ["when", "exit_codes"] {
            let list = match config.get(key) {
                Some(Value::Array(list)) => Value::Array(list.clone()),
                Some(scalar) => Value::Array(vec![scalar.clone()]),
                None => Value::Null,
            };
            value.insert(key.into(), list);
        }
        Value::from(value).compact()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config;
    use pretty_assertions::assert_eq;

    fn retry(config: Value) -> Retry {
        Retry::from_node(Node::new(config).with_key("retry"))
    }

    #[test]
    fn count() {
        let entry = retry(config!("2"));
        assert!(entry.is_valid());
        assert_eq!(entry.value(), config!("max: 2"));
        assert_eq!(
            retry(config!("3")).errors(),
            vec!["retry config must be less than or equal to 2"]
        );
    }

    #[test]
    fn hash() {
        let entry = retry(config!("{max: 1, when: script_failure, exit_codes: 137}"));
        assert!(entry.is_valid());
        assert_eq!(
            entry.value(),
            config!("{max: 1, when: [script_failure], exit_codes: [137]}")
        );
    }

    #[test]
    fn invalid() {
        let entry = retry(config!("{max: -1, when: [always, on_monday], exit_codes: [one], unknown: 1}"));
        assert_eq!(
            entry.errors(),
            vec![
                "retry max must be greater than or equal to 0",
                "retry when contains unknown values: on_monday",
                "retry config contains unknown keys: unknown",
                "retry exit codes should be an array of integers or an integer",
            ]
        );
        assert_eq!(
            retry(config!("always")).errors(),
            vec!["retry config has to be either an integer or a hash"]
        );
    }
}
