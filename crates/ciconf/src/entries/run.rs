//! `run:` steps, an alternative to `script:`
use crate::entry::{node, Entry, FromNode, Node, Report, Validator};
use crate::value::Value;

const STEP_PROPERTIES: &[&str] = &["name", "step", "script", "env", "inputs"];

/// Ordered steps. Problems are reported with the JSON pointer of the offending value.
#[derive(Debug)]
pub struct Run {
    node: Node,
}

fn check_step(index: usize, step: &Value, report: &mut Report) {
    let Some(properties) = step.as_object() else {
        report.add("", format!("value at `/{index}` is not an object"));
        return;
    };

    if !step.get("name").is_some_and(Value::is_string) {
        report.add("", format!("object at `/{index}` is missing required properties: name"));
    }

    match (properties.contains_key("step"), properties.contains_key("script")) {
        (false, false) => report.add(
            "",
            format!("object at `/{index}` is missing required properties: step"),
        ),
        (true, true) => report.add(
            "",
            format!("object property at `/{index}/script` is a disallowed additional property"),
        ),
        _ => {}
    }

    for property in properties.keys() {
        if !STEP_PROPERTIES.contains(&property.as_str()) {
            report.add(
                "",
                format!("object property at `/{index}/{property}` is a disallowed additional property"),
            );
        }
    }

    if let Some(env) = step.get("env") {
        match env.as_object() {
            Some(env) => {
                for (name, value) in env {
                    if !value.is_string() {
                        report.add("", format!("value at `/{index}/env/{name}` is not a string"));
                    }
                }
            }
            None => report.add("", format!("value at `/{index}/env` is not an object")),
        }
    }

    if step.get("inputs").is_some_and(|inputs| !inputs.is_object()) {
        report.add("", format!("value at `/{index}/inputs` is not an object"));
    }
}

impl FromNode for Run {
    fn from_node(node: Node) -> Self {
        let validator = crate::validator!(|| {
            Validator::new().check(|node, report| match node.config().as_array() {
                Some(steps) => {
                    for (index, step) in steps.iter().enumerate() {
                        check_step(index, step, report);
                    }
                }
                None => report.add("", "value at root is not an array"),
            })
        });
        Self {
            node: validator.validated(node.named("run")),
        }
    }
}

impl Entry for Run {
    node!();
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config;
    use pretty_assertions::assert_eq;

    fn run(config: Value) -> Run {
        Run::from_node(Node::new(config).with_key("run"))
    }

    #[test]
    fn steps() {
        let entry = run(config!(
            r#"
            - name: hello
              script: echo hello
            - name: release
              step: gitlab.com/components/release@v1
              env: {TOKEN: $TOKEN}
              inputs: {tag: v1}
            "#
        ));
        assert!(entry.is_valid(), "{:?}", entry.errors());
    }

    #[test]
    fn invalid() {
        assert_eq!(run(config!("name: hello")).errors(), vec!["run value at root is not an array"]);
        assert_eq!(
            run(config!("[{script: ls, env: {A: 1}, when: always}]")).errors(),
            vec![
                "run object at `/0` is missing required properties: name",
                "run object property at `/0/when` is a disallowed additional property",
                "run value at `/0/env/a` is not a string",
            ]
        );
    }
}
