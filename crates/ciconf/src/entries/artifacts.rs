use crate::entry::{node, predicates, Entry, FromNode, Node, Validator};
use crate::util::parse_duration;
use crate::value::Value;

const WHEN: &[&str] = &["on_success", "on_failure", "always"];
const ACCESS: &[&str] = &["all", "developer", "none"];

/// Files and reports kept after a job finishes
#[derive(Debug)]
pub struct Artifacts {
    node: Node,
}

impl Artifacts {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new()
                .config(predicates::is_hash, "should be a hash")
                .allowed_keys(&[
                    "name",
                    "untracked",
                    "paths",
                    "exclude",
                    "reports",
                    "when",
                    "expire_in",
                    "expose_as",
                    "public",
                    "access",
                ])
                .attribute("name", predicates::is_string, "should be a string")
                .attribute("untracked", predicates::is_boolean, "should be a boolean value")
                .attribute("paths", predicates::is_array_of_strings, "should be an array of strings")
                .attribute("exclude", predicates::is_array_of_strings, "should be an array of strings")
                .attribute("reports", is_reports, "should be a hash of strings or arrays of strings")
                .inclusion("when", WHEN, "should be on_success, on_failure or always")
                .attribute("expire_in", is_expire_in, "should be a duration")
                .attribute("expose_as", predicates::is_string, "should be a string")
                .check(|node, report| {
                    if node.has_attribute("expose_as") && !node.has_attribute("paths") {
                        report.add("expose_as", "can't be used without paths");
                    }
                })
                .attribute("public", predicates::is_boolean, "should be a boolean value")
                .inclusion("access", ACCESS, "should be one of: all, developer, none")
                .mutually_exclusive_keys(&["public", "access"])
        })
    }
}

fn is_reports(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|reports| reports.values().all(predicates::is_array_of_strings_or_string))
}

fn is_expire_in(value: &Value) -> bool {
    value
        .as_str()
        .is_some_and(|value| value == "never" || parse_duration(value).is_some())
}

impl FromNode for Artifacts {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("artifacts")),
        }
    }
}

impl Entry for Artifacts {
    node!();

    /// The artifacts with every report path list as an array
    fn value(&self) -> Value {
        let Some(artifacts) = self.node.config().as_object() else {
            return self.node.config().clone();
        };
        let mut artifacts = artifacts.clone();
        if let Some(Value::Object(reports)) = artifacts.get_mut("reports") {
            for paths in reports.values_mut() {
                if paths.is_string() {
                    *paths = Value::Array(vec![paths.clone()]);
                }
            }
        }
        artifacts.into()
    }
}
