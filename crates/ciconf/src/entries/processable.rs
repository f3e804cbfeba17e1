//! Behavior shared by jobs and bridges
//!
//! Both declare their children in a static table and differ in the keys they accept. Everything
//! that depends on the rest of the document happens in [compose]: removal of the implicit
//! `only:`/`except:` when rules are in play and inheritance from `default:`.
use crate::entries::{Inherit, Needs};
use crate::entry::{ComposeError, Deps, Entries, EntryDecl, Inherited, Node, Validator};
use crate::limits::JOB_NAME_LIMIT;
use crate::value::{Map, Value};

/// Keys that may not be combined with `rules:`
const CLASHING_WITH_RULES: &[&str] = &["only", "except", "start_in"];

/// Checks shared by jobs and bridges
pub(crate) fn validations(validator: Validator) -> Validator {
    validator
        .check(|node, report| {
            if node.config().is_blank() {
                report.add("config", "can't be blank");
            } else if !node.config().is_object() {
                report.add("config", "should be a hash");
            }
        })
        .check(|node, report| {
            let name = node.key().unwrap_or_default();
            if name.trim().is_empty() {
                report.add("name", "can't be blank");
            } else if name.chars().count() > JOB_NAME_LIMIT {
                report.add(
                    "name",
                    format!("is too long (maximum is {JOB_NAME_LIMIT} characters)"),
                );
            }
        })
        .mutually_exclusive_keys(&["script", "trigger", "run"])
        .check(|node, report| {
            if !node.has_attribute("rules") {
                return;
            }
            let clashing: Vec<_> = CLASHING_WITH_RULES
                .iter()
                .copied()
                .filter(|key| node.has_attribute(key))
                .collect();
            if !clashing.is_empty() {
                report.add(
                    "config",
                    format!("key may not be used with `rules`: {}", clashing.join(", ")),
                );
            }
        })
        .attribute(
            "extends",
            crate::entry::predicates::is_array_of_strings_or_string,
            "should be an array of strings or a string",
        )
        .attribute("resource_group", crate::entry::predicates::is_string, "should be a string")
        .attribute(
            "allow_failure",
            crate::entry::predicates::is_hash_or_boolean,
            "should be a hash or a boolean value",
        )
}

/// Build and compose the children of a job or bridge
pub(crate) fn compose(
    node: &mut Node,
    decls: &'static [EntryDecl],
    deps: Option<&Deps<'_>>,
) -> Result<Entries, ComposeError> {
    let mut entries = Entries::build(node, decls)?;

    let has_workflow_rules = deps.is_some_and(Deps::has_workflow_rules);
    if node.has_attribute("rules") || has_workflow_rules {
        // the implicit `only: [branches, tags]` does not apply
        for key in ["only", "except"] {
            if !entries.is_specified(key) {
                entries.remove(key);
            }
        }
    }

    if let Some(default) = deps.and_then(|deps| deps.default) {
        let inherit = entries.value("inherit");
        for decl in decls.iter().filter(|decl| decl.inherit) {
            if entries.is_specified(decl.key) || !Inherit::inherits_default(&inherit, decl.key) {
                continue;
            }
            if let Some(entry) = default.get(decl.key).filter(|entry| entry.is_specified()) {
                tracing::trace!(job = node.key(), key = decl.key, "inherited from default");
                entries.insert(decl.key, Inherited::boxed(entry));
            }
        }
    }

    entries.compose(deps)?;

    if !has_workflow_rules {
        warn_about_rules(node, &entries);
    }
    Ok(entries)
}

/// Jobs whose last rule is a bare `when:` create pipelines for every trigger of a push
fn warn_about_rules(node: &mut Node, entries: &Entries) {
    let Some(rules) = entries.get("rules").filter(|rules| rules.is_specified() && rules.is_valid()) else {
        return;
    };
    let last_rule = rules.value().as_array().and_then(|rules| rules.last().cloned());
    let Some(Value::Object(rule)) = last_rule else {
        return;
    };

    let when = rule.get("when").and_then(Value::as_str);
    if rule.len() == 1 && when.is_some_and(|when| when != "never") {
        node.warn(
            "may allow multiple pipelines to run for a single action due to `rules:when` clause \
             with no `workflow:rules`",
        );
    }
}

/// Value shared by jobs and bridges
pub(crate) fn value(node: &Node, entries: &Entries) -> Map {
    let inherit = entries.value("inherit");
    let environment = entries.specified_value("environment");

    let mut value = Map::new();
    value.insert("name".into(), node.key().map(Value::from).unwrap_or_default());
    value.insert("stage".into(), entries.value("stage"));
    value.insert("extends".into(), node.attribute("extends").cloned().unwrap_or_default());
    value.insert("rules".into(), entries.specified_value("rules"));
    value.insert(
        "job_variables".into(),
        entries
            .get("variables")
            .map(|variables| variables.value_with_data())
            .unwrap_or_default(),
    );
    value.insert("root_variables_inheritance".into(), Inherit::variables(&inherit));
    value.insert("only".into(), entries.value("only"));
    value.insert("except".into(), entries.value("except"));
    value.insert("resource_group".into(), node.attribute("resource_group").cloned().unwrap_or_default());
    value.insert("environment".into(), environment.get("name").cloned().unwrap_or_default());
    value.insert("environment_options".into(), environment);
    value
}

/// `ignore:` a failure of this job does not fail the pipeline
pub(crate) fn ignored(node: &Node, entries: &Entries) -> bool {
    match entries.specified_value("allow_failure") {
        Value::Boolean(allow_failure) => allow_failure,
        Value::Null => node.attribute("when").and_then(Value::as_str) == Some("manual"),
        _ => false,
    }
}

/// `needs:` value and the matching scheduling type
pub(crate) fn needs(entries: &Entries) -> (Value, Value) {
    let needs = entries.specified_value("needs");
    let scheduling_type = if needs.is_null() { "stage" } else { "dag" };
    (needs, scheduling_type.into())
}

/// Names of the jobs of this pipeline listed under `needs:`
pub(crate) fn needed_jobs(entries: &Entries) -> Vec<String> {
    Needs::job_names(&entries.specified_value("needs"))
}
