//! A job that runs a script
use super::processable;
use crate::entries::{
    policy, AllowFailure, Artifacts, Boolean, Caches, Commands, Coverage, Environment, Hooks,
    IdTokens, Image, Inherit, Needs, Parallel, Policy, Release, Retry, Rules, Run, Services, Stage,
    Tags, Timeout, Variables,
};
use crate::entry::{
    attributes, construct, node, predicates, ComposeError, Deps, Entries, Entry, EntryDecl,
    FromNode, Metadata, Node, Validator,
};
use crate::limits::START_IN_LIMIT;
use crate::util::parse_duration;
use crate::value::{Map, Value};

pub const JOB_WHEN: &[&str] = &["on_success", "on_failure", "always", "manual", "delayed"];

const JOB_KEYS: &[&str] = &[
    "tags",
    "script",
    "run",
    "image",
    "services",
    "start_in",
    "artifacts",
    "cache",
    "dependencies",
    "before_script",
    "after_script",
    "hooks",
    "coverage",
    "retry",
    "parallel",
    "interruptible",
    "timeout",
    "id_tokens",
    "extends",
    "stage",
    "only",
    "except",
    "rules",
    "variables",
    "inherit",
    "allow_failure",
    "when",
    "needs",
    "resource_group",
    "environment",
    "release",
];

const NEEDS: Metadata = Metadata {
    allowed_needs: Some(&["job", "pipeline"]),
    ..Metadata::EMPTY
};

const VARIABLES: Metadata = Metadata {
    allowed_value_data: Some(&["value", "expand"]),
    ..Metadata::EMPTY
};

const JOB_ENTRIES: &[EntryDecl] = &[
    EntryDecl::new("before_script", construct::<Commands>, "Global before script overridden in this job.").inherit(),
    EntryDecl::new("script", construct::<Commands>, "Commands that will be executed in this job."),
    EntryDecl::new("run", construct::<Run>, "Steps that will be executed in this job."),
    EntryDecl::new("stage", construct::<Stage>, "Pipeline stage this job will be executed into."),
    EntryDecl::new("after_script", construct::<Commands>, "Commands that will be executed when finishing job.").inherit(),
    EntryDecl::new("hooks", construct::<Hooks>, "Commands that will be executed on Runner before/after some events.").inherit(),
    EntryDecl::new("cache", construct::<Caches>, "Cache definition for this job.").inherit(),
    EntryDecl::new("image", construct::<Image>, "Image that will be used to execute this job.").inherit(),
    EntryDecl::new("services", construct::<Services>, "Services that will be used to execute this job.").inherit(),
    EntryDecl::new("only", construct::<Policy>, "Refs policy this job will be executed for.").default(policy::default_only),
    EntryDecl::new("except", construct::<Policy>, "Refs policy this job will be executed for."),
    EntryDecl::new("rules", construct::<Rules>, "List of evaluable Rules to determine job inclusion.").metadata(Rules::JOB),
    EntryDecl::new("needs", construct::<Needs>, "Needs configuration for this job.").metadata(NEEDS),
    EntryDecl::new("variables", construct::<Variables>, "Environment variables available for this job.").metadata(VARIABLES),
    EntryDecl::new("inherit", construct::<Inherit>, "Indicates whether to inherit defaults or not."),
    EntryDecl::new("environment", construct::<Environment>, "Environment configuration for this job."),
    EntryDecl::new("allow_failure", construct::<AllowFailure>, "Indicates whether this job is allowed to fail or not."),
    EntryDecl::new("artifacts", construct::<Artifacts>, "Artifacts configuration for this job.").inherit(),
    EntryDecl::new("coverage", construct::<Coverage>, "Coverage configuration for this job."),
    EntryDecl::new("retry", construct::<Retry>, "Retry configuration for this job.").inherit(),
    EntryDecl::new("parallel", construct::<Parallel>, "Parallel configuration for this job."),
    EntryDecl::new("interruptible", construct::<Boolean>, "Set jobs interruptible value.").inherit(),
    EntryDecl::new("timeout", construct::<Timeout>, "Timeout duration of this job.").inherit(),
    EntryDecl::new("tags", construct::<Tags>, "Set the tags.").inherit(),
    EntryDecl::new("id_tokens", construct::<IdTokens>, "Configuration of JWT tokens").inherit(),
    EntryDecl::new("release", construct::<Release>, "This job will produce a release."),
];

/// A regular job
#[derive(Debug)]
pub struct Job {
    node: Node,
    entries: Entries,
}

attributes!(Job {
    when => "when",
    start_in => "start_in",
    dependencies => "dependencies",
});

impl Job {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            processable::validations(Validator::new())
                .allowed_keys(JOB_KEYS)
                .check(|node, report| {
                    if node.config().is_object() && !node.has_attribute("run") {
                        let script = node.attribute("script");
                        if script.map_or(true, Value::is_blank) {
                            report.add("script", "can't be blank");
                        }
                    }
                })
                .attribute("when", predicates::is_string, "should be a string")
                .inclusion(
                    "when",
                    JOB_WHEN,
                    "should be one of: on_success, on_failure, always, manual, delayed",
                )
                .attribute("dependencies", predicates::is_array_of_strings, "should be an array of strings")
                .check(|node, report| {
                    let delayed = node.attribute("when").and_then(Value::as_str) == Some("delayed");
                    if delayed {
                        match node.attribute("start_in").and_then(Value::as_str).and_then(parse_duration) {
                            None => report.add("start_in", "should be a duration"),
                            Some(seconds) if seconds > START_IN_LIMIT => {
                                report.add("start_in", "should not exceed the limit")
                            }
                            Some(_) => {}
                        }
                    }
                    // combined with `rules:` this is reported as a clash
                    if !delayed && !node.has_attribute("rules") && node.has_attribute("start_in") {
                        report.add("start_in", "must be blank");
                    }
                })
        })
    }

    /// `dependencies:` must be a subset of the jobs listed under `needs:`
    fn validate_dependencies(&mut self) {
        let Some(dependencies) = self.dependencies().and_then(Value::as_strings) else {
            return;
        };
        if !self.entries.is_specified("needs") {
            return;
        }

        let needed = processable::needed_jobs(&self.entries);
        let pipeline_needs = self.entries.value("needs").get("pipeline").is_some();
        if needed.is_empty() && pipeline_needs {
            self.node.error("needs", "corresponding to dependencies must be from the same pipeline");
            return;
        }

        let missing: Vec<_> = dependencies
            .iter()
            .filter(|dependency| !needed.contains(dependency))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            let message = format!("the {} should be part of needs", missing.join(", "));
            self.node.error("dependencies", message);
        }
    }
}

impl FromNode for Job {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("job")),
            entries: Entries::default(),
        }
    }
}

impl Entry for Job {
    node!();

    fn compose(&mut self, deps: Option<&Deps<'_>>) -> Result<(), ComposeError> {
        if self.node.has_errors() {
            return Ok(());
        }
        self.entries = processable::compose(&mut self.node, JOB_ENTRIES, deps)?;
        self.validate_dependencies();
        Ok(())
    }

    fn value(&self) -> Value {
        let entries = &self.entries;
        let mut value = processable::value(&self.node, entries);
        let (needs, scheduling_type) = processable::needs(entries);

        let allow_failure_criteria = match entries.specified_value("allow_failure") {
            criteria @ Value::Object(_) => criteria,
            _ => Value::Null,
        };
        let timeout = entries
            .specified_value("timeout")
            .as_str()
            .and_then(parse_duration)
            .map(Value::from)
            .unwrap_or_default();

        let job: Map = [
            ("before_script", entries.specified_value("before_script")),
            ("script", entries.specified_value("script")),
            ("run", entries.specified_value("run")),
            ("image", entries.specified_value("image")),
            ("services", entries.specified_value("services")),
            ("cache", entries.specified_value("cache")),
            ("tags", entries.specified_value("tags")),
            ("when", self.when().cloned().unwrap_or_default()),
            ("start_in", self.start_in().cloned().unwrap_or_default()),
            ("dependencies", self.dependencies().cloned().unwrap_or_default()),
            ("coverage", entries.specified_value("coverage")),
            ("retry", entries.specified_value("retry")),
            ("parallel", entries.specified_value("parallel")),
            ("interruptible", entries.specified_value("interruptible")),
            ("timeout", timeout),
            ("artifacts", entries.specified_value("artifacts")),
            ("after_script", entries.specified_value("after_script")),
            ("hooks", entries.specified_value("hooks")),
            ("ignore", processable::ignored(&self.node, entries).into()),
            ("allow_failure_criteria", allow_failure_criteria),
            ("needs", needs),
            ("scheduling_type", scheduling_type),
            ("id_tokens", entries.specified_value("id_tokens")),
            ("release", entries.specified_value("release")),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect();

        value.extend(job);
        Value::from(value).compact()
    }

    fn descendants(&self) -> Vec<&dyn Entry> {
        self.entries.descendants()
    }
}
