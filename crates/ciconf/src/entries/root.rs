//! The document itself
//!
//! Top-level keywords are declared like the children of any other entry. Every remaining key is a
//! job: those are handed to [Jobs] once `default:` and `workflow:` are composed, so jobs can
//! inherit from them.
use crate::entries::stage::{POST_STAGE, PRE_STAGE};
use crate::entries::{
    Caches, DefaultEntry, Hidden, Image, Includes, Jobs, Script, Services, Stages, Variables,
    Workflow,
};
use crate::entry::{
    construct, node, predicates, ComposeError, Deps, Entries, Entry, EntryDecl, FromNode, Metadata,
    Node, Validator,
};
use crate::value::{Map, Value};

/// Keys that are never jobs
pub const RESERVED_KEYS: &[&str] = &[
    "include",
    "before_script",
    "image",
    "services",
    "after_script",
    "variables",
    "stages",
    "types",
    "cache",
    "default",
    "workflow",
];

const VARIABLES: Metadata = Metadata {
    allowed_value_data: Some(&["value", "description", "expand", "options"]),
    ..Metadata::EMPTY
};

const ROOT_ENTRIES: &[EntryDecl] = &[
    EntryDecl::new("include", construct::<Includes>, "List of external YAML files to include."),
    EntryDecl::new("before_script", construct::<Script>, "Script that will be executed before each job."),
    EntryDecl::new("image", construct::<Image>, "Docker image that will be used to execute jobs."),
    EntryDecl::new("services", construct::<Services>, "Docker images that will be linked to the container."),
    EntryDecl::new("after_script", construct::<Script>, "Script that will be executed after each job."),
    EntryDecl::new("variables", construct::<Variables>, "Environment variables that will be used.").metadata(VARIABLES),
    EntryDecl::new("stages", construct::<Stages>, "Configuration of stages for this pipeline."),
    EntryDecl::new("types", construct::<Stages>, "Deprecated: stages for this pipeline."),
    EntryDecl::new("cache", construct::<Caches>, "Configure caching between build jobs."),
];

/// Whether a top-level key is handed to [Jobs]
fn is_job(name: &str, config: &Value) -> bool {
    !RESERVED_KEYS.contains(&name) && (config.is_object() || Hidden::is_hidden(name))
}

#[derive(Debug)]
pub struct Root {
    node: Node,
    entries: Entries,
    default: Option<DefaultEntry>,
    workflow: Option<Workflow>,
    jobs: Option<Jobs>,
}

impl Root {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new()
                .config(predicates::is_hash, "should be a hash")
                .check(|node, report| {
                    let Some(config) = node.config().as_object() else {
                        return;
                    };
                    let unknown: Vec<_> = config
                        .iter()
                        .filter(|(name, config)| !RESERVED_KEYS.contains(&name.as_str()) && !is_job(name, config))
                        .map(|(name, _)| name.as_str())
                        .collect();
                    if !unknown.is_empty() {
                        report.add("config", format!("contains unknown keys: {}", unknown.join(", ")));
                    }
                })
        })
    }

    /// An empty document is an empty hash
    pub fn new(config: Value) -> Self {
        let config = match config {
            Value::Null => Value::Object(Map::new()),
            config => config,
        };
        Self::from_node(Node::new(config))
    }

    pub fn default_entry(&self) -> Option<&DefaultEntry> {
        self.default.as_ref()
    }

    pub fn workflow(&self) -> Option<&Workflow> {
        self.workflow.as_ref()
    }

    pub fn jobs(&self) -> Option<&Jobs> {
        self.jobs.as_ref()
    }

    /// Stages of the pipeline, always starting with `.pre` and ending with `.post`
    pub fn stages_value(&self) -> Vec<String> {
        let stages = if self.entries.is_specified("stages") || !self.entries.is_specified("types") {
            self.entries.value("stages")
        } else {
            self.entries.value("types")
        };

        let mut value = vec![PRE_STAGE.to_string()];
        value.extend(
            stages
                .as_strings()
                .unwrap_or_default()
                .into_iter()
                .filter(|stage| stage != PRE_STAGE && stage != POST_STAGE),
        );
        value.push(POST_STAGE.to_string());
        value
    }

    /// Top-level variables as `name: value`
    pub fn variables_value(&self) -> Value {
        self.entries.value("variables")
    }

    /// Top-level variables as `name: {value:, raw:}`
    pub fn variables_with_data(&self) -> Value {
        self.entries
            .get("variables")
            .map(|variables| variables.value_with_data())
            .unwrap_or_default()
    }

    /// Top-level variables including descriptions and options
    pub fn variables_with_prefill_data(&self) -> Value {
        self.entries
            .get("variables")
            .map(|variables| variables.value_with_prefill_data())
            .unwrap_or_default()
    }

    pub fn include_value(&self) -> Value {
        self.entries.specified_value("include")
    }

    pub fn workflow_value(&self) -> Value {
        self.workflow
            .as_ref()
            .filter(|workflow| workflow.is_specified())
            .map(Entry::value)
            .unwrap_or_default()
    }

    /// Normalized jobs, keyed by name
    ///
    /// Adds what a runner needs on top of each job's own value: the concatenated `commands` and the
    /// effective `variables`.
    pub fn jobs_value(&self) -> Value {
        let Some(Value::Object(jobs)) = self.jobs.as_ref().map(Entry::value) else {
            return Value::Object(Map::new());
        };

        let root_variables = self.variables_value();
        jobs.into_iter()
            .map(|(name, job)| (name, job_value(job, &root_variables)))
            .collect()
    }
}

fn job_value(job: Value, root_variables: &Value) -> Value {
    let Value::Object(mut job) = job else {
        return job;
    };

    let commands: Vec<_> = ["before_script", "script", "after_script"]
        .into_iter()
        .filter_map(|key| job.get(key).and_then(Value::as_strings))
        .flatten()
        .collect();
    if !commands.is_empty() {
        job.insert("commands".into(), commands.join("\n").into());
    }

    let inheritance = job.get("root_variables_inheritance").cloned().unwrap_or(true.into());
    let mut variables: Map = root_variables
        .as_object()
        .into_iter()
        .flatten()
        .filter(|(name, _)| match &inheritance {
            Value::Boolean(inherit) => *inherit,
            Value::Array(names) => names.iter().any(|inherited| inherited.as_str() == Some(name.as_str())),
            _ => true,
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    if let Some(job_variables) = job.get("job_variables").and_then(Value::as_object) {
        for (name, data) in job_variables {
            variables.insert(name.clone(), data.get("value").cloned().unwrap_or_default());
        }
    }
    job.insert("variables".into(), variables.into());

    job.into()
}

impl FromNode for Root {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("root")),
            entries: Entries::default(),
            default: None,
            workflow: None,
            jobs: None,
        }
    }
}

impl Entry for Root {
    node!();

    fn compose(&mut self, _deps: Option<&Deps<'_>>) -> Result<(), ComposeError> {
        let Some(config) = self.node.config().as_object().filter(|_| !self.node.has_errors()) else {
            return Ok(());
        };
        tracing::debug!(keys = config.len(), "composing root");

        let jobs: Map = config
            .iter()
            .filter(|(name, config)| is_job(name, config))
            .map(|(name, config)| (name.clone(), config.clone()))
            .collect();
        let default = config.get("default").cloned().unwrap_or(Value::Object(Map::new()));
        let workflow = config.get("workflow").cloned().unwrap_or_default();

        if self.node.has_attribute("types") {
            self.node.warn("`types` is deprecated, use `stages` instead");
        }

        let mut entries = Entries::build(&self.node, ROOT_ENTRIES)?;
        entries.compose(None)?;

        let mut default = DefaultEntry::from_node(Node::new(default).with_key("default"));
        default.compose(Some(&Deps::new(Some(&entries), None, None)))?;

        let mut workflow = Workflow::from_node(Node::new(workflow).with_key("workflow"));
        workflow.compose(None)?;

        let mut jobs = Jobs::from_node(Node::new(jobs.into()).with_key("jobs"));
        tracing::debug!(jobs = jobs.node().config().as_object().map_or(0, Map::len), "composing jobs");
        jobs.compose(Some(&Deps::new(Some(&entries), Some(&default), Some(&workflow))))?;

        self.entries = entries;
        self.default = Some(default);
        self.workflow = Some(workflow);
        self.jobs = Some(jobs);
        Ok(())
    }

    fn value(&self) -> Value {
        [
            ("include", self.include_value()),
            ("stages", self.stages_value().into()),
            ("variables", self.variables_value()),
            ("workflow", self.workflow_value()),
            ("jobs", self.jobs_value()),
        ]
        .into_iter()
        .collect::<Value>()
        .compact()
    }

    fn descendants(&self) -> Vec<&dyn Entry> {
        let mut descendants = self.entries.descendants();
        if let Some(default) = &self.default {
            descendants.push(default);
        }
        if let Some(workflow) = &self.workflow {
            descendants.push(workflow);
        }
        if let Some(jobs) = &self.jobs {
            descendants.push(jobs);
        }
        descendants
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config;
    use pretty_assertions::assert_eq;

    fn root(config: Value) -> Root {
        let mut root = Root::new(config);
        root.compose(None).unwrap();
        root
    }

    #[test]
    fn defaults() {
        let entry = root(config!("{cache: {key: a}, rspec: {script: [ls]}}"));
        assert!(entry.is_valid(), "{:?}", entry.errors());

        let jobs = entry.jobs_value();
        let rspec = jobs.get("rspec").unwrap();
        assert_eq!(rspec.get("stage"), Some(&Value::from("test")));
        assert_eq!(rspec.get("only"), Some(&config!("refs: [branches, tags]")));
        assert_eq!(
            entry.stages_value(),
            vec![".pre", "build", "test", "deploy", ".post"]
        );
    }

    #[test]
    fn top_level_keys_reach_jobs() {
        let entry = root(config!(
            r#"
            before_script: [bundle install]
            image: ruby:3.2
            cache: {key: gems, paths: [vendor]}
            rspec:
              script: rspec
            "#
        ));
        assert!(entry.is_valid(), "{:?}", entry.errors());

        let rspec = entry.jobs_value().get("rspec").cloned().unwrap();
        assert_eq!(rspec.get("before_script"), Some(&config!("[bundle install]")));
        assert_eq!(rspec.get("image"), Some(&config!("name: ruby:3.2")));
        assert_eq!(
            rspec.get("commands"),
            Some(&Value::from("bundle install\nrspec"))
        );
        assert_eq!(
            rspec.get("cache").and_then(|cache| cache.as_array()).map(Vec::len),
            Some(1)
        );
    }

    #[test]
    fn string_before_script() {
        let entry = root(config!("{before_script: ls, rspec: {script: ls}}"));
        assert_eq!(
            entry.errors(),
            vec!["before_script config should be an array containing strings and arrays of strings"]
        );
    }

    #[test]
    fn conflicting_defaults() {
        let mut entry = Root::new(config!("{image: ruby, default: {image: alpine}, rspec: {script: ls}}"));
        assert_eq!(
            entry.compose(None),
            Err(ComposeError::Inherit { key: "image".into() })
        );
    }

    #[test]
    fn unknown_keys() {
        let entry = root(config!("{rspec: {script: ls}, foo: bar, .hidden: baz}"));
        assert_eq!(entry.errors(), vec!["root config contains unknown keys: foo"]);
    }

    #[test]
    fn stages() {
        let entry = root(config!("{stages: [.pre, lint, test], rspec: {script: ls}}"));
        assert_eq!(entry.stages_value(), vec![".pre", "lint", "test", ".post"]);

        let entry = root(config!("{types: [lint], rspec: {script: ls, stage: lint}}"));
        assert_eq!(entry.stages_value(), vec![".pre", "lint", ".post"]);
        assert_eq!(
            entry.warnings(),
            vec!["root `types` is deprecated, use `stages` instead"]
        );
    }

    #[test]
    fn variables() {
        let entry = root(config!(
            r#"
            variables:
              DB: postgres
              DEPLOY_ENV: {value: staging, description: Target, options: [staging, production]}
            rspec:
              script: rspec
              variables: {DB: mysql}
            lint:
              script: lint
              inherit: {variables: [DEPLOY_ENV]}
            isolated:
              script: make
              inherit: {variables: false}
            "#
        ));
        assert!(entry.is_valid(), "{:?}", entry.errors());

        assert_eq!(entry.variables_value(), config!("{DB: postgres, DEPLOY_ENV: staging}"));
        assert_eq!(
            entry.variables_with_prefill_data(),
            config!(
                r#"
                DB: {value: postgres}
                DEPLOY_ENV: {value: staging, description: Target, options: [staging, production]}
                "#
            )
        );

        let jobs = entry.jobs_value();
        let variables = |job: &str| jobs.get(job).and_then(|job| job.get("variables")).cloned();
        assert_eq!(variables("rspec"), Some(config!("{DB: mysql, DEPLOY_ENV: staging}")));
        assert_eq!(variables("lint"), Some(config!("DEPLOY_ENV: staging")));
        assert_eq!(variables("isolated"), Some(config!("{}")));
    }

    #[test]
    fn workflow_rules_drop_implicit_only() {
        let entry = root(config!(
            r#"
            workflow:
              rules: [{if: $CI_COMMIT_BRANCH}]
            rspec:
              script: rspec
            deploy:
              script: deploy
              only: [main]
            "#
        ));
        assert!(entry.is_valid(), "{:?}", entry.errors());

        let jobs = entry.jobs_value();
        assert_eq!(jobs.get("rspec").and_then(|job| job.get("only")), None);
        assert_eq!(
            jobs.get("deploy").and_then(|job| job.get("only")),
            Some(&config!("refs: [main]"))
        );
    }

    #[test]
    fn descendants_include_hidden_jobs() {
        let entry = root(config!("{.template: {script: ls}, rspec: {script: ls}}"));
        assert_eq!(entry.jobs().map(|jobs| jobs.descendants().len()), Some(2));
        assert_eq!(entry.jobs_value().as_object().map(Map::len), Some(1));
    }
}
