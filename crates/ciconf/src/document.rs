//! Front door: from a YAML document to a pipeline
//!
//! ```
//! # use ciconf::document::{CiConfig, Outcome};
//! let config = CiConfig::from_yaml("rspec:\n  script: rspec").unwrap();
//! let Outcome::Valid(pipeline) = config.outcome() else {
//!     panic!("must be valid");
//! };
//! assert_eq!(pipeline.stages, vec![".pre", "build", "test", "deploy", ".post"]);
//! ```
use crate::entries::Root;
use crate::entry::{ComposeError, Entry};
use crate::extends::{self, ExtendsError};
use crate::value::{Map, Value};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Unable to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unable to parse yaml document")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Compose(#[from] ComposeError),
}

/// Result of validating a document
#[derive(Debug, PartialEq)]
pub enum Outcome {
    Valid(Pipeline),
    Invalid(Vec<String>),
}

/// The normalized pipeline of a valid document
#[derive(Debug, PartialEq, serde::Serialize)]
pub struct Pipeline {
    pub stages: Vec<String>,
    pub variables: Value,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub workflow: Value,
    pub jobs: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// A composed configuration document
#[derive(Debug)]
pub struct CiConfig {
    root: Root,
    /// `extends:` that could not be resolved, replaces all other errors
    extends_error: Option<ExtendsError>,
    /// errors of jobs checked against each other
    pipeline_errors: Vec<String>,
    source: Option<PathBuf>,
}

impl CiConfig {
    pub fn new(config: Value) -> Result<Self, ConfigError> {
        let (config, extends_error) = match extends::resolve(config.clone()) {
            Ok(resolved) => (resolved, None),
            Err(error) => {
                tracing::debug!(%error, "unable to resolve extends");
                (config, Some(error))
            }
        };

        let mut root = Root::new(config);
        root.compose(None)?;

        let pipeline_errors = if extends_error.is_none() && root.is_valid() {
            check_pipeline(&root)
        } else {
            Vec::new()
        };
        tracing::debug!(
            errors = root.errors().len() + pipeline_errors.len(),
            warnings = root.warnings().len(),
            "composed document"
        );

        Ok(Self {
            root,
            extends_error,
            pipeline_errors,
            source: None,
        })
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let document: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        Self::new(document.into())
    }

    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        tracing::info!(path=%path.display(), "loading file");
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;

        let mut config = Self::from_yaml(&yaml)?;
        config.source = Some(path.to_owned());
        Ok(config)
    }

    pub fn root(&self) -> &Root {
        &self.root
    }

    /// File the document was loaded from
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn errors(&self) -> Vec<String> {
        if let Some(error) = &self.extends_error {
            return vec![error.to_string()];
        }
        let mut errors = self.root.errors();
        errors.extend(self.pipeline_errors.iter().cloned());
        errors
    }

    pub fn warnings(&self) -> Vec<String> {
        self.root.warnings()
    }

    pub fn is_valid(&self) -> bool {
        self.errors().is_empty()
    }

    pub fn outcome(&self) -> Outcome {
        let errors = self.errors();
        if !errors.is_empty() {
            return Outcome::Invalid(errors);
        }

        Outcome::Valid(Pipeline {
            stages: self.root.stages_value(),
            variables: self.root.variables_value(),
            workflow: self.root.workflow_value(),
            jobs: self.root.jobs_value(),
            warnings: self.warnings(),
        })
    }
}

/// Stages, dependencies, needs and stop jobs of all jobs checked against each other
fn check_pipeline(root: &Root) -> Vec<String> {
    let stages = root.stages_value();
    let jobs = root.jobs_value();
    let Some(jobs) = jobs.as_object() else {
        return Vec::new();
    };

    let stage_index = |job: &Value| {
        let stage = job.get("stage").and_then(Value::as_str)?;
        stages.iter().position(|known| known == stage)
    };
    let index_of = |name: &str| jobs.get(name).map(|job| stage_index(job));

    let mut errors = Vec::new();
    for (name, job) in jobs {
        let Some(index) = stage_index(job) else {
            errors.push(format!(
                "{name} job: chosen stage does not exist; available stages are {}",
                stages.join(", ")
            ));
            continue;
        };

        for dependency in job.get("dependencies").and_then(Value::as_strings).unwrap_or_default() {
            match index_of(dependency.as_str()) {
                None => errors.push(format!("{name} job: undefined dependency: {dependency}")),
                Some(other) if other.map_or(true, |other| other > index) => errors.push(format!(
                    "{name} job: dependency {dependency} is not defined in current or prior stages"
                )),
                Some(_) => {}
            }
        }

        for (need, optional) in job_needs(job) {
            match index_of(need) {
                None if optional => {}
                None => errors.push(format!("{name} job: undefined need: {need}")),
                Some(other) if other.map_or(true, |other| other > index) => errors.push(format!(
                    "{name} job: need {need} is not defined in current or prior stages"
                )),
                Some(_) => {}
            }
        }

        if let Some(error) = on_stop_error(name, job, jobs) {
            errors.push(error);
        }
    }

    if errors.is_empty() && has_cycle(jobs) {
        errors.push("The pipeline has circular dependencies.".to_string());
    }
    errors
}

/// The job named by `on_stop:` must stop the same environment
fn on_stop_error(name: &str, job: &Value, jobs: &Map) -> Option<String> {
    let environment = job.get("environment_options")?;
    let on_stop = environment.get("on_stop").and_then(Value::as_str)?;

    let Some(stop_job) = jobs.get(on_stop) else {
        return Some(format!("{name} job: on_stop job {on_stop} is not defined"));
    };
    let Some(stop_environment) = stop_job.get("environment_options").filter(|env| env.is_object()) else {
        return Some(format!("{name} job: on_stop job {on_stop} does not have environment defined"));
    };
    if stop_environment.get("name") != environment.get("name") {
        return Some(format!("{name} job: on_stop job {on_stop} have different environment name"));
    }
    if stop_environment.get("action").and_then(Value::as_str) != Some("stop") {
        return Some(format!("{name} job: on_stop job {on_stop} needs to have action stop defined"));
    }
    None
}

/// Names of the needed jobs of this pipeline and whether they are optional
fn job_needs<'a>(job: &'a Value) -> impl Iterator<Item = (&'a str, bool)> + 'a {
    job.get("needs")
        .and_then(|needs| needs.get("job"))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|need| {
            let name = need.get("name").and_then(Value::as_str)?;
            let optional = need.get("optional").and_then(Value::as_bool).unwrap_or(false);
            Some((name, optional))
        })
}

fn has_cycle(jobs: &Map) -> bool {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit<'a>(
        name: &'a str,
        jobs: &'a Map,
        marks: &mut IndexMap<&'a str, Mark>,
    ) -> bool {
        match marks.get(name) {
            Some(Mark::Visiting) => return true,
            Some(Mark::Done) => return false,
            None => {}
        }
        let Some(job) = jobs.get(name) else {
            return false;
        };

        marks.insert(name, Mark::Visiting);
        let cycle = job_needs(job).any(|(need, _)| visit(need, jobs, marks));
        marks.insert(name, Mark::Done);
        cycle
    }

    let mut marks = IndexMap::new();
    jobs.keys().any(|name| visit(name, jobs, &mut marks))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config;
    use pretty_assertions::assert_eq;

    fn errors(yaml: &str) -> Vec<String> {
        CiConfig::from_yaml(yaml).unwrap().errors()
    }

    #[test]
    fn valid_pipeline() {
        let config = CiConfig::from_yaml(
            r#"
            stages: [build, test]
            variables: {RAILS_ENV: test}
            build:
              stage: build
              script: make
            rspec:
              script: rspec
              needs: [build]
            "#,
        )
        .unwrap();

        let Outcome::Valid(pipeline) = config.outcome() else {
            panic!("{:?}", config.errors());
        };
        assert_eq!(pipeline.stages, vec![".pre", "build", "test", ".post"]);
        assert_eq!(pipeline.variables, config!("RAILS_ENV: test"));
        assert_eq!(pipeline.workflow, Value::Null);
        assert_eq!(
            pipeline.jobs.get("rspec").and_then(|job| job.get("scheduling_type")),
            Some(&Value::from("dag"))
        );
    }

    #[test]
    fn serialized_job() {
        let Outcome::Valid(pipeline) = CiConfig::from_yaml("rspec: {script: rspec}").unwrap().outcome() else {
            panic!("must be valid");
        };
        let only = pipeline.jobs.get("rspec").and_then(|job| job.get("only"));
        insta::assert_yaml_snapshot!(only, @r###"
        refs:
          - branches
          - tags
        "###);
    }

    #[test]
    fn empty_document() {
        assert_eq!(errors(""), vec!["jobs config should contain at least one visible job"]);
    }

    #[test]
    fn invalid_yaml() {
        let error = CiConfig::from_yaml("rspec: [unclosed").unwrap_err();
        assert!(matches!(error, ConfigError::Yaml(_)));
    }

    #[test]
    fn unknown_stage() {
        insta::assert_snapshot!(
            errors("rspec: {script: rspec, stage: lint}").join("\n"),
            @"rspec job: chosen stage does not exist; available stages are .pre, build, test, deploy, .post"
        );
    }

    #[test]
    fn dependencies() {
        assert_eq!(
            errors(
                r#"
                build: {stage: build, script: make}
                rspec: {script: rspec, dependencies: [build, lint, deploy]}
                deploy: {stage: deploy, script: cap}
                "#
            ),
            vec![
                "rspec job: undefined dependency: lint",
                "rspec job: dependency deploy is not defined in current or prior stages",
            ]
        );
    }

    #[test]
    fn needs() {
        assert_eq!(
            errors(
                r#"
                rspec:
                  script: rspec
                  needs:
                    - lint
                    - {job: docs, optional: true}
                    - deploy
                deploy: {stage: deploy, script: cap}
                "#
            ),
            vec![
                "rspec job: undefined need: lint",
                "rspec job: need deploy is not defined in current or prior stages",
            ]
        );
    }

    #[test]
    fn circular_needs() {
        assert_eq!(
            errors(
                r#"
                a: {script: a, needs: [c]}
                b: {script: b, needs: [a]}
                c: {script: c, needs: [b]}
                "#
            ),
            vec!["The pipeline has circular dependencies."]
        );
    }

    #[test]
    fn blank_need() {
        assert_eq!(
            errors("rspec: {script: rspec, needs: [{job: '', optional: true}]}"),
            vec!["jobs:rspec:needs:need job can't be blank"]
        );
    }

    #[test]
    fn resolved_extends() {
        let config = CiConfig::from_yaml(
            r#"
            .template: {script: test, variables: {A: a}}
            rspec: {extends: .template, image: "ruby:alpine", variables: {B: b}}
            "#,
        )
        .unwrap();
        let Outcome::Valid(pipeline) = config.outcome() else {
            panic!("{:?}", config.errors());
        };
        let rspec = pipeline.jobs.get("rspec").unwrap();
        assert_eq!(rspec.get("script"), Some(&config!("[test]")));
        assert_eq!(rspec.get("image"), Some(&config!("name: ruby:alpine")));
        assert_eq!(rspec.get("job_variables"), Some(&config!("{A: {value: a}, B: {value: b}}")));
    }

    #[test]
    fn unresolved_extends_is_the_only_error() {
        assert_eq!(
            errors("rspec: {extends: something, script: test, when: later}"),
            vec!["rspec: unknown keys in `extends` (something)"]
        );
    }

    #[test]
    fn on_stop() {
        let with_stop_job = |close_review: &str| {
            errors(&format!(
                "review: {{stage: deploy, script: test, environment: {{name: review, on_stop: close_review}}}}\n{close_review}"
            ))
        };

        assert_eq!(
            with_stop_job("close_review: {stage: deploy, script: test, environment: {name: review, action: stop}}"),
            Vec::<String>::new()
        );
        assert_eq!(
            with_stop_job(""),
            vec!["review job: on_stop job close_review is not defined"]
        );
        assert_eq!(
            with_stop_job("close_review: {stage: deploy, script: test}"),
            vec!["review job: on_stop job close_review does not have environment defined"]
        );
        assert_eq!(
            with_stop_job("close_review: {stage: deploy, script: test, environment: production}"),
            vec!["review job: on_stop job close_review have different environment name"]
        );
        assert_eq!(
            with_stop_job("close_review: {stage: deploy, script: test, environment: {name: review}}"),
            vec!["review job: on_stop job close_review needs to have action stop defined"]
        );
    }

    #[test]
    fn composition_errors_skip_pipeline_checks() {
        assert_eq!(
            errors("rspec: {script: rspec, stage: lint, when: later}"),
            vec!["jobs:rspec when should be one of: on_success, on_failure, always, manual, delayed"]
        );
    }
}
