//! `needs:` of jobs and bridges
use crate::entry::{node, predicates, ComposeError, Deps, Entry, FromNode, Node, Validator};
use crate::value::{Map, Value};

/// Kind of dependency a need expresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeedKind {
    /// another job of this pipeline
    Job,
    /// a job of another pipeline
    Pipeline,
}

impl NeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NeedKind::Job => "job",
            NeedKind::Pipeline => "pipeline",
        }
    }
}

/// A single need: `job-name`, `{job:, artifacts:, optional:}` or `{pipeline:, job:, artifacts:}`
#[derive(Debug)]
pub struct Need {
    node: Node,
    kind: Option<NeedKind>,
}

impl Need {
    fn job_validator() -> &'static Validator {
        crate::validator!(|| Validator::new().check(|node, report| {
            if node.config().is_blank() {
                report.add("config", "can't be blank");
            }
        }))
    }

    fn job_hash_validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new()
                .allowed_keys(&["job", "artifacts", "optional"])
                .presence("job")
                .attribute("job", predicates::is_string, "should be a string")
                .attribute("artifacts", predicates::is_boolean, "should be a boolean value")
                .attribute("optional", predicates::is_boolean, "should be a boolean value")
        })
    }

    fn pipeline_validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new()
                .allowed_keys(&["pipeline", "job", "artifacts"])
                .presence("pipeline")
                .presence("job")
                .attribute("pipeline", predicates::is_string, "should be a string")
                .attribute("job", predicates::is_string, "should be a string")
                .attribute("artifacts", predicates::is_boolean, "should be a boolean value")
        })
    }

    fn unknown_validator() -> &'static Validator {
        crate::validator!(|| Validator::new().check(|_, report| report.add("", "has an unsupported type")))
    }

    pub fn kind(&self) -> Option<NeedKind> {
        self.kind
    }

    fn flag(&self, name: &str, default: bool) -> Value {
        self.node
            .attribute(name)
            .and_then(Value::as_bool)
            .unwrap_or(default)
            .into()
    }
}

impl FromNode for Need {
    fn from_node(node: Node) -> Self {
        let node = node.named("need");
        let (validator, kind) = match node.config() {
            Value::String(_) => (Self::job_validator(), Some(NeedKind::Job)),
            Value::Object(_) if node.has_attribute("pipeline") => {
                (Self::pipeline_validator(), Some(NeedKind::Pipeline))
            }
            Value::Object(_) => (Self::job_hash_validator(), Some(NeedKind::Job)),
            _ => (Self::unknown_validator(), None),
        };
        Self {
            node: validator.validated(node),
            kind,
        }
    }
}

impl Entry for Need {
    node!();

    fn value(&self) -> Value {
        let config = self.node.config();
        let mut value = Map::new();
        match (self.kind, config) {
            (Some(NeedKind::Job), Value::String(name)) => {
                value.insert("name".into(), name.clone().into());
                value.insert("artifacts".into(), true.into());
                value.insert("optional".into(), false.into());
            }
            (Some(NeedKind::Job), _) => {
                value.insert("name".into(), config.get("job").cloned().unwrap_or_default());
                value.insert("artifacts".into(), self.flag("artifacts", true));
                value.insert("optional".into(), self.flag("optional", false));
            }
            (Some(NeedKind::Pipeline), _) => {
                value.insert("pipeline".into(), config.get("pipeline").cloned().unwrap_or_default());
                value.insert("job".into(), config.get("job").cloned().unwrap_or_default());
                value.insert("artifacts".into(), self.flag("artifacts", true));
            }
            (None, _) => return Value::Null,
        }
        value.into()
    }
}

/// Needs grouped by kind: `{job: [...], pipeline: [...]}`
#[derive(Debug)]
pub struct Needs {
    node: Node,
    needs: Vec<Need>,
}

impl Needs {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new().check(|node, report| match node.config() {
                Value::Object(object) if object.is_empty() => {
                    report.add("config", "can not be an empty hash")
                }
                Value::Object(_) | Value::Array(_) => {}
                _ => report.add("config", "can only be a hash or an array"),
            })
        })
    }

    /// Names of the jobs of this pipeline that are needed
    pub fn job_names(value: &Value) -> Vec<String> {
        value
            .get(NeedKind::Job.as_str())
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|need| need.get("name").and_then(Value::as_str).map(str::to_owned))
            .collect()
    }
}

impl FromNode for Needs {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("needs")),
            needs: Vec::new(),
        }
    }
}

impl Entry for Needs {
    node!();

    fn compose(&mut self, _deps: Option<&Deps<'_>>) -> Result<(), ComposeError> {
        if !self.is_specified() || self.node.has_errors() {
            return Ok(());
        }

        let configs = match self.node.config() {
            Value::Array(needs) => needs.clone(),
            need => vec![need.clone()],
        };
        self.needs = configs
            .into_iter()
            .map(|config| Need::from_node(Node::new(config).with_ancestors(self.node.path())))
            .collect();

        if let Some(allowed) = self.node.metadata().allowed_needs {
            let mut invalid: Vec<&str> = Vec::new();
            for kind in self.needs.iter().filter_map(Need::kind) {
                if !allowed.contains(&kind.as_str()) && !invalid.contains(&kind.as_str()) {
                    invalid.push(kind.as_str());
                }
            }
            if !invalid.is_empty() {
                let message = format!("uses invalid types: {}", invalid.join(", "));
                self.node.error("config", message);
            }
        }
        Ok(())
    }

    fn value(&self) -> Value {
        let mut value = Map::new();
        for need in &self.needs {
            let Some(kind) = need.kind() else {
                continue;
            };
            let needs = value
                .entry(kind.as_str().to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(needs) = needs {
                needs.push(need.value());
            }
        }
        value.into()
    }

    fn descendants(&self) -> Vec<&dyn Entry> {
        self.needs.iter().map(|need| need as &dyn Entry).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config;
    use crate::entry::Metadata;
    use pretty_assertions::assert_eq;

    fn needs(config: Value, allowed: &'static [&'static str]) -> Needs {
        let metadata = Metadata {
            allowed_needs: Some(allowed),
            ..Metadata::EMPTY
        };
        let node = Node::new(config).with_key("needs").with_metadata(metadata);
        let mut needs = Needs::from_node(node);
        needs.compose(None).unwrap();
        needs
    }

    #[test]
    fn grouped_by_kind() {
        let entry = needs(
            config!(
                r#"
                - build
                - {job: lint, artifacts: false}
                - {pipeline: $UPSTREAM, job: package}
                "#
            ),
            &["job", "pipeline"],
        );
        assert!(entry.is_valid(), "{:?}", entry.errors());
        assert_eq!(
            entry.value(),
            config!(
                r#"
                job:
                  - {name: build, artifacts: true, optional: false}
                  - {name: lint, artifacts: false, optional: false}
                pipeline:
                  - {pipeline: $UPSTREAM, job: package, artifacts: true}
                "#
            )
        );
        assert_eq!(Needs::job_names(&entry.value()), vec!["build", "lint"]);
    }

    #[test]
    fn invalid_types() {
        let entry = needs(config!("[build, {pipeline: other, job: package}]"), &["job"]);
        assert_eq!(entry.errors(), vec!["needs config uses invalid types: pipeline"]);
    }

    #[test]
    fn invalid_needs() {
        assert_eq!(
            needs(config!("build"), &["job"]).errors(),
            vec!["needs config can only be a hash or an array"]
        );
        assert_eq!(
            needs(config!("{}"), &["job"]).errors(),
            vec!["needs config can not be an empty hash"]
        );
        assert_eq!(
            needs(config!("[1]"), &["job"]).errors(),
            vec!["needs:need has an unsupported type"]
        );
        assert_eq!(
            needs(config!("[{job: build, when: always}]"), &["job"]).errors(),
            vec!["needs:need config contains unknown keys: when"]
        );
    }

    #[test]
    fn blank_job_names() {
        assert_eq!(
            needs(config!("[{job: '', optional: true}]"), &["job"]).errors(),
            vec!["needs:need job can't be blank"]
        );
        assert_eq!(
            needs(config!("[{artifacts: false}]"), &["job"]).errors(),
            vec!["needs:need job can't be blank"]
        );
        assert_eq!(
            needs(config!("[{pipeline: '', job: ''}]"), &["job", "pipeline"]).errors(),
            vec!["needs:need pipeline can't be blank", "needs:need job can't be blank"]
        );
    }
}
