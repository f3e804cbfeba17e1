//! Deployment environments
use crate::entry::{
    construct, node, predicates, ComposeError, Deps, Entries, Entry, EntryDecl, FromNode, Node,
    Validator,
};
use crate::util::parse_duration;
use crate::value::{Map, Value};

pub const DEFAULT_ACTION: &str = "start";
const ACTIONS: &[&str] = &["start", "stop", "prepare", "verify", "access"];
const TIERS: &[&str] = &["production", "staging", "testing", "development", "other"];

/// Environment a job deploys to: a name, or a hash with `name:` and deployment details
#[derive(Debug)]
pub struct Environment {
    node: Node,
    entries: Entries,
}

const ENVIRONMENT_ENTRIES: &[EntryDecl] = &[EntryDecl::new(
    "kubernetes",
    construct::<Kubernetes>,
    "Kubernetes deployment configuration",
)];

impl Environment {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new()
                .config(predicates::is_hash_or_string, "should be a hash or a string")
                .allowed_keys(&[
                    "name",
                    "url",
                    "action",
                    "on_stop",
                    "auto_stop_in",
                    "kubernetes",
                    "deployment_tier",
                ])
                .check(|node, report| {
                    let name = match node.config() {
                        Value::Object(_) => node.attribute("name"),
                        config => Some(config),
                    };
                    if name.map_or(true, Value::is_blank) {
                        report.add("name", "can't be blank");
                    }
                })
                .attribute("name", predicates::is_string, "should be a string")
                .attribute("url", predicates::is_string, "should be a string")
                .inclusion("action", ACTIONS, "should be start, stop, prepare, verify, or access")
                .attribute("on_stop", predicates::is_string, "should be a string")
                .attribute("auto_stop_in", is_auto_stop_in, "should be a duration")
                .inclusion(
                    "deployment_tier",
                    TIERS,
                    "must be one of production, staging, testing, development, other",
                )
        })
    }

    /// Name of the environment
    pub fn name(&self) -> Option<&str> {
        match self.node.config() {
            Value::String(name) => Some(name),
            config => config.get("name").and_then(Value::as_str),
        }
    }
}

fn is_auto_stop_in(value: &Value) -> bool {
    value
        .as_str()
        .is_some_and(|value| value == "never" || predicates::has_variables(value) || parse_duration(value).is_some())
}

impl FromNode for Environment {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("environment")),
            entries: Entries::default(),
        }
    }
}

impl Entry for Environment {
    node!();

    fn compose(&mut self, deps: Option<&Deps<'_>>) -> Result<(), ComposeError> {
        if !self.node.config().is_object() || self.node.has_errors() {
            return Ok(());
        }
        self.entries = Entries::build(&self.node, ENVIRONMENT_ENTRIES)?;
        self.entries.compose(deps)
    }

    /// Hash form with `action:` defaulting to `start`
    fn value(&self) -> Value {
        let mut value = match self.node.config() {
            Value::String(name) => Map::from([("name".to_string(), Value::from(name.as_str()))]),
            config => config.as_object().cloned().unwrap_or_default(),
        };
        value
            .entry("action".to_string())
            .or_insert_with(|| DEFAULT_ACTION.into());
        if self.entries.is_specified("kubernetes") {
            value.insert("kubernetes".into(), self.entries.value("kubernetes"));
        }
        value.into()
    }

    fn descendants(&self) -> Vec<&dyn Entry> {
        self.entries.descendants()
    }
}

/// Kubernetes details of an environment
#[derive(Debug)]
pub struct Kubernetes {
    node: Node,
}

impl FromNode for Kubernetes {
    fn from_node(node: Node) -> Self {
        let validator = crate::validator!(|| {
            Validator::new()
                .config(predicates::is_hash, "should be a hash")
                .allowed_keys(&["namespace", "agent", "flux_resource_path"])
                .attribute("namespace", predicates::is_string, "should be a string")
                .attribute("agent", predicates::is_string, "should be a string")
                .attribute("flux_resource_path", predicates::is_string, "should be a string")
        });
        Self {
            node: validator.validated(node.named("kubernetes")),
        }
    }
}

impl Entry for Kubernetes {
    node!();
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config;
    use pretty_assertions::assert_eq;

    fn environment(config: Value) -> Environment {
        let mut entry = Environment::from_node(Node::new(config).with_key("environment"));
        entry.compose(None).unwrap();
        entry
    }

    #[test]
    fn name_only() {
        let entry = environment(config!("production"));
        assert!(entry.is_valid());
        assert_eq!(entry.name(), Some("production"));
        assert_eq!(entry.value(), config!("{name: production, action: start}"));
    }

    #[test]
    fn full() {
        let entry = environment(config!(
            r#"
            name: review/$CI_COMMIT_REF_SLUG
            url: https://$CI_COMMIT_REF_SLUG.example.com
            on_stop: stop_review
            auto_stop_in: 1 day
            kubernetes: {namespace: review}
            "#
        ));
        assert!(entry.is_valid(), "{:?}", entry.errors());
        assert_eq!(entry.value().get("action"), Some(&Value::from("start")));
        assert_eq!(entry.value().get("kubernetes"), Some(&config!("namespace: review")));
    }

    #[test]
    fn invalid() {
        let entry = environment(config!("{url: example.com, action: restart, kubernetes: {cluster: x}}"));
        assert_eq!(
            entry.errors(),
            vec![
                "environment name can't be blank",
                "environment action should be start, stop, prepare, verify, or access",
            ]
        );

        let entry = environment(config!("{name: review, kubernetes: {cluster: x}}"));
        assert_eq!(
            entry.errors(),
            vec!["environment:kubernetes config contains unknown keys: cluster"]
        );
    }
}
