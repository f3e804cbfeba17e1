//! `include:` of external configuration files
//!
//! Only the shape of an include is validated here. Whether the referenced file exists is up to
//! whoever resolves includes.
use crate::entry::{node, predicates, ComposeError, Deps, Entry, FromNode, Node, Validator};
use crate::value::Value;

/// Ref used for project includes without `ref:`
pub const DEFAULT_REF: &str = "HEAD";

/// Keys that select where an include is loaded from
const LOCATIONS: &[&str] = &["local", "remote", "file", "template", "component", "artifact"];

const INCLUDE_KEYS: &[&str] = &[
    "local",
    "remote",
    "file",
    "template",
    "component",
    "artifact",
    "job",
    "project",
    "ref",
    "rules",
    "inputs",
    "integrity",
    "cache",
];

/// A single include: a path/URL, or a hash with exactly one location
#[derive(Debug)]
pub struct Include {
    node: Node,
}

impl Include {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new()
                .check(|node, report| match node.config() {
                    Value::String(location) if location.trim().is_empty() => {
                        report.add("config", "can't be blank")
                    }
                    Value::String(_) | Value::Object(_) => {}
                    _ => report.add("config", "should be a hash or a string"),
                })
                .allowed_keys(INCLUDE_KEYS)
                .check(|node, report| {
                    if !node.config().is_object() {
                        return;
                    }
                    let locations: Vec<_> =
                        LOCATIONS.iter().copied().filter(|key| node.has_attribute(key)).collect();
                    match locations.len() {
                        0 => report.add(
                            "config",
                            format!("must use exactly one of: {}", LOCATIONS.join(", ")),
                        ),
                        1 => {}
                        _ => report.add(
                            "config",
                            format!("these keys cannot be used together: {}", locations.join(", ")),
                        ),
                    }
                })
                .check(|node, report| {
                    if node.has_attribute("artifact") && !node.has_attribute("job") {
                        report.add("config", "must specify the job where to fetch the artifact from");
                    }
                    if node.has_attribute("project") && !node.has_attribute("file") {
                        report.add("config", "must specify the file where to fetch the config from");
                    }
                })
                .attribute("local", predicates::is_string, "should be a string")
                .attribute("remote", predicates::is_string, "should be a string")
                .attribute("template", predicates::is_string, "should be a string")
                .attribute("component", predicates::is_string, "should be a string")
                .attribute("artifact", predicates::is_string, "should be a string")
                .attribute("job", predicates::is_string, "should be a string")
                .attribute("project", predicates::is_string, "should be a string")
                .attribute("ref", predicates::is_string, "should be a string")
                .attribute("file", predicates::is_array_of_strings_or_string, "should be a string or an array of strings")
                .attribute("rules", predicates::is_array_of_hashes, "should be an array of hashes")
                .attribute("inputs", predicates::is_hash, "should be a hash")
        })
    }
}

impl FromNode for Include {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("include")),
        }
    }
}

impl Entry for Include {
    node!();

    /// Project includes get the default ref when none is given
    fn value(&self) -> Value {
        let config = self.node.config();
        match config.as_object() {
            Some(include) if include.contains_key("project") && config.get("ref").is_none() => {
                let mut include = include.clone();
                include.insert("ref".into(), DEFAULT_REF.into());
                include.into()
            }
            _ => config.clone(),
        }
    }
}

/// One or more includes
#[derive(Debug)]
pub struct Includes {
    node: Node,
    includes: Vec<Include>,
}

impl FromNode for Includes {
    fn from_node(node: Node) -> Self {
        let validator = crate::validator!(|| {
            Validator::new().check(|node, report| {
                if !matches!(node.config(), Value::String(_) | Value::Object(_) | Value::Array(_)) {
                    report.add("config", "should be an array, a hash or a string");
                }
            })
        });
        Self {
            node: validator.validated(node.named("includes")),
            includes: Vec::new(),
        }
    }
}

impl Entry for Includes {
    node!();

    fn compose(&mut self, _deps: Option<&Deps<'_>>) -> Result<(), ComposeError> {
        if !self.is_specified() || self.node.has_errors() {
            return Ok(());
        }

        let configs = match self.node.config() {
            Value::Array(includes) => includes.clone(),
            include => vec![include.clone()],
        };
        // every include reports at the location of the collection itself
        self.includes = configs
            .into_iter()
            .map(|config| {
                let node = Node::new(config)
                    .with_key(self.node.key().unwrap_or("include"))
                    .with_ancestors(self.node.ancestors().to_vec());
                Include::from_node(node)
            })
            .collect();
        Ok(())
    }

    fn value(&self) -> Value {
        self.includes.iter().map(Entry::value).collect::<Vec<_>>().into()
    }

    fn descendants(&self) -> Vec<&dyn Entry> {
        self.includes.iter().map(|include| include as &dyn Entry).collect()
    }
}
