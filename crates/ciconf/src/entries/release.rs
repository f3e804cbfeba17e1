//! `release:` of a job
use crate::entry::{
    construct, node, predicates, ComposeError, Deps, Entries, Entry, EntryDecl, FromNode, Node,
    Validator,
};
use crate::value::{Map, Value};
use chrono::DateTime;

const RELEASE_KEYS: &[&str] = &[
    "tag_name",
    "tag_message",
    "name",
    "description",
    "ref",
    "released_at",
    "milestones",
    "assets",
];

const LINK_TYPES: &[&str] = &["other", "runbook", "image", "package"];

/// Release created when the job succeeds
#[derive(Debug)]
pub struct Release {
    node: Node,
    entries: Entries,
}

const RELEASE_ENTRIES: &[EntryDecl] = &[EntryDecl::new(
    "assets",
    construct::<Assets>,
    "Release assets.",
)];

impl Release {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new()
                .config(predicates::is_hash, "should be a hash")
                .allowed_keys(RELEASE_KEYS)
                .presence("tag_name")
                .presence("description")
                .attribute("tag_name", predicates::is_string, "should be a string")
                .attribute("tag_message", predicates::is_string, "should be a string")
                .attribute("name", predicates::is_string, "should be a string")
                .attribute("description", predicates::is_string, "should be a string")
                .attribute("ref", predicates::is_string, "should be a string")
                .attribute("released_at", is_datetime, "must be a valid datetime")
                .attribute(
                    "milestones",
                    predicates::is_array_of_strings_or_string,
                    "should be an array of strings or a string",
                )
        })
    }
}

fn is_datetime(value: &Value) -> bool {
    value
        .as_str()
        .is_some_and(|value| DateTime::parse_from_rfc3339(value).is_ok())
}

impl FromNode for Release {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("release")),
            entries: Entries::default(),
        }
    }
}

impl Entry for Release {
    node!();

    fn compose(&mut self, deps: Option<&Deps<'_>>) -> Result<(), ComposeError> {
        if !self.is_specified() || self.node.has_errors() {
            return Ok(());
        }
        self.entries = Entries::build(&self.node, RELEASE_ENTRIES)?;
        self.entries.compose(deps)
    }

    /// The release with `milestones:` as a list
    fn value(&self) -> Value {
        let Some(release) = self.node.config().as_object() else {
            return self.node.config().clone();
        };
        let mut release = release.clone();
        if let Some(milestones) = release.get_mut("milestones") {
            if milestones.is_string() {
                *milestones = Value::Array(vec![milestones.clone()]);
            }
        }
        if self.entries.is_specified("assets") {
            release.insert("assets".into(), self.entries.value("assets"));
        }
        release.into()
    }

    fn descendants(&self) -> Vec<&dyn Entry> {
        self.entries.descendants()
    }
}

#[derive(Debug)]
pub struct Assets {
    node: Node,
    entries: Entries,
}

const ASSETS_ENTRIES: &[EntryDecl] = &[EntryDecl::new(
    "links",
    construct::<Links>,
    "Links of the release assets.",
)];

impl FromNode for Assets {
    fn from_node(node: Node) -> Self {
        let validator = crate::validator!(|| {
            Validator::new()
                .config(predicates::is_hash, "should be a hash")
                .allowed_keys(&["links"])
                .presence("links")
        });
        Self {
            node: validator.validated(node.named("assets")),
            entries: Entries::default(),
        }
    }
}

impl Entry for Assets {
    node!();

    fn compose(&mut self, deps: Option<&Deps<'_>>) -> Result<(), ComposeError> {
        if !self.is_specified() || self.node.has_errors() {
            return Ok(());
        }
        self.entries = Entries::build(&self.node, ASSETS_ENTRIES)?;
        self.entries.compose(deps)
    }

    fn value(&self) -> Value {
        [("links", self.entries.specified_value("links"))]
            .into_iter()
            .collect::<Value>()
            .compact()
    }

    fn descendants(&self) -> Vec<&dyn Entry> {
        self.entries.descendants()
    }
}

#[derive(Debug)]
pub struct Links {
    node: Node,
    links: Vec<Link>,
}

impl FromNode for Links {
    fn from_node(node: Node) -> Self {
        let validator = crate::validator!(|| {
            Validator::new().config(predicates::is_array_of_hashes, "should be an array of hashes")
        });
        Self {
            node: validator.validated(node.named("links")),
            links: Vec::new(),
        }
    }
}

impl Entry for Links {
    node!();

    fn compose(&mut self, _deps: Option<&Deps<'_>>) -> Result<(), ComposeError> {
        let Some(configs) = self.node.config().as_array().filter(|_| !self.node.has_errors()) else {
            return Ok(());
        };
        self.links = configs
            .iter()
            .map(|config| Link::from_node(Node::new(config.clone()).with_ancestors(self.node.path())))
            .collect();
        Ok(())
    }

    fn value(&self) -> Value {
        self.links.iter().map(Entry::value).collect::<Vec<_>>().into()
    }

    fn descendants(&self) -> Vec<&dyn Entry> {
        self.links.iter().map(|link| link as &dyn Entry).collect()
    }
}

/// Link to an asset of a release
#[derive(Debug)]
pub struct Link {
    node: Node,
}

impl FromNode for Link {
    fn from_node(node: Node) -> Self {
        let validator = crate::validator!(|| {
            Validator::new()
                .config(predicates::is_hash, "should be a hash")
                .allowed_keys(&["name", "url", "filepath", "link_type"])
                .presence("name")
                .presence("url")
                .attribute("name", predicates::is_string, "should be a string")
                .attribute("url", predicates::is_string, "should be a string")
                .attribute("filepath", predicates::is_string, "should be a string")
                .inclusion("link_type", LINK_TYPES, "should be one of: other, runbook, image, package")
        });
        Self {
            node: validator.validated(node.named("link")),
        }
    }
}

impl Entry for Link {
    node!();

    fn value(&self) -> Value {
        self.node
            .config()
            .as_object()
            .cloned()
            .map(Value::from)
            .unwrap_or_else(|| Value::Object(Map::new()))
    }
}
