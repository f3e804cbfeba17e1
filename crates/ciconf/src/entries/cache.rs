//! `cache:` and its key
use crate::entries::Boolean;
use crate::entry::{
    attributes, construct, node, predicates, ComposeError, Deps, Entries, Entry, EntryDecl,
    FromNode, Node, Validator,
};
use crate::limits::{CACHES_LIMIT, CACHE_KEY_FILES_LIMIT};
use crate::util::decode_dots_and_slashes;
use crate::value::{Map, Value};

pub const DEFAULT_KEY: &str = "default";
pub const DEFAULT_POLICY: &str = "pull-push";
pub const DEFAULT_WHEN: &str = "on_success";

const POLICIES: &[&str] = &["pull-push", "push", "pull"];
const WHEN: &[&str] = &["on_success", "on_failure", "always"];

/// One or more caches. A single hash is treated as a list of one.
#[derive(Debug)]
pub struct Caches {
    node: Node,
    caches: Vec<Box<dyn Entry>>,
}

impl Caches {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new()
                .check(|node, report| {
                    if !node.config().is_object() && !node.config().is_array() {
                        report.add("config", "should be a hash or an array of hashes");
                    }
                })
                .check(|node, report| {
                    if node.config().as_array().is_some_and(|caches| caches.len() > CACHES_LIMIT) {
                        report.add(
                            "config",
                            format!("no more than {CACHES_LIMIT} caches can be created"),
                        );
                    }
                })
        })
    }

    fn items(&self) -> Vec<Value> {
        match self.node.config() {
            Value::Array(caches) => caches.clone(),
            config => vec![config.clone()],
        }
    }
}

impl FromNode for Caches {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("caches")),
            caches: Vec::new(),
        }
    }
}

impl Entry for Caches {
    node!();

    fn compose(&mut self, deps: Option<&Deps<'_>>) -> Result<(), ComposeError> {
        if !self.is_specified() || self.node.has_errors() {
            return Ok(());
        }

        // every cache reports at the location of the collection itself
        for config in self.items() {
            let node = Node::new(config)
                .with_key(self.node.key().unwrap_or("cache"))
                .with_ancestors(self.node.ancestors().to_vec());
            let mut cache = Cache::from_node(node);
            cache.compose(deps)?;
            self.caches.push(Box::new(cache));
        }
        Ok(())
    }

    fn value(&self) -> Value {
        self.caches.iter().map(|cache| cache.value()).collect::<Vec<_>>().into()
    }

    fn descendants(&self) -> Vec<&dyn Entry> {
        self.caches.iter().map(|cache| cache.as_ref()).collect()
    }
}

/// A single cache
#[derive(Debug)]
pub struct Cache {
    node: Node,
    entries: Entries,
}

attributes!(Cache {
    policy => "policy",
    when => "when",
    unprotect => "unprotect",
    fallback_keys => "fallback_keys",
});

const CACHE_ENTRIES: &[EntryDecl] = &[
    EntryDecl::new("key", construct::<Key>, "Unique cache key or a set of files to compute it from."),
    EntryDecl::new("untracked", construct::<Boolean>, "Cache all untracked files."),
    EntryDecl::new("paths", construct::<Paths>, "Specify which paths should be cached across builds."),
];

impl Cache {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new()
                .config(predicates::is_hash, "should be a hash")
                .allowed_keys(&["key", "untracked", "paths", "when", "policy", "unprotect", "fallback_keys"])
                .check(|node, report| {
                    // policies computed from variables are resolved later
                    let policy = node.attribute("policy").and_then(Value::as_str);
                    if let Some(policy) = policy.filter(|policy| !predicates::has_variables(policy)) {
                        if !POLICIES.contains(&policy) {
                            report.add("policy", "should be pull-push, push, or pull");
                        }
                    }
                })
                .inclusion("when", WHEN, "should be on_success, on_failure or always")
                .attribute("unprotect", predicates::is_boolean, "should be a boolean value")
                .attribute("fallback_keys", predicates::is_array_of_strings, "should be an array of strings")
        })
    }
}

impl FromNode for Cache {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("cache")),
            entries: Entries::default(),
        }
    }
}

impl Entry for Cache {
    node!();

    fn compose(&mut self, deps: Option<&Deps<'_>>) -> Result<(), ComposeError> {
        if self.node.has_errors() {
            return Ok(());
        }
        self.entries = Entries::build(&self.node, CACHE_ENTRIES)?;
        self.entries.compose(deps)
    }

    fn value(&self) -> Value {
        let mut value = Map::new();
        value.insert("key".into(), self.entries.value("key"));
        for key in ["untracked", "paths"] {
            value.insert(key.into(), self.entries.specified_value(key));
        }
        value.insert("policy".into(), self.policy().cloned().unwrap_or_else(|| DEFAULT_POLICY.into()));
        value.insert("when".into(), self.when().cloned().unwrap_or_else(|| DEFAULT_WHEN.into()));
        value.insert("unprotect".into(), self.unprotect().cloned().unwrap_or(false.into()));
        value.insert(
            "fallback_keys".into(),
            self.fallback_keys().cloned().unwrap_or(Value::Array(Vec::new())),
        );
        Value::from(value).compact()
    }

    fn descendants(&self) -> Vec<&dyn Entry> {
        self.entries.descendants()
    }
}

fn key_errors(key: &str) -> Option<&'static str> {
    let key = decode_dots_and_slashes(key);
    if key.contains('/') {
        Some("cannot contain the \"/\" character")
    } else if key == "." || key == ".." {
        Some("cannot be \".\" or \"..\"")
    } else {
        None
    }
}

/// Cache key: a plain string, or files to hash with an optional prefix
#[derive(Debug)]
pub struct Key {
    node: Node,
    entries: Entries,
}

const KEY_ENTRIES: &[EntryDecl] = &[
    EntryDecl::new("files", construct::<Files>, "Files that should be used to build the key"),
    EntryDecl::new("prefix", construct::<Prefix>, "Prefix that is added to the final cache key"),
];

impl Key {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new().check(|node, report| match node.config() {
                Value::String(key) => {
                    if let Some(message) = key_errors(key) {
                        report.add("config", message);
                    }
                }
                Value::Object(_) => {}
                _ => report.add("config", "should be a hash, a string or a symbol"),
            })
        })
    }

    fn complex_validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new()
                .allowed_keys(&["files", "prefix"])
                .required_keys(&["files"])
        })
    }
}

impl FromNode for Key {
    fn from_node(node: Node) -> Self {
        let mut node = Self::validator().validated(node.named("key"));
        if node.config().is_object() {
            Self::complex_validator().validate(&mut node);
        }
        Self {
            node,
            entries: Entries::default(),
        }
    }
}

impl Entry for Key {
    node!();

    fn compose(&mut self, deps: Option<&Deps<'_>>) -> Result<(), ComposeError> {
        if !self.node.config().is_object() || self.node.has_errors() {
            return Ok(());
        }
        self.entries = Entries::build(&self.node, KEY_ENTRIES)?;
        self.entries.compose(deps)
    }

    fn value(&self) -> Value {
        match self.node.config() {
            Value::Object(_) => ["files", "prefix"]
                .into_iter()
                .map(|key| (key, self.entries.specified_value(key)))
                .collect::<Value>()
                .compact(),
            config => config.clone(),
        }
    }

    fn default_value(&self) -> Value {
        DEFAULT_KEY.into()
    }

    fn descendants(&self) -> Vec<&dyn Entry> {
        self.entries.descendants()
    }
}

/// Files whose contents make up the cache key
#[derive(Debug)]
pub struct Files {
    node: Node,
}

impl FromNode for Files {
    fn from_node(node: Node) -> Self {
        let validator = crate::validator!(|| {
            Validator::new()
                .config(predicates::is_array_of_strings, "should be an array of strings")
                .check(|node, report| {
                    let Some(files) = node.config().as_array() else {
                        return;
                    };
                    if files.is_empty() {
                        report.add("config", "can't be blank");
                    } else if files.len() > CACHE_KEY_FILES_LIMIT {
                        report.add(
                            "config",
                            format!("has too many entries (maximum {CACHE_KEY_FILES_LIMIT})"),
                        );
                    }
                })
        });
        Self {
            node: validator.validated(node.named("files")),
        }
    }
}

impl Entry for Files {
    node!();
}

#[derive(Debug)]
pub struct Prefix {
    node: Node,
}

impl FromNode for Prefix {
    fn from_node(node: Node) -> Self {
        let validator = crate::validator!(|| {
            Validator::new().check(|node, report| match node.config().as_str() {
                Some(prefix) => {
                    if let Some(message) = key_errors(prefix) {
                        report.add("config", message);
                    }
                }
                None => report.add("config", "should be a string or symbol"),
            })
        });
        Self {
            node: validator.validated(node.named("prefix")),
        }
    }
}

impl Entry for Prefix {
    node!();
}

/// Paths to include in a cache or artifacts archive
#[derive(Debug)]
pub struct Paths {
    node: Node,
}

impl FromNode for Paths {
    fn from_node(node: Node) -> Self {
        let validator = crate::validator!(|| {
            Validator::new().config(predicates::is_array_of_strings, "should be an array of strings")
        });
        Self {
            node: validator.validated(node.named("paths")),
        }
    }
}

impl Entry for Paths {
    node!();
}
