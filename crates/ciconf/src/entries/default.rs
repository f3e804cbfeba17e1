//! `default:` values for all jobs
use crate::entries::{
    Artifacts, Boolean, Caches, Commands, Hooks, IdTokens, Image, Retry, Services, Tags, Timeout,
};
use crate::entry::{
    construct, node, predicates, ComposeError, Deps, Entries, Entry, EntryDecl, FromNode, Inherited,
    Node, Validator,
};
use crate::value::Value;

const DEFAULT_ENTRIES: &[EntryDecl] = &[
    EntryDecl::new("before_script", construct::<Commands>, "Script that will be executed before each job.").inherit(),
    EntryDecl::new("image", construct::<Image>, "Docker image that will be used to execute jobs.").inherit(),
    EntryDecl::new("services", construct::<Services>, "Docker images that will be linked to the container.").inherit(),
    EntryDecl::new("after_script", construct::<Commands>, "Script that will be executed after each job.").inherit(),
    EntryDecl::new("cache", construct::<Caches>, "Configure caching between build jobs.").inherit(),
    EntryDecl::new("hooks", construct::<Hooks>, "Commands that will be executed on Runner before/after some events."),
    EntryDecl::new("interruptible", construct::<Boolean>, "Set jobs interruptible default value."),
    EntryDecl::new("timeout", construct::<Timeout>, "Set jobs default timeout."),
    EntryDecl::new("retry", construct::<Retry>, "Set retry default value."),
    EntryDecl::new("tags", construct::<Tags>, "Set the default tags."),
    EntryDecl::new("artifacts", construct::<Artifacts>, "Default artifacts."),
    EntryDecl::new("id_tokens", construct::<IdTokens>, "Default ID tokens."),
];

/// Values every job inherits unless it sets them itself or opts out through `inherit:`
///
/// Declarations marked as inheritable may also be written at the top level of the document, but
/// not in both places.
#[derive(Debug)]
pub struct DefaultEntry {
    node: Node,
    entries: Entries,
}

impl DefaultEntry {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            let keys: &'static [&'static str] = &[
                "before_script",
                "image",
                "services",
                "after_script",
                "cache",
                "hooks",
                "interruptible",
                "timeout",
                "retry",
                "tags",
                "artifacts",
                "id_tokens",
            ];
            Validator::new()
                .config(predicates::is_hash, "should be a hash")
                .allowed_keys(keys)
        })
    }

    pub fn get(&self, key: &str) -> Option<&dyn Entry> {
        self.entries.get(key)
    }
}

impl FromNode for DefaultEntry {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("default")),
            entries: Entries::default(),
        }
    }
}

impl Entry for DefaultEntry {
    node!();

    fn compose(&mut self, deps: Option<&Deps<'_>>) -> Result<(), ComposeError> {
        if self.node.has_errors() {
            return Ok(());
        }

        let mut entries = Entries::build(&self.node, DEFAULT_ENTRIES)?;
        entries.compose(deps)?;

        if let Some(root) = deps.and_then(|deps| deps.root) {
            for decl in DEFAULT_ENTRIES.iter().filter(|decl| decl.inherit) {
                let Some(top_level) = root.get(decl.key).filter(|entry| entry.is_specified()) else {
                    continue;
                };
                if entries.is_specified(decl.key) {
                    return Err(ComposeError::Inherit {
                        key: decl.key.to_string(),
                    });
                }
                entries.insert(decl.key, Inherited::boxed(top_level));
            }
        }

        self.entries = entries;
        Ok(())
    }

    fn value(&self) -> Value {
        self.entries
            .keys()
            .map(|key| (key, self.entries.specified_value(key)))
            .collect::<Value>()
            .compact()
    }

    fn descendants(&self) -> Vec<&dyn Entry> {
        self.entries.descendants()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config;
    use crate::entries::Script;
    use pretty_assertions::assert_eq;

    fn default(config: Value, root: Option<&Entries>) -> Result<DefaultEntry, ComposeError> {
        let mut entry = DefaultEntry::from_node(Node::new(config).with_key("default"));
        entry.compose(Some(&Deps::new(root, None, None)))?;
        Ok(entry)
    }

    fn root(config: Value) -> Entries {
        const ROOT: &[EntryDecl] = &[
            EntryDecl::new("image", construct::<Image>, ""),
            EntryDecl::new("before_script", construct::<Script>, ""),
        ];
        let mut entries = Entries::build(&Node::new(config), ROOT).unwrap();
        entries.compose(None).unwrap();
        entries
    }

    #[test]
    fn values() {
        let entry = default(config!("{image: ruby, retry: 1}"), None).unwrap();
        assert!(entry.is_valid());
        assert_eq!(entry.value(), config!("{image: {name: ruby}, retry: {max: 1}}"));
    }

    #[test]
    fn takes_over_top_level_keys() {
        let root = root(config!("before_script: [bundle]"));
        let entry = default(config!("image: ruby"), Some(&root)).unwrap();
        assert_eq!(
            entry.value(),
            config!("{before_script: [bundle], image: {name: ruby}}")
        );
    }

    #[test]
    fn conflicting_top_level_keys() {
        let root = root(config!("image: ruby"));
        let error = default(config!("image: alpine"), Some(&root)).unwrap_err();
        assert_eq!(
            error.to_string(),
            "image is defined in top-level and `default:` entry"
        );
    }

    #[test]
    fn unknown_keys() {
        let entry = default(config!("{script: make, stage: test}"), None).unwrap();
        assert_eq!(entry.errors(), vec!["default config contains unknown keys: script, stage"]);
    }
}
