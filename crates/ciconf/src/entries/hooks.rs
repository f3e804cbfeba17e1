use crate::entries::Commands;
use crate::entry::{
    construct, node, predicates, ComposeError, Deps, Entries, Entry, EntryDecl, FromNode, Node,
    Validator,
};
use crate::value::Value;

/// Commands run by the runner at specific stages of job execution
#[derive(Debug)]
pub struct Hooks {
    node: Node,
    entries: Entries,
}

const HOOKS_ENTRIES: &[EntryDecl] = &[EntryDecl::new(
    "pre_get_sources_script",
    construct::<Commands>,
    "Commands that run before the repository is cloned or fetched.",
)];

impl FromNode for Hooks {
    fn from_node(node: Node) -> Self {
        let validator = crate::validator!(|| {
            Validator::new()
                .config(predicates::is_hash, "should be a hash")
                .allowed_keys(&["pre_get_sources_script"])
        });
        Self {
            node: validator.validated(node.named("hooks")),
            entries: Entries::default(),
        }
    }
}

impl Entry for Hooks {
    node!();

    fn compose(&mut self, deps: Option<&Deps<'_>>) -> Result<(), ComposeError> {
        if !self.is_specified() || self.node.has_errors() {
            return Ok(());
        }
        self.entries = Entries::build(&self.node, HOOKS_ENTRIES)?;
        self.entries.compose(deps)
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
