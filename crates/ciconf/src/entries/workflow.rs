use crate::entries::Rules;
use crate::entry::{
    construct, node, predicates, ComposeError, Deps, Entries, Entry, EntryDecl, FromNode, Node,
    Validator,
};
use crate::value::Value;

/// `workflow:` decides whether a pipeline is created at all
#[derive(Debug)]
pub struct Workflow {
    node: Node,
    entries: Entries,
}

const WORKFLOW_ENTRIES: &[EntryDecl] = &[
    EntryDecl::new("rules", construct::<Rules>, "List of evaluable rules to determine Pipeline status.")
        .metadata(Rules::WORKFLOW),
];

impl Workflow {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new()
                .config(predicates::is_hash, "should be a hash")
                .allowed_keys(&["rules", "name"])
                .attribute("name", predicates::is_string, "should be a string")
        })
    }

    /// Whether `workflow:rules` are defined
    pub fn has_rules(&self) -> bool {
        self.node.has_attribute("rules")
    }

    pub fn name(&self) -> Option<&str> {
        self.node.attribute("name").and_then(Value::as_str)
    }
}

impl FromNode for Workflow {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("workflow")),
            entries: Entries::default(),
        }
    }
}

impl Entry for Workflow {
    node!();

    fn compose(&mut self, deps: Option<&Deps<'_>>) -> Result<(), ComposeError> {
        if !self.is_specified() || self.node.has_errors() {
            return Ok(());
        }
        self.entries = Entries::build(&self.node, WORKFLOW_ENTRIES)?;
        self.entries.compose(deps)
    }

    fn value(&self) -> Value {
        [
            ("rules", self.entries.specified_value("rules")),
            ("name", self.name().map(Value::from).unwrap_or_default()),
        ]
        .into_iter()
        .collect::<Value>()
        .compact()
    }

    fn descendants(&self) -> Vec<&dyn Entry> {
        self.entries.descendants()
    }
}
