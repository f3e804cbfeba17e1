//! A job that triggers a downstream pipeline
use super::processable;
use crate::entries::{
    policy, AllowFailure, Environment, Inherit, Needs, Parallel, Policy, Rules, Stage, Trigger,
    Variables,
};
use crate::entry::{
    attributes, construct, node, ComposeError, Deps, Entries, Entry, EntryDecl, FromNode, Metadata,
    Node, Validator,
};
use crate::value::{Map, Value};

pub const BRIDGE_WHEN: &[&str] = &["on_success", "on_failure", "always", "manual"];

const BRIDGE_KEYS: &[&str] = &[
    "trigger",
    "parallel",
    "extends",
    "stage",
    "only",
    "except",
    "rules",
    "variables",
    "inherit",
    "allow_failure",
    "when",
    "needs",
    "resource_group",
    "environment",
];

const NEEDS: Metadata = Metadata {
    allowed_needs: Some(&["job"]),
    ..Metadata::EMPTY
};

const BRIDGE_ENTRIES: &[EntryDecl] = &[
    EntryDecl::new("trigger", construct::<Trigger>, "Trigger configuration for the downstream pipeline."),
    EntryDecl::new("stage", construct::<Stage>, "Pipeline stage this job will be executed into."),
    EntryDecl::new("only", construct::<Policy>, "Refs policy this job will be executed for.").default(policy::default_only),
    EntryDecl::new("except", construct::<Policy>, "Refs policy this job will be executed for."),
    EntryDecl::new("rules", construct::<Rules>, "List of evaluable Rules to determine job inclusion.").metadata(Rules::JOB),
    EntryDecl::new("needs", construct::<Needs>, "Needs configuration for this job.").metadata(NEEDS),
    EntryDecl::new("variables", construct::<Variables>, "Environment variables available for this job."),
    EntryDecl::new("inherit", construct::<Inherit>, "Indicates whether to inherit defaults or not."),
    EntryDecl::new("environment", construct::<Environment>, "Environment configuration for this job."),
    EntryDecl::new("allow_failure", construct::<AllowFailure>, "Indicates whether this job is allowed to fail or not."),
    EntryDecl::new("parallel", construct::<Parallel>, "Parallel configuration for this job.").metadata(Parallel::MATRIX_ONLY),
];

/// Job that starts a multi-project or child pipeline instead of running a script
#[derive(Debug)]
pub struct Bridge {
    node: Node,
    entries: Entries,
}

attributes!(Bridge {
    when => "when",
});

impl Bridge {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            processable::validations(Validator::new())
                .allowed_keys(BRIDGE_KEYS)
                .presence("trigger")
                .inclusion("when", BRIDGE_WHEN, "should be on_success, on_failure, always or manual")
                .attribute("when", crate::entry::predicates::is_string, "should be a string")
        })
    }
}

impl FromNode for Bridge {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("bridge")),
            entries: Entries::default(),
        }
    }
}

impl Entry for Bridge {
    node!();

    fn compose(&mut self, deps: Option<&Deps<'_>>) -> Result<(), ComposeError> {
        if self.node.has_errors() {
            return Ok(());
        }
        self.entries = processable::compose(&mut self.node, BRIDGE_ENTRIES, deps)?;
        Ok(())
    }

    fn value(&self) -> Value {
        let entries = &self.entries;
        let mut value = processable::value(&self.node, entries);
        let (needs, scheduling_type) = processable::needs(entries);

        let bridge: Map = [
            ("trigger", entries.specified_value("trigger")),
            ("needs", needs),
            ("ignore", processable::ignored(&self.node, entries).into()),
            ("when", self.when().cloned().unwrap_or_default()),
            ("scheduling_type", scheduling_type),
            ("parallel", entries.specified_value("parallel")),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect();

        value.extend(bridge);
        Value::from(value).compact()
    }

    fn descendants(&self) -> Vec<&dyn Entry> {
        self.entries.descendants()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config;
    use pretty_assertions::assert_eq;

    fn bridge(config: Value) -> Bridge {
        let node = Node::new(config)
            .with_ancestors(vec!["jobs".into()])
            .with_key("deploy");
        let mut bridge = Bridge::from_node(node);
        bridge.compose(None).unwrap();
        bridge
    }

    #[test]
    fn multi_project() {
        let entry = bridge(config!("{trigger: my/deployment, stage: deploy, needs: [build]}"));
        assert!(entry.is_valid(), "{:?}", entry.errors());
        let value = entry.value();
        assert_eq!(
            value.get("trigger"),
            Some(&config!("{project: my/deployment, forward: {yaml_variables: true, pipeline_variables: false}}"))
        );
        assert_eq!(value.get("scheduling_type"), Some(&Value::from("dag")));
        assert_eq!(value.get("stage"), Some(&Value::from("deploy")));
    }

    #[test]
    fn invalid() {
        assert_eq!(
            bridge(config!("{trigger: my/deployment, script: deploy}")).errors(),
            vec![
                "jobs:deploy config these keys cannot be used together: script, trigger",
                "jobs:deploy config contains unknown keys: script",
            ]
        );
        assert_eq!(
            bridge(config!("{trigger: my/deployment, when: delayed}")).errors(),
            vec!["jobs:deploy when should be on_success, on_failure, always or manual"]
        );
        assert_eq!(
            bridge(config!("{trigger: my/deployment, parallel: 2}")).errors(),
            vec!["jobs:deploy:parallel config cannot use \"parallel: <number>\"."]
        );
        assert_eq!(
            bridge(config!("{trigger: my/deployment, needs: [{pipeline: other, job: a}]}")).errors(),
            vec!["jobs:deploy:needs config uses invalid types: pipeline"]
        );
    }
}
