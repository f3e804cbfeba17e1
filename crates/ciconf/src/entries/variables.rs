//! CI/CD variables
//!
//! A variable is either simple (`KEY: value`) or, when the parent allows it through
//! [Metadata::allowed_value_data](crate::entry::Metadata), complex:
//!
//! ```yaml
//! variables:
//!   DEPLOY_ENV:
//!     value: staging
//!     description: Environment to deploy to
//!     options: [staging, production]
//!     expand: false
//! ```
use crate::entry::{node, ComposeError, Deps, Entry, FromNode, Node, Validator};
use crate::value::{Map, Value};

fn hash_message(value_can_be_a_hash: bool) -> &'static str {
    if value_can_be_a_hash {
        "should be a hash of key value pairs, value can be a hash"
    } else {
        "should be a hash of key value pairs"
    }
}

/// A single variable, keyed by its name
#[derive(Debug)]
pub struct Variable {
    node: Node,
}

impl Variable {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new().check(|node, report| {
                match (node.config(), node.metadata().allowed_value_data) {
                    (Value::Object(data), Some(allowed)) => {
                        let invalid: Vec<_> = data
                            .keys()
                            .filter(|key| !allowed.contains(&key.as_str()))
                            .map(String::as_str)
                            .collect();
                        if !invalid.is_empty() {
                            report.add(
                                "config",
                                format!("uses invalid data keys: {}", invalid.join(", ")),
                            );
                            return;
                        }

                        match node.attribute("value") {
                            None => report.add("value", "must be present"),
                            Some(value) if value.to_scalar_string().is_none() => {
                                report.add("value", "must be an alphanumeric string")
                            }
                            Some(_) => {}
                        }
                        if let Some(description) = node.attribute("description") {
                            if description.to_scalar_string().is_none() {
                                report.add("description", "must be an alphanumeric string");
                            }
                        }
                        if node.attribute("expand").is_some_and(|expand| !expand.is_boolean()) {
                            report.add("expand", "should be a boolean value");
                        }
                        if let Some(options) = node.attribute("options") {
                            match options.as_strings() {
                                None => report.add("options", "should be an array of strings"),
                                Some(options) => {
                                    let value = node.attribute("value").and_then(Value::to_scalar_string);
                                    if value.is_some_and(|value| !options.contains(&value)) {
                                        report.add("value", "must be present in options");
                                    }
                                }
                            }
                        }
                    }
                    (Value::Object(_) | Value::Array(_), _) => report.add("config", "must be a string"),
                    _ => {}
                }
            })
        })
    }

    fn is_complex(&self) -> bool {
        self.node.config().is_object()
    }

    fn raw_value(&self) -> Option<String> {
        match self.node.config() {
            Value::Object(_) => self.node.attribute("value").and_then(Value::to_scalar_string),
            config => config.to_scalar_string(),
        }
    }
}

impl FromNode for Variable {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("variable")),
        }
    }
}

impl Entry for Variable {
    node!();

    fn value(&self) -> Value {
        self.raw_value().into()
    }

    /// `{value:, raw:}` where `raw` is only present when `expand` is set
    fn value_with_data(&self) -> Value {
        let mut data = Map::new();
        data.insert("value".into(), self.raw_value().into());
        if let Some(expand) = self.node.attribute("expand").and_then(Value::as_bool) {
            data.insert("raw".into(), (!expand).into());
        }
        Value::from(data).compact()
    }

    /// Data used to prefill the variables form of a manual pipeline
    fn value_with_prefill_data(&self) -> Value {
        let Value::Object(mut data) = self.value_with_data() else {
            return Value::Null;
        };
        if self.is_complex() {
            let description = self.node.attribute("description").and_then(Value::to_scalar_string);
            data.insert("description".into(), description.into());
            data.insert("options".into(), self.node.attribute("options").cloned().unwrap_or_default());
        }
        Value::from(data).compact()
    }
}

/// Hash of variables
#[derive(Debug)]
pub struct Variables {
    node: Node,
    variables: Vec<Variable>,
}

impl Variables {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new().check(|node, report| {
                if !node.config().is_object() {
                    let complex = node.metadata().allowed_value_data.is_some();
                    report.add("config", hash_message(complex));
                }
            })
        })
    }

    fn collect(&self, value: impl Fn(&Variable) -> Value) -> Value {
        self.variables
            .iter()
            .map(|variable| (variable.key().unwrap_or_default(), value(variable)))
            .collect()
    }
}

impl FromNode for Variables {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("variables")),
            variables: Vec::new(),
        }
    }
}

impl Entry for Variables {
    node!();

    fn compose(&mut self, _deps: Option<&Deps<'_>>) -> Result<(), ComposeError> {
        let Some(variables) = self.node.config().as_object().filter(|_| !self.node.has_errors()) else {
            return Ok(());
        };

        let metadata = *self.node.metadata();
        self.variables = variables
            .iter()
            .map(|(name, config)| {
                // `KEY: ~` is an empty variable, not a missing one
                let config = match config {
                    Value::Null => Value::from(""),
                    config => config.clone(),
                };
                let node = Node::new(config)
                    .with_key(name.clone())
                    .with_ancestors(self.node.path())
                    .with_metadata(metadata);
                Variable::from_node(node)
            })
            .collect();
        Ok(())
    }

    fn value(&self) -> Value {
        self.collect(Variable::value)
    }

    fn value_with_data(&self) -> Value {
        self.collect(Variable::value_with_data)
    }

    fn value_with_prefill_data(&self) -> Value {
        self.collect(Variable::value_with_prefill_data)
    }

    fn default_value(&self) -> Value {
        Value::Object(Map::new())
    }

    fn descendants(&self) -> Vec<&dyn Entry> {
        self.variables.iter().map(|variable| variable as &dyn Entry).collect()
    }
}

/// Variables without per-variable entries
///
/// Values are plain scalars, or `{value:, description:}` hashes when the parent enables
/// [Metadata::use_value_data](crate::entry::Metadata).
#[derive(Debug)]
pub struct LegacyVariables {
    node: Node,
}

impl LegacyVariables {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new().check(|node, report| {
                let use_value_data = node.metadata().use_value_data;
                let valid = node.config().as_object().is_some_and(|variables| {
                    variables.values().all(|value| match value {
                        Value::Object(data) if use_value_data => {
                            data.keys().all(|key| key == "value" || key == "description")
                                && data.values().all(|value| value.to_scalar_string().is_some())
                        }
                        value => value.is_null() || value.to_scalar_string().is_some(),
                    })
                });
                if !valid {
                    report.add("config", hash_message(use_value_data));
                }
            })
        })
    }

    fn variables(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.node
            .config()
            .as_object()
            .into_iter()
            .flatten()
            .map(|(name, value)| (name.as_str(), value))
    }
}

fn legacy_value(value: &Value) -> Value {
    match value {
        Value::Object(data) => data.get("value").and_then(Value::to_scalar_string).into(),
        value => value.to_scalar_string().unwrap_or_default().into(),
    }
}

impl FromNode for LegacyVariables {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("variables")),
        }
    }
}

impl Entry for LegacyVariables {
    node!();

    fn value(&self) -> Value {
        self.variables()
            .map(|(name, value)| (name, legacy_value(value)))
            .collect()
    }

    fn value_with_data(&self) -> Value {
        self.variables()
            .map(|(name, value)| {
                let description = value.get("description").and_then(Value::to_scalar_string);
                let data = [
                    ("value", legacy_value(value)),
                    ("description", description.into()),
                ];
                (name, data.into_iter().collect::<Value>().compact())
            })
            .collect()
    }

    fn default_value(&self) -> Value {
        Value::Object(Map::new())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config;
    use crate::entry::Metadata;
    use pretty_assertions::assert_eq;

    const WITH_DATA: Metadata = Metadata {
        allowed_value_data: Some(&["value", "description", "expand", "options"]),
        ..Metadata::EMPTY
    };

    fn variables(config: Value, metadata: Metadata) -> Variables {
        let node = Node::new(config).with_key("variables").with_metadata(metadata);
        let mut variables = Variables::from_node(node);
        variables.compose(None).unwrap();
        variables
    }

    #[test]
    fn simple_values_are_coerced() {
        let entry = variables(config!("{VAR: value, NUMBER: 1, FLAG: true, EMPTY: ~}"), Metadata::EMPTY);
        assert!(entry.is_valid());
        assert_eq!(
            entry.value(),
            config!("{VAR: value, NUMBER: '1', FLAG: 'true', EMPTY: ''}")
        );
        assert_eq!(entry.value_with_data().get("VAR"), Some(&config!("value: value")));
    }

    #[test]
    fn complex_values_need_allowed_data() {
        let entry = variables(config!("VAR: {value: x}"), Metadata::EMPTY);
        assert_eq!(entry.errors(), vec!["variables:var config must be a string"]);

        let entry = variables(config!("VAR: [x]"), WITH_DATA);
        assert_eq!(entry.errors(), vec!["variables:var config must be a string"]);
    }

    #[test]
    fn complex_values() {
        let entry = variables(
            config!("DEPLOY: {value: staging, description: Target, options: [staging, production], expand: false}"),
            WITH_DATA,
        );
        assert!(entry.is_valid(), "{:?}", entry.errors());
        assert_eq!(entry.value(), config!("DEPLOY: staging"));
        assert_eq!(entry.value_with_data(), config!("DEPLOY: {value: staging, raw: true}"));
        assert_eq!(
            entry.value_with_prefill_data(),
            config!("DEPLOY: {value: staging, raw: true, description: Target, options: [staging, production]}")
        );
    }

    #[test]
    fn invalid_complex_values() {
        let entry = variables(config!("VAR: {value: x, secret: true}"), WITH_DATA);
        assert_eq!(entry.errors(), vec!["variables:var config uses invalid data keys: secret"]);

        let entry = variables(config!("VAR: {value: x, options: [a, b]}"), WITH_DATA);
        assert_eq!(entry.errors(), vec!["variables:var value must be present in options"]);
    }

    #[test]
    fn not_a_hash() {
        let entry = variables(config!("[VAR]"), Metadata::EMPTY);
        assert_eq!(entry.errors(), vec!["variables config should be a hash of key value pairs"]);

        let entry = variables(config!("[VAR]"), WITH_DATA);
        assert_eq!(
            entry.errors(),
            vec!["variables config should be a hash of key value pairs, value can be a hash"]
        );
    }

    #[test]
    fn legacy_variables() {
        let metadata = Metadata {
            use_value_data: true,
            ..Metadata::EMPTY
        };
        let node = Node::new(config!("{A: 1, B: {value: b, description: Bee}}"))
            .with_key("variables")
            .with_metadata(metadata);
        let entry = LegacyVariables::from_node(node);
        assert!(entry.is_valid());
        assert_eq!(entry.value(), config!("{A: '1', B: b}"));
        assert_eq!(
            entry.value_with_data(),
            config!("{A: {value: '1'}, B: {value: b, description: Bee}}")
        );

        let node = Node::new(config!("B: {value: b}")).with_key("variables");
        assert_eq!(
            LegacyVariables::from_node(node).errors(),
            vec!["variables config should be a hash of key value pairs"]
        );
    }
}
