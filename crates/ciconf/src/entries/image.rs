//! Docker images and services
use crate::entries::LegacyVariables;
use crate::entry::{
    construct, node, predicates, ComposeError, Deps, Entries, Entry, EntryDecl, FromNode, Metadata,
    Node, Report, Validator,
};
use crate::value::{Map, Value};
use std::collections::HashSet;

const PULL_POLICIES: &[&str] = &["always", "never", "if-not-present"];
const PROTOCOLS: &[&str] = &["http", "https"];
const DEFAULT_PROTOCOL: &str = "http";
const DEFAULT_PORT_NAME: &str = "default_port";

/// Legacy variables of a service accept `{value:, description:}` hashes
const SERVICE_VARIABLES: Metadata = Metadata {
    use_value_data: true,
    ..Metadata::EMPTY
};

const IMAGE_KEYS: &[&str] = &["name", "entrypoint", "ports", "pull_policy", "docker"];
const SERVICE_KEYS: &[&str] = &[
    "name",
    "entrypoint",
    "ports",
    "pull_policy",
    "docker",
    "alias",
    "command",
    "variables",
];

/// Checks shared by images and services
fn image_checks(validator: Validator) -> Validator {
    validator
        .config(predicates::is_hash_or_string, "should be a hash or a string")
        .check(|node, report| {
            if node.config().is_object() && node.attribute("name").map_or(true, Value::is_blank) {
                report.add("name", "can't be blank");
            }
        })
        .attribute("name", predicates::is_string, "should be a string")
        .attribute("entrypoint", predicates::is_array_of_strings, "should be an array of strings")
        .check(pull_policy)
        .check(|node, report| {
            let Some(docker) = node.attribute("docker") else {
                return;
            };
            let valid = docker.as_object().is_some_and(|docker| {
                docker.iter().all(|(key, value)| {
                    matches!(key.as_str(), "platform" | "user") && value.is_string()
                })
            });
            if !valid {
                report.add("docker", "should be a hash of platform and user strings");
            }
        })
}

fn pull_policy(node: &Node, report: &mut Report) {
    let Some(policy) = node.attribute("pull_policy") else {
        return;
    };
    let policies = match policy {
        Value::String(policy) => vec![policy.clone()],
        policy => match policy.as_strings() {
            Some(policies) => policies,
            None => {
                report.add("pull_policy", "should be an array of strings or a string");
                return;
            }
        },
    };

    let unknown: Vec<_> = policies
        .iter()
        .filter(|policy| !PULL_POLICIES.contains(&policy.as_str()))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        report.add("pull_policy", format!("contains unknown values: {}", unknown.join(", ")));
    }
}

/// Normalized image value: `{name:, entrypoint:, ports:, pull_policy:, docker:}`
fn image_value(config: &Value, entries: &Entries) -> Map {
    let mut value = Map::new();
    match config {
        Value::String(name) => {
            value.insert("name".into(), name.clone().into());
        }
        config => {
            for key in ["name", "entrypoint"] {
                value.insert(key.into(), config.get(key).cloned().unwrap_or_default());
            }
            value.insert("ports".into(), entries.specified_value("ports"));
            let pull_policy = match config.get("pull_policy") {
                Some(Value::String(policy)) => vec![policy.clone()].into(),
                policy => policy.cloned().unwrap_or_default(),
            };
            value.insert("pull_policy".into(), pull_policy);
            value.insert("docker".into(), config.get("docker").cloned().unwrap_or_default());
        }
    }
    value.retain(|_, value| !value.is_null());
    value
}

/// Container image a job runs in
#[derive(Debug)]
pub struct Image {
    node: Node,
    entries: Entries,
}

const IMAGE_ENTRIES: &[EntryDecl] = &[EntryDecl::new("ports", construct::<Ports>, "Ports used to expose the image")];

impl Image {
    fn validator() -> &'static Validator {
        crate::validator!(|| image_checks(Validator::new()).allowed_keys(IMAGE_KEYS))
    }
}

impl FromNode for Image {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("image")),
            entries: Entries::default(),
        }
    }
}

impl Entry for Image {
    node!();

    fn compose(&mut self, deps: Option<&Deps<'_>>) -> Result<(), ComposeError> {
        if !self.node.config().is_object() || self.node.has_errors() {
            return Ok(());
        }
        self.entries = Entries::build(&self.node, IMAGE_ENTRIES)?;
        self.entries.compose(deps)
    }

    fn value(&self) -> Value {
        image_value(self.node.config(), &self.entries).into()
    }

    fn descendants(&self) -> Vec<&dyn Entry> {
        self.entries.descendants()
    }
}

/// Service container linked to the job container
#[derive(Debug)]
pub struct Service {
    node: Node,
    entries: Entries,
}

const SERVICE_ENTRIES: &[EntryDecl] = &[
    EntryDecl::new("ports", construct::<Ports>, "Ports used to expose the service"),
    EntryDecl::new("variables", construct::<LegacyVariables>, "Environment variables of the service")
        .metadata(SERVICE_VARIABLES),
];

impl Service {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            image_checks(Validator::new())
                .allowed_keys(SERVICE_KEYS)
                .attribute("alias", predicates::is_string, "should be a string")
                .attribute("command", predicates::is_array_of_strings, "should be an array of strings")
        })
    }
}

impl FromNode for Service {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("service")),
            entries: Entries::default(),
        }
    }
}

impl Entry for Service {
    node!();

    fn compose(&mut self, deps: Option<&Deps<'_>>) -> Result<(), ComposeError> {
        if !self.node.config().is_object() || self.node.has_errors() {
            return Ok(());
        }
        self.entries = Entries::build(&self.node, SERVICE_ENTRIES)?;
        self.entries.compose(deps)
    }

    fn value(&self) -> Value {
        let config = self.node.config();
        let mut value = image_value(config, &self.entries);
        for key in ["alias", "command"] {
            if let Some(attribute) = config.get(key) {
                value.insert(key.into(), attribute.clone());
            }
        }
        if self.entries.is_specified("variables") {
            value.insert("variables".into(), self.entries.value("variables"));
        }
        value.into()
    }

    fn descendants(&self) -> Vec<&dyn Entry> {
        self.entries.descendants()
    }
}

/// Services of a job
#[derive(Debug)]
pub struct Services {
    node: Node,
    services: Vec<Service>,
}

impl Services {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new()
                .config(|config| config.is_array(), "should be a array")
                .check(|node, report| {
                    let Some(services) = node.config().as_array() else {
                        return;
                    };
                    let ports = services.iter().filter_map(|service| service.get("ports"));
                    check_unique_ports(ports.filter_map(Value::as_array).flatten(), report);
                })
        })
    }
}

impl FromNode for Services {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("services")),
            services: Vec::new(),
        }
    }
}

impl Entry for Services {
    node!();

    fn compose(&mut self, deps: Option<&Deps<'_>>) -> Result<(), ComposeError> {
        let Some(configs) = self.node.config().as_array().filter(|_| !self.node.has_errors()) else {
            return Ok(());
        };

        let mut services = Vec::with_capacity(configs.len());
        for config in configs {
            let node = Node::new(config.clone()).with_ancestors(self.node.path());
            let mut service = Service::from_node(node);
            service.compose(deps)?;
            services.push(service);
        }
        self.services = services;
        Ok(())
    }

    fn value(&self) -> Value {
        self.services.iter().map(Entry::value).collect::<Vec<_>>().into()
    }

    fn descendants(&self) -> Vec<&dyn Entry> {
        self.services.iter().map(|service| service as &dyn Entry).collect()
    }
}

/// Port number and protocol exposed by an image or service
#[derive(Debug)]
pub struct Port {
    node: Node,
}

impl Port {
    fn validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new()
                .config(predicates::is_hash_or_integer, "should be a hash or an integer")
                .allowed_keys(&["number", "protocol", "name"])
                .check(|node, report| {
                    if node.config().is_object() && !node.has_attribute("number") {
                        report.add("number", "can't be blank");
                    }
                })
                .attribute("number", predicates::is_integer, "should be an integer")
                .inclusion("protocol", PROTOCOLS, "should be http or https")
                .attribute("protocol", predicates::is_string, "should be http or https")
                .attribute("name", predicates::is_string, "should be a string")
        })
    }
}

impl FromNode for Port {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("port")),
        }
    }
}

impl Entry for Port {
    node!();

    fn value(&self) -> Value {
        let config = self.node.config();
        let number = match config {
            Value::Integer(_) => config.clone(),
            config => config.get("number").cloned().unwrap_or_default(),
        };
        [
            ("number", number),
            ("protocol", config.get("protocol").cloned().unwrap_or(DEFAULT_PROTOCOL.into())),
            ("name", config.get("name").cloned().unwrap_or(DEFAULT_PORT_NAME.into())),
        ]
        .into_iter()
        .collect()
    }
}

/// Port names and numbers must be unique across a job
fn check_unique_ports<'a>(ports: impl Iterator<Item = &'a Value>, report: &mut Report) {
    let mut names = HashSet::new();
    let mut numbers = HashSet::new();
    let mut duplicate_name = false;
    let mut duplicate_number = false;

    for port in ports {
        let number = match port {
            Value::Integer(number) => Some(*number),
            port => port.get("number").and_then(Value::as_i64),
        };
        if let Some(number) = number {
            duplicate_number |= !numbers.insert(number);
        }
        if let Some(name) = port.get("name").and_then(Value::as_str) {
            duplicate_name |= !names.insert(name.to_string());
        }
    }

    if duplicate_name {
        report.add("", "each port name must be different");
    }
    if duplicate_number {
        report.add("", "each port number can only be referenced once");
    }
}

#[derive(Debug)]
pub struct Ports {
    node: Node,
    ports: Vec<Port>,
}

impl FromNode for Ports {
    fn from_node(node: Node) -> Self {
        let validator = crate::validator!(|| {
            Validator::new()
                .config(|config| config.is_array(), "should be an array")
                .check(|node, report| {
                    if let Some(ports) = node.config().as_array() {
                        check_unique_ports(ports.iter(), report);
                    }
                })
        });
        Self {
            node: validator.validated(node.named("ports")),
            ports: Vec::new(),
        }
    }
}

impl Entry for Ports {
    node!();

    fn compose(&mut self, _deps: Option<&Deps<'_>>) -> Result<(), ComposeError> {
        let Some(configs) = self.node.config().as_array().filter(|_| !self.node.has_errors()) else {
            return Ok(());
        };
        self.ports = configs
            .iter()
            .map(|config| Port::from_node(Node::new(config.clone()).with_ancestors(self.node.path())))
            .collect();
        Ok(())
    }

    fn value(&self) -> Value {
        self.ports.iter().map(Entry::value).collect::<Vec<_>>().into()
    }

    fn descendants(&self) -> Vec<&dyn Entry> {
        self.ports.iter().map(|port| port as &dyn Entry).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config;
    use pretty_assertions::assert_eq;

    fn image(config: Value) -> Image {
        let mut image = Image::from_node(Node::new(config).with_key("image"));
        image.compose(None).unwrap();
        image
    }

    fn services(config: Value) -> Services {
        let node = Node::new(config).with_ancestors(vec!["jobs".into(), "rspec".into()]).with_key("services");
        let mut services = Services::from_node(node);
        services.compose(None).unwrap();
        services
    }

    #[test]
    fn image_from_string() {
        let entry = image(config!("ruby:3.3"));
        assert!(entry.is_valid());
        assert_eq!(entry.value(), config!("name: ruby:3.3"));
    }

    #[test]
    fn image_from_hash() {
        let entry = image(config!(
            r#"
            name: ruby:3.3
            entrypoint: ["/bin/sh"]
            pull_policy: if-not-present
            ports: [80]
            "#
        ));
        assert!(entry.is_valid(), "{:?}", entry.errors());
        assert_eq!(
            entry.value(),
            config!(
                r#"
                name: ruby:3.3
                entrypoint: ["/bin/sh"]
                ports: [{number: 80, protocol: http, name: default_port}]
                pull_policy: [if-not-present]
                "#
            )
        );
    }

    #[test]
    fn invalid_image() {
        assert_eq!(
            image(config!("[ruby]")).errors(),
            vec!["image config should be a hash or a string"]
        );
        assert_eq!(
            image(config!("{entrypoint: [sh], pull_policy: sometimes}")).errors(),
            vec![
                "image name can't be blank",
                "image pull policy contains unknown values: sometimes",
            ]
        );
    }

    #[test]
    fn services_from_strings_and_hashes() {
        let entry = services(config!("[postgres, {name: redis, alias: cache, command: [redis-server]}]"));
        assert!(entry.is_valid());
        assert_eq!(
            entry.value(),
            config!("[{name: postgres}, {name: redis, alias: cache, command: [redis-server]}]")
        );
    }

    #[test]
    fn invalid_services() {
        assert_eq!(
            services(config!("postgres")).errors(),
            vec!["jobs:rspec:services config should be a array"]
        );
        assert_eq!(
            services(config!("[[postgres]]")).errors(),
            vec!["jobs:rspec:services:service config should be a hash or a string"]
        );
    }

    #[test]
    fn service_variables() {
        let entry = services(config!("[{name: mysql, variables: {MYSQL_DATABASE: test}}]"));
        assert!(entry.is_valid());
        assert_eq!(
            entry.value(),
            config!("[{name: mysql, variables: {MYSQL_DATABASE: test}}]")
        );
    }

    #[test]
    fn duplicate_port_names() {
        let entry = image(config!(
            "{name: nginx, ports: [{number: 80, name: web}, {number: 443, name: web}]}"
        ));
        assert_eq!(entry.errors(), vec!["image:ports each port name must be different"]);
    }

    #[test]
    fn duplicate_port_numbers() {
        let entry = image(config!("{name: nginx, ports: [80, {number: 80, name: web}]}"));
        assert_eq!(entry.errors(), vec!["image:ports each port number can only be referenced once"]);
    }

    #[test]
    fn duplicate_port_names_and_numbers() {
        let entry = image(config!(
            "{name: nginx, ports: [{number: 80, name: web}, {number: 80, name: web}]}"
        ));
        assert_eq!(
            entry.errors(),
            vec![
                "image:ports each port name must be different",
                "image:ports each port number can only be referenced once",
            ]
        );
    }

    #[test]
    fn port_numbers_unique_across_services() {
        let entry = services(config!("[{name: a, ports: [80]}, {name: b, ports: [80]}]"));
        assert_eq!(
            entry.errors(),
            vec!["jobs:rspec:services each port number can only be referenced once"]
        );
    }
}
