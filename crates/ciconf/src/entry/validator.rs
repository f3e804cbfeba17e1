//! Declarative validation rules
//!
//! Each entry type owns one [Validator], built on first use and shared read-only afterwards:
//!
//! ```
//! # use ciconf::entry::{predicates, Validator};
//! fn validator() -> &'static Validator {
//!     ciconf::validator!(|| {
//!         Validator::new()
//!             .config(predicates::is_hash, "should be a hash")
//!             .allowed_keys(&["name", "url"])
//!     })
//! }
//! # validator();
//! ```
use super::Node;
use crate::value::Value;

type Check = Box<dyn Fn(&Node, &mut Report) + Send + Sync>;

/// Messages collected by the checks of a [Validator]
#[derive(Debug, Default)]
pub struct Report {
    errors: Vec<(String, String)>,
}

impl Report {
    /// Add a message for `attribute` (`""` for the node itself)
    pub fn add(&mut self, attribute: &str, message: impl Into<String>) {
        self.errors.push((attribute.to_string(), message.into()));
    }
}

#[derive(Default)]
pub struct Validator {
    checks: Vec<Check>,
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("checks", &self.checks.len())
            .finish()
    }
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run all checks and record their messages on the node. Unspecified nodes are skipped.
    pub fn validate(&self, node: &mut Node) {
        if !node.is_specified() {
            return;
        }

        let mut report = Report::default();
        for check in &self.checks {
            check(node, &mut report);
        }

        for (attribute, message) in report.errors {
            node.error(&attribute, message);
        }
    }

    /// Validate a freshly built node and hand it back
    pub fn validated(&self, mut node: Node) -> Node {
        self.validate(&mut node);
        node
    }

    /// Arbitrary check
    pub fn check(mut self, check: impl Fn(&Node, &mut Report) + Send + Sync + 'static) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    /// The config as a whole must satisfy `predicate`
    pub fn config(self, predicate: fn(&Value) -> bool, message: &'static str) -> Self {
        self.check(move |node, report| {
            if !predicate(node.config()) {
                report.add("config", message);
            }
        })
    }

    /// A present attribute must satisfy `predicate`
    pub fn attribute(
        self,
        name: &'static str,
        predicate: fn(&Value) -> bool,
        message: &'static str,
    ) -> Self {
        self.check(move |node, report| {
            if let Some(value) = node.attribute(name) {
                if !predicate(value) {
                    report.add(name, message);
                }
            }
        })
    }

    /// Attribute must be present and not blank
    pub fn presence(self, name: &'static str) -> Self {
        self.check(move |node, report| {
            if node.attribute(name).map_or(true, Value::is_blank) {
                report.add(name, "can't be blank");
            }
        })
    }

    /// A present string attribute must be one of `allowed`
    pub fn inclusion(
        self,
        name: &'static str,
        allowed: &'static [&'static str],
        message: &'static str,
    ) -> Self {
        self.check(move |node, report| {
            if let Some(value) = node.attribute(name).and_then(Value::as_str) {
                if !allowed.contains(&value) {
                    report.add(name, message);
                }
            }
        })
    }

    /// Hash configs may only use `keys`
    pub fn allowed_keys(self, keys: &'static [&'static str]) -> Self {
        self.check(move |node, report| {
            let Some(object) = node.config().as_object() else {
                return;
            };

            let unknown: Vec<_> = object
                .keys()
                .filter(|key| !keys.contains(&key.as_str()))
                .map(String::as_str)
                .collect();
            if !unknown.is_empty() {
                report.add("config", format!("contains unknown keys: {}", unknown.join(", ")));
            }
        })
    }

    /// Hash configs must use all of `keys`
    pub fn required_keys(self, keys: &'static [&'static str]) -> Self {
        self.check(move |node, report| {
            if !node.config().is_object() {
                return;
            }

            let missing: Vec<_> = keys
                .iter()
                .filter(|key| !node.has_attribute(key))
                .copied()
                .collect();
            if !missing.is_empty() {
                report.add("config", format!("missing required keys: {}", missing.join(", ")));
            }
        })
    }

    /// At most one of `keys` may be used
    pub fn mutually_exclusive_keys(self, keys: &'static [&'static str]) -> Self {
        self.check(move |node, report| {
            let present: Vec<_> = keys
                .iter()
                .filter(|key| node.has_attribute(key))
                .copied()
                .collect();
            if present.len() > 1 {
                report.add(
                    "config",
                    format!("these keys cannot be used together: {}", present.join(", ")),
                );
            }
        })
    }
}

/// Lazily built, per call-site [Validator] singleton
#[macro_export]
macro_rules! validator {
    ($build:expr) => {{
        static VALIDATOR: ::std::sync::OnceLock<$crate::entry::Validator> =
            ::std::sync::OnceLock::new();
        VALIDATOR.get_or_init($build)
    }};
}
