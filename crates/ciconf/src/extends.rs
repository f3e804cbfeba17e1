//! `extends:` resolution
//!
//! Runs on the raw document before any entry is built. Every top-level hash with `extends:` is
//! replaced by its bases deep merged in order, with its own keys merged on top:
//!
//! ```
//! # use ciconf::{config, extends};
//! let document = config!(".template: {script: test, image: ruby}\nrspec: {extends: .template, image: alpine}");
//! let resolved = extends::resolve(document).unwrap();
//! assert_eq!(resolved.get("rspec"), Some(&config!("{script: test, image: alpine, extends: .template}")));
//! ```
//!
//! Hashes are merged key by key, any other value of the extending hash replaces the base value.
use crate::limits::EXTENDS_MAX_NESTING;
use crate::value::{Map, Value};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ExtendsError {
    #[error("{key}: unknown keys in `extends` ({})", .bases.join(", "))]
    UnknownKeys { key: String, bases: Vec<String> },
    #[error("{key}: invalid base hashes in `extends` ({})", .bases.join(", "))]
    InvalidBase { key: String, bases: Vec<String> },
    #[error("{key}: nesting too deep in `extends`")]
    NestingTooDeep { key: String },
    #[error("{key}: circular dependency detected in `extends`")]
    CircularDependency { key: String },
}

/// Bases a top-level value extends, `None` when it does not use `extends:`
fn bases(value: &Value) -> Option<Vec<String>> {
    match value.get("extends")? {
        Value::String(base) => Some(vec![base.clone()]),
        extends => extends.as_strings(),
    }
}

struct Resolver<'a> {
    document: &'a Map,
    resolved: Map,
}

impl Resolver<'_> {
    fn extend(&mut self, key: &str, chain: &mut Vec<String>) -> Result<Value, ExtendsError> {
        if let Some(value) = self.resolved.get(key) {
            return Ok(value.clone());
        }
        let value = self.document.get(key).cloned().unwrap_or_default();
        let Some(bases) = bases(&value) else {
            return Ok(value);
        };

        if chain.iter().any(|ancestor| ancestor == key) {
            return Err(ExtendsError::CircularDependency { key: key.to_string() });
        }
        if chain.len() >= EXTENDS_MAX_NESTING {
            return Err(ExtendsError::NestingTooDeep { key: key.to_string() });
        }

        let unknown: Vec<_> = bases
            .iter()
            .filter(|base| !self.document.contains_key(base.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ExtendsError::UnknownKeys { key: key.to_string(), bases: unknown });
        }
        let invalid: Vec<_> = bases
            .iter()
            .filter(|base| !self.document.get(base.as_str()).is_some_and(Value::is_object))
            .cloned()
            .collect();
        if !invalid.is_empty() {
            return Err(ExtendsError::InvalidBase { key: key.to_string(), bases: invalid });
        }

        chain.push(key.to_string());
        let mut merged = Map::new();
        for base in &bases {
            let base = self.extend(base, chain)?;
            deep_merge(&mut merged, base);
        }
        chain.pop();
        deep_merge(&mut merged, value);

        let merged = Value::Object(merged);
        tracing::trace!(key, ?bases, "resolved extends");
        self.resolved.insert(key.to_string(), merged.clone());
        Ok(merged)
    }
}

fn deep_merge(target: &mut Map, overlay: Value) {
    let Value::Object(overlay) = overlay else {
        return;
    };
    for (key, value) in overlay {
        match value {
            Value::Object(nested) if target.get(&key).is_some_and(Value::is_object) => {
                if let Some(Value::Object(existing)) = target.get_mut(&key) {
                    deep_merge(existing, Value::Object(nested));
                }
            }
            value => {
                target.insert(key, value);
            }
        }
    }
}

/// Resolve `extends:` of every top-level hash of `document`
pub fn resolve(document: Value) -> Result<Value, ExtendsError> {
    let Value::Object(entries) = document else {
        return Ok(document);
    };

    let mut resolver = Resolver {
        document: &entries,
        resolved: Map::new(),
    };
    let mut resolved = Map::with_capacity(entries.len());
    for (key, value) in &entries {
        let value = match bases(value) {
            Some(_) => resolver.extend(key, &mut Vec::new())?,
            None => value.clone(),
        };
        resolved.insert(key.clone(), value);
    }
    Ok(resolved.into())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config;
    use pretty_assertions::assert_eq;

    #[test]
    fn recursive_extends() {
        let resolved = resolve(config!(
            r#"
            rspec:
              extends: .test
              script: rspec
              when: always
            .template:
              before_script: [bundle install]
            .test:
              extends: .template
              script: test
              image: image:test
            "#
        ))
        .unwrap();
        assert_eq!(
            resolved.get("rspec"),
            Some(&config!(
                r#"
                before_script: [bundle install]
                extends: .test
                script: rspec
                image: image:test
                when: always
                "#
            ))
        );
    }

    #[test]
    fn hashes_are_merged_deeply() {
        let resolved = resolve(config!(
            r#"
            .base: {variables: {A: a, B: b}, tags: [docker]}
            .other: {variables: {C: c}}
            rspec: {extends: [.base, .other], variables: {B: bee}, tags: [k8s], script: rspec}
            "#
        ))
        .unwrap();
        let rspec = resolved.get("rspec").unwrap();
        assert_eq!(rspec.get("variables"), Some(&config!("{A: a, B: bee, C: c}")));
        assert_eq!(rspec.get("tags"), Some(&config!("[k8s]")));
    }

    #[test]
    fn errors() {
        assert_eq!(
            resolve(config!("rspec: {extends: something, script: test}")).unwrap_err().to_string(),
            "rspec: unknown keys in `extends` (something)"
        );
        assert_eq!(
            resolve(config!("variables: [a]\nrspec: {extends: variables, script: test}")).unwrap_err().to_string(),
            "rspec: invalid base hashes in `extends` (variables)"
        );
        assert_eq!(
            resolve(config!(".a: {extends: .b}\n.b: {extends: .a}\nrspec: {extends: .a}")).unwrap_err(),
            ExtendsError::CircularDependency { key: ".a".into() }
        );
    }

    #[test]
    fn nesting_limit() {
        // `rspec` extends `.t1`, which extends `.t2` and so on up to `.t<length>`
        let chain = |length: usize| {
            let mut document = Map::new();
            document.insert("rspec".into(), config!("extends: .t1"));
            for level in 1..length {
                document.insert(format!(".t{level}"), config!(&format!("extends: .t{}", level + 1)));
            }
            document.insert(format!(".t{length}"), config!("script: test"));
            Value::from(document)
        };

        assert!(resolve(chain(10)).is_ok());
        assert_eq!(
            resolve(chain(11)).unwrap_err(),
            ExtendsError::NestingTooDeep { key: ".t10".into() }
        );
    }
}
