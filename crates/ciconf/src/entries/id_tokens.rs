//! OIDC id tokens
use crate::entry::{node, predicates, ComposeError, Deps, Entry, FromNode, Node, Validator};
use crate::value::Value;

/// A single token with its audience
#[derive(Debug)]
pub struct IdToken {
    node: Node,
}

impl FromNode for IdToken {
    fn from_node(node: Node) -> Self {
        let validator = crate::validator!(|| {
            Validator::new()
                .config(predicates::is_hash, "should be a hash")
                .required_keys(&["aud"])
                .allowed_keys(&["aud"])
                .check(|node, report| {
                    let valid = node
                        .attribute("aud")
                        .is_some_and(predicates::is_array_of_strings_or_string);
                    if !valid {
                        report.add("aud", "should be an array of strings or a string");
                    }
                })
        });
        Self {
            node: validator.validated(node.named("id_token")),
        }
    }
}

impl Entry for IdToken {
    node!();
}

/// Tokens keyed by the variable name they are exposed as
#[derive(Debug)]
pub struct IdTokens {
    node: Node,
    tokens: Vec<IdToken>,
}

impl FromNode for IdTokens {
    fn from_node(node: Node) -> Self {
        let validator =
            crate::validator!(|| Validator::new().config(predicates::is_hash, "should be a hash"));
        Self {
            node: validator.validated(node.named("id_tokens")),
            tokens: Vec::new(),
        }
    }
}

impl Entry for IdTokens {
    node!();

    fn compose(&mut self, _deps: Option<&Deps<'_>>) -> Result<(), ComposeError> {
        let Some(tokens) = self.node.config().as_object().filter(|_| !self.node.has_errors()) else {
            return Ok(());
        };
        self.tokens = tokens
            .iter()
            .map(|(name, config)| {
                let node = Node::new(config.clone())
                    .with_key(name.clone())
                    .with_ancestors(self.node.path());
                IdToken::from_node(node)
            })
            .collect();
        Ok(())
    }

    fn value(&self) -> Value {
        self.tokens
            .iter()
            .map(|token| (token.key().unwrap_or_default(), token.value()))
            .collect()
    }

    fn descendants(&self) -> Vec<&dyn Entry> {
        self.tokens.iter().map(|token| token as &dyn Entry).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config;
    use pretty_assertions::assert_eq;

    fn id_tokens(config: Value) -> IdTokens {
        let mut entry = IdTokens::from_node(Node::new(config).with_key("id_tokens"));
        entry.compose(None).unwrap();
        entry
    }

    #[test]
    fn tokens() {
        let entry = id_tokens(config!(
            "{VAULT_TOKEN: {aud: https://vault.example.com}, AWS_TOKEN: {aud: [sts, s3]}}"
        ));
        assert!(entry.is_valid());
        assert_eq!(
            entry.value(),
            config!("{VAULT_TOKEN: {aud: https://vault.example.com}, AWS_TOKEN: {aud: [sts, s3]}}")
        );
    }

    #[test]
    fn missing_audience() {
        let entry = id_tokens(config!("TEST_ID_TOKEN: {id_token: https://gitlab.com}"));
        assert_eq!(
            entry.errors(),
            vec![
                "id_tokens:test_id_token config missing required keys: aud",
                "id_tokens:test_id_token config contains unknown keys: id_token",
                "id_tokens:test_id_token aud should be an array of strings or a string",
            ]
        );
    }
}
