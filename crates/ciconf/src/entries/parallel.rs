//! `parallel:` runs a job multiple times, either `n` times or once per matrix combination
use crate::entry::{node, Entry, FromNode, Metadata, Node, Report, Validator};
use crate::limits::{PARALLEL_MAX, PARALLEL_MIN};
use crate::value::{Map, Value};

#[derive(Debug)]
pub struct Parallel {
    node: Node,
}

impl Parallel {
    /// Bridges can only use the matrix form
    pub const MATRIX_ONLY: Metadata = Metadata {
        allowed_strategies: Some(&["matrix"]),
        ..Metadata::EMPTY
    };

    fn validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new()
                .check(|node, report| {
                    let allows = |strategy: &str| {
                        node.metadata()
                            .allowed_strategies
                            .map_or(true, |allowed| allowed.contains(&strategy))
                    };
                    match node.config() {
                        Value::Integer(_) if !allows("number") => {
                            report.add("config", "cannot use \"parallel: <number>\".")
                        }
                        Value::Integer(number) => check_number(*number, report),
                        Value::Object(_) if !allows("matrix") => {
                            report.add("config", "cannot use \"parallel: matrix\".")
                        }
                        Value::Object(_) => {}
                        _ => report.add("", "should be an integer or a hash"),
                    }
                })
                .allowed_keys(&["matrix"])
                .required_keys(&["matrix"])
                .check(|node, report| {
                    if let Some(matrix) = node.attribute("matrix") {
                        check_matrix(matrix, report);
                    }
                })
        })
    }
}

fn check_number(number: i64, report: &mut Report) {
    if number < PARALLEL_MIN {
        report.add("config", format!("must be greater than or equal to {PARALLEL_MIN}"));
    } else if number > PARALLEL_MAX {
        report.add("config", format!("must be less than or equal to {PARALLEL_MAX}"));
    }
}

/// Values of one matrix variable as strings
fn matrix_values(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(values) => values.iter().map(Value::to_scalar_string).collect(),
        value => value.to_scalar_string().map(|value| vec![value]),
    }
}

fn check_matrix(matrix: &Value, report: &mut Report) {
    let Some(rows) = matrix.as_array().filter(|rows| !rows.is_empty()) else {
        report.add("matrix", "should be an array of hashes");
        return;
    };

    let mut jobs = 0usize;
    for row in rows {
        let Some(row) = row.as_object().filter(|row| !row.is_empty()) else {
            report.add("matrix", "should be an array of hashes");
            return;
        };
        let mut combinations = 1usize;
        for values in row.values() {
            let Some(values) = matrix_values(values) else {
                report.add("matrix", "variables should be strings or arrays of strings");
                return;
            };
            combinations = combinations.saturating_mul(values.len());
        }
        jobs = jobs.saturating_add(combinations);
    }

    if jobs > PARALLEL_MAX as usize {
        report.add("matrix", format!("config generates too many jobs (maximum is {PARALLEL_MAX})"));
    }
}

impl FromNode for Parallel {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("parallel")),
        }
    }
}

impl Entry for Parallel {
    node!();

    /// `{number: n}` or `{matrix: [{VAR: [values]}]}`
    fn value(&self) -> Value {
        let config = self.node.config();
        if config.is_integer() {
            return [("number", config.clone())].into_iter().collect();
        }

        let rows = config.get("matrix").and_then(Value::as_array).into_iter().flatten();
        let matrix: Vec<Value> = rows
            .filter_map(Value::as_object)
            .map(|row| {
                row.iter()
                    .map(|(name, values)| (name.clone(), matrix_values(values).into()))
                    .collect::<Map>()
                    .into()
            })
            .collect();
        [("matrix", Value::from(matrix))].into_iter().collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config;
    use pretty_assertions::assert_eq;

    fn parallel(config: Value, metadata: Metadata) -> Parallel {
        Parallel::from_node(Node::new(config).with_key("parallel").with_metadata(metadata))
    }

    #[test]
    fn number() {
        let entry = parallel(config!("5"), Metadata::EMPTY);
        assert!(entry.is_valid());
        assert_eq!(entry.value(), config!("number: 5"));
        assert_eq!(
            parallel(config!("0"), Metadata::EMPTY).errors(),
            vec!["parallel config must be greater than or equal to 1"]
        );
        assert_eq!(
            parallel(config!("201"), Metadata::EMPTY).errors(),
            vec!["parallel config must be less than or equal to 200"]
        );
    }

    #[test]
    fn matrix() {
        let entry = parallel(
            config!("matrix: [{PROVIDER: aws, STACK: [monitoring, app]}, {PROVIDER: ovh, VERSION: 1}]"),
            Metadata::EMPTY,
        );
        assert!(entry.is_valid(), "{:?}", entry.errors());
        assert_eq!(
            entry.value(),
            config!(
                r#"
                matrix:
                  - {PROVIDER: [aws], STACK: [monitoring, app]}
                  - {PROVIDER: [ovh], VERSION: ['1']}
                "#
            )
        );
    }

    #[test]
    fn bridge_forms() {
        assert_eq!(
            parallel(config!("2"), Parallel::MATRIX_ONLY).errors(),
            vec!["parallel config cannot use \"parallel: <number>\"."]
        );
        assert!(parallel(config!("matrix: [{A: [b]}]"), Parallel::MATRIX_ONLY).is_valid());
    }

    #[test]
    fn invalid() {
        assert_eq!(
            parallel(config!("two"), Metadata::EMPTY).errors(),
            vec!["parallel should be an integer or a hash"]
        );
        assert_eq!(
            parallel(config!("{}"), Metadata::EMPTY).errors(),
            vec!["parallel config missing required keys: matrix"]
        );
        assert_eq!(
            parallel(config!("matrix: [[a]]"), Metadata::EMPTY).errors(),
            vec!["parallel matrix should be an array of hashes"]
        );
    }

    #[test]
    fn too_many_jobs() {
        let values: Vec<String> = (0..15).map(|i| i.to_string()).collect();
        let row: Value = [("A", Value::from(values.clone())), ("B", Value::from(values))]
            .into_iter()
            .collect();
        let config: Value = [("matrix", Value::from(vec![row]))].into_iter().collect();
        assert_eq!(
            parallel(config, Metadata::EMPTY).errors(),
            vec!["parallel matrix config generates too many jobs (maximum is 200)"]
        );
    }
}
