//! Fixture tests
//!
//! Loads each *.yml file in /tests/fixtures/ and composes its `config`. A fixture either lists
//! `errors` (each must be part of an emitted error) or describes a subset of the pipeline it
//! expects (`stages`, `jobs`, `variables`).
use ciconf::document::{CiConfig, Outcome};
use ciconf::value::Value;
use pretty_assertions::assert_eq;

/// Every key of `expected` must be present in `actual`, scalars and arrays must be equal
fn assert_subset(expected: &Value, actual: &Value, path: &str) {
    match (expected, actual) {
        (Value::Object(expected), Value::Object(actual)) => {
            for (key, expected) in expected {
                let path = format!("{path}.{key}");
                let actual = actual.get(key).unwrap_or(&Value::Null);
                assert_subset(expected, actual, &path);
            }
        }
        (expected, actual) => assert_eq!(expected, actual, "at {path}"),
    }
}

#[test]
fn fixtures() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("CICONF_LOG"))
        .with_writer(std::io::stderr)
        .try_init();

    insta::glob!("fixtures/*.yml", |path| {
        let fixture = std::fs::read_to_string(path).unwrap();
        let fixture: Value = serde_yaml::from_str::<serde_yaml::Value>(&fixture).unwrap().into();
        let config = fixture.get("config").cloned().unwrap_or_default();
        let config = CiConfig::new(config).expect("must compose");

        match (fixture.get("errors"), config.outcome()) {
            (Some(expected), Outcome::Invalid(errors)) => {
                for expected in expected.as_strings().expect("errors must be strings") {
                    assert!(
                        errors.iter().any(|error| error.contains(&expected)),
                        "{}: `{expected}` not found in {errors:#?}",
                        path.display()
                    );
                }
            }
            (Some(_), Outcome::Valid(_)) => panic!("{}: expected errors", path.display()),
            (None, Outcome::Invalid(errors)) => {
                panic!("{}: unexpected errors {errors:#?}", path.display())
            }
            (None, Outcome::Valid(pipeline)) => {
                if let Some(stages) = fixture.get("stages") {
                    assert_eq!(stages, &Value::from(pipeline.stages.clone()));
                }
                if let Some(variables) = fixture.get("variables") {
                    assert_subset(variables, &pipeline.variables, "variables");
                }
                if let Some(jobs) = fixture.get("jobs") {
                    assert_subset(jobs, &pipeline.jobs, "jobs");
                }
                if let Some(warnings) = fixture.get("warnings") {
                    assert_eq!(warnings, &Value::from(pipeline.warnings.clone()));
                }
            }
        }
    });
}
