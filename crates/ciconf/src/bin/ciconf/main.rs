mod cli;

use ciconf::document::{CiConfig, Outcome};
use ciconf::entry::Entry;
use ciconf::value::Value;
use std::path::Path;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("CICONF_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match cli.command {
        cli::Command::Validate(validate_cli) => validate(validate_cli),
        cli::Command::Dev(dev_cli) => dev(dev_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

pub fn validate(cli: cli::ValidateCommand) -> anyhow::Result<()> {
    let config = load(&cli.input)?;

    let mut errors = match config.outcome() {
        Outcome::Valid(pipeline) => {
            for warning in &pipeline.warnings {
                tracing::warn!("{warning}");
            }
            output(&cli.output, &pipeline)?;
            Vec::new()
        }
        Outcome::Invalid(errors) => errors,
    };

    if cli.check_includes {
        errors.extend(missing_includes(&config)?);
    }

    for error in &errors {
        eprintln!("{error}");
    }
    anyhow::ensure!(errors.is_empty(), "Configuration is invalid");
    Ok(())
}

fn load(input: &cli::InputArgs) -> anyhow::Result<CiConfig> {
    let Some(file_path) = &input.file else {
        let stdin = std::io::read_to_string(std::io::stdin())?;
        return Ok(CiConfig::from_yaml(&stdin)?);
    };

    Ok(CiConfig::load_file(file_path)?)
}

fn output(output: &cli::OutputArgs, value: &impl serde::Serialize) -> anyhow::Result<()> {
    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), value)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), value)?,
    };

    Ok(())
}

/// `local` includes that do not exist next to the document
fn missing_includes(config: &CiConfig) -> anyhow::Result<Vec<String>> {
    let base = match config.source().and_then(Path::parent) {
        Some(directory) => directory.to_owned(),
        None => std::env::current_dir()?,
    };

    let includes = match config.root().include_value() {
        Value::Array(includes) => includes,
        _ => Vec::new(),
    };

    let missing = includes
        .iter()
        .filter_map(|include| match include {
            Value::String(location) if !location.contains("://") => Some(location.as_str()),
            include => include.get("local").and_then(Value::as_str),
        })
        // patterns are expanded by whoever resolves includes
        .filter(|location| !location.contains('*'))
        .filter(|location| !base.join(location.trim_start_matches('/')).is_file())
        .map(|location| format!("Local file `{location}` does not exist!"))
        .collect();
    Ok(missing)
}

/// (ciconf-)developer utilities
///
/// A quick way to expose internal structures for debugging purposes
pub fn dev(cli: cli::DevCommand) -> anyhow::Result<()> {
    let config = load(&cli.input)?;

    match cli.command {
        cli::DevSubCommand::Tree => ciconf::visit::walk(config.root(), &mut |entry: &dyn Entry, depth: usize| {
            let marker = if entry.is_valid() { "" } else { " (invalid)" };
            let key = entry.key().unwrap_or("-");
            println!("{:indent$}{key}{marker}", "", indent = depth * 2);
        }),
        cli::DevSubCommand::Value(output_args) => output(&output_args, &config.root().value())?,
    }

    Ok(())
}
