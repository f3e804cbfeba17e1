//! All jobs of a pipeline
use crate::entries::{Bridge, Hidden, Job};
use crate::entry::{
    construct, node, predicates, ComposeError, Constructor, Deps, Entry, Factory, FromNode, Node,
    Validator,
};
use crate::value::Value;

/// Jobs keyed by name. The type of each job is decided by its name and config.
#[derive(Debug)]
pub struct Jobs {
    node: Node,
    jobs: Vec<Box<dyn Entry>>,
}

impl Jobs {
    /// Entry type for a job, `None` when the config cannot be a job
    pub fn find_type(name: &str, config: &Value) -> Option<Constructor> {
        if Hidden::is_hidden(name) {
            return Some(construct::<Hidden>);
        }
        let job = config.as_object()?;
        if job.contains_key("trigger") {
            Some(construct::<Bridge>)
        } else {
            Some(construct::<Job>)
        }
    }

    fn validator() -> &'static Validator {
        crate::validator!(|| {
            Validator::new()
                .config(predicates::is_hash, "should be a hash")
                .check(|node, report| {
                    let Some(jobs) = node.config().as_object() else {
                        return;
                    };
                    if jobs.iter().any(|(name, config)| Self::find_type(name, config).is_none()) {
                        report.add("config", "should contain valid jobs");
                    }
                    if !jobs.keys().any(|name| !Hidden::is_hidden(name)) {
                        report.add("config", "should contain at least one visible job");
                    }
                })
        })
    }

    pub fn get(&self, name: &str) -> Option<&dyn Entry> {
        self.jobs
            .iter()
            .find(|job| job.key() == Some(name))
            .map(|job| job.as_ref())
    }
}

impl FromNode for Jobs {
    fn from_node(node: Node) -> Self {
        Self {
            node: Self::validator().validated(node.named("jobs")),
            jobs: Vec::new(),
        }
    }
}

impl Entry for Jobs {
    node!();

    fn compose(&mut self, deps: Option<&Deps<'_>>) -> Result<(), ComposeError> {
        let Some(configs) = self.node.config().as_object().filter(|_| !self.node.has_errors()) else {
            return Ok(());
        };

        let mut jobs = Vec::with_capacity(configs.len());
        for (name, config) in configs {
            let Some(constructor) = Self::find_type(name, config) else {
                continue;
            };
            let mut job = Factory::new(constructor)
                .value(config.clone())
                .with(name.clone(), self.node.path(), "")
                .create()?;
            job.compose(deps)?;
            tracing::trace!(job = %name, valid = job.is_valid(), "composed job");
            jobs.push(job);
        }
        self.jobs = jobs;
        Ok(())
    }

    /// Values of all relevant jobs
    fn value(&self) -> Value {
        self.jobs
            .iter()
            .filter(|job| job.is_relevant())
            .map(|job| (job.key().unwrap_or_default(), job.value()))
            .collect()
    }

    fn descendants(&self) -> Vec<&dyn Entry> {
        self.jobs.iter().map(|job| job.as_ref()).collect()
    }
}
