//! Entry types of a pipeline configuration
//!
//! [Root] is the entry point. It declares the top-level keywords and hands every other key to
//! [Jobs], which picks [Job], [Bridge] or [Hidden] for each of them.
mod allow_failure;
mod artifacts;
mod boolean;
mod bridge;
mod cache;
mod coverage;
mod default;
mod environment;
mod hidden;
mod hooks;
mod id_tokens;
mod image;
mod include;
mod inherit;
mod job;
mod jobs;
mod needs;
mod parallel;
pub mod policy;
mod processable;
mod release;
mod retry;
mod root;
mod rules;
mod run;
mod script;
pub mod stage;
mod tags;
mod timeout;
mod trigger;
mod variables;
mod workflow;

pub use allow_failure::AllowFailure;
pub use artifacts::Artifacts;
pub use boolean::Boolean;
pub use bridge::{Bridge, BRIDGE_WHEN};
pub use cache::{Cache, Caches, Files, Key, Paths, Prefix};
pub use coverage::Coverage;
pub use default::DefaultEntry;
pub use environment::{Environment, Kubernetes};
pub use hidden::Hidden;
pub use hooks::Hooks;
pub use id_tokens::{IdToken, IdTokens};
pub use image::{Image, Port, Ports, Service, Services};
pub use include::{Include, Includes};
pub use inherit::{Inherit, InheritDefault, InheritVariables, INHERITABLE_KEYS};
pub use job::{Job, JOB_WHEN};
pub use jobs::Jobs;
pub use needs::{Need, NeedKind, Needs};
pub use parallel::Parallel;
pub use policy::Policy;
pub use release::{Assets, Link, Links, Release};
pub use retry::{Retry, RETRY_WHEN};
pub use root::{Root, RESERVED_KEYS};
pub use rules::{Rule, Rules, JOB_RULE_WHEN, WORKFLOW_RULE_WHEN};
pub use run::Run;
pub use script::{Commands, Script};
pub use stage::{Stage, Stages};
pub use tags::Tags;
pub use timeout::Timeout;
pub use trigger::Trigger;
pub use variables::{LegacyVariables, Variable, Variables};
pub use workflow::Workflow;
