//! # ciconf - CI configuration composition
//!
//! Validates a CI pipeline document (`.gitlab-ci.yml` style) and turns it into a normalized
//! pipeline: every job with its stage, scripts, inherited defaults and effective variables.
//!
//! ## Introduction for developers
//!
//! Read this to understand how `ciconf` works internally.
//!
//! ### Terms
//!
//! - a `document` is a single YAML file, decoded into a [value::Value]
//! - an `entry` validates and normalizes one fragment of the document, e.g. `cache:` of a job
//! - a `job` is any top-level key that is not a reserved keyword, `.hidden` jobs are templates
//!
//! ```yaml
//! stages: [build, test]
//!
//! default:
//!   image: ruby:3.2
//!
//! .cached:
//!   cache: {key: gems, paths: [vendor]}
//!
//! rspec:
//!   stage: test
//!   script: bundle exec rspec
//! ```
//!
//! ### Building the tree
//!
//! see [entries::Root]
//!
//! Each entry type declares its children in a static table of [entry::EntryDecl]s. Building a
//! child hands out a fresh [entry::Factory] which creates the entry from its part of the config.
//! Entries validate themselves right away, messages are recorded on their [entry::Node].
//!
//! An entry whose own config is invalid does not build children. This keeps messages focused on
//! the outermost problem:
//!
//! | **config**                     | **errors**                                                |
//! |--------------------------------|-----------------------------------------------------------|
//! | `rspec: make`                  | `root config contains unknown keys: rspec`                |
//! | `rspec: {cache: true}`         | `jobs:rspec script can't be blank`                        |
//! | `rspec: {script: a, retry: 3}` | `jobs:rspec:retry config must be less than or equal to 2` |
//!
//! ### Composition
//!
//! Children are created during [entry::Entry::compose]. Order matters for the root:
//!
//! 1. top-level keywords (`variables:`, `stages:`, ...)
//! 2. `default:`, which takes over `image:`, `cache:`, ... defined at the top level
//! 3. `workflow:`
//! 4. all jobs, which may read (2) and (3) through [entry::Deps]
//!
//! Jobs take over keywords they do not set from `default:` unless `inherit:` says otherwise.
//!
//! ### Output
//!
//! [document::CiConfig] resolves `extends:` with [extends::resolve] and wraps the composed root.
//! When the tree is valid the jobs are checked against each other (stages, `dependencies:`,
//! `needs:`, `on_stop:`) and the result is a [document::Outcome]. The normalized pipeline is a tree of [value::Value]s which serializes via
//! [serde].
//!
pub mod document;
pub mod entries;
pub mod entry;
pub mod extends;
pub mod limits;
mod util;
pub mod value;
pub mod visit;

pub use util::parse_duration;

#[doc(hidden)]
pub use serde_yaml;
