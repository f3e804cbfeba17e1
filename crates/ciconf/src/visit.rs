//! visitor pattern helpers
use crate::entry::Entry;

/// Visitor of a composed entry tree
pub trait Visit {
    fn visit(&mut self, entry: &dyn Entry, depth: usize);
}

// blanket impl for FnMut
impl<F> Visit for F
where
    F: FnMut(&dyn Entry, usize),
{
    fn visit(&mut self, entry: &dyn Entry, depth: usize) {
        self(entry, depth)
    }
}

/// Depth-first walk over `entry` (depth 0) and all of its descendants
pub fn walk<V: Visit>(entry: &dyn Entry, visitor: &mut V) {
    fn walk_at<V: Visit>(entry: &dyn Entry, depth: usize, visitor: &mut V) {
        visitor.visit(entry, depth);
        for descendant in entry.descendants() {
            walk_at(descendant, depth + 1, visitor);
        }
    }

    walk_at(entry, 0, visitor)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config;
    use crate::entries::Root;
    use pretty_assertions::assert_eq;

    #[test]
    fn walks_depth_first() {
        let mut root = Root::new(config!("{stages: [build], build: {stage: build, script: make}}"));
        root.compose(None).unwrap();

        let mut jobs = Vec::new();
        walk(&root, &mut |entry: &dyn Entry, depth: usize| {
            if entry.location().starts_with("jobs:") && depth == 2 {
                jobs.push(entry.location());
            }
        });
        assert_eq!(jobs, vec!["jobs:build"]);

        let mut leaves = 0;
        walk(&root, &mut |entry: &dyn Entry, _depth: usize| {
            if entry.is_leaf() {
                leaves += 1;
            }
        });
        assert!(leaves > 10);
    }
}
