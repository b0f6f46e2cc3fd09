//! Audience resolution for broadcasts

use std::collections::HashSet;

use crate::audience::Scope;

/// Chat IDs a broadcast with `scope` should reach
///
/// Leads come first, then authorized groups. Duplicates are removed while
/// keeping first-seen order, so an ID present in both sets is sent once.
#[must_use]
pub fn resolve(scope: Scope, leads: &[i64], authorized_groups: &[i64]) -> Vec<i64> {
    let sources: [&[i64]; 2] = match scope {
        Scope::Global => [leads, authorized_groups],
        Scope::Private => [leads, &[]],
        Scope::Group => [&[], authorized_groups],
    };

    let mut seen = HashSet::new();
    sources
        .into_iter()
        .flatten()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_is_deduplicated_union() {
        let targets = resolve(Scope::Global, &[1, 2, 3, 2], &[3, -10]);
        assert_eq!(targets, vec![1, 2, 3, -10]);
    }

    #[test]
    fn private_and_group_are_disjoint() {
        let leads = [1, 2];
        let groups = [-10, -20];
        assert_eq!(resolve(Scope::Private, &leads, &groups), vec![1, 2]);
        assert_eq!(resolve(Scope::Group, &leads, &groups), vec![-10, -20]);
    }

    #[test]
    fn empty_sets_resolve_to_nothing() {
        assert!(resolve(Scope::Global, &[], &[]).is_empty());
        assert!(resolve(Scope::Group, &[1], &[]).is_empty());
    }
}
