//! Laminar matroid: a nested-or-disjoint family of capacity-bounded sets.
//!
//! Sets are defined over group tags. For any two sets either one contains the
//! other or they share no group. Under that rule the sets containing a given
//! group form a chain, and an element is admissible iff every set on its
//! chain is below capacity.
//!
//! Equal sets count as nested: the one declared first is the outer one.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{RejectReason, Result, SelectError};

/// Which groups a laminar set covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetScope {
    /// Every group, including ones never named elsewhere
    All,
    /// An explicit list of groups
    Groups(BTreeSet<String>),
}

impl SetScope {
    pub fn contains(&self, group: &str) -> bool {
        match self {
            SetScope::All => true,
            SetScope::Groups(g) => g.contains(group),
        }
    }

    /// Is `self` a subset of `other`?
    fn is_subset(&self, other: &SetScope) -> bool {
        match (self, other) {
            (_, SetScope::All) => true,
            (SetScope::All, SetScope::Groups(_)) => false,
            (SetScope::Groups(a), SetScope::Groups(b)) => a.is_subset(b),
        }
    }

    fn is_disjoint(&self, other: &SetScope) -> bool {
        match (self, other) {
            (SetScope::Groups(a), SetScope::Groups(b)) => a.is_disjoint(b),
            _ => false,
        }
    }

    fn size(&self) -> usize {
        match self {
            SetScope::All => usize::MAX,
            SetScope::Groups(g) => g.len(),
        }
    }
}

/// One named set with its capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaminarSet {
    pub name: String,
    pub scope: SetScope,
    pub capacity: usize,
}

impl LaminarSet {
    pub fn new(name: impl Into<String>, scope: SetScope, capacity: usize) -> Self {
        Self {
            name: name.into(),
            scope,
            capacity,
        }
    }

    /// A set over an explicit list of groups.
    pub fn over<I, S>(name: impl Into<String>, groups: I, capacity: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            SetScope::Groups(groups.into_iter().map(Into::into).collect()),
            capacity,
        )
    }
}

/// A validated laminar family.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LaminarFamily {
    sets: Vec<LaminarSet>,
}

impl LaminarFamily {
    pub fn new(sets: Vec<LaminarSet>) -> Result<Self> {
        let mut names = BTreeSet::new();
        for set in &sets {
            if set.name.is_empty() {
                return Err(SelectError::EmptySetName);
            }
            if !names.insert(set.name.as_str()) {
                return Err(SelectError::DuplicateSetName(set.name.clone()));
            }
            if let SetScope::Groups(g) = &set.scope {
                if g.is_empty() {
                    return Err(SelectError::EmptyScope(set.name.clone()));
                }
            }
        }

        for (i, a) in sets.iter().enumerate() {
            for b in &sets[i + 1..] {
                let nested = a.scope.is_subset(&b.scope) || b.scope.is_subset(&a.scope);
                if !nested && !a.scope.is_disjoint(&b.scope) {
                    return Err(SelectError::NotLaminar {
                        first: a.name.clone(),
                        second: b.name.clone(),
                    });
                }
            }
        }

        Ok(Self { sets })
    }

    pub fn sets(&self) -> &[LaminarSet] {
        &self.sets
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Indices of the sets containing `group`, innermost first.
    pub fn chain(&self, group: &str) -> Vec<usize> {
        let mut chain: Vec<usize> = (0..self.sets.len())
            .filter(|&i| self.sets[i].scope.contains(group))
            .collect();
        // Smaller sets are inner; among equal sets the later declaration is inner
        chain.sort_by(|&i, &j| {
            self.sets[i]
                .scope
                .size()
                .cmp(&self.sets[j].scope.size())
                .then(j.cmp(&i))
        });
        chain
    }

    pub(crate) fn check(&self, tally: &[usize], group: &str) -> Option<RejectReason> {
        let chain = self.chain(group);
        chain.iter().enumerate().find_map(|(depth, &i)| {
            let set = &self.sets[i];
            if tally[i] < set.capacity {
                return None;
            }
            let name = set.name.clone();
            let capacity = set.capacity;
            Some(if depth == 0 {
                RejectReason::SetFull { set: name, capacity }
            } else {
                RejectReason::AncestorFull { set: name, capacity }
            })
        })
    }

    pub(crate) fn admit(&self, tally: &mut [usize], group: &str) {
        for i in self.chain(group) {
            tally[i] += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family() -> LaminarFamily {
        LaminarFamily::new(vec![
            LaminarSet::new("all", SetScope::All, 3),
            LaminarSet::over("network", ["dns", "netflow"], 2),
            LaminarSet::over("dns-only", ["dns"], 1),
            LaminarSet::over("host", ["process"], 2),
        ])
        .unwrap()
    }

    #[test]
    fn chain_is_innermost_first() {
        let f = family();
        let names: Vec<_> = f.chain("dns").iter().map(|&i| f.sets()[i].name.as_str()).collect();
        assert_eq!(names, vec!["dns-only", "network", "all"]);

        let names: Vec<_> = f.chain("other").iter().map(|&i| f.sets()[i].name.as_str()).collect();
        assert_eq!(names, vec!["all"]);
    }

    #[test]
    fn equal_sets_nest_by_declaration_order() {
        let f = LaminarFamily::new(vec![
            LaminarSet::over("outer", ["a", "b"], 3),
            LaminarSet::over("inner", ["a", "b"], 1),
        ])
        .unwrap();
        assert_eq!(f.chain("a"), vec![1, 0]);
    }

    #[test]
    fn partial_overlap_rejected() {
        let err = LaminarFamily::new(vec![
            LaminarSet::over("x", ["a", "b"], 1),
            LaminarSet::over("y", ["b", "c"], 1),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            SelectError::NotLaminar {
                first: "x".into(),
                second: "y".into()
            }
        );
    }

    #[test]
    fn construction_errors() {
        assert_eq!(
            LaminarFamily::new(vec![LaminarSet::new("", SetScope::All, 1)]),
            Err(SelectError::EmptySetName)
        );
        assert_eq!(
            LaminarFamily::new(vec![LaminarSet::over("e", Vec::<String>::new(), 1)]),
            Err(SelectError::EmptyScope("e".into()))
        );
        assert_eq!(
            LaminarFamily::new(vec![
                LaminarSet::new("d", SetScope::All, 1),
                LaminarSet::new("d", SetScope::All, 2),
            ]),
            Err(SelectError::DuplicateSetName("d".into()))
        );
    }

    #[test]
    fn check_names_innermost_full_set() {
        let f = family();
        let mut tally = vec![0; f.sets().len()];
        assert!(f.check(&tally, "dns").is_none());

        f.admit(&mut tally, "dns");
        assert_eq!(tally, vec![1, 1, 1, 0]);
        assert_eq!(
            f.check(&tally, "dns"),
            Some(RejectReason::SetFull {
                set: "dns-only".into(),
                capacity: 1
            })
        );
        assert!(f.check(&tally, "netflow").is_none());

        f.admit(&mut tally, "netflow");
        assert_eq!(
            f.check(&tally, "netflow"),
            Some(RejectReason::SetFull {
                set: "network".into(),
                capacity: 2
            })
        );

        f.admit(&mut tally, "process");
        assert_eq!(
            f.check(&tally, "process"),
            Some(RejectReason::AncestorFull {
                set: "all".into(),
                capacity: 3
            })
        );
    }

    #[test]
    fn scope_deserializes_from_json() {
        let set: LaminarSet =
            serde_json::from_str(r#"{"name":"n","scope":{"groups":["a","b"]},"capacity":2}"#)
                .unwrap();
        assert_eq!(set, LaminarSet::over("n", ["a", "b"], 2));

        let set: LaminarSet =
            serde_json::from_str(r#"{"name":"all","scope":"all","capacity":5}"#).unwrap();
        assert_eq!(set.scope, SetScope::All);
    }
}
