//! Partition matroid: disjoint groups, each with a capacity.

use std::collections::BTreeMap;

use crate::{RejectReason, Result, SelectError};

/// Per-group capacities over disjoint group tags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Partition {
    capacities: BTreeMap<String, usize>,
    default_capacity: Option<usize>,
}

impl Partition {
    /// Groups missing from `capacities` use `default_capacity`; `None` leaves
    /// them unbounded.
    pub fn new(capacities: BTreeMap<String, usize>, default_capacity: Option<usize>) -> Result<Self> {
        if capacities.keys().any(|g| g.is_empty()) {
            return Err(SelectError::EmptyGroup);
        }
        Ok(Self {
            capacities,
            default_capacity,
        })
    }

    /// Every group shares the same capacity.
    pub fn uniform(capacity: usize) -> Self {
        Self {
            capacities: BTreeMap::new(),
            default_capacity: Some(capacity),
        }
    }

    pub fn capacity(&self, group: &str) -> Option<usize> {
        self.capacities.get(group).copied().or(self.default_capacity)
    }

    pub(crate) fn check(&self, tally: &BTreeMap<String, usize>, group: &str) -> Option<RejectReason> {
        let capacity = self.capacity(group)?;
        let used = tally.get(group).copied().unwrap_or(0);
        (used >= capacity).then(|| RejectReason::GroupFull {
            group: group.to_string(),
            capacity,
        })
    }

    pub(crate) fn admit(tally: &mut BTreeMap<String, usize>, group: &str) {
        *tally.entry(group.to_string()).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_capacity_wins_over_default() {
        let caps = BTreeMap::from([("a".to_string(), 1)]);
        let p = Partition::new(caps, Some(5)).unwrap();
        assert_eq!(p.capacity("a"), Some(1));
        assert_eq!(p.capacity("b"), Some(5));
        assert_eq!(Partition::default().capacity("b"), None);
    }

    #[test]
    fn check_against_tally() {
        let p = Partition::uniform(2);
        let mut tally = BTreeMap::new();
        assert!(p.check(&tally, "x").is_none());
        Partition::admit(&mut tally, "x");
        Partition::admit(&mut tally, "x");
        assert_eq!(
            p.check(&tally, "x"),
            Some(RejectReason::GroupFull {
                group: "x".into(),
                capacity: 2
            })
        );
        assert!(p.check(&tally, "y").is_none());
    }

    #[test]
    fn zero_capacity_blocks_group() {
        let caps = BTreeMap::from([("blocked".to_string(), 0)]);
        let p = Partition::new(caps, None).unwrap();
        assert!(p.check(&BTreeMap::new(), "blocked").is_some());
        assert!(p.check(&BTreeMap::new(), "open").is_none());
    }

    #[test]
    fn rejects_empty_group_name() {
        let caps = BTreeMap::from([(String::new(), 1)]);
        assert_eq!(Partition::new(caps, None), Err(SelectError::EmptyGroup));
    }
}
