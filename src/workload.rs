//! Workload balancing across owner buckets.
//!
//! Used by the classify pass for designs the identity ledger has never seen
//! when `owners.strategy = "balanced"`. Designs are placed longest first,
//! each onto the owner whose weighted load would be lowest afterwards:
//!
//! ```text
//! cost(owner) = (load(owner) + t) / weight(owner)
//! ```
//!
//! `t` is the design's machine time for all its garments. Extra garments
//! carrying the same design are cheaper than the first (no re-threading), so
//! every copy beyond the first saves `duplicate_reduction` seconds.
//!
//! Ties go to the owner listed first, and equal times keep fingerprint order,
//! so the same input always produces the same assignment.
//!
//! Balancing covers one batch: the designs in the download directory. Known
//! designs arriving in the same batch already have an owner, so they enter
//! as starting load ([`balance_from`]) instead of being placed.

use crate::fingerprint::Fingerprint;
use crate::types::OwnerBucket;
use std::collections::BTreeMap;

/// One design waiting for an owner.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    pub fingerprint: Fingerprint,
    /// Machine seconds for one garment.
    pub seconds: f64,
    /// Number of garments carrying the design in this batch.
    pub copies: u32,
}

impl WorkItem {
    pub fn adjusted_seconds(&self, duplicate_reduction: f64) -> f64 {
        let copies = f64::from(self.copies.max(1));
        let total = self.seconds * copies - (copies - 1.0) * duplicate_reduction;
        total.max(0.0)
    }
}

/// Assign every item to an owner. `weights` pairs with `owners` by index.
pub fn balance(
    items: &[WorkItem],
    owners: &[OwnerBucket],
    weights: &[f64],
    duplicate_reduction: f64,
) -> BTreeMap<Fingerprint, OwnerBucket> {
    balance_from(items, owners, weights, duplicate_reduction, &BTreeMap::new())
}

/// Like [`balance`], with owners starting at the seconds in `base`.
pub fn balance_from(
    items: &[WorkItem],
    owners: &[OwnerBucket],
    weights: &[f64],
    duplicate_reduction: f64,
    base: &BTreeMap<OwnerBucket, f64>,
) -> BTreeMap<Fingerprint, OwnerBucket> {
    let mut order: Vec<(&WorkItem, f64)> = items
        .iter()
        .map(|item| (item, item.adjusted_seconds(duplicate_reduction)))
        .collect();
    order.sort_by(|(a, ta), (b, tb)| {
        tb.total_cmp(ta)
            .then_with(|| a.fingerprint.cmp(&b.fingerprint))
    });

    let mut loads: Vec<f64> = owners
        .iter()
        .map(|o| base.get(o).copied().unwrap_or(0.0))
        .collect();
    let mut assignment = BTreeMap::new();
    for (item, t) in order {
        let cost = |i: usize| (loads[i] + t) / weights.get(i).copied().unwrap_or(1.0);
        let Some(best) = (0..owners.len()).min_by(|&a, &b| cost(a).total_cmp(&cost(b))) else {
            break;
        };
        loads[best] += t;
        assignment.insert(item.fingerprint.clone(), owners[best]);
    }
    assignment
}

/// Total adjusted seconds per owner for an assignment.
pub fn loads(
    items: &[WorkItem],
    assignment: &BTreeMap<Fingerprint, OwnerBucket>,
    duplicate_reduction: f64,
) -> BTreeMap<OwnerBucket, f64> {
    let mut totals = BTreeMap::new();
    for item in items {
        if let Some(owner) = assignment.get(&item.fingerprint) {
            *totals.entry(*owner).or_insert(0.0) += item.adjusted_seconds(duplicate_reduction);
        }
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint_bytes;

    fn owners(labels: &str) -> Vec<OwnerBucket> {
        labels.chars().filter_map(OwnerBucket::new).collect()
    }

    fn item(tag: &[u8], seconds: f64, copies: u32) -> WorkItem {
        WorkItem {
            fingerprint: fingerprint_bytes(tag),
            seconds,
            copies,
        }
    }

    #[test]
    fn duplicate_copies_are_cheaper() {
        let i = item(b"a", 1000.0, 3);
        assert_eq!(i.adjusted_seconds(300.0), 2400.0);
        assert_eq!(item(b"a", 100.0, 3).adjusted_seconds(300.0), 0.0);
        assert_eq!(item(b"a", 100.0, 0).adjusted_seconds(300.0), 100.0);
    }

    #[test]
    fn equal_weights_spread_evenly() {
        let items = [
            item(b"a", 600.0, 1),
            item(b"b", 500.0, 1),
            item(b"c", 400.0, 1),
            item(b"d", 300.0, 1),
        ];
        let o = owners("AB");
        let assignment = balance(&items, &o, &[1.0, 1.0], 0.0);
        assert_eq!(assignment.len(), 4);

        let totals = loads(&items, &assignment, 0.0);
        assert_eq!(totals[&o[0]], 900.0);
        assert_eq!(totals[&o[1]], 900.0);
    }

    #[test]
    fn weights_scale_capacity() {
        let items: Vec<WorkItem> = (0..10u8).map(|i| item(&[i], 100.0, 1)).collect();
        let o = owners("AB");
        let assignment = balance(&items, &o, &[1.0, 0.25], 0.0);
        let totals = loads(&items, &assignment, 0.0);
        assert_eq!(totals[&o[0]], 800.0);
        assert_eq!(totals[&o[1]], 200.0);
    }

    #[test]
    fn ties_go_to_first_owner() {
        let items = [item(b"only", 100.0, 1)];
        let o = owners("CAB");
        let assignment = balance(&items, &o, &[1.0, 1.0, 1.0], 0.0);
        assert_eq!(assignment[&items[0].fingerprint], o[0]);
    }

    #[test]
    fn deterministic_for_equal_times() {
        let items: Vec<WorkItem> = (0..6u8).map(|i| item(&[i], 50.0, 1)).collect();
        let o = owners("ABC");
        let first = balance(&items, &o, &[1.0, 1.0, 1.0], 0.0);
        let mut reversed = items.clone();
        reversed.reverse();
        assert_eq!(balance(&reversed, &o, &[1.0, 1.0, 1.0], 0.0), first);
    }

    #[test]
    fn starting_load_steers_new_work_away() {
        let items = [item(b"a", 100.0, 1), item(b"b", 100.0, 1)];
        let o = owners("AB");
        let base = BTreeMap::from([(o[0], 250.0)]);
        let assignment = balance_from(&items, &o, &[1.0, 1.0], 0.0, &base);
        assert!(assignment.values().all(|owner| *owner == o[1]));

        // Without it the tie-break sends the first item to A.
        let unseeded = balance(&items, &o, &[1.0, 1.0], 0.0);
        assert!(unseeded.values().any(|owner| *owner == o[0]));
    }

    #[test]
    fn no_owners_assigns_nothing() {
        let items = [item(b"a", 1.0, 1)];
        assert!(balance(&items, &[], &[], 0.0).is_empty());
    }
}
