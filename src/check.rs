//! Completeness check for the download directories.
//!
//! Every design and label file name ends in `item_N`: the number of items
//! in its order. For each order id the check compares that count with the
//! distinct item ids actually present, and for design files also compares
//! each item's declared face total with the face indices found.
//!
//! ```text
//! order 2150  expected 3 items, found 2171, 2173   → missing 2172 (guessed)
//!             item 2171: 3 faces declared, found 1, 3 → missing face 2
//! ```
//!
//! Item ids of one order are usually consecutive, so missing ids are
//! guessed as the gaps in `min..min + expected`. The guess is only a hint.

use crate::scan::{self, DesignScan, ScanError};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Findings for one order id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderCompleteness {
    pub order_id: u64,
    /// Largest `item_N` seen for the order.
    pub expected_items: Option<u32>,
    pub found_items: BTreeSet<u64>,
    pub missing_items: Vec<u64>,
    /// Item id → face indices (1-based) declared but not found.
    pub missing_faces: BTreeMap<u64, Vec<u8>>,
}

impl OrderCompleteness {
    pub fn is_complete(&self) -> bool {
        let enough = self
            .expected_items
            .is_none_or(|n| self.found_items.len() >= n as usize);
        enough && self.missing_faces.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletenessReport {
    pub designs: Vec<OrderCompleteness>,
    pub labels: Vec<OrderCompleteness>,
}

impl CompletenessReport {
    pub fn incomplete(&self) -> impl Iterator<Item = (&'static str, &OrderCompleteness)> {
        let designs = self.designs.iter().map(|o| ("design", o));
        let labels = self.labels.iter().map(|o| ("labels", o));
        designs.chain(labels).filter(|(_, o)| !o.is_complete())
    }

    pub fn is_complete(&self) -> bool {
        self.incomplete().next().is_none()
    }
}

#[derive(Default)]
struct OrderTally {
    expected_items: Option<u32>,
    /// Item id → (declared face total, face indices found).
    items: BTreeMap<u64, (u8, BTreeSet<u8>)>,
}

impl OrderTally {
    fn expect(&mut self, count: Option<u32>) {
        self.expected_items = self.expected_items.max(count);
    }

    fn finish(self, order_id: u64) -> OrderCompleteness {
        let found_items: BTreeSet<u64> = self.items.keys().copied().collect();
        let missing_items = match (self.expected_items, found_items.first()) {
            (Some(expected), Some(&start)) if found_items.len() < expected as usize => {
                let end = start + u64::from(expected);
                (start..end).filter(|id| !found_items.contains(id)).collect()
            }
            _ => Vec::new(),
        };
        let missing_faces = self
            .items
            .into_iter()
            .filter_map(|(item, (total, found))| {
                let missing: Vec<u8> = (1..=total).filter(|i| !found.contains(i)).collect();
                (!missing.is_empty()).then_some((item, missing))
            })
            .collect();
        OrderCompleteness {
            order_id,
            expected_items: self.expected_items,
            found_items,
            missing_items,
            missing_faces,
        }
    }
}

/// Completeness of already-scanned design files, per order.
pub fn design_completeness(scan: &DesignScan) -> Vec<OrderCompleteness> {
    let mut orders: BTreeMap<u64, OrderTally> = BTreeMap::new();
    for design in &scan.designs {
        let tally = orders.entry(design.order_id).or_default();
        let entry = tally.items.entry(design.item_id).or_default();
        for file in &design.files {
            entry.0 = entry.0.max(file.meta.total_faces);
            entry.1.insert(file.meta.current_face);
        }
        let count = design.files.iter().map(|f| f.meta.item_count).max();
        tally.expect(count);
    }
    orders
        .into_iter()
        .map(|(order, tally)| tally.finish(order))
        .collect()
}

/// Completeness of the label images in `dir`, per order. Labels carry no
/// faces, so only item ids are compared.
pub fn label_completeness(dir: &Path) -> Result<Vec<OrderCompleteness>, ScanError> {
    let mut orders: BTreeMap<u64, OrderTally> = BTreeMap::new();
    for path in scan::list_labels(dir)? {
        let Some(meta) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(scan::parse_label_file_name)
        else {
            continue;
        };
        let tally = orders.entry(meta.order_id).or_default();
        tally.items.entry(meta.item_id).or_default();
        tally.expect(meta.item_count);
    }
    Ok(orders
        .into_iter()
        .map(|(order, tally)| tally.finish(order))
        .collect())
}

/// Check both download directories.
pub fn check(design_dir: &Path, label_dir: &Path) -> Result<CompletenessReport, ScanError> {
    let scanned = scan::scan_designs(design_dir)?;
    Ok(CompletenessReport {
        designs: design_completeness(&scanned),
        labels: label_completeness(label_dir)?,
    })
}
