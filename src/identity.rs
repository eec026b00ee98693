//! Identity ledger: content fingerprint → (owner bucket, folder order).
//!
//! The ledger is the only place folder orders come from. It is consulted by
//! the classify pass for every design it sees and answers with the identity
//! that design was given the first time, so re-running classification over
//! the same downloads (or over a re-download under new order ids) hands out
//! the same owner and folder order again.
//!
//! ## Rules
//!
//! - One assignment per fingerprint, created once and never changed.
//! - Folder orders are dense and unique across the ledger: a new design gets
//!   `max + 1`, starting at 1.
//! - A ledger in which two fingerprints share a folder order is corrupt and
//!   refuses to load ([`IdentityError::AssignmentConflict`]).
//! - Every change is written to disk before [`IdentityLedger::assign`]
//!   returns, through a temp file renamed over the old ledger.
//!
//! The ledger also remembers which item ids carried each fingerprint. The
//! label pass uses that to get from a label image (named by item id) back to
//! the design it belongs to.
//!
//! ## Storage
//!
//! Pretty-printed JSON at `<sorted>/output/identity.json`:
//!
//! ```json
//! {
//!   "version": 1,
//!   "assignments": {
//!     "3edcb035…": { "owner": "A", "folder_order": 55, "items": [2448] }
//!   }
//! }
//! ```

use crate::fingerprint::Fingerprint;
use crate::types::OwnerBucket;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

/// Name of the ledger file within the output directory.
pub const LEDGER_FILENAME: &str = "identity.json";

/// Version of the ledger format.
const LEDGER_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("identity ledger version {found} is not supported (expected {LEDGER_VERSION})")]
    UnsupportedVersion { found: u32 },
    #[error("folder order {folder_order} is assigned to both {first} and {second}")]
    AssignmentConflict {
        folder_order: u32,
        first: Fingerprint,
        second: Fingerprint,
    },
}

/// The identity of one design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub owner: OwnerBucket,
    pub folder_order: u32,
    /// Item ids seen carrying this design.
    #[serde(default)]
    pub items: BTreeSet<u64>,
}

/// Outcome of looking up the design an item id belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemLookup {
    Unknown,
    Unique(Fingerprint),
    /// The item id appears under more than one design.
    Ambiguous(Vec<Fingerprint>),
}

#[derive(Serialize, Deserialize)]
struct LedgerFile {
    version: u32,
    assignments: BTreeMap<Fingerprint, Assignment>,
}

/// In-memory ledger bound to its file. Single writer: every mutation goes
/// through `&mut self`.
#[derive(Debug)]
pub struct IdentityLedger {
    dir: PathBuf,
    assignments: BTreeMap<Fingerprint, Assignment>,
    by_order: BTreeMap<u32, Fingerprint>,
}

impl IdentityLedger {
    /// Load the ledger from `output_dir`. A missing file is an empty ledger.
    pub fn load(output_dir: &Path) -> Result<Self, IdentityError> {
        let path = output_dir.join(LEDGER_FILENAME);
        let assignments = match std::fs::read_to_string(&path) {
            Ok(content) => {
                let file: LedgerFile = serde_json::from_str(&content)?;
                if file.version != LEDGER_VERSION {
                    return Err(IdentityError::UnsupportedVersion {
                        found: file.version,
                    });
                }
                file.assignments
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        let mut by_order = BTreeMap::new();
        for (fingerprint, assignment) in &assignments {
            if let Some(first) = by_order.insert(assignment.folder_order, fingerprint.clone()) {
                return Err(IdentityError::AssignmentConflict {
                    folder_order: assignment.folder_order,
                    first,
                    second: fingerprint.clone(),
                });
            }
        }
        debug!(path = %path.display(), designs = assignments.len(), "loaded identity ledger");

        Ok(Self {
            dir: output_dir.to_path_buf(),
            assignments,
            by_order,
        })
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(LEDGER_FILENAME)
    }

    /// Identity for `fingerprint`, assigning one if the design is new.
    ///
    /// `classify` is only called for new designs. `item_id`, when given, is
    /// added to the design's item set.
    pub fn assign(
        &mut self,
        fingerprint: &Fingerprint,
        item_id: Option<u64>,
        classify: impl FnOnce() -> OwnerBucket,
    ) -> Result<(OwnerBucket, u32), IdentityError> {
        if let Some(existing) = self.assignments.get_mut(fingerprint) {
            let identity = (existing.owner, existing.folder_order);
            let Some(item) = item_id else {
                return Ok(identity);
            };
            if !existing.items.insert(item) {
                return Ok(identity);
            }
            if let Err(e) = self.save() {
                if let Some(existing) = self.assignments.get_mut(fingerprint) {
                    existing.items.remove(&item);
                }
                return Err(e);
            }
            return Ok(identity);
        }

        let folder_order = self.next_order();
        let owner = classify();
        let assignment = Assignment {
            owner,
            folder_order,
            items: item_id.into_iter().collect(),
        };
        self.assignments.insert(fingerprint.clone(), assignment);
        if let Err(e) = self.save() {
            self.assignments.remove(fingerprint);
            return Err(e);
        }
        self.by_order.insert(folder_order, fingerprint.clone());
        debug!(%fingerprint, %owner, folder_order, "assigned new identity");
        Ok((owner, folder_order))
    }

    /// Next free folder order: one past the highest assigned.
    fn next_order(&self) -> u32 {
        self.by_order
            .last_key_value()
            .map(|(order, _)| order + 1)
            .unwrap_or(1)
    }

    pub fn get(&self, fingerprint: &Fingerprint) -> Option<&Assignment> {
        self.assignments.get(fingerprint)
    }

    /// Which design an item id was classified under.
    pub fn fingerprint_for_item(&self, item_id: u64) -> ItemLookup {
        let mut matches: Vec<Fingerprint> = self
            .assignments
            .iter()
            .filter(|(_, a)| a.items.contains(&item_id))
            .map(|(fp, _)| fp.clone())
            .collect();
        match matches.len() {
            0 => ItemLookup::Unknown,
            1 => ItemLookup::Unique(matches.remove(0)),
            _ => ItemLookup::Ambiguous(matches),
        }
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Assignments in folder order.
    pub fn iter(&self) -> impl Iterator<Item = (&Fingerprint, &Assignment)> {
        self.by_order
            .values()
            .filter_map(|fp| self.assignments.get_key_value(fp))
    }

    fn save(&self) -> Result<(), IdentityError> {
        std::fs::create_dir_all(&self.dir)?;
        let file = LedgerFile {
            version: LEDGER_VERSION,
            assignments: self.assignments.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.path()).map_err(|e| e.error)?;
        Ok(())
    }
}
