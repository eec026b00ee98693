//! Content fingerprints for designs.
//!
//! A design is identified by what it stitches, not by what it is called: the
//! fingerprint is a SHA-256 over the bytes of its face files. Renaming a file,
//! re-downloading it, or receiving the same design under a different order id
//! yields the same fingerprint, which is what lets the identity ledger hand
//! out the same folder order again.
//!
//! Each face contributes `position tag \0 length bytes`, in face order, so
//! two designs whose faces merely concatenate to the same bytes cannot
//! collide.

use crate::types::FacePosition;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io;
use std::path::Path;

/// Number of hex characters used in sorted folder names (`001_3edcb035`).
pub const SHORT_LEN: usize = 8;

/// Hex-encoded SHA-256 of a design's content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Accepts exactly 64 lowercase hex characters.
    pub fn parse(hex: &str) -> Option<Self> {
        let valid = hex.len() == 64 && hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        valid.then(|| Self(hex.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading characters, used for human-facing folder names.
    pub fn short(&self) -> &str {
        &self.0[..SHORT_LEN]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short())
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("'{value}' is not a SHA-256 hex digest"))
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.0
    }
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// Fingerprint raw bytes directly.
pub fn fingerprint_bytes(data: &[u8]) -> Fingerprint {
    Fingerprint(format!("{:x}", Sha256::digest(data)))
}

/// Fingerprint a design from its faces, in the order given.
pub fn fingerprint_faces<'a>(
    faces: impl IntoIterator<Item = (FacePosition, &'a Path)>,
) -> io::Result<Fingerprint> {
    let mut hasher = Sha256::new();
    for (position, path) in faces {
        let bytes = std::fs::read(path)?;
        hasher.update(position.as_str().as_bytes());
        hasher.update(b"\0");
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(&bytes);
    }
    Ok(Fingerprint(format!("{:x}", hasher.finalize())))
}
