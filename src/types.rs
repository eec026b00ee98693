//! Shared types used across all pipeline stages.
//!
//! These types are serialized to JSON between passes (classify → export →
//! label) and into the identity ledger and export registry, so their serde
//! representation is part of the on-disk contract.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Owner bucket: the operator group a design is assigned to.
///
/// Always a single ASCII uppercase letter. The set of valid buckets is closed
/// and comes from `[owners] labels` in the config; this type only guarantees
/// the character shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OwnerBucket(char);

impl OwnerBucket {
    pub fn new(c: char) -> Option<Self> {
        c.is_ascii_uppercase().then_some(Self(c))
    }

    pub fn as_char(self) -> char {
        self.0
    }
}

impl fmt::Display for OwnerBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for OwnerBucket {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                Self::new(c).ok_or_else(|| format!("owner '{value}' must be an uppercase letter"))
            }
            _ => Err(format!("owner '{value}' must be exactly one character")),
        }
    }
}

impl From<OwnerBucket> for String {
    fn from(owner: OwnerBucket) -> Self {
        owner.0.to_string()
    }
}

/// Physical position of a face on the garment.
///
/// Variant order is the canonical face order (front, sleeve_left,
/// sleeve_right); `Single` is never mixed with the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacePosition {
    Front,
    SleeveLeft,
    SleeveRight,
    Single,
}

impl FacePosition {
    pub const MULTI: [FacePosition; 3] = [Self::Front, Self::SleeveLeft, Self::SleeveRight];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::SleeveLeft => "sleeve_left",
            Self::SleeveRight => "sleeve_right",
            Self::Single => "single",
        }
    }

    /// Map a position word from a source design filename onto a multi-face
    /// position. Unknown words (`back`, `chest`, ...) return `None`.
    pub fn from_source_word(word: &str) -> Option<Self> {
        Self::MULTI
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(word))
    }
}

impl fmt::Display for FacePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One physical output unit of a design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Face {
    pub position: FacePosition,
    /// Number of faces of the parent design, repeated on every face.
    pub face_count: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_accepts_uppercase_letter() {
        assert_eq!(OwnerBucket::new('C').map(OwnerBucket::as_char), Some('C'));
        assert_eq!(OwnerBucket::new('c'), None);
        assert_eq!(OwnerBucket::new('1'), None);
    }

    #[test]
    fn owner_serializes_as_string() {
        let owner = OwnerBucket::new('B').unwrap();
        assert_eq!(serde_json::to_string(&owner).unwrap(), "\"B\"");
        let back: OwnerBucket = serde_json::from_str("\"B\"").unwrap();
        assert_eq!(back, owner);
    }

    #[test]
    fn owner_rejects_long_strings() {
        assert!(serde_json::from_str::<OwnerBucket>("\"AB\"").is_err());
        assert!(serde_json::from_str::<OwnerBucket>("\"\"").is_err());
    }

    #[test]
    fn positions_sort_in_face_order() {
        let mut positions = vec![
            FacePosition::SleeveRight,
            FacePosition::Front,
            FacePosition::SleeveLeft,
        ];
        positions.sort();
        assert_eq!(positions, FacePosition::MULTI.to_vec());
    }

    #[test]
    fn source_words_are_case_insensitive() {
        assert_eq!(
            FacePosition::from_source_word("Sleeve_Left"),
            Some(FacePosition::SleeveLeft)
        );
        assert_eq!(FacePosition::from_source_word("back"), None);
        assert_eq!(FacePosition::from_source_word("single"), None);
    }
}
