//! Stitch format conversion and pattern statistics.
//!
//! | Piece | Role |
//! |---|---|
//! | [`StitchConverter`] | native design file → machine stitch file (external collaborator) |
//! | [`CommandConverter`] | shipped converter: runs a configured external program |
//! | [`dst`] | reads stitch, color change, jump and trim counts from a DST file |
//! | [`TimeEstimator`] | turns pattern statistics into machine seconds |

pub mod command;
pub mod converter;
pub mod dst;
pub mod estimate;

pub use command::CommandConverter;
pub use converter::{ConvertError, StitchConverter};
pub use dst::{DstError, PatternStats};
pub use estimate::{TimeEstimator, human_readable};
