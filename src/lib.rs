//! QrMark detects a known fraudulent QR watermark in scanned documents.
//!
//! The primary engine runs a coarse-to-fine template search over a grid of
//! scales and quarter-turn rotations, scored by zero-mean squared error,
//! with optional parallelism via the `rayon` feature. A feature-matching
//! engine behind the `orb` feature covers marks that windowed scoring
//! cannot pin down, such as perspective-warped or partly occluded ones.

mod candidate;
#[cfg(feature = "orb")]
pub mod features;
pub mod image;
mod kernel;
mod policy;
pub mod reference;
pub mod search;
pub mod template;
mod trace;
pub mod util;

#[cfg(feature = "image-io")]
pub use image::io;
pub use image::{GrayBuffer, GrayView};
pub use policy::{confidence, BestMatch, MatchResult, Verdict};
pub use reference::ReferencePattern;
pub use search::{DetectConfig, Detector};
pub use template::{PatchRatios, Rotation};
pub use util::{QrMarkError, QrMarkResult};

pub use candidate::{Candidate, TopCandidates};

#[cfg(feature = "orb")]
pub use features::{FeatureConfig, FeatureEngine, FeatureMatch, FeatureReport, FeatureVerdict};
