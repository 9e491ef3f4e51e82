//! Reference patch extraction, rotation, and scaled-instance planning.

use crate::util::{QrMarkError, QrMarkResult};

pub(crate) mod plan;
pub mod resize;
pub mod rotate;

pub(crate) use plan::{InstancePlan, SampledStats};

/// Smallest template side the search will accept, in pixels. Anything
/// smaller carries too little structure to score meaningfully.
pub const MIN_TEMPLATE_SIDE: usize = 10;

/// Quarter-turn rotations applied to the reference patch.
///
/// Scanned documents arrive in arbitrary page orientation, so the patch is
/// matched in all four. Quarter turns are pure pixel permutations; no
/// resampling loss is introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rotation {
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    /// All four rotations in ascending angle order.
    pub const ALL: [Rotation; 4] = [Rotation::R0, Rotation::R90, Rotation::R180, Rotation::R270];

    /// Returns the clockwise angle in degrees.
    pub fn degrees(self) -> u32 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }

    /// Returns true when the rotation swaps width and height.
    pub fn swaps_dims(self) -> bool {
        matches!(self, Rotation::R90 | Rotation::R270)
    }

    /// Position in [`Rotation::ALL`], used for dense per-rotation storage.
    pub(crate) fn index(self) -> usize {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 1,
            Rotation::R180 => 2,
            Rotation::R270 => 3,
        }
    }
}

/// Fractional crop rectangle selecting the fingerprint patch inside the
/// reference image.
///
/// The default region sits deliberately off-center, below and right of the
/// middle, so it avoids the QR finder squares every code shares and any
/// central logo overlay. Matching a generic corner pattern would flag
/// unrelated QR codes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatchRatios {
    /// Left edge as a fraction of reference width, in `[0, 1)`.
    pub left: f32,
    /// Top edge as a fraction of reference height, in `[0, 1)`.
    pub top: f32,
    /// Patch width as a fraction of reference width, in `(0, 1]`.
    pub width: f32,
    /// Patch height as a fraction of reference height, in `(0, 1]`.
    pub height: f32,
}

impl Default for PatchRatios {
    fn default() -> Self {
        Self {
            left: 0.4,
            top: 0.6,
            width: 0.25,
            height: 0.25,
        }
    }
}

impl PatchRatios {
    /// Resolves the ratios against reference dimensions, validating both
    /// the fractions and the resulting pixel rectangle.
    pub fn pixel_rect(
        &self,
        ref_width: usize,
        ref_height: usize,
    ) -> QrMarkResult<(usize, usize, usize, usize)> {
        if !self.left.is_finite() || !(0.0..1.0).contains(&self.left) {
            return Err(QrMarkError::InvalidPatchRatios {
                reason: "left must be in [0, 1)",
            });
        }
        if !self.top.is_finite() || !(0.0..1.0).contains(&self.top) {
            return Err(QrMarkError::InvalidPatchRatios {
                reason: "top must be in [0, 1)",
            });
        }
        if !self.width.is_finite() || self.width <= 0.0 || self.width > 1.0 {
            return Err(QrMarkError::InvalidPatchRatios {
                reason: "width must be in (0, 1]",
            });
        }
        if !self.height.is_finite() || self.height <= 0.0 || self.height > 1.0 {
            return Err(QrMarkError::InvalidPatchRatios {
                reason: "height must be in (0, 1]",
            });
        }
        if self.left + self.width > 1.0 + f32::EPSILON || self.top + self.height > 1.0 + f32::EPSILON
        {
            return Err(QrMarkError::InvalidPatchRatios {
                reason: "patch extends past the reference edge",
            });
        }

        let x = (self.left * ref_width as f32).floor() as usize;
        let y = (self.top * ref_height as f32).floor() as usize;
        let w = (self.width * ref_width as f32).floor() as usize;
        let h = (self.height * ref_height as f32).floor() as usize;
        // Floors keep x + w within bounds; clamp anyway against float slop.
        let w = w.min(ref_width - x);
        let h = h.min(ref_height - y);

        if w < MIN_TEMPLATE_SIDE || h < MIN_TEMPLATE_SIDE {
            return Err(QrMarkError::InvalidPatchRatios {
                reason: "patch smaller than the minimum template size",
            });
        }
        Ok((x, y, w, h))
    }
}
