//! Reference pattern preparation.
//!
//! The reference is loaded once at process startup and held immutably;
//! every detection borrows from it. Swapping the reference means building
//! a new value, there is no ambient global to mutate.

use crate::image::{GrayBuffer, GrayView};
use crate::template::rotate::rotate_quarter;
use crate::template::{PatchRatios, Rotation};
use crate::trace::trace_span;
use crate::util::QrMarkResult;

/// The prepared fingerprint: the patch cropped from the reference image,
/// rotated into all four page orientations.
pub struct ReferencePattern {
    ratios: PatchRatios,
    patch_width: usize,
    patch_height: usize,
    rotated: [GrayBuffer; 4],
}

impl ReferencePattern {
    /// Crops the fingerprint patch out of a grayscale reference image and
    /// prepares the four quarter-turn buffers.
    pub fn from_gray(reference: GrayView<'_>, ratios: PatchRatios) -> QrMarkResult<Self> {
        let _guard = trace_span!(
            "reference_prepare",
            width = reference.width(),
            height = reference.height()
        )
        .entered();

        let (x, y, patch_width, patch_height) =
            ratios.pixel_rect(reference.width(), reference.height())?;
        let patch = reference.roi(x, y, patch_width, patch_height)?;

        let rotated = [
            rotate_quarter(patch, Rotation::R0),
            rotate_quarter(patch, Rotation::R90),
            rotate_quarter(patch, Rotation::R180),
            rotate_quarter(patch, Rotation::R270),
        ];

        Ok(Self {
            ratios,
            patch_width,
            patch_height,
            rotated,
        })
    }

    /// Loads and decodes the reference image from disk.
    ///
    /// Filesystem failures surface as [`ReferenceMissing`], which callers
    /// should treat as fatal for the process.
    ///
    /// [`ReferenceMissing`]: crate::QrMarkError::ReferenceMissing
    #[cfg(feature = "image-io")]
    pub fn from_path<P: AsRef<std::path::Path>>(path: P, ratios: PatchRatios) -> QrMarkResult<Self> {
        let gray = crate::image::io::load_reference_gray(path)?;
        Self::from_gray(gray.view(), ratios)
    }

    /// Decodes the reference image from in-memory bytes.
    #[cfg(feature = "image-io")]
    pub fn from_bytes(bytes: &[u8], ratios: PatchRatios) -> QrMarkResult<Self> {
        let gray = crate::image::io::decode_gray(bytes)?;
        Self::from_gray(gray.view(), ratios)
    }

    /// Returns the ratios the patch was cropped with.
    pub fn ratios(&self) -> PatchRatios {
        self.ratios
    }

    /// Returns the unrotated patch width in pixels.
    pub fn patch_width(&self) -> usize {
        self.patch_width
    }

    /// Returns the unrotated patch height in pixels.
    pub fn patch_height(&self) -> usize {
        self.patch_height
    }

    /// Returns the patch buffer for one rotation.
    pub fn rotated(&self, rotation: Rotation) -> GrayView<'_> {
        self.rotated[rotation.index()].view()
    }
}
