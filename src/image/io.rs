//! Decoding helpers built on the `image` crate.
//!
//! Available when the `image-io` feature is enabled. All entry points
//! produce grayscale buffers with any alpha channel flattened onto white
//! first, modeling the paper background of a genuine scan. Reference and
//! target loading differ only in how filesystem failures are classified.

use crate::image::GrayBuffer;
use crate::util::{QrMarkError, QrMarkResult};
use std::io::ErrorKind;
use std::path::Path;

/// Decodes image bytes into a grayscale buffer, alpha flattened onto white.
pub fn decode_gray(bytes: &[u8]) -> QrMarkResult<GrayBuffer> {
    let img = image::load_from_memory(bytes).map_err(|err| QrMarkError::Decode {
        reason: err.to_string(),
    })?;
    gray_from_dynamic(&img)
}

/// Loads a target image from disk.
///
/// A missing file maps to [`QrMarkError::TargetMissing`], other read
/// failures to [`QrMarkError::TargetUnreadable`].
pub fn load_target_gray<P: AsRef<Path>>(path: P) -> QrMarkResult<GrayBuffer> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => QrMarkError::TargetMissing {
            path: path.display().to_string(),
        },
        _ => QrMarkError::TargetUnreadable {
            path: path.display().to_string(),
            reason: err.to_string(),
        },
    })?;
    decode_gray(&bytes)
}

/// Loads the reference pattern image from disk.
///
/// Any filesystem failure maps to [`QrMarkError::ReferenceMissing`]: an
/// unreadable reference asset is as fatal as an absent one.
pub fn load_reference_gray<P: AsRef<Path>>(path: P) -> QrMarkResult<GrayBuffer> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|_| QrMarkError::ReferenceMissing {
        path: path.display().to_string(),
    })?;
    decode_gray(&bytes)
}

/// Converts an already-decoded dynamic image, flattening alpha onto white.
pub fn gray_from_dynamic(img: &image::DynamicImage) -> QrMarkResult<GrayBuffer> {
    let gray = if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut rgb = image::RgbImage::new(width, height);
        for (src, dst) in rgba.pixels().zip(rgb.pixels_mut()) {
            let alpha = u32::from(src[3]);
            for c in 0..3 {
                let blended = u32::from(src[c]) * alpha + 255 * (255 - alpha);
                dst[c] = ((blended + 127) / 255) as u8;
            }
        }
        image::DynamicImage::ImageRgb8(rgb).to_luma8()
    } else {
        img.to_luma8()
    };
    gray_from_image(&gray)
}

/// Wraps a grayscale image buffer without further conversion.
pub fn gray_from_image(img: &image::GrayImage) -> QrMarkResult<GrayBuffer> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    GrayBuffer::from_vec(img.as_raw().clone(), width, height)
}

/// Copies a buffer into an `image` crate container, for interop with
/// `imageproc` operations.
pub fn gray_to_image(buf: &GrayBuffer) -> QrMarkResult<image::GrayImage> {
    let width = buf.width() as u32;
    let height = buf.height() as u32;
    image::GrayImage::from_raw(width, height, buf.as_slice().to_vec()).ok_or(
        QrMarkError::InvalidDimensions {
            width: buf.width(),
            height: buf.height(),
        },
    )
}
