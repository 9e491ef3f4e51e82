//! Lossless quarter-turn rotation of grayscale buffers.

use crate::image::{GrayBuffer, GrayView};
use crate::template::Rotation;

/// Rotates a grayscale view clockwise by a quarter-turn multiple.
///
/// Quarter turns are pure index permutations, so the output carries the
/// exact source pixels with no interpolation. Width and height swap at
/// 90 and 270 degrees.
pub fn rotate_quarter(src: GrayView<'_>, rotation: Rotation) -> GrayBuffer {
    let w = src.width();
    let h = src.height();
    let (out_w, out_h) = if rotation.swaps_dims() { (h, w) } else { (w, h) };
    let mut out = vec![0u8; w * h];

    for dy in 0..out_h {
        for dx in 0..out_w {
            let (sx, sy) = match rotation {
                Rotation::R0 => (dx, dy),
                Rotation::R90 => (dy, h - 1 - dx),
                Rotation::R180 => (w - 1 - dx, h - 1 - dy),
                Rotation::R270 => (w - 1 - dy, dx),
            };
            let row = src.row(sy).expect("row in bounds");
            out[dy * out_w + dx] = row[sx];
        }
    }

    GrayBuffer::from_vec(out, out_w, out_h).expect("rotation output is contiguous")
}
