//! Bilinear resampling for template instances.

use crate::image::{GrayBuffer, GrayView};
use crate::util::QrMarkResult;

/// Returns the floored dimensions of a template at a scale factor.
pub fn scaled_dims(width: usize, height: usize, scale: f32) -> (usize, usize) {
    let w = (width as f32 * scale).floor() as usize;
    let h = (height as f32 * scale).floor() as usize;
    (w, h)
}

/// Resamples a grayscale view to the requested dimensions.
///
/// Sampling is center-aligned bilinear with clamped edges, rounded to the
/// nearest intensity. When the requested dimensions equal the source the
/// pixels are copied through untouched, so a scale of 1.0 is exact.
pub fn resize_bilinear(
    src: GrayView<'_>,
    dst_width: usize,
    dst_height: usize,
) -> QrMarkResult<GrayBuffer> {
    let src_w = src.width();
    let src_h = src.height();
    if dst_width == src_w && dst_height == src_h {
        return GrayBuffer::from_view(src);
    }

    let mut out = vec![0u8; dst_width.saturating_mul(dst_height)];
    let sx = src_w as f32 / dst_width.max(1) as f32;
    let sy = src_h as f32 / dst_height.max(1) as f32;
    let max_x = (src_w - 1) as f32;
    let max_y = (src_h - 1) as f32;

    for dy in 0..dst_height {
        let src_y = ((dy as f32 + 0.5) * sy - 0.5).clamp(0.0, max_y);
        let y0 = src_y.floor() as usize;
        let y1 = (y0 + 1).min(src_h - 1);
        let fy = src_y - y0 as f32;
        let row0 = src.row(y0).expect("row in bounds");
        let row1 = src.row(y1).expect("row in bounds");

        for dx in 0..dst_width {
            let src_x = ((dx as f32 + 0.5) * sx - 0.5).clamp(0.0, max_x);
            let x0 = src_x.floor() as usize;
            let x1 = (x0 + 1).min(src_w - 1);
            let fx = src_x - x0 as f32;

            let a = row0[x0] as f32;
            let b = row0[x1] as f32;
            let c = row1[x0] as f32;
            let d = row1[x1] as f32;
            let top = a + (b - a) * fx;
            let bottom = c + (d - c) * fx;
            let value = top + (bottom - top) * fy;

            out[dy * dst_width + dx] = value.round().clamp(0.0, 255.0) as u8;
        }
    }

    GrayBuffer::from_vec(out, dst_width, dst_height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::GrayView;

    #[test]
    fn identity_resize_copies_pixels() {
        let data: Vec<u8> = (0u8..12).collect();
        let view = GrayView::from_slice(&data, 4, 3).unwrap();
        let out = resize_bilinear(view, 4, 3).unwrap();
        assert_eq!(out.as_slice(), data.as_slice());
    }

    #[test]
    fn downscale_of_constant_image_is_constant() {
        let data = vec![140u8; 40 * 40];
        let view = GrayView::from_slice(&data, 40, 40).unwrap();
        let out = resize_bilinear(view, 13, 17).unwrap();
        assert_eq!(out.width(), 13);
        assert_eq!(out.height(), 17);
        assert!(out.as_slice().iter().all(|&v| v == 140));
    }

    #[test]
    fn halving_averages_neighbours() {
        // 2x1 blocks of (0, 255) average to ~128 when halved horizontally.
        let mut data = vec![0u8; 8];
        for x in 0..8 {
            data[x] = if x % 2 == 0 { 0 } else { 255 };
        }
        let view = GrayView::from_slice(&data, 8, 1).unwrap();
        let out = resize_bilinear(view, 4, 1).unwrap();
        for &v in out.as_slice() {
            assert!((i16::from(v) - 128).unsigned_abs() <= 1, "got {v}");
        }
    }

    #[test]
    fn scaled_dims_floor() {
        assert_eq!(scaled_dims(100, 100, 0.3), (30, 30));
        assert_eq!(scaled_dims(101, 67, 0.5), (50, 33));
        assert_eq!(scaled_dims(10, 10, 1.0), (10, 10));
    }
}
