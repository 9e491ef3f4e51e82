//! Oriented binary descriptors for FAST keypoints.
//!
//! Each keypoint gets an orientation from the intensity centroid of its
//! neighborhood, then a 256-bit BRIEF descriptor sampled along the
//! standard ORB test pattern rotated into that orientation. Steering the
//! pattern is what buys rotation invariance; the pattern itself is the
//! learned pair set published with ORB.

use image::GrayImage;

/// Radius of the intensity-centroid disc used for orientation.
const CENTROID_RADIUS: i32 = 15;

/// The 256 learned intensity-pair tests, as (x1, y1, x2, y2) offsets.
pub(crate) const ORB_PATTERN: [(i8, i8, i8, i8); 256] = [
    (8, -3, 9, 5), (-11, 9, -8, 2), (3, -12, -13, 2), (-3, -7, -4, 5),
    (1, -11, 12, -2), (1, -1, 11, -1), (4, -2, -5, -8), (2, -13, -8, 9),
    (-11, 1, 6, 2), (11, 11, 12, -1), (6, -12, -9, -8), (12, 5, 3, -6),
    (1, 1, -4, -1), (7, -4, -6, 7), (-3, 2, 9, -8), (-4, -8, 3, 3),
    (-5, 3, 0, -4), (2, -11, -13, 0), (10, 5, 5, 2), (0, 9, 10, -3),
    (5, -8, -10, 1), (8, 3, -8, -5), (2, -6, -9, -4), (-12, 2, 0, -10),
    (5, -10, -7, -2), (-7, 9, -1, 0), (0, -1, -3, 3), (-12, 5, -2, -1),
    (-1, 1, -5, -11), (-1, 2, -3, 0), (-5, -6, 7, -1), (4, 7, 0, -8),
    (-9, 9, 3, -13), (7, -3, 13, -7), (10, -4, -5, 3), (6, 1, -13, -13),
    (-12, -11, 7, 0), (0, -1, -8, -6), (-10, -5, -6, 7), (10, 2, -6, -12),
    (-11, 8, 4, -2), (9, 0, -11, -4), (0, 11, 6, -11), (4, 1, -10, -3),
    (-6, 12, 1, 12), (-4, -8, 8, -7), (-3, 0, 8, 3), (3, 3, -3, -1),
    (-6, -11, -2, 12), (0, -3, -6, -3), (-6, 3, -12, -8), (6, 3, -2, -10),
    (-3, -10, -1, 0), (11, 2, 11, 3), (1, -8, -10, 8), (2, -2, -7, 8),
    (0, -13, 13, 0), (6, -9, -1, -1), (7, 5, 6, 3), (-13, 7, -7, -7),
    (-5, -13, 5, -11), (6, 7, -2, 12), (-6, -11, 8, 6), (-2, -2, -5, 9),
    (5, 4, 7, -6), (0, 11, -4, -5), (10, 1, 2, -8), (-3, -10, -10, -10),
    (1, 9, 6, -5), (-7, -11, 11, 3), (11, -2, -4, 3), (7, -1, 5, 12),
    (-5, 5, -2, -5), (8, -11, -1, -13), (-13, 2, -11, -8), (-2, 9, 5, 0),
    (2, -5, 2, 0), (3, -13, -12, 9), (6, -3, 5, 4), (10, 10, 1, -9),
    (-13, -8, -4, 10), (2, -2, -3, 8), (-13, -11, -8, -3), (2, -4, -7, -3),
    (12, 0, -2, 13), (-11, 7, -10, -1), (-5, -10, 0, -11), (6, 7, 12, -3),
    (-1, -1, 8, -6), (-6, 3, -1, -3), (-2, -11, -11, -3), (12, -2, 3, -10),
    (-11, -1, -2, -8), (3, -1, 7, 3), (2, -2, -12, 12), (6, -4, 12, -2),
    (-3, 11, 2, -12), (-1, 3, 2, 3), (1, 3, -11, -3), (2, -8, -7, -5),
    (0, -5, -11, -6), (-12, 8, -2, 9), (3, -7, 9, -8), (-10, -6, -1, -11),
    (11, -6, -3, -13), (3, 0, 0, -8), (-5, -2, -1, -13), (-8, -5, -10, -13),
    (7, -13, 0, -3), (1, -4, -1, -13), (6, -5, -7, 8), (8, 7, -5, -13),
    (2, 0, -8, -6), (-8, -3, -13, -6), (-6, 5, 0, 6), (-8, 8, -9, 1),
    (10, 1, -9, 4), (-4, -8, -5, 7), (7, 7, 10, -8), (-7, -3, -1, 1),
    (10, -1, 3, 1), (5, 6, -10, -8), (-6, -13, 5, -8), (4, -3, -4, -13),
    (-3, 4, -2, -13), (10, -11, 9, 11), (-9, 0, 12, 2), (-4, -2, 13, -6),
    (2, -10, -6, 1), (11, -13, 4, -13), (1, -1, 1, 9), (1, -5, -13, -5),
    (7, 4, 12, -7), (0, -2, -8, 3), (7, 2, 2, -8), (-2, 7, -12, -4),
    (1, 11, 6, -2), (-1, -1, -4, 10), (0, 8, 0, -13), (3, 12, 5, -13),
    (-9, -1, 9, -13), (12, 4, -6, -4), (-13, 13, 1, -4), (0, -2, -7, -9),
    (10, -8, -13, 3), (2, -13, 6, 8), (10, -6, -7, 0), (-11, 7, -1, -7),
    (12, 0, 5, -4), (-7, -8, 4, -12), (-13, 5, -5, -2), (0, 5, 4, 4),
    (-2, -11, -1, 8), (9, 3, -1, -12), (0, 6, -10, 12), (1, -8, -7, -10),
    (-6, 4, -6, 3), (5, 1, -3, -9), (-6, 6, -6, 3), (7, -8, 1, -7),
    (3, 8, -9, -5), (2, -4, 5, 7), (11, 4, 6, -3), (-8, -1, 11, -1),
    (-3, -6, -10, -8), (2, 7, 3, -12), (-4, -10, 12, -3), (1, -2, -4, 6),
    (3, 11, -11, 0), (-6, 2, 3, -8), (6, 12, 0, -13), (3, 2, -2, -5),
    (-4, 1, -6, 5), (-12, 0, -13, 9), (-6, 2, 7, -8), (-2, -4, -6, 5),
    (0, 0, 0, -13), (9, -13, -2, 0), (3, -13, 5, -12), (10, 11, -13, -13),
    (-2, 3, -12, 3), (11, 7, -7, 0), (12, 2, 1, -13), (12, -11, 12, -8),
    (-7, -2, -4, -7), (7, 5, -1, -13), (-5, -8, -9, 10), (6, 0, -3, -13),
    (12, 4, -13, 1), (-7, 8, 8, -3), (10, -4, 0, -13), (2, 1, -7, 0),
    (-5, 4, 2, -8), (12, 8, 4, -13), (8, 7, -10, 0), (-3, 6, -2, 4),
    (-5, -1, -8, -12), (4, -1, -2, -10), (6, -4, -13, 9), (-7, 8, -6, -12),
    (-10, 2, -13, 10), (-1, -7, 0, 2), (-5, 6, -5, -12), (6, -13, 7, -3),
    (-13, 2, -1, 8), (2, 8, -13, 0), (-6, -9, 1, -4), (-9, 13, 0, -13),
    (-2, -3, 8, 0), (4, 0, -11, 12), (0, 3, -10, 10), (-6, -9, -3, -2),
    (9, -4, -6, 2), (5, 0, -13, -10), (-3, -8, -13, 3), (-12, -1, -4, -2),
    (7, -9, -4, 3), (-8, -4, 1, 11), (11, 6, 2, -12), (6, 6, -8, 12),
    (-3, -8, 2, -10), (2, 5, -8, 8), (-9, 8, -6, -8), (-4, 0, -11, -7),
    (7, 6, -3, 8), (-5, 7, -12, 5), (2, -8, -5, 1), (0, 4, -5, -3),
    (9, -9, -6, -12), (0, -13, 0, -13), (-7, -11, -3, -13), (6, -12, -7, 10),
    (6, -8, -13, 7), (8, 7, -11, -1), (-11, -5, -6, 9), (6, 4, 2, -13),
    (-1, -6, 3, -9), (1, -4, 4, -3), (-6, 8, -12, 0), (-11, 3, -6, 2),
    (7, -10, 11, -6), (5, 0, 12, -13), (4, -8, 1, -1), (-13, 12, -6, 3),
    (1, 4, -9, -2), (-8, -12, -8, 7), (-9, 5, 0, -5), (9, 7, 5, 3),
    (-12, -2, 8, -8), (3, 7, 12, -8), (-13, 3, -1, -1), (-10, -4, -10, 12),
    (5, -2, 0, 13), (-7, 1, -12, 8), (2, 9, -5, -11), (11, -13, 0, 2),
];

/// Orientation of a keypoint from the intensity centroid of the disc
/// around it. Returns the angle of the vector from the keypoint to the
/// centroid, in radians.
pub(crate) fn keypoint_orientation(image: &GrayImage, x: u32, y: u32) -> f32 {
    let width = image.width() as i32;
    let height = image.height() as i32;
    let mut m01 = 0.0f32;
    let mut m10 = 0.0f32;

    for dy in -CENTROID_RADIUS..=CENTROID_RADIUS {
        for dx in -CENTROID_RADIUS..=CENTROID_RADIUS {
            if dx * dx + dy * dy > CENTROID_RADIUS * CENTROID_RADIUS {
                continue;
            }
            let px = x as i32 + dx;
            let py = y as i32 + dy;
            if px < 0 || py < 0 || px >= width || py >= height {
                continue;
            }
            let intensity = image.get_pixel(px as u32, py as u32)[0] as f32;
            m01 += intensity * dy as f32;
            m10 += intensity * dx as f32;
        }
    }

    m01.atan2(m10)
}

/// 256-bit BRIEF descriptor with the test pattern steered by `angle`.
///
/// Test points falling outside the image clamp to the border, matching
/// how detectors near the edge are handled upstream by the margin filter.
pub(crate) fn steered_brief(image: &GrayImage, x: u32, y: u32, angle: f32) -> [u8; 32] {
    let (sin_a, cos_a) = angle.sin_cos();
    let max_x = image.width() as i32 - 1;
    let max_y = image.height() as i32 - 1;
    let cx = x as i32;
    let cy = y as i32;

    let mut descriptor = [0u8; 32];
    for (byte_idx, byte_tests) in ORB_PATTERN.chunks(8).enumerate() {
        let mut byte_val = 0u8;
        for (bit_idx, &(x1, y1, x2, y2)) in byte_tests.iter().enumerate() {
            let r1x = (x1 as f32 * cos_a - y1 as f32 * sin_a) as i32;
            let r1y = (x1 as f32 * sin_a + y1 as f32 * cos_a) as i32;
            let r2x = (x2 as f32 * cos_a - y2 as f32 * sin_a) as i32;
            let r2y = (x2 as f32 * sin_a + y2 as f32 * cos_a) as i32;

            let p1x = (cx + r1x).clamp(0, max_x) as u32;
            let p1y = (cy + r1y).clamp(0, max_y) as u32;
            let p2x = (cx + r2x).clamp(0, max_x) as u32;
            let p2y = (cy + r2y).clamp(0, max_y) as u32;

            if image.get_pixel(p1x, p1y)[0] < image.get_pixel(p2x, p2y)[0] {
                byte_val |= 1 << bit_idx;
            }
        }
        descriptor[byte_idx] = byte_val;
    }

    descriptor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn textured_image(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            image::Luma([(((x * 13) ^ (y * 7) ^ (x * y)) & 0xFF) as u8])
        })
    }

    #[test]
    fn orientation_points_toward_bright_side() {
        // Bright half-plane to the right of the keypoint: the centroid
        // vector points along +x, so the angle is near zero.
        let img = GrayImage::from_fn(64, 64, |x, _| image::Luma([if x >= 32 { 255 } else { 0 }]));
        let angle = keypoint_orientation(&img, 32, 32);
        assert!(angle.abs() < 0.05, "angle {angle}");

        // Bright half-plane below: centroid along +y.
        let img = GrayImage::from_fn(64, 64, |_, y| image::Luma([if y >= 32 { 255 } else { 0 }]));
        let angle = keypoint_orientation(&img, 32, 32);
        assert!((angle - std::f32::consts::FRAC_PI_2).abs() < 0.05, "angle {angle}");
    }

    #[test]
    fn descriptor_is_deterministic() {
        let img = textured_image(64, 64);
        let a = steered_brief(&img, 30, 30, 0.3);
        let b = steered_brief(&img, 30, 30, 0.3);
        assert_eq!(a, b);
    }

    #[test]
    fn descriptor_differs_between_distinct_points() {
        let img = textured_image(64, 64);
        let a = steered_brief(&img, 20, 20, 0.0);
        let b = steered_brief(&img, 43, 37, 0.0);
        assert_ne!(a, b);
    }

    #[test]
    fn pattern_offsets_stay_within_patch() {
        for &(x1, y1, x2, y2) in ORB_PATTERN.iter() {
            for v in [x1, y1, x2, y2] {
                assert!((-13..=13).contains(&v));
            }
        }
    }
}
