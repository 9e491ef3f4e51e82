//! Per-instance precomputation for sampled zero-mean scoring.

use crate::image::{GrayBuffer, GrayView};
use crate::template::Rotation;

/// Template statistics over one strided sampling grid.
///
/// The zero-mean score subtracts a mean taken over the same sparse grid the
/// squared differences are summed on, so each pixel stride gets its own
/// stats. Mixing grids would bias the score at uniform-intensity edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampledStats {
    /// Grid step in pixels along both axes.
    pub pixel_stride: usize,
    /// Number of grid samples.
    pub count: usize,
    /// Mean intensity over the grid samples.
    pub mean: f32,
}

/// Computes sampled statistics for a view at a pixel stride.
pub fn sampled_stats(view: GrayView<'_>, pixel_stride: usize) -> SampledStats {
    let stride = pixel_stride.max(1);
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for y in (0..view.height()).step_by(stride) {
        let row = view.row(y).expect("row in bounds");
        for x in (0..view.width()).step_by(stride) {
            sum += f64::from(row[x]);
            count += 1;
        }
    }
    SampledStats {
        pixel_stride: stride,
        count,
        mean: (sum / count as f64) as f32,
    }
}

/// One (scale, rotation) search instance: the resampled patch buffer plus
/// its sampled statistics for the coarse and fine grids.
pub struct InstancePlan {
    buffer: GrayBuffer,
    scale: f32,
    rotation: Rotation,
    coarse: SampledStats,
    fine: SampledStats,
}

impl InstancePlan {
    /// Wraps a scaled template buffer, precomputing stats for both passes.
    pub fn new(
        buffer: GrayBuffer,
        scale: f32,
        rotation: Rotation,
        coarse_pixel_stride: usize,
        fine_pixel_stride: usize,
    ) -> Self {
        let coarse = sampled_stats(buffer.view(), coarse_pixel_stride);
        let fine = sampled_stats(buffer.view(), fine_pixel_stride);
        Self {
            buffer,
            scale,
            rotation,
            coarse,
            fine,
        }
    }

    /// Returns the instance width in pixels.
    pub fn width(&self) -> usize {
        self.buffer.width()
    }

    /// Returns the instance height in pixels.
    pub fn height(&self) -> usize {
        self.buffer.height()
    }

    /// Returns the scale factor this instance was resampled at.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Returns the rotation applied before scaling.
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Returns a borrowed view of the template pixels.
    pub fn view(&self) -> GrayView<'_> {
        self.buffer.view()
    }

    /// Returns the coarse-grid statistics.
    pub fn coarse(&self) -> SampledStats {
        self.coarse
    }

    /// Returns the fine-grid statistics.
    pub fn fine(&self) -> SampledStats {
        self.fine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::GrayBuffer;

    #[test]
    fn sampled_stats_match_known_grid() {
        // 4x4 ramp, stride 2 samples (0,0) (2,0) (0,2) (2,2) = 0, 2, 8, 10.
        let data: Vec<u8> = (0u8..16).collect();
        let buf = GrayBuffer::from_vec(data, 4, 4).unwrap();
        let stats = sampled_stats(buf.view(), 2);
        assert_eq!(stats.count, 4);
        assert!((stats.mean - 5.0).abs() < 1e-6);
    }

    #[test]
    fn stride_one_covers_every_pixel() {
        let data: Vec<u8> = (0u8..16).collect();
        let buf = GrayBuffer::from_vec(data, 4, 4).unwrap();
        let stats = sampled_stats(buf.view(), 1);
        assert_eq!(stats.count, 16);
        assert!((stats.mean - 7.5).abs() < 1e-6);
    }

    #[test]
    fn plan_carries_distinct_grids() {
        let data: Vec<u8> = (0u8..=255).cycle().take(30 * 30).collect();
        let buf = GrayBuffer::from_vec(data, 30, 30).unwrap();
        let plan = InstancePlan::new(buf, 0.3, Rotation::R0, 4, 2);
        assert_eq!(plan.coarse().count, 8 * 8);
        assert_eq!(plan.fine().count, 15 * 15);
        assert_eq!(plan.width(), 30);
        assert_eq!(plan.rotation(), Rotation::R0);
    }
}
