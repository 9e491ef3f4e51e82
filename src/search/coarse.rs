//! Coarse pass: strided pruning of the placement grid.

use crate::candidate::Candidate;
use crate::image::GrayView;
#[cfg(feature = "rayon")]
use crate::kernel::rayon::coarse_scan_par;
#[cfg(not(feature = "rayon"))]
use crate::kernel::scalar::coarse_scan;
use crate::search::DetectConfig;
use crate::template::InstancePlan;
use crate::trace::{trace_event, trace_span};

/// Placement stride for one instance: a fixed fraction of the instance
/// width with a floor of 4 pixels, so larger templates take proportionally
/// coarser steps and total work stays roughly bounded across scales.
pub(crate) fn placement_stride(width: usize, ratio: f32) -> usize {
    ((width as f32 * ratio).floor() as usize).max(4)
}

/// Scans the whole placement grid for one instance and returns the best
/// candidates, ascending by score, capped at `top_candidates`.
pub(crate) fn coarse_pass(
    target: GrayView<'_>,
    plan: &InstancePlan,
    cfg: &DetectConfig,
) -> Vec<Candidate> {
    let stride = placement_stride(plan.width(), cfg.coarse_stride_ratio);
    let _guard = trace_span!("coarse_pass", stride = stride).entered();

    #[cfg(feature = "rayon")]
    let candidates = coarse_scan_par(
        target,
        plan,
        stride,
        cfg.early_termination_cutoff,
        cfg.top_candidates,
    );
    #[cfg(not(feature = "rayon"))]
    let candidates = coarse_scan(
        target,
        plan,
        stride,
        cfg.early_termination_cutoff,
        cfg.top_candidates,
    );

    trace_event!("coarse_candidates", count = candidates.len());
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_scales_with_width_and_floors_at_four() {
        assert_eq!(placement_stride(30, 0.1), 4);
        assert_eq!(placement_stride(40, 0.1), 4);
        assert_eq!(placement_stride(50, 0.1), 5);
        assert_eq!(placement_stride(100, 0.1), 10);
        assert_eq!(placement_stride(10, 0.1), 4);
    }
}
