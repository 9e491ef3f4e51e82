//! Scalar reference kernel for sampled zero-mean scoring.

use crate::candidate::{Candidate, TopCandidates};
use crate::image::GrayView;
use crate::template::{InstancePlan, SampledStats};

/// Scores one template placement with the sampled zero-mean metric.
///
/// Both means are taken over the strided grid recorded in `stats`, which
/// must come from the same template `tpl` points at. The accumulated sum of
/// squared differences is compared against `limit` (a raw sum, i.e. the
/// caller's score bound times `stats.count`) after every sampled row;
/// `None` means the placement exceeded the limit and cannot be
/// competitive. Out-of-bounds placements also return `None`.
pub(crate) fn zm_mse_at(
    target: GrayView<'_>,
    tpl: GrayView<'_>,
    stats: SampledStats,
    x: usize,
    y: usize,
    limit: f32,
) -> Option<f32> {
    let tpl_width = tpl.width();
    let tpl_height = tpl.height();
    if x + tpl_width > target.width() || y + tpl_height > target.height() {
        return None;
    }

    let stride = stats.pixel_stride;
    let count_f = stats.count as f32;

    // Pass 1: window mean over the same sampled grid as the template's.
    let mut win_sum = 0.0f32;
    for ty in (0..tpl_height).step_by(stride) {
        let img_row = target.row(y + ty).expect("row within bounds for score");
        for tx in (0..tpl_width).step_by(stride) {
            win_sum += img_row[x + tx] as f32;
        }
    }
    let bias = win_sum / count_f - stats.mean;

    // Pass 2: (t - r) - bias is algebraically (t - meanW) - (r - meanR).
    let mut sum_sq = 0.0f32;
    for ty in (0..tpl_height).step_by(stride) {
        let img_row = target.row(y + ty).expect("row within bounds for score");
        let tpl_row = tpl.row(ty).expect("template row within bounds");
        for tx in (0..tpl_width).step_by(stride) {
            let diff = img_row[x + tx] as f32 - tpl_row[tx] as f32 - bias;
            sum_sq += diff * diff;
        }
        if sum_sq > limit {
            return None;
        }
    }

    Some(sum_sq / count_f)
}

/// Scans one row of the coarse placement grid.
///
/// Returns every placement in the row scoring strictly under `cutoff`.
/// Shared by the sequential and row-parallel coarse scans so both retain
/// exactly the same candidates.
pub(crate) fn coarse_row(
    target: GrayView<'_>,
    plan: &InstancePlan,
    y: usize,
    placement_stride: usize,
    cutoff: f32,
) -> Vec<Candidate> {
    let stats = plan.coarse();
    let limit = cutoff * stats.count as f32;
    let max_x = target.width() - plan.width();

    let mut hits = Vec::new();
    for x in (0..=max_x).step_by(placement_stride) {
        if let Some(score) = zm_mse_at(target, plan.view(), stats, x, y, limit) {
            if score < cutoff {
                hits.push(Candidate { x, y, score });
            }
        }
    }
    hits
}

/// Sequential coarse scan over the full placement grid.
///
/// The caller guarantees the template fits inside the target; oversized
/// instances are skipped before any kernel runs.
pub(crate) fn coarse_scan(
    target: GrayView<'_>,
    plan: &InstancePlan,
    placement_stride: usize,
    cutoff: f32,
    topk: usize,
) -> Vec<Candidate> {
    if plan.width() > target.width() || plan.height() > target.height() {
        return Vec::new();
    }

    let max_y = target.height() - plan.height();
    let mut top = TopCandidates::new(topk);
    for y in (0..=max_y).step_by(placement_stride) {
        for hit in coarse_row(target, plan, y, placement_stride, cutoff) {
            top.push(hit);
        }
    }
    top.into_sorted()
}
