//! Rayon-parallel coarse scan (feature-gated).
//!
//! Parallelism goes over placement-grid rows. Each worker collects its
//! row's candidates with the shared scalar row kernel; the per-row vectors
//! come back in row order and are merged sequentially, so the retained
//! top-K is identical to the sequential scan.

use crate::candidate::{Candidate, TopCandidates};
use crate::image::GrayView;
use crate::kernel::scalar::coarse_row;
use crate::template::InstancePlan;
use rayon::prelude::*;

/// Row-parallel coarse scan over the full placement grid.
pub(crate) fn coarse_scan_par(
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
    let rows: Vec<usize> = (0..=max_y).step_by(placement_stride).collect();

    let row_hits: Vec<Vec<Candidate>> = rows
        .par_iter()
        .map(|&y| coarse_row(target, plan, y, placement_stride, cutoff))
        .collect();

    let mut top = TopCandidates::new(topk);
    for hits in row_hits {
        for hit in hits {
            top.push(hit);
        }
    }
    top.into_sorted()
}
