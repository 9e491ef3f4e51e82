//! Fine pass: exhaustive local search around coarse candidates.

use crate::candidate::Candidate;
use crate::image::GrayView;
use crate::kernel::scalar::zm_mse_at;
use crate::policy::BestMatch;
use crate::template::InstancePlan;
use crate::trace::{trace_event, trace_span};

/// Clamps a square neighborhood around `(x, y)` to the valid placement
/// range. Returns `None` when the neighborhood lies entirely outside it.
fn roi_bounds(
    x: usize,
    y: usize,
    radius: usize,
    max_x: usize,
    max_y: usize,
) -> Option<(usize, usize, usize, usize)> {
    let x0 = x.saturating_sub(radius);
    let y0 = y.saturating_sub(radius);
    if x0 > max_x || y0 > max_y {
        return None;
    }
    let x1 = x.saturating_add(radius).min(max_x);
    let y1 = y.saturating_add(radius).min(max_y);
    Some((x0, y0, x1, y1))
}

/// Re-scores every placement within `radius` of each candidate at the fine
/// pixel stride, folding improvements into the global best.
///
/// The abort limit is rebuilt from the current best each placement, so
/// pruning tightens as better matches are found anywhere in the search,
/// across candidates and across instances. Runs sequentially: the
/// tightening makes evaluation order part of the work done, and candidate
/// counts are tiny.
pub(crate) fn fine_pass(
    target: GrayView<'_>,
    plan: &InstancePlan,
    candidates: &[Candidate],
    radius: usize,
    best_score: &mut f32,
    best_placement: &mut Option<BestMatch>,
) {
    if candidates.is_empty() {
        return;
    }
    let _guard = trace_span!("fine_pass", candidates = candidates.len(), radius = radius).entered();

    let stats = plan.fine();
    let count_f = stats.count as f32;
    let max_x = target.width() - plan.width();
    let max_y = target.height() - plan.height();
    let mut improved = 0usize;

    for cand in candidates {
        let Some((x0, y0, x1, y1)) = roi_bounds(cand.x, cand.y, radius, max_x, max_y) else {
            continue;
        };
        for y in y0..=y1 {
            for x in x0..=x1 {
                let limit = *best_score * count_f;
                let Some(score) = zm_mse_at(target, plan.view(), stats, x, y, limit) else {
                    continue;
                };
                if score < *best_score {
                    *best_score = score;
                    *best_placement = Some(BestMatch {
                        x,
                        y,
                        scale: plan.scale(),
                        rotation: plan.rotation(),
                        width: plan.width(),
                        height: plan.height(),
                    });
                    improved += 1;
                }
            }
        }
    }

    trace_event!("fine_improvements", count = improved);
}
