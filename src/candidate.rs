//! Top-K candidate tracking for the coarse pass.

use std::cmp::Ordering;

/// Coarse-pass placement surviving the early-termination cutoff.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    /// X coordinate (column) of the window's top-left corner.
    pub x: usize,
    /// Y coordinate (row) of the window's top-left corner.
    pub y: usize,
    /// Sampled zero-mean score at this placement. Lower is more similar.
    pub score: f32,
}

/// Orders candidates best-first: ascending score, then scan order on ties.
///
/// `total_cmp` gives a total order over any float the kernel can produce,
/// so sorting never panics and ranking is reproducible across runs.
pub(crate) fn candidate_cmp(a: &Candidate, b: &Candidate) -> Ordering {
    a.score
        .total_cmp(&b.score)
        .then_with(|| a.y.cmp(&b.y))
        .then_with(|| a.x.cmp(&b.x))
}

/// Sorts candidates best-first with deterministic tie-breaking.
pub(crate) fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(candidate_cmp);
}

/// Bounded best-K container with O(k) insertion cost.
///
/// K is small (default 10), so a linear worst-slot scan beats heap
/// bookkeeping for the volume of pushes the coarse pass produces.
pub struct TopCandidates {
    k: usize,
    items: Vec<Candidate>,
}

impl TopCandidates {
    /// Creates a collector keeping the best `k` candidates.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            items: Vec::with_capacity(k),
        }
    }

    /// Pushes a candidate, evicting the worst one if at capacity.
    pub fn push(&mut self, candidate: Candidate) {
        if self.k == 0 {
            return;
        }
        if self.items.len() < self.k {
            self.items.push(candidate);
            return;
        }

        let mut worst_idx = 0usize;
        for (idx, item) in self.items.iter().enumerate().skip(1) {
            if candidate_cmp(item, &self.items[worst_idx]) == Ordering::Greater {
                worst_idx = idx;
            }
        }

        if candidate_cmp(&candidate, &self.items[worst_idx]) == Ordering::Less {
            self.items[worst_idx] = candidate;
        }
    }

    /// Returns the retained candidates sorted best-first.
    pub fn into_sorted(mut self) -> Vec<Candidate> {
        sort_candidates(&mut self.items);
        self.items
    }
}
