//! Brute-force Hamming matching with the ratio test.

/// An accepted correspondence between a reference and a target descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureMatch {
    /// Index into the reference feature list.
    pub reference_idx: usize,
    /// Index into the target feature list.
    pub target_idx: usize,
    /// Hamming distance between the two descriptors.
    pub distance: u32,
}

/// Hamming distance between two 256-bit descriptors.
pub(crate) fn hamming_distance(a: &[u8; 32], b: &[u8; 32]) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x ^ y).count_ones())
        .sum()
}

/// Matches every reference descriptor against its two nearest target
/// descriptors and keeps it only if the nearest is clearly better than
/// the runner-up (`best < ratio * second_best`). Ambiguous descriptors,
/// typically from repeated texture, are dropped rather than guessed at.
pub(crate) fn ratio_matches(
    reference: &[[u8; 32]],
    target: &[[u8; 32]],
    ratio: f32,
) -> Vec<FeatureMatch> {
    let mut matches = Vec::new();
    if target.len() < 2 {
        return matches;
    }

    for (ref_idx, ref_desc) in reference.iter().enumerate() {
        let mut best = u32::MAX;
        let mut second = u32::MAX;
        let mut best_idx = 0usize;

        for (tgt_idx, tgt_desc) in target.iter().enumerate() {
            let dist = hamming_distance(ref_desc, tgt_desc);
            if dist < best {
                second = best;
                best = dist;
                best_idx = tgt_idx;
            } else if dist < second {
                second = dist;
            }
        }

        if (best as f32) < ratio * second as f32 {
            matches.push(FeatureMatch {
                reference_idx: ref_idx,
                target_idx: best_idx,
                distance: best,
            });
        }
    }

    matches
}
