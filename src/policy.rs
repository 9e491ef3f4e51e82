//! Mapping from best search score to verdict and confidence.

use crate::template::Rotation;

/// Outcome of a detection call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Best score beat the threshold: the fingerprint is present.
    Flagged,
    /// The search ran but nothing scored under the threshold.
    Clean,
    /// No (scale, rotation) instance fit inside the target, so no score
    /// exists. A defined outcome, not an error.
    NoScaleFit,
}

/// Location and geometry of the best-scoring placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestMatch {
    /// Column of the window's top-left corner in the target.
    pub x: usize,
    /// Row of the window's top-left corner in the target.
    pub y: usize,
    /// Scale factor of the matched instance.
    pub scale: f32,
    /// Rotation of the matched instance.
    pub rotation: Rotation,
    /// Instance width in pixels.
    pub width: usize,
    /// Instance height in pixels.
    pub height: usize,
}

/// Full detection result.
///
/// `best` is reported whenever any placement was scored, including clean
/// results, so callers can inspect near misses when tuning thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub verdict: Verdict,
    /// Best (lowest) score found, absent when nothing was scored.
    pub score: Option<f32>,
    /// Threshold the verdict was taken against.
    pub threshold: f32,
    /// 0 to 100; positive only when flagged.
    pub confidence: f32,
    pub best: Option<BestMatch>,
}

impl MatchResult {
    /// Returns true when the target was flagged as carrying the pattern.
    pub fn is_fake(&self) -> bool {
        self.verdict == Verdict::Flagged
    }

    pub(crate) fn no_scale_fit(threshold: f32) -> Self {
        Self {
            verdict: Verdict::NoScaleFit,
            score: None,
            threshold,
            confidence: 0.0,
            best: None,
        }
    }

    pub(crate) fn from_best(threshold: f32, best: Option<(f32, BestMatch)>) -> Self {
        match best {
            Some((score, placement)) => {
                let flagged = score < threshold;
                Self {
                    verdict: if flagged { Verdict::Flagged } else { Verdict::Clean },
                    score: Some(score),
                    threshold,
                    confidence: confidence(score, threshold),
                    best: Some(placement),
                }
            }
            None => Self {
                verdict: Verdict::Clean,
                score: None,
                threshold,
                confidence: 0.0,
                best: None,
            },
        }
    }
}

/// Confidence in percent: how far below the threshold the score landed.
///
/// Scores at or above the threshold clamp to 0, a perfect score of 0 gives
/// 100. Monotonic in both arguments.
pub fn confidence(score: f32, threshold: f32) -> f32 {
    (100.0 * (1.0 - score / threshold)).clamp(0.0, 100.0)
}
