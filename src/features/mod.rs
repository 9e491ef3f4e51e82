//! Feature-based detection engine.
//!
//! An alternative to template search: FAST corners on both images, an
//! oriented 256-bit binary descriptor per corner, brute-force Hamming
//! matching with a ratio test, and a verdict from the surviving match
//! count. It holds up better than windowed scoring when the mark is
//! perspective-warped or partly occluded, at the cost of needing enough
//! texture on both sides to find corners at all.
//!
//! Corner detection itself has no scale invariance, so
//! [`FeatureEngine::detect_multi_scale`] retries the match at a few
//! explicit target rescalings and keeps the strongest result.

mod descriptor;
mod matching;

pub use matching::FeatureMatch;

use image::GrayImage;
use imageproc::corners::corners_fast9;

use crate::image::{io, GrayBuffer, GrayView};
use crate::template::resize::{resize_bilinear, scaled_dims};
use crate::trace::{trace_event, trace_span};
use crate::util::{QrMarkError, QrMarkResult};

/// Keypoints closer than this to the border are discarded; orientation
/// and descriptor sampling need a full patch of real pixels around them.
const EDGE_MARGIN: u32 = 16;

/// Smallest rescaled target side worth extracting features from. Below
/// this the margin filter leaves no usable interior.
const MIN_FEATURE_SIDE: usize = 2 * EDGE_MARGIN as usize + 1;

/// Tuning knobs for the feature engine.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureConfig {
    /// Contrast threshold for FAST corner detection.
    pub fast_threshold: u8,
    /// Cap on keypoints per image, keeping the strongest corners.
    pub max_keypoints: usize,
    /// Below this many keypoints on either side the comparison is not
    /// attempted and the verdict is [`FeatureVerdict::InsufficientFeatures`].
    pub min_keypoints: usize,
    /// Ratio-test bound: a nearest neighbor is kept only if closer than
    /// `lowe_ratio` times the second nearest.
    pub lowe_ratio: f32,
    /// Minimum surviving matches for a [`FeatureVerdict::Flagged`] verdict.
    pub match_threshold: usize,
    /// Target rescalings tried by [`FeatureEngine::detect_multi_scale`].
    pub target_scales: Vec<f32>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            fast_threshold: 20,
            max_keypoints: 2000,
            min_keypoints: 10,
            lowe_ratio: 0.75,
            match_threshold: 30,
            target_scales: vec![1.0, 0.75, 0.5, 1.25],
        }
    }
}

impl FeatureConfig {
    /// Checks the configuration for values the engine cannot run with.
    pub fn validate(&self) -> QrMarkResult<()> {
        if self.fast_threshold == 0 {
            return Err(QrMarkError::InvalidConfig {
                reason: "fast_threshold must be at least 1",
            });
        }
        if self.min_keypoints < 2 {
            return Err(QrMarkError::InvalidConfig {
                reason: "min_keypoints must be at least 2",
            });
        }
        if self.max_keypoints < self.min_keypoints {
            return Err(QrMarkError::InvalidConfig {
                reason: "max_keypoints must be at least min_keypoints",
            });
        }
        if !(self.lowe_ratio > 0.0 && self.lowe_ratio <= 1.0) {
            return Err(QrMarkError::InvalidConfig {
                reason: "lowe_ratio must be within (0, 1]",
            });
        }
        if self.match_threshold == 0 {
            return Err(QrMarkError::InvalidConfig {
                reason: "match_threshold must be at least 1",
            });
        }
        if self.target_scales.is_empty() {
            return Err(QrMarkError::InvalidConfig {
                reason: "target_scales must not be empty",
            });
        }
        if !self.target_scales.iter().all(|s| s.is_finite() && *s > 0.0) {
            return Err(QrMarkError::InvalidConfig {
                reason: "target_scales must be positive and finite",
            });
        }
        Ok(())
    }
}

/// Outcome category of a feature comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureVerdict {
    /// Enough descriptor matches survived the ratio test.
    Flagged,
    /// Both images had features, but too few of them corresponded.
    Clean,
    /// One of the images did not yield enough keypoints to compare.
    InsufficientFeatures,
}

/// Result of one feature comparison, including the evidence behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureReport {
    pub verdict: FeatureVerdict,
    /// Matches that survived the ratio test.
    pub match_count: usize,
    /// Share of the smaller keypoint set that found a match, in percent.
    pub confidence: f32,
    /// Target rescaling this report was produced at (1.0 for unscaled).
    pub scale: f32,
    pub reference_keypoints: usize,
    pub target_keypoints: usize,
}

impl FeatureReport {
    /// True when the verdict is [`FeatureVerdict::Flagged`].
    pub fn is_fake(&self) -> bool {
        self.verdict == FeatureVerdict::Flagged
    }
}

/// Feature comparison engine with a fixed configuration.
pub struct FeatureEngine {
    config: FeatureConfig,
}

impl FeatureEngine {
    /// Engine with the default configuration.
    pub fn new() -> Self {
        Self {
            config: FeatureConfig::default(),
        }
    }

    /// Engine with an explicit configuration. The configuration is
    /// checked when a detection runs, not here.
    pub fn with_config(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Compares the reference mark against the target at native scale.
    pub fn detect(
        &self,
        reference: GrayView<'_>,
        target: GrayView<'_>,
    ) -> QrMarkResult<FeatureReport> {
        self.config.validate()?;
        let _guard = trace_span!("feature_detect").entered();
        let reference_set = self.extract(reference)?;
        let target_set = self.extract(target)?;
        let report = self.score(&reference_set, &target_set, 1.0);
        trace_event!(
            "feature_done",
            matches = report.match_count,
            reference_keypoints = report.reference_keypoints,
            target_keypoints = report.target_keypoints,
        );
        Ok(report)
    }

    /// Compares at every configured target rescaling and keeps the report
    /// with the most matches. Ties keep the earlier scale in the list.
    pub fn detect_multi_scale(
        &self,
        reference: GrayView<'_>,
        target: GrayView<'_>,
    ) -> QrMarkResult<FeatureReport> {
        self.config.validate()?;
        let _guard = trace_span!("feature_detect_multi_scale").entered();
        let reference_set = self.extract(reference)?;
        let target_buf = GrayBuffer::from_view(target)?;

        let mut best: Option<FeatureReport> = None;
        for &scale in &self.config.target_scales {
            let (width, height) = scaled_dims(target_buf.width(), target_buf.height(), scale);
            if width < MIN_FEATURE_SIDE || height < MIN_FEATURE_SIDE {
                continue;
            }
            let scaled = resize_bilinear(target_buf.view(), width, height)?;
            let target_set = self.extract(scaled.view())?;
            let report = self.score(&reference_set, &target_set, scale);
            trace_event!(
                "feature_scale_done",
                scale = f64::from(scale),
                matches = report.match_count,
            );
            let better = match &best {
                None => true,
                Some(prev) => report.match_count > prev.match_count,
            };
            if better {
                best = Some(report);
            }
        }

        match best {
            Some(report) => Ok(report),
            // Every configured scale shrank the target below the usable
            // minimum; fall back to the unscaled image.
            None => {
                let target_set = self.extract(target_buf.view())?;
                Ok(self.score(&reference_set, &target_set, 1.0))
            }
        }
    }

    fn extract(&self, view: GrayView<'_>) -> QrMarkResult<Vec<[u8; 32]>> {
        let buffer = GrayBuffer::from_view(view)?;
        let image = io::gray_to_image(&buffer)?;
        Ok(self.extract_from_image(&image))
    }

    fn extract_from_image(&self, image: &GrayImage) -> Vec<[u8; 32]> {
        let mut corners = corners_fast9(image, self.config.fast_threshold);
        let right = image.width().saturating_sub(EDGE_MARGIN);
        let bottom = image.height().saturating_sub(EDGE_MARGIN);
        corners.retain(|c| {
            c.x >= EDGE_MARGIN && c.y >= EDGE_MARGIN && c.x < right && c.y < bottom
        });
        corners.sort_by(|a, b| b.score.total_cmp(&a.score));
        corners.truncate(self.config.max_keypoints);

        corners
            .iter()
            .map(|c| {
                let angle = descriptor::keypoint_orientation(image, c.x, c.y);
                descriptor::steered_brief(image, c.x, c.y, angle)
            })
            .collect()
    }

    fn score(&self, reference: &[[u8; 32]], target: &[[u8; 32]], scale: f32) -> FeatureReport {
        let reference_keypoints = reference.len();
        let target_keypoints = target.len();
        if reference_keypoints < self.config.min_keypoints
            || target_keypoints < self.config.min_keypoints
        {
            return FeatureReport {
                verdict: FeatureVerdict::InsufficientFeatures,
                match_count: 0,
                confidence: 0.0,
                scale,
                reference_keypoints,
                target_keypoints,
            };
        }

        let matches = matching::ratio_matches(reference, target, self.config.lowe_ratio);
        let match_count = matches.len();
        let denom = reference_keypoints.min(target_keypoints) as f32;
        let confidence = (match_count as f32 / denom * 100.0).min(100.0);
        let verdict = if match_count >= self.config.match_threshold {
            FeatureVerdict::Flagged
        } else {
            FeatureVerdict::Clean
        };

        FeatureReport {
            verdict,
            match_count,
            confidence,
            scale,
            reference_keypoints,
            target_keypoints,
        }
    }
}

impl Default for FeatureEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn textured(width: usize, height: usize) -> GrayBuffer {
        let pixels = (0..width * height)
            .map(|i| {
                let x = i % width;
                let y = i / width;
                (((x * 13) ^ (y * 7) ^ (x * y)) & 0xFF) as u8
            })
            .collect();
        GrayBuffer::from_vec(pixels, width, height).expect("buffer dims")
    }

    #[test]
    fn default_config_validates() {
        assert_eq!(FeatureConfig::default().validate(), Ok(()));
    }

    #[test]
    fn bad_configs_are_rejected() {
        let cfg = FeatureConfig {
            lowe_ratio: 0.0,
            ..FeatureConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(QrMarkError::InvalidConfig { .. })
        ));

        let cfg = FeatureConfig {
            target_scales: Vec::new(),
            ..FeatureConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(QrMarkError::InvalidConfig { .. })
        ));

        let cfg = FeatureConfig {
            max_keypoints: 5,
            ..FeatureConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(QrMarkError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn textured_image_yields_keypoints() {
        let buf = textured(128, 128);
        let engine = FeatureEngine::new();
        let set = engine.extract(buf.view()).expect("extract");
        assert!(
            set.len() >= FeatureConfig::default().min_keypoints,
            "only {} keypoints",
            set.len()
        );
        assert!(set.len() <= FeatureConfig::default().max_keypoints);
    }

    #[test]
    fn uniform_image_reports_insufficient_features() {
        let flat = GrayBuffer::from_vec(vec![128; 64 * 64], 64, 64).expect("buffer dims");
        let buf = textured(128, 128);
        let engine = FeatureEngine::new();
        let report = engine.detect(buf.view(), flat.view()).expect("detect");
        assert_eq!(report.verdict, FeatureVerdict::InsufficientFeatures);
        assert_eq!(report.match_count, 0);
        assert_eq!(report.confidence, 0.0);
    }

    #[test]
    fn image_matches_itself() {
        let buf = textured(128, 128);
        let engine = FeatureEngine::new();
        let report = engine.detect(buf.view(), buf.view()).expect("detect");
        assert_eq!(report.verdict, FeatureVerdict::Flagged);
        assert!(
            report.match_count >= FeatureConfig::default().match_threshold,
            "only {} matches",
            report.match_count
        );
        assert!(report.confidence > 0.0);
    }

    #[test]
    fn multi_scale_prefers_the_exact_scale() {
        let buf = textured(160, 160);
        let engine = FeatureEngine::new();
        let report = engine
            .detect_multi_scale(buf.view(), buf.view())
            .expect("detect");
        assert_eq!(report.scale, 1.0);
        assert!(report.is_fake());
    }

    #[test]
    fn scales_below_usable_size_fall_back_to_native() {
        let buf = textured(128, 128);
        let mut cfg = FeatureConfig::default();
        cfg.target_scales = vec![0.01];
        let engine = FeatureEngine::with_config(cfg);
        let report = engine
            .detect_multi_scale(buf.view(), buf.view())
            .expect("detect");
        assert_eq!(report.scale, 1.0);
    }
}
