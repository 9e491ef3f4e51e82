//! Two-phase template search over scales and rotations.
//!
//! Each (scale, rotation) pair yields one template instance. The coarse
//! pass prunes the placement grid cheaply, the fine pass recovers exact
//! positions around the survivors, and a single global best is tracked
//! across every instance.

pub(crate) mod coarse;
pub(crate) mod refine;

use std::time::{Duration, Instant};

use crate::image::GrayView;
use crate::policy::{BestMatch, MatchResult};
use crate::reference::ReferencePattern;
use crate::template::resize::{resize_bilinear, scaled_dims};
use crate::template::{InstancePlan, Rotation, MIN_TEMPLATE_SIDE};
use crate::trace::{trace_event, trace_span};
use crate::util::{QrMarkError, QrMarkResult};

/// Tunable search parameters, unified across what used to be per-variant
/// constants.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectConfig {
    /// Score below which a target is flagged.
    ///
    /// Empirically calibrated against a labeled real/fake corpus; the
    /// default is a starting point, not a universal constant, and should
    /// be re-derived whenever the reference asset or patch region changes.
    pub threshold: f32,
    /// Scale factors applied to the reference patch, tried in order.
    pub scales: Vec<f32>,
    /// Page orientations searched.
    pub rotations: Vec<Rotation>,
    /// Coarse placement stride as a fraction of instance width. The
    /// effective stride is `max(4, floor(width * ratio))`, so total coarse
    /// work stays roughly constant across scales.
    pub coarse_stride_ratio: f32,
    /// Pixel sampling step inside a window during the coarse pass.
    pub coarse_pixel_stride: usize,
    /// Pixel sampling step inside a window during the fine pass.
    pub fine_pixel_stride: usize,
    /// Coarse scores above this are dropped without finishing the window.
    pub early_termination_cutoff: f32,
    /// How many coarse candidates are refined per instance.
    pub top_candidates: usize,
    /// Overall budget for one detection call, checked at every
    /// (scale, rotation) boundary.
    pub deadline: Option<Duration>,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            threshold: 550.0,
            scales: vec![0.15, 0.2, 0.25, 0.3, 0.35, 0.4, 0.5, 0.6, 0.7, 0.8, 1.0],
            rotations: Rotation::ALL.to_vec(),
            coarse_stride_ratio: 0.1,
            coarse_pixel_stride: 4,
            fine_pixel_stride: 2,
            early_termination_cutoff: 30000.0,
            top_candidates: 10,
            deadline: None,
        }
    }
}

impl DetectConfig {
    /// Checks field ranges, returning the first violation.
    pub fn validate(&self) -> QrMarkResult<()> {
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(QrMarkError::InvalidConfig {
                reason: "threshold must be positive",
            });
        }
        if self.scales.is_empty() {
            return Err(QrMarkError::InvalidConfig {
                reason: "scales must not be empty",
            });
        }
        if self.scales.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(QrMarkError::InvalidConfig {
                reason: "scales must be positive",
            });
        }
        if self.rotations.is_empty() {
            return Err(QrMarkError::InvalidConfig {
                reason: "rotations must not be empty",
            });
        }
        if !self.coarse_stride_ratio.is_finite() || self.coarse_stride_ratio <= 0.0 {
            return Err(QrMarkError::InvalidConfig {
                reason: "coarse stride ratio must be positive",
            });
        }
        if self.coarse_pixel_stride == 0 || self.fine_pixel_stride == 0 {
            return Err(QrMarkError::InvalidConfig {
                reason: "pixel strides must be at least 1",
            });
        }
        if !self.early_termination_cutoff.is_finite() || self.early_termination_cutoff <= 0.0 {
            return Err(QrMarkError::InvalidConfig {
                reason: "early termination cutoff must be positive",
            });
        }
        if self.top_candidates == 0 {
            return Err(QrMarkError::InvalidConfig {
                reason: "top candidate count must be at least 1",
            });
        }
        Ok(())
    }
}

/// Detection engine holding the prepared reference and its configuration.
///
/// Holds no mutable state across calls; `detect` takes `&self`, so one
/// detector can serve concurrent callers.
pub struct Detector {
    reference: ReferencePattern,
    config: DetectConfig,
}

impl Detector {
    /// Creates a detector with the default configuration.
    pub fn new(reference: ReferencePattern) -> Self {
        Self {
            reference,
            config: DetectConfig::default(),
        }
    }

    /// Replaces the configuration. Validation happens at `detect` time.
    pub fn with_config(mut self, config: DetectConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &DetectConfig {
        &self.config
    }

    /// Returns the prepared reference pattern.
    pub fn reference(&self) -> &ReferencePattern {
        &self.reference
    }

    /// Runs the two-phase search against a grayscale target.
    ///
    /// Instances whose scaled patch does not fit the target, or falls
    /// under the minimum template size, are skipped silently. When every
    /// instance is skipped the result carries
    /// [`Verdict::NoScaleFit`](crate::Verdict::NoScaleFit) instead of an
    /// error.
    pub fn detect(&self, target: GrayView<'_>) -> QrMarkResult<MatchResult> {
        self.config.validate()?;
        let cfg = &self.config;
        let _guard = trace_span!(
            "detect",
            width = target.width(),
            height = target.height()
        )
        .entered();

        let deadline = cfg.deadline.map(|budget| Instant::now() + budget);
        let mut best_score = f32::INFINITY;
        let mut best_placement: Option<BestMatch> = None;
        let mut instances_run = 0usize;

        for &scale in &cfg.scales {
            for &rotation in &cfg.rotations {
                if let Some(at) = deadline {
                    if Instant::now() >= at {
                        return Err(QrMarkError::DeadlineExceeded);
                    }
                }

                let source = self.reference.rotated(rotation);
                let (width, height) = scaled_dims(source.width(), source.height(), scale);
                if width < MIN_TEMPLATE_SIDE
                    || height < MIN_TEMPLATE_SIDE
                    || width > target.width()
                    || height > target.height()
                {
                    continue;
                }

                let _instance = trace_span!(
                    "instance",
                    scale = f64::from(scale),
                    rotation = rotation.degrees()
                )
                .entered();

                let buffer = resize_bilinear(source, width, height)?;
                let plan = InstancePlan::new(
                    buffer,
                    scale,
                    rotation,
                    cfg.coarse_pixel_stride,
                    cfg.fine_pixel_stride,
                );
                instances_run += 1;

                let radius = coarse::placement_stride(plan.width(), cfg.coarse_stride_ratio);
                let candidates = coarse::coarse_pass(target, &plan, cfg);
                refine::fine_pass(
                    target,
                    &plan,
                    &candidates,
                    radius,
                    &mut best_score,
                    &mut best_placement,
                );
            }
        }

        trace_event!(
            "detect_done",
            instances = instances_run,
            best_score = f64::from(best_score)
        );

        if instances_run == 0 {
            return Ok(MatchResult::no_scale_fit(cfg.threshold));
        }
        Ok(MatchResult::from_best(
            cfg.threshold,
            best_placement.map(|placement| (best_score, placement)),
        ))
    }

    /// Loads a target image from disk and runs [`Self::detect`].
    #[cfg(feature = "image-io")]
    pub fn detect_path<P: AsRef<std::path::Path>>(&self, path: P) -> QrMarkResult<MatchResult> {
        let gray = crate::image::io::load_target_gray(path)?;
        self.detect(gray.view())
    }

    /// Decodes a target image from bytes and runs [`Self::detect`].
    #[cfg(feature = "image-io")]
    pub fn detect_bytes(&self, bytes: &[u8]) -> QrMarkResult<MatchResult> {
        let gray = crate::image::io::decode_gray(bytes)?;
        self.detect(gray.view())
    }
}
