use qrmark::template::resize::resize_bilinear;
use qrmark::{
    DetectConfig, Detector, GrayView, PatchRatios, QrMarkError, ReferencePattern, Rotation,
    Verdict,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

fn make_texture(width: usize, height: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let value = ((x * 13) ^ (y * 7) ^ (x * y)) & 0xFF;
            data.push(value as u8);
        }
    }
    data
}

fn square_reference() -> Vec<u8> {
    let mut reference = vec![255u8; 100 * 100];
    for y in 15..85 {
        for x in 15..85 {
            reference[y * 100 + x] = 0;
        }
    }
    reference
}

fn plant(image: &mut [u8], img_width: usize, patch: GrayView<'_>, x0: usize, y0: usize) {
    for y in 0..patch.height() {
        let row = patch.row(y).unwrap();
        let start = (y0 + y) * img_width + x0;
        image[start..start + row.len()].copy_from_slice(row);
    }
}

#[test]
fn finds_planted_mark_at_unit_scale() {
    let reference = make_texture(100, 100);
    let reference_view = GrayView::from_slice(&reference, 100, 100).unwrap();
    let pattern = ReferencePattern::from_gray(reference_view, PatchRatios::default()).unwrap();
    assert_eq!(pattern.patch_width(), 25);
    assert_eq!(pattern.patch_height(), 25);

    let mut target = vec![255u8; 300 * 300];
    plant(&mut target, 300, pattern.rotated(Rotation::R0), 96, 120);
    let target_view = GrayView::from_slice(&target, 300, 300).unwrap();

    let detector = Detector::new(pattern).with_config(DetectConfig {
        threshold: 50.0,
        scales: vec![1.0],
        rotations: vec![Rotation::R0],
        ..DetectConfig::default()
    });
    let result = detector.detect(target_view).unwrap();

    assert_eq!(result.verdict, Verdict::Flagged);
    assert!(result.is_fake());
    let score = result.score.unwrap();
    assert!(score < 1.0, "score {score}");
    assert!(result.confidence > 90.0, "confidence {}", result.confidence);

    let best = result.best.unwrap();
    assert_eq!((best.x, best.y), (96, 120));
    assert_eq!(best.scale, 1.0);
    assert_eq!(best.rotation, Rotation::R0);
    assert_eq!((best.width, best.height), (25, 25));
}

#[test]
fn finds_scaled_down_instances() {
    // Black square on white with the patch covering the whole reference,
    // so a rescaled copy keeps its geometry exactly.
    let reference = square_reference();
    let reference_view = GrayView::from_slice(&reference, 100, 100).unwrap();
    let full_patch = PatchRatios {
        left: 0.0,
        top: 0.0,
        width: 1.0,
        height: 1.0,
    };
    let pattern = ReferencePattern::from_gray(reference_view, full_patch).unwrap();

    // Plant the same rescale the detector will compute for scale 0.3.
    let scaled = resize_bilinear(reference_view, 30, 30).unwrap();
    let mut target = vec![255u8; 500 * 500];
    plant(&mut target, 500, scaled.view(), 200, 150);
    let target_view = GrayView::from_slice(&target, 500, 500).unwrap();

    let detector = Detector::new(pattern).with_config(DetectConfig {
        threshold: 50.0,
        scales: vec![0.25, 0.3, 0.5],
        ..DetectConfig::default()
    });
    let result = detector.detect(target_view).unwrap();

    assert!(result.is_fake());
    let best = result.best.unwrap();
    assert_eq!((best.x, best.y), (200, 150));
    assert_eq!(best.scale, 0.3);
    assert_eq!(best.rotation, Rotation::R0);
    assert_eq!((best.width, best.height), (30, 30));
    assert!(result.score.unwrap() < result.threshold);
}

#[test]
fn rotated_instances_are_found() {
    let reference = make_texture(100, 100);
    let reference_view = GrayView::from_slice(&reference, 100, 100).unwrap();
    let pattern = ReferencePattern::from_gray(reference_view, PatchRatios::default()).unwrap();

    let mut target = vec![255u8; 300 * 300];
    plant(&mut target, 300, pattern.rotated(Rotation::R90), 100, 60);
    let target_view = GrayView::from_slice(&target, 300, 300).unwrap();

    let detector = Detector::new(pattern).with_config(DetectConfig {
        threshold: 50.0,
        scales: vec![1.0],
        ..DetectConfig::default()
    });
    let result = detector.detect(target_view).unwrap();

    assert!(result.is_fake());
    let best = result.best.unwrap();
    assert_eq!(best.rotation, Rotation::R90);
    assert_eq!((best.x, best.y), (100, 60));
}

#[test]
fn tiny_target_reports_no_scale_fit() {
    let reference = make_texture(100, 100);
    let reference_view = GrayView::from_slice(&reference, 100, 100).unwrap();
    let pattern = ReferencePattern::from_gray(reference_view, PatchRatios::default()).unwrap();

    // Smaller than every admissible instance of the 25x25 patch.
    let target = vec![255u8; 9 * 9];
    let target_view = GrayView::from_slice(&target, 9, 9).unwrap();

    let result = Detector::new(pattern).detect(target_view).unwrap();
    assert_eq!(result.verdict, Verdict::NoScaleFit);
    assert!(!result.is_fake());
    assert_eq!(result.score, None);
    assert!(result.best.is_none());
    assert_eq!(result.confidence, 0.0);
}

#[test]
fn clean_target_reports_best_without_flagging() {
    let reference = make_texture(100, 100);
    let reference_view = GrayView::from_slice(&reference, 100, 100).unwrap();
    let pattern = ReferencePattern::from_gray(reference_view, PatchRatios::default()).unwrap();

    let target = vec![255u8; 200 * 200];
    let target_view = GrayView::from_slice(&target, 200, 200).unwrap();

    let result = Detector::new(pattern).detect(target_view).unwrap();
    assert_eq!(result.verdict, Verdict::Clean);
    assert!(!result.is_fake());
    // The best attempt is still reported for diagnostics.
    let score = result.score.unwrap();
    assert!(score > result.threshold, "score {score}");
    assert!(result.best.is_some());
    assert_eq!(result.confidence, 0.0);
}

#[test]
fn detection_is_deterministic() {
    // A structured mark stays correlated under small shifts, so a plant
    // off the coarse grid still surfaces as a candidate and the fine pass
    // does real work before converging.
    let reference = square_reference();
    let reference_view = GrayView::from_slice(&reference, 100, 100).unwrap();
    let full_patch = PatchRatios {
        left: 0.0,
        top: 0.0,
        width: 1.0,
        height: 1.0,
    };
    let pattern = ReferencePattern::from_gray(reference_view, full_patch).unwrap();

    let mut target = vec![255u8; 300 * 300];
    plant(&mut target, 300, pattern.rotated(Rotation::R0), 97, 63);
    let target_view = GrayView::from_slice(&target, 300, 300).unwrap();

    let detector = Detector::new(pattern).with_config(DetectConfig {
        threshold: 50.0,
        scales: vec![1.0],
        ..DetectConfig::default()
    });

    let first = detector.detect(target_view).unwrap();
    let second = detector.detect(target_view).unwrap();
    assert_eq!(first, second);

    assert!(first.is_fake());
    let best = first.best.unwrap();
    assert_eq!((best.x, best.y), (97, 63));
}

#[test]
fn survives_pixel_noise() {
    let reference = square_reference();
    let reference_view = GrayView::from_slice(&reference, 100, 100).unwrap();
    let full_patch = PatchRatios {
        left: 0.0,
        top: 0.0,
        width: 1.0,
        height: 1.0,
    };
    let pattern = ReferencePattern::from_gray(reference_view, full_patch).unwrap();

    // Plant off the coarse grid, then dirty every pixel the way a cheap
    // scanner would. Small noise costs roughly its own variance in score,
    // far below what a one-pixel misplacement costs.
    let mut target = vec![255u8; 300 * 300];
    plant(&mut target, 300, pattern.rotated(Rotation::R0), 73, 41);
    let mut rng = StdRng::seed_from_u64(123);
    for value in &mut target {
        let delta: i16 = rng.random_range(-8..=8);
        *value = (i16::from(*value) + delta).clamp(0, 255) as u8;
    }
    let target_view = GrayView::from_slice(&target, 300, 300).unwrap();

    let detector = Detector::new(pattern).with_config(DetectConfig {
        threshold: 100.0,
        scales: vec![1.0],
        rotations: vec![Rotation::R0],
        ..DetectConfig::default()
    });
    let result = detector.detect(target_view).unwrap();

    assert_eq!(result.verdict, Verdict::Flagged);
    let score = result.score.unwrap();
    assert!(score < 100.0, "score {score}");
    let best = result.best.unwrap();
    assert_eq!((best.x, best.y), (73, 41));
    assert_eq!(best.rotation, Rotation::R0);
}

#[test]
fn zero_deadline_aborts_immediately() {
    let reference = make_texture(100, 100);
    let reference_view = GrayView::from_slice(&reference, 100, 100).unwrap();
    let pattern = ReferencePattern::from_gray(reference_view, PatchRatios::default()).unwrap();

    let target = vec![255u8; 200 * 200];
    let target_view = GrayView::from_slice(&target, 200, 200).unwrap();

    let detector = Detector::new(pattern).with_config(DetectConfig {
        deadline: Some(Duration::ZERO),
        ..DetectConfig::default()
    });
    let err = detector.detect(target_view).unwrap_err();
    assert_eq!(err, QrMarkError::DeadlineExceeded);
}
