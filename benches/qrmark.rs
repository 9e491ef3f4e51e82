use criterion::{criterion_group, criterion_main, Criterion};
use qrmark::{DetectConfig, Detector, GrayView, PatchRatios, ReferencePattern, Rotation};
use std::hint::black_box;

fn make_image(width: usize, height: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let value = ((x * 13) ^ (y * 7) ^ (x * y)) & 0xFF;
            data.push(value as u8);
        }
    }
    data
}

fn make_pattern(reference: &[u8], width: usize, height: usize) -> ReferencePattern {
    let view = GrayView::from_slice(reference, width, height).unwrap();
    ReferencePattern::from_gray(view, PatchRatios::default()).unwrap()
}

fn bench_detector(c: &mut Criterion) {
    // The target repeats the reference formula, so the patch content
    // appears verbatim at its own coordinates and scale 1.0 has a true hit.
    let reference = make_image(200, 200);
    let target = make_image(400, 400);
    let target_view = GrayView::from_slice(&target, 400, 400).unwrap();

    let detector_single = Detector::new(make_pattern(&reference, 200, 200)).with_config(
        DetectConfig {
            scales: vec![1.0],
            rotations: vec![Rotation::R0],
            ..DetectConfig::default()
        },
    );
    c.bench_function("detect_single_scale_no_rotation", |b| {
        b.iter(|| black_box(detector_single.detect(target_view).unwrap()));
    });

    let detector_full = Detector::new(make_pattern(&reference, 200, 200));
    let name = if cfg!(feature = "rayon") {
        "detect_default_grid_parallel"
    } else {
        "detect_default_grid"
    };
    c.bench_function(name, |b| {
        b.iter(|| black_box(detector_full.detect(target_view).unwrap()));
    });
}

#[cfg(feature = "orb")]
fn bench_features(c: &mut Criterion) {
    use qrmark::FeatureEngine;

    let reference = make_image(200, 200);
    let reference_view = GrayView::from_slice(&reference, 200, 200).unwrap();
    let target = make_image(400, 400);
    let target_view = GrayView::from_slice(&target, 400, 400).unwrap();
    let engine = FeatureEngine::new();

    c.bench_function("features_single_scale", |b| {
        b.iter(|| black_box(engine.detect(reference_view, target_view).unwrap()));
    });
}

#[cfg(feature = "orb")]
criterion_group!(benches, bench_detector, bench_features);
#[cfg(not(feature = "orb"))]
criterion_group!(benches, bench_detector);
criterion_main!(benches);
