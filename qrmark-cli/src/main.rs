use clap::{Parser, ValueEnum};
use qrmark::io::{load_reference_gray, load_target_gray};
use qrmark::{
    DetectConfig, Detector, FeatureConfig, FeatureEngine, FeatureReport, FeatureVerdict,
    MatchResult, PatchRatios, ReferencePattern, Rotation, Verdict,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "QrMark CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Reference pattern image, overriding the config file.
    #[arg(short, long, value_name = "FILE")]
    reference: Option<PathBuf>,
    /// Target images to scan, overriding the config file.
    #[arg(value_name = "TARGET")]
    targets: Vec<PathBuf>,
    /// Decision threshold for the template engine.
    #[arg(long)]
    threshold: Option<f32>,
    /// Comma-separated template scale factors.
    #[arg(long, value_delimiter = ',')]
    scales: Vec<f32>,
    /// Detection engine to run.
    #[arg(long, value_enum)]
    engine: Option<EngineChoice>,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Show per-instance search diagnostics.
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "snake_case")]
enum EngineChoice {
    Template,
    Features,
    Both,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RotationConfig {
    R0,
    R90,
    R180,
    R270,
}

impl From<RotationConfig> for Rotation {
    fn from(value: RotationConfig) -> Self {
        match value {
            RotationConfig::R0 => Rotation::R0,
            RotationConfig::R90 => Rotation::R90,
            RotationConfig::R180 => Rotation::R180,
            RotationConfig::R270 => Rotation::R270,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PatchJson {
    left: f32,
    top: f32,
    width: f32,
    height: f32,
}

impl Default for PatchJson {
    fn default() -> Self {
        let ratios = PatchRatios::default();
        Self {
            left: ratios.left,
            top: ratios.top,
            width: ratios.width,
            height: ratios.height,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DetectJson {
    threshold: f32,
    scales: Vec<f32>,
    rotations: Vec<RotationConfig>,
    coarse_stride_ratio: f32,
    coarse_pixel_stride: usize,
    fine_pixel_stride: usize,
    early_termination_cutoff: f32,
    top_candidates: usize,
    deadline_ms: Option<u64>,
}

impl Default for DetectJson {
    fn default() -> Self {
        let cfg = DetectConfig::default();
        Self {
            threshold: cfg.threshold,
            scales: cfg.scales,
            rotations: vec![
                RotationConfig::R0,
                RotationConfig::R90,
                RotationConfig::R180,
                RotationConfig::R270,
            ],
            coarse_stride_ratio: cfg.coarse_stride_ratio,
            coarse_pixel_stride: cfg.coarse_pixel_stride,
            fine_pixel_stride: cfg.fine_pixel_stride,
            early_termination_cutoff: cfg.early_termination_cutoff,
            top_candidates: cfg.top_candidates,
            deadline_ms: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FeaturesJson {
    fast_threshold: u8,
    max_keypoints: usize,
    min_keypoints: usize,
    lowe_ratio: f32,
    match_threshold: usize,
    target_scales: Vec<f32>,
    multi_scale: bool,
}

impl Default for FeaturesJson {
    fn default() -> Self {
        let cfg = FeatureConfig::default();
        Self {
            fast_threshold: cfg.fast_threshold,
            max_keypoints: cfg.max_keypoints,
            min_keypoints: cfg.min_keypoints,
            lowe_ratio: cfg.lowe_ratio,
            match_threshold: cfg.match_threshold,
            target_scales: cfg.target_scales,
            multi_scale: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Config {
    reference_path: String,
    target_paths: Vec<String>,
    engine: EngineChoice,
    output_path: Option<String>,
    patch: PatchJson,
    detect: DetectJson,
    features: FeaturesJson,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reference_path: String::new(),
            target_paths: Vec::new(),
            engine: EngineChoice::Template,
            output_path: None,
            patch: PatchJson::default(),
            detect: DetectJson::default(),
            features: FeaturesJson::default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct BestRecord {
    x: usize,
    y: usize,
    scale: f32,
    rotation_deg: u32,
    width: usize,
    height: usize,
}

#[derive(Debug, Serialize)]
struct TemplateRecord {
    verdict: &'static str,
    fake: bool,
    score: Option<f32>,
    threshold: f32,
    confidence: f32,
    best: Option<BestRecord>,
}

impl From<MatchResult> for TemplateRecord {
    fn from(value: MatchResult) -> Self {
        let fake = value.is_fake();
        let best = value.best.map(|b| BestRecord {
            x: b.x,
            y: b.y,
            scale: b.scale,
            rotation_deg: b.rotation.degrees(),
            width: b.width,
            height: b.height,
        });
        Self {
            verdict: verdict_name(value.verdict),
            fake,
            score: value.score,
            threshold: value.threshold,
            confidence: value.confidence,
            best,
        }
    }
}

fn verdict_name(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Flagged => "flagged",
        Verdict::Clean => "clean",
        Verdict::NoScaleFit => "no_scale_fit",
    }
}

#[derive(Debug, Serialize)]
struct FeatureRecord {
    verdict: &'static str,
    fake: bool,
    match_count: usize,
    confidence: f32,
    scale: f32,
    reference_keypoints: usize,
    target_keypoints: usize,
}

impl From<FeatureReport> for FeatureRecord {
    fn from(value: FeatureReport) -> Self {
        Self {
            verdict: feature_verdict_name(value.verdict),
            fake: value.is_fake(),
            match_count: value.match_count,
            confidence: value.confidence,
            scale: value.scale,
            reference_keypoints: value.reference_keypoints,
            target_keypoints: value.target_keypoints,
        }
    }
}

fn feature_verdict_name(verdict: FeatureVerdict) -> &'static str {
    match verdict {
        FeatureVerdict::Flagged => "flagged",
        FeatureVerdict::Clean => "clean",
        FeatureVerdict::InsufficientFeatures => "insufficient_features",
    }
}

#[derive(Debug, Serialize)]
struct TargetRecord {
    target: String,
    fake: bool,
    template: Option<TemplateRecord>,
    features: Option<FeatureRecord>,
}

#[derive(Debug, Serialize)]
struct Output {
    any_fake: bool,
    targets: Vec<TargetRecord>,
}

fn detect_config(json: &DetectJson) -> DetectConfig {
    DetectConfig {
        threshold: json.threshold,
        scales: json.scales.clone(),
        rotations: json.rotations.iter().copied().map(Rotation::from).collect(),
        coarse_stride_ratio: json.coarse_stride_ratio,
        coarse_pixel_stride: json.coarse_pixel_stride,
        fine_pixel_stride: json.fine_pixel_stride,
        early_termination_cutoff: json.early_termination_cutoff,
        top_candidates: json.top_candidates,
        deadline: json.deadline_ms.map(Duration::from_millis),
    }
}

fn feature_config(json: &FeaturesJson) -> FeatureConfig {
    FeatureConfig {
        fast_threshold: json.fast_threshold,
        max_keypoints: json.max_keypoints,
        min_keypoints: json.min_keypoints,
        lowe_ratio: json.lowe_ratio,
        match_threshold: json.match_threshold,
        target_scales: json.target_scales.clone(),
    }
}

fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let directive = if cli.verbose {
        "qrmark=debug"
    } else {
        "qrmark=info"
    };
    // Logs go to stderr so the JSON report owns stdout.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(false);
    }

    let mut config: Config = match &cli.config {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => Config::default(),
    };
    if let Some(reference) = &cli.reference {
        config.reference_path = reference.display().to_string();
    }
    if !cli.targets.is_empty() {
        config.target_paths = cli.targets.iter().map(|t| t.display().to_string()).collect();
    }
    if let Some(threshold) = cli.threshold {
        config.detect.threshold = threshold;
    }
    if !cli.scales.is_empty() {
        config.detect.scales = cli.scales.clone();
    }
    let engine = cli.engine.unwrap_or(config.engine);

    if config.reference_path.is_empty() {
        return Err("reference_path must be set in the config or via --reference".into());
    }
    if config.target_paths.is_empty() {
        return Err("at least one target image is required".into());
    }

    let reference_gray = load_reference_gray(&config.reference_path)?;

    let detector = match engine {
        EngineChoice::Template | EngineChoice::Both => {
            let ratios = PatchRatios {
                left: config.patch.left,
                top: config.patch.top,
                width: config.patch.width,
                height: config.patch.height,
            };
            let pattern = ReferencePattern::from_gray(reference_gray.view(), ratios)?;
            Some(Detector::new(pattern).with_config(detect_config(&config.detect)))
        }
        EngineChoice::Features => None,
    };
    let feature_engine = match engine {
        EngineChoice::Features | EngineChoice::Both => {
            Some(FeatureEngine::with_config(feature_config(&config.features)))
        }
        EngineChoice::Template => None,
    };

    let mut targets = Vec::new();
    let mut any_fake = false;
    for path in &config.target_paths {
        let target = load_target_gray(path)?;
        let template = match &detector {
            Some(detector) => Some(TemplateRecord::from(detector.detect(target.view())?)),
            None => None,
        };
        let features = match &feature_engine {
            Some(engine) => {
                let report = if config.features.multi_scale {
                    engine.detect_multi_scale(reference_gray.view(), target.view())?
                } else {
                    engine.detect(reference_gray.view(), target.view())?
                };
                Some(FeatureRecord::from(report))
            }
            None => None,
        };
        // Either engine flagging the target marks it fake.
        let fake = template.as_ref().is_some_and(|t| t.fake)
            || features.as_ref().is_some_and(|f| f.fake);
        any_fake |= fake;
        tracing::info!(path = path.as_str(), fake = fake, "target scanned");
        targets.push(TargetRecord {
            target: path.clone(),
            fake,
            template,
            features,
        });
    }

    let output = Output { any_fake, targets };
    let json = serde_json::to_string_pretty(&output)?;
    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(any_fake)
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(false) => ExitCode::SUCCESS,
        Ok(true) => ExitCode::from(1),
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(2)
        }
    }
}
