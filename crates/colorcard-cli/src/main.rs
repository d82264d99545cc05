//! colorcard CLI — batch color correction of photographs against a
//! reference card.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use image::RgbImage;

use colorcard::{
    linspace, CardDetector, CardLayout, CardTemplate, ModelKind, PipelineConfig, ReferenceTable,
    SearchConfig, TemplateConfig,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "png", "tif", "tiff"];

#[derive(Parser)]
#[command(name = "colorcard")]
#[command(about = "Detect a color reference card in photos and normalize their colors")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Correct every image under a folder against a card template.
    Correct(CliCorrectArgs),

    /// Detect the card in a single image and write diagnostics (JSON).
    Detect(CliDetectArgs),

    /// Print the embedded reference tables and default layout.
    CardInfo,
}

#[derive(Debug, Clone, Args)]
struct CliCorrectArgs {
    /// Path to the input folder (scanned recursively).
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Path to the output folder (input tree is mirrored).
    #[arg(long, short = 'o')]
    output: PathBuf,

    /// Path to the card template image.
    #[arg(long, short = 'c')]
    card: PathBuf,

    /// Lowest template scale factor to try.
    #[arg(long, default_value = "1.0")]
    scale_low: f64,

    /// Highest template scale factor to try.
    #[arg(long, default_value = "1.0")]
    scale_high: f64,

    /// Number of scales tested between low and high.
    #[arg(long, default_value = "1")]
    scale_steps: usize,

    /// Lowest rotation angle in degrees to try.
    #[arg(long, default_value = "-2.5")]
    angle_low: f64,

    /// Highest rotation angle in degrees to try.
    #[arg(long, default_value = "2.5")]
    angle_high: f64,

    /// Number of angles tested between low and high.
    #[arg(long, default_value = "11")]
    angle_steps: usize,

    /// Worker threads for the rotation search; 0 uses all cores.
    #[arg(long, short = 't', default_value = "0")]
    threads: usize,

    /// Detections at or below this confidence are skipped.
    #[arg(long, default_value = "0.3")]
    min_confidence: f32,

    /// Color model to fit (diagonal_gamma or matrix_gamma).
    #[arg(long, default_value = "matrix_gamma")]
    model: ModelKind,

    /// Use the X-Rite reference table instead of CameraTrax.
    #[arg(long)]
    x_rite: bool,

    /// Card layout JSON overriding the embedded layouts.
    #[arg(long)]
    layout: Option<PathBuf>,

    /// Set when the card is portrait while photos are landscape (or vice
    /// versa); photos are then rotated before the search.
    #[arg(long, short = 'v')]
    vertical: bool,

    /// Approximate card x coordinate for faster detection (photo pixels).
    #[arg(long)]
    card_x: Option<u32>,

    /// Approximate card y coordinate for faster detection (photo pixels).
    #[arg(long)]
    card_y: Option<u32>,

    /// Substring replaced in output file names.
    #[arg(long, requires = "rename_to")]
    rename_from: Option<String>,

    /// Replacement substring for output file names.
    #[arg(long, requires = "rename_from")]
    rename_to: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct CliDetectArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Path to the card template image.
    #[arg(long, short = 'c')]
    card: PathBuf,

    /// Path to write detection results (JSON).
    #[arg(long)]
    out: PathBuf,

    /// Worker threads for the rotation search; 0 uses all cores.
    #[arg(long, short = 't', default_value = "0")]
    threads: usize,
}

impl CliCorrectArgs {
    fn to_search_config(&self) -> SearchConfig {
        SearchConfig {
            scales: linspace(self.scale_low, self.scale_high, self.scale_steps),
            angles: linspace(self.angle_low, self.angle_high, self.angle_steps),
            threads: self.threads,
            min_confidence: self.min_confidence,
            ..SearchConfig::default()
        }
    }

    fn to_layout(&self) -> CliResult<CardLayout> {
        match &self.layout {
            Some(path) => CardLayout::from_json_file(path),
            None if self.x_rite => Ok(CardLayout::embedded(ReferenceTable::XRite)),
            None => Ok(CardLayout::default()),
        }
    }

    fn to_pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.fit.kind = self.model;
        config
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Correct(args) => run_correct(&args),
        Commands::Detect(args) => run_detect(&args),
        Commands::CardInfo => run_card_info(),
    }
}

// ── correct ────────────────────────────────────────────────────────────

fn run_correct(args: &CliCorrectArgs) -> CliResult<()> {
    let layout = args.to_layout()?;
    let template_image = image::open(&args.card)?;
    let template = CardTemplate::prepare(&template_image, &TemplateConfig::default())?;
    let detector = CardDetector::with_config(template, args.to_search_config());
    let pipeline_config = args.to_pipeline_config();

    let mut images = Vec::new();
    collect_images(&args.input, &mut images)?;
    images.sort();
    tracing::info!(count = images.len(), "images found");

    for path in images {
        if let Err(err) = correct_one(args, &layout, &detector, &pipeline_config, &path) {
            // A bad image must not end the batch.
            tracing::error!(image = %path.display(), error = %err, "processing failed");
        }
    }
    Ok(())
}

fn correct_one(
    args: &CliCorrectArgs,
    layout: &CardLayout,
    detector: &CardDetector,
    pipeline_config: &PipelineConfig,
    path: &Path,
) -> CliResult<()> {
    tracing::info!(image = %path.display(), "processing");
    let original = image::open(path)?.to_rgb8();

    let working = match (args.card_x, args.card_y) {
        (Some(x), Some(y)) => fast_crop(&original, detector.template(), x, y),
        _ => original.clone(),
    };
    let prescale = detector.template().photo_prescale();
    let resized = scale_photo(&working, prescale);
    let oriented = normalize_orientation(resized, args.vertical);

    let detection = detector.detect(&oriented);
    let accuracy = (f64::from(detection.confidence) * 10000.0).round() / 100.0;
    tracing::info!(accuracy_percent = accuracy, "card detection finished");

    if !detection.is_confident(args.min_confidence) {
        tracing::warn!("card detection unsatisfactory; skipping color correction");
        return Ok(());
    }

    let Some(card) = detector.locate(&oriented, &detection) else {
        tracing::warn!("card region could not be cropped; skipping color correction");
        return Ok(());
    };

    let outcome = colorcard::pipeline::correct_photo(
        &original,
        &card,
        detection.confidence,
        layout,
        pipeline_config,
    )?;

    let d = &outcome.diagnostics;
    if d.rotated {
        tracing::warn!("detected card is rotated");
    }
    if d.damaged {
        tracing::warn!("color card seems damaged; correction skipped");
        return Ok(());
    }
    tracing::info!(error_percent = d.error_percent, "expected correction error");

    match outcome.corrected {
        Some(corrected) => {
            let out_path = output_path(
                path,
                &args.input,
                &args.output,
                args.rename_from.as_deref(),
                args.rename_to.as_deref(),
            )?;
            if let Some(parent) = out_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            corrected.save(&out_path)?;
            tracing::info!(output = %out_path.display(), "corrected image written");
        }
        None => {
            tracing::warn!("image correction unsatisfactory; writing skipped");
        }
    }
    Ok(())
}

/// Recursively collect supported image files under `dir`.
fn collect_images(dir: &Path, out: &mut Vec<PathBuf>) -> CliResult<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_images(&path, out)?;
        } else if has_image_extension(&path) {
            out.push(path);
        }
    }
    Ok(())
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// Map an input file to its output location, applying the rename pair.
fn output_path(
    input_file: &Path,
    input_root: &Path,
    output_root: &Path,
    rename_from: Option<&str>,
    rename_to: Option<&str>,
) -> CliResult<PathBuf> {
    let relative = input_file.strip_prefix(input_root)?;
    let mut out = output_root.join(relative);
    if let (Some(from), Some(to)) = (rename_from, rename_to) {
        if let Some(name) = out.file_name().and_then(|n| n.to_str()) {
            let renamed = name.replace(from, to);
            out.set_file_name(renamed);
        }
    }
    Ok(out)
}

/// Crop a generous window around a user-supplied card coordinate.
///
/// The margin is 1.25x the template's size in photo pixels. Falls back to
/// the full photo when the window ends up smaller than the template.
fn fast_crop(photo: &RgbImage, template: &CardTemplate, x: u32, y: u32) -> RgbImage {
    let prescale = template.photo_prescale();
    let card_w = (f64::from(template.width()) / prescale).round();
    let card_h = (f64::from(template.height()) / prescale).round();
    let margin_x = (card_w * 1.25) as u32;
    let margin_y = (card_h * 1.25) as u32;

    let x0 = x.saturating_sub(margin_x);
    let y0 = y.saturating_sub(margin_y);
    let x1 = (x + margin_x).min(photo.width());
    let y1 = (y + margin_y).min(photo.height());

    if f64::from(x1.saturating_sub(x0)) < card_w || f64::from(y1.saturating_sub(y0)) < card_h {
        tracing::warn!("card coordinate window too small; searching the full photo");
        return photo.clone();
    }
    image::imageops::crop_imm(photo, x0, y0, x1 - x0, y1 - y0).to_image()
}

/// Scale a photo into the template's working resolution.
fn scale_photo(photo: &RgbImage, prescale: f64) -> RgbImage {
    let w = (f64::from(photo.width()) * prescale).round().max(1.0) as u32;
    let h = (f64::from(photo.height()) * prescale).round().max(1.0) as u32;
    image::imageops::resize(photo, w, h, image::imageops::FilterType::Triangle)
}

/// Rotate the photo when its aspect disagrees with the card's.
fn normalize_orientation(photo: RgbImage, vertical: bool) -> RgbImage {
    let (w, h) = photo.dimensions();
    if (h > w && !vertical) || (h < w && vertical) {
        image::imageops::rotate90(&photo)
    } else {
        photo
    }
}

// ── detect ─────────────────────────────────────────────────────────────

fn run_detect(args: &CliDetectArgs) -> CliResult<()> {
    let template_image = image::open(&args.card)?;
    let template = CardTemplate::prepare(&template_image, &TemplateConfig::default())?;
    let mut config = SearchConfig::default();
    config.threads = args.threads;
    let detector = CardDetector::with_config(template, config);

    let original = image::open(&args.image)?.to_rgb8();
    let resized = scale_photo(&original, detector.template().photo_prescale());
    let detection = detector.detect(&resized);

    let json = serde_json::to_string_pretty(&detection)?;
    std::fs::write(&args.out, json)?;

    println!("Detection for {}:", args.image.display());
    println!("  confidence: {:.4}", detection.confidence);
    println!("  angle:      {:.2} deg", detection.angle);
    println!("  scale:      {:.3}", detection.scale);
    println!("  position:   ({}, {})", detection.x, detection.y);
    Ok(())
}

// ── card-info ──────────────────────────────────────────────────────────

fn run_card_info() -> CliResult<()> {
    let layout = CardLayout::default();
    println!("colorcard embedded layouts");
    println!("  default layout:  {}", layout.name);
    println!("  grid:            {}x{}", layout.grid_cols, layout.grid_rows);
    println!("  patches:         {}", layout.patch_count());
    println!("  orientation cues: {}", layout.orientation_cues.len());

    for table in [ReferenceTable::CameraTrax, ReferenceTable::XRite] {
        println!("\n  {:?} reference colors:", table);
        for (i, c) in table.colors().iter().enumerate() {
            println!("    {:2}: ({:3.0}, {:3.0}, {:3.0})", i, c[0], c[1], c[2]);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_mirrors_subdirectories_and_renames() {
        let out = output_path(
            Path::new("/data/in/plot_a/img-orig.jpg"),
            Path::new("/data/in"),
            Path::new("/data/out"),
            Some("-orig"),
            Some("-cor"),
        )
        .unwrap();
        assert_eq!(out, PathBuf::from("/data/out/plot_a/img-cor.jpg"));
    }

    #[test]
    fn output_path_without_rename_keeps_the_name() {
        let out = output_path(
            Path::new("/data/in/img.png"),
            Path::new("/data/in"),
            Path::new("/data/out"),
            None,
            None,
        )
        .unwrap();
        assert_eq!(out, PathBuf::from("/data/out/img.png"));
    }

    #[test]
    fn image_extensions_are_case_insensitive() {
        assert!(has_image_extension(Path::new("a/b/photo.JPG")));
        assert!(has_image_extension(Path::new("scan.tiff")));
        assert!(!has_image_extension(Path::new("notes.txt")));
        assert!(!has_image_extension(Path::new("Makefile")));
    }

    #[test]
    fn portrait_photo_is_rotated_for_landscape_cards() {
        let photo = RgbImage::new(40, 60);
        let out = normalize_orientation(photo, false);
        assert_eq!(out.dimensions(), (60, 40));

        let landscape = RgbImage::new(60, 40);
        let out = normalize_orientation(landscape, false);
        assert_eq!(out.dimensions(), (60, 40));
    }
}
