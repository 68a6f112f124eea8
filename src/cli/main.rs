//! Segmentation-guided mask editing CLI
//!
//! Loads an image, segments it with precomputed mask files, composes a
//! selection from clicked points, applies edits in order and writes the
//! results next to each other under one savename prefix.

use super::config::{parse_point, CliConfigBuilder, EditStep};
use crate::{
    backends::MaskFileBackend,
    config::EditorConfig,
    inference::{SegmentationBackend, SegmentationStyle, SegmenterRegistry},
    selection::SelectionOptions,
    services::MaskIOService,
    session::{SegmentationCommit, Session, SharedSession},
    tracing_config::{events, init_cli_tracing, spans},
    types::{BoolMask, EditOutcome, Point},
};
use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use image::DynamicImage;
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tracing::{debug, info, warn, Instrument};

/// Compose and refine segmentation masks for inpainting
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "segment-edit")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Image to edit
    #[arg(value_name = "IMAGE")]
    pub input: PathBuf,

    /// Mask files proposed by a segmenter: a directory or a glob pattern
    #[arg(short, long, value_name = "DIR|GLOB")]
    pub masks: String,

    /// Segment as anime-style illustration (more regions, rougher masks)
    #[arg(long)]
    pub anime_style: bool,

    /// Pixel to select, as X,Y (repeatable)
    #[arg(short, long = "point", value_name = "X,Y", value_parser = parse_point)]
    pub points: Vec<Point>,

    /// Select everything except the clicked regions
    #[arg(long)]
    pub invert: bool,

    /// Treat unclaimed pixels as a selectable region
    #[arg(long)]
    pub include_background: bool,

    /// Start from an existing mask instead of a point selection
    #[arg(long, value_name = "PATH")]
    pub mask_in: Option<PathBuf>,

    /// Edits applied after selection, in order: expand:N, trim:PATH, add:PATH
    #[arg(short, long = "edit", value_name = "EDIT")]
    pub edits: Vec<EditStep>,

    /// Width scale of the padded canvas (1.0 to 1.5)
    #[arg(long, default_value_t = 1.0)]
    pub pad_width: f64,

    /// Height scale of the padded canvas (1.0 to 1.5)
    #[arg(long, default_value_t = 1.0)]
    pub pad_height: f64,

    /// Share of the extra width placed on the left
    #[arg(long, default_value_t = 0.5)]
    pub pad_lr: f64,

    /// Share of the extra height placed on top
    #[arg(long, default_value_t = 0.5)]
    pub pad_tb: f64,

    /// How the border is filled: constant, edge, reflect, symmetric, wrap
    #[arg(long, default_value = "edge")]
    pub pad_mode: String,

    /// Output directory [default: from config]
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Mask file layout
    #[arg(short, long, value_enum)]
    pub format: Option<CliMaskFormat>,

    /// Also write the coloured segmentation overlay
    #[arg(long)]
    pub save_seg: bool,

    /// Also write the selection preview
    #[arg(long)]
    pub overlay: bool,

    /// Blend factor for previews
    #[arg(long, value_name = "ALPHA")]
    pub overlay_alpha: Option<f32>,

    /// Also write the image with the mask as alpha channel
    #[arg(long)]
    pub alpha_out: bool,

    /// Config file [default: per-user config directory]
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Store the segmenter name in the config file
    #[arg(long)]
    pub save_config: bool,

    /// Enable verbose logging (-v: INFO, -vv: DEBUG, -vvv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum CliMaskFormat {
    Gray,
    Rgb,
}

/// Main CLI entry point
pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _tracing_guard = init_cli_tracing(cli.verbose).context("Failed to initialize tracing")?;
    CliConfigBuilder::validate_cli(&cli)?;
    let mut config = CliConfigBuilder::from_cli(&cli)?;

    let backend = build_backend(&cli.masks)?;
    let name = backend.name().to_string();
    let mut registry = SegmenterRegistry::new();
    registry.register(&name, Arc::new(backend));
    let segmenter = registry
        .get(&config.segmentation_model_id)
        .or_else(|| registry.get(&name))
        .context("No segmentation backend available")?;

    let run_span = spans::session(&uuid::Uuid::new_v4().to_string(), segmenter.name());
    run(&cli, &mut config, segmenter).instrument(run_span).await
}

async fn run(cli: &Cli, config: &mut EditorConfig, segmenter: Arc<dyn SegmentationBackend>) -> Result<()> {
    let session = SharedSession::new(Session::from_config(config));
    let image = MaskIOService::load_image(&cli.input)
        .with_context(|| format!("Failed to load image {}", cli.input.display()))?;
    session.set_segmenter(segmenter.name()).await;
    session
        .set_style_mode(SegmentationStyle::from_anime_flag(cli.anime_style))
        .await;
    let loaded = session.load_image(image).await?;
    info!(fingerprint = %loaded.fingerprint, "Image loaded");

    let padded = match CliConfigBuilder::padding_options(cli)? {
        Some(options) => {
            let outcome = session.apply_padding(&options).await?;
            info!(mode = %options.mode, fingerprint = %outcome.fingerprint, "Image padded");
            true
        },
        None => false,
    };

    segment(&session, segmenter.clone()).await?;

    let options = SelectionOptions::default()
        .with_ignore_background(config.ignore_background)
        .with_invert(cli.invert);
    if let Some(path) = &cli.mask_in {
        let mask = MaskIOService::load_mask(path)
            .with_context(|| format!("Failed to load mask {}", path.display()))?;
        report("replace", &session.lock().await.replace_mask(mask)?);
    } else if !cli.points.is_empty() {
        report("select", &session.select(&cli.points, options).await);
    }

    for step in &cli.edits {
        apply_edit(&session, step).await?;
    }

    write_outputs(cli, config, &session, padded).await?;

    if cli.save_config {
        if let Some(path) = CliConfigBuilder::config_path(cli) {
            if config.remember_segmentation_model(segmenter.name()) {
                config
                    .save(&path)
                    .with_context(|| format!("Failed to save config to {}", path.display()))?;
                info!(path = %path.display(), "Config saved");
            }
        }
    }

    Ok(())
}

/// Directory of mask files, or a glob expanded in sorted order
fn build_backend(masks: &str) -> Result<MaskFileBackend> {
    let as_path = Path::new(masks);
    if as_path.is_dir() {
        return Ok(MaskFileBackend::from_dir(as_path)?);
    }

    let mut paths = glob::glob(masks)
        .with_context(|| format!("Invalid mask pattern '{}'", masks))?
        .filter_map(std::result::Result::ok)
        .filter(|path| path.is_file())
        .collect::<Vec<_>>();
    paths.sort();
    if paths.is_empty() {
        bail!("No mask files match '{}'", masks);
    }
    debug!(files = paths.len(), pattern = %masks, "Expanded mask pattern");
    Ok(MaskFileBackend::new("files", paths))
}

async fn segment(session: &SharedSession, segmenter: Arc<dyn SegmentationBackend>) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .context("Invalid progress template")?,
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Segmenting with {}", segmenter.name()));

    let result = session.run_segmentation(segmenter).await;
    match &result {
        Ok(SegmentationCommit::Committed { regions }) => {
            spinner.finish_with_message(format!("Segmented into {} regions", regions));
        },
        Ok(SegmentationCommit::Stale) => spinner.finish_with_message("Image changed during segmentation"),
        Err(_) => spinner.abandon_with_message("Segmentation failed"),
    }
    result.context("Segmentation failed")?;
    Ok(())
}

async fn apply_edit(session: &SharedSession, step: &EditStep) -> Result<()> {
    match step {
        EditStep::Expand(iterations) => report("expand", &session.expand(*iterations).await),
        EditStep::Trim(path) => {
            let stroke = load_stroke(path)?;
            report("trim", &session.trim(&stroke).await?);
        },
        EditStep::Add(path) => {
            let stroke = load_stroke(path)?;
            report("add", &session.add(&stroke).await?);
        },
    }
    Ok(())
}

fn load_stroke(path: &Path) -> Result<BoolMask> {
    MaskIOService::load_mask(path).with_context(|| format!("Failed to load stroke {}", path.display()))
}

fn report(operation: &str, outcome: &EditOutcome) {
    if outcome.is_inert() {
        events::warning_with_recommendation(
            &format!("{} had nothing to act on", operation),
            "check the clicked points and the order of edits",
        );
    } else {
        info!(operation, changed = outcome.changed, state = ?outcome.state(), "Edit applied");
    }
}

async fn write_outputs(cli: &Cli, config: &EditorConfig, session: &SharedSession, padded: bool) -> Result<()> {
    let snapshot = session.snapshot().await.context("No mask to write")?;
    let prefix = MaskIOService::savename_prefix(&snapshot.fingerprint);
    let dir = config.output_dir.as_path();

    let mask_path = MaskIOService::output_path(dir, &prefix, "created_mask");
    {
        let _span = spans::file_export(&mask_path, "mask").entered();
        MaskIOService::save_mask(&snapshot.mask, &mask_path, config.mask_format)?;
    }
    println!("{}", mask_path.display());

    if padded {
        let path = MaskIOService::output_path(dir, &prefix, "padded_image");
        MaskIOService::save_image(&DynamicImage::ImageRgb8((*snapshot.image).clone()), &path)?;
        println!("{}", path.display());
    }

    if cli.overlay {
        let preview = session.lock().await.selection_preview(config.overlay_alpha)?;
        let path = MaskIOService::output_path(dir, &prefix, "selection");
        MaskIOService::save_image(&DynamicImage::ImageRgb8(preview), &path)?;
        println!("{}", path.display());
    }

    if config.save_segmentation {
        match session.lock().await.color_overlay(config.overlay_alpha) {
            Ok(overlay) => {
                let path = MaskIOService::output_path(dir, &prefix, "segmentation");
                MaskIOService::save_image(&DynamicImage::ImageRgb8(overlay), &path)?;
                println!("{}", path.display());
            },
            Err(e) if e.is_inert() => warn!(error = %e, "Skipping segmentation overlay"),
            Err(e) => return Err(e.into()),
        }
    }

    if cli.alpha_out {
        let rgba = MaskIOService::alpha_image(&snapshot.image, &snapshot.mask)?;
        let path = MaskIOService::output_path(dir, &prefix, "rgba_image");
        MaskIOService::save_image(&DynamicImage::ImageRgba8(rgba), &path)?;
        println!("{}", path.display());
    }

    Ok(())
}
