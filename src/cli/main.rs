//! Try-on CLI
//!
//! Keys an overlay, places it on a body photo and writes the composite as PNG.

use super::config::CliConfigBuilder;
use crate::{
    compositor::Compositor,
    preview::{JsonFileStore, PreviewStore},
    render::RenderOutput,
    services::ImageIOService,
    tracing_config::{init_cli_tracing, spans},
    types::{KeyingOutcome, SourceImage},
};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn, Instrument};

/// Virtual tattoo try-on compositor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "tryon-compositor")]
pub struct Cli {
    /// Overlay design: local file path or http(s) URL
    #[arg(long, value_name = "SOURCE")]
    pub overlay: String,

    /// Body photo to place the overlay on
    #[arg(short, long, value_name = "PATH")]
    pub base: Option<PathBuf>,

    /// Output PNG file
    #[arg(short, long, value_name = "OUTPUT", default_value = "tryon.png")]
    pub output: PathBuf,

    /// Scale multiplier (clamped to the configured band)
    #[arg(long, default_value_t = 1.0)]
    pub scale: f64,

    /// Rotation in degrees
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub rotation: f64,

    /// Overlay opacity [default: configured default opacity]
    #[arg(long)]
    pub opacity: Option<f64>,

    /// Anchor as fractions of the viewport, e.g. "0.5,0.4"
    #[arg(long, value_name = "X,Y")]
    pub position: Option<String>,

    /// Background threshold; pixels with R, G and B all above it become transparent
    #[arg(long)]
    pub threshold: Option<u8>,

    /// Viewport size, e.g. "800x500"
    #[arg(long, value_name = "WxH")]
    pub viewport: Option<String>,

    /// Use plain source-over instead of multiply blending
    #[arg(long)]
    pub normal_blend: bool,

    /// JSON configuration file (CLI flags override it)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write only the keyed cutout instead of a composite
    #[arg(long)]
    pub key_only: bool,

    /// Save a preview record into this directory
    #[arg(long, value_name = "DIR")]
    pub save_preview: Option<PathBuf>,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();
    let session_id = uuid::Uuid::new_v4().to_string();
    init_cli_tracing(cli.verbose, &session_id).context("Failed to initialize tracing")?;
    run_session(cli, &session_id).await
}

async fn load_overlay(overlay: &str) -> Result<SourceImage> {
    if overlay.starts_with("http://") || overlay.starts_with("https://") {
        return Ok(SourceImage::from_url(overlay));
    }
    SourceImage::from_file(overlay)
        .await
        .with_context(|| format!("Failed to read overlay '{}'", overlay))
}

/// Run a parsed invocation in a fresh session
pub async fn run(cli: Cli) -> Result<()> {
    run_session(cli, &uuid::Uuid::new_v4().to_string()).await
}

/// Run a parsed invocation inside the `session` span for `session_id`
pub async fn run_session(cli: Cli, session_id: &str) -> Result<()> {
    let config = CliConfigBuilder::from_cli(&cli).context("Invalid configuration")?;
    let span = spans::session(session_id, &cli.overlay);
    execute(cli, config).instrument(span).await
}

async fn execute(cli: Cli, config: crate::config::CompositorConfig) -> Result<()> {
    let mut compositor = Compositor::new(config).context("Failed to create compositor")?;

    if let Some(base) = &cli.base {
        if !ImageIOService::is_supported_format(base) {
            warn!(
                path = %base.display(),
                "Unrecognized base photo extension, detecting format from content"
            );
        }
        let photo = ImageIOService::load_base_photo(base)
            .await
            .context("Failed to load base photo")?;
        compositor.select_base_photo(photo);
    }

    let overlay = load_overlay(&cli.overlay).await?;
    compositor.select_and_key(overlay).await;

    if let Some(keyed) = compositor.keyed_image() {
        match keyed.outcome() {
            KeyingOutcome::Keyed { keyed_pixels } => {
                info!(keyed_pixels, "Overlay background keyed");
            },
            KeyingOutcome::Fallback { reason } => {
                warn!(reason = %reason, "Using overlay without background keying");
            },
        }
    }

    if cli.key_only {
        return write_cutout(&compositor, &cli.output);
    }

    compositor.set_scale(cli.scale);
    compositor.set_rotation(cli.rotation);
    if let Some(opacity) = cli.opacity {
        compositor.set_opacity(opacity);
    }
    if let Some(position) = &cli.position {
        let (x, y) = CliConfigBuilder::parse_pair(position, ',').context("Invalid --position")?;
        compositor.set_position(x, y);
    }

    if let Some(placement) = compositor.placement() {
        info!(
            scale = %placement.scale_label(),
            rotation = %placement.rotation_label(),
            opacity = %placement.opacity_label(),
            x = placement.position.0,
            y = placement.position.1,
            "Placement"
        );
    }

    match compositor.render() {
        RenderOutput::Placeholder { message } => {
            warn!("{}", message);
            anyhow::bail!("No base photo given; pass --base <PATH> or use --key-only");
        },
        RenderOutput::Composite(scene) => {
            let _output = spans::output(&cli.output, scene.width, scene.height).entered();
            let raster = scene.rasterize();
            ImageIOService::save_png(&raster, &cli.output)
                .with_context(|| format!("Failed to write '{}'", cli.output.display()))?;
            info!(path = %cli.output.display(), "Composite written");
        },
    }

    if let Some(dir) = &cli.save_preview {
        let record = compositor
            .preview_record()
            .context("Preview needs both a base photo and an overlay")?;
        JsonFileStore::new(dir)
            .save(&record)
            .await
            .context("Failed to save preview")?;
    }

    Ok(())
}

fn write_cutout(compositor: &Compositor, output: &std::path::Path) -> Result<()> {
    let keyed = compositor
        .keyed_image()
        .context("Overlay keying did not complete")?;
    let image = keyed
        .image()
        .context("Overlay could not be decoded")?;
    ImageIOService::save_png(image, output)
        .with_context(|| format!("Failed to write '{}'", output.display()))?;
    info!(path = %output.display(), "Cutout written");
    Ok(())
}
