//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::Cli;
use crate::config::{BlendMode, CompositorConfig};
use anyhow::{Context, Result};

/// Convert CLI arguments to a `CompositorConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Start from the optional config file, then apply flag overrides
    pub(crate) fn from_cli(cli: &Cli) -> Result<CompositorConfig> {
        let mut config = match &cli.config {
            Some(path) => CompositorConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config '{}'", path.display()))?,
            None => CompositorConfig::default(),
        };

        if let Some(threshold) = cli.threshold {
            config.keying.threshold = threshold;
        }
        if let Some(viewport) = &cli.viewport {
            let (width, height) = Self::parse_size(viewport).context("Invalid --viewport")?;
            config.viewport.width = width;
            config.viewport.height = height;
        }
        if cli.normal_blend {
            config.blend_mode = BlendMode::Normal;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse `"<a><sep><b>"` into two floats
    pub(crate) fn parse_pair(value: &str, separator: char) -> Result<(f64, f64)> {
        let (a, b) = value
            .split_once(separator)
            .with_context(|| format!("expected two values separated by '{}'", separator))?;
        let a = a.trim().parse::<f64>().with_context(|| format!("'{}' is not a number", a))?;
        let b = b.trim().parse::<f64>().with_context(|| format!("'{}' is not a number", b))?;
        Ok((a, b))
    }

    /// Parse `"800x500"`
    pub(crate) fn parse_size(value: &str) -> Result<(u32, u32)> {
        let (w, h) = value
            .to_lowercase()
            .split_once('x')
            .map(|(w, h)| (w.trim().to_string(), h.trim().to_string()))
            .context("expected WIDTHxHEIGHT")?;
        let width = w.parse::<u32>().with_context(|| format!("'{}' is not a width", w))?;
        let height = h.parse::<u32>().with_context(|| format!("'{}' is not a height", h))?;
        Ok((width, height))
    }
}
