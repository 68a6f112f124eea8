//! Conversion of CLI arguments into library configuration

use crate::cli::main_impl::{Cli, CliMaskFormat};
use crate::{
    config::{EditorConfig, MaskFormat},
    padding::{PaddingMode, PaddingOptions},
    types::Point,
};
use anyhow::{bail, Context, Result};
use std::{path::PathBuf, str::FromStr};

/// One mask edit requested on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditStep {
    /// `expand:N`
    Expand(u32),
    /// `trim:PATH`
    Trim(PathBuf),
    /// `add:PATH`
    Add(PathBuf),
}

impl FromStr for EditStep {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (kind, value) = s
            .split_once(':')
            .with_context(|| format!("Edit '{}' must look like expand:N, trim:PATH or add:PATH", s))?;
        match kind.trim().to_ascii_lowercase().as_str() {
            "expand" => {
                let iterations = value
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid expand iteration count '{}'", value))?;
                Ok(Self::Expand(iterations))
            },
            "trim" => Ok(Self::Trim(PathBuf::from(value))),
            "add" => Ok(Self::Add(PathBuf::from(value))),
            other => bail!("Unknown edit '{}' (expected expand, trim or add)", other),
        }
    }
}

/// Parse `X,Y` into a point
pub(crate) fn parse_point(value: &str) -> Result<Point> {
    let (x, y) = value
        .split_once(',')
        .with_context(|| format!("Point '{}' must look like X,Y", value))?;
    Ok(Point::new(
        x.trim().parse().with_context(|| format!("Invalid x in '{}'", value))?,
        y.trim().parse().with_context(|| format!("Invalid y in '{}'", value))?,
    ))
}

/// Builds library configuration from CLI arguments
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Load the config file (explicit path or the default location) and
    /// apply command-line overrides
    pub(crate) fn from_cli(cli: &Cli) -> Result<EditorConfig> {
        let mut config = match Self::config_path(cli) {
            Some(path) => EditorConfig::load(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => EditorConfig::default(),
        };

        if let Some(output) = &cli.output {
            config.output_dir = output.clone();
        }
        if let Some(format) = cli.format {
            config.mask_format = Self::convert_format(format);
        }
        if cli.include_background {
            config.ignore_background = false;
        }
        if cli.save_seg {
            config.save_segmentation = true;
        }
        if let Some(alpha) = cli.overlay_alpha {
            config.overlay_alpha = alpha;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// `--config` wins; otherwise the per-user default location
    pub(crate) fn config_path(cli: &Cli) -> Option<PathBuf> {
        cli.config.clone().or_else(EditorConfig::default_path)
    }

    /// Padding options when any padding flag differs from the identity
    pub(crate) fn padding_options(cli: &Cli) -> Result<Option<PaddingOptions>> {
        let mode = PaddingMode::from_str(&cli.pad_mode).context("Invalid --pad-mode")?;
        let options = PaddingOptions {
            scale_width: cli.pad_width,
            scale_height: cli.pad_height,
            lr_balance: cli.pad_lr,
            tb_balance: cli.pad_tb,
            mode,
        };
        options.validate().context("Invalid padding options")?;

        let identity = (options.scale_width - 1.0).abs() < f64::EPSILON
            && (options.scale_height - 1.0).abs() < f64::EPSILON;
        Ok((!identity).then_some(options))
    }

    /// Validate arguments that clap cannot check on its own
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        let has_start = !cli.points.is_empty() || cli.mask_in.is_some();
        let has_add = cli.edits.iter().any(|e| matches!(e, EditStep::Add(_)));
        if !has_start && !has_add {
            bail!("Nothing to select: pass --point, --mask-in or an add:PATH edit");
        }
        if cli.invert && cli.points.is_empty() {
            bail!("--invert needs --point");
        }
        Ok(())
    }

    fn convert_format(format: CliMaskFormat) -> MaskFormat {
        match format {
            CliMaskFormat::Gray => MaskFormat::Gray,
            CliMaskFormat::Rgb => MaskFormat::Rgb,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Cli {
        let mut full = vec!["segment-edit", "photo.png", "--masks", "masks/*.png", "--config", "/nonexistent/segment-edit.json"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[test]
    fn test_edit_step_parsing() {
        assert_eq!("expand:5".parse::<EditStep>().unwrap(), EditStep::Expand(5));
        assert_eq!(
            "trim:strokes/a.png".parse::<EditStep>().unwrap(),
            EditStep::Trim(PathBuf::from("strokes/a.png"))
        );
        assert_eq!("ADD:b.png".parse::<EditStep>().unwrap(), EditStep::Add(PathBuf::from("b.png")));
        assert!("expand:lots".parse::<EditStep>().is_err());
        assert!("blur:3".parse::<EditStep>().is_err());
        assert!("expand".parse::<EditStep>().is_err());
    }

    #[test]
    fn test_point_parsing() {
        assert_eq!(parse_point("12, 40").unwrap(), Point::new(12, 40));
        assert!(parse_point("12").is_err());
        assert!(parse_point("-1,3").is_err());
    }

    #[test]
    fn test_overrides_apply() -> Result<()> {
        let cli = parse(&["--point", "1,1", "--format", "rgb", "--include-background", "-o", "out"]);
        let config = CliConfigBuilder::from_cli(&cli)?;
        assert_eq!(config.mask_format, MaskFormat::Rgb);
        assert!(!config.ignore_background);
        assert_eq!(config.output_dir, PathBuf::from("out"));
        Ok(())
    }

    #[test]
    fn test_anime_style_flag() {
        assert!(!parse(&["--point", "1,1"]).anime_style);
        assert!(parse(&["--point", "1,1", "--anime-style"]).anime_style);
    }

    #[test]
    fn test_padding_options() -> Result<()> {
        let cli = parse(&["--point", "1,1"]);
        assert!(CliConfigBuilder::padding_options(&cli)?.is_none());

        let cli = parse(&["--point", "1,1", "--pad-width", "1.5", "--pad-mode", "reflect"]);
        let options = CliConfigBuilder::padding_options(&cli)?.unwrap();
        assert_eq!(options.mode, PaddingMode::Reflect);

        let cli = parse(&["--point", "1,1", "--pad-width", "2.0"]);
        assert!(CliConfigBuilder::padding_options(&cli).is_err());
        Ok(())
    }

    #[test]
    fn test_validate_requires_a_selection() {
        assert!(CliConfigBuilder::validate_cli(&parse(&[])).is_err());
        assert!(CliConfigBuilder::validate_cli(&parse(&["--point", "3,3"])).is_ok());
        assert!(CliConfigBuilder::validate_cli(&parse(&["--edit", "add:s.png"])).is_ok());
    }
}
