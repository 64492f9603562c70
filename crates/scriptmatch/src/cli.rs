use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "scriptmatch",
    about = "Compare handwriting specimens and score their similarity",
    disable_help_subcommand = true
)]
pub struct CliArgs {
    /// Override the configuration file path
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Full comparison of a questioned document against a known sample
    Compare(CompareArgs),
    /// Extract a display-space rectangle from an image at native resolution
    Crop(CropArgs),
    /// Score an overlay region against a base image under a transform
    Local(LocalArgs),
}

#[derive(Debug, clap::Args)]
pub struct CompareArgs {
    /// Questioned document image
    pub questioned: PathBuf,

    /// Known reference sample image
    pub known: PathBuf,

    /// Request the AI deep-analysis opinion alongside the deterministic metrics
    #[arg(long = "ai")]
    pub ai: bool,

    /// Write the serialized result to this file
    #[arg(long = "json", value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// Output directory for heatmap, processed specimens, and thumbnails
    #[arg(long = "dump-dir", value_name = "DIR")]
    pub dump_dir: Option<PathBuf>,
}

#[derive(Debug, clap::Args)]
pub struct CropArgs {
    /// Source image
    pub image: PathBuf,

    /// Display-space rectangle as X,Y,WxH (e.g. 50,50,150x100)
    #[arg(long = "rect", value_parser = parse_rect)]
    pub rect: RectSpec,

    /// Size of the displayed rendition as WxH (e.g. 500x500)
    #[arg(long = "display", value_parser = parse_size)]
    pub display: SizeSpec,

    /// Output path prefix for the two crop renderings
    #[arg(long = "out-prefix", value_name = "PREFIX")]
    pub out_prefix: Option<PathBuf>,
}

#[derive(Debug, clap::Args)]
pub struct LocalArgs {
    /// Base image the overlay is positioned over
    pub base: PathBuf,

    /// Overlay fragment image
    pub overlay: PathBuf,

    /// Overlay translation as X,Y in base pixels
    #[arg(long = "translate", value_parser = parse_point, default_value = "0,0")]
    pub translate: PointSpec,

    /// Overlay scale factor
    #[arg(long = "scale", default_value_t = 1.0)]
    pub scale: f32,

    /// Overlay rotation in degrees
    #[arg(long = "rotation", default_value_t = 0.0)]
    pub rotation: f32,

    /// Overlay blend alpha used in the rendered heatmap
    #[arg(long = "alpha", default_value_t = 1.0)]
    pub alpha: f32,

    /// Output directory for the heatmap and edge visualization
    #[arg(long = "dump-dir", value_name = "DIR")]
    pub dump_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug)]
pub struct RectSpec {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Clone, Copy, Debug)]
pub struct SizeSpec {
    pub width: f32,
    pub height: f32,
}

#[derive(Clone, Copy, Debug)]
pub struct PointSpec {
    pub x: f32,
    pub y: f32,
}

fn parse_rect(value: &str) -> Result<RectSpec, String> {
    let parts: Vec<&str> = value.splitn(3, ',').collect();
    if parts.len() != 3 {
        return Err("expected X,Y,WxH".to_string());
    }
    let size = parse_size(parts[2])?;
    Ok(RectSpec {
        x: parse_number(parts[0])?,
        y: parse_number(parts[1])?,
        width: size.width,
        height: size.height,
    })
}

fn parse_size(value: &str) -> Result<SizeSpec, String> {
    let (width, height) = value
        .split_once('x')
        .ok_or_else(|| "expected WxH".to_string())?;
    Ok(SizeSpec {
        width: parse_number(width)?,
        height: parse_number(height)?,
    })
}

fn parse_point(value: &str) -> Result<PointSpec, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| "expected X,Y".to_string())?;
    Ok(PointSpec {
        x: parse_number(x)?,
        y: parse_number(y)?,
    })
}

fn parse_number(value: &str) -> Result<f32, String> {
    value
        .trim()
        .parse::<f32>()
        .map_err(|_| format!("'{value}' is not a number"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_spec_parses_display_notation() {
        let rect = parse_rect("50,50,150x100").unwrap();
        assert_eq!(rect.x, 50.0);
        assert_eq!(rect.width, 150.0);
        assert_eq!(rect.height, 100.0);
    }

    #[test]
    fn malformed_specs_are_rejected() {
        assert!(parse_rect("50,50").is_err());
        assert!(parse_size("500").is_err());
        assert!(parse_point("a,b").is_err());
    }
}
