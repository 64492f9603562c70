//! Result reporting: human-readable tables on stdout, optional JSON export,
//! and image artifact dumps.

use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;

use scriptmatch_types::{CompositeResult, CropOutput, LocalComparisonResult};

pub fn print_composite(result: &CompositeResult) {
    for sub in &result.sub_scores {
        if sub.description.is_empty() {
            println!("{:<24}{:>6.1}", sub.name, sub.score);
        } else {
            println!("{:<24}{:>6.1}  {}", sub.name, sub.score, sub.description);
        }
    }
    println!();
    println!(
        "composite: {:.1}%  verdict: {} ({})",
        result.composite_score,
        result.verdict.as_str(),
        result.verdict_color
    );
    if let Some(analysis) = &result.ai_analysis {
        println!();
        println!("{analysis}");
    }
    if let Some(warning) = &result.ai_warning {
        eprintln!("warning: {warning}");
    }
}

pub fn print_local(result: &LocalComparisonResult) {
    println!(
        "region {}x{}  ssim: {:.1}%  edge overlap: {:.1}%",
        result.region_width, result.region_height, result.local_ssim, result.edge_overlap
    );
}

pub fn print_crop(crop: &CropOutput) {
    println!(
        "cropped {}x{} at source origin ({}, {})",
        crop.width, crop.height, crop.origin_x, crop.origin_y
    );
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let mut serialized = serde_json::to_string_pretty(value)?;
    serialized.push('\n');
    fs::write(path, serialized)
}

/// Writes the comparison artifacts next to each other in `dir`.
pub fn dump_comparison(dir: &Path, result: &CompositeResult) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join("difference_heatmap.png"), &result.difference_heatmap)?;
    fs::write(dir.join("processed_questioned.png"), &result.processed_questioned)?;
    fs::write(dir.join("processed_known.png"), &result.processed_known)?;
    fs::write(dir.join("skeleton_questioned.png"), &result.skeleton_questioned)?;
    fs::write(dir.join("skeleton_known.png"), &result.skeleton_known)?;
    Ok(())
}

pub fn dump_local(dir: &Path, result: &LocalComparisonResult) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join("local_heatmap.png"), &result.difference_heatmap)?;
    fs::write(dir.join("local_edges.png"), &result.edge_visualization)?;
    Ok(())
}

/// Writes both crop renderings with a shared path prefix.
pub fn dump_crop(prefix: &Path, crop: &CropOutput) -> io::Result<()> {
    if let Some(parent) = prefix.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(with_suffix(prefix, "_transparent.png"), &crop.transparent_png)?;
    fs::write(with_suffix(prefix, "_solid.png"), &crop.solid_png)?;
    Ok(())
}

fn with_suffix(prefix: &Path, suffix: &str) -> std::path::PathBuf {
    let mut name = prefix.as_os_str().to_os_string();
    name.push(suffix);
    std::path::PathBuf::from(name)
}
