use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;
use tokio::fs;

use scriptmatch::cli::{CliArgs, Command, CompareArgs, CropArgs, LocalArgs};
use scriptmatch::pipeline::run_comparison;
use scriptmatch::report;
use scriptmatch::settings::{self, ConfigError, EffectiveSettings};
use scriptmatch_analysis::{AnalysisError, AnalysisProvider, VisionChatConfig, VisionChatProvider};
use scriptmatch_engine::ComparisonEngine;
use scriptmatch_types::{CompareError, CropRect, DisplaySize, OverlayTransform};

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Compare(#[from] CompareError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: CliArgs) -> Result<(), CliError> {
    let settings = settings::resolve_settings(args.config.as_deref())?;
    let engine = ComparisonEngine::new(settings.engine.clone())?;

    match args.command {
        Command::Compare(compare) => run_compare(&engine, &settings, compare).await,
        Command::Crop(crop) => run_crop(&engine, crop).await,
        Command::Local(local) => run_local(&engine, local).await,
    }
}

async fn run_compare(
    engine: &ComparisonEngine,
    settings: &EffectiveSettings,
    args: CompareArgs,
) -> Result<(), CliError> {
    let questioned = fs::read(&args.questioned).await?;
    let known = fs::read(&args.known).await?;

    let provider = if args.ai {
        Some(build_provider(settings)?)
    } else {
        None
    };
    let provider_ref = provider.as_ref().map(|p| p as &dyn AnalysisProvider);

    let result = run_comparison(engine, provider_ref, &questioned, &known, settings.ai.timeout).await?;

    report::print_composite(&result);
    if let Some(path) = &args.json {
        report::write_json(path, &result)?;
    }
    if let Some(dir) = &args.dump_dir {
        report::dump_comparison(dir, &result)?;
        std::fs::write(dir.join("questioned_thumb.jpg"), engine.thumbnail(&questioned)?)?;
        std::fs::write(dir.join("known_thumb.jpg"), engine.thumbnail(&known)?)?;
    }
    Ok(())
}

fn build_provider(settings: &EffectiveSettings) -> Result<VisionChatProvider, CliError> {
    let mut config = VisionChatConfig {
        api_key: settings::api_key_from_env(),
        timeout: settings.ai.timeout,
        ..VisionChatConfig::default()
    };
    if let Some(endpoint) = &settings.ai.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(model) = &settings.ai.model {
        config.model = model.clone();
    }
    Ok(VisionChatProvider::new(config)?)
}

async fn run_crop(engine: &ComparisonEngine, args: CropArgs) -> Result<(), CliError> {
    let bytes = fs::read(&args.image).await?;
    let rect = CropRect {
        x: args.rect.x,
        y: args.rect.y,
        width: args.rect.width,
        height: args.rect.height,
    };
    let display = DisplaySize {
        width: args.display.width,
        height: args.display.height,
    };
    let crop = engine.crop_region(&bytes, rect, display)?;
    report::print_crop(&crop);

    let prefix = match &args.out_prefix {
        Some(prefix) => prefix.clone(),
        None => default_crop_prefix(&args.image),
    };
    report::dump_crop(&prefix, &crop)?;
    Ok(())
}

fn default_crop_prefix(image: &Path) -> std::path::PathBuf {
    let stem = image
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "crop".to_string());
    image.with_file_name(format!("{stem}_crop"))
}

async fn run_local(engine: &ComparisonEngine, args: LocalArgs) -> Result<(), CliError> {
    let base = fs::read(&args.base).await?;
    let overlay = fs::read(&args.overlay).await?;

    let transform = OverlayTransform {
        translate_x: args.translate.x,
        translate_y: args.translate.y,
        scale: args.scale,
        rotation_degrees: args.rotation,
        alpha: args.alpha,
    };
    let result = engine.local_comparison(&base, &overlay, transform)?;
    report::print_local(&result);

    if let Some(dir) = &args.dump_dir {
        report::dump_local(dir, &result)?;
    }
    Ok(())
}
