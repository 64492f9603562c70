//! Configuration file handling. Values resolve from an explicit `--config`
//! override, then `./scriptmatch.toml`, then the per-user config directory;
//! anything absent falls back to the built-in defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

use scriptmatch_engine::{EngineConfig, PreprocessSettings, ScoreConfig};
use scriptmatch_types::{
    CORRELATION, CURVATURE_MATCH, MACRO_GEOMETRY, STROKE_DISTRIBUTION, STRUCTURAL_SIMILARITY,
};

pub const API_KEY_ENV: &str = "SCRIPTMATCH_API_KEY";

const CONFIG_FILE_NAME: &str = "scriptmatch.toml";

/// Matches the longest analysis latency observed in practice.
const DEFAULT_AI_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    canonical_edge: Option<u32>,
    weights: Option<WeightsConfig>,
    thresholds: Option<ThresholdsConfig>,
    ai: Option<AiFileConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WeightsConfig {
    macro_geometry: Option<f32>,
    stroke_distribution: Option<f32>,
    curvature_match: Option<f32>,
    structural_similarity: Option<f32>,
    correlation: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ThresholdsConfig {
    match_likely: Option<f32>,
    inconclusive: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AiFileConfig {
    endpoint: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    include_in_composite: Option<bool>,
    ai_weight: Option<f32>,
}

#[derive(Clone, Debug)]
pub struct AiSettings {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct EffectiveSettings {
    pub engine: EngineConfig,
    pub ai: AiSettings,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value '{value}' for '{field}'")]
    InvalidValue { field: &'static str, value: String },
    #[error("config file {path} does not exist")]
    NotFound { path: PathBuf },
}

pub fn resolve_settings(path_override: Option<&Path>) -> Result<EffectiveSettings, ConfigError> {
    let file = load_config(path_override)?;
    merge(file)
}

/// Reads the current API key from the environment. Never stored in config
/// files.
pub fn api_key_from_env() -> Option<String> {
    env::var(API_KEY_ENV).ok().filter(|key| !key.trim().is_empty())
}

fn load_config(path_override: Option<&Path>) -> Result<FileConfig, ConfigError> {
    if let Some(path) = path_override {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        return read_config(path);
    }

    if let Ok(current) = env::current_dir() {
        let project_path = current.join(CONFIG_FILE_NAME);
        if project_path.exists() {
            return read_config(&project_path);
        }
    }

    if let Some(dirs) = ProjectDirs::from("rs", "scriptmatch", "scriptmatch") {
        let default_path = dirs.config_dir().join("config.toml");
        if default_path.exists() {
            return read_config(&default_path);
        }
    }

    Ok(FileConfig::default())
}

fn read_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn merge(file: FileConfig) -> Result<EffectiveSettings, ConfigError> {
    let mut preprocess = PreprocessSettings::default();
    if let Some(edge) = file.canonical_edge {
        if edge < 64 {
            return Err(ConfigError::InvalidValue {
                field: "canonical_edge",
                value: edge.to_string(),
            });
        }
        preprocess.canonical_edge = edge;
    }

    let mut score = ScoreConfig::default();
    if let Some(weights) = file.weights {
        apply_weight(&mut score, MACRO_GEOMETRY, weights.macro_geometry)?;
        apply_weight(&mut score, STROKE_DISTRIBUTION, weights.stroke_distribution)?;
        apply_weight(&mut score, CURVATURE_MATCH, weights.curvature_match)?;
        apply_weight(&mut score, STRUCTURAL_SIMILARITY, weights.structural_similarity)?;
        apply_weight(&mut score, CORRELATION, weights.correlation)?;
    }
    if let Some(thresholds) = file.thresholds {
        if let Some(value) = thresholds.match_likely {
            score.match_threshold = value;
        }
        if let Some(value) = thresholds.inconclusive {
            score.inconclusive_threshold = value;
        }
    }

    let mut ai = AiSettings {
        endpoint: None,
        model: None,
        timeout: Duration::from_secs(DEFAULT_AI_TIMEOUT_SECS),
    };
    if let Some(ai_file) = file.ai {
        ai.endpoint = normalize_string(ai_file.endpoint);
        ai.model = normalize_string(ai_file.model);
        if let Some(secs) = ai_file.timeout_secs {
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "ai.timeout_secs",
                    value: secs.to_string(),
                });
            }
            ai.timeout = Duration::from_secs(secs);
        }
        if let Some(include) = ai_file.include_in_composite {
            score.include_ai = include;
        }
        if let Some(weight) = ai_file.ai_weight {
            score.ai_weight = weight;
        }
    }

    Ok(EffectiveSettings {
        engine: EngineConfig { preprocess, score },
        ai,
    })
}

fn apply_weight(
    score: &mut ScoreConfig,
    name: &str,
    value: Option<f32>,
) -> Result<(), ConfigError> {
    let Some(value) = value else {
        return Ok(());
    };
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::InvalidValue {
            field: "weights",
            value: value.to_string(),
        });
    }
    for (candidate, weight) in score.weights.iter_mut() {
        if candidate == name {
            *weight = value;
            return Ok(());
        }
    }
    Ok(())
}

fn normalize_string(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scriptmatch.toml");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn defaults_apply_without_a_config_file() {
        let settings = resolve_settings(None).unwrap();
        assert_eq!(settings.engine.score.match_threshold, 88.0);
        assert!(!settings.engine.score.include_ai);
    }

    #[test]
    fn file_values_override_defaults() {
        let (_dir, path) = write_config(
            r#"
canonical_edge = 256

[weights]
macro_geometry = 0.40
structural_similarity = 0.10

[thresholds]
match_likely = 90.0

[ai]
model = "gpt-4o-mini"
timeout_secs = 30
include_in_composite = true
"#,
        );
        let settings = resolve_settings(Some(&path)).unwrap();
        assert_eq!(settings.engine.preprocess.canonical_edge, 256);
        assert_eq!(settings.engine.score.match_threshold, 90.0);
        assert!(settings.engine.score.include_ai);
        assert_eq!(settings.ai.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(settings.ai.timeout, Duration::from_secs(30));

        let macro_weight = settings
            .engine
            .score
            .weights
            .iter()
            .find(|(name, _)| name == MACRO_GEOMETRY)
            .map(|(_, weight)| *weight);
        assert_eq!(macro_weight, Some(0.40));
    }

    #[test]
    fn missing_override_path_is_an_error() {
        let err = resolve_settings(Some(Path::new("/nonexistent/scriptmatch.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn invalid_values_are_rejected_with_context() {
        let (_dir, path) = write_config("canonical_edge = 8\n");
        let err = resolve_settings(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "canonical_edge", .. }));
    }
}
