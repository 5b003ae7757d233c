use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

const DEFAULT_BIND: &str = "0.0.0.0:5000";
const DEFAULT_PHOTO_DIR: &str = "static/photos";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Socket address to listen on (default: 0.0.0.0:5000).
    pub bind: String,
    /// Flat directory holding the photo collection.
    pub photo_dir: PathBuf,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// Maximum Euclidean distance for a photo to match the query face.
    pub distance_threshold: f32,
    /// Largest accepted request body, in bytes.
    pub max_upload_bytes: usize,
}

/// Optional TOML file named by `FACESIFT_CONFIG`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    bind: Option<String>,
    photo_dir: Option<PathBuf>,
    model_dir: Option<PathBuf>,
    distance_threshold: Option<f32>,
    max_upload_bytes: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            photo_dir: PathBuf::from(DEFAULT_PHOTO_DIR),
            model_dir: facesift_core::default_model_dir(),
            distance_threshold: facesift_core::DEFAULT_DISTANCE_THRESHOLD,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Config {
    /// Load configuration: defaults, then the `FACESIFT_CONFIG` TOML file if
    /// set, then `FACESIFT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let file = match std::env::var_os("FACESIFT_CONFIG") {
            Some(path) => {
                let path = PathBuf::from(path);
                let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
                Some(parse_file(&text).map_err(|source| ConfigError::Parse { path, source })?)
            }
            None => None,
        };

        Ok(Self::from_sources(file, |key| std::env::var(key).ok()))
    }

    fn from_sources(file: Option<FileConfig>, env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let file = file.unwrap_or_default();

        let threshold = env_parse(&env, "FACESIFT_DISTANCE_THRESHOLD")
            .or(file.distance_threshold)
            .unwrap_or(defaults.distance_threshold);
        let distance_threshold = if threshold.is_finite() && threshold >= 0.0 {
            threshold
        } else {
            tracing::warn!(threshold, "invalid distance threshold, using default");
            defaults.distance_threshold
        };

        Self {
            bind: env("FACESIFT_BIND").or(file.bind).unwrap_or(defaults.bind),
            photo_dir: env("FACESIFT_PHOTO_DIR")
                .map(PathBuf::from)
                .or(file.photo_dir)
                .unwrap_or(defaults.photo_dir),
            model_dir: env("FACESIFT_MODEL_DIR")
                .map(PathBuf::from)
                .or(file.model_dir)
                .unwrap_or(defaults.model_dir),
            distance_threshold,
            max_upload_bytes: env_parse(&env, "FACESIFT_MAX_UPLOAD_BYTES")
                .or(file.max_upload_bytes)
                .unwrap_or(defaults.max_upload_bytes),
        }
    }
}

impl Config {
    /// True when the stock threshold is paired with ArcFace embeddings.
    ///
    /// The default suits 128-dim embeddings; different photos of one person
    /// under `w600k_r50` usually sit near
    /// [`facesift_core::ARCFACE_MATCH_DISTANCE`], so only near-duplicates
    /// would match.
    pub fn default_threshold_too_strict(&self, model_version: Option<&str>) -> bool {
        self.distance_threshold == facesift_core::DEFAULT_DISTANCE_THRESHOLD
            && model_version == Some(facesift_core::ARCFACE_MODEL_VERSION)
    }
}

fn parse_file(text: &str) -> Result<FileConfig, toml::de::Error> {
    toml::from_str(text)
}

/// Parse an environment value, ignoring (with a warning) values that do not parse.
fn env_parse<T: FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = env(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable environment value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_sources(None, env_of(&[]));
        assert_eq!(config.bind, "0.0.0.0:5000");
        assert_eq!(config.photo_dir, PathBuf::from("static/photos"));
        assert_eq!(config.distance_threshold, 0.5);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::from_sources(
            None,
            env_of(&[
                ("FACESIFT_BIND", "127.0.0.1:8080"),
                ("FACESIFT_PHOTO_DIR", "/srv/photos"),
                ("FACESIFT_MODEL_DIR", "/opt/models"),
                ("FACESIFT_DISTANCE_THRESHOLD", "0.42"),
                ("FACESIFT_MAX_UPLOAD_BYTES", "1024"),
            ]),
        );
        assert_eq!(config.bind, "127.0.0.1:8080");
        assert_eq!(config.photo_dir, PathBuf::from("/srv/photos"));
        assert_eq!(config.model_dir, PathBuf::from("/opt/models"));
        assert_eq!(config.distance_threshold, 0.42);
        assert_eq!(config.max_upload_bytes, 1024);
    }

    #[test]
    fn test_env_beats_file() {
        let file = parse_file(
            r#"
            bind = "127.0.0.1:9000"
            photo_dir = "/data/photos"
            distance_threshold = 0.6
            "#,
        )
        .unwrap();
        let config = Config::from_sources(Some(file), env_of(&[("FACESIFT_BIND", "[::1]:5000")]));
        assert_eq!(config.bind, "[::1]:5000");
        assert_eq!(config.photo_dir, PathBuf::from("/data/photos"));
        assert_eq!(config.distance_threshold, 0.6);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = Config::from_sources(
            None,
            env_of(&[
                ("FACESIFT_DISTANCE_THRESHOLD", "close"),
                ("FACESIFT_MAX_UPLOAD_BYTES", "-1"),
            ]),
        );
        assert_eq!(config.distance_threshold, 0.5);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);

        let negative = Config::from_sources(None, env_of(&[("FACESIFT_DISTANCE_THRESHOLD", "-0.1")]));
        assert_eq!(negative.distance_threshold, 0.5);
    }

    #[test]
    fn test_default_threshold_with_arcface_is_flagged() {
        let config = Config::from_sources(None, env_of(&[]));
        assert!(config.default_threshold_too_strict(Some("w600k_r50")));
        assert!(!config.default_threshold_too_strict(Some("dlib-128")));
        assert!(!config.default_threshold_too_strict(None));

        let tuned = Config::from_sources(None, env_of(&[("FACESIFT_DISTANCE_THRESHOLD", "1.1")]));
        assert!(!tuned.default_threshold_too_strict(Some("w600k_r50")));
    }

    #[test]
    fn test_unknown_file_keys_rejected() {
        assert!(parse_file("treshold = 0.4").is_err());
    }
}
