//! facesift-core: Face embeddings and photo matching.
//!
//! Uses SCRFD for face detection and ArcFace for embeddings, both running via
//! ONNX Runtime, behind the [`Embedder`] capability consumed by [`Matcher`].

pub mod alignment;
pub mod detector;
pub mod embedder;
pub mod matcher;
pub mod recognizer;
pub mod types;

pub use detector::FaceDetector;
pub use embedder::{Embedder, EmbedderError, OnnxEmbedder};
pub use matcher::{CandidateError, CandidateSource, MatchError, Matcher, DEFAULT_DISTANCE_THRESHOLD};
pub use recognizer::{FaceRecognizer, ARCFACE_MATCH_DISTANCE, ARCFACE_MODEL_VERSION};
pub use types::{BoundingBox, Embedding, EmbeddingError, MatchResult, PhotoRecord};

use std::path::PathBuf;

/// Default model directory: `$XDG_DATA_HOME/facesift/models`, falling back to
/// `~/.local/share/facesift/models`.
pub fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("facesift/models")
}
