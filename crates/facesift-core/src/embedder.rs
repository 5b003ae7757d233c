//! Face embedding extraction.
//!
//! [`Embedder`] is the capability the matcher depends on: image in, embedding
//! of the first detected face out. [`OnnxEmbedder`] implements it with SCRFD
//! detection and ArcFace recognition.

use crate::detector::{DetectorError, FaceDetector};
use crate::recognizer::{FaceRecognizer, RecognizerError, ARCFACE_MODEL_VERSION};
use crate::types::Embedding;
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

pub const DETECTOR_MODEL_FILE: &str = "det_10g.onnx";
pub const RECOGNIZER_MODEL_FILE: &str = "w600k_r50.onnx";

#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
}

/// Produces at most one embedding per image: the first detected face.
///
/// Unusual image content yields `Ok(None)`; errors are reserved for backend
/// failures.
pub trait Embedder: Send + Sync {
    fn extract(&self, image: &RgbImage) -> Result<Option<Embedding>, EmbedderError>;

    /// Identifier of the model producing embeddings, if known.
    fn model_version(&self) -> Option<&str> {
        None
    }
}

struct Models {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

/// SCRFD + ArcFace embedder on ONNX Runtime.
///
/// ONNX sessions need exclusive access, so concurrent callers are serialized
/// on an internal mutex.
pub struct OnnxEmbedder {
    models: Mutex<Models>,
}

impl OnnxEmbedder {
    /// Load both models from explicit paths. Fails fast if either is missing.
    pub fn load(detector_path: &Path, recognizer_path: &Path) -> Result<Self, EmbedderError> {
        let detector = FaceDetector::load(detector_path)?;
        let recognizer = FaceRecognizer::load(recognizer_path)?;
        Ok(Self {
            models: Mutex::new(Models { detector, recognizer }),
        })
    }

    /// Load `det_10g.onnx` and `w600k_r50.onnx` from a model directory.
    pub fn from_dir(model_dir: &Path) -> Result<Self, EmbedderError> {
        let (detector_path, recognizer_path) = model_paths(model_dir);
        Self::load(&detector_path, &recognizer_path)
    }
}

/// Paths of the detector and recognizer models inside a model directory.
pub fn model_paths(model_dir: &Path) -> (PathBuf, PathBuf) {
    (
        model_dir.join(DETECTOR_MODEL_FILE),
        model_dir.join(RECOGNIZER_MODEL_FILE),
    )
}

/// Lock the models, recovering from a poisoned lock. Sessions keep no state
/// between runs.
fn lock_models<T>(models: &Mutex<T>) -> MutexGuard<'_, T> {
    models.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("recovering face models after a panicked extraction");
        poisoned.into_inner()
    })
}

impl Embedder for OnnxEmbedder {
    fn extract(&self, image: &RgbImage) -> Result<Option<Embedding>, EmbedderError> {
        let mut models = lock_models(&self.models);
        let Models { detector, recognizer } = &mut *models;

        let faces = detector.detect(image)?;
        // Faces without landmarks cannot be aligned; take the best one that can.
        let Some(face) = faces.iter().find(|f| f.landmarks.is_some()) else {
            tracing::debug!(detected = faces.len(), "no usable face");
            return Ok(None);
        };

        tracing::trace!(confidence = face.confidence, "face selected");
        Ok(Some(recognizer.extract(image, face)?))
    }

    fn model_version(&self) -> Option<&str> {
        Some(ARCFACE_MODEL_VERSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_paths() {
        let (det, rec) = model_paths(Path::new("/opt/models"));
        assert_eq!(det, Path::new("/opt/models/det_10g.onnx"));
        assert_eq!(rec, Path::new("/opt/models/w600k_r50.onnx"));
    }

    #[test]
    fn test_lock_recovers_after_panic() {
        let models = Mutex::new(7u32);
        let result = std::panic::catch_unwind(|| {
            let _guard = models.lock().unwrap();
            panic!("inference panicked");
        });
        assert!(result.is_err());
        assert!(models.is_poisoned());

        *lock_models(&models) += 1;
        assert_eq!(*lock_models(&models), 8);
    }

    #[test]
    fn test_from_dir_missing_models() {
        let err = OnnxEmbedder::from_dir(Path::new("/nonexistent/models"))
            .err()
            .expect("missing models must fail");
        assert!(matches!(err, EmbedderError::Detector(DetectorError::ModelNotFound(_))));
    }
}
