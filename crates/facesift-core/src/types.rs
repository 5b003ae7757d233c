use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbeddingError {
    #[error("embedding dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}

/// Face embedding vector (dimension fixed by the model that produced it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
    /// Model version that produced this embedding (e.g., "w600k_r50").
    pub model_version: Option<String>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values, model_version: None }
    }

    /// Euclidean (L2) distance between two embeddings.
    ///
    /// Embeddings from different models are not comparable, so differing
    /// dimensions are an error rather than a truncated comparison.
    pub fn distance(&self, other: &Embedding) -> Result<f32, EmbeddingError> {
        if self.values.len() != other.values.len() {
            return Err(EmbeddingError::DimensionMismatch {
                left: self.values.len(),
                right: other.values.len(),
            });
        }

        Ok(self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt())
    }
}

/// A photo in the collection. The folder listing is the record set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub id: String,
    pub name: String,
    pub view_url: String,
}

impl PhotoRecord {
    /// Build a record for a file in the photo folder.
    pub fn from_filename(filename: &str) -> Self {
        Self {
            id: filename.to_string(),
            name: filename.to_string(),
            view_url: format!("/static/photos/{filename}"),
        }
    }
}

/// A candidate photo accepted by a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub id: String,
    pub name: String,
    /// Euclidean distance to the query, rounded to 3 decimal places.
    pub distance: f64,
    pub view_url: String,
}

impl MatchResult {
    pub fn new(photo: &PhotoRecord, distance: f32) -> Self {
        Self {
            id: photo.id.clone(),
            name: photo.name.clone(),
            distance: round_distance(distance),
            view_url: photo.view_url.clone(),
        }
    }
}

/// Round a distance to 3 decimal places for presentation.
pub fn round_distance(distance: f32) -> f64 {
    (distance as f64 * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_identical_is_zero() {
        let a = Embedding::new(vec![0.1, -0.4, 0.9]);
        assert_eq!(a.distance(&a.clone()).unwrap(), 0.0);
    }

    #[test]
    fn test_distance_known_value() {
        let a = Embedding::new(vec![0.0, 0.0]);
        let b = Embedding::new(vec![3.0, 4.0]);
        assert!((a.distance(&b).unwrap() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_distance_symmetric() {
        let a = Embedding::new(vec![0.12, 0.5, -0.33, 0.8]);
        let b = Embedding::new(vec![-0.7, 0.25, 0.1, 0.05]);
        assert_eq!(a.distance(&b).unwrap(), b.distance(&a).unwrap());
    }

    #[test]
    fn test_distance_dimension_mismatch() {
        let a = Embedding::new(vec![1.0, 0.0]);
        let b = Embedding::new(vec![1.0, 0.0, 0.0]);
        assert_eq!(
            a.distance(&b),
            Err(EmbeddingError::DimensionMismatch { left: 2, right: 3 })
        );
    }

    #[test]
    fn test_round_distance() {
        assert_eq!(round_distance(0.3), 0.3);
        assert_eq!(round_distance(0.12345), 0.123);
        assert_eq!(round_distance(0.4996), 0.5);
        assert_eq!(round_distance(0.0), 0.0);
    }

    #[test]
    fn test_photo_record_view_url() {
        let record = PhotoRecord::from_filename("a.jpg");
        assert_eq!(record.id, "a.jpg");
        assert_eq!(record.name, "a.jpg");
        assert_eq!(record.view_url, "/static/photos/a.jpg");
    }

    #[test]
    fn test_match_result_serializes_flat() {
        let result = MatchResult::new(&PhotoRecord::from_filename("b.jpg"), 0.3);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "b.jpg",
                "name": "b.jpg",
                "distance": 0.3,
                "view_url": "/static/photos/b.jpg",
            })
        );
    }
}
