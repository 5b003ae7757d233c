//! Linear-scan face matcher over a candidate photo source.

use crate::embedder::{Embedder, EmbedderError};
use crate::types::{Embedding, EmbeddingError, MatchResult, PhotoRecord};
use image::RgbImage;
use std::sync::Arc;
use thiserror::Error;

/// Maximum Euclidean distance for two faces to count as the same person.
pub const DEFAULT_DISTANCE_THRESHOLD: f32 = 0.5;

/// Why a single candidate could not be evaluated. Never fatal to a search.
#[derive(Error, Debug)]
pub enum CandidateError {
    #[error("candidate unreadable: {0}")]
    Io(#[from] std::io::Error),
    #[error("candidate undecodable: {0}")]
    Decode(#[from] image::ImageError),
}

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("failed to enumerate candidates: {0}")]
    Source(#[source] std::io::Error),
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error(transparent)]
    Embedder(#[from] EmbedderError),
}

/// An enumerable set of candidate photos.
pub trait CandidateSource: Send + Sync {
    /// Snapshot of the candidates available right now.
    fn candidates(&self) -> std::io::Result<Vec<PhotoRecord>>;

    /// Load and decode one candidate as RGB.
    fn load(&self, candidate: &PhotoRecord) -> Result<RgbImage, CandidateError>;
}

/// Scans every candidate, keeping those within the distance threshold.
pub struct Matcher {
    embedder: Arc<dyn Embedder>,
    threshold: f32,
}

impl Matcher {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            threshold: DEFAULT_DISTANCE_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Embedding of the first face in the query image, if any.
    pub fn embed_query(&self, image: &RgbImage) -> Result<Option<Embedding>, MatchError> {
        Ok(self.embedder.extract(image)?)
    }

    /// Compare `target` against every candidate in `source`.
    ///
    /// Unreadable candidates and candidates without a face are skipped.
    /// Results are ordered by ascending distance, ties by identifier.
    pub fn search(
        &self,
        target: &Embedding,
        source: &dyn CandidateSource,
    ) -> Result<Vec<MatchResult>, MatchError> {
        let candidates = source.candidates().map_err(MatchError::Source)?;
        let mut scored: Vec<(f32, &PhotoRecord)> = Vec::new();
        let mut skipped = 0usize;

        for candidate in &candidates {
            let image = match source.load(candidate) {
                Ok(image) => image,
                Err(err) => {
                    tracing::debug!(photo = %candidate.id, error = %err, "skipping candidate");
                    skipped += 1;
                    continue;
                }
            };

            let Some(embedding) = self.embedder.extract(&image)? else {
                tracing::debug!(photo = %candidate.id, "skipping candidate: no face");
                skipped += 1;
                continue;
            };

            let distance = target.distance(&embedding)?;
            if distance <= self.threshold {
                scored.push((distance, candidate));
            }
        }

        scored.sort_by(|(da, a), (db, b)| {
            da.partial_cmp(db)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });

        tracing::info!(
            scanned = candidates.len(),
            skipped,
            matched = scored.len(),
            threshold = self.threshold,
            "search complete"
        );

        Ok(scored
            .into_iter()
            .map(|(distance, photo)| MatchResult::new(photo, distance))
            .collect())
    }
}
