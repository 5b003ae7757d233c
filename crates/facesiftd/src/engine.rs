use facesift_core::{MatchError, MatchResult, Matcher, PhotoRecord};
use facesift_photos::{PhotoError, PhotoFolder};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("uploaded file is not a readable image: {0}")]
    InvalidUpload(#[source] image::ImageError),
    #[error("match error: {0}")]
    Match(#[from] MatchError),
    #[error("photo error: {0}")]
    Photo(#[from] PhotoError),
    #[error("engine task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Outcome of a face search that reached the matcher.
#[derive(Debug)]
pub enum SearchOutcome {
    /// The query image contains no detectable face.
    NoFace,
    /// Matching photos, closest first.
    Matches(Vec<MatchResult>),
}

/// Snapshot of engine settings for the status endpoint.
#[derive(Debug, Clone)]
pub struct EngineStatus {
    pub photo_dir: PathBuf,
    pub distance_threshold: f32,
    pub model_version: Option<String>,
}

/// Clone-safe handle shared by request handlers.
///
/// Searches are CPU bound and run to completion on the blocking pool, one
/// task per request. There is no cancellation.
#[derive(Clone)]
pub struct Engine {
    matcher: Arc<Matcher>,
    photos: PhotoFolder,
}

impl Engine {
    pub fn new(matcher: Matcher, photos: PhotoFolder) -> Self {
        Self {
            matcher: Arc::new(matcher),
            photos,
        }
    }

    /// Decode an uploaded image, embed its face and scan the photo folder.
    pub async fn search(&self, upload: Vec<u8>) -> Result<SearchOutcome, EngineError> {
        let matcher = Arc::clone(&self.matcher);
        let photos = self.photos.clone();

        tokio::task::spawn_blocking(move || -> Result<SearchOutcome, EngineError> {
            let query = facesift_photos::decode_rgb(&upload).map_err(EngineError::InvalidUpload)?;
            tracing::debug!(width = query.width(), height = query.height(), "search: query decoded");

            let Some(target) = matcher.embed_query(&query)? else {
                tracing::info!("search: no face in query image");
                return Ok(SearchOutcome::NoFace);
            };

            Ok(SearchOutcome::Matches(matcher.search(&target, &photos)?))
        })
        .await?
    }

    pub async fn list_photos(&self) -> Result<Vec<PhotoRecord>, EngineError> {
        let photos = self.photos.clone();
        let records = tokio::task::spawn_blocking(move || photos.list()).await?;
        Ok(records.map_err(PhotoError::from)?)
    }

    /// Raw bytes of a photo, by client-supplied filename.
    pub async fn read_photo(&self, filename: String) -> Result<Vec<u8>, EngineError> {
        let photos = self.photos.clone();
        Ok(tokio::task::spawn_blocking(move || photos.read(&filename)).await??)
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            photo_dir: self.photos.root().to_path_buf(),
            distance_threshold: self.matcher.threshold(),
            model_version: self.matcher.embedder().model_version().map(str::to_string),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use facesift_core::{Embedder, EmbedderError, Embedding};
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use std::path::Path;

    /// Reads a 1-d embedding from the red channel of the top-left pixel;
    /// black means no face.
    pub struct PixelEmbedder;

    impl Embedder for PixelEmbedder {
        fn extract(&self, image: &RgbImage) -> Result<Option<Embedding>, EmbedderError> {
            let red = image.get_pixel(0, 0)[0];
            if red == 0 {
                return Ok(None);
            }
            Ok(Some(Embedding::new(vec![red as f32 / 100.0])))
        }

        fn model_version(&self) -> Option<&str> {
            Some("pixel")
        }
    }

    pub fn face_png(red: u8) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        RgbImage::from_pixel(4, 4, Rgb([red, 0, 0]))
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    pub fn write_face(dir: &Path, name: &str, red: u8) {
        std::fs::write(dir.join(name), face_png(red)).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    fn engine(dir: &std::path::Path) -> Engine {
        Engine::new(Matcher::new(Arc::new(PixelEmbedder)), PhotoFolder::new(dir))
    }

    #[tokio::test]
    async fn test_search_matches() {
        let dir = tempfile::tempdir().unwrap();
        write_face(dir.path(), "a.jpg", 10);
        write_face(dir.path(), "b.jpg", 40);
        write_face(dir.path(), "c.png", 0);

        let outcome = engine(dir.path()).search(face_png(10)).await.unwrap();
        let results = match outcome {
            SearchOutcome::Matches(results) => results,
            SearchOutcome::NoFace => panic!("expected matches"),
        };
        let ids: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a.jpg", "b.jpg"]);
    }

    #[tokio::test]
    async fn test_search_no_face() {
        let dir = tempfile::tempdir().unwrap();
        write_face(dir.path(), "a.jpg", 10);

        let outcome = engine(dir.path()).search(face_png(0)).await.unwrap();
        assert!(matches!(outcome, SearchOutcome::NoFace));
    }

    #[tokio::test]
    async fn test_search_invalid_upload() {
        let dir = tempfile::tempdir().unwrap();
        let err = engine(dir.path()).search(b"GIF89a nope".to_vec()).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidUpload(_)));
    }

    #[tokio::test]
    async fn test_status() {
        let dir = tempfile::tempdir().unwrap();
        let status = engine(dir.path()).status();
        assert_eq!(status.photo_dir, dir.path());
        assert_eq!(status.distance_threshold, 0.5);
        assert_eq!(status.model_version.as_deref(), Some("pixel"));
    }
}
