//! The photo folder: listing and filename resolution.

use crate::decode;
use crate::formats;
use facesift_core::{CandidateError, CandidateSource, PhotoRecord};
use image::RgbImage;
use std::ffi::OsString;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhotoError {
    #[error("invalid filename: {0:?}")]
    InvalidFilename(String),
    #[error("photo not found: {0}")]
    NotFound(String),
    #[error("photo folder I/O: {0}")]
    Io(#[from] io::Error),
}

/// Accept only a bare filename that names an entry directly inside the folder.
///
/// Rejects path separators, parent/current directory references, NUL and
/// empty names, so a lookup can never escape the photo folder.
pub fn validate_filename(filename: &str) -> Result<&str, PhotoError> {
    let invalid = || PhotoError::InvalidFilename(filename.to_string());

    if filename.is_empty() || filename.contains(['/', '\\', '\0']) {
        return Err(invalid());
    }

    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(filename),
        _ => Err(invalid()),
    }
}

/// A flat directory of externally managed photos.
#[derive(Debug, Clone)]
pub struct PhotoFolder {
    root: PathBuf,
}

impl PhotoFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the folder if it does not exist yet.
    pub fn ensure_exists(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.root)
    }

    /// All photo files (jpg/jpeg/png, case-insensitive), sorted by filename.
    ///
    /// Only failing to open the folder is an error. Entries that cannot be
    /// read are skipped.
    pub fn list(&self) -> io::Result<Vec<PhotoRecord>> {
        let entries = std::fs::read_dir(&self.root)?
            .map(|entry| entry.map(|entry| (entry.file_name(), entry.path())));
        Ok(photo_records(entries))
    }

    /// Path of an existing file in the folder, after filename validation.
    pub fn resolve(&self, filename: &str) -> Result<PathBuf, PhotoError> {
        let filename = validate_filename(filename)?;
        let path = self.root.join(filename);
        if !path.is_file() {
            return Err(PhotoError::NotFound(filename.to_string()));
        }
        Ok(path)
    }

    /// Raw bytes of a file in the folder.
    pub fn read(&self, filename: &str) -> Result<Vec<u8>, PhotoError> {
        let path = self.resolve(filename)?;
        std::fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => PhotoError::NotFound(filename.to_string()),
            _ => PhotoError::Io(e),
        })
    }
}

impl CandidateSource for PhotoFolder {
    fn candidates(&self) -> io::Result<Vec<PhotoRecord>> {
        self.list()
    }

    fn load(&self, candidate: &PhotoRecord) -> Result<RgbImage, CandidateError> {
        let path = self.resolve(&candidate.id).map_err(|e| match e {
            PhotoError::Io(e) => CandidateError::Io(e),
            other => CandidateError::Io(io::Error::new(io::ErrorKind::NotFound, other.to_string())),
        })?;
        decode::load_rgb(&path)
    }
}

fn photo_records(entries: impl Iterator<Item = io::Result<(OsString, PathBuf)>>) -> Vec<PhotoRecord> {
    let mut names = Vec::new();

    for entry in entries {
        let (name, path) = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(error = %err, "skipping unreadable folder entry");
                continue;
            }
        };
        let Ok(name) = name.into_string() else {
            tracing::debug!(path = %path.display(), "skipping non UTF-8 filename");
            continue;
        };
        if !formats::is_photo_filename(&name) || !path.is_file() {
            continue;
        }
        names.push(name);
    }

    names.sort();
    names.iter().map(|name| PhotoRecord::from_filename(name)).collect()
}
