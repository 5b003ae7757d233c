//! facesift-photos: Access to the on-disk photo collection.
//!
//! The photo folder is a flat directory of image files populated externally.
//! This crate lists it, resolves client-supplied filenames without leaving
//! it, and decodes photos for the matcher.

pub mod decode;
pub mod folder;
pub mod formats;

pub use decode::{decode_rgb, load_rgb};
pub use folder::{validate_filename, PhotoError, PhotoFolder};
