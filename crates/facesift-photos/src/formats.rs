//! Photo file formats recognised in the collection.

/// Extension → content type for files listed as photos.
const PHOTO_FORMATS: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
];

fn extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

/// True if the filename has a photo extension (case-insensitive).
pub fn is_photo_filename(filename: &str) -> bool {
    extension(filename)
        .map(|ext| PHOTO_FORMATS.iter().any(|(known, _)| *known == ext))
        .unwrap_or(false)
}

/// Content type to serve a file with, by extension.
pub fn content_type(filename: &str) -> &'static str {
    extension(filename)
        .and_then(|ext| {
            PHOTO_FORMATS
                .iter()
                .find(|(known, _)| *known == ext)
                .map(|(_, mime)| *mime)
        })
        .unwrap_or("application/octet-stream")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photo_extensions_case_insensitive() {
        assert!(is_photo_filename("a.jpg"));
        assert!(is_photo_filename("b.JPEG"));
        assert!(is_photo_filename("c.Png"));
        assert!(is_photo_filename("holiday.2024.jpg"));
    }

    #[test]
    fn test_non_photo_extensions() {
        assert!(!is_photo_filename("readme.txt"));
        assert!(!is_photo_filename("photo.gif"));
        assert!(!is_photo_filename("jpg"));
        assert!(!is_photo_filename("archive.jpg.zip"));
    }

    #[test]
    fn test_bare_extension_is_a_photo() {
        assert!(is_photo_filename(".png"));
        assert!(is_photo_filename(".JPG"));
        assert_eq!(content_type(".png"), "image/png");
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type("a.JPG"), "image/jpeg");
        assert_eq!(content_type("a.png"), "image/png");
        assert_eq!(content_type("notes.txt"), "application/octet-stream");
    }
}
