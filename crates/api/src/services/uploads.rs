//! Product image uploads.
//!
//! Accepts JPEG and PNG only. Both the file extension and the declared
//! content type must agree on an image type. Files are stored under a
//! generated name so client-supplied names never reach the filesystem.

use std::path::{Path, PathBuf};

use axum::body::Bytes;
use thiserror::Error;
use uuid::Uuid;

/// Largest accepted image, in bytes.
pub const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

/// URL prefix the upload directory is served under.
pub const PUBLIC_PREFIX: &str = "/uploads/";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("only jpg, jpeg and png images are allowed")]
    UnsupportedType,

    #[error("image exceeds {max} bytes")]
    TooLarge { max: usize },

    #[error("image is empty")]
    Empty,

    #[error("failed to store image: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Whether the client sent a bad file, as opposed to a storage fault.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

/// A validated image waiting to be written.
#[derive(Debug)]
pub struct ImageUpload {
    extension: &'static str,
    bytes: Bytes,
}

impl ImageUpload {
    /// Validate a multipart file field.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::UnsupportedType` when the extension or content
    /// type isn't an accepted image, `UploadError::Empty` or
    /// `UploadError::TooLarge` on size.
    pub fn new(
        file_name: Option<&str>,
        content_type: Option<&str>,
        bytes: Bytes,
    ) -> Result<Self, UploadError> {
        let extension = file_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        let extension = match (extension.as_deref(), content_type) {
            (Some("jpg" | "jpeg"), Some("image/jpeg")) => "jpg",
            (Some("png"), Some("image/png")) => "png",
            _ => return Err(UploadError::UnsupportedType),
        };

        if bytes.is_empty() {
            return Err(UploadError::Empty);
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(UploadError::TooLarge {
                max: MAX_IMAGE_BYTES,
            });
        }

        Ok(Self { extension, bytes })
    }

    /// Write the image into `dir` and return its public path.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::Io` if the directory or file can't be written.
    pub async fn store(&self, dir: &Path) -> Result<String, UploadError> {
        tokio::fs::create_dir_all(dir).await?;
        let file_name = format!("{}.{}", Uuid::new_v4(), self.extension);
        tokio::fs::write(dir.join(&file_name), &self.bytes).await?;
        tracing::debug!(file = %file_name, bytes = self.bytes.len(), "Stored image");
        Ok(format!("{PUBLIC_PREFIX}{file_name}"))
    }
}

/// Map a stored public path back to its file in `dir`.
///
/// Returns `None` for paths that weren't produced by [`ImageUpload::store`].
#[must_use]
pub fn stored_file(dir: &Path, public_path: &str) -> Option<PathBuf> {
    let name = public_path.strip_prefix(PUBLIC_PREFIX)?;
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        && !name.contains("..");
    valid.then(|| dir.join(name))
}

/// Best-effort removal of a replaced or orphaned image.
pub async fn remove_stored(dir: &Path, public_path: &str) {
    let Some(path) = stored_file(dir, public_path) else {
        return;
    };
    if let Err(e) = tokio::fs::remove_file(&path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(error = %e, path = %path.display(), "Failed to remove image");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn png() -> Bytes {
        Bytes::from_static(b"\x89PNG\r\n\x1a\n")
    }

    #[test]
    fn test_accepts_matching_types() {
        assert!(ImageUpload::new(Some("a.PNG"), Some("image/png"), png()).is_ok());
        assert!(ImageUpload::new(Some("a.jpeg"), Some("image/jpeg"), png()).is_ok());
    }

    #[test]
    fn test_rejects_mismatch_and_unknown() {
        for (name, mime) in [
            (Some("a.png"), Some("image/jpeg")),
            (Some("a.gif"), Some("image/gif")),
            (Some("a.png"), None),
            (None, Some("image/png")),
            (Some("png"), Some("image/png")),
        ] {
            assert!(matches!(
                ImageUpload::new(name, mime, png()),
                Err(UploadError::UnsupportedType)
            ));
        }
    }

    #[test]
    fn test_size_limits() {
        assert!(matches!(
            ImageUpload::new(Some("a.png"), Some("image/png"), Bytes::new()),
            Err(UploadError::Empty)
        ));
        let big = Bytes::from(vec![0_u8; MAX_IMAGE_BYTES + 1]);
        assert!(matches!(
            ImageUpload::new(Some("a.png"), Some("image/png"), big),
            Err(UploadError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_stored_file_rejects_traversal() {
        let dir = Path::new("/srv/uploads");
        assert_eq!(
            stored_file(dir, "/uploads/abc-1.png"),
            Some(PathBuf::from("/srv/uploads/abc-1.png"))
        );
        assert_eq!(stored_file(dir, "/uploads/../etc/passwd"), None);
        assert_eq!(stored_file(dir, "/elsewhere/a.png"), None);
        assert_eq!(stored_file(dir, "/uploads/"), None);
    }

    #[tokio::test]
    async fn test_store_and_remove() {
        let dir = std::env::temp_dir().join(format!("catalog-uploads-{}", Uuid::new_v4()));
        let upload = ImageUpload::new(Some("cat.png"), Some("image/png"), png()).unwrap();

        let public = upload.store(&dir).await.unwrap();
        assert!(public.starts_with(PUBLIC_PREFIX));
        let path = stored_file(&dir, &public).unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), png().to_vec());

        remove_stored(&dir, &public).await;
        assert!(!path.exists());
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
