/// Client-side checks and request bodies for the two detection uploads.
///
/// Validation runs before any network I/O so a rejected upload never
/// reaches the service.
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use super::error::{ApiError, ApiResult};
use crate::format::guess_image_mime;

/// An image picked for upload, already read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    /// MIME type as reported by the browser or guessed from the extension.
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    ///
    /// Unknown extensions get `application/octet-stream`, which validation
    /// then rejects as not an image.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let content_type = guess_image_mime(&file_name)
            .unwrap_or("application/octet-stream")
            .to_string();
        Ok(Self::new(file_name, content_type, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Check an upload against the type and size rules.
pub fn validate_upload(upload: Option<&ImageUpload>, max_bytes: u64) -> ApiResult<&ImageUpload> {
    let Some(upload) = upload else {
        return Err(ApiError::Validation(
            "Please select an image file first.".to_string(),
        ));
    };

    if !upload.content_type.trim().to_ascii_lowercase().starts_with("image/") {
        return Err(ApiError::Validation(
            "Please select a valid image file.".to_string(),
        ));
    }

    if upload.size() > max_bytes {
        return Err(ApiError::Validation(format!(
            "File size must be less than {}MB.",
            max_bytes / (1024 * 1024)
        )));
    }

    Ok(upload)
}

/// Trim and parse a user-entered image URL.
pub fn validate_image_url(raw: &str) -> ApiResult<url::Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation("Please enter an image URL.".to_string()));
    }
    url::Url::parse(trimmed)
        .map_err(|_| ApiError::Validation("Please enter a valid URL.".to_string()))
}

// ---------------------------------------------------------------------------
// Multipart
// ---------------------------------------------------------------------------

/// A `multipart/form-data` body with a single `image` part.
#[derive(Debug)]
pub struct MultipartBody {
    pub boundary: String,
    pub bytes: Vec<u8>,
}

impl MultipartBody {
    pub fn image(upload: &ImageUpload) -> Self {
        let boundary = format!("----detwatch{:016x}", rand::random::<u64>());
        Self::with_boundary(upload, boundary)
    }

    fn with_boundary(upload: &ImageUpload, boundary: String) -> Self {
        let file_name: String = upload
            .file_name
            .chars()
            .filter(|c| *c != '\r' && *c != '\n')
            .map(|c| if c == '"' { '\'' } else { c })
            .collect();

        let mut bytes = Vec::with_capacity(upload.bytes.len() + 256);
        bytes.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        bytes.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\n"
            )
            .as_bytes(),
        );
        bytes.extend_from_slice(format!("Content-Type: {}\r\n\r\n", upload.content_type).as_bytes());
        bytes.extend_from_slice(&upload.bytes);
        bytes.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Self { boundary, bytes }
    }

    /// Value for the request's `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const TEN_MIB: u64 = 10 * 1024 * 1024;

    fn png(size: usize) -> ImageUpload {
        ImageUpload::new("cat.png", "image/png", vec![0u8; size])
    }

    fn message(err: ApiError) -> String {
        match err {
            ApiError::Validation(m) => m,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_rejected() {
        assert_eq!(
            message(validate_upload(None, TEN_MIB).unwrap_err()),
            "Please select an image file first."
        );
    }

    #[test]
    fn non_image_is_rejected() {
        let text = ImageUpload::new("notes.txt", "text/plain", b"hello".to_vec());
        assert_eq!(
            message(validate_upload(Some(&text), TEN_MIB).unwrap_err()),
            "Please select a valid image file."
        );
    }

    #[test]
    fn size_limit_is_inclusive() {
        assert!(validate_upload(Some(&png(TEN_MIB as usize)), TEN_MIB).is_ok());
        assert_eq!(
            message(validate_upload(Some(&png(TEN_MIB as usize + 1)), TEN_MIB).unwrap_err()),
            "File size must be less than 10MB."
        );
    }

    #[test]
    fn url_validation() {
        assert_eq!(
            message(validate_image_url("   ").unwrap_err()),
            "Please enter an image URL."
        );
        assert_eq!(
            message(validate_image_url("not a url").unwrap_err()),
            "Please enter a valid URL."
        );
        let url = validate_image_url("  https://example.com/cat.jpg ").unwrap();
        assert_eq!(url.as_str(), "https://example.com/cat.jpg");
    }

    #[test]
    fn multipart_has_single_image_part() {
        let upload = ImageUpload::new("my \"cat\".png", "image/png", vec![1, 2, 3]);
        let body = MultipartBody::with_boundary(&upload, "XYZ".to_string());
        let text = String::from_utf8_lossy(&body.bytes);

        assert!(text.starts_with("--XYZ\r\n"));
        assert!(text.contains("name=\"image\"; filename=\"my 'cat'.png\""));
        assert!(text.contains("Content-Type: image/png\r\n\r\n"));
        assert!(text.ends_with("\r\n--XYZ--\r\n"));
        assert_eq!(body.content_type(), "multipart/form-data; boundary=XYZ");
        assert_eq!(text.matches("Content-Disposition").count(), 1);
    }

    #[test]
    fn random_boundaries_differ() {
        let upload = png(4);
        assert_ne!(
            MultipartBody::image(&upload).boundary,
            MultipartBody::image(&upload).boundary
        );
    }
}
