//! Multipart upload handling for notice images.
//!
//! Uploads are staged to a `NamedTempFile` so the blocking pipeline can
//! read them from disk; the file is deleted when the handle drops,
//! whether processing succeeded or not.

use std::io::Write;

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;
use tempfile::NamedTempFile;

use crate::api::error::ApiError;
use crate::config::MAX_UPLOAD_BYTES;

/// Pull the notice image out of a multipart request and stage it to disk.
///
/// The image travels under the field name `image` (the dashboard) or
/// `file` (curl habits); other fields are ignored.
pub async fn staged_image(multipart: &mut Multipart) -> Result<NamedTempFile, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(read_error)? {
        let name = field.name().unwrap_or("").to_string();
        if name == "image" || name == "file" {
            let bytes = field.bytes().await.map_err(read_error)?;
            return stage_image_bytes(&bytes);
        }
    }
    Err(ApiError::BadRequest(
        "No image field in upload; use field name 'image'".into(),
    ))
}

fn read_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::BadRequest(format!("Failed to read upload: {err}"))
    }
}

/// Write image bytes to a temp file named after the detected format.
fn stage_image_bytes(bytes: &[u8]) -> Result<NamedTempFile, ApiError> {
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Uploaded image is empty".into()));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ApiError::PayloadTooLarge);
    }

    let extension = detect_extension(bytes);
    let mut staged = tempfile::Builder::new()
        .prefix("notice-")
        .suffix(&format!(".{extension}"))
        .tempfile()
        .map_err(|e| ApiError::Internal(format!("Could not stage upload: {e}")))?;
    staged
        .write_all(bytes)
        .map_err(|e| ApiError::Internal(format!("Could not stage upload: {e}")))?;
    Ok(staged)
}

/// Detect file extension from magic bytes.
fn detect_extension(bytes: &[u8]) -> &'static str {
    if bytes.len() >= 3 && bytes[0..3] == [0xFF, 0xD8, 0xFF] {
        "jpg"
    } else if bytes.len() >= 8 && bytes[0..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
        "png"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "webp"
    } else {
        "bin"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_common_image_formats() {
        assert_eq!(detect_extension(&[0xFF, 0xD8, 0xFF, 0xE0]), "jpg");
        assert_eq!(
            detect_extension(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
            "png"
        );

        let mut webp = Vec::from(*b"RIFF");
        webp.extend_from_slice(&[0x24, 0x00, 0x00, 0x00]);
        webp.extend_from_slice(b"WEBPVP8 ");
        assert_eq!(detect_extension(&webp), "webp");

        assert_eq!(detect_extension(b"plain text"), "bin");
    }

    #[test]
    fn staged_file_carries_the_bytes_and_extension() {
        let bytes = [0xFF, 0xD8, 0xFF, 0xE0, 0x01, 0x02];
        let staged = stage_image_bytes(&bytes).unwrap();
        assert!(staged.path().to_string_lossy().ends_with(".jpg"));
        assert_eq!(std::fs::read(staged.path()).unwrap(), bytes);
    }

    #[test]
    fn staged_file_is_removed_on_drop() {
        let staged = stage_image_bytes(&[0xFF, 0xD8, 0xFF, 0x00]).unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());
        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn empty_upload_is_rejected() {
        assert!(matches!(
            stage_image_bytes(&[]),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn oversized_upload_is_rejected() {
        let bytes = vec![0u8; MAX_UPLOAD_BYTES + 1];
        assert!(matches!(
            stage_image_bytes(&bytes),
            Err(ApiError::PayloadTooLarge)
        ));
    }
}
