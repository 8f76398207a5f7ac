//! Reads a photographed notice from disk and runs it through OCR.
//!
//! Read-only on the image file: handlers spool uploads into temp files and
//! own their deletion, so nothing here may remove or rewrite the path.

use std::path::Path;

use super::vision::{VisionAnnotation, VisionOcr};
use super::OcrError;

/// Raw OCR output for one notice photograph.
#[derive(Debug, Clone)]
pub struct OcrText {
    pub text: String,
    /// Mean block-level confidence, absent when the service reported none.
    pub confidence: Option<f64>,
    pub elapsed_ms: u64,
}

/// OCR one image file.
///
/// Error split the dashboard relies on: a missing path is `FileNotFound`,
/// an image with zero annotations is `NoTextDetected`, and detected text
/// that is all whitespace is `EmptyText`.
pub fn read_notice_image(client: &dyn VisionOcr, path: &Path) -> Result<OcrText, OcrError> {
    let _span = tracing::info_span!("notice_ocr", path = %path.display()).entered();
    let start = std::time::Instant::now();

    if !path.exists() {
        return Err(OcrError::FileNotFound(path.display().to_string()));
    }
    let image_bytes = std::fs::read(path)?;

    let annotation = client.annotate_image(&image_bytes)?;
    if annotation.text.is_empty() {
        return Err(OcrError::NoTextDetected);
    }
    if annotation.text.trim().is_empty() {
        return Err(OcrError::EmptyText);
    }

    let confidence = mean_block_confidence(&annotation);
    let elapsed_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        text_len = annotation.text.len(),
        confidence = ?confidence,
        elapsed_ms,
        "OCR complete"
    );

    Ok(OcrText {
        text: annotation.text,
        confidence,
        elapsed_ms,
    })
}

/// Mean of the block-level confidences across all pages.
fn mean_block_confidence(annotation: &VisionAnnotation) -> Option<f64> {
    if annotation.block_confidences.is_empty() {
        return None;
    }
    let sum: f64 = annotation.block_confidences.iter().sum();
    Some(sum / annotation.block_confidences.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ocr::vision::MockVisionOcr;
    use std::io::Write;

    fn temp_image(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    #[test]
    fn missing_file_is_file_not_found() {
        let client = MockVisionOcr::new("text");
        let err = read_notice_image(&client, Path::new("/nonexistent/notice.jpg")).unwrap_err();
        assert!(matches!(err, OcrError::FileNotFound(_)));
    }

    #[test]
    fn returns_text_and_mean_confidence() {
        let file = temp_image(b"fake-jpeg-bytes");
        let client = MockVisionOcr::new("ગામ રીબડાના રેવન્યુ સર્વે નં ૩૬૭")
            .with_confidences(vec![0.9, 0.8]);

        let result = read_notice_image(&client, file.path()).unwrap();
        assert!(result.text.contains("રીબડા"));
        let confidence = result.confidence.unwrap();
        assert!((confidence - 0.85).abs() < 1e-9, "mean: {confidence}");
    }

    #[test]
    fn confidence_is_none_without_blocks() {
        let file = temp_image(b"fake-jpeg-bytes");
        let client = MockVisionOcr::new("કંઈક લખાણ");
        let result = read_notice_image(&client, file.path()).unwrap();
        assert_eq!(result.confidence, None);
    }

    #[test]
    fn zero_annotations_is_no_text_detected() {
        let file = temp_image(b"blank-wall-photo");
        let client = MockVisionOcr::new("");
        let err = read_notice_image(&client, file.path()).unwrap_err();
        assert!(matches!(err, OcrError::NoTextDetected));
    }

    #[test]
    fn whitespace_only_text_is_empty_text() {
        let file = temp_image(b"smudged-photo");
        let client = MockVisionOcr::new("  \n\t ");
        let err = read_notice_image(&client, file.path()).unwrap_err();
        assert!(matches!(err, OcrError::EmptyText));
    }

    #[test]
    fn client_errors_propagate() {
        struct FailingOcr;
        impl VisionOcr for FailingOcr {
            fn annotate_image(&self, _image_bytes: &[u8]) -> Result<VisionAnnotation, OcrError> {
                Err(OcrError::VisionApi {
                    status: 7,
                    message: "Permission denied".into(),
                })
            }
        }

        let file = temp_image(b"some-photo");
        let err = read_notice_image(&FailingOcr, file.path()).unwrap_err();
        assert!(matches!(err, OcrError::VisionApi { status: 7, .. }));
    }

    #[test]
    fn source_file_survives_a_successful_read() {
        let file = temp_image(b"fake-jpeg-bytes");
        let client = MockVisionOcr::new("લખાણ મળ્યું");
        read_notice_image(&client, file.path()).unwrap();
        assert!(file.path().exists());
    }
}
