//! Extraction collaborator: page text and exact-phrase coordinates.
//!
//! Binary format parsing (PDF, DOCX, PPTX) lives behind [`TextExtractor`]. The pipeline only
//! needs two things from it: the `(text, width, height, page_number)` tuples produced at
//! ingestion time, and rectangles for an exact phrase on one page during verification.

mod layout;

pub use layout::LayoutExtractor;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::store::DocumentId;

/// Errors raised by extraction backends.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The document or page is unknown to the extractor.
    #[error("document {document_id} page {page_number:?} is not available")]
    NotFound {
        /// Requested document.
        document_id: DocumentId,
        /// Requested page, when the lookup was page-scoped.
        page_number: Option<u32>,
    },
    /// The file extension is not one of the supported formats.
    #[error("unsupported file format: {0}. Supported: .pdf, .docx, .pptx")]
    UnsupportedFormat(String),
    /// The underlying document could not be opened or parsed.
    #[error("document could not be read: {0}")]
    Unreadable(String),
}

/// Axis-aligned rectangle in page-point coordinates.
///
/// Serialized as `[x0, y0, x1, y1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    /// Left edge.
    pub x0: f64,
    /// Top edge.
    pub y0: f64,
    /// Right edge.
    pub x1: f64,
    /// Bottom edge.
    pub y1: f64,
}

impl From<[f64; 4]> for BoundingBox {
    fn from([x0, y0, x1, y1]: [f64; 4]) -> Self {
        Self { x0, y0, x1, y1 }
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(rect: BoundingBox) -> Self {
        [rect.x0, rect.y0, rect.x1, rect.y1]
    }
}

/// One page of extracted text with its geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedPage {
    /// Raw page text as produced by the extractor.
    pub text: String,
    /// Page width in points.
    pub width: f64,
    /// Page height in points.
    pub height: f64,
    /// 1-indexed page (or slide) number.
    pub page_number: u32,
}

/// Document formats accepted for ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Portable Document Format; geometry comes from each page.
    Pdf,
    /// Word document, extracted as a single page.
    Docx,
    /// PowerPoint deck, one page per slide.
    Pptx,
}

impl DocumentFormat {
    /// Detect the format from a file path's extension (case-insensitive).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ExtractionError> {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "pptx" => Ok(Self::Pptx),
            other => Err(ExtractionError::UnsupportedFormat(format!(".{other}"))),
        }
    }

    /// Fixed page size in points for formats without intrinsic page geometry.
    ///
    /// DOCX uses US Letter (612×792); PPTX uses a 10×7.5 inch slide (720×540). PDF pages
    /// carry their own size, so this returns `None`.
    pub fn default_page_size(self) -> Option<(f64, f64)> {
        match self {
            Self::Pdf => None,
            Self::Docx => Some((612.0, 792.0)),
            Self::Pptx => Some((720.0, 540.0)),
        }
    }
}

/// Text extraction and coordinate search over stored documents.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract every non-empty page of a document.
    async fn extract_pages(
        &self,
        document_id: DocumentId,
    ) -> Result<Vec<ExtractedPage>, ExtractionError>;

    /// Locate every occurrence of `phrase` on one page.
    ///
    /// Returns an empty list when the phrase does not occur.
    async fn search_text(
        &self,
        document_id: DocumentId,
        page_number: u32,
        phrase: &str,
    ) -> Result<Vec<BoundingBox>, ExtractionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_detection_is_case_insensitive() {
        assert_eq!(
            DocumentFormat::from_path("notes/Lecture.PDF").unwrap(),
            DocumentFormat::Pdf
        );
        assert_eq!(
            DocumentFormat::from_path("a.docx").unwrap(),
            DocumentFormat::Docx
        );
        assert_eq!(
            DocumentFormat::from_path("deck.pptx").unwrap(),
            DocumentFormat::Pptx
        );
    }

    #[test]
    fn unsupported_format_is_rejected() {
        let error = DocumentFormat::from_path("archive.zip").unwrap_err();
        assert!(matches!(error, ExtractionError::UnsupportedFormat(ext) if ext == ".zip"));
        assert!(DocumentFormat::from_path("no_extension").is_err());
    }

    #[test]
    fn default_page_sizes() {
        assert_eq!(DocumentFormat::Pdf.default_page_size(), None);
        assert_eq!(
            DocumentFormat::Docx.default_page_size(),
            Some((612.0, 792.0))
        );
        assert_eq!(
            DocumentFormat::Pptx.default_page_size(),
            Some((720.0, 540.0))
        );
    }

    #[test]
    fn bounding_box_serializes_as_array() {
        let rect = BoundingBox {
            x0: 1.0,
            y0: 2.0,
            x1: 3.5,
            y1: 4.0,
        };
        let json = serde_json::to_string(&rect).unwrap();
        assert_eq!(json, "[1.0,2.0,3.5,4.0]");
        let back: BoundingBox = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rect);
    }
}
