//! Fixed-pitch extractor over registered plain text.
//!
//! Each page is laid out as monospaced lines: a 72pt margin, 6pt per character and 12pt
//! per line. Phrase search is case-insensitive and lets a single space in the phrase match a
//! line break in the source, so quotes that wrap across lines still resolve to one rectangle
//! per line segment.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{BoundingBox, DocumentFormat, ExtractedPage, ExtractionError, TextExtractor};
use crate::processing::normalize::fold_char;
use crate::store::DocumentId;

const MARGIN: f64 = 72.0;
const CHAR_WIDTH: f64 = 6.0;
const LINE_HEIGHT: f64 = 12.0;
const LETTER: (f64, f64) = (612.0, 792.0);

/// In-process [`TextExtractor`] backed by registered page text.
#[derive(Default)]
pub struct LayoutExtractor {
    documents: RwLock<BTreeMap<DocumentId, BTreeMap<u32, ExtractedPage>>>,
}

impl LayoutExtractor {
    /// Create an extractor with no registered documents.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a single page.
    pub fn add_page(&self, document_id: DocumentId, page: ExtractedPage) {
        if let Ok(mut documents) = self.documents.write() {
            documents
                .entry(document_id)
                .or_default()
                .insert(page.page_number, page);
        }
    }

    /// Register a document from its text blocks according to `format`.
    ///
    /// - DOCX: blocks are paragraphs joined into one page.
    /// - PPTX: each block is a slide; blank slides are skipped but keep their numbering.
    /// - PDF: each block is a page, blank pages included, on US Letter geometry.
    pub fn add_document(
        &self,
        document_id: DocumentId,
        format: DocumentFormat,
        blocks: Vec<String>,
    ) {
        let (width, height) = format.default_page_size().unwrap_or(LETTER);
        match format {
            DocumentFormat::Docx => {
                let paragraphs: Vec<String> = blocks
                    .into_iter()
                    .filter(|block| !block.trim().is_empty())
                    .collect();
                if paragraphs.is_empty() {
                    return;
                }
                self.add_page(
                    document_id,
                    ExtractedPage {
                        text: paragraphs.join("\n"),
                        width,
                        height,
                        page_number: 1,
                    },
                );
            }
            DocumentFormat::Pptx | DocumentFormat::Pdf => {
                for (index, text) in blocks.into_iter().enumerate() {
                    if format == DocumentFormat::Pptx && text.trim().is_empty() {
                        continue;
                    }
                    self.add_page(
                        document_id,
                        ExtractedPage {
                            text,
                            width,
                            height,
                            page_number: index as u32 + 1,
                        },
                    );
                }
            }
        }
    }

    fn page(
        &self,
        document_id: DocumentId,
        page_number: u32,
    ) -> Result<ExtractedPage, ExtractionError> {
        let documents = self
            .documents
            .read()
            .map_err(|_| ExtractionError::Unreadable("layout registry lock poisoned".into()))?;
        documents
            .get(&document_id)
            .and_then(|pages| pages.get(&page_number))
            .cloned()
            .ok_or(ExtractionError::NotFound {
                document_id,
                page_number: Some(page_number),
            })
    }
}

/// A searchable character and its `(line, column)` position; `None` marks a line break.
type Cell = (char, Option<(usize, usize)>);

fn layout_cells(text: &str) -> Vec<Cell> {
    let mut cells = Vec::with_capacity(text.len());
    for (line, content) in text.split('\n').enumerate() {
        if line > 0 {
            cells.push((' ', None));
        }
        let content = content.strip_suffix('\r').unwrap_or(content);
        for (column, ch) in content.chars().enumerate() {
            cells.push((fold_char(ch), Some((line, column))));
        }
    }
    cells
}

fn segment_rect(line: usize, first_column: usize, last_column: usize) -> BoundingBox {
    let y0 = MARGIN + line as f64 * LINE_HEIGHT;
    BoundingBox {
        x0: MARGIN + first_column as f64 * CHAR_WIDTH,
        y0,
        x1: MARGIN + (last_column + 1) as f64 * CHAR_WIDTH,
        y1: y0 + LINE_HEIGHT,
    }
}

/// Split one occurrence into per-line rectangles.
fn occurrence_rects(cells: &[Cell]) -> Vec<BoundingBox> {
    let mut rects = Vec::new();
    let mut current: Option<(usize, usize, usize)> = None;
    for (_, position) in cells {
        match (position, current) {
            (Some((line, column)), Some((open_line, first, _))) if *line == open_line => {
                current = Some((open_line, first, *column));
            }
            (Some((line, column)), previous) => {
                if let Some((open_line, first, last)) = previous {
                    rects.push(segment_rect(open_line, first, last));
                }
                current = Some((*line, *column, *column));
            }
            (None, _) => {}
        }
    }
    if let Some((line, first, last)) = current {
        rects.push(segment_rect(line, first, last));
    }
    rects
}

/// Find every non-overlapping occurrence of `phrase` in `text` and map it to rectangles.
pub(crate) fn locate_phrase(text: &str, phrase: &str) -> Vec<BoundingBox> {
    let needle: Vec<char> = phrase.chars().map(fold_char).collect();
    if needle.is_empty() {
        return Vec::new();
    }
    let cells = layout_cells(text);
    if cells.len() < needle.len() {
        return Vec::new();
    }

    let mut rects = Vec::new();
    let mut start = 0;
    while start + needle.len() <= cells.len() {
        let window = &cells[start..start + needle.len()];
        if window.iter().zip(&needle).all(|((ch, _), want)| ch == want) {
            rects.extend(occurrence_rects(window));
            start += needle.len();
        } else {
            start += 1;
        }
    }
    rects
}

#[async_trait]
impl TextExtractor for LayoutExtractor {
    async fn extract_pages(
        &self,
        document_id: DocumentId,
    ) -> Result<Vec<ExtractedPage>, ExtractionError> {
        let documents = self
            .documents
            .read()
            .map_err(|_| ExtractionError::Unreadable("layout registry lock poisoned".into()))?;
        documents
            .get(&document_id)
            .map(|pages| pages.values().cloned().collect())
            .ok_or(ExtractionError::NotFound {
                document_id,
                page_number: None,
            })
    }

    async fn search_text(
        &self,
        document_id: DocumentId,
        page_number: u32,
        phrase: &str,
    ) -> Result<Vec<BoundingBox>, ExtractionError> {
        let page = self.page(document_id, page_number)?;
        let rects = locate_phrase(&page.text, phrase);
        tracing::trace!(
            document_id,
            page_number,
            matches = rects.len(),
            "Layout phrase search"
        );
        Ok(rects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_match_produces_one_rect() {
        let rects = locate_phrase("The mitochondria is the powerhouse.", "mitochondria");
        assert_eq!(
            rects,
            vec![BoundingBox {
                x0: MARGIN + 4.0 * CHAR_WIDTH,
                y0: MARGIN,
                x1: MARGIN + 16.0 * CHAR_WIDTH,
                y1: MARGIN + LINE_HEIGHT,
            }]
        );
    }

    #[test]
    fn search_is_case_insensitive_and_finds_every_occurrence() {
        let rects = locate_phrase("Cell wall. CELL membrane. cell", "cell");
        assert_eq!(rects.len(), 3);
    }

    #[test]
    fn wrapped_phrase_yields_rect_per_line() {
        let rects = locate_phrase("alpha beta\ngamma delta", "beta gamma");
        assert_eq!(rects.len(), 2);
        assert_eq!(rects[0].y0, MARGIN);
        assert_eq!(rects[1].y0, MARGIN + LINE_HEIGHT);
        assert_eq!(rects[1].x0, MARGIN);
    }

    #[test]
    fn doubled_whitespace_does_not_match() {
        assert!(locate_phrase("alpha beta", "alpha  beta").is_empty());
        assert!(locate_phrase("alpha beta", "").is_empty());
    }

    #[tokio::test]
    async fn unknown_page_is_not_found() {
        let extractor = LayoutExtractor::new();
        let error = extractor.search_text(1, 1, "x").await.unwrap_err();
        assert!(matches!(
            error,
            ExtractionError::NotFound {
                document_id: 1,
                page_number: Some(1)
            }
        ));
        assert!(extractor.extract_pages(1).await.is_err());
    }

    #[tokio::test]
    async fn docx_is_collapsed_into_one_page() {
        let extractor = LayoutExtractor::new();
        extractor.add_document(
            3,
            DocumentFormat::Docx,
            vec!["First.".into(), "  ".into(), "Second.".into()],
        );
        let pages = extractor.extract_pages(3).await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].text, "First.\nSecond.");
        assert_eq!((pages[0].width, pages[0].height), (612.0, 792.0));
    }

    #[tokio::test]
    async fn pptx_skips_blank_slides_but_keeps_numbering() {
        let extractor = LayoutExtractor::new();
        extractor.add_document(
            4,
            DocumentFormat::Pptx,
            vec!["Title".into(), "".into(), "Summary".into()],
        );
        let pages = extractor.extract_pages(4).await.unwrap();
        let numbers: Vec<u32> = pages.iter().map(|page| page.page_number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(pages[0].width, 720.0);
    }
}
