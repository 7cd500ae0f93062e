use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::loader::Document;

/// A bounded text segment, the atomic retrieval and citation unit.
///
/// Chunks are exact substrings of the document's concatenated page text, so
/// `start_offset` (in characters) plus the text length fully locates a chunk
/// in the original.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub text: String,
    pub source_file: String,
    /// Page holding the chunk's first character, 1-based.
    pub page_number: usize,
    /// Reading-order position within the document.
    pub chunk_index: usize,
    /// Character offset into the concatenated document text.
    pub start_offset: usize,
}

/// Splits document text into overlapping chunks, preferring paragraph and
/// sentence boundaries over hard character cuts.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

const PAGE_SEPARATOR: &str = "\n\n";

impl TextChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap: chunk_overlap.min(chunk_size.saturating_sub(1)),
        }
    }

    pub fn chunk_document(&self, document: &Document) -> Vec<DocumentChunk> {
        // Concatenate pages, remembering where each page starts so chunks
        // can be attributed to the page of their first character.
        let mut text = String::new();
        let mut page_starts: Vec<(usize, usize)> = Vec::with_capacity(document.pages.len());
        for (idx, page) in document.pages.iter().enumerate() {
            if idx > 0 {
                text.push_str(PAGE_SEPARATOR);
            }
            page_starts.push((text.chars().count(), page.number));
            text.push_str(&page.text);
        }

        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        if total == 0 {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut start = 0usize;
        let mut chunk_index = 0usize;

        loop {
            let hard_end = (start + self.chunk_size).min(total);
            let end = if hard_end < total {
                find_breakpoint(&chars, start, hard_end)
            } else {
                hard_end
            };

            chunks.push(DocumentChunk {
                id: Uuid::new_v4().to_string(),
                text: chars[start..end].iter().collect(),
                source_file: document.file_name.clone(),
                page_number: page_for_offset(&page_starts, start),
                chunk_index,
                start_offset: start,
            });

            if end >= total {
                break;
            }

            start = end.saturating_sub(self.chunk_overlap).max(start + 1);
            chunk_index += 1;
        }

        chunks
    }
}

/// Picks a split point at or before `hard_end`, searching the tail of the
/// window for a paragraph break, then a sentence ending, then whitespace.
/// Falls back to the hard character cut when the window has no boundary.
fn find_breakpoint(chars: &[char], start: usize, hard_end: usize) -> usize {
    let window = hard_end - start;
    let search_floor = start + window / 2;

    if let Some(pos) = rfind_pair(chars, search_floor, hard_end, |a, b| a == '\n' && b == '\n') {
        return pos + 2;
    }

    if let Some(pos) = rfind_pair(chars, search_floor, hard_end, |a, b| {
        matches!(a, '.' | '!' | '?') && (b == ' ' || b == '\n')
    }) {
        return pos + 2;
    }

    for pos in (search_floor..hard_end).rev() {
        if chars[pos].is_whitespace() {
            return pos + 1;
        }
    }

    hard_end
}

/// Rightmost index `i` in `[floor, end - 1)` where `pred(chars[i], chars[i+1])`.
fn rfind_pair(
    chars: &[char],
    floor: usize,
    end: usize,
    pred: impl Fn(char, char) -> bool,
) -> Option<usize> {
    if end < floor + 2 {
        return None;
    }
    (floor..end - 1).rev().find(|&i| pred(chars[i], chars[i + 1]))
}

fn page_for_offset(page_starts: &[(usize, usize)], offset: usize) -> usize {
    page_starts
        .iter()
        .take_while(|(page_start, _)| *page_start <= offset)
        .last()
        .map(|(_, number)| *number)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, Page};

    fn doc_with_pages(pages: &[&str]) -> Document {
        Document {
            file_name: "test.pdf".to_string(),
            pages: pages
                .iter()
                .enumerate()
                .map(|(idx, text)| Page {
                    number: idx + 1,
                    text: text.to_string(),
                })
                .collect(),
        }
    }

    /// Rebuilds the original text from the chunks by skipping each chunk's
    /// overlap with the portion already emitted.
    fn reconstruct(chunks: &[DocumentChunk]) -> String {
        let mut out: Vec<char> = Vec::new();
        for chunk in chunks {
            let chunk_chars: Vec<char> = chunk.text.chars().collect();
            let skip = out.len() - chunk.start_offset;
            out.extend(chunk_chars.into_iter().skip(skip));
        }
        out.into_iter().collect()
    }

    #[test]
    fn short_document_yields_single_chunk() {
        let chunker = TextChunker::new(1000, 200);
        let doc = doc_with_pages(&["Administer aspirin 300mg for chest pain."]);

        let chunks = chunker.chunk_document(&doc);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].page_number, 1);
        assert_eq!(chunks[0].start_offset, 0);
        assert_eq!(chunks[0].text, "Administer aspirin 300mg for chest pain.");
    }

    #[test]
    fn empty_document_yields_no_chunks() {
        let chunker = TextChunker::new(100, 20);
        let doc = doc_with_pages(&[]);
        assert!(chunker.chunk_document(&doc).is_empty());
    }

    #[test]
    fn chunks_reconstruct_original_text() {
        let chunker = TextChunker::new(120, 30);
        let text = "The patient should be assessed on arrival. Vital signs are recorded every fifteen minutes. \
                    Escalate to the senior clinician when systolic pressure falls below ninety. \
                    Document every intervention in the resuscitation record without delay."
            .to_string();
        let doc = doc_with_pages(&[&text]);

        let chunks = chunker.chunk_document(&doc);
        assert!(chunks.len() > 1);
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn chunks_never_exceed_chunk_size() {
        let chunker = TextChunker::new(80, 16);
        let text = "word ".repeat(200);
        let doc = doc_with_pages(&[&text]);

        for chunk in chunker.chunk_document(&doc) {
            assert!(chunk.text.chars().count() <= 80);
        }
    }

    #[test]
    fn adjacent_chunks_overlap() {
        let chunker = TextChunker::new(100, 25);
        let text = "Sentence one here. ".repeat(40);
        let doc = doc_with_pages(&[&text]);

        let chunks = chunker.chunk_document(&doc);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let prev_end = pair[0].start_offset + pair[0].text.chars().count();
            assert!(pair[1].start_offset < prev_end);
        }
    }

    #[test]
    fn unbroken_text_falls_back_to_hard_cut() {
        let chunker = TextChunker::new(50, 10);
        let text = "x".repeat(140);
        let doc = doc_with_pages(&[&text]);

        let chunks = chunker.chunk_document(&doc);
        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].text.chars().count(), 50);
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn chunks_record_their_source_page() {
        let page_one = "a".repeat(60);
        let page_two = "b".repeat(60);
        let chunker = TextChunker::new(50, 10);
        let doc = doc_with_pages(&[&page_one, &page_two]);

        let chunks = chunker.chunk_document(&doc);
        assert_eq!(chunks.first().unwrap().page_number, 1);
        assert_eq!(chunks.last().unwrap().page_number, 2);
        for pair in chunks.windows(2) {
            assert!(pair[0].page_number <= pair[1].page_number);
        }
    }

    #[test]
    fn prefers_sentence_boundaries() {
        let chunker = TextChunker::new(60, 10);
        let text = "First sentence of the protocol is right here. Second sentence follows with more detail. Third one closes it.";
        let doc = doc_with_pages(&[text]);

        let chunks = chunker.chunk_document(&doc);
        assert!(chunks.len() > 1);
        // The first split should land just after a sentence ending, not mid-word.
        assert!(chunks[0].text.trim_end().ends_with('.'));
    }
}
