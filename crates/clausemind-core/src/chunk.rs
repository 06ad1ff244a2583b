//! Document chunking for embedding
//!
//! Splits extracted document text into overlapping, size-bounded passages.
//! Chunking is deterministic: identical input and parameters always produce
//! the same boundaries in the same order.

use crate::config::ChunkingConfig;
use crate::error::{ClauseMindError, Result};
use serde::{Deserialize, Serialize};

/// A bounded, overlap-aware passage of a source document.
///
/// Identity is `(document_id, seq)`; chunks are immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub document_id: String,
    /// Sequence index within the document, for ordering and overlap reconstruction
    pub seq: u32,
    pub text: String,
    /// Byte-offset span within the source text
    pub span: (usize, usize),
    /// 1-based page number, when the source had page structure
    pub page: Option<u32>,
}

/// Chunk identity used for citations
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkId {
    pub document_id: String,
    pub seq: u32,
}

impl Chunk {
    pub fn id(&self) -> ChunkId {
        ChunkId {
            document_id: self.document_id.clone(),
            seq: self.seq,
        }
    }
}

/// Find a valid char boundary at or before the given byte index
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Find a valid char boundary at or after the given byte index
fn ceil_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

fn validate(config: &ChunkingConfig) -> Result<()> {
    if config.chunk_size == 0 {
        return Err(ClauseMindError::Configuration(
            "chunk_size must be positive".to_string(),
        ));
    }
    if config.chunk_overlap >= config.chunk_size {
        return Err(ClauseMindError::Configuration(format!(
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            config.chunk_overlap, config.chunk_size
        )));
    }
    Ok(())
}

/// Split document text into overlapping chunks.
///
/// Prefers paragraph, sentence, newline, then word breaks in the last 30%
/// of the window before falling back to a hard cut at a char boundary.
/// Empty or whitespace-only input yields an empty sequence.
pub fn chunk_text(document_id: &str, text: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>> {
    validate(config)?;

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let chunk_size = config.chunk_size;
    let overlap = config.chunk_overlap;

    if text.len() <= chunk_size {
        return Ok(vec![Chunk {
            document_id: document_id.to_string(),
            seq: 0,
            text: text.to_string(),
            span: (0, text.len()),
            page: None,
        }]);
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut seq = 0u32;

    while start < text.len() {
        let raw_end = (start + chunk_size).min(text.len());
        let end = floor_char_boundary(text, raw_end);
        let mut chunk_end = end;

        // Find natural break point in last 30%
        if end < text.len() {
            let search_start_raw = start + (chunk_size * 70 / 100);
            let search_start = ceil_char_boundary(text, search_start_raw);

            if search_start < end {
                let search_region = &text[search_start..end];

                if let Some(pos) = search_region.rfind("\n\n") {
                    chunk_end = search_start + pos + 2;
                } else if let Some(pos) = search_region.rfind(". ") {
                    chunk_end = search_start + pos + 2;
                } else if let Some(pos) = search_region.rfind('\n') {
                    chunk_end = search_start + pos + 1;
                } else if let Some(pos) = search_region.rfind(' ') {
                    chunk_end = search_start + pos + 1;
                }
            }
        }

        chunk_end = floor_char_boundary(text, chunk_end);
        // A window narrower than one multibyte character would floor back to
        // `start` and emit nothing; always take at least one full character.
        chunk_end = chunk_end.max(ceil_char_boundary(text, start + 1));

        chunks.push(Chunk {
            document_id: document_id.to_string(),
            seq,
            text: text[start..chunk_end].to_string(),
            span: (start, chunk_end),
            page: None,
        });
        seq += 1;

        if chunk_end >= text.len() {
            break;
        }

        let new_start_raw = chunk_end.saturating_sub(overlap);
        let next = ceil_char_boundary(text, new_start_raw);
        // A natural break landing early combined with a large overlap could
        // stall the window; always advance past the previous start.
        start = if next > start {
            next
        } else {
            ceil_char_boundary(text, start + 1)
        };
    }

    Ok(chunks)
}

/// Chunk a page-structured document, tagging each chunk with its page number.
///
/// Sequence indices run across the whole document so chunk identity stays
/// unique; spans are offsets within the owning page.
pub fn chunk_pages(
    document_id: &str,
    pages: &[String],
    config: &ChunkingConfig,
) -> Result<Vec<Chunk>> {
    validate(config)?;

    let mut chunks = Vec::new();
    let mut seq = 0u32;
    for (page_idx, page) in pages.iter().enumerate() {
        for mut chunk in chunk_text(document_id, page, config)? {
            chunk.seq = seq;
            chunk.page = Some(page_idx as u32 + 1);
            seq += 1;
            chunks.push(chunk);
        }
    }
    Ok(chunks)
}
