//! Paragraph-boundary text chunker and content addressing.
//!
//! [`split_chunks`] greedily packs normalized paragraphs into chunks of
//! at most `max_chars` characters. A paragraph is never split across
//! chunks: if a single paragraph exceeds the limit it is emitted whole
//! as its own chunk, trading the strict size bound for paragraph
//! integrity.
//!
//! [`content_id`] derives the stored record id from the chunk text
//! alone, so re-ingesting unchanged content always produces the same id.

use sha2::{Digest, Sha256};

use crate::normalize::normalize;

/// Modulus applied to the truncated content hash.
///
/// Together with the hash algorithm (SHA-256, first 4 bytes) this pins
/// the id scheme: changing either re-addresses every stored record and
/// is a breaking migration, not a tuning knob.
pub const ID_MODULUS: u64 = 1_000_000_000;

/// Content address of a chunk: the first 32 bits of the SHA-256 digest
/// of the text's UTF-8 bytes, reduced modulo [`ID_MODULUS`].
///
/// Pure and deterministic in the text alone — neither the source file
/// nor the embedding participates.
pub fn content_id(text: &str) -> i64 {
    let digest = Sha256::digest(text.as_bytes());
    let head = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    (u64::from(head) % ID_MODULUS) as i64
}

/// Split normalized text into chunks on paragraph (line) boundaries.
///
/// Paragraphs accumulate into a buffer joined by single newlines while
/// the buffer's character count plus `1 + paragraph` characters stays
/// within `max_chars` (characters, not bytes — multi-byte text packs
/// the same as ASCII); on overflow the buffer is emitted and the
/// overflowing paragraph starts the next one. Chunks come out in
/// document order, though nothing downstream relies on that order
/// surviving storage.
pub fn split_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let text = normalize(text);
    let mut chunks = Vec::new();
    let mut buf = String::new();
    let mut buf_chars = 0usize;

    for paragraph in text.lines() {
        if paragraph.is_empty() {
            continue;
        }
        let paragraph_chars = paragraph.chars().count();

        if buf.is_empty() {
            buf.push_str(paragraph);
            buf_chars = paragraph_chars;
            continue;
        }

        if buf_chars + 1 + paragraph_chars <= max_chars {
            buf.push('\n');
            buf.push_str(paragraph);
            buf_chars += 1 + paragraph_chars;
        } else {
            chunks.push(std::mem::take(&mut buf));
            buf.push_str(paragraph);
            buf_chars = paragraph_chars;
        }
    }

    if !buf.is_empty() {
        chunks.push(buf);
    }

    chunks
}
