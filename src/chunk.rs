//! Markdown-aware note chunker.
//!
//! Splits a note body into chunks that respect a size limit derived from
//! `chunking.max_tokens`. Splitting prefers ATX heading boundaries, then
//! paragraph boundaries within a section, so each chunk stays topically
//! coherent. Every chunk carries a SHA-256 hash of its text.

use crate::fingerprint::fingerprint_bytes;
use crate::models::NoteChunk;

/// Approximate chars-per-token ratio.
const CHARS_PER_TOKEN: usize = 4;

/// Split a note body into chunks.
///
/// Returns at least one chunk (a single empty chunk for an empty body) so
/// every indexed note is retrievable.
pub fn chunk_note(text: &str, max_tokens: usize) -> Vec<NoteChunk> {
    let max_chars = max_tokens * CHARS_PER_TOKEN;

    if text.trim().is_empty() {
        return vec![make_chunk("")];
    }

    let mut chunks = Vec::new();
    for section in split_sections(text) {
        pack_section(&section, max_chars, &mut chunks);
    }

    if chunks.is_empty() {
        chunks.push(make_chunk(text.trim()));
    }

    chunks
}

/// Split a note at ATX heading lines. The heading stays with the text
/// that follows it.
fn split_sections(text: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if is_heading(line) && !current.trim().is_empty() {
            sections.push(std::mem::take(&mut current));
        }
        current.push_str(line);
        current.push('\n');
    }
    if !current.trim().is_empty() {
        sections.push(current);
    }

    sections
}

fn is_heading(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with('#') && trimmed.trim_start_matches('#').starts_with(' ')
}

/// Pack one section into chunks: accumulate paragraphs up to the limit,
/// hard-splitting any single paragraph that exceeds it on its own.
fn pack_section(section: &str, max_chars: usize, chunks: &mut Vec<NoteChunk>) {
    let mut buf = String::new();

    for para in section.split("\n\n") {
        let trimmed = para.trim();
        if trimmed.is_empty() {
            continue;
        }

        let would_be = if buf.is_empty() {
            trimmed.len()
        } else {
            buf.len() + 2 + trimmed.len()
        };

        if would_be > max_chars && !buf.is_empty() {
            chunks.push(make_chunk(&buf));
            buf.clear();
        }

        if trimmed.len() > max_chars {
            if !buf.is_empty() {
                chunks.push(make_chunk(&buf));
                buf.clear();
            }
            hard_split(trimmed, max_chars, chunks);
        } else {
            if !buf.is_empty() {
                buf.push_str("\n\n");
            }
            buf.push_str(trimmed);
        }
    }

    if !buf.is_empty() {
        chunks.push(make_chunk(&buf));
    }
}

/// Split an oversized paragraph at newline or space boundaries where
/// possible, at the hard limit otherwise. The hard limit is floored to a
/// char boundary so multibyte text never splits mid-character.
fn hard_split(text: &str, max_chars: usize, chunks: &mut Vec<NoteChunk>) {
    let mut remaining = text;
    while !remaining.is_empty() {
        let split_at = if remaining.len() <= max_chars {
            remaining.len()
        } else {
            let mut limit = floor_char_boundary(remaining, max_chars);
            if limit == 0 {
                // A single char wider than the window still moves forward.
                limit = remaining
                    .chars()
                    .next()
                    .map(char::len_utf8)
                    .unwrap_or(remaining.len());
            }
            remaining[..limit]
                .rfind('\n')
                .or_else(|| remaining[..limit].rfind(' '))
                .map(|pos| pos + 1)
                .unwrap_or(limit)
        };
        chunks.push(make_chunk(remaining[..split_at].trim()));
        remaining = &remaining[split_at..];
    }
}

/// The largest char boundary at or below `index`.
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn make_chunk(text: &str) -> NoteChunk {
    NoteChunk {
        text: text.to_string(),
        hash: fingerprint_bytes(text.as_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_note_single_chunk() {
        let chunks = chunk_note("Burp the baby upright.", 700);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Burp the baby upright.");
    }

    #[test]
    fn test_empty_note() {
        let chunks = chunk_note("", 700);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "");
    }

    #[test]
    fn test_headings_start_new_chunks() {
        let text = "# Feeding\n\nFeed every three hours.\n\n# Sleep\n\nBack to sleep, always.";
        let chunks = chunk_note(text, 700);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.contains("Feeding"));
        assert!(chunks[1].text.contains("Sleep"));
    }

    #[test]
    fn test_paragraphs_packed_within_section() {
        let text = "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.";
        let chunks = chunk_note(text, 700);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.contains("First paragraph."));
        assert!(chunks[0].text.contains("Third paragraph."));
    }

    #[test]
    fn test_oversized_paragraph_hard_split() {
        // max_tokens=5 => max_chars=20
        let text = "word ".repeat(30);
        let chunks = chunk_note(&text, 5);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.text.len() <= 20, "chunk too long: {:?}", c.text);
        }
    }

    #[test]
    fn test_multibyte_paragraph_hard_split() {
        // max_tokens=5 => max_chars=20; each char is 3 bytes and there is
        // no space or newline to split at, so the hard limit lands mid-char
        // unless it is floored to a boundary.
        let text = "あ".repeat(40);
        let chunks = chunk_note(&text, 5);
        assert!(chunks.len() > 1);
        let rejoined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(rejoined, text);
        for c in &chunks {
            assert!(!c.text.is_empty());
            assert!(c.text.len() <= 20, "chunk too long: {:?}", c.text);
        }
    }

    #[test]
    fn test_multibyte_mixed_with_spaces() {
        let text = format!("emoji 🚀🚀🚀🚀🚀🚀 {} end", "子".repeat(30));
        let chunks = chunk_note(&text, 5);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(!c.text.is_empty());
        }
    }

    #[test]
    fn test_deterministic_hashes() {
        let text = "# Alpha\n\nBeta\n\n# Gamma\n\nDelta";
        let c1 = chunk_note(text, 5);
        let c2 = chunk_note(text, 5);
        assert_eq!(c1.len(), c2.len());
        for (a, b) in c1.iter().zip(c2.iter()) {
            assert_eq!(a.text, b.text);
            assert_eq!(a.hash, b.hash);
        }
    }

    #[test]
    fn test_hash_tracks_text() {
        let chunks = chunk_note("some note text", 700);
        assert_eq!(
            chunks[0].hash,
            fingerprint_bytes("some note text".as_bytes())
        );
    }
}
