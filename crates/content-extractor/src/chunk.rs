use std::path::Path;

use crate::{ExtractError, extension_of};

/// Extra field holding a chunk's ordinal within its file.
pub const CHUNK_FIELD: &str = "chunk";

/// Sliding character window used to cut text into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    size: usize,
    overlap: usize,
}

impl ChunkConfig {
    pub fn new(size: usize, overlap: usize) -> Result<Self, ExtractError> {
        if size == 0 {
            return Err(ExtractError::InvalidChunking(
                "chunk size must be greater than zero".into(),
            ));
        }
        if overlap >= size {
            return Err(ExtractError::InvalidChunking(format!(
                "overlap {overlap} must be smaller than chunk size {size}"
            )));
        }
        Ok(Self { size, overlap })
    }

    pub const fn size(&self) -> usize {
        self.size
    }

    pub const fn overlap(&self) -> usize {
        self.overlap
    }

    const fn step(&self) -> usize {
        self.size - self.overlap
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            size: 1000,
            overlap: 150,
        }
    }
}

/// Cut `text` into windows of `size` characters starting every
/// `size - overlap` characters. Windows are trimmed; blank ones are dropped.
pub fn chunk_text(text: &str, cfg: &ChunkConfig) -> Vec<String> {
    // Byte offset of every char boundary, plus the end.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let chars = bounds.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars {
        let end = (start + cfg.size).min(chars);
        let piece = text[bounds[start]..bounds[end]].trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }
        start += cfg.step();
    }
    chunks
}

/// Record type for a file: `code`, `markdown` or `text`.
pub fn kind_for(path: &Path) -> &'static str {
    match extension_of(path).as_deref() {
        Some(
            "rs" | "py" | "js" | "ts" | "go" | "c" | "h" | "cpp" | "hpp" | "java" | "kt" | "cs"
            | "rb" | "sh" | "sql" | "toml" | "json" | "yaml" | "yml",
        ) => "code",
        Some("md" | "markdown" | "rst") => "markdown",
        _ => "text",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(size: usize, overlap: usize) -> ChunkConfig {
        ChunkConfig::new(size, overlap).unwrap()
    }

    #[test]
    fn windows_overlap_by_configured_amount() {
        let text: String = ('a'..='z').collect();
        let chunks = chunk_text(&text, &cfg(10, 3));
        assert_eq!(chunks, ["abcdefghij", "hijklmnopq", "opqrstuvwx", "vwxyz"]);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let chunks = chunk_text("привет мир", &cfg(6, 0));
        assert_eq!(chunks, ["привет", "мир"]);
    }

    #[test]
    fn whitespace_only_windows_are_dropped() {
        let chunks = chunk_text("ab    cd", &cfg(3, 0));
        assert_eq!(chunks, ["ab", "cd"]);
        assert!(chunk_text("", &ChunkConfig::default()).is_empty());
    }

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(chunk_text("  hello  ", &ChunkConfig::default()), ["hello"]);
    }

    #[test]
    fn rejects_degenerate_windows() {
        assert!(ChunkConfig::new(0, 0).is_err());
        assert!(ChunkConfig::new(10, 10).is_err());
        assert!(ChunkConfig::new(10, 9).is_ok());
    }

    #[test]
    fn kinds_follow_extension() {
        assert_eq!(kind_for(Path::new("src/main.RS")), "code");
        assert_eq!(kind_for(Path::new("README.md")), "markdown");
        assert_eq!(kind_for(Path::new("notes.txt")), "text");
        assert_eq!(kind_for(Path::new("Makefile")), "text");
    }
}
