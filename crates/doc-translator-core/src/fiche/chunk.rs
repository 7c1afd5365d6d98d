/// Rough token count: four characters per token.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Recursive splitter: paragraph breaks first, then lines, sentences, words.
pub struct TextChunker {
    target_tokens: usize,
    overlap_tokens: usize,
    separators: [&'static str; 4],
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(1500, 100)
    }
}

impl TextChunker {
    pub fn new(target_tokens: usize, overlap_tokens: usize) -> Self {
        Self {
            target_tokens: target_tokens.max(1),
            overlap_tokens: overlap_tokens.min(target_tokens / 2),
            separators: ["\n\n", "\n", ". ", " "],
        }
    }

    /// Chunks of at most roughly `target_tokens`, blank ones dropped.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, 0)
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()
    }

    fn split_recursive(&self, text: &str, depth: usize) -> Vec<String> {
        if estimate_tokens(text) <= self.target_tokens {
            return vec![text.to_string()];
        }

        let separator = self.separators.get(depth).copied().unwrap_or(" ");
        let mut chunks = Vec::new();
        let mut current = String::new();

        for piece in text.split(separator) {
            let candidate = if current.is_empty() {
                piece.to_string()
            } else {
                format!("{current}{separator}{piece}")
            };

            if estimate_tokens(&candidate) > self.target_tokens && !current.is_empty() {
                let overlap = self.tail(&current).to_string();
                chunks.push(std::mem::take(&mut current));
                current = if overlap.is_empty() {
                    piece.to_string()
                } else {
                    format!("{overlap}{separator}{piece}")
                };
            } else {
                current = candidate;
            }
        }
        if !current.is_empty() {
            chunks.push(current);
        }

        let mut result = Vec::new();
        for chunk in chunks {
            if estimate_tokens(&chunk) > self.target_tokens && depth + 1 < self.separators.len() {
                result.extend(self.split_recursive(&chunk, depth + 1));
            } else {
                result.push(chunk);
            }
        }
        result
    }

    /// Last `overlap_tokens` worth of `text`, starting on a word boundary.
    fn tail<'a>(&self, text: &'a str) -> &'a str {
        let target_chars = self.overlap_tokens * 4;
        if target_chars == 0 {
            return "";
        }
        let char_count = text.chars().count();
        if char_count <= target_chars {
            return text;
        }
        let start = text
            .char_indices()
            .nth(char_count - target_chars)
            .map_or(0, |(i, _)| i);
        let tail = &text[start..];
        tail.find(char::is_whitespace)
            .map_or(tail, |i| tail[i..].trim_start())
    }
}
