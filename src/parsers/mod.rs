pub mod extractor;
pub mod price;

pub use extractor::*;
pub use price::*;

use html_escape::decode_html_entities;

/// Clean and normalize text by removing extra whitespace and decoding HTML entities
pub fn clean_text(text: &str) -> String {
    let decoded = decode_html_entities(text);
    decoded
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Cut `text` to at most `max_chars` characters, never inside a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].trim_end().to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_collapses_whitespace_and_entities() {
        assert_eq!(clean_text("  Coffee&nbsp;&amp;\n\t Tea  "), "Coffee & Tea");
    }

    #[test]
    fn truncate_respects_multibyte_characters() {
        assert_eq!(truncate_chars("ყავის აპარატი", 4), "ყავი");
        assert_eq!(truncate_chars("short", 100), "short");
    }
}
