/// Fenced code block extraction
///
/// Generated text frequently interleaves prose with triple-backtick
/// fenced code. This module splits such text into a narrative remainder
/// and an ordered list of code blocks so consumers can render or store
/// them separately.
///
/// A fence opens at ``` followed by an optional ASCII word tag and a
/// required newline, and closes at the next ``` anywhere in the text.
/// Anything that does not form a complete fence pair, including an
/// unterminated opening fence, stays in the narrative.
///
/// # Example
///
/// ```
/// use gengate_shared::codeblocks::extract_code_blocks;
///
/// let text = "Use this:\n```rust\nfn main() {}\n```\nThat is all.";
/// let extracted = extract_code_blocks(text);
///
/// assert_eq!(extracted.blocks.len(), 1);
/// assert_eq!(extracted.blocks[0].language, "rust");
/// assert_eq!(extracted.blocks[0].code, "fn main() {}");
/// assert_eq!(extracted.narrative, "Use this:\n\nThat is all.");
/// ```

use serde::{Deserialize, Serialize};

/// A single fenced code block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    /// Language tag from the opening fence, or "plaintext" when untagged
    pub language: String,

    /// Block content with surrounding whitespace trimmed
    pub code: String,
}

/// Result of splitting generated text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedContent {
    /// Input text with all complete fence pairs removed, trimmed
    pub narrative: String,

    /// Code blocks in order of appearance
    pub blocks: Vec<CodeBlock>,
}

fn is_tag_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Splits `text` into narrative prose and fenced code blocks
pub fn extract_code_blocks(text: &str) -> ExtractedContent {
    let bytes = text.as_bytes();
    let mut blocks = Vec::new();
    let mut narrative = String::new();

    // Byte offsets; every position sliced below sits on an ASCII
    // backtick, newline, or tag-character boundary.
    let mut consumed = 0;
    let mut search = 0;

    while let Some(offset) = text[search..].find("```") {
        let open = search + offset;

        let mut pos = open + 3;
        let tag_start = pos;
        while pos < bytes.len() && is_tag_byte(bytes[pos]) {
            pos += 1;
        }

        // The opening fence requires a newline right after the tag.
        // Anything else (a fourth backtick, a carriage return, end of
        // input) is not a fence; resume scanning one byte later.
        if pos >= bytes.len() || bytes[pos] != b'\n' {
            search = open + 1;
            continue;
        }

        let tag = &text[tag_start..pos];
        let content_start = pos + 1;

        let Some(close_offset) = text[content_start..].find("```") else {
            // Unterminated fence; no closing backticks exist anywhere
            // past this point, so no further block can match.
            break;
        };
        let close = content_start + close_offset;

        narrative.push_str(&text[consumed..open]);
        blocks.push(CodeBlock {
            language: if tag.is_empty() { "plaintext" } else { tag }.to_string(),
            code: text[content_start..close].trim().to_string(),
        });

        consumed = close + 3;
        search = consumed;
    }

    narrative.push_str(&text[consumed..]);

    ExtractedContent {
        narrative: narrative.trim().to_string(),
        blocks,
    }
}
