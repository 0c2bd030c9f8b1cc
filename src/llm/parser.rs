//! Statement extraction from correction replies.
//!
//! A reply is prose around markdown fences. Only a fenced block can carry
//! the corrected statement; bare prose never becomes SQL.

/// A correction reply split into its statement and the surrounding prose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    /// Prose outside the chosen block, trimmed.
    pub text: String,
    pub sql: Option<String>,
}

/// A complete fenced block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CodeBlock<'a> {
    /// Info string after the opening fence, trimmed.
    lang: &'a str,
    content: &'a str,
    /// Byte range of the block, fences included.
    start: usize,
    end: usize,
}

impl CodeBlock<'_> {
    fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

/// Splits a reply into statement and prose.
///
/// The first non-empty ```sql block wins (tag matched case-insensitively).
/// Without one, the first non-empty untagged block is used. Blocks tagged
/// with another language are never SQL.
pub fn parse_llm_response(response: &str) -> ParsedResponse {
    let blocks = code_blocks(response);

    let chosen = blocks
        .iter()
        .find(|b| b.lang.eq_ignore_ascii_case("sql") && b.has_content())
        .or_else(|| blocks.iter().find(|b| b.lang.is_empty() && b.has_content()));

    let Some(block) = chosen else {
        return ParsedResponse {
            text: response.trim().to_string(),
            sql: None,
        };
    };

    let before = response[..block.start].trim();
    let after = response[block.end..].trim();
    let text = match (before.is_empty(), after.is_empty()) {
        (false, false) => format!("{before}\n\n{after}"),
        (false, true) => before.to_string(),
        (true, _) => after.to_string(),
    };

    ParsedResponse {
        text,
        sql: Some(block.content.trim().to_string()),
    }
}

/// Returns the statement carried by a reply, if any.
pub fn extract_sql(response: &str) -> Option<String> {
    parse_llm_response(response).sql
}

/// Finds complete fenced blocks in order. An unclosed fence ends the scan.
fn code_blocks(text: &str) -> Vec<CodeBlock<'_>> {
    let mut blocks = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find("```") {
        let start = cursor + offset;
        let after_fence = start + 3;

        let Some(newline) = text[after_fence..].find('\n') else {
            break;
        };
        let content_start = after_fence + newline + 1;

        let Some(close) = text[content_start..].find("```") else {
            break;
        };
        let content_end = content_start + close;
        let end = content_end + 3;

        blocks.push(CodeBlock {
            lang: text[after_fence..after_fence + newline].trim(),
            content: &text[content_start..content_end],
            start,
            end,
        });
        cursor = end;
    }

    blocks
}
