//! Fenced Code Blocks
//!
//! Models are asked to wrap machine-readable output in a Markdown code fence
//! tagged with a language (```` ```plaintext ```` for DSL, ```` ```spl ```` for
//! Splunk). These helpers pull the first such block out of a reply.

use std::sync::LazyLock;

use regex::Regex;

/// Any fenced block: group 1 is the info tag, group 2 the body.
static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```([^\s`]*)[ \t]*\r?\n(.*?)\r?\n?```").expect("fence pattern is valid")
});

/// Extract the body of the first code block fenced with ```` ```<lang> ````.
///
/// Returns `None` when the reply has no block with that tag. The body is
/// returned verbatim, without the surrounding newlines.
pub fn extract_fenced_block(text: &str, lang: &str) -> Option<String> {
    FENCED_BLOCK
        .captures_iter(text)
        .find(|caps| caps.get(1).is_some_and(|tag| tag.as_str() == lang))
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Non-blank lines of a block, in order.
pub fn non_blank_lines(block: &str) -> Vec<String> {
    block
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.to_string())
        .collect()
}
