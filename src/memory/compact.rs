//! Tool result compaction.
//!
//! Large tool results are the biggest context consumer in an agent loop.
//! A result over the threshold is either:
//!   1. replaced by a one-line skeleton, when it is recognisably file content
//!      with a known path, or
//!   2. truncated to the threshold with a note of how much was cut.
//!
//! Results at or under the threshold pass through untouched.

use crate::skeleton::{try_extract_skeleton, FileSkeleton};
use regex::Regex;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::sync::LazyLock;
use tracing::debug;

/// Tools whose output is file content by definition
pub const FILE_TOOLS: &[&str] = &[
    "read_file",
    "readFile",
    "read",
    "view_file",
    "open_file",
    "cat",
    "get_file_contents",
];

/// Argument keys that may carry a file path, in lookup order
pub const FILE_PATH_KEYS: &[&str] = &["filePath", "file_path", "path", "file"];

/// Header prefix for a result replaced by its skeleton
pub const FILE_READ_PREFIX: &str = "[File read:";

static FILE_FINGERPRINTS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // leading import statement
        r"^\s*import\s",
        // python-style from-import
        r"^\s*from\s+\S+\s+import\s",
        // leading declaration keyword
        r"^\s*(?:class|def|function|const|let|var|interface|type|enum|struct|fn|pub|package|public|async\s+function)\s",
        // exported declaration
        r"^\s*export\s+(?:default\s+)?(?:class|function|const|let|var|interface|type|enum|async|abstract)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("fingerprint pattern compiles"))
    .collect()
});

/// Outcome of [`compress_tool_result`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedResult<'a> {
    /// Borrowed when the result was short enough to keep as-is
    pub compressed: Cow<'a, str>,
    /// Present only when the result was replaced by a skeleton
    pub skeleton: Option<FileSkeleton>,
    pub file_path: Option<String>,
}

impl CompressedResult<'_> {
    pub fn was_compressed(&self) -> bool {
        matches!(self.compressed, Cow::Owned(_))
    }
}

/// Whether a tool result looks like the content of a source file.
///
/// True for tools on the [`FILE_TOOLS`] allow-list, otherwise decided by the
/// leading text of `content`. False negatives just fall back to truncation.
pub fn is_file_content(tool_name: &str, content: &str) -> bool {
    if FILE_TOOLS.contains(&tool_name) {
        return true;
    }
    FILE_FINGERPRINTS.iter().any(|re| re.is_match(content))
}

/// First string value among [`FILE_PATH_KEYS`] in the call arguments.
pub fn extract_file_path(_tool_name: &str, args: &Map<String, Value>) -> Option<String> {
    FILE_PATH_KEYS
        .iter()
        .filter_map(|key| args.get(*key))
        .find_map(|value| value.as_str())
        .filter(|path| !path.is_empty())
        .map(str::to_string)
}

/// Compress one tool result against a character `threshold`.
pub fn compress_tool_result<'a>(
    tool_name: &str,
    args: &Map<String, Value>,
    result: &'a str,
    threshold: usize,
) -> CompressedResult<'a> {
    let total_chars = result.chars().count();
    if total_chars <= threshold {
        return CompressedResult {
            compressed: Cow::Borrowed(result),
            skeleton: None,
            file_path: None,
        };
    }

    if let Some(path) = extract_file_path(tool_name, args) {
        if is_file_content(tool_name, result) {
            match try_extract_skeleton(result, &path) {
                Ok(skeleton) => {
                    let compressed =
                        format!("{FILE_READ_PREFIX} {path}]\n{}", skeleton.to_compact_string());
                    debug!(
                        "Compressed {} result for {} to skeleton ({} -> {} chars)",
                        tool_name,
                        path,
                        total_chars,
                        compressed.chars().count()
                    );
                    return CompressedResult {
                        compressed: Cow::Owned(compressed),
                        skeleton: Some(skeleton),
                        file_path: Some(path),
                    };
                }
                Err(e) => debug!("Skeleton extraction failed, truncating instead: {}", e),
            }
        }
    }

    CompressedResult {
        compressed: Cow::Owned(truncate_chars(result, threshold, total_chars)),
        skeleton: None,
        file_path: None,
    }
}

/// First `limit` characters plus a note of the omitted count.
fn truncate_chars(text: &str, limit: usize, total_chars: usize) -> String {
    let end = text
        .char_indices()
        .nth(limit)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    format!(
        "{}...[truncated: {} characters]",
        &text[..end],
        total_chars.saturating_sub(limit)
    )
}
