//! Fuzzy patch locator
//!
//! Finds `old_string` in a file and replaces it with `new_string`, tolerating
//! the drift an agent's remembered text tends to have from what is on disk:
//! double-escaped quotes, trailing or collapsed whitespace, CRLF line endings.
//! Strategies are tried in [`MatchStrategy::ALL`] order and the first one that
//! finds anything decides the outcome.

mod strategies;

pub use strategies::MatchStrategy;

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::ops::Range;
use tracing::debug;

/// A located and applied replacement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchMatch {
    pub strategy: MatchStrategy,
    /// Occurrences the winning strategy saw, before disambiguation
    pub match_count: usize,
    /// 1-based line where the replaced text starts
    pub match_line: usize,
    #[serde(skip_serializing)]
    pub patched_content: String,
}

/// Why a patch could not be applied. All variants are recoverable.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("old_string is empty; provide the exact text to replace")]
    EmptyPattern,

    #[error(
        "old_string not found: none of the {} strategies matched ({})",
        .strategies_tried.len(),
        .strategies_tried.join(", ")
    )]
    NotFound { strategies_tried: Vec<&'static str> },

    #[error(
        "old_string is ambiguous: {match_count} matches ({strategy}); pass a start line hint or include more surrounding context"
    )]
    Ambiguous {
        match_count: usize,
        strategy: MatchStrategy,
    },

    #[error("edit {index} failed: {source}")]
    Edit {
        /// 1-based position in the edit list
        index: usize,
        source: Box<PatchError>,
    },
}

/// One replacement in a multi-edit request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditOp {
    pub old_string: String,
    pub new_string: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_line: Option<usize>,
}

impl EditOp {
    pub fn new(old_string: impl Into<String>, new_string: impl Into<String>) -> Self {
        Self {
            old_string: old_string.into(),
            new_string: new_string.into(),
            start_line: None,
        }
    }

    pub fn with_start_line(mut self, line: usize) -> Self {
        self.start_line = Some(line);
        self
    }
}

/// Find `old_string` in `content` and replace exactly one occurrence of it.
///
/// When a strategy finds several occurrences, `start_line_hint` picks the one
/// starting closest to it (at-or-after wins a tie). Without a hint that is
/// an [`PatchError::Ambiguous`] failure and no later strategy is tried.
pub fn locate(
    content: &str,
    old_string: &str,
    new_string: &str,
    start_line_hint: Option<usize>,
) -> Result<PatchMatch, PatchError> {
    if old_string.trim().is_empty() {
        return Err(PatchError::EmptyPattern);
    }

    for strategy in MatchStrategy::ALL {
        let ranges = strategy.find(content, old_string);
        let match_count = ranges.len();
        let Some((first, others)) = ranges.split_first() else {
            debug!("Strategy {} found no match", strategy);
            continue;
        };

        let (range, match_line) = match (others.is_empty(), start_line_hint) {
            (true, _) => (first.clone(), byte_offset_to_line_number(content, first.start)),
            (false, Some(hint)) => closest_to_hint(content, first, others, hint),
            (false, None) => {
                debug!("Strategy {} found {} matches and no hint", strategy, match_count);
                return Err(PatchError::Ambiguous {
                    match_count,
                    strategy,
                });
            }
        };

        debug!(
            "Strategy {} matched at line {} ({} candidates)",
            strategy, match_line, match_count
        );
        return Ok(PatchMatch {
            strategy,
            match_count,
            match_line,
            patched_content: splice(content, range, new_string, strategy),
        });
    }

    Err(PatchError::NotFound {
        strategies_tried: MatchStrategy::ALL.iter().map(|s| s.as_str()).collect(),
    })
}

/// Apply `edits` in order, each against the output of the previous one.
/// Stops at the first failure.
pub fn apply_edits(content: &str, edits: &[EditOp]) -> Result<String, PatchError> {
    let mut current = content.to_string();
    for (idx, edit) in edits.iter().enumerate() {
        let found = locate(&current, &edit.old_string, &edit.new_string, edit.start_line)
            .map_err(|e| PatchError::Edit {
                index: idx + 1,
                source: Box::new(e),
            })?;
        current = found.patched_content;
    }
    Ok(current)
}

/// The candidate starting nearest `hint`, preferring lines at or after it.
fn closest_to_hint(
    content: &str,
    first: &Range<usize>,
    others: &[Range<usize>],
    hint: usize,
) -> (Range<usize>, usize) {
    let key = |line: usize| (line.abs_diff(hint), line < hint);
    let mut best = (first.clone(), byte_offset_to_line_number(content, first.start));
    for range in others {
        let line = byte_offset_to_line_number(content, range.start);
        if key(line) < key(best.1) {
            best = (range.clone(), line);
        }
    }
    best
}

fn splice(content: &str, range: Range<usize>, new_string: &str, strategy: MatchStrategy) -> String {
    let replacement: Cow<'_, str> =
        if strategy.adapts_line_endings() && content[range.clone()].contains("\r\n") {
            Cow::Owned(new_string.replace("\r\n", "\n").replace('\n', "\r\n"))
        } else {
            Cow::Borrowed(new_string)
        };

    let mut patched =
        String::with_capacity(content.len() - range.len() + replacement.len());
    patched.push_str(&content[..range.start]);
    patched.push_str(&replacement);
    patched.push_str(&content[range.end..]);
    patched
}

fn byte_offset_to_line_number(content: &str, byte_offset: usize) -> usize {
    content
        .as_bytes()
        .iter()
        .take(byte_offset.min(content.len()))
        .filter(|b| **b == b'\n')
        .count()
        + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_exact_single_match() {
        let content = "fn main() {\n    println!(\"a\");\n}\n";
        let found = locate(content, "println!(\"a\")", "println!(\"b\")", None).unwrap();
        assert_eq!(found.strategy, MatchStrategy::Exact);
        assert_eq!(found.match_count, 1);
        assert_eq!(found.match_line, 2);
        assert_eq!(found.patched_content, "fn main() {\n    println!(\"b\");\n}\n");
    }

    #[test]
    fn test_empty_pattern() {
        assert!(matches!(locate("abc", "   ", "x", None), Err(PatchError::EmptyPattern)));
        assert!(matches!(locate("", "\n\t", "x", Some(1)), Err(PatchError::EmptyPattern)));
    }

    #[test]
    fn test_escape_normalized_keeps_new_string() {
        let content = "const s = \"hi\";\n";
        let found = locate(content, r#"const s = \"hi\";"#, r#"const s = \"yo\";"#, None).unwrap();
        assert_eq!(found.strategy, MatchStrategy::EscapeNormalized);
        assert_eq!(found.patched_content, "const s = \\\"yo\\\";\n");
    }

    #[test]
    fn test_whitespace_normalized() {
        let content = "if x {   \n    go();\n}\n";
        let found = locate(content, "if x {\n    go();", "if y {\n    stop();", None).unwrap();
        assert!(found.strategy.as_str().contains("whitespace"));
        assert_eq!(found.patched_content, "if y {\n    stop();\n}\n");
    }

    #[test]
    fn test_whitespace_pattern_spanning_partial_lines() {
        let content = "let x = 1;   \nlet y = 2;\n";
        let found = locate(content, "x = 1;\nlet y", "x = 5;\nlet z", None).unwrap();
        assert_eq!(found.strategy, MatchStrategy::WhitespaceNormalized);
        assert_eq!(found.match_line, 1);
        assert_eq!(found.patched_content, "let x = 5;\nlet z = 2;\n");
    }

    #[test]
    fn test_whitespace_collapsed_run_inside_line() {
        let content = "foo(a,  b); // keep\n";
        let found = locate(content, "foo(a, b);", "foo(b);", None).unwrap();
        assert_eq!(found.strategy, MatchStrategy::WhitespaceNormalized);
        assert_eq!(found.patched_content, "foo(b); // keep\n");
    }

    #[test]
    fn test_hint_among_three_candidates() {
        let content = "k\nk\nk\n";
        let found = locate(content, "k", "v", Some(2)).unwrap();
        assert_eq!((found.match_line, found.match_count), (2, 3));
        assert_eq!(found.patched_content, "k\nv\nk\n");
    }

    #[test]
    fn test_crlf_content_lf_pattern() {
        let content = "one\r\ntwo\r\nthree\r\n";
        let found = locate(content, "one\ntwo\n", "uno\ndos\n", None).unwrap();
        assert_eq!(found.patched_content, "uno\r\ndos\r\nthree\r\n");
    }

    #[test]
    fn test_line_ending_strategy_for_partial_lines() {
        let content = "let a = 1;\r\nlet b = 2;\r\n";
        let found = locate(content, "1;\nlet b", "10;\nlet bb", None).unwrap();
        assert_eq!(found.strategy, MatchStrategy::LineEndingNormalized);
        assert_eq!(found.match_line, 1);
        assert_eq!(found.patched_content, "let a = 10;\r\nlet bb = 2;\r\n");
    }

    #[test]
    fn test_ambiguous_without_hint() {
        let content = "x = 1\ny = 2\nx = 1\n";
        match locate(content, "x = 1", "x = 3", None) {
            Err(PatchError::Ambiguous { match_count, strategy }) => {
                assert_eq!(match_count, 2);
                assert_eq!(strategy, MatchStrategy::Exact);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn test_hint_picks_nearest() {
        let content = "x = 1\ny = 2\nx = 1\n";
        let found = locate(content, "x = 1", "x = 3", Some(3)).unwrap();
        assert_eq!(found.match_line, 3);
        assert_eq!(found.match_count, 2);
        assert_eq!(found.patched_content, "x = 1\ny = 2\nx = 3\n");
    }

    #[test]
    fn test_hint_tie_prefers_at_or_after() {
        let content = "a\nb\nc\na\n";
        // lines 1 and 4 vs hint 2: distances 1 and 2
        assert_eq!(locate(content, "a", "z", Some(2)).unwrap().match_line, 1);
        let content = "a\nb\na\n";
        // lines 1 and 3 vs hint 2: tie
        assert_eq!(locate(content, "a", "z", Some(2)).unwrap().match_line, 3);
    }

    #[test]
    fn test_not_found_reports_strategies() {
        let err = locate("abc", "xyz", "q", None).unwrap_err();
        match &err {
            PatchError::NotFound { strategies_tried } => assert_eq!(strategies_tried.len(), 4),
            other => panic!("expected not found, got {other:?}"),
        }
        assert!(err.to_string().contains("none of the 4 strategies matched"));
    }

    #[test]
    fn test_apply_edits_sequential() {
        let content = "a = 1\nb = 2\n";
        let edits = vec![EditOp::new("a = 1", "a = 10"), EditOp::new("a = 10\nb", "a = 10\nc")];
        assert_eq!(apply_edits(content, &edits).unwrap(), "a = 10\nc = 2\n");
    }

    #[test]
    fn test_apply_edits_reports_index() {
        let edits = vec![EditOp::new("a", "b"), EditOp::new("missing", "x")];
        match apply_edits("a", &edits) {
            Err(PatchError::Edit { index, source }) => {
                assert_eq!(index, 2);
                assert!(matches!(*source, PatchError::NotFound { .. }));
            }
            other => panic!("expected edit failure, got {other:?}"),
        }
    }

    #[test]
    fn test_edit_op_deserializes_agent_args() {
        let op: EditOp =
            serde_json::from_str(r#"{"old_string":"a","new_string":"b","start_line":4}"#).unwrap();
        assert_eq!(op, EditOp::new("a", "b").with_start_line(4));
    }

    #[test]
    fn test_byte_offset_to_line_number() {
        assert_eq!(byte_offset_to_line_number("a\nb\nc", 0), 1);
        assert_eq!(byte_offset_to_line_number("a\nb\nc", 2), 2);
        assert_eq!(byte_offset_to_line_number("a\nb\nc", 99), 3);
    }
}
