//! Matching strategies for the patch locator.
//!
//! Each strategy maps `(content, pattern)` to the byte ranges in the
//! untouched `content` that it considers an occurrence of `pattern`.
//! Normalisation only ever affects comparison; ranges always point into the
//! original text.

use serde::Serialize;
use std::ops::Range;

/// How an occurrence was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchStrategy {
    Exact,
    EscapeNormalized,
    WhitespaceNormalized,
    LineEndingNormalized,
}

impl MatchStrategy {
    /// Cascade order
    pub const ALL: [MatchStrategy; 4] = [
        MatchStrategy::Exact,
        MatchStrategy::EscapeNormalized,
        MatchStrategy::WhitespaceNormalized,
        MatchStrategy::LineEndingNormalized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStrategy::Exact => "exact",
            MatchStrategy::EscapeNormalized => "escape-normalized",
            MatchStrategy::WhitespaceNormalized => "whitespace-normalized",
            MatchStrategy::LineEndingNormalized => "line-ending-normalized",
        }
    }

    /// Whether a replacement found this way follows the file's line endings.
    pub(crate) fn adapts_line_endings(&self) -> bool {
        matches!(
            self,
            MatchStrategy::WhitespaceNormalized | MatchStrategy::LineEndingNormalized
        )
    }

    /// Byte ranges of every occurrence of `pattern` in `content`.
    pub(crate) fn find(&self, content: &str, pattern: &str) -> Vec<Range<usize>> {
        match self {
            MatchStrategy::Exact => find_exact(content, pattern),
            MatchStrategy::EscapeNormalized => {
                let unescaped = unescape(pattern);
                if unescaped == pattern || unescaped.trim().is_empty() {
                    return Vec::new();
                }
                find_exact(content, &unescaped)
            }
            MatchStrategy::WhitespaceNormalized => {
                let trimmed = find_blank_normalized(content, pattern, false);
                if !trimmed.is_empty() {
                    return trimmed;
                }
                find_blank_normalized(content, pattern, true)
            }
            MatchStrategy::LineEndingNormalized => find_crlf_normalized(content, pattern),
        }
    }
}

impl std::fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn find_exact(content: &str, needle: &str) -> Vec<Range<usize>> {
    content
        .match_indices(needle)
        .map(|(start, matched)| start..start + matched.len())
        .collect()
}

/// Undo one level of string escaping: `\"`, `\'`, `` \` ``, `\n`, `\t`, `\\`.
/// Any other backslash sequence is kept as written.
pub(crate) fn unescape(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let replacement = match chars.peek() {
            Some('"') => '"',
            Some('\'') => '\'',
            Some('`') => '`',
            Some('n') => '\n',
            Some('t') => '\t',
            Some('\\') => '\\',
            _ => {
                out.push(c);
                continue;
            }
        };
        chars.next();
        out.push(replacement);
    }
    out
}

/// Horizontal whitespace: everything `char::is_whitespace` except line breaks.
fn is_blank(c: char) -> bool {
    c.is_whitespace() && c != '\n' && c != '\r'
}

/// `text` with blank runs at line ends dropped and, when `collapse` is set,
/// every other blank run folded to one space. Line breaks are kept as they
/// are. Alongside it, the original byte range behind each normalised byte.
fn normalize_blanks(text: &str, collapse: bool) -> (String, Vec<Range<usize>>) {
    let mut out = String::with_capacity(text.len());
    let mut origins = Vec::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if !is_blank(c) {
            push_origin(&mut out, &mut origins, c, idx..idx + c.len_utf8());
            continue;
        }

        while chars.next_if(|&(_, next)| is_blank(next)).is_some() {}
        let run_end = chars.peek().map_or(text.len(), |&(i, _)| i);
        if matches!(chars.peek(), None | Some((_, '\n' | '\r'))) {
            continue;
        }

        if collapse {
            push_origin(&mut out, &mut origins, ' ', idx..run_end);
        } else {
            for (offset, blank) in text[idx..run_end].char_indices() {
                let at = idx + offset;
                push_origin(&mut out, &mut origins, blank, at..at + blank.len_utf8());
            }
        }
    }

    (out, origins)
}

fn push_origin(out: &mut String, origins: &mut Vec<Range<usize>>, c: char, origin: Range<usize>) {
    out.push(c);
    for _ in 0..c.len_utf8() {
        origins.push(origin.clone());
    }
}

/// Search after blank normalisation of both sides, mapped back onto `content`.
///
/// A pattern without leading blanks never swallows the indentation in front
/// of its first character.
fn find_blank_normalized(content: &str, pattern: &str, collapse: bool) -> Vec<Range<usize>> {
    let (needle, _) = normalize_blanks(pattern, collapse);
    if needle.trim().is_empty() {
        return Vec::new();
    }
    let (haystack, origins) = normalize_blanks(content, collapse);
    haystack
        .match_indices(needle.as_str())
        .map(|(start, matched)| origins[start].start..origins[start + matched.len() - 1].end)
        .collect()
}

/// `content` with every `\r\n` folded to `\n`, plus a map from each
/// normalised byte offset (and the end offset) back to the original.
fn fold_crlf(content: &str) -> (String, Vec<usize>) {
    let mut folded = String::with_capacity(content.len());
    let mut offsets = Vec::with_capacity(content.len() + 1);
    let mut chars = content.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        if c == '\r' && matches!(chars.peek(), Some((_, '\n'))) {
            continue;
        }
        let origin = if c == '\n' && idx > 0 && content.as_bytes()[idx - 1] == b'\r' {
            idx - 1
        } else {
            idx
        };
        for k in 0..c.len_utf8() {
            offsets.push(if k == 0 { origin } else { idx + k });
        }
        folded.push(c);
    }
    offsets.push(content.len());
    (folded, offsets)
}

fn find_crlf_normalized(content: &str, pattern: &str) -> Vec<Range<usize>> {
    if !content.contains("\r\n") && !pattern.contains("\r\n") {
        return Vec::new();
    }
    let needle = pattern.replace("\r\n", "\n");
    let (haystack, offsets) = fold_crlf(content);
    haystack
        .match_indices(needle.as_str())
        .map(|(start, matched)| offsets[start]..offsets[start + matched.len()])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_single_pass() {
        assert_eq!(unescape(r#"say(\"hi\")"#), r#"say("hi")"#);
        assert_eq!(unescape(r"a\nb\tc"), "a\nb\tc");
        assert_eq!(unescape(r"\\n"), r"\n");
        assert_eq!(unescape(r"\d+"), r"\d+");
        assert_eq!(unescape("trailing\\"), "trailing\\");
    }

    #[test]
    fn test_normalize_blanks_origins() {
        let (text, origins) = normalize_blanks("a  b \t\nc", true);
        assert_eq!(text, "a b\nc");
        assert_eq!(origins[1], 1..3);
        assert_eq!(origins[3], 6..7);

        let (text, _) = normalize_blanks("a  b \r\n", false);
        assert_eq!(text, "a  b\r\n");
    }

    #[test]
    fn test_whitespace_trailing_pass() {
        let content = "fn a() {   \n    x();  \n}\n";
        let ranges = MatchStrategy::WhitespaceNormalized.find(content, "fn a() {\n    x();");
        assert_eq!(ranges, vec![0..20]);
    }

    #[test]
    fn test_whitespace_partial_first_and_last_line() {
        let content = "let x = 1;   \nlet y = 2;\n";
        let ranges = MatchStrategy::WhitespaceNormalized.find(content, "x = 1;\nlet y");
        assert_eq!(ranges, vec![4..19]);
        assert_eq!(&content[4..19], "x = 1;   \nlet y");
    }

    #[test]
    fn test_whitespace_collapsed_mid_line() {
        let content = "foo(a,  b); // keep\n";
        let ranges = MatchStrategy::WhitespaceNormalized.find(content, "foo(a, b);");
        assert_eq!(ranges, vec![0..11]);
    }

    #[test]
    fn test_whitespace_collapsed_run_maps_to_whole_run() {
        let content = "x =\t\t  1;\n";
        let ranges = MatchStrategy::WhitespaceNormalized.find(content, "x = 1");
        assert_eq!(ranges, vec![0..8]);
        assert_eq!(&content[0..8], "x =\t\t  1");
    }

    #[test]
    fn test_whitespace_collapsed_pass_keeps_indent() {
        let content = "    let  x =   1;\n";
        let ranges = MatchStrategy::WhitespaceNormalized.find(content, "let x = 1;");
        assert_eq!(ranges, vec![4..17]);
    }

    #[test]
    fn test_whitespace_range_includes_terminator() {
        let content = "a  \nb\n";
        let ranges = MatchStrategy::WhitespaceNormalized.find(content, "a\n");
        assert_eq!(ranges, vec![0..4]);
    }

    #[test]
    fn test_whitespace_keeps_line_endings_apart() {
        assert_eq!(
            MatchStrategy::WhitespaceNormalized.find("a  \r\nb", "a\r\nb"),
            vec![0..6]
        );
        assert!(MatchStrategy::WhitespaceNormalized
            .find("a\r\nb", "a\nb")
            .is_empty());
    }

    #[test]
    fn test_fold_crlf_offsets() {
        let (folded, offsets) = fold_crlf("a\r\nb");
        assert_eq!(folded, "a\nb");
        assert_eq!(offsets, vec![0, 1, 3, 4]);
    }

    #[test]
    fn test_crlf_partial_lines() {
        let content = "xab\r\ncdy";
        let ranges = MatchStrategy::LineEndingNormalized.find(content, "b\ncd");
        assert_eq!(ranges, vec![2..7]);
        assert_eq!(&content[2..7], "b\r\ncd");
    }

    #[test]
    fn test_crlf_skips_plain_content() {
        assert!(MatchStrategy::LineEndingNormalized
            .find("a\nb", "a\nb")
            .is_empty());
    }

    #[test]
    fn test_labels() {
        let labels: Vec<&str> = MatchStrategy::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(
            labels,
            vec!["exact", "escape-normalized", "whitespace-normalized", "line-ending-normalized"]
        );
        assert_eq!(
            serde_json::to_value(MatchStrategy::WhitespaceNormalized).unwrap(),
            "whitespace-normalized"
        );
    }
}
