//! Source skeleton extraction
//!
//! Reduces a file to a structural outline (imports, classes with their
//! methods, functions, types) so the memory layer can stand it in for the
//! full content. Extraction is line-oriented and heuristic: it is linear in
//! the number of lines and never fails on odd input, it just finds less.
//!
//! Dispatch is by extension only:
//!   - brace-scoped (TS/JS/Vue/Svelte) → [`brace`]
//!   - indentation-scoped (Python) → [`indent`]
//!   - everything else → [`generic`] keyword scan

mod brace;
mod generic;
mod indent;
mod language;
mod render;

pub use language::{Family, Language};

use serde::Serialize;

/// Maximum length of a signature preview, in characters.
pub const MAX_SIGNATURE_CHARS: usize = 100;

/// Kind of a structural unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Import,
    Class,
    Function,
    Method,
    Interface,
    Type,
    Variable,
    Export,
}

/// One structural unit found in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkeletonItem {
    pub kind: ItemKind,
    /// Declared name, or a synthetic one such as `"imports"`
    pub name: String,
    /// 1-based start line
    pub line: usize,
    /// 1-based inclusive end line, always >= `line`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
    /// Methods and accessors of a class, in source order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SkeletonItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl SkeletonItem {
    pub fn new(kind: ItemKind, name: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            name: name.into(),
            line,
            end_line: None,
            children: Vec::new(),
            signature: None,
        }
    }

    pub fn with_signature(mut self, declaring_line: &str) -> Self {
        self.signature = Some(signature_preview(declaring_line));
        self
    }

    /// Set the end line, clamped so it never precedes the start line.
    pub(crate) fn close_at(&mut self, end_line: usize) {
        self.end_line = Some(end_line.max(self.line));
    }

    /// Last line covered by this item.
    pub fn last_line(&self) -> usize {
        self.end_line.unwrap_or(self.line)
    }
}

/// Structural outline of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSkeleton {
    pub file_path: String,
    pub language: Language,
    pub total_lines: usize,
    /// Flat top-level list; only classes nest children
    pub items: Vec<SkeletonItem>,
}

impl FileSkeleton {
    /// Items of one kind, in source order.
    pub fn items_of(&self, kind: ItemKind) -> impl Iterator<Item = &SkeletonItem> {
        self.items.iter().filter(move |item| item.kind == kind)
    }
}

/// Errors from [`try_extract_skeleton`]
#[derive(Debug, thiserror::Error)]
pub enum SkeletonError {
    #[error("content of {0} looks binary (contains NUL bytes)")]
    BinaryContent(String),
}

/// Extract the structural outline of `content`, dispatching on `file_path`'s
/// extension. Never fails: worst case is an outline with zero items.
pub fn extract_skeleton(content: &str, file_path: &str) -> FileSkeleton {
    let language = Language::from_path(file_path);
    let lines: Vec<&str> = content.lines().collect();

    let items = match language.family() {
        Family::Brace => brace::extract(&lines),
        Family::Indent => indent::extract(&lines),
        Family::Generic => generic::extract(&lines),
    };

    FileSkeleton {
        file_path: file_path.to_string(),
        language,
        total_lines: lines.len(),
        items,
    }
}

/// Like [`extract_skeleton`] but refuses content that cannot be a source
/// file. Used where a failure has somewhere better to go.
pub fn try_extract_skeleton(
    content: &str,
    file_path: &str,
) -> Result<FileSkeleton, SkeletonError> {
    if content.contains('\0') {
        return Err(SkeletonError::BinaryContent(file_path.to_string()));
    }
    Ok(extract_skeleton(content, file_path))
}

/// Trimmed declaring line, cut to [`MAX_SIGNATURE_CHARS`] characters.
fn signature_preview(line: &str) -> String {
    let trimmed = line.trim();
    match trimmed.char_indices().nth(MAX_SIGNATURE_CHARS) {
        Some((idx, _)) => trimmed[..idx].to_string(),
        None => trimmed.to_string(),
    }
}

/// Record an import spanning `start..=end`. Extends the previous import item
/// when it ends on the line right before `start`.
fn push_import(items: &mut Vec<SkeletonItem>, start: usize, end: usize) {
    if let Some(last) = items.last_mut() {
        if last.kind == ItemKind::Import && last.last_line() + 1 == start {
            last.close_at(end);
            return;
        }
    }

    let mut item = SkeletonItem::new(ItemKind::Import, "imports", start);
    if end > start {
        item.close_at(end);
    }
    items.push(item);
}
