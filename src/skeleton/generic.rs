//! Keyword-scan fallback for languages without a dedicated extractor.

use super::{ItemKind, SkeletonItem};
use regex::Regex;
use std::sync::LazyLock;

static FUNCTION_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:function|def|fn|func)\s+([A-Za-z_]\w*)")
        .expect("function keyword pattern compiles")
});

static TYPE_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:class|struct|type)\s+([A-Za-z_]\w*)")
        .expect("type keyword pattern compiles")
});

pub(super) fn extract(lines: &[&str]) -> Vec<SkeletonItem> {
    lines
        .iter()
        .enumerate()
        .filter_map(|(idx, line)| classify(line).map(|(kind, name)| SkeletonItem::new(kind, name, idx + 1)))
        .collect()
}

/// Whichever keyword occurs first on the line decides the kind.
fn classify(line: &str) -> Option<(ItemKind, String)> {
    let function = FUNCTION_LIKE.captures(line);
    let type_like = TYPE_LIKE.captures(line);

    let pick = match (function, type_like) {
        (Some(f), Some(t)) => {
            let f_start = f.get(0).map_or(usize::MAX, |m| m.start());
            let t_start = t.get(0).map_or(usize::MAX, |m| m.start());
            if f_start <= t_start {
                (ItemKind::Function, f)
            } else {
                (ItemKind::Class, t)
            }
        }
        (Some(f), None) => (ItemKind::Function, f),
        (None, Some(t)) => (ItemKind::Class, t),
        (None, None) => return None,
    };

    let (kind, caps) = pick;
    caps.get(1).map(|m| (kind, m.as_str().to_string()))
}
