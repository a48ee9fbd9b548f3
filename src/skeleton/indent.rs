//! Indentation-scoped extractor (Python family).

use super::{push_import, ItemKind, SkeletonItem};
use regex::Regex;
use std::sync::LazyLock;

static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:import\s+[\w.]|from\s+[\w.]+\s+import\b)").expect("import pattern compiles")
});

static CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^class\s+([A-Za-z_]\w*)").expect("class pattern compiles"));

static DEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:async\s+)?def\s+([A-Za-z_]\w*)").expect("def pattern compiles")
});

const TAB_WIDTH: usize = 4;

#[derive(Debug)]
struct OpenClass {
    item: SkeletonItem,
    indent: usize,
}

#[derive(Debug)]
enum Mode {
    TopLevel,
    /// `from x import (` still waiting for its `)`
    InImport { start: usize },
    InClass(OpenClass),
}

pub(super) fn extract(lines: &[&str]) -> Vec<SkeletonItem> {
    let mut items = Vec::new();
    let mut mode = Mode::TopLevel;

    for (idx, raw) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw.trim();

        // Comment-only lines never close a class, whatever their indentation.
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let indent = indentation(raw);

        mode = match mode {
            Mode::InImport { start } => {
                if trimmed.contains(')') {
                    push_import(&mut items, start, line_no);
                    Mode::TopLevel
                } else {
                    Mode::InImport { start }
                }
            }
            Mode::InClass(mut open) => {
                if indent > open.indent {
                    if let Some(name) = capture_name(&DEF, trimmed) {
                        open.item.children.push(
                            SkeletonItem::new(ItemKind::Method, name, line_no)
                                .with_signature(trimmed),
                        );
                    }
                    Mode::InClass(open)
                } else {
                    // First code line back at (or left of) the class column ends the body.
                    open.item.close_at(line_no - 1);
                    items.push(open.item);
                    scan_top_level(trimmed, indent, line_no, &mut items)
                }
            }
            Mode::TopLevel => scan_top_level(trimmed, indent, line_no, &mut items),
        };
    }

    let total = lines.len();
    match mode {
        Mode::TopLevel => {}
        Mode::InImport { start } => push_import(&mut items, start, total),
        Mode::InClass(mut open) => {
            open.item.close_at(total);
            items.push(open.item);
        }
    }

    items
}

fn scan_top_level(
    trimmed: &str,
    indent: usize,
    line_no: usize,
    items: &mut Vec<SkeletonItem>,
) -> Mode {
    if IMPORT.is_match(trimmed) {
        if trimmed.contains('(') && !trimmed.contains(')') {
            return Mode::InImport { start: line_no };
        }
        push_import(items, line_no, line_no);
        return Mode::TopLevel;
    }

    if let Some(name) = capture_name(&CLASS, trimmed) {
        let item = SkeletonItem::new(ItemKind::Class, name, line_no).with_signature(trimmed);
        return Mode::InClass(OpenClass { item, indent });
    }

    if indent == 0 {
        if let Some(name) = capture_name(&DEF, trimmed) {
            items.push(SkeletonItem::new(ItemKind::Function, name, line_no).with_signature(trimmed));
        }
    }

    Mode::TopLevel
}

fn capture_name(re: &Regex, trimmed: &str) -> Option<String> {
    re.captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Leading whitespace width, tabs counted as [`TAB_WIDTH`] columns.
fn indentation(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(src: &str) -> Vec<SkeletonItem> {
        let lines: Vec<&str> = src.lines().collect();
        extract(&lines)
    }

    #[test]
    fn test_imports_coalesce() {
        let items = run("import os\nimport sys\nfrom typing import List\n\nx = 1\n");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].line, 1);
        assert_eq!(items[0].end_line, Some(3));
    }

    #[test]
    fn test_parenthesized_import() {
        let items = run("from pkg import (\n    a,\n    b,\n)\n");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].end_line, Some(4));
    }

    #[test]
    fn test_class_methods() {
        let src = r#"class Repo(Base):
    """Docs."""

    def __init__(self, path):
        self.path = path

    @property
    async def load(self):
        def inner():
            pass
        return 1

    def save(self):
        pass

def top():
    pass
"#;
        let items = run(src);
        assert_eq!(items.len(), 2);

        let class = &items[0];
        assert_eq!(class.kind, ItemKind::Class);
        assert_eq!(class.name, "Repo");
        assert_eq!(class.end_line, Some(15));
        let names: Vec<&str> = class.children.iter().map(|c| c.name.as_str()).collect();
        // nested defs are deeper than the class column too
        assert_eq!(names, vec!["__init__", "load", "inner", "save"]);

        assert_eq!(items[1].kind, ItemKind::Function);
        assert_eq!(items[1].name, "top");
        assert_eq!(items[1].line, 16);
    }

    #[test]
    fn test_outdented_comment_does_not_close_class() {
        let src = "class A:\n    def one(self):\n        pass\n# stray comment\n    def two(self):\n        pass\n";
        let items = run(src);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].children.len(), 2);
        assert_eq!(items[0].end_line, Some(6));
    }

    #[test]
    fn test_class_closes_on_dedented_code() {
        let src = "class A:\n    def one(self):\n        pass\nVALUE = 3\n";
        let items = run(src);
        assert_eq!(items[0].end_line, Some(3));
    }

    #[test]
    fn test_nested_function_is_not_top_level() {
        let items = run("def outer():\n    def inner():\n        pass\n");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "outer");
    }
}
