//! Compact one-line rendering of a [`FileSkeleton`].
//!
//! `[path] 120L | imports:L1-4 | classes:[Foo:L6{bar:L8,baz:L12};...] | fn:[main:L40] | types:[Opts:L2]`
//!
//! Sections with nothing in them are left out.

use super::{FileSkeleton, ItemKind, SkeletonItem};

impl FileSkeleton {
    /// Plain-text outline consumed by the agent's prompt.
    pub fn to_compact_string(&self) -> String {
        let mut parts = vec![format!("[{}] {}L", self.file_path, self.total_lines)];

        let imports: Vec<String> = self
            .items_of(ItemKind::Import)
            .map(|item| match item.end_line {
                Some(end) if end > item.line => format!("L{}-{}", item.line, end),
                _ => format!("L{}", item.line),
            })
            .collect();
        if !imports.is_empty() {
            parts.push(format!("imports:{}", imports.join(",")));
        }

        let classes: Vec<String> = self.items_of(ItemKind::Class).map(render_class).collect();
        if !classes.is_empty() {
            parts.push(format!("classes:[{}]", classes.join(";")));
        }

        let functions: Vec<String> = self.items_of(ItemKind::Function).map(name_at_line).collect();
        if !functions.is_empty() {
            parts.push(format!("fn:[{}]", functions.join(",")));
        }

        let types: Vec<String> = self
            .items
            .iter()
            .filter(|item| matches!(item.kind, ItemKind::Interface | ItemKind::Type))
            .map(name_at_line)
            .collect();
        if !types.is_empty() {
            parts.push(format!("types:[{}]", types.join(",")));
        }

        parts.join(" | ")
    }
}

fn name_at_line(item: &SkeletonItem) -> String {
    format!("{}:L{}", item.name, item.line)
}

fn render_class(class: &SkeletonItem) -> String {
    let methods: Vec<String> = class.children.iter().map(name_at_line).collect();
    format!("{}{{{}}}", name_at_line(class), methods.join(","))
}
