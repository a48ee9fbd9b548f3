//! Brace-scoped extractor (TypeScript / JavaScript family).
//!
//! Each line is classified against an ordered rule table, first match wins.
//! Scan state lives in [`Mode`] and is threaded through the line loop.

use super::{push_import, ItemKind, SkeletonItem};
use regex::Regex;
use std::sync::LazyLock;

/// Top-level line classes, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    /// `import {` / `export {` whose bracket list continues on later lines
    ImportOpen,
    Import,
    Class,
    Interface,
    TypeAlias,
    Enum,
    Function,
    ArrowFunction,
    ExportDefault,
}

const IDENT: &str = r"[A-Za-z_$][\w$]*";

fn rule(pattern: &str) -> Regex {
    Regex::new(&pattern.replace("{IDENT}", IDENT)).expect("brace rule pattern compiles")
}

static RULES: LazyLock<Vec<(Rule, Regex)>> = LazyLock::new(|| {
    vec![
        (
            Rule::ImportOpen,
            rule(r"^(?:import(?:\s+type)?(?:\s+{IDENT}\s*,)?\s*\{|export\s+(?:type\s+)?\{)[^}]*$"),
        ),
        (
            Rule::Import,
            rule(r#"^(?:import(?:[\s{*'"]|$)|export\s+(?:type\s+)?(?:\*|\{[^}]*\})(?:\s+as\s+{IDENT})?\s+from\s)"#),
        ),
        (
            Rule::Class,
            rule(r"^(?:export\s+)?(?:default\s+)?(?:declare\s+)?(?:abstract\s+)?class\s+({IDENT})"),
        ),
        (
            Rule::Interface,
            rule(r"^(?:export\s+)?(?:default\s+)?(?:declare\s+)?interface\s+({IDENT})"),
        ),
        (
            Rule::TypeAlias,
            rule(r"^(?:export\s+)?(?:declare\s+)?type\s+({IDENT})\s*(?:<.*>)?\s*="),
        ),
        (
            Rule::Enum,
            rule(r"^(?:export\s+)?(?:declare\s+)?(?:const\s+)?enum\s+({IDENT})"),
        ),
        (
            Rule::Function,
            rule(r"^(?:export\s+)?(?:default\s+)?(?:declare\s+)?(?:async\s+)?function\s*\*?\s*({IDENT})"),
        ),
        (
            Rule::ArrowFunction,
            rule(r"^(?:export\s+)?(?:const|let|var)\s+({IDENT})\s*(?::[^=]+)?=\s*(?:async\s+)?(?:function\b|(?:\([^)]*\)|{IDENT})\s*(?::[^=]+?)?\s*=>)"),
        ),
        (Rule::ExportDefault, rule(r"^export\s+default\b")),
    ]
});

/// Method / accessor signature inside a class body.
static MEMBER: LazyLock<Regex> = LazyLock::new(|| {
    rule(r"^(?:(?:public|private|protected|static|async|readonly|override|abstract|declare)\s+)*(?:(get|set)\s+)?\*?\s*(#?{IDENT})\s*(?:<[^>]*>)?\s*\(")
});

/// Lines that look like calls but are control flow.
static CONTROL_FLOW: LazyLock<Regex> = LazyLock::new(|| {
    rule(r"^(?:if|for|while|switch|catch|return|else|do|new|await|throw|function)\b")
});

/// A class whose body is still being scanned.
#[derive(Debug)]
struct OpenClass {
    item: SkeletonItem,
    depth: i64,
    /// Whether the body's opening `{` has been seen yet
    opened: bool,
}

#[derive(Debug)]
enum Mode {
    TopLevel,
    InImport { start: usize },
    InClass(OpenClass),
}

pub(super) fn extract(lines: &[&str]) -> Vec<SkeletonItem> {
    let mut items = Vec::new();
    let mut mode = Mode::TopLevel;
    let mut in_block_comment = false;

    for (idx, raw) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw.trim();

        if in_block_comment {
            if trimmed.contains("*/") {
                in_block_comment = false;
            }
            continue;
        }
        if trimmed.is_empty() {
            continue;
        }
        if is_comment(trimmed) {
            if trimmed.starts_with("/*") && !trimmed.contains("*/") {
                in_block_comment = true;
            }
            continue;
        }

        mode = match mode {
            Mode::InImport { start } => {
                if trimmed.contains('}') {
                    push_import(&mut items, start, line_no);
                    Mode::TopLevel
                } else {
                    Mode::InImport { start }
                }
            }
            Mode::InClass(open) => scan_class_line(open, raw, trimmed, line_no, &mut items),
            Mode::TopLevel => scan_top_level(raw, trimmed, line_no, &mut items),
        };
    }

    // Unterminated constructs run to the end of the file.
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

fn scan_top_level(raw: &str, trimmed: &str, line_no: usize, items: &mut Vec<SkeletonItem>) -> Mode {
    let Some((rule, name)) = classify(trimmed) else {
        return Mode::TopLevel;
    };

    match rule {
        Rule::ImportOpen => return Mode::InImport { start: line_no },
        Rule::Import => push_import(items, line_no, line_no),
        Rule::Class => {
            let item = SkeletonItem::new(ItemKind::Class, name, line_no).with_signature(trimmed);
            let (opens, closes) = count_braces(raw);
            let mut open = OpenClass {
                item,
                depth: opens - closes,
                opened: opens > 0,
            };
            if open.opened && open.depth <= 0 {
                open.item.close_at(line_no);
                items.push(open.item);
                return Mode::TopLevel;
            }
            return Mode::InClass(open);
        }
        Rule::Interface => {
            items.push(SkeletonItem::new(ItemKind::Interface, name, line_no).with_signature(trimmed))
        }
        Rule::TypeAlias => {
            items.push(SkeletonItem::new(ItemKind::Type, name, line_no).with_signature(trimmed))
        }
        Rule::Enum => items.push(
            SkeletonItem::new(ItemKind::Type, format!("enum {name}"), line_no).with_signature(trimmed),
        ),
        Rule::Function | Rule::ArrowFunction => {
            items.push(SkeletonItem::new(ItemKind::Function, name, line_no).with_signature(trimmed))
        }
        Rule::ExportDefault => items.push(SkeletonItem::new(ItemKind::Export, "default", line_no)),
    }

    Mode::TopLevel
}

fn scan_class_line(
    mut open: OpenClass,
    raw: &str,
    trimmed: &str,
    line_no: usize,
    items: &mut Vec<SkeletonItem>,
) -> Mode {
    // Depth 1 only: deeper braces are method bodies (DESIGN.md, decision 3).
    if open.opened && open.depth == 1 && !CONTROL_FLOW.is_match(trimmed) {
        if let Some(caps) = MEMBER.captures(trimmed) {
            let ident = caps.get(2).map_or("", |m| m.as_str());
            let name = match caps.get(1) {
                Some(accessor) => format!("{} {ident}", accessor.as_str()),
                None => ident.to_string(),
            };
            open.item
                .children
                .push(SkeletonItem::new(ItemKind::Method, name, line_no).with_signature(trimmed));
        }
    }

    let (opens, closes) = count_braces(raw);
    open.depth += opens - closes;
    if opens > 0 {
        open.opened = true;
    }

    if open.opened && open.depth <= 0 {
        open.item.close_at(line_no);
        items.push(open.item);
        return Mode::TopLevel;
    }
    Mode::InClass(open)
}

/// First matching top-level rule and its captured name (if any).
fn classify(trimmed: &str) -> Option<(Rule, String)> {
    RULES.iter().find_map(|(rule, re)| {
        re.captures(trimmed).map(|caps| {
            let name = caps.get(1).map_or("", |m| m.as_str()).to_string();
            (*rule, name)
        })
    })
}

fn is_comment(trimmed: &str) -> bool {
    trimmed.starts_with("//")
        || trimmed.starts_with("/*")
        || trimmed.starts_with('*')
        || trimmed.starts_with("<!--")
}

fn count_braces(line: &str) -> (i64, i64) {
    line.chars().fold((0, 0), |(opens, closes), c| match c {
        '{' => (opens + 1, closes),
        '}' => (opens, closes + 1),
        _ => (opens, closes),
    })
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
        let items = run("import a from 'a';\nimport { b } from 'b';\nimport * as c from 'c';\n\nconst x = 1;\n");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, ItemKind::Import);
        assert_eq!(items[0].line, 1);
        assert_eq!(items[0].end_line, Some(3));
    }

    #[test]
    fn test_multiline_import_is_one_ranged_item() {
        let src = "import {\n  alpha,\n  beta,\n} from './greek';\nimport z from 'z';\n";
        let items = run(src);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].line, 1);
        assert_eq!(items[0].end_line, Some(5));
    }

    #[test]
    fn test_class_methods_and_accessors() {
        let src = r#"export class Service extends Base {
  private cache = new Map();

  constructor(private readonly api: Api) {
    super();
    if (api) {
      this.init(api);
    }
  }

  get size(): number {
    return this.cache.size;
  }

  set size(value: number) {}

  public static async load(id: string): Promise<Service> {
    for (const x of []) {}
    return new Service(id);
  }
}

function helper() {}
"#;
        let items = run(src);
        assert_eq!(items.len(), 2);

        let class = &items[0];
        assert_eq!(class.kind, ItemKind::Class);
        assert_eq!(class.name, "Service");
        assert_eq!(class.line, 1);
        assert_eq!(class.end_line, Some(21));

        let names: Vec<&str> = class.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["constructor", "get size", "set size", "load"]);
        assert!(class.children.windows(2).all(|w| w[0].line < w[1].line));

        assert_eq!(items[1].kind, ItemKind::Function);
        assert_eq!(items[1].name, "helper");
    }

    #[test]
    fn test_class_with_brace_on_next_line() {
        let src = "class Widget\n{\n  render() {\n  }\n}\n";
        let items = run(src);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].end_line, Some(5));
        assert_eq!(items[0].children.len(), 1);
        assert_eq!(items[0].children[0].name, "render");
    }

    #[test]
    fn test_single_line_class_closes_immediately() {
        let items = run("class Empty {}\nfunction after() {}\n");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].end_line, Some(1));
        assert_eq!(items[1].name, "after");
    }

    #[test]
    fn test_declarations() {
        let src = r#"export interface Props { a: string }
type Id = string | number;
export const enum Color { Red }
enum Plain { A }
export async function fetchAll(url: string) {}
export const handler = async (req: Request): Promise<Response> => {
const legacy = function () {};
let count = 0;
export default router;
"#;
        let items = run(src);
        let summary: Vec<(ItemKind, &str)> =
            items.iter().map(|i| (i.kind, i.name.as_str())).collect();
        assert_eq!(
            summary,
            vec![
                (ItemKind::Interface, "Props"),
                (ItemKind::Type, "Id"),
                (ItemKind::Type, "enum Color"),
                (ItemKind::Type, "enum Plain"),
                (ItemKind::Function, "fetchAll"),
                (ItemKind::Function, "handler"),
                (ItemKind::Function, "legacy"),
                (ItemKind::Export, "default"),
            ]
        );
        assert_eq!(
            items[4].signature.as_deref(),
            Some("export async function fetchAll(url: string) {}")
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        let src = "/*\n class Fake {\n*/\n// function nope() {}\n * function alsoNope()\nfunction real() {}\n";
        let items = run(src);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "real");
        assert_eq!(items[0].line, 6);
    }

    #[test]
    fn test_unclosed_class_runs_to_eof() {
        let items = run("class Broken {\n  a() {\n  }\n");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].end_line, Some(3));
        assert_eq!(items[0].children.len(), 1);
    }

    #[test]
    fn test_method_body_lines_are_not_members() {
        let src = "class A {\n  run() {\n    const o = {\n      inner() {},\n    };\n  }\n  stop() {}\n}\n";
        let items = run(src);
        let names: Vec<&str> = items[0].children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["run", "stop"]);
    }

    #[test]
    fn test_control_flow_not_a_method() {
        let src = "class A {\n  if (x) {}\n  while (y) {}\n  run() {}\n}\n";
        let items = run(src);
        let names: Vec<&str> = items[0].children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["run"]);
    }
}
