//! Extension → language table and extractor family dispatch.

use serde::Serialize;
use std::path::Path;

/// Languages recognised by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    TypeScript,
    JavaScript,
    Python,
    Java,
    Kotlin,
    CSharp,
    Go,
    Rust,
    Ruby,
    Php,
    C,
    Cpp,
    Swift,
    Vue,
    Svelte,
    Unknown,
}

/// Which line-scanner handles a language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// Curly-brace scoped, C-like declarations (TS/JS and their component formats)
    Brace,
    /// Indentation scoped (Python)
    Indent,
    /// Keyword scan only
    Generic,
}

impl Language {
    /// Detect the language from a path's extension. Unmapped → `Unknown`.
    pub fn from_path(path: &str) -> Self {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "ts" | "tsx" => Language::TypeScript,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "py" | "pyw" => Language::Python,
            "java" => Language::Java,
            "kt" | "kts" => Language::Kotlin,
            "cs" => Language::CSharp,
            "go" => Language::Go,
            "rs" => Language::Rust,
            "rb" => Language::Ruby,
            "php" => Language::Php,
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" => Language::Cpp,
            "swift" => Language::Swift,
            "vue" => Language::Vue,
            "svelte" => Language::Svelte,
            _ => Language::Unknown,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Java => "java",
            Language::Kotlin => "kotlin",
            Language::CSharp => "csharp",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Swift => "swift",
            Language::Vue => "vue",
            Language::Svelte => "svelte",
            Language::Unknown => "unknown",
        }
    }

    pub const fn family(&self) -> Family {
        match self {
            Language::TypeScript | Language::JavaScript | Language::Vue | Language::Svelte => {
                Family::Brace
            }
            Language::Python => Family::Indent,
            _ => Family::Generic,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
