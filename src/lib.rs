//! ctxguard - context and edit reliability for coding agents
//!
//! Three pieces an agent loop leans on:
//! - [`skeleton`]: reduce a source file to a structural outline
//! - [`memory`]: keep a long tool-using conversation bounded and cache-safe
//! - [`patch`]: apply an edit even when the agent's view of the file drifted

pub mod config;
pub mod memory;
pub mod patch;
pub mod protocol;
pub mod skeleton;

pub use config::{CtxguardConfig, MemoryConfig};
pub use memory::{
    compress_tool_result, estimate_tokens, prepare_messages_with_memory,
    process_messages_for_memory, MemoryManager, MemoryState, ToolUsageRecord,
};
pub use patch::{apply_edits, locate, EditOp, MatchStrategy, PatchError, PatchMatch};
pub use protocol::{Message, Role, ToolCall};
pub use skeleton::{extract_skeleton, FileSkeleton, ItemKind, Language, SkeletonItem};

/// Result type for ctxguard operations
pub type Result<T> = std::result::Result<T, CtxguardError>;

/// Errors that can occur in ctxguard
#[derive(Debug, thiserror::Error)]
pub enum CtxguardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Patch error: {0}")]
    Patch(#[from] PatchError),
}
