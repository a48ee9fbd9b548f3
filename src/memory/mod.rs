//! Conversation memory for the agent loop.
//!
//! Keeps the prompt bounded without breaking provider prompt caching:
//! tool results are compacted (skeletons for files, truncation otherwise),
//! only a window of recent exchanges is kept in the derived view, and the
//! token estimate is reported rather than acted on.

mod budget;
mod compact;
mod context_manager;

pub use budget::{budget_status, estimate_tokens, prepare_messages_with_memory, BudgetStatus};
pub use compact::{
    compress_tool_result, extract_file_path, is_file_content, CompressedResult, FILE_PATH_KEYS,
    FILE_READ_PREFIX, FILE_TOOLS,
};
pub use context_manager::{
    process_messages_for_memory, MemoryManager, MemoryState, ToolCallIndex, ToolUsageRecord,
};
