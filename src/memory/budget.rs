//! Token estimation and the pass-through preparation entrypoint.
//!
//! Whether and how to drop history is decided by the agent loop, which trims
//! whole oldest assistant+tool groups so surviving messages stay
//! byte-identical for provider prompt caching. This module only estimates
//! and reports.

use crate::config::MemoryConfig;
use crate::protocol::Message;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Approximate characters per token
const APPROX_CHARS_PER_TOKEN: usize = 4;

/// Fixed per-message overhead (role, separators), in characters
const MESSAGE_OVERHEAD_CHARS: usize = 20;

/// Where an estimate sits relative to the configured budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    WithinBudget,
    OverBudget,
    OverAggressiveBudget,
}

impl std::fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BudgetStatus::WithinBudget => write!(f, "within budget"),
            BudgetStatus::OverBudget => write!(f, "over budget"),
            BudgetStatus::OverAggressiveBudget => write!(f, "over aggressive budget"),
        }
    }
}

/// Coarse token estimate:
/// `ceil((content chars + serialized tool_calls chars + 20 * messages) / 4)`.
pub fn estimate_tokens(messages: &[Message]) -> usize {
    let chars: usize = messages
        .iter()
        .map(|msg| {
            let tool_calls = msg
                .tool_calls
                .as_ref()
                .and_then(|calls| serde_json::to_string(calls).ok())
                .map_or(0, |s| s.chars().count());
            msg.content_chars() + tool_calls + MESSAGE_OVERHEAD_CHARS
        })
        .sum();
    chars.div_ceil(APPROX_CHARS_PER_TOKEN)
}

/// Classify a token estimate against the configured budgets.
pub fn budget_status(tokens: usize, config: &MemoryConfig) -> BudgetStatus {
    if tokens > config.aggressive_token_budget {
        BudgetStatus::OverAggressiveBudget
    } else if tokens > config.token_budget {
        BudgetStatus::OverBudget
    } else {
        BudgetStatus::WithinBudget
    }
}

/// Log the estimate for `messages` and hand them back untouched.
///
/// The returned slice is the caller's own: nothing is dropped, reordered or
/// rewritten, so provider-side prompt caches keep hitting.
pub fn prepare_messages_with_memory<'a>(
    messages: &'a [Message],
    context_length: Option<usize>,
    config: &MemoryConfig,
) -> &'a [Message] {
    let tokens = estimate_tokens(messages);
    let context_length = context_length.unwrap_or(config.context_length);
    let usage_pct = (tokens * 100) / context_length.max(1);
    let status = budget_status(tokens, config);

    match status {
        BudgetStatus::WithinBudget => debug!(
            "Context estimate: {} tokens ({}% of {}), {}",
            tokens, usage_pct, context_length, status
        ),
        BudgetStatus::OverBudget => info!(
            "Context estimate: {} tokens ({}% of {}), {}; deferring to agent loop",
            tokens, usage_pct, context_length, status
        ),
        BudgetStatus::OverAggressiveBudget => warn!(
            "Context estimate: {} tokens ({}% of {}), {}; deferring to agent loop",
            tokens, usage_pct, context_length, status
        ),
    }

    messages
}
