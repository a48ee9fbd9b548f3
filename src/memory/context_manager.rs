//! Conversation memory: a bounded, cache-safe view of a message history.
//!
//! [`process_messages_for_memory`] rebuilds a [`MemoryState`] from scratch on
//! every call:
//!   - the leading system message is split off,
//!   - every tool call in the whole conversation lands in `tool_history`,
//!   - only the last K user-initiated pairs are kept in `recent_messages`,
//!   - large tool results inside that window are compacted.
//!
//! The input is never modified. Messages that pass through unchanged are
//! borrowed from the caller (same value, same address); compacted ones are
//! fresh owned copies.

use super::budget::{estimate_tokens, prepare_messages_with_memory};
use super::compact::{compress_tool_result, extract_file_path, CompressedResult};
use crate::config::MemoryConfig;
use crate::protocol::{Message, Role};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// One tool invocation seen in an assistant message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUsageRecord {
    pub name: String,
    /// Decoded arguments, in the order the model wrote them
    pub args: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

/// Derived view of a conversation, rebuilt on every call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryState<'a> {
    pub system_prompt: Option<String>,
    /// Last K pairs; borrowed where untouched, owned where compacted
    pub recent_messages: Vec<Cow<'a, Message>>,
    /// Every tool call in the whole conversation, oldest first
    pub tool_history: Vec<ToolUsageRecord>,
    /// path -> compact skeleton line, last write wins
    pub file_summaries: BTreeMap<String, String>,
}

impl MemoryState<'_> {
    /// Number of calls per tool name, in first-seen order.
    pub fn tool_usage_counts(&self) -> Vec<(&str, usize)> {
        let mut counts: Vec<(&str, usize)> = Vec::new();
        for record in &self.tool_history {
            match counts.iter_mut().find(|(name, _)| *name == record.name) {
                Some((_, count)) => *count += 1,
                None => counts.push((record.name.as_str(), 1)),
            }
        }
        counts
    }

    /// Tool calls whose arguments referenced `path`.
    pub fn tool_calls_for<'s>(&'s self, path: &'s str) -> impl Iterator<Item = &'s ToolUsageRecord> {
        self.tool_history
            .iter()
            .filter(move |record| record.file_path.as_deref() == Some(path))
    }

    /// Plain-text digest of tool usage and known files, for a prompt.
    pub fn to_prompt_string(&self) -> String {
        let mut out = String::new();

        let counts = self.tool_usage_counts();
        if !counts.is_empty() {
            let usage: Vec<String> = counts
                .iter()
                .map(|(name, count)| format!("{name} x{count}"))
                .collect();
            out.push_str(&format!(
                "Tool usage ({} calls): {}\n",
                self.tool_history.len(),
                usage.join(", ")
            ));
        }

        let mut touched: Vec<&str> = Vec::new();
        for path in self.tool_history.iter().filter_map(|r| r.file_path.as_deref()) {
            if !touched.contains(&path) {
                touched.push(path);
            }
        }
        if !touched.is_empty() {
            out.push_str(&format!("Files touched: {}\n", touched.join(", ")));
        }

        if !self.file_summaries.is_empty() {
            out.push_str("File outlines:\n");
            for summary in self.file_summaries.values() {
                out.push_str(summary);
                out.push('\n');
            }
        }

        out
    }
}

/// Tool-call lookup keyed by call id, built once per pass
#[derive(Debug, Default)]
pub struct ToolCallIndex {
    calls: HashMap<String, IndexedCall>,
}

#[derive(Debug)]
struct IndexedCall {
    name: String,
    args: Map<String, Value>,
}

impl ToolCallIndex {
    /// Index the tool calls of every assistant message. The first call seen
    /// for an id wins; undecodable arguments index as an empty object.
    pub fn build<'m>(messages: impl IntoIterator<Item = &'m Message>) -> Self {
        let mut calls = HashMap::new();
        for msg in messages.into_iter().filter(|m| m.role == Role::Assistant) {
            for call in msg.tool_calls.iter().flatten() {
                calls.entry(call.id.clone()).or_insert_with(|| IndexedCall {
                    name: call.function.name.clone(),
                    args: parse_args(&call.function.arguments).unwrap_or_default(),
                });
            }
        }
        Self { calls }
    }

    /// Tool name and arguments for a call id.
    pub fn get(&self, call_id: &str) -> Option<(&str, &Map<String, Value>)> {
        self.calls
            .get(call_id)
            .map(|call| (call.name.as_str(), &call.args))
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

/// Decode a tool-call argument payload. Anything but a JSON object is `None`.
fn parse_args(raw: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Every tool call in assistant messages, oldest first. A call whose
/// arguments do not decode is dropped on its own.
fn collect_tool_history(messages: &[Message]) -> Vec<ToolUsageRecord> {
    let mut history = Vec::new();
    for msg in messages.iter().filter(|m| m.role == Role::Assistant) {
        for call in msg.tool_calls.iter().flatten() {
            let Some(args) = parse_args(&call.function.arguments) else {
                debug!(
                    "Dropping tool call {} ({}): arguments are not a JSON object",
                    call.id, call.function.name
                );
                continue;
            };
            let file_path = extract_file_path(&call.function.name, &args);
            history.push(ToolUsageRecord {
                name: call.function.name.clone(),
                args,
                timestamp: Utc::now(),
                file_path,
            });
        }
    }
    history
}

/// Start index of every pair: each user message, plus index 0 so a leading
/// run of non-user messages forms a pair of its own.
fn pair_starts(messages: &[Message]) -> Vec<usize> {
    messages
        .iter()
        .enumerate()
        .filter(|(idx, msg)| *idx == 0 || msg.is_user())
        .map(|(idx, _)| idx)
        .collect()
}

/// Build the bounded memory view of `messages`.
pub fn process_messages_for_memory<'a>(
    messages: &'a [Message],
    config: &MemoryConfig,
) -> MemoryState<'a> {
    let (system_prompt, rest) = match messages.split_first() {
        Some((first, rest)) if first.role == Role::System => (first.content.clone(), rest),
        _ => (None, messages),
    };

    let tool_history = collect_tool_history(messages);

    let starts = pair_starts(rest);
    let kept_pairs = starts.len().min(config.window_pairs);
    let window_start = match starts.len() - kept_pairs {
        dropped if dropped < starts.len() => starts[dropped],
        _ => rest.len(),
    };
    let retained = &rest[window_start..];

    let index = ToolCallIndex::build(retained);
    let no_args = Map::new();
    let mut file_summaries = BTreeMap::new();

    let recent_messages: Vec<Cow<'a, Message>> = retained
        .iter()
        .map(|msg| {
            let content = match (msg.role, msg.content.as_deref()) {
                (Role::Tool, Some(content)) => content,
                _ => return Cow::Borrowed(msg),
            };

            let (tool_name, args) = msg
                .tool_call_id
                .as_deref()
                .and_then(|id| index.get(id))
                .unwrap_or((msg.name.as_deref().unwrap_or("unknown"), &no_args));

            let result: CompressedResult<'a> =
                compress_tool_result(tool_name, args, content, config.compression_threshold);

            if let (Some(path), Some(skeleton)) = (&result.file_path, &result.skeleton) {
                file_summaries.insert(path.clone(), skeleton.to_compact_string());
            }

            if result.was_compressed() {
                let mut compacted = msg.clone();
                compacted.content = Some(result.compressed.into_owned());
                Cow::Owned(compacted)
            } else {
                Cow::Borrowed(msg)
            }
        })
        .collect();

    debug!(
        "Memory window: kept {} of {} pairs ({} messages), {} tool calls recorded, {} file summaries",
        kept_pairs,
        starts.len(),
        recent_messages.len(),
        tool_history.len(),
        file_summaries.len()
    );

    MemoryState {
        system_prompt,
        recent_messages,
        tool_history,
        file_summaries,
    }
}

/// Holds a [`MemoryConfig`] and forwards to the memory primitives with it.
#[derive(Debug, Clone, Default)]
pub struct MemoryManager {
    config: MemoryConfig,
}

impl MemoryManager {
    pub fn new(config: MemoryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn process<'a>(&self, messages: &'a [Message]) -> MemoryState<'a> {
        process_messages_for_memory(messages, &self.config)
    }

    pub fn compress<'a>(
        &self,
        tool_name: &str,
        args: &Map<String, Value>,
        result: &'a str,
    ) -> CompressedResult<'a> {
        compress_tool_result(tool_name, args, result, self.config.compression_threshold)
    }

    pub fn prepare<'a>(&self, messages: &'a [Message], context_length: Option<usize>) -> &'a [Message] {
        prepare_messages_with_memory(messages, context_length, &self.config)
    }

    pub fn estimate_tokens(&self, messages: &[Message]) -> usize {
        estimate_tokens(messages)
    }
}
