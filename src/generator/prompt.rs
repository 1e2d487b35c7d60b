//! Request construction: system prompt, novelty summary, difficulty rotation.

use super::contract::{TOOL_NAME, tool_schema};
use super::service::{Message, ServiceRequest, ToolChoice, ToolDef};
use crate::config::GeneratorConfig;
use crate::types::{ContentRecord, Difficulty};
use rand::Rng;
use rand::seq::SliceRandom;

/// Shown to the model when there is no history yet.
pub const NO_HISTORY: &str = "(none — this is the first challenge)";

pub const SYSTEM_PROMPT: &str = r#"# TypeScript Daily Challenge Generator

Generate a single, self-contained TypeScript coding challenge for daily practice.

## Constraints
- Solvable in 20-30 minutes by a mid-level TypeScript engineer
- Must compile under `strict: true` with no `any` usage
- Provide only the challenge (type stubs, function signature, requirements), NOT the solution
- Include mock data or a test harness snippet so the solution can be verified

## Topic Rotation
Combine 3-5 of these aspects in today's challenge and vary the mix each time:

- **Typing**: union and discriminated union types, mapped and conditional types, generics,
  utility types, narrowing, branded types, template literal types, overloads, `satisfies`, `infer`
- **Concurrency**: Promise.all / allSettled / race, concurrency limits, retry logic,
  cancellation with AbortController
- **Fetching & I/O**: typed fetch abstractions, response validation, streaming, pagination
- **Parsing & Validation**: unknown-to-typed narrowing, safe JSON parsing, schema validation,
  Result<T, E> error types
- **Iteration & Aggregation**: reduce, groupBy, single-pass aggregation, generators, Map/Set
- **Data Structures**: trees, graphs, queues, LRU caches, tries with proper generic typing
- **Patterns**: builders, strategies, middleware chains, event emitters, state machines
- **Error Handling**: typed error hierarchies, exhaustive matching, graceful degradation

## Style Rules
- Prefer real-world scenarios over abstract puzzles
- The hardest part should be the TYPING, not the algorithm
- Never use `any`, `as`, or type assertions in the provided stubs
- Modern TS (5.x features welcome)"#;

/// Pick the next difficulty: uniformly among every tier except the previous one.
pub fn pick_difficulty<R: Rng + ?Sized>(previous: Option<Difficulty>, rng: &mut R) -> Difficulty {
    let eligible: Vec<Difficulty> = Difficulty::ALL
        .into_iter()
        .filter(|d| Some(*d) != previous)
        .collect();
    // Three tiers minus at most one is never empty.
    *eligible.choose(rng).unwrap_or(&Difficulty::Medium)
}

/// Bulleted summary of the last `n` records, oldest first.
pub fn summarize_recent(records: &[ContentRecord], n: usize) -> String {
    let start = records.len().saturating_sub(n);
    let recent = &records[start..];
    if recent.is_empty() {
        return NO_HISTORY.to_string();
    }
    recent
        .iter()
        .map(|r| format!("- {} ({}): {}", r.title, r.difficulty, r.description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The single user turn.
pub fn user_prompt(today: &str, difficulty: Difficulty, summary: &str) -> String {
    format!(
        "Generate today's TypeScript challenge ({today}).\n\n\
         Difficulty: **{difficulty}** (this is mandatory, do not pick a different level).\n\n\
         Recent challenges (avoid repeating these themes):\n{summary}"
    )
}

/// Assemble the complete request.
pub fn build_request(
    config: &GeneratorConfig,
    today: &str,
    difficulty: Difficulty,
    summary: &str,
) -> ServiceRequest {
    ServiceRequest {
        model: config.model.clone(),
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        system: SYSTEM_PROMPT.to_string(),
        messages: vec![Message::user(user_prompt(today, difficulty, summary))],
        tools: vec![ToolDef {
            name: TOOL_NAME.to_string(),
            description: "Submit the generated TypeScript challenge".to_string(),
            input_schema: tool_schema(),
        }],
        tool_choice: Some(ToolChoice::Tool {
            name: TOOL_NAME.to_string(),
        }),
    }
}
