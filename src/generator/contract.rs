//! Structured-output contract between the generator and the model.
//!
//! The model answers by "calling" the `submit_challenge` tool; the tool's
//! input is whatever JSON the model produced. Nothing about its shape is
//! trusted: [`validate_payload`] walks it field by field and only a fully
//! conforming payload becomes a [`ChallengePayload`].
//!
//! | Field | Type | Required |
//! |---|---|---|
//! | `title` | string | yes |
//! | `difficulty` | `"Easy"` \| `"Medium"` \| `"Hard"` | yes |
//! | `scenario` | string | yes |
//! | `challengeTS` | string | yes |
//! | `testHarnessTS` | string | yes |
//! | `evaluationChecklist` | string | yes |
//! | `snippet` | string | yes |
//! | `goals` | string[] | yes |
//! | `hints` | string[] | yes |
//! | `docs` | `{title, url}`[] | yes |
//! | `bonus` | string | no |

use super::service::ServiceResponse;
use crate::types::{Difficulty, DocLink};
use serde_json::{Map, Value, json};
use thiserror::Error;

/// Name of the tool the model must answer through.
pub const TOOL_NAME: &str = "submit_challenge";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContractError {
    #[error("No submit_challenge tool call in response (stop reason: {0})")]
    NoToolUse(String),
    #[error("Tool input is not a JSON object")]
    NotAnObject,
    #[error("Missing required field `{0}`")]
    MissingField(String),
    #[error("Field `{field}` must be {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },
    #[error("Unknown difficulty {0:?}")]
    InvalidDifficulty(String),
}

/// A tool input that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChallengePayload {
    pub title: String,
    pub difficulty: Difficulty,
    pub scenario: String,
    pub challenge_source: String,
    pub test_source: String,
    pub evaluation_checklist: String,
    /// Empty when the model offered no stretch goal.
    pub bonus: String,
    pub snippet: String,
    pub goals: Vec<String>,
    pub hints: Vec<String>,
    pub docs: Vec<DocLink>,
}

/// JSON schema handed to the model as the tool's `input_schema`.
pub fn tool_schema() -> Value {
    let tiers: Vec<&str> = Difficulty::ALL.iter().map(|d| d.as_str()).collect();
    json!({
        "type": "object",
        "required": [
            "title", "difficulty", "scenario", "challengeTS", "testHarnessTS",
            "evaluationChecklist", "snippet", "goals", "hints", "docs"
        ],
        "properties": {
            "title": {
                "type": "string",
                "description": "Short descriptive challenge name"
            },
            "difficulty": {
                "type": "string",
                "enum": tiers,
                "description": "Challenge difficulty level"
            },
            "scenario": {
                "type": "string",
                "description": "1-2 sentences of real-world context"
            },
            "challengeTS": {
                "type": "string",
                "description": "Full contents of challenge.ts: type stubs, function signatures, TODO comments and numbered requirements. Must compile under strict: true with no any."
            },
            "testHarnessTS": {
                "type": "string",
                "description": "Full contents of challenge.test.ts: imports from './challenge', mock data, 3-5 console.assert checks"
            },
            "evaluationChecklist": {
                "type": "string",
                "description": "Markdown table mapping TS skills exercised and where in the code"
            },
            "bonus": {
                "type": "string",
                "description": "One optional stretch goal sentence, or empty string"
            },
            "snippet": {
                "type": "string",
                "description": "Self-contained preview (12-20 lines) showing the core types and the main function signature"
            },
            "goals": {
                "type": "array",
                "items": { "type": "string" },
                "description": "3-4 concise imperative sentences describing what the user must accomplish"
            },
            "hints": {
                "type": "array",
                "items": { "type": "string" },
                "description": "2-3 concise tips nudging toward the right TS feature, not answers"
            },
            "docs": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["title", "url"],
                    "properties": {
                        "title": { "type": "string", "description": "Short label for the link" },
                        "url": { "type": "string", "description": "Official TypeScript handbook, MDN, or other real reference URL" }
                    }
                },
                "description": "2-4 links to relevant documentation"
            }
        }
    })
}

/// Pull the tool input out of a response.
///
/// Free text alone, or a tool call to any other tool, is a violation.
pub fn extract_payload(response: &ServiceResponse) -> Result<ChallengePayload, ContractError> {
    let tool_use = response
        .tool_uses()
        .find(|tu| tu.name == TOOL_NAME)
        .ok_or_else(|| {
            ContractError::NoToolUse(
                response
                    .stop_reason
                    .clone()
                    .unwrap_or_else(|| "none".to_string()),
            )
        })?;
    validate_payload(&tool_use.input)
}

/// Validate an untyped tool input against the contract.
pub fn validate_payload(input: &Value) -> Result<ChallengePayload, ContractError> {
    let obj = input.as_object().ok_or(ContractError::NotAnObject)?;

    let difficulty_label = required_str(obj, "difficulty")?;
    let difficulty = Difficulty::parse(&difficulty_label)
        .ok_or(ContractError::InvalidDifficulty(difficulty_label))?;

    Ok(ChallengePayload {
        title: required_str(obj, "title")?,
        difficulty,
        scenario: required_str(obj, "scenario")?,
        challenge_source: required_str(obj, "challengeTS")?,
        test_source: required_str(obj, "testHarnessTS")?,
        evaluation_checklist: required_str(obj, "evaluationChecklist")?,
        bonus: optional_str(obj, "bonus")?,
        snippet: required_str(obj, "snippet")?,
        goals: string_array(obj, "goals")?,
        hints: string_array(obj, "hints")?,
        docs: doc_links(obj)?,
    })
}

fn required<'a>(obj: &'a Map<String, Value>, field: &str) -> Result<&'a Value, ContractError> {
    obj.get(field)
        .ok_or_else(|| ContractError::MissingField(field.to_string()))
}

fn as_string(value: &Value, field: &str) -> Result<String, ContractError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ContractError::WrongType {
            field: field.to_string(),
            expected: "a string",
        })
}

fn required_str(obj: &Map<String, Value>, field: &str) -> Result<String, ContractError> {
    as_string(required(obj, field)?, field)
}

/// Absent and `null` both read as "no value".
fn optional_str(obj: &Map<String, Value>, field: &str) -> Result<String, ContractError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(value) => as_string(value, field),
    }
}

fn array<'a>(obj: &'a Map<String, Value>, field: &str) -> Result<&'a Vec<Value>, ContractError> {
    required(obj, field)?
        .as_array()
        .ok_or_else(|| ContractError::WrongType {
            field: field.to_string(),
            expected: "an array",
        })
}

fn string_array(obj: &Map<String, Value>, field: &str) -> Result<Vec<String>, ContractError> {
    array(obj, field)?
        .iter()
        .enumerate()
        .map(|(i, item)| as_string(item, &format!("{field}[{i}]")))
        .collect()
}

fn doc_links(obj: &Map<String, Value>) -> Result<Vec<DocLink>, ContractError> {
    array(obj, "docs")?
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let path = format!("docs[{i}]");
            let link = item.as_object().ok_or_else(|| ContractError::WrongType {
                field: path.clone(),
                expected: "an object",
            })?;
            let title = link
                .get("title")
                .ok_or_else(|| ContractError::MissingField(format!("{path}.title")))?;
            let url = link
                .get("url")
                .ok_or_else(|| ContractError::MissingField(format!("{path}.url")))?;
            Ok(DocLink {
                title: as_string(title, &format!("{path}.title"))?,
                url: as_string(url, &format!("{path}.url"))?,
            })
        })
        .collect()
}
