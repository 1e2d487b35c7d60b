//! Generative service boundary: wire types and the [`ContentService`] trait.
//!
//! Request types serialize directly to the Messages API body. Responses are
//! deserialized only as far as the block structure; the tool input stays an
//! untyped [`serde_json::Value`] until [`super::contract`] validates it.

use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Service error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Unreadable response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A message in the conversation. Generation only ever sends one user turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Tool definition; its `input_schema` is the structured-output contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Forces the model to answer through one named tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolChoice {
    Tool { name: String },
}

/// Full request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceRequest {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub system: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse(ToolUseBlock),
    /// Block kinds this pipeline never acts on.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUseBlock {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Response body, as far as generation cares.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ServiceResponse {
    /// Every tool-use block, in response order.
    pub fn tool_uses(&self) -> impl Iterator<Item = &ToolUseBlock> {
        self.content.iter().filter_map(|b| match b {
            ContentBlock::ToolUse(tu) => Some(tu),
            _ => None,
        })
    }
}

/// Anything that can answer a [`ServiceRequest`].
///
/// The production implementation is
/// [`AnthropicService`](super::anthropic::AnthropicService); tests script
/// responses with in-process fakes.
pub trait ContentService {
    fn submit(
        &self,
        request: &ServiceRequest,
    ) -> impl Future<Output = Result<ServiceResponse, ServiceError>>;
}
