//! OpenAI-compatible provider implementation.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, Together AI, and any
//! endpoint exposing `/v1/chat/completions`.
//!
//! Supports:
//! - Free-text completions (titles, summaries)
//! - Structured output via `response_format: json_schema` (classifier)
//! - Streaming SSE with incremental tool-call delta accumulation
//!   (the agent loop's step primitive)

use async_trait::async_trait;
use futures::StreamExt;
use helpdesk_core::error::ProviderError;
use helpdesk_core::message::Role;
use helpdesk_core::provider::{
    ChatRequest, LanguageModel, PromptMessage, StreamChunk, ToolDefinition, ToolInvocation, Usage,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// An OpenAI-compatible language model backend.
pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    model: String,
    router_model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: "gpt-4o-mini".into(),
            router_model: "gpt-4o-mini".into(),
            temperature: 0.7,
            max_tokens: None,
            client,
        }
    }

    /// Set the response model and the (typically lighter) classifier model.
    pub fn with_models(mut self, model: impl Into<String>, router_model: impl Into<String>) -> Self {
        self.model = model.into();
        self.router_model = router_model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Convert prompt messages to the OpenAI wire format.
    fn to_api_messages(system: &str, messages: &[PromptMessage]) -> Vec<ApiMessage> {
        let mut out = Vec::with_capacity(messages.len() + 1);
        if !system.is_empty() {
            out.push(ApiMessage {
                role: "system".into(),
                content: Some(system.to_string()),
                tool_calls: None,
                tool_call_id: None,
            });
        }
        for m in messages {
            out.push(ApiMessage {
                role: match m.role {
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                    Role::System => "system".into(),
                    Role::Tool => "tool".into(),
                },
                content: Some(m.content.clone()),
                tool_calls: if m.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        m.tool_calls
                            .iter()
                            .map(|tc| ApiToolCall {
                                id: tc.id.clone(),
                                r#type: "function".into(),
                                function: ApiFunction {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.clone(),
                                },
                            })
                            .collect(),
                    )
                },
                tool_call_id: m.tool_call_id.clone(),
            });
        }
        out
    }

    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    /// Map a non-200 status to a provider error. 429 becomes the quota
    /// variant that aborts the whole request upstream.
    async fn status_to_error(response: reqwest::Response) -> ProviderError {
        let status = response.status().as_u16();
        match status {
            429 => ProviderError::RateLimited {
                retry_after_secs: 5,
            },
            401 | 403 => ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ),
            _ => {
                let body = response.text().await.unwrap_or_default();
                warn!(status, body = %body, "Provider returned error");
                ProviderError::ApiError {
                    status_code: status,
                    message: body,
                }
            }
        }
    }

    /// One non-streaming completion, returning the raw content string.
    async fn complete_content(
        &self,
        model: &str,
        body: serde_json::Value,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!(model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        if response.status().as_u16() != 200 {
            return Err(Self::status_to_error(response).await);
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 200,
                message: "No choices in response".into(),
            })?;

        Ok(choice.message.content.unwrap_or_default())
    }
}

#[async_trait]
impl LanguageModel for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate_object(
        &self,
        system: &str,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let body = serde_json::json!({
            "model": self.router_model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt },
            ],
            "temperature": 0.0,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "structured_output",
                    "schema": schema,
                    "strict": true,
                },
            },
        });

        let content = self.complete_content(&self.router_model, body).await?;

        serde_json::from_str(&content)
            .map_err(|e| ProviderError::InvalidStructuredOutput(format!("{e}: {content}")))
    }

    async fn generate_text(&self, system: &str, prompt: &str) -> Result<String, ProviderError> {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt },
            ],
            "temperature": self.temperature,
        });
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        self.complete_content(&self.model, body).await
    }

    async fn stream_step(
        &self,
        request: ChatRequest,
    ) -> Result<
        tokio::sync::mpsc::Receiver<Result<StreamChunk, ProviderError>>,
        ProviderError,
    > {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": Self::to_api_messages(&request.system, &request.messages),
            "temperature": request.temperature,
            "stream": true,
            "stream_options": { "include_usage": true },
        });

        if let Some(max_tokens) = request.max_tokens.or(self.max_tokens) {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        debug!(model = %self.model, tools = request.tools.len(), "Sending streaming request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if response.status().as_u16() != 200 {
            return Err(Self::status_to_error(response).await);
        }

        let (tx, rx) = tokio::sync::mpsc::channel(64);

        // Spawn a task to read the SSE byte stream and parse chunks
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();

            // Accumulators for tool call deltas (keyed by index)
            let mut accumulators: std::collections::BTreeMap<u32, ToolCallAccumulator> =
                std::collections::BTreeMap::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&bytes));

                // Process complete lines
                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim_end_matches('\r').to_string();
                    buffer = buffer[line_end + 1..].to_string();

                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }

                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    let data = data.trim();

                    // "[DONE]" signals end of stream
                    if data == "[DONE]" {
                        let _ = tx
                            .send(Ok(StreamChunk {
                                content: None,
                                tool_calls: drain_accumulators(&mut accumulators),
                                done: true,
                                usage: None,
                            }))
                            .await;
                        return;
                    }

                    match serde_json::from_str::<SseResponse>(data) {
                        Ok(sse) => {
                            if let Some(choice) = sse.choices.first() {
                                let delta = &choice.delta;

                                if let Some(ref tc_deltas) = delta.tool_calls {
                                    for tc_delta in tc_deltas {
                                        let acc = accumulators
                                            .entry(tc_delta.index)
                                            .or_default();

                                        if let Some(ref id) = tc_delta.id {
                                            acc.id = id.clone();
                                        }
                                        if let Some(ref func) = tc_delta.function {
                                            if let Some(ref name) = func.name {
                                                acc.name = name.clone();
                                            }
                                            if let Some(ref args) = func.arguments {
                                                acc.arguments.push_str(args);
                                            }
                                        }
                                    }
                                }

                                let has_content =
                                    delta.content.as_ref().is_some_and(|c| !c.is_empty());
                                if has_content {
                                    let chunk = StreamChunk {
                                        content: delta.content.clone(),
                                        tool_calls: Vec::new(),
                                        done: false,
                                        usage: None,
                                    };
                                    if tx.send(Ok(chunk)).await.is_err() {
                                        return; // receiver dropped
                                    }
                                }
                            }

                            // Usage arrives in the final chunk when
                            // stream_options.include_usage is set
                            if let Some(usage) = sse.usage {
                                let chunk = StreamChunk {
                                    content: None,
                                    tool_calls: drain_accumulators(&mut accumulators),
                                    done: true,
                                    usage: Some(Usage {
                                        prompt_tokens: usage.prompt_tokens,
                                        completion_tokens: usage.completion_tokens,
                                        total_tokens: usage.total_tokens,
                                    }),
                                };
                                let _ = tx.send(Ok(chunk)).await;
                                return;
                            }
                        }
                        Err(e) => {
                            trace!(data = %data, error = %e, "Ignoring unparseable SSE chunk");
                        }
                    }
                }
            }

            // Stream ended without [DONE] — send final chunk
            let _ = tx
                .send(Ok(StreamChunk {
                    content: None,
                    tool_calls: drain_accumulators(&mut accumulators),
                    done: true,
                    usage: None,
                }))
                .await;
        });

        Ok(rx)
    }
}

fn drain_accumulators(
    accumulators: &mut std::collections::BTreeMap<u32, ToolCallAccumulator>,
) -> Vec<ToolInvocation> {
    std::mem::take(accumulators)
        .into_values()
        .map(ToolCallAccumulator::into_invocation)
        .collect()
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

// --- Streaming SSE types ---

/// A single SSE `data: {...}` chunk from a streaming response.
#[derive(Debug, Deserialize)]
struct SseResponse {
    #[serde(default)]
    choices: Vec<SseChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct SseChoice {
    delta: SseDelta,
    #[serde(default)]
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SseDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<SseToolCallDelta>>,
}

/// A tool call delta — arrives incrementally across chunks.
#[derive(Debug, Deserialize)]
struct SseToolCallDelta {
    index: u32,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<SseFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct SseFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

/// Accumulates incremental tool call deltas into a complete invocation.
#[derive(Default)]
struct ToolCallAccumulator {
    id: String,
    name: String,
    arguments: String,
}

impl ToolCallAccumulator {
    fn into_invocation(self) -> ToolInvocation {
        ToolInvocation {
            id: self.id,
            name: self.name,
            arguments: self.arguments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let provider = OpenAiProvider::new("https://api.openai.com/v1/", "sk-test");
        assert_eq!(provider.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn message_conversion_prepends_system() {
        let messages = vec![PromptMessage::user("Hello")];
        let api_messages = OpenAiProvider::to_api_messages("You are helpful", &messages);
        assert_eq!(api_messages.len(), 2);
        assert_eq!(api_messages[0].role, "system");
        assert_eq!(api_messages[1].role, "user");
    }

    #[test]
    fn message_conversion_with_tool_calls() {
        let mut msg = PromptMessage::assistant("");
        msg.tool_calls = vec![ToolInvocation {
            id: "call_1".into(),
            name: "get_order_details".into(),
            arguments: r#"{"order_number":"ORD-001"}"#.into(),
        }];
        let api_msgs = OpenAiProvider::to_api_messages("", &[msg]);
        assert_eq!(api_msgs.len(), 1);
        let tc = api_msgs[0].tool_calls.as_ref().unwrap();
        assert_eq!(tc.len(), 1);
        assert_eq!(tc[0].function.name, "get_order_details");
        assert_eq!(tc[0].r#type, "function");
    }

    #[test]
    fn message_conversion_tool_response() {
        let msg = PromptMessage::tool_result("call_1", "{\"error\":null,\"data\":{}}");
        let api_msgs = OpenAiProvider::to_api_messages("", &[msg]);
        assert_eq!(api_msgs[0].role, "tool");
        assert_eq!(api_msgs[0].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn tool_definition_conversion() {
        let tools = vec![ToolDefinition {
            name: "search_faq".into(),
            description: "Search the FAQ".into(),
            parameters: serde_json::json!({"type": "object"}),
        }];
        let api_tools = OpenAiProvider::to_api_tools(&tools);
        assert_eq!(api_tools.len(), 1);
        assert_eq!(api_tools[0].function.name, "search_faq");
        assert_eq!(api_tools[0].r#type, "function");
    }

    // --- SSE parsing tests ---

    #[test]
    fn parse_stream_content_delta() {
        let data = r#"{"choices":[{"delta":{"content":"Hello"},"finish_reason":null}]}"#;
        let parsed: SseResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.choices.len(), 1);
        assert_eq!(parsed.choices[0].delta.content.as_deref(), Some("Hello"));
    }

    #[test]
    fn parse_stream_tool_call_delta() {
        let data = r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_abc","function":{"name":"search_faq","arguments":""}}]},"finish_reason":null}]}"#;
        let parsed: SseResponse = serde_json::from_str(data).unwrap();
        let tc = &parsed.choices[0].delta.tool_calls.as_ref().unwrap()[0];
        assert_eq!(tc.index, 0);
        assert_eq!(tc.id.as_deref(), Some("call_abc"));
        assert_eq!(
            tc.function.as_ref().unwrap().name.as_deref(),
            Some("search_faq")
        );
    }

    #[test]
    fn parse_stream_tool_call_arguments_delta() {
        // Arguments arrive incrementally as fragments
        let data = r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"topic\""}}]},"finish_reason":null}]}"#;
        let parsed: SseResponse = serde_json::from_str(data).unwrap();
        let tc = &parsed.choices[0].delta.tool_calls.as_ref().unwrap()[0];
        assert!(tc.id.is_none()); // ID only in first delta
        assert_eq!(
            tc.function.as_ref().unwrap().arguments.as_deref(),
            Some("{\"topic\"")
        );
    }

    #[test]
    fn parse_stream_usage() {
        let data = r#"{"choices":[],"usage":{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15}}"#;
        let parsed: SseResponse = serde_json::from_str(data).unwrap();
        let usage = parsed.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 10);
        assert_eq!(usage.total_tokens, 15);
    }

    #[test]
    fn tool_call_accumulator_assembly() {
        let mut acc = ToolCallAccumulator::default();

        // First delta: id + name
        acc.id = "call_123".into();
        acc.name = "get_order_details".into();
        acc.arguments.push_str("{\"order_number\"");

        // Second delta: more arguments
        acc.arguments.push_str(": \"ORD-001\"}");

        let tc = acc.into_invocation();
        assert_eq!(tc.id, "call_123");
        assert_eq!(tc.name, "get_order_details");
        assert_eq!(tc.arguments, "{\"order_number\": \"ORD-001\"}");
    }

    #[test]
    fn drain_preserves_index_order() {
        let mut accs = std::collections::BTreeMap::new();
        accs.insert(
            1,
            ToolCallAccumulator {
                id: "call_b".into(),
                name: "second".into(),
                arguments: String::new(),
            },
        );
        accs.insert(
            0,
            ToolCallAccumulator {
                id: "call_a".into(),
                name: "first".into(),
                arguments: String::new(),
            },
        );
        let drained = drain_accumulators(&mut accs);
        assert_eq!(drained[0].name, "first");
        assert_eq!(drained[1].name, "second");
        assert!(accs.is_empty());
    }

    #[test]
    fn parse_multiple_tool_calls_in_stream() {
        let data = r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_a","function":{"name":"search_faq","arguments":""}},{"index":1,"id":"call_b","function":{"name":"list_user_orders","arguments":""}}]},"finish_reason":null}]}"#;
        let parsed: SseResponse = serde_json::from_str(data).unwrap();
        let tcs = parsed.choices[0].delta.tool_calls.as_ref().unwrap();
        assert_eq!(tcs.len(), 2);
        assert_eq!(tcs[0].index, 0);
        assert_eq!(tcs[1].index, 1);
    }

    #[test]
    fn parse_empty_delta() {
        let data = r#"{"choices":[{"delta":{},"finish_reason":null}]}"#;
        let parsed: SseResponse = serde_json::from_str(data).unwrap();
        assert!(parsed.choices[0].delta.content.is_none());
        assert!(parsed.choices[0].delta.tool_calls.is_none());
    }
}
