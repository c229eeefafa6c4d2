//! Test doubles for the orchestration engine.
//!
//! [`ScriptedModel`] plays back queued responses for each of the three
//! provider call shapes. Clones share the script and the recorded
//! prompts, so a test can keep a handle for assertions while the code
//! under test owns another.
//!
//! Exposed as a regular module (not `#[cfg(test)]`) so downstream crates
//! can drive the orchestrator in their own tests.

use helpdesk_core::error::ProviderError;
use helpdesk_core::provider::{
    ChatRequest, LanguageModel, StreamChunk, ToolInvocation, Usage,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One scripted tool-calling step.
pub enum ScriptedStep {
    /// The model answers with text and ends the exchange.
    Text(String),
    /// The model requests tool calls (optionally preceded by text).
    ToolCalls {
        content: String,
        calls: Vec<ToolInvocation>,
    },
    /// The step fails outright.
    Fail(ProviderError),
}

#[derive(Default)]
struct Inner {
    text_script: Mutex<VecDeque<Result<String, ProviderError>>>,
    object_script: Mutex<VecDeque<Result<serde_json::Value, ProviderError>>>,
    step_script: Mutex<VecDeque<ScriptedStep>>,
    prompts: Mutex<Vec<String>>,
    step_requests: Mutex<Vec<ChatRequest>>,
}

/// A mock `LanguageModel` that returns queued responses.
///
/// When a queue runs dry the model falls back to a benign default, so
/// tests only script the calls they care about.
#[derive(Clone, Default)]
pub struct ScriptedModel {
    inner: Arc<Inner>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a free-text response.
    pub fn push_text(self, text: &str) -> Self {
        self.inner
            .text_script
            .lock()
            .expect("script lock")
            .push_back(Ok(text.to_string()));
        self
    }

    /// Queue a free-text failure.
    pub fn push_text_err(self, err: ProviderError) -> Self {
        self.inner
            .text_script
            .lock()
            .expect("script lock")
            .push_back(Err(err));
        self
    }

    /// Queue a structured-output response.
    pub fn push_object(self, value: serde_json::Value) -> Self {
        self.inner
            .object_script
            .lock()
            .expect("script lock")
            .push_back(Ok(value));
        self
    }

    /// Queue a structured-output failure.
    pub fn push_object_err(self, err: ProviderError) -> Self {
        self.inner
            .object_script
            .lock()
            .expect("script lock")
            .push_back(Err(err));
        self
    }

    /// Queue a terminal text step for the tool-calling loop.
    pub fn push_step_text(self, text: &str) -> Self {
        self.inner
            .step_script
            .lock()
            .expect("script lock")
            .push_back(ScriptedStep::Text(text.to_string()));
        self
    }

    /// Queue a tool-call step for the tool-calling loop.
    pub fn push_step_tool_calls(self, content: &str, calls: Vec<ToolInvocation>) -> Self {
        self.inner
            .step_script
            .lock()
            .expect("script lock")
            .push_back(ScriptedStep::ToolCalls {
                content: content.to_string(),
                calls,
            });
        self
    }

    /// Queue a failing step for the tool-calling loop.
    pub fn push_step_err(self, err: ProviderError) -> Self {
        self.inner
            .step_script
            .lock()
            .expect("script lock")
            .push_back(ScriptedStep::Fail(err));
        self
    }

    /// User prompts received by `generate_text` / `generate_object`.
    pub fn recorded_prompts(&self) -> Vec<String> {
        self.inner.prompts.lock().expect("script lock").clone()
    }

    /// Requests received by `stream_step`.
    pub fn recorded_step_requests(&self) -> Vec<ChatRequest> {
        self.inner
            .step_requests
            .lock()
            .expect("script lock")
            .clone()
    }

    fn record_prompt(&self, prompt: &str) {
        self.inner
            .prompts
            .lock()
            .expect("script lock")
            .push(prompt.to_string());
    }
}

/// Build a tool invocation the way a model would emit it.
pub fn make_tool_invocation(name: &str, args: serde_json::Value) -> ToolInvocation {
    ToolInvocation {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: args.to_string(),
    }
}

#[async_trait::async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate_object(
        &self,
        _system: &str,
        prompt: &str,
        _schema: &serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        self.record_prompt(prompt);
        self.inner
            .object_script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| {
                Ok(serde_json::json!({
                    "intent": "general",
                    "confidence": 0.5,
                    "reasoning": "Scripted default classification."
                }))
            })
    }

    async fn generate_text(&self, _system: &str, prompt: &str) -> Result<String, ProviderError> {
        self.record_prompt(prompt);
        self.inner
            .text_script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Ok("Scripted text response.".into()))
    }

    async fn stream_step(
        &self,
        request: ChatRequest,
    ) -> Result<
        tokio::sync::mpsc::Receiver<Result<StreamChunk, ProviderError>>,
        ProviderError,
    > {
        self.inner
            .step_requests
            .lock()
            .expect("script lock")
            .push(request);

        let step = self
            .inner
            .step_script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| ScriptedStep::Text("Hello! How can I help?".into()));

        match step {
            ScriptedStep::Fail(err) => Err(err),
            ScriptedStep::Text(text) => {
                let (tx, rx) = tokio::sync::mpsc::channel(8);
                // Split the text so callers see real incremental chunks.
                let mut mid = text.len() / 2;
                while mid < text.len() && !text.is_char_boundary(mid) {
                    mid += 1;
                }
                let (head, tail) = text.split_at(mid);
                for part in [head, tail] {
                    if !part.is_empty() {
                        let _ = tx
                            .send(Ok(StreamChunk {
                                content: Some(part.to_string()),
                                tool_calls: Vec::new(),
                                done: false,
                                usage: None,
                            }))
                            .await;
                    }
                }
                let _ = tx
                    .send(Ok(StreamChunk {
                        content: None,
                        tool_calls: Vec::new(),
                        done: true,
                        usage: Some(Usage {
                            prompt_tokens: 10,
                            completion_tokens: 5,
                            total_tokens: 15,
                        }),
                    }))
                    .await;
                Ok(rx)
            }
            ScriptedStep::ToolCalls { content, calls } => {
                let (tx, rx) = tokio::sync::mpsc::channel(8);
                if !content.is_empty() {
                    let _ = tx
                        .send(Ok(StreamChunk {
                            content: Some(content),
                            tool_calls: Vec::new(),
                            done: false,
                            usage: None,
                        }))
                        .await;
                }
                let _ = tx
                    .send(Ok(StreamChunk {
                        content: None,
                        tool_calls: calls,
                        done: true,
                        usage: None,
                    }))
                    .await;
                Ok(rx)
            }
        }
    }
}
