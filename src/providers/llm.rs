//! Language-model invokers.
//!
//! Two interchangeable backends: an HTTP chat-completions client for hosted
//! models, and a subprocess command for local models or test harnesses. Both
//! return the raw response text; all parsing and repair happens in the
//! reasoning steps.
use super::LanguageModel;
use crate::settings::LlmSettings;
use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Instant;

/// Chat-completions client (OpenAI-compatible endpoints, e.g. Groq).
pub struct HttpChatModel {
    agent: ureq::Agent,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl HttpChatModel {
    pub fn new(settings: &LlmSettings) -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }
}

impl LanguageModel for HttpChatModel {
    fn complete(&self, system: &str, payload: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": payload},
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let start = Instant::now();
        let mut request = self.agent.post(&url);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }
        let mut response = request
            .send_json(&body)
            .context("send chat completion request")?;
        let parsed: Value = response
            .body_mut()
            .read_json()
            .context("parse chat completion response")?;

        let content = parsed
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("chat completion response missing message content"))?;

        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            prompt_bytes = payload.len(),
            response_bytes = content.len(),
            model = %self.model,
            "lm invoke complete"
        );
        Ok(content.to_string())
    }
}

/// Subprocess model: the configured command receives the assembled prompt on
/// stdin and must print its response to stdout.
pub struct CommandModel {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandModel {
    /// Parse and resolve the command up front so a broken configuration
    /// fails at wiring time, not mid-pipeline.
    pub fn new(command: &str) -> Result<Self> {
        let words = shell_words::split(command)
            .with_context(|| format!("parse llm command: {command}"))?;
        let Some((program, args)) = words.split_first() else {
            return Err(anyhow!("llm command is empty"));
        };
        let program = which::which(program)
            .with_context(|| format!("locate llm command program: {program}"))?;
        Ok(Self {
            program,
            args: args.to_vec(),
        })
    }
}

impl LanguageModel for CommandModel {
    fn complete(&self, system: &str, payload: &str) -> Result<String> {
        let prompt = format!("{system}\n\n{payload}");
        let start = Instant::now();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawn llm command {}", self.program.display()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .context("write prompt to llm stdin")?;
        }

        let output = child.wait_with_output().context("wait for llm command")?;
        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            prompt_bytes = prompt.len(),
            response_bytes = output.stdout.len(),
            "lm invoke complete"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "llm command failed with status {}: {}",
                output.status,
                stderr.trim()
            ));
        }
        String::from_utf8(output.stdout).context("decode llm stdout as UTF-8")
    }
}
