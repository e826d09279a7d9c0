use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::types::{AiSummary, Config, PodEvent, TriageResult};

/// Events passed to the model, most recent last.
pub const MAX_PROMPT_EVENTS: usize = 10;
/// Trailing log characters passed to the model.
pub const MAX_PROMPT_LOG_CHARS: usize = 4000;
/// Confidence assigned when the reply is not the JSON we asked for.
pub const UNSTRUCTURED_CONFIDENCE: u8 = 50;

const SYSTEM_PROMPT: &str = "You are a Kubernetes site reliability engineer. \
Given a pod's status, recent events and logs, explain the most likely root cause. \
Reply with JSON only: {\"summary\": string, \"suggestion\": string, \"confidence\": number 0-100}.";

/// Root-cause summarization for one problematic pod. Never fails: a broken
/// or unreachable service yields a sentinel summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, pod: &TriageResult, events: &[PodEvent], logs: &str) -> AiSummary;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat completions endpoint.
pub struct OpenAiSummarizer {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiSummarizer {
    pub fn new(cfg: &Config) -> Result<Self> {
        Self::with_endpoint(&cfg.ai_api_url, &cfg.ai_api_key, &cfg.ai_model, cfg.call_timeout())
    }

    pub fn with_endpoint(base_url: &str, api_key: &str, model: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build AI HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: prompt },
            ],
            temperature: 0.2,
        };
        let res = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send AI request")?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("AI service returned {}: {}", status, body));
        }
        let completion: ChatCompletionResponse = res.json().await.context("Invalid AI response body")?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("AI response had no content"))
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, pod: &TriageResult, events: &[PodEvent], logs: &str) -> AiSummary {
        let prompt = build_prompt(pod, events, logs);
        match self.complete(&prompt).await {
            Ok(reply) => parse_ai_reply(&reply),
            Err(e) => {
                warn!("AI summary failed for {}/{}: {:#}", pod.namespace, pod.name, e);
                AiSummary::unavailable()
            }
        }
    }
}

pub fn build_prompt(pod: &TriageResult, events: &[PodEvent], logs: &str) -> String {
    let mut prompt = format!(
        "Pod: {}/{}\nPhase: {}\nSeverity: {}\n",
        pod.namespace, pod.name, pod.phase, pod.severity
    );
    if !pod.reasons.is_empty() {
        prompt.push_str(&format!("Reasons: {}\n", pod.reasons.join(", ")));
    }
    if let Some(reason) = &pod.reason {
        prompt.push_str(&format!("Pod reason: {}\n", reason));
    }
    if let Some(message) = &pod.message {
        prompt.push_str(&format!("Pod message: {}\n", message));
    }

    prompt.push_str("\nRecent events:\n");
    let skip = events.len().saturating_sub(MAX_PROMPT_EVENTS);
    if events.is_empty() {
        prompt.push_str("(none)\n");
    }
    for e in &events[skip..] {
        prompt.push_str(&format!("- [{}] {} (x{}): {}\n", e.type_, e.reason, e.count, e.message));
    }

    prompt.push_str("\nRecent logs:\n");
    if logs.trim().is_empty() {
        prompt.push_str("(none)\n");
    } else {
        prompt.push_str(tail_chars(logs, MAX_PROMPT_LOG_CHARS));
        prompt.push('\n');
    }
    prompt
}

fn tail_chars(text: &str, max: usize) -> &str {
    let count = text.chars().count();
    if count <= max {
        return text;
    }
    let start = text
        .char_indices()
        .nth(count - max)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &text[start..]
}

/// Extract the body of the first markdown fence (```json ... ```), which may
/// follow some prose. Without a fence the trimmed reply is returned.
pub fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };
    let rest = &trimmed[open + 3..];
    // The opening fence line may carry a language tag.
    let body = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        None => rest,
    };
    match body.rfind("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// Decode the model's reply; a reply that is not the expected JSON becomes
/// the summary verbatim.
pub fn parse_ai_reply(reply: &str) -> AiSummary {
    match serde_json::from_str::<AiSummary>(strip_code_fence(reply)) {
        Ok(summary) => summary,
        Err(e) => {
            debug!("AI reply is not structured JSON: {}", e);
            AiSummary {
                summary: reply.trim().to_string(),
                suggestion: String::new(),
                confidence: UNSTRUCTURED_CONFIDENCE,
            }
        }
    }
}
