//! Answer-model providers.
//!
//! Model selection is an explicit [`ModelProvider`] enum resolved once
//! from the model name at the command boundary; the rest of the code never
//! inspects the name again. Both variants expose the same answer
//! capability over their provider HTTP APIs.

use anyhow::{bail, Result};
use std::time::Duration;

use crate::config::LlmConfig;
use crate::models::NoteExcerpt;

/// The backends `ndx ask` can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelProvider {
    OpenAi,
    Gemini,
}

impl ModelProvider {
    /// Resolve a model name to its provider, once, at the boundary.
    pub fn resolve(model: &str) -> Result<Self> {
        match model {
            "gpt-4o" | "gpt-4o-mini" => Ok(ModelProvider::OpenAi),
            "gemini-1.5-flash" | "gemini-1.5-pro" => Ok(ModelProvider::Gemini),
            m if m.starts_with("gpt-") => Ok(ModelProvider::OpenAi),
            m if m.starts_with("gemini-") => Ok(ModelProvider::Gemini),
            other => bail!(
                "Unknown model '{}'. Known models: gpt-4o, gpt-4o-mini, gemini-1.5-flash, gemini-1.5-pro.",
                other
            ),
        }
    }

    /// Answer a question grounded in note excerpts.
    ///
    /// `history` is optional prior conversation context, prepended to the
    /// prompt the way the originating chat UI did.
    pub async fn answer(
        self,
        config: &LlmConfig,
        model: &str,
        question: &str,
        excerpts: &[NoteExcerpt],
        history: Option<&str>,
    ) -> Result<String> {
        let prompt = build_prompt(question, excerpts, history);
        match self {
            ModelProvider::OpenAi => answer_openai(config, model, &prompt).await,
            ModelProvider::Gemini => answer_gemini(config, model, &prompt).await,
        }
    }
}

/// Assemble the grounded prompt: excerpts first, then optional history,
/// then the question.
fn build_prompt(question: &str, excerpts: &[NoteExcerpt], history: Option<&str>) -> String {
    let mut prompt = String::new();

    if excerpts.is_empty() {
        prompt.push_str("No matching notes were found for this question.\n\n");
    } else {
        prompt.push_str("You answer questions using only the following note excerpts.\n\n");
        for (i, excerpt) in excerpts.iter().enumerate() {
            prompt.push_str(&format!("--- Note {} ({}) ---\n", i + 1, excerpt.title));
            prompt.push_str(&excerpt.text);
            prompt.push_str("\n\n");
        }
    }

    if let Some(ctx) = history {
        if !ctx.trim().is_empty() {
            prompt.push_str("Conversation so far:\n");
            prompt.push_str(ctx.trim());
            prompt.push_str("\n\n");
        }
    }

    prompt.push_str("Question: ");
    prompt.push_str(question);
    prompt
}

async fn answer_openai(config: &LlmConfig, model: &str, prompt: &str) -> Result<String> {
    let api_key =
        std::env::var("OPENAI_API_KEY").map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

    let body = serde_json::json!({
        "model": model,
        "messages": [
            { "role": "user", "content": prompt }
        ],
    });

    let json = post_with_retry(
        config,
        "https://api.openai.com/v1/chat/completions",
        Some(&api_key),
        &body,
    )
    .await?;

    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid chat completion response"))
}

async fn answer_gemini(config: &LlmConfig, model: &str, prompt: &str) -> Result<String> {
    let api_key =
        std::env::var("GEMINI_API_KEY").map_err(|_| anyhow::anyhow!("GEMINI_API_KEY not set"))?;

    let url = format!(
        "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
        model, api_key
    );

    let body = serde_json::json!({
        "contents": [
            { "parts": [ { "text": prompt } ] }
        ],
    });

    let json = post_with_retry(config, &url, None, &body).await?;

    json.get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("text"))
        .and_then(|t| t.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid generateContent response"))
}

/// POST JSON with the same backoff policy as the embedding client:
/// 429/5xx and network errors retry, other 4xx fail immediately.
async fn post_with_retry(
    config: &LlmConfig,
    url: &str,
    bearer: Option<&str>,
    body: &serde_json::Value,
) -> Result<serde_json::Value> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let mut last_err = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let mut req = client.post(url).json(body);
        if let Some(token) = bearer {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        match req.send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response.json().await?);
                }
                if status.as_u16() == 429 || status.is_server_error() {
                    let text = response.text().await.unwrap_or_default();
                    last_err = Some(anyhow::anyhow!("Model API error {}: {}", status, text));
                    continue;
                }
                let text = response.text().await.unwrap_or_default();
                bail!("Model API error {}: {}", status, text);
            }
            Err(e) => {
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Model call failed after retries")))
}
