//! Prompt variation
//!
//! A [`PromptVariator`] rewrites one prompt into several distinct prompts,
//! one per variation slot.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::GenerationConfig;
use crate::error::{Error, Result};
use crate::http::ApiClient;

/// System prompt for the variation request
const VARIATION_SYSTEM_PROMPT: &str = r#"You write prompts for an image generator.
Given a prompt, write distinct variations of it. Keep the subject, change style, mood, composition or setting.
Answer ONLY with a JSON array of strings, no commentary."#;

/// Rewrites a prompt into variations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PromptVariator: Send + Sync {
    /// Produce exactly `count` variations of `prompt`
    async fn vary(&self, prompt: &str, count: usize) -> Result<Vec<String>>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Variator backed by an OpenAI-compatible chat completion endpoint
#[derive(Debug, Clone)]
pub struct ChatPromptVariator {
    api: ApiClient,
    model: String,
}

impl ChatPromptVariator {
    /// Create a variator from configuration
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(config)?,
            model: config.chat_model.clone(),
        })
    }
}

#[async_trait]
impl PromptVariator for ChatPromptVariator {
    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn vary(&self, prompt: &str, count: usize) -> Result<Vec<String>> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: VARIATION_SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format!("Write {count} variations of: {prompt}"),
                },
            ],
            temperature: 0.9,
        };
        let response: ChatResponse = self.api.post("chat/completions", &request).await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::InvalidResponse("no choices in response".to_string()))?;

        let variations = parse_variations(&content, count)?;
        debug!(count = variations.len(), "prompt variations parsed");
        Ok(variations)
    }
}

#[derive(Deserialize)]
struct Wrapped {
    #[serde(alias = "prompts")]
    variations: Vec<String>,
}

/// Parse a model answer into exactly `count` prompts.
///
/// Accepts a JSON array (optionally inside a code fence or an object with a
/// `variations` field) or one prompt per line. Short answers are padded by
/// cycling; long answers are truncated.
pub fn parse_variations(answer: &str, count: usize) -> Result<Vec<String>> {
    let body = strip_fence(answer.trim());

    let parsed = serde_json::from_str::<Vec<String>>(body)
        .or_else(|_| serde_json::from_str::<Wrapped>(body).map(|w| w.variations))
        .unwrap_or_else(|_| body.lines().map(clean_line).collect());

    let prompts: Vec<String> = parsed
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();

    if prompts.is_empty() {
        return Err(Error::InvalidResponse("no prompt variations".to_string()));
    }

    Ok(prompts.iter().cycle().take(count).cloned().collect())
}

fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // drop the language tag line
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().trim_end_matches("```").trim()
}

fn clean_line(line: &str) -> String {
    let line = line.trim();
    let unnumbered = line.trim_start_matches(|c: char| c.is_ascii_digit());
    let line = unnumbered
        .strip_prefix(". ")
        .or_else(|| unnumbered.strip_prefix(") "))
        .or_else(|| line.strip_prefix("- "))
        .or_else(|| line.strip_prefix("* "))
        .unwrap_or(line);
    line.trim()
        .trim_matches(|c| c == '"' || c == ',')
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_array() {
        let prompts = parse_variations(r#"["a", "b", "c", "d"]"#, 4).unwrap();
        assert_eq!(prompts, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_parse_fenced_json() {
        let answer = "```json\n[\"fox in snow\", \"fox at dusk\"]\n```";
        let prompts = parse_variations(answer, 2).unwrap();
        assert_eq!(prompts, vec!["fox in snow", "fox at dusk"]);
    }

    #[test]
    fn test_parse_wrapped_object() {
        let prompts = parse_variations(r#"{"variations": ["x", "y"]}"#, 2).unwrap();
        assert_eq!(prompts, vec!["x", "y"]);
    }

    #[test]
    fn test_parse_numbered_lines() {
        let answer = "1. a fox in watercolor\n2) a fox in neon\n- a fox, pixel art\n\n* \"a fox sketch\"";
        let prompts = parse_variations(answer, 4).unwrap();
        assert_eq!(
            prompts,
            vec![
                "a fox in watercolor",
                "a fox in neon",
                "a fox, pixel art",
                "a fox sketch"
            ]
        );

        let prompts = parse_variations("3 foxes in snow", 1).unwrap();
        assert_eq!(prompts, vec!["3 foxes in snow"]);
    }

    #[test]
    fn test_pads_and_truncates() {
        assert_eq!(
            parse_variations(r#"["a", "b"]"#, 4).unwrap(),
            vec!["a", "b", "a", "b"]
        );
        assert_eq!(
            parse_variations(r#"["a", "b", "c", "d", "e"]"#, 4).unwrap(),
            vec!["a", "b", "c", "d"]
        );
    }

    #[test]
    fn test_empty_answer_is_error() {
        assert!(parse_variations("   ", 4).is_err());
        assert!(parse_variations("[]", 4).is_err());
    }
}
