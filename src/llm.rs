use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::config::AppConfig;
use crate::recommend::CompletionProvider;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("composer unavailable: {0}")]
    Unavailable(String),
}

const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

pub const SYSTEM_PROMPT: &str = "You are an event recommender. Provide CONCISE, bulleted recommendations.

RULES:
1. Use simple bullet points (•) for each event
2. Each recommendation: 1-2 sentences MAX
3. Format: Event name, time, brief reason why
4. Mention booking urgency when spots are limited
5. Weigh the weather when choosing between indoor and outdoor events
6. Be direct, no long explanations
7. Use emojis sparingly (only for urgency 🔴 or free 🎉)

Example format:
• Morning Yoga (06:00-07:30) - Great outdoor start to the day, only 8 spots left
• Art Exhibition (10:00-18:00) - Indoor option if weather turns, free entry

Keep it SHORT and ACTIONABLE.";

pub struct LLMComposer {
    model: String,
    base_url: String,
    api_key: Option<String>,
    temperature: f32,
    max_tokens: u32,
    client: Client,
}

impl LLMComposer {
    pub fn from_config(config: &AppConfig) -> Result<Self, ComposeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|err| {
                ComposeError::Unavailable(format!("cannot build recommendation client: {err}"))
            })?;

        Ok(Self {
            model: config.llm_model.clone(),
            base_url: config.llm_endpoint.clone(),
            api_key: config
                .llm_api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            temperature: config.llm_temperature,
            max_tokens: config.llm_max_tokens,
            client,
        })
    }

    async fn chat(&self, system: &str, user: &str) -> Result<String, ComposeError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let payload = json!({
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user }
            ],
        });

        let mut request = self.client.post(&url).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|err| {
            ComposeError::Unavailable(format!("recommendation request to {url} failed: {err}"))
        })?;

        let status = response.status();
        let text_body = response.text().await.map_err(|err| {
            ComposeError::Unavailable(format!("unreadable {} reply: {err}", self.model))
        })?;

        if !status.is_success() {
            return Err(ComposeError::Unavailable(format!(
                "{} rejected the recommendation request with HTTP {}: {}",
                self.model, status, text_body
            )));
        }

        let reply: ChatReply = serde_json::from_str(&text_body).map_err(|err| {
            ComposeError::Unavailable(format!("{} reply is not a chat completion: {err}", self.model))
        })?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                ComposeError::Unavailable(format!(
                    "{} returned no recommendation text",
                    self.model
                ))
            })
    }
}

#[async_trait]
impl CompletionProvider for LLMComposer {
    async fn complete(&self, system: &str, user: &str) -> Result<String, ComposeError> {
        self.chat(system, user).await
    }
}

/// User message: the rendered weather box and event listing, optional notes,
/// then the output instructions.
pub fn build_user_prompt(weather_box: &str, events_listing: &str, notes: &[String]) -> String {
    let mut prompt = format!("{weather_box}\n{events_listing}\n");
    if !notes.is_empty() {
        prompt.push_str("\nNOTES:\n");
        for note in notes {
            prompt.push_str(&format!("- {note}\n"));
        }
    }
    prompt.push_str(
        "\nIMPORTANT: Provide CONCISE and BULLETED recommendations:\n\n\
         TOP RECOMMENDATIONS:\n\
         - List each recommended event with brief reasoning\n\
         - Keep each bullet point to 1-2 sentences maximum\n\
         - Mention booking urgency if relevant (limited spots)\n\
         - Include why it's good based on weather/time/price\n\
         - Use exact event names and times\n\n\
         Format: Simple bullet points, no long paragraphs or elaborate sections.",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn composer_for(server: &mockito::Server, api_key: Option<&str>) -> LLMComposer {
        let config = AppConfig {
            llm_endpoint: format!("{}/v1", server.url()),
            llm_model: "test-model".to_string(),
            llm_api_key: api_key.map(str::to_string),
            ..AppConfig::default()
        };
        LLMComposer::from_config(&config).expect("composer")
    }

    #[test]
    fn user_prompt_carries_context_and_notes() {
        let prompt = build_user_prompt(
            "WEATHER",
            "EVENTS",
            &["Morning Yoga also runs on 2026-02-18".to_string()],
        );
        assert!(prompt.starts_with("WEATHER\nEVENTS\n"));
        assert!(prompt.contains("NOTES:\n- Morning Yoga also runs on 2026-02-18\n"));
        assert!(prompt.contains("TOP RECOMMENDATIONS:"));

        assert!(!build_user_prompt("W", "E", &[]).contains("NOTES:"));
    }

    #[tokio::test]
    async fn returns_trimmed_first_choice() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({ "model": "test-model" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"  • Go to the museum  \n"}}]}"#)
            .create_async()
            .await;

        let composer = composer_for(&server, Some("sk-test"));
        let text = composer
            .complete("system text", "user text")
            .await
            .expect("completion");
        mock.assert_async().await;
        assert_eq!(text, "• Go to the museum");
    }

    #[tokio::test]
    async fn empty_content_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"   "}}]}"#)
            .create_async()
            .await;

        let composer = composer_for(&server, None);
        match composer.complete("s", "u").await {
            Err(ComposeError::Unavailable(message)) => {
                assert_eq!(message, "test-model returned no recommendation text")
            }
            other => panic!("expected unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn http_failure_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let composer = composer_for(&server, None);
        match composer.complete("s", "u").await {
            Err(ComposeError::Unavailable(message)) => {
                assert!(message.contains("test-model rejected the recommendation request"));
                assert!(message.contains("429"));
            }
            other => panic!("expected unavailable, got {other:?}"),
        }
    }
}
