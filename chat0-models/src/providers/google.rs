//! Google Gemini streaming via `streamGenerateContent?alt=sse`.

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use super::sse::data_events;
use super::{
    ChatRequest, ChatStream, Content, ContentPart, Message, Role, StopReason, StreamChunk, Usage,
    describe_error, parse_data_uri, upstream_error,
};
use crate::auth::ApiKey;
use crate::{Error, ProviderKind, Result};

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "GenerationConfig::is_empty")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<Blob>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file_data: Option<FileData>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    thought: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    #[serde(skip_serializing_if = "Option::is_none")]
    mime_type: Option<String>,
    file_uri: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl GenerationConfig {
    fn is_empty(&self) -> bool {
        self.max_output_tokens.is_none() && self.temperature.is_none()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

fn text_part(text: String) -> GeminiPart {
    GeminiPart {
        text: Some(text),
        ..Default::default()
    }
}

fn gemini_part(part: &ContentPart) -> Option<GeminiPart> {
    match part {
        ContentPart::Text { text } => Some(text_part(text.clone())),
        ContentPart::ImageRef { url } => Some(match parse_data_uri(url) {
            Some((mime, data)) => GeminiPart {
                inline_data: Some(Blob {
                    mime_type: mime.to_string(),
                    data: data.to_string(),
                }),
                ..Default::default()
            },
            None => GeminiPart {
                file_data: Some(FileData {
                    mime_type: None,
                    file_uri: url.clone(),
                }),
                ..Default::default()
            },
        }),
        ContentPart::InlineAudio { data, format } => Some(GeminiPart {
            inline_data: Some(Blob {
                mime_type: format!("audio/{format}"),
                data: data.clone(),
            }),
            ..Default::default()
        }),
        ContentPart::Reasoning { .. } | ContentPart::Unknown(_) => None,
    }
}

fn build_request(request: &ChatRequest) -> GenerateRequest {
    // Gemini has no system role inside `contents`; fold any into the instruction.
    let mut system: Vec<String> = request.system.iter().cloned().collect();
    let mut contents = Vec::new();

    for message in &request.messages {
        match message.role {
            Role::System => system.push(message.content.as_text()),
            Role::User | Role::Assistant => contents.extend(gemini_content(message)),
            Role::Tool => debug!("skipping tool message, tool calls are not supported"),
        }
    }

    GenerateRequest {
        contents,
        system_instruction: (!system.is_empty()).then(|| GeminiContent {
            role: None,
            parts: vec![text_part(system.join("\n\n"))],
        }),
        generation_config: GenerationConfig {
            max_output_tokens: request.max_tokens,
            temperature: request.temperature,
        },
    }
}

/// Gemini rejects turns without parts, so a message left empty after
/// mapping is skipped.
fn gemini_content(message: &Message) -> Option<GeminiContent> {
    let (role, parts): (_, Vec<GeminiPart>) = match (&message.content, message.role) {
        (Content::Parts(parts), Role::User) => ("user", parts.iter().filter_map(gemini_part).collect()),
        (content, Role::User) => ("user", vec![text_part(content.as_text())]),
        (content, _) => ("model", vec![text_part(content.as_text())]),
    };
    let parts: Vec<_> = parts
        .into_iter()
        .filter(|part| part.text.as_deref() != Some(""))
        .collect();
    if parts.is_empty() {
        debug!(role, "skipping message with no content");
        return None;
    }
    Some(GeminiContent {
        role: Some(role),
        parts,
    })
}

fn stop_reason(reason: &str) -> StopReason {
    match reason {
        "STOP" => StopReason::EndTurn,
        "MAX_TOKENS" => StopReason::MaxTokens,
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => {
            StopReason::ContentFilter
        }
        _ => StopReason::Other,
    }
}

fn parse_chunk(data: &str) -> Result<Option<StreamChunk>> {
    let response: GenerateResponse = serde_json::from_str(data)?;
    if let Some(error) = response.error {
        return Err(Error::ProviderApi(describe_error(&error)));
    }

    let mut out = StreamChunk {
        usage: response
            .usage_metadata
            .map(|u| Usage::new(u.prompt_token_count, u.candidates_token_count)),
        ..Default::default()
    };
    if let Some(candidate) = response.candidates.into_iter().next() {
        for part in candidate.content.into_iter().flat_map(|c| c.parts) {
            let Some(text) = part.text else { continue };
            let channel = if part.thought {
                &mut out.reasoning
            } else {
                &mut out.delta
            };
            channel.get_or_insert_with(String::new).push_str(&text);
        }
        out.stop_reason = candidate.finish_reason.as_deref().map(stop_reason);
    }
    Ok((!out.is_empty()).then_some(out))
}

// ────────────────────────────────────────────────────────────────────────────
// GoogleClient
// ────────────────────────────────────────────────────────────────────────────

/// Streaming client for the Gemini API.
#[derive(Debug, Clone)]
pub struct GoogleClient {
    client: reqwest::Client,
    base_url: String,
    api_key: ApiKey,
}

impl GoogleClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: ApiKey) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Open a streaming generation.
    pub async fn stream(&self, request: ChatRequest) -> Result<ChatStream> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, request.model
        );
        let body = build_request(&request);
        trace!(body = %serde_json::to_string(&body)?, "generate request");
        debug!(provider = %ProviderKind::Google, model = %request.model, "opening generate stream");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(upstream_error(ProviderKind::Google.as_str(), response).await);
        }

        let stream = data_events(response).filter_map(|event| async move {
            match event {
                Ok(data) => parse_chunk(&data).transpose(),
                Err(e) => Some(Err(e)),
            }
        });
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_maps_roles_and_system_instruction() {
        let request = ChatRequest::new(
            "gemini-2.5-flash",
            vec![
                Message::user("hi"),
                Message::assistant("hello"),
                Message::system("extra rule"),
                Message::user("bye"),
            ],
        )
        .system("persona")
        .max_tokens(256);

        let value = serde_json::to_value(build_request(&request)).unwrap();
        assert_eq!(
            value,
            json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "hi"}]},
                    {"role": "model", "parts": [{"text": "hello"}]},
                    {"role": "user", "parts": [{"text": "bye"}]}
                ],
                "systemInstruction": {"parts": [{"text": "persona\n\nextra rule"}]},
                "generationConfig": {"maxOutputTokens": 256}
            })
        );
    }

    #[test]
    fn messages_without_parts_are_skipped() {
        let messages = crate::providers::normalize_messages(
            vec![
                Message::user("hi"),
                Message::assistant(Content::Parts(Vec::new())),
                Message::user(Content::Parts(vec![ContentPart::InlineAudio {
                    data: "UklGRg==".into(),
                    format: "wav".into(),
                }])),
                Message::user("still there?"),
            ],
            ProviderKind::Google,
        );
        let request = ChatRequest::new("gemini-2.5-flash", messages);

        let value = serde_json::to_value(build_request(&request)).unwrap();
        assert_eq!(
            value["contents"],
            json!([
                {"role": "user", "parts": [{"text": "hi"}]},
                {"role": "user", "parts": [{"text": "still there?"}]}
            ])
        );
    }

    #[test]
    fn images_map_to_inline_or_file_data() {
        let request = ChatRequest::new(
            "gemini-2.5-pro",
            vec![Message::user(Content::Parts(vec![
                ContentPart::text("compare"),
                ContentPart::image("data:image/jpeg;base64,/9j/"),
                ContentPart::image("https://example.com/cat.png"),
            ]))],
        );

        let value = serde_json::to_value(build_request(&request)).unwrap();
        assert_eq!(
            value["contents"][0]["parts"],
            json!([
                {"text": "compare"},
                {"inlineData": {"mimeType": "image/jpeg", "data": "/9j/"}},
                {"fileData": {"fileUri": "https://example.com/cat.png"}}
            ])
        );
        assert!(value.get("generationConfig").is_none());
        assert!(value.get("systemInstruction").is_none());
    }

    #[test]
    fn parse_chunk_splits_thoughts_from_text() {
        let chunk = parse_chunk(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"pondering","thought":true},{"text":"Hello"}]}}]}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(chunk.reasoning.as_deref(), Some("pondering"));
        assert_eq!(chunk.delta.as_deref(), Some("Hello"));
        assert!(chunk.stop_reason.is_none());
    }

    #[test]
    fn parse_chunk_reads_finish_and_usage() {
        let chunk = parse_chunk(
            r#"{"candidates":[{"content":{"parts":[{"text":"."}]},"finishReason":"STOP"}],"usageMetadata":{"promptTokenCount":5,"candidatesTokenCount":2}}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(chunk.stop_reason, Some(StopReason::EndTurn));
        assert_eq!(chunk.usage, Some(Usage::new(5, 2)));
        assert_eq!(stop_reason("SAFETY"), StopReason::ContentFilter);
    }

    #[test]
    fn parse_chunk_surfaces_error_payload() {
        let err = parse_chunk(r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("API key not valid"));
    }
}
