//! Request and response types for model providers.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Value, json};

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message setting context/behavior.
    System,
    /// User message.
    User,
    /// Assistant response.
    Assistant,
    /// Tool/function result.
    Tool,
}

/// Content of a message, either text or structured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    /// Simple text content.
    Text(String),
    /// Structured content parts (text, images, etc.).
    Parts(Vec<ContentPart>),
}

impl Content {
    /// Create text content.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Get content as text, joining text parts if necessary.
    pub fn as_text(&self) -> String {
        match self {
            Content::Text(s) => s.clone(),
            Content::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }

    /// Concatenated reasoning parts, if any.
    pub fn reasoning(&self) -> Option<String> {
        let Content::Parts(parts) = self else {
            return None;
        };
        let reasoning: String = parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::Reasoning { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        (!reasoning.is_empty()).then_some(reasoning)
    }
}

impl From<String> for Content {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Content {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// A part of structured content.
///
/// Decoding never fails: anything absent, malformed or unrecognized becomes
/// [`ContentPart::Unknown`] carrying the raw JSON, so one bad part cannot
/// reject a whole conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    /// Text content.
    Text { text: String },
    /// Image by URL or `data:` URI.
    ImageRef { url: String },
    /// Base64 audio payload.
    InlineAudio { data: String, format: String },
    /// Model reasoning, only meaningful on assistant messages.
    Reasoning { text: String },
    /// Anything else, kept verbatim.
    Unknown(Value),
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum KnownPart {
    Text {
        text: String,
    },
    ImageUrl {
        image_url: ImageUrl,
    },
    InputAudio {
        input_audio: InputAudio,
    },
    Reasoning {
        text: String,
    },
    File {
        #[serde(rename = "mediaType")]
        media_type: String,
        url: String,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ImageUrl {
    Object { url: String },
    Bare(String),
}

#[derive(Deserialize)]
struct InputAudio {
    data: String,
    format: String,
}

impl ContentPart {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create an image part.
    pub fn image(url: impl Into<String>) -> Self {
        Self::ImageRef { url: url.into() }
    }

    /// Create an audio part.
    pub fn audio(data: impl Into<String>, format: impl Into<String>) -> Self {
        Self::InlineAudio {
            data: data.into(),
            format: format.into(),
        }
    }

    /// Decode a part from its JSON shape.
    ///
    /// Accepts the OpenAI-style `text` / `image_url` / `input_audio` parts,
    /// `reasoning` parts, and UI `file` parts with an `image/*` media type.
    pub fn from_value(value: Value) -> Self {
        match serde_json::from_value::<KnownPart>(value.clone()) {
            Ok(KnownPart::Text { text }) => Self::Text { text },
            Ok(KnownPart::ImageUrl { image_url }) => Self::ImageRef {
                url: match image_url {
                    ImageUrl::Object { url } | ImageUrl::Bare(url) => url,
                },
            },
            Ok(KnownPart::InputAudio { input_audio }) => Self::InlineAudio {
                data: input_audio.data,
                format: input_audio.format,
            },
            Ok(KnownPart::Reasoning { text }) => Self::Reasoning { text },
            Ok(KnownPart::File { media_type, url }) if media_type.starts_with("image/") => {
                Self::ImageRef { url }
            }
            Ok(KnownPart::File { .. }) | Err(_) => Self::Unknown(value),
        }
    }

    /// Encode the part in its OpenAI-compatible JSON shape.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Text { text } => json!({ "type": "text", "text": text }),
            Self::ImageRef { url } => json!({ "type": "image_url", "image_url": { "url": url } }),
            Self::InlineAudio { data, format } => {
                json!({ "type": "input_audio", "input_audio": { "data": data, "format": format } })
            }
            Self::Reasoning { text } => json!({ "type": "reasoning", "text": text }),
            Self::Unknown(raw) => raw.clone(),
        }
    }

    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::ImageRef { .. } => "image",
            Self::InlineAudio { .. } => "audio",
            Self::Reasoning { .. } => "reasoning",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl Serialize for ContentPart {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ContentPart {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

/// Split a `data:<mime>;base64,<payload>` URI.
pub fn parse_data_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mime = meta.strip_suffix(";base64")?;
    Some((if mime.is_empty() { "application/octet-stream" } else { mime }, payload))
}

/// A message in a conversation.
///
/// Accepts either `content` or `parts` as the content field when decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Client-assigned message id, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Role of the message sender.
    pub role: Role,
    /// Content of the message.
    #[serde(alias = "parts")]
    pub content: Content,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<Content>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message.
    pub fn user(content: impl Into<Content>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<Content>) -> Self {
        Self::new(Role::Assistant, content)
    }

    fn new(role: Role, content: impl Into<Content>) -> Self {
        Self {
            id: None,
            role,
            content: content.into(),
        }
    }

    /// Set the message id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Number of input/prompt tokens.
    pub input_tokens: u64,
    /// Number of output/completion tokens.
    pub output_tokens: u64,
    /// Total tokens (input + output).
    pub total_tokens: u64,
}

impl Usage {
    /// Create new usage statistics.
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }
}

/// Request for a chat completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Provider model id.
    pub model: String,
    /// Conversation messages.
    pub messages: Vec<Message>,
    /// System preamble, sent the way each provider expects it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Sampling temperature (0.0 to 2.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Create a new chat request.
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            system: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the system preamble.
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature.
    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// Set the maximum tokens.
    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    /// Set the maximum tokens when a cap is known.
    pub fn max_tokens_opt(mut self, tokens: Option<u32>) -> Self {
        self.max_tokens = tokens;
        self
    }
}

/// Reason why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Reached end of response naturally.
    EndTurn,
    /// Reached max tokens limit.
    MaxTokens,
    /// Provider withheld content.
    ContentFilter,
    /// Model wants to call a tool.
    ToolUse,
    /// Anything the provider reports that has no closer match.
    Other,
}

/// Response from a non-streamed completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Response text.
    pub content: Content,
    /// Why generation stopped, when the provider said.
    pub stop_reason: Option<StopReason>,
    /// Token usage statistics.
    pub usage: Usage,
}

/// A chunk from a streaming response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Reasoning delta, delivered before `delta` when both are set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Delta content (incremental text).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<String>,
    /// Stop reason if this is the final chunk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
    /// Usage statistics (typically only in final chunk).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl StreamChunk {
    /// A text delta.
    pub fn text(delta: impl Into<String>) -> Self {
        Self {
            delta: Some(delta.into()),
            ..Default::default()
        }
    }

    /// A reasoning delta.
    pub fn reasoning(delta: impl Into<String>) -> Self {
        Self {
            reasoning: Some(delta.into()),
            ..Default::default()
        }
    }

    /// A terminal chunk.
    pub fn stop(reason: StopReason) -> Self {
        Self {
            stop_reason: Some(reason),
            ..Default::default()
        }
    }

    /// Whether the chunk carries anything worth forwarding.
    pub fn is_empty(&self) -> bool {
        self.reasoning.as_deref().is_none_or(str::is_empty)
            && self.delta.as_deref().is_none_or(str::is_empty)
            && self.stop_reason.is_none()
            && self.usage.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors_work() {
        let sys = Message::system("You are helpful");
        assert_eq!(sys.role, Role::System);
        assert_eq!(sys.content.as_text(), "You are helpful");

        let user = Message::user("Hello").with_id("m1");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.id.as_deref(), Some("m1"));

        let asst = Message::assistant("Hi there!");
        assert_eq!(asst.role, Role::Assistant);
    }

    #[test]
    fn chat_request_builder_works() {
        let req = ChatRequest::new("gpt-4o", vec![Message::user("Hello")])
            .system("be brief")
            .temperature(0.7)
            .max_tokens(1000);

        assert_eq!(req.model, "gpt-4o");
        assert_eq!(req.system.as_deref(), Some("be brief"));
        assert_eq!(req.temperature, Some(0.7));
        assert_eq!(req.max_tokens, Some(1000));
    }

    #[test]
    fn message_accepts_parts_alias() {
        let msg: Message = serde_json::from_value(json!({
            "id": "u1",
            "role": "user",
            "parts": [{"type": "text", "text": "hi"}]
        }))
        .unwrap();
        assert_eq!(msg.content, Content::Parts(vec![ContentPart::text("hi")]));
    }

    #[test]
    fn message_accepts_string_content() {
        let msg: Message = serde_json::from_str(r#"{"role":"assistant","content":"hello"}"#).unwrap();
        assert_eq!(msg.content, Content::text("hello"));
        assert!(msg.id.is_none());
    }

    #[test]
    fn message_without_content_is_rejected() {
        assert!(serde_json::from_str::<Message>(r#"{"role":"user"}"#).is_err());
    }

    #[test]
    fn content_parts_decode_known_shapes() {
        let content: Content = serde_json::from_value(json!([
            {"type": "text", "text": "look"},
            {"type": "image_url", "image_url": {"url": "https://x/y.png"}},
            {"type": "image_url", "image_url": "data:image/png;base64,AAAA"},
            {"type": "input_audio", "input_audio": {"data": "UklG", "format": "wav"}},
            {"type": "reasoning", "text": "hmm"},
            {"type": "file", "mediaType": "image/jpeg", "url": "https://x/z.jpg"}
        ]))
        .unwrap();

        let Content::Parts(parts) = content else {
            panic!("expected parts");
        };
        assert_eq!(
            parts,
            vec![
                ContentPart::text("look"),
                ContentPart::image("https://x/y.png"),
                ContentPart::image("data:image/png;base64,AAAA"),
                ContentPart::audio("UklG", "wav"),
                ContentPart::Reasoning { text: "hmm".into() },
                ContentPart::image("https://x/z.jpg"),
            ]
        );
    }

    #[test]
    fn malformed_parts_become_unknown() {
        let parts: Vec<ContentPart> = serde_json::from_value(json!([
            {"type": "image_url"},
            {"type": "tool-call", "toolName": "x"},
            {"type": "file", "mediaType": "application/pdf", "url": "https://x/a.pdf"},
            42
        ]))
        .unwrap();
        assert!(parts.iter().all(|p| matches!(p, ContentPart::Unknown(_))));
        assert_eq!(parts[3], ContentPart::Unknown(json!(42)));
    }

    #[test]
    fn content_parts_serialize_openai_shape() {
        let value = serde_json::to_value(Content::Parts(vec![
            ContentPart::text("Hello"),
            ContentPart::image("https://example.com/img.png"),
        ]))
        .unwrap();
        assert_eq!(
            value,
            json!([
                {"type": "text", "text": "Hello"},
                {"type": "image_url", "image_url": {"url": "https://example.com/img.png"}}
            ])
        );
    }

    #[test]
    fn as_text_joins_text_parts_only() {
        let content = Content::Parts(vec![
            ContentPart::Reasoning { text: "thinking".into() },
            ContentPart::text("a"),
            ContentPart::image("u"),
            ContentPart::text("b"),
        ]);
        assert_eq!(content.as_text(), "ab");
        assert_eq!(content.reasoning().as_deref(), Some("thinking"));
    }

    #[test]
    fn data_uri_parses_mime_and_payload() {
        assert_eq!(
            parse_data_uri("data:image/png;base64,iVBOR"),
            Some(("image/png", "iVBOR"))
        );
        assert_eq!(parse_data_uri("https://x/y.png"), None);
        assert_eq!(parse_data_uri("data:text/plain,hello"), None);
    }

    #[test]
    fn usage_calculates_total() {
        let usage = Usage::new(100, 50);
        assert_eq!(usage.total_tokens, 150);
    }

    #[test]
    fn stream_chunk_emptiness() {
        assert!(StreamChunk::default().is_empty());
        assert!(StreamChunk::text("").is_empty());
        assert!(!StreamChunk::text("x").is_empty());
        assert!(!StreamChunk::stop(StopReason::EndTurn).is_empty());
    }

    #[test]
    fn stop_reason_serializes_snake_case() {
        let json = serde_json::to_string(&StopReason::ContentFilter).unwrap();
        assert_eq!(json, "\"content_filter\"");
    }
}
