//! Kaiheila message segment types.
//!
//! A segment is a type tag plus an ordered, string-keyed data map:
//!
//! ```json
//! {"type": 1, "data": {"text": "hello"}}
//! ```
//!
//! Platform-native segments carry an integer type code. Segments parsed from
//! the inline `[CQ:...]` encoding carry the tag name instead, which keeps
//! author-defined tags intact.
//!
//! # Example
//!
//! ```rust,ignore
//! use kaiheila::{Segment, SendOptions};
//!
//! let text = Segment::text("Hello, ");
//! let image = Segment::image("https://img.kaiheila.cn/a.png")
//!     .with_options(SendOptions::new().target_id("8001").with_random_nonce());
//! ```

use std::borrow::Cow;
use std::fmt;

use kaiheila_core::MessageSegment as MessageSegmentTrait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::escape::{escape_param, escape_text};

// ============================================================================
// SegmentType
// ============================================================================

/// The type tag of a [`Segment`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SegmentType {
    /// Plain text (`1`).
    Text,
    /// Image (`2`).
    Image,
    /// Video (`3`).
    Video,
    /// File (`4`).
    File,
    /// Audio (`8`).
    Audio,
    /// KMarkdown (`9`).
    KMarkdown,
    /// Card message (`10`).
    Card,
    /// System message (`255`).
    System,
    /// A numeric code this crate does not know about.
    Unknown(i64),
    /// A free-form tag from the inline encoding.
    Tag(String),
}

impl SegmentType {
    /// Maps a platform type code.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => SegmentType::Text,
            2 => SegmentType::Image,
            3 => SegmentType::Video,
            4 => SegmentType::File,
            8 => SegmentType::Audio,
            9 => SegmentType::KMarkdown,
            10 => SegmentType::Card,
            255 => SegmentType::System,
            other => SegmentType::Unknown(other),
        }
    }

    /// Maps an inline tag name. Numeric names go through the code table.
    pub fn from_name(name: &str) -> Self {
        match name {
            "text" => SegmentType::Text,
            "image" => SegmentType::Image,
            "video" => SegmentType::Video,
            "file" => SegmentType::File,
            "audio" => SegmentType::Audio,
            "kmarkdown" => SegmentType::KMarkdown,
            "card" => SegmentType::Card,
            "system" => SegmentType::System,
            other => match other.parse::<i64>() {
                Ok(code) => SegmentType::from_code(code),
                Err(_) => SegmentType::Tag(other.to_string()),
            },
        }
    }

    /// Returns the platform type code, if this type has one.
    pub fn code(&self) -> Option<i64> {
        match self {
            SegmentType::Text => Some(1),
            SegmentType::Image => Some(2),
            SegmentType::Video => Some(3),
            SegmentType::File => Some(4),
            SegmentType::Audio => Some(8),
            SegmentType::KMarkdown => Some(9),
            SegmentType::Card => Some(10),
            SegmentType::System => Some(255),
            SegmentType::Unknown(code) => Some(*code),
            SegmentType::Tag(_) => None,
        }
    }

    /// Returns the name used for this type in the inline encoding.
    pub fn inline_name(&self) -> Cow<'_, str> {
        match self {
            SegmentType::Unknown(code) => Cow::Owned(code.to_string()),
            SegmentType::Tag(name) => Cow::Borrowed(name),
            known => Cow::Borrowed(known.static_name()),
        }
    }

    fn static_name(&self) -> &'static str {
        match self {
            SegmentType::Text => "text",
            SegmentType::Image => "image",
            SegmentType::Video => "video",
            SegmentType::File => "file",
            SegmentType::Audio => "audio",
            SegmentType::KMarkdown => "kmarkdown",
            SegmentType::Card => "card",
            SegmentType::System => "system",
            SegmentType::Unknown(_) => "unknown",
            SegmentType::Tag(_) => "tag",
        }
    }
}

impl Serialize for SegmentType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match (self.code(), self) {
            (Some(code), _) => serializer.serialize_i64(code),
            (None, SegmentType::Tag(name)) => serializer.serialize_str(name),
            (None, other) => serializer.serialize_str(other.static_name()),
        }
    }
}

impl<'de> Deserialize<'de> for SegmentType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum TypeRepr {
            Code(i64),
            Name(String),
        }

        Ok(match TypeRepr::deserialize(deserializer)? {
            TypeRepr::Code(code) => SegmentType::from_code(code),
            TypeRepr::Name(name) => SegmentType::from_name(&name),
        })
    }
}

// ============================================================================
// SendOptions
// ============================================================================

/// The send-parameters shared by every outgoing content kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_target_id: Option<String>,
}

impl SendOptions {
    const KEYS: [&'static str; 4] = ["target_id", "quote", "nonce", "temp_target_id"];

    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the channel or user the content is sent to.
    pub fn target_id(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    /// Quotes (replies to) the given message id.
    pub fn quote(mut self, msg_id: impl Into<String>) -> Self {
        self.quote = Some(msg_id.into());
        self
    }

    pub fn nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Sets a fresh random (UUID v4) nonce.
    pub fn with_random_nonce(self) -> Self {
        self.nonce(uuid::Uuid::new_v4().to_string())
    }

    /// Makes the message visible to this user only.
    pub fn temp_target_id(mut self, user_id: impl Into<String>) -> Self {
        self.temp_target_id = Some(user_id.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs().next().is_none()
    }

    /// Iterates the options that are set, as `(key, value)`.
    pub fn pairs(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        Self::KEYS
            .into_iter()
            .zip([
                &self.target_id,
                &self.quote,
                &self.nonce,
                &self.temp_target_id,
            ])
            .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
    }

    fn from_data(data: &Map<String, Value>) -> Self {
        let get = |key: &str| data.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            target_id: get("target_id"),
            quote: get("quote"),
            nonce: get("nonce"),
            temp_target_id: get("temp_target_id"),
        }
    }
}

// ============================================================================
// Segment
// ============================================================================

/// A single Kaiheila message segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(rename = "type")]
    pub kind: SegmentType,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Map<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Segment {
    /// Creates a segment from a type tag and raw data.
    pub fn new(kind: SegmentType, data: Map<String, Value>) -> Self {
        Self { kind, data }
    }

    fn with_content(kind: SegmentType, content: String) -> Self {
        let mut data = Map::new();
        data.insert("content".to_string(), Value::String(content));
        Self { kind, data }
    }

    /// Creates a plain text segment.
    pub fn text(text: impl Into<String>) -> Self {
        let mut data = Map::new();
        data.insert("text".to_string(), Value::String(text.into()));
        Self {
            kind: SegmentType::Text,
            data,
        }
    }

    /// Creates an image segment from an asset URL.
    pub fn image(file: impl Into<String>) -> Self {
        Self::with_content(SegmentType::Image, file.into())
    }

    /// Creates a video segment from an asset URL.
    pub fn video(file: impl Into<String>) -> Self {
        Self::with_content(SegmentType::Video, file.into())
    }

    /// Creates a file segment from an asset URL.
    pub fn file(file: impl Into<String>) -> Self {
        Self::with_content(SegmentType::File, file.into())
    }

    /// Creates an audio segment from an asset URL.
    pub fn audio(file: impl Into<String>) -> Self {
        Self::with_content(SegmentType::Audio, file.into())
    }

    /// Creates a KMarkdown segment.
    pub fn kmarkdown(text: impl Into<String>) -> Self {
        Self::with_content(SegmentType::KMarkdown, text.into())
    }

    /// Creates a card segment from its JSON source.
    pub fn card(json: impl Into<String>) -> Self {
        Self::with_content(SegmentType::Card, json.into())
    }

    /// Merges send options into the segment data.
    pub fn with_options(mut self, options: SendOptions) -> Self {
        for (key, value) in options.pairs() {
            self.data
                .insert(key.to_string(), Value::String(value.to_string()));
        }
        self
    }

    /// Reads back the send options stored in the segment data.
    pub fn options(&self) -> SendOptions {
        SendOptions::from_data(&self.data)
    }

    /// Returns a data field as a string, if it is one.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// Returns the `content` field.
    pub fn content(&self) -> Option<&str> {
        self.get_str("content")
    }

    /// Renders the segment in the inline `[CQ:...]` encoding.
    pub fn to_inline_string(&self) -> String {
        self.to_string()
    }
}

fn value_to_param(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s),
        Value::Null => Cow::Borrowed(""),
        other => Cow::Owned(other.to_string()),
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == SegmentType::Text {
            // Send options are transport metadata, not text.
            return f.write_str(&escape_text(self.as_text().unwrap_or_default()));
        }
        write!(f, "[CQ:{}", self.kind.inline_name())?;
        for (key, value) in &self.data {
            // The grammar has no empty values.
            let value = value_to_param(value);
            if value.is_empty() {
                continue;
            }
            write!(f, ",{key}={}", escape_param(&value))?;
        }
        f.write_str("]")
    }
}

impl MessageSegmentTrait for Segment {
    fn text(text: impl Into<String>) -> Self {
        Segment::text(text)
    }

    fn segment_type(&self) -> &str {
        match &self.kind {
            SegmentType::Tag(name) => name,
            other => other.static_name(),
        }
    }

    fn is_text(&self) -> bool {
        self.kind == SegmentType::Text
    }

    /// Native text segments use `content`; constructed ones use `text`.
    fn as_text(&self) -> Option<&str> {
        if !self.is_text() {
            return None;
        }
        self.get_str("text").or_else(|| self.content())
    }
}

// ============================================================================
// Tests
// ============================================================================
