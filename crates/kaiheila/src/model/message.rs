//! Kaiheila Message type.
//!
//! This module provides [`KaiheilaMessage`], an ordered sequence of
//! [`Segment`]s, and the parser for the inline `[CQ:type,key=value]`
//! encoding.
//!
//! # Message Formats
//!
//! - **Array format**: a JSON array of segments (native)
//! - **Mapping**: a single segment object
//! - **String format**: inline-tagged text, e.g. `hi [CQ:at,user_id=1]`
//!
//! All three deserialize transparently; serialization always emits the array.
//!
//! # Example
//!
//! ```rust,ignore
//! use kaiheila::KaiheilaMessage;
//! use kaiheila_core::Message;
//!
//! let msg = KaiheilaMessage::new()
//!     .text("Hello, ")
//!     .kmarkdown("**world**");
//!
//! let parsed: KaiheilaMessage = "hello [CQ:at,user_id=123] world".into();
//! assert_eq!(parsed.extract_plain_text(), "hello  world");
//! ```

use std::convert::Infallible;
use std::fmt;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use kaiheila_core::{Message as MessageTrait, MessageSegment as MessageSegmentTrait};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::escape::{unescape_param, unescape_text};
use super::segment::{Segment, SegmentType};

// ============================================================================
// KaiheilaMessage
// ============================================================================

/// A Kaiheila message composed of segments in rendering order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KaiheilaMessage {
    segments: Vec<Segment>,
}

impl MessageTrait for KaiheilaMessage {
    type Segment = Segment;

    fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

// ============================================================================
// Serialization / Deserialization
// ============================================================================

impl Serialize for KaiheilaMessage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.segments.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for KaiheilaMessage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum MessageFormat {
            Array(Vec<Segment>),
            Single(Segment),
            String(String),
        }

        Ok(match MessageFormat::deserialize(deserializer)? {
            MessageFormat::Array(segments) => KaiheilaMessage { segments },
            MessageFormat::Single(segment) => KaiheilaMessage::from(segment),
            MessageFormat::String(inline) => KaiheilaMessage::parse(&inline),
        })
    }
}

// ============================================================================
// Constructors and Builders
// ============================================================================

impl KaiheilaMessage {
    /// Creates a new empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a message from a vector of segments.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Creates a message holding a single text segment.
    ///
    /// The text is taken literally; inline tags are not interpreted.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::from(Segment::text(text))
    }

    /// Parses inline-tagged text into a message.
    pub fn parse(inline: &str) -> Self {
        Self {
            segments: parse_inline(inline),
        }
    }

    /// Builds a message from a JSON mapping, array of mappings, or string.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    // --------------------------------
    // Builder methods
    // --------------------------------

    /// Adds a text segment.
    pub fn text(self, text: impl Into<String>) -> Self {
        self.segment(Segment::text(text))
    }

    /// Adds an image segment.
    pub fn image(self, file: impl Into<String>) -> Self {
        self.segment(Segment::image(file))
    }

    /// Adds a video segment.
    pub fn video(self, file: impl Into<String>) -> Self {
        self.segment(Segment::video(file))
    }

    /// Adds a file segment.
    pub fn file(self, file: impl Into<String>) -> Self {
        self.segment(Segment::file(file))
    }

    /// Adds an audio segment.
    pub fn audio(self, file: impl Into<String>) -> Self {
        self.segment(Segment::audio(file))
    }

    /// Adds a KMarkdown segment.
    pub fn kmarkdown(self, text: impl Into<String>) -> Self {
        self.segment(Segment::kmarkdown(text))
    }

    /// Adds a card segment.
    pub fn card(self, json: impl Into<String>) -> Self {
        self.segment(Segment::card(json))
    }

    /// Adds a raw segment.
    pub fn segment(mut self, segment: Segment) -> Self {
        self.segments.push(segment);
        self
    }

    // --------------------------------
    // Mutable builder methods
    // --------------------------------

    /// Adds a segment (mutable).
    pub fn push(&mut self, segment: Segment) -> &mut Self {
        self.segments.push(segment);
        self
    }

    /// Extends with multiple segments (mutable).
    pub fn extend(&mut self, segments: impl IntoIterator<Item = Segment>) -> &mut Self {
        self.segments.extend(segments);
        self
    }
}

// ============================================================================
// Conversion Methods
// ============================================================================

impl KaiheilaMessage {
    /// Converts the message into a vector of segments.
    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }

    /// Renders the message in the inline encoding.
    pub fn to_inline_string(&self) -> String {
        self.to_string()
    }

    /// Checks if the message contains only text segments.
    pub fn is_plain_text(&self) -> bool {
        self.segments.iter().all(Segment::is_text)
    }
}

impl fmt::Display for KaiheilaMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.segments.iter().try_for_each(|seg| write!(f, "{seg}"))
    }
}

// ============================================================================
// From implementations
// ============================================================================

impl From<Vec<Segment>> for KaiheilaMessage {
    fn from(segments: Vec<Segment>) -> Self {
        Self { segments }
    }
}

impl From<Segment> for KaiheilaMessage {
    fn from(segment: Segment) -> Self {
        Self {
            segments: vec![segment],
        }
    }
}

impl From<&str> for KaiheilaMessage {
    fn from(inline: &str) -> Self {
        Self::parse(inline)
    }
}

impl From<String> for KaiheilaMessage {
    fn from(inline: String) -> Self {
        Self::parse(&inline)
    }
}

impl FromStr for KaiheilaMessage {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl FromIterator<Segment> for KaiheilaMessage {
    fn from_iter<T: IntoIterator<Item = Segment>>(iter: T) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for KaiheilaMessage {
    type Item = Segment;
    type IntoIter = std::vec::IntoIter<Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.into_iter()
    }
}

impl<'a> IntoIterator for &'a KaiheilaMessage {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

// ============================================================================
// Concatenation
// ============================================================================
//
// Bare strings become a single text segment; they are not re-parsed.

impl AddAssign<KaiheilaMessage> for KaiheilaMessage {
    fn add_assign(&mut self, rhs: KaiheilaMessage) {
        self.segments.extend(rhs.segments);
    }
}

impl AddAssign<Segment> for KaiheilaMessage {
    fn add_assign(&mut self, rhs: Segment) {
        self.segments.push(rhs);
    }
}

impl AddAssign<&str> for KaiheilaMessage {
    fn add_assign(&mut self, rhs: &str) {
        self.segments.push(Segment::text(rhs));
    }
}

impl AddAssign<String> for KaiheilaMessage {
    fn add_assign(&mut self, rhs: String) {
        self.segments.push(Segment::text(rhs));
    }
}

impl<T> Add<T> for KaiheilaMessage
where
    KaiheilaMessage: AddAssign<T>,
{
    type Output = KaiheilaMessage;

    fn add(mut self, rhs: T) -> Self::Output {
        self += rhs;
        self
    }
}

impl<T> Add<T> for Segment
where
    KaiheilaMessage: AddAssign<T>,
{
    type Output = KaiheilaMessage;

    fn add(self, rhs: T) -> Self::Output {
        KaiheilaMessage::from(self) + rhs
    }
}

impl Add<KaiheilaMessage> for &str {
    type Output = KaiheilaMessage;

    fn add(self, rhs: KaiheilaMessage) -> Self::Output {
        KaiheilaMessage::from_text(self) + rhs
    }
}

impl Add<KaiheilaMessage> for String {
    type Output = KaiheilaMessage;

    fn add(self, rhs: KaiheilaMessage) -> Self::Output {
        KaiheilaMessage::from_text(self) + rhs
    }
}

impl Add<Segment> for &str {
    type Output = KaiheilaMessage;

    fn add(self, rhs: Segment) -> Self::Output {
        KaiheilaMessage::from_text(self) + rhs
    }
}

// ============================================================================
// Inline Parsing
// ============================================================================

const TAG_OPEN: [char; 4] = ['[', 'C', 'Q', ':'];

/// Parses an inline-tagged string into a vector of segments.
///
/// Text spans and tags are mixed freely:
/// ```text
/// hello [CQ:at,user_id=123] world
/// ```
///
/// A tag is `[CQ:type(,key=value)*,?]` where `type` and `key` are made of
/// ASCII alphanumerics and `-_.`, and `value` is non-empty and runs until the
/// next `,` or `]`. Anything that starts like a tag but does not complete one
/// stays literal text. Empty text spans are dropped.
pub fn parse_inline(input: &str) -> Vec<Segment> {
    let chars: Vec<char> = input.chars().collect();
    let mut segments = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;

    while pos < chars.len() {
        if !chars[pos..].starts_with(&TAG_OPEN) {
            pos += 1;
            continue;
        }
        match match_tag(&chars, pos) {
            Ok((segment, end)) => {
                push_text(&mut segments, &chars[text_start..pos]);
                segments.push(segment);
                pos = end;
                text_start = end;
            }
            // Not a tag: everything up to `resume` is text.
            Err(resume) => pos = resume,
        }
    }

    push_text(&mut segments, &chars[text_start..]);
    segments
}

fn push_text(segments: &mut Vec<Segment>, span: &[char]) {
    if span.is_empty() {
        return;
    }
    let text: String = span.iter().collect();
    segments.push(Segment::text(unescape_text(&text)));
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

/// Consumes a run of name characters, returning the end index.
fn scan_name(chars: &[char], start: usize) -> usize {
    let mut pos = start;
    while pos < chars.len() && is_name_char(chars[pos]) {
        pos += 1;
    }
    pos
}

/// Tries to match a complete tag at `start`.
///
/// On success returns the segment and the index just past the closing `]`.
/// On failure returns the index where matching stopped. No tag can start
/// between `start` and that index: an opener there lies inside a parameter
/// value, and a tag starting there would reach the same state at the end of
/// that value and fail the same way. Resuming there keeps parsing linear.
fn match_tag(chars: &[char], start: usize) -> Result<(Segment, usize), usize> {
    let type_start = start + TAG_OPEN.len();
    let mut pos = scan_name(chars, type_start);
    if pos == type_start {
        return Err(pos);
    }
    let kind: String = chars[type_start..pos].iter().collect();

    let mut data = Map::new();
    while let Some((key, value, end)) = match_param(chars, pos) {
        data.insert(key, Value::String(unescape_param(&value)));
        pos = end;
    }

    // Optional trailing comma.
    if chars.get(pos) == Some(&',') {
        pos += 1;
    }
    if chars.get(pos) != Some(&']') {
        return Err(pos);
    }

    Ok((Segment::new(SegmentType::from_name(&kind), data), pos + 1))
}

/// Matches `,key=value` at `pos`.
fn match_param(chars: &[char], pos: usize) -> Option<(String, String, usize)> {
    if chars.get(pos) != Some(&',') {
        return None;
    }
    let key_start = pos + 1;
    let key_end = scan_name(chars, key_start);
    if key_end == key_start || chars.get(key_end) != Some(&'=') {
        return None;
    }

    let value_start = key_end + 1;
    let mut value_end = value_start;
    while value_end < chars.len() && !matches!(chars[value_end], ',' | ']') {
        value_end += 1;
    }
    if value_end == value_start {
        return None;
    }

    Some((
        chars[key_start..key_end].iter().collect(),
        chars[value_start..value_end].iter().collect(),
        value_end,
    ))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::segment::SendOptions;

    fn tag(name: &str, pairs: &[(&str, &str)]) -> Segment {
        let data = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();
        Segment::new(SegmentType::from_name(name), data)
    }

    #[test]
    fn test_parse_tag_between_text() {
        let segments = parse_inline("hello [CQ:at,user_id=123] world");
        assert_eq!(
            segments,
            vec![
                Segment::text("hello "),
                tag("at", &[("user_id", "123")]),
                Segment::text(" world"),
            ]
        );
    }

    #[test]
    fn test_parse_suppresses_empty_text() {
        assert_eq!(
            parse_inline("[CQ:at,user_id=1]"),
            vec![tag("at", &[("user_id", "1")])]
        );
        assert_eq!(
            parse_inline("[CQ:a][CQ:b]"),
            vec![tag("a", &[]), tag("b", &[])]
        );
        assert!(parse_inline("").is_empty());
    }

    #[test]
    fn test_parse_plain_string_is_one_segment() {
        assert_eq!(parse_inline("no tags here"), vec![Segment::text("no tags here")]);
    }

    #[test]
    fn test_parse_escaped_comma_in_param() {
        assert_eq!(parse_inline("[CQ:x,k=a&#44;b]"), vec![tag("x", &[("k", "a,b")])]);
    }

    #[test]
    fn test_parse_trailing_comma() {
        assert_eq!(parse_inline("[CQ:x,k=v,]"), vec![tag("x", &[("k", "v")])]);
    }

    #[test]
    fn test_parse_known_and_numeric_names() {
        let segments = parse_inline("[CQ:image,content=a.png][CQ:9,content=**b**]");
        assert_eq!(segments[0].kind, SegmentType::Image);
        assert_eq!(segments[1].kind, SegmentType::KMarkdown);
        assert_eq!(segments[1].content(), Some("**b**"));
    }

    #[test]
    fn test_malformed_tags_stay_literal() {
        for input in [
            "[CQ:",
            "[CQ:at",
            "[CQ:at,user_id=1",
            "[CQ:at,user_id=]",
            "[CQ:at,bad]",
            "[CQ:,k=v]",
            "[CQ:a b]",
        ] {
            assert_eq!(parse_inline(input), vec![Segment::text(input)], "{input}");
        }
    }

    #[test]
    fn test_malformed_prefix_then_valid_tag() {
        assert_eq!(
            parse_inline("[CQ:bad [CQ:ok,k=v]!"),
            vec![
                Segment::text("[CQ:bad "),
                tag("ok", &[("k", "v")]),
                Segment::text("!"),
            ]
        );
    }

    #[test]
    fn test_unclosed_tag_then_adjacent_tag() {
        assert_eq!(
            parse_inline("[CQ:a[CQ:b]"),
            vec![Segment::text("[CQ:a"), tag("b", &[])]
        );
        assert_eq!(
            parse_inline("[CQ:a,=[CQ:b,k=v]"),
            vec![Segment::text("[CQ:a,="), tag("b", &[("k", "v")])]
        );
        assert_eq!(
            parse_inline("[CQ:a,k=x[CQ:b,j=1"),
            vec![Segment::text("[CQ:a,k=x[CQ:b,j=1")]
        );
    }

    #[test]
    fn test_many_unclosed_tags_stay_literal() {
        let input = "[CQ:a,k=v".repeat(20_000);
        assert_eq!(parse_inline(&input), vec![Segment::text(input.clone())]);
    }

    #[test]
    fn test_text_unescaping() {
        assert_eq!(
            parse_inline("&#91;escaped&#93; &amp; a&#44;b"),
            vec![Segment::text("[escaped] & a&#44;b")]
        );
    }

    #[test]
    fn test_render_round_trip() {
        let msg = KaiheilaMessage::new()
            .text("&[],")
            .segment(tag("x", &[("k", "&[],")]))
            .text("],[&");
        let rendered = msg.to_inline_string();
        assert_eq!(rendered, "&amp;&#91;&#93;,[CQ:x,k=&amp;&#91;&#93;&#44;]&#93;,&#91;&amp;");
        assert_eq!(KaiheilaMessage::parse(&rendered), msg);
    }

    #[test]
    fn test_empty_values_keep_segments_on_reparse() {
        let msg = Segment::kmarkdown("")
            + Segment::image("a.png").with_options(SendOptions::new().nonce(""));
        let rendered = msg.to_inline_string();
        assert_eq!(rendered, "[CQ:kmarkdown][CQ:image,content=a.png]");

        let reparsed = KaiheilaMessage::parse(&rendered);
        assert_eq!(reparsed.len(), 2);
        assert_eq!(reparsed.segments()[0].kind, SegmentType::KMarkdown);
        assert_eq!(reparsed.segments()[1], Segment::image("a.png"));
    }

    #[test]
    fn test_extract_plain_text() {
        let msg = KaiheilaMessage::new()
            .text("a")
            .segment(tag("at", &[("user_id", "1")]))
            .text("b");
        assert_eq!(msg.extract_plain_text(), "ab");
        assert!(!msg.is_plain_text());
        assert!(KaiheilaMessage::from_text("x").is_plain_text());
    }

    #[test]
    fn test_native_text_content_counts_as_plain_text() {
        let msg: KaiheilaMessage =
            serde_json::from_value(json!([{"type": 1, "data": {"content": "hi"}}])).unwrap();
        assert_eq!(msg.extract_plain_text(), "hi");
    }

    #[test]
    fn test_message_deserialize_formats() {
        let array: KaiheilaMessage = serde_json::from_value(json!([
            {"type": 1, "data": {"text": "a"}},
            {"type": 2, "data": {"content": "b.png"}}
        ]))
        .unwrap();
        assert_eq!(array.len(), 2);

        let single =
            KaiheilaMessage::from_value(json!({"type": "at", "data": {"user_id": "1"}})).unwrap();
        assert_eq!(single.segments(), &[tag("at", &[("user_id", "1")])]);

        let inline: KaiheilaMessage = serde_json::from_str(r#""hi [CQ:at,user_id=1]""#).unwrap();
        assert_eq!(inline.len(), 2);
    }

    #[test]
    fn test_message_serialize_array() {
        let msg = KaiheilaMessage::new().text("Hello").image("a.png");
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"[{"type":1,"data":{"text":"Hello"}},{"type":2,"data":{"content":"a.png"}}]"#
        );
    }

    #[test]
    fn test_concatenation() {
        let at = tag("at", &[("user_id", "1")]);

        let msg = KaiheilaMessage::from_text("a") + at.clone() + "[CQ:not,parsed=1]";
        assert_eq!(msg.len(), 3);
        assert_eq!(msg.segments()[2], Segment::text("[CQ:not,parsed=1]"));

        let left = "x" + KaiheilaMessage::from_text("y");
        assert_eq!(left.segments(), &[Segment::text("x"), Segment::text("y")]);

        let seg_sum = at.clone() + String::from("!");
        assert_eq!(seg_sum.segments(), &[at.clone(), Segment::text("!")]);

        let mut acc = KaiheilaMessage::new();
        acc += "a";
        acc += at;
        acc += KaiheilaMessage::from_text("b");
        assert_eq!(acc.extract_plain_text(), "ab");
    }

    #[test]
    fn test_concatenation_is_associative() {
        let a = KaiheilaMessage::from_text("a");
        let b = KaiheilaMessage::from_text("b");
        let c = KaiheilaMessage::from_text("c");
        assert_eq!(
            (a.clone() + b.clone()) + c.clone(),
            a + (b + c)
        );
    }

    #[test]
    fn test_from_implementations() {
        let msg: KaiheilaMessage = "hi [CQ:at,user_id=1]".into();
        assert_eq!(msg.len(), 2);

        let msg: KaiheilaMessage = String::from("plain").into();
        assert_eq!(msg.extract_plain_text(), "plain");

        let msg: KaiheilaMessage = "x".parse().unwrap();
        assert_eq!(msg.len(), 1);

        let msg: KaiheilaMessage = vec![Segment::text("A"), Segment::text("B")].into();
        assert_eq!(msg.into_iter().count(), 2);

        let msg: KaiheilaMessage = [Segment::text("A")].into_iter().collect();
        assert_eq!((&msg).into_iter().count(), 1);
    }
}
