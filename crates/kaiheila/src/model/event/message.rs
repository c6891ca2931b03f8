//! Message Events, parent-in-child design.
//!
//! # Hierarchy
//!
//! ```text
//! KaiheilaEvent { target_id, author_id, content, extra, … }
//! └── MessageEvent { message_type, sub_type? }
//!     ├── PrivateMessageEvent
//!     └── GroupMessageEvent
//! ```
//!
//! Each child `Deref`s to its parent, so `group_event.author_id` and
//! `group_event.message_type` both work transparently.

use kaiheila_core::{Event, EventResult, Message as _};
use kaiheila_macros::BotEvent;
use serde::{Deserialize, Serialize};

use super::{KaiheilaEvent, dotted_name, expect_literal};
use crate::model::message::KaiheilaMessage;
use crate::model::types::User;

// ============================================================================
// MessageEvent
// ============================================================================

/// Message event with common fields.
///
/// `Deref` → [`KaiheilaEvent`], so `msg.content` and `msg.self_id` work
/// directly. Decoding requires `post_type == "message"`.
#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[serde(try_from = "RawMessageEvent")]
#[event(type = "message", projection)]
pub struct MessageEvent {
    #[event(parent)]
    #[serde(flatten)]
    pub parent: KaiheilaEvent,

    /// `private` or `group`.
    pub message_type: String,
    pub sub_type: Option<String>,
}

#[derive(Deserialize)]
struct RawMessageEvent {
    #[serde(flatten)]
    parent: KaiheilaEvent,
    message_type: String,
    #[serde(default)]
    sub_type: Option<String>,
}

impl TryFrom<RawMessageEvent> for MessageEvent {
    type Error = String;

    fn try_from(raw: RawMessageEvent) -> Result<Self, Self::Error> {
        expect_literal("post_type", &raw.parent.post_type, "message")?;
        Ok(MessageEvent {
            parent: raw.parent,
            message_type: raw.message_type,
            sub_type: raw.sub_type,
        })
    }
}

impl MessageEvent {
    /// Parses `content` with the inline tag grammar.
    pub fn message(&self) -> KaiheilaMessage {
        KaiheilaMessage::parse(&self.content)
    }

    /// The message author, as sent in `extra.author`.
    pub fn sender(&self) -> Option<&User> {
        self.extra.author.as_ref()
    }
}

impl kaiheila_core::EventProjection for MessageEvent {
    fn event_name(&self) -> String {
        dotted_name(&self.post_type, &self.message_type, self.sub_type.as_deref())
    }

    fn description(&self) -> String {
        Event::description(&self.parent)
    }

    fn user_id(&self) -> EventResult<String> {
        Ok(self.author_id.clone())
    }

    fn session_id(&self) -> EventResult<String> {
        Ok(self.author_id.clone())
    }

    fn is_tome(&self) -> bool {
        false
    }

    fn plain_text(&self) -> EventResult<String> {
        Ok(self.message().extract_plain_text())
    }
}

// ============================================================================
// PrivateMessageEvent
// ============================================================================

/// Direct message. Always addressed to the bot.
///
/// `Deref` chain: `PrivateMessageEvent` → [`MessageEvent`] → [`KaiheilaEvent`].
#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[serde(try_from = "MessageEvent")]
#[event(type = "message", projection, message_type = "private")]
pub struct PrivateMessageEvent {
    #[event(parent)]
    #[serde(flatten)]
    pub parent: MessageEvent,
}

impl kaiheila_core::EventProjection for PrivateMessageEvent {
    fn event_name(&self) -> String {
        Event::event_name(&self.parent)
    }

    fn description(&self) -> String {
        Event::description(&self.parent)
    }

    fn user_id(&self) -> EventResult<String> {
        Event::user_id(&self.parent)
    }

    fn session_id(&self) -> EventResult<String> {
        Event::session_id(&self.parent)
    }

    fn is_tome(&self) -> bool {
        true
    }

    fn plain_text(&self) -> EventResult<String> {
        Event::plain_text(&self.parent)
    }
}

// ============================================================================
// GroupMessageEvent
// ============================================================================

/// Channel message in a guild.
///
/// Sessions are per user per channel; the event is addressed to the bot
/// when the bot is in `extra.mention`.
#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[serde(try_from = "MessageEvent")]
#[event(type = "message", projection, message_type = "group")]
pub struct GroupMessageEvent {
    #[event(parent)]
    #[serde(flatten)]
    pub parent: MessageEvent,
}

impl kaiheila_core::EventProjection for GroupMessageEvent {
    fn event_name(&self) -> String {
        Event::event_name(&self.parent)
    }

    fn description(&self) -> String {
        format!(
            "Message {} from {}@[channel:{}] \"{}\"",
            self.msg_id, self.author_id, self.target_id, self.content
        )
    }

    fn user_id(&self) -> EventResult<String> {
        Event::user_id(&self.parent)
    }

    fn session_id(&self) -> EventResult<String> {
        Ok(format!("channel_{}_{}", self.target_id, self.author_id))
    }

    fn is_tome(&self) -> bool {
        self.extra.mentions(&self.self_id)
    }

    fn plain_text(&self) -> EventResult<String> {
        Event::plain_text(&self.parent)
    }
}
