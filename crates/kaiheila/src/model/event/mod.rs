//! Kaiheila Event System, **parent-in-child** design.
//!
//! Each child event struct contains its parent via `#[serde(flatten)]`.
//! The `#[derive(BotEvent)]` macro auto-generates `Deref`/`DerefMut` so that
//! any child can transparently access all ancestor fields:
//!
//! ```text
//! AddedReactionEvent ──Deref──▶ ChannelEvent ──Deref──▶ NoticeEvent ──Deref──▶ KaiheilaEvent
//!                                                 notice_type, sub_type        target_id, extra, …
//! ```
//!
//! # Event Hierarchy
//!
//! ```text
//! KaiheilaEvent { channel_type, type, target_id, author_id, content, extra, … }
//! ├── NoticeEvent { notice_type, sub_type }          ← post_type = "notice"
//! │   ├── ChannelEvent          (channel)
//! │   ├── PrivateNoticeEvent    (private)
//! │   ├── ServerMemberEvent     (server_member)
//! │   ├── ServerRoleEvent       (server_role)
//! │   └── ServerEvent           (server)
//! │       └── one leaf per known sub_type
//! └── MessageEvent { message_type, sub_type? }       ← post_type = "message"
//!     ├── PrivateMessageEvent   (private)
//!     └── GroupMessageEvent     (group)
//! ```
//!
//! Levels that change naming or identity rules implement
//! `EventProjection`; the rest inherit from their parent. The discriminator
//! fields (`post_type`, `notice_type`, `message_type`, `sub_type`) and
//! `self_id` are populated by the transport before decoding.

pub mod message;
pub mod notice;

use std::sync::Arc;

use kaiheila_core::{Event, EventError, EventResult};
use kaiheila_macros::BotEvent;
use serde::{Deserialize, Serialize};

pub use message::*;
pub use notice::*;

use super::types::{ChannelType, Extra};

// ============================================================================
// KaiheilaEvent (Root Level)
// ============================================================================

/// The root Kaiheila event: the `d` object of a gateway push.
///
/// Child events embed this via `#[serde(flatten)] parent: KaiheilaEvent`.
#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[root_event(platform = "kaiheila", projection)]
pub struct KaiheilaEvent {
    pub channel_type: ChannelType,
    /// Content type code (1 text, 2 image, …, 255 system).
    #[serde(rename = "type")]
    pub kind: i64,
    pub target_id: String,
    pub author_id: String,
    pub content: String,
    pub msg_id: String,
    /// Milliseconds since the epoch.
    pub msg_timestamp: i64,
    pub nonce: String,
    pub extra: Extra,
    #[serde(default)]
    pub verify_token: Option<String>,
    /// `message` or `notice`.
    pub post_type: String,
    /// The receiving bot's own user id.
    #[event(bot_id)]
    pub self_id: String,
    /// Raw JSON string (not serialized, attached after decoding).
    #[serde(skip)]
    #[event(raw_json)]
    raw: Option<Arc<str>>,
}

impl KaiheilaEvent {
    /// Attaches the raw JSON the event was decoded from.
    pub fn set_raw(&mut self, raw: &str) {
        self.raw = Some(Arc::from(raw));
    }
}

impl kaiheila_core::EventProjection for KaiheilaEvent {
    fn event_name(&self) -> String {
        self.post_type.clone()
    }

    fn description(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.post_type.clone())
    }

    fn user_id(&self) -> EventResult<String> {
        Err(EventError::no_identity(&self.post_type, "user_id"))
    }

    fn session_id(&self) -> EventResult<String> {
        Err(EventError::no_identity(&self.post_type, "session_id"))
    }

    fn is_tome(&self) -> bool {
        false
    }

    fn plain_text(&self) -> EventResult<String> {
        Err(EventError::no_message(&self.post_type))
    }
}

/// Joins the discriminators of an event into its dispatch name.
fn dotted_name(post_type: &str, category: &str, sub_type: Option<&str>) -> String {
    match sub_type {
        Some(sub) if !sub.is_empty() => format!("{post_type}.{category}.{sub}"),
        _ => format!("{post_type}.{category}"),
    }
}

/// Rejects a discriminator that does not hold the literal its struct is
/// decoded for.
fn expect_literal(field: &str, found: &str, expected: &str) -> Result<(), String> {
    if found == expected {
        Ok(())
    } else {
        Err(format!("expected {field} {expected:?}, found {found:?}"))
    }
}

/// Convenience for identity accessors that need the event name on failure.
fn no_identity<E: Event>(event: &E, field: &'static str) -> EventError {
    EventError::no_identity(event.event_name(), field)
}
