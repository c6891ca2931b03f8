//! Data models for the Kaiheila protocol.
//!
//! Events decoded from gateway pushes, the segment/message model used for
//! sending, and the inline tag codec shared by both.

pub mod escape;
pub mod event;
pub mod message;
pub mod segment;
pub mod types;

pub use escape::{escape_param, escape_text, unescape_param, unescape_text};
pub use event::*;
pub use message::{KaiheilaMessage, parse_inline};
pub use segment::{Segment, SegmentType, SendOptions};
pub use types::{
    Attachment, Body, Channel, ChannelType, Emoji, Extra, Guild, Role, SYSTEM_MESSAGE_TYPE, User,
};
