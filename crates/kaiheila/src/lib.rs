//! # Kaiheila Adapter
//!
//! Decodes Kaiheila gateway pushes into typed events and models outgoing
//! messages as segments.
//!
//! ## Overview
//!
//! - Event decoding: raw JSON is classified by its discriminators and
//!   decoded into the most specific event struct ([`parse_event`])
//! - Message model: [`KaiheilaMessage`] is an ordered list of [`Segment`]s
//!   with an inline `[CQ:type,key=value]` text form
//! - Asset upload: [`HttpAssetUploader`] hosts local media for segments
//!
//! The websocket transport and the host runtime live outside this crate;
//! they hand over one envelope at a time, with `post_type`,
//! `notice_type`/`message_type`, `sub_type` and `self_id` filled in.
//!
//! ## Event Parsing
//!
//! ```rust,ignore
//! use kaiheila::{GroupMessageEvent, parse_event};
//!
//! let event = parse_event(&json_string)?;
//! if let Some(msg) = event.downcast_ref::<GroupMessageEvent>() {
//!     println!("{}: {}", msg.author_id, msg.plain_text()?);
//! }
//! ```
//!
//! ## Building Messages
//!
//! ```rust,ignore
//! use kaiheila::{KaiheilaMessage, Segment, SendOptions};
//!
//! let msg = KaiheilaMessage::new()
//!     .text("look: ")
//!     .segment(Segment::image(url).with_options(SendOptions::new().quote(msg_id)));
//! let inline = msg.to_inline_string();
//! ```

pub mod asset;
pub mod classifier;
pub mod config;
pub mod model;

pub use asset::{AssetUploader, HttpAssetUploader};
pub use classifier::{EventModel, event_models, parse_event, parse_event_value};
pub use config::{BotConfig, KaiheilaConfig};

// Re-export message types
pub use model::escape::{escape_param, escape_text, unescape_param, unescape_text};
pub use model::message::{KaiheilaMessage, parse_inline};
pub use model::segment::{Segment, SegmentType, SendOptions};

// Re-export event types
pub use model::event::{
    AddedBlockListEvent,
    AddedChannelEvent,
    AddedReactionEvent,
    AddedRoleEvent,
    // Notice categories
    ChannelEvent,
    DeletedBlockListEvent,
    DeletedChannelEvent,
    DeletedGuildEvent,
    DeletedMessageEvent,
    DeletedPrivateMessageEvent,
    DeletedReactionEvent,
    DeletedRoleEvent,
    ExitedGuildEvent,
    GroupMessageEvent,
    GuildMemberOfflineEvent,
    GuildMemberOnlineEvent,
    JoinedGuildEvent,
    // Root event
    KaiheilaEvent,
    // Message types
    MessageEvent,
    NoticeEvent,
    PinnedMessageEvent,
    PrivateAddedReactionEvent,
    PrivateDeletedReactionEvent,
    PrivateMessageEvent,
    PrivateNoticeEvent,
    ServerEvent,
    ServerMemberEvent,
    ServerRoleEvent,
    UnpinnedMessageEvent,
    UpdatedChannelEvent,
    UpdatedGuildEvent,
    UpdatedGuildMemberEvent,
    UpdatedMessageEvent,
    UpdatedPrivateMessageEvent,
    UpdatedRoleEvent,
};
pub use model::types::{
    Attachment, Body, Channel, ChannelType, Emoji, Extra, Guild, Role, User,
};
