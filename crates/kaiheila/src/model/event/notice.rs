//! Notice Events
//!
//! System messages (`type == 255`) are delivered as notices. Identity comes
//! from `extra.body`, which is only present on system messages.
//!
//! # Hierarchy
//!
//! ```text
//! NoticeEvent { notice_type, sub_type }
//! ├── ChannelEvent        added/deleted_reaction, updated/deleted/pinned/unpinned_message,
//! │                       added/updated/deleted_channel
//! ├── PrivateNoticeEvent  updated/deleted_private_message, private_added/deleted_reaction
//! ├── ServerMemberEvent   joined/exited_guild, updated_guild_member, guild_member_online/offline
//! ├── ServerRoleEvent     added/deleted/updated_role
//! └── ServerEvent         updated/deleted_guild, added/deleted_block_list
//! ```

use kaiheila_core::{Event, EventError, EventResult};
use kaiheila_macros::BotEvent;
use serde::{Deserialize, Serialize};

use super::{KaiheilaEvent, dotted_name, expect_literal, no_identity};
use crate::model::types::Body;

// ============================================================================
// NoticeEvent
// ============================================================================

/// Generic notice. Identity is `extra.body.user_id`.
///
/// Decoding requires `post_type == "notice"`.
#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[serde(try_from = "RawNoticeEvent")]
#[event(type = "notice", projection)]
pub struct NoticeEvent {
    #[event(parent)]
    #[serde(flatten)]
    pub parent: KaiheilaEvent,

    /// `channel`, `private`, `server_member`, …
    pub notice_type: String,
    /// `added_reaction`, `joined_guild`, …
    pub sub_type: String,
}

#[derive(Deserialize)]
struct RawNoticeEvent {
    #[serde(flatten)]
    parent: KaiheilaEvent,
    notice_type: String,
    sub_type: String,
}

impl TryFrom<RawNoticeEvent> for NoticeEvent {
    type Error = String;

    fn try_from(raw: RawNoticeEvent) -> Result<Self, Self::Error> {
        expect_literal("post_type", &raw.parent.post_type, "notice")?;
        Ok(NoticeEvent {
            parent: raw.parent,
            notice_type: raw.notice_type,
            sub_type: raw.sub_type,
        })
    }
}

impl NoticeEvent {
    /// The system payload, if the envelope carried one.
    pub fn body(&self) -> Option<&Body> {
        self.extra.body.as_ref()
    }
}

impl kaiheila_core::EventProjection for NoticeEvent {
    fn event_name(&self) -> String {
        dotted_name(&self.post_type, &self.notice_type, Some(&self.sub_type))
    }

    fn description(&self) -> String {
        Event::description(&self.parent)
    }

    fn user_id(&self) -> EventResult<String> {
        self.body()
            .map(|body| body.user_id.clone())
            .ok_or_else(|| no_identity(self, "user_id"))
    }

    fn session_id(&self) -> EventResult<String> {
        self.body()
            .map(|body| body.user_id.clone())
            .ok_or_else(|| no_identity(self, "session_id"))
    }

    fn is_tome(&self) -> bool {
        false
    }

    fn plain_text(&self) -> EventResult<String> {
        Err(EventError::no_message(Event::event_name(self)))
    }
}

// ============================================================================
// Categories
// ============================================================================

/// Channel notices (`notice_type = "channel"`).
#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[serde(try_from = "NoticeEvent")]
#[event(type = "notice", notice_type = "channel")]
pub struct ChannelEvent {
    #[event(parent)]
    #[serde(flatten)]
    pub parent: NoticeEvent,
}

/// Direct-message notices (`notice_type = "private"`).
///
/// Identity is the author of the affected message, `extra.body.author_id`.
#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[serde(try_from = "NoticeEvent")]
#[event(type = "notice", projection, notice_type = "private")]
pub struct PrivateNoticeEvent {
    #[event(parent)]
    #[serde(flatten)]
    pub parent: NoticeEvent,
}

impl kaiheila_core::EventProjection for PrivateNoticeEvent {
    fn event_name(&self) -> String {
        Event::event_name(&self.parent)
    }

    fn description(&self) -> String {
        Event::description(&self.parent)
    }

    fn user_id(&self) -> EventResult<String> {
        self.body()
            .map(|body| body.author_id.clone())
            .ok_or_else(|| no_identity(self, "user_id"))
    }

    fn session_id(&self) -> EventResult<String> {
        self.body()
            .map(|body| body.author_id.clone())
            .ok_or_else(|| no_identity(self, "session_id"))
    }

    fn is_tome(&self) -> bool {
        Event::is_tome(&self.parent)
    }

    fn plain_text(&self) -> EventResult<String> {
        Event::plain_text(&self.parent)
    }
}

/// Guild member notices (`notice_type = "server_member"`).
#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[serde(try_from = "NoticeEvent")]
#[event(type = "notice", notice_type = "server_member")]
pub struct ServerMemberEvent {
    #[event(parent)]
    #[serde(flatten)]
    pub parent: NoticeEvent,
}

/// Guild role notices (`notice_type = "server_role"`).
#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[serde(try_from = "NoticeEvent")]
#[event(type = "notice", notice_type = "server_role")]
pub struct ServerRoleEvent {
    #[event(parent)]
    #[serde(flatten)]
    pub parent: NoticeEvent,
}

/// Guild notices (`notice_type = "server"`).
#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[serde(try_from = "NoticeEvent")]
#[event(type = "notice", notice_type = "server")]
pub struct ServerEvent {
    #[event(parent)]
    #[serde(flatten)]
    pub parent: NoticeEvent,
}

// ============================================================================
// Leaves
// ============================================================================

/// Declares leaf notices: no fields of their own, a fixed `sub_type`
/// checked on decode.
macro_rules! notice_leaves {
    ($parent:ident as $parent_name:literal {
        $($(#[$doc:meta])* $name:ident => $sub_type:literal,)*
    }) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
            #[serde(try_from = $parent_name)]
            #[event(type = "notice", sub_type = $sub_type)]
            pub struct $name {
                #[event(parent)]
                #[serde(flatten)]
                pub parent: $parent,
            }
        )*
    };
}

notice_leaves!(ChannelEvent as "ChannelEvent" {
    /// A reaction was added to a channel message.
    AddedReactionEvent => "added_reaction",
    /// A reaction was removed from a channel message.
    DeletedReactionEvent => "deleted_reaction",
    /// A channel message was edited.
    UpdatedMessageEvent => "updated_message",
    /// A channel message was deleted.
    DeletedMessageEvent => "deleted_message",
    AddedChannelEvent => "added_channel",
    UpdatedChannelEvent => "updated_channel",
    DeletedChannelEvent => "deleted_channel",
    /// A message was pinned.
    PinnedMessageEvent => "pinned_message",
    /// A message was unpinned.
    UnpinnedMessageEvent => "unpinned_message",
});

notice_leaves!(PrivateNoticeEvent as "PrivateNoticeEvent" {
    UpdatedPrivateMessageEvent => "updated_private_message",
    DeletedPrivateMessageEvent => "deleted_private_message",
    /// A reaction was added to a direct message.
    PrivateAddedReactionEvent => "private_added_reaction",
    /// A reaction was removed from a direct message.
    PrivateDeletedReactionEvent => "private_deleted_reaction",
});

notice_leaves!(ServerMemberEvent as "ServerMemberEvent" {
    /// A user joined the guild.
    JoinedGuildEvent => "joined_guild",
    /// A user left the guild.
    ExitedGuildEvent => "exited_guild",
    UpdatedGuildMemberEvent => "updated_guild_member",
    GuildMemberOnlineEvent => "guild_member_online",
    GuildMemberOfflineEvent => "guild_member_offline",
});

notice_leaves!(ServerRoleEvent as "ServerRoleEvent" {
    AddedRoleEvent => "added_role",
    DeletedRoleEvent => "deleted_role",
    UpdatedRoleEvent => "updated_role",
});

notice_leaves!(ServerEvent as "ServerEvent" {
    UpdatedGuildEvent => "updated_guild",
    DeletedGuildEvent => "deleted_guild",
    /// A user was added to the guild block list.
    AddedBlockListEvent => "added_block_list",
    DeletedBlockListEvent => "deleted_block_list",
});
