//! Common Kaiheila types.
//!
//! Read-only records attached to events: users, guilds, channels, roles,
//! emoji and attachments, plus the `extra` payload and its system `body`.
//! Fields the platform may omit are `Option`s.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where a message was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChannelType {
    /// Direct message.
    Person,
    /// Guild channel.
    Group,
}

/// A guild role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub role_id: Option<i64>,
    pub name: Option<String>,
    pub color: Option<i64>,
    pub position: Option<i64>,
    pub hoist: Option<i64>,
    pub mentionable: Option<i64>,
    pub permissions: Option<i64>,
}

/// A guild channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: Option<String>,
    pub name: Option<String>,
    pub user_id: Option<String>,
    pub guild_id: Option<String>,
    pub topic: Option<String>,
    pub is_category: Option<bool>,
    pub parent_id: Option<String>,
    pub level: Option<i64>,
    pub slow_mode: Option<i64>,
    /// Channel kind (1 text, 2 voice).
    #[serde(rename = "type")]
    pub kind: Option<i64>,
    pub permission_overwrites: Option<Vec<Map<String, Value>>>,
    /// Per-user overrides; each entry holds a `user` object and the
    /// allow/deny bitmasks.
    pub permission_users: Option<Vec<Map<String, Value>>>,
    pub master_id: Option<String>,
    pub permission_sync: Option<i64>,
    pub limit_amount: Option<i64>,
}

/// A platform user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Option<String>,
    pub username: Option<String>,
    pub nickname: Option<String>,
    /// Four-digit discriminator shown after the username.
    pub identify_num: Option<String>,
    pub online: Option<bool>,
    pub bot: Option<bool>,
    pub os: Option<String>,
    pub status: Option<i64>,
    pub avatar: Option<String>,
    pub vip_avatar: Option<String>,
    pub mobile_verified: Option<bool>,
    pub roles: Option<Vec<i64>>,
    pub joined_at: Option<i64>,
    pub active_time: Option<i64>,
}

/// A guild (server).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Guild {
    pub id: Option<String>,
    pub name: Option<String>,
    pub topic: Option<String>,
    pub master_id: Option<String>,
    pub icon: Option<String>,
    /// Default notification level: 0 follows the guild default, 1 all
    /// messages, 2 mentions only, 3 muted.
    pub notify_type: Option<i64>,
    pub region: Option<String>,
    pub enable_open: Option<bool>,
    pub open_id: Option<String>,
    pub default_channel_id: Option<String>,
    pub welcome_channel_id: Option<String>,
    pub roles: Option<Vec<Role>>,
    pub channels: Option<Vec<Channel>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emoji {
    pub id: String,
    pub name: String,
}

/// A file attached to a media message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "type")]
    pub kind: Option<i64>,
    pub url: String,
    pub name: String,
    pub file_type: Option<String>,
    pub size: Option<i64>,
    pub duration: Option<f64>,
    pub width: Option<i64>,
    pub height: Option<i64>,
}

/// Payload of a system (`type == 255`) message.
///
/// Fields beyond the known ones are kept in `other`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub msg_id: String,
    pub user_id: String,
    pub author_id: String,
    pub target_id: String,
    pub channel_id: String,
    pub emoji: Option<Emoji>,
    pub content: Option<String>,
    pub updated_at: i64,
    pub chat_code: String,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Type code of system messages.
pub const SYSTEM_MESSAGE_TYPE: i64 = 255;

/// The `extra` payload of an event.
///
/// Regular messages carry `author`, mentions and attachments; system
/// messages carry `body`. `body` is present exactly when `type` is 255.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawExtra")]
pub struct Extra {
    #[serde(rename = "type")]
    pub kind: Option<i64>,
    pub guild_id: Option<String>,
    pub channel_name: Option<String>,
    pub mention: Option<Vec<String>>,
    pub mention_all: Option<bool>,
    pub mention_roles: Option<Vec<String>>,
    pub mention_here: Option<bool>,
    pub author: Option<User>,
    pub body: Option<Body>,
    pub attachments: Option<Attachment>,
    pub code: Option<String>,
}

impl Extra {
    /// Returns true for system (notice) payloads.
    pub fn is_system(&self) -> bool {
        self.kind == Some(SYSTEM_MESSAGE_TYPE)
    }

    /// Returns true if `user_id` is in the mention list.
    pub fn mentions(&self, user_id: &str) -> bool {
        self.mention
            .as_ref()
            .is_some_and(|ids| ids.iter().any(|id| id == user_id))
    }
}

#[derive(Deserialize)]
struct RawExtra {
    #[serde(rename = "type")]
    kind: Option<i64>,
    guild_id: Option<String>,
    channel_name: Option<String>,
    mention: Option<Vec<String>>,
    mention_all: Option<bool>,
    mention_roles: Option<Vec<String>>,
    mention_here: Option<bool>,
    author: Option<User>,
    body: Option<Body>,
    attachments: Option<Attachment>,
    code: Option<String>,
}

impl TryFrom<RawExtra> for Extra {
    type Error = String;

    fn try_from(raw: RawExtra) -> Result<Self, Self::Error> {
        let system = raw.kind == Some(SYSTEM_MESSAGE_TYPE);
        match (system, raw.body.is_some()) {
            (false, true) => {
                return Err(format!(
                    "extra.body is only allowed on system messages (type {:?})",
                    raw.kind
                ));
            }
            (true, false) => return Err("system message is missing extra.body".to_string()),
            _ => {}
        }

        Ok(Extra {
            kind: raw.kind,
            guild_id: raw.guild_id,
            channel_name: raw.channel_name,
            mention: raw.mention,
            mention_all: raw.mention_all,
            mention_roles: raw.mention_roles,
            mention_here: raw.mention_here,
            author: raw.author,
            body: raw.body,
            attachments: raw.attachments,
            code: raw.code,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn body() -> Value {
        json!({
            "msg_id": "m1",
            "user_id": "u1",
            "author_id": "a1",
            "target_id": "t1",
            "channel_id": "c1",
            "emoji": {"id": "[#128077;]", "name": "[#128077;]"},
            "updated_at": 1_612_345_678_000_i64,
            "chat_code": "cc",
            "guild_id": "g1"
        })
    }

    #[test]
    fn test_body_rejected_without_system_type() {
        let err = serde_json::from_value::<Extra>(json!({"type": 1, "body": body()}));
        assert!(err.is_err());

        let err = serde_json::from_value::<Extra>(json!({"body": body()}));
        assert!(err.is_err());
    }

    #[test]
    fn test_body_accepted_with_system_type() {
        let extra: Extra = serde_json::from_value(json!({"type": 255, "body": body()})).unwrap();
        assert!(extra.is_system());
        let body = extra.body.unwrap();
        assert_eq!(body.user_id, "u1");
        assert_eq!(body.emoji.map(|e| e.name).as_deref(), Some("[#128077;]"));
        assert_eq!(body.other.get("guild_id"), Some(&json!("g1")));
    }

    #[test]
    fn test_system_type_requires_body() {
        assert!(serde_json::from_value::<Extra>(json!({"type": 255})).is_err());
    }

    #[test]
    fn test_message_extra() {
        let extra: Extra = serde_json::from_value(json!({
            "type": 1,
            "guild_id": "g1",
            "channel_name": "general",
            "mention": ["9", "5"],
            "mention_all": false,
            "author": {"id": "7", "username": "alice", "identify_num": "0001", "bot": false},
            "attachments": {"type": 2, "url": "https://img.kaiheila.cn/a.png", "name": "a.png"}
        }))
        .unwrap();
        assert!(extra.mentions("9"));
        assert!(!extra.mentions("8"));
        assert_eq!(extra.author.and_then(|u| u.username).as_deref(), Some("alice"));
        assert_eq!(extra.attachments.map(|a| a.name).as_deref(), Some("a.png"));
    }

    #[test]
    fn test_mentions_without_list() {
        assert!(!Extra::default().mentions("9"));
    }

    #[test]
    fn test_channel_type_wire_names() {
        assert_eq!(
            serde_json::from_value::<ChannelType>(json!("GROUP")).unwrap(),
            ChannelType::Group
        );
        assert!(serde_json::from_value::<ChannelType>(json!("CHANNEL")).is_err());
    }

    #[test]
    fn test_guild_with_nested_roles_and_channels() {
        let guild: Guild = serde_json::from_value(json!({
            "id": "g1",
            "name": "Rust",
            "roles": [{"role_id": 1, "name": "admin", "permissions": 8}],
            "channels": [{"id": "c1", "type": 1, "permission_users": [{"user": {"id": "7"}, "allow": 0, "deny": 0}]}]
        }))
        .unwrap();
        assert_eq!(guild.roles.unwrap()[0].name.as_deref(), Some("admin"));
        let channels = guild.channels.unwrap();
        let channel = &channels[0];
        assert_eq!(channel.kind, Some(1));
        assert_eq!(channel.permission_users.as_ref().map(Vec::len), Some(1));
    }
}
