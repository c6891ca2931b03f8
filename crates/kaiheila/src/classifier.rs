//! Envelope classification.
//!
//! A gateway push is routed to the most specific event struct its
//! discriminators (`post_type`, `notice_type`/`message_type`, `sub_type`)
//! name. When that struct rejects the envelope, or the sub-type is one this
//! crate does not know yet, the ancestors are tried in turn:
//!
//! ```text
//! notice/channel/added_reaction   → AddedReactionEvent, ChannelEvent, NoticeEvent
//! notice/channel/<future subtype> → ChannelEvent, NoticeEvent
//! message/group                   → GroupMessageEvent, MessageEvent
//! ```
//!
//! The root [`KaiheilaEvent`] is never a candidate: an envelope whose
//! `post_type` names no category is rejected outright.

use kaiheila_core::{AdapterError, AdapterResult, BoxedEvent};
use serde_json::Value;
use tracing::{debug, trace};

use crate::model::event::*;

/// Declares [`EventModel`]: one variant per decodable event struct.
///
/// Branches name their parent model explicitly; leaves name their parent
/// and take their `sub_type` from the struct's `SUB_TYPE`.
macro_rules! event_models {
    (
        branches { $($branch:ident($branch_ty:ty) => $branch_parent:expr,)* }
        leaves { $($leaf:ident($leaf_ty:ty) => $leaf_parent:ident,)* }
    ) => {
        /// A concrete event struct an envelope can be decoded into.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum EventModel {
            $($branch,)*
            $($leaf,)*
        }

        impl EventModel {
            /// Every model, branches first.
            pub const ALL: &'static [EventModel] = &[
                $(EventModel::$branch,)*
                $(EventModel::$leaf,)*
            ];

            /// Name of the event struct.
            pub fn name(self) -> &'static str {
                match self {
                    $(EventModel::$branch => stringify!($branch_ty),)*
                    $(EventModel::$leaf => stringify!($leaf_ty),)*
                }
            }

            /// The model of the embedded parent struct.
            pub fn parent(self) -> Option<EventModel> {
                match self {
                    $(EventModel::$branch => $branch_parent,)*
                    $(EventModel::$leaf => Some(EventModel::$leaf_parent),)*
                }
            }

            /// The fixed `sub_type` of a leaf model.
            pub fn sub_type(self) -> Option<&'static str> {
                match self {
                    $(EventModel::$leaf => Some(<$leaf_ty>::SUB_TYPE),)*
                    _ => None,
                }
            }

            /// Decodes `value` as this model and attaches `raw`.
            pub fn decode(self, value: Value, raw: &str) -> serde_json::Result<BoxedEvent> {
                match self {
                    $(EventModel::$branch => {
                        let mut event: $branch_ty = serde_json::from_value(value)?;
                        event.set_raw(raw);
                        Ok(BoxedEvent::new(event))
                    })*
                    $(EventModel::$leaf => {
                        let mut event: $leaf_ty = serde_json::from_value(value)?;
                        event.set_raw(raw);
                        Ok(BoxedEvent::new(event))
                    })*
                }
            }
        }
    };
}

event_models! {
    branches {
        Kaiheila(KaiheilaEvent) => None,
        Notice(NoticeEvent) => Some(EventModel::Kaiheila),
        Channel(ChannelEvent) => Some(EventModel::Notice),
        PrivateNotice(PrivateNoticeEvent) => Some(EventModel::Notice),
        ServerMember(ServerMemberEvent) => Some(EventModel::Notice),
        ServerRole(ServerRoleEvent) => Some(EventModel::Notice),
        Server(ServerEvent) => Some(EventModel::Notice),
        Message(MessageEvent) => Some(EventModel::Kaiheila),
        PrivateMessage(PrivateMessageEvent) => Some(EventModel::Message),
        GroupMessage(GroupMessageEvent) => Some(EventModel::Message),
    }
    leaves {
        AddedReaction(AddedReactionEvent) => Channel,
        DeletedReaction(DeletedReactionEvent) => Channel,
        UpdatedMessage(UpdatedMessageEvent) => Channel,
        DeletedMessage(DeletedMessageEvent) => Channel,
        AddedChannel(AddedChannelEvent) => Channel,
        UpdatedChannel(UpdatedChannelEvent) => Channel,
        DeletedChannel(DeletedChannelEvent) => Channel,
        PinnedMessage(PinnedMessageEvent) => Channel,
        UnpinnedMessage(UnpinnedMessageEvent) => Channel,
        UpdatedPrivateMessage(UpdatedPrivateMessageEvent) => PrivateNotice,
        DeletedPrivateMessage(DeletedPrivateMessageEvent) => PrivateNotice,
        PrivateAddedReaction(PrivateAddedReactionEvent) => PrivateNotice,
        PrivateDeletedReaction(PrivateDeletedReactionEvent) => PrivateNotice,
        JoinedGuild(JoinedGuildEvent) => ServerMember,
        ExitedGuild(ExitedGuildEvent) => ServerMember,
        UpdatedGuildMember(UpdatedGuildMemberEvent) => ServerMember,
        GuildMemberOnline(GuildMemberOnlineEvent) => ServerMember,
        GuildMemberOffline(GuildMemberOfflineEvent) => ServerMember,
        AddedRole(AddedRoleEvent) => ServerRole,
        DeletedRole(DeletedRoleEvent) => ServerRole,
        UpdatedRole(UpdatedRoleEvent) => ServerRole,
        UpdatedGuild(UpdatedGuildEvent) => Server,
        DeletedGuild(DeletedGuildEvent) => Server,
        AddedBlockList(AddedBlockListEvent) => Server,
        DeletedBlockList(DeletedBlockListEvent) => Server,
    }
}

impl EventModel {
    /// The leaf under `parent` whose `sub_type` is `sub_type`.
    fn leaf(parent: EventModel, sub_type: &str) -> Option<EventModel> {
        Self::ALL
            .iter()
            .copied()
            .find(|model| model.parent() == Some(parent) && model.sub_type() == Some(sub_type))
    }

    /// This model followed by its ancestors, stopping below the root.
    fn chain(self) -> Vec<EventModel> {
        let mut chain = vec![self];
        let mut current = self;
        while let Some(parent) = current.parent() {
            if parent == EventModel::Kaiheila {
                break;
            }
            chain.push(parent);
            current = parent;
        }
        chain
    }
}

fn str_field<'a>(envelope: &'a Value, key: &str) -> Option<&'a str> {
    envelope.get(key).and_then(Value::as_str)
}

/// Returns the candidate models for an envelope, most specific first.
pub fn event_models(envelope: &Value) -> AdapterResult<Vec<EventModel>> {
    let post_type = str_field(envelope, "post_type");

    let most_specific = match post_type {
        Some("notice") => {
            let category = match str_field(envelope, "notice_type") {
                Some("channel") => EventModel::Channel,
                Some("private") => EventModel::PrivateNotice,
                Some("server_member") => EventModel::ServerMember,
                Some("server_role") => EventModel::ServerRole,
                Some("server") => EventModel::Server,
                _ => EventModel::Notice,
            };
            str_field(envelope, "sub_type")
                .and_then(|sub_type| EventModel::leaf(category, sub_type))
                .unwrap_or(category)
        }
        Some("message") => match str_field(envelope, "message_type") {
            Some("private") => EventModel::PrivateMessage,
            Some("group") => EventModel::GroupMessage,
            _ => EventModel::Message,
        },
        other => return Err(AdapterError::UnknownPostType(other.map(String::from))),
    };

    Ok(most_specific.chain())
}

/// Decodes an already-parsed envelope into the most specific event that
/// accepts it.
///
/// `raw` is attached to the decoded event as its raw JSON.
pub fn parse_event_value(envelope: Value, raw: &str) -> AdapterResult<BoxedEvent> {
    let candidates = event_models(&envelope)?;
    let mut reason = String::new();

    for (rank, model) in candidates.iter().copied().enumerate() {
        match model.decode(envelope.clone(), raw) {
            Ok(event) => {
                if rank > 0 {
                    debug!(
                        model = model.name(),
                        preferred = candidates[0].name(),
                        "Envelope decoded by fallback model"
                    );
                }
                return Ok(event);
            }
            Err(e) => {
                trace!(model = model.name(), error = %e, "Candidate model rejected envelope");
                reason = e.to_string();
            }
        }
    }

    Err(AdapterError::Validation {
        candidates: candidates.iter().map(|model| model.name()).collect(),
        reason,
    })
}

/// Parses raw gateway JSON into the most specific [`BoxedEvent`].
pub fn parse_event(raw: &str) -> AdapterResult<BoxedEvent> {
    let envelope: Value = serde_json::from_str(raw)?;
    parse_event_value(envelope, raw)
}

#[cfg(test)]
mod tests {
    use kaiheila_core::{Event, EventType};
    use serde_json::json;

    use super::*;
    use crate::model::event::fixtures;

    fn raw(envelope: &Value) -> String {
        serde_json::to_string(envelope).unwrap()
    }

    #[test]
    fn test_known_leaf_is_most_specific() {
        let envelope = fixtures::notice("channel", "added_reaction");
        assert_eq!(
            event_models(&envelope).unwrap(),
            vec![EventModel::AddedReaction, EventModel::Channel, EventModel::Notice]
        );

        let event = parse_event(&raw(&envelope)).unwrap();
        assert!(event.is::<AddedReactionEvent>());
        assert_eq!(event.event_name(), "notice.channel.added_reaction");
        assert_eq!(event.event_type(), EventType::Notice);
    }

    #[test]
    fn test_unknown_sub_type_falls_back_to_category() {
        let envelope = fixtures::notice("channel", "some_future_subtype");
        assert_eq!(
            event_models(&envelope).unwrap(),
            vec![EventModel::Channel, EventModel::Notice]
        );

        let event = parse_event(&raw(&envelope)).unwrap();
        assert!(event.is::<ChannelEvent>());
        assert_eq!(event.event_name(), "notice.channel.some_future_subtype");
        assert_eq!(event.user_id().as_deref(), Ok("u-5"));
    }

    #[test]
    fn test_unknown_notice_type_falls_back_to_notice() {
        let envelope = fixtures::notice("broadcast", "started");
        assert_eq!(event_models(&envelope).unwrap(), vec![EventModel::Notice]);
        assert!(parse_event(&raw(&envelope)).unwrap().is::<NoticeEvent>());
    }

    #[test]
    fn test_message_candidates() {
        let envelope = fixtures::message("group", json!(["9"]));
        assert_eq!(
            event_models(&envelope).unwrap(),
            vec![EventModel::GroupMessage, EventModel::Message]
        );

        let event = parse_event(&raw(&envelope)).unwrap();
        assert!(event.is::<GroupMessageEvent>());
        assert_eq!(event.event_name(), "message.group");
        assert!(event.is_tome());
        assert_eq!(event.session_id().as_deref(), Ok("channel_42_7"));

        let private = parse_event(&raw(&fixtures::message("private", json!(null)))).unwrap();
        assert!(private.is::<PrivateMessageEvent>());
        assert!(private.is_tome());
    }

    #[test]
    fn test_extract_ancestor_from_classified_event() {
        let event = parse_event(&raw(&fixtures::notice("channel", "added_reaction"))).unwrap();
        let channel: ChannelEvent = event.extract().unwrap();
        assert_eq!(channel.sub_type, "added_reaction");
        assert!(event.extract::<ServerEvent>().is_none());
    }

    #[test]
    fn test_unknown_post_type() {
        let mut envelope = fixtures::message("group", json!(null));
        envelope["post_type"] = json!("meta_event");
        assert!(matches!(
            event_models(&envelope),
            Err(AdapterError::UnknownPostType(Some(ref t))) if t == "meta_event"
        ));

        envelope.as_object_mut().unwrap().remove("post_type");
        assert!(matches!(
            parse_event(&raw(&envelope)),
            Err(AdapterError::UnknownPostType(None))
        ));
    }

    #[test]
    fn test_body_on_regular_message_fails_validation() {
        let mut envelope = fixtures::message("group", json!(null));
        envelope["extra"]["body"] = fixtures::notice("channel", "x")["extra"]["body"].clone();

        match parse_event(&raw(&envelope)) {
            Err(AdapterError::Validation { candidates, reason }) => {
                assert_eq!(candidates, vec!["GroupMessageEvent", "MessageEvent"]);
                assert!(!reason.is_empty());
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_raw_json_attached() {
        let raw = raw(&fixtures::notice("server_role", "added_role"));
        let event = parse_event(&raw).unwrap();
        assert_eq!(event.raw_json(), Some(raw.as_str()));
        assert_eq!(event.bot_id(), Some("9"));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(parse_event("{not json"), Err(AdapterError::Json(_))));
    }

    #[test]
    fn test_model_table() {
        assert_eq!(EventModel::AddedReaction.name(), "AddedReactionEvent");
        assert_eq!(EventModel::AddedReaction.sub_type(), Some("added_reaction"));
        assert_eq!(EventModel::Channel.sub_type(), None);
        assert_eq!(EventModel::Kaiheila.parent(), None);

        for model in EventModel::ALL {
            if let Some(sub_type) = model.sub_type() {
                let parent = model.parent().unwrap();
                assert_eq!(EventModel::leaf(parent, sub_type), Some(*model));
            }
        }
    }
}
