//! Event system foundations.
//!
//! - [`Event`] - Object-safe base trait for all events
//! - [`EventProjection`] - Per-variant overrides for naming and identity
//! - [`EventType`] - High-level classification (message, notice)
//! - [`BoxedEvent`] - Type-erased, cheaply clonable event handle
//!
//! # Parent-in-child hierarchies
//!
//! Platform events are modelled as structs that embed their parent event.
//! `#[derive(BotEvent)]` generates the `Event` impl: every method delegates
//! to the parent unless the struct opts into [`EventProjection`], in which
//! case the projection answers instead. The root answers with the defaults
//! below, which is how "no identity on this event" is expressed.
//!
//! ```rust,ignore
//! let event: BoxedEvent = parse_event(raw)?;
//!
//! // Dispatch key
//! println!("{}", event.event_name());
//!
//! // Extract any level of the hierarchy
//! if let Some(channel) = event.extract::<ChannelEvent>() {
//!     println!("channel notice from {}", channel.user_id()?);
//! }
//! ```

use std::any::{Any, TypeId};
use std::ops::Deref;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{EventError, EventResult};

// ============================================================================
// Event Type Classification
// ============================================================================

/// Classification of event types.
///
/// Lets dispatchers filter by category without knowing the concrete event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Message events (private and group messages).
    Message,
    /// Notice events (reactions, channel and guild changes, ...).
    Notice,
    /// Anything else.
    Other,
}

impl FromStr for EventType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "message" => EventType::Message,
            "notice" => EventType::Notice,
            _ => EventType::Other,
        })
    }
}

// ============================================================================
// Core Event Trait
// ============================================================================

/// The base trait for all events.
///
/// Object-safe: events travel as `dyn Event` inside a [`BoxedEvent`] and can
/// be recovered with [`as_any`](Event::as_any) or
/// [`downgrade_any`](Event::downgrade_any).
///
/// The identity accessors fail rather than return a placeholder. Callers are
/// expected to know which variant they hold before asking.
pub trait Event: Any + Send + Sync {
    /// Returns the dot-joined dispatch key, e.g. `notice.channel.added_reaction`.
    fn event_name(&self) -> String;

    /// Returns the platform/adapter name.
    fn platform(&self) -> &'static str;

    /// Returns the high-level event type classification.
    fn event_type(&self) -> EventType {
        EventType::Other
    }

    /// Returns a reference to self as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns a boxed clone of `self` or of the ancestor whose type id is
    /// `type_id`, or `None` if no level of the hierarchy has that type.
    fn downgrade_any(&self, type_id: TypeId) -> Option<Box<dyn Any>>;

    /// Returns the raw JSON the event was decoded from, if attached.
    fn raw_json(&self) -> Option<&str> {
        None
    }

    /// Returns the id of the bot that received this event.
    fn bot_id(&self) -> Option<&str> {
        None
    }

    /// Returns a human-readable description for logs.
    fn description(&self) -> String {
        self.event_name()
    }

    /// Returns the id of the user that caused this event.
    fn user_id(&self) -> EventResult<String> {
        Err(EventError::no_identity(self.event_name(), "user_id"))
    }

    /// Returns the conversation key used to group related events.
    fn session_id(&self) -> EventResult<String> {
        Err(EventError::no_identity(self.event_name(), "session_id"))
    }

    /// Returns whether the event is addressed to the receiving bot.
    fn is_tome(&self) -> bool {
        false
    }

    /// Returns the plain text of the message carried by this event.
    fn plain_text(&self) -> EventResult<String> {
        Err(EventError::no_message(self.event_name()))
    }
}

// ============================================================================
// Event Projection
// ============================================================================

/// Variant-specific answers to the [`Event`] accessors.
///
/// Implemented by the levels of a hierarchy that change how names or
/// identities are derived. Mark the struct with `#[event(projection)]` and
/// the derived `Event` impl routes through this trait. Levels without the
/// marker inherit their parent's answers.
///
/// Implementations usually answer a few methods themselves and forward the
/// rest to the parent with `Event::method(&self.parent)`.
pub trait EventProjection {
    /// See [`Event::event_name`].
    fn event_name(&self) -> String;

    /// See [`Event::description`].
    fn description(&self) -> String;

    /// See [`Event::user_id`].
    fn user_id(&self) -> EventResult<String>;

    /// See [`Event::session_id`].
    fn session_id(&self) -> EventResult<String>;

    /// See [`Event::is_tome`].
    fn is_tome(&self) -> bool;

    /// See [`Event::plain_text`].
    fn plain_text(&self) -> EventResult<String>;
}

// ============================================================================
// Boxed Event
// ============================================================================

/// A type-erased container for events that supports runtime downcasting.
///
/// `BoxedEvent` derefs to `dyn Event`, so trait methods can be called
/// directly:
///
/// ```rust,ignore
/// let name = event.event_name();
/// let session = event.session_id()?;
/// ```
#[derive(Clone)]
pub struct BoxedEvent {
    inner: Arc<dyn Event>,
}

impl BoxedEvent {
    /// Creates a new `BoxedEvent` from any type implementing `Event`.
    pub fn new<E: Event>(event: E) -> Self {
        Self {
            inner: Arc::new(event),
        }
    }

    /// Returns the inner `Arc<dyn Event>`.
    pub fn inner(&self) -> &Arc<dyn Event> {
        &self.inner
    }

    /// Returns `true` if the concrete event type is `E`.
    pub fn is<E: Event>(&self) -> bool {
        self.inner.as_any().is::<E>()
    }

    /// Attempts to downcast to the concrete event type.
    pub fn downcast_ref<E: Event>(&self) -> Option<&E> {
        self.inner.as_any().downcast_ref()
    }

    /// Extracts an owned copy of the concrete event or of any ancestor.
    ///
    /// A decoded `AddedReactionEvent` can be extracted as itself, as its
    /// channel-notice parent, or as the generic notice.
    pub fn extract<E: Event>(&self) -> Option<E> {
        self.inner
            .downgrade_any(TypeId::of::<E>())
            .and_then(|any| any.downcast::<E>().ok())
            .map(|boxed| *boxed)
    }
}

impl Deref for BoxedEvent {
    type Target = dyn Event;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl std::fmt::Debug for BoxedEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxedEvent")
            .field("event_name", &self.event_name())
            .field("platform", &self.platform())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Root {
        name: &'static str,
    }

    impl Event for Root {
        fn event_name(&self) -> String {
            self.name.to_string()
        }

        fn platform(&self) -> &'static str {
            "test"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn downgrade_any(&self, type_id: TypeId) -> Option<Box<dyn Any>> {
            (type_id == TypeId::of::<Self>()).then(|| Box::new(self.clone()) as Box<dyn Any>)
        }
    }

    #[derive(Debug, Clone)]
    struct Child {
        parent: Root,
        user: String,
    }

    impl Event for Child {
        fn event_name(&self) -> String {
            format!("{}.child", self.parent.event_name())
        }

        fn platform(&self) -> &'static str {
            self.parent.platform()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn downgrade_any(&self, type_id: TypeId) -> Option<Box<dyn Any>> {
            if type_id == TypeId::of::<Self>() {
                return Some(Box::new(self.clone()));
            }
            self.parent.downgrade_any(type_id)
        }

        fn user_id(&self) -> EventResult<String> {
            Ok(self.user.clone())
        }
    }

    #[test]
    fn test_event_type_from_str() {
        assert_eq!("Message".parse::<EventType>(), Ok(EventType::Message));
        assert_eq!("notice".parse::<EventType>(), Ok(EventType::Notice));
        assert_eq!("meta_event".parse::<EventType>(), Ok(EventType::Other));
    }

    #[test]
    fn test_defaults_fail_with_no_identity() {
        let root = Root { name: "root" };
        assert_eq!(
            root.user_id(),
            Err(EventError::no_identity("root", "user_id"))
        );
        assert!(root.session_id().is_err());
        assert!(!root.is_tome());
        assert_eq!(root.plain_text(), Err(EventError::no_message("root")));
    }

    #[test]
    fn test_boxed_event_downcast_and_extract() {
        let event = BoxedEvent::new(Child {
            parent: Root { name: "root" },
            user: "42".into(),
        });

        assert!(event.is::<Child>());
        assert!(event.downcast_ref::<Root>().is_none());
        assert_eq!(event.event_name(), "root.child");
        assert_eq!(event.user_id().as_deref(), Ok("42"));

        let root: Root = event.extract().expect("ancestor should be extractable");
        assert_eq!(root.name, "root");
        assert!(event.extract::<Child>().is_some());
    }

    #[test]
    fn test_boxed_event_debug() {
        let event = BoxedEvent::new(Root { name: "root" });
        let debug = format!("{event:?}");
        assert!(debug.contains("\"root\""));
        assert!(debug.contains("\"test\""));
    }
}
