//! # Kaiheila Core
//!
//! Platform-agnostic building blocks for the Kaiheila adapter.
//!
//! - **Event System**: Type-erased events with runtime downcasting and
//!   ancestor extraction ([`Event`], [`EventProjection`], [`BoxedEvent`])
//! - **Message Abstractions**: Segment and message traits
//!   ([`MessageSegment`], [`Message`])
//! - **Errors**: One error family per boundary ([`EventError`],
//!   [`AdapterError`], [`ApiError`])
//!
//! Concrete events are declared with `#[derive(BotEvent)]` from
//! `kaiheila-macros`, which expands to paths inside this crate.

pub mod error;
pub mod event;
pub mod message;

pub use error::{
    AdapterError, AdapterResult, ApiError, ApiResult, EventError, EventResult,
};
pub use event::{BoxedEvent, Event, EventProjection, EventType};
pub use message::{Message, MessageSegment};
