//! Procedural macros for the Kaiheila adapter.
//!
//! - `#[derive(BotEvent)]` - Generates the `Event` plumbing for
//!   parent-in-child event hierarchies
//!
//! ```rust,ignore
//! use kaiheila_macros::BotEvent;
//!
//! #[derive(Debug, Clone, BotEvent)]
//! #[event(type = "notice", projection)]
//! pub struct NoticeEvent {
//!     #[event(parent)]
//!     #[serde(flatten)]
//!     pub parent: KaiheilaEvent,
//!     pub notice_type: String,
//!     pub sub_type: String,
//! }
//! ```

mod event;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derives `kaiheila_core::Event` for an event struct.
///
/// Structs carry either `#[root_event(platform = "...")]` (the hierarchy
/// root) or `#[event(...)]` together with exactly one field marked
/// `#[event(parent)]`. Child structs get `Deref`/`DerefMut` to the parent
/// and delegate every accessor to it, unless `projection` is set, in which
/// case the struct's `kaiheila_core::EventProjection` impl answers.
///
/// # Attributes
///
/// - `#[root_event(platform = "...", projection)]` - Root of a hierarchy
/// - `#[event(type = "...")]` - `EventType` classification (`message`, `notice`)
/// - `#[event(projection)]` - Use the struct's `EventProjection` impl
/// - `#[event(sub_type = "...")]` - Emit a `SUB_TYPE` associated constant
/// - `#[event(notice_type = "...", message_type = "...")]` - Discriminator
///   literals; with `sub_type` they generate a checking `TryFrom<Parent>`
/// - `#[event(parent)]` on a field - The embedded parent event
/// - `#[event(raw_json)]` on a root field - `Option<Arc<str>>` raw payload
/// - `#[event(bot_id)]` on a root field - Receiving bot's id
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Debug, Clone, Deserialize, BotEvent)]
/// #[serde(try_from = "ChannelEvent")]
/// #[event(sub_type = "added_reaction")]
/// pub struct AddedReactionEvent {
///     #[event(parent)]
///     #[serde(flatten)]
///     pub parent: ChannelEvent,
/// }
/// ```
#[proc_macro_derive(BotEvent, attributes(event, root_event))]
pub fn derive_bot_event(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match event::derive_bot_event(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
