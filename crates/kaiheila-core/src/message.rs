//! Message traits.
//!
//! The message system is built around two abstractions:
//! - [`MessageSegment`]: A single unit of content (text, image, card, ...)
//! - [`Message`]: An ordered collection of segments forming a complete message
//!
//! The adapter provides the concrete types; code that only needs to read
//! content can stay generic over these traits.

use std::fmt::{Debug, Display};

// ============================================================================
// Message Segment Trait
// ============================================================================

/// A trait representing a single segment of a message.
///
/// `Display` renders the segment in its inline textual form.
///
/// # Example
///
/// ```rust,ignore
/// use kaiheila_core::MessageSegment;
///
/// fn describe<S: MessageSegment>(segment: &S) {
///     println!("Segment type: {}", segment.segment_type());
///     if let Some(text) = segment.as_text() {
///         println!("Text content: {text}");
///     }
/// }
/// ```
pub trait MessageSegment: Debug + Clone + Display + Send + Sync + 'static {
    /// Creates a plain text segment.
    fn text(text: impl Into<String>) -> Self;

    /// Returns the type identifier of this segment (e.g. "text", "image").
    fn segment_type(&self) -> &str;

    /// Returns true if this is a plain text segment.
    fn is_text(&self) -> bool {
        self.segment_type() == "text"
    }

    /// Returns the text content if this is a text segment.
    fn as_text(&self) -> Option<&str>;
}

// ============================================================================
// Message Trait
// ============================================================================

/// A trait representing a complete message composed of segments.
///
/// Segment order is rendering order.
pub trait Message: Debug + Clone + Display + Send + Sync + 'static {
    /// The segment type used by this message.
    type Segment: MessageSegment;

    /// Returns the segments as a slice.
    fn segments(&self) -> &[Self::Segment];

    /// Returns an iterator over the message segments.
    fn iter(&self) -> std::slice::Iter<'_, Self::Segment> {
        self.segments().iter()
    }

    /// Returns the number of segments in the message.
    fn len(&self) -> usize {
        self.segments().len()
    }

    /// Returns true if the message has no segments.
    fn is_empty(&self) -> bool {
        self.segments().is_empty()
    }

    /// Extracts all plain text content from the message.
    ///
    /// Concatenates the text of every text segment in order, skipping
    /// everything else.
    fn extract_plain_text(&self) -> String {
        self.iter().filter_map(MessageSegment::as_text).collect()
    }
}
