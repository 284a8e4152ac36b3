//! The message record consumed by the threading algorithm.

use crate::utils::unique;

/// A message to be threaded.
///
/// This is the input record for [`thread`](crate::thread): an identifier,
/// the ordered list of ancestor identifiers the message declares, a subject
/// line, and an opaque payload for the caller's own use. The algorithm
/// never inspects the payload.
///
/// Fields are public so that callers (and tests) can populate or adjust
/// records directly before threading; the constructors only take care of
/// reference deduplication.
#[derive(Debug, Clone, PartialEq)]
pub struct Message<P = ()> {
    /// Message-ID used as the join key between messages.
    ///
    /// Not guaranteed unique across malformed input; when duplicated, the
    /// later message overwrites the earlier one in the shared container.
    pub message_id: String,
    /// Ancestor Message-IDs, oldest first.
    ///
    /// Deduplicated with first-occurrence order preserved. Built from the
    /// References chain plus the single In-Reply-To id if not already
    /// present.
    pub references: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Position of the message in the source archive, if known.
    pub index: Option<usize>,
    /// Opaque caller data carried through threading untouched.
    pub payload: Option<P>,
}

impl<P> Message<P> {
    /// Create a message with no references and no payload.
    pub fn new(message_id: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            references: Vec::new(),
            subject: subject.into(),
            index: None,
            payload: None,
        }
    }

    /// Set the reference chain, deduplicating while preserving
    /// first-occurrence order.
    pub fn with_references<I, S>(mut self, references: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.references = unique(references.into_iter().map(Into::into));
        self
    }

    /// Attach an opaque payload.
    pub fn with_payload(mut self, payload: P) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Append the In-Reply-To id to the references unless already present.
    pub fn set_in_reply_to(&mut self, message_id: impl Into<String>) {
        let message_id = message_id.into();
        if !self.references.contains(&message_id) {
            self.references.push(message_id);
        }
    }

    /// Check if this message declares any ancestors.
    pub fn is_reply(&self) -> bool {
        !self.references.is_empty()
    }
}
