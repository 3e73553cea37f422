//! Engine-level error surface.

use crate::channel::ChannelError;

/// Errors surfaced by the reconciliation engine.
///
/// The channel's fine-grained [`ChannelError`] deliberately collapses to
/// [`EngineError::Unavailable`] here: the engine's contract is that any
/// transport failure means "no data this cycle", and callers recover by
/// waiting for the next poll. Widening this mapping would change the
/// published failure policy — see the crate docs before doing so.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The provider could not be reached or did not answer; the whole pass
    /// was aborted and no partial state was produced.
    #[error("no data from provider")]
    Unavailable,

    /// The provider answered with a payload that does not decode.
    #[error("malformed provider payload: {0}")]
    Decode(String),
}

impl From<ChannelError> for EngineError {
    fn from(_: ChannelError) -> Self {
        EngineError::Unavailable
    }
}
