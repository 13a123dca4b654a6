use thiserror::Error;

/// All errors produced by talkytalk-core.
#[derive(Debug, Error)]
pub enum TalkyTalkError {
    /// A frame source failed to produce the next frame (device gone, decoder
    /// error, short read). Terminates the frame iterator.
    #[error("audio source error: {0}")]
    Source(String),

    /// An analyzer or predictor faulted on a specific frame. Non-fatal: the
    /// pipeline logs this at WARN, skips that component's contribution for
    /// the frame, and continues with prior state.
    #[error("component '{name}' faulted: {reason}")]
    Component { name: String, reason: String },

    /// Invalid configuration caught at construction time.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TalkyTalkError>;
