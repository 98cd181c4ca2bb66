/// Result alias that carries the crate [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures the engine reports to callers. Malformed chart data is healed
/// or defaulted instead and never shows up here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("judge line index {index} out of range ({len} lines)")]
    LineIndex { index: usize, len: usize },
    #[error("note index {index} out of range on judge line {line} ({len} notes)")]
    NoteIndex { line: usize, index: usize, len: usize },
    #[error("draw queue has already run; tasks can only be added before run()")]
    DrawQueueClosed,
    #[error("invalid easing type {0} (expected 1..=29)")]
    Easing(u8),
    #[error("invalid note type {0} (expected 1..=4)")]
    NoteType(u8),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("chart JSON: {0}")]
    Json(#[from] serde_json::Error),
}
