//! Error type for layout configuration.
//!
//! Only configuration is fallible. Numeric trouble inside a pass (zero
//! distances, empty subtrees, NaN coordinates) is absorbed where it happens.

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error("unknown orientation `{0}` (try left-right, right-left, top-bottom, bottom-top)")]
    InvalidOrientation(String),
    #[error("unknown layout `{0}`")]
    UnknownLayout(String),
    #[error("iteration count must be positive")]
    InvalidIterations,
    #[error("iterations per frame must be positive")]
    InvalidIterationsPerFrame,
    #[error("frame inset must not be negative, got {0}")]
    NegativeFrame(f64),
    #[error("margins must not be negative")]
    NegativeMargin,
    #[error("{name} must not be negative, got {value}")]
    NegativeSpacing { name: &'static str, value: f64 },
    #[error("no node with id {0}")]
    UnknownNode(u32),
    #[error("invalid layout configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, LayoutError>;
