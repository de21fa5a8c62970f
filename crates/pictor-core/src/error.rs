use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed inference payload: {0}")]
    Payload(String),

    #[error("image payload is empty")]
    EmptyImage,

    #[error("ragged pixel rows: row {row} has {got} pixels, expected {expected}")]
    RaggedRows {
        row: usize,
        got: usize,
        expected: usize,
    },

    #[error("pixel at ({x}, {y}) has {got} channels, expected 3")]
    BadPixel { x: usize, y: usize, got: usize },

    #[error("channel value {value} at ({x}, {y}) is outside 0..=255")]
    ChannelRange { x: usize, y: usize, value: i64 },

    #[error("image encoding failed: {0}")]
    Encode(String),
}
