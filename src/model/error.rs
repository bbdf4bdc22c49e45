use thiserror::Error;

use super::frames::FrameSelection;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("invalid frame selection {selection}: {reason}")]
    InvalidFrameSelection {
        selection: FrameSelection,
        reason: String,
    },
    #[error("{referrer} references unknown vertex `{name}`")]
    UnknownVertexReference { referrer: String, name: String },
    #[error("vertex `{0}` is defined more than once")]
    DuplicateVertex(String),
    #[error("edge {edge} has {actual} frame entries, expected {expected}")]
    FrameLengthMismatch {
        edge: usize,
        expected: usize,
        actual: usize,
    },
    #[error("track size {size} for vertex `{name}` is outside [0, 1]")]
    InvalidTrackSize { name: String, size: f32 },
    #[error("edge {edge} has invalid weight {weight}")]
    InvalidWeight { edge: usize, weight: f32 },
    #[error("no vertex named `{0}`")]
    UnknownVertex(String),
    #[error("no track with index {index} ({count} available)")]
    UnknownTrack { index: usize, count: usize },
}
