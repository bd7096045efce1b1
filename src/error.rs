//! Error types shared by the segmentation core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SegmentError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Training split holds {found} distinct class(es); at least 2 are required")]
    InsufficientClassDiversity { found: usize },

    #[error("Label '{0}' is not known to the encoder")]
    UnknownLabel(String),

    #[error("Class code {0} is not known to the encoder")]
    UnknownCode(usize),

    #[error("Decision tree training failed: {0}")]
    Training(String),

    #[error("Data frame error: {0}")]
    Frame(#[from] polars::prelude::PolarsError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}
