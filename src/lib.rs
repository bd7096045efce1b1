//! SegmentForge: customer tier segmentation with rule-based labels and a decision tree
//!
//! Synthetic customers are generated from a seed, labeled by a fixed threshold
//! rule engine, and used to train a shallow decision tree whose accuracy,
//! confusion matrix and decision rules can be inspected or plotted.

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod rules;
pub mod session;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use config::PipelineConfig;
pub use data::{
    generate_customers, label_dataset, CustomerRecord, DatasetFilter, LabeledDataset,
    LabeledRecord, Region,
};
pub use error::SegmentError;
pub use model::{evaluate, prepare, train, EvaluationReport, Feature, LabelEncoder, TrainedModel};
pub use rules::{channel_for, classify_tier, Channel, Tier};
pub use session::{Session, Simulation};
pub use viz::generate_visualization_report;

/// Common result type used throughout the library
pub type Result<T> = std::result::Result<T, SegmentError>;
