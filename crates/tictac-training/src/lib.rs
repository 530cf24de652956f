//! Classifier bank, evaluation and model selection for game-state
//! classification.
//!
//! # Overview
//!
//! - [`classifier`]: the [`Learner`](classifier::Learner) /
//!   [`Classifier`](classifier::Classifier) traits and the model catalogue
//! - [`knn`], [`mlp`], [`tree`], [`forest`]: the four model families
//! - [`evaluation`]: per-class scores on the test partition and the metrics sidecar
//! - [`selection`]: override or best macro-F1
//! - [`pipeline`]: [`TrainingRun`](pipeline::TrainingRun), the fitted encoding
//!   state and the inference adapter
//! - [`feedback`]: live accuracy from ground truth reported after serving
//!
//! k-NN and the MLP consume standardized one-hot features; the tree models
//! consume ordinal cell codes.
//!
//! # Example
//!
//! ```
//! use tictac_analysis::dataset::Dataset;
//! use tictac_engine::{enumerate, rules};
//! use tictac_training::{
//!     classifier::ModelKind,
//!     pipeline::{PipelineConfig, TrainingRun},
//! };
//!
//! let dataset = Dataset::from_boards(enumerate::reachable_boards(), rules::label_of).unwrap();
//! let config = PipelineConfig {
//!     models: vec![ModelKind::DecisionTree],
//!     ..PipelineConfig::default()
//! };
//! let run = TrainingRun::train(&dataset, &config).unwrap();
//!
//! // "?" is not a cell value; the tree reads it as blank
//! let result = run.classify(&["x", "x", "x", "o", "o", "?", "b", "b", "b"], None).unwrap();
//! assert_eq!(result.model, ModelKind::DecisionTree);
//! println!("{}", result.prediction);
//! ```

pub mod classifier;
pub mod evaluation;
pub mod feedback;
pub mod forest;
pub mod knn;
pub mod mlp;
pub mod pipeline;
pub mod selection;
pub mod tree;
