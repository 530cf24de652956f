//! Learner / classifier traits shared by the four model families.
//!
//! A [`Learner`] holds hyperparameters and produces a fitted [`Classifier`].
//! Fitted classifiers are immutable: prediction takes `&self`, so a trained
//! model can be shared across threads and never drifts from the state it was
//! evaluated with.
//!
//! The numerics live in `smartcore` (trees, forests, neighbours) and `burn`
//! (the perceptron); the learners here are adapters that thread the run seed
//! and deadline into those libraries.

use std::{fmt, str::FromStr, time::Instant};

use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use tictac_analysis::features::FeatureMatrix;

/// Which fitted feature transform a model consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
pub enum FeatureFamily {
    /// Per-cell integer codes, unscaled.
    #[display("ordinal")]
    Ordinal,
    /// One-hot indicators standardized by the training-split scaler.
    #[display("scaled indicator")]
    ScaledIndicator,
}

/// The classifier families of the bank, in selection order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    derive_more::IsVariant,
)]
pub enum ModelKind {
    #[serde(rename = "k-NN")]
    Knn,
    #[serde(rename = "MLP")]
    Mlp,
    #[serde(rename = "DecisionTree")]
    DecisionTree,
    #[serde(rename = "RandomForest")]
    RandomForest,
}

impl ModelKind {
    /// Fixed iteration order; selection ties go to the earlier entry.
    pub const ALL: [ModelKind; 4] = [
        ModelKind::Knn,
        ModelKind::Mlp,
        ModelKind::DecisionTree,
        ModelKind::RandomForest,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ModelKind::Knn => "k-NN",
            ModelKind::Mlp => "MLP",
            ModelKind::DecisionTree => "DecisionTree",
            ModelKind::RandomForest => "RandomForest",
        }
    }

    #[must_use]
    pub const fn family(self) -> FeatureFamily {
        match self {
            ModelKind::Knn | ModelKind::Mlp => FeatureFamily::ScaledIndicator,
            ModelKind::DecisionTree | ModelKind::RandomForest => FeatureFamily::Ordinal,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("unknown model '{name}' (expected one of distance, neural, tree, ensemble)")]
pub struct ParseModelKindError {
    pub name: String,
}

impl FromStr for ModelKind {
    type Err = ParseModelKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim().to_lowercase().as_str() {
            "distance" | "knn" | "k-nn" => ModelKind::Knn,
            "neural" | "mlp" => ModelKind::Mlp,
            "tree" | "decisiontree" | "decision-tree" | "arvore" => ModelKind::DecisionTree,
            "ensemble" | "forest" | "randomforest" | "random-forest" => ModelKind::RandomForest,
            _ => {
                return Err(ParseModelKindError {
                    name: s.trim().to_owned(),
                });
            }
        };
        Ok(kind)
    }
}

/// A failure reported by the numeric library behind a model.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("{model} backend failed: {message}")]
pub struct BackendError {
    pub model: ModelKind,
    pub message: String,
}

impl BackendError {
    pub(crate) fn new(model: ModelKind, error: impl fmt::Display) -> Self {
        Self {
            model,
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum TrainError {
    #[display("training set is empty")]
    EmptyTrainingSet,
    #[display("training set has no feature columns")]
    NoFeatures,
    #[display("{features} feature rows but {labels} labels")]
    LengthMismatch { features: usize, labels: usize },
    #[display("class code {code} is outside 0..{n_classes}")]
    ClassOutOfRange { code: usize, n_classes: usize },
    #[display("{model} training exceeded its deadline")]
    DeadlineExceeded { model: ModelKind },
    #[display("{_0}")]
    #[from]
    Backend(#[error(source)] BackendError),
}

/// Feature rows paired with class codes.
#[derive(Debug, Clone, Copy)]
pub struct Samples<'a> {
    pub features: &'a FeatureMatrix,
    pub labels: &'a [usize],
}

impl<'a> Samples<'a> {
    pub fn new(features: &'a FeatureMatrix, labels: &'a [usize]) -> Result<Self, TrainError> {
        if features.n_rows() != labels.len() {
            return Err(TrainError::LengthMismatch {
                features: features.n_rows(),
                labels: labels.len(),
            });
        }
        Ok(Self { features, labels })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub(crate) fn check_trainable(&self, n_classes: usize) -> Result<(), TrainError> {
        if self.is_empty() {
            return Err(TrainError::EmptyTrainingSet);
        }
        if self.features.n_cols() == 0 {
            return Err(TrainError::NoFeatures);
        }
        if let Some(&code) = self.labels.iter().find(|&&c| c >= n_classes) {
            return Err(TrainError::ClassOutOfRange { code, n_classes });
        }
        Ok(())
    }
}

/// Settings shared by every learner in one training run.
#[derive(Debug, Clone)]
pub struct TrainContext {
    pub seed: u64,
    pub n_classes: usize,
    pub deadline: Option<Instant>,
}

impl TrainContext {
    #[must_use]
    pub fn new(seed: u64, n_classes: usize) -> Self {
        Self {
            seed,
            n_classes,
            deadline: None,
        }
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn check_deadline(&self, model: ModelKind) -> Result<(), TrainError> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Err(TrainError::DeadlineExceeded { model })
            }
            _ => Ok(()),
        }
    }
}

/// Hyperparameters of a model family.
pub trait Learner: Send + Sync {
    fn kind(&self) -> ModelKind;

    /// Fits a model on `train`.
    ///
    /// `validation` is a held-out partition a learner may use for early
    /// stopping; it is never used for fitting parameters.
    fn fit(
        &self,
        train: Samples<'_>,
        validation: Option<Samples<'_>>,
        ctx: &TrainContext,
    ) -> Result<Box<dyn Classifier>, TrainError>;
}

/// A fitted model.
pub trait Classifier: Send + Sync + fmt::Debug {
    /// Predicts the class code of every feature row.
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<usize>, BackendError>;

    /// Predicts the class code of one feature row.
    fn predict_row(&self, row: &[f64]) -> Result<usize, BackendError> {
        let features = FeatureMatrix::from_rows(row.len(), [row]);
        let predicted = self.predict(&features)?;
        Ok(predicted.first().copied().unwrap_or_default())
    }
}

/// Copies `features` into the matrix type `smartcore` estimators consume.
pub(crate) fn dense_matrix(
    model: ModelKind,
    features: &FeatureMatrix,
) -> Result<DenseMatrix<f64>, BackendError> {
    DenseMatrix::new(
        features.n_rows(),
        features.n_cols(),
        features.as_slice().to_vec(),
        false,
    )
    .map_err(|e| BackendError::new(model, e))
}

/// Index of the largest value; ties go to the smallest index.
pub(crate) fn argmax<T>(values: &[T]) -> usize
where
    T: PartialOrd,
{
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use smartcore::linalg::basic::arrays::Array as _;

    use super::*;

    #[test]
    fn test_model_aliases() {
        assert_eq!("distance".parse::<ModelKind>().unwrap(), ModelKind::Knn);
        assert_eq!("Neural".parse::<ModelKind>().unwrap(), ModelKind::Mlp);
        assert_eq!("arvore".parse::<ModelKind>().unwrap(), ModelKind::DecisionTree);
        assert_eq!("ensemble".parse::<ModelKind>().unwrap(), ModelKind::RandomForest);
        for kind in ModelKind::ALL {
            assert_eq!(kind.name().parse::<ModelKind>().unwrap(), kind);
        }
        assert!("svm".parse::<ModelKind>().is_err());
    }

    #[test]
    fn test_families() {
        assert_eq!(ModelKind::Knn.family(), FeatureFamily::ScaledIndicator);
        assert_eq!(ModelKind::Mlp.family(), FeatureFamily::ScaledIndicator);
        assert_eq!(ModelKind::DecisionTree.family(), FeatureFamily::Ordinal);
        assert_eq!(ModelKind::RandomForest.family(), FeatureFamily::Ordinal);
    }

    #[test]
    fn test_argmax_prefers_first() {
        assert_eq!(argmax(&[1, 3, 3, 2]), 1);
        assert_eq!(argmax(&[0.5]), 0);
    }

    #[test]
    fn test_samples_length_check() {
        let m = FeatureMatrix::from_rows(1, [[0.0], [1.0]]);
        assert!(Samples::new(&m, &[0]).is_err());
        let s = Samples::new(&m, &[0, 3]).unwrap();
        assert_eq!(
            s.check_trainable(2),
            Err(TrainError::ClassOutOfRange {
                code: 3,
                n_classes: 2
            })
        );
    }

    #[test]
    fn test_dense_matrix_keeps_row_order() {
        let m = FeatureMatrix::from_rows(3, [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let dense = dense_matrix(ModelKind::DecisionTree, &m).unwrap();
        assert_eq!(dense.shape(), (2, 3));
        assert_eq!(*dense.get((1, 0)), 4.0);
        assert_eq!(*dense.get((0, 2)), 3.0);
    }

    #[test]
    fn test_backend_error_message() {
        let err = TrainError::from(BackendError::new(ModelKind::Knn, "k must be positive"));
        assert_eq!(err.to_string(), "k-NN backend failed: k must be positive");
    }

    #[test]
    fn test_deadline_in_the_past() {
        let ctx = TrainContext::new(0, 2).with_deadline(Some(Instant::now()));
        assert!(ctx.check_deadline(ModelKind::Mlp).is_err());
        assert!(TrainContext::new(0, 2).check_deadline(ModelKind::Mlp).is_ok());
    }
}
