//! k-nearest-neighbours classification with Euclidean distance, backed by
//! `smartcore`'s exhaustive neighbour search.

use serde::{Deserialize, Serialize};
use smartcore::{
    algorithm::neighbour::KNNAlgorithmName,
    linalg::basic::matrix::DenseMatrix,
    metrics::distance::euclidian::Euclidian,
    neighbors::{
        KNNWeightFunction,
        knn_classifier::{KNNClassifier, KNNClassifierParameters},
    },
};
use tictac_analysis::features::FeatureMatrix;

use crate::classifier::{
    BackendError, Classifier, Learner, ModelKind, Samples, TrainContext, TrainError, dense_matrix,
};

type Neighbours = KNNClassifier<f64, usize, DenseMatrix<f64>, Vec<usize>, Euclidian<f64>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnnParams {
    pub neighbors: usize,
}

impl Default for KnnParams {
    fn default() -> Self {
        Self { neighbors: 10 }
    }
}

impl KnnParams {
    /// Neighbour count actually used for a training set of `n` rows.
    ///
    /// Capped at `n`; the backend needs at least two.
    #[must_use]
    pub fn effective_k(&self, n: usize) -> usize {
        self.neighbors.min(n).max(2)
    }
}

impl Learner for KnnParams {
    fn kind(&self) -> ModelKind {
        ModelKind::Knn
    }

    fn fit(
        &self,
        train: Samples<'_>,
        _validation: Option<Samples<'_>>,
        ctx: &TrainContext,
    ) -> Result<Box<dyn Classifier>, TrainError> {
        train.check_trainable(ctx.n_classes)?;
        let params = KNNClassifierParameters::default()
            .with_k(self.effective_k(train.len()))
            .with_algorithm(KNNAlgorithmName::LinearSearch)
            .with_weight(KNNWeightFunction::Uniform);
        let x = dense_matrix(ModelKind::Knn, train.features)?;
        let y = train.labels.to_vec();
        let inner =
            Neighbours::fit(&x, &y, params).map_err(|e| BackendError::new(ModelKind::Knn, e))?;
        Ok(Box::new(KnnModel { inner }))
    }
}

/// Memorized training set.
#[derive(Debug)]
pub struct KnnModel {
    inner: Neighbours,
}

impl Classifier for KnnModel {
    /// Majority vote among the `k` closest training rows; a tied vote goes to
    /// the smallest class code.
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<usize>, BackendError> {
        let x = dense_matrix(ModelKind::Knn, features)?;
        self.inner
            .predict(&x)
            .map_err(|e| BackendError::new(ModelKind::Knn, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fit(k: usize, rows: &[[f64; 2]], labels: &[usize], n_classes: usize) -> Box<dyn Classifier> {
        let features = FeatureMatrix::from_rows(2, rows.iter().copied());
        let samples = Samples::new(&features, labels).unwrap();
        KnnParams { neighbors: k }
            .fit(samples, None, &TrainContext::new(0, n_classes))
            .unwrap()
    }

    #[test]
    fn test_majority_vote() {
        let rows = [[0.0, 0.0], [0.1, 0.0], [0.0, 0.1], [0.2, 0.2], [5.0, 5.0]];
        let model = fit(3, &rows, &[1, 1, 0, 0, 0], 2);
        // three closest are labelled 1, 1, 0
        assert_eq!(model.predict_row(&[0.0, 0.0]).unwrap(), 1);
        // three closest to the far corner are labelled 0, 0, 0 or 0, 0, 1
        assert_eq!(model.predict_row(&[4.0, 4.0]).unwrap(), 0);
    }

    #[test]
    fn test_tied_vote_goes_to_smaller_code() {
        let model = fit(2, &[[0.0, 0.0], [2.0, 0.0]], &[2, 1], 3);
        assert_eq!(model.predict_row(&[1.0, 0.0]).unwrap(), 1);
    }

    #[test]
    fn test_k_is_capped_by_training_set() {
        let params = KnnParams { neighbors: 10 };
        assert_eq!(params.effective_k(3), 3);
        assert_eq!(params.effective_k(50), 10);
        assert_eq!(KnnParams { neighbors: 1 }.effective_k(50), 2);

        let model = fit(10, &[[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]], &[0, 1, 1], 2);
        assert_eq!(model.predict_row(&[0.0, 0.0]).unwrap(), 1);
    }

    #[test]
    fn test_predicts_every_row() {
        let rows = [[0.0, 0.0], [0.0, 1.0], [9.0, 9.0], [9.0, 8.0]];
        let model = fit(2, &rows, &[0, 0, 1, 1], 2);
        let queries = FeatureMatrix::from_rows(2, [[0.5, 0.5], [8.5, 8.5], [0.0, 0.2]]);
        assert_eq!(model.predict(&queries).unwrap(), vec![0, 1, 0]);
    }

    #[test]
    fn test_empty_training_set_is_rejected() {
        let features = FeatureMatrix::with_columns(2);
        let samples = Samples::new(&features, &[]).unwrap();
        let err = KnnParams::default()
            .fit(samples, None, &TrainContext::new(0, 2))
            .unwrap_err();
        assert_eq!(err, TrainError::EmptyTrainingSet);
    }
}
