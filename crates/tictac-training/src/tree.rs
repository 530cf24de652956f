//! CART decision trees with Gini impurity, backed by `smartcore`.
//!
//! The tree is grown on the ordinal encoding until leaves are pure or a
//! configured depth / size limit is hit. The run seed fixes the order in
//! which candidate features are scanned, so ties between equally good splits
//! resolve the same way on every run.

use serde::{Deserialize, Serialize};
use smartcore::{
    linalg::basic::matrix::DenseMatrix,
    tree::decision_tree_classifier::{
        DecisionTreeClassifier, DecisionTreeClassifierParameters, SplitCriterion,
    },
};
use tictac_analysis::features::FeatureMatrix;

use crate::classifier::{
    BackendError, Classifier, Learner, ModelKind, Samples, TrainContext, TrainError, dense_matrix,
};

type Cart = DecisionTreeClassifier<f64, usize, DenseMatrix<f64>, Vec<usize>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionTreeParams {
    /// `None` grows until leaves are pure.
    pub max_depth: Option<u16>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for DecisionTreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

impl DecisionTreeParams {
    fn backend_params(&self, seed: u64) -> DecisionTreeClassifierParameters {
        DecisionTreeClassifierParameters {
            criterion: SplitCriterion::Gini,
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf.max(1),
            min_samples_split: self.min_samples_split.max(2),
            seed: Some(seed),
        }
    }
}

impl Learner for DecisionTreeParams {
    fn kind(&self) -> ModelKind {
        ModelKind::DecisionTree
    }

    fn fit(
        &self,
        train: Samples<'_>,
        _validation: Option<Samples<'_>>,
        ctx: &TrainContext,
    ) -> Result<Box<dyn Classifier>, TrainError> {
        train.check_trainable(ctx.n_classes)?;
        ctx.check_deadline(ModelKind::DecisionTree)?;
        let x = dense_matrix(ModelKind::DecisionTree, train.features)?;
        let y = train.labels.to_vec();
        let cart = Cart::fit(&x, &y, self.backend_params(ctx.seed))
            .map_err(|e| BackendError::new(ModelKind::DecisionTree, e))?;
        tracing::debug!(depth = cart.depth(), "grew decision tree");
        Ok(Box::new(DecisionTree { cart }))
    }
}

/// A fitted tree.
#[derive(Debug)]
pub struct DecisionTree {
    cart: Cart,
}

impl DecisionTree {
    #[must_use]
    pub fn depth(&self) -> u16 {
        self.cart.depth()
    }
}

impl Classifier for DecisionTree {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<usize>, BackendError> {
        let x = dense_matrix(ModelKind::DecisionTree, features)?;
        self.cart
            .predict(&x)
            .map_err(|e| BackendError::new(ModelKind::DecisionTree, e))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    fn fit(rows: &[&[f64]], labels: &[usize], params: DecisionTreeParams) -> DecisionTree {
        let features = FeatureMatrix::from_rows(rows[0].len(), rows.iter().copied());
        let samples = Samples::new(&features, labels).unwrap();
        let x = dense_matrix(ModelKind::DecisionTree, samples.features).unwrap();
        let cart = Cart::fit(&x, &labels.to_vec(), params.backend_params(0)).unwrap();
        DecisionTree { cart }
    }

    #[test]
    fn test_fits_training_data_exactly() {
        // class = column 0, column 1 is noise
        let rows: &[&[f64]] = &[&[0.0, 1.0], &[1.0, 0.0], &[2.0, 1.0], &[0.0, 0.0], &[2.0, 2.0]];
        let labels = [0, 1, 2, 0, 2];
        let tree = fit(rows, &labels, DecisionTreeParams::default());
        for (row, &label) in rows.iter().zip(&labels) {
            assert_eq!(tree.predict_row(row).unwrap(), label);
        }
        assert!(tree.depth() > 0);
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let rows: &[&[f64]] = &[&[0.0], &[1.0], &[2.0], &[3.0]];
        let params = DecisionTreeParams {
            max_depth: Some(1),
            ..DecisionTreeParams::default()
        };
        let tree = fit(rows, &[0, 1, 2, 3], params);
        let features = FeatureMatrix::from_rows(1, rows.iter().copied());
        let predicted = tree.predict(&features).unwrap();
        let distinct = predicted.iter().collect::<std::collections::BTreeSet<_>>();
        assert!(distinct.len() <= 2, "{predicted:?}");
    }

    #[test]
    fn test_predictions_are_class_codes() {
        let rows: &[&[f64]] = &[&[0.0], &[5.0], &[10.0]];
        let tree = fit(rows, &[3, 1, 3], DecisionTreeParams::default());
        assert_eq!(tree.predict_row(&[0.5]).unwrap(), 3);
        assert_eq!(tree.predict_row(&[5.0]).unwrap(), 1);
    }

    #[test]
    fn test_single_class_is_a_backend_error() {
        let features = FeatureMatrix::from_rows(1, [[0.0], [1.0]]);
        let samples = Samples::new(&features, &[1, 1]).unwrap();
        let err = DecisionTreeParams::default()
            .fit(samples, None, &TrainContext::new(0, 2))
            .unwrap_err();
        assert!(
            matches!(
                err,
                TrainError::Backend(BackendError {
                    model: ModelKind::DecisionTree,
                    ..
                })
            ),
            "{err}"
        );
    }

    #[test]
    fn test_deadline_aborts_training() {
        let features = FeatureMatrix::from_rows(1, [[0.0], [1.0]]);
        let samples = Samples::new(&features, &[0, 1]).unwrap();
        let ctx = TrainContext::new(0, 2).with_deadline(Some(Instant::now()));
        assert_eq!(
            DecisionTreeParams::default().fit(samples, None, &ctx).unwrap_err(),
            TrainError::DeadlineExceeded {
                model: ModelKind::DecisionTree
            }
        );
    }
}
