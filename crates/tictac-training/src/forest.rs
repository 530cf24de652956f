//! Random forest of bagged CART trees, backed by `smartcore`.
//!
//! Each tree is fitted as a one-tree `smartcore` forest, which draws a
//! class-stratified bootstrap sample and subsamples features at every split.
//! Every tree gets its own seed, drawn from a sequence seeded by the run
//! seed, so the fitted forest does not depend on how trees are spread across
//! worker threads. Prediction is a majority vote over the trees; a tied vote
//! goes to the smallest class code.

use std::{num::NonZeroUsize, thread};

use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use smartcore::{
    ensemble::random_forest_classifier::{
        RandomForestClassifier, RandomForestClassifierParameters,
    },
    linalg::basic::matrix::DenseMatrix,
    tree::decision_tree_classifier::SplitCriterion,
};
use tictac_analysis::features::FeatureMatrix;

use crate::classifier::{
    BackendError, Classifier, Learner, ModelKind, Samples, TrainContext, TrainError, argmax,
    dense_matrix,
};

type BaggedTree = RandomForestClassifier<f64, usize, DenseMatrix<f64>, Vec<usize>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomForestParams {
    pub n_trees: u16,
    /// Features considered at each split; `None` uses the square root of the
    /// feature count.
    pub max_features: Option<usize>,
    pub max_depth: Option<u16>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Worker threads; `None` uses the available parallelism.
    pub threads: Option<NonZeroUsize>,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_trees: 1000,
            max_features: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            threads: None,
        }
    }
}

impl RandomForestParams {
    fn worker_count(&self) -> usize {
        self.threads
            .or_else(|| thread::available_parallelism().ok())
            .map_or(1, NonZeroUsize::get)
            .min(usize::from(self.n_trees.max(1)))
    }

    fn tree_params(&self, seed: u64) -> RandomForestClassifierParameters {
        RandomForestClassifierParameters {
            criterion: SplitCriterion::Gini,
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf.max(1),
            min_samples_split: self.min_samples_split.max(2),
            n_trees: 1,
            m: self.max_features.map(|m| m.max(1)),
            keep_samples: false,
            seed,
        }
    }

    fn grow_trees(
        &self,
        seeds: &[u64],
        x: &DenseMatrix<f64>,
        y: &Vec<usize>,
        ctx: &TrainContext,
    ) -> Result<Vec<BaggedTree>, TrainError> {
        seeds
            .iter()
            .map(|&seed| -> Result<BaggedTree, TrainError> {
                ctx.check_deadline(ModelKind::RandomForest)?;
                let tree = BaggedTree::fit(x, y, self.tree_params(seed))
                    .map_err(|e| BackendError::new(ModelKind::RandomForest, e))?;
                Ok(tree)
            })
            .collect()
    }
}

impl Learner for RandomForestParams {
    fn kind(&self) -> ModelKind {
        ModelKind::RandomForest
    }

    fn fit(
        &self,
        train: Samples<'_>,
        _validation: Option<Samples<'_>>,
        ctx: &TrainContext,
    ) -> Result<Box<dyn Classifier>, TrainError> {
        train.check_trainable(ctx.n_classes)?;
        let x = dense_matrix(ModelKind::RandomForest, train.features)?;
        let y = train.labels.to_vec();
        let mut seeder = Pcg64::seed_from_u64(ctx.seed);
        let seeds = (0..self.n_trees.max(1))
            .map(|_| seeder.random::<u64>())
            .collect::<Vec<_>>();

        let chunk_len = seeds.len().div_ceil(self.worker_count());
        let chunks = thread::scope(|s| {
            let handles = seeds
                .chunks(chunk_len)
                .map(|chunk| {
                    let (x, y) = (&x, &y);
                    s.spawn(move || self.grow_trees(chunk, x, y, ctx))
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect::<Vec<_>>()
        });

        let mut trees = Vec::with_capacity(seeds.len());
        for chunk in chunks {
            trees.extend(chunk?);
        }
        tracing::debug!(trees = trees.len(), workers = self.worker_count(), "grew random forest");
        Ok(Box::new(RandomForest {
            n_classes: ctx.n_classes,
            trees,
        }))
    }
}

#[derive(Debug)]
pub struct RandomForest {
    n_classes: usize,
    trees: Vec<BaggedTree>,
}

impl RandomForest {
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Per-row vote counts, indexed by class code.
    pub fn votes(&self, features: &FeatureMatrix) -> Result<Vec<Vec<usize>>, BackendError> {
        let x = dense_matrix(ModelKind::RandomForest, features)?;
        let mut votes = vec![vec![0; self.n_classes]; features.n_rows()];
        for tree in &self.trees {
            let predicted = tree
                .predict(&x)
                .map_err(|e| BackendError::new(ModelKind::RandomForest, e))?;
            for (row, code) in votes.iter_mut().zip(predicted) {
                if let Some(count) = row.get_mut(code) {
                    *count += 1;
                }
            }
        }
        Ok(votes)
    }
}

impl Classifier for RandomForest {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<usize>, BackendError> {
        Ok(self.votes(features)?.iter().map(|row| argmax(row)).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    fn diagonal() -> (FeatureMatrix, Vec<usize>) {
        let mut rows = vec![];
        let mut labels = vec![];
        for a in 0..3 {
            for b in 0..3 {
                for _ in 0..4 {
                    rows.push([f64::from(a), f64::from(b), 1.0]);
                    labels.push(usize::from(a == b));
                }
            }
        }
        (FeatureMatrix::from_rows(3, rows), labels)
    }

    fn params(n_trees: u16, threads: usize) -> RandomForestParams {
        RandomForestParams {
            n_trees,
            max_features: Some(2),
            threads: NonZeroUsize::new(threads),
            ..RandomForestParams::default()
        }
    }

    #[test]
    fn test_forest_learns_diagonal() {
        let (features, labels) = diagonal();
        let samples = Samples::new(&features, &labels).unwrap();
        let model = params(50, 2)
            .fit(samples, None, &TrainContext::new(3, 2))
            .unwrap();
        let predicted = model.predict(&features).unwrap();
        let correct = predicted.iter().zip(&labels).filter(|(p, t)| p == t).count();
        assert!(correct * 10 >= labels.len() * 9, "{correct}/{}", labels.len());
    }

    #[test]
    fn test_result_does_not_depend_on_thread_count() {
        let (features, labels) = diagonal();
        let samples = Samples::new(&features, &labels).unwrap();
        let ctx = TrainContext::new(11, 2);
        let queries = FeatureMatrix::from_rows(3, [[0.0, 0.0, 1.0], [0.0, 2.0, 1.0], [1.5, 1.0, 1.0]]);
        let fit = |threads| {
            let forest = params(20, threads).fit(samples, None, &ctx).unwrap();
            forest.predict(&queries).unwrap()
        };
        assert_eq!(fit(1), fit(4));
    }

    #[test]
    fn test_every_tree_votes_once() {
        let (features, labels) = diagonal();
        let x = dense_matrix(ModelKind::RandomForest, &features).unwrap();
        let p = params(3, 1);
        let trees = p
            .grow_trees(&[1, 2, 3], &x, &labels, &TrainContext::new(0, 2))
            .unwrap();
        let forest = RandomForest { n_classes: 2, trees };
        assert_eq!(forest.n_trees(), 3);
        for row in forest.votes(&features).unwrap() {
            assert_eq!(row.iter().sum::<usize>(), 3);
        }
    }

    #[test]
    fn test_tied_vote_goes_to_smaller_code() {
        let forest = RandomForest {
            n_classes: 3,
            trees: vec![],
        };
        let features = FeatureMatrix::from_rows(1, [[0.0]]);
        assert_eq!(forest.votes(&features).unwrap(), vec![vec![0, 0, 0]]);
        assert_eq!(forest.predict(&features).unwrap(), vec![0]);
    }

    #[test]
    fn test_deadline_aborts_training() {
        let (features, labels) = diagonal();
        let samples = Samples::new(&features, &labels).unwrap();
        let ctx = TrainContext::new(0, 2).with_deadline(Some(Instant::now()));
        let err = params(10, 2).fit(samples, None, &ctx).unwrap_err();
        assert_eq!(
            err,
            TrainError::DeadlineExceeded {
                model: ModelKind::RandomForest
            }
        );
    }
}
