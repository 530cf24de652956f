//! Multi-layer perceptron with ReLU hidden layers, trained with `burn`.
//!
//! The network is a stack of `burn` linear layers on the `NdArray` CPU
//! backend. Training minimizes softmax cross-entropy with mini-batch Adam
//! and L2 weight decay. Weights start from a He-normal draw of a generator
//! seeded from the run seed, and mini-batches are reshuffled every epoch with
//! the same generator, so a run never touches the backend's global RNG.
//!
//! # Early stopping
//!
//! With a validation partition, the score after each epoch is validation
//! accuracy; otherwise it is the negated mean training loss. An epoch that
//! does not beat the best score by more than `tolerance` counts toward
//! `patience`, and training stops once more than `patience` such epochs have
//! passed in a row. With a validation partition, the network of the best
//! epoch is kept.

use std::sync::Mutex;

use burn::{
    backend::{Autodiff, NdArray},
    module::{AutodiffModule as _, Module, Param},
    nn::{Linear, Relu, loss::CrossEntropyLossConfig},
    optim::{AdamConfig, GradientsParams, Optimizer as _, decay::WeightDecayConfig},
    tensor::{Int, Tensor, TensorData, backend::Backend},
};
use rand::{Rng as _, SeedableRng as _, seq::SliceRandom as _};
use rand_distr::StandardNormal;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use tictac_analysis::features::FeatureMatrix;

use crate::classifier::{
    BackendError, Classifier, Learner, ModelKind, Samples, TrainContext, TrainError, argmax,
};

type Inference = NdArray<f64>;
type Training = Autodiff<Inference>;

const ADAM_EPSILON: f32 = 1e-8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlpParams {
    pub hidden_layers: Vec<usize>,
    pub max_epochs: usize,
    pub learning_rate: f64,
    pub batch_size: usize,
    pub l2_penalty: f32,
    pub patience: usize,
    pub tolerance: f64,
}

impl Default for MlpParams {
    fn default() -> Self {
        Self {
            hidden_layers: vec![10, 50],
            max_epochs: 1000,
            learning_rate: 1e-3,
            batch_size: 200,
            l2_penalty: 1e-4,
            patience: 50,
            tolerance: 1e-4,
        }
    }
}

impl Learner for MlpParams {
    fn kind(&self) -> ModelKind {
        ModelKind::Mlp
    }

    fn fit(
        &self,
        train: Samples<'_>,
        validation: Option<Samples<'_>>,
        ctx: &TrainContext,
    ) -> Result<Box<dyn Classifier>, TrainError> {
        Ok(Box::new(self.train_network(train, validation, ctx)?))
    }
}

impl MlpParams {
    #[expect(clippy::cast_precision_loss)]
    fn train_network(
        &self,
        train: Samples<'_>,
        validation: Option<Samples<'_>>,
        ctx: &TrainContext,
    ) -> Result<MlpModel, TrainError> {
        train.check_trainable(ctx.n_classes)?;
        let validation = validation.filter(|v| !v.is_empty());
        let mut rng = Pcg64::seed_from_u64(ctx.seed);
        let mut network = Network::<Training>::he_normal(
            train.features.n_cols(),
            &self.hidden_layers,
            ctx.n_classes,
            &mut rng,
        );
        let mut optimizer = AdamConfig::new()
            .with_epsilon(ADAM_EPSILON)
            .with_weight_decay(Some(WeightDecayConfig::new(self.l2_penalty)))
            .init::<Training, Network<Training>>();
        let loss_fn = CrossEntropyLossConfig::new().init::<Training>(&device::<Training>());
        let batch_size = self.batch_size.clamp(1, train.len());

        let mut order = (0..train.len()).collect::<Vec<_>>();
        let mut best_score = f64::NEG_INFINITY;
        let mut best_network = None;
        let mut stale_epochs = 0;
        let mut epochs_run = 0;
        for epoch in 0..self.max_epochs {
            ctx.check_deadline(ModelKind::Mlp)?;
            order.shuffle(&mut rng);

            let mut loss_sum = 0.0;
            for batch in order.chunks(batch_size) {
                let (inputs, targets) = batch_tensors::<Training>(train, batch);
                let loss = loss_fn.forward(network.forward(inputs), targets);
                let grads = GradientsParams::from_grads(loss.backward(), &network);
                network = optimizer.step(self.learning_rate, network, grads);
                loss_sum += loss.into_scalar() * batch.len() as f64;
            }
            let loss = loss_sum / train.len() as f64;
            epochs_run = epoch + 1;

            let score = match validation {
                Some(v) => accuracy(&network.valid(), v),
                None => -loss,
            };
            tracing::trace!(epoch, loss, score, "mlp epoch");
            if score > best_score + self.tolerance {
                stale_epochs = 0;
            } else {
                stale_epochs += 1;
            }
            if score > best_score {
                best_score = score;
                if validation.is_some() {
                    best_network = Some(network.valid());
                }
            }
            if stale_epochs > self.patience {
                break;
            }
        }

        let network = best_network.unwrap_or_else(|| network.valid());
        tracing::debug!(epochs = epochs_run, best_score, "trained mlp");
        Ok(MlpModel {
            network: Mutex::new(network),
            epochs_run,
        })
    }
}

#[derive(Module, Debug)]
struct Network<B: Backend> {
    hidden: Vec<Linear<B>>,
    output: Linear<B>,
    activation: Relu,
}

impl<B: Backend> Network<B> {
    fn he_normal(n_inputs: usize, hidden: &[usize], n_classes: usize, rng: &mut Pcg64) -> Self {
        let widths = std::iter::once(n_inputs)
            .chain(hidden.iter().copied().filter(|&w| w > 0))
            .collect::<Vec<_>>();
        let hidden = widths
            .windows(2)
            .map(|w| he_normal_linear(w[0], w[1], rng))
            .collect();
        let last = widths.last().copied().unwrap_or(n_inputs);
        Self {
            hidden,
            output: he_normal_linear(last, n_classes, rng),
            activation: Relu::new(),
        }
    }

    /// Class scores before the softmax.
    fn forward(&self, inputs: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = inputs;
        for layer in &self.hidden {
            x = self.activation.forward(layer.forward(x));
        }
        self.output.forward(x)
    }

    fn predict(&self, features: &FeatureMatrix) -> Vec<usize> {
        if features.is_empty() {
            return vec![];
        }
        let inputs = Tensor::<B, 2>::from_data(
            TensorData::new(features.as_slice().to_vec(), [features.n_rows(), features.n_cols()]),
            &device::<B>(),
        );
        let logits = self.forward(inputs);
        let n_classes = logits.dims()[1].max(1);
        let scores = logits.into_data().iter::<f64>().collect::<Vec<_>>();
        scores.chunks(n_classes).map(argmax).collect()
    }
}

fn device<B: Backend>() -> B::Device {
    B::Device::default()
}

/// A `[n_in, n_out]` layer with He-normal weights and zero bias.
#[expect(clippy::cast_precision_loss)]
fn he_normal_linear<B: Backend>(n_in: usize, n_out: usize, rng: &mut Pcg64) -> Linear<B> {
    let std_dev = (2.0 / n_in.max(1) as f64).sqrt();
    let weights = (0..n_in * n_out)
        .map(|_| rng.sample::<f64, _>(StandardNormal) * std_dev)
        .collect::<Vec<_>>();
    let device = device::<B>();
    Linear {
        weight: Param::from_tensor(Tensor::from_data(
            TensorData::new(weights, [n_in, n_out]),
            &device,
        )),
        bias: Some(Param::from_tensor(Tensor::zeros([n_out], &device))),
    }
}

#[expect(clippy::cast_possible_wrap)]
fn batch_tensors<B: Backend>(samples: Samples<'_>, batch: &[usize]) -> (Tensor<B, 2>, Tensor<B, 1, Int>) {
    let n_cols = samples.features.n_cols();
    let mut values = Vec::with_capacity(batch.len() * n_cols);
    for &i in batch {
        values.extend_from_slice(samples.features.row(i));
    }
    let codes = batch
        .iter()
        .map(|&i| samples.labels[i] as i64)
        .collect::<Vec<_>>();
    let device = device::<B>();
    (
        Tensor::from_data(TensorData::new(values, [batch.len(), n_cols]), &device),
        Tensor::from_data(TensorData::new(codes, [batch.len()]), &device),
    )
}

#[expect(clippy::cast_precision_loss)]
fn accuracy(network: &Network<Inference>, samples: Samples<'_>) -> f64 {
    let predicted = network.predict(samples.features);
    let correct = predicted
        .iter()
        .zip(samples.labels)
        .filter(|(p, t)| p == t)
        .count();
    correct as f64 / samples.len() as f64
}

#[derive(Debug)]
pub struct MlpModel {
    network: Mutex<Network<Inference>>,
    epochs_run: usize,
}

impl MlpModel {
    /// Number of epochs run before training stopped.
    #[must_use]
    pub fn epochs_run(&self) -> usize {
        self.epochs_run
    }
}

impl Classifier for MlpModel {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<usize>, BackendError> {
        let network = self
            .network
            .lock()
            .map_err(|e| BackendError::new(ModelKind::Mlp, e))?;
        Ok(network.predict(features))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    fn clusters() -> (FeatureMatrix, Vec<usize>) {
        let mut rng = Pcg64::seed_from_u64(5);
        let centres = [[-2.0, -2.0], [2.0, 2.0], [-2.0, 2.0]];
        let mut rows = vec![];
        let mut labels = vec![];
        for _ in 0..40 {
            for (class, c) in centres.iter().enumerate() {
                let dx = rng.random_range(-0.5..0.5);
                let dy = rng.random_range(-0.5..0.5);
                rows.push([c[0] + dx, c[1] + dy]);
                labels.push(class);
            }
        }
        (FeatureMatrix::from_rows(2, rows), labels)
    }

    fn params() -> MlpParams {
        MlpParams {
            hidden_layers: vec![8],
            max_epochs: 300,
            learning_rate: 0.01,
            batch_size: 16,
            ..MlpParams::default()
        }
    }

    fn output_weights(model: &MlpModel) -> TensorData {
        model.network.lock().unwrap().output.weight.val().into_data()
    }

    fn model_accuracy(model: &MlpModel, samples: Samples<'_>) -> f64 {
        accuracy(&model.network.lock().unwrap(), samples)
    }

    #[test]
    fn test_learns_separable_clusters() {
        let (features, labels) = clusters();
        let samples = Samples::new(&features, &labels).unwrap();
        let model = params()
            .train_network(samples, None, &TrainContext::new(1, 3))
            .unwrap();
        assert!(model_accuracy(&model, samples) > 0.95);
    }

    #[test]
    fn test_same_seed_same_weights() {
        let (features, labels) = clusters();
        let samples = Samples::new(&features, &labels).unwrap();
        let p = MlpParams {
            max_epochs: 20,
            ..params()
        };
        let a = p.train_network(samples, None, &TrainContext::new(9, 3)).unwrap();
        let b = p.train_network(samples, None, &TrainContext::new(9, 3)).unwrap();
        assert_eq!(output_weights(&a), output_weights(&b));
        let c = p.train_network(samples, None, &TrainContext::new(10, 3)).unwrap();
        assert_ne!(output_weights(&a), output_weights(&c));
    }

    #[test]
    fn test_early_stopping_on_validation() {
        let (features, labels) = clusters();
        let samples = Samples::new(&features, &labels).unwrap();
        let p = MlpParams {
            max_epochs: 1000,
            patience: 3,
            ..params()
        };
        let model = p
            .train_network(samples, Some(samples), &TrainContext::new(1, 3))
            .unwrap();
        assert!(model.epochs_run() < 1000);
        assert!(model_accuracy(&model, samples) > 0.95);
    }

    #[test]
    fn test_layer_shapes_follow_hidden_widths() {
        let mut rng = Pcg64::seed_from_u64(0);
        let network = Network::<Inference>::he_normal(4, &[10, 0, 50], 5, &mut rng);
        let shapes = network
            .hidden
            .iter()
            .map(|l| l.weight.val().dims())
            .collect::<Vec<_>>();
        assert_eq!(shapes, vec![[4, 10], [10, 50]]);
        assert_eq!(network.output.weight.val().dims(), [50, 5]);

        let rows = FeatureMatrix::from_rows(4, [[1.0, 0.0, -1.0, 2.0], [0.0, 0.0, 0.0, 0.0]]);
        let predicted = network.predict(&rows);
        assert_eq!(predicted.len(), 2);
        assert!(predicted.iter().all(|&c| c < 5));
    }

    #[test]
    fn test_predict_row_matches_batch_prediction() {
        let (features, labels) = clusters();
        let samples = Samples::new(&features, &labels).unwrap();
        let p = MlpParams {
            max_epochs: 5,
            ..params()
        };
        let model = p.fit(samples, None, &TrainContext::new(2, 3)).unwrap();
        let batch = model.predict(&features).unwrap();
        for (i, &code) in batch.iter().enumerate().take(10) {
            assert_eq!(model.predict_row(features.row(i)).unwrap(), code);
        }
    }

    #[test]
    fn test_deadline_aborts_training() {
        let (features, labels) = clusters();
        let samples = Samples::new(&features, &labels).unwrap();
        let ctx = TrainContext::new(0, 3).with_deadline(Some(Instant::now()));
        assert_eq!(
            params().fit(samples, None, &ctx).unwrap_err(),
            TrainError::DeadlineExceeded {
                model: ModelKind::Mlp
            }
        );
    }
}
