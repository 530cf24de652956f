//! A complete training run and the inference adapter that serves from it.
//!
//! [`TrainingRun::train`] fits the categorical encoders, splits the rows,
//! fits the scaler on the training partition, trains the requested models
//! concurrently, evaluates each one on the test partition and auto-selects
//! a model. The result is immutable: [`TrainingRun::classify`] only ever
//! re-applies the state fitted during that run.
//!
//! Categorical encoders and the label alphabet are fitted on every row of
//! the dataset, so each category universe is complete; the scaler only sees
//! the training partition.
//!
//! At inference an unreadable cell token is handled per feature family. The
//! ordinal encoding reads it as blank. The indicator encoding leaves its
//! whole one-hot block at zero, so it matches no known category.

use std::{
    thread,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use tictac_analysis::{
    dataset::Dataset,
    encoding::{EncodeError, LabelEncoder, OneHotEncoder, OrdinalEncoder},
    features::FeatureMatrix,
    scaling::StandardScaler,
    split::{Partition, SplitError, SplitRatios, three_way_split},
};
use tictac_engine::{Board, Cell, GameState, InvalidBoardError, RawBoard};

use crate::{
    classifier::{
        BackendError, Classifier, FeatureFamily, Learner, ModelKind, Samples, TrainContext,
        TrainError,
    },
    evaluation::{EvaluationReport, MetricsSidecar, UnknownClassCodeError},
    forest::RandomForestParams,
    knn::KnnParams,
    mlp::MlpParams,
    selection::{self, SelectError},
    tree::DecisionTreeParams,
};

/// Every tunable of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub seed: u64,
    pub test_ratio: f64,
    pub validation_ratio: f64,
    pub knn_neighbors: usize,
    pub mlp: MlpParams,
    pub tree: DecisionTreeParams,
    pub forest: RandomForestParams,
    /// Models to train; duplicates are ignored.
    pub models: Vec<ModelKind>,
    pub training_timeout_secs: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let ratios = SplitRatios::default();
        Self {
            seed: 42,
            test_ratio: ratios.test,
            validation_ratio: ratios.validation,
            knn_neighbors: KnnParams::default().neighbors,
            mlp: MlpParams::default(),
            tree: DecisionTreeParams::default(),
            forest: RandomForestParams::default(),
            models: ModelKind::ALL.to_vec(),
            training_timeout_secs: None,
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn split_ratios(&self) -> SplitRatios {
        SplitRatios {
            test: self.test_ratio,
            validation: self.validation_ratio,
        }
    }

    /// Requested models in selection order.
    #[must_use]
    pub fn requested_models(&self) -> Vec<ModelKind> {
        ModelKind::ALL
            .into_iter()
            .filter(|kind| self.models.contains(kind))
            .collect()
    }

    fn learner(&self, kind: ModelKind) -> Box<dyn Learner> {
        match kind {
            ModelKind::Knn => Box::new(KnnParams {
                neighbors: self.knn_neighbors,
            }),
            ModelKind::Mlp => Box::new(self.mlp.clone()),
            ModelKind::DecisionTree => Box::new(self.tree),
            ModelKind::RandomForest => Box::new(self.forest),
        }
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum InferenceError {
    #[display("invalid board: {_0}")]
    #[from]
    InvalidBoard(#[error(source)] InvalidBoardError),
    #[display("{model} needs {family} features but this run has no fitted {family} encoding")]
    InconsistentPipelineState {
        model: ModelKind,
        family: FeatureFamily,
    },
    #[display("{_0}")]
    #[from]
    UnknownCategory(#[error(source)] EncodeError),
    #[display("model produced class code {code} outside the fitted label alphabet")]
    UnknownLabelCode { code: usize },
    #[display("{_0}")]
    #[from]
    Select(#[error(source)] SelectError),
    #[display("{_0}")]
    #[from]
    Backend(#[error(source)] BackendError),
}

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum PipelineError {
    #[display("no models requested")]
    NoModelsRequested,
    #[display("failed to split dataset")]
    #[from]
    Split(#[error(source)] SplitError),
    #[display("failed to encode dataset")]
    #[from]
    Encode(#[error(source)] EncodeError),
    #[display("failed to train {model}")]
    Train {
        model: ModelKind,
        #[error(source)]
        source: TrainError,
    },
    #[display("failed to apply a trained model")]
    #[from]
    Predict(#[error(source)] BackendError),
    #[display("failed to evaluate model")]
    #[from]
    Evaluate(#[error(source)] UnknownClassCodeError),
    #[display("failed to select model")]
    #[from]
    Select(#[error(source)] SelectError),
    #[display("failed to classify board")]
    #[from]
    Inference(#[error(source)] InferenceError),
}

/// One-hot encoder plus the scaler fitted on its training-partition output.
#[derive(Debug, Clone)]
pub struct IndicatorEncoding {
    pub one_hot: OneHotEncoder<Cell>,
    pub scaler: StandardScaler,
}

/// Everything fitted from data besides the models themselves.
///
/// A feature family that no requested model uses is left unfitted.
#[derive(Debug, Clone)]
pub struct FittedEncodingState {
    pub ordinal: Option<OrdinalEncoder<Cell>>,
    pub indicator: Option<IndicatorEncoding>,
    pub labels: LabelEncoder<GameState>,
}

impl FittedEncodingState {
    /// Encodes `board` in the feature family `model` was trained on.
    ///
    /// An unreadable cell is blank in the ordinal family and an all-zero
    /// indicator block in the indicator family.
    pub fn encode(
        &self,
        model: ModelKind,
        family: FeatureFamily,
        board: &RawBoard,
    ) -> Result<Vec<f64>, InferenceError> {
        let missing = || InferenceError::InconsistentPipelineState { model, family };
        match family {
            FeatureFamily::Ordinal => {
                let encoder = self.ordinal.as_ref().ok_or_else(missing)?;
                Ok(encoder.transform_row(board.coerce().cells())?)
            }
            FeatureFamily::ScaledIndicator => {
                let indicator = self.indicator.as_ref().ok_or_else(missing)?;
                let mut row = indicator.one_hot.transform_partial_row(board.cells());
                indicator.scaler.apply_row(&mut row);
                Ok(row)
            }
        }
    }

    pub fn decode(&self, code: usize) -> Result<GameState, InferenceError> {
        self.labels
            .decode(code)
            .copied()
            .ok_or(InferenceError::UnknownLabelCode { code })
    }
}

/// A fitted model tagged with the feature family it consumes.
#[derive(Debug)]
pub struct TrainedClassifier {
    pub kind: ModelKind,
    pub family: FeatureFamily,
    pub model: Box<dyn Classifier>,
    pub training_time: Duration,
}

/// Applies `classifier` to `board` through the state fitted with it.
pub fn predict(
    classifier: &TrainedClassifier,
    encoding: &FittedEncodingState,
    board: &RawBoard,
) -> Result<GameState, InferenceError> {
    let row = encoding.encode(classifier.kind, classifier.family, board)?;
    encoding.decode(classifier.model.predict_row(&row)?)
}

/// Outcome of classifying one board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    #[serde(rename = "model_name")]
    pub model: ModelKind,
    #[serde(serialize_with = "serialize_label")]
    pub prediction: GameState,
}

fn serialize_label<S>(state: &GameState, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(state.label())
}

/// Feature rows of the three partitions for one family.
#[derive(Debug)]
struct PartitionedFeatures {
    train: FeatureMatrix,
    validation: FeatureMatrix,
    test: FeatureMatrix,
}

#[derive(Debug)]
struct PartitionedLabels {
    train: Vec<usize>,
    validation: Vec<usize>,
    test: Vec<usize>,
}

impl PartitionedLabels {
    fn gather(codes: &[usize], partition: &Partition) -> Self {
        let pick = |indices: &[usize]| indices.iter().map(|&i| codes[i]).collect();
        Self {
            train: pick(&partition.train),
            validation: pick(&partition.validation),
            test: pick(&partition.test),
        }
    }
}

/// Fitted state, models and scores of one training run.
#[derive(Debug)]
pub struct TrainingRun {
    encoding: FittedEncodingState,
    classifiers: Vec<TrainedClassifier>,
    reports: Vec<EvaluationReport>,
    selected: ModelKind,
    partition: Partition,
}

impl TrainingRun {
    pub fn train(dataset: &Dataset, config: &PipelineConfig) -> Result<Self, PipelineError> {
        let models = config.requested_models();
        if models.is_empty() {
            return Err(PipelineError::NoModelsRequested);
        }
        let started = Instant::now();
        let deadline = config
            .training_timeout_secs
            .map(|secs| started + Duration::from_secs(secs));

        let boards = dataset.boards().map(Board::cells).collect::<Vec<_>>();
        let labels = LabelEncoder::fit(dataset.labels());
        let codes = dataset
            .labels()
            .map(|label| labels.encode(&label))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(classes = ?labels.classes(), "fitted label alphabet");

        let partition = three_way_split(dataset.len(), config.seed, config.split_ratios())?;
        tracing::info!(
            rows = dataset.len(),
            train = partition.train.len(),
            validation = partition.validation.len(),
            test = partition.test.len(),
            "split dataset"
        );

        let needs = |family| models.iter().any(|m| m.family() == family);
        let mut ordinal = None;
        let mut ordinal_features = None;
        if needs(FeatureFamily::Ordinal) {
            let encoder = OrdinalEncoder::<Cell>::fit(Board::CELL_COUNT, &boards);
            let all = encoder.transform(&boards)?;
            ordinal_features = Some(PartitionedFeatures {
                train: all.select(&partition.train),
                validation: all.select(&partition.validation),
                test: all.select(&partition.test),
            });
            ordinal = Some(encoder);
        }
        let mut indicator = None;
        let mut indicator_features = None;
        if needs(FeatureFamily::ScaledIndicator) {
            let one_hot = OneHotEncoder::<Cell>::fit(Board::CELL_COUNT, &boards);
            let all = one_hot.transform(&boards);
            let train = all.select(&partition.train);
            let scaler = StandardScaler::fit(&train);
            indicator_features = Some(PartitionedFeatures {
                train: scaler.apply(&train),
                validation: scaler.apply(&all.select(&partition.validation)),
                test: scaler.apply(&all.select(&partition.test)),
            });
            tracing::debug!(features = one_hot.n_features(), "fitted indicator encoding");
            indicator = Some(IndicatorEncoding { one_hot, scaler });
        }
        let encoding = FittedEncodingState {
            ordinal,
            indicator,
            labels,
        };
        let label_parts = PartitionedLabels::gather(&codes, &partition);
        let features_for = |kind: ModelKind| {
            let family = kind.family();
            let features = match family {
                FeatureFamily::Ordinal => ordinal_features.as_ref(),
                FeatureFamily::ScaledIndicator => indicator_features.as_ref(),
            };
            features.ok_or(InferenceError::InconsistentPipelineState {
                model: kind,
                family,
            })
        };

        let ctx = TrainContext::new(config.seed, encoding.labels.len()).with_deadline(deadline);
        let results = thread::scope(|s| {
            let handles = models
                .iter()
                .map(|&kind| {
                    let learner = config.learner(kind);
                    let features = features_for(kind);
                    let (labels, ctx) = (&label_parts, &ctx);
                    s.spawn(move || train_one(learner.as_ref(), features?, labels, ctx))
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect::<Vec<_>>()
        });
        let classifiers = results.into_iter().collect::<Result<Vec<_>, _>>()?;

        let mut reports = Vec::with_capacity(classifiers.len());
        for classifier in &classifiers {
            let features = features_for(classifier.kind)?;
            let predicted = classifier.model.predict(&features.test)?;
            let report =
                EvaluationReport::new(classifier.kind, &encoding.labels, &label_parts.test, &predicted)?;
            tracing::info!(
                model = %classifier.kind,
                accuracy = report.accuracy,
                macro_f1 = report.macro_f1,
                "evaluated model"
            );
            reports.push(report);
        }
        let selected = selection::select(&reports, None)?;
        tracing::info!(elapsed = ?started.elapsed(), "training run finished");

        Ok(Self {
            encoding,
            classifiers,
            reports,
            selected,
            partition,
        })
    }

    #[must_use]
    pub fn encoding(&self) -> &FittedEncodingState {
        &self.encoding
    }

    #[must_use]
    pub fn classifiers(&self) -> &[TrainedClassifier] {
        &self.classifiers
    }

    #[must_use]
    pub fn classifier(&self, kind: ModelKind) -> Option<&TrainedClassifier> {
        self.classifiers.iter().find(|c| c.kind == kind)
    }

    /// Reports in selection order.
    #[must_use]
    pub fn reports(&self) -> &[EvaluationReport] {
        &self.reports
    }

    #[must_use]
    pub fn metrics(&self) -> MetricsSidecar<'_> {
        MetricsSidecar::new(&self.reports)
    }

    /// The auto-selected model.
    #[must_use]
    pub fn selected(&self) -> ModelKind {
        self.selected
    }

    #[must_use]
    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Classifies a raw board of nine cell tokens.
    ///
    /// Only a board of the wrong length is rejected. A token outside `x`,
    /// `o`, `b` is read as blank by the ordinal models and matches no
    /// indicator column for the others.
    pub fn classify<S>(
        &self,
        tokens: &[S],
        model: Option<ModelKind>,
    ) -> Result<Classification, InferenceError>
    where
        S: AsRef<str>,
    {
        let board = RawBoard::from_tokens(tokens)?;
        self.classify_raw(&board, model)
    }

    pub fn classify_board(
        &self,
        board: &Board,
        model: Option<ModelKind>,
    ) -> Result<Classification, InferenceError> {
        self.classify_raw(&RawBoard::from(*board), model)
    }

    pub fn classify_raw(
        &self,
        board: &RawBoard,
        model: Option<ModelKind>,
    ) -> Result<Classification, InferenceError> {
        let kind = match model {
            Some(_) => selection::select(&self.reports, model)?,
            None => self.selected,
        };
        let classifier = self
            .classifier(kind)
            .ok_or(SelectError::ModelNotTrained { model: kind })?;
        let prediction = predict(classifier, &self.encoding, board)?;
        Ok(Classification {
            model: kind,
            prediction,
        })
    }
}

/// Trains a fresh run and classifies one board with it.
///
/// Every call refits everything; prefer [`TrainingRun::classify`] on a
/// retained run.
pub fn classify_with_retraining<S>(
    dataset: &Dataset,
    config: &PipelineConfig,
    tokens: &[S],
    model: Option<ModelKind>,
) -> Result<Classification, PipelineError>
where
    S: AsRef<str>,
{
    let run = TrainingRun::train(dataset, config)?;
    Ok(run.classify(tokens, model)?)
}

fn train_one(
    learner: &dyn Learner,
    features: &PartitionedFeatures,
    labels: &PartitionedLabels,
    ctx: &TrainContext,
) -> Result<TrainedClassifier, PipelineError> {
    let kind = learner.kind();
    let train_error = |source| PipelineError::Train {
        model: kind,
        source,
    };
    let started = Instant::now();
    let train = Samples::new(&features.train, &labels.train).map_err(train_error)?;
    let validation = Samples::new(&features.validation, &labels.validation).map_err(train_error)?;
    let model = learner.fit(train, Some(validation), ctx).map_err(train_error)?;
    let training_time = started.elapsed();
    tracing::info!(model = %kind, ?training_time, "trained model");
    Ok(TrainedClassifier {
        kind,
        family: kind.family(),
        model,
        training_time,
    })
}
