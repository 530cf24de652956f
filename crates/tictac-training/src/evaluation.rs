//! Scoring trained classifiers on the test partition.

use serde::{Serialize, ser::SerializeMap as _};
use tictac_analysis::encoding::LabelEncoder;
use tictac_engine::GameState;
use tictac_stats::classification::ClassificationReport;

use crate::classifier::ModelKind;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("class code {code} has no label")]
pub struct UnknownClassCodeError {
    pub code: usize,
}

/// Metrics for one game state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassScore {
    pub class: GameState,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Something worth knowing about a report that does not make it invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, derive_more::Display)]
pub enum EvaluationNote {
    /// The class has no ground-truth rows in the test partition; its recall
    /// and F1 are reported as zero.
    #[display("'{class}' has no test samples")]
    EmptyEvaluationClass { class: GameState },
}

/// Test-partition scores of one model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub model: ModelKind,
    pub accuracy: f64,
    pub macro_f1: f64,
    /// Classes present in the test truth or predictions, in label order.
    pub classes: Vec<ClassScore>,
    pub notes: Vec<EvaluationNote>,
}

impl EvaluationReport {
    /// Scores `predicted` against `truth`, both given as label codes.
    ///
    /// # Panics
    ///
    /// Panics if the slices differ in length.
    pub fn new(
        model: ModelKind,
        labels: &LabelEncoder<GameState>,
        truth: &[usize],
        predicted: &[usize],
    ) -> Result<Self, UnknownClassCodeError> {
        let report = ClassificationReport::new(truth, predicted);
        let decode = |code| labels.decode(code).copied().ok_or(UnknownClassCodeError { code });

        let classes = report
            .classes
            .iter()
            .map(|m| {
                Ok(ClassScore {
                    class: decode(m.class)?,
                    precision: m.precision,
                    recall: m.recall,
                    f1: m.f1,
                    support: m.support,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let notes = labels
            .classes()
            .iter()
            .filter(|class| {
                !classes
                    .iter()
                    .any(|score| score.class == **class && score.support > 0)
            })
            .map(|&class| EvaluationNote::EmptyEvaluationClass { class })
            .collect::<Vec<_>>();
        for note in &notes {
            tracing::warn!(%model, "{note}");
        }

        Ok(Self {
            model,
            accuracy: report.accuracy,
            macro_f1: report.macro_f1,
            classes,
            notes,
        })
    }

    #[must_use]
    pub fn class(&self, class: GameState) -> Option<&ClassScore> {
        self.classes.iter().find(|c| c.class == class)
    }
}

/// Per-model metrics keyed by model name, for external plotting.
///
/// Serializes as
/// `{model: {accuracy, macro_f1, per_class: {class: {precision, recall, f1}}}}`
/// with models and classes in report order.
#[derive(Debug, Clone, Copy)]
pub struct MetricsSidecar<'a> {
    reports: &'a [EvaluationReport],
}

impl<'a> MetricsSidecar<'a> {
    #[must_use]
    pub fn new(reports: &'a [EvaluationReport]) -> Self {
        Self { reports }
    }
}

impl Serialize for MetricsSidecar<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.reports.len()))?;
        for report in self.reports {
            map.serialize_entry(report.model.name(), &ModelMetrics(report))?;
        }
        map.end()
    }
}

struct ModelMetrics<'a>(&'a EvaluationReport);

impl Serialize for ModelMetrics<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("accuracy", &self.0.accuracy)?;
        map.serialize_entry("macro_f1", &self.0.macro_f1)?;
        map.serialize_entry("per_class", &PerClass(&self.0.classes))?;
        map.end()
    }
}

struct PerClass<'a>(&'a [ClassScore]);

#[derive(Serialize)]
struct ClassMetricsEntry {
    precision: f64,
    recall: f64,
    f1: f64,
}

impl Serialize for PerClass<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for score in self.0 {
            let entry = ClassMetricsEntry {
                precision: score.precision,
                recall: score.recall,
                f1: score.f1,
            };
            map.serialize_entry(score.class.label(), &entry)?;
        }
        map.end()
    }
}
