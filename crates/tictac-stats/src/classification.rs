//! Precision / recall / F1 reports for multi-class predictions.
//!
//! Classes are integer codes. A report covers exactly the classes that occur
//! in the ground truth or in the predictions: a class absent from both never
//! appears. Ratios with a zero denominator are reported as `0.0`, so a class
//! that is only ever predicted (zero support) gets recall and F1 of zero
//! instead of `NaN`.

use std::collections::BTreeSet;

use serde::Serialize;

/// Metrics for a single class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub class: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of ground-truth samples of this class.
    pub support: usize,
}

impl ClassMetrics {
    #[must_use]
    pub fn has_support(&self) -> bool {
        self.support > 0
    }
}

/// Summary of predicted vs. true labels.
///
/// # Example
///
/// ```
/// use tictac_stats::classification::ClassificationReport;
///
/// // class 2 is only predicted, never observed
/// let report = ClassificationReport::new(&[0, 1, 1], &[0, 1, 2]);
/// let unsupported = report.zero_support_classes().collect::<Vec<_>>();
/// assert_eq!(unsupported, vec![2]);
/// assert_eq!(report.classes[2].f1, 0.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    pub macro_precision: f64,
    pub macro_recall: f64,
    /// Unweighted mean of per-class F1 over the present classes.
    pub macro_f1: f64,
    /// Per-class metrics in ascending class order.
    pub classes: Vec<ClassMetrics>,
}

impl ClassificationReport {
    /// Builds a report from paired truth / prediction slices.
    ///
    /// Empty input yields a report with no classes and all scores `0.0`.
    ///
    /// # Panics
    ///
    /// Panics if the slices differ in length.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new(truth: &[usize], predicted: &[usize]) -> Self {
        assert_eq!(
            truth.len(),
            predicted.len(),
            "truth and predictions must be paired"
        );

        let present = truth
            .iter()
            .chain(predicted)
            .copied()
            .collect::<BTreeSet<_>>();

        let classes = present
            .into_iter()
            .map(|class| {
                let mut tp = 0;
                let mut fp = 0;
                let mut fn_ = 0;
                for (&t, &p) in truth.iter().zip(predicted) {
                    match (t == class, p == class) {
                        (true, true) => tp += 1,
                        (false, true) => fp += 1,
                        (true, false) => fn_ += 1,
                        (false, false) => {}
                    }
                }
                let precision = ratio(tp, tp + fp);
                let recall = ratio(tp, tp + fn_);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    class,
                    precision,
                    recall,
                    f1,
                    support: tp + fn_,
                }
            })
            .collect::<Vec<_>>();

        let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
        let mean = |f: fn(&ClassMetrics) -> f64| {
            if classes.is_empty() {
                0.0
            } else {
                classes.iter().map(f).sum::<f64>() / classes.len() as f64
            }
        };

        Self {
            accuracy: ratio(correct, truth.len()),
            macro_precision: mean(|c| c.precision),
            macro_recall: mean(|c| c.recall),
            macro_f1: mean(|c| c.f1),
            classes,
        }
    }

    /// Classes that were predicted but never occur in the ground truth.
    pub fn zero_support_classes(&self) -> impl Iterator<Item = usize> + '_ {
        self.classes
            .iter()
            .filter(|c| !c.has_support())
            .map(|c| c.class)
    }

    #[must_use]
    pub fn get(&self, class: usize) -> Option<&ClassMetrics> {
        self.classes.iter().find(|c| c.class == class)
    }
}

#[expect(clippy::cast_precision_loss)]
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}
