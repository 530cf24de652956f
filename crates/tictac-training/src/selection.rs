use crate::{classifier::ModelKind, evaluation::EvaluationReport};

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum SelectError {
    #[display("model {model} was not trained in this run")]
    ModelNotTrained { model: ModelKind },
    #[display("no trained model to select from")]
    NoReports,
}

/// Picks the model to serve.
///
/// An override is returned as-is when a report exists for it. Otherwise the
/// model with the highest macro-F1 wins; models are visited in
/// [`ModelKind::ALL`] order regardless of the order of `reports`, and a later
/// model must score strictly higher to displace an earlier one.
pub fn select(reports: &[EvaluationReport], model: Option<ModelKind>) -> Result<ModelKind, SelectError> {
    if let Some(model) = model {
        if reports.iter().any(|r| r.model == model) {
            return Ok(model);
        }
        return Err(SelectError::ModelNotTrained { model });
    }

    let mut best: Option<&EvaluationReport> = None;
    for kind in ModelKind::ALL {
        let Some(report) = reports.iter().find(|r| r.model == kind) else {
            continue;
        };
        if best.is_none_or(|b| report.macro_f1 > b.macro_f1) {
            best = Some(report);
        }
    }
    let best = best.ok_or(SelectError::NoReports)?;
    tracing::info!(model = %best.model, macro_f1 = best.macro_f1, "selected model");
    Ok(best.model)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(model: ModelKind, macro_f1: f64) -> EvaluationReport {
        EvaluationReport {
            model,
            accuracy: macro_f1,
            macro_f1,
            classes: vec![],
            notes: vec![],
        }
    }

    #[test]
    fn test_highest_macro_f1_wins() {
        let reports = [
            report(ModelKind::Knn, 0.7),
            report(ModelKind::Mlp, 0.9),
            report(ModelKind::DecisionTree, 0.8),
            report(ModelKind::RandomForest, 0.85),
        ];
        assert_eq!(select(&reports, None), Ok(ModelKind::Mlp));
    }

    #[test]
    fn test_tie_goes_to_earlier_model() {
        let reports = [
            report(ModelKind::RandomForest, 0.9),
            report(ModelKind::DecisionTree, 0.9),
        ];
        assert_eq!(select(&reports, None), Ok(ModelKind::DecisionTree));
        let reports = [report(ModelKind::Mlp, 0.5), report(ModelKind::Knn, 0.5)];
        assert_eq!(select(&reports, None), Ok(ModelKind::Knn));
    }

    #[test]
    fn test_override_is_unconditional() {
        let reports = [report(ModelKind::Knn, 0.99), report(ModelKind::DecisionTree, 0.1)];
        assert_eq!(
            select(&reports, Some(ModelKind::DecisionTree)),
            Ok(ModelKind::DecisionTree)
        );
        assert_eq!(
            select(&reports, Some(ModelKind::Mlp)),
            Err(SelectError::ModelNotTrained {
                model: ModelKind::Mlp
            })
        );
    }

    #[test]
    fn test_no_reports() {
        assert_eq!(select(&[], None), Err(SelectError::NoReports));
    }
}
