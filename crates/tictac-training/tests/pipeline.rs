use tictac_analysis::dataset::{Dataset, DatasetRow};
use tictac_engine::{Board, Cell, GameState, InvalidBoardError, RawBoard, enumerate, rules};
use tictac_training::{
    classifier::{ModelKind, TrainError},
    pipeline::{
        self, FittedEncodingState, InferenceError, PipelineConfig, PipelineError, TrainingRun,
        classify_with_retraining,
    },
    selection::{self, SelectError},
};

fn reachable() -> Dataset {
    Dataset::from_boards(enumerate::reachable_boards(), rules::label_of).unwrap()
}

/// All four models, scaled down so a run takes seconds.
fn quick_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.mlp.max_epochs = 30;
    config.forest.n_trees = 16;
    config
}

fn config_for(models: &[ModelKind]) -> PipelineConfig {
    PipelineConfig {
        models: models.to_vec(),
        ..quick_config()
    }
}

fn tokens(s: &str) -> Vec<String> {
    Board::tokenize(s)
}

#[test]
fn test_partition_sizes_on_reachable_boards() {
    let run = TrainingRun::train(&reachable(), &config_for(&[ModelKind::DecisionTree])).unwrap();
    let p = run.partition();
    assert_eq!(p.test.len(), 1096);
    assert_eq!(p.validation.len(), 877);
    assert_eq!(p.train.len(), 3505);
}

#[test]
fn test_runs_are_deterministic() {
    let dataset = reachable();
    let a = TrainingRun::train(&dataset, &quick_config()).unwrap();
    let b = TrainingRun::train(&dataset, &quick_config()).unwrap();
    assert_eq!(a.partition(), b.partition());
    assert_eq!(a.reports(), b.reports());
    assert_eq!(a.selected(), b.selected());

    let models = a.reports().iter().map(|r| r.model).collect::<Vec<_>>();
    assert_eq!(models, ModelKind::ALL.to_vec());
    assert_eq!(a.selected(), selection::select(a.reports(), None).unwrap());
}

#[test]
fn test_scenario_boards() {
    // repeat the scenario boards so that every partition holds copies of them
    let scenarios = [
        ("xxxoobbbb", GameState::XWins),
        ("xoxxoooxx", GameState::Draw),
        ("xobbxbbbb", GameState::NearEnd),
    ];
    let mut rows = reachable().rows().to_vec();
    for (board, label) in scenarios {
        let board = board.parse::<Board>().unwrap();
        assert_eq!(rules::label_of(&board), label);
        rows.extend(std::iter::repeat_n(DatasetRow { board, label }, 40));
    }
    let dataset = Dataset::new(rows).unwrap();

    let models = [ModelKind::Knn, ModelKind::DecisionTree, ModelKind::RandomForest];
    let run = TrainingRun::train(&dataset, &config_for(&models)).unwrap();
    for model in models {
        for (board, label) in scenarios {
            let result = run.classify(&tokens(board), Some(model)).unwrap();
            assert_eq!(result.model, model);
            assert_eq!(result.prediction, label, "{model} on {board}");
        }
    }
}

#[test]
fn test_unreadable_cell_is_an_empty_indicator_block() {
    let run = TrainingRun::train(&reachable(), &config_for(&[ModelKind::Knn])).unwrap();
    let cells = ["x", "o", "?", "b", "x", "b", "b", "b", "b"];
    let raw = RawBoard::from_tokens(&cells).unwrap();

    let indicator = run.encoding().indicator.as_ref().unwrap();
    let one_hot = indicator.one_hot.transform_partial_row(raw.cells());
    let block = indicator.one_hot.block_offset(2)..indicator.one_hot.block_offset(3);
    assert_eq!(block.len(), 3);
    assert_eq!(one_hot[block.clone()], [0.0, 0.0, 0.0]);
    assert_eq!(one_hot.iter().sum::<f64>(), 8.0);

    // not the same as reading the cell as blank
    let family = ModelKind::Knn.family();
    let row = run.encoding().encode(ModelKind::Knn, family, &raw).unwrap();
    let blank = RawBoard::from(raw.coerce());
    let blank_row = run.encoding().encode(ModelKind::Knn, family, &blank).unwrap();
    assert_ne!(row[block.clone()], blank_row[block]);

    let result = run.classify(&cells, None).unwrap();
    assert_eq!(result.model, ModelKind::Knn);
    assert!(GameState::ALL.contains(&result.prediction));
}

#[test]
fn test_ordinal_models_read_unreadable_cells_as_blank() {
    let run = TrainingRun::train(&reachable(), &config_for(&[ModelKind::DecisionTree])).unwrap();
    let unreadable = run
        .classify(&["x", "o", "?", "", "x", "Z", "b", "b", "b"], None)
        .unwrap();
    let plain = run.classify(&tokens("xobbxbbbb"), None).unwrap();
    assert_eq!(unreadable, plain);
}

#[test]
fn test_wrong_length_is_rejected() {
    let run = TrainingRun::train(&reachable(), &config_for(&[ModelKind::DecisionTree])).unwrap();
    let err = run.classify(&["x", "o"], None).unwrap_err();
    assert!(matches!(
        err,
        InferenceError::InvalidBoard(InvalidBoardError::WrongLength { len: 2 })
    ));
}

#[test]
fn test_unseen_category_per_family() {
    // cell 0 never holds O
    let boards = enumerate::reachable_boards()
        .into_iter()
        .filter(|b| b[0] != Cell::O)
        .collect::<Vec<_>>();
    let dataset = Dataset::from_boards(boards, rules::label_of).unwrap();
    let run = TrainingRun::train(&dataset, &config_for(&[ModelKind::Knn, ModelKind::DecisionTree]))
        .unwrap();
    let unseen = tokens("oxbbbbbbb");

    // indicator encoding drops the unseen value
    assert!(run.classify(&unseen, Some(ModelKind::Knn)).is_ok());
    let row = run
        .encoding()
        .encode(ModelKind::Knn, ModelKind::Knn.family(), &RawBoard::from_tokens(&unseen).unwrap())
        .unwrap();
    assert_eq!(row.len(), 3 * 9 - 1);

    // ordinal encoding refuses it
    let err = run.classify(&unseen, Some(ModelKind::DecisionTree)).unwrap_err();
    assert!(matches!(err, InferenceError::UnknownCategory(_)), "{err}");
}

#[test]
fn test_missing_fitted_state_is_fatal() {
    let run = TrainingRun::train(&reachable(), &config_for(&[ModelKind::DecisionTree])).unwrap();
    let classifier = run.classifier(ModelKind::DecisionTree).unwrap();
    let stale = FittedEncodingState {
        ordinal: None,
        ..run.encoding().clone()
    };
    let err = pipeline::predict(classifier, &stale, &RawBoard::from(Board::empty())).unwrap_err();
    assert!(matches!(
        err,
        InferenceError::InconsistentPipelineState {
            model: ModelKind::DecisionTree,
            ..
        }
    ));
}

#[test]
fn test_override_must_name_a_trained_model() {
    let run = TrainingRun::train(&reachable(), &config_for(&[ModelKind::DecisionTree])).unwrap();
    let err = run.classify(&tokens("bbbbbbbbb"), Some(ModelKind::Mlp)).unwrap_err();
    assert!(matches!(
        err,
        InferenceError::Select(SelectError::ModelNotTrained {
            model: ModelKind::Mlp
        })
    ));
}

#[test]
fn test_deadline_is_reported_per_model() {
    let config = PipelineConfig {
        training_timeout_secs: Some(0),
        ..config_for(&[ModelKind::Mlp])
    };
    let err = TrainingRun::train(&reachable(), &config).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Train {
            model: ModelKind::Mlp,
            source: TrainError::DeadlineExceeded { .. }
        }
    ));
}

#[test]
fn test_retraining_per_call_matches_retained_run() {
    let dataset = reachable();
    let config = config_for(&[ModelKind::Knn, ModelKind::DecisionTree]);
    let run = TrainingRun::train(&dataset, &config).unwrap();
    for board in ["xobbxbbbb", "bbbbbbbbb", "oxxbobbbx"] {
        let retained = run.classify(&tokens(board), None).unwrap();
        let retrained = classify_with_retraining(&dataset, &config, &tokens(board), None).unwrap();
        assert_eq!(retained, retrained);
    }
}

#[test]
fn test_metrics_sidecar_lists_every_model() {
    let run = TrainingRun::train(&reachable(), &quick_config()).unwrap();
    let json = serde_json::to_value(run.metrics()).unwrap();
    for model in ModelKind::ALL {
        let entry = &json[model.name()];
        assert!(entry["accuracy"].is_f64(), "{model}");
        assert!(entry["macro_f1"].is_f64(), "{model}");
        assert!(entry["per_class"]["near end"]["f1"].is_f64(), "{model}");
    }
}
