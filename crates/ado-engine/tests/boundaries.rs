use ado_core::{broadcast, AdoError, FnModel, ModelDescriptor, Task};
use ado_engine::{
    Engine, EngineConfig, EngineState, GridSpec, NumericWarning, NumericsConfig, Prior,
    SelectionKind, StaircaseConfig,
};
use ado_tasks::PsiModel;

fn psi_grids() -> GridSpec {
    GridSpec::new()
        .design("stimulus", vec![-1.0, 0.0, 1.0])
        .param("threshold", vec![-0.5, 0.5])
        .param("slope", vec![1.0])
        .param("guess_rate", vec![0.0])
        .param("lapse_rate", vec![0.0])
}

fn psi_engine(config: EngineConfig) -> Result<Engine, AdoError> {
    Engine::new(&PsiModel::logistic().unwrap(), &psi_grids(), Prior::Uniform, config)
}

fn config_code(result: Result<Engine, AdoError>) -> String {
    match result {
        Err(AdoError::Config(info)) => info.code,
        other => panic!("expected a config error, got {other:?}"),
    }
}

#[test]
fn single_design_is_always_returned() {
    let grids = GridSpec::new()
        .design("stimulus", vec![0.5])
        .param("threshold", vec![-0.5, 0.5])
        .param("slope", vec![1.0])
        .param("guess_rate", vec![0.0])
        .param("lapse_rate", vec![0.0]);
    let model = PsiModel::logistic().unwrap();
    let mut engine = Engine::new(&model, &grids, Prior::Uniform, EngineConfig::default()).unwrap();
    for kind in [
        SelectionKind::Optimal,
        SelectionKind::Random,
        SelectionKind::Staircase { step: 3 },
    ] {
        let design = engine.get_design(kind).unwrap();
        assert_eq!(design.index, 0);
        assert_eq!(design.values, vec![0.5]);
        engine.update_index(0, 0).unwrap();
    }
}

#[test]
fn single_parameter_row_has_no_information() {
    let grids = GridSpec::new()
        .design("stimulus", vec![-1.0, 0.0, 1.0])
        .param("threshold", vec![0.0])
        .param("slope", vec![1.0])
        .param("guess_rate", vec![0.0])
        .param("lapse_rate", vec![0.0]);
    let model = PsiModel::logistic().unwrap();
    let mut engine = Engine::new(&model, &grids, Prior::Uniform, EngineConfig::default()).unwrap();
    assert_eq!(engine.posterior().as_slice(), &[1.0]);
    assert!(engine.mutual_info().unwrap().iter().all(|mi| mi.abs() < 1e-12));
    assert_eq!(engine.get_design(SelectionKind::Optimal).unwrap().index, 0);
    assert!(matches!(
        engine.warnings().last(),
        Some(NumericWarning::PosteriorCollapse { .. })
    ));
}

#[test]
fn degenerate_prior_has_no_information() {
    let model = PsiModel::logistic().unwrap();
    let prior = Prior::Weights(vec![0.0, 1.0]);
    let mut engine = Engine::new(&model, &psi_grids(), prior, EngineConfig::default()).unwrap();
    assert!(engine.mutual_info().unwrap().iter().all(|mi| mi.abs() < 1e-12));
    assert_eq!(engine.log_posterior()[0], f64::NEG_INFINITY);
    engine.update(&[0.0], 1).unwrap();
    assert_eq!(engine.posterior()[1], 1.0);
}

#[test]
fn prior_function_weights_rows_in_model_order() {
    let model = PsiModel::logistic().unwrap();
    // Row layout is (threshold, slope, guess_rate, lapse_rate).
    let prior = Prior::from_fn(|row| if row[0] > 0.0 { 3.0 } else { 1.0 });
    let engine = Engine::new(&model, &psi_grids(), prior, EngineConfig::default()).unwrap();
    let probs = engine.posterior();
    assert!((probs[0] - 0.25).abs() < 1e-12);
    assert!((probs[1] - 0.75).abs() < 1e-12);
    let marginal = engine.marg_post("threshold").unwrap();
    assert_eq!(marginal.len(), 2);
    assert_eq!(marginal[1].0, 0.5);
    assert!((marginal[1].1 - 0.75).abs() < 1e-12);
    let sd = engine.post_sd();
    assert!((sd[0] - 0.75f64.sqrt() * 0.5).abs() < 1e-12);
    assert!(sd[1].abs() < 1e-12);
}

#[test]
fn selections_do_not_touch_the_posterior() {
    let mut engine = psi_engine(EngineConfig::default()).unwrap();
    assert_eq!(engine.state(), EngineState::Ready);
    let before = engine.posterior();
    let first = engine.get_design(SelectionKind::Optimal).unwrap();
    let again = engine.get_design(SelectionKind::Optimal).unwrap();
    assert_eq!(first, again);
    engine.get_design(SelectionKind::Random).unwrap();
    assert_eq!(engine.state(), EngineState::SelectionIssued);
    assert_eq!(engine.posterior(), before);
    assert_eq!(engine.version(), 0);
    engine.update(&[0.1], 1).unwrap();
    assert_eq!(engine.state(), EngineState::Ready);
}

#[test]
fn construction_rejects_bad_configuration() {
    let model = PsiModel::logistic().unwrap();

    let missing = GridSpec::new()
        .design("stimulus", vec![0.0])
        .param("threshold", vec![0.0])
        .param("slope", vec![1.0])
        .param("guess_rate", vec![0.0]);
    let err = Engine::new(&model, &missing, Prior::Uniform, EngineConfig::default()).unwrap_err();
    assert_eq!(err.info().code, "grid-missing-variable");
    assert_eq!(err.info().context["variable"], "lapse_rate");

    let unknown = psi_grids().design("contrast", vec![1.0]);
    let err = Engine::new(&model, &unknown, Prior::Uniform, EngineConfig::default()).unwrap_err();
    assert_eq!(err.info().code, "grid-unknown-variable");

    let empty = psi_grids().design("stimulus", Vec::<f64>::new());
    let err = Engine::new(&model, &empty, Prior::Uniform, EngineConfig::default()).unwrap_err();
    assert_eq!(err.info().code, "grid-empty");

    let nan = psi_grids().param("slope", vec![f64::NAN]);
    let err = Engine::new(&model, &nan, Prior::Uniform, EngineConfig::default()).unwrap_err();
    assert_eq!(err.info().code, "grid-non-finite");

    let inadmissible = psi_grids().param("slope", vec![-1.0, 0.0]);
    let err = Engine::new(&model, &inadmissible, Prior::Uniform, EngineConfig::default()).unwrap_err();
    assert_eq!(err.info().code, "param-grid-empty");
    assert_eq!(err.info().context["variable"], "slope");

    for (prior, code) in [
        (Prior::Weights(vec![1.0]), "prior-length"),
        (Prior::Weights(vec![1.0, -1.0]), "prior-weight"),
        (Prior::Weights(vec![0.0, 0.0]), "prior-zero"),
    ] {
        let err = Engine::new(&model, &psi_grids(), prior, EngineConfig::default()).unwrap_err();
        assert_eq!(err.info().code, code);
    }

    let mut config = EngineConfig::default();
    config.staircase.axis = Some("contrast".into());
    assert_eq!(config_code(psi_engine(config)), "staircase-axis");

    let config = EngineConfig {
        staircase: StaircaseConfig {
            start_index: Some(3),
            ..StaircaseConfig::default()
        },
        ..EngineConfig::default()
    };
    assert_eq!(config_code(psi_engine(config)), "staircase-start");

    let config = EngineConfig {
        numerics: NumericsConfig {
            clip_epsilon: 0.0,
            ..NumericsConfig::default()
        },
        ..EngineConfig::default()
    };
    assert_eq!(config_code(psi_engine(config)), "numerics-invalid");
}

#[test]
fn calls_reject_out_of_domain_input() {
    let mut engine = psi_engine(EngineConfig::default()).unwrap();
    let err = engine.get_design(SelectionKind::Staircase { step: 0 }).unwrap_err();
    assert!(matches!(err, AdoError::Config(_)));

    let err = engine.update(&[0.0], 2).unwrap_err();
    assert!(matches!(err, AdoError::Domain(_)));
    assert_eq!(err.info().code, "response-alphabet");
    assert_eq!(err.info().context["alphabet"], "0,1");

    let err = engine.update(&[0.0, 1.0], 1).unwrap_err();
    assert_eq!(err.info().code, "design-dimension");
    let err = engine.update(&[f64::NAN], 1).unwrap_err();
    assert_eq!(err.info().code, "design-non-finite");
    let err = engine.update_index(3, 1).unwrap_err();
    assert_eq!(err.info().code, "design-index");

    assert_eq!(engine.version(), 0);
    assert!(engine.responses().is_empty());
    assert!(engine.marg_post("contrast").is_err());
}

#[test]
fn nearest_neighbour_matching_prefers_lowest_index() {
    let mut engine = psi_engine(EngineConfig::default()).unwrap();
    assert_eq!(engine.update(&[-0.5], 1).unwrap(), 0);
    assert_eq!(engine.update(&[0.4], 1).unwrap(), 1);
    assert_eq!(engine.update(&[25.0], 0).unwrap(), 2);
}

#[test]
fn bad_likelihoods_are_rejected_or_repaired() {
    let task = Task::new("t", ["x"], [0, 1]).unwrap();
    let descriptor = ModelDescriptor::new("m", task, ["theta"]).unwrap();
    let grids = GridSpec::new()
        .design("x", vec![0.0, 1.0])
        .param("theta", vec![0.2, 0.8]);

    let out_of_range = FnModel::new(descriptor.clone(), |designs, params, _| {
        Ok(broadcast(designs, params, |_, _| 1.5))
    });
    let err = Engine::new(&out_of_range, &grids, Prior::Uniform, EngineConfig::default()).unwrap_err();
    assert_eq!(err.info().code, "likelihood-range");

    let leaky = FnModel::new(descriptor.clone(), |designs, params, _| {
        Ok(broadcast(designs, params, |_, _| 0.4))
    });
    let err = Engine::new(&leaky, &grids, Prior::Uniform, EngineConfig::default()).unwrap_err();
    assert_eq!(err.info().code, "likelihood-sum");

    // Slightly off sums and hard zeros are repaired with warnings.
    let sloppy = FnModel::new(descriptor, |designs, params, response| {
        let theta = params.column("theta")?;
        let x = designs.column("x")?;
        Ok(broadcast(designs, params, |d, t| match (x[d] == 0.0, response) {
            (true, 1) => 1.0,
            (true, _) => 0.0,
            (false, 1) => theta[t] + 1e-5,
            (false, _) => 1.0 - theta[t],
        }))
    });
    let engine = Engine::new(&sloppy, &grids, Prior::Uniform, EngineConfig::default()).unwrap();
    let warnings = engine.warnings();
    assert!(warnings
        .iter()
        .any(|w| matches!(w, NumericWarning::LikelihoodClipped { cells: 2, .. })));
    assert!(warnings
        .iter()
        .any(|w| matches!(w, NumericWarning::LikelihoodRenormalized { pairs: 2, .. })));
    let tensor = engine.tables().tensor();
    assert!(tensor.probability(0, 0, 0) > 0.0);
    for d in 0..2 {
        for t in 0..2 {
            let total = tensor.probability(d, t, 0) + tensor.probability(d, t, 1);
            assert!((total - 1.0).abs() < 1e-9);
        }
    }
}

fn collapse_count(engine: &Engine) -> usize {
    engine
        .warnings()
        .iter()
        .filter(|w| matches!(w, NumericWarning::PosteriorCollapse { .. }))
        .count()
}

#[test]
fn collapse_is_reported_once_per_entry() {
    let grids = GridSpec::new()
        .design("stimulus", vec![-1.0, 0.0, 1.0])
        .param("threshold", vec![-1.0, 0.0, 1.0])
        .param("slope", vec![4.0])
        .param("guess_rate", vec![0.0])
        .param("lapse_rate", vec![0.0]);
    let model = PsiModel::logistic().unwrap();
    let mut engine = Engine::new(&model, &grids, Prior::Uniform, EngineConfig::default()).unwrap();
    let fresh = engine.snapshot();
    assert_eq!(collapse_count(&engine), 0);

    for _ in 0..20 {
        engine.update_index(1, 1).unwrap();
    }
    assert!(engine.effective_sample_size() < 1.5);
    assert_eq!(collapse_count(&engine), 1);
    for _ in 0..20 {
        engine.update_index(1, 1).unwrap();
    }
    assert_eq!(collapse_count(&engine), 1);

    engine.restore(&fresh).unwrap();
    assert!(engine.effective_sample_size() > 1.5);
    assert_eq!(collapse_count(&engine), 1);
    for _ in 0..20 {
        engine.update_index(1, 1).unwrap();
    }
    assert_eq!(collapse_count(&engine), 2);
}
