use ado_core::{AdoError, Model};
use ado_engine::{EngineTables, GridSpec, NumericsConfig};
use ado_tasks::{
    model_by_name, task_by_name, CraModel, CraUtility, DdModel, Discounting, PsiModel, MODEL_NAMES,
};

fn psi_grids() -> GridSpec {
    GridSpec::new()
        .design("stimulus", vec![-2.0, 0.0, 2.0])
        .param("threshold", vec![-1.0, 1.0])
        .param("slope", vec![0.0, 1.0, 2.0])
        .param("guess_rate", vec![0.0, 0.5])
        .param("lapse_rate", vec![0.0, 0.05])
}

fn dd_grids(rate: &str) -> GridSpec {
    GridSpec::new()
        .design("t_ss", vec![0.0, 1.0])
        .design("t_ll", vec![5.0, 20.0])
        .design("r_ss", vec![400.0])
        .design("r_ll", vec![800.0])
        .param(rate, vec![0.0, 0.01, 0.1])
        .param("tau", vec![0.01, 0.1])
}

fn cra_grids() -> GridSpec {
    GridSpec::new()
        .design("p_var", vec![0.25, 0.5])
        .design("a_var", vec![0.0, 0.5])
        .design("r_var", vec![10.0, 40.0])
        .design("r_fix", vec![10.0])
        .param("alpha", vec![0.5, 1.0])
        .param("beta", vec![-0.5, 0.0, 0.5])
        .param("gamma", vec![0.5, 2.0])
}

fn assert_stochastic(tables: &EngineTables) {
    let tensor = tables.tensor();
    for d in 0..tensor.n_designs() {
        for t in 0..tensor.n_params() {
            let total: f64 = (0..tensor.n_responses())
                .map(|r| tensor.probability(d, t, r))
                .sum();
            assert!((total - 1.0).abs() < 1e-9, "row ({d}, {t}) sums to {total}");
        }
    }
}

#[test]
fn registry_resolves_every_listed_pair() {
    for (task, model) in MODEL_NAMES {
        let resolved = model_by_name(task, model).unwrap();
        assert_eq!(resolved.descriptor().name(), model);
        assert_eq!(resolved.task().name(), task);
        assert_eq!(resolved.task(), &task_by_name(task).unwrap());
    }
    let lower = model_by_name("psi", "weibull").unwrap();
    assert_eq!(lower.descriptor().name(), "Weibull");
}

#[test]
fn registry_rejects_unknown_names() {
    let err = model_by_name("Stroop", "Logistic").err().unwrap();
    assert!(matches!(err, AdoError::Config(_)));
    assert_eq!(err.info().code, "unknown-task");

    let err = model_by_name("DD", "Quasi").err().unwrap();
    assert_eq!(err.info().code, "unknown-model");
    assert!(err.info().hint.as_deref().unwrap().contains("Hyperbolic"));
}

#[test]
fn psi_grid_drops_inadmissible_slopes() {
    let model = PsiModel::logistic().unwrap();
    let tables = EngineTables::build(&model, &psi_grids(), &NumericsConfig::default()).unwrap();
    // slope 0 is not positive: a third of the 24 Cartesian rows go.
    assert_eq!(tables.params().len(), 16);
    assert_eq!(tables.params().dropped(), 8);
    assert_stochastic(&tables);
}

#[test]
fn psi_links_agree_at_threshold() {
    for model in [
        PsiModel::logistic().unwrap(),
        PsiModel::normal().unwrap(),
    ] {
        let p = model.probability(0.3, 0.3, 2.0, 0.0, 0.0);
        assert!((p - 0.5).abs() < 1e-6, "{:?}", model.link());
    }
    let weibull = PsiModel::weibull().unwrap();
    let p = weibull.probability(0.3, 0.3, 2.0, 0.0, 0.0);
    assert!((p - (1.0 - (-1.0_f64).exp())).abs() < 1e-12);
}

#[test]
fn grid_insertion_order_does_not_change_tables() {
    let model = PsiModel::normal().unwrap();
    let forward = psi_grids();
    let mut reversed = GridSpec::new().design("stimulus", vec![-2.0, 0.0, 2.0]);
    for (name, values) in forward.params.iter().rev() {
        reversed = reversed.param(name.clone(), values.clone());
    }
    let a = EngineTables::build(&model, &forward, &NumericsConfig::default()).unwrap();
    let b = EngineTables::build(&model, &reversed, &NumericsConfig::default()).unwrap();
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_eq!(a.tensor().slices(), b.tensor().slices());
}

#[test]
fn discounting_prefers_larger_later_when_patient() {
    for discounting in [Discounting::Exponential, Discounting::Hyperbolic] {
        let model = DdModel::new(discounting).unwrap();
        let patient = model.probability([0.0, 10.0, 400.0, 800.0], 0.0, 0.05);
        let impatient = model.probability([0.0, 10.0, 400.0, 800.0], 1.0, 0.05);
        assert!(patient > 0.99);
        assert!(impatient < 0.01);

        let tables = EngineTables::build(
            &model,
            &dd_grids(discounting.rate_param()),
            &NumericsConfig::default(),
        )
        .unwrap();
        assert_eq!(tables.designs().len(), 4);
        assert_eq!(tables.params().len(), 6);
        assert_stochastic(&tables);
    }
}

#[test]
fn hyperbolic_discount_is_closed_form() {
    let model = DdModel::new(Discounting::Hyperbolic).unwrap();
    // V_SS = 100, V_LL = 200 / (1 + 0.5 * 2) = 100: indifference.
    let p = model.probability([0.0, 2.0, 100.0, 200.0], 0.5, 3.0);
    assert!((p - 0.5).abs() < 1e-12);
}

#[test]
fn risky_choice_models_cover_ambiguity() {
    let linear = CraModel::new(CraUtility::Linear).unwrap();
    let exponential = CraModel::new(CraUtility::Exponential).unwrap();
    // Without ambiguity both utilities reduce to p_var * r_var^alpha.
    let design = [0.5, 0.0, 10.0, 10.0];
    assert!((linear.probability(design, 1.0, 0.7, 1.0) - 0.5).abs() < 1e-12);
    assert!((exponential.probability(design, 1.0, 0.7, 1.0) - 0.5).abs() < 1e-12);

    // Ambiguity aversion (beta > 0) lowers the appeal of the variable option.
    let ambiguous = [0.5, 0.5, 10.0, 10.0];
    assert!(linear.probability(ambiguous, 1.0, 0.5, 1.0) < 0.5);
    assert!(exponential.probability(ambiguous, 1.0, 0.5, 1.0) < 0.5);

    for model in [linear, exponential] {
        let tables = EngineTables::build(&model, &cra_grids(), &NumericsConfig::default()).unwrap();
        assert_eq!(tables.designs().len(), 8);
        assert_eq!(tables.params().len(), 12);
        assert_stochastic(&tables);
    }
}

#[test]
fn binary_models_reject_other_responses() {
    let model = PsiModel::logistic().unwrap();
    let tables = EngineTables::build(&model, &psi_grids(), &NumericsConfig::default()).unwrap();
    let err = model
        .likelihood(tables.designs().frame(), tables.params().frame(), 2)
        .unwrap_err();
    assert!(matches!(err, AdoError::Domain(_)));
}
