use ado_core::{bernoulli_slice, broadcast, FnModel, ModelDescriptor, Task};
use ado_engine::{
    run_session, Engine, EngineConfig, GridSpec, Prior, SelectionKind, SimulatedRespondent,
    StaircaseConfig,
};
use ado_tasks::PsiModel;

fn coin_model() -> FnModel {
    let task = Task::new("coin", ["trial"], [0, 1]).unwrap();
    let descriptor = ModelDescriptor::new("bias", task, ["p"]).unwrap();
    FnModel::new(descriptor, |designs, params, response| {
        let p = params.column("p")?;
        bernoulli_slice(broadcast(designs, params, |_, t| p[t]), response)
    })
}

fn psi_grids(thresholds: Vec<f64>, slopes: Vec<f64>) -> GridSpec {
    GridSpec::new()
        .design("stimulus", vec![-3.0, -2.0, -1.0, 0.0, 1.0, 2.0, 3.0])
        .param("threshold", thresholds)
        .param("slope", slopes)
        .param("guess_rate", vec![0.0])
        .param("lapse_rate", vec![0.0])
}

fn seeded(seed: u64) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.seed_policy.master_seed = seed;
    config
}

#[test]
fn coin_bias_posterior_peaks_at_seventy_percent() {
    let model = coin_model();
    let grids = GridSpec::new()
        .design("trial", vec![0.0])
        .param("p", vec![0.1, 0.3, 0.5, 0.7, 0.9]);
    let mut engine = Engine::new(&model, &grids, Prior::Uniform, EngineConfig::default()).unwrap();
    for response in [1, 1, 1, 1, 0] {
        let design = engine.get_design(SelectionKind::Optimal).unwrap();
        assert_eq!(design.index, 0);
        engine.update(&design.values, response).unwrap();
    }
    assert_eq!(engine.posterior_mode(), 3);
    assert_eq!(engine.grid_param().row(3), vec![0.7]);
    assert_eq!(engine.responses(), &[1, 1, 1, 1, 0]);
    assert_eq!(engine.version(), 5);

    // p^4 (1 - p) normalized over the grid.
    let raw: Vec<f64> = [0.1f64, 0.3, 0.5, 0.7, 0.9]
        .iter()
        .map(|p| p.powi(4) * (1.0 - p))
        .collect();
    let total: f64 = raw.iter().sum();
    for (got, want) in engine.posterior().iter().zip(raw.iter()) {
        assert!((got - want / total).abs() < 1e-9);
    }
}

#[test]
fn optimal_sessions_concentrate_on_the_true_psychometric_curve() {
    let model = PsiModel::logistic().unwrap();
    let grids = psi_grids(vec![-1.0, 0.0, 1.0], vec![0.5, 1.0, 2.0]);
    let truth = [0.0, 1.0, 0.0, 0.0];

    // Thirty trials already move mass onto the truth on average.
    let mut mass = 0.0;
    for seed in 0..8 {
        let mut engine = Engine::new(&model, &grids, Prior::Uniform, seeded(seed)).unwrap();
        let mut respondent = SimulatedRespondent::new(engine.tables(), &truth, seed).unwrap();
        let trace = run_session(&mut engine, &mut respondent, SelectionKind::Optimal, 30).unwrap();
        assert_eq!(trace.trials.len(), 30);
        mass += trace.final_truth_mass().unwrap();
    }
    assert!(mass / 8.0 > 1.0 / 9.0);

    // Longer sessions pin down the exact grid point.
    let mut recovered = 0;
    for seed in 1..=3 {
        let mut engine = Engine::new(&model, &grids, Prior::Uniform, seeded(seed)).unwrap();
        let mut respondent = SimulatedRespondent::new(engine.tables(), &truth, seed).unwrap();
        run_session(&mut engine, &mut respondent, SelectionKind::Optimal, 300).unwrap();
        if engine.posterior_mode() == respondent.truth() {
            recovered += 1;
        }
    }
    assert!(recovered >= 2, "recovered truth in {recovered} of 3 sessions");
}

#[test]
fn staircase_walks_one_down_two_up() {
    let task = Task::new("line", ["x"], [0, 1]).unwrap();
    let descriptor = ModelDescriptor::new("flat", task, ["theta"]).unwrap();
    let model = FnModel::new(descriptor, |designs, params, response| {
        bernoulli_slice(broadcast(designs, params, |_, _| 0.5), response)
    });
    let grids = GridSpec::new()
        .design("x", (0..11).map(f64::from).collect::<Vec<_>>())
        .param("theta", vec![0.0]);
    let config = EngineConfig {
        staircase: StaircaseConfig {
            start_index: Some(5),
            ..StaircaseConfig::default()
        },
        ..EngineConfig::default()
    };
    let mut engine = Engine::new(&model, &grids, Prior::Uniform, config).unwrap();
    let kind = SelectionKind::Staircase { step: 1 };

    let mut visited = vec![engine.get_design(kind).unwrap().index];
    for response in [1, 1, 0, 1] {
        engine.update_index(*visited.last().unwrap(), response).unwrap();
        visited.push(engine.get_design(kind).unwrap().index);
    }
    assert_eq!(visited, vec![5, 4, 3, 5, 4]);
    assert_eq!(engine.staircase_state().y_prev, Some(1));
}

#[test]
fn information_peaks_near_the_threshold_estimate() {
    let model = PsiModel::logistic().unwrap();
    let grids = psi_grids(vec![-1.0, -0.5, 0.0, 0.5, 1.0], vec![1.0]);
    let mut engine = Engine::new(&model, &grids, Prior::Uniform, EngineConfig::default()).unwrap();
    for response in [1, 0, 1, 0, 1, 0, 1, 0, 1, 0] {
        engine.update(&[0.0], response).unwrap();
    }
    let mean = engine.post_mean();
    assert!(mean[0].abs() < 1e-9);
    let nearest = engine.grid_design().nearest(&[mean[0]]).unwrap();
    assert_eq!(nearest, 3);

    let mi = engine.mutual_info().unwrap().clone();
    assert!(mi[nearest] > mi[0]);
    assert!(mi[nearest] > mi[6]);
    assert_eq!(engine.get_design(SelectionKind::Optimal).unwrap().index, 3);
}
