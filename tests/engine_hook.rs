use lanternfly::{
    engine::{EngineBuilder, Iterations},
    months::Month,
    scenario::ScenarioLoader,
};

#[test]
fn engine_runs_hook_each_step() {
    let loader = ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"));
    let scenario = loader
        .load("scenarios/tri_county.yaml")
        .expect("scenario should load");
    let mut network = scenario.build_network();
    let settings = scenario.engine_settings(scenario.run_mode(None), scenario.seed, true);
    let mut engine = EngineBuilder::standard(settings).build();

    let mut steps = Vec::new();
    let mut months = Vec::new();
    engine
        .run_with_hook(&mut network, Iterations::new(14).unwrap(), |summary| {
            steps.push(summary.step);
            months.push(summary.month);
            assert!((0.0..=1.0).contains(&summary.mean_saturation));
        })
        .expect("run succeeds");

    assert_eq!(steps.len(), 14);
    assert_eq!(steps.first().copied(), Some(1));
    assert_eq!(steps.last().copied(), Some(14));
    assert_eq!(months[0], Month::January);
    assert_eq!(months[11], Month::December);
    assert_eq!(months[12], Month::January);
}
