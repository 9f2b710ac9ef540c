use lanternfly::{
    engine::{EngineBuilder, Iterations},
    network::Relation,
    scenario::ScenarioLoader,
    snapshot::{FinalSnapshot, NetworkStore},
    table::ResultTable,
    RunMode,
};

fn loader() -> ScenarioLoader {
    ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn scenario_loader_reads_fixture() {
    let scenario = loader().load("scenarios/tri_county.yaml").expect("scenario parses");
    assert_eq!(scenario.name, "tri_county");
    assert_eq!(scenario.counties.len(), 7);
    assert_eq!(scenario.iterations(None).get(), 24);
    assert_eq!(scenario.run_mode(None), RunMode::Baseline);
}

#[test]
fn fixture_network_is_built_tolerantly() {
    let scenario = loader().load("scenarios/tri_county.yaml").unwrap();
    let network = scenario.build_network();

    assert_eq!(network.counties.len(), 7);
    // the Cook-Lake edge is skipped
    assert_eq!(network.graph.edge_count(), 7);
    assert_eq!(
        network.graph.corridor("Peoria", "Cook").unwrap().relation,
        Relation::Interstate
    );
    assert!(network.neighbors.isolated().is_empty());

    let county = |name: &str| network.counties.get(name).unwrap();
    assert_eq!(county("Cook").toh_density, 0.8);
    assert_eq!(county("Kankakee").toh_density, 0.0);
    assert_eq!(county("Hardin").tree_density, 0.6);
    assert_eq!(county("Clark").tree_density, 0.4);
    assert_eq!(county("Cook").tree_density, 0.2);
}

#[test]
fn persisted_state_round_trips_after_a_run() {
    let scenario = loader().load("scenarios/tri_county.yaml").unwrap();
    let mut network = scenario.build_network();
    let settings = scenario.engine_settings(RunMode::Quarantine, scenario.seed, true);
    let mut engine = EngineBuilder::standard(settings).build();
    let table = engine
        .run(&mut network, Iterations::new(12).unwrap())
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let store = NetworkStore::new(dir.path()).with_prefix("tri_county_");
    store.save(&network).unwrap();
    let restored = store.load().unwrap();

    for corridor in network.graph.corridors() {
        let other = restored.graph.corridor(&corridor.a, &corridor.b).unwrap();
        assert_eq!(other, corridor);
    }
    for county in network.counties.iter() {
        let other = restored.counties.get(&county.name).unwrap();
        assert_eq!(other.saturation, county.saturation);
        assert_eq!(other.egg_population, county.egg_population);
        assert_eq!(other.quarantine, county.quarantine);
    }
    assert_eq!(restored.neighbors, network.neighbors);

    let output = dir.path().join("results.json");
    table.export(&output).unwrap();
    let reread: ResultTable =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(reread, table);

    let snapshot = FinalSnapshot::capture(&scenario.name, RunMode::Quarantine, 12, &network);
    let path = snapshot.write(dir.path()).unwrap();
    let data = std::fs::read_to_string(path).unwrap();
    assert!(data.contains("\"scenario\": \"tri_county\""));
    assert!(data.contains("\"run_mode\": \"Quarantine\""));
}
