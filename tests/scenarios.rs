use gridflow::prelude::*;
use gridflow::testcases::{campus_network, standard_study, two_bus};

fn contingency(breaker: &str) -> ScenarioSpec {
    Scenario::Contingency {
        open_breaker: breaker.into(),
    }
    .into()
}

/// Two independent radial systems, each with its own source and breaker.
fn twin_feeders() -> Network {
    let mut net = Network::new("twin");
    for side in ["east", "west"] {
        let s = net.add_bus(Bus::new(format!("{side} S"), 12.0)).unwrap();
        let a = net.add_bus(Bus::new(format!("{side} A"), 12.0)).unwrap();
        let b = net.add_bus(Bus::new(format!("{side} B"), 12.0)).unwrap();
        net.add_source(Source::new(format!("{side} grid"), s, 1.0)).unwrap();
        let head = net.add_line(format!("{side} S-A"), s, a, LineModel::per_unit(0.01, 0.03)).unwrap();
        net.add_line(format!("{side} A-B"), a, b, LineModel::per_unit(0.02, 0.04)).unwrap();
        net.add_switch(Switch::new(
            format!("CB {side}"),
            s,
            SwitchElement::Line(head),
            SwitchKind::CircuitBreaker,
        ))
        .unwrap();
        net.add_load(Load::new(format!("{side} load A"), a, 0.8, 0.9)).unwrap();
        net.add_load(Load::new(format!("{side} load B"), b, 0.6, 0.95)).unwrap();
    }
    net
}

#[test]
fn test_two_bus_load_scale_sags() {
    let net = two_bus().unwrap();
    let config = PowerFlowConfig::default();
    let base = run_scenario(&net, &Scenario::Base.into(), &config).unwrap();
    let hot = run_scenario(&net, &Scenario::LoadScale { factor: 1.3 }.into(), &config).unwrap();

    let b1 = net.bus_id("B1").unwrap();
    assert_eq!(hot.status, ScenarioStatus::Converged);
    assert!(hot.bus(b1).vm_pu.unwrap() < base.bus(b1).vm_pu.unwrap());
    assert!((hot.total_load_mw - 2.6).abs() < 1e-9);
    // the caller's network is untouched
    assert!((net.total_demand_mva().re - 2.0).abs() < 1e-12);
}

#[test]
fn test_two_bus_open_breaker() {
    let net = two_bus().unwrap();
    let res = run_scenario(&net, &contingency("CB B1"), &PowerFlowConfig::default()).unwrap();

    assert_eq!(res.status, ScenarioStatus::DeEnergized);
    assert!(res.converged);
    let (s, b1) = (net.bus_id("S").unwrap(), net.bus_id("B1").unwrap());
    assert_eq!(res.bus(b1).vm_pu, None);
    assert_eq!(res.bus(b1).va_degree, None);
    assert_eq!(res.bus(s).vm_pu, Some(1.0));
    assert_eq!(res.iterations, 0);
    assert_eq!(res.total_load_mw, 0.0);
    assert_eq!(res.de_energized_buses().collect::<Vec<_>>(), vec![b1]);
}

#[test]
fn test_unknown_breaker_is_rejected() {
    let net = two_bus().unwrap();
    let err = run_scenario(&net, &contingency("CB B9"), &PowerFlowConfig::default()).unwrap_err();
    assert_eq!(
        err,
        StudyError::Network(NetworkError::UnknownIdentifier {
            kind: ElementKind::Switch,
            name: "CB B9".into(),
        })
    );
}

#[test]
fn test_contingency_leaves_other_islands_alone() {
    let net = twin_feeders();
    let engine = ScenarioEngine::new(net.clone(), PowerFlowConfig::default(), vec![contingency("CB east")])
        .unwrap();
    let results = engine.run().unwrap();
    let (base, outage) = (&results[0], &results[1]);
    assert_eq!(base.status, ScenarioStatus::Converged);
    assert_eq!(outage.status, ScenarioStatus::DeEnergized);

    for (id, bus) in net.buses() {
        let name = &bus.name;
        if name == "east S" {
            assert_eq!(outage.bus(id).vm_pu, Some(1.0));
        } else if name.starts_with("east") {
            assert_eq!(outage.bus(id).vm_pu, None, "{name}");
        } else {
            let (a, b) = (base.bus(id).vm_pu.unwrap(), outage.bus(id).vm_pu.unwrap());
            assert!((a - b).abs() < 1e-12, "{name}: {a} vs {b}");
        }
    }
    let west = net.source_id("west grid").unwrap();
    assert!((base.sources[west.0].p_mw - outage.sources[west.0].p_mw).abs() < 1e-9);
}

#[test]
fn test_campus_standard_study() {
    let engine = ScenarioEngine::from_study(campus_network().unwrap(), standard_study()).unwrap();
    let names: Vec<_> = engine.scenarios().map(|s| s.name.clone()).collect();
    assert_eq!(names, ["Base Case", "Heatwave Scenario", "Feeder A Outage"]);

    let results = engine.run().unwrap();
    let [base, heat, outage] = results.as_slice() else {
        panic!("expected three results, got {}", results.len());
    };

    assert_eq!(base.status, ScenarioStatus::Converged);
    assert_eq!(heat.status, ScenarioStatus::Converged);
    assert_eq!(outage.status, ScenarioStatus::DeEnergized);
    assert!(base.converged && heat.converged && outage.converged);
    for res in &results {
        assert!(res.iterations <= 15, "{}: {} iterations", res.scenario, res.iterations);
    }

    assert!((base.total_load_mw - 6.97).abs() < 1e-9);
    assert!((heat.total_load_mw - 6.97 * 1.3).abs() < 1e-9);
    assert!((outage.total_load_mw - 4.97).abs() < 1e-9);

    let (base_min, heat_min, outage_min) = (
        base.vm_min_pu().unwrap(),
        heat.vm_min_pu().unwrap(),
        outage.vm_min_pu().unwrap(),
    );
    assert!(heat_min < base_min);
    assert!(outage_min >= base_min);
    assert!((base.vm_max_pu().unwrap() - 1.02).abs() < 1e-3);
}

#[test]
fn test_campus_feeder_a_outage_footprint() {
    let net = campus_network().unwrap();
    let res = run_scenario(&net, &contingency("CB Feeder_A"), &PowerFlowConfig::default()).unwrap();

    let dark: Vec<String> = res
        .de_energized_buses()
        .map(|id| net.bus(id).name.clone())
        .collect();
    assert_eq!(dark.len(), 11);
    assert!(dark.contains(&"Feeder_A Head".to_owned()));
    assert!(dark.contains(&"LV - Bourns Hall".to_owned()));
    assert!(dark.iter().all(|name| !name.contains("Spieth")));

    let served = net
        .loads()
        .filter(|(_, load)| res.bus(load.bus).vm_pu.is_some())
        .count();
    assert_eq!(net.loads().len(), 24);
    assert_eq!(served, 19);

    let feeder_line = res.branch(net.branch_id("Feeder_A Feeder Line").unwrap());
    assert!(!feeder_line.energized);
    let feeder_b = res.branch(net.branch_id("Feeder_B Feeder Line").unwrap());
    assert!(feeder_b.energized && feeder_b.p_from_mw > 1.83);
}

#[test]
fn test_warm_start_study_matches_flat_start() {
    let net = campus_network().unwrap();
    let flat = ScenarioEngine::from_study(net.clone(), standard_study())
        .unwrap()
        .run()
        .unwrap();
    let mut study = standard_study();
    study.power_flow.warm_start = true;
    let warm = ScenarioEngine::from_study(net, study).unwrap().run().unwrap();

    for (f, w) in flat.iter().zip(&warm) {
        assert_eq!(f.status, w.status);
        for (a, b) in f.buses.iter().zip(&w.buses) {
            match (a.vm_pu, b.vm_pu) {
                (Some(a), Some(b)) => assert!((a - b).abs() < 1e-6),
                (a, b) => assert_eq!(a, b),
            }
        }
    }
    assert!(warm[1].iterations <= flat[1].iterations);
}

#[test]
fn test_study_json_drives_engine() {
    let study: StudyConfig = serde_json::from_str(
        r#"{"power_flow": {"max_it": 20, "tol": 1e-8},
            "scenarios": [{"name": "hot", "scenario": "load_scale", "factor": 1.3},
                          {"name": "trip", "scenario": "contingency", "open_breaker": "CB B1"}]}"#,
    )
    .unwrap();
    let engine = ScenarioEngine::from_study(two_bus().unwrap(), study).unwrap();
    let results = engine.run().unwrap();
    let statuses: Vec<_> = results.iter().map(|r| (r.scenario.as_str(), r.status)).collect();
    assert_eq!(
        statuses,
        [
            ("Base Case", ScenarioStatus::Converged),
            ("hot", ScenarioStatus::Converged),
            ("trip", ScenarioStatus::DeEnergized),
        ]
    );
}

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_run_matches_sequential() {
    let engine = ScenarioEngine::from_study(campus_network().unwrap(), standard_study()).unwrap();
    let sequential = engine.run().unwrap();
    let parallel = engine.run_parallel().unwrap();
    assert_eq!(sequential, parallel);
}

#[test]
fn test_opening_bus_coupler_drops_far_bus() {
    let mut net = Network::new("coupled");
    let s = net.add_bus(Bus::new("S", 12.0)).unwrap();
    let a = net.add_bus(Bus::new("A", 12.0)).unwrap();
    let b = net.add_bus(Bus::new("B", 12.0)).unwrap();
    net.add_source(Source::new("grid", s, 1.0)).unwrap();
    net.add_line("S-A", s, a, LineModel::per_unit(0.01, 0.03)).unwrap();
    net.add_switch(Switch::new("tie", a, SwitchElement::Bus(b), SwitchKind::Disconnector))
        .unwrap();
    net.add_load(Load::new("LA", a, 0.4, 0.9)).unwrap();
    net.add_load(Load::new("LB", b, 0.4, 0.9)).unwrap();

    let engine = ScenarioEngine::new(net, PowerFlowConfig::default(), vec![contingency("tie")]).unwrap();
    let results = engine.run().unwrap();
    let (base, open) = (&results[0], &results[1]);

    assert_eq!(base.status, ScenarioStatus::Converged);
    assert_eq!(base.bus(a).vm_pu, base.bus(b).vm_pu);
    assert!((base.total_load_mw - 0.8).abs() < 1e-12);

    assert_eq!(open.status, ScenarioStatus::DeEnergized);
    assert_eq!(open.bus(b).vm_pu, None);
    assert!(open.bus(a).vm_pu.unwrap() > base.bus(a).vm_pu.unwrap());
    assert!((open.total_load_mw - 0.4).abs() < 1e-12);
}

#[test]
fn test_two_sources_on_one_bus_fail_the_island() {
    let mut net = two_bus().unwrap();
    let s = net.bus_id("S").unwrap();
    net.add_source(Source::new("backup", s, 1.05)).unwrap();
    let res = run_scenario(&net, &Scenario::Base.into(), &PowerFlowConfig::default()).unwrap();

    assert_eq!(res.status, ScenarioStatus::Failed);
    assert!(!res.converged);
    assert_eq!(res.first_error(), Some(&SolveError::MultipleSources { count: 2 }));
    assert_eq!(res.bus(s).vm_pu, None);
    assert!(res.sources.iter().all(|src| src.p_mw == 0.0));
}
