use gridflow::prelude::*;
use gridflow::testcases::{campus_network, two_bus};

fn solve(net: &Network) -> SolveResult {
    solve_network(net, "test", &PowerFlowConfig::default(), None)
}

#[test]
fn test_two_bus_base_case() {
    let net = two_bus().unwrap();
    let res = solve(&net);
    assert_eq!(res.status, ScenarioStatus::Converged);
    assert!(res.converged);

    let b1 = res.bus(net.bus_id("B1").unwrap()).vm_pu.unwrap();
    assert!(b1 < 1.0 && b1 > 0.9, "B1 at {b1}");
    assert!((res.total_load_mw - 2.0).abs() < 1e-12);
    // series resistance only: losses = |I|^2 R
    assert!(res.losses_mw() > 0.0);
    let line = res.branch(net.branch_id("S-B1").unwrap());
    assert!(line.energized);
    assert!((line.pl_mw - res.losses_mw()).abs() < 1e-5);
}

#[test]
fn test_slack_voltage_is_exact() {
    for net in [two_bus().unwrap(), campus_network().unwrap()] {
        let res = solve(&net);
        for (_, src) in net.sources() {
            let bus = res.bus(src.bus);
            assert_eq!(bus.vm_pu, Some(src.vm_pu));
            assert_eq!(bus.va_degree, Some(src.va_degree));
        }
    }
}

#[test]
fn test_slack_angle_is_kept() {
    let mut net = Network::new("shifted");
    let s = net.add_bus(Bus::new("S", 12.0)).unwrap();
    let a = net.add_bus(Bus::new("A", 12.0)).unwrap();
    net.add_source(Source::new("grid", s, 1.01).with_angle(-30.0)).unwrap();
    net.add_line("S-A", s, a, LineModel::per_unit(0.01, 0.03)).unwrap();
    net.add_load(Load::new("L", a, 1.0, 0.95)).unwrap();

    let res = solve(&net);
    let slack = res.bus(s);
    assert!((slack.vm_pu.unwrap() - 1.01).abs() < 1e-15);
    assert!((slack.va_degree.unwrap() + 30.0).abs() < 1e-12);
    assert!(res.bus(a).va_degree.unwrap() < -30.0);
}

#[test]
fn test_flat_start_is_idempotent() {
    let net = campus_network().unwrap();
    let first = solve(&net);
    let second = solve(&net);
    assert_eq!(first.iterations, second.iterations);
    for (a, b) in first.buses.iter().zip(&second.buses) {
        let (va, vb) = (a.vm_pu.unwrap(), b.vm_pu.unwrap());
        assert!((va - vb).abs() < 1e-12);
    }
}

#[test]
fn test_voltage_sags_with_load() {
    let base = campus_network().unwrap();
    let mut previous = solve(&base).vm_min_pu().unwrap();
    for factor in [1.1, 1.2, 1.3, 1.5] {
        let mut net = base.clone();
        net.scale_loads(factor).unwrap();
        let vm_min = solve(&net).vm_min_pu().unwrap();
        assert!(vm_min <= previous, "x{factor}: {vm_min} > {previous}");
        previous = vm_min;
    }
}

#[test]
fn test_campus_converges_quickly() {
    let net = campus_network().unwrap();
    let res = solve(&net);
    assert_eq!(res.status, ScenarioStatus::Converged);
    assert!(res.iterations <= 15);
    assert_eq!(res.islands.len(), 1);

    let vm_min = res.vm_min_pu().unwrap();
    let vm_max = res.vm_max_pu().unwrap();
    assert!(vm_min > 0.9 && vm_min < 1.02);
    assert!((vm_max - 1.02).abs() < 1e-3);
    assert!((res.total_load_mw - 6.97).abs() < 1e-9);
    assert!(res.total_source_mw > res.total_load_mw);
    assert!(res.violations.is_empty());
}

#[test]
fn test_transformer_flows_cross_voltage_levels() {
    let net = campus_network().unwrap();
    let res = solve(&net);
    let main = res.branch(net.branch_id("Main Substation Transformer").unwrap());
    assert!((main.p_from_mw - res.total_source_mw).abs() < 1e-6);
    assert!(main.p_to_mw < 0.0);
    // 40 MVA unit carrying ~7.5 MVA
    let loading = main.loading_percent.unwrap();
    assert!(loading > 15.0 && loading < 25.0, "loading {loading}");
    // HV current is smaller than LV current by about the voltage ratio
    assert!((main.i_to_ka / main.i_from_ka - 69.0 / 12.0).abs() < 0.5);

    let trafo = res.branch(net.branch_id("Trafo Bourns Hall").unwrap());
    assert!(trafo.p_from_mw > 0.45 && trafo.p_from_mw < 0.47);
    assert!((trafo.p_to_mw + 0.45).abs() < 1e-5);
}

#[test]
fn test_isolated_branch_has_no_flow() {
    let mut net = two_bus().unwrap();
    net.set_switch(net.switch_id("CB B1").unwrap(), false);
    let res = solve(&net);
    let line = res.branch(net.branch_id("S-B1").unwrap());
    assert!(!line.energized);
    assert_eq!(line.p_from_mw, 0.0);
    assert_eq!(line.loading_percent, None);
}

#[test]
fn test_iteration_cap_reports_did_not_converge() {
    let net = campus_network().unwrap();
    let config = PowerFlowConfig {
        max_it: Some(1),
        tol: Some(1e-14),
        ..Default::default()
    };
    let res = solve_network(&net, "capped", &config, None);
    assert_eq!(res.status, ScenarioStatus::DidNotConverge);
    assert!(!res.converged);
    assert_eq!(res.iterations, 1);
    assert!(res.buses.iter().all(|b| b.vm_pu.is_none()));
    assert!(matches!(
        res.first_error(),
        Some(SolveError::DidNotConverge { iterations: 1, .. })
    ));
}

#[test]
fn test_zero_impedance_transformer_is_singular() {
    let mut net = Network::new("bolted-trafo");
    let hv = net.add_bus(Bus::new("HV", 12.0)).unwrap();
    let lv = net.add_bus(Bus::new("LV", 0.48)).unwrap();
    net.add_source(Source::new("grid", hv, 1.0)).unwrap();
    net.add_transformer("T0", hv, lv, TransformerParams::new(1.0, 12.0, 0.48, 0.0, 0.0))
        .unwrap();
    net.add_load(Load::new("L", lv, 0.1, 0.9)).unwrap();

    let res = solve(&net);
    assert_eq!(res.status, ScenarioStatus::Failed);
    match res.first_error() {
        Some(SolveError::SingularSystem { branch, .. }) => assert_eq!(branch.as_deref(), Some("T0")),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_bolted_line_is_merged() {
    let mut net = Network::new("bolted");
    let s = net.add_bus(Bus::new("S", 12.0)).unwrap();
    let a = net.add_bus(Bus::new("A", 12.0)).unwrap();
    let b = net.add_bus(Bus::new("B", 12.0)).unwrap();
    net.add_source(Source::new("grid", s, 1.0)).unwrap();
    net.add_line("S-A", s, a, LineModel::per_unit(0.01, 0.03)).unwrap();
    net.add_line("A-B", a, b, LineModel::per_unit(0.0, 0.0)).unwrap();
    net.add_load(Load::new("L", b, 1.0, 0.9)).unwrap();

    let res = solve(&net);
    assert_eq!(res.status, ScenarioStatus::Converged);
    assert_eq!(res.bus(a).vm_pu, res.bus(b).vm_pu);
    assert!(!res.branch(net.branch_id("A-B").unwrap()).energized);
}

#[test]
fn test_out_of_service_bus_marks_scenario_de_energized() {
    let mut net = two_bus().unwrap();
    let spare = net.add_bus(Bus::new("spare", 12.0).out_of_service()).unwrap();
    let res = solve(&net);
    assert_eq!(res.status, ScenarioStatus::DeEnergized);
    assert!(res.converged);
    assert_eq!(res.de_energized_buses().collect::<Vec<_>>(), vec![spare]);
    assert!(res.bus(net.bus_id("B1").unwrap()).vm_pu.is_some());
}

#[test]
fn test_out_of_service_elements_are_skipped() {
    let mut net = two_bus().unwrap();
    let b1 = net.bus_id("B1").unwrap();
    let b2 = net.add_bus(Bus::new("B2", 12.0)).unwrap();
    let mut spur = Branch::new("B1-B2", b1, b2, BranchKind::Line(LineModel::per_unit(0.01, 0.03)));
    spur.in_service = false;
    net.add_branch(spur).unwrap();
    let mut idle = Load::new("L2", b1, 5.0, 0.9);
    idle.in_service = false;
    net.add_load(idle).unwrap();

    let res = solve(&net);
    assert_eq!(res.status, ScenarioStatus::DeEnergized);
    assert_eq!(res.bus(b2).vm_pu, None);
    assert!((res.total_load_mw - 2.0).abs() < 1e-12);
    assert!(!res.branch(net.branch_id("B1-B2").unwrap()).energized);
    assert_eq!(res.bus(b1).vm_pu, solve(&two_bus().unwrap()).bus(b1).vm_pu);
}
