//! Reference networks used by the tests and the demo.

use crate::basic::elements::*;
use crate::basic::error::NetworkResult;
use crate::basic::network::Network;
use crate::basic::newtonpf::PowerFlowConfig;
use crate::basic::scenario::{Scenario, ScenarioSpec, StudyConfig};

/// Source bus `S` at 1.0 pu feeding bus `B1` over `0.01 + j0.03` pu through
/// breaker `CB B1`; `B1` carries a 2 MW load at 0.9 power factor.
pub fn two_bus() -> NetworkResult<Network> {
    let mut net = Network::new("two-bus");
    let s = net.add_bus(Bus::new("S", 12.0))?;
    let b1 = net.add_bus(Bus::new("B1", 12.0))?;
    net.add_source(Source::new("grid", s, 1.0))?;
    let line = net.add_line("S-B1", s, b1, LineModel::per_unit(0.01, 0.03))?;
    net.add_switch(Switch::new(
        "CB B1",
        s,
        SwitchElement::Line(line),
        SwitchKind::CircuitBreaker,
    ))?;
    net.add_load(Load::new("L1", b1, 2.0, 0.9))?;
    Ok(net)
}

/// Building name, demand in MW and lagging power factor, per feeder.
pub const CAMPUS_FEEDERS: [(&str, &[(&str, f64, f64)]); 4] = [
    (
        "Feeder_A",
        &[
            ("Bourns Hall", 0.45, 0.90),
            ("Winston Chung Hall", 0.40, 0.90),
            ("Physics 2000", 0.35, 0.92),
            ("Materials Sci & Eng", 0.30, 0.90),
            ("Multidisciplinary Research Bldg", 0.50, 0.88),
        ],
    ),
    (
        "Feeder_B",
        &[
            ("Spieth Hall", 0.30, 0.90),
            ("Batchelor Hall", 0.35, 0.90),
            ("Life Sciences", 0.25, 0.95),
            ("School of Medicine Ed", 0.40, 0.90),
            ("Genomics Building", 0.38, 0.89),
            ("Greenhouse Operations", 0.15, 0.95),
        ],
    ),
    (
        "Feeder_C",
        &[
            ("Hinderaker Hall", 0.15, 0.95),
            ("Rivera Library", 0.25, 0.92),
            ("Orbach Science Library", 0.30, 0.92),
            ("Highlander Union (HUB)", 0.35, 0.95),
            ("Student Services Bldg", 0.15, 0.95),
            ("Humanities & Social Sci", 0.20, 0.95),
            ("Arts Building", 0.12, 0.95),
        ],
    ),
    (
        "Feeder_D",
        &[
            ("Aberdeen-Inverness", 0.25, 0.98),
            ("Lothian Hall", 0.25, 0.98),
            ("Pentland Hills", 0.20, 0.98),
            ("Dundee Hall", 0.22, 0.98),
            ("Glen Mor", 0.30, 0.98),
            ("North District", 0.40, 0.98),
        ],
    ),
];

/// University campus: 69 kV utility supply, a 40 MVA substation and four
/// radial 12 kV feeders of 0.48 kV buildings.
///
/// Each feeder leaves the campus bus through breaker `CB <feeder>`; each
/// building transformer sits behind load-break switch `Fuse <building>`.
pub fn campus_network() -> NetworkResult<Network> {
    let mut net = Network::new("campus");

    let utility = net.add_bus(Bus::new("RPU Grid", 69.0))?;
    net.add_source(Source::new("RPU", utility, 1.02))?;
    let campus = net.add_bus(Bus::new("Campus Main Bus", 12.0))?;
    net.add_transformer(
        "Main Substation Transformer",
        utility,
        campus,
        TransformerParams::new(40.0, 69.0, 12.0, 12.0, 0.3).with_core_losses(30.0, 0.1),
    )?;

    for (feeder, buildings) in CAMPUS_FEEDERS {
        let head = net.add_bus(Bus::new(format!("{feeder} Head"), 12.0))?;
        let feeder_line = net.add_line(
            format!("{feeder} Feeder Line"),
            campus,
            head,
            LineModel::Physical(LineParams::new(0.01, 0.01, 0.01).with_rating(1.0)),
        )?;
        net.add_switch(Switch::new(
            format!("CB {feeder}"),
            campus,
            SwitchElement::Line(feeder_line),
            SwitchKind::CircuitBreaker,
        ))?;

        let mut previous = head;
        for &(building, p_mw, pf) in buildings {
            let mv = net.add_bus(Bus::new(format!("MV - {building}"), 12.0))?;
            net.add_line(
                format!("Line to {building}"),
                previous,
                mv,
                LineModel::Physical(
                    LineParams::new(0.3, 0.16, 0.12)
                        .with_capacitance(250.0)
                        .with_rating(0.4),
                ),
            )?;
            let lv = net.add_bus(Bus::new(format!("LV - {building}"), 0.48))?;
            let trafo = net.add_transformer(
                format!("Trafo {building}"),
                mv,
                lv,
                TransformerParams::new(1.5, 12.0, 0.48, 5.0, 1.0).with_core_losses(2.0, 0.4),
            )?;
            net.add_switch(Switch::new(
                format!("Fuse {building}"),
                mv,
                SwitchElement::Transformer(trafo),
                SwitchKind::LoadBreakSwitch,
            ))?;
            net.add_load(Load::new(building, lv, p_mw, pf))?;
            previous = mv;
        }
    }
    Ok(net)
}

/// Base case, a 30 % heatwave load increase and the loss of Feeder A.
pub fn standard_study() -> StudyConfig {
    StudyConfig {
        power_flow: PowerFlowConfig::default(),
        scenarios: vec![
            ScenarioSpec {
                name: "Base Case".into(),
                scenario: Scenario::Base,
            },
            ScenarioSpec {
                name: "Heatwave Scenario".into(),
                scenario: Scenario::LoadScale { factor: 1.3 },
            },
            ScenarioSpec {
                name: "Feeder A Outage".into(),
                scenario: Scenario::Contingency {
                    open_breaker: "CB Feeder_A".into(),
                },
            },
        ],
    }
}
