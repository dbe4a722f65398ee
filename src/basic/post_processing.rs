//! Turns solved island voltages into per-element results.

mod res_display;
pub use res_display::{branch_table, bus_table, scenario_table};

use std::collections::HashMap;

use nalgebra::DVector;
use num_complex::Complex64;
use num_traits::Zero;

use super::elements::{BranchId, BranchKind, GND, StubOrigin};
use super::error::SolveError;
use super::network::Network;
use super::result::*;
use super::system::IslandSystem;
use super::topology::Topology;
use super::units::PuBase;

/// One island after solving; `solution` is present only when it converged.
pub(crate) struct SolvedIsland {
    pub result: IslandResult,
    pub solution: Option<(IslandSystem, DVector<Complex64>)>,
}

/// Per-unit currents flowing into a branch at its two terminals.
#[derive(Default)]
struct Terminals {
    i_from: Complex64,
    i_to: Complex64,
}

fn branch_flows(
    net: &Network,
    topo: &Topology,
    sys: &IslandSystem,
    v: &DVector<Complex64>,
    branches: &mut [BranchResult],
) {
    let local: HashMap<usize, usize> = sys.nodes.iter().enumerate().map(|(i, &n)| (n, i)).collect();
    let local_of = |bus: super::elements::BusId| topo.bus_node[bus.0].and_then(|n| local.get(&n).copied());

    let mut currents: HashMap<BranchId, Terminals> = HashMap::new();
    for stub in &sys.stubs {
        let StubOrigin::Branch(id) = stub.origin else {
            continue;
        };
        let from = local_of(net.branch(id).from);
        let a = stub.port.0[0] as usize;
        let y = stub.y.0;
        let t = currents.entry(id).or_default();
        if stub.port.0[1] == GND {
            if Some(a) == from {
                t.i_from += y * v[a];
            } else {
                t.i_to += y * v[a];
            }
        } else {
            // series stubs are always oriented from -> to
            let b = stub.port.0[1] as usize;
            let i = y * (v[a] - v[b]);
            t.i_from += i;
            t.i_to -= i;
        }
    }

    for (id, t) in currents {
        let br = net.branch(id);
        let (Some(f), Some(to)) = (local_of(br.from), local_of(br.to)) else {
            continue;
        };
        let s_from = v[f] * t.i_from.conj() * net.sn_mva;
        let s_to = v[to] * t.i_to.conj() * net.sn_mva;
        let i_from_ka = t.i_from.norm() * PuBase::new(net.sn_mva, net.bus(br.from).vn_kv).i_base_ka();
        let i_to_ka = t.i_to.norm() * PuBase::new(net.sn_mva, net.bus(br.to).vn_kv).i_base_ka();
        let loading_percent = match &br.kind {
            BranchKind::Line(model) => model
                .rating_ka()
                .map(|r| 100.0 * i_from_ka.max(i_to_ka) / r),
            BranchKind::Transformer(params) => {
                Some(100.0 * s_from.norm().max(s_to.norm()) / params.rating_mva())
            }
        };
        let res = &mut branches[id.0];
        res.p_from_mw = s_from.re;
        res.q_from_mvar = s_from.im;
        res.p_to_mw = s_to.re;
        res.q_to_mvar = s_to.im;
        res.pl_mw = s_from.re + s_to.re;
        res.ql_mvar = s_from.im + s_to.im;
        res.i_from_ka = i_from_ka;
        res.i_to_ka = i_to_ka;
        res.loading_percent = loading_percent;
        res.energized = true;
    }
}

/// Builds the scenario result from solved islands.
pub(crate) fn assemble_result(
    net: &Network,
    topo: &Topology,
    scenario: &str,
    solved: Vec<SolvedIsland>,
) -> SolveResult {
    let mut node_v: Vec<Option<Complex64>> = vec![None; topo.node_count()];
    let mut branches: Vec<BranchResult> = net
        .branches()
        .map(|(_, b)| BranchResult {
            name: b.name.clone(),
            ..Default::default()
        })
        .collect();
    let mut source_s = vec![Complex64::zero(); net.sources().len()];
    let mut iterations = 0;
    let mut islands = Vec::with_capacity(solved.len());

    for island in solved {
        match island.result.outcome {
            IslandOutcome::Converged { iterations: it, .. }
            | IslandOutcome::Failed(SolveError::DidNotConverge { iterations: it, .. }) => {
                iterations = iterations.max(it);
            }
            _ => {}
        }
        if let Some((sys, v)) = &island.solution {
            for (local, &node) in sys.nodes.iter().enumerate() {
                node_v[node] = Some(v[local]);
            }
            branch_flows(net, topo, sys, v, &mut branches);
            // the slack node's injection plus its own load is what the source delivers
            let s_calc = sys.injections(v)[sys.npq];
            if let Some(slack) = island.result.slack {
                source_s[slack.0] = (s_calc - sys.sbus[sys.npq]) * net.sn_mva;
            }
        }
        islands.push(island.result);
    }

    let mut buses: Vec<BusResult> = net
        .buses()
        .map(|(id, b)| {
            let node = topo.bus_node[id.0];
            let v = node.and_then(|n| node_v[n]);
            BusResult {
                name: b.name.clone(),
                vn_kv: b.vn_kv,
                island: node.map(|n| topo.node_island[n]),
                vm_pu: v.map(|v| v.norm()),
                va_degree: v.map(|v| v.arg().to_degrees()),
                p_mw: 0.0,
                q_mvar: 0.0,
            }
        })
        .collect();

    let mut total_load = Complex64::zero();
    for (_, load) in net.loads() {
        if !load.in_service || buses[load.bus.0].vm_pu.is_none() {
            continue;
        }
        let s = load.demand_mva();
        total_load += s;
        buses[load.bus.0].p_mw += s.re;
        buses[load.bus.0].q_mvar += s.im;
    }

    let mut total_source = Complex64::zero();
    let sources = net
        .sources()
        .map(|(id, src)| {
            let s = source_s[id.0];
            total_source += s;
            buses[src.bus.0].p_mw -= s.re;
            buses[src.bus.0].q_mvar -= s.im;
            SourceResult {
                name: src.name.clone(),
                p_mw: s.re,
                q_mvar: s.im,
            }
        })
        .collect();

    let violations = net
        .buses()
        .filter_map(|(id, bus)| {
            let vm = buses[id.0].vm_pu?;
            (!bus.vm_limit.contains(vm)).then(|| VoltageViolation {
                bus: id,
                name: bus.name.clone(),
                vm_pu: vm,
                min_vm_pu: bus.vm_limit.min,
                max_vm_pu: bus.vm_limit.max,
            })
        })
        .collect();

    let mut status = aggregate_status(&islands);
    // out-of-service buses belong to no island but are still left without supply
    if status == ScenarioStatus::Converged && buses.iter().any(|b| b.vm_pu.is_none()) {
        status = ScenarioStatus::DeEnergized;
    }
    let converged = islands
        .iter()
        .all(|i| !matches!(i.outcome, IslandOutcome::Failed(_)));

    SolveResult {
        scenario: scenario.to_owned(),
        status,
        converged,
        iterations,
        islands,
        buses,
        branches,
        sources,
        total_load_mw: total_load.re,
        total_load_mvar: total_load.im,
        total_source_mw: total_source.re,
        total_source_mvar: total_source.im,
        violations,
    }
}
