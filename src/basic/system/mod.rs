//! Per-island power flow system: Y-bus, net injections and the initial state.

mod admittance;

pub use admittance::create_y_bus;

use std::collections::HashMap;

use nalgebra::DVector;
use nalgebra_sparse::CscMatrix;
use num_complex::Complex64;
use tracing::debug;

use super::elements::{AdmittanceBranch, StubOrigin};
use super::error::SolveError;
use super::network::Network;
use super::topology::{Island, IslandSupply, Topology};
use super::units::PuBase;

/// Numerical model of one energized island.
///
/// Local node order puts every PQ node first and the slack node last.
#[derive(Debug, Clone)]
pub struct IslandSystem {
    /// Global topology node of each local index.
    pub nodes: Vec<usize>,
    pub npq: usize,
    pub ybus: CscMatrix<Complex64>,
    /// Specified complex injection per node, per-unit.
    pub sbus: DVector<Complex64>,
    pub v_init: DVector<Complex64>,
    /// Stubs with ports renumbered to local indices.
    pub stubs: Vec<AdmittanceBranch>,
}

/// Human-readable identifier of the element a stub came from.
pub fn origin_name(net: &Network, origin: StubOrigin) -> String {
    match origin {
        StubOrigin::Branch(id) => net.branch(id).name.clone(),
        StubOrigin::Switch(id) => net.switch(id).name.clone(),
    }
}

impl IslandSystem {
    /// Assembles the island's system for the network's current load levels.
    pub fn build(net: &Network, topo: &Topology, island: &Island) -> Result<Self, SolveError> {
        let (slack, slack_node) = match &island.supply {
            IslandSupply::Energized { slack, slack_node } => (*slack, *slack_node),
            IslandSupply::Faulted(err) => return Err(err.clone()),
            IslandSupply::DeEnergized => {
                return Err(SolveError::SingularSystem {
                    branch: None,
                    reason: "island has no slack reference".into(),
                });
            }
        };

        let mut nodes: Vec<usize> = island
            .nodes
            .iter()
            .copied()
            .filter(|&n| n != slack_node)
            .collect();
        nodes.push(slack_node);
        let npq = nodes.len() - 1;
        let local: HashMap<usize, i64> = nodes
            .iter()
            .enumerate()
            .map(|(i, &n)| (n, i as i64))
            .collect();
        let local_of_bus = |bus: crate::basic::elements::BusId| {
            topo.bus_node[bus.0].and_then(|n| local.get(&n).copied())
        };

        let mut stubs = Vec::new();
        for &id in &island.branches {
            let br = net.branch(id);
            let (Some(from), Some(to)) = (local_of_bus(br.from), local_of_bus(br.to)) else {
                continue;
            };
            let kv = (net.bus(br.from).vn_kv, net.bus(br.to).vn_kv);
            stubs.extend(br.to_admittance(id, (from, to), kv, net.sn_mva, net.f_hz));
        }
        for &id in &island.couplers {
            let sw = net.switch(id);
            let Some((a, b)) = sw.bus_pair() else { continue };
            let (Some(from), Some(to)) = (local_of_bus(a), local_of_bus(b)) else {
                continue;
            };
            let z_pu = PuBase::new(net.sn_mva, net.bus(a).vn_kv).z_to_pu(sw.z_ohm);
            stubs.push(AdmittanceBranch::series(
                Complex64::new(1.0 / z_pu, 0.0),
                from,
                to,
                StubOrigin::Switch(id),
            ));
        }

        if let Some(bad) = stubs.iter().find(|s| !s.y.0.is_finite()) {
            return Err(SolveError::SingularSystem {
                branch: Some(origin_name(net, bad.origin)),
                reason: "non-finite admittance".into(),
            });
        }

        let ybus = create_y_bus(nodes.len(), &stubs);

        let system = PuBase::new(net.sn_mva, 1.0);
        let mut sbus = DVector::zeros(nodes.len());
        for (_, load) in net.loads() {
            if !load.in_service {
                continue;
            }
            if let Some(i) = local_of_bus(load.bus) {
                let s = load.demand_mva();
                sbus[i as usize] -= Complex64::new(system.s_to_pu(s.re), system.s_to_pu(s.im));
            }
        }

        let mut v_init = DVector::from_element(nodes.len(), Complex64::new(1.0, 0.0));
        v_init[npq] = net.source(slack).voltage();

        debug!(
            island = island.index,
            nodes = nodes.len(),
            stubs = stubs.len(),
            nnz = ybus.nnz(),
            "island system assembled"
        );

        Ok(IslandSystem {
            nodes,
            npq,
            ybus,
            sbus,
            v_init,
            stubs,
        })
    }

    /// Replaces the flat start of PQ nodes with a previous operating point.
    ///
    /// `guess` is indexed by global topology node. The slack voltage is never
    /// overwritten.
    pub fn warm_start(&mut self, guess: &[Option<Complex64>]) {
        for (local, &node) in self.nodes.iter().enumerate().take(self.npq) {
            if let Some(Some(v)) = guess.get(node) {
                if v.is_finite() && v.norm() > 0.0 {
                    self.v_init[local] = *v;
                }
            }
        }
    }

    /// Complex power injected at every node for voltage `v`.
    pub fn injections(&self, v: &DVector<Complex64>) -> DVector<Complex64> {
        let ibus = &self.ybus * v;
        v.component_mul(&ibus.conjugate())
    }
}
