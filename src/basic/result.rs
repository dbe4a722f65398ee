//! Immutable solve results handed to reporters.

use derive_more::Display;
use ordered_float::OrderedFloat;
use serde::Serialize;

use super::elements::{BranchId, BusId, SourceId};
use super::error::SolveError;

/// Terminal status of one scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
pub enum ScenarioStatus {
    /// Every energized island converged and no bus lost supply.
    Converged,
    /// At least one island hit the iteration cap.
    DidNotConverge,
    /// Every energized island converged but some buses have no voltage, either
    /// because their island has no source or because they are out of service.
    DeEnergized,
    /// An island was ill-posed (singular system or several sources).
    Failed,
}

/// Outcome of solving one island.
#[derive(Debug, Clone, PartialEq)]
pub enum IslandOutcome {
    Converged { iterations: usize, max_mismatch: f64 },
    DeEnergized,
    Failed(SolveError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IslandResult {
    pub index: usize,
    pub buses: Vec<BusId>,
    pub slack: Option<SourceId>,
    pub outcome: IslandOutcome,
}

/// Per-bus operating point. Voltages are `None` when the bus is not energized
/// or its island failed to solve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusResult {
    pub name: String,
    pub vn_kv: f64,
    pub island: Option<usize>,
    pub vm_pu: Option<f64>,
    pub va_degree: Option<f64>,
    /// Net consumption at the bus: served load minus source output.
    pub p_mw: f64,
    pub q_mvar: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BranchResult {
    pub name: String,
    pub p_from_mw: f64,
    pub q_from_mvar: f64,
    pub p_to_mw: f64,
    pub q_to_mvar: f64,
    pub pl_mw: f64,
    pub ql_mvar: f64,
    pub i_from_ka: f64,
    pub i_to_ka: f64,
    /// Against `max_i_ka` for lines and `sn_mva` for transformers.
    pub loading_percent: Option<f64>,
    pub energized: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceResult {
    pub name: String,
    pub p_mw: f64,
    pub q_mvar: f64,
}

/// A solved bus voltage outside the bus's operating band.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoltageViolation {
    pub bus: BusId,
    pub name: String,
    pub vm_pu: f64,
    pub min_vm_pu: f64,
    pub max_vm_pu: f64,
}

/// Everything a reporter needs about one solved scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveResult {
    pub scenario: String,
    pub status: ScenarioStatus,
    /// True when every energized island converged.
    pub converged: bool,
    /// Largest iteration count over the solved islands.
    pub iterations: usize,
    pub islands: Vec<IslandResult>,
    /// Indexed by [`BusId`].
    pub buses: Vec<BusResult>,
    /// Indexed by [`BranchId`].
    pub branches: Vec<BranchResult>,
    /// Indexed by [`SourceId`].
    pub sources: Vec<SourceResult>,
    pub total_load_mw: f64,
    pub total_load_mvar: f64,
    pub total_source_mw: f64,
    pub total_source_mvar: f64,
    pub violations: Vec<VoltageViolation>,
}

impl SolveResult {
    pub fn bus(&self, id: BusId) -> &BusResult {
        &self.buses[id.0]
    }

    pub fn branch(&self, id: BranchId) -> &BranchResult {
        &self.branches[id.0]
    }

    fn energized_vm(&self) -> impl Iterator<Item = OrderedFloat<f64>> + '_ {
        self.buses.iter().filter_map(|b| b.vm_pu).map(OrderedFloat)
    }

    /// Lowest solved voltage magnitude, ignoring buses without a voltage.
    pub fn vm_min_pu(&self) -> Option<f64> {
        self.energized_vm().min().map(|v| v.0)
    }

    pub fn vm_max_pu(&self) -> Option<f64> {
        self.energized_vm().max().map(|v| v.0)
    }

    pub fn losses_mw(&self) -> f64 {
        self.total_source_mw - self.total_load_mw
    }

    pub fn losses_mvar(&self) -> f64 {
        self.total_source_mvar - self.total_load_mvar
    }

    /// Buses left without a voltage.
    pub fn de_energized_buses(&self) -> impl Iterator<Item = BusId> + '_ {
        self.buses
            .iter()
            .enumerate()
            .filter(|(_, b)| b.vm_pu.is_none())
            .map(|(i, _)| BusId(i))
    }

    /// The first error recorded on any island, if one failed.
    pub fn first_error(&self) -> Option<&SolveError> {
        self.islands.iter().find_map(|i| match &i.outcome {
            IslandOutcome::Failed(err) => Some(err),
            _ => None,
        })
    }
}

/// Scenario status implied by a set of island outcomes.
pub fn aggregate_status(islands: &[IslandResult]) -> ScenarioStatus {
    let mut status = ScenarioStatus::Converged;
    for island in islands {
        status = match (&island.outcome, status) {
            (_, ScenarioStatus::Failed) => ScenarioStatus::Failed,
            (IslandOutcome::Failed(SolveError::DidNotConverge { .. }), _) => {
                ScenarioStatus::DidNotConverge
            }
            (IslandOutcome::Failed(_), _) => ScenarioStatus::Failed,
            (_, ScenarioStatus::DidNotConverge) => ScenarioStatus::DidNotConverge,
            (IslandOutcome::DeEnergized, _) => ScenarioStatus::DeEnergized,
            (IslandOutcome::Converged { .. }, s) => s,
        };
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;

    fn island(outcome: IslandOutcome) -> IslandResult {
        IslandResult {
            index: 0,
            buses: vec![],
            slack: None,
            outcome,
        }
    }

    #[test]
    fn test_status_precedence() {
        let ok = island(IslandOutcome::Converged {
            iterations: 3,
            max_mismatch: 1e-9,
        });
        let dark = island(IslandOutcome::DeEnergized);
        let stuck = island(IslandOutcome::Failed(SolveError::DidNotConverge {
            iterations: 30,
            max_mismatch: 0.1,
        }));
        let bad = island(IslandOutcome::Failed(SolveError::MultipleSources { count: 2 }));

        assert_eq!(aggregate_status(&[ok.clone()]), ScenarioStatus::Converged);
        assert_eq!(aggregate_status(&[ok.clone(), dark.clone()]), ScenarioStatus::DeEnergized);
        assert_eq!(aggregate_status(&[dark.clone(), stuck.clone()]), ScenarioStatus::DidNotConverge);
        assert_eq!(aggregate_status(&[stuck.clone(), dark]), ScenarioStatus::DidNotConverge);
        assert_eq!(aggregate_status(&[bad, stuck, ok]), ScenarioStatus::Failed);
    }
}
