//! Scenario engine.
//!
//! A scenario is a small delta over an immutable base network. Each run
//! realizes its delta on a private clone of the base, so scenarios never
//! observe each other's changes and can be solved concurrently.

use derive_more::Display;
use nalgebra::Complex;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::elements::SwitchId;
use super::error::{ElementKind, NetworkError, NetworkResult, StudyError};
use super::network::Network;
use super::newtonpf::{PowerFlowConfig, newton_pf};
use super::post_processing::{SolvedIsland, assemble_result};
use super::result::{IslandOutcome, IslandResult, ScenarioStatus, SolveResult};
use super::solver::DefaultSolver;
use super::system::IslandSystem;
use super::topology::{IslandSupply, Topology, resolve};

/// A model variant to solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scenario", rename_all = "snake_case")]
pub enum Scenario {
    /// The network as defined.
    Base,
    /// Every load's scaling multiplied by `factor`.
    LoadScale { factor: f64 },
    /// One named breaker forced open.
    Contingency { open_breaker: String },
}

impl Scenario {
    pub fn default_name(&self) -> String {
        match self {
            Scenario::Base => "Base Case".to_owned(),
            Scenario::LoadScale { factor } => format!("Load x{factor}"),
            Scenario::Contingency { open_breaker } => format!("Open {open_breaker}"),
        }
    }

    /// Resolves the scenario against `net` without modifying it.
    pub fn delta(&self, net: &Network) -> NetworkResult<NetworkDelta> {
        match self {
            Scenario::Base => Ok(NetworkDelta::default()),
            Scenario::LoadScale { factor } => {
                if !(*factor > 0.0 && factor.is_finite()) {
                    return Err(NetworkError::invalid(
                        ElementKind::Load,
                        "*",
                        format!("load_scale factor must be positive, got {factor}"),
                    ));
                }
                Ok(NetworkDelta {
                    load_scale: *factor,
                    ..Default::default()
                })
            }
            Scenario::Contingency { open_breaker } => {
                let id = net.switch_id(open_breaker)?;
                Ok(NetworkDelta {
                    open_switches: vec![id],
                    ..Default::default()
                })
            }
        }
    }
}

/// A named scenario as it appears in a study definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub name: String,
    #[serde(flatten)]
    pub scenario: Scenario,
}

impl From<Scenario> for ScenarioSpec {
    fn from(scenario: Scenario) -> Self {
        ScenarioSpec {
            name: scenario.default_name(),
            scenario,
        }
    }
}

/// Changes a scenario applies on top of the base network.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkDelta {
    pub load_scale: f64,
    pub open_switches: Vec<SwitchId>,
}

impl Default for NetworkDelta {
    fn default() -> Self {
        Self {
            load_scale: 1.0,
            open_switches: Vec::new(),
        }
    }
}

impl NetworkDelta {
    /// Produces an owned snapshot of `base` with the delta applied.
    pub fn apply(&self, base: &Network) -> NetworkResult<Network> {
        let mut net = base.clone();
        if self.load_scale != 1.0 {
            net.scale_loads(self.load_scale)?;
        }
        for &id in &self.open_switches {
            net.set_switch(id, false);
        }
        Ok(net)
    }
}

/// Lifecycle of one scenario run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ScenarioState {
    Configured,
    Built,
    Solving,
    Converged,
    DidNotConverge,
    DeEnergized,
    Failed,
}

impl ScenarioState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScenarioState::Converged
                | ScenarioState::DidNotConverge
                | ScenarioState::DeEnergized
                | ScenarioState::Failed
        )
    }

    pub fn can_advance_to(&self, next: ScenarioState) -> bool {
        use ScenarioState::*;
        match (self, next) {
            (Configured, Built) | (Built, Solving) => true,
            (Solving, n) => n.is_terminal(),
            _ => false,
        }
    }
}

impl From<ScenarioStatus> for ScenarioState {
    fn from(status: ScenarioStatus) -> Self {
        match status {
            ScenarioStatus::Converged => ScenarioState::Converged,
            ScenarioStatus::DidNotConverge => ScenarioState::DidNotConverge,
            ScenarioStatus::DeEnergized => ScenarioState::DeEnergized,
            ScenarioStatus::Failed => ScenarioState::Failed,
        }
    }
}

/// A scenario tracked through its lifecycle.
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    pub spec: ScenarioSpec,
    state: ScenarioState,
}

impl ScenarioRun {
    pub fn new(spec: ScenarioSpec) -> Self {
        Self {
            spec,
            state: ScenarioState::Configured,
        }
    }

    pub fn state(&self) -> ScenarioState {
        self.state
    }

    pub fn advance(&mut self, next: ScenarioState) -> Result<(), StudyError> {
        if !self.state.can_advance_to(next) {
            return Err(StudyError::IllegalTransition {
                scenario: self.spec.name.clone(),
                from: self.state,
                to: next,
            });
        }
        debug!(scenario = %self.spec.name, from = %self.state, to = %next, "scenario transition");
        self.state = next;
        Ok(())
    }
}

/// A power flow study: solver options plus the scenarios to run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudyConfig {
    #[serde(default)]
    pub power_flow: PowerFlowConfig,
    #[serde(default)]
    pub scenarios: Vec<ScenarioSpec>,
}

/// Voltage guess per topology node taken from an earlier result.
fn warm_start_guess(topo: &Topology, previous: &SolveResult) -> Vec<Option<Complex64>> {
    topo.node_buses
        .iter()
        .map(|buses| {
            let bus = previous.buses.get(buses.first()?.0)?;
            Some(Complex::from_polar(bus.vm_pu?, bus.va_degree?.to_radians()))
        })
        .collect()
}

/// Resolves and solves every island of an already-perturbed snapshot.
pub fn solve_network(
    net: &Network,
    name: &str,
    config: &PowerFlowConfig,
    warm: Option<&SolveResult>,
) -> SolveResult {
    let topo = resolve(net, config.zero_impedance_threshold_pu);
    let guess = warm.map(|prev| warm_start_guess(&topo, prev));
    let mut solver = DefaultSolver::default();

    let solved = topo
        .islands
        .iter()
        .map(|island| {
            let slack = match &island.supply {
                IslandSupply::Energized { slack, .. } => Some(*slack),
                _ => None,
            };
            let (outcome, solution) = match &island.supply {
                IslandSupply::DeEnergized => (IslandOutcome::DeEnergized, None),
                IslandSupply::Faulted(err) => (IslandOutcome::Failed(err.clone()), None),
                IslandSupply::Energized { .. } => match IslandSystem::build(net, &topo, island) {
                    Err(err) => (IslandOutcome::Failed(err), None),
                    Ok(mut sys) => {
                        if let Some(guess) = &guess {
                            sys.warm_start(guess);
                        }
                        match newton_pf(
                            &sys.ybus,
                            &sys.sbus,
                            &sys.v_init,
                            sys.npq,
                            config.tol(),
                            config.max_it(),
                            &mut solver,
                        ) {
                            Ok(sol) => (
                                IslandOutcome::Converged {
                                    iterations: sol.iterations,
                                    max_mismatch: sol.max_mismatch,
                                },
                                Some((sys, sol.v)),
                            ),
                            Err((err, _)) => (IslandOutcome::Failed(err), None),
                        }
                    }
                },
            };
            if let IslandOutcome::Failed(err) = &outcome {
                warn!(scenario = name, island = island.index, %err, "island not solved");
            }
            SolvedIsland {
                result: IslandResult {
                    index: island.index,
                    buses: island.buses.clone(),
                    slack,
                    outcome,
                },
                solution,
            }
        })
        .collect();

    assemble_result(net, &topo, name, solved)
}

fn execute(
    base: &Network,
    spec: &ScenarioSpec,
    delta: &NetworkDelta,
    config: &PowerFlowConfig,
    warm: Option<&SolveResult>,
) -> Result<SolveResult, StudyError> {
    let mut run = ScenarioRun::new(spec.clone());
    let snapshot = delta.apply(base)?;
    run.advance(ScenarioState::Built)?;
    run.advance(ScenarioState::Solving)?;
    let result = solve_network(&snapshot, &spec.name, config, warm);
    run.advance(result.status.into())?;

    info!(
        scenario = %spec.name,
        status = %result.status,
        iterations = result.iterations,
        load_mw = result.total_load_mw,
        "scenario finished"
    );
    if result.status == ScenarioStatus::DeEnergized {
        warn!(
            scenario = %spec.name,
            buses = result.de_energized_buses().count(),
            "scenario leaves buses without supply"
        );
    }
    Ok(result)
}

/// Solves one scenario against `network`, leaving `network` untouched.
pub fn run_scenario(
    network: &Network,
    spec: &ScenarioSpec,
    config: &PowerFlowConfig,
) -> Result<SolveResult, StudyError> {
    let delta = spec.scenario.delta(network)?;
    execute(network, spec, &delta, config, None)
}

/// Runs a list of scenarios over one base network.
#[derive(Debug, Clone)]
pub struct ScenarioEngine {
    base: Network,
    config: PowerFlowConfig,
    planned: Vec<(ScenarioSpec, NetworkDelta)>,
}

impl ScenarioEngine {
    /// Validates every scenario against `base`.
    ///
    /// A base case is prepended unless one is already declared. Fails on the
    /// first scenario that references an unknown breaker or carries an invalid
    /// factor.
    pub fn new(
        base: Network,
        config: PowerFlowConfig,
        scenarios: impl IntoIterator<Item = ScenarioSpec>,
    ) -> NetworkResult<Self> {
        let mut specs: Vec<ScenarioSpec> = scenarios.into_iter().collect();
        if !specs.iter().any(|s| s.scenario == Scenario::Base) {
            specs.insert(0, Scenario::Base.into());
        }
        let planned = specs
            .into_iter()
            .map(|spec| {
                let delta = spec.scenario.delta(&base)?;
                Ok((spec, delta))
            })
            .collect::<NetworkResult<Vec<_>>>()?;
        Ok(Self {
            base,
            config,
            planned,
        })
    }

    pub fn from_study(base: Network, study: StudyConfig) -> NetworkResult<Self> {
        Self::new(base, study.power_flow, study.scenarios)
    }

    pub fn base(&self) -> &Network {
        &self.base
    }

    pub fn scenarios(&self) -> impl Iterator<Item = &ScenarioSpec> {
        self.planned.iter().map(|(spec, _)| spec)
    }

    fn base_index(&self) -> Option<usize> {
        self.planned
            .iter()
            .position(|(spec, _)| spec.scenario == Scenario::Base)
    }

    /// The base case result used as starting point, when warm start is on.
    fn warm_start_result(&self) -> Result<Option<SolveResult>, StudyError> {
        if !self.config.warm_start {
            return Ok(None);
        }
        match self.base_index() {
            Some(i) => {
                let (spec, delta) = &self.planned[i];
                execute(&self.base, spec, delta, &self.config, None).map(Some)
            }
            None => Ok(None),
        }
    }

    fn run_one(
        &self,
        index: usize,
        warm: Option<&SolveResult>,
    ) -> Result<SolveResult, StudyError> {
        let (spec, delta) = &self.planned[index];
        if Some(index) == self.base_index() {
            if let Some(done) = warm {
                return Ok(done.clone());
            }
        }
        execute(&self.base, spec, delta, &self.config, warm)
    }

    /// Runs every scenario in declaration order on the calling thread.
    pub fn run(&self) -> Result<Vec<SolveResult>, StudyError> {
        let warm = self.warm_start_result()?;
        (0..self.planned.len())
            .map(|i| self.run_one(i, warm.as_ref()))
            .collect()
    }

    /// Same results as [`ScenarioEngine::run`], solved on the rayon pool.
    #[cfg(feature = "parallel")]
    pub fn run_parallel(&self) -> Result<Vec<SolveResult>, StudyError> {
        use rayon::prelude::*;

        let warm = self.warm_start_result()?;
        (0..self.planned.len())
            .into_par_iter()
            .map(|i| self.run_one(i, warm.as_ref()))
            .collect()
    }
}
