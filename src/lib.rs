//! Steady-state AC power flow for multi-voltage distribution networks.
//!
//! A [`Network`](prelude::Network) is assembled from typed elements, resolved
//! into islands according to its switch states, and solved per island with a
//! sparse Newton-Raphson method. The [`ScenarioEngine`](prelude::ScenarioEngine)
//! runs base, load-scaling and N-1 breaker scenarios over independent
//! snapshots of one base network.

mod basic;
pub mod io;
pub mod testcases;

pub mod prelude {
    use crate::basic;
    pub use crate::io::{
        LoadError, NetworkDefinition, build_network, load_network_json, load_study_json,
        network_from_json_str,
    };
    pub use basic::elements::*;
    pub use basic::error::*;
    pub use basic::network::Network;
    pub use basic::post_processing::{branch_table, bus_table, scenario_table};
    pub use basic::result::*;
    pub use basic::scenario::*;
    pub use basic::solver::{DefaultSolver, RSparseSolver, Solve};
    pub use basic::system::IslandSystem;
    pub use basic::topology::{Island, IslandSupply, NodeMerge, Topology, resolve};
    pub use basic::units::*;
    pub use basic::{PowerFlowConfig, newton_pf};
}
