pub(crate) mod dsbus_dv;
pub mod elements;
pub mod error;
pub mod network;
pub mod newtonpf;
pub mod post_processing;
pub mod result;
pub mod scenario;
pub mod solver;
pub(crate) mod sparse;
pub mod system;
pub mod topology;
pub mod units;

pub use newtonpf::{PowerFlowConfig, newton_pf};
