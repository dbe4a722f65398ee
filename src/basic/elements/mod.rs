mod branch;
mod bus;
mod line;
mod load;
mod source;
mod switch;
mod trans;

pub use branch::*;
pub use bus::*;
pub use line::*;
pub use load::*;
pub use source::*;
pub use switch::*;
pub use trans::*;

use derive_more::{Deref, DerefMut, Display, From};
use nalgebra::Complex;
use serde::{Deserialize, Serialize};

macro_rules! define_handle {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            Deref,
            From,
            Display,
            Serialize,
            Deserialize,
        )]
        pub struct $name(pub usize);
    };
}

define_handle!(BusId, "Stable handle of a bus inside its network arena.");
define_handle!(SourceId, "Stable handle of an external grid source.");
define_handle!(BranchId, "Stable handle of a line or transformer.");
define_handle!(SwitchId, "Stable handle of a switch or breaker.");
define_handle!(LoadId, "Stable handle of a load.");

/// Represents the ground node in port pairs.
pub const GND: i64 = -1;

/// Per-unit admittance value on the system power base.
#[derive(Clone, Copy, Default, PartialEq, Debug, Deref, DerefMut)]
pub struct Admittance(pub Complex<f64>);

/// Two terminals of an admittance stub. A terminal equal to [`GND`] means the
/// stub is a shunt to ground.
#[derive(Deref, DerefMut, Default, Debug, Clone, Copy, PartialEq)]
pub struct Port2(pub nalgebra::Vector2<i64>);

impl Port2 {
    pub fn new(a: i64, b: i64) -> Self {
        Port2(nalgebra::vector![a, b])
    }

    pub fn to_ground(a: i64) -> Self {
        Port2::new(a, GND)
    }

    pub fn is_shunt(&self) -> bool {
        self.0[1] == GND
    }
}

/// Element an admittance stub was expanded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StubOrigin {
    Branch(BranchId),
    Switch(SwitchId),
}

/// A branch with admittance and port information.
///
/// Lines, transformers and impedance switches all expand into one or more of
/// these; the Y-bus is assembled from the stubs alone. Ports refer to bus
/// indices until the topology resolver renumbers them into island nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct AdmittanceBranch {
    pub y: Admittance,
    pub port: Port2,
    pub origin: StubOrigin,
}

impl AdmittanceBranch {
    pub fn series(y: Complex<f64>, from: i64, to: i64, origin: StubOrigin) -> Self {
        Self {
            y: Admittance(y),
            port: Port2::new(from, to),
            origin,
        }
    }

    pub fn shunt(y: Complex<f64>, at: i64, origin: StubOrigin) -> Self {
        Self {
            y: Admittance(y),
            port: Port2::to_ground(at),
            origin,
        }
    }
}
