use serde::{Deserialize, Serialize};

use super::{BranchId, BusId};

/// Switching device class, named as in pandapower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SwitchKind {
    #[default]
    #[serde(rename = "CB")]
    CircuitBreaker,
    #[serde(rename = "LBS")]
    LoadBreakSwitch,
    #[serde(rename = "DS")]
    Disconnector,
}

/// What the switch connects its bus to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchElement {
    /// Bus-bus coupler.
    Bus(BusId),
    /// Sits at the `bus` end of a line.
    Line(BranchId),
    /// Sits at the `bus` end of a transformer.
    Transformer(BranchId),
}

impl SwitchElement {
    pub fn branch(&self) -> Option<BranchId> {
        match self {
            SwitchElement::Bus(_) => None,
            SwitchElement::Line(b) | SwitchElement::Transformer(b) => Some(*b),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Switch {
    pub name: String,
    pub bus: BusId,
    pub element: SwitchElement,
    pub kind: SwitchKind,
    pub closed: bool,
    /// Contact resistance of a bus-bus switch. Zero means the buses are merged.
    pub z_ohm: f64,
}

impl Switch {
    pub fn new(name: impl Into<String>, bus: BusId, element: SwitchElement, kind: SwitchKind) -> Self {
        Self {
            name: name.into(),
            bus,
            element,
            kind,
            closed: true,
            z_ohm: 0.0,
        }
    }

    pub fn open(mut self) -> Self {
        self.closed = false;
        self
    }

    pub fn with_impedance(mut self, z_ohm: f64) -> Self {
        self.z_ohm = z_ohm;
        self
    }

    /// The bus on the far side of a closed bus-bus switch.
    pub fn bus_pair(&self) -> Option<(BusId, BusId)> {
        match self.element {
            SwitchElement::Bus(other) => Some((self.bus, other)),
            _ => None,
        }
    }

    /// Whether a closed bus-bus switch joins its buses without impedance.
    pub fn is_ideal_coupler(&self) -> bool {
        self.closed && self.z_ohm == 0.0 && self.bus_pair().is_some()
    }

    /// Whether this switch, when open, takes a branch out of the topology.
    pub fn isolates(&self, branch: BranchId) -> bool {
        !self.closed && self.element.branch() == Some(branch)
    }
}
