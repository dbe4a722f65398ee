//! Element registry.
//!
//! Every element lives in a per-kind arena and is addressed by a typed handle.
//! Names are unique per kind and are the identifiers used by scenario
//! definitions and error messages.

use std::collections::HashMap;

use super::elements::*;
use super::error::{ElementKind, NetworkError, NetworkResult};

/// Default system power base, as in pandapower.
pub const DEFAULT_SN_MVA: f64 = 1.0;
pub const DEFAULT_F_HZ: f64 = 50.0;

/// An owned, self-contained network model.
///
/// Cloning a `Network` yields an independent snapshot; scenarios are solved on
/// such snapshots so no state is shared between concurrent solves.
#[derive(Debug, Clone)]
pub struct Network {
    pub name: String,
    /// System power base in MVA.
    pub sn_mva: f64,
    pub f_hz: f64,
    buses: Vec<Bus>,
    sources: Vec<Source>,
    branches: Vec<Branch>,
    switches: Vec<Switch>,
    loads: Vec<Load>,
    bus_names: HashMap<String, BusId>,
    source_names: HashMap<String, SourceId>,
    branch_names: HashMap<String, BranchId>,
    switch_names: HashMap<String, SwitchId>,
    load_names: HashMap<String, LoadId>,
}

impl Default for Network {
    fn default() -> Self {
        Network::new("network")
    }
}

fn claim_name<Id: Copy>(
    names: &mut HashMap<String, Id>,
    kind: ElementKind,
    name: &str,
    id: Id,
) -> NetworkResult<()> {
    if names.contains_key(name) {
        return Err(NetworkError::DuplicateIdentifier {
            kind,
            name: name.to_owned(),
        });
    }
    names.insert(name.to_owned(), id);
    Ok(())
}

fn lookup<Id: Copy>(names: &HashMap<String, Id>, kind: ElementKind, name: &str) -> NetworkResult<Id> {
    names
        .get(name)
        .copied()
        .ok_or_else(|| NetworkError::unknown(kind, name))
}

impl Network {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sn_mva: DEFAULT_SN_MVA,
            f_hz: DEFAULT_F_HZ,
            buses: Vec::new(),
            sources: Vec::new(),
            branches: Vec::new(),
            switches: Vec::new(),
            loads: Vec::new(),
            bus_names: HashMap::new(),
            source_names: HashMap::new(),
            branch_names: HashMap::new(),
            switch_names: HashMap::new(),
            load_names: HashMap::new(),
        }
    }

    /// Sets the system power base and frequency. Only valid on an empty
    /// network, since per-unit values of existing elements depend on them.
    pub fn with_base(mut self, sn_mva: f64, f_hz: f64) -> NetworkResult<Self> {
        if !(sn_mva > 0.0 && sn_mva.is_finite()) {
            return Err(NetworkError::invalid(
                ElementKind::Network,
                &self.name,
                format!("system base must be positive, got {sn_mva} MVA"),
            ));
        }
        if !(f_hz > 0.0 && f_hz.is_finite()) {
            return Err(NetworkError::invalid(
                ElementKind::Network,
                &self.name,
                format!("frequency must be positive, got {f_hz} Hz"),
            ));
        }
        self.sn_mva = sn_mva;
        self.f_hz = f_hz;
        Ok(self)
    }

    fn check_bus(&self, id: BusId, owner_kind: ElementKind, owner: &str) -> NetworkResult<()> {
        if id.0 < self.buses.len() {
            Ok(())
        } else {
            Err(NetworkError::UnknownIdentifier {
                kind: ElementKind::Bus,
                name: format!("#{id} (referenced by {owner_kind} '{owner}')"),
            })
        }
    }

    pub fn add_bus(&mut self, bus: Bus) -> NetworkResult<BusId> {
        if !(bus.vn_kv > 0.0 && bus.vn_kv.is_finite()) {
            return Err(NetworkError::invalid(
                ElementKind::Bus,
                &bus.name,
                format!("vn_kv must be positive, got {}", bus.vn_kv),
            ));
        }
        if !(bus.vm_limit.min <= bus.vm_limit.max) {
            return Err(NetworkError::invalid(
                ElementKind::Bus,
                &bus.name,
                "min_vm_pu exceeds max_vm_pu",
            ));
        }
        let id = BusId(self.buses.len());
        claim_name(&mut self.bus_names, ElementKind::Bus, &bus.name, id)?;
        self.buses.push(bus);
        Ok(id)
    }

    pub fn add_source(&mut self, source: Source) -> NetworkResult<SourceId> {
        self.check_bus(source.bus, ElementKind::Source, &source.name)?;
        if !(source.vm_pu > 0.0 && source.vm_pu.is_finite() && source.va_degree.is_finite()) {
            return Err(NetworkError::invalid(
                ElementKind::Source,
                &source.name,
                format!("vm_pu must be positive, got {}", source.vm_pu),
            ));
        }
        let id = SourceId(self.sources.len());
        claim_name(&mut self.source_names, ElementKind::Source, &source.name, id)?;
        self.sources.push(source);
        Ok(id)
    }

    pub fn add_branch(&mut self, branch: Branch) -> NetworkResult<BranchId> {
        self.check_bus(branch.from, ElementKind::Branch, &branch.name)?;
        self.check_bus(branch.to, ElementKind::Branch, &branch.name)?;
        if branch.from == branch.to {
            return Err(NetworkError::invalid(
                ElementKind::Branch,
                &branch.name,
                "both ends connect to the same bus",
            ));
        }
        let checked = match &branch.kind {
            BranchKind::Line(model) => model.validate(),
            BranchKind::Transformer(params) => params.validate(),
        };
        checked.map_err(|reason| NetworkError::invalid(ElementKind::Branch, &branch.name, reason))?;

        let id = BranchId(self.branches.len());
        claim_name(&mut self.branch_names, ElementKind::Branch, &branch.name, id)?;
        self.branches.push(branch);
        Ok(id)
    }

    pub fn add_line(
        &mut self,
        name: impl Into<String>,
        from: BusId,
        to: BusId,
        model: LineModel,
    ) -> NetworkResult<BranchId> {
        self.add_branch(Branch::new(name, from, to, BranchKind::Line(model)))
    }

    pub fn add_transformer(
        &mut self,
        name: impl Into<String>,
        hv: BusId,
        lv: BusId,
        params: TransformerParams,
    ) -> NetworkResult<BranchId> {
        self.add_branch(Branch::new(name, hv, lv, BranchKind::Transformer(params)))
    }

    pub fn add_switch(&mut self, switch: Switch) -> NetworkResult<SwitchId> {
        self.check_bus(switch.bus, ElementKind::Switch, &switch.name)?;
        match switch.element {
            SwitchElement::Bus(other) => {
                self.check_bus(other, ElementKind::Switch, &switch.name)?;
                if other == switch.bus {
                    return Err(NetworkError::invalid(
                        ElementKind::Switch,
                        &switch.name,
                        "bus-bus switch connects a bus to itself",
                    ));
                }
                if !(switch.z_ohm >= 0.0 && switch.z_ohm.is_finite()) {
                    return Err(NetworkError::invalid(
                        ElementKind::Switch,
                        &switch.name,
                        format!("z_ohm must be non-negative, got {}", switch.z_ohm),
                    ));
                }
            }
            SwitchElement::Line(branch_id) | SwitchElement::Transformer(branch_id) => {
                let branch = self.branches.get(branch_id.0).ok_or_else(|| {
                    NetworkError::UnknownIdentifier {
                        kind: ElementKind::Branch,
                        name: format!("#{branch_id} (referenced by switch '{}')", switch.name),
                    }
                })?;
                let expects_transformer = matches!(switch.element, SwitchElement::Transformer(_));
                if branch.is_transformer() != expects_transformer {
                    return Err(NetworkError::invalid(
                        ElementKind::Switch,
                        &switch.name,
                        format!("element '{}' has the wrong branch type", branch.name),
                    ));
                }
                if !branch.touches(switch.bus) {
                    return Err(NetworkError::invalid(
                        ElementKind::Switch,
                        &switch.name,
                        format!("bus is not a terminal of '{}'", branch.name),
                    ));
                }
            }
        }
        let id = SwitchId(self.switches.len());
        claim_name(&mut self.switch_names, ElementKind::Switch, &switch.name, id)?;
        self.switches.push(switch);
        Ok(id)
    }

    pub fn add_load(&mut self, load: Load) -> NetworkResult<LoadId> {
        self.check_bus(load.bus, ElementKind::Load, &load.name)?;
        if !load.p_mw.is_finite() {
            return Err(NetworkError::invalid(ElementKind::Load, &load.name, "p_mw must be finite"));
        }
        if !(load.power_factor > 0.0 && load.power_factor <= 1.0) {
            return Err(NetworkError::invalid(
                ElementKind::Load,
                &load.name,
                format!("power factor must be in (0, 1], got {}", load.power_factor),
            ));
        }
        if !(load.scaling >= 0.0 && load.scaling.is_finite()) {
            return Err(NetworkError::invalid(
                ElementKind::Load,
                &load.name,
                format!("scaling must be non-negative, got {}", load.scaling),
            ));
        }
        let id = LoadId(self.loads.len());
        claim_name(&mut self.load_names, ElementKind::Load, &load.name, id)?;
        self.loads.push(load);
        Ok(id)
    }

    pub fn bus_id(&self, name: &str) -> NetworkResult<BusId> {
        lookup(&self.bus_names, ElementKind::Bus, name)
    }

    pub fn source_id(&self, name: &str) -> NetworkResult<SourceId> {
        lookup(&self.source_names, ElementKind::Source, name)
    }

    pub fn branch_id(&self, name: &str) -> NetworkResult<BranchId> {
        lookup(&self.branch_names, ElementKind::Branch, name)
    }

    pub fn switch_id(&self, name: &str) -> NetworkResult<SwitchId> {
        lookup(&self.switch_names, ElementKind::Switch, name)
    }

    pub fn load_id(&self, name: &str) -> NetworkResult<LoadId> {
        lookup(&self.load_names, ElementKind::Load, name)
    }

    pub fn bus(&self, id: BusId) -> &Bus {
        &self.buses[id.0]
    }

    pub fn branch(&self, id: BranchId) -> &Branch {
        &self.branches[id.0]
    }

    pub fn switch(&self, id: SwitchId) -> &Switch {
        &self.switches[id.0]
    }

    pub fn load(&self, id: LoadId) -> &Load {
        &self.loads[id.0]
    }

    pub fn source(&self, id: SourceId) -> &Source {
        &self.sources[id.0]
    }

    pub fn buses(&self) -> impl ExactSizeIterator<Item = (BusId, &Bus)> {
        self.buses.iter().enumerate().map(|(i, b)| (BusId(i), b))
    }

    pub fn sources(&self) -> impl ExactSizeIterator<Item = (SourceId, &Source)> {
        self.sources.iter().enumerate().map(|(i, s)| (SourceId(i), s))
    }

    pub fn branches(&self) -> impl ExactSizeIterator<Item = (BranchId, &Branch)> {
        self.branches.iter().enumerate().map(|(i, b)| (BranchId(i), b))
    }

    pub fn switches(&self) -> impl ExactSizeIterator<Item = (SwitchId, &Switch)> {
        self.switches.iter().enumerate().map(|(i, s)| (SwitchId(i), s))
    }

    pub fn loads(&self) -> impl ExactSizeIterator<Item = (LoadId, &Load)> {
        self.loads.iter().enumerate().map(|(i, l)| (LoadId(i), l))
    }

    pub fn bus_count(&self) -> usize {
        self.buses.len()
    }

    /// Sets the state of a switch on this snapshot.
    pub fn set_switch(&mut self, id: SwitchId, closed: bool) {
        self.switches[id.0].closed = closed;
    }

    /// Multiplies every load's scaling factor by `factor`.
    pub fn scale_loads(&mut self, factor: f64) -> NetworkResult<()> {
        if !(factor >= 0.0 && factor.is_finite()) {
            return Err(NetworkError::invalid(
                ElementKind::Load,
                "*",
                format!("scaling factor must be non-negative, got {factor}"),
            ));
        }
        self.loads.iter_mut().for_each(|l| l.scaling *= factor);
        Ok(())
    }

    /// Whether any open switch takes `branch` out of the topology.
    pub fn is_branch_isolated(&self, branch: BranchId) -> bool {
        self.switches.iter().any(|s| s.isolates(branch))
    }

    /// Total scaled demand of in-service loads in MVA.
    pub fn total_demand_mva(&self) -> nalgebra::Complex<f64> {
        self.loads
            .iter()
            .filter(|l| l.in_service)
            .map(Load::demand_mva)
            .sum()
    }
}
