//! JSON network and study definitions.
//!
//! Definitions refer to elements by name; [`build_network`] resolves those
//! names into typed handles and runs the registry's validation.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::basic::elements::{
    Branch, BranchKind, Bus, LineModel, Load, Source, Switch, SwitchElement, SwitchKind,
    TransformerParams,
};
use crate::basic::error::{ElementKind, NetworkError, NetworkResult};
use crate::basic::network::{DEFAULT_F_HZ, DEFAULT_SN_MVA, Network};
use crate::basic::scenario::StudyConfig;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot read definition: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed definition: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Network(#[from] NetworkError),
}

fn default_true() -> bool {
    true
}

fn default_one() -> f64 {
    1.0
}

fn default_sn_mva() -> f64 {
    DEFAULT_SN_MVA
}

fn default_f_hz() -> f64 {
    DEFAULT_F_HZ
}

fn default_network_name() -> String {
    "network".to_owned()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusDef {
    pub name: String,
    pub vn_kv: f64,
    #[serde(default)]
    pub min_vm_pu: Option<f64>,
    #[serde(default)]
    pub max_vm_pu: Option<f64>,
    #[serde(default = "default_true")]
    pub in_service: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDef {
    pub name: String,
    pub bus: String,
    #[serde(default = "default_one")]
    pub vm_pu: f64,
    #[serde(default)]
    pub va_degree: f64,
    #[serde(default = "default_true")]
    pub in_service: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineDef {
    pub name: String,
    pub from_bus: String,
    pub to_bus: String,
    #[serde(flatten)]
    pub model: LineModel,
    #[serde(default = "default_true")]
    pub in_service: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformerDef {
    pub name: String,
    pub hv_bus: String,
    pub lv_bus: String,
    #[serde(flatten)]
    pub params: TransformerParams,
    #[serde(default = "default_true")]
    pub in_service: bool,
}

/// Element type of a switch, using pandapower's one-letter codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwitchType {
    #[serde(rename = "b")]
    Bus,
    #[serde(rename = "l")]
    Line,
    #[serde(rename = "t")]
    Transformer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchDef {
    pub name: String,
    pub bus: String,
    /// Name of the bus, line or transformer on the other side.
    pub element: String,
    pub et: SwitchType,
    #[serde(rename = "type", default)]
    pub kind: SwitchKind,
    #[serde(default = "default_true")]
    pub closed: bool,
    #[serde(default)]
    pub z_ohm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadDef {
    pub name: String,
    pub bus: String,
    pub p_mw: f64,
    pub power_factor: f64,
    #[serde(default = "default_one")]
    pub scaling: f64,
    #[serde(default = "default_true")]
    pub in_service: bool,
}

/// A complete network definition as read from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkDefinition {
    #[serde(default = "default_network_name")]
    pub name: String,
    #[serde(default = "default_sn_mva")]
    pub sn_mva: f64,
    #[serde(default = "default_f_hz")]
    pub f_hz: f64,
    pub buses: Vec<BusDef>,
    #[serde(default)]
    pub sources: Vec<SourceDef>,
    #[serde(default)]
    pub lines: Vec<LineDef>,
    #[serde(default)]
    pub transformers: Vec<TransformerDef>,
    #[serde(default)]
    pub switches: Vec<SwitchDef>,
    #[serde(default)]
    pub loads: Vec<LoadDef>,
}

/// Builds a validated network from a definition.
pub fn build_network(def: &NetworkDefinition) -> NetworkResult<Network> {
    let mut net = Network::new(def.name.clone()).with_base(def.sn_mva, def.f_hz)?;

    for b in &def.buses {
        let mut bus = Bus::new(b.name.clone(), b.vn_kv);
        bus.vm_limit.min = b.min_vm_pu.unwrap_or(bus.vm_limit.min);
        bus.vm_limit.max = b.max_vm_pu.unwrap_or(bus.vm_limit.max);
        bus.in_service = b.in_service;
        net.add_bus(bus)?;
    }
    for s in &def.sources {
        let mut source = Source::new(s.name.clone(), net.bus_id(&s.bus)?, s.vm_pu).with_angle(s.va_degree);
        source.in_service = s.in_service;
        net.add_source(source)?;
    }
    for l in &def.lines {
        let mut branch = Branch::new(
            l.name.clone(),
            net.bus_id(&l.from_bus)?,
            net.bus_id(&l.to_bus)?,
            BranchKind::Line(l.model.clone()),
        );
        branch.in_service = l.in_service;
        net.add_branch(branch)?;
    }
    for t in &def.transformers {
        let mut branch = Branch::new(
            t.name.clone(),
            net.bus_id(&t.hv_bus)?,
            net.bus_id(&t.lv_bus)?,
            BranchKind::Transformer(t.params.clone()),
        );
        branch.in_service = t.in_service;
        net.add_branch(branch)?;
    }
    for s in &def.switches {
        let element = match s.et {
            SwitchType::Bus => SwitchElement::Bus(net.bus_id(&s.element)?),
            SwitchType::Line => SwitchElement::Line(net.branch_id(&s.element)?),
            SwitchType::Transformer => SwitchElement::Transformer(net.branch_id(&s.element)?),
        };
        let mut switch = Switch::new(s.name.clone(), net.bus_id(&s.bus)?, element, s.kind)
            .with_impedance(s.z_ohm);
        switch.closed = s.closed;
        net.add_switch(switch)?;
    }
    for l in &def.loads {
        let mut load = Load::new(l.name.clone(), net.bus_id(&l.bus)?, l.p_mw, l.power_factor)
            .with_scaling(l.scaling);
        load.in_service = l.in_service;
        net.add_load(load)?;
    }
    if net.sources().len() == 0 {
        return Err(NetworkError::invalid(
            ElementKind::Source,
            &def.name,
            "network defines no source",
        ));
    }
    Ok(net)
}

pub fn network_from_json_str(json: &str) -> Result<Network, LoadError> {
    let def: NetworkDefinition = serde_json::from_str(json)?;
    Ok(build_network(&def)?)
}

/// Reads and builds a network definition file.
pub fn load_network_json(path: impl AsRef<Path>) -> Result<Network, LoadError> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let def: NetworkDefinition = serde_json::from_reader(reader)?;
    let net = build_network(&def)?;
    info!(
        path = %path.as_ref().display(),
        buses = net.bus_count(),
        branches = net.branches().len(),
        "network loaded"
    );
    Ok(net)
}

/// Reads a study definition (solver options and scenarios).
pub fn load_study_json(path: impl AsRef<Path>) -> Result<StudyConfig, LoadError> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    Ok(serde_json::from_reader(reader)?)
}
