//! Per-unit conversion.
//!
//! The system uses one global power base (`s_base_mva`) and a voltage base per
//! bus equal to the bus nominal voltage. Impedances of every element are
//! referred to the base of the bus they are connected to, so transformer
//! ratios only carry the off-nominal part.

use serde::{Deserialize, Serialize};

/// Convert a physical quantity into per-unit on `base`.
#[inline]
pub fn to_per_unit(physical_value: f64, base: f64) -> f64 {
    physical_value / base
}

/// Convert a per-unit quantity back to physical units on `base`.
#[inline]
pub fn from_per_unit(pu_value: f64, base: f64) -> f64 {
    pu_value * base
}

/// Base quantities at one voltage level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PuBase {
    /// Three-phase power base in MVA.
    pub s_base_mva: f64,
    /// Line-to-line voltage base in kV.
    pub v_base_kv: f64,
}

impl PuBase {
    pub fn new(s_base_mva: f64, v_base_kv: f64) -> Self {
        Self {
            s_base_mva,
            v_base_kv,
        }
    }

    /// Impedance base in ohm, `V² / S`.
    pub fn z_base_ohm(&self) -> f64 {
        self.v_base_kv * self.v_base_kv / self.s_base_mva
    }

    /// Admittance base in siemens.
    pub fn y_base_s(&self) -> f64 {
        1.0 / self.z_base_ohm()
    }

    /// Current base in kA, `S / (√3 V)`.
    pub fn i_base_ka(&self) -> f64 {
        self.s_base_mva / (3f64.sqrt() * self.v_base_kv)
    }

    pub fn z_to_pu(&self, ohm: f64) -> f64 {
        to_per_unit(ohm, self.z_base_ohm())
    }

    pub fn y_to_pu(&self, siemens: f64) -> f64 {
        to_per_unit(siemens, self.y_base_s())
    }

    pub fn s_to_pu(&self, mva: f64) -> f64 {
        to_per_unit(mva, self.s_base_mva)
    }
}

/// A simple structure representing min/max bounds on a value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Limit<T> {
    pub min: T,
    pub max: T,
}

impl Limit<f64> {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}
