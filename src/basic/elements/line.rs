use std::f64::consts::PI;

use nalgebra::Complex;
use serde::{Deserialize, Serialize};

use super::{AdmittanceBranch, StubOrigin};
use crate::basic::units::PuBase;

fn default_parallel() -> u32 {
    1
}

/// Physical line data in the pandapower convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineParams {
    pub length_km: f64,
    pub r_ohm_per_km: f64,
    pub x_ohm_per_km: f64,
    #[serde(default)]
    pub c_nf_per_km: f64,
    #[serde(default)]
    pub g_us_per_km: f64,
    /// Thermal rating per circuit, used for loading.
    #[serde(default)]
    pub max_i_ka: Option<f64>,
    #[serde(default = "default_parallel")]
    pub parallel: u32,
}

impl LineParams {
    pub fn new(length_km: f64, r_ohm_per_km: f64, x_ohm_per_km: f64) -> Self {
        Self {
            length_km,
            r_ohm_per_km,
            x_ohm_per_km,
            c_nf_per_km: 0.0,
            g_us_per_km: 0.0,
            max_i_ka: None,
            parallel: 1,
        }
    }

    pub fn with_capacitance(mut self, c_nf_per_km: f64) -> Self {
        self.c_nf_per_km = c_nf_per_km;
        self
    }

    pub fn with_rating(mut self, max_i_ka: f64) -> Self {
        self.max_i_ka = Some(max_i_ka);
        self
    }
}

/// How a line's impedance is given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum LineModel {
    Physical(LineParams),
    /// Already on the system base of the from-bus voltage level.
    PerUnit {
        r_pu: f64,
        x_pu: f64,
        #[serde(default)]
        b_pu: f64,
    },
}

impl LineModel {
    pub fn per_unit(r_pu: f64, x_pu: f64) -> Self {
        LineModel::PerUnit {
            r_pu,
            x_pu,
            b_pu: 0.0,
        }
    }

    /// Series impedance in per-unit.
    pub fn series_impedance_pu(&self, base: &PuBase) -> Complex<f64> {
        match self {
            LineModel::Physical(p) => {
                let z_ohm =
                    Complex::new(p.r_ohm_per_km, p.x_ohm_per_km) * p.length_km / p.parallel as f64;
                z_ohm / base.z_base_ohm()
            }
            LineModel::PerUnit { r_pu, x_pu, .. } => Complex::new(*r_pu, *x_pu),
        }
    }

    /// Total shunt admittance in per-unit, split half to each end by the π model.
    pub fn shunt_admittance_pu(&self, base: &PuBase, f_hz: f64) -> Complex<f64> {
        match self {
            LineModel::Physical(p) => {
                let b = 2.0 * PI * f_hz * 1e-9 * p.c_nf_per_km;
                let g = 1e-6 * p.g_us_per_km;
                let y_s = Complex::new(g, b) * p.length_km * p.parallel as f64;
                Complex::new(base.y_to_pu(y_s.re), base.y_to_pu(y_s.im))
            }
            LineModel::PerUnit { b_pu, .. } => Complex::new(0.0, *b_pu),
        }
    }

    /// Total thermal rating across parallel circuits.
    pub fn rating_ka(&self) -> Option<f64> {
        match self {
            LineModel::Physical(p) => p.max_i_ka.map(|i| i * p.parallel as f64),
            LineModel::PerUnit { .. } => None,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        match self {
            LineModel::Physical(p) => {
                if !(p.length_km >= 0.0) {
                    return Err(format!("length_km must be non-negative, got {}", p.length_km));
                }
                if p.r_ohm_per_km < 0.0 || p.x_ohm_per_km < 0.0 {
                    return Err("impedance per km must be non-negative".into());
                }
                if p.c_nf_per_km < 0.0 || p.g_us_per_km < 0.0 {
                    return Err("shunt parameters must be non-negative".into());
                }
                if p.parallel == 0 {
                    return Err("parallel must be at least 1".into());
                }
            }
            LineModel::PerUnit { r_pu, x_pu, .. } => {
                if *r_pu < 0.0 || !r_pu.is_finite() || !x_pu.is_finite() {
                    return Err("per-unit impedance must be finite with r >= 0".into());
                }
            }
        }
        Ok(())
    }

    /// Expands the line into its π-equivalent stubs between `from` and `to`.
    pub fn to_admittance(
        &self,
        from: i64,
        to: i64,
        base: &PuBase,
        f_hz: f64,
        origin: StubOrigin,
    ) -> Vec<AdmittanceBranch> {
        let mut out = Vec::with_capacity(3);
        let y_sh = self.shunt_admittance_pu(base, f_hz);
        if y_sh != Complex::new(0.0, 0.0) {
            out.push(AdmittanceBranch::shunt(0.5 * y_sh, from, origin));
            out.push(AdmittanceBranch::shunt(0.5 * y_sh, to, origin));
        }
        let z = self.series_impedance_pu(base);
        out.push(AdmittanceBranch::series(1.0 / z, from, to, origin));
        out
    }
}
