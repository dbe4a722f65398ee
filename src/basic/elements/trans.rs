use nalgebra::Complex;
use serde::{Deserialize, Serialize};

use super::{AdmittanceBranch, StubOrigin};

fn default_parallel() -> u32 {
    1
}

/// Tap changer on the high-voltage winding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TapChanger {
    pub pos: f64,
    #[serde(default)]
    pub neutral: f64,
    pub step_percent: f64,
}

impl TapChanger {
    /// Off-nominal ratio contributed by the tap position.
    pub fn ratio(&self) -> f64 {
        1.0 + (self.pos - self.neutral) * 0.01 * self.step_percent
    }
}

/// Two-winding transformer nameplate data in the pandapower convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformerParams {
    pub sn_mva: f64,
    pub vn_hv_kv: f64,
    pub vn_lv_kv: f64,
    pub vk_percent: f64,
    pub vkr_percent: f64,
    #[serde(default)]
    pub pfe_kw: f64,
    #[serde(default)]
    pub i0_percent: f64,
    #[serde(default)]
    pub tap: Option<TapChanger>,
    #[serde(default = "default_parallel")]
    pub parallel: u32,
}

/// Nominal voltages of the two buses a transformer is connected to.
#[derive(Debug, Clone, Copy)]
pub struct TerminalVoltages {
    pub hv_bus_kv: f64,
    pub lv_bus_kv: f64,
}

impl TransformerParams {
    pub fn new(sn_mva: f64, vn_hv_kv: f64, vn_lv_kv: f64, vk_percent: f64, vkr_percent: f64) -> Self {
        Self {
            sn_mva,
            vn_hv_kv,
            vn_lv_kv,
            vk_percent,
            vkr_percent,
            pfe_kw: 0.0,
            i0_percent: 0.0,
            tap: None,
            parallel: 1,
        }
    }

    pub fn with_core_losses(mut self, pfe_kw: f64, i0_percent: f64) -> Self {
        self.pfe_kw = pfe_kw;
        self.i0_percent = i0_percent;
        self
    }

    pub fn with_tap(mut self, tap: TapChanger) -> Self {
        self.tap = Some(tap);
        self
    }

    /// Total thermal rating across parallel units.
    pub fn rating_mva(&self) -> f64 {
        self.sn_mva * self.parallel as f64
    }

    /// A transformer with no short-circuit voltage is a bolted connection that
    /// also changes voltage level, so it cannot be merged away.
    pub fn is_zero_impedance(&self) -> bool {
        self.vk_percent == 0.0
    }

    /// Off-nominal turns ratio seen from the bus voltage bases, tap included.
    pub fn off_nominal_ratio(&self, terminals: TerminalVoltages) -> f64 {
        let tap = self.tap.as_ref().map_or(1.0, TapChanger::ratio);
        tap * (self.vn_hv_kv / terminals.hv_bus_kv) / (self.vn_lv_kv / terminals.lv_bus_kv)
    }

    /// Short-circuit impedance on the system base, referred to the LV bus.
    pub fn series_impedance_pu(&self, s_base_mva: f64, terminals: TerminalVoltages) -> Complex<f64> {
        let vk = self.vk_percent * 0.01;
        let vkr = self.vkr_percent * 0.01;
        let x = (vk.powi(2) - vkr.powi(2)).max(0.0).sqrt();
        let rated_to_bus = (self.vn_lv_kv / terminals.lv_bus_kv).powi(2);
        Complex::new(vkr, x) * (s_base_mva / self.sn_mva) * rated_to_bus / self.parallel as f64
    }

    /// Magnetising admittance on the system base, referred to the LV bus.
    pub fn magnetizing_admittance_pu(&self, s_base_mva: f64, terminals: TerminalVoltages) -> Complex<f64> {
        let ym = self.i0_percent * 0.01;
        let gm = self.pfe_kw * 1e-3 / self.sn_mva;
        let bm = (ym.powi(2) - gm.powi(2)).max(0.0).sqrt();
        let rated_to_bus = (self.vn_lv_kv / terminals.lv_bus_kv).powi(2);
        Complex::new(gm, -bm) * (self.sn_mva / s_base_mva) / rated_to_bus * self.parallel as f64
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if !(self.sn_mva > 0.0) {
            return Err(format!("sn_mva must be positive, got {}", self.sn_mva));
        }
        if !(self.vn_hv_kv > 0.0 && self.vn_lv_kv > 0.0) {
            return Err("rated voltages must be positive".into());
        }
        if !(self.vkr_percent >= 0.0 && self.vk_percent >= self.vkr_percent) {
            return Err(format!(
                "need vk_percent >= vkr_percent >= 0, got vk={} vkr={}",
                self.vk_percent, self.vkr_percent
            ));
        }
        if self.pfe_kw < 0.0 || self.i0_percent < 0.0 {
            return Err("core loss parameters must be non-negative".into());
        }
        if self.parallel == 0 {
            return Err("parallel must be at least 1".into());
        }
        if let Some(tap) = &self.tap {
            if !(tap.ratio() > 0.0) {
                return Err("tap position yields a non-positive ratio".into());
            }
        }
        Ok(())
    }

    /// Expands the transformer into π stubs between `hv` and `lv`.
    ///
    /// With series admittance `y` on the LV side and ratio `t` on the HV side
    /// the stubs reproduce `Y_hh = y/t²`, `Y_ll = y`, `Y_hl = Y_lh = -y/t`.
    pub fn to_admittance(
        &self,
        hv: i64,
        lv: i64,
        s_base_mva: f64,
        terminals: TerminalVoltages,
        origin: StubOrigin,
    ) -> Vec<AdmittanceBranch> {
        let t = self.off_nominal_ratio(terminals);
        let y = 1.0 / self.series_impedance_pu(s_base_mva, terminals);

        let mut out = vec![
            AdmittanceBranch::series(y / t, hv, lv, origin),
            AdmittanceBranch::shunt((1.0 - t) * y / t.powi(2), hv, origin),
            AdmittanceBranch::shunt((1.0 - 1.0 / t) * y, lv, origin),
        ];

        let ym = self.magnetizing_admittance_pu(s_base_mva, terminals);
        if ym.is_finite() && ym != Complex::new(0.0, 0.0) {
            out.push(AdmittanceBranch::shunt(0.5 * ym / t.powi(2), hv, origin));
            out.push(AdmittanceBranch::shunt(0.5 * ym, lv, origin));
        }
        out
    }
}
