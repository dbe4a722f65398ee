use nalgebra::Complex;

use super::BusId;

/// Constant-power load with a lagging power factor.
#[derive(Debug, Clone, PartialEq)]
pub struct Load {
    pub name: String,
    pub bus: BusId,
    pub p_mw: f64,
    pub power_factor: f64,
    /// Multiplier applied to both P and Q.
    pub scaling: f64,
    pub in_service: bool,
}

impl Load {
    pub fn new(name: impl Into<String>, bus: BusId, p_mw: f64, power_factor: f64) -> Self {
        Self {
            name: name.into(),
            bus,
            p_mw,
            power_factor,
            scaling: 1.0,
            in_service: true,
        }
    }

    pub fn with_scaling(mut self, scaling: f64) -> Self {
        self.scaling = scaling;
        self
    }

    /// Unscaled reactive demand, `P · tan(acos(pf))`.
    pub fn q_mvar(&self) -> f64 {
        self.p_mw * self.power_factor.acos().tan()
    }

    /// Scaled complex demand in MVA.
    pub fn demand_mva(&self) -> Complex<f64> {
        Complex::new(self.p_mw, self.q_mvar()) * self.scaling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reactive_power_from_power_factor() {
        let load = Load::new("bourns", BusId(0), 0.45, 0.9);
        // 0.45 MW at pf 0.9 draws 0.218 MVAr
        assert!((load.q_mvar() - 0.217_945).abs() < 1e-6);

        let unity = Load::new("lab", BusId(0), 1.0, 1.0);
        assert!(unity.q_mvar().abs() < 1e-12);
    }

    #[test]
    fn test_scaling_applies_to_both_components() {
        let load = Load::new("hub", BusId(0), 2.0, 0.9).with_scaling(1.3);
        let s = load.demand_mva();
        assert!((s.re - 2.6).abs() < 1e-12);
        assert!((s.im - 1.3 * load.q_mvar()).abs() < 1e-12);
    }
}
