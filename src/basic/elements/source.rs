use nalgebra::Complex;

use super::BusId;

/// External grid connection. Its bus becomes the slack reference of the island
/// it ends up in.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub name: String,
    pub bus: BusId,
    pub vm_pu: f64,
    pub va_degree: f64,
    pub in_service: bool,
}

impl Source {
    pub fn new(name: impl Into<String>, bus: BusId, vm_pu: f64) -> Self {
        Self {
            name: name.into(),
            bus,
            vm_pu,
            va_degree: 0.0,
            in_service: true,
        }
    }

    pub fn with_angle(mut self, va_degree: f64) -> Self {
        self.va_degree = va_degree;
        self
    }

    /// Voltage phasor the source imposes on its bus.
    pub fn voltage(&self) -> Complex<f64> {
        Complex::from_polar(self.vm_pu, self.va_degree.to_radians())
    }
}
