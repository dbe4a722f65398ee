use crate::basic::units::{Limit, PuBase};

/// A node of common electrical potential.
#[derive(Debug, Clone, PartialEq)]
pub struct Bus {
    pub name: String,
    /// Nominal line-to-line voltage, also the bus voltage base.
    pub vn_kv: f64,
    /// Operating band for voltage magnitude in per-unit.
    pub vm_limit: Limit<f64>,
    pub in_service: bool,
}

impl Bus {
    pub fn new(name: impl Into<String>, vn_kv: f64) -> Self {
        Self {
            name: name.into(),
            vn_kv,
            vm_limit: Limit { min: 0.9, max: 1.1 },
            in_service: true,
        }
    }

    pub fn with_limits(mut self, min_vm_pu: f64, max_vm_pu: f64) -> Self {
        self.vm_limit = Limit {
            min: min_vm_pu,
            max: max_vm_pu,
        };
        self
    }

    pub fn out_of_service(mut self) -> Self {
        self.in_service = false;
        self
    }

    pub fn base(&self, s_base_mva: f64) -> PuBase {
        PuBase::new(s_base_mva, self.vn_kv)
    }
}
