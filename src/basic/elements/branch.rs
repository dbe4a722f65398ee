use serde::{Deserialize, Serialize};

use super::{AdmittanceBranch, BusId, LineModel, StubOrigin, TerminalVoltages, TransformerParams};
use crate::basic::units::PuBase;

/// Electrical model carried by a branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BranchKind {
    Line(LineModel),
    Transformer(TransformerParams),
}

/// Two-terminal series element. For transformers `from` is the HV side.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub name: String,
    pub from: BusId,
    pub to: BusId,
    pub kind: BranchKind,
    pub in_service: bool,
}

impl Branch {
    pub fn new(name: impl Into<String>, from: BusId, to: BusId, kind: BranchKind) -> Self {
        Self {
            name: name.into(),
            from,
            to,
            kind,
            in_service: true,
        }
    }

    pub fn is_transformer(&self) -> bool {
        matches!(self.kind, BranchKind::Transformer(_))
    }

    pub fn touches(&self, bus: BusId) -> bool {
        self.from == bus || self.to == bus
    }

    /// Whether the branch has no series impedance at or below `threshold_pu`.
    ///
    /// Such lines are merged into a single node by the topology resolver.
    /// Transformers are only flagged, they can't be merged across voltage levels.
    pub fn is_bolted(&self, base: &PuBase, threshold_pu: f64) -> bool {
        match &self.kind {
            BranchKind::Line(model) => model.series_impedance_pu(base).norm() <= threshold_pu,
            BranchKind::Transformer(t) => t.is_zero_impedance(),
        }
    }

    /// Expands into admittance stubs with ports numbered by `from`/`to` node.
    pub(crate) fn to_admittance(
        &self,
        id: super::BranchId,
        (from, to): (i64, i64),
        (from_kv, to_kv): (f64, f64),
        s_base_mva: f64,
        f_hz: f64,
    ) -> Vec<AdmittanceBranch> {
        let origin = StubOrigin::Branch(id);
        match &self.kind {
            BranchKind::Line(model) => {
                model.to_admittance(from, to, &PuBase::new(s_base_mva, from_kv), f_hz, origin)
            }
            BranchKind::Transformer(t) => t.to_admittance(
                from,
                to,
                s_base_mva,
                TerminalVoltages {
                    hv_bus_kv: from_kv,
                    lv_bus_kv: to_kv,
                },
                origin,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::elements::{BranchId, LineParams};

    #[test]
    fn test_bolted_detection() {
        let base = PuBase::new(1.0, 12.0);
        let short = Branch::new(
            "tie",
            BusId(0),
            BusId(1),
            BranchKind::Line(LineModel::Physical(LineParams::new(0.0, 0.16, 0.12))),
        );
        assert!(short.is_bolted(&base, 0.0));

        let cable = Branch::new(
            "cable",
            BusId(0),
            BusId(1),
            BranchKind::Line(LineModel::Physical(LineParams::new(0.3, 0.16, 0.12))),
        );
        assert!(!cable.is_bolted(&base, 0.0));
        assert!(cable.is_bolted(&base, 1e-3));
        assert!(cable.touches(BusId(1)) && !cable.touches(BusId(2)));
    }

    #[test]
    fn test_transformer_dispatch() {
        let t = Branch::new(
            "xfmr",
            BusId(0),
            BusId(1),
            BranchKind::Transformer(TransformerParams::new(40.0, 69.0, 12.0, 12.0, 0.3)),
        );
        assert!(t.is_transformer());
        let stubs = t.to_admittance(BranchId(0), (0, 1), (69.0, 12.0), 1.0, 50.0);
        assert_eq!(stubs.len(), 3);
        assert!(stubs.iter().all(|s| s.origin == StubOrigin::Branch(BranchId(0))));
    }
}
