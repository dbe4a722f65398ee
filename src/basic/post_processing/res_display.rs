use std::fmt;

use tabled::{Table, Tabled, settings::Style};

use crate::basic::result::SolveResult;

/// A wrapper around a float that limits the number of decimal places when printed.
#[derive(Clone, Copy, PartialEq, PartialOrd)]
pub(crate) struct FloatWrapper {
    pub(crate) value: Option<f64>,
    pub(crate) precision: usize, // Number of decimal places to display
}

impl FloatWrapper {
    pub fn new(value: f64, precision: usize) -> Self {
        FloatWrapper {
            value: Some(value),
            precision,
        }
    }

    /// Shown as `-` when there is no value.
    pub fn maybe(value: Option<f64>, precision: usize) -> Self {
        FloatWrapper { value, precision }
    }
}

impl fmt::Display for FloatWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(v) => write!(f, "{:.1$}", v, self.precision),
            None => f.write_str("-"),
        }
    }
}

impl fmt::Debug for FloatWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// One row per scenario.
#[derive(Debug, Tabled)]
struct ScenarioRow {
    scenario: String,
    status: String,
    converged: bool,
    load_mw: FloatWrapper,
    vm_min_pu: FloatWrapper,
    vm_max_pu: FloatWrapper,
    losses_mw: FloatWrapper,
    iterations: usize,
}

/// Table row for display Bus results.
#[derive(Debug, Tabled)]
#[allow(non_snake_case)]
struct BusResTable {
    Bus: String,
    kV: FloatWrapper,
    Vm: FloatWrapper,
    Va: FloatWrapper,
    P_mw: FloatWrapper,
    Q_mvar: FloatWrapper,
}

#[derive(Debug, Tabled)]
struct BranchResTable {
    branch: String,
    p_from_mw: FloatWrapper,
    q_from_mvar: FloatWrapper,
    p_to_mw: FloatWrapper,
    q_to_mvar: FloatWrapper,
    pl_mw: FloatWrapper,
    i_ka: FloatWrapper,
    loading_percent: FloatWrapper,
}

/// Summary of a study: total load, voltage band and convergence per scenario.
pub fn scenario_table(results: &[SolveResult]) -> String {
    let rows = results.iter().map(|r| ScenarioRow {
        scenario: r.scenario.clone(),
        status: r.status.to_string(),
        converged: r.converged,
        load_mw: FloatWrapper::new(r.total_load_mw, 2),
        vm_min_pu: FloatWrapper::maybe(r.vm_min_pu(), 3),
        vm_max_pu: FloatWrapper::maybe(r.vm_max_pu(), 3),
        losses_mw: FloatWrapper::new(r.losses_mw(), 4),
        iterations: r.iterations,
    });
    Table::new(rows).with(Style::markdown()).to_string()
}

pub fn bus_table(result: &SolveResult) -> String {
    let rows = result.buses.iter().map(|b| BusResTable {
        Bus: b.name.clone(),
        kV: FloatWrapper::new(b.vn_kv, 2),
        Vm: FloatWrapper::maybe(b.vm_pu, 4),
        Va: FloatWrapper::maybe(b.va_degree, 3),
        P_mw: FloatWrapper::new(b.p_mw, 3),
        Q_mvar: FloatWrapper::new(b.q_mvar, 3),
    });
    Table::new(rows).with(Style::markdown()).to_string()
}

/// Energized branches only.
pub fn branch_table(result: &SolveResult) -> String {
    let rows = result
        .branches
        .iter()
        .filter(|b| b.energized)
        .map(|b| BranchResTable {
            branch: b.name.clone(),
            p_from_mw: FloatWrapper::new(b.p_from_mw, 3),
            q_from_mvar: FloatWrapper::new(b.q_from_mvar, 3),
            p_to_mw: FloatWrapper::new(b.p_to_mw, 3),
            q_to_mvar: FloatWrapper::new(b.q_to_mvar, 3),
            pl_mw: FloatWrapper::new(b.pl_mw, 4),
            i_ka: FloatWrapper::new(b.i_from_ka.max(b.i_to_ka), 3),
            loading_percent: FloatWrapper::maybe(b.loading_percent, 1),
        });
    Table::new(rows).with(Style::markdown()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_wrapper_precision() {
        assert_eq!(FloatWrapper::new(1.23456, 3).to_string(), "1.235");
        assert_eq!(FloatWrapper::maybe(None, 3).to_string(), "-");
    }
}
