use nalgebra::DVector;
use nalgebra_sparse::{CooMatrix, CscMatrix};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::dsbus_dv::dSbus_dV;
use super::error::SolveError;
use super::solver::Solve;

pub const DEFAULT_MAX_IT: usize = 30;
pub const DEFAULT_TOL: f64 = 1e-6;

/// Solver options shared by every scenario of a study.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerFlowConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_it: Option<usize>, // Maximum number of iterations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tol: Option<f64>, // Tolerance on the largest mismatch, per-unit
    /// Start perturbed scenarios from the base case operating point.
    pub warm_start: bool,
    /// Lines at or below this series impedance are merged as bolted connections.
    pub zero_impedance_threshold_pu: f64,
}

impl PowerFlowConfig {
    pub fn max_it(&self) -> usize {
        self.max_it.unwrap_or(DEFAULT_MAX_IT)
    }

    pub fn tol(&self) -> f64 {
        self.tol.unwrap_or(DEFAULT_TOL)
    }
}

/// A converged operating point.
#[derive(Debug, Clone)]
pub struct NewtonSolution {
    pub v: DVector<Complex64>,
    pub iterations: usize,
    pub max_mismatch: f64,
}

/// Newton-Raphson power flow on a system whose first `npq` nodes are PQ
/// buses and whose remaining node is the slack.
///
/// Convergence is reached when the infinity norm of the active/reactive
/// mismatch at PQ nodes drops below `tol`. On failure the last iterate is
/// returned with the error.
#[allow(non_snake_case)]
pub fn newton_pf<Solver: Solve>(
    Ybus: &CscMatrix<Complex64>,
    Sbus: &DVector<Complex64>,
    v_init: &DVector<Complex64>,
    npq: usize,
    tol: f64,
    max_it: usize,
    solver: &mut Solver,
) -> Result<NewtonSolution, (SolveError, DVector<Complex64>)> {
    let mut v = v_init.clone();
    let mut v_m = v.map(|e| e.norm());
    let mut v_a = v.map(|e| e.arg());

    let mut F = mismatch(Ybus, Sbus, &v, npq);
    let mut norm = inf_norm(&F);
    if npq == 0 || norm < tol {
        return Ok(NewtonSolution {
            v,
            iterations: 0,
            max_mismatch: norm,
        });
    }

    solver.reset();
    let mut reached = 0;
    for iterations in 1..=max_it {
        reached = iterations;
        let v_norm = v.map(|e| e / e.norm());
        let (dS_dVm, dS_dVa) = dSbus_dV(Ybus, &v, &v_norm);
        let jacobian = build_jacobian(&dS_dVm, &dS_dVa, npq);

        let mut dx = F.clone();
        let n = jacobian.nrows();
        if let Err(reason) = solver.solve(
            jacobian.col_offsets(),
            jacobian.row_indices(),
            jacobian.values(),
            dx.as_mut_slice(),
            n,
        ) {
            return Err((
                SolveError::SingularSystem {
                    branch: None,
                    reason: format!("jacobian factorization at iteration {iterations}: {reason}"),
                },
                v,
            ));
        }

        update_v(&mut v_a, &mut v_m, &dx, npq);
        v.iter_mut()
            .zip(v_m.iter().zip(v_a.iter()))
            .take(npq)
            .for_each(|(x, (&vm, &va))| *x = Complex64::from_polar(vm, va));

        F = mismatch(Ybus, Sbus, &v, npq);
        norm = inf_norm(&F);
        trace!(iterations, mismatch = norm, "newton step");

        if !norm.is_finite() {
            break;
        }
        if norm < tol {
            debug!(iterations, mismatch = norm, "power flow converged");
            return Ok(NewtonSolution {
                v,
                iterations,
                max_mismatch: norm,
            });
        }
    }

    Err((
        SolveError::DidNotConverge {
            iterations: reached,
            max_mismatch: norm,
        },
        v,
    ))
}

/// Largest absolute entry; NaN if any entry is NaN.
fn inf_norm(f: &DVector<f64>) -> f64 {
    f.iter().fold(0.0, |m: f64, x| {
        if x.is_nan() || m.is_nan() {
            f64::NAN
        } else {
            m.max(x.abs())
        }
    })
}

/// Stacked `[ΔP; ΔQ]` at PQ nodes.
#[inline(always)]
fn mismatch(
    ybus: &CscMatrix<Complex64>,
    sbus: &DVector<Complex64>,
    v: &DVector<Complex64>,
    npq: usize,
) -> DVector<f64> {
    let mis = v.component_mul(&(ybus * v).conjugate()) - sbus;
    let mut f = DVector::zeros(2 * npq);
    for i in 0..npq {
        f[i] = mis[i].re;
        f[npq + i] = mis[i].im;
    }
    f
}

#[inline(always)]
fn update_v(v_a: &mut DVector<f64>, v_m: &mut DVector<f64>, dx: &DVector<f64>, npq: usize) {
    v_a.rows_range_mut(0..npq)
        .zip_apply(&dx.rows_range(0..npq), |a, b| *a -= b);
    v_m.rows_range_mut(0..npq)
        .zip_apply(&dx.rows_range(npq..2 * npq), |a, b| *a -= b);
}

/// Real Jacobian `[[∂P/∂θ, ∂P/∂V], [∂Q/∂θ, ∂Q/∂V]]` restricted to PQ nodes.
///
/// Entries are selected by position only, so the sparsity pattern is the same
/// at every iteration and the solver's symbolic analysis can be reused.
#[inline(always)]
fn build_jacobian(
    ds_dvm: &CscMatrix<Complex64>,
    ds_dva: &CscMatrix<Complex64>,
    npq: usize,
) -> CscMatrix<f64> {
    let mut coo = CooMatrix::new(2 * npq, 2 * npq);
    for (r, c, v) in ds_dva.triplet_iter() {
        if r < npq && c < npq {
            coo.push(r, c, v.re);
            coo.push(r + npq, c, v.im);
        }
    }
    for (r, c, v) in ds_dvm.triplet_iter() {
        if r < npq && c < npq {
            coo.push(r, c + npq, v.re);
            coo.push(r + npq, c + npq, v.im);
        }
    }
    CscMatrix::from(&coo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::solver::DefaultSolver;
    use nalgebra::Complex;

    /// Two nodes joined by z = 0.01 + j0.03, slack last.
    fn two_node(load: Complex64) -> (CscMatrix<Complex64>, DVector<Complex64>, DVector<Complex64>) {
        let y: Complex64 = 1.0 / Complex::new(0.01, 0.03);
        let mut coo = CooMatrix::new(2, 2);
        coo.push(0, 0, y);
        coo.push(0, 1, -y);
        coo.push(1, 0, -y);
        coo.push(1, 1, y);
        let sbus = DVector::from_vec(vec![-load, Complex::new(0.0, 0.0)]);
        let v0 = DVector::from_element(2, Complex::new(1.0, 0.0));
        (CscMatrix::from(&coo), sbus, v0)
    }

    #[test]
    fn test_two_node_converges() {
        let (ybus, sbus, v0) = two_node(Complex::new(0.2, 0.1));
        let mut solver = DefaultSolver::default();
        let sol = newton_pf(&ybus, &sbus, &v0, 1, 1e-8, 30, &mut solver).unwrap();
        assert!(sol.iterations <= 6);
        assert_eq!(sol.v[1], Complex::new(1.0, 0.0));
        assert!(sol.v[0].norm() < 1.0 && sol.v[0].arg() < 0.0);

        // the load sees exactly what was specified
        let s = sol.v.component_mul(&(&ybus * &sol.v).conjugate());
        assert!((s[0] - sbus[0]).norm() < 1e-8);
    }

    #[test]
    fn test_flat_start_at_no_load_needs_no_iterations() {
        let (ybus, sbus, v0) = two_node(Complex::new(0.0, 0.0));
        let mut solver = DefaultSolver::default();
        let sol = newton_pf(&ybus, &sbus, &v0, 1, 1e-6, 30, &mut solver).unwrap();
        assert_eq!(sol.iterations, 0);
    }

    #[test]
    fn test_excessive_load_does_not_converge() {
        let (ybus, sbus, v0) = two_node(Complex::new(40.0, 20.0));
        let mut solver = DefaultSolver::default();
        let err = newton_pf(&ybus, &sbus, &v0, 1, 1e-6, 10, &mut solver).unwrap_err();
        match err.0 {
            // a blown-up iterate stops the loop before the cap
            SolveError::DidNotConverge { iterations, .. } => assert!((1..=10).contains(&iterations)),
            SolveError::SingularSystem { .. } => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_cap_reports_iterations_reached() {
        let (ybus, sbus, v0) = two_node(Complex::new(0.2, 0.1));
        let mut solver = DefaultSolver::default();
        let err = newton_pf(&ybus, &sbus, &v0, 1, 0.0, 2, &mut solver).unwrap_err();
        assert!(matches!(err.0, SolveError::DidNotConverge { iterations: 2, .. }));
        let zero_cap = newton_pf(&ybus, &sbus, &v0, 1, 1e-6, 0, &mut solver).unwrap_err();
        assert!(matches!(zero_cap.0, SolveError::DidNotConverge { iterations: 0, .. }));
    }

    #[test]
    fn test_config_defaults() {
        let cfg: PowerFlowConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.max_it(), 30);
        assert_eq!(cfg.tol(), 1e-6);
        assert!(!cfg.warm_start);
        let cfg: PowerFlowConfig = serde_json::from_str(r#"{"max_it": 5, "tol": 1e-9}"#).unwrap();
        assert_eq!(cfg.max_it(), 5);
        assert_eq!(cfg.tol(), 1e-9);
    }
}
