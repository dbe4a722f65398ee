use nalgebra::{Complex, DVector};
use nalgebra_sparse::CscMatrix;

use super::sparse::conj::Conjugate;

/// Partial derivatives of the complex bus injections `S = V · conj(Y V)`
/// with respect to voltage magnitude and angle.
///
/// Returns `(dS_dVm, dS_dVa)`, both square in the node count. `v_norm` is
/// `V / |V|` elementwise.
///
/// Uses the complex-matrix formulation of R. D. Zimmerman, "AC Power Flows,
/// Generalized OPF Costs and their Derivatives using Complex Matrix
/// Notation", MATPOWER Technical Note 2, 2010:
///
/// ```text
/// dS/dVm = diag(V) · conj(Y · diag(Vnorm)) + conj(diag(I)) · diag(Vnorm)
/// dS/dVa = j · diag(V) · conj(diag(I) − Y · diag(V))
/// ```
#[allow(non_snake_case)]
pub fn dSbus_dV(
    Ybus: &CscMatrix<Complex<f64>>,
    v: &DVector<Complex<f64>>,
    v_norm: &DVector<Complex<f64>>,
) -> (CscMatrix<Complex<f64>>, CscMatrix<Complex<f64>>) {
    let diag = |values: &[Complex<f64>]| {
        let mut d = CscMatrix::identity(values.len());
        d.values_mut().copy_from_slice(values);
        d
    };
    let ibus = Ybus * v;
    let diagV = diag(v.as_slice());
    let diagVnorm = diag(v_norm.as_slice());
    let diagIbus = diag(ibus.as_slice());

    let dS_dVm = &diagV * &(Ybus * &diagVnorm).conjugate() + &diagIbus.conjugate() * &diagVnorm;
    let dS_dVa = &diagV * &(&diagIbus - &(Ybus * &diagV)).conjugate() * Complex::<f64>::i();
    (dS_dVm, dS_dVa)
}
