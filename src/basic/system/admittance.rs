use nalgebra::Complex;
use nalgebra_sparse::{CooMatrix, CscMatrix, CsrMatrix};
use num_complex::Complex64;
use num_traits::One;

use crate::basic::elements::AdmittanceBranch;

/// Node-by-stub incidence matrix. Ground terminals have no row.
pub fn incidence_matrix(nodes: usize, stubs: &[AdmittanceBranch]) -> CsrMatrix<Complex64> {
    let mut incidence = CooMatrix::new(nodes, stubs.len());
    for (idx, stub) in stubs.iter().enumerate() {
        if stub.port.0[0] >= 0 {
            incidence.push(stub.port.0[0] as usize, idx, Complex::one());
        }
        if stub.port.0[1] >= 0 {
            incidence.push(stub.port.0[1] as usize, idx, -Complex::<f64>::one());
        }
    }
    CsrMatrix::from(&incidence)
}

/// Creates the nodal admittance matrix `Y = A · diag(y) · Aᵀ`.
///
/// Stub ports must already be numbered `0..nodes`.
pub fn create_y_bus(nodes: usize, stubs: &[AdmittanceBranch]) -> CscMatrix<Complex64> {
    let incidence = incidence_matrix(nodes, stubs);
    let mut diag_admit = CsrMatrix::identity(stubs.len());
    diag_admit
        .values_mut()
        .iter_mut()
        .zip(stubs)
        .for_each(|(v, stub)| *v = stub.y.0);
    let ybus = &incidence * &(&diag_admit * &incidence.transpose());
    CscMatrix::from(&ybus)
}
