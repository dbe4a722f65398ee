use rsparse::{
    data::{self, Numeric, Symb},
    lsolve, lu, sqr, usolve,
};

use super::Solve;

/// Sparse LU backed by `rsparse`. The symbolic analysis is cached across
/// calls with the same sparsity pattern.
#[derive(Default)]
pub struct RSparseSolver {
    x: Vec<f64>,
    symbolic: Option<Symb>,
}

#[allow(non_snake_case)]
impl Solve for RSparseSolver {
    fn solve(
        &mut self,
        Ap: &[usize],
        Ai: &[usize],
        Ax: &[f64],
        b: &mut [f64],
        n: usize,
    ) -> Result<(), &'static str> {
        if Ap.len() != n + 1 || b.len() != n {
            return Err("dimension mismatch");
        }
        let a = data::Sprs {
            m: n,
            n,
            i: Ai.to_vec(),
            p: Ap.iter().map(|&v| v as isize).collect(),
            x: Ax.to_vec(),
            nzmax: Ax.len(),
        };
        let symbolic = self.symbolic.get_or_insert_with(|| sqr(&a, 1, false));
        self.x.resize(n, 0.0);

        let num = lu(&a, symbolic, 1e-6).map_err(|_| "LU factorization failed")?;
        ipvec(&num.pinv, b, &mut self.x); // x = P*b
        lsolve(&num.l, &mut self.x); // x = L\x
        usolve(&num.u, &mut self.x); // x = U\x
        ipvec(&symbolic.q, &self.x, b); // b = Q*x

        if b.iter().all(|v| v.is_finite()) {
            Ok(())
        } else {
            Err("singular matrix")
        }
    }

    fn reset(&mut self) {
        self.symbolic = None;
    }
}

fn ipvec<T: Numeric<T>>(p: &Option<Vec<isize>>, b: &[T], x: &mut [T]) {
    match p {
        Some(pvec) => {
            for k in 0..b.len() {
                x[pvec[k] as usize] = b[k];
            }
        }
        None => x.copy_from_slice(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_small_system() {
        // [4 1; 2 3] x = [1; 2], column-major
        let ap = [0, 2, 4];
        let ai = [0, 1, 0, 1];
        let ax = [4.0, 2.0, 1.0, 3.0];
        let mut b = [1.0, 2.0];
        let mut solver = RSparseSolver::default();
        solver.solve(&ap, &ai, &ax, &mut b, 2).unwrap();
        assert!((b[0] - 0.1).abs() < 1e-12);
        assert!((b[1] - 0.6).abs() < 1e-12);

        // cached symbolic analysis is reused for new values
        let ax = [2.0, 0.0, 0.0, 5.0];
        let mut b = [4.0, 10.0];
        solver.solve(&ap, &ai, &ax, &mut b, 2).unwrap();
        assert!((b[0] - 2.0).abs() < 1e-12 && (b[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_singular_matrix_is_an_error() {
        let ap = [0, 2, 4];
        let ai = [0, 1, 0, 1];
        let ax = [1.0, 2.0, 2.0, 4.0];
        let mut b = [1.0, 1.0];
        let mut solver = RSparseSolver::default();
        assert!(solver.solve(&ap, &ai, &ax, &mut b, 2).is_err());
    }
}
