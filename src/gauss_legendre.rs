//! Gauss-Legendre quadrature nodes via the Jacobi tridiagonal eigenproblem.
//!
//! The `k` nodes are the eigenvalues of the symmetric tridiagonal matrix
//! with zero main diagonal and off-diagonal `beta_j = j / sqrt(4 j^2 - 1)`,
//! `j = 1..=k-1`; the trailing formal entry required by the eigensolver's
//! input shape is zero.

use crate::eigen::tridiagonal_eigenvalues;
use crate::error::Result;
use crate::scalar::Scalar;

/// Returns the `k` Gauss-Legendre nodes in `(-1, 1)`, ascending, symmetric
/// about zero.
pub fn gauss_legendre_nodes<S: Scalar>(k: usize, ctx: &S::Context) -> Result<Vec<S>> {
    let d = vec![S::zero_in(ctx); k];
    let mut e = vec![S::zero_in(ctx); k];
    for j in 1..k {
        let jf = S::from_i64_in(ctx, j as i64);
        let four_j2_minus_1 = S::from_i64_in(ctx, 4) * jf.clone() * jf.clone() - S::one_in(ctx);
        e[j - 1] = jf / four_j2_minus_1.sqrt();
    }
    tridiagonal_eigenvalues(d, e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::F64Scalar;

    #[test]
    fn k1_is_the_midpoint() {
        let nodes: Vec<F64Scalar> = gauss_legendre_nodes(1, &()).unwrap();
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].0.abs() < 1e-12);
    }

    #[test]
    fn k2_matches_classical_values() {
        let nodes: Vec<F64Scalar> = gauss_legendre_nodes(2, &()).unwrap();
        let expect = 1.0 / 3.0_f64.sqrt();
        assert!((nodes[0].0 + expect).abs() < 1e-10);
        assert!((nodes[1].0 - expect).abs() < 1e-10);
    }

    #[test]
    fn k4_symmetric_and_inside_interval() {
        let nodes: Vec<F64Scalar> = gauss_legendre_nodes(4, &()).unwrap();
        assert_eq!(nodes.len(), 4);
        for i in 0..2 {
            assert!((nodes[i].0 + nodes[3 - i].0).abs() < 1e-10);
        }
        for n in &nodes {
            assert!(n.0 > -1.0 && n.0 < 1.0);
        }
    }

    #[test]
    fn k_up_to_twelve_stay_inside_interval_and_sorted() {
        for k in 1..=12 {
            let nodes: Vec<F64Scalar> = gauss_legendre_nodes(k, &()).unwrap();
            assert_eq!(nodes.len(), k);
            for w in nodes.windows(2) {
                assert!(w[0].0 < w[1].0);
            }
            for n in &nodes {
                assert!(n.0 > -1.0 && n.0 < 1.0);
            }
        }
    }
}
