//! Symmetric tridiagonal eigensolver: implicit QL with Wilkinson shift.
//!
//! A specialization of the classic `tqli` algorithm (Martin-Wilkinson),
//! restricted here to the case the Gauss-Legendre node generator needs: a
//! zero main diagonal on input. The off-diagonal `e` is length `n`, with
//! `e[n-1]` a formal trailing entry that must be zero (the k-th entry in
//! the input vector is a formal "extra" term expected by the driver).
//!
//! Convergence is capped at 30 sweeps per eigenvalue; a count exceeding
//! that returns [`CollocationError::ConvergenceFailed`].

use crate::error::{CollocationError, Result};
use crate::scalar::Scalar;

const MAX_SWEEPS: usize = 30;

/// Computes the eigenvalues of the symmetric tridiagonal matrix with main
/// diagonal `d` and off-diagonal `e`, sorted ascending. `d` and `e` are
/// consumed in place (mirroring the solver's in-place elimination
/// convention); both must have the same length `n`.
pub fn tridiagonal_eigenvalues<S: Scalar>(mut d: Vec<S>, mut e: Vec<S>) -> Result<Vec<S>> {
    let n = d.len();
    if e.len() != n {
        return Err(CollocationError::DimensionMismatch {
            expected: n,
            actual: e.len(),
        });
    }
    if n == 0 {
        return Ok(d);
    }
    let ctx = d[0].context();
    let zero = S::zero_in(&ctx);
    let two = S::from_i64_in(&ctx, 2);

    for l in 0..n {
        let mut iter = 0usize;
        loop {
            // find the smallest m >= l such that e[m] is negligible at
            // F-precision, or m == n - 1.
            let mut m = l;
            while m < n - 1 {
                let dd = d[m].abs() + d[m + 1].abs();
                if Scalar::eq(&(e[m].abs() + dd.clone()), &dd) {
                    break;
                }
                m += 1;
            }
            if m == l {
                break;
            }
            iter += 1;
            if iter > MAX_SWEEPS {
                log::warn!(
                    "tridiagonal eigensolver exceeded {} sweeps at index {}",
                    MAX_SWEEPS,
                    l
                );
                return Err(CollocationError::ConvergenceFailed { sweeps: iter });
            }
            log::trace!("QL sweep {} for eigenvalue index {} (m = {})", iter, l, m);

            let mut g = (d[l + 1].clone() - d[l].clone()) / (two.clone() * e[l].clone());
            let mut r = (g.clone() * g.clone() + S::one_in(&ctx)).sqrt();
            let signed_r = if g.ge(&zero) { r.abs() } else { -r.abs() };
            g = d[m].clone() - d[l].clone() + e[l].clone() / (g.clone() + signed_r);

            let mut s = S::one_in(&ctx);
            let mut c = S::one_in(&ctx);
            let mut p = zero.clone();

            let mut i = m;
            while i > l {
                i -= 1;
                let f = s.clone() * e[i].clone();
                let b = c.clone() * e[i].clone();
                r = (f.clone() * f.clone() + g.clone() * g.clone()).sqrt();
                e[i + 1] = r.clone();
                if r.is_zero() {
                    d[i + 1] = d[i + 1].clone() - p.clone();
                    e[m] = zero.clone();
                    break;
                }
                s = f.clone() / r.clone();
                c = g.clone() / r.clone();
                g = d[i + 1].clone() - p.clone();
                r = (d[i].clone() - g.clone()) * s.clone() + two.clone() * c.clone() * b.clone();
                p = s.clone() * r.clone();
                d[i + 1] = g.clone() + p.clone();
                g = c.clone() * r.clone() - b;
            }
            d[l] = d[l].clone() - p;
            e[l] = g;
            e[m] = zero.clone();
        }
    }

    insertion_sort_ascending(&mut d);
    Ok(d)
}

fn insertion_sort_ascending<S: Scalar>(v: &mut [S]) {
    for i in 1..v.len() {
        let mut j = i;
        while j > 0 && v[j].lt(&v[j - 1]) {
            v.swap(j, j - 1);
            j -= 1;
        }
    }
}
