//! The almost-block-diagonal linear solver: scaled partial pivoting
//! elimination followed by back substitution, a specialization of the
//! Martin-Wilkinson/de Boor `COLROW`/`CWIDTH` scheme.
//!
//! The assembler hands us a dense `N x N` matrix rather than a per-row
//! compressed window, so elimination and back substitution here work with
//! global column indices throughout; `structure`'s `(rows, pivot_steps)`
//! pairs still govern elimination order and pivot-search depth exactly as
//! in the compressed scheme; they just no longer also drive a
//! column-shift bookkeeping layer.
//!
//! Per spec §4.8, the row window a block's pivot search draws from is
//! `[pivot, lastRow)`, where `lastRow` accumulates every block's row count
//! (it never resets) and `pivot` is the running count of columns already
//! eliminated. A block can carry `rows > pivot_steps` (e.g. the first
//! block's `(k+1, k)`): the one row it leaves unpivoted is not discarded,
//! it simply stays in the window and becomes a candidate for a later
//! block's steps. Pivoting is realized by physically swapping rows (and
//! their scale factors) into position `pivot`, so after forward
//! elimination row `i`'s pivot sits at column `i` and back substitution is
//! the textbook triangular solve.

use crate::collocation::AssembledSystem;
use crate::error::{CollocationError, Result};
use crate::scalar::Scalar;

/// Solves `A x = v` for the assembled collocation system, eliminating
/// columns in the order `structure` prescribes and pivoting by scaled row
/// maximum within the accumulated row window `[pivot, last_row)`.
pub fn solve<S: Scalar>(sys: &AssembledSystem<S>) -> Result<Vec<S>> {
    let n = sys.n;
    let ctx = sys.v[0].context();
    let mut a = sys.a.clone();
    let mut v = sys.v.clone();
    // Row scale factors: the largest magnitude entry in each row, fixed
    // once up front (classical scaled partial pivoting). Permuted in
    // lockstep with `a`/`v` whenever a row is swapped into pivot position.
    let mut scale = row_scales::<S>(&a, &ctx)?;

    let mut pivot: usize = 0; // next column to eliminate, and count of rows already pivoted
    let mut last_row: usize = 0; // rows [0, last_row) are visible as pivot candidates

    for &(rows, steps) in &sys.structure {
        last_row += rows;
        for _ in 0..steps {
            // Choose, among rows [pivot, last_row) not yet pivoted, the one
            // whose scaled magnitude at column `pivot` is largest.
            let mut best_row = None;
            let mut best_score = S::zero_in(&ctx);
            for r in pivot..last_row {
                let mag = a[r][pivot].abs();
                if mag.is_zero() {
                    continue;
                }
                let score = mag / scale[r].clone();
                if best_row.is_none() || score.gt(&best_score) {
                    best_row = Some(r);
                    best_score = score;
                }
            }
            let pr = best_row.ok_or(CollocationError::SingularMatrix { row: pivot })?;
            if pr != pivot {
                a.swap(pr, pivot);
                v.swap(pr, pivot);
                scale.swap(pr, pivot);
            }

            let pivot_val = a[pivot][pivot].clone();
            for r in (pivot + 1)..last_row {
                let factor = a[r][pivot].clone() / pivot_val.clone();
                if factor.is_zero() {
                    continue;
                }
                for c in pivot..n {
                    let sub = factor.clone() * a[pivot][c].clone();
                    a[r][c] = a[r][c].clone() - sub;
                }
                let sub_v = factor * v[pivot].clone();
                v[r] = v[r].clone() - sub_v;
            }
            pivot += 1;
        }
    }

    if pivot != n {
        return Err(CollocationError::SingularMatrix { row: pivot });
    }

    back_substitute(&a, &v, n)
}

/// Row scale factors for scaled partial pivoting: the max absolute entry
/// per row. A row of all zeros is already a singular system.
fn row_scales<S: Scalar>(a: &[Vec<S>], ctx: &S::Context) -> Result<Vec<S>> {
    let mut scales = Vec::with_capacity(a.len());
    for (r, row) in a.iter().enumerate() {
        let mut max = S::zero_in(ctx);
        for entry in row {
            let m = entry.abs();
            if m.gt(&max) {
                max = m;
            }
        }
        if max.is_zero() {
            return Err(CollocationError::SingularMatrix { row: r });
        }
        scales.push(max);
    }
    Ok(scales)
}

/// Forward elimination leaves `a` upper triangular with row `i`'s pivot at
/// column `i` (every pivot swap places the chosen row at the current
/// pivot index), so back substitution is the textbook triangular solve.
fn back_substitute<S: Scalar>(a: &[Vec<S>], v: &[S], n: usize) -> Result<Vec<S>> {
    let ctx = v[0].context();
    let mut x = vec![S::zero_in(&ctx); n];
    for j in (0..n).rev() {
        let mut rhs = v[j].clone();
        for c in (j + 1)..n {
            rhs = rhs - a[j][c].clone() * x[c].clone();
        }
        let pivot_val = a[j][j].clone();
        if pivot_val.is_zero() {
            return Err(CollocationError::SingularMatrix { row: j });
        }
        x[j] = rhs / pivot_val;
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collocation::assemble;
    use crate::mesh::Mesh;
    use crate::scalar::F64Scalar;

    fn s(x: f64) -> F64Scalar {
        F64Scalar::new(x)
    }

    #[test]
    fn solves_classical_reaction_diffusion_problem() {
        // -y'' + 4y = 2(e^x + e^{-x}) on [0,1], y(0)=y(1)=e+1/e has the
        // closed form y(x) = e^x + e^{-x}; sanity-check the solved spline
        // matches at the boundary knots it was built from.
        let mesh = Mesh::uniform(6, s(0.0), s(1.0)).unwrap();
        let k = 2;
        let boundary = std::f64::consts::E + 1.0 / std::f64::consts::E;
        let sys = assemble(
            k,
            &mesh,
            s(1.0),
            s(boundary),
            s(boundary),
            |_x: &F64Scalar| s(0.0),
            |_x: &F64Scalar| s(-4.0),
            |x: &F64Scalar| s(2.0 * (x.0.exp() + (-x.0).exp())),
        )
        .unwrap();
        let x = solve(&sys).unwrap();
        assert_eq!(x.len(), sys.n);
        // Boundary ordinates should match the Dirichlet data exactly.
        assert!((x[0].0 - boundary).abs() < 1e-9);
        assert!((x[sys.n - 1].0 - boundary).abs() < 1e-9);
    }

    /// Textbook dense Gaussian elimination with partial pivoting, used only
    /// as an independent oracle: the block solver must reproduce the same
    /// solution a generic LU solve would, on a matrix sharing the
    /// collocation block structure.
    fn textbook_lu_solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Vec<f64> {
        let n = b.len();
        for col in 0..n {
            let mut pivot_row = col;
            let mut best = a[col][col].abs();
            for r in (col + 1)..n {
                if a[r][col].abs() > best {
                    best = a[r][col].abs();
                    pivot_row = r;
                }
            }
            a.swap(col, pivot_row);
            b.swap(col, pivot_row);
            for r in (col + 1)..n {
                let factor = a[r][col] / a[col][col];
                for c in col..n {
                    a[r][c] -= factor * a[col][c];
                }
                b[r] -= factor * b[col];
            }
        }
        let mut x = vec![0.0; n];
        for row in (0..n).rev() {
            let mut rhs = b[row];
            for c in (row + 1)..n {
                rhs -= a[row][c] * x[c];
            }
            x[row] = rhs / a[row][row];
        }
        x
    }

    /// Deterministic pseudo-random f64 sequence (xorshift), avoiding a new
    /// `rand` dependency for what is a small fixed-seed reproducibility
    /// test.
    fn xorshift_sequence(seed: u64, count: usize) -> Vec<f64> {
        let mut state = seed;
        (0..count)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                ((state % 2000) as f64 - 1000.0) / 100.0
            })
            .collect()
    }

    #[test]
    fn solver_matches_textbook_lu_on_block_structured_matrix() {
        // A random dense invertible matrix sharing the collocation block
        // structure, solved both by the block solver and by a textbook
        // dense LU, must agree to within floating-point tolerance.
        let (l, k) = (3usize, 2usize);
        let n = l * (k + 2);
        let structure = assemble(
            k,
            &Mesh::uniform(l, s(0.0), s(1.0)).unwrap(),
            s(1.0),
            s(0.0),
            s(0.0),
            |_x: &F64Scalar| s(0.0),
            |_x: &F64Scalar| s(0.0),
            |_x: &F64Scalar| s(0.0),
        )
        .unwrap()
        .structure;

        // Random diagonally-dominant matrix so it's guaranteed invertible,
        // independent of the actual collocation coefficients.
        let entries = xorshift_sequence(0xC0FFEE, n * n);
        let mut a = vec![vec![0.0f64; n]; n];
        for r in 0..n {
            for c in 0..n {
                a[r][c] = entries[r * n + c];
            }
            a[r][r] += n as f64 * 2.0;
        }
        let b = xorshift_sequence(0xBEEF, n);

        let a_s: Vec<Vec<F64Scalar>> = a.iter().map(|row| row.iter().map(|&x| s(x)).collect()).collect();
        let v_s: Vec<F64Scalar> = b.iter().map(|&x| s(x)).collect();
        let sys = AssembledSystem {
            a: a_s,
            v: v_s,
            structure,
            n,
        };

        let x_block = solve(&sys).unwrap();
        let x_lu = textbook_lu_solve(a, b);

        for i in 0..n {
            assert!(
                (x_block[i].0 - x_lu[i]).abs() < 1e-8,
                "index {i}: block solver={}, LU={}",
                x_block[i].0,
                x_lu[i]
            );
        }
    }

    #[test]
    fn singular_system_is_reported() {
        let mesh = Mesh::uniform(2, s(0.0), s(1.0)).unwrap();
        let sys = assemble(
            1,
            &mesh,
            s(1.0),
            s(0.0),
            s(0.0),
            |_x: &F64Scalar| s(0.0),
            |_x: &F64Scalar| s(0.0),
            |_x: &F64Scalar| s(0.0),
        )
        .unwrap();
        // A consistent system is never singular by construction here;
        // instead verify that an artificially zeroed row is caught.
        let mut broken = sys;
        for c in 0..broken.n {
            broken.a[2][c] = s(0.0);
        }
        assert!(matches!(solve(&broken), Err(CollocationError::SingularMatrix { .. })));
    }

    /// A matrix where no single row sums to zero (so the upfront row-scale
    /// check in `row_scales` cannot catch it) but two rows are linear
    /// duplicates, so the pivot search genuinely runs dry partway through
    /// elimination rather than failing on the first cheap check.
    #[test]
    fn rank_deficient_system_fails_during_elimination_not_upfront() {
        let a = vec![
            vec![s(1.0), s(1.0), s(1.0), s(1.0)],
            vec![s(1.0), s(1.0), s(1.0), s(1.0)],
            vec![s(0.0), s(1.0), s(0.0), s(1.0)],
            vec![s(1.0), s(0.0), s(1.0), s(0.0)],
        ];
        let v = vec![s(4.0), s(4.0), s(2.0), s(2.0)];
        let sys = AssembledSystem {
            a,
            v,
            structure: vec![(4, 4)],
            n: 4,
        };
        assert!(matches!(solve(&sys), Err(CollocationError::SingularMatrix { .. })));
    }
}
