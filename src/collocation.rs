//! The Bezier collocation assembler: builds the almost-block-diagonal
//! linear system `(A, v)` whose solution is the spline's Bezier ordinates,
//! plus the mu-cache and tau table it depends on.

use crate::binomial::Binomials;
use crate::error::{CollocationError, Result};
use crate::gauss_legendre::gauss_legendre_nodes;
use crate::mesh::Mesh;
use crate::scalar::Scalar;

/// Powers of `mu(tau)` and `1 - mu(tau)` for every collocation node,
/// cached once per mesh. `get` panics on an out-of-range index: the
/// mu-cache accessor is a programmer error, not a recoverable condition.
pub struct MuCache<S: Scalar> {
    k: usize,
    l: usize,
    pow: Vec<Vec<Vec<S>>>,
    pow_inv: Vec<Vec<Vec<S>>>,
}

impl<S: Scalar> MuCache<S> {
    /// `get(i, j, r, invers)` returns `mu^r` (or `(1-mu)^r` when `invers`)
    /// for the node `tau_{i k + j}`, `i` in `0..l`, `j`, `r` in `1..=k`.
    pub fn get(&self, i: usize, j: usize, r: usize, invers: bool) -> S {
        assert!(
            i < self.l && (1..=self.k).contains(&j) && (1..=self.k).contains(&r),
            "mu-cache index out of range: i={i}, j={j}, r={r}, l={}, k={}",
            self.l,
            self.k
        );
        if invers {
            self.pow_inv[i][j - 1][r - 1].clone()
        } else {
            self.pow[i][j - 1][r - 1].clone()
        }
    }
}

/// Builds the tau table and mu-cache for a mesh: `k` Gauss-Legendre nodes
/// mapped onto every subinterval.
pub fn build_tau_and_mu<S: Scalar>(k: usize, mesh: &Mesh<S>) -> Result<(Vec<S>, MuCache<S>)> {
    if k == 0 {
        return Err(CollocationError::InvalidArgument("k must be >= 1".into()));
    }
    let ctx = mesh.knots()[0].context();
    let rho = gauss_legendre_nodes::<S>(k, &ctx)?;
    let l = mesh.l();
    let one = S::one_in(&ctx);
    let two = S::from_i64_in(&ctx, 2);

    let mut tau = Vec::with_capacity(l * k);
    let mut pow = Vec::with_capacity(l);
    let mut pow_inv = Vec::with_capacity(l);

    for i in 0..l {
        let a = mesh.knots()[i].clone();
        let b = mesh.knots()[i + 1].clone();
        let mid = (a.clone() + b.clone()) / two.clone();
        let half_len = (b.clone() - a.clone()) / two.clone();
        let mut block_pow = Vec::with_capacity(k);
        let mut block_pow_inv = Vec::with_capacity(k);
        for rho_j in rho.iter().take(k) {
            let x = mid.clone() + half_len.clone() * rho_j.clone();
            tau.push(x.clone());
            let mu = (x - a.clone()) / (b.clone() - a.clone());
            let mu_inv = one.clone() - mu.clone();
            let mut row = Vec::with_capacity(k);
            let mut row_inv = Vec::with_capacity(k);
            let mut acc = one.clone();
            let mut acc_inv = one.clone();
            for _ in 0..k {
                acc = acc * mu.clone();
                row.push(acc.clone());
                acc_inv = acc_inv * mu_inv.clone();
                row_inv.push(acc_inv.clone());
            }
            block_pow.push(row);
            block_pow_inv.push(row_inv);
        }
        pow.push(block_pow);
        pow_inv.push(block_pow_inv);
    }

    Ok((tau, MuCache { k, l, pow, pow_inv }))
}

/// The assembled, dense-per-row linear system: `A` is `N x N`
/// (`N = l * (k + 2)`), `v` is the right-hand side, and `structure`
/// records `(rows, pivot_steps)` per block for the banded solver (spec
/// §3, §4.8).
pub struct AssembledSystem<S: Scalar> {
    pub a: Vec<Vec<S>>,
    pub v: Vec<S>,
    pub structure: Vec<(usize, usize)>,
    pub n: usize,
}

/// Builds `(A, v)` for the boundary value problem
/// `-eps y'' - p y' + q y = f` on `mesh` with `y(s) = eta1`, `y(t) = eta2`,
/// using `k` Gauss-Legendre collocation points per subinterval.
#[allow(clippy::too_many_arguments)]
pub fn assemble<S, P, Q, F>(
    k: usize,
    mesh: &Mesh<S>,
    eps: S,
    eta1: S,
    eta2: S,
    p: P,
    q: Q,
    f: F,
) -> Result<AssembledSystem<S>>
where
    S: Scalar,
    P: Fn(&S) -> S,
    Q: Fn(&S) -> S,
    F: Fn(&S) -> S,
{
    if k == 0 {
        return Err(CollocationError::InvalidArgument("k must be >= 1".into()));
    }
    let l = mesh.l();
    let ctx = mesh.knots()[0].context();
    if !eps.same_context(&eta1) || !eta1.same_context(&eta2) || !eps.same_context(&mesh.knots()[0]) {
        return Err(CollocationError::PrecisionMismatch);
    }
    if !eps.gt(&S::zero_in(&ctx)) && !Scalar::eq(&eps, &(-S::one_in(&ctx))) {
        // eps > 0 (singular perturbation) or eps == -1 (classical
        // convenience form) are both accepted.
        return Err(CollocationError::InvalidArgument(
            "eps must be > 0, or exactly -1 for the classical sign convention".into(),
        ));
    }

    let (tau, mu) = build_tau_and_mu(k, mesh)?;
    let n = l * (k + 2);
    let mut a = vec![vec![S::zero_in(&ctx); n]; n];
    let mut v = vec![S::zero_in(&ctx); n];

    // Left Dirichlet row.
    a[0][0] = S::one_in(&ctx);
    v[0] = eta1;

    for i in 0..l {
        let base = i * (k + 2);
        let delta = mesh.knots()[i + 1].clone() - mesh.knots()[i].clone();
        let row = collocation_row_coefficients(&ctx, k, &delta, &eps);
        for j in 1..=k {
            let tau_ikj = tau[i * k + j - 1].clone();
            let p_j = p(&tau_ikj);
            let q_j = q(&tau_ikj);
            let coeffs = row(&mu, i, j, &p_j, &q_j);
            let grow = &mut a[base + j];
            for (c, coeff) in coeffs.into_iter().enumerate() {
                grow[base + c] = coeff;
            }
            v[base + j] = f(&tau_ikj);
        }
    }

    for i in 1..l {
        let base = i * (k + 2);
        let d_prev = mesh.knots()[i].clone() - mesh.knots()[i - 1].clone();
        let d_cur = mesh.knots()[i + 1].clone() - mesh.knots()[i].clone();
        let c1_row = base - 1; // (i)*(k+2) - 1 = (i-1+1)*(k+2) - 1
        let c0_row = base;
        let win0 = (i - 1) * (k + 2) + k; // b_{i-1,k}
        let win1 = win0 + 1; // b_{i-1,k+1}
        let win2 = base; // b_{i,0}
        let win3 = base + 1; // b_{i,1}

        a[c1_row][win0] = d_cur.clone();
        a[c1_row][win1] = -(d_prev.clone() + d_cur.clone());
        a[c1_row][win2] = S::zero_in(&ctx);
        a[c1_row][win3] = d_prev.clone();
        v[c1_row] = S::zero_in(&ctx);

        a[c0_row][win0] = S::zero_in(&ctx);
        a[c0_row][win1] = S::one_in(&ctx);
        a[c0_row][win2] = -S::one_in(&ctx);
        a[c0_row][win3] = S::zero_in(&ctx);
        v[c0_row] = S::zero_in(&ctx);
    }

    // Right Dirichlet row.
    a[n - 1][n - 1] = S::one_in(&ctx);
    v[n - 1] = eta2;

    let structure = build_structure(l, k);
    Ok(AssembledSystem { a, v, structure, n })
}

/// Row-coefficient formula dispatcher: `k = 1` needs the direct
/// substitution of the quadratic Bezier representation into the governing
/// ODE (its general-formula limit does not apply, so the k=1 layout stays
/// a branch-explicit hot path); `k >= 2` follows the general per-column
/// formulas verbatim.
fn collocation_row_coefficients<S: Scalar>(
    ctx: &S::Context,
    k: usize,
    delta: &S,
    eps: &S,
) -> impl Fn(&MuCache<S>, usize, usize, &S, &S) -> Vec<S> {
    let ctx = ctx.clone();
    let k_plus_1 = S::from_i64_in(&ctx, (k + 1) as i64);
    let k_f = S::from_i64_in(&ctx, k as i64);
    let delta2 = delta.clone() * delta.clone();
    let k_prime = k_plus_1.clone() / delta.clone();
    let k2 = eps.clone() * k_plus_1.clone() * k_f.clone() / delta2.clone();
    let delta = delta.clone();
    let bin_km1 = Binomials::new(k.saturating_sub(1));
    let bin_k = Binomials::new(k);
    let bin_kp1 = Binomials::new(k + 1);

    move |mu: &MuCache<S>, i: usize, j: usize, p_j: &S, q_j: &S| -> Vec<S> {
        let ctx = ctx.clone();
        let one = S::one_in(&ctx);
        let two = S::from_i64_in(&ctx, 2);
        let mut row = vec![S::zero_in(&ctx); k + 2];

        let mu_plus = |r: usize| mu.get(i, j, r, false);
        let mu_minus = |r: usize| mu.get(i, j, r, true);
        // mu^0 / (1-mu)^0 without a dedicated r=0 cache slot.
        let pow_plus = |r: usize| if r == 0 { one.clone() } else { mu_plus(r) };
        let pow_minus = |r: usize| if r == 0 { one.clone() } else { mu_minus(r) };

        if k == 1 {
            // Direct substitution for the quadratic segment
            // y = (1-mu)^2 b0 + 2 mu (1-mu) b1 + mu^2 b2 into
            // -eps y'' - p y' + q y.
            let mm1 = mu_minus(1);
            let mm2 = mu_minus(2);
            let mp1 = mu_plus(1);
            let mp2 = mu_plus(2);
            row[0] = p_j.clone() * k_prime.clone() * mm1.clone() + q_j.clone() * mm2 - k2.clone();
            row[1] = two.clone() * k2.clone()
                - k_prime.clone() * p_j.clone() * (one.clone() - two.clone() * mp1.clone())
                + two.clone() * q_j.clone() * mp1.clone() * mm1;
            row[2] = -k2.clone() - k_prime.clone() * p_j.clone() * mp1 + q_j.clone() * mp2;
            return row;
        }

        // column 0
        row[0] = pow_minus(k - 1)
            * (p_j.clone() * k_prime.clone() * mu_minus(1) + q_j.clone() * mu_minus(2) - k2.clone());

        // column 1
        row[1] = pow_minus(k - 2)
            * k_plus_1.clone()
            * (eps.clone() * k_f.clone() / delta2.clone() * (two.clone() - k_plus_1.clone() * mu_plus(1))
                - (p_j.clone() / delta.clone()) * (one.clone() - k_plus_1.clone() * mu_plus(1)) * mu_minus(1)
                + q_j.clone() * mu_minus(2) * mu_plus(1));

        // interior columns kappa = 2 ..= k-1
        for kappa in 2..k {
            let c_km1_kapm1 = S::from_i64_in(&ctx, bin_km1.get(kappa - 1) as i64);
            let c_km1_kapm2 = S::from_i64_in(&ctx, bin_km1.get(kappa - 2) as i64);
            let c_km1_kap = S::from_i64_in(&ctx, bin_km1.get(kappa) as i64);
            let c_kp1_kap = S::from_i64_in(&ctx, bin_kp1.get(kappa) as i64);
            let c_k_kapm1 = S::from_i64_in(&ctx, bin_k.get(kappa - 1) as i64);

            let term1 = k2.clone()
                * (two.clone() * c_km1_kapm1 * mu_minus(1) * mu_plus(1)
                    - c_km1_kapm2 * mu_minus(2)
                    - c_km1_kap * mu_plus(2))
                * pow_minus((k - 1).saturating_sub(kappa))
                * pow_plus(kappa - 2);

            let term2 = p_j.clone()
                * k_prime.clone()
                * (-(c_kp1_kap.clone()) * mu_plus(1) + c_k_kapm1)
                * pow_minus(k - kappa)
                * pow_plus(kappa - 1);

            let term3 = q_j.clone() * c_kp1_kap * pow_minus((k + 1).saturating_sub(kappa)) * pow_plus(kappa);

            row[kappa] = term1 - term2 + term3;
        }

        // column k: mirror of column 1 with mu+ <-> mu-
        row[k] = pow_plus(k - 2)
            * k_plus_1.clone()
            * (eps.clone() * k_f.clone() / delta2.clone() * (two.clone() - k_plus_1.clone() * mu_minus(1))
                - (p_j.clone() / delta.clone()) * (one.clone() - k_plus_1.clone() * mu_minus(1)) * mu_plus(1)
                + q_j.clone() * mu_plus(2) * mu_minus(1));

        // column k+1
        row[k + 1] =
            mu_plus(k - 1) * (p_j.clone() * k_prime.clone() * mu_plus(1) - q_j.clone() * mu_plus(2) + k2.clone());

        row
    }
}

/// Generates the solver's block structure. `l == 1` is a single block of
/// `k+2` rows/pivots. For `l > 1` and `k >= 2`:
/// `[(k+1,k), (2,2),(k,k), ..., (k+1,k+2)]`. For `k == 1`, the penultimate
/// continuity pair keeps only its C1 row and the C0 row migrates into the
/// (now widened) final block.
fn build_structure(l: usize, k: usize) -> Vec<(usize, usize)> {
    if l == 1 {
        return vec![(k + 2, k + 2)];
    }
    let mut structure = Vec::with_capacity(2 * l);
    structure.push((k + 1, k));
    for i in 1..l - 1 {
        let _ = i;
        structure.push((2, 2));
        structure.push((k, k));
    }
    if k == 1 {
        structure.push((1, 1));
        structure.push((k + 2, k + 3));
    } else {
        structure.push((2, 2));
        structure.push((k + 1, k + 2));
    }
    structure
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::F64Scalar;

    fn s(x: f64) -> F64Scalar {
        F64Scalar::new(x)
    }

    #[test]
    fn structure_row_counts_sum_to_n() {
        for (l, k) in [(1usize, 2usize), (3, 2), (8, 4), (3, 1), (5, 1)] {
            let st = build_structure(l, k);
            let rows: usize = st.iter().map(|(r, _)| r).sum();
            assert_eq!(rows, l * (k + 2));
        }
    }

    #[test]
    fn assemble_detects_precision_mismatch() {
        use crate::scalar::TaggedScalar;
        let mesh = Mesh::uniform(4, TaggedScalar::new(1, 0.0), TaggedScalar::new(1, 1.0)).unwrap();
        let result = assemble(
            2,
            &mesh,
            TaggedScalar::new(2, 1.0), // eps tagged differently from the mesh
            TaggedScalar::new(1, 0.0),
            TaggedScalar::new(1, 0.0),
            |_x: &TaggedScalar| TaggedScalar::new(1, 0.0),
            |_x: &TaggedScalar| TaggedScalar::new(1, -4.0),
            |_x: &TaggedScalar| TaggedScalar::new(1, 0.0),
        );
        assert!(matches!(result, Err(CollocationError::PrecisionMismatch)));
    }

    #[test]
    fn assemble_produces_expected_dimensions() {
        let mesh = Mesh::uniform(4, s(0.0), s(1.0)).unwrap();
        let k = 2;
        let sys = assemble(
            k,
            &mesh,
            s(1.0),
            s(0.0),
            s(0.0),
            |_x: &F64Scalar| s(0.0),
            |_x: &F64Scalar| s(-4.0),
            |_x: &F64Scalar| s(2.0 * (std::f64::consts::E + 1.0 / std::f64::consts::E)),
        )
        .unwrap();
        assert_eq!(sys.n, 4 * (k + 2));
        assert_eq!(sys.a.len(), sys.n);
        assert_eq!(sys.v.len(), sys.n);
    }
}
