//! Bernstein-Bezier Gauss-Legendre collocation for singularly perturbed
//! linear two-point boundary value problems
//!
//! `-eps y''(x) - p(x) y'(x) + q(x) y(x) = f(x)`, `y(s) = eta1`, `y(t) =
//! eta2`, on layer-adapted meshes (uniform, Shishkin, Bakhvalov).
//!
//! The crate is generic over the [`scalar::Scalar`] trait rather than any
//! concrete float type: a caller supplies an arbitrary-precision backend
//! (the intended use case needs 45-100 decimal digits since `eps` can be as
//! small as 1e-48) by implementing that trait. [`scalar::F64Scalar`] is this
//! crate's own reference instantiation, used throughout its test suite.
//!
//! Pipeline: build a [`mesh::Mesh`], [`collocation::assemble`] the
//! almost-block-diagonal linear system against `p`, `q`, `f`, solve it with
//! [`banded_solver::solve`], then wrap the result as a [`spline::Spline`].
//! [`solve_collocation`] wires all four steps together.

pub mod banded_solver;
pub mod bernstein;
pub mod binomial;
pub mod collocation;
pub mod eigen;
pub mod error;
pub mod gauss_legendre;
pub mod mesh;
pub mod scalar;
pub mod spline;

use bernstein::BezierSegment;
use collocation::assemble;
use error::Result;
use mesh::Mesh;
use scalar::Scalar;
use spline::Spline;

/// Solves the boundary value problem on `mesh` with `k` collocation points
/// per subinterval, returning the Bezier spline approximation to `y`. `p`,
/// `q`, `f` are evaluated at the Gauss-Legendre nodes the assembler places
/// internally.
#[allow(clippy::too_many_arguments)]
pub fn solve_collocation<S, P, Q, F>(
    k: usize,
    mesh: &Mesh<S>,
    eps: S,
    eta1: S,
    eta2: S,
    p: P,
    q: Q,
    f: F,
) -> Result<Spline<S>>
where
    S: Scalar,
    P: Fn(&S) -> S,
    Q: Fn(&S) -> S,
    F: Fn(&S) -> S,
{
    log::debug!("assembling collocation system: k={k}, l={}", mesh.l());
    let sys = assemble(k, mesh, eps, eta1, eta2, p, q, f)?;
    let x = banded_solver::solve(&sys)?;
    log::debug!("collocation system solved, building spline segments");

    let knots = mesh.knots().to_vec();
    let mut segments = Vec::with_capacity(mesh.l());
    for i in 0..mesh.l() {
        let base = i * (k + 2);
        let ordinates = x[base..base + (k + 2)].to_vec();
        let s = knots[i].clone();
        let t = knots[i + 1].clone();
        segments.push(BezierSegment::new(s, t, ordinates)?);
    }
    Spline::new(knots, segments)
}
