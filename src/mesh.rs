//! Layer-adapted mesh generators: uniform, Shishkin (convection, reaction),
//! Bakhvalov, and r-fold uniform refinement.

use crate::error::{CollocationError, Result};
use crate::scalar::Scalar;

/// A strictly increasing knot sequence `xi_0 = s < ... < xi_l = t`.
/// Immutable once built; cloned on export.
#[derive(Clone, Debug)]
pub struct Mesh<S: Scalar> {
    knots: Vec<S>,
}

impl<S: Scalar> Mesh<S> {
    pub fn knots(&self) -> &[S] {
        &self.knots
    }

    pub fn l(&self) -> usize {
        self.knots.len() - 1
    }

    /// Builds a mesh from an already-increasing knot vector, validating the
    /// monotonicity invariant.
    fn from_knots(knots: Vec<S>) -> Result<Self> {
        if knots.len() < 2 {
            return Err(CollocationError::InvalidArgument(
                "mesh needs at least one subinterval".into(),
            ));
        }
        for w in knots.windows(2) {
            if !w[1].gt(&w[0]) {
                return Err(CollocationError::InvalidArgument(
                    "mesh knots must be strictly increasing".into(),
                ));
            }
        }
        Ok(Mesh { knots })
    }

    /// `xi_i = s + i * (t - s) / l`, accumulated additively to minimize
    /// roundoff.
    pub fn uniform(l: usize, s: S, t: S) -> Result<Self> {
        if l == 0 {
            return Err(CollocationError::InvalidArgument("l must be >= 1".into()));
        }
        if !s.same_context(&t) {
            return Err(CollocationError::PrecisionMismatch);
        }
        if !t.gt(&s) {
            return Err(CollocationError::InvalidArgument("require s < t".into()));
        }
        let ctx = s.context();
        let step = (t.clone() - s.clone()) / S::from_i64_in(&ctx, l as i64);
        let mut knots = Vec::with_capacity(l + 1);
        knots.push(s.clone());
        for _ in 0..l {
            let prev = knots.last().unwrap().clone();
            knots.push(prev + step.clone());
        }
        *knots.last_mut().unwrap() = t;
        Mesh::from_knots(knots)
    }

    /// Shishkin mesh for a convection-dominated problem: two uniform
    /// pieces, transitioning at `tau = min(q, sigma * eps / beta * ln(l))`.
    #[allow(clippy::too_many_arguments)]
    pub fn shishkin_convection(l: usize, s: S, t: S, q: S, sigma: S, beta: S, eps: S) -> Result<Self> {
        if l < 2 {
            return Err(CollocationError::InvalidArgument(
                "Shishkin mesh requires l >= 2 to place layer nodes".into(),
            ));
        }
        validate_layer_params(&q, &sigma, &beta, &eps)?;
        if !s.same_context(&t) || !s.same_context(&q) {
            return Err(CollocationError::PrecisionMismatch);
        }
        let ctx = s.context();
        let q_l = ((q.clone() * S::from_i64_in(&ctx, l as i64)).floor_to_usize())?;
        let tau = shishkin_tau(&q, &sigma, &beta, &eps, l);
        build_two_piece(l, q_l, s, t, tau)
    }

    /// Shishkin mesh for a reaction-dominated problem: three uniform
    /// pieces, symmetric boundary layers at both ends.
    #[allow(clippy::too_many_arguments)]
    pub fn shishkin_reaction(
        l: usize,
        s: S,
        t: S,
        q0: S,
        q1: S,
        sigma0: S,
        sigma1: S,
        gamma: S,
        eps: S,
    ) -> Result<Self> {
        if l < 3 {
            return Err(CollocationError::InvalidArgument(
                "Shishkin reaction mesh requires l >= 3 to place both layers".into(),
            ));
        }
        validate_layer_params(&q0, &sigma0, &gamma, &eps)?;
        validate_layer_params(&q1, &sigma1, &gamma, &eps)?;
        if !s.same_context(&t) || !s.same_context(&q0) || !q0.same_context(&q1) {
            return Err(CollocationError::PrecisionMismatch);
        }
        let ctx = s.context();
        let lf = S::from_i64_in(&ctx, l as i64);
        let q0_l = ((q0.clone() * lf.clone()).floor_to_usize())?;
        let q1_l = ((q1.clone() * lf.clone()).floor_to_usize())?;
        let tau0 = shishkin_tau(&q0, &sigma0, &gamma, &eps, l);
        let tau1 = shishkin_tau(&q1, &sigma1, &gamma, &eps, l);

        let span = t.clone() - s.clone();
        let left_end = s.clone() + tau0.clone() * span.clone();
        let right_start = t.clone() - tau1.clone() * span.clone();
        let interior_l = l - q0_l - q1_l;
        if q0_l == 0 || q1_l == 0 || interior_l == 0 {
            return Err(CollocationError::InvalidArgument(
                "Shishkin reaction mesh parameters leave an empty piece".into(),
            ));
        }

        let mut knots = Vec::with_capacity(l + 1);
        knots.push(s.clone());
        accumulate_uniform(&mut knots, q0_l, left_end.clone());
        accumulate_uniform(&mut knots, interior_l, right_start.clone());
        accumulate_uniform(&mut knots, q1_l, t.clone());
        *knots.last_mut().unwrap() = t;
        Mesh::from_knots(knots)
    }

    /// Bakhvalov mesh for a convection-dominated problem: a graded layer
    /// defined by the generating function `chi`, with the transition point
    /// `tau` found by fixed-point iteration.
    pub fn bakhvalov_convection(l: usize, s: S, t: S, q: S, sigma: S, beta: S, eps: S) -> Result<Self> {
        if l == 0 {
            return Err(CollocationError::InvalidArgument("l must be >= 1".into()));
        }
        if !s.same_context(&t) || !s.same_context(&q) || !s.same_context(&sigma) || !s.same_context(&beta) || !s.same_context(&eps) {
            return Err(CollocationError::PrecisionMismatch);
        }
        if !t.gt(&s) {
            return Err(CollocationError::InvalidArgument("require s < t".into()));
        }
        let ctx = s.context();
        let zero = S::zero_in(&ctx);
        let one = S::one_in(&ctx);

        let sigma_eps = sigma.clone() * eps.clone();
        let beta_q = beta.clone() * q.clone();
        if sigma_eps.ge(&beta_q) {
            log::debug!("Bakhvalov mesh degenerates to uniform (sigma*eps >= beta*q)");
            return Mesh::uniform(l, s, t);
        }

        let c = sigma_eps / beta;
        let chi = |r: &S| -> S { -(c.clone()) * ((q.clone() - r.clone()) / q.clone()).ln() };

        let mut tau = zero.clone();
        loop {
            let chi_tau = chi(&tau);
            let next_tau = q.clone() - c.clone() * (one.clone() - tau.clone()) / (one.clone() - chi_tau);
            if Scalar::eq(&(next_tau.clone() - tau.clone()), &zero) {
                tau = next_tau;
                break;
            }
            tau = next_tau;
        }
        log::trace!("Bakhvalov transition point converged");

        let lf = S::from_i64_in(&ctx, l as i64);
        let span = t.clone() - s.clone();
        let mut knots = Vec::with_capacity(l + 1);
        knots.push(s.clone());

        let mut first_outside: Option<usize> = None;
        for i in 1..l {
            let r_i = S::from_i64_in(&ctx, i as i64) / lf.clone();
            if r_i.lt(&tau) {
                knots.push(s.clone() + chi(&r_i) * span.clone());
            } else {
                first_outside = Some(i);
                break;
            }
        }

        if let Some(i0) = first_outside {
            let r_i0 = S::from_i64_in(&ctx, i0 as i64) / lf.clone();
            let anchor_r = chi(&tau) + (c.clone() / (q.clone() - tau.clone())) * (r_i0 - tau.clone());
            let anchor = s.clone() + anchor_r * span.clone();
            knots.push(anchor.clone());
            let remaining = l - i0;
            accumulate_uniform(&mut knots, remaining, t.clone());
        } else {
            // Every interior r_i fell inside the layer: there is no
            // uniform tail to place, just the final knot itself.
            knots.push(t.clone());
        }
        *knots.last_mut().unwrap() = t;
        Mesh::from_knots(knots)
    }

    /// Produces `r * l + 1` knots by uniform subdivision of every original
    /// subinterval.
    pub fn refined(base: &Mesh<S>, r: usize) -> Result<Self> {
        if r == 0 {
            return Err(CollocationError::InvalidArgument("refinement factor must be >= 1".into()));
        }
        let ctx = base.knots[0].context();
        let rf = S::from_i64_in(&ctx, r as i64);
        let mut knots = Vec::with_capacity(base.l() * r + 1);
        knots.push(base.knots[0].clone());
        for w in base.knots.windows(2) {
            let (a, b) = (w[0].clone(), w[1].clone());
            let step = (b.clone() - a.clone()) / rf.clone();
            for j in 1..r {
                let jf = S::from_i64_in(&ctx, j as i64);
                knots.push(a.clone() + step.clone() * jf);
            }
            knots.push(b);
        }
        Mesh::from_knots(knots)
    }
}

/// Builds the two-piece Shishkin convection mesh: `q_l` uniform
/// subintervals up to the transition point, then `l - q_l` uniform
/// subintervals to `t`.
fn build_two_piece<S: Scalar>(l: usize, q_l: usize, s: S, t: S, tau: S) -> Result<Mesh<S>> {
    if q_l == 0 || q_l >= l {
        return Err(CollocationError::InvalidArgument(
            "Shishkin mesh parameters leave an empty piece".into(),
        ));
    }
    let transition = s.clone() + tau * (t.clone() - s.clone());
    let mut knots = Vec::with_capacity(l + 1);
    knots.push(s);
    accumulate_uniform(&mut knots, q_l, transition);
    accumulate_uniform(&mut knots, l - q_l, t.clone());
    *knots.last_mut().unwrap() = t;
    Mesh::from_knots(knots)
}

fn validate_layer_params<S: Scalar>(q: &S, sigma: &S, beta_or_gamma: &S, eps: &S) -> Result<()> {
    if !q.same_context(sigma) || !q.same_context(beta_or_gamma) || !q.same_context(eps) {
        return Err(CollocationError::PrecisionMismatch);
    }
    let ctx = q.context();
    let zero = S::zero_in(&ctx);
    let one = S::one_in(&ctx);
    if !(q.gt(&zero) && q.lt(&one)) {
        return Err(CollocationError::InvalidArgument("q must lie in (0,1)".into()));
    }
    if !sigma.gt(&zero) {
        return Err(CollocationError::InvalidArgument("sigma must be > 0".into()));
    }
    if !beta_or_gamma.gt(&zero) {
        return Err(CollocationError::InvalidArgument("beta/gamma must be > 0".into()));
    }
    if !eps.gt(&zero) {
        return Err(CollocationError::InvalidArgument("eps must be > 0".into()));
    }
    Ok(())
}

fn shishkin_tau<S: Scalar>(q: &S, sigma: &S, beta_or_gamma: &S, eps: &S, l: usize) -> S {
    let ctx = q.context();
    let lf = S::from_i64_in(&ctx, l as i64);
    let tau = sigma.clone() * eps.clone() / beta_or_gamma.clone() * lf.ln();
    if tau.gt(q) {
        q.clone()
    } else {
        tau
    }
}

/// Appends `count` uniformly spaced knots ending exactly at `end`, starting
/// from the current last knot in `knots`.
fn accumulate_uniform<S: Scalar>(knots: &mut Vec<S>, count: usize, end: S) {
    let start = knots.last().unwrap().clone();
    let ctx = start.context();
    let countf = S::from_i64_in(&ctx, count as i64);
    let step = (end.clone() - start.clone()) / countf;
    for i in 1..count {
        let i_f = S::from_i64_in(&ctx, i as i64);
        knots.push(start.clone() + step.clone() * i_f);
    }
    knots.push(end);
}

trait FloorToUsize<S> {
    fn floor_to_usize(self) -> Result<usize>;
}

impl<S: Scalar> FloorToUsize<S> for S {
    fn floor_to_usize(self) -> Result<usize> {
        let floored = self.floor();
        let ctx = floored.context();
        let mut acc = floored.clone();
        let one = S::one_in(&ctx);
        let mut count = 0usize;
        while acc.ge(&one) {
            acc = acc - one.clone();
            count += 1;
            if count > 1_000_000 {
                return Err(CollocationError::InvalidArgument(
                    "layer fraction q*l is implausibly large".into(),
                ));
            }
        }
        Ok(count)
    }
}
