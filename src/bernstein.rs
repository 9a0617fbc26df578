//! Bernstein-Bezier segment: de Casteljau evaluation and derivatives.

use crate::binomial::Binomials;
use crate::error::{CollocationError, Result};
use crate::scalar::Scalar;

/// One polynomial piece of the spline, stored as Bezier ordinates over
/// `[s, t]`. `n = degree`, so there are `n + 1` ordinates.
#[derive(Clone, Debug)]
pub struct BezierSegment<S: Scalar> {
    s: S,
    t: S,
    ordinates: Vec<S>,
    delta: S,
}

impl<S: Scalar> BezierSegment<S> {
    pub fn new(s: S, t: S, ordinates: Vec<S>) -> Result<Self> {
        if !t.gt(&s) {
            return Err(CollocationError::InvalidArgument("segment requires t > s".into()));
        }
        if ordinates.is_empty() {
            return Err(CollocationError::InvalidArgument(
                "segment needs at least one ordinate".into(),
            ));
        }
        let delta = t.clone() - s.clone();
        Ok(BezierSegment { s, t, ordinates, delta })
    }

    pub fn degree(&self) -> usize {
        self.ordinates.len() - 1
    }

    pub fn s(&self) -> &S {
        &self.s
    }

    pub fn t(&self) -> &S {
        &self.t
    }

    pub fn ordinates(&self) -> &[S] {
        &self.ordinates
    }

    fn mu(&self, x: &S) -> S {
        (x.clone() - self.s.clone()) / self.delta.clone()
    }

    /// Runs `rounds` de Casteljau reduction steps starting from the
    /// ordinates, returning the intermediate row `b^(rounds)`. Iterative,
    /// not recursive, to avoid stack depth proportional to degree (spec
    /// §4.5 implementation note).
    fn de_casteljau_row(&self, mu: &S, rounds: usize) -> Vec<S> {
        let ctx = self.s.context();
        let one = S::one_in(&ctx);
        let one_minus_mu = one - mu.clone();
        let mut row = self.ordinates.clone();
        for _ in 0..rounds {
            let mut next = Vec::with_capacity(row.len() - 1);
            for i in 0..row.len() - 1 {
                next.push(mu.clone() * row[i + 1].clone() + one_minus_mu.clone() * row[i].clone());
            }
            row = next;
        }
        row
    }

    /// `g(x)` via de Casteljau.
    pub fn value(&self, x: &S) -> S {
        let mu = self.mu(x);
        let row = self.de_casteljau_row(&mu, self.degree());
        row[0].clone()
    }

    /// `d^nu g / dx^nu` at `x`. `nu = 1` and `nu = 2` are branch-explicit
    /// hot paths; `nu >= 3` uses the general finite-difference form over
    /// the reduced control net, and `nu = 0` is just `value`.
    pub fn derivative(&self, x: &S, nu: usize) -> S {
        let n = self.degree();
        let ctx = self.s.context();
        if nu == 0 {
            return self.value(x);
        }
        if nu > n {
            return S::zero_in(&ctx);
        }
        let mu = self.mu(x);
        match nu {
            1 => {
                let row = self.de_casteljau_row(&mu, n - 1);
                let nf = S::from_i64_in(&ctx, n as i64);
                nf / self.delta.clone() * (row[1].clone() - row[0].clone())
            }
            2 => {
                let row = self.de_casteljau_row(&mu, n - 2);
                let nf = S::from_i64_in(&ctx, n as i64);
                let nm1 = S::from_i64_in(&ctx, (n - 1) as i64);
                let delta2 = self.delta.clone() * self.delta.clone();
                let two = S::from_i64_in(&ctx, 2);
                (nf * nm1 / delta2) * (row[0].clone() - two * row[1].clone() + row[2].clone())
            }
            _ => {
                let row = self.de_casteljau_row(&mu, n - nu);
                let bin = Binomials::new(nu);
                let mut fact = S::one_in(&ctx);
                for m in (n - nu + 1)..=n {
                    fact = fact * S::from_i64_in(&ctx, m as i64);
                }
                let delta_nu = {
                    let mut d = S::one_in(&ctx);
                    for _ in 0..nu {
                        d = d * self.delta.clone();
                    }
                    d
                };
                let mut sum = S::zero_in(&ctx);
                for j in 0..=nu {
                    let sign = if (nu - j) % 2 == 0 {
                        S::one_in(&ctx)
                    } else {
                        -S::one_in(&ctx)
                    };
                    let coeff = S::from_i64_in(&ctx, bin.get(j) as i64);
                    sum = sum + sign * coeff * row[j].clone();
                }
                (fact / delta_nu) * sum
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::F64Scalar;

    fn s(x: f64) -> F64Scalar {
        F64Scalar::new(x)
    }

    #[test]
    fn value_at_endpoints_matches_ordinates() {
        let seg = BezierSegment::new(s(0.0), s(1.0), vec![s(1.0), s(2.0), s(5.0), s(3.0)]).unwrap();
        approx::assert_abs_diff_eq!(seg.value(&s(0.0)).0, 1.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(seg.value(&s(1.0)).0, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn bernstein_basis_partitions_unity() {
        // sum_j C(n,j) mu^j (1-mu)^(n-j) == 1 for all mu, realized by
        // evaluating a segment whose ordinates are all 1: de Casteljau
        // collapses every convex combination straight back to 1.
        let seg = BezierSegment::new(s(0.0), s(1.0), vec![s(1.0); 5]).unwrap();
        for x in [0.0, 0.1, 0.37, 0.5, 0.82, 1.0] {
            approx::assert_abs_diff_eq!(seg.value(&s(x)).0, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn linear_segment_has_constant_first_derivative() {
        // ordinates of x on [0,2]: b0=0, b1=1 (degree 1)
        let seg = BezierSegment::new(s(0.0), s(2.0), vec![s(0.0), s(2.0)]).unwrap();
        for x in [0.0, 0.5, 1.0, 2.0] {
            assert!((seg.derivative(&s(x), 1).0 - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn quadratic_matches_naive_polynomial() {
        // Bezier ordinates representing x^2 on [0,1]: b0=0,b1=0,b2=1 for
        // B(mu) = 2*mu*(1-mu)*0 + mu^2*1 = mu^2.
        let seg = BezierSegment::new(s(0.0), s(1.0), vec![s(0.0), s(0.0), s(1.0)]).unwrap();
        for x in [0.0, 0.25, 0.5, 0.75, 1.0] {
            let expect = x * x;
            assert!((seg.value(&s(x)).0 - expect).abs() < 1e-9);
            let expect_d1 = 2.0 * x;
            assert!((seg.derivative(&s(x), 1).0 - expect_d1).abs() < 1e-8);
            let expect_d2 = 2.0;
            assert!((seg.derivative(&s(x), 2).0 - expect_d2).abs() < 1e-7);
        }
    }

    #[test]
    fn general_nu_matches_hardcoded_nu_for_cubic() {
        let seg = BezierSegment::new(s(0.0), s(1.0), vec![s(1.0), s(-2.0), s(3.0), s(0.5)]).unwrap();
        for x in [0.1, 0.4, 0.9] {
            let d1_hot = seg.derivative(&s(x), 1);
            // degree 3, nu=1 also reachable through the general branch by
            // temporarily checking consistency of the n=1,2 hardcoded
            // paths against a numerical derivative.
            let h = 1e-6;
            let numeric = (seg.value(&s(x + h)).0 - seg.value(&s(x - h)).0) / (2.0 * h);
            assert!((d1_hot.0 - numeric).abs() < 1e-4);
        }
    }
}
