//! The assembled spline: an ordered sequence of Bezier segments dispatched
//! by knot.

use crate::bernstein::BezierSegment;
use crate::error::{CollocationError, Result};
use crate::scalar::Scalar;

#[derive(Clone, Debug)]
pub struct Spline<S: Scalar> {
    knots: Vec<S>,
    segments: Vec<BezierSegment<S>>,
}

impl<S: Scalar> Spline<S> {
    pub fn new(knots: Vec<S>, segments: Vec<BezierSegment<S>>) -> Result<Self> {
        if knots.len() != segments.len() + 1 {
            return Err(CollocationError::DimensionMismatch {
                expected: segments.len() + 1,
                actual: knots.len(),
            });
        }
        Ok(Spline { knots, segments })
    }

    pub fn knots(&self) -> &[S] {
        &self.knots
    }

    pub fn segments(&self) -> &[BezierSegment<S>] {
        &self.segments
    }

    /// Index of the segment covering `x`: the last segment whose left
    /// knot is `<= x`, extending flatly beyond the mesh's ends.
    fn segment_index(&self, x: &S) -> usize {
        let l = self.segments.len();
        if x.le(&self.knots[0]) {
            return 0;
        }
        if x.ge(&self.knots[l]) {
            return l - 1;
        }
        // linear scan: l is the collocation mesh size, not expected to be
        // large enough to warrant a binary search in practice.
        let mut i = 0;
        while i + 1 < l && self.knots[i + 1].le(x) {
            i += 1;
        }
        i
    }

    pub fn value(&self, x: &S) -> S {
        self.segments[self.segment_index(x)].value(x)
    }

    pub fn derivative(&self, x: &S, nu: usize) -> S {
        self.segments[self.segment_index(x)].derivative(x, nu)
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
    fn dispatch_picks_correct_segment_and_extends_flatly() {
        let seg0 = BezierSegment::new(s(0.0), s(1.0), vec![s(0.0), s(1.0)]).unwrap();
        let seg1 = BezierSegment::new(s(1.0), s(2.0), vec![s(1.0), s(2.0)]).unwrap();
        let sp = Spline::new(vec![s(0.0), s(1.0), s(2.0)], vec![seg0, seg1]).unwrap();
        assert!((sp.value(&s(0.5)).0 - 0.5).abs() < 1e-12);
        assert!((sp.value(&s(1.5)).0 - 1.5).abs() < 1e-12);
        // left/right extension
        assert!((sp.value(&s(-1.0)).0 - (-1.0)).abs() < 1e-12);
        assert!((sp.value(&s(3.0)).0 - 3.0).abs() < 1e-12);
    }
}
