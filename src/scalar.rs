//! The arbitrary-precision scalar contract.
//!
//! The collocation assembler, the banded solver, and the tridiagonal
//! eigensolver are all generic over a single [`Scalar`] trait rather than a
//! concrete float type. Real callers are expected to plug in an
//! arbitrary-precision backend (45-100 decimal digits, as called for by
//! singularly perturbed problems with `eps` as small as 1e-48); that
//! backend is external to this crate. [`F64Scalar`] is the reference
//! instantiation used by this crate's own test suite.

use std::fmt::Debug;

/// Every scalar carries a `Context`: the precision (and any other
/// construction-time parameter) it was built with. Two scalars built from
/// different contexts must never be combined; [`Scalar::same_context`] is
/// the hook implementations use to detect that at runtime.
pub trait ScalarContext: Clone + PartialEq + Debug {}

impl ScalarContext for () {}

/// An ordered field of (conceptually arbitrary-precision) real numbers.
///
/// Mixing values produced by contexts that do not compare equal under
/// [`Scalar::same_context`] is undefined; callers that need the guard
/// enforced should check it before combining scalars from
/// independently-constructed contexts (the assembler does this once, at
/// construction, rather than per-operation, since `p`/`q`/`f` callbacks are
/// assumed to close over a single shared context).
pub trait Scalar:
    Sized
    + Clone
    + Debug
    + std::ops::Add<Output = Self>
    + std::ops::Sub<Output = Self>
    + std::ops::Mul<Output = Self>
    + std::ops::Div<Output = Self>
    + std::ops::Neg<Output = Self>
{
    /// The construction-time parameter (e.g. decimal precision) shared by
    /// every value derived from the same field instance.
    type Context: ScalarContext;

    fn context(&self) -> Self::Context;

    fn same_context(&self, other: &Self) -> bool {
        self.context() == other.context()
    }

    fn zero_in(ctx: &Self::Context) -> Self;
    fn one_in(ctx: &Self::Context) -> Self;

    fn from_i64_in(ctx: &Self::Context, n: i64) -> Self;
    fn from_f64_in(ctx: &Self::Context, x: f64) -> Self;

    fn reciprocal(&self) -> Self;
    fn abs(&self) -> Self;
    fn sqrt(&self) -> Self;
    fn powi(&self, n: i32) -> Self;
    fn exp(&self) -> Self;
    fn ln(&self) -> Self;
    fn sin(&self) -> Self;
    fn cos(&self) -> Self;
    fn sinh(&self) -> Self;
    fn cosh(&self) -> Self;
    fn floor(&self) -> Self;

    /// The nearest representable value strictly between `self` and
    /// `toward`, used only by the eigensolver's underflow test.
    fn next_after(&self, toward: &Self) -> Self;

    fn lt(&self, other: &Self) -> bool;
    fn gt(&self, other: &Self) -> bool;
    fn eq(&self, other: &Self) -> bool;
    fn is_zero(&self) -> bool {
        Scalar::eq(self, &Self::zero_in(&self.context()))
    }

    fn le(&self, other: &Self) -> bool {
        self.lt(other) || Scalar::eq(self, other)
    }
    fn ge(&self, other: &Self) -> bool {
        self.gt(other) || Scalar::eq(self, other)
    }
}

/// `f64`-backed reference implementation of [`Scalar`]. Not arbitrary
/// precision; exists so the crate and its invariants are testable without
/// an external bignum dependency.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct F64Scalar(pub f64);

impl F64Scalar {
    pub fn new(x: f64) -> Self {
        F64Scalar(x)
    }
}

impl std::ops::Add for F64Scalar {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        F64Scalar(self.0 + rhs.0)
    }
}
impl std::ops::Sub for F64Scalar {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        F64Scalar(self.0 - rhs.0)
    }
}
impl std::ops::Mul for F64Scalar {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        F64Scalar(self.0 * rhs.0)
    }
}
impl std::ops::Div for F64Scalar {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        F64Scalar(self.0 / rhs.0)
    }
}
impl std::ops::Neg for F64Scalar {
    type Output = Self;
    fn neg(self) -> Self {
        F64Scalar(-self.0)
    }
}

impl Scalar for F64Scalar {
    type Context = ();

    fn context(&self) -> Self::Context {}

    fn zero_in(_ctx: &Self::Context) -> Self {
        F64Scalar(0.0)
    }
    fn one_in(_ctx: &Self::Context) -> Self {
        F64Scalar(1.0)
    }
    fn from_i64_in(_ctx: &Self::Context, n: i64) -> Self {
        F64Scalar(n as f64)
    }
    fn from_f64_in(_ctx: &Self::Context, x: f64) -> Self {
        F64Scalar(x)
    }

    fn reciprocal(&self) -> Self {
        F64Scalar(1.0 / self.0)
    }
    fn abs(&self) -> Self {
        F64Scalar(self.0.abs())
    }
    fn sqrt(&self) -> Self {
        F64Scalar(self.0.sqrt())
    }
    fn powi(&self, n: i32) -> Self {
        F64Scalar(self.0.powi(n))
    }
    fn exp(&self) -> Self {
        F64Scalar(self.0.exp())
    }
    fn ln(&self) -> Self {
        F64Scalar(self.0.ln())
    }
    fn sin(&self) -> Self {
        F64Scalar(self.0.sin())
    }
    fn cos(&self) -> Self {
        F64Scalar(self.0.cos())
    }
    fn sinh(&self) -> Self {
        F64Scalar(self.0.sinh())
    }
    fn cosh(&self) -> Self {
        F64Scalar(self.0.cosh())
    }
    fn floor(&self) -> Self {
        F64Scalar(self.0.floor())
    }

    fn next_after(&self, toward: &Self) -> Self {
        if self.0 == toward.0 {
            return *self;
        }
        // f64 has no stable next_after in std; nudge by one ULP in the
        // requested direction, which is all the eigensolver's underflow
        // test needs.
        let bits = self.0.to_bits();
        let next_bits = if (toward.0 > self.0) == (self.0 >= 0.0) {
            if self.0 >= 0.0 {
                bits + 1
            } else {
                bits - 1
            }
        } else if self.0 >= 0.0 {
            bits - 1
        } else {
            bits + 1
        };
        F64Scalar(f64::from_bits(next_bits))
    }

    fn lt(&self, other: &Self) -> bool {
        self.0 < other.0
    }
    fn gt(&self, other: &Self) -> bool {
        self.0 > other.0
    }
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

/// A scalar whose context is a non-trivial tag rather than `()`, used only
/// by this crate's own test suite to exercise
/// [`crate::error::CollocationError::PrecisionMismatch`] detection --
/// `F64Scalar`'s `Context = ()` can never actually mismatch, so it cannot
/// exercise that path on its own.
#[cfg(test)]
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub(crate) struct TaggedScalar {
    pub value: f64,
    pub tag: u32,
}

#[cfg(test)]
impl TaggedScalar {
    pub fn new(tag: u32, value: f64) -> Self {
        TaggedScalar { tag, value }
    }
}

#[cfg(test)]
impl std::ops::Add for TaggedScalar {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        TaggedScalar::new(self.tag, self.value + rhs.value)
    }
}
#[cfg(test)]
impl std::ops::Sub for TaggedScalar {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        TaggedScalar::new(self.tag, self.value - rhs.value)
    }
}
#[cfg(test)]
impl std::ops::Mul for TaggedScalar {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        TaggedScalar::new(self.tag, self.value * rhs.value)
    }
}
#[cfg(test)]
impl std::ops::Div for TaggedScalar {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        TaggedScalar::new(self.tag, self.value / rhs.value)
    }
}
#[cfg(test)]
impl std::ops::Neg for TaggedScalar {
    type Output = Self;
    fn neg(self) -> Self {
        TaggedScalar::new(self.tag, -self.value)
    }
}

#[cfg(test)]
impl Scalar for TaggedScalar {
    type Context = u32;

    fn context(&self) -> Self::Context {
        self.tag
    }

    fn zero_in(ctx: &Self::Context) -> Self {
        TaggedScalar::new(*ctx, 0.0)
    }
    fn one_in(ctx: &Self::Context) -> Self {
        TaggedScalar::new(*ctx, 1.0)
    }
    fn from_i64_in(ctx: &Self::Context, n: i64) -> Self {
        TaggedScalar::new(*ctx, n as f64)
    }
    fn from_f64_in(ctx: &Self::Context, x: f64) -> Self {
        TaggedScalar::new(*ctx, x)
    }

    fn reciprocal(&self) -> Self {
        TaggedScalar::new(self.tag, 1.0 / self.value)
    }
    fn abs(&self) -> Self {
        TaggedScalar::new(self.tag, self.value.abs())
    }
    fn sqrt(&self) -> Self {
        TaggedScalar::new(self.tag, self.value.sqrt())
    }
    fn powi(&self, n: i32) -> Self {
        TaggedScalar::new(self.tag, self.value.powi(n))
    }
    fn exp(&self) -> Self {
        TaggedScalar::new(self.tag, self.value.exp())
    }
    fn ln(&self) -> Self {
        TaggedScalar::new(self.tag, self.value.ln())
    }
    fn sin(&self) -> Self {
        TaggedScalar::new(self.tag, self.value.sin())
    }
    fn cos(&self) -> Self {
        TaggedScalar::new(self.tag, self.value.cos())
    }
    fn sinh(&self) -> Self {
        TaggedScalar::new(self.tag, self.value.sinh())
    }
    fn cosh(&self) -> Self {
        TaggedScalar::new(self.tag, self.value.cosh())
    }
    fn floor(&self) -> Self {
        TaggedScalar::new(self.tag, self.value.floor())
    }

    fn next_after(&self, toward: &Self) -> Self {
        if self.value == toward.value {
            return *self;
        }
        let bits = self.value.to_bits();
        let next_bits = if (toward.value > self.value) == (self.value >= 0.0) {
            if self.value >= 0.0 {
                bits + 1
            } else {
                bits - 1
            }
        } else if self.value >= 0.0 {
            bits - 1
        } else {
            bits + 1
        };
        TaggedScalar::new(self.tag, f64::from_bits(next_bits))
    }

    fn lt(&self, other: &Self) -> bool {
        self.value < other.value
    }
    fn gt(&self, other: &Self) -> bool {
        self.value > other.value
    }
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reciprocal_and_context_roundtrip() {
        let a = F64Scalar::new(4.0);
        assert!(Scalar::eq(&a.reciprocal(), &F64Scalar::new(0.25)));
        assert!(a.same_context(&F64Scalar::new(-1.0)));
    }

    #[test]
    fn ordering_and_zero() {
        let a = F64Scalar::new(0.0);
        let b = F64Scalar::new(1.0);
        assert!(a.is_zero());
        assert!(a.lt(&b));
        assert!(b.gt(&a));
    }

    #[test]
    fn tagged_scalar_detects_context_mismatch() {
        let a = TaggedScalar::new(1, 2.0);
        let b = TaggedScalar::new(2, 3.0);
        let c = TaggedScalar::new(1, 5.0);
        assert!(!a.same_context(&b));
        assert!(a.same_context(&c));
    }
}
