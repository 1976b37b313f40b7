#![forbid(unsafe_code)]

use core::fmt::Debug;
use core::ops::{Add, Div, Mul, Neg, Sub};
use num_complex::{Complex32, Complex64};
use num_traits::Float;

/// Which member of the solver family a scalar type is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverVariant {
    Sygvj,
    Hegvj,
}

impl SolverVariant {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sygvj => "SYGVJ",
            Self::Hegvj => "HEGVJ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarKind {
    Float,
    Double,
    FloatComplex,
    DoubleComplex,
}

impl ScalarKind {
    pub const ALL: [Self; 4] = [
        Self::Float,
        Self::Double,
        Self::FloatComplex,
        Self::DoubleComplex,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Double => "double",
            Self::FloatComplex => "float_complex",
            Self::DoubleComplex => "double_complex",
        }
    }

    #[must_use]
    pub const fn solver(self) -> SolverVariant {
        match self {
            Self::Float | Self::Double => SolverVariant::Sygvj,
            Self::FloatComplex | Self::DoubleComplex => SolverVariant::Hegvj,
        }
    }
}

/// Real types route to [`SolverVariant::Sygvj`], complex types to
/// [`SolverVariant::Hegvj`].
pub trait GvjScalar:
    Copy
    + Debug
    + PartialEq
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
{
    type Real: Float + Debug + Send + Sync + 'static;

    const KIND: ScalarKind;
    const SOLVER: SolverVariant;

    fn zero() -> Self;
    fn one() -> Self;
    fn from_real(re: Self::Real) -> Self;
    fn re(self) -> Self::Real;
    fn conj(self) -> Self;
    fn modulus(self) -> Self::Real;
    fn scale(self, factor: Self::Real) -> Self;
    /// Exact widening to complex double.
    fn to_c64(self) -> Complex64;
    /// Narrows a complex double; the imaginary part is dropped for real types.
    fn from_c64(value: Complex64) -> Self;
    fn real_from_f64(value: f64) -> Self::Real;
    fn real_to_f64(value: Self::Real) -> f64;

    #[must_use]
    fn epsilon() -> f64 {
        Self::real_to_f64(Self::Real::epsilon())
    }

    fn modulus_sqr(self) -> Self::Real {
        let m = self.modulus();
        m * m
    }
}

impl GvjScalar for f32 {
    type Real = f32;

    const KIND: ScalarKind = ScalarKind::Float;
    const SOLVER: SolverVariant = SolverVariant::Sygvj;

    fn zero() -> Self {
        0.0
    }
    fn one() -> Self {
        1.0
    }
    fn from_real(re: f32) -> Self {
        re
    }
    fn re(self) -> f32 {
        self
    }
    fn conj(self) -> Self {
        self
    }
    fn modulus(self) -> f32 {
        self.abs()
    }
    fn scale(self, factor: f32) -> Self {
        self * factor
    }
    fn to_c64(self) -> Complex64 {
        Complex64::new(f64::from(self), 0.0)
    }
    #[allow(clippy::cast_possible_truncation)]
    fn from_c64(value: Complex64) -> Self {
        value.re as f32
    }
    #[allow(clippy::cast_possible_truncation)]
    fn real_from_f64(value: f64) -> f32 {
        value as f32
    }
    fn real_to_f64(value: f32) -> f64 {
        f64::from(value)
    }
}

impl GvjScalar for f64 {
    type Real = f64;

    const KIND: ScalarKind = ScalarKind::Double;
    const SOLVER: SolverVariant = SolverVariant::Sygvj;

    fn zero() -> Self {
        0.0
    }
    fn one() -> Self {
        1.0
    }
    fn from_real(re: f64) -> Self {
        re
    }
    fn re(self) -> f64 {
        self
    }
    fn conj(self) -> Self {
        self
    }
    fn modulus(self) -> f64 {
        self.abs()
    }
    fn scale(self, factor: f64) -> Self {
        self * factor
    }
    fn to_c64(self) -> Complex64 {
        Complex64::new(self, 0.0)
    }
    fn from_c64(value: Complex64) -> Self {
        value.re
    }
    fn real_from_f64(value: f64) -> f64 {
        value
    }
    fn real_to_f64(value: f64) -> f64 {
        value
    }
}

impl GvjScalar for Complex32 {
    type Real = f32;

    const KIND: ScalarKind = ScalarKind::FloatComplex;
    const SOLVER: SolverVariant = SolverVariant::Hegvj;

    fn zero() -> Self {
        Complex32::new(0.0, 0.0)
    }
    fn one() -> Self {
        Complex32::new(1.0, 0.0)
    }
    fn from_real(re: f32) -> Self {
        Complex32::new(re, 0.0)
    }
    fn re(self) -> f32 {
        self.re
    }
    fn conj(self) -> Self {
        Complex32::conj(&self)
    }
    fn modulus(self) -> f32 {
        self.norm()
    }
    fn scale(self, factor: f32) -> Self {
        Complex32::new(self.re * factor, self.im * factor)
    }
    fn to_c64(self) -> Complex64 {
        Complex64::new(f64::from(self.re), f64::from(self.im))
    }
    #[allow(clippy::cast_possible_truncation)]
    fn from_c64(value: Complex64) -> Self {
        Complex32::new(value.re as f32, value.im as f32)
    }
    #[allow(clippy::cast_possible_truncation)]
    fn real_from_f64(value: f64) -> f32 {
        value as f32
    }
    fn real_to_f64(value: f32) -> f64 {
        f64::from(value)
    }
}

impl GvjScalar for Complex64 {
    type Real = f64;

    const KIND: ScalarKind = ScalarKind::DoubleComplex;
    const SOLVER: SolverVariant = SolverVariant::Hegvj;

    fn zero() -> Self {
        Complex64::new(0.0, 0.0)
    }
    fn one() -> Self {
        Complex64::new(1.0, 0.0)
    }
    fn from_real(re: f64) -> Self {
        Complex64::new(re, 0.0)
    }
    fn re(self) -> f64 {
        self.re
    }
    fn conj(self) -> Self {
        Complex64::conj(&self)
    }
    fn modulus(self) -> f64 {
        self.norm()
    }
    fn scale(self, factor: f64) -> Self {
        Complex64::new(self.re * factor, self.im * factor)
    }
    fn to_c64(self) -> Complex64 {
        self
    }
    fn from_c64(value: Complex64) -> Self {
        value
    }
    fn real_from_f64(value: f64) -> f64 {
        value
    }
    fn real_to_f64(value: f64) -> f64 {
        value
    }
}
