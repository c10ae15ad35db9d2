use crate::error::{Error, Result};
use bytemuck::{Pod, Zeroable};
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// Three dimensional double precision vector stored as four lanes.
///
/// The fourth lane only exists so that a slice of vectors has the 32-byte record layout the
/// integration kernels read (`vec4<f64>`). It is zero for every vector built through this API and
/// none of the arithmetic below reads it.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Double4 {
    x: f64,
    y: f64,
    z: f64,
    w: f64,
}

impl Double4 {
    /// The zero vector.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Creates a new [`Double4`] with a zeroed pad lane.
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z, w: 0.0 }
    }

    /// Creates a new [`Double4`] with all three components set to `v`.
    #[inline]
    pub const fn splat(v: f64) -> Self {
        Self::new(v, v, v)
    }

    /// The x component.
    #[inline]
    pub const fn x(&self) -> f64 {
        self.x
    }

    /// The y component.
    #[inline]
    pub const fn y(&self) -> f64 {
        self.y
    }

    /// The z component.
    #[inline]
    pub const fn z(&self) -> f64 {
        self.z
    }

    /// The pad lane. Only meaningful to code that checks the wire layout.
    #[inline]
    pub const fn pad(&self) -> f64 {
        self.w
    }

    /// Returns `[x, y, z]`.
    #[inline]
    pub const fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Three dimensional dot product.
    #[inline]
    pub fn dot3(self, rhs: Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    /// Componentwise division. Fails if any component of `rhs` is exactly zero.
    #[inline]
    pub fn checked_div(self, rhs: Self) -> Result<Self> {
        if rhs.x == 0.0 || rhs.y == 0.0 || rhs.z == 0.0 {
            return Err(Error::DivisionByZero);
        }

        Ok(Self::new(self.x / rhs.x, self.y / rhs.y, self.z / rhs.z))
    }

    /// Copies the record with its pad lane overwritten by `z`.
    ///
    /// Reproduces an older flattening routine that wrote `z` into the fourth lane. Kept so that
    /// buffers produced that way can be compared against; kernels never read the lane.
    #[inline]
    pub(crate) const fn with_z_in_pad(self) -> Self {
        Self { w: self.z, ..self }
    }
}

impl From<[f64; 3]> for Double4 {
    #[inline]
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl From<Double4> for [f64; 3] {
    #[inline]
    fn from(v: Double4) -> Self {
        v.to_array()
    }
}

#[cfg(feature = "glam")]
impl From<glam::DVec3> for Double4 {
    #[inline]
    fn from(v: glam::DVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

#[cfg(feature = "glam")]
impl From<Double4> for glam::DVec3 {
    #[inline]
    fn from(v: Double4) -> Self {
        glam::DVec3::new(v.x, v.y, v.z)
    }
}

impl Neg for Double4 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl Add for Double4 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Double4 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul for Double4 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self::new(self.x * rhs.x, self.y * rhs.y, self.z * rhs.z)
    }
}

impl Mul<f64> for Double4 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Mul<Double4> for f64 {
    type Output = Double4;

    #[inline]
    fn mul(self, rhs: Double4) -> Double4 {
        rhs * self
    }
}

impl AddAssign for Double4 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Double4 {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

/// Flattens records into the `4 × len` doubles uploaded to the device.
#[inline]
pub fn flatten(records: &[Double4]) -> Vec<f64> {
    bytemuck::cast_slice(records).to_vec()
}

/// Flattens records the way an earlier revision did, repeating `z` in the pad lane.
///
/// Not used by the run path. See the tests for the observed difference.
pub fn flatten_legacy(records: &[Double4]) -> Vec<f64> {
    let legacy: Vec<_> = records.iter().map(|r| r.with_z_in_pad()).collect();
    flatten(&legacy)
}

/// Rebuilds records from flattened doubles. Trailing doubles that do not fill a record are
/// ignored.
#[inline]
pub fn unflatten(values: &[f64]) -> Vec<Double4> {
    values
        .chunks_exact(4)
        .map(|c| Double4::new(c[0], c[1], c[2]))
        .collect()
}
