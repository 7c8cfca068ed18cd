//! Shape value type: moments, their covariance, and derived ellipticities.
//!
//! A [`Shape`] stores the zeroth, second, and fourth moments measured for a
//! source together with a 4x4 covariance matrix over `(m0, mxx, mxy, myy)`.
//! Ellipticity and radius are not stored; they are computed on access from
//! the moments, with uncertainties propagated to first order through the
//! covariance matrix.

use nalgebra::{Matrix4, Vector4};

use crate::Centroid;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Covariance matrix over the moment vector `(m0, mxx, mxy, myy)`.
///
/// The matrix is expected to be symmetric positive semi-definite with
/// non-negative diagonal entries; this is an obligation on the algorithm
/// that fills it, not a checked invariant.
pub type MomentCovariance = Matrix4<f64>;

/// Moments and their covariance, measured for a single source.
///
/// Constructed once by a shape-measurement algorithm and immutable
/// afterwards apart from the explicit setters the algorithm uses while
/// filling it in.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Shape {
    centroid: Centroid,
    m0: f64,
    mxx: f64,
    mxy: f64,
    myy: f64,
    mxy4: f64,
    covar: MomentCovariance,
    flags: u32,
}

impl Shape {
    /// Creates a shape from measured moments; covariance starts zeroed,
    /// the fourth moment unset, and flags clear.
    #[must_use]
    pub fn new(m0: f64, mxx: f64, mxy: f64, myy: f64, centroid: Centroid) -> Self {
        Self {
            centroid,
            m0,
            mxx,
            mxy,
            myy,
            mxy4: f64::NAN,
            covar: MomentCovariance::zeros(),
            flags: 0,
        }
    }

    /// The centroid measured along with the moments.
    #[must_use]
    pub fn centroid(&self) -> &Centroid {
        &self.centroid
    }

    /// Zeroth moment (total flux).
    #[must_use]
    pub fn m0(&self) -> f64 {
        self.m0
    }

    /// Variance of the zeroth moment, read from the covariance diagonal.
    #[must_use]
    pub fn m0_err(&self) -> f64 {
        self.covar[(0, 0)]
    }

    /// Sets the zeroth moment.
    pub fn set_m0(&mut self, m0: f64) {
        self.m0 = m0;
    }

    /// Second central moment `<xx>`.
    #[must_use]
    pub fn mxx(&self) -> f64 {
        self.mxx
    }

    /// Variance of `mxx`, read from the covariance diagonal.
    #[must_use]
    pub fn mxx_err(&self) -> f64 {
        self.covar[(1, 1)]
    }

    /// Sets the second central moment `<xx>`.
    pub fn set_mxx(&mut self, mxx: f64) {
        self.mxx = mxx;
    }

    /// Second central moment `<xy>`.
    #[must_use]
    pub fn mxy(&self) -> f64 {
        self.mxy
    }

    /// Variance of `mxy`, read from the covariance diagonal.
    #[must_use]
    pub fn mxy_err(&self) -> f64 {
        self.covar[(2, 2)]
    }

    /// Sets the second central moment `<xy>`.
    pub fn set_mxy(&mut self, mxy: f64) {
        self.mxy = mxy;
    }

    /// Second central moment `<yy>`.
    #[must_use]
    pub fn myy(&self) -> f64 {
        self.myy
    }

    /// Variance of `myy`, read from the covariance diagonal.
    #[must_use]
    pub fn myy_err(&self) -> f64 {
        self.covar[(3, 3)]
    }

    /// Sets the second central moment `<yy>`.
    pub fn set_myy(&mut self, myy: f64) {
        self.myy = myy;
    }

    /// Fourth cross moment, used for shear calibration.
    #[must_use]
    pub fn mxy4(&self) -> f64 {
        self.mxy4
    }

    /// Sets the fourth cross moment.
    pub fn set_mxy4(&mut self, mxy4: f64) {
        self.mxy4 = mxy4;
    }

    /// Processing flags; bit meanings are defined by the algorithm that
    /// produced this shape.
    #[must_use]
    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Sets the processing flags.
    pub fn set_flags(&mut self, flags: u32) {
        self.flags = flags;
    }

    /// The covariance matrix over `(m0, mxx, mxy, myy)`.
    #[must_use]
    pub fn covariance(&self) -> &MomentCovariance {
        &self.covar
    }

    /// Sets the covariance matrix over `(m0, mxx, mxy, myy)`.
    pub fn set_covariance(&mut self, covar: MomentCovariance) {
        self.covar = covar;
    }

    /// Ellipticity component `e1 = (mxx - myy) / (mxx + myy)`.
    #[must_use]
    pub fn e1(&self) -> f64 {
        (self.mxx - self.myy) / (self.mxx + self.myy)
    }

    /// Ellipticity component `e2 = 2 mxy / (mxx + myy)`.
    #[must_use]
    pub fn e2(&self) -> f64 {
        2.0 * self.mxy / (self.mxx + self.myy)
    }

    /// Characteristic radius `rms = sqrt((mxx + myy) / 2)`.
    #[must_use]
    pub fn rms(&self) -> f64 {
        (0.5 * (self.mxx + self.myy)).sqrt()
    }

    /// Variance of `e1`, propagated to first order through the covariance.
    #[must_use]
    pub fn e1_err(&self) -> f64 {
        let j = self.e1_jacobian();
        self.propagate(&j, &j)
    }

    /// Variance of `e2`, propagated to first order through the covariance.
    #[must_use]
    pub fn e2_err(&self) -> f64 {
        let j = self.e2_jacobian();
        self.propagate(&j, &j)
    }

    /// Covariance between `e1` and `e2`.
    #[must_use]
    pub fn e1e2_err(&self) -> f64 {
        self.propagate(&self.e1_jacobian(), &self.e2_jacobian())
    }

    /// Variance of `rms`, propagated to first order through the covariance.
    #[must_use]
    pub fn rms_err(&self) -> f64 {
        let d = 1.0 / (4.0 * self.rms());
        let j = Vector4::new(0.0, d, 0.0, d);
        self.propagate(&j, &j)
    }

    // Partials of e1 with respect to (m0, mxx, mxy, myy).
    fn e1_jacobian(&self) -> Vector4<f64> {
        let t2 = (self.mxx + self.myy).powi(2);
        Vector4::new(0.0, 2.0 * self.myy / t2, 0.0, -2.0 * self.mxx / t2)
    }

    // Partials of e2 with respect to (m0, mxx, mxy, myy).
    fn e2_jacobian(&self) -> Vector4<f64> {
        let t = self.mxx + self.myy;
        let d = -2.0 * self.mxy / t.powi(2);
        Vector4::new(0.0, d, 2.0 / t, d)
    }

    // First-order propagation: j . covar . k
    fn propagate(&self, j: &Vector4<f64>, k: &Vector4<f64>) -> f64 {
        j.dot(&(self.covar * k))
    }
}

impl Default for Shape {
    fn default() -> Self {
        Self::new(f64::NAN, f64::NAN, f64::NAN, f64::NAN, Centroid::default())
    }
}
