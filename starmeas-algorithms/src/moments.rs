//! Windowed moment shape measurement with covariance propagation.
//!
//! Measures background-subtracted zeroth, second, and fourth moments over
//! a square window and fills the 4x4 moment covariance from a per-pixel
//! noise model, using the exact first-order partial derivatives of the
//! moment ratios with respect to each pixel intensity.

use nalgebra::Vector4;

use starmeas_core::image::{index_to_position, position_to_index, Image, PixelValue};
use starmeas_core::measure::ShapeAlgorithm;
use starmeas_core::psf::Psf;
use starmeas_core::shape::MomentCovariance;
use starmeas_core::{Centroid, Error, Result, Shape};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Flag bit set when the measurement window was clipped by the image edge.
pub const FLAG_EDGE: u32 = 0x1;

/// Configuration for windowed moment measurement.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MomentsShapeConfig {
    /// Half-width of the measurement window in pixels.
    pub radius: usize,
    /// RMS noise per pixel used to fill the moment covariance
    /// (0 leaves the covariance zeroed).
    pub noise_sigma: f64,
}

impl Default for MomentsShapeConfig {
    fn default() -> Self {
        Self {
            radius: 7,
            noise_sigma: 0.0,
        }
    }
}

impl MomentsShapeConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the window half-width.
    #[must_use]
    pub fn with_radius(mut self, radius: usize) -> Self {
        self.radius = radius;
        self
    }

    /// Sets the per-pixel RMS noise.
    #[must_use]
    pub fn with_noise_sigma(mut self, noise_sigma: f64) -> Self {
        self.noise_sigma = noise_sigma;
        self
    }
}

/// Shape estimator from unweighted moments over a square window.
///
/// The PSF is accepted per the measurement contract but no PSF correction
/// is applied to the moments.
#[derive(Clone, Debug, Default)]
pub struct MomentsShape {
    config: MomentsShapeConfig,
}

impl MomentsShape {
    /// Creates the estimator with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the estimator with a custom configuration.
    #[must_use]
    pub fn with_config(config: MomentsShapeConfig) -> Self {
        Self { config }
    }
}

impl<P: PixelValue> ShapeAlgorithm<P> for MomentsShape {
    fn name(&self) -> &'static str {
        "moments"
    }

    fn do_apply(
        &self,
        image: &dyn Image<Pixel = P>,
        xcen: f64,
        ycen: f64,
        _psf: Option<&Psf>,
        background: f64,
    ) -> Result<Shape> {
        let (x0, y0) = image.origin();
        let xc = position_to_index(xcen) - x0;
        let yc = position_to_index(ycen) - y0;

        let (width, height) = image.dimensions();
        if xc < 0 || yc < 0 || xc >= width as i32 || yc >= height as i32 {
            return Err(Error::EdgeOfImage { x: xc, y: yc });
        }

        let r = self.config.radius as i32;
        let x_lo = (xc - r).max(0);
        let x_hi = (xc + r).min(width as i32 - 1);
        let y_lo = (yc - r).max(0);
        let y_hi = (yc + r).min(height as i32 - 1);
        let mut flags = 0;
        if x_lo != xc - r || x_hi != xc + r || y_lo != yc - r || y_hi != yc + r {
            flags |= FLAG_EDGE;
        }

        let value = |ix: i32, iy: i32| image.pixel(ix as usize, iy as usize).to_f64() - background;

        // flux and first moments in parent-frame positions
        let mut m0 = 0.0;
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        for iy in y_lo..=y_hi {
            for ix in x_lo..=x_hi {
                let v = value(ix, iy);
                m0 += v;
                sum_x += v * index_to_position(ix + x0);
                sum_y += v * index_to_position(iy + y0);
            }
        }
        if m0 <= 0.0 {
            return Err(Error::NoCounts { x: xc, y: yc });
        }
        let xbar = sum_x / m0;
        let ybar = sum_y / m0;

        // central second and fourth moments about the measured centroid
        let mut mxx = 0.0;
        let mut mxy = 0.0;
        let mut myy = 0.0;
        let mut mxy4 = 0.0;
        for iy in y_lo..=y_hi {
            for ix in x_lo..=x_hi {
                let v = value(ix, iy);
                let dx = index_to_position(ix + x0) - xbar;
                let dy = index_to_position(iy + y0) - ybar;
                mxx += v * dx * dx;
                mxy += v * dx * dy;
                myy += v * dy * dy;
                mxy4 += v * dx * dx * dy * dy;
            }
        }
        mxx /= m0;
        mxy /= m0;
        myy /= m0;
        mxy4 /= m0;

        if mxx <= 0.0 || myy <= 0.0 {
            return Err(Error::Computation(format!(
                "degenerate second moments at ({xc}, {yc}): mxx = {mxx}, myy = {myy}"
            )));
        }

        // Covariance over (m0, mxx, mxy, myy) for independent pixel noise:
        // covar[a][b] = sigma^2 * sum_i g_a(i) * g_b(i), with g the partial
        // derivative of each moment with respect to the pixel intensity.
        let sigma = self.config.noise_sigma;
        let mut covar = MomentCovariance::zeros();
        let mut var_x = 0.0;
        let mut var_y = 0.0;
        if sigma > 0.0 {
            let sigma2 = sigma * sigma;
            for iy in y_lo..=y_hi {
                for ix in x_lo..=x_hi {
                    let dx = index_to_position(ix + x0) - xbar;
                    let dy = index_to_position(iy + y0) - ybar;
                    let g = Vector4::new(
                        1.0,
                        (dx * dx - mxx) / m0,
                        (dx * dy - mxy) / m0,
                        (dy * dy - myy) / m0,
                    );
                    covar += sigma2 * g * g.transpose();
                    var_x += sigma2 * (dx / m0) * (dx / m0);
                    var_y += sigma2 * (dy / m0) * (dy / m0);
                }
            }
        }

        let centroid = if sigma > 0.0 {
            Centroid::with_errors(xbar, ybar, var_x.sqrt(), var_y.sqrt())
        } else {
            Centroid::new(xbar, ybar)
        };

        let mut shape = Shape::new(m0, mxx, mxy, myy, centroid);
        shape.set_mxy4(mxy4);
        shape.set_covariance(covar);
        shape.set_flags(flags);
        Ok(shape)
    }
}
