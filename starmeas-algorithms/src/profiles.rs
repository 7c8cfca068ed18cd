//! Concrete PSF models: double-Gaussian (parametric) and kernel-sampled.

use starmeas_core::kernel::Kernel;
use starmeas_core::psf::{Psf, PsfFactory, PsfProfile};
use starmeas_core::{Error, Result};

/// Circular double-Gaussian profile: a core Gaussian plus a broader halo.
///
/// `value(r) = (exp(-r^2 / 2 sigma1^2) + b exp(-r^2 / 2 sigma2^2)) / (1 + b)`,
/// normalized to 1 at the origin. Spatially constant.
#[derive(Clone, Debug)]
pub struct DoubleGaussianProfile {
    sigma1: f64,
    sigma2: f64,
    b: f64,
}

impl DoubleGaussianProfile {
    /// Creates a profile with core width `sigma1`, halo width `sigma2`,
    /// and halo amplitude ratio `b`.
    ///
    /// # Errors
    /// [`Error::Computation`] if `sigma1 <= 0`, or if `b != 0` with
    /// `sigma2 <= 0`.
    pub fn new(sigma1: f64, sigma2: f64, b: f64) -> Result<Self> {
        if sigma1 <= 0.0 {
            return Err(Error::Computation(format!(
                "double-Gaussian core width must be positive, got {sigma1}"
            )));
        }
        if b != 0.0 && sigma2 <= 0.0 {
            return Err(Error::Computation(format!(
                "double-Gaussian halo width must be positive, got {sigma2}"
            )));
        }
        Ok(Self { sigma1, sigma2, b })
    }

    /// Core Gaussian width.
    #[must_use]
    pub fn sigma1(&self) -> f64 {
        self.sigma1
    }

    /// Halo Gaussian width.
    #[must_use]
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    /// Halo amplitude relative to the core.
    #[must_use]
    pub fn b(&self) -> f64 {
        self.b
    }
}

impl PsfProfile for DoubleGaussianProfile {
    fn value_at(&self, dx: f64, dy: f64, _x_image: i32, _y_image: i32) -> f64 {
        let d2 = dx * dx + dy * dy;
        let core = (-d2 / (2.0 * self.sigma1 * self.sigma1)).exp();
        let halo = if self.b == 0.0 {
            0.0
        } else {
            self.b * (-d2 / (2.0 * self.sigma2 * self.sigma2)).exp()
        };
        (core + halo) / (1.0 + self.b)
    }
}

/// Builds double-Gaussian PSFs from the parametric signature
/// `(width, height, sigma1, sigma2, b)`.
///
/// Kernel-based construction is not implemented for this variant.
#[derive(Debug, Default)]
pub struct DoubleGaussianPsfFactory;

impl PsfFactory for DoubleGaussianPsfFactory {
    fn create_parametric(
        &self,
        width: usize,
        height: usize,
        p0: f64,
        p1: f64,
        p2: f64,
    ) -> Result<Psf> {
        let profile = DoubleGaussianProfile::new(p0, p1, p2)?;
        let psf = if width > 0 && height > 0 {
            let raster = {
                let profile = profile.clone();
                Kernel::from_function(width, height, move |dx, dy| profile.value_at(dx, dy, 0, 0))
            };
            Psf::new(Box::new(profile)).with_kernel(raster)
        } else {
            Psf::new(Box::new(profile))
        };
        Ok(psf)
    }
}

/// Profile that samples a rasterized kernel at the nearest grid point.
///
/// Offsets outside the kernel's support evaluate to 0.
#[derive(Clone, Debug)]
pub struct SampledProfile {
    kernel: Kernel,
}

impl SampledProfile {
    /// Wraps a kernel for point evaluation.
    #[must_use]
    pub fn new(kernel: Kernel) -> Self {
        Self { kernel }
    }
}

impl PsfProfile for SampledProfile {
    fn value_at(&self, dx: f64, dy: f64, _x_image: i32, _y_image: i32) -> f64 {
        let x = dx + (self.kernel.width() / 2) as f64;
        let y = dy + (self.kernel.height() / 2) as f64;
        let (ix, iy) = (x.round(), y.round());
        if ix < 0.0
            || iy < 0.0
            || ix >= self.kernel.width() as f64
            || iy >= self.kernel.height() as f64
        {
            return 0.0;
        }
        self.kernel.value(ix as usize, iy as usize)
    }
}

/// Builds kernel-backed PSFs from a pre-built kernel.
///
/// Parametric construction is not implemented for this variant.
#[derive(Debug, Default)]
pub struct KernelPsfFactory;

impl PsfFactory for KernelPsfFactory {
    fn create_from_kernel(&self, kernel: Kernel) -> Result<Psf> {
        Ok(Psf::new(Box::new(SampledProfile::new(kernel.clone()))).with_kernel(kernel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_double_gaussian_peak_is_unity() {
        let profile = DoubleGaussianProfile::new(1.5, 3.0, 0.1).unwrap();
        assert_relative_eq!(profile.sigma1(), 1.5, epsilon = 1e-12);
        assert_relative_eq!(profile.sigma2(), 3.0, epsilon = 1e-12);
        assert_relative_eq!(profile.b(), 0.1, epsilon = 1e-12);
        assert_relative_eq!(profile.value_at(0.0, 0.0, 0, 0), 1.0, epsilon = 1e-12);
        assert!(profile.value_at(1.0, 1.0, 0, 0) < 1.0);
    }

    #[test]
    fn test_double_gaussian_reduces_to_single() {
        let double = DoubleGaussianProfile::new(2.0, 4.0, 0.0).unwrap();
        let expected = (-1.0_f64 / (2.0 * 4.0)).exp();
        assert_relative_eq!(double.value_at(1.0, 0.0, 0, 0), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_halo_widens_the_profile() {
        let single = DoubleGaussianProfile::new(1.0, 3.0, 0.0).unwrap();
        let double = DoubleGaussianProfile::new(1.0, 3.0, 0.5).unwrap();
        // Far from the core the halo dominates.
        assert!(double.value_at(4.0, 0.0, 0, 0) > single.value_at(4.0, 0.0, 0, 0));
    }

    #[test]
    fn test_invalid_widths_are_rejected() {
        assert!(DoubleGaussianProfile::new(0.0, 1.0, 0.0).is_err());
        assert!(DoubleGaussianProfile::new(-1.0, 1.0, 0.0).is_err());
        assert!(DoubleGaussianProfile::new(1.0, 0.0, 0.5).is_err());
        // Halo width is irrelevant when the halo amplitude is zero.
        assert!(DoubleGaussianProfile::new(1.0, 0.0, 0.0).is_ok());
    }

    #[test]
    fn test_parametric_factory_builds_kernel() {
        let psf = DoubleGaussianPsfFactory
            .create_parametric(7, 7, 1.5, 3.0, 0.1)
            .unwrap();
        let kernel = psf.kernel().unwrap();
        assert_eq!((kernel.width(), kernel.height()), (7, 7));
        assert_relative_eq!(kernel.value(3, 3), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_parametric_factory_without_raster_size() {
        let psf = DoubleGaussianPsfFactory
            .create_parametric(0, 0, 1.5, 3.0, 0.1)
            .unwrap();
        assert!(psf.kernel().is_none());
        assert_eq!(psf.raster_dimensions(), (0, 0));
    }

    #[test]
    fn test_parametric_factory_rejects_kernel_protocol() {
        let kernel = Kernel::from_function(3, 3, |_, _| 1.0);
        let err = DoubleGaussianPsfFactory
            .create_from_kernel(kernel)
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedConstruction { .. }));
    }

    #[test]
    fn test_kernel_factory_rejects_parametric_protocol() {
        let err = KernelPsfFactory
            .create_parametric(5, 5, 1.0, 0.0, 0.0)
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedConstruction { .. }));
    }

    #[test]
    fn test_sampled_profile_round_trips_kernel() {
        let kernel = Kernel::from_function(5, 5, |dx, dy| 100.0 + 10.0 * dy + dx);
        let psf = KernelPsfFactory.create_from_kernel(kernel.clone()).unwrap();

        for iy in 0..5 {
            for ix in 0..5 {
                let dx = ix as f64 - 2.0;
                let dy = iy as f64 - 2.0;
                assert_relative_eq!(psf.value(dx, dy), kernel.value(ix, iy), epsilon = 1e-12);
            }
        }
        // Outside the kernel support the profile vanishes.
        assert_relative_eq!(psf.value(3.0, 0.0), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_kernel_psf_raster_reproduces_kernel() {
        let kernel = Kernel::from_function(5, 5, |dx, dy| (-(dx * dx + dy * dy) / 8.0).exp());
        let psf = KernelPsfFactory.create_from_kernel(kernel.clone()).unwrap();

        // Pixel-centre position: the raster is the kernel itself.
        let raster = psf.image(12.5, 9.5);
        for iy in 0..5 {
            for ix in 0..5 {
                assert_relative_eq!(
                    raster[[iy, ix]],
                    kernel.value(ix, iy),
                    epsilon = 1e-12
                );
            }
        }
    }
}
