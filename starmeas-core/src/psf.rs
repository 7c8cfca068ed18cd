//! PSF entity, rasterization, and factory dispatch.
//!
//! A [`Psf`] pairs an immutable mathematical definition (a boxed
//! [`PsfProfile`] plus an optional rasterization [`Kernel`]) with a mutable
//! raster-size hint describing realized images of the PSF, not the PSF
//! itself. Mutating the hint requires `&mut`, so a shared instance cannot
//! have its raster size changed while another thread rasterizes or
//! convolves with it.

use ndarray::Array2;

use crate::error::{Error, Result};
use crate::image::{position_to_index, Image, ImageMut};
use crate::kernel::{self, Kernel};
use crate::registry::AlgorithmRegistry;

use std::sync::Arc;

/// The mathematical point-evaluation of a PSF model.
pub trait PsfProfile: Send + Sync {
    /// Evaluates the profile at offset `(dx, dy)` from its centre.
    ///
    /// `(x_image, y_image)` is the absolute position on the parent frame,
    /// letting spatially varying models select a locally appropriate
    /// response; spatially constant models ignore it.
    fn value_at(&self, dx: f64, dy: f64, x_image: i32, y_image: i32) -> f64;
}

/// A point-spread function: profile, optional kernel, raster-size hint.
pub struct Psf {
    profile: Box<dyn PsfProfile>,
    kernel: Option<Kernel>,
    width: usize,
    height: usize,
}

impl std::fmt::Debug for Psf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Psf")
            .field("kernel", &self.kernel)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Psf {
    /// Creates a PSF from a profile, with no kernel and a zero raster hint.
    #[must_use]
    pub fn new(profile: Box<dyn PsfProfile>) -> Self {
        Self {
            profile,
            kernel: None,
            width: 0,
            height: 0,
        }
    }

    /// Attaches a rasterization kernel; the raster-size hint defaults to
    /// the kernel's dimensions.
    #[must_use]
    pub fn with_kernel(mut self, kernel: Kernel) -> Self {
        self.width = kernel.width();
        self.height = kernel.height();
        self.kernel = Some(kernel);
        self
    }

    /// Evaluates the PSF at `(dx, dy)` relative to its centre.
    pub fn value(&self, dx: f64, dy: f64) -> f64 {
        self.value_at(dx, dy, 0, 0)
    }

    /// Evaluates the PSF at `(dx, dy)` for a source at the absolute image
    /// position `(x_image, y_image)`; forwards to the profile.
    pub fn value_at(&self, dx: f64, dy: f64, x_image: i32, y_image: i32) -> f64 {
        self.profile.value_at(dx, dy, x_image, y_image)
    }

    /// The rasterization kernel, if one is attached.
    #[must_use]
    pub fn kernel(&self) -> Option<&Kernel> {
        self.kernel.as_ref()
    }

    /// Attaches or replaces the rasterization kernel.
    pub fn set_kernel(&mut self, kernel: Kernel) {
        self.kernel = Some(kernel);
    }

    /// The `(width, height)` used for realized raster images.
    #[must_use]
    pub fn raster_dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Sets the width used for realized raster images.
    pub fn set_raster_width(&mut self, width: usize) {
        self.width = width;
    }

    /// Sets the height used for realized raster images.
    pub fn set_raster_height(&mut self, height: usize) {
        self.height = height;
    }

    /// Materializes a raster of the PSF centred at `(x, y)`.
    ///
    /// The raster has the hinted dimensions and samples the profile at the
    /// sub-pixel phase of `(x, y)`: for a position on a pixel centre the
    /// peak of a symmetric profile lands on the raster's centre pixel.
    #[must_use]
    pub fn image(&self, x: f64, y: f64) -> Array2<f64> {
        let cx = (self.width / 2) as f64;
        let cy = (self.height / 2) as f64;
        let fx = x - (x.floor() + 0.5);
        let fy = y - (y.floor() + 0.5);
        let (x_image, y_image) = (position_to_index(x), position_to_index(y));
        Array2::from_shape_fn((self.height, self.width), |(row, col)| {
            self.value_at(col as f64 - cx - fx, row as f64 - cy - fy, x_image, y_image)
        })
    }

    /// Convolves `input` against this PSF's kernel, writing into `out`.
    ///
    /// # Errors
    /// [`Error::MissingKernel`] if no kernel with positive width and height
    /// is attached; otherwise the errors of [`kernel::convolve`].
    pub fn convolve<O, I>(
        &self,
        out: &mut O,
        input: &I,
        do_normalize: bool,
        edge_bit: i32,
    ) -> Result<()>
    where
        O: ImageMut,
        I: Image,
    {
        match &self.kernel {
            Some(k) if k.width() > 0 && k.height() > 0 => {
                kernel::convolve(out, input, k, do_normalize, edge_bit)
            }
            _ => Err(Error::MissingKernel),
        }
    }
}

/// Builds a concrete PSF variant from one of the two construction
/// protocols.
///
/// Each variant implements at most one protocol; the defaults fail with
/// [`Error::UnsupportedConstruction`] naming the missing signature.
pub trait PsfFactory: Send + Sync {
    /// Builds a PSF from the parametric signature.
    ///
    /// # Errors
    /// [`Error::UnsupportedConstruction`] unless overridden.
    fn create_parametric(
        &self,
        _width: usize,
        _height: usize,
        _p0: f64,
        _p1: f64,
        _p2: f64,
    ) -> Result<Psf> {
        Err(Error::UnsupportedConstruction {
            signature: "(width, height, p0, p1, p2)",
        })
    }

    /// Builds a PSF from a pre-built kernel.
    ///
    /// # Errors
    /// [`Error::UnsupportedConstruction`] unless overridden.
    fn create_from_kernel(&self, _kernel: Kernel) -> Result<Psf> {
        Err(Error::UnsupportedConstruction {
            signature: "(kernel)",
        })
    }
}

/// Registry of PSF builders, keyed by model name.
pub type PsfRegistry = AlgorithmRegistry<Arc<dyn PsfFactory>>;

/// Creates a named PSF with the parametric signature.
///
/// # Errors
/// [`Error::UnknownAlgorithm`] if `name` is not registered;
/// [`Error::UnsupportedConstruction`] if the variant only supports
/// kernel-based construction.
pub fn create_psf(
    registry: &PsfRegistry,
    name: &str,
    width: usize,
    height: usize,
    p0: f64,
    p1: f64,
    p2: f64,
) -> Result<Psf> {
    registry
        .factory(name)?
        .create_parametric(width, height, p0, p1, p2)
}

/// Creates a named PSF from a pre-built kernel.
///
/// # Errors
/// [`Error::UnknownAlgorithm`] if `name` is not registered;
/// [`Error::UnsupportedConstruction`] if the variant only supports
/// parametric construction.
pub fn create_psf_from_kernel(registry: &PsfRegistry, name: &str, kernel: Kernel) -> Result<Psf> {
    registry.factory(name)?.create_from_kernel(kernel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::GridImage;
    use approx::assert_relative_eq;

    struct RoundGaussian {
        sigma: f64,
    }

    impl PsfProfile for RoundGaussian {
        fn value_at(&self, dx: f64, dy: f64, _x_image: i32, _y_image: i32) -> f64 {
            (-(dx * dx + dy * dy) / (2.0 * self.sigma * self.sigma)).exp()
        }
    }

    struct GaussianFactory;

    impl PsfFactory for GaussianFactory {
        fn create_parametric(
            &self,
            width: usize,
            height: usize,
            p0: f64,
            _p1: f64,
            _p2: f64,
        ) -> Result<Psf> {
            let profile = RoundGaussian { sigma: p0 };
            let kernel = Kernel::from_function(width, height, |dx, dy| {
                profile.value_at(dx, dy, 0, 0)
            });
            Ok(Psf::new(Box::new(RoundGaussian { sigma: p0 })).with_kernel(kernel))
        }
    }

    struct NoProtocolFactory;

    impl PsfFactory for NoProtocolFactory {}

    #[test]
    fn test_value_forwards_to_profile() {
        let psf = Psf::new(Box::new(RoundGaussian { sigma: 1.0 }));
        assert_relative_eq!(psf.value(0.0, 0.0), 1.0, epsilon = 1e-12);
        assert!(psf.value(1.0, 0.0) < 1.0);
        // Spatially constant profile ignores the absolute position.
        assert_relative_eq!(
            psf.value_at(0.5, -0.5, 1000, 2000),
            psf.value(0.5, -0.5),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_image_peak_on_centre_pixel() {
        let mut psf = Psf::new(Box::new(RoundGaussian { sigma: 1.5 }));
        psf.set_raster_width(7);
        psf.set_raster_height(7);

        // Pixel-centre position: zero sub-pixel phase.
        let raster = psf.image(10.5, 20.5);
        assert_eq!(raster.dim(), (7, 7));
        assert_relative_eq!(raster[[3, 3]], 1.0, epsilon = 1e-12);
        assert!(raster[[3, 4]] < raster[[3, 3]]);
        assert_relative_eq!(raster[[3, 2]], raster[[3, 4]], epsilon = 1e-12);
    }

    #[test]
    fn test_image_sub_pixel_phase_shifts_peak() {
        let mut psf = Psf::new(Box::new(RoundGaussian { sigma: 1.0 }));
        psf.set_raster_width(5);
        psf.set_raster_height(5);

        // A source right of the pixel centre pushes weight to the right.
        let raster = psf.image(10.8, 20.5);
        assert!(raster[[2, 3]] > raster[[2, 1]]);
    }

    #[test]
    fn test_convolve_without_kernel_fails() {
        let psf = Psf::new(Box::new(RoundGaussian { sigma: 1.0 }));
        let input = GridImage::new(4, 4, 1.0f64);
        let mut out = GridImage::new(4, 4, 0.0f64);

        let err = psf.convolve(&mut out, &input, true, -1).unwrap_err();
        assert!(matches!(err, Error::MissingKernel));
    }

    #[test]
    fn test_convolve_with_kernel_delegates() {
        let registry = PsfRegistry::new();
        registry.register("gaussian", Arc::new(GaussianFactory));
        let psf = create_psf(&registry, "gaussian", 5, 5, 1.0, 0.0, 0.0).unwrap();

        let input = GridImage::new(8, 8, 3.0f64);
        let mut out = GridImage::new(8, 8, 0.0f64);
        psf.convolve(&mut out, &input, true, -1).unwrap();
        assert_relative_eq!(out.pixel(4, 4), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_create_psf_unknown_name_fails() {
        let registry = PsfRegistry::new();
        let err = create_psf(&registry, "unregistered-name", 5, 5, 1.0, 0.0, 0.0).unwrap_err();
        assert!(matches!(err, Error::UnknownAlgorithm(_)));
    }

    #[test]
    fn test_unimplemented_signatures_fail() {
        let registry = PsfRegistry::new();
        registry.register("stub", Arc::new(NoProtocolFactory));

        let err = create_psf(&registry, "stub", 5, 5, 1.0, 0.0, 0.0).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedConstruction {
                signature: "(width, height, p0, p1, p2)"
            }
        ));

        let kernel = Kernel::from_function(3, 3, |_, _| 1.0);
        let err = create_psf_from_kernel(&registry, "stub", kernel).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedConstruction {
                signature: "(kernel)"
            }
        ));
    }

    #[test]
    fn test_raster_hint_is_independent_of_kernel() {
        let kernel = Kernel::from_function(3, 3, |_, _| 1.0);
        let mut psf = Psf::new(Box::new(RoundGaussian { sigma: 1.0 })).with_kernel(kernel);
        assert_eq!(psf.raster_dimensions(), (3, 3));

        psf.set_raster_width(9);
        psf.set_raster_height(11);
        assert_eq!(psf.raster_dimensions(), (9, 11));
        assert_eq!(psf.kernel().unwrap().width(), 3);
    }
}
