//! Measurement-algorithm strategy traits.
//!
//! Each capability family exposes one fixed entry point (`apply`) and one
//! required method (`do_apply`) holding the actual math. `apply` performs
//! no numeric work; it exists so cross-cutting behavior (bounds validation,
//! instrumentation) can later be added in one place without touching every
//! variant, and it adds no failure modes of its own.

use crate::centroid::Centroid;
use crate::error::Result;
use crate::image::{Image, PixelValue};
use crate::psf::Psf;
use crate::registry::AlgorithmRegistry;
use crate::shape::Shape;

/// Trait for centroid-measurement algorithms.
pub trait CentroidAlgorithm<P: PixelValue>: Send + Sync {
    /// Algorithm name.
    fn name(&self) -> &'static str;

    /// Computes a centroid for the object near `(xcen, ycen)`.
    ///
    /// `xcen, ycen` are nominal object-frame coordinates, `psf` is an
    /// optional PSF model (`None` means no PSF correction requested), and
    /// `background` is subtracted from every pixel before analysis.
    fn do_apply(
        &self,
        image: &dyn Image<Pixel = P>,
        xcen: f64,
        ycen: f64,
        psf: Option<&Psf>,
        background: f64,
    ) -> Result<Centroid>;

    /// Measures a centroid; forwards directly to [`Self::do_apply`].
    fn apply(
        &self,
        image: &dyn Image<Pixel = P>,
        xcen: f64,
        ycen: f64,
        psf: Option<&Psf>,
        background: f64,
    ) -> Result<Centroid> {
        self.do_apply(image, xcen, ycen, psf, background)
    }
}

impl<P: PixelValue> std::fmt::Debug for dyn CentroidAlgorithm<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CentroidAlgorithm").field(&self.name()).finish()
    }
}

/// Trait for shape-measurement algorithms.
pub trait ShapeAlgorithm<P: PixelValue>: Send + Sync {
    /// Algorithm name.
    fn name(&self) -> &'static str;

    /// Computes moments for the object near `(xcen, ycen)`.
    fn do_apply(
        &self,
        image: &dyn Image<Pixel = P>,
        xcen: f64,
        ycen: f64,
        psf: Option<&Psf>,
        background: f64,
    ) -> Result<Shape>;

    /// Measures a shape; forwards directly to [`Self::do_apply`].
    fn apply(
        &self,
        image: &dyn Image<Pixel = P>,
        xcen: f64,
        ycen: f64,
        psf: Option<&Psf>,
        background: f64,
    ) -> Result<Shape> {
        self.do_apply(image, xcen, ycen, psf, background)
    }
}

/// Constructor stored in a centroid-algorithm registry.
pub type CentroidFactory<P> = fn() -> Box<dyn CentroidAlgorithm<P>>;

/// Constructor stored in a shape-algorithm registry.
pub type ShapeFactory<P> = fn() -> Box<dyn ShapeAlgorithm<P>>;

/// Constructs the centroid algorithm registered under `name`.
///
/// # Errors
/// [`crate::Error::UnknownAlgorithm`] if `name` was never registered.
pub fn make_centroid_algorithm<P: PixelValue>(
    registry: &AlgorithmRegistry<CentroidFactory<P>>,
    name: &str,
) -> Result<Box<dyn CentroidAlgorithm<P>>> {
    Ok(registry.factory(name)?())
}

/// Constructs the shape algorithm registered under `name`.
///
/// # Errors
/// [`crate::Error::UnknownAlgorithm`] if `name` was never registered.
pub fn make_shape_algorithm<P: PixelValue>(
    registry: &AlgorithmRegistry<ShapeFactory<P>>,
    name: &str,
) -> Result<Box<dyn ShapeAlgorithm<P>>> {
    Ok(registry.factory(name)?())
}
