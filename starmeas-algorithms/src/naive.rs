//! Naive centroid: unweighted first moment of the 3x3 region around a pixel.

use starmeas_core::image::{index_to_position, position_to_index, Image, PixelValue};
use starmeas_core::measure::CentroidAlgorithm;
use starmeas_core::psf::Psf;
use starmeas_core::{Centroid, Error, Result};

/// Centroid estimator using a simple unweighted first moment of the 3x3
/// region around the nominal pixel.
///
/// The PSF is accepted but unused, and no positional errors are estimated.
#[derive(Debug, Clone, Default)]
pub struct NaiveCentroid;

impl NaiveCentroid {
    /// Creates the estimator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl<P: PixelValue> CentroidAlgorithm<P> for NaiveCentroid {
    fn name(&self) -> &'static str {
        "naive"
    }

    fn do_apply(
        &self,
        image: &dyn Image<Pixel = P>,
        xcen: f64,
        ycen: f64,
        _psf: Option<&Psf>,
        background: f64,
    ) -> Result<Centroid> {
        let (x0, y0) = image.origin();
        // work in image-local pixel coordinates
        let x = position_to_index(xcen) - x0;
        let y = position_to_index(ycen) - y0;

        let (width, height) = image.dimensions();
        if x < 1 || y < 1 || x + 1 >= width as i32 || y + 1 >= height as i32 {
            return Err(Error::EdgeOfImage { x, y });
        }

        let px = |dx: i32, dy: i32| image.pixel((x + dx) as usize, (y + dy) as usize).to_f64();

        let sum = px(-1, 1)
            + px(0, 1)
            + px(1, 1)
            + px(-1, 0)
            + px(0, 0)
            + px(1, 0)
            + px(-1, -1)
            + px(0, -1)
            + px(1, -1)
            - 9.0 * background;

        if sum == 0.0 {
            return Err(Error::NoCounts { x, y });
        }

        let sum_x = -px(-1, 1) + px(1, 1) - px(-1, 0) + px(1, 0) - px(-1, -1) + px(1, -1);
        let sum_y = (px(-1, 1) + px(0, 1) + px(1, 1)) - (px(-1, -1) + px(0, -1) + px(1, -1));

        Ok(Centroid::new(
            index_to_position(x + x0) + sum_x / sum,
            index_to_position(y + y0) + sum_y / sum,
        ))
    }
}
