//! Convolution kernels and the generic image-convolution routine.

use ndarray::Array2;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::image::{Image, ImageMut, PixelValue};

/// Pixel count above which convolution rows are processed in parallel.
const PARALLEL_PIXEL_THRESHOLD: usize = 64 * 64;

/// A finite 2-D weight grid defining a PSF's rasterized realisation.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    weights: Array2<f64>,
}

impl Kernel {
    /// Wraps a weight grid (indexed `[row, col]`, i.e. `[y, x]`).
    #[must_use]
    pub fn new(weights: Array2<f64>) -> Self {
        Self { weights }
    }

    /// Samples an analytic profile over a `width x height` grid.
    ///
    /// `f(dx, dy)` is evaluated at integer offsets from the kernel centre
    /// pixel `(width / 2, height / 2)`.
    #[must_use]
    pub fn from_function<F>(width: usize, height: usize, f: F) -> Self
    where
        F: Fn(f64, f64) -> f64,
    {
        let cx = (width / 2) as f64;
        let cy = (height / 2) as f64;
        let weights =
            Array2::from_shape_fn((height, width), |(row, col)| f(col as f64 - cx, row as f64 - cy));
        Self { weights }
    }

    /// Kernel width in pixels.
    #[must_use]
    pub fn width(&self) -> usize {
        self.weights.dim().1
    }

    /// Kernel height in pixels.
    #[must_use]
    pub fn height(&self) -> usize {
        self.weights.dim().0
    }

    /// Weight at kernel-local `(x, y)`.
    #[inline]
    #[must_use]
    pub fn value(&self, x: usize, y: usize) -> f64 {
        self.weights[[y, x]]
    }

    /// The backing weight grid.
    #[must_use]
    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    /// Sum of all weights.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.weights.sum()
    }

    /// Returns a copy of this kernel scaled to unit sum.
    ///
    /// # Errors
    /// [`Error::Computation`] if the weights sum to zero.
    pub fn normalized(&self) -> Result<Self> {
        let sum = self.sum();
        if sum.abs() < f64::EPSILON {
            return Err(Error::Computation(
                "cannot normalize a kernel whose weights sum to zero".to_owned(),
            ));
        }
        Ok(Self {
            weights: &self.weights / sum,
        })
    }
}

/// Convolves `input` with `kernel`, writing into `out`.
///
/// Output pixels whose kernel footprint fits entirely inside the input get
/// the weighted sum; edge pixels copy the input value and, when
/// `edge_bit >= 0`, have that bit OR-ed into the output's flag plane
/// (a no-op for containers without one). With `do_normalize` the kernel
/// weights are scaled to unit sum before use.
///
/// # Errors
/// - [`Error::DegenerateKernel`] if the kernel has zero width or height.
/// - [`Error::DimensionMismatch`] if `out` and `input` differ in size.
/// - [`Error::Computation`] if normalization is requested for a zero-sum
///   kernel.
pub fn convolve<O, I>(
    out: &mut O,
    input: &I,
    kernel: &Kernel,
    do_normalize: bool,
    edge_bit: i32,
) -> Result<()>
where
    O: ImageMut,
    I: Image,
{
    let (kw, kh) = (kernel.width(), kernel.height());
    if kw == 0 || kh == 0 {
        return Err(Error::DegenerateKernel {
            width: kw,
            height: kh,
        });
    }

    let (width, height) = input.dimensions();
    let (out_width, out_height) = out.dimensions();
    if (out_width, out_height) != (width, height) {
        return Err(Error::DimensionMismatch {
            out_width,
            out_height,
            in_width: width,
            in_height: height,
        });
    }

    let normalized;
    let weights = if do_normalize {
        normalized = kernel.normalized()?;
        normalized.weights()
    } else {
        kernel.weights()
    };

    let geometry = Geometry {
        width,
        height,
        kw,
        kh,
        cx: kw / 2,
        cy: kh / 2,
    };

    let rows: Vec<Vec<f64>> = if width * height >= PARALLEL_PIXEL_THRESHOLD {
        (0..height)
            .into_par_iter()
            .map(|y| convolve_row(input, weights, &geometry, y))
            .collect()
    } else {
        (0..height)
            .map(|y| convolve_row(input, weights, &geometry, y))
            .collect()
    };

    for (y, row) in rows.into_iter().enumerate() {
        for (x, value) in row.into_iter().enumerate() {
            out.set_pixel(x, y, O::Pixel::from_f64(value));
            if edge_bit >= 0 && !geometry.is_interior(x, y) {
                out.or_flag(x, y, 1u32 << edge_bit);
            }
        }
    }
    Ok(())
}

struct Geometry {
    width: usize,
    height: usize,
    kw: usize,
    kh: usize,
    cx: usize,
    cy: usize,
}

impl Geometry {
    // True when the kernel footprint around (x, y) lies inside the image.
    fn is_interior(&self, x: usize, y: usize) -> bool {
        x >= self.cx
            && x + (self.kw - self.cx) <= self.width
            && y >= self.cy
            && y + (self.kh - self.cy) <= self.height
    }
}

fn convolve_row<I: Image>(
    input: &I,
    weights: &Array2<f64>,
    geometry: &Geometry,
    y: usize,
) -> Vec<f64> {
    let mut row = Vec::with_capacity(geometry.width);
    for x in 0..geometry.width {
        if geometry.is_interior(x, y) {
            let mut acc = 0.0;
            for j in 0..geometry.kh {
                for i in 0..geometry.kw {
                    let px = input.pixel(x - geometry.cx + i, y - geometry.cy + j);
                    acc += px.to_f64() * weights[[j, i]];
                }
            }
            row.push(acc);
        } else {
            row.push(input.pixel(x, y).to_f64());
        }
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{GridImage, MaskedGridImage};
    use approx::assert_relative_eq;

    #[test]
    fn test_flat_kernel_preserves_constant_image() {
        let input = GridImage::new(8, 8, 5.0f64);
        let mut out = GridImage::new(8, 8, 0.0f64);
        let kernel = Kernel::new(Array2::from_elem((3, 3), 1.0));

        convolve(&mut out, &input, &kernel, true, -1).unwrap();
        for y in 0..8 {
            for x in 0..8 {
                assert_relative_eq!(out.pixel(x, y), 5.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_delta_kernel_is_identity_on_interior() {
        let mut input = GridImage::new(5, 5, 1.0f64);
        input.set_pixel(2, 2, 9.0);
        input.set_pixel(1, 3, 4.0);
        let mut out = GridImage::new(5, 5, 0.0f64);

        let mut weights = Array2::zeros((3, 3));
        weights[[1, 1]] = 1.0;
        convolve(&mut out, &input, &Kernel::new(weights), false, -1).unwrap();

        for y in 1..4 {
            for x in 1..4 {
                assert_relative_eq!(out.pixel(x, y), input.pixel(x, y), epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_degenerate_kernel_is_rejected() {
        let input = GridImage::new(4, 4, 1.0f64);
        let mut out = GridImage::new(4, 4, 0.0f64);
        let kernel = Kernel::new(Array2::zeros((0, 3)));

        let err = convolve(&mut out, &input, &kernel, true, -1).unwrap_err();
        assert!(matches!(
            err,
            Error::DegenerateKernel {
                width: 3,
                height: 0
            }
        ));
    }

    #[test]
    fn test_zero_sum_kernel_cannot_be_normalized() {
        let mut weights = Array2::zeros((3, 3));
        weights[[0, 0]] = 1.0;
        weights[[2, 2]] = -1.0;
        let err = Kernel::new(weights).normalized().unwrap_err();
        assert!(matches!(err, Error::Computation(_)));
    }

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let input = GridImage::new(4, 4, 1.0f64);
        let mut out = GridImage::new(5, 4, 0.0f64);
        let kernel = Kernel::new(Array2::from_elem((3, 3), 1.0));

        let err = convolve(&mut out, &input, &kernel, true, -1).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[test]
    fn test_edge_bit_tags_border_pixels_only() {
        let input = GridImage::new(6, 6, 2.0f64);
        let mut out = MaskedGridImage::new(6, 6, 0.0f64);
        let kernel = Kernel::new(Array2::from_elem((3, 3), 1.0));

        convolve(&mut out, &input, &kernel, true, 3).unwrap();
        assert_eq!(out.flags(0, 0), 1 << 3);
        assert_eq!(out.flags(5, 2), 1 << 3);
        assert_eq!(out.flags(3, 5), 1 << 3);
        assert_eq!(out.flags(2, 2), 0);
        // Edge pixels carry the unconvolved input value.
        assert_relative_eq!(out.pixel(0, 0), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_from_function_samples_offsets() {
        let kernel = Kernel::from_function(3, 3, |dx, dy| 10.0 * dy + dx);
        assert_relative_eq!(kernel.value(1, 1), 0.0, epsilon = 1e-12);
        assert_relative_eq!(kernel.value(2, 1), 1.0, epsilon = 1e-12);
        assert_relative_eq!(kernel.value(0, 0), -11.0, epsilon = 1e-12);
        assert_relative_eq!(kernel.value(1, 2), 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_normalized_kernel_sums_to_one() {
        let kernel = Kernel::from_function(5, 5, |dx, dy| (-(dx * dx + dy * dy) / 2.0).exp());
        let normalized = kernel.normalized().unwrap();
        assert_relative_eq!(normalized.sum(), 1.0, epsilon = 1e-12);
    }
}
