//! Error types for starmeas-core.

use thiserror::Error;

/// Result type alias for starmeas operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for starmeas operations.
#[derive(Error, Debug)]
pub enum Error {
    /// No algorithm or PSF model registered under the requested name.
    #[error("no algorithm registered under name {0:?}")]
    UnknownAlgorithm(String),

    /// The PSF factory does not implement the requested construction signature.
    #[error("this PSF type does not have a {signature} constructor")]
    UnsupportedConstruction {
        /// The missing construction signature.
        signature: &'static str,
    },

    /// The measurement window contains no counts above background.
    #[error("object at ({x}, {y}) has no counts")]
    NoCounts { x: i32, y: i32 },

    /// The measurement window extends beyond the image.
    #[error("object at ({x}, {y}) is too close to the edge of the frame")]
    EdgeOfImage { x: i32, y: i32 },

    /// Numerically degenerate input.
    #[error("computation error: {0}")]
    Computation(String),

    /// Convolution requested without a usable kernel realisation.
    #[error("PSF does not have a realisation that can be used for convolution")]
    MissingKernel,

    /// Kernel with zero width or height.
    #[error("kernel has degenerate dimensions {width}x{height}")]
    DegenerateKernel { width: usize, height: usize },

    /// Input and output images have different dimensions.
    #[error("image dimensions differ: output is {out_width}x{out_height}, input is {in_width}x{in_height}")]
    DimensionMismatch {
        out_width: usize,
        out_height: usize,
        in_width: usize,
        in_height: usize,
    },
}
