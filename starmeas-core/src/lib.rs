//! starmeas-core: Core traits and types for astronomical source measurement.
//!
//! This crate provides the foundational abstractions for measuring one
//! source at one position: pixel-container traits, centroid and shape
//! value types, the name-to-constructor algorithm registry, and the PSF
//! entity with its convolution routine.
//!

pub mod centroid;
pub mod error;
pub mod image;
pub mod kernel;
pub mod measure;
pub mod psf;
pub mod registry;
pub mod shape;

pub use centroid::Centroid;
pub use error::{Error, Result};
pub use image::{
    index_to_position, position_to_index, GridImage, Image, ImageMut, MaskedGridImage, PixelValue,
};
pub use kernel::{convolve, Kernel};
pub use measure::{
    make_centroid_algorithm, make_shape_algorithm, CentroidAlgorithm, CentroidFactory,
    ShapeAlgorithm, ShapeFactory,
};
pub use psf::{create_psf, create_psf_from_kernel, Psf, PsfFactory, PsfProfile, PsfRegistry};
pub use registry::{AlgorithmRegistry, AlgorithmTag};
pub use shape::{MomentCovariance, Shape};
