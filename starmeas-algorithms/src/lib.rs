//! starmeas-algorithms: Concrete measurement algorithms and PSF models.
//!
//! This crate provides the built-in measurement variants:
//! - **naive** - unweighted first-moment centroid of a 3x3 region
//! - **moments** - windowed second moments with covariance propagation
//! - **double-gaussian** - parametric PSF (core plus halo)
//! - **kernel** - PSF backed by a pre-built rasterization kernel
//!
#![warn(missing_docs)]

mod moments;
mod naive;
mod profiles;

pub use moments::{MomentsShape, MomentsShapeConfig, FLAG_EDGE};
pub use naive::NaiveCentroid;
pub use profiles::{
    DoubleGaussianProfile, DoubleGaussianPsfFactory, KernelPsfFactory, SampledProfile,
};

// Re-export core measurement traits
pub use starmeas_core::measure::{CentroidAlgorithm, ShapeAlgorithm};

use std::sync::Arc;

use starmeas_core::image::PixelValue;
use starmeas_core::measure::{CentroidFactory, ShapeFactory};
use starmeas_core::psf::PsfRegistry;
use starmeas_core::registry::AlgorithmRegistry;

fn make_naive<P: PixelValue>() -> Box<dyn CentroidAlgorithm<P>> {
    Box::new(NaiveCentroid::new())
}

fn make_moments<P: PixelValue>() -> Box<dyn ShapeAlgorithm<P>> {
    Box::new(MomentsShape::new())
}

/// Creates a centroid-algorithm registry with the built-in variants
/// registered.
#[must_use]
pub fn centroid_registry_with_defaults<P: PixelValue>() -> AlgorithmRegistry<CentroidFactory<P>> {
    let registry = AlgorithmRegistry::new();
    registry.register("naive", make_naive::<P> as CentroidFactory<P>);
    registry
}

/// Creates a shape-algorithm registry with the built-in variants
/// registered.
#[must_use]
pub fn shape_registry_with_defaults<P: PixelValue>() -> AlgorithmRegistry<ShapeFactory<P>> {
    let registry = AlgorithmRegistry::new();
    registry.register("moments", make_moments::<P> as ShapeFactory<P>);
    registry
}

/// Creates a PSF registry with the built-in models registered.
#[must_use]
pub fn psf_registry_with_defaults() -> PsfRegistry {
    let registry = PsfRegistry::new();
    registry.register("double-gaussian", Arc::new(DoubleGaussianPsfFactory));
    registry.register("kernel", Arc::new(KernelPsfFactory));
    registry
}
