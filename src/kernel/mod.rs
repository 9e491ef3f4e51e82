//! Sampled zero-mean scoring kernels.
//!
//! The scalar kernel is the reference implementation; the rayon module
//! provides a row-parallel coarse scan that produces identical results.

pub mod scalar;

#[cfg(feature = "rayon")]
pub mod rayon;
