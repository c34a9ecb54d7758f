//! Destination format implementations.

pub mod zarr;
