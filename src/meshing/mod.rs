//! # Meshing Module
//!
//! Converts a chunk's voxel field into the smallest practical set of merged
//! rectangular faces, each carrying a material and bit-packed per-corner
//! ambient occlusion, and packs those faces into GPU-ready vertex and index
//! bytes.
//!
//! ## Pipeline
//! 1. [`GreedyMesher::mesh`] walks the field one axis at a time, builds a
//!    face-boundary mask per slice, and merges identical mask cells into
//!    rectangles (capped at [`MAX_MERGE`] cells per side).
//! 2. Each emitted [`FaceRect`] becomes four [`MeshVertex`] entries and six
//!    indices via [`face_vertices`] and [`face_indices`].
//!
//! The packed [`FaceValue`] integer is part of the interface to the
//! mesh-consuming side: shaders unpack material and occlusion from the same
//! bits this module writes.

mod face;
mod greedy;
mod vertex;

pub use face::{FaceSide, FaceValue};
pub use greedy::{FaceRect, GreedyMesher, MAX_MERGE};
pub use vertex::{
    face_indices, face_vertices, MeshVertex, INDEX_BYTES_PER_FACE, VERTEX_BYTES_PER_FACE,
};
