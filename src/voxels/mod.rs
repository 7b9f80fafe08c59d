//! # Voxels Module
//!
//! Dense voxel storage for single chunks, the shared field cache, and the
//! terrain source that fills fields with content.
//!
//! ## Storage Layout
//!
//! A chunk's voxel content is stored with a one-cell margin on every axis so
//! the mesher can test neighbor occupancy across chunk borders without
//! chasing other chunks: `(CHUNK_DIMENSION + 2)` cells on X and Z,
//! `(CHUNK_HEIGHT + 2)` on Y, one material byte per cell, X fastest then Z
//! then Y.

mod field;
mod field_cache;
mod terrain;

pub use field::VoxelField;
pub use field_cache::FieldCache;
pub use terrain::{FlatTerrain, PerlinTerrain, TerrainSource};

/// The X/Z extent of a chunk in voxels.
pub const CHUNK_DIMENSION: usize = 64;
/// The Y extent of a chunk in voxels.
pub const CHUNK_HEIGHT: usize = 64;
/// X/Z extent of a voxel field including the one-cell margin on each side.
pub const FIELD_DIMENSION_WRAPPED: usize = CHUNK_DIMENSION + 2;
/// Y extent of a voxel field including the one-cell margin on each side.
pub const FIELD_HEIGHT_WRAPPED: usize = CHUNK_HEIGHT + 2;
/// Number of cells in one margined X/Z plane of a voxel field.
pub const FIELD_PLANE_SIZE_WRAPPED: usize = FIELD_DIMENSION_WRAPPED * FIELD_DIMENSION_WRAPPED;
/// Total number of cells in a margined voxel field.
pub const FIELD_SIZE_WRAPPED: usize = FIELD_PLANE_SIZE_WRAPPED * FIELD_HEIGHT_WRAPPED;

/// Material id of empty space.
pub const MATERIAL_AIR: u8 = 0;
/// Material id of the terrain surface layer.
pub const MATERIAL_GRASS: u8 = 1;
/// Material id of the shallow sub-surface layers.
pub const MATERIAL_DIRT: u8 = 2;
/// Material id of deep terrain.
pub const MATERIAL_STONE: u8 = 3;
