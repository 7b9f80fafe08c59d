//! # Voxel Streamer
//!
//! The streaming core of a voxel terrain engine: it decides which terrain
//! chunks must exist around a moving observer, builds a merged triangle mesh
//! for each chunk's voxel content on background workers, and packs the
//! variable-sized per-chunk mesh data into a few large shared buffers owned
//! by the embedding renderer.
//!
//! ## Architecture
//!
//! - [`region`] - first-fit free-list allocator handing out aligned ranges
//!   inside the shared mesh buffers, growing the logical capacity on demand.
//! - [`voxels`] - dense per-chunk voxel storage with overlap margins, the
//!   shared field cache, and the pluggable terrain source.
//! - [`meshing`] - greedy face merging with bit-packed per-corner ambient
//!   occlusion, plus vertex and index byte packing.
//! - [`streaming`] - the chunk store and its frontier algorithm: per-frame
//!   incremental loading and unloading driven by observer position and view
//!   frustum.
//! - [`pipeline`] - the worker pool and the action FIFO that hands finished
//!   meshes back to the consumer thread without ever blocking it.
//!
//! The embedder owns the window, GPU device, and draw submission; it attaches
//! at the [`pipeline::BufferSink`] seam and reads
//! [`streaming::ChunkStore::ready_chunks`] each frame to build draw commands.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use cgmath::Point3;
//! use voxel_streamer::config::StreamerConfig;
//! use voxel_streamer::pipeline::{BufferSink, MeshBufferKind};
//! use voxel_streamer::streaming::{ChunkStore, Frustum};
//! use voxel_streamer::voxels::PerlinTerrain;
//!
//! struct NullSink;
//!
//! impl BufferSink for NullSink {
//!     fn write(&mut self, _kind: MeshBufferKind, _offset: u64, _bytes: &[u8]) {}
//!     fn resize(&mut self, _capacity_faces: u64) {}
//! }
//!
//! let config = StreamerConfig {
//!     render_distance: 48.0,
//!     worker_count: 1,
//!     ..Default::default()
//! };
//! let mut store = ChunkStore::new(config, Arc::new(PerlinTerrain::new(42)));
//!
//! let mut sink = NullSink;
//! store.tick(Point3::new(0.0, 32.0, 0.0), &Frustum::everything(), &mut sink);
//! store.shutdown(&mut sink);
//! ```

pub mod config;
pub mod core;
pub mod meshing;
pub mod pipeline;
pub mod region;
pub mod streaming;
pub mod voxels;

pub use config::StreamerConfig;
pub use pipeline::{BufferSink, MeshBufferKind};
pub use region::{Region, RegionAllocator};
pub use streaming::{Chunk, ChunkStore, Frustum};
pub use voxels::{FlatTerrain, PerlinTerrain, TerrainSource, VoxelField};
