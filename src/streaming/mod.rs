//! # Streaming Module
//!
//! Decides which chunks exist. The world is effectively infinite, so the
//! store maintains only the chunks near the observer, expanding and
//! contracting the loaded set incrementally as the observer moves.
//!
//! ## The frontier
//! Streaming decisions never scan the whole loaded set. Each chunk counts how
//! many of its four axis neighbors are loaded; chunks with fewer than four
//! touch unloaded space and form the frontier. Each tick destroys frontier
//! chunks that fell out of range, then repeatedly expands from the frontier
//! chunk nearest the observer (in-frustum chunks first) until nothing more is
//! in range or the build ceiling is reached. Interior chunks cost nothing per
//! tick.
//!
//! All state here is owned and mutated by the consumer thread only; worker
//! threads hand results back through the pipeline FIFO.

mod frustum;

pub use frustum::Frustum;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use bitvec::prelude::*;
use cgmath::{Point2, Point3};
use log::{debug, warn};

use crate::config::StreamerConfig;
use crate::meshing::{INDEX_BYTES_PER_FACE, VERTEX_BYTES_PER_FACE};
use crate::pipeline::{BufferSink, BuildPipeline, MeshBufferKind, MeshCommit, QueuedAction};
use crate::region::Region;
use crate::voxels::{TerrainSource, CHUNK_DIMENSION, CHUNK_HEIGHT};

/// The four axis-neighbor offsets in the chunk grid.
const NEIGHBOR_OFFSETS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// One loaded chunk of terrain.
///
/// Created in the Building state; `ready` flips true when the built mesh is
/// committed, at which point `region`, `face_count` and the Y bounds are
/// valid for draw-command construction.
pub struct Chunk {
    coord: Point2<i32>,
    y_min: i32,
    y_max: i32,
    region: Option<Region>,
    face_count: u64,
    buffer_index: usize,
    ready: bool,
    neighbor_count: u8,
    in_frontier: bool,
    build_id: u64,
}

impl Chunk {
    /// Chunk grid coordinate (X, Z).
    pub fn coord(&self) -> Point2<i32> {
        self.coord
    }

    /// Occupied Y bounds of the committed mesh, inclusive.
    pub fn y_range(&self) -> (i32, i32) {
        (self.y_min, self.y_max)
    }

    /// The mesh's buffer region; `None` while building or for an empty mesh.
    pub fn region(&self) -> Option<Region> {
        self.region
    }

    /// Number of faces in the committed mesh.
    pub fn face_count(&self) -> u64 {
        self.face_count
    }

    /// Dense slot id of this chunk, unique among loaded chunks.
    pub fn buffer_index(&self) -> usize {
        self.buffer_index
    }

    /// Whether the mesh is committed and the chunk is drawable.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// How many of the four axis neighbors are currently loaded.
    pub fn neighbor_count(&self) -> u8 {
        self.neighbor_count
    }

    /// Whether this chunk is in the frontier set.
    pub fn in_frontier(&self) -> bool {
        self.in_frontier
    }

    /// World-space bounding box of the chunk's content.
    pub fn aabb(&self) -> (Point3<f32>, Point3<f32>) {
        let dim = CHUNK_DIMENSION as f32;
        let min = Point3::new(
            self.coord.x as f32 * dim,
            self.y_min as f32,
            self.coord.y as f32 * dim,
        );
        let max = Point3::new(
            min.x + dim,
            (self.y_max + 1) as f32,
            min.z + dim,
        );
        (min, max)
    }
}

fn distance_sq(coord: Point2<i32>, observer: Point3<f32>) -> f32 {
    let dim = CHUNK_DIMENSION as f32;
    let dx = (coord.x as f32 + 0.5) * dim - observer.x;
    let dz = (coord.y as f32 + 0.5) * dim - observer.z;
    dx * dx + dz * dz
}

/// Owner of the loaded chunk set and driver of incremental streaming.
///
/// The embedding game loop calls [`tick`](ChunkStore::tick) once per frame
/// and then reads [`ready_chunks`](ChunkStore::ready_chunks) to issue draw
/// commands.
pub struct ChunkStore {
    config: StreamerConfig,
    terrain: Arc<dyn TerrainSource>,
    chunks: HashMap<Point2<i32>, Chunk>,
    frontier: Vec<Point2<i32>>,
    buffer_slots: BitVec,
    pipeline: BuildPipeline,
    next_build_id: u64,
}

impl ChunkStore {
    /// Creates an empty store and starts its build pipeline.
    pub fn new(config: StreamerConfig, terrain: Arc<dyn TerrainSource>) -> Self {
        let pipeline = BuildPipeline::new(&config, terrain.clone());
        let buffer_slots = bitvec![0; config.max_active_chunks];

        ChunkStore {
            config,
            terrain,
            chunks: HashMap::new(),
            frontier: Vec::new(),
            buffer_slots,
            pipeline,
            next_build_id: 0,
        }
    }

    /// Advances streaming by one frame.
    ///
    /// Drains the pipeline FIFO (mesh commits, deferred releases, buffer
    /// resizes), destroys out-of-range frontier chunks, then expands from the
    /// frontier towards the observer until nothing more is in range or the
    /// in-flight build ceiling is hit. Never blocks on worker threads.
    pub fn tick(&mut self, observer: Point3<f32>, frustum: &Frustum, sink: &mut dyn BufferSink) {
        self.drain_pipeline(observer, sink);
        self.shrink(observer);
        self.compact_frontier();
        while self.growth_pass(observer, frustum) {}
    }

    /// All chunks whose mesh is committed and drawable.
    pub fn ready_chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values().filter(|chunk| chunk.ready)
    }

    /// The chunk loaded at `coord`, if any.
    pub fn chunk(&self, coord: Point2<i32>) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    /// Number of loaded chunks, building ones included.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether no chunk is currently loaded.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Number of dispatched builds whose result has not yet been drained.
    pub fn in_flight(&self) -> usize {
        self.pipeline.in_flight()
    }

    /// Number of buffer slots currently reserved, deferred releases included.
    pub fn used_buffer_slots(&self) -> usize {
        self.buffer_slots.count_ones()
    }

    /// Writes a voxel at a world-space position and re-meshes every loaded
    /// chunk whose field covers it.
    ///
    /// Border edits touch the overlap margins of up to three neighboring
    /// fields; those are patched too so adjacent meshes cull and shade
    /// consistently. Edits are not persisted: a field regenerated from
    /// terrain after cache eviction loses them.
    pub fn set_voxel(&mut self, position: Point3<i32>, material: u8) {
        if !(0..CHUNK_HEIGHT as i32).contains(&position.y) {
            return;
        }
        let dim = CHUNK_DIMENSION as i32;
        let home = Point2::new(position.x.div_euclid(dim), position.z.div_euclid(dim));

        for dz in -1..=1 {
            for dx in -1..=1 {
                let coord = Point2::new(home.x + dx, home.y + dz);
                let lx = position.x - coord.x * dim;
                let lz = position.z - coord.y * dim;
                if !(-1..=dim).contains(&lx) || !(-1..=dim).contains(&lz) {
                    continue;
                }

                let is_home = coord == home;
                let field = if is_home {
                    Some(
                        self.pipeline
                            .cache()
                            .get_or_generate(coord, self.terrain.as_ref()),
                    )
                } else {
                    self.pipeline.cache().cached(coord)
                };
                let Some(field) = field else {
                    continue;
                };
                field.get_mut().set(lx, position.y, lz, material);

                if let Some(chunk) = self.chunks.get_mut(&coord) {
                    // Re-mesh keeps the buffer slot; the replaced region is
                    // freed when the new mesh commits.
                    chunk.build_id = self.next_build_id;
                    self.next_build_id += 1;
                    let build_id = chunk.build_id;
                    self.pipeline.submit_build(coord, build_id);
                }
            }
        }
    }

    /// Stops the worker pool and consumes every remaining queued action.
    pub fn shutdown(&mut self, sink: &mut dyn BufferSink) {
        let mut actions = Vec::new();
        self.pipeline.shutdown(|action| actions.push(action));
        let origin = Point3::new(0.0, 0.0, 0.0);
        for action in actions {
            self.apply_action(action, origin, sink);
        }
    }

    fn in_range(&self, coord: Point2<i32>, observer: Point3<f32>) -> bool {
        distance_sq(coord, observer) < self.config.render_distance * self.config.render_distance
    }

    fn drain_pipeline(&mut self, observer: Point3<f32>, sink: &mut dyn BufferSink) {
        let mut actions = Vec::new();
        self.pipeline.drain(|action| actions.push(action));
        for action in actions {
            self.apply_action(action, observer, sink);
        }
    }

    fn apply_action(
        &mut self,
        action: QueuedAction,
        observer: Point3<f32>,
        sink: &mut dyn BufferSink,
    ) {
        match action {
            QueuedAction::CommitMesh(commit) => self.commit_mesh(commit, sink),
            QueuedAction::BuildFailed {
                coord,
                build_id,
                error,
            } => {
                warn!("mesh build failed for chunk ({}, {}): {}", coord.x, coord.y, error);
                // A failed re-mesh keeps the previous mesh; a stale failure
                // concerns a chunk that no longer exists. Anything else is
                // evicted back to not-loaded, and the frontier re-expands
                // here next tick if the chunk is still wanted.
                let evict = matches!(
                    self.chunks.get(&coord),
                    Some(chunk) if chunk.build_id == build_id && !chunk.ready
                );
                if evict {
                    self.destroy_chunk(coord, observer);
                }
            }
            QueuedAction::ReleaseChunk {
                buffer_index,
                region,
            } => {
                if let Some(index) = buffer_index {
                    self.buffer_slots.set(index, false);
                }
                if let Some(region) = region {
                    self.pipeline.allocator().free(region);
                }
            }
            QueuedAction::BuffersResized { capacity_faces } => sink.resize(capacity_faces),
        }
    }

    fn commit_mesh(&mut self, commit: MeshCommit, sink: &mut dyn BufferSink) {
        match self.chunks.get_mut(&commit.coord) {
            Some(chunk) if chunk.build_id == commit.build_id => {
                if let Some(region) = commit.region {
                    sink.write(
                        MeshBufferKind::Vertex,
                        region.offset * VERTEX_BYTES_PER_FACE,
                        &commit.vertex_bytes,
                    );
                    sink.write(
                        MeshBufferKind::Index,
                        region.offset * INDEX_BYTES_PER_FACE,
                        &commit.index_bytes,
                    );
                }

                let replaced = chunk.region.take();
                chunk.region = commit.region;
                chunk.face_count = commit.face_count;
                chunk.y_min = commit.y_min;
                chunk.y_max = commit.y_max;
                chunk.ready = true;

                if let Some(old) = replaced {
                    let delay = if self.config.deferred_release { 1 } else { 0 };
                    self.pipeline.enqueue(
                        QueuedAction::ReleaseChunk {
                            buffer_index: None,
                            region: Some(old),
                        },
                        delay,
                    );
                }
            }
            _ => {
                // The chunk was destroyed or superseded while building.
                debug!(
                    "discarding stale mesh for chunk ({}, {})",
                    commit.coord.x, commit.coord.y
                );
                if let Some(region) = commit.region {
                    self.pipeline.allocator().free(region);
                }
            }
        }
    }

    fn shrink(&mut self, observer: Point3<f32>) {
        let out_of_range: Vec<Point2<i32>> = self
            .frontier
            .iter()
            .copied()
            .filter(|&coord| self.chunks.contains_key(&coord) && !self.in_range(coord, observer))
            .collect();
        for coord in out_of_range {
            if self.chunks.contains_key(&coord) {
                self.destroy_chunk(coord, observer);
            }
        }
    }

    fn compact_frontier(&mut self) {
        let chunks = &self.chunks;
        self.frontier
            .retain(|coord| chunks.get(coord).is_some_and(|chunk| chunk.in_frontier));
        self.frontier.sort_unstable_by_key(|coord| (coord.x, coord.y));
        self.frontier.dedup();
    }

    /// Runs one growth pass: picks the best frontier chunk and dispatches
    /// creation of at most one of its unloaded in-range neighbors. Returns
    /// whether anything was dispatched.
    fn growth_pass(&mut self, observer: Point3<f32>, frustum: &Frustum) -> bool {
        if self.pipeline.in_flight() >= self.config.build_ceiling {
            return false;
        }

        if self.chunks.is_empty() {
            let dim = CHUNK_DIMENSION as f32;
            let seed = Point2::new(
                (observer.x / dim).floor() as i32,
                (observer.z / dim).floor() as i32,
            );
            self.create_chunk(seed);
            return true;
        }

        // In-frustum chunks first, nearest first.
        let mut order: Vec<(bool, f32, Point2<i32>)> = self
            .frontier
            .iter()
            .filter_map(|&coord| {
                let chunk = self.chunks.get(&coord)?;
                if !chunk.in_frontier {
                    return None;
                }
                let (min, max) = chunk.aabb();
                Some((
                    !frustum.intersects_aabb(min, max),
                    distance_sq(coord, observer),
                    coord,
                ))
            })
            .collect();
        order.sort_unstable_by(|a, b| {
            a.0.cmp(&b.0)
                .then(a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
        });

        for &(_, _, coord) in &order {
            for (dx, dz) in NEIGHBOR_OFFSETS {
                let neighbor = Point2::new(coord.x + dx, coord.y + dz);
                if !self.chunks.contains_key(&neighbor) && self.in_range(neighbor, observer) {
                    self.create_chunk(neighbor);
                    return true;
                }
            }
        }
        false
    }

    /// Loads a chunk: reserves a buffer slot, wires up neighbor counts and
    /// frontier membership, and dispatches its mesh build.
    ///
    /// # Panics
    /// Panics when every buffer slot is taken. That is a configuration error:
    /// the render distance admits more chunks than `max_active_chunks` allows.
    fn create_chunk(&mut self, coord: Point2<i32>) {
        debug_assert!(
            !self.chunks.contains_key(&coord),
            "chunk ({}, {}) is already loaded",
            coord.x,
            coord.y
        );

        let buffer_index = self.buffer_slots.iter_zeros().next().unwrap_or_else(|| {
            panic!(
                "all {} chunk buffer slots are taken; render distance {} admits more \
                 chunks than max_active_chunks allows",
                self.config.max_active_chunks, self.config.render_distance
            )
        });
        self.buffer_slots.set(buffer_index, true);

        let mut neighbor_count = 0;
        for (dx, dz) in NEIGHBOR_OFFSETS {
            let neighbor_coord = Point2::new(coord.x + dx, coord.y + dz);
            if let Some(neighbor) = self.chunks.get_mut(&neighbor_coord) {
                neighbor.neighbor_count += 1;
                neighbor_count += 1;
                if neighbor.neighbor_count == 4 {
                    // Fully interior; can never expose an unloaded neighbor.
                    neighbor.in_frontier = false;
                }
            }
        }

        let build_id = self.next_build_id;
        self.next_build_id += 1;
        let in_frontier = neighbor_count < 4;

        self.chunks.insert(
            coord,
            Chunk {
                coord,
                y_min: 0,
                y_max: CHUNK_HEIGHT as i32 - 1,
                region: None,
                face_count: 0,
                buffer_index,
                ready: false,
                neighbor_count,
                in_frontier,
                build_id,
            },
        );
        if in_frontier {
            self.frontier.push(coord);
        }
        self.pipeline.submit_build(coord, build_id);
    }

    /// Unloads a chunk, updating its neighbors' frontier membership. The
    /// buffer slot and mesh region are released through the FIFO, one frame
    /// late when deferred release is on.
    fn destroy_chunk(&mut self, coord: Point2<i32>, observer: Point3<f32>) {
        let chunk = self
            .chunks
            .remove(&coord)
            .expect("destroying a chunk that is not loaded");
        self.pipeline.cache().remove(coord);
        let destroyed_distance = distance_sq(coord, observer);

        for (dx, dz) in NEIGHBOR_OFFSETS {
            let neighbor_coord = Point2::new(coord.x + dx, coord.y + dz);
            let in_range = self.in_range(neighbor_coord, observer);
            if let Some(neighbor) = self.chunks.get_mut(&neighbor_coord) {
                neighbor.neighbor_count -= 1;
                if !neighbor.in_frontier {
                    // Re-admit neighbors the observer still cares about: in
                    // range, or at least closer than the chunk just removed.
                    let closer = distance_sq(neighbor_coord, observer) < destroyed_distance;
                    if in_range || closer {
                        neighbor.in_frontier = true;
                        self.frontier.push(neighbor_coord);
                    }
                }
            }
        }

        let delay = if self.config.deferred_release { 1 } else { 0 };
        self.pipeline.enqueue(
            QueuedAction::ReleaseChunk {
                buffer_index: Some(chunk.buffer_index),
                region: chunk.region,
            },
            delay,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::REGION_ALIGNMENT;
    use crate::voxels::{FlatTerrain, MATERIAL_AIR};
    use std::thread;
    use std::time::Duration;

    struct TestSink {
        writes: Vec<(MeshBufferKind, u64, usize)>,
        capacity: u64,
    }

    impl TestSink {
        fn new() -> Self {
            TestSink {
                writes: Vec::new(),
                capacity: 0,
            }
        }
    }

    impl BufferSink for TestSink {
        fn write(&mut self, kind: MeshBufferKind, offset_bytes: u64, bytes: &[u8]) {
            self.writes.push((kind, offset_bytes, bytes.len()));
        }

        fn resize(&mut self, capacity_faces: u64) {
            self.capacity = capacity_faces;
        }
    }

    fn test_config(render_distance: f32) -> StreamerConfig {
        StreamerConfig {
            render_distance,
            worker_count: 2,
            field_cache_capacity: 16,
            initial_buffer_capacity: REGION_ALIGNMENT * 4,
            ..StreamerConfig::default()
        }
    }

    fn flat_store(render_distance: f32) -> ChunkStore {
        ChunkStore::new(test_config(render_distance), Arc::new(FlatTerrain::new(2)))
    }

    fn cross_coords() -> [Point2<i32>; 5] {
        [
            Point2::new(0, 0),
            Point2::new(1, 0),
            Point2::new(-1, 0),
            Point2::new(0, 1),
            Point2::new(0, -1),
        ]
    }

    #[test]
    fn surrounded_chunk_leaves_the_frontier() {
        let mut store = flat_store(1000.0);
        for coord in cross_coords() {
            store.create_chunk(coord);
        }

        let center = store.chunk(Point2::new(0, 0)).unwrap();
        assert_eq!(center.neighbor_count(), 4);
        assert!(!center.in_frontier());

        for coord in &cross_coords()[1..] {
            let arm = store.chunk(*coord).unwrap();
            assert_eq!(arm.neighbor_count(), 1);
            assert!(arm.in_frontier());
        }

        let mut indices: Vec<usize> = cross_coords()
            .iter()
            .map(|c| store.chunk(*c).unwrap().buffer_index())
            .collect();
        indices.sort_unstable();
        indices.dedup();
        assert_eq!(indices.len(), 5, "buffer indices must be unique");
    }

    #[test]
    fn destroying_a_neighbor_readmits_interior_chunks() {
        let mut store = flat_store(1000.0);
        for coord in cross_coords() {
            store.create_chunk(coord);
        }

        let observer = Point3::new(32.0, 0.0, 32.0);
        store.destroy_chunk(Point2::new(1, 0), observer);

        let center = store.chunk(Point2::new(0, 0)).unwrap();
        assert_eq!(center.neighbor_count(), 3);
        assert!(center.in_frontier(), "in-range chunk rejoins the frontier");
    }

    #[test]
    fn growth_respects_the_build_ceiling() {
        struct SlowTerrain;
        impl TerrainSource for SlowTerrain {
            fn height(&self, _x: i32, _z: i32) -> i32 {
                // Sampled once per column, so this stretches one field's
                // generation to tens of milliseconds.
                thread::sleep(Duration::from_micros(10));
                2
            }
        }

        let config = StreamerConfig {
            build_ceiling: 2,
            ..test_config(300.0)
        };
        let mut store = ChunkStore::new(config, Arc::new(SlowTerrain));
        let observer = Point3::new(32.0, 0.0, 32.0);
        let frustum = Frustum::everything();
        let mut sink = TestSink::new();

        for _ in 0..5 {
            store.tick(observer, &frustum, &mut sink);
            assert!(store.in_flight() <= 2, "ceiling exceeded: {}", store.in_flight());
            thread::sleep(Duration::from_millis(10));
        }
    }

    /// Ticks until all dispatched builds have drained and the loaded set has
    /// stopped changing.
    fn settle(store: &mut ChunkStore, observer: Point3<f32>, sink: &mut TestSink) {
        let _ = env_logger::builder().is_test(true).try_init();
        let frustum = Frustum::everything();
        let mut stable = 0;
        for _ in 0..2000 {
            let before = store.len();
            store.tick(observer, &frustum, sink);
            if store.in_flight() == 0 && store.len() == before {
                stable += 1;
                if stable >= 3 {
                    return;
                }
            } else {
                stable = 0;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!("world never settled; {} in flight", store.in_flight());
    }

    #[test]
    fn streaming_settles_into_a_ready_neighborhood() {
        let mut store = flat_store(96.0);
        let observer = Point3::new(32.0, 0.0, 32.0);
        let mut sink = TestSink::new();

        settle(&mut store, observer, &mut sink);

        // Render distance 96 around the center of (0, 0) admits the 3x3
        // block of chunks and nothing further.
        assert_eq!(store.len(), 9);
        assert_eq!(store.ready_chunks().count(), 9);

        let center = store.chunk(Point2::new(0, 0)).unwrap();
        assert_eq!(center.neighbor_count(), 4);
        assert!(!center.in_frontier());

        for chunk in store.ready_chunks() {
            let region = chunk.region().expect("flat terrain mesh is never empty");
            assert!(chunk.face_count() > 0);
            // The committed bytes landed at the region's buffer offsets.
            assert!(sink.writes.contains(&(
                MeshBufferKind::Vertex,
                region.offset * VERTEX_BYTES_PER_FACE,
                (chunk.face_count() * VERTEX_BYTES_PER_FACE) as usize,
            )));
            assert!(sink.writes.contains(&(
                MeshBufferKind::Index,
                region.offset * INDEX_BYTES_PER_FACE,
                (chunk.face_count() * INDEX_BYTES_PER_FACE) as usize,
            )));
        }
    }

    #[test]
    fn released_slots_stay_reserved_for_one_frame() {
        let mut store = flat_store(40.0);
        let observer = Point3::new(32.0, 0.0, 32.0);
        let mut sink = TestSink::new();

        settle(&mut store, observer, &mut sink);
        assert_eq!(store.len(), 1);
        assert_eq!(store.used_buffer_slots(), 1);

        let far = Point3::new(1e6, 0.0, 1e6);
        store.destroy_chunk(Point2::new(0, 0), far);
        assert_eq!(store.used_buffer_slots(), 1, "release rides the queue");

        // First drain holds the entry for its one-frame delay.
        store.drain_pipeline(far, &mut sink);
        assert_eq!(store.used_buffer_slots(), 1);

        store.drain_pipeline(far, &mut sink);
        assert_eq!(store.used_buffer_slots(), 0);
        let allocator = store.pipeline.allocator();
        assert_eq!(allocator.free_units(), allocator.capacity());
    }

    #[test]
    fn late_results_for_destroyed_chunks_are_discarded() {
        let mut store = flat_store(1000.0);
        let observer = Point3::new(32.0, 0.0, 32.0);
        let mut sink = TestSink::new();

        store.create_chunk(Point2::new(0, 0));
        store.destroy_chunk(Point2::new(0, 0), observer);

        for _ in 0..500 {
            store.drain_pipeline(observer, &mut sink);
            if store.in_flight() == 0 {
                break;
            }
            thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(store.in_flight(), 0);

        // One more drain flushes the deferred slot release; the stale mesh's
        // region was freed on arrival.
        store.drain_pipeline(observer, &mut sink);
        assert!(store.is_empty());
        assert_eq!(store.used_buffer_slots(), 0);
        let allocator = store.pipeline.allocator();
        assert_eq!(allocator.free_units(), allocator.capacity());
        assert!(sink.writes.is_empty(), "stale meshes are never written");
    }

    #[test]
    fn voxel_edits_remesh_in_place() {
        let mut store = flat_store(40.0);
        let observer = Point3::new(32.0, 0.0, 32.0);
        let mut sink = TestSink::new();

        settle(&mut store, observer, &mut sink);
        let before = store.chunk(Point2::new(0, 0)).unwrap();
        let slot = before.buffer_index();
        let flat_faces = before.face_count();

        // Dig a one-voxel hole in the surface.
        store.set_voxel(Point3::new(10, 1, 10), MATERIAL_AIR);
        settle(&mut store, observer, &mut sink);

        let after = store.chunk(Point2::new(0, 0)).unwrap();
        assert!(after.is_ready());
        assert_eq!(after.buffer_index(), slot, "re-mesh keeps the slot");
        assert!(
            after.face_count() > flat_faces,
            "the hole exposes extra faces"
        );
    }
}
